use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Mode given to newly created files; the tempfile itself starts out as 0600.
#[cfg(unix)]
const FILE_MODE: u32 = 0o644;

/// Atomically replace `path` with `data` using a tempfile in the same
/// directory. Readers see either the old content or the new, never a mix.
///
/// Symlinks are resolved first so the link stays a link and its target gets
/// the new content. An existing file keeps its permission bits.
pub fn atomic_write(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let target = resolve_target(path)?;
    let dir = match target.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = match std::fs::metadata(&target) {
            Ok(meta) => meta.permissions().mode() & 0o7777,
            Err(_) => FILE_MODE,
        };
        tmp.as_file()
            .set_permissions(std::fs::Permissions::from_mode(mode))?;
    }

    tmp.persist(&target).map_err(|e| e.error)?;
    Ok(())
}

/// The real file behind `path`; `path` itself when nothing exists there yet.
fn resolve_target(path: &Path) -> std::io::Result<PathBuf> {
    match std::fs::canonicalize(path) {
        Ok(real) => Ok(real),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(path.to_path_buf()),
        Err(e) => Err(e),
    }
}
