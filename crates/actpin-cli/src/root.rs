use std::path::{Path, PathBuf};

/// Directory the command was started from. File arguments and discovery are
/// relative to it.
pub fn working_dir() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

/// Resolve the project root, where `.actpin.yaml` lives.
///
/// Priority:
/// 1. `--root` flag / `ACTPIN_ROOT` env var (passed in as `explicit`)
/// 2. Walk upward from `cwd` looking for `.git/`
/// 3. Fall back to `cwd`
pub fn resolve_root(explicit: Option<&Path>, cwd: &Path) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_path_buf();
    }
    find_git_root(cwd).unwrap_or_else(|| cwd.to_path_buf())
}

fn find_git_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(actpin_core::paths::GIT_DIR).is_dir())
        .map(Path::to_path_buf)
}

/// Interpret a user-supplied file argument relative to `base`.
pub fn resolve_against(base: &Path, file: &Path) -> PathBuf {
    if file.is_absolute() {
        file.to_path_buf()
    } else {
        base.join(file)
    }
}
