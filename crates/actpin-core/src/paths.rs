use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const CONFIG_FILE: &str = ".actpin.yaml";
pub const GIT_DIR: &str = ".git";

/// Extensions scanned when no explicit list is configured.
pub const DEFAULT_EXTENSIONS: &[&str] = &["yml", "yaml", "md"];

const CACHE_SUBDIR: &str = ".cache/actpin/repos";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

/// Where the git resolver keeps its bare clones when none is configured.
///
/// `~/.cache/actpin/repos`, or the system temp dir when there is no home.
pub fn default_cache_dir() -> PathBuf {
    match home::home_dir() {
        Some(home) => home.join(CACHE_SUBDIR),
        None => std::env::temp_dir().join("actpin-repos"),
    }
}

/// Does `path` carry one of `extensions` (compared without the dot,
/// case-insensitively)?
pub fn has_extension(path: &Path, extensions: &[String]) -> bool {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return false;
    };
    extensions
        .iter()
        .any(|want| want.trim_start_matches('.').eq_ignore_ascii_case(ext))
}
