use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::paths::{has_extension, DEFAULT_EXTENSIONS, GIT_DIR};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoverOptions {
    pub recursive: bool,
    /// Take every file regardless of extension.
    pub all_files: bool,
    pub extensions: Vec<String>,
}

impl Default for DiscoverOptions {
    fn default() -> Self {
        Self {
            recursive: false,
            all_files: false,
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        }
    }
}

/// Candidate files under `root`, sorted.
///
/// `.git` directories are never entered and symlinked directories are not
/// followed, so every path is visited once.
pub fn discover(root: &Path, opts: &DiscoverOptions) -> Result<Vec<PathBuf>> {
    let mut seen = HashSet::new();
    let mut files = Vec::new();
    walk(root, opts, &mut seen, &mut files)?;
    files.sort();
    Ok(files)
}

fn walk(
    dir: &Path,
    opts: &DiscoverOptions,
    seen: &mut HashSet<PathBuf>,
    files: &mut Vec<PathBuf>,
) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !seen.insert(path.clone()) {
            continue;
        }

        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            if entry.file_name() == GIT_DIR || !opts.recursive {
                continue;
            }
            walk(&path, opts, seen, files)?;
        } else if path.is_file() && (opts.all_files || has_extension(&path, &opts.extensions)) {
            files.push(path);
        }
    }
    Ok(())
}
