pub mod config;
pub mod list;
pub mod pin;

use crate::root::resolve_against;
use actpin_core::config::Config;
use actpin_core::discover::discover;
use anyhow::Context;
use clap::Args;
use std::path::{Path, PathBuf};

/// File selection flags shared by `pin` and `list`.
#[derive(Args, Debug)]
pub struct Selection {
    /// Files to process (default: discovered under the current directory)
    pub files: Vec<PathBuf>,

    /// Descend into subdirectories when discovering files
    #[arg(long, short = 'r')]
    pub recursive: bool,

    /// Consider every file, not only the configured extensions
    #[arg(long)]
    pub all: bool,
}

impl Selection {
    /// Fold the flags into `config`; flags only ever turn options on.
    pub fn apply(&self, config: &mut Config) {
        config.recursive |= self.recursive;
        config.all_files |= self.all;
    }

    /// Explicit files when given, otherwise everything discovery finds.
    /// Both are relative to `cwd`.
    pub fn candidates(&self, cwd: &Path, config: &Config) -> anyhow::Result<Vec<PathBuf>> {
        if !self.files.is_empty() {
            return Ok(self.files.iter().map(|f| resolve_against(cwd, f)).collect());
        }
        discover(cwd, &config.discover_options())
            .with_context(|| format!("failed to list files under {}", cwd.display()))
    }
}
