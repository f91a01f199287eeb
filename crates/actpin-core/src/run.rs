use std::path::PathBuf;
use std::sync::Arc;

use tokio::task::JoinSet;

use crate::error::{PinError, Result};
use crate::progress::ProgressEvent;
use crate::rewrite::{Coordinator, FileOutcome};

#[derive(Debug)]
pub struct FileReport {
    pub path: PathBuf,
    pub outcome: FileOutcome,
}

#[derive(Debug)]
pub struct FileFailure {
    pub path: PathBuf,
    pub error: PinError,
}

/// Everything a run did. Succeeded files stay rewritten even when others
/// failed; `failures` is in the order the failures were observed.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub files: Vec<FileReport>,
    pub failures: Vec<FileFailure>,
    pub resolver_calls: usize,
}

impl RunSummary {
    pub fn updated(&self) -> usize {
        self.files
            .iter()
            .filter(|f| matches!(f.outcome, FileOutcome::Updated { .. }))
            .count()
    }

    pub fn pinned(&self) -> usize {
        self.files
            .iter()
            .map(|f| match f.outcome {
                FileOutcome::Updated { pinned, .. } => pinned,
                _ => 0,
            })
            .sum()
    }

    pub fn skipped(&self) -> usize {
        self.files
            .iter()
            .map(|f| match f.outcome {
                FileOutcome::Updated { skipped, .. } | FileOutcome::Unchanged { skipped } => {
                    skipped
                }
                FileOutcome::NoReferences => 0,
            })
            .sum()
    }

    pub fn first_error(&self) -> Option<&PinError> {
        self.failures.first().map(|f| &f.error)
    }

    /// The summary on success, otherwise the first file-level error.
    pub fn into_result(mut self) -> Result<RunSummary> {
        if self.failures.is_empty() {
            return Ok(self);
        }
        Err(self.failures.remove(0).error)
    }
}

/// Fans a [`Coordinator`] out over many files at once.
///
/// Files share nothing but the coordinator's resolution cache. The run
/// always waits for every file before reporting.
pub struct Orchestrator {
    coordinator: Arc<Coordinator>,
}

impl Orchestrator {
    pub fn new(coordinator: Coordinator) -> Self {
        Self {
            coordinator: Arc::new(coordinator),
        }
    }

    pub async fn run(&self, files: Vec<PathBuf>) -> RunSummary {
        tracing::info!(files = files.len(), "pinning run started");

        let mut tasks = JoinSet::new();
        for path in files {
            let coordinator = Arc::clone(&self.coordinator);
            tasks.spawn(async move {
                let outcome = coordinator.update_file(&path).await;
                (path, outcome)
            });
        }

        let mut summary = RunSummary::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((path, Ok(outcome))) => summary.files.push(FileReport { path, outcome }),
                Ok((path, Err(error))) => {
                    tracing::warn!(file = %path.display(), error = %error, "file failed");
                    self.coordinator.progress().emit(ProgressEvent::FileFailed {
                        file: path.display().to_string(),
                        error: error.to_string(),
                    });
                    summary.failures.push(FileFailure { path, error });
                }
                Err(e) => {
                    tracing::warn!(error = %e, "file task did not complete");
                    summary.failures.push(FileFailure {
                        path: PathBuf::new(),
                        error: PinError::Task {
                            file: "<unknown>".into(),
                            reason: e.to_string(),
                        },
                    });
                }
            }
        }

        summary.files.sort_by(|a, b| a.path.cmp(&b.path));
        summary.resolver_calls = self.coordinator.cache().resolver_calls();
        tracing::info!(
            updated = summary.updated(),
            failed = summary.failures.len(),
            resolver_calls = summary.resolver_calls,
            "pinning run finished"
        );
        summary
    }
}
