use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tokio::task::JoinSet;

use crate::cache::ResolutionCache;
use crate::error::{PinError, Result};
use crate::extract::{extract, substitute, ActionReference};
use crate::io::atomic_write;
use crate::progress::{ProgressEvent, ProgressSink};

// ---------------------------------------------------------------------------
// ResolvedReplacement
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedReplacement {
    pub reference: ActionReference,
    pub resolved_commit: String,
    pub replacement_text: String,
}

impl ResolvedReplacement {
    /// `uses: a/b@v1` + `abc` → `uses: a/b@abc # v1`. A closing quote stays
    /// right after the hash: `uses: "a/b@abc" # v1`.
    pub fn new(reference: ActionReference, resolved_commit: String) -> Self {
        let literal = &reference.literal_text;
        let tag = reference.tag.as_str();
        let replacement_text = match literal.rfind(&format!("@{tag}")) {
            Some(at) => {
                let (stem, rest) = literal.split_at(at + 1);
                let closing = &rest[tag.len()..];
                format!("{stem}{resolved_commit}{closing} # {tag}")
            }
            None => format!("{literal} # {tag}"),
        };
        Self {
            reference,
            resolved_commit,
            replacement_text,
        }
    }
}

// ---------------------------------------------------------------------------
// FileRewriteJob
// ---------------------------------------------------------------------------

/// Accumulates the outcome of every reference in one file until all have
/// answered, then produces the final content exactly once.
#[derive(Debug)]
pub struct FileRewriteJob {
    file_name: String,
    original_content: String,
    replacements: Vec<ResolvedReplacement>,
    skipped: Vec<ActionReference>,
}

/// Final content of a file plus what happened to its references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewrite {
    pub content: String,
    pub pinned: usize,
    pub skipped: usize,
}

impl FileRewriteJob {
    pub fn new(file_name: impl Into<String>, original_content: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            original_content: original_content.into(),
            replacements: Vec::new(),
            skipped: Vec::new(),
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn accept(&mut self, replacement: ResolvedReplacement) {
        self.replacements.push(replacement);
    }

    pub fn skip(&mut self, reference: ActionReference) {
        self.skipped.push(reference);
    }

    pub fn finish(self) -> Rewrite {
        let table: HashMap<&str, &str> = self
            .replacements
            .iter()
            .map(|r| {
                (
                    r.reference.literal_text.as_str(),
                    r.replacement_text.as_str(),
                )
            })
            .collect();
        Rewrite {
            content: substitute(&self.original_content, &table),
            pinned: self.replacements.len(),
            skipped: self.skipped.len(),
        }
    }
}

// ---------------------------------------------------------------------------
// FileOutcome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileOutcome {
    /// Nothing to pin; the file was not written.
    NoReferences,
    /// References found but none could be pinned; the file was not written.
    Unchanged { skipped: usize },
    /// Content rewritten (or would be, in dry-run mode).
    Updated { pinned: usize, skipped: usize },
}

// ---------------------------------------------------------------------------
// Coordinator
// ---------------------------------------------------------------------------

/// Drives one file through extract → concurrent resolve → aggregate → write.
pub struct Coordinator {
    cache: Arc<ResolutionCache>,
    progress: ProgressSink,
    dry_run: bool,
}

impl Coordinator {
    pub fn new(cache: Arc<ResolutionCache>, progress: ProgressSink) -> Self {
        Self {
            cache,
            progress,
            dry_run: false,
        }
    }

    /// Compute rewrites but never touch the disk.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn cache(&self) -> &Arc<ResolutionCache> {
        &self.cache
    }

    pub fn progress(&self) -> &ProgressSink {
        &self.progress
    }

    /// Pin every reference in `content`.
    ///
    /// Returns `Ok(None)` when there is nothing to pin. Any fatal resolution
    /// failure aborts the whole file: remaining lookups are cancelled and no
    /// partial content is returned.
    pub async fn rewrite(&self, file_name: &str, content: &str) -> Result<Option<Rewrite>> {
        let references = extract(content);
        if references.is_empty() {
            return Ok(None);
        }
        tracing::debug!(file = file_name, references = references.len(), "resolving references");

        let mut job = FileRewriteJob::new(file_name, content);
        let mut tasks = JoinSet::new();
        for reference in references {
            let cache = Arc::clone(&self.cache);
            let progress = self.progress.clone();
            let file = file_name.to_string();
            tasks.spawn(async move {
                progress.emit(ProgressEvent::Resolving {
                    file,
                    identity: reference.identity.clone(),
                    tag: reference.tag.clone(),
                });
                let outcome = cache
                    .get_or_resolve(&reference.identity, &reference.tag)
                    .await;
                (reference, outcome)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            let (reference, outcome) = joined.map_err(|e| PinError::Task {
                file: file_name.to_string(),
                reason: e.to_string(),
            })?;

            match outcome {
                Ok(commit) if !commit.is_empty() => {
                    self.progress.emit(ProgressEvent::Pinned {
                        file: file_name.to_string(),
                        identity: reference.identity.clone(),
                        tag: reference.tag.clone(),
                        commit: commit.clone(),
                    });
                    job.accept(ResolvedReplacement::new(reference, commit));
                }
                Ok(_) => self.skip(&mut job, reference),
                Err(e) if e.is_already_known() => self.skip(&mut job, reference),
                Err(e) => {
                    tasks.abort_all();
                    return Err(PinError::resolution(file_name, &reference, e));
                }
            }
        }

        Ok(Some(job.finish()))
    }

    fn skip(&self, job: &mut FileRewriteJob, reference: ActionReference) {
        tracing::warn!(
            file = job.file_name(),
            identity = %reference.identity,
            tag = %reference.tag,
            "could not find hash, leaving reference on its tag"
        );
        self.progress.emit(ProgressEvent::Unresolved {
            file: job.file_name().to_string(),
            identity: reference.identity.clone(),
            tag: reference.tag.clone(),
        });
        job.skip(reference);
    }

    /// Read `path`, pin its references and replace it atomically.
    ///
    /// The file is written at most once and only when every reference has
    /// answered. Files that are not valid UTF-8 cannot hold references and
    /// are reported as [`FileOutcome::NoReferences`].
    pub async fn update_file(&self, path: &Path) -> Result<FileOutcome> {
        let file = path.display().to_string();
        let content = match tokio::fs::read_to_string(path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                tracing::debug!(file = %file, "skipping non-UTF-8 file");
                return Ok(FileOutcome::NoReferences);
            }
            Err(source) => return Err(PinError::Read { file, source }),
        };

        let Some(rewrite) = self.rewrite(&file, &content).await? else {
            return Ok(FileOutcome::NoReferences);
        };
        if rewrite.pinned == 0 || rewrite.content == content {
            return Ok(FileOutcome::Unchanged {
                skipped: rewrite.skipped,
            });
        }

        if self.dry_run {
            tracing::info!(file = %file, pinned = rewrite.pinned, "dry run, not writing");
        } else {
            let target = path.to_path_buf();
            let data = rewrite.content;
            tokio::task::spawn_blocking(move || atomic_write(&target, data.as_bytes()))
                .await
                .map_err(|e| PinError::Task {
                    file: file.clone(),
                    reason: e.to_string(),
                })?
                .map_err(|source| PinError::Write {
                    file: file.clone(),
                    source,
                })?;
            tracing::info!(file = %file, pinned = rewrite.pinned, "file updated");
            self.progress.emit(ProgressEvent::FileWritten {
                file,
                pinned: rewrite.pinned,
            });
        }

        Ok(FileOutcome::Updated {
            pinned: rewrite.pinned,
            skipped: rewrite.skipped,
        })
    }
}
