use std::fmt;

use serde::Serialize;
use tokio::sync::mpsc;

/// Status updates emitted while a run is in progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProgressEvent {
    Resolving {
        file: String,
        identity: String,
        tag: String,
    },
    Pinned {
        file: String,
        identity: String,
        tag: String,
        commit: String,
    },
    /// The resolver had no answer; the reference stays on its tag.
    Unresolved {
        file: String,
        identity: String,
        tag: String,
    },
    FileWritten {
        file: String,
        pinned: usize,
    },
    FileFailed {
        file: String,
        error: String,
    },
}

impl fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgressEvent::Resolving {
                file,
                identity,
                tag,
            } => write!(f, "  ({file}) Finding hash for {identity}@{tag}"),
            ProgressEvent::Pinned {
                file,
                identity,
                tag,
                commit,
            } => write!(f, "  ({file}) Updated with hash {commit} for {identity}@{tag}"),
            ProgressEvent::Unresolved {
                file,
                identity,
                tag,
            } => write!(f, "  ({file}) Could not find hash for {identity}@{tag}"),
            ProgressEvent::FileWritten { file, pinned } => {
                write!(f, "  ({file}) Wrote {pinned} pinned reference(s)")
            }
            ProgressEvent::FileFailed { file, error } => write!(f, "  ({file}) Failed: {error}"),
        }
    }
}

/// Non-blocking sink for [`ProgressEvent`]s.
///
/// Backed by an unbounded channel so emitting never waits on the consumer.
/// A disabled sink, or one whose receiver was dropped, silently discards.
#[derive(Debug, Clone, Default)]
pub struct ProgressSink {
    tx: Option<mpsc::UnboundedSender<ProgressEvent>>,
}

impl ProgressSink {
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    pub fn emit(&self, event: ProgressEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }
}
