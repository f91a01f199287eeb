use tag_resolver::ResolveError;
use thiserror::Error;

use crate::extract::ActionReference;

#[derive(Debug, Error)]
pub enum PinError {
    #[error("{file}: malformed action reference '{literal}': {reason}")]
    Extraction {
        file: String,
        literal: String,
        reason: String,
    },

    #[error("{file}: tag '{tag}' not found for {identity}")]
    ResolutionNotFound {
        file: String,
        identity: String,
        tag: String,
    },

    #[error("{file}: could not resolve {identity}@{tag}: {reason}")]
    ResolutionTransient {
        file: String,
        identity: String,
        tag: String,
        reason: String,
    },

    #[error("{file}: credentials rejected while resolving {identity}@{tag}: {reason}")]
    ResolutionAuth {
        file: String,
        identity: String,
        tag: String,
        reason: String,
    },

    #[error("failed to read {file}: {source}")]
    Read {
        file: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {file}: {source}")]
    Write {
        file: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{file}: background task failed: {reason}")]
    Task { file: String, reason: String },

    #[error("invalid config: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

impl PinError {
    /// Attach file and reference context to a resolver failure.
    ///
    /// `AlreadyKnown` is expected to be filtered by the caller; if it slips
    /// through it is reported as transient.
    pub fn resolution(file: &str, reference: &ActionReference, err: ResolveError) -> Self {
        let file = file.to_string();
        let identity = reference.identity.clone();
        let tag = reference.tag.clone();
        match err {
            ResolveError::NotFound { .. } => PinError::ResolutionNotFound {
                file,
                identity,
                tag,
            },
            ResolveError::Auth(reason) => PinError::ResolutionAuth {
                file,
                identity,
                tag,
                reason,
            },
            ResolveError::InvalidIdentity(reason) => PinError::Extraction {
                file,
                literal: reference.literal_text.clone(),
                reason: format!("invalid identity '{reason}'"),
            },
            other => PinError::ResolutionTransient {
                file,
                identity,
                tag,
                reason: other.to_string(),
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, PinError>;
