use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("tag '{tag}' not found for {identity}")]
    NotFound { identity: String, tag: String },

    #[error("resolution service unavailable: {0}")]
    Transient(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    /// A concurrent lookup already materialised this repository locally.
    /// Callers treat this as "no answer", never as a failure.
    #[error("repository already known locally: {0}")]
    AlreadyKnown(String),

    #[error("invalid action identity '{0}': expected owner/repo")]
    InvalidIdentity(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ResolveError {
    pub fn is_already_known(&self) -> bool {
        matches!(self, ResolveError::AlreadyKnown(_))
    }
}
