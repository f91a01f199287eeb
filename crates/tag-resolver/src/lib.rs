//! `tag-resolver`: answers "which commit does this tag point at right now?"
//!
//! The pinning pipeline in `actpin-core` only depends on the [`Resolver`]
//! trait. Two realizations live here:
//!
//! ```text
//! Resolver (trait)
//!     │
//!     ├── GithubResolver ← GET /repos/{owner}/{repo}/git/ref/tags/{tag}
//!     │                     dereferences annotated tags via /git/tags/{sha}
//!     │
//!     └── GitResolver    ← bare partial clone per identity under a cache dir,
//!                           then `git rev-parse refs/tags/{tag}^{commit}`
//! ```
//!
//! Both return the underlying commit for annotated tags, never the tag
//! object itself. An empty string is a legal "no answer" result.
//!
//! # Quick start
//!
//! ```rust,ignore
//! use tag_resolver::{GithubResolver, Resolver};
//!
//! let resolver = GithubResolver::new(std::env::var("GITHUB_TOKEN").ok());
//! let sha = resolver.resolve("actions/checkout", "v4").await?;
//! ```

pub mod error;
pub mod git;
pub mod github;

pub use error::ResolveError;
pub use git::GitResolver;
pub use github::GithubResolver;

/// Convenience `Result` alias for this crate.
pub type Result<T> = std::result::Result<T, ResolveError>;

/// Resolves a mutable tag on an action repository to a commit identifier.
///
/// `identity` is always `owner/repo` (sub-paths already stripped).
#[async_trait::async_trait]
pub trait Resolver: Send + Sync {
    /// Return the commit `tag` currently targets in `identity`.
    ///
    /// Returns `Ok(String::new())` when the backend has no answer but the
    /// lookup itself did not fail.
    async fn resolve(&self, identity: &str, tag: &str) -> Result<String>;
}

/// Split `owner/repo` into its two halves.
pub fn split_identity(identity: &str) -> Result<(&str, &str)> {
    match identity.split_once('/') {
        Some((owner, repo)) if !owner.is_empty() && !repo.is_empty() && !repo.contains('/') => {
            Ok((owner, repo))
        }
        _ => Err(ResolveError::InvalidIdentity(identity.to_string())),
    }
}
