use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::sync::{Arc, Mutex};

use tokio::process::Command;

use crate::{split_identity, ResolveError, Resolver, Result};

pub const DEFAULT_BASE_URL: &str = "https://github.com";

// ─── GitResolver ──────────────────────────────────────────────────────────

/// Resolver backed by local bare clones driven through the `git` CLI.
///
/// Each identity is cloned once into `<cache_dir>/<owner>/<repo>.git`
/// (blobless, bare) and refreshed with `git fetch --tags` the first time it
/// is used in a process. Authentication is whatever the user's git
/// credential configuration provides; prompts are disabled.
pub struct GitResolver {
    cache_dir: PathBuf,
    base_url: String,
    git_bin: String,
    /// One gate per identity. The flag records whether the clone was
    /// created or refreshed during this process.
    gates: Mutex<HashMap<String, Arc<tokio::sync::Mutex<bool>>>>,
}

impl GitResolver {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self::with_base_url(cache_dir, DEFAULT_BASE_URL)
    }

    /// Clone from `<base_url>/<owner>/<repo>` instead of github.com.
    pub fn with_base_url(cache_dir: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            git_bin: "git".to_string(),
            gates: Mutex::new(HashMap::new()),
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    fn repo_dir(&self, owner: &str, repo: &str) -> PathBuf {
        self.cache_dir.join(owner).join(format!("{repo}.git"))
    }

    fn gate_for(&self, identity: &str) -> Arc<tokio::sync::Mutex<bool>> {
        let mut gates = match self.gates.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        Arc::clone(gates.entry(identity.to_string()).or_default())
    }

    async fn git(&self, args: &[&str], cwd: Option<&Path>) -> Result<Output> {
        let mut cmd = Command::new(&self.git_bin);
        cmd.args(args)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }
        Ok(cmd.output().await?)
    }

    /// Create the bare clone. An existing clone is reported as
    /// [`ResolveError::AlreadyKnown`].
    async fn clone_repo(&self, identity: &str, tag: &str, repo_dir: &Path) -> Result<()> {
        if repo_dir.join("HEAD").exists() {
            return Err(ResolveError::AlreadyKnown(identity.to_string()));
        }
        if let Some(parent) = repo_dir.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let url = format!("{}/{identity}", self.base_url);
        let target = repo_dir.to_string_lossy();
        tracing::debug!(identity, url = %url, "cloning action repository");
        let output = self
            .git(
                &["clone", "--bare", "--quiet", "--filter=blob:none", &url, &target],
                None,
            )
            .await?;

        if output.status.success() {
            return Ok(());
        }
        Err(classify_failure(&stderr_of(&output), identity, tag))
    }

    async fn fetch_tags(&self, identity: &str, tag: &str, repo_dir: &Path) -> Result<()> {
        tracing::debug!(identity, "refreshing tags of known repository");
        let output = self
            .git(&["fetch", "--quiet", "--tags", "--force", "origin"], Some(repo_dir))
            .await?;
        if output.status.success() {
            return Ok(());
        }
        Err(classify_failure(&stderr_of(&output), identity, tag))
    }

    async fn rev_parse(&self, identity: &str, tag: &str, repo_dir: &Path) -> Result<String> {
        let spec = format!("refs/tags/{tag}^{{commit}}");
        let output = self
            .git(&["rev-parse", "--verify", "--quiet", &spec], Some(repo_dir))
            .await?;
        if !output.status.success() {
            return Err(ResolveError::NotFound {
                identity: identity.to_string(),
                tag: tag.to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[async_trait::async_trait]
impl Resolver for GitResolver {
    async fn resolve(&self, identity: &str, tag: &str) -> Result<String> {
        let (owner, repo) = split_identity(identity)?;
        let repo_dir = self.repo_dir(owner, repo);

        let gate = self.gate_for(identity);
        let mut synced = gate.lock().await;
        if !*synced {
            match self.clone_repo(identity, tag, &repo_dir).await {
                Ok(()) => {}
                // Left behind by an earlier run or a concurrent process.
                Err(e) if e.is_already_known() => {
                    self.fetch_tags(identity, tag, &repo_dir).await?
                }
                Err(e) => return Err(e),
            }
            *synced = true;
        }

        self.rev_parse(identity, tag, &repo_dir).await
    }
}

fn stderr_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).trim().to_string()
}

fn classify_failure(stderr: &str, identity: &str, tag: &str) -> ResolveError {
    let lower = stderr.to_lowercase();
    if lower.contains("already exists and is not an empty directory") {
        ResolveError::AlreadyKnown(identity.to_string())
    } else if lower.contains("authentication failed")
        || lower.contains("could not read username")
        || lower.contains("terminal prompts disabled")
        || lower.contains("permission denied")
    {
        ResolveError::Auth(format!("git: {stderr}"))
    } else if lower.contains("repository not found")
        || lower.contains("does not appear to be a git repository")
    {
        ResolveError::NotFound {
            identity: identity.to_string(),
            tag: tag.to_string(),
        }
    } else {
        ResolveError::Transient(format!("git: {stderr}"))
    }
}
