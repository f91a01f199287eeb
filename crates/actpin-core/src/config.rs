use crate::discover::DiscoverOptions;
use crate::error::{PinError, Result};
use crate::paths::{self, DEFAULT_EXTENSIONS};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use tag_resolver::{GitResolver, GithubResolver, Resolver};

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// ResolverKind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolverKind {
    /// GitHub REST API lookups.
    #[default]
    Api,
    /// Local bare clones through the `git` CLI.
    Git,
}

impl ResolverKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ResolverKind::Api => "api",
            ResolverKind::Git => "git",
        }
    }
}

impl fmt::Display for ResolverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResolverKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "api" | "github" => Ok(ResolverKind::Api),
            "git" => Ok(ResolverKind::Git),
            other => Err(format!("unknown resolver '{other}' (expected api or git)")),
        }
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub resolver: ResolverKind,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_git_url")]
    pub git_url: String,
    #[serde(default)]
    pub recursive: bool,
    #[serde(default)]
    pub all_files: bool,
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_concurrency: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_cache_dir: Option<PathBuf>,
}

fn default_version() -> u32 {
    1
}

fn default_api_url() -> String {
    tag_resolver::github::DEFAULT_API_URL.to_string()
}

fn default_git_url() -> String {
    tag_resolver::git::DEFAULT_BASE_URL.to_string()
}

fn default_extensions() -> Vec<String> {
    DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            resolver: ResolverKind::default(),
            api_url: default_api_url(),
            git_url: default_git_url(),
            recursive: false,
            all_files: false,
            extensions: default_extensions(),
            max_concurrency: None,
            git_cache_dir: None,
        }
    }
}

impl Config {
    /// Load `.actpin.yaml` from `root`, or defaults when it does not exist.
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(&path)?;
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        let cfg: Config = serde_yaml::from_str(&data)?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(cfg)
    }

    pub fn discover_options(&self) -> DiscoverOptions {
        DiscoverOptions {
            recursive: self.recursive,
            all_files: self.all_files,
            extensions: self.extensions.clone(),
        }
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.git_cache_dir
            .clone()
            .unwrap_or_else(paths::default_cache_dir)
    }

    /// Build the configured resolver. `token` is handed to the API resolver
    /// untouched; the git resolver relies on the user's git credentials.
    pub fn build_resolver(&self, token: Option<String>) -> Result<Arc<dyn Resolver>> {
        if let Some(err) = self
            .validate()
            .into_iter()
            .find(|w| w.level == WarnLevel::Error)
        {
            return Err(PinError::Config(err.message));
        }
        let resolver: Arc<dyn Resolver> = match self.resolver {
            ResolverKind::Api => Arc::new(GithubResolver::with_api_url(&self.api_url, token)),
            ResolverKind::Git => Arc::new(GitResolver::with_base_url(
                self.cache_dir(),
                &self.git_url,
            )),
        };
        Ok(resolver)
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.version != 1 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!("unknown config version {}", self.version),
            });
        }

        if !self.all_files && self.extensions.is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "extensions is empty and all_files is off: no file would be scanned"
                    .to_string(),
            });
        }

        for ext in &self.extensions {
            if ext.starts_with('.') {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!(
                        "extension '{ext}' has a leading dot; write it as '{}'",
                        ext.trim_start_matches('.')
                    ),
                });
            }
        }

        if self.max_concurrency == Some(0) {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "max_concurrency must be at least 1".to_string(),
            });
        }

        let url = match self.resolver {
            ResolverKind::Api => &self.api_url,
            ResolverKind::Git => &self.git_url,
        };
        if self.resolver == ResolverKind::Api
            && !(url.starts_with("https://") || url.starts_with("http://"))
        {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: format!("api_url '{url}' is not an http(s) URL"),
            });
        }

        if self.resolver == ResolverKind::Api && self.git_cache_dir.is_some() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "git_cache_dir is only used by the git resolver".to_string(),
            });
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let cfg = Config::load(dir.path()).unwrap();
        assert_eq!(cfg.resolver, ResolverKind::Api);
        assert_eq!(cfg.extensions, vec!["yml", "yaml", "md"]);
        assert!(cfg.validate().is_empty());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(".actpin.yaml"),
            "resolver: git\nrecursive: true\nmax_concurrency: 4\n",
        )
        .unwrap();
        let cfg = Config::load(dir.path()).unwrap();
        assert_eq!(cfg.resolver, ResolverKind::Git);
        assert!(cfg.recursive);
        assert_eq!(cfg.max_concurrency, Some(4));
        assert_eq!(cfg.api_url, "https://api.github.com");
        assert!(cfg.discover_options().recursive);
    }

    #[test]
    fn malformed_yaml_is_an_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(".actpin.yaml"), "resolver: [nope").unwrap();
        assert!(matches!(Config::load(dir.path()), Err(PinError::Yaml(_))));
    }

    #[test]
    fn validate_flags_errors_and_warnings() {
        let cfg = Config {
            extensions: vec![],
            max_concurrency: Some(0),
            api_url: "ftp://example.com".into(),
            ..Config::default()
        };
        let errors = cfg
            .validate()
            .into_iter()
            .filter(|w| w.level == WarnLevel::Error)
            .count();
        assert_eq!(errors, 3);
        assert!(matches!(cfg.build_resolver(None), Err(PinError::Config(_))));

        let cfg = Config {
            extensions: vec![".yml".into()],
            ..Config::default()
        };
        let warnings = cfg.validate();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].level, WarnLevel::Warning);
    }

    #[test]
    fn resolver_kind_parses_from_cli_strings() {
        assert_eq!("git".parse::<ResolverKind>().unwrap(), ResolverKind::Git);
        assert_eq!("api".parse::<ResolverKind>().unwrap(), ResolverKind::Api);
        assert!("svn".parse::<ResolverKind>().is_err());
    }

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let yaml = serde_yaml::to_string(&cfg).unwrap();
        let back: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back.resolver, cfg.resolver);
        assert_eq!(back.extensions, cfg.extensions);
    }
}
