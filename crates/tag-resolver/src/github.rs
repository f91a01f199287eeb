use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use crate::{split_identity, ResolveError, Resolver, Result};

pub const DEFAULT_API_URL: &str = "https://api.github.com";

const USER_AGENT_VALUE: &str = concat!("actpin/", env!("CARGO_PKG_VERSION"));
const API_VERSION: &str = "2022-11-28";

/// Annotated tags may point at other tag objects; stop following after this.
const MAX_TAG_DEPTH: usize = 5;

// ─── GithubResolver ───────────────────────────────────────────────────────

/// Resolver backed by the GitHub REST API (`/git/ref` + `/git/tags`).
///
/// The token is opaque: when present it is sent as a bearer credential,
/// when absent requests go out unauthenticated (and hit the lower rate limit).
pub struct GithubResolver {
    client: Client,
    api_url: String,
    token: Option<String>,
}

impl GithubResolver {
    pub fn new(token: Option<String>) -> Self {
        Self::with_api_url(DEFAULT_API_URL, token)
    }

    /// Point the resolver at a different API root (GitHub Enterprise, tests).
    pub fn with_api_url(api_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            client: Client::new(),
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.trim().is_empty()),
        }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    async fn fetch_object(&self, url: &str, identity: &str, tag: &str) -> Result<GitObject> {
        let mut request = self
            .client
            .get(url)
            .header(ACCEPT, "application/vnd.github+json")
            .header(USER_AGENT, USER_AGENT_VALUE)
            .header("X-GitHub-Api-Version", API_VERSION);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ResolveError::Transient(format!("GitHub API request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let rate_limited = response
                .headers()
                .get("x-ratelimit-remaining")
                .and_then(|v| v.to_str().ok())
                == Some("0");
            let body = response.text().await.unwrap_or_default();
            return Err(classify_failure(status, rate_limited, &body, identity, tag));
        }

        let text = response.text().await.map_err(|e| {
            ResolveError::Transient(format!("failed to read GitHub API response: {e}"))
        })?;
        let envelope: ObjectEnvelope = serde_json::from_str(&text).map_err(|e| {
            ResolveError::Transient(format!("failed to parse GitHub API response: {e}"))
        })?;
        Ok(envelope.object)
    }
}

#[async_trait::async_trait]
impl Resolver for GithubResolver {
    async fn resolve(&self, identity: &str, tag: &str) -> Result<String> {
        let (owner, repo) = split_identity(identity)?;
        let base = format!("{}/repos/{owner}/{repo}/git", self.api_url);

        let mut object = self
            .fetch_object(&format!("{base}/ref/tags/{tag}"), identity, tag)
            .await?;

        for _ in 0..MAX_TAG_DEPTH {
            if object.kind != "tag" {
                return Ok(object.sha);
            }
            tracing::debug!(identity, tag, sha = %object.sha, "dereferencing annotated tag");
            object = self
                .fetch_object(&format!("{base}/tags/{}", object.sha), identity, tag)
                .await?;
        }

        Err(ResolveError::Transient(format!(
            "{identity}@{tag}: annotated tag chain deeper than {MAX_TAG_DEPTH}"
        )))
    }
}

// ─── Wire types ───────────────────────────────────────────────────────────

/// Both `/git/ref/...` and `/git/tags/{sha}` wrap the target in `object`.
#[derive(Deserialize)]
struct ObjectEnvelope {
    object: GitObject,
}

#[derive(Deserialize)]
struct GitObject {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    sha: String,
}

#[derive(Deserialize)]
struct ApiError {
    message: String,
}

fn classify_failure(
    status: StatusCode,
    rate_limited: bool,
    body: &str,
    identity: &str,
    tag: &str,
) -> ResolveError {
    let message = serde_json::from_str::<ApiError>(body)
        .map(|e| e.message)
        .unwrap_or_else(|_| body.trim().to_string());
    let detail = format!("GitHub API error ({}): {message}", status.as_u16());

    match status {
        StatusCode::NOT_FOUND => ResolveError::NotFound {
            identity: identity.to_string(),
            tag: tag.to_string(),
        },
        StatusCode::UNAUTHORIZED => ResolveError::Auth(detail),
        StatusCode::TOO_MANY_REQUESTS => ResolveError::Transient(detail),
        StatusCode::FORBIDDEN if rate_limited => ResolveError::Transient(detail),
        StatusCode::FORBIDDEN => ResolveError::Auth(detail),
        _ => ResolveError::Transient(detail),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COMMIT: &str = "1234567890abcdef1234567890abcdef12345678";
    const TAG_OBJECT: &str = "feedfacefeedfacefeedfacefeedfacefeedface";

    fn ref_body(kind: &str, sha: &str) -> String {
        serde_json::json!({
            "ref": "refs/tags/v4",
            "object": { "type": kind, "sha": sha, "url": "ignored" }
        })
        .to_string()
    }

    #[tokio::test]
    async fn lightweight_tag_returns_commit() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/repos/actions/checkout/git/ref/tags/v4")
            .with_status(200)
            .with_body(ref_body("commit", COMMIT))
            .create_async()
            .await;

        let resolver = GithubResolver::with_api_url(server.url(), None);
        let sha = resolver.resolve("actions/checkout", "v4").await.unwrap();
        assert_eq!(sha, COMMIT);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn annotated_tag_is_dereferenced_to_commit() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/repos/actions/checkout/git/ref/tags/v4")
            .with_status(200)
            .with_body(ref_body("tag", TAG_OBJECT))
            .create_async()
            .await;
        let tag_mock = server
            .mock(
                "GET",
                format!("/repos/actions/checkout/git/tags/{TAG_OBJECT}").as_str(),
            )
            .with_status(200)
            .with_body(ref_body("commit", COMMIT))
            .create_async()
            .await;

        let resolver = GithubResolver::with_api_url(server.url(), None);
        let sha = resolver.resolve("actions/checkout", "v4").await.unwrap();
        assert_eq!(sha, COMMIT);
        tag_mock.assert_async().await;
    }

    #[tokio::test]
    async fn token_is_sent_as_bearer() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/repos/a/b/git/ref/tags/v1")
            .match_header("authorization", "Bearer s3cret")
            .with_status(200)
            .with_body(ref_body("commit", COMMIT))
            .create_async()
            .await;

        let resolver = GithubResolver::with_api_url(server.url(), Some("s3cret".into()));
        resolver.resolve("a/b", "v1").await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn missing_tag_maps_to_not_found() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/repos/a/b/git/ref/tags/v9")
            .with_status(404)
            .with_body(r#"{"message":"Not Found"}"#)
            .create_async()
            .await;

        let resolver = GithubResolver::with_api_url(server.url(), None);
        let err = resolver.resolve("a/b", "v9").await.unwrap_err();
        assert!(matches!(err, ResolveError::NotFound { .. }), "{err}");
    }

    #[tokio::test]
    async fn bad_credentials_map_to_auth() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/repos/a/b/git/ref/tags/v1")
            .with_status(401)
            .with_body(r#"{"message":"Bad credentials"}"#)
            .create_async()
            .await;

        let resolver = GithubResolver::with_api_url(server.url(), Some("nope".into()));
        let err = resolver.resolve("a/b", "v1").await.unwrap_err();
        assert!(matches!(err, ResolveError::Auth(ref m) if m.contains("Bad credentials")));
    }

    #[tokio::test]
    async fn exhausted_rate_limit_is_transient() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/repos/a/b/git/ref/tags/v1")
            .with_status(403)
            .with_header("x-ratelimit-remaining", "0")
            .with_body(r#"{"message":"API rate limit exceeded"}"#)
            .create_async()
            .await;

        let resolver = GithubResolver::with_api_url(server.url(), None);
        let err = resolver.resolve("a/b", "v1").await.unwrap_err();
        assert!(matches!(err, ResolveError::Transient(_)), "{err}");
    }

    #[tokio::test]
    async fn forbidden_without_rate_limit_is_auth() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/repos/a/b/git/ref/tags/v1")
            .with_status(403)
            .with_header("x-ratelimit-remaining", "4999")
            .with_body(r#"{"message":"Resource not accessible by integration"}"#)
            .create_async()
            .await;

        let resolver = GithubResolver::with_api_url(server.url(), Some("scoped".into()));
        let err = resolver.resolve("a/b", "v1").await.unwrap_err();
        assert!(
            matches!(err, ResolveError::Auth(ref m) if m.contains("not accessible")),
            "{err}"
        );
    }

    #[tokio::test]
    async fn too_many_requests_is_transient() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/repos/a/b/git/ref/tags/v1")
            .with_status(429)
            .with_header("retry-after", "60")
            .with_body(r#"{"message":"You have exceeded a secondary rate limit"}"#)
            .create_async()
            .await;

        let resolver = GithubResolver::with_api_url(server.url(), None);
        let err = resolver.resolve("a/b", "v1").await.unwrap_err();
        assert!(matches!(err, ResolveError::Transient(_)), "{err}");
    }

    #[tokio::test]
    async fn server_error_is_transient() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/repos/a/b/git/ref/tags/v1")
            .with_status(502)
            .create_async()
            .await;

        let resolver = GithubResolver::with_api_url(server.url(), None);
        let err = resolver.resolve("a/b", "v1").await.unwrap_err();
        assert!(matches!(err, ResolveError::Transient(_)), "{err}");
    }

    #[tokio::test]
    async fn malformed_identity_never_hits_the_network() {
        let resolver = GithubResolver::with_api_url("http://127.0.0.1:9", None);
        let err = resolver.resolve("checkout", "v4").await.unwrap_err();
        assert!(matches!(err, ResolveError::InvalidIdentity(_)));
    }

    #[test]
    fn blank_token_is_dropped_and_url_is_trimmed() {
        let resolver =
            GithubResolver::with_api_url("https://ghe.example.com/api/v3/", Some("  ".into()));
        assert!(resolver.token.is_none());
        assert_eq!(resolver.api_url(), "https://ghe.example.com/api/v3");
    }
}
