//! GitHub contents API source

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

use super::{ContentSource, Entry, RawContent, SourceError};
use crate::config::GitHubConfig;

const API_VERSION: &str = "2022-11-28";

/// Per-request ceiling; the fetch deadline usually fires first
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// One element of a directory listing
#[derive(Debug, Deserialize)]
struct ContentItem {
    name: String,
    path: String,
    #[serde(rename = "type")]
    kind: String,
}

/// A single file as returned by the contents API
#[derive(Debug, Deserialize)]
struct FileContent {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    encoding: Option<String>,
}

/// Reads documents from a GitHub repository through the REST contents API
#[derive(Debug, Clone)]
pub struct GitHubSource {
    client: Client,
    api_url: String,
    owner: String,
    repo: String,
    path: String,
    token: Option<String>,
}

impl GitHubSource {
    /// Build a source from config. The token is optional; without it only
    /// public repositories are reachable, at a lower rate limit.
    pub fn new(config: &GitHubConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(concat!("blog-api/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        let token = config.token.as_deref().filter(|t| !t.is_empty());

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            owner: config.owner.clone(),
            repo: config.repo.clone(),
            path: config.path.trim_matches('/').to_string(),
            token: token.map(str::to_string),
        })
    }

    fn contents_url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/contents/{}",
            self.api_url,
            self.owner,
            self.repo,
            path.trim_matches('/')
        )
    }

    /// GET a contents endpoint and decode the JSON answer
    async fn get_contents<T: DeserializeOwned>(&self, path: &str) -> Result<T, SourceError> {
        let mut request = self
            .client
            .get(self.contents_url(path))
            .header(ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| SourceError::unavailable(path, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::unavailable(
                path,
                format!("HTTP {}", status.as_u16()),
            ));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| SourceError::unavailable(path, e))
    }
}

#[async_trait]
impl ContentSource for GitHubSource {
    fn name(&self) -> &'static str {
        "github"
    }

    fn documents_dir(&self) -> &str {
        &self.path
    }

    async fn list(&self, dir: &str) -> Result<Vec<Entry>, SourceError> {
        let items: Vec<ContentItem> = self.get_contents(dir).await?;
        Ok(items
            .into_iter()
            .map(|item| Entry {
                is_file: item.kind == "file",
                name: item.name,
                path: item.path,
            })
            .collect())
    }

    async fn read(&self, path: &str) -> Result<RawContent, SourceError> {
        let file: FileContent = self.get_contents(path).await?;
        let content = file
            .content
            .ok_or_else(|| SourceError::unreadable(path, "response carries no content"))?;

        match file.encoding.as_deref() {
            Some("base64") => Ok(RawContent::base64(content)),
            None | Some("") | Some("utf-8") => Ok(RawContent::identity(content)),
            Some(other) => Err(SourceError::unreadable(
                path,
                format!("unsupported content encoding '{}'", other),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::ContentEncoding;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(server: &MockServer, token: Option<&str>) -> GitHubConfig {
        GitHubConfig {
            owner: "octo".to_string(),
            repo: "blog".to_string(),
            path: "posts".to_string(),
            token: token.map(str::to_string),
            api_url: server.uri(),
        }
    }

    #[tokio::test]
    async fn test_list_directory() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/octo/blog/contents/posts"))
            .and(header("accept", "application/vnd.github+json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"name": "2024-01-01-hello.md", "path": "posts/2024-01-01-hello.md", "type": "file"},
                {"name": "images", "path": "posts/images", "type": "dir"}
            ])))
            .mount(&server)
            .await;

        let source = GitHubSource::new(&config(&server, None)).unwrap();
        let entries = source.list(source.documents_dir()).await.unwrap();

        assert_eq!(
            entries,
            vec![
                Entry::file("2024-01-01-hello.md", "posts/2024-01-01-hello.md"),
                Entry::dir("images", "posts/images"),
            ]
        );
    }

    #[tokio::test]
    async fn test_read_base64_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/octo/blog/contents/posts/hello.md"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "hello.md",
                "path": "posts/hello.md",
                "type": "file",
                "encoding": "base64",
                "content": "SGVsbG8s\nIFdvcmxk\nIQ==\n"
            })))
            .mount(&server)
            .await;

        let source = GitHubSource::new(&config(&server, None)).unwrap();
        let raw = source.read("posts/hello.md").await.unwrap();

        assert_eq!(raw.encoding, ContentEncoding::Base64);
        assert_eq!(raw.decode().unwrap(), b"Hello, World!");
    }

    #[tokio::test]
    async fn test_token_sent_as_bearer() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/octo/blog/contents/posts"))
            .and(header("authorization", "Bearer s3cret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let source = GitHubSource::new(&config(&server, Some("s3cret"))).unwrap();
        let entries = source.list("posts").await.unwrap();
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn test_no_token_no_authorization_header() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/octo/blog/contents/posts"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        // An empty token counts as no token
        let source = GitHubSource::new(&config(&server, Some(""))).unwrap();
        source.list("posts").await.unwrap();

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].headers.get("authorization").is_none());
        assert!(requests[0].headers.get("user-agent").is_some());
    }

    #[tokio::test]
    async fn test_error_status_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/octo/blog/contents/posts"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let source = GitHubSource::new(&config(&server, None)).unwrap();
        let err = source.list("posts").await.unwrap_err();

        assert!(matches!(err, SourceError::Unavailable { .. }));
        assert!(err.to_string().contains("HTTP 403"));
    }

    #[tokio::test]
    async fn test_unexpected_body_is_unavailable() {
        let server = MockServer::start().await;
        // A file path answers with an object, not a listing
        Mock::given(method("GET"))
            .and(path("/repos/octo/blog/contents/posts"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "posts"})))
            .mount(&server)
            .await;

        let source = GitHubSource::new(&config(&server, None)).unwrap();
        let err = source.list("posts").await.unwrap_err();
        assert!(matches!(err, SourceError::Unavailable { .. }));
    }

    #[tokio::test]
    async fn test_unsupported_encoding_is_unreadable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/octo/blog/contents/posts/huge.md"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "huge.md",
                "encoding": "none",
                "content": ""
            })))
            .mount(&server)
            .await;

        let source = GitHubSource::new(&config(&server, None)).unwrap();
        let err = source.read("posts/huge.md").await.unwrap_err();
        assert!(matches!(err, SourceError::Unreadable { .. }));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_unavailable() {
        let server = MockServer::start().await;
        let config = config(&server, None);
        drop(server);

        let source = GitHubSource::new(&config).unwrap();
        let err = source.list("posts").await.unwrap_err();
        assert!(matches!(err, SourceError::Unavailable { .. }));
    }
}
