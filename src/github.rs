use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::{header, Client, Response, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::Config;
use crate::remote::{FetchStrategy, ObjectKind, RemoteSource, TreeEntry, TreeListing};
use crate::repo::RepoId;

/// Reference listed for every repository; resolves to its default branch
pub const DEFAULT_REF: &str = "HEAD";

const USER_AGENT: &str = concat!("mdsync/", env!("CARGO_PKG_VERSION"));
const JSON_MEDIA_TYPE: &str = "application/vnd.github+json";
const RAW_MEDIA_TYPE: &str = "application/vnd.github.raw";
/// Git file mode of a symbolic link; GitHub lists these as blobs
const SYMLINK_MODE: &str = "120000";

/// GitHub REST client for tree listings and file content
pub struct GitHubClient {
    http: Client,
    api_url: String,
    token: Option<String>,
    strategy: FetchStrategy,
}

#[derive(Debug, Deserialize)]
struct TreeResponse {
    #[serde(default)]
    tree: Vec<WireTreeEntry>,
    #[serde(default)]
    truncated: bool,
}

#[derive(Debug, Deserialize)]
struct WireTreeEntry {
    path: String,
    #[serde(rename = "type")]
    kind: ObjectKind,
    sha: String,
    #[serde(default)]
    mode: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BlobResponse {
    content: String,
    #[serde(default)]
    encoding: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

impl From<WireTreeEntry> for TreeEntry {
    fn from(entry: WireTreeEntry) -> Self {
        let kind = match entry.mode.as_deref() {
            Some(SYMLINK_MODE) => ObjectKind::Symlink,
            _ => entry.kind,
        };

        Self {
            path: entry.path,
            kind,
            content_id: entry.sha,
            locator: entry.url,
        }
    }
}

impl GitHubClient {
    /// Create a client from the configured API URL, token and fetch strategy
    pub fn new(config: &Config) -> Result<Self> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to create HTTP client")?;

        let token = config.resolve_access_token();
        if token.is_none() {
            warn!("No access token configured, using unauthenticated GitHub API access");
        }

        Ok(Self {
            http,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            token,
            strategy: config.fetch_strategy,
        })
    }

    /// Authorization header value, if a token is configured
    fn auth_header(&self) -> Option<String> {
        self.token.as_ref().map(|token| format!("Bearer {}", token))
    }

    /// Recursive tree URL for `repo` at the default branch
    fn tree_url(&self, repo: &RepoId) -> String {
        format!(
            "{}/repos/{}/git/trees/{}",
            self.api_url,
            repo.as_str(),
            DEFAULT_REF
        )
    }

    /// Send a GET request, turning non-success statuses into errors
    async fn get(&self, url: &str, accept: &str, query: &[(&str, &str)]) -> Result<Response> {
        debug!("GET {}", url);

        let mut request = self
            .http
            .get(url)
            .header(header::ACCEPT, accept)
            .query(query);

        if let Some(auth) = self.auth_header() {
            request = request.header(header::AUTHORIZATION, auth);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("Failed to send request: {}", url))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiError>(&body)
            .map(|e| e.message)
            .unwrap_or(body);

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(anyhow!(
                "GitHub rejected the request ({}): {}. Check the access token.",
                status,
                message
            )),
            _ => Err(anyhow!("GitHub API returned {} for {}: {}", status, url, message)),
        }
    }

    /// Fetch the API blob object and decode its content
    async fn fetch_blob(&self, locator: &str) -> Result<Vec<u8>> {
        let blob: BlobResponse = self
            .get(locator, JSON_MEDIA_TYPE, &[])
            .await?
            .json()
            .await
            .context("Failed to decode blob response JSON")?;

        decode_blob(blob)
    }

    /// Fetch the raw content stream
    async fn fetch_raw(&self, locator: &str) -> Result<Vec<u8>> {
        let bytes = self
            .get(locator, RAW_MEDIA_TYPE, &[])
            .await?
            .bytes()
            .await
            .context("Failed to read raw content")?;

        Ok(bytes.to_vec())
    }
}

fn decode_blob(blob: BlobResponse) -> Result<Vec<u8>> {
    match blob.encoding.as_deref() {
        Some("base64") | None => {
            // Encoded content is wrapped at a fixed line width
            let compact: String = blob.content.split_ascii_whitespace().collect();
            BASE64
                .decode(compact)
                .context("Failed to decode base64 content")
        }
        Some("utf-8") => Ok(blob.content.into_bytes()),
        Some(other) => Err(anyhow!("Unsupported blob encoding: {}", other)),
    }
}

#[async_trait]
impl RemoteSource for GitHubClient {
    fn provider_name(&self) -> &'static str {
        "GitHub"
    }

    async fn list_tree(&self, repo: &RepoId) -> Result<TreeListing> {
        let url = self.tree_url(repo);

        let response: TreeResponse = self
            .get(&url, JSON_MEDIA_TYPE, &[("recursive", "1")])
            .await
            .with_context(|| format!("Failed to list tree for {}", repo))?
            .json()
            .await
            .with_context(|| format!("Failed to decode tree listing for {}", repo))?;

        debug!("Listed {} objects in {}", response.tree.len(), repo);

        Ok(TreeListing {
            entries: response.tree.into_iter().map(TreeEntry::from).collect(),
            truncated: response.truncated,
        })
    }

    async fn fetch(&self, entry: &TreeEntry) -> Result<Vec<u8>> {
        let locator = entry
            .locator
            .as_deref()
            .ok_or_else(|| anyhow!("No retrieval URL for {}", entry.path))?;

        let content = match self.strategy {
            FetchStrategy::Blob => self.fetch_blob(locator).await,
            FetchStrategy::Raw => self.fetch_raw(locator).await,
        };

        content.with_context(|| format!("Failed to fetch {}", entry.path))
    }
}
