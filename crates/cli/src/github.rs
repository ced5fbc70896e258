//! GitHub REST implementation of [`ContentSource`].

use crate::archive;
use async_trait::async_trait;
use base64::Engine as _;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, StatusCode, Url};
use repowiki_pipeline::{ContentSource, PipelineError, Result, TreeEntry};
use repowiki_protocol::{FileRecord, RepoId};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct GitHubConfig {
    pub token: Option<String>,
    pub api_base: String,
    pub timeout: Duration,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_base: "https://api.github.com".to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Clone)]
pub struct GitHubSource {
    client: Client,
    api_base: Url,
}

#[derive(Deserialize)]
struct RepoInfo {
    default_branch: String,
}

#[derive(Deserialize)]
struct TreeResponse {
    #[serde(default)]
    tree: Vec<RawTreeEntry>,
    #[serde(default)]
    truncated: bool,
}

#[derive(Deserialize)]
struct RawTreeEntry {
    path: String,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Deserialize)]
struct ContentResponse {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    encoding: Option<String>,
}

impl GitHubSource {
    pub fn new(config: GitHubConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("repowiki"));
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        if let Some(token) = config.token.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|_| PipelineError::InvalidInput("invalid GitHub token".to_string()))?;
            headers.insert(AUTHORIZATION, value);
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()
            .map_err(transport)?;
        let api_base = Url::parse(config.api_base.trim_end_matches('/')).map_err(|err| {
            PipelineError::InvalidInput(format!("invalid GitHub API base URL: {err}"))
        })?;

        Ok(Self { client, api_base })
    }

    fn endpoint<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Result<Url> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|_| PipelineError::InvalidInput("GitHub API base cannot take a path".into()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// GET returning `None` on 404.
    async fn get(&self, url: Url) -> Result<Option<reqwest::Response>> {
        log::debug!("GET {url}");
        let response = self.client.get(url.clone()).send().await.map_err(transport)?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => Ok(Some(response)),
            status @ (StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS) => {
                Err(PipelineError::SourceError(format!(
                    "GitHub refused {url} ({status}); set GITHUB_TOKEN to raise the rate limit"
                )))
            }
            status => Err(PipelineError::SourceError(format!(
                "GitHub returned {status} for {url}"
            ))),
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: Url) -> Result<Option<T>> {
        match self.get(url).await? {
            Some(response) => Ok(Some(response.json::<T>().await.map_err(transport)?)),
            None => Ok(None),
        }
    }

    async fn decoded_content(&self, url: Url) -> Result<Option<String>> {
        let Some(body) = self.get_json::<serde_json::Value>(url).await? else {
            return Ok(None);
        };
        // Directories come back as arrays.
        let Ok(body) = serde_json::from_value::<ContentResponse>(body) else {
            return Ok(None);
        };
        Ok(decode_content(&body))
    }
}

#[async_trait]
impl ContentSource for GitHubSource {
    async fn default_branch(&self, repo: &RepoId) -> Result<String> {
        let url = self.endpoint(["repos", repo.owner.as_str(), repo.repo.as_str()])?;
        let info: RepoInfo = self
            .get_json(url)
            .await?
            .ok_or_else(|| PipelineError::NotFound(format!("repository {repo}")))?;
        Ok(info.default_branch)
    }

    async fn tree(&self, repo: &RepoId, branch: &str) -> Result<Vec<TreeEntry>> {
        let mut url = self.endpoint([
            "repos",
            repo.owner.as_str(),
            repo.repo.as_str(),
            "git",
            "trees",
            branch,
        ])?;
        url.query_pairs_mut().append_pair("recursive", "1");
        let response: TreeResponse = self
            .get_json(url)
            .await?
            .ok_or_else(|| PipelineError::NotFound(format!("branch {branch} of {repo}")))?;
        if response.truncated {
            log::warn!("GitHub truncated the tree of {repo}; some files are missing");
        }
        Ok(response
            .tree
            .into_iter()
            .filter_map(|entry| match entry.kind.as_str() {
                "blob" => Some(TreeEntry::blob(entry.path)),
                "tree" => Some(TreeEntry::tree(entry.path)),
                _ => None,
            })
            .collect())
    }

    async fn file_content(&self, repo: &RepoId, path: &str) -> Result<Option<String>> {
        let segments = ["repos", repo.owner.as_str(), repo.repo.as_str(), "contents"]
            .into_iter()
            .chain(path.split('/').filter(|s| !s.is_empty()));
        let url = self.endpoint(segments)?;
        self.decoded_content(url).await
    }

    async fn readme(&self, repo: &RepoId) -> Result<Option<String>> {
        let url = self.endpoint(["repos", repo.owner.as_str(), repo.repo.as_str(), "readme"])?;
        self.decoded_content(url).await
    }

    async fn snapshot(&self, repo: &RepoId, branch: &str) -> Result<Vec<FileRecord>> {
        let url = self.endpoint([
            "repos",
            repo.owner.as_str(),
            repo.repo.as_str(),
            "zipball",
            branch,
        ])?;
        let response = self
            .get(url)
            .await?
            .ok_or_else(|| PipelineError::NotFound(format!("archive of {repo}@{branch}")))?;
        let bytes = response.bytes().await.map_err(transport)?;
        log::info!("Downloaded {repo}@{branch} archive ({} bytes)", bytes.len());

        tokio::task::spawn_blocking(move || archive::text_entries(bytes.to_vec()))
            .await
            .map_err(|err| PipelineError::Other(format!("archive extraction panicked: {err}")))?
    }
}

/// Text of a contents-API body; `None` unless it is base64-encoded UTF-8.
fn decode_content(body: &ContentResponse) -> Option<String> {
    if body.encoding.as_deref() != Some("base64") {
        return None;
    }
    let compact: String = body
        .content
        .as_deref()?
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(compact)
        .ok()?;
    String::from_utf8(bytes).ok()
}

fn transport(err: reqwest::Error) -> PipelineError {
    PipelineError::SourceError(format!("GitHub request failed: {err}"))
}
