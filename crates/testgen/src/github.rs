use crate::config::GithubConfig;
use crate::prelude::*;
use async_trait::async_trait;
use futures::future::try_join_all;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use testgen_core::tree::{blob_paths, raw_content_url, GitTree};
use testgen_core::{Error, FileRecord};

/// Supplies repository file listings and file contents.
#[async_trait]
pub trait ContentAggregator: Send + Sync {
    /// Paths of every file in the repository.
    async fn list_files(&self) -> Result<Vec<String>, Error>;

    /// Contents of `paths`, one record per path, in the same order. Any
    /// unreadable path fails the whole call.
    async fn fetch_contents(&self, paths: &[String]) -> Result<Vec<FileRecord>, Error>;
}

pub struct GithubAggregator {
    client: reqwest::Client,
    config: GithubConfig,
}

/// Create an HTTP client that sends the GitHub headers on every request.
pub fn create_github_client(config: &GithubConfig) -> Result<reqwest::Client> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static("testgen"));
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("application/vnd.github.v3+json"),
    );

    if let Some(token) = &config.token {
        let mut value = HeaderValue::from_str(&format!("token {token}"))
            .map_err(|e| eyre!("Invalid header value: {}", e))?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
    }

    reqwest::Client::builder()
        .default_headers(headers)
        .build()
        .map_err(|e| eyre!("Failed to build HTTP client: {}", e))
}

impl GithubAggregator {
    pub fn new(config: GithubConfig) -> Result<Self> {
        let client = create_github_client(&config)?;
        Ok(Self { client, config })
    }

    fn tree_url(&self) -> String {
        format!(
            "{}/repos/{}/{}/git/trees/{}?recursive=1",
            self.config.api_url.trim_end_matches('/'),
            self.config.owner,
            self.config.repo,
            self.config.branch
        )
    }

    async fn fetch_one(&self, path: &str) -> Result<FileRecord, Error> {
        let url = raw_content_url(
            &self.config.raw_url,
            &self.config.owner,
            &self.config.repo,
            &self.config.branch,
            path,
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Fetch(format!("{path}: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::Fetch(format!(
                "{path}: GitHub returned status {}",
                response.status()
            )));
        }

        let content = response
            .text()
            .await
            .map_err(|e| Error::Fetch(format!("{path}: {e}")))?;

        Ok(FileRecord::new(path, content))
    }
}

#[async_trait]
impl ContentAggregator for GithubAggregator {
    async fn list_files(&self) -> Result<Vec<String>, Error> {
        log::info!(
            "Fetching files from {}/{} ({})",
            self.config.owner,
            self.config.repo,
            self.config.branch
        );

        let response = self
            .client
            .get(self.tree_url())
            .send()
            .await
            .map_err(|e| Error::Fetch(format!("Failed to fetch repo files: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Fetch(format!(
                "GitHub API error [{status}]: {body}"
            )));
        }

        let tree: GitTree = response
            .json()
            .await
            .map_err(|e| Error::Fetch(format!("Failed to parse GitHub tree: {e}")))?;

        if tree.truncated {
            log::warn!("GitHub truncated the tree listing, some files are missing");
        }

        let files = blob_paths(tree);
        log::info!("Found {} files", files.len());
        Ok(files)
    }

    async fn fetch_contents(&self, paths: &[String]) -> Result<Vec<FileRecord>, Error> {
        if paths.is_empty() {
            return Err(Error::invalid_input("No files provided"));
        }

        try_join_all(paths.iter().map(|path| self.fetch_one(path))).await
    }
}
