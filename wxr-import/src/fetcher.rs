//! Remote file retrieval for attachment binaries
//!
//! The engine only needs "fetch this URL into that file and tell me what the
//! server said"; validation of the result happens in the attachment importer.

use crate::error::FetchError;
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// What the remote server reported for a fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    /// Declared `content-length`, if the server sent one
    pub content_length: Option<u64>,
    /// URL the body was finally served from, after redirects
    pub final_url: Option<String>,
}

#[async_trait]
pub trait RemoteFetcher: Send + Sync {
    /// Download `url` into the already-created file at `dest`
    ///
    /// Non-success statuses are returned as responses, not errors; the body
    /// is not written in that case.
    async fn fetch_to_file(&self, url: &str, dest: &Path) -> Result<FetchResponse, FetchError>;
}

/// [`RemoteFetcher`] on reqwest: follows redirects, fixed timeout, no retries
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::NoResponse(e.to_string()))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl RemoteFetcher for HttpFetcher {
    async fn fetch_to_file(&self, url: &str, dest: &Path) -> Result<FetchResponse, FetchError> {
        debug!(url = %url, "Fetching remote file");

        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::NoResponse(e.to_string()))?;

        let status = response.status().as_u16();
        let content_length = response.content_length();
        let final_url = Some(response.url().to_string());

        if !response.status().is_success() {
            return Ok(FetchResponse {
                status,
                content_length,
                final_url,
            });
        }

        let mut file = tokio::fs::File::create(dest).await?;
        loop {
            match response.chunk().await {
                Ok(Some(bytes)) => file.write_all(&bytes).await?,
                Ok(None) => break,
                Err(e) => {
                    // No content-length on chunked bodies, so the size check cannot catch this
                    warn!(url = %url, error = %e, "Body transfer interrupted");
                    return Err(FetchError::NoResponse(e.to_string()));
                }
            }
        }
        file.flush().await?;

        Ok(FetchResponse {
            status,
            content_length,
            final_url,
        })
    }
}
