//! Scripted remote fetcher
//!
//! Serves canned responses per URL and records every request, so attachment
//! tests never touch the network.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use wxr_import::fetcher::{FetchResponse, RemoteFetcher};
use wxr_import::FetchError;

/// Canned answer for one URL
#[derive(Debug, Clone)]
pub struct FakeResponse {
    pub status: u16,
    pub body: Vec<u8>,
    /// Declared `content-length` (defaults to the real body length)
    pub content_length: Option<u64>,
    pub final_url: Option<String>,
}

impl FakeResponse {
    /// 200 with `body`, honest content length
    pub fn ok(body: Vec<u8>) -> Self {
        Self {
            status: 200,
            content_length: Some(body.len() as u64),
            body,
            final_url: None,
        }
    }

    /// Bare status, no body
    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: Vec::new(),
            content_length: None,
            final_url: None,
        }
    }

    pub fn declaring_length(mut self, content_length: Option<u64>) -> Self {
        self.content_length = content_length;
        self
    }

    pub fn redirected_to(mut self, url: &str) -> Self {
        self.final_url = Some(url.to_string());
        self
    }
}

/// [`RemoteFetcher`] answering from a URL → response table
///
/// Unknown URLs fail as if the host did not respond.
#[derive(Default)]
pub struct FakeFetcher {
    responses: Mutex<HashMap<String, FakeResponse>>,
    requests: Mutex<Vec<String>>,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, url: &str, response: FakeResponse) {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), response);
    }

    /// Every URL requested so far, in order
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl RemoteFetcher for FakeFetcher {
    async fn fetch_to_file(&self, url: &str, dest: &Path) -> Result<FetchResponse, FetchError> {
        self.requests.lock().unwrap().push(url.to_string());

        let response = self.responses.lock().unwrap().get(url).cloned();
        let Some(response) = response else {
            return Err(FetchError::NoResponse(format!("no route to {}", url)));
        };

        if (200..300).contains(&response.status) {
            tokio::fs::write(dest, &response.body).await?;
        }

        Ok(FetchResponse {
            status: response.status,
            content_length: response.content_length,
            final_url: response.final_url,
        })
    }
}
