//! Request/response half of the sync protocol.

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

use super::error::SyncError;
use crate::file::FileRecord;

/// Reads and writes the tracked file on the backend.
#[async_trait]
pub trait FileTransport: Send + Sync {
    /// Fetch the current `(filepath, raw)` pair.
    async fn read(&self) -> Result<FileRecord, SyncError>;

    /// Persist new content. Resolves once the backend acknowledges.
    async fn write(&self, raw: &str) -> Result<(), SyncError>;
}

#[derive(Serialize)]
struct WriteBody<'a> {
    raw: &'a str,
}

/// [`FileTransport`] over HTTP: `GET` and `POST` on one JSON resource.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    url: String,
}

impl HttpTransport {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), url)
    }

    pub fn with_client(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    /// Build a transport whose requests give up after `timeout`.
    ///
    /// Without this the transport never times out.
    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> Result<Self, SyncError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SyncError::Transport(e.to_string()))?;
        Ok(Self::with_client(client, url))
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl FileTransport for HttpTransport {
    async fn read(&self) -> Result<FileRecord, SyncError> {
        let resp = self
            .client
            .get(&self.url)
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(SyncError::Status(resp.status().as_u16()));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| SyncError::Transport(e.to_string()))?;
        serde_json::from_str(&body).map_err(|e| SyncError::Malformed(e.to_string()))
    }

    async fn write(&self, raw: &str) -> Result<(), SyncError> {
        let resp = self
            .client
            .post(&self.url)
            .header(ACCEPT, "application/json")
            .json(&WriteBody { raw })
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(SyncError::Status(resp.status().as_u16()));
        }
        Ok(())
    }
}
