//! HTTP transport for the interaction controller
//!
//! [`HttpTransport`] issues requests against a base URL (normally the
//! gateway's public origin). No timeout is configured: requests resolve on
//! whatever the transport defaults are.

use std::sync::Arc;

use reqwest::multipart::{Form, Part};

use crate::client::transport::{HttpReply, Transport};
use crate::client::upload::UploadBatch;
use crate::error::{RagbridgeError, Result};

/// `reqwest`-backed [`Transport`]
///
/// # Examples
///
/// ```no_run
/// use ragbridge::client::HttpTransport;
///
/// let transport = HttpTransport::new("http://localhost:3000").unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http_client: Arc<reqwest::Client>,
    base_url: url::Url,
}

impl HttpTransport {
    /// Construct a transport rooted at `base_url`
    ///
    /// # Errors
    ///
    /// Returns error if `base_url` is not a valid URL or the HTTP client
    /// cannot be built.
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = url::Url::parse(base_url).map_err(|e| {
            RagbridgeError::Config(format!("Invalid base URL '{}': {}", base_url, e))
        })?;
        let http_client = reqwest::Client::builder().build()?;
        Ok(Self {
            http_client: Arc::new(http_client),
            base_url,
        })
    }

    /// Base URL requests are resolved against
    pub fn base_url(&self) -> &url::Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.as_str().trim_end_matches('/'), path)
    }

    async fn read_reply(response: reqwest::Response) -> Result<HttpReply> {
        let status = response.status().as_u16();
        let bytes = response.bytes().await.map_err(|e| {
            RagbridgeError::Transport(format!("Failed to read response body: {}", e))
        })?;
        Ok(HttpReply::new(status, String::from_utf8_lossy(&bytes)))
    }
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    async fn post_json(&self, path: &str, body: &serde_json::Value) -> Result<HttpReply> {
        let url = self.endpoint(path);
        tracing::debug!("POST {} (json)", url);

        let response = self
            .http_client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Request to {} failed: {}", url, e);
                RagbridgeError::Transport(format!("Request to {} failed: {}", url, e))
            })?;

        Self::read_reply(response).await
    }

    async fn post_multipart(&self, path: &str, batch: &UploadBatch) -> Result<HttpReply> {
        let url = self.endpoint(path);
        tracing::debug!(
            "POST {} (multipart, {} files, {} bytes)",
            url,
            batch.files.len(),
            batch.total_bytes()
        );

        let mut form = Form::new();
        for file in &batch.files {
            let mut part = Part::bytes(file.data.clone()).file_name(file.name.clone());
            if let Some(content_type) = &file.content_type {
                part = part.mime_str(content_type)?;
            }
            form = form.part("files", part);
        }
        form = form.text("session_id", batch.session_id.clone());

        let response = self
            .http_client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Upload to {} failed: {}", url, e);
                RagbridgeError::Transport(format!("Upload to {} failed: {}", url, e))
            })?;

        Self::read_reply(response).await
    }
}
