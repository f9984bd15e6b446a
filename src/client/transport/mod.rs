//! Controller transport abstraction and implementations
//!
//! The controller talks to the gateway (or directly to the backend) through
//! the [`Transport`] trait. Concrete implementations live in submodules:
//!
//! - [`http::HttpTransport`] -- `reqwest`-based client rooted at a base URL.
//! - [`fake::FakeTransport`] -- in-process fake that records requests and
//!   replays scripted replies, used in tests.
//!
//! A transport reports any response it receives, whatever the status, as an
//! [`HttpReply`]; only failures to obtain a response are errors. Decoding the
//! reply is the controller's job.

pub mod fake;
pub mod http;

use crate::client::upload::UploadBatch;
use crate::error::Result;

/// Status and raw body text of a response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    /// HTTP status code
    pub status: u16,
    /// Body decoded as UTF-8 (lossy)
    pub body: String,
}

impl HttpReply {
    /// Create a reply
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Whether the status is 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Outbound request channel used by the interaction controller
#[async_trait::async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    /// POST a JSON body to `path`
    ///
    /// # Errors
    ///
    /// Returns error only when no response could be obtained.
    async fn post_json(&self, path: &str, body: &serde_json::Value) -> Result<HttpReply>;

    /// POST `batch` as `multipart/form-data` to `path`
    ///
    /// Each file becomes a `files` part carrying its original name; the
    /// session id is sent as a `session_id` text field.
    ///
    /// # Errors
    ///
    /// Returns error only when no response could be obtained.
    async fn post_multipart(&self, path: &str, batch: &UploadBatch) -> Result<HttpReply>;
}
