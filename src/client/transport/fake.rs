//! In-process fake transport for controller tests
//!
//! [`FakeTransport`] records every request it receives and answers with
//! scripted replies, in order. When no reply is scripted it answers
//! `200 {}`. A gated fake ([`FakeTransport::gated`]) holds each request
//! open until the test releases it through the returned [`Notify`], which
//! lets a test observe the controller while a request is in flight.
//!
//! # Example
//!
//! ```
//! use ragbridge::client::transport::fake::FakeTransport;
//! use ragbridge::client::Transport;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let transport = FakeTransport::new();
//! transport.push_reply(200, r#"{"answer":"hi"}"#);
//!
//! let reply = transport
//!     .post_json("/api/chat", &serde_json::json!({"message": "hello"}))
//!     .await
//!     .unwrap();
//! assert_eq!(reply.body, r#"{"answer":"hi"}"#);
//! assert_eq!(transport.requests().len(), 1);
//! # }
//! ```

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;

use crate::client::transport::{HttpReply, Transport};
use crate::client::upload::UploadBatch;
use crate::error::{RagbridgeError, Result};

/// A request observed by [`FakeTransport`]
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedRequest {
    /// JSON POST
    Json {
        /// Request path
        path: String,
        /// Request body
        body: serde_json::Value,
    },
    /// Multipart POST
    Multipart {
        /// Request path
        path: String,
        /// Batch that was sent
        batch: UploadBatch,
    },
}

/// Recording, scripted [`Transport`] for tests
#[derive(Debug, Default)]
pub struct FakeTransport {
    requests: Mutex<Vec<RecordedRequest>>,
    replies: Mutex<VecDeque<std::result::Result<HttpReply, String>>>,
    gate: Option<Arc<Notify>>,
}

impl FakeTransport {
    /// Create an ungated fake
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a fake whose requests wait for `notify_one` on the returned gate
    pub fn gated() -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        let transport = Self {
            gate: Some(Arc::clone(&gate)),
            ..Self::default()
        };
        (transport, gate)
    }

    /// Script the next reply
    pub fn push_reply(&self, status: u16, body: &str) {
        self.lock_replies().push_back(Ok(HttpReply::new(status, body)));
    }

    /// Script the next request to fail at the transport level
    pub fn push_failure(&self, message: &str) {
        self.lock_replies().push_back(Err(message.to_string()));
    }

    /// Snapshot of all requests received so far
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn lock_replies(
        &self,
    ) -> std::sync::MutexGuard<'_, VecDeque<std::result::Result<HttpReply, String>>> {
        self.replies
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn respond(&self, request: RecordedRequest) -> Result<HttpReply> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(request);

        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        let next = self.lock_replies().pop_front();
        match next {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(message)) => Err(RagbridgeError::Transport(message).into()),
            None => Ok(HttpReply::new(200, "{}")),
        }
    }
}

#[async_trait::async_trait]
impl Transport for FakeTransport {
    async fn post_json(&self, path: &str, body: &serde_json::Value) -> Result<HttpReply> {
        self.respond(RecordedRequest::Json {
            path: path.to_string(),
            body: body.clone(),
        })
        .await
    }

    async fn post_multipart(&self, path: &str, batch: &UploadBatch) -> Result<HttpReply> {
        self.respond(RecordedRequest::Multipart {
            path: path.to_string(),
            batch: batch.clone(),
        })
        .await
    }
}
