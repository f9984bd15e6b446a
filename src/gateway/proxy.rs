//! Backend relay handlers
//!
//! Successful and 4xx backend responses are passed through untouched:
//! status, body and content type. A backend 5xx, a failure to reach the
//! backend, or a failure to read its body produces the gateway's own
//! `500 {"error": "..."}` envelope; the backend's error body is never
//! copied as-is.

use axum::extract::multipart::Multipart;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use serde::Serialize;

use crate::gateway::AppState;

/// Field name carrying file parts, on both sides of the relay
pub const FILES_FIELD: &str = "files";
/// Field name carrying the session id, on both sides of the relay
pub const SESSION_FIELD: &str = "session_id";

/// Gateway-generated error body
#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    /// Failure description
    pub error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorEnvelope {
            error: message.into(),
        }),
    )
        .into_response()
}

/// A file part received from the browser
#[derive(Debug, Clone)]
struct ReceivedFile {
    file_name: String,
    content_type: Option<String>,
    data: Bytes,
}

/// Forward a JSON body unchanged and relay the backend's reply
pub async fn relay_json(state: &AppState, backend_path: &str, body: Bytes) -> Response {
    let url = state.backend_endpoint(backend_path);
    tracing::info!("Relaying JSON request to {}", url);
    tracing::debug!("Request body: {} bytes", body.len());

    let result = state
        .http()
        .post(&url)
        .header(reqwest::header::CONTENT_TYPE, "application/json")
        .body(body)
        .send()
        .await;

    relay_response(&url, result).await
}

/// Re-encode a multipart upload for the backend and relay its reply
///
/// Every `files` part is forwarded under the same field name with its
/// original file name and bytes; the `session_id` field is copied as-is.
/// Other fields are dropped.
pub async fn relay_upload(state: &AppState, backend_path: &str, mut multipart: Multipart) -> Response {
    let mut files = Vec::new();
    let mut session_id = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!("Malformed multipart upload: {}", e);
                return error_response(StatusCode::BAD_REQUEST, e.body_text());
            }
        };

        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            FILES_FIELD => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().map(str::to_string);
                match field.bytes().await {
                    Ok(data) => files.push(ReceivedFile {
                        file_name,
                        content_type,
                        data,
                    }),
                    Err(e) => {
                        tracing::warn!("Failed to read part '{}': {}", file_name, e);
                        return error_response(StatusCode::BAD_REQUEST, e.body_text());
                    }
                }
            }
            SESSION_FIELD => match field.text().await {
                Ok(text) => session_id = Some(text),
                Err(e) => return error_response(StatusCode::BAD_REQUEST, e.body_text()),
            },
            other => tracing::debug!("Ignoring multipart field '{}'", other),
        }
    }

    let Some(session_id) = session_id else {
        tracing::warn!("Upload without {} field", SESSION_FIELD);
        return error_response(
            StatusCode::BAD_REQUEST,
            format!("missing {} field", SESSION_FIELD),
        );
    };

    let total: usize = files.iter().map(|f| f.data.len()).sum();
    let url = state.backend_endpoint(backend_path);
    tracing::info!(
        "Relaying upload of {} file(s) for session {} to {}",
        files.len(),
        session_id,
        url
    );
    tracing::debug!("Upload payload: {} bytes", total);

    let form = match build_backend_form(files, session_id) {
        Ok(form) => form,
        Err(e) => {
            tracing::warn!("Rejected file part: {}", e);
            return error_response(StatusCode::BAD_REQUEST, e.to_string());
        }
    };

    let result = state.http().post(&url).multipart(form).send().await;
    relay_response(&url, result).await
}

fn build_backend_form(files: Vec<ReceivedFile>, session_id: String) -> reqwest::Result<Form> {
    let mut form = Form::new();
    for file in files {
        let length = file.data.len() as u64;
        let mut part = Part::stream_with_length(reqwest::Body::from(file.data), length)
            .file_name(file.file_name);
        if let Some(content_type) = file.content_type {
            part = part.mime_str(&content_type)?;
        }
        form = form.part(FILES_FIELD, part);
    }
    Ok(form.text(SESSION_FIELD, session_id))
}

async fn relay_response(
    url: &str,
    result: reqwest::Result<reqwest::Response>,
) -> Response {
    let response = match result {
        Ok(response) => response,
        Err(e) => {
            tracing::error!("Backend request to {} failed: {}", url, e);
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string());
        }
    };

    let status = response.status().as_u16();
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/json")
        .to_string();

    let body = match response.bytes().await {
        Ok(body) => body,
        Err(e) => {
            tracing::error!("Failed to read backend response from {}: {}", url, e);
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string());
        }
    };

    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
    if status.is_server_error() {
        tracing::error!("Backend replied {} for {}", status, url);
        return error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            backend_failure_message(status, &body),
        );
    }
    if status.is_success() {
        tracing::debug!("Backend replied {} ({} bytes)", status, body.len());
    } else {
        tracing::warn!("Backend replied {} for {}", status, url);
    }

    (status, [(header::CONTENT_TYPE, content_type)], body).into_response()
}

fn backend_failure_message(status: StatusCode, body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if text.is_empty() {
        format!("Backend returned {}", status.as_u16())
    } else {
        format!("Backend returned {}: {}", status.as_u16(), text)
    }
}
