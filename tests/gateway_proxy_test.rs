//! Gateway relay integration tests
//!
//! The backend is a `wiremock` server; the gateway router is driven in
//! process with `tower::ServiceExt::oneshot`.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use ragbridge::gateway::build_router;

use common::{gateway_config, static_site};

const BOUNDARY: &str = "ragbridge-test-boundary";

fn router_for(backend_url: &str) -> Router {
    let config = gateway_config(backend_url, std::env::temp_dir().join("ragbridge-no-static"));
    build_router(&config).expect("router")
}

fn json_request(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

fn multipart_body(files: &[(&str, &[u8])], session_id: Option<&str>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, data) in files {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"files\"; filename=\"{}\"\r\nContent-Type: application/pdf\r\n\r\n",
                BOUNDARY, name
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    if let Some(session_id) = session_id {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"session_id\"\r\n\r\n{}\r\n",
                BOUNDARY, session_id
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn multipart_request(body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/upload")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .expect("request")
}

async fn read_body(response: axum::response::Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body")
        .to_vec()
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

#[tokio::test]
async fn test_chat_is_forwarded_unchanged_and_relayed_verbatim() {
    let backend = MockServer::start().await;
    let request_body = json!({
        "session_id": "s1",
        "message": "What does main.py do?",
        "groq_api_key": "k1"
    });
    Mock::given(method("POST"))
        .and(path("/chat"))
        .and(body_json(&request_body))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"answer": "It is the entry point."})),
        )
        .expect(1)
        .mount(&backend)
        .await;

    let response = router_for(&backend.uri())
        .oneshot(json_request("/api/chat", &request_body))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = serde_json::from_slice(&read_body(response).await).unwrap();
    assert_eq!(body, json!({"answer": "It is the entry point."}));
}

#[tokio::test]
async fn test_backend_error_status_and_body_are_relayed() {
    let backend = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/github/process"))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_json(json!({"detail": "No content found in repository"})),
        )
        .mount(&backend)
        .await;

    let response = router_for(&backend.uri())
        .oneshot(json_request(
            "/api/github/process",
            &json!({"url": "https://github.com/o/r", "session_id": "s1"}),
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = serde_json::from_slice(&read_body(response).await).unwrap();
    assert_eq!(body, json!({"detail": "No content found in repository"}));
}

#[tokio::test]
async fn test_client_error_keeps_backend_content_type() {
    let backend = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/github/chat"))
        .respond_with(ResponseTemplate::new(422).set_body_raw("bad payload", "text/plain"))
        .mount(&backend)
        .await;

    let response = router_for(&backend.uri())
        .oneshot(json_request("/api/github/chat", &json!({})))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(content_type.starts_with("text/plain"));
    assert_eq!(read_body(response).await, b"bad payload");
}

#[tokio::test]
async fn test_backend_server_error_becomes_gateway_error_envelope() {
    let backend = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(json!({"detail": "Error in chat: boom"})),
        )
        .mount(&backend)
        .await;

    let response = router_for(&backend.uri())
        .oneshot(json_request("/api/chat", &json!({"message": "hi"})))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = serde_json::from_slice(&read_body(response).await).unwrap();
    assert!(body.get("detail").is_none());
    let error = body["error"].as_str().expect("error string");
    assert!(error.starts_with("Backend returned 500"));
    assert!(error.contains("Error in chat: boom"));
}

#[tokio::test]
async fn test_backend_unavailable_non_json_becomes_gateway_error_envelope() {
    let backend = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(ResponseTemplate::new(502).set_body_raw("upstream down", "text/plain"))
        .mount(&backend)
        .await;

    let body = multipart_body(&[("a.pdf", b"%PDF")], Some("s1"));
    let response = router_for(&backend.uri())
        .oneshot(multipart_request(body))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = serde_json::from_slice(&read_body(response).await).unwrap();
    assert_eq!(body, json!({"error": "Backend returned 502: upstream down"}));
}

#[tokio::test]
async fn test_unreachable_backend_returns_error_envelope() {
    let response = router_for("http://127.0.0.1:9")
        .oneshot(json_request("/api/chat", &json!({"message": "hi"})))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = serde_json::from_slice(&read_body(response).await).unwrap();
    let error = body["error"].as_str().expect("error string");
    assert!(error.contains("connect"), "unexpected error: {}", error);
    assert!(body.get("detail").is_none());
}

#[tokio::test]
async fn test_upload_preserves_filenames_bytes_and_session() {
    let backend = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"message": "Files processed successfully"})),
        )
        .expect(1)
        .mount(&backend)
        .await;

    let first: &[u8] = b"%PDF-1.4 first\x00\x01\x02";
    let second: &[u8] = b"%PDF-1.7 second";
    let body = multipart_body(&[("Report One.pdf", first), ("b.PDF", second)], Some("s1"));

    let response = router_for(&backend.uri())
        .oneshot(multipart_request(body))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let requests = backend.received_requests().await.expect("recording enabled");
    assert_eq!(requests.len(), 1);
    let forwarded = &requests[0].body;
    assert!(contains(forwarded, b"filename=\"Report One.pdf\""));
    assert!(contains(forwarded, b"filename=\"b.PDF\""));
    assert!(contains(forwarded, first));
    assert!(contains(forwarded, second));
    assert!(contains(forwarded, b"name=\"session_id\""));
    assert!(contains(forwarded, b"\r\n\r\ns1\r\n"));
    let files_parts = forwarded
        .windows(b"name=\"files\"".len())
        .filter(|w| *w == b"name=\"files\"")
        .count();
    assert_eq!(files_parts, 2);
}

#[tokio::test]
async fn test_upload_without_session_is_rejected_locally() {
    let backend = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&backend)
        .await;

    let body = multipart_body(&[("a.pdf", b"%PDF")], None);
    let response = router_for(&backend.uri())
        .oneshot(multipart_request(body))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = serde_json::from_slice(&read_body(response).await).unwrap();
    assert_eq!(body["error"], "missing session_id field");
}

#[tokio::test]
async fn test_named_pages_and_static_assets_are_served() {
    let site = static_site();
    let config = gateway_config("http://127.0.0.1:9", site.path().to_path_buf());
    let router = build_router(&config).expect("router");

    for (uri, expected) in [
        ("/", "<h1>Landing</h1>"),
        ("/features/document-qa", "<h1>Document Q&A</h1>"),
        ("/js/app.js", "console.log('app');"),
    ] {
        let response = router
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK, "GET {}", uri);
        assert_eq!(read_body(response).await, expected.as_bytes(), "GET {}", uri);
    }

    let missing = router
        .oneshot(
            Request::builder()
                .uri("/nope.html")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("response");
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cors_preflight_is_allowed() {
    let response = router_for("http://127.0.0.1:9")
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/api/chat")
                .header("origin", "http://example.com")
                .header("access-control-request-method", "POST")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("response");

    assert!(response.status().is_success());
    assert!(response
        .headers()
        .contains_key("access-control-allow-origin"));
}
