//! Proxy gateway
//!
//! A single public origin that serves the static pages and relays API
//! calls to the private backend. The gateway holds no session state: every
//! request is forwarded and forgotten.
//!
//! Routes are built from [`GatewayConfig`]:
//!
//! - each JSON relay route forwards its body unchanged and relays the
//!   backend's 2xx and 4xx replies verbatim (a 5xx becomes the gateway's
//!   own error envelope),
//! - the upload route re-encodes the multipart form for the backend,
//!   preserving file names and bytes,
//! - named pages map fixed paths to files under the static directory, and
//!   anything else falls through to the static directory itself.
//!
//! Every route and page path must be unique; a repeat is a configuration
//! error rather than a router panic.

pub mod proxy;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::routing::post;
use axum::Router;
use bytes::Bytes;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::config::GatewayConfig;
use crate::error::{RagbridgeError, Result};

pub use proxy::{relay_json, relay_upload};

/// Shared, immutable state for gateway handlers
#[derive(Debug, Clone)]
pub struct AppState {
    http: reqwest::Client,
    backend_url: Arc<str>,
}

impl AppState {
    /// Create state forwarding to `backend_url`
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(backend_url: &str) -> Result<Self> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self {
            http,
            backend_url: Arc::from(backend_url.trim_end_matches('/')),
        })
    }

    pub(crate) fn backend_endpoint(&self, backend_path: &str) -> String {
        format!("{}{}", self.backend_url, backend_path)
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }
}

/// Build the gateway router
///
/// # Errors
///
/// Returns error if two routes or pages share a path, or the backend HTTP
/// client cannot be built
///
/// # Examples
///
/// ```
/// use ragbridge::config::GatewayConfig;
/// use ragbridge::gateway::build_router;
///
/// let router = build_router(&GatewayConfig::default()).unwrap();
/// # let _ = router;
/// ```
pub fn build_router(config: &GatewayConfig) -> Result<Router> {
    config.check_unique_paths()?;
    let state = AppState::new(&config.backend_url)?;
    let mut router: Router<AppState> = Router::new();

    for route in &config.json_routes {
        let backend_path = route.backend_path.clone();
        tracing::debug!("Relaying {} -> {}", route.path, backend_path);
        router = router.route(
            &route.path,
            post(move |State(state): State<AppState>, body: Bytes| {
                let backend_path = backend_path.clone();
                async move { relay_json(&state, &backend_path, body).await }
            }),
        );
    }

    let upload_backend_path = config.upload_route.backend_path.clone();
    router = router.route(
        &config.upload_route.path,
        post(move |State(state): State<AppState>, multipart: Multipart| {
            let backend_path = upload_backend_path.clone();
            async move { relay_upload(&state, &backend_path, multipart).await }
        }),
    );

    for (path, file) in &config.pages {
        router = router.route_service(path, ServeFile::new(config.static_dir.join(file)));
    }

    Ok(router
        .fallback_service(ServeDir::new(&config.static_dir))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(config.max_upload_bytes))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

/// Bind `config.listen_addr` and serve until the process exits
///
/// # Errors
///
/// Returns error if the address is invalid, cannot be bound, or the server
/// fails
pub async fn serve(config: &GatewayConfig) -> Result<()> {
    let addr: SocketAddr = config.listen_addr.parse().map_err(|e| {
        RagbridgeError::Gateway(format!(
            "Invalid listen address '{}': {}",
            config.listen_addr, e
        ))
    })?;
    let router = build_router(config)?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| RagbridgeError::Gateway(format!("Failed to bind {}: {}", addr, e)))?;
    let local_addr = listener.local_addr()?;

    tracing::info!(
        "Gateway listening on http://{} (backend {}, static {})",
        local_addr,
        config.backend_url,
        config.static_dir.display()
    );

    axum::serve(listener, router)
        .await
        .map_err(|e| RagbridgeError::Gateway(format!("Server error: {}", e)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_state_trims_backend_slash() {
        let state = AppState::new("http://localhost:8000/").unwrap();
        assert_eq!(
            state.backend_endpoint("/chat"),
            "http://localhost:8000/chat"
        );
    }

    #[test]
    fn test_build_router_with_custom_routes() {
        let mut config = GatewayConfig::default();
        config.json_routes.push(crate::config::RelayRoute {
            path: "/api/extra".to_string(),
            backend_path: "/extra".to_string(),
        });
        config.pages.clear();
        assert!(build_router(&config).is_ok());
    }

    #[test]
    fn test_build_router_refuses_shared_path() {
        let mut config = GatewayConfig::default();
        config.json_routes.push(crate::config::RelayRoute {
            path: config.upload_route.path.clone(),
            backend_path: "/x".to_string(),
        });
        let err = build_router(&config).unwrap_err();
        assert!(err.to_string().contains("Duplicate route path"));
    }
}
