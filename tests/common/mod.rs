use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;

use tempfile::TempDir;

use ragbridge::config::GatewayConfig;
use ragbridge::gateway::build_router;

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}

/// A static directory with the two named pages and one asset
#[allow(dead_code)]
pub fn static_site() -> TempDir {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let root = temp_dir.path();
    fs::create_dir_all(root.join("features")).expect("failed to create features dir");
    fs::create_dir_all(root.join("js")).expect("failed to create js dir");
    fs::write(root.join("index.html"), "<h1>Landing</h1>").expect("write index");
    fs::write(
        root.join("features").join("document-qa.html"),
        "<h1>Document Q&A</h1>",
    )
    .expect("write document-qa");
    fs::write(root.join("js").join("app.js"), "console.log('app');").expect("write app.js");
    temp_dir
}

/// Gateway config pointing at `backend_url` with defaults elsewhere
#[allow(dead_code)]
pub fn gateway_config(backend_url: &str, static_dir: PathBuf) -> GatewayConfig {
    GatewayConfig {
        listen_addr: "127.0.0.1:0".to_string(),
        backend_url: backend_url.to_string(),
        static_dir,
        ..GatewayConfig::default()
    }
}

/// Serve the gateway on an ephemeral port; returns its base URL
#[allow(dead_code)]
pub async fn spawn_gateway(config: GatewayConfig) -> String {
    let router = build_router(&config).expect("failed to build router");
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind");
    let addr: SocketAddr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("gateway failed");
    });
    format!("http://{}", addr)
}
