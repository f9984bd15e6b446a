//! Configuration management for Ragbridge
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::cli::{Cli, Commands};
use crate::error::{RagbridgeError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Main configuration structure for Ragbridge
///
/// Holds the gateway (server side) and client (controller side) settings.
/// Either half may be omitted from the file; defaults fill the gap.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Proxy gateway settings
    #[serde(default)]
    pub gateway: GatewayConfig,
    /// Interaction controller settings
    #[serde(default)]
    pub client: ClientConfig,
}

/// A public gateway path and the backend path it is relayed to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayRoute {
    /// Path the gateway listens on (e.g. `/api/chat`)
    pub path: String,
    /// Path on the backend origin the request is re-issued to (e.g. `/chat`)
    pub backend_path: String,
}

impl RelayRoute {
    fn new(path: &str, backend_path: &str) -> Self {
        Self {
            path: path.to_string(),
            backend_path: backend_path.to_string(),
        }
    }
}

/// Proxy gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Address the gateway binds to
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Private backend origin every forwarded request is sent to
    #[serde(default = "default_backend_url")]
    pub backend_url: String,

    /// Directory static assets are served from
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,

    /// Named top-level pages: route path -> file relative to `static_dir`
    #[serde(default = "default_pages")]
    pub pages: BTreeMap<String, String>,

    /// Maximum accepted request body size for uploads (bytes)
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,

    /// JSON routes relayed verbatim to the backend
    #[serde(default = "default_json_routes")]
    pub json_routes: Vec<RelayRoute>,

    /// Multipart upload route re-encoded for the backend
    #[serde(default = "default_upload_route")]
    pub upload_route: RelayRoute,
}

fn default_listen_addr() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_backend_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("public")
}

fn default_pages() -> BTreeMap<String, String> {
    let mut pages = BTreeMap::new();
    pages.insert("/".to_string(), "index.html".to_string());
    pages.insert(
        "/features/document-qa".to_string(),
        "features/document-qa.html".to_string(),
    );
    pages
}

fn default_max_upload_bytes() -> usize {
    50 * 1024 * 1024
}

fn default_json_routes() -> Vec<RelayRoute> {
    vec![
        RelayRoute::new("/api/chat", "/chat"),
        RelayRoute::new("/api/github/process", "/api/github/process"),
        RelayRoute::new("/api/github/chat", "/api/github/chat"),
    ]
}

fn default_upload_route() -> RelayRoute {
    RelayRoute::new("/api/upload", "/upload")
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            backend_url: default_backend_url(),
            static_dir: default_static_dir(),
            pages: default_pages(),
            max_upload_bytes: default_max_upload_bytes(),
            json_routes: default_json_routes(),
            upload_route: default_upload_route(),
        }
    }
}

impl GatewayConfig {
    /// Ensure no two relay routes or pages claim the same path
    ///
    /// # Errors
    ///
    /// Returns `RagbridgeError::Config` naming the first repeated path
    pub fn check_unique_paths(&self) -> Result<()> {
        let mut seen = HashSet::new();
        let paths = self
            .json_routes
            .iter()
            .chain(std::iter::once(&self.upload_route))
            .map(|route| route.path.as_str())
            .chain(self.pages.keys().map(String::as_str));
        for path in paths {
            if !seen.insert(path) {
                return Err(
                    RagbridgeError::Config(format!("Duplicate route path: {}", path)).into(),
                );
            }
        }
        Ok(())
    }
}

/// Which page flavour the controller drives
///
/// The document flow ingests uploaded files; the repository flow ingests a
/// repository URL. Each has its own ingestion and chat endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Flow {
    /// Document Q&A: multipart upload of files
    #[default]
    Documents,
    /// Repository Q&A: JSON request carrying a repository URL
    Repository,
}

impl Flow {
    /// Parse a flow from a string
    ///
    /// # Examples
    ///
    /// ```
    /// use ragbridge::config::Flow;
    ///
    /// assert_eq!(Flow::parse_str("repository").unwrap(), Flow::Repository);
    /// assert!(Flow::parse_str("video").is_err());
    /// ```
    pub fn parse_str(s: &str) -> std::result::Result<Self, String> {
        match s.to_lowercase().as_str() {
            "documents" | "document" | "docs" => Ok(Self::Documents),
            "repository" | "repo" => Ok(Self::Repository),
            other => Err(format!("Unknown flow: {}", other)),
        }
    }
}

impl fmt::Display for Flow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Documents => write!(f, "documents"),
            Self::Repository => write!(f, "repository"),
        }
    }
}

/// Endpoints used by one flow, relative to the client base URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowEndpoints {
    /// Ingestion endpoint (upload or repository processing)
    pub ingest_path: String,
    /// Chat endpoint
    pub chat_path: String,
}

fn default_documents_endpoints() -> FlowEndpoints {
    FlowEndpoints {
        ingest_path: "/api/upload".to_string(),
        chat_path: "/api/chat".to_string(),
    }
}

fn default_repository_endpoints() -> FlowEndpoints {
    FlowEndpoints {
        ingest_path: "/api/github/process".to_string(),
        chat_path: "/api/github/chat".to_string(),
    }
}

/// Interaction controller configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Origin requests are sent to (normally the gateway)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Active flow
    #[serde(default)]
    pub flow: Flow,

    /// Endpoints for the document flow
    #[serde(default = "default_documents_endpoints")]
    pub documents: FlowEndpoints,

    /// Endpoints for the repository flow
    #[serde(default = "default_repository_endpoints")]
    pub repository: FlowEndpoints,

    /// File suffixes accepted in a document upload batch
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,

    /// Fixed key the credential is persisted under
    #[serde(default = "default_credential_key")]
    pub credential_key: String,

    /// Name of the chat request body field carrying the credential
    #[serde(default = "default_credential_field")]
    pub credential_field: String,

    /// Keyring service name used by the durable credential store
    #[serde(default = "default_keyring_service")]
    pub keyring_service: String,
}

fn default_base_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_allowed_extensions() -> Vec<String> {
    vec![".pdf".to_string()]
}

fn default_credential_key() -> String {
    "groq_api_key".to_string()
}

fn default_credential_field() -> String {
    "groq_api_key".to_string()
}

fn default_keyring_service() -> String {
    "ragbridge".to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            flow: Flow::default(),
            documents: default_documents_endpoints(),
            repository: default_repository_endpoints(),
            allowed_extensions: default_allowed_extensions(),
            credential_key: default_credential_key(),
            credential_field: default_credential_field(),
            keyring_service: default_keyring_service(),
        }
    }
}

impl ClientConfig {
    /// Endpoints for the given flow
    pub fn endpoints(&self, flow: Flow) -> &FlowEndpoints {
        match flow {
            Flow::Documents => &self.documents,
            Flow::Repository => &self.repository,
        }
    }
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// # Arguments
    ///
    /// * `path` - Path to configuration file
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &str, cli: &Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| RagbridgeError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| RagbridgeError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(listen_addr) = std::env::var("RAGBRIDGE_LISTEN_ADDR") {
            self.gateway.listen_addr = listen_addr;
        }

        if let Ok(backend_url) = std::env::var("RAGBRIDGE_BACKEND_URL") {
            self.gateway.backend_url = backend_url;
        }

        if let Ok(static_dir) = std::env::var("RAGBRIDGE_STATIC_DIR") {
            self.gateway.static_dir = PathBuf::from(static_dir);
        }

        if let Ok(base_url) = std::env::var("RAGBRIDGE_BASE_URL") {
            self.client.base_url = base_url;
        }

        if let Ok(flow) = std::env::var("RAGBRIDGE_FLOW") {
            match Flow::parse_str(&flow) {
                Ok(value) => self.client.flow = value,
                Err(_) => tracing::warn!("Invalid RAGBRIDGE_FLOW: {}", flow),
            }
        }
    }

    fn apply_cli_overrides(&mut self, cli: &Cli) {
        if cli.verbose {
            tracing::debug!("Verbose mode enabled");
        }

        match &cli.command {
            Commands::Serve {
                listen,
                backend,
                static_dir,
            } => {
                if let Some(listen) = listen {
                    self.gateway.listen_addr = listen.clone();
                }
                if let Some(backend) = backend {
                    self.gateway.backend_url = backend.clone();
                }
                if let Some(dir) = static_dir {
                    self.gateway.static_dir = dir.clone();
                }
            }
            Commands::Upload { base_url, .. } | Commands::Ingest { base_url, .. } => {
                if let Some(base_url) = base_url {
                    self.client.base_url = base_url.clone();
                }
            }
            Commands::Chat { base_url, flow, .. } => {
                if let Some(base_url) = base_url {
                    self.client.base_url = base_url.clone();
                }
                if let Some(flow) = flow {
                    match Flow::parse_str(flow) {
                        Ok(value) => self.client.flow = value,
                        Err(e) => tracing::warn!("Ignoring --flow: {}", e),
                    }
                }
            }
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns error if any validation check fails
    pub fn validate(&self) -> Result<()> {
        self.gateway
            .listen_addr
            .parse::<SocketAddr>()
            .map_err(|e| {
                RagbridgeError::Config(format!(
                    "Invalid gateway.listen_addr '{}': {}",
                    self.gateway.listen_addr, e
                ))
            })?;

        validate_http_url("gateway.backend_url", &self.gateway.backend_url)?;
        validate_http_url("client.base_url", &self.client.base_url)?;

        if self.gateway.max_upload_bytes == 0 {
            return Err(RagbridgeError::Config(
                "gateway.max_upload_bytes must be greater than 0".to_string(),
            )
            .into());
        }

        let relay_paths = self
            .gateway
            .json_routes
            .iter()
            .chain(std::iter::once(&self.gateway.upload_route))
            .flat_map(|route| [route.path.as_str(), route.backend_path.as_str()]);
        let endpoint_paths = [&self.client.documents, &self.client.repository]
            .into_iter()
            .flat_map(|e| [e.ingest_path.as_str(), e.chat_path.as_str()]);
        for path in relay_paths
            .chain(self.gateway.pages.keys().map(String::as_str))
            .chain(endpoint_paths)
        {
            if !path.starts_with('/') {
                return Err(
                    RagbridgeError::Config(format!("Path must start with '/': {}", path)).into(),
                );
            }
        }

        self.gateway.check_unique_paths()?;

        if self.client.allowed_extensions.is_empty() {
            return Err(RagbridgeError::Config(
                "client.allowed_extensions must not be empty".to_string(),
            )
            .into());
        }

        if let Some(bad) = self
            .client
            .allowed_extensions
            .iter()
            .find(|ext| ext.len() < 2 || !ext.starts_with('.'))
        {
            return Err(RagbridgeError::Config(format!(
                "Invalid extension '{}': must look like '.pdf'",
                bad
            ))
            .into());
        }

        if self.client.credential_key.trim().is_empty()
            || self.client.credential_field.trim().is_empty()
        {
            return Err(RagbridgeError::Config(
                "client.credential_key and client.credential_field must be set".to_string(),
            )
            .into());
        }

        Ok(())
    }
}

fn validate_http_url(field: &str, value: &str) -> Result<()> {
    let parsed = url::Url::parse(value)
        .map_err(|e| RagbridgeError::Config(format!("Invalid {} '{}': {}", field, value, e)))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(RagbridgeError::Config(format!(
            "{} must use http or https: {}",
            field, value
        ))
        .into());
    }
    Ok(())
}
