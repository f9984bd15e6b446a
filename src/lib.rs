//! Ragbridge - gateway and chat controller for document/repository Q&A
//!
//! This library provides the pieces between a user and a private
//! question-answering backend: a stateless proxy gateway, and a session-scoped
//! interaction controller that ingests documents or a repository and then
//! carries a chat over them.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `gateway`: Public origin relaying API calls to the backend and serving static pages
//! - `client`: Interaction controller, transports, credential stores and event bindings
//! - `render`: Markdown rendering of chat turns into transcript nodes
//! - `commands`: Handlers for the CLI commands, including the terminal chat
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use ragbridge::config::Config;
//! use ragbridge::gateway;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     config.validate()?;
//!     gateway::serve(&config.gateway).await
//! }
//! ```

pub mod cli;
pub mod client;
pub mod commands;
pub mod config;
pub mod error;
pub mod gateway;
pub mod render;

// Re-export commonly used types
pub use client::{InteractionController, OperationError, Outcome};
pub use config::Config;
pub use error::{RagbridgeError, Result};
pub use render::{ChatTurn, Renderer, Role};
