//! Command-line interface definition for Ragbridge
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands for running the gateway and for driving the
//! interaction controller from a terminal.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Ragbridge - gateway and chat controller for document/repository Q&A
#[derive(Parser, Debug, Clone)]
#[command(name = "ragbridge")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for Ragbridge
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run the proxy gateway
    Serve {
        /// Address to listen on (overrides gateway.listen_addr)
        #[arg(short, long)]
        listen: Option<String>,

        /// Backend origin to forward to (overrides gateway.backend_url)
        #[arg(short, long)]
        backend: Option<String>,

        /// Directory to serve static assets from
        #[arg(long)]
        static_dir: Option<PathBuf>,
    },

    /// Upload documents for a session
    Upload {
        /// Session identifier
        #[arg(short, long)]
        session: String,

        /// Files to upload
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Gateway origin (overrides client.base_url)
        #[arg(long)]
        base_url: Option<String>,
    },

    /// Ask the backend to ingest a repository for a session
    Ingest {
        /// Session identifier
        #[arg(short, long)]
        session: String,

        /// Repository URL
        #[arg(short, long)]
        url: String,

        /// Gateway origin (overrides client.base_url)
        #[arg(long)]
        base_url: Option<String>,
    },

    /// Start an interactive chat session
    Chat {
        /// Session identifier
        #[arg(short, long)]
        session: String,

        /// Flow to drive: documents or repository
        #[arg(short, long)]
        flow: Option<String>,

        /// API key; when omitted the stored key (if any) is used
        #[arg(long, env = "RAGBRIDGE_API_KEY", hide_env_values = true)]
        api_key: Option<String>,

        /// Gateway origin (overrides client.base_url)
        #[arg(long)]
        base_url: Option<String>,

        /// Write the rendered transcript to this HTML file on exit
        #[arg(long)]
        transcript: Option<PathBuf>,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
