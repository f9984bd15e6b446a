//! Ragbridge - gateway and chat controller CLI
//!
#![doc = "Main entry point for the Ragbridge application."]

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ragbridge::cli::{Cli, Commands};
use ragbridge::commands;
use ragbridge::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Initialize tracing
    init_tracing(cli.verbose);

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;

    // Validate configuration
    config.validate()?;

    // Execute command
    match cli.command {
        Commands::Serve { .. } => {
            tracing::info!("Starting gateway");
            commands::serve::run_serve(config).await?;
            Ok(())
        }
        Commands::Upload { session, files, .. } => {
            tracing::info!("Uploading {} file(s) for session {}", files.len(), session);
            commands::ingest::run_upload(config, session, files).await?;
            Ok(())
        }
        Commands::Ingest { session, url, .. } => {
            tracing::info!("Ingesting repository {} for session {}", url, session);
            commands::ingest::run_ingest(config, session, url).await?;
            Ok(())
        }
        Commands::Chat {
            session,
            api_key,
            transcript,
            ..
        } => {
            tracing::info!("Starting interactive chat for session {}", session);
            if let Some(path) = &transcript {
                tracing::debug!("Transcript will be written to {}", path.display());
            }
            commands::chat::run_chat(config, session, api_key, transcript).await?;
            Ok(())
        }
    }
}

/// Initialize tracing subscriber for logging
///
/// Logs go to stderr so they never interleave with chat output on stdout.
fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "ragbridge=debug,tower_http=debug"
    } else {
        "ragbridge=info"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
