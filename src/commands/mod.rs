/*!
Command handlers for the CLI

This module provides the handlers invoked by the CLI entrypoint:

- `serve`  - Run the proxy gateway
- `ingest` - One-shot document upload or repository ingestion
- `chat`   - Interactive chat driven through the interaction controller

The client-side handlers build an `InteractionController` over an HTTP
transport and the OS keyring, and feed it UI events from the terminal.
*/

use std::path::PathBuf;
use std::sync::Arc;

use crate::client::{
    FileHandle, HttpTransport, InteractionController, KeyringCredentialStore, Outcome, UiEvent,
    View,
};
use crate::config::{Config, Flow};
use crate::error::{RagbridgeError, Result};

// Special commands parser for the chat loop
pub mod special_commands;

// Terminal view for the controller
pub mod terminal_view;

pub use terminal_view::TerminalView;

/// Build a controller for `flow` talking to the configured base URL
///
/// # Errors
///
/// Returns error if the base URL is invalid
pub fn build_controller(
    config: &Config,
    flow: Flow,
    view: Arc<dyn View>,
) -> Result<InteractionController> {
    let transport = HttpTransport::new(&config.client.base_url)?;
    let store = KeyringCredentialStore::new(config.client.keyring_service.clone());
    tracing::debug!(
        "Controller for {} flow via {}",
        flow,
        transport.base_url()
    );
    Ok(InteractionController::new(
        &config.client,
        flow,
        Arc::new(transport),
        view,
        Arc::new(store),
    ))
}

/// Read `paths` into file handles
///
/// # Errors
///
/// Returns error if any file cannot be read
pub async fn load_files(paths: &[PathBuf]) -> Result<Vec<FileHandle>> {
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        files.push(FileHandle::from_path(path).await?);
    }
    Ok(files)
}

fn finish(outcome: Option<Outcome>) -> Result<()> {
    match outcome {
        Some(Outcome::Succeeded) => Ok(()),
        Some(Outcome::Failed(error)) => Err(RagbridgeError::Operation(error.message).into()),
        Some(Outcome::Busy) | None => {
            Err(RagbridgeError::Operation("operation did not run".to_string()).into())
        }
    }
}

// Gateway command handler
pub mod serve {
    //! Runs the proxy gateway until the process exits.

    use super::*;

    /// Start the gateway
    ///
    /// # Errors
    ///
    /// Returns error if the gateway cannot bind or fails while serving
    pub async fn run_serve(config: Config) -> Result<()> {
        if !config.gateway.static_dir.is_dir() {
            tracing::warn!(
                "Static directory {} does not exist; pages will 404",
                config.gateway.static_dir.display()
            );
        }
        crate::gateway::serve(&config.gateway).await
    }
}

// One-shot ingestion handlers
pub mod ingest {
    //! One-shot ingestion commands.
    //!
    //! Both commands drive the controller exactly as a page would: set the
    //! form fields, then dispatch the ingestion click. A failed ingestion
    //! is returned as an error so the process exits non-zero.

    use super::*;

    /// Upload documents for `session`
    ///
    /// # Errors
    ///
    /// Returns error if a file cannot be read or the upload fails
    pub async fn run_upload(config: Config, session: String, paths: Vec<PathBuf>) -> Result<()> {
        let files = load_files(&paths).await?;
        let view = Arc::new(TerminalView::batch());
        let controller = build_controller(&config, Flow::Documents, view)?;

        controller.set_session_id(&session);
        controller.select_files(files);
        finish(controller.dispatch(UiEvent::IngestClicked).await)
    }

    /// Ask the backend to process the repository at `url` for `session`
    ///
    /// # Errors
    ///
    /// Returns error if the ingestion fails
    pub async fn run_ingest(config: Config, session: String, url: String) -> Result<()> {
        let view = Arc::new(TerminalView::batch());
        let controller = build_controller(&config, Flow::Repository, view)?;

        controller.set_session_id(&session);
        controller.set_repo_url(&url);
        finish(controller.dispatch(UiEvent::IngestClicked).await)
    }
}

// Chat command handler
pub mod chat {
    //! Interactive chat handler.
    //!
    //! Runs a readline loop over the interaction controller. Plain lines are
    //! submitted as an unmodified Enter in the message input; lines starting
    //! with `/` are special commands.

    use super::*;
    use crate::client::KeyPress;
    use crate::commands::special_commands::{parse_special_command, print_help, SpecialCommand};
    use colored::Colorize;
    use rustyline::error::ReadlineError;
    use rustyline::DefaultEditor;

    /// Start interactive chat
    ///
    /// # Arguments
    ///
    /// * `config` - Loaded configuration; `client.flow` selects the flow
    /// * `session` - Session id
    /// * `api_key` - API key from the command line or environment
    /// * `transcript` - Optional path the rendered transcript is written to
    ///
    /// # Errors
    ///
    /// Returns error if the controller or line editor cannot be created, or
    /// the transcript cannot be written
    pub async fn run_chat(
        config: Config,
        session: String,
        api_key: Option<String>,
        transcript: Option<PathBuf>,
    ) -> Result<()> {
        let flow = config.client.flow;
        let view = Arc::new(TerminalView::interactive());
        let controller = build_controller(&config, flow, view.clone())?;

        controller.set_session_id(&session);
        controller.dispatch(UiEvent::PageLoaded).await;
        if let Some(key) = api_key.filter(|k| !k.trim().is_empty()) {
            controller.set_credential(&key);
            controller.dispatch(UiEvent::CredentialChanged).await;
        }

        print_welcome_banner(&controller, &config.client.base_url);

        let mut rl = DefaultEditor::new()?;
        loop {
            let prompt = format!("[{}] >> ", controller.form().session_id);
            match rl.readline(&prompt) {
                Ok(line) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    let _ = rl.add_history_entry(trimmed);

                    match parse_special_command(trimmed) {
                        Ok(SpecialCommand::None) => {
                            controller.set_message(trimmed);
                            controller
                                .dispatch(UiEvent::MessageKey(KeyPress::enter()))
                                .await;
                        }
                        Ok(SpecialCommand::Exit) => break,
                        Ok(command) => handle_command(&controller, command).await,
                        Err(e) => eprintln!("{}", e.to_string().red()),
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("CTRL-C");
                    break;
                }
                Err(ReadlineError::Eof) => {
                    println!("CTRL-D");
                    break;
                }
                Err(err) => {
                    tracing::error!("Readline error: {:?}", err);
                    break;
                }
            }
        }

        if let Some(path) = transcript {
            view.export_transcript(&path)?;
        }
        println!("Goodbye!");
        Ok(())
    }

    async fn handle_command(controller: &InteractionController, command: SpecialCommand) {
        match command {
            SpecialCommand::Upload(paths) => {
                if controller.flow() != Flow::Documents {
                    eprintln!("{}", "/upload is only available in the documents flow".red());
                    return;
                }
                match load_files(&paths).await {
                    Ok(files) => {
                        controller.select_files(files);
                        controller.dispatch(UiEvent::IngestClicked).await;
                    }
                    Err(e) => eprintln!("{}", format!("Error: {}", e).red()),
                }
            }
            SpecialCommand::Repo(url) => {
                if controller.flow() != Flow::Repository {
                    eprintln!("{}", "/repo is only available in the repository flow".red());
                    return;
                }
                controller.set_repo_url(&url);
                controller.dispatch(UiEvent::IngestClicked).await;
            }
            SpecialCommand::Ingest => {
                controller.dispatch(UiEvent::IngestClicked).await;
            }
            SpecialCommand::Session(id) => {
                controller.set_session_id(&id);
                println!("Session set to {}", id.cyan());
            }
            SpecialCommand::Key(key) => {
                controller.set_credential(&key);
                controller.dispatch(UiEvent::CredentialChanged).await;
            }
            SpecialCommand::ShowStatus => print_status(controller),
            SpecialCommand::Help => print_help(),
            SpecialCommand::Exit | SpecialCommand::None => {}
        }
    }

    fn print_welcome_banner(controller: &InteractionController, base_url: &str) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║               Ragbridge Interactive Chat                     ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");
        println!("Flow:    {}", controller.flow().to_string().cyan());
        println!("Gateway: {}", base_url);
        if controller.form().credential.is_empty() {
            println!("{}", "No API key set; use /key <api key>".yellow());
        }
        println!("Type '/help' for available commands, 'exit' to quit\n");
    }

    fn print_status(controller: &InteractionController) {
        let form = controller.form();
        println!("Session:   {}", form.session_id);
        println!("Flow:      {}", controller.flow());
        println!(
            "API key:   {}",
            if form.credential.is_empty() {
                "not set"
            } else {
                "set"
            }
        );
        match controller.flow() {
            Flow::Documents => {
                let names: Vec<&str> = form.files.iter().map(|f| f.name.as_str()).collect();
                println!("Files:     {}", names.join(", "));
            }
            Flow::Repository => println!("Repo URL:  {}", form.repo_url),
        }
        println!("Ingesting: {}", controller.is_ingesting());
        println!("Sending:   {}", controller.is_sending());
        println!("Turns:     {}", controller.transcript().len());
    }
}
