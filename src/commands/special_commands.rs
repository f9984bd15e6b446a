//! Special commands parser for interactive chat
//!
//! Lines starting with `/` are commands for the chat front end rather than
//! messages for the backend. They select files, set the repository URL,
//! change the session or API key, and trigger ingestion.
//!
//! Command names are case-insensitive; their arguments (paths, URLs, keys)
//! are kept exactly as typed.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur when parsing special commands
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Unknown command was entered
    #[error("Unknown command: {0}\n\nType '/help' to see available commands")]
    UnknownCommand(String),

    /// Command requires an argument but none was provided
    #[error("Command {command} requires an argument\n\nUsage: {usage}")]
    MissingArgument { command: String, usage: String },
}

/// Special commands that can be executed during interactive chat
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecialCommand {
    /// Select files and upload them for the session (document flow)
    Upload(Vec<PathBuf>),

    /// Set the repository URL and ingest it (repository flow)
    Repo(String),

    /// Re-run ingestion with the current form values
    Ingest,

    /// Change the session id
    Session(String),

    /// Change the API key
    Key(String),

    /// Show session, flow and operation state
    ShowStatus,

    /// Display help information
    Help,

    /// Exit the interactive session
    Exit,

    /// Not a special command; the line is a chat message
    None,
}

fn argument<'a>(trimmed: &'a str, command: &str, usage: &str) -> Result<&'a str, CommandError> {
    let rest = trimmed
        .split_once(char::is_whitespace)
        .map(|(_, rest)| rest.trim())
        .unwrap_or_default();
    if rest.is_empty() {
        return Err(CommandError::MissingArgument {
            command: command.to_string(),
            usage: usage.to_string(),
        });
    }
    Ok(rest)
}

/// Parse a user input line into a special command
///
/// # Errors
///
/// Returns `CommandError::UnknownCommand` if the line starts with `/` but
/// names no command, and `CommandError::MissingArgument` if a command
/// needs an argument that was not given.
///
/// # Examples
///
/// ```
/// use ragbridge::commands::special_commands::{parse_special_command, SpecialCommand};
///
/// let cmd = parse_special_command("/repo https://github.com/o/R").unwrap();
/// assert_eq!(cmd, SpecialCommand::Repo("https://github.com/o/R".to_string()));
///
/// let cmd = parse_special_command("what does main.py do?").unwrap();
/// assert_eq!(cmd, SpecialCommand::None);
///
/// assert!(parse_special_command("/foo").is_err());
/// ```
pub fn parse_special_command(input: &str) -> Result<SpecialCommand, CommandError> {
    let trimmed = input.trim();
    let lower = trimmed.to_lowercase();

    if !trimmed.starts_with('/') && lower != "exit" && lower != "quit" {
        return Ok(SpecialCommand::None);
    }

    let name = lower.split_whitespace().next().unwrap_or_default();
    match name {
        "exit" | "quit" | "/exit" | "/quit" => Ok(SpecialCommand::Exit),
        "/help" | "/?" => Ok(SpecialCommand::Help),
        "/status" => Ok(SpecialCommand::ShowStatus),
        "/ingest" => Ok(SpecialCommand::Ingest),
        "/upload" => {
            let rest = argument(trimmed, "/upload", "/upload <file> [file...]")?;
            Ok(SpecialCommand::Upload(
                rest.split_whitespace().map(PathBuf::from).collect(),
            ))
        }
        "/repo" => {
            let rest = argument(trimmed, "/repo", "/repo <url>")?;
            Ok(SpecialCommand::Repo(rest.to_string()))
        }
        "/session" => {
            let rest = argument(trimmed, "/session", "/session <id>")?;
            Ok(SpecialCommand::Session(rest.to_string()))
        }
        "/key" => {
            let rest = argument(trimmed, "/key", "/key <api key>")?;
            Ok(SpecialCommand::Key(rest.to_string()))
        }
        _ => Err(CommandError::UnknownCommand(trimmed.to_string())),
    }
}

/// Print help for the special commands
pub fn print_help() {
    println!(
        r#"
Special Commands for Interactive Chat
=====================================

INGESTION:
  /upload <file>...  - Upload documents for this session (document flow)
  /repo <url>        - Process a repository for this session (repository flow)
  /ingest            - Retry ingestion with the current selection

SESSION:
  /session <id>      - Change the session id
  /key <api key>     - Change the API key (offers to save it)
  /status            - Show session and operation state

OTHER:
  /help              - Show this help
  /quit, exit        - Leave the chat

Any other line is sent to the backend as a chat message.
"#
    );
}
