//! Terminal implementation of the controller's [`View`]
//!
//! Status changes and alerts are printed in color, transcript turns are
//! printed as plain text while their rendered HTML is kept so the session
//! can be exported. Confirmation prompts read a `y/N` answer from the
//! terminal, or answer a fixed value when the view is non-interactive.

use std::io::{BufRead, Write};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use colored::Colorize;

use crate::client::view::{Control, Field, View};
use crate::error::Result;
use crate::render::{RenderedTurn, Role, TranscriptSink};

/// Prints controller output to the terminal
#[derive(Debug, Default)]
pub struct TerminalView {
    interactive: bool,
    nodes: Mutex<Vec<RenderedTurn>>,
}

impl TerminalView {
    /// A view that asks the user on `confirm`
    pub fn interactive() -> Self {
        Self {
            interactive: true,
            nodes: Mutex::default(),
        }
    }

    /// A view that declines every `confirm`, for one-shot commands
    pub fn batch() -> Self {
        Self::default()
    }

    fn nodes(&self) -> MutexGuard<'_, Vec<RenderedTurn>> {
        self.nodes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Number of turns shown so far
    pub fn turn_count(&self) -> usize {
        self.nodes().len()
    }

    /// Render every shown turn into a standalone HTML page
    pub fn transcript_html(&self) -> String {
        let body: String = self
            .nodes()
            .iter()
            .map(|node| format!("    {}\n", node.html))
            .collect();
        format!(
            "<!DOCTYPE html>\n<html>\n<head>\n  <meta charset=\"utf-8\">\n  <title>ragbridge transcript</title>\n</head>\n<body>\n  <div id=\"chat-messages\">\n{}  </div>\n</body>\n</html>\n",
            body
        )
    }

    /// Write [`transcript_html`](Self::transcript_html) to `path`
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be written
    pub fn export_transcript(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.transcript_html())?;
        tracing::info!("Wrote transcript to {}", path.display());
        Ok(())
    }
}

impl TranscriptSink for TerminalView {
    fn append_node(&self, node: &RenderedTurn) {
        match node.turn.role {
            Role::User => println!("{} {}", "you>".cyan().bold(), node.turn.content),
            Role::Assistant => println!("\n{}\n{}\n", "assistant>".green().bold(), node.turn.content),
        }
        self.nodes().push(node.clone());
    }

    fn scroll_to_latest(&self) {
        let _ = std::io::stdout().flush();
    }
}

impl View for TerminalView {
    fn set_status(&self, text: &str) {
        let line = if text.starts_with("Error") || text.starts_with("Only") {
            text.red().to_string()
        } else if text.ends_with("successfully!") {
            text.green().to_string()
        } else {
            text.yellow().to_string()
        };
        println!("{}", line);
    }

    fn set_enabled(&self, control: Control, enabled: bool) {
        tracing::trace!("{:?} enabled={}", control, enabled);
    }

    fn alert(&self, message: &str) {
        eprintln!("{}", message.red().bold());
    }

    fn confirm(&self, prompt: &str) -> bool {
        if !self.interactive {
            return false;
        }
        print!("{} [y/N] ", prompt);
        let _ = std::io::stdout().flush();

        let mut answer = String::new();
        match std::io::stdin().lock().read_line(&mut answer) {
            Ok(_) => matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"),
            Err(e) => {
                tracing::warn!("Could not read confirmation: {}", e);
                false
            }
        }
    }

    fn set_field(&self, field: Field, value: &str) {
        match field {
            Field::Credential => tracing::debug!("API key field filled"),
            other => tracing::debug!("{:?} field set to {:?}", other, value),
        }
    }
}
