//! UI surface driven by the interaction controller
//!
//! The controller never touches a concrete UI. It reports status text,
//! control state, alerts and field changes through [`View`], and inserts
//! rendered turns through the [`TranscriptSink`] supertrait.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use crate::render::{RenderedTurn, TranscriptSink};

/// Submit controls the controller enables and disables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Control {
    /// Upload / process-repository button
    IngestButton,
    /// Send-message button
    SendButton,
    /// Message text input
    MessageInput,
}

/// Input fields whose displayed value the controller may change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    /// Chat message being composed
    Message,
    /// Selected files
    Files,
    /// API key
    Credential,
}

/// Everything the controller needs from the page
pub trait View: TranscriptSink {
    /// Replace the ingestion status text
    fn set_status(&self, text: &str);

    /// Enable or disable a submit control
    fn set_enabled(&self, control: Control, enabled: bool);

    /// Show a blocking notice to the user
    fn alert(&self, message: &str);

    /// Ask the user a yes/no question
    fn confirm(&self, prompt: &str) -> bool;

    /// Reflect a controller-side change of a field value
    fn set_field(&self, field: Field, value: &str);
}

/// [`View`] that records every call, for headless use and tests
///
/// `confirm` answers with a fixed value chosen at construction.
#[derive(Debug, Default)]
pub struct RecordingView {
    confirm_answer: bool,
    state: Mutex<RecordedState>,
}

#[derive(Debug, Default)]
struct RecordedState {
    status_history: Vec<String>,
    disabled: HashSet<Control>,
    alerts: Vec<String>,
    confirm_prompts: Vec<String>,
    nodes: Vec<RenderedTurn>,
    scrolls: usize,
    fields: HashMap<Field, String>,
}

impl RecordingView {
    /// A view whose `confirm` always declines
    pub fn new() -> Self {
        Self::default()
    }

    /// A view whose `confirm` always returns `answer`
    pub fn confirming(answer: bool) -> Self {
        Self {
            confirm_answer: answer,
            state: Mutex::default(),
        }
    }

    fn state(&self) -> MutexGuard<'_, RecordedState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Current status text
    pub fn status(&self) -> String {
        self.state().status_history.last().cloned().unwrap_or_default()
    }

    /// Every status text written, oldest first
    pub fn status_history(&self) -> Vec<String> {
        self.state().status_history.clone()
    }

    /// Whether `control` is currently enabled
    pub fn is_enabled(&self, control: Control) -> bool {
        !self.state().disabled.contains(&control)
    }

    /// Alerts shown, oldest first
    pub fn alerts(&self) -> Vec<String> {
        self.state().alerts.clone()
    }

    /// Confirmation prompts shown, oldest first
    pub fn confirm_prompts(&self) -> Vec<String> {
        self.state().confirm_prompts.clone()
    }

    /// Rendered nodes in transcript order
    pub fn nodes(&self) -> Vec<RenderedTurn> {
        self.state().nodes.clone()
    }

    /// Number of scroll-to-latest calls
    pub fn scroll_count(&self) -> usize {
        self.state().scrolls
    }

    /// Last value written to `field`
    pub fn field(&self, field: Field) -> Option<String> {
        self.state().fields.get(&field).cloned()
    }
}

impl TranscriptSink for RecordingView {
    fn append_node(&self, node: &RenderedTurn) {
        self.state().nodes.push(node.clone());
    }

    fn scroll_to_latest(&self) {
        self.state().scrolls += 1;
    }
}

impl View for RecordingView {
    fn set_status(&self, text: &str) {
        self.state().status_history.push(text.to_string());
    }

    fn set_enabled(&self, control: Control, enabled: bool) {
        let mut state = self.state();
        if enabled {
            state.disabled.remove(&control);
        } else {
            state.disabled.insert(control);
        }
    }

    fn alert(&self, message: &str) {
        self.state().alerts.push(message.to_string());
    }

    fn confirm(&self, prompt: &str) -> bool {
        self.state().confirm_prompts.push(prompt.to_string());
        self.confirm_answer
    }

    fn set_field(&self, field: Field, value: &str) {
        self.state().fields.insert(field, value.to_string());
    }
}
