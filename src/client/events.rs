//! Declarative UI event bindings
//!
//! UI events are bound to controller handlers once, through an
//! [`EventBindings`] table. The table is plain data, so the mapping can be
//! inspected and tested without any UI present.

use std::fmt;

/// Key identity for key-press events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// Enter / Return
    Enter,
    /// A printable character
    Char(char),
}

/// A key press in the message input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPress {
    /// Key pressed
    pub key: Key,
    /// Shift held
    pub shift: bool,
    /// Control held
    pub ctrl: bool,
    /// Alt/Option held
    pub alt: bool,
    /// Meta/Command held
    pub meta: bool,
}

impl KeyPress {
    /// An unmodified key press
    pub fn plain(key: Key) -> Self {
        Self {
            key,
            shift: false,
            ctrl: false,
            alt: false,
            meta: false,
        }
    }

    /// An unmodified Enter
    pub fn enter() -> Self {
        Self::plain(Key::Enter)
    }

    /// The same key with Shift held
    pub fn with_shift(mut self) -> Self {
        self.shift = true;
        self
    }

    /// Whether this is Enter with no modifier held
    ///
    /// # Examples
    ///
    /// ```
    /// use ragbridge::client::KeyPress;
    ///
    /// assert!(KeyPress::enter().is_plain_enter());
    /// assert!(!KeyPress::enter().with_shift().is_plain_enter());
    /// ```
    pub fn is_plain_enter(&self) -> bool {
        self.key == Key::Enter && !(self.shift || self.ctrl || self.alt || self.meta)
    }
}

/// Named UI events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventName {
    /// Page (or terminal session) finished loading
    PageLoad,
    /// Ingestion button clicked
    IngestClick,
    /// Send button clicked
    SendClick,
    /// Key pressed in the message input
    MessageKeyPress,
    /// Credential field changed by the user
    CredentialChange,
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::PageLoad => "load",
            Self::IngestClick => "ingest:click",
            Self::SendClick => "send:click",
            Self::MessageKeyPress => "message:keypress",
            Self::CredentialChange => "credential:change",
        };
        write!(f, "{}", name)
    }
}

/// A UI event with its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiEvent {
    /// See [`EventName::PageLoad`]
    PageLoaded,
    /// See [`EventName::IngestClick`]
    IngestClicked,
    /// See [`EventName::SendClick`]
    SendClicked,
    /// See [`EventName::MessageKeyPress`]
    MessageKey(KeyPress),
    /// See [`EventName::CredentialChange`]
    CredentialChanged,
}

impl UiEvent {
    /// Name the event is bound under
    pub fn name(&self) -> EventName {
        match self {
            Self::PageLoaded => EventName::PageLoad,
            Self::IngestClicked => EventName::IngestClick,
            Self::SendClicked => EventName::SendClick,
            Self::MessageKey(_) => EventName::MessageKeyPress,
            Self::CredentialChanged => EventName::CredentialChange,
        }
    }
}

/// Controller entry points events can be bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Handler {
    /// Pre-fill the credential from the durable store
    RestoreCredential,
    /// Ask whether to persist the credential
    OfferCredentialSave,
    /// Start an ingestion for the active flow
    SubmitIngestion,
    /// Send the composed message
    SubmitChatTurn,
}

/// Extra condition an event must satisfy to fire its handler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Every occurrence fires
    Always,
    /// Only an unmodified Enter key press fires
    PlainEnter,
}

impl Trigger {
    fn matches(&self, event: &UiEvent) -> bool {
        match self {
            Self::Always => true,
            Self::PlainEnter => matches!(event, UiEvent::MessageKey(key) if key.is_plain_enter()),
        }
    }
}

/// One row of the binding table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Binding {
    /// Event name
    pub event: EventName,
    /// Condition on the event payload
    pub trigger: Trigger,
    /// Handler invoked
    pub handler: Handler,
}

/// Event-to-handler registration table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventBindings {
    bindings: Vec<Binding>,
}

impl Default for EventBindings {
    fn default() -> Self {
        Self::standard()
    }
}

impl EventBindings {
    /// An empty table
    pub fn empty() -> Self {
        Self {
            bindings: Vec::new(),
        }
    }

    /// The page's standard wiring
    pub fn standard() -> Self {
        Self::empty()
            .bind(EventName::PageLoad, Trigger::Always, Handler::RestoreCredential)
            .bind(EventName::IngestClick, Trigger::Always, Handler::SubmitIngestion)
            .bind(EventName::SendClick, Trigger::Always, Handler::SubmitChatTurn)
            .bind(
                EventName::MessageKeyPress,
                Trigger::PlainEnter,
                Handler::SubmitChatTurn,
            )
            .bind(
                EventName::CredentialChange,
                Trigger::Always,
                Handler::OfferCredentialSave,
            )
    }

    /// Add a binding
    pub fn bind(mut self, event: EventName, trigger: Trigger, handler: Handler) -> Self {
        self.bindings.push(Binding {
            event,
            trigger,
            handler,
        });
        self
    }

    /// All bindings in registration order
    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    /// Handler for `event`, if a binding matches
    ///
    /// The first matching binding wins.
    pub fn resolve(&self, event: &UiEvent) -> Option<Handler> {
        let name = event.name();
        self.bindings
            .iter()
            .find(|b| b.event == name && b.trigger.matches(event))
            .map(|b| b.handler)
    }
}
