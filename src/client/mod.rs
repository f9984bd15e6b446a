//! Chat and ingestion client
//!
//! The client half of ragbridge: an [`InteractionController`] that drives a
//! [`View`] and talks to the gateway through a [`Transport`]. The controller
//! is UI-agnostic; the terminal front end in `commands` and the tests both
//! supply their own views.

pub mod controller;
pub mod credentials;
pub mod error;
pub mod events;
pub mod flag;
pub mod transport;
pub mod upload;
pub mod view;

pub use controller::{FormState, IngestionSource, InteractionController, Outcome};
pub use credentials::{CredentialStore, KeyringCredentialStore, MemoryCredentialStore};
pub use error::{ErrorKind, OperationError};
pub use events::{Binding, EventBindings, EventName, Handler, Key, KeyPress, Trigger, UiEvent};
pub use flag::{FlagGuard, OperationFlag};
pub use transport::http::HttpTransport;
pub use transport::{HttpReply, Transport};
pub use upload::{ExtensionPolicy, FileHandle, UploadBatch};
pub use view::{Control, Field, RecordingView, View};
