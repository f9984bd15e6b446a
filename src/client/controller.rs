//! Interaction controller
//!
//! [`InteractionController`] owns the page state: the form fields, the
//! transcript, and one [`OperationFlag`] per operation. It runs two
//! operations, ingestion and chat, each of which:
//!
//! 1. is ignored while its own flag is set,
//! 2. validates its inputs before any network call,
//! 3. sets its flag and disables its controls while the request is in flight,
//! 4. converts every failure into an [`OperationError`] shown through the
//!    [`View`], and
//! 5. clears its flag and re-enables its controls on every exit path.
//!
//! The two flags are independent: an ingestion and a chat turn may be in
//! flight at the same time.

use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde_json::{Map, Value};

use crate::client::credentials::CredentialStore;
use crate::client::error::OperationError;
use crate::client::events::{EventBindings, Handler, UiEvent};
use crate::client::flag::{FlagGuard, OperationFlag};
use crate::client::transport::{HttpReply, Transport};
use crate::client::upload::{ExtensionPolicy, FileHandle, UploadBatch};
use crate::client::view::{Control, Field, View};
use crate::config::{ClientConfig, Flow, FlowEndpoints};
use crate::render::{ChatTurn, Renderer};

const REQUIRED_FIELDS: &str = "Please fill in all required fields";
const SAVE_CREDENTIAL_PROMPT: &str = "Would you like to save the API key for future sessions?";

/// What an ingestion ingests
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestionSource {
    /// A code repository, processed by the backend from its URL
    Repository {
        /// Repository URL
        url: String,
    },
    /// Documents uploaded as multipart parts
    Documents {
        /// Selected files
        files: Vec<FileHandle>,
    },
}

impl IngestionSource {
    fn progress_status(&self) -> &'static str {
        match self {
            Self::Repository { .. } => "Processing repository...",
            Self::Documents { .. } => "Uploading files...",
        }
    }

    fn success_status(&self) -> &'static str {
        match self {
            Self::Repository { .. } => "Repository processed successfully!",
            Self::Documents { .. } => "Files uploaded successfully!",
        }
    }

    fn confirmation_turn(&self) -> &'static str {
        match self {
            Self::Repository { .. } => {
                "Repository processed successfully! You can now ask questions about the code."
            }
            Self::Documents { .. } => {
                "Documents uploaded successfully! You can now ask questions about them."
            }
        }
    }

    fn failure_prefix(&self) -> &'static str {
        match self {
            Self::Repository { .. } => "Error processing repository",
            Self::Documents { .. } => "Error uploading files",
        }
    }
}

/// Result of one controller operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The request completed and its result was shown
    Succeeded,
    /// Validation or the request failed; the error was shown
    Failed(OperationError),
    /// The same operation was already in flight; nothing happened
    Busy,
}

impl Outcome {
    /// Whether the operation succeeded
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

/// Values of the page's input fields
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormState {
    /// Session identifier
    pub session_id: String,
    /// API key
    pub credential: String,
    /// Message being composed
    pub message: String,
    /// Repository URL (repository flow)
    pub repo_url: String,
    /// Selected files (document flow)
    pub files: Vec<FileHandle>,
}

enum IngestionRequest {
    Json(Value),
    Multipart(UploadBatch),
}

/// An in-flight operation: holds the flag and re-enables controls on drop
struct Pending<'a> {
    flag: Option<FlagGuard<'a>>,
    view: &'a dyn View,
    controls: &'static [Control],
}

impl Drop for Pending<'_> {
    fn drop(&mut self) {
        // Flag first, so an enabled control never sits on a set flag
        self.flag.take();
        for control in self.controls {
            self.view.set_enabled(*control, true);
        }
    }
}

/// Per-page state machine for ingestion and chat
pub struct InteractionController {
    flow: Flow,
    endpoints: FlowEndpoints,
    credential_key: String,
    credential_field: String,
    policy: ExtensionPolicy,
    transport: Arc<dyn Transport>,
    view: Arc<dyn View>,
    store: Arc<dyn CredentialStore>,
    renderer: Renderer,
    bindings: EventBindings,
    form: RwLock<FormState>,
    transcript: Mutex<Vec<ChatTurn>>,
    ingesting: OperationFlag,
    sending: OperationFlag,
}

impl std::fmt::Debug for InteractionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InteractionController")
            .field("flow", &self.flow)
            .field("endpoints", &self.endpoints)
            .field("ingesting", &self.ingesting.is_set())
            .field("sending", &self.sending.is_set())
            .finish_non_exhaustive()
    }
}

impl InteractionController {
    /// Create a controller for `flow`
    ///
    /// # Examples
    ///
    /// ```
    /// use std::sync::Arc;
    /// use ragbridge::client::transport::fake::FakeTransport;
    /// use ragbridge::client::{InteractionController, MemoryCredentialStore, RecordingView};
    /// use ragbridge::config::{ClientConfig, Flow};
    ///
    /// let controller = InteractionController::new(
    ///     &ClientConfig::default(),
    ///     Flow::Documents,
    ///     Arc::new(FakeTransport::new()),
    ///     Arc::new(RecordingView::new()),
    ///     Arc::new(MemoryCredentialStore::new()),
    /// );
    /// assert!(!controller.is_sending());
    /// ```
    pub fn new(
        config: &ClientConfig,
        flow: Flow,
        transport: Arc<dyn Transport>,
        view: Arc<dyn View>,
        store: Arc<dyn CredentialStore>,
    ) -> Self {
        Self {
            flow,
            endpoints: config.endpoints(flow).clone(),
            credential_key: config.credential_key.clone(),
            credential_field: config.credential_field.clone(),
            policy: ExtensionPolicy::new(&config.allowed_extensions),
            transport,
            view,
            store,
            renderer: Renderer::new(),
            bindings: EventBindings::standard(),
            form: RwLock::new(FormState::default()),
            transcript: Mutex::new(Vec::new()),
            ingesting: OperationFlag::new("uploading/processing"),
            sending: OperationFlag::new("sending"),
        }
    }

    /// Active flow
    pub fn flow(&self) -> Flow {
        self.flow
    }

    /// Whether an ingestion is in flight
    pub fn is_ingesting(&self) -> bool {
        self.ingesting.is_set()
    }

    /// Whether a chat turn is in flight
    pub fn is_sending(&self) -> bool {
        self.sending.is_set()
    }

    /// Snapshot of the form fields
    pub fn form(&self) -> FormState {
        self.form_read().clone()
    }

    /// Snapshot of the transcript
    pub fn transcript(&self) -> Vec<ChatTurn> {
        self.transcript_lock().clone()
    }

    /// User edited the session id
    pub fn set_session_id(&self, session_id: &str) {
        self.form_write().session_id = session_id.to_string();
    }

    /// User edited the API key
    pub fn set_credential(&self, credential: &str) {
        self.form_write().credential = credential.to_string();
    }

    /// User edited the message
    pub fn set_message(&self, message: &str) {
        self.form_write().message = message.to_string();
    }

    /// User edited the repository URL
    pub fn set_repo_url(&self, url: &str) {
        self.form_write().repo_url = url.to_string();
    }

    /// User selected files
    pub fn select_files(&self, files: Vec<FileHandle>) {
        self.form_write().files = files;
    }

    /// Route a UI event to its bound handler
    ///
    /// Returns the outcome for operation handlers, `None` when the event is
    /// unbound or its handler is not an operation.
    pub async fn dispatch(&self, event: UiEvent) -> Option<Outcome> {
        let Some(handler) = self.bindings.resolve(&event) else {
            tracing::trace!("No handler bound for {}", event.name());
            return None;
        };
        tracing::debug!("Dispatching {} to {:?}", event.name(), handler);

        match handler {
            Handler::RestoreCredential => {
                self.restore_credential();
                None
            }
            Handler::OfferCredentialSave => {
                self.offer_credential_save();
                None
            }
            Handler::SubmitIngestion => {
                let source = self.current_ingestion_source();
                Some(self.submit_ingestion(source).await)
            }
            Handler::SubmitChatTurn => {
                let message = self.form_read().message.clone();
                Some(self.submit_chat_turn(&message).await)
            }
        }
    }

    /// Pre-fill the credential from the durable store, if one is saved
    ///
    /// Returns whether a value was restored.
    pub fn restore_credential(&self) -> bool {
        match self.store.load(&self.credential_key) {
            Ok(Some(saved)) if !saved.is_empty() => {
                self.form_write().credential = saved.clone();
                self.view.set_field(Field::Credential, &saved);
                tracing::info!("Restored saved API key");
                true
            }
            Ok(_) => {
                tracing::debug!("No saved API key");
                false
            }
            Err(e) => {
                tracing::warn!("Could not read saved API key: {}", e);
                false
            }
        }
    }

    /// Persist the current credential if the user confirms
    ///
    /// Returns whether the credential was written.
    pub fn offer_credential_save(&self) -> bool {
        let credential = self.form_read().credential.clone();
        if credential.is_empty() {
            return false;
        }
        if !self.view.confirm(SAVE_CREDENTIAL_PROMPT) {
            tracing::debug!("User declined to save API key");
            return false;
        }

        match self.store.save(&self.credential_key, &credential) {
            Ok(()) => {
                tracing::info!("Saved API key under '{}'", self.credential_key);
                true
            }
            Err(e) => {
                tracing::warn!("Could not save API key: {}", e);
                self.view.alert(&format!("Could not save API key: {}", e));
                false
            }
        }
    }

    /// Make content available to the backend for the current session
    ///
    /// Validation failures are reported in the status area without any
    /// network call. On success a confirmation turn is appended.
    pub async fn submit_ingestion(&self, source: IngestionSource) -> Outcome {
        if self.ingesting.is_set() {
            tracing::debug!("Ingestion already in flight, ignoring");
            return Outcome::Busy;
        }

        let session_id = self.form_read().session_id.trim().to_string();
        let request = match self.prepare_ingestion(&source, &session_id) {
            Ok(request) => request,
            Err(error) => {
                tracing::warn!("Ingestion rejected: {}", error.message);
                self.view.set_status(&error.message);
                return Outcome::Failed(error);
            }
        };

        let Some(_pending) = self.begin(&self.ingesting, &[Control::IngestButton]) else {
            return Outcome::Busy;
        };
        self.view.set_status(source.progress_status());
        tracing::info!(
            "Submitting {} ingestion for session {}",
            self.flow,
            session_id
        );

        let path = self.endpoints.ingest_path.as_str();
        let sent = match &request {
            IngestionRequest::Json(body) => self.transport.post_json(path, body).await,
            IngestionRequest::Multipart(batch) => self.transport.post_multipart(path, batch).await,
        };
        let result = sent
            .map_err(OperationError::from)
            .and_then(decode_ingestion);

        match result {
            Ok(payload) => {
                tracing::debug!("Ingestion response: {}", payload);
                self.view.set_status(source.success_status());
                if matches!(source, IngestionSource::Documents { .. }) {
                    self.form_write().files.clear();
                    self.view.set_field(Field::Files, "");
                }
                self.append_turn(ChatTurn::assistant(source.confirmation_turn()));
                Outcome::Succeeded
            }
            Err(error) => {
                tracing::error!("Ingestion failed ({}): {}", error.kind, error.message);
                self.view
                    .set_status(&format!("{}: {}", source.failure_prefix(), error.message));
                Outcome::Failed(error)
            }
        }
    }

    /// Send one chat message for the current session
    ///
    /// The user's turn is appended before the request resolves; exactly one
    /// assistant turn (the answer or an error description) follows it.
    pub async fn submit_chat_turn(&self, message: &str) -> Outcome {
        if self.sending.is_set() {
            tracing::debug!("Send already in flight, ignoring");
            return Outcome::Busy;
        }

        let message = message.trim().to_string();
        let (session_id, credential) = {
            let form = self.form_read();
            (
                form.session_id.trim().to_string(),
                form.credential.trim().to_string(),
            )
        };
        if message.is_empty() || session_id.is_empty() || credential.is_empty() {
            self.view.alert(REQUIRED_FIELDS);
            return Outcome::Failed(OperationError::validation(REQUIRED_FIELDS));
        }

        let Some(_pending) = self.begin(&self.sending, &[Control::SendButton, Control::MessageInput])
        else {
            return Outcome::Busy;
        };

        self.append_turn(ChatTurn::user(message.clone()));

        let mut body = Map::new();
        body.insert("session_id".to_string(), Value::String(session_id.clone()));
        body.insert("message".to_string(), Value::String(message));
        body.insert(self.credential_field.clone(), Value::String(credential));
        let body = Value::Object(body);

        tracing::info!("Sending chat turn for session {}", session_id);
        let result = self
            .transport
            .post_json(&self.endpoints.chat_path, &body)
            .await
            .map_err(OperationError::from)
            .and_then(decode_answer);

        match result {
            Ok(answer) => {
                tracing::debug!("Received answer ({} chars)", answer.len());
                self.append_turn(ChatTurn::assistant(answer));
                self.form_write().message.clear();
                self.view.set_field(Field::Message, "");
                Outcome::Succeeded
            }
            Err(error) => {
                tracing::error!("Chat turn failed ({}): {}", error.kind, error.message);
                self.append_turn(ChatTurn::assistant(format!("Error: {}", error.message)));
                Outcome::Failed(error)
            }
        }
    }

    fn current_ingestion_source(&self) -> IngestionSource {
        let form = self.form_read();
        match self.flow {
            Flow::Repository => IngestionSource::Repository {
                url: form.repo_url.clone(),
            },
            Flow::Documents => IngestionSource::Documents {
                files: form.files.clone(),
            },
        }
    }

    fn prepare_ingestion(
        &self,
        source: &IngestionSource,
        session_id: &str,
    ) -> Result<IngestionRequest, OperationError> {
        match source {
            IngestionSource::Repository { url } => {
                let url = url.trim();
                if url.is_empty() || session_id.is_empty() {
                    return Err(OperationError::validation(REQUIRED_FIELDS));
                }
                Ok(IngestionRequest::Json(serde_json::json!({
                    "url": url,
                    "session_id": session_id,
                })))
            }
            IngestionSource::Documents { files } => {
                if files.is_empty() {
                    return Err(OperationError::validation("Please select files to upload"));
                }
                if session_id.is_empty() {
                    return Err(OperationError::validation("Please enter a session ID"));
                }
                UploadBatch::build(session_id, files.clone(), &self.policy)
                    .map(IngestionRequest::Multipart)
            }
        }
    }

    fn begin<'a>(
        &'a self,
        flag: &'a OperationFlag,
        controls: &'static [Control],
    ) -> Option<Pending<'a>> {
        let Some(guard) = flag.try_acquire() else {
            tracing::debug!("{} flag already set, ignoring", flag.name());
            return None;
        };
        for control in controls {
            self.view.set_enabled(*control, false);
        }
        Some(Pending {
            flag: Some(guard),
            view: self.view.as_ref(),
            controls,
        })
    }

    fn append_turn(&self, turn: ChatTurn) {
        self.renderer.append(self.view.as_ref(), &turn);
        self.transcript_lock().push(turn);
    }

    fn form_read(&self) -> RwLockReadGuard<'_, FormState> {
        self.form
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn form_write(&self) -> RwLockWriteGuard<'_, FormState> {
        self.form
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn transcript_lock(&self) -> MutexGuard<'_, Vec<ChatTurn>> {
        self.transcript
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn decode_ingestion(reply: HttpReply) -> Result<Value, OperationError> {
    if !reply.is_success() {
        return Err(OperationError::from_failed_reply(&reply));
    }
    serde_json::from_str(&reply.body).map_err(|_| OperationError::invalid_body(&reply.body))
}

fn decode_answer(reply: HttpReply) -> Result<String, OperationError> {
    if !reply.is_success() {
        return Err(OperationError::from_failed_reply(&reply));
    }
    let payload: Value =
        serde_json::from_str(&reply.body).map_err(|_| OperationError::invalid_body(&reply.body))?;
    match payload.get("answer") {
        Some(Value::String(answer)) => Ok(answer.clone()),
        _ => Err(OperationError::transport(
            format!("Response has no answer: {}", reply.body),
            Some(reply.body),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::credentials::MemoryCredentialStore;
    use crate::client::error::ErrorKind;
    use crate::client::events::KeyPress;
    use crate::client::transport::fake::{FakeTransport, RecordedRequest};
    use crate::client::view::RecordingView;
    use crate::render::Role;

    struct Harness {
        controller: Arc<InteractionController>,
        transport: Arc<FakeTransport>,
        view: Arc<RecordingView>,
        store: Arc<MemoryCredentialStore>,
    }

    fn harness_with(flow: Flow, transport: FakeTransport, view: RecordingView) -> Harness {
        let transport = Arc::new(transport);
        let view = Arc::new(view);
        let store = Arc::new(MemoryCredentialStore::new());
        let controller = Arc::new(InteractionController::new(
            &ClientConfig::default(),
            flow,
            transport.clone(),
            view.clone(),
            store.clone(),
        ));
        Harness {
            controller,
            transport,
            view,
            store,
        }
    }

    fn harness(flow: Flow) -> Harness {
        harness_with(flow, FakeTransport::new(), RecordingView::new())
    }

    fn ready_for_chat(h: &Harness) {
        h.controller.set_session_id("s1");
        h.controller.set_credential("k1");
    }

    async fn wait_for_requests(transport: &FakeTransport, count: usize) {
        while transport.requests().len() < count {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_chat_success_appends_user_then_assistant() {
        let h = harness(Flow::Documents);
        ready_for_chat(&h);
        h.controller.set_message("What does main.py do?");
        h.transport
            .push_reply(200, r#"{"answer":"It is the entry point."}"#);

        let outcome = h.controller.dispatch(UiEvent::SendClicked).await;
        assert_eq!(outcome, Some(Outcome::Succeeded));

        assert_eq!(
            h.controller.transcript(),
            vec![
                ChatTurn::user("What does main.py do?"),
                ChatTurn::assistant("It is the entry point.")
            ]
        );
        let nodes = h.view.nodes();
        assert_eq!(nodes.len(), 2);
        assert!(nodes[1].html.contains("It is the entry point."));
        assert_eq!(h.controller.form().message, "");
        assert_eq!(h.view.field(Field::Message).as_deref(), Some(""));
        assert!(!h.controller.is_sending());
        assert!(h.view.is_enabled(Control::SendButton));
        assert!(h.view.is_enabled(Control::MessageInput));
    }

    #[tokio::test]
    async fn test_chat_request_body_carries_credential_field() {
        let h = harness(Flow::Documents);
        ready_for_chat(&h);
        h.transport.push_reply(200, r#"{"answer":"ok"}"#);

        h.controller.submit_chat_turn("  hello  ").await;

        let requests = h.transport.requests();
        assert_eq!(requests.len(), 1);
        match &requests[0] {
            RecordedRequest::Json { path, body } => {
                assert_eq!(path, "/api/chat");
                assert_eq!(
                    body,
                    &serde_json::json!({
                        "session_id": "s1",
                        "message": "hello",
                        "groq_api_key": "k1"
                    })
                );
            }
            other => panic!("unexpected request: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_chat_missing_fields_alerts_without_request() {
        let h = harness(Flow::Documents);
        h.controller.set_session_id("s1");

        let outcome = h.controller.submit_chat_turn("hello").await;

        assert!(matches!(outcome, Outcome::Failed(ref e) if e.kind == ErrorKind::Validation));
        assert_eq!(h.view.alerts(), vec![REQUIRED_FIELDS.to_string()]);
        assert!(h.transport.requests().is_empty());
        assert!(h.controller.transcript().is_empty());
    }

    #[tokio::test]
    async fn test_chat_blank_message_is_rejected() {
        let h = harness(Flow::Documents);
        ready_for_chat(&h);
        let outcome = h.controller.submit_chat_turn("   ").await;
        assert!(matches!(outcome, Outcome::Failed(_)));
        assert!(h.transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_chat_flag_held_while_in_flight_and_second_send_ignored() {
        let (transport, gate) = FakeTransport::gated();
        let h = harness_with(Flow::Documents, transport, RecordingView::new());
        ready_for_chat(&h);
        h.transport.push_reply(200, r#"{"answer":"first"}"#);
        assert!(!h.controller.is_sending());

        let first = {
            let controller = Arc::clone(&h.controller);
            tokio::spawn(async move { controller.submit_chat_turn("one").await })
        };
        wait_for_requests(&h.transport, 1).await;

        assert!(h.controller.is_sending());
        assert!(!h.view.is_enabled(Control::SendButton));
        assert!(!h.view.is_enabled(Control::MessageInput));

        let second = h.controller.submit_chat_turn("two").await;
        assert_eq!(second, Outcome::Busy);
        assert_eq!(h.transport.requests().len(), 1);

        gate.notify_one();
        assert_eq!(first.await.unwrap(), Outcome::Succeeded);
        assert!(!h.controller.is_sending());
        assert!(h.view.is_enabled(Control::SendButton));

        let roles: Vec<Role> = h.controller.transcript().iter().map(|t| t.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant]);
    }

    #[tokio::test]
    async fn test_chat_transport_failure_becomes_error_turn() {
        let h = harness(Flow::Documents);
        ready_for_chat(&h);
        h.transport.push_failure("connection refused");

        let outcome = h.controller.submit_chat_turn("hi").await;

        let Outcome::Failed(error) = outcome else {
            panic!("expected failure");
        };
        assert_eq!(error.kind, ErrorKind::Transport);
        let transcript = h.controller.transcript();
        assert_eq!(transcript.len(), 2);
        assert!(transcript[1].content.starts_with("Error: "));
        assert!(transcript[1].content.contains("connection refused"));
        assert_eq!(h.controller.form().message, "");
        assert!(!h.controller.is_sending());
    }

    #[tokio::test]
    async fn test_chat_failure_keeps_composed_message() {
        let h = harness(Flow::Documents);
        ready_for_chat(&h);
        h.controller.set_message("keep me");
        h.transport.push_reply(500, r#"{"detail":"Error with GitHub chat: boom"}"#);

        h.controller.dispatch(UiEvent::SendClicked).await;

        assert_eq!(h.controller.form().message, "keep me");
        assert_eq!(
            h.controller.transcript()[1].content,
            "Error: Error with GitHub chat: boom"
        );
    }

    #[tokio::test]
    async fn test_chat_malformed_body_includes_raw_text() {
        let h = harness(Flow::Documents);
        ready_for_chat(&h);
        h.transport.push_reply(200, "<html>proxy page</html>");

        let outcome = h.controller.submit_chat_turn("hi").await;

        let Outcome::Failed(error) = outcome else {
            panic!("expected failure");
        };
        assert_eq!(error.raw.as_deref(), Some("<html>proxy page</html>"));
        assert!(h.controller.transcript()[1]
            .content
            .contains("Invalid JSON response: <html>proxy page</html>"));
    }

    #[tokio::test]
    async fn test_chat_missing_answer_is_error() {
        let h = harness(Flow::Documents);
        ready_for_chat(&h);
        h.transport.push_reply(200, r#"{"chat_history":[]}"#);
        let outcome = h.controller.submit_chat_turn("hi").await;
        assert!(matches!(outcome, Outcome::Failed(ref e) if e.kind == ErrorKind::Transport));
    }

    #[tokio::test]
    async fn test_enter_key_submits_but_shift_enter_does_not() {
        let h = harness(Flow::Documents);
        ready_for_chat(&h);
        h.controller.set_message("hello");
        h.transport.push_reply(200, r#"{"answer":"hi"}"#);

        let ignored = h
            .controller
            .dispatch(UiEvent::MessageKey(KeyPress::enter().with_shift()))
            .await;
        assert_eq!(ignored, None);
        assert!(h.transport.requests().is_empty());

        let sent = h
            .controller
            .dispatch(UiEvent::MessageKey(KeyPress::enter()))
            .await;
        assert_eq!(sent, Some(Outcome::Succeeded));
        assert_eq!(h.transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_document_upload_success() {
        let h = harness(Flow::Documents);
        h.controller.set_session_id("s1");
        h.controller.select_files(vec![
            FileHandle::new("a.pdf", b"%PDF-a".to_vec()),
            FileHandle::new("B.PDF", b"%PDF-b".to_vec()),
        ]);
        h.transport
            .push_reply(200, r#"{"message":"Files processed successfully"}"#);

        let outcome = h.controller.dispatch(UiEvent::IngestClicked).await;

        assert_eq!(outcome, Some(Outcome::Succeeded));
        assert_eq!(
            h.view.status_history(),
            vec!["Uploading files...", "Files uploaded successfully!"]
        );
        match &h.transport.requests()[0] {
            RecordedRequest::Multipart { path, batch } => {
                assert_eq!(path, "/api/upload");
                assert_eq!(batch.session_id, "s1");
                assert_eq!(batch.file_names(), vec!["a.pdf", "B.PDF"]);
            }
            other => panic!("unexpected request: {:?}", other),
        }
        assert_eq!(h.controller.transcript().len(), 1);
        assert!(h.controller.form().files.is_empty());
        assert_eq!(h.view.field(Field::Files).as_deref(), Some(""));
        assert!(h.view.is_enabled(Control::IngestButton));
        assert!(!h.controller.is_ingesting());
    }

    #[tokio::test]
    async fn test_disallowed_extension_voids_batch() {
        let h = harness(Flow::Documents);
        h.controller.set_session_id("s1");
        h.controller.select_files(vec![
            FileHandle::new("a.pdf", b"%PDF".to_vec()),
            FileHandle::new("tool.exe", b"MZ".to_vec()),
        ]);

        let outcome = h.controller.dispatch(UiEvent::IngestClicked).await;

        assert!(matches!(outcome, Some(Outcome::Failed(ref e)) if e.kind == ErrorKind::Validation));
        assert!(h.transport.requests().is_empty());
        assert_eq!(
            h.view.status(),
            "Only PDF files are allowed (rejected: tool.exe)"
        );
        assert!(h.controller.transcript().is_empty());
        assert_eq!(h.controller.form().files.len(), 2);
    }

    #[tokio::test]
    async fn test_upload_validation_messages() {
        let h = harness(Flow::Documents);
        h.controller.set_session_id("s1");
        h.controller.dispatch(UiEvent::IngestClicked).await;
        assert_eq!(h.view.status(), "Please select files to upload");

        h.controller.set_session_id("");
        h.controller
            .select_files(vec![FileHandle::new("a.pdf", b"%PDF".to_vec())]);
        h.controller.dispatch(UiEvent::IngestClicked).await;
        assert_eq!(h.view.status(), "Please enter a session ID");
        assert!(h.transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_repository_ingestion_success_appends_confirmation() {
        let h = harness(Flow::Repository);
        h.controller.set_session_id("s1");
        h.controller.set_repo_url(" https://github.com/o/r ");
        h.transport.push_reply(200, r#"{"message":"ok"}"#);

        let outcome = h.controller.dispatch(UiEvent::IngestClicked).await;

        assert_eq!(outcome, Some(Outcome::Succeeded));
        match &h.transport.requests()[0] {
            RecordedRequest::Json { path, body } => {
                assert_eq!(path, "/api/github/process");
                assert_eq!(
                    body,
                    &serde_json::json!({"url": "https://github.com/o/r", "session_id": "s1"})
                );
            }
            other => panic!("unexpected request: {:?}", other),
        }
        assert_eq!(h.view.status(), "Repository processed successfully!");
        assert_eq!(
            h.controller.transcript(),
            vec![ChatTurn::assistant(
                "Repository processed successfully! You can now ask questions about the code."
            )]
        );
    }

    #[tokio::test]
    async fn test_repository_ingestion_missing_url() {
        let h = harness(Flow::Repository);
        h.controller.set_session_id("s1");
        let outcome = h.controller.dispatch(UiEvent::IngestClicked).await;
        assert!(matches!(outcome, Some(Outcome::Failed(_))));
        assert_eq!(h.view.status(), REQUIRED_FIELDS);
        assert!(h.transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_repository_ingestion_backend_detail_shown() {
        let h = harness(Flow::Repository);
        h.controller.set_session_id("s1");
        h.controller.set_repo_url("https://github.com/o/missing");
        h.transport
            .push_reply(404, r#"{"detail":"No content found in repository"}"#);

        let outcome = h.controller.dispatch(UiEvent::IngestClicked).await;

        assert!(matches!(outcome, Some(Outcome::Failed(ref e)) if e.kind == ErrorKind::Backend));
        assert_eq!(
            h.view.status(),
            "Error processing repository: No content found in repository"
        );
        assert!(h.controller.transcript().is_empty());
        assert!(!h.controller.is_ingesting());
        assert!(h.view.is_enabled(Control::IngestButton));
    }

    #[tokio::test]
    async fn test_ingestion_and_chat_flags_are_independent() {
        let (transport, gate) = FakeTransport::gated();
        let h = harness_with(Flow::Repository, transport, RecordingView::new());
        ready_for_chat(&h);
        h.controller.set_repo_url("https://github.com/o/r");

        let ingest = {
            let controller = Arc::clone(&h.controller);
            tokio::spawn(async move { controller.dispatch(UiEvent::IngestClicked).await })
        };
        wait_for_requests(&h.transport, 1).await;
        assert!(h.controller.is_ingesting());
        assert!(!h.controller.is_sending());

        let chat = {
            let controller = Arc::clone(&h.controller);
            tokio::spawn(async move { controller.submit_chat_turn("hi").await })
        };
        wait_for_requests(&h.transport, 2).await;
        assert!(h.controller.is_sending());

        let busy = h
            .controller
            .submit_ingestion(IngestionSource::Repository {
                url: "https://github.com/o/other".to_string(),
            })
            .await;
        assert_eq!(busy, Outcome::Busy);

        gate.notify_one();
        gate.notify_one();
        ingest.await.unwrap();
        chat.await.unwrap();
        assert!(!h.controller.is_ingesting());
        assert!(!h.controller.is_sending());
        assert_eq!(h.transport.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_page_load_restores_saved_credential() {
        let h = harness(Flow::Documents);
        h.store.save("groq_api_key", "saved-key").unwrap();

        h.controller.dispatch(UiEvent::PageLoaded).await;

        assert_eq!(h.controller.form().credential, "saved-key");
        assert_eq!(h.view.field(Field::Credential).as_deref(), Some("saved-key"));
    }

    #[tokio::test]
    async fn test_page_load_without_saved_credential_leaves_field() {
        let h = harness(Flow::Documents);
        h.controller.set_credential("typed");
        h.controller.dispatch(UiEvent::PageLoaded).await;
        assert_eq!(h.controller.form().credential, "typed");
        assert_eq!(h.view.field(Field::Credential), None);
    }

    #[tokio::test]
    async fn test_credential_saved_only_after_confirmation() {
        let declined = harness(Flow::Documents);
        declined.controller.set_credential("k1");
        declined.controller.dispatch(UiEvent::CredentialChanged).await;
        assert_eq!(declined.view.confirm_prompts().len(), 1);
        assert_eq!(declined.store.load("groq_api_key").unwrap(), None);

        let accepted = harness_with(
            Flow::Documents,
            FakeTransport::new(),
            RecordingView::confirming(true),
        );
        accepted.controller.set_credential("k1");
        accepted.controller.dispatch(UiEvent::CredentialChanged).await;
        assert_eq!(
            accepted.store.load("groq_api_key").unwrap().as_deref(),
            Some("k1")
        );
        assert!(accepted.transport.requests().is_empty());
    }
}
