//! Chat session context.
//!
//! Holds the credential, the conversation on display, the saved history and
//! the loading flag, and is the only place they are mutated.

use tracing::{debug, info, warn};

use crate::conversation::{Conversation, Message};
use crate::dispatcher::{redact_credential, Dispatcher};
use crate::errors::{DispatchError, SessionError, SessionResult, StoreError};
use crate::history::ChatHistory;
use crate::ports::{Clipboard, SpeechRecognizer};
use crate::settings::{Settings, Theme};

/// Default input limit in characters
pub const DEFAULT_MAX_MESSAGE_LENGTH: usize = 4000;

/// Result of a sent message. Both variants have been appended to the
/// current conversation as an assistant turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    Reply(String),
    Failed(DispatchError),
}

impl SendOutcome {
    /// Text shown for the assistant turn
    pub fn display_text(&self) -> String {
        match self {
            SendOutcome::Reply(text) => text.clone(),
            SendOutcome::Failed(error) => error.user_message(),
        }
    }
}

/// Canned prompts offered as shortcuts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuickAction {
    Research,
    ImageAnalysis,
    VideoAnalysis,
    CodeReview,
    WritingHelp,
}

impl QuickAction {
    pub fn prompt(&self) -> &'static str {
        match self {
            QuickAction::Research => "Conduct a deep research on the latest developments in artificial intelligence and provide a comprehensive summary with sources and key insights.",
            QuickAction::ImageAnalysis => "Please analyze the image I'm about to upload and provide detailed insights about its content, context, and any relevant information you can extract.",
            QuickAction::VideoAnalysis => "Help me analyze a video file and extract key information including main topics, important moments, and actionable insights.",
            QuickAction::CodeReview => "Review the code I'll share and provide suggestions for improvements, best practices, and potential issues.",
            QuickAction::WritingHelp => "Help me improve my writing by providing suggestions for clarity, grammar, style, and overall effectiveness.",
        }
    }
}

/// Session state shared by the dispatcher and the front end
#[derive(Debug)]
pub struct ChatSession {
    dispatcher: Dispatcher,
    settings: Settings,
    credential: Option<String>,
    current: Option<Conversation>,
    history: ChatHistory,
    theme: Theme,
    loading: bool,
    max_message_length: usize,
    unsaved: Option<StoreError>,
}

impl ChatSession {
    /// Restore credential, theme and history from `settings`.
    ///
    /// `credential_override` (config or environment) wins over the stored key.
    pub fn restore(
        dispatcher: Dispatcher,
        settings: Settings,
        credential_override: Option<String>,
        history_limit: usize,
    ) -> SessionResult<Self> {
        let credential = match credential_override.filter(|c| !c.trim().is_empty()) {
            Some(credential) => Some(credential.trim().to_string()),
            None => settings.load_credential()?,
        };
        let history = settings.load_history(history_limit)?;
        let theme = settings.load_theme()?;

        debug!(
            "Session restored: {} saved conversation(s), credential {}",
            history.len(),
            if credential.is_some() { "present" } else { "missing" }
        );

        Ok(Self {
            dispatcher,
            settings,
            credential,
            current: None,
            history,
            theme,
            loading: false,
            max_message_length: DEFAULT_MAX_MESSAGE_LENGTH,
            unsaved: None,
        })
    }

    pub fn with_max_message_length(mut self, max_message_length: usize) -> Self {
        self.max_message_length = max_message_length;
        self
    }

    /// Send `text` and record both turns in the current conversation.
    ///
    /// A successful exchange is saved to history; a failed one stays on
    /// screen only. A failed save does not lose the reply: it is logged and
    /// kept for [`ChatSession::take_save_error`].
    pub async fn send_message(&mut self, text: &str) -> SessionResult<SendOutcome> {
        let message = text.trim();
        if message.is_empty() {
            return Err(SessionError::EmptyMessage);
        }
        let len = message.chars().count();
        if len > self.max_message_length {
            return Err(SessionError::MessageTooLong {
                len,
                max: self.max_message_length,
            });
        }
        if self.loading {
            return Err(SessionError::Busy);
        }
        let credential = self
            .credential
            .clone()
            .ok_or(SessionError::MissingCredential)?;

        self.current
            .get_or_insert_with(Conversation::new)
            .push(Message::user(message));

        self.loading = true;
        let result = self.dispatcher.dispatch(message, &credential).await;
        self.loading = false;

        let outcome = match result {
            Ok(reply) => SendOutcome::Reply(reply),
            Err(error) => {
                warn!("Error calling Gemini API: {}", error);
                SendOutcome::Failed(error)
            }
        };

        let conversation = self.current.get_or_insert_with(Conversation::new);
        conversation.push(Message::assistant(outcome.display_text()));

        if matches!(outcome, SendOutcome::Reply(_)) {
            if let Err(error) = self.save_current_chat() {
                warn!("Failed to save chat history: {}", error);
                self.unsaved = Some(error);
            }
        }

        Ok(outcome)
    }

    /// Error from the last history save that `send_message` swallowed
    pub fn take_save_error(&mut self) -> Option<StoreError> {
        self.unsaved.take()
    }

    fn save_current_chat(&mut self) -> Result<(), StoreError> {
        let Some(conversation) = &self.current else {
            return Ok(());
        };
        if conversation.is_empty() {
            return Ok(());
        }
        self.history.upsert(conversation.clone());
        self.settings.save_history(&self.history)?;
        Ok(())
    }

    /// Validate, persist and adopt a new credential.
    pub fn set_credential(&mut self, credential: &str) -> SessionResult<()> {
        let saved = self.settings.save_credential(credential)?;
        info!("API key saved ({})", redact_credential(&saved));
        self.credential = Some(saved);
        Ok(())
    }

    pub fn has_credential(&self) -> bool {
        self.credential.is_some()
    }

    /// Redacted credential for display
    pub fn credential_preview(&self) -> Option<String> {
        self.credential.as_deref().map(redact_credential)
    }

    /// Drop the conversation on display; the next message starts a new one.
    pub fn start_new_chat(&mut self) {
        self.current = None;
    }

    /// Make a saved conversation current.
    pub fn load_chat(&mut self, id: &str) -> SessionResult<&Conversation> {
        let conversation = self
            .history
            .get(id)
            .cloned()
            .ok_or_else(|| SessionError::ConversationNotFound(id.to_string()))?;
        Ok(&*self.current.insert(conversation))
    }

    /// Remove a saved conversation, clearing it from display if current.
    pub fn delete_chat(&mut self, id: &str) -> SessionResult<Conversation> {
        let removed = self
            .history
            .remove(id)
            .ok_or_else(|| SessionError::ConversationNotFound(id.to_string()))?;
        if self.current.as_ref().is_some_and(|c| c.id == id) {
            self.current = None;
        }
        self.settings.save_history(&self.history)?;
        Ok(removed)
    }

    pub fn toggle_theme(&mut self) -> SessionResult<Theme> {
        self.theme = self.theme.toggle();
        self.settings.save_theme(self.theme)?;
        Ok(self.theme)
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn history(&self) -> &ChatHistory {
        &self.history
    }

    pub fn current(&self) -> Option<&Conversation> {
        self.current.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Copy the latest assistant reply of the current conversation.
    pub fn copy_last_reply(&self, clipboard: &dyn Clipboard) -> SessionResult<()> {
        let reply = self
            .current
            .as_ref()
            .and_then(|c| c.last_reply())
            .ok_or(SessionError::NothingToCopy)?;
        clipboard.write_text(&reply.content)?;
        Ok(())
    }

    /// Capture one utterance for the front end to place in its input.
    pub fn dictate(&self, recognizer: &mut dyn SpeechRecognizer) -> SessionResult<String> {
        Ok(recognizer.recognize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::Sender;
    use crate::errors::{CapabilityError, TransportError};
    use crate::ports::UnsupportedSpeech;
    use crate::settings::keys;
    use crate::store::{InMemoryStore, KeyValueStore};
    use crate::transport::{Transport, TransportResponse};
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::cell::RefCell;
    use std::sync::{Arc, Mutex};

    /// Answers every request with the same status and body.
    struct FixedTransport {
        status: u16,
        body: String,
        calls: Mutex<usize>,
    }

    impl FixedTransport {
        fn reply(text: &str) -> Arc<Self> {
            Arc::new(Self {
                status: 200,
                body: json!({"candidates": [{"content": {"parts": [{"text": text}]}}]}).to_string(),
                calls: Mutex::new(0),
            })
        }

        fn status(status: u16) -> Arc<Self> {
            Arc::new(Self {
                status,
                body: String::new(),
                calls: Mutex::new(0),
            })
        }
    }

    #[async_trait]
    impl Transport for FixedTransport {
        async fn post_json(&self, _url: &str, _body: &Value) -> Result<TransportResponse, TransportError> {
            *self.calls.lock().unwrap() += 1;
            Ok(TransportResponse::new(self.status, self.body.clone()))
        }
    }

    fn session_with(transport: Arc<FixedTransport>, store: Arc<InMemoryStore>) -> ChatSession {
        ChatSession::restore(
            Dispatcher::new(transport),
            Settings::new(store),
            Some("validkey".to_string()),
            50,
        )
        .unwrap()
    }

    #[derive(Default)]
    struct RecordingClipboard {
        copied: RefCell<Vec<String>>,
    }

    impl Clipboard for RecordingClipboard {
        fn write_text(&self, text: &str) -> Result<(), CapabilityError> {
            self.copied.borrow_mut().push(text.to_string());
            Ok(())
        }
    }

    struct ScriptedSpeech(&'static str);

    impl SpeechRecognizer for ScriptedSpeech {
        fn recognize(&mut self) -> Result<String, CapabilityError> {
            Ok(self.0.to_string())
        }
    }

    #[tokio::test]
    async fn test_send_message_records_and_persists() {
        let store = Arc::new(InMemoryStore::new());
        let mut session = session_with(FixedTransport::reply("Hi there"), store.clone());

        let outcome = session.send_message("  Hello  ").await.unwrap();
        assert_eq!(outcome, SendOutcome::Reply("Hi there".to_string()));
        assert!(!session.is_loading());

        let current = session.current().unwrap();
        assert_eq!(current.title, "Hello");
        let senders: Vec<_> = current.messages().iter().map(|m| m.sender).collect();
        assert_eq!(senders, vec![Sender::User, Sender::Assistant]);
        assert_eq!(current.messages()[1].content, "Hi there");

        assert_eq!(session.history().len(), 1);
        assert!(store.get(keys::CHAT_HISTORY).unwrap().is_some());
    }

    #[tokio::test]
    async fn test_follow_up_updates_same_history_entry() {
        let store = Arc::new(InMemoryStore::new());
        let mut session = session_with(FixedTransport::reply("ok"), store);

        session.send_message("first").await.unwrap();
        session.send_message("second").await.unwrap();

        assert_eq!(session.history().len(), 1);
        let saved = session.history().get_index(0).unwrap();
        assert_eq!(saved.messages().len(), 4);
        assert_eq!(saved.title, "first");
    }

    #[tokio::test]
    async fn test_failed_dispatch_is_shown_not_saved() {
        let store = Arc::new(InMemoryStore::new());
        let mut session = session_with(FixedTransport::status(401), store.clone());

        let outcome = session.send_message("Hello").await.unwrap();
        assert_eq!(outcome, SendOutcome::Failed(DispatchError::InvalidCredential));

        let current = session.current().unwrap();
        assert_eq!(
            current.messages()[1].content,
            "Invalid API key. Please check your API key in the settings and try again."
        );
        assert!(session.history().is_empty());
        assert!(store.get(keys::CHAT_HISTORY).unwrap().is_none());
        assert!(!session.is_loading());
    }

    #[tokio::test]
    async fn test_input_validation() {
        let store = Arc::new(InMemoryStore::new());
        let transport = FixedTransport::reply("ok");
        let mut session = session_with(transport.clone(), store).with_max_message_length(10);

        assert!(matches!(
            session.send_message("   ").await,
            Err(SessionError::EmptyMessage)
        ));
        assert!(matches!(
            session.send_message("this is far too long").await,
            Err(SessionError::MessageTooLong { len: 20, max: 10 })
        ));
        assert_eq!(*transport.calls.lock().unwrap(), 0);
        assert!(session.current().is_none());
    }

    #[tokio::test]
    async fn test_missing_credential() {
        let store = Arc::new(InMemoryStore::new());
        let transport = FixedTransport::reply("ok");
        let mut session = ChatSession::restore(
            Dispatcher::new(transport.clone()),
            Settings::new(store),
            None,
            50,
        )
        .unwrap();

        assert!(!session.has_credential());
        assert!(matches!(
            session.send_message("Hello").await,
            Err(SessionError::MissingCredential)
        ));
        assert_eq!(*transport.calls.lock().unwrap(), 0);

        session.set_credential("fresh-key").unwrap();
        assert!(session.has_credential());
        assert_eq!(session.credential_preview().as_deref(), Some("fresh-key..."));
        session.send_message("Hello").await.unwrap();
        assert_eq!(*transport.calls.lock().unwrap(), 1);
    }

    #[test]
    fn test_restore_prefers_override_then_store() {
        let store = Arc::new(InMemoryStore::new());
        Settings::new(store.clone()).save_credential("stored").unwrap();

        let from_store = ChatSession::restore(
            Dispatcher::new(FixedTransport::reply("ok")),
            Settings::new(store.clone()),
            None,
            50,
        )
        .unwrap();
        assert_eq!(from_store.credential.as_deref(), Some("stored"));

        let overridden = ChatSession::restore(
            Dispatcher::new(FixedTransport::reply("ok")),
            Settings::new(store),
            Some("from-env".to_string()),
            50,
        )
        .unwrap();
        assert_eq!(overridden.credential.as_deref(), Some("from-env"));
    }

    #[test]
    fn test_blank_credential_rejected() {
        let store = Arc::new(InMemoryStore::new());
        let mut session = session_with(FixedTransport::reply("ok"), store);
        assert!(matches!(
            session.set_credential("  "),
            Err(SessionError::InvalidCredential)
        ));
        assert_eq!(session.credential.as_deref(), Some("validkey"));
    }

    #[tokio::test]
    async fn test_new_load_and_delete_chat() {
        let store = Arc::new(InMemoryStore::new());
        let mut session = session_with(FixedTransport::reply("ok"), store.clone());

        session.send_message("first chat").await.unwrap();
        let first_id = session.current().unwrap().id.clone();

        session.start_new_chat();
        assert!(session.current().is_none());
        session.send_message("second chat").await.unwrap();
        assert_eq!(session.history().len(), 2);
        assert_eq!(session.history().get_index(0).unwrap().title, "second chat");

        let loaded = session.load_chat(&first_id).unwrap();
        assert_eq!(loaded.title, "first chat");

        assert!(matches!(
            session.load_chat("missing"),
            Err(SessionError::ConversationNotFound(_))
        ));

        session.delete_chat(&first_id).unwrap();
        assert!(session.current().is_none());
        assert_eq!(session.history().len(), 1);

        let reloaded = Settings::new(store).load_history(50).unwrap();
        assert_eq!(reloaded.len(), 1);
    }

    #[test]
    fn test_toggle_theme_persists() {
        let store = Arc::new(InMemoryStore::new());
        let mut session = session_with(FixedTransport::reply("ok"), store.clone());
        assert_eq!(session.theme(), Theme::Light);

        assert_eq!(session.toggle_theme().unwrap(), Theme::Dark);
        assert_eq!(Settings::new(store).load_theme().unwrap(), Theme::Dark);
    }

    #[tokio::test]
    async fn test_copy_last_reply() {
        let store = Arc::new(InMemoryStore::new());
        let mut session = session_with(FixedTransport::reply("copy me"), store);
        let clipboard = RecordingClipboard::default();

        assert!(matches!(
            session.copy_last_reply(&clipboard),
            Err(SessionError::NothingToCopy)
        ));

        session.send_message("Hello").await.unwrap();
        session.copy_last_reply(&clipboard).unwrap();
        assert_eq!(*clipboard.copied.borrow(), vec!["copy me".to_string()]);
    }

    #[test]
    fn test_dictate() {
        let store = Arc::new(InMemoryStore::new());
        let session = session_with(FixedTransport::reply("ok"), store);

        let transcript = session.dictate(&mut ScriptedSpeech("hello world")).unwrap();
        assert_eq!(transcript, "hello world");

        assert!(matches!(
            session.dictate(&mut UnsupportedSpeech),
            Err(SessionError::Capability(CapabilityError::Unsupported(_)))
        ));
    }

    /// Reads like an empty store, rejects every write.
    #[derive(Debug)]
    struct ReadOnlyStore;

    impl KeyValueStore for ReadOnlyStore {
        fn get(&self, _key: &str) -> crate::errors::StoreResult<Option<String>> {
            Ok(None)
        }

        fn set(&self, _key: &str, _value: &str) -> crate::errors::StoreResult<()> {
            Err(StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "read-only",
            )))
        }

        fn remove(&self, _key: &str) -> crate::errors::StoreResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_reply_survives_failed_history_save() {
        let mut session = ChatSession::restore(
            Dispatcher::new(FixedTransport::reply("Hi there")),
            Settings::new(Arc::new(ReadOnlyStore)),
            Some("validkey".to_string()),
            50,
        )
        .unwrap();

        let outcome = session.send_message("Hello").await.unwrap();
        assert_eq!(outcome, SendOutcome::Reply("Hi there".to_string()));
        assert!(!session.is_loading());
        assert_eq!(
            session.current().and_then(|c| c.last_reply()).map(|m| m.content.as_str()),
            Some("Hi there")
        );

        let error = session.take_save_error().unwrap();
        assert!(error.to_string().contains("read-only"));
        assert!(session.take_save_error().is_none());

        // The session stays usable after the failed save
        let outcome = session.send_message("Again").await.unwrap();
        assert_eq!(outcome, SendOutcome::Reply("Hi there".to_string()));
        assert_eq!(session.current().unwrap().messages().len(), 4);
    }

    #[test]
    fn test_quick_action_prompts() {
        assert!(QuickAction::Research.prompt().starts_with("Conduct a deep research"));
        assert!(QuickAction::CodeReview.prompt().contains("Review the code"));
    }
}
