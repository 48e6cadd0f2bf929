use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::conversation::Conversation;
use crate::errors::{SessionError, SessionResult, StoreError, StoreResult};
use crate::history::ChatHistory;
use crate::store::KeyValueStoreRef;

/// Storage keys
pub mod keys {
    pub const API_KEY: &str = "gemini_api_key";
    pub const THEME: &str = "theme";
    pub const CHAT_HISTORY: &str = "chat_history";
}

/// Display theme preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggle(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}

/// Typed access to the persisted state, each value JSON-encoded.
#[derive(Debug, Clone)]
pub struct Settings {
    store: KeyValueStoreRef,
}

impl Settings {
    pub fn new(store: KeyValueStoreRef) -> Self {
        Self { store }
    }

    fn load<T: DeserializeOwned>(&self, key: &str) -> StoreResult<Option<T>> {
        match self.store.get(key)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    fn save<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> StoreResult<()> {
        let raw = serde_json::to_string(value)?;
        self.store.set(key, &raw)
    }

    /// Stored credential, if one was saved.
    pub fn load_credential(&self) -> StoreResult<Option<String>> {
        Ok(self
            .load::<String>(keys::API_KEY)?
            .filter(|key| !key.trim().is_empty()))
    }

    /// Persist a trimmed, non-empty credential and return it.
    pub fn save_credential(&self, credential: &str) -> SessionResult<String> {
        let credential = credential.trim();
        if credential.is_empty() {
            return Err(SessionError::InvalidCredential);
        }
        self.save(keys::API_KEY, credential)?;
        Ok(credential.to_string())
    }

    pub fn clear_credential(&self) -> StoreResult<()> {
        self.store.remove(keys::API_KEY)
    }

    /// Stored theme; unknown or missing values fall back to the default.
    pub fn load_theme(&self) -> StoreResult<Theme> {
        match self.load::<Theme>(keys::THEME) {
            Ok(theme) => Ok(theme.unwrap_or_default()),
            Err(StoreError::Serde(e)) => {
                warn!("Ignoring unreadable theme preference: {}", e);
                Ok(Theme::default())
            }
            Err(e) => Err(e),
        }
    }

    pub fn save_theme(&self, theme: Theme) -> StoreResult<()> {
        self.save(keys::THEME, &theme)
    }

    /// Stored history capped to `limit`. A corrupt value yields an empty history.
    pub fn load_history(&self, limit: usize) -> StoreResult<ChatHistory> {
        match self.load::<Vec<Conversation>>(keys::CHAT_HISTORY) {
            Ok(conversations) => Ok(ChatHistory::from_conversations(
                conversations.unwrap_or_default(),
                limit,
            )),
            Err(StoreError::Serde(e)) => {
                warn!("Failed to parse chat history, starting fresh: {}", e);
                Ok(ChatHistory::new(limit))
            }
            Err(e) => Err(e),
        }
    }

    pub fn save_history(&self, history: &ChatHistory) -> StoreResult<()> {
        self.save(keys::CHAT_HISTORY, history.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::Message;
    use crate::store::{InMemoryStore, KeyValueStore};
    use std::sync::Arc;

    fn settings() -> (Settings, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());
        (Settings::new(store.clone()), store)
    }

    #[test]
    fn test_credential_round_trip() {
        let (settings, store) = settings();
        assert_eq!(settings.load_credential().unwrap(), None);

        let saved = settings.save_credential("  my-key  ").unwrap();
        assert_eq!(saved, "my-key");
        assert_eq!(settings.load_credential().unwrap(), Some("my-key".to_string()));
        assert_eq!(
            store.get(keys::API_KEY).unwrap(),
            Some("\"my-key\"".to_string())
        );

        settings.clear_credential().unwrap();
        assert_eq!(settings.load_credential().unwrap(), None);
    }

    #[test]
    fn test_blank_credential_rejected() {
        let (settings, _) = settings();
        assert!(matches!(
            settings.save_credential("   "),
            Err(SessionError::InvalidCredential)
        ));
        assert_eq!(settings.load_credential().unwrap(), None);
    }

    #[test]
    fn test_theme_round_trip() {
        let (settings, store) = settings();
        assert_eq!(settings.load_theme().unwrap(), Theme::Light);

        settings.save_theme(Theme::Dark).unwrap();
        assert_eq!(settings.load_theme().unwrap(), Theme::Dark);
        assert_eq!(store.get(keys::THEME).unwrap(), Some("\"dark\"".to_string()));

        store.set(keys::THEME, "\"sepia\"").unwrap();
        assert_eq!(settings.load_theme().unwrap(), Theme::Light);
    }

    #[test]
    fn test_history_round_trip_preserves_order() {
        let (settings, _) = settings();
        let mut history = ChatHistory::default();
        for text in ["first", "second", "third"] {
            let mut conversation = Conversation::new();
            conversation.push(Message::user(text));
            conversation.push(Message::assistant(format!("reply to {}", text)));
            history.upsert(conversation);
        }

        settings.save_history(&history).unwrap();
        let reloaded = settings.load_history(history.limit()).unwrap();

        assert_eq!(reloaded, history);
        let titles: Vec<_> = reloaded.iter().map(|c| c.title.clone()).collect();
        assert_eq!(titles, vec!["third", "second", "first"]);
    }

    #[test]
    fn test_corrupt_history_starts_fresh() {
        let (settings, store) = settings();
        store.set(keys::CHAT_HISTORY, "{not valid").unwrap();
        let history = settings.load_history(50).unwrap();
        assert!(history.is_empty());
    }

    #[test]
    fn test_reload_reapplies_limit() {
        let (settings, _) = settings();
        let mut history = ChatHistory::new(10);
        for i in 0..10 {
            let mut conversation = Conversation::new();
            conversation.push(Message::user(i.to_string()));
            history.upsert(conversation);
        }
        settings.save_history(&history).unwrap();

        let reloaded = settings.load_history(4).unwrap();
        assert_eq!(reloaded.len(), 4);
        assert_eq!(reloaded.get_index(0).unwrap().title, "9");
    }
}
