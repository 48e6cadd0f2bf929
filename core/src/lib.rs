// Core chat functionality:
// - Request dispatch with endpoint fallback
// - Request/response data structures
// - Conversation model and bounded history
// - Persisted settings over a key-value store
// - Configuration loading
// - Shared error types

pub mod config;
pub mod conversation;
pub mod dispatcher;
pub mod errors;
pub mod history;
pub mod ports;
pub mod session;
pub mod settings;
pub mod store;
pub mod transport;
pub mod types;

pub use config::ChatConfig;
pub use conversation::{Conversation, Message, Sender};
pub use dispatcher::{AttemptOutcome, Dispatcher, DEFAULT_ENDPOINTS};
pub use errors::*;
pub use history::ChatHistory;
pub use ports::{Clipboard, SpeechRecognizer, UnsupportedSpeech};
pub use session::{ChatSession, QuickAction, SendOutcome};
pub use settings::{Settings, Theme};
pub use store::{FileStore, InMemoryStore, KeyValueStore, KeyValueStoreRef};
pub use transport::{HttpTransport, Transport, TransportResponse};
