use thiserror::Error;

/// Classified outcome of a failed dispatch.
///
/// `Display` carries the message attached at the point of classification;
/// [`DispatchError::user_message`] is what the front end shows as the
/// assistant turn.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("Network error: {0}")]
    Transport(String),

    #[error("Invalid request. Please check your message and try again.")]
    InvalidRequest,

    #[error("Invalid API key. Please check your API key and try again.")]
    InvalidCredential,

    #[error("API access forbidden. Please check your API key permissions.")]
    Forbidden,

    #[error("API endpoint not found. The Gemini API may have changed.")]
    EndpointNotFound,

    #[error("Too many requests. Please wait a moment and try again.")]
    RateLimited,

    #[error("HTTP error! status: {0}")]
    Http(u16),

    #[error("{0}")]
    Service(String),

    #[error("No response generated")]
    EmptyResponse,
}

impl DispatchError {
    /// Display-ready text for the assistant turn that replaces a failed reply.
    pub fn user_message(&self) -> String {
        match self {
            DispatchError::InvalidCredential => {
                "Invalid API key. Please check your API key in the settings and try again."
                    .to_string()
            }
            DispatchError::InvalidRequest => {
                "Invalid request format. Please try rephrasing your message.".to_string()
            }
            DispatchError::Service(message) if message.is_empty() => {
                "Sorry, I encountered an error while processing your request.".to_string()
            }
            other => other.to_string(),
        }
    }

    /// Status code the error was classified from, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            DispatchError::InvalidRequest => Some(400),
            DispatchError::InvalidCredential => Some(401),
            DispatchError::Forbidden => Some(403),
            DispatchError::EndpointNotFound => Some(404),
            DispatchError::RateLimited => Some(429),
            DispatchError::Http(status) => Some(*status),
            _ => None,
        }
    }
}

/// Failure below HTTP: nothing usable came back from the wire.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Failed to send request: {0}")]
    Request(String),

    #[error("Failed to read response body: {0}")]
    Body(String),
}

impl From<TransportError> for DispatchError {
    fn from(e: TransportError) -> Self {
        DispatchError::Transport(e.to_string())
    }
}

/// Key-value store errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Serde(#[from] serde_json::Error),

    #[error("Failed to acquire store lock: {0}")]
    Lock(String),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read or write config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Could not determine home directory")]
    NoHomeDir,
}

/// Host capability failures (clipboard, speech input)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CapabilityError {
    #[error("{0}")]
    Unsupported(String),

    #[error("{0}")]
    Failed(String),
}

/// Errors raised by the chat session before or around a dispatch
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Message is empty")]
    EmptyMessage,

    #[error("Message is too long ({len}/{max} characters)")]
    MessageTooLong { len: usize, max: usize },

    #[error("Please enter your Gemini API key to continue.")]
    MissingCredential,

    #[error("Please enter a valid API key")]
    InvalidCredential,

    #[error("A request is already in progress")]
    Busy,

    #[error("Conversation not found: {0}")]
    ConversationNotFound(String),

    #[error("No assistant reply to copy")]
    NothingToCopy,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Capability(#[from] CapabilityError),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type for session operations
pub type SessionResult<T> = Result<T, SessionError>;
