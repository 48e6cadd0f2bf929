//! Host capabilities the chat session depends on but never implements.

use crate::errors::CapabilityError;

/// Write text to the host clipboard
pub trait Clipboard {
    fn write_text(&self, text: &str) -> Result<(), CapabilityError>;
}

/// Turn one spoken utterance into text
pub trait SpeechRecognizer {
    fn recognize(&mut self) -> Result<String, CapabilityError>;
}

/// Recognizer for hosts without speech input
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedSpeech;

impl SpeechRecognizer for UnsupportedSpeech {
    fn recognize(&mut self) -> Result<String, CapabilityError> {
        Err(CapabilityError::Unsupported(
            "Voice recognition not supported in this terminal".to_string(),
        ))
    }
}
