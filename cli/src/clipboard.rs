use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use gemini_chat_core::{CapabilityError, Clipboard};
use std::io::{self, Write};

/// Clipboard that asks the terminal emulator to copy via the OSC 52 escape.
///
/// Terminals that do not support OSC 52 silently ignore the sequence.
#[derive(Debug, Default, Clone, Copy)]
pub struct Osc52Clipboard;

/// Build the OSC 52 sequence that places `text` on the system clipboard.
pub fn osc52_sequence(text: &str) -> String {
    format!("\x1b]52;c;{}\x07", STANDARD.encode(text.as_bytes()))
}

impl Clipboard for Osc52Clipboard {
    fn write_text(&self, text: &str) -> Result<(), CapabilityError> {
        let mut stdout = io::stdout().lock();
        stdout
            .write_all(osc52_sequence(text).as_bytes())
            .and_then(|_| stdout.flush())
            .map_err(|e| CapabilityError::Failed(format!("Failed to copy message: {}", e)))
    }
}
