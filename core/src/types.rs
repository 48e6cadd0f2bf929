use serde::{Deserialize, Serialize};

/// Request to Gemini API to generate content
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub safety_settings: Vec<SafetySetting>,
}

impl GenerateContentRequest {
    /// Single-turn request carrying one user text part.
    pub fn from_text(
        message_text: &str,
        generation_config: GenerationConfig,
        safety_settings: Vec<SafetySetting>,
    ) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![Part::text(message_text.to_string())],
            }],
            generation_config,
            safety_settings,
        }
    }
}

/// Content structure for requests
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Content {
    pub parts: Vec<Part>,
}

/// Part structure for a piece of content
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl Part {
    pub fn text(text: String) -> Self {
        Self { text: Some(text) }
    }
}

/// Generation configuration options
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f64,
    pub top_k: u32,
    pub top_p: f64,
    pub max_output_tokens: u32,
    pub stop_sequences: Vec<String>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_k: 40,
            top_p: 0.95,
            max_output_tokens: 1024,
            stop_sequences: Vec::new(),
        }
    }
}

/// Harm category threshold sent alongside the request when configured
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SafetySetting {
    pub category: String,
    pub threshold: String,
}

/// Response from Gemini API.
///
/// Both fields are optional on the wire: a 2xx body may carry candidates,
/// an error object, or neither.
#[derive(Deserialize, Debug, Serialize, Default)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
}

impl GenerateContentResponse {
    /// Text of the first part of the first candidate, if present.
    pub fn first_text(&self) -> Option<&str> {
        self.candidates
            .first()?
            .content
            .as_ref()?
            .parts
            .first()?
            .text
            .as_deref()
    }
}

/// Candidate in the response
#[derive(Deserialize, Debug, Serialize)]
pub struct Candidate {
    pub content: Option<Content>,
}

/// Service-level error object carried in a response body
#[derive(Deserialize, Debug, Serialize, Clone)]
pub struct ApiError {
    #[serde(default)]
    pub code: Option<u16>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}
