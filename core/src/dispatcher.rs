//! Request dispatch with ordered endpoint fallback.
//!
//! A dispatch walks the endpoint list once. Each attempt is reduced to an
//! [`AttemptOutcome`]; only `TryNext` moves on to the following endpoint, and
//! only while one remains.

use std::sync::Arc;

use reqwest::Url;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::errors::DispatchError;
use crate::transport::{Transport, TransportResponse};
use crate::types::{GenerateContentRequest, GenerateContentResponse, GenerationConfig, SafetySetting};

/// Endpoints tried in order when configuration does not override them.
pub const DEFAULT_ENDPOINTS: [&str; 3] = [
    "https://generativelanguage.googleapis.com/v1/models/gemini-1.5-flash:generateContent",
    "https://generativelanguage.googleapis.com/v1/models/gemini-pro:generateContent",
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-pro:generateContent",
];

/// Result of a single endpoint attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// Usable reply text; dispatch stops.
    Reply(String),
    /// Endpoint-specific failure; the next endpoint may succeed.
    TryNext(DispatchError),
    /// Failure that no other endpoint would change.
    Definitive(DispatchError),
}

/// Classify an HTTP response from one endpoint.
pub fn classify_response(response: &TransportResponse) -> AttemptOutcome {
    match response.status {
        200..=299 => classify_body(&response.body),
        404 => AttemptOutcome::TryNext(DispatchError::EndpointNotFound),
        400 => AttemptOutcome::Definitive(DispatchError::InvalidRequest),
        401 => AttemptOutcome::Definitive(DispatchError::InvalidCredential),
        403 => AttemptOutcome::Definitive(DispatchError::Forbidden),
        429 => AttemptOutcome::Definitive(DispatchError::RateLimited),
        status => AttemptOutcome::Definitive(DispatchError::Http(status)),
    }
}

fn classify_body(body: &str) -> AttemptOutcome {
    let parsed: GenerateContentResponse = match serde_json::from_str(body) {
        Ok(parsed) => parsed,
        Err(e) => {
            debug!("Success status with unparseable body: {}", e);
            return AttemptOutcome::Definitive(DispatchError::EmptyResponse);
        }
    };

    if let Some(text) = parsed.first_text() {
        return AttemptOutcome::Reply(text.to_string());
    }

    match parsed.error {
        Some(error) => AttemptOutcome::Definitive(DispatchError::Service(
            error
                .message
                .filter(|message| !message.is_empty())
                .unwrap_or_else(|| "API returned an error".to_string()),
        )),
        None => AttemptOutcome::Definitive(DispatchError::EmptyResponse),
    }
}

/// `endpoint` with the credential attached as a percent-encoded `key` parameter.
fn endpoint_url(endpoint: &str, credential: &str) -> Result<Url, DispatchError> {
    Url::parse_with_params(endpoint, &[("key", credential)])
        .map_err(|e| DispatchError::Transport(format!("Invalid endpoint URL {}: {}", endpoint, e)))
}

/// Shortened credential for log lines.
pub fn redact_credential(credential: &str) -> String {
    let prefix: String = credential.chars().take(10).collect();
    format!("{}...", prefix)
}

/// Sends a message to the first endpoint that yields a usable result.
#[derive(Clone)]
pub struct Dispatcher {
    transport: Arc<dyn Transport>,
    endpoints: Vec<String>,
    generation_config: GenerationConfig,
    safety_settings: Vec<SafetySetting>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("endpoints", &self.endpoints)
            .field("generation_config", &self.generation_config)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Dispatcher over the default endpoint list and generation parameters.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            endpoints: DEFAULT_ENDPOINTS.iter().map(|e| e.to_string()).collect(),
            generation_config: GenerationConfig::default(),
            safety_settings: Vec::new(),
        }
    }

    pub fn with_endpoints(mut self, endpoints: Vec<String>) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn with_generation_config(mut self, generation_config: GenerationConfig) -> Self {
        self.generation_config = generation_config;
        self
    }

    pub fn with_safety_settings(mut self, safety_settings: Vec<SafetySetting>) -> Self {
        self.safety_settings = safety_settings;
        self
    }

    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }

    fn build_payload(&self, message_text: &str) -> Result<Value, DispatchError> {
        let request = GenerateContentRequest::from_text(
            message_text,
            self.generation_config.clone(),
            self.safety_settings.clone(),
        );
        // Plain structs with string keys; serialization cannot fail in practice.
        serde_json::to_value(&request).map_err(|_| DispatchError::InvalidRequest)
    }

    async fn attempt(&self, endpoint: &str, message_text: &str, credential: &str) -> AttemptOutcome {
        let payload = match self.build_payload(message_text) {
            Ok(payload) => payload,
            Err(e) => return AttemptOutcome::Definitive(e),
        };
        let url = match endpoint_url(endpoint, credential) {
            Ok(url) => url,
            Err(e) => return AttemptOutcome::TryNext(e),
        };

        match self.transport.post_json(url.as_str(), &payload).await {
            Ok(response) => {
                debug!("Response status: {}", response.status);
                if !response.is_success() {
                    debug!("API error response: {}", response.body);
                }
                classify_response(&response)
            }
            Err(e) => AttemptOutcome::TryNext(e.into()),
        }
    }

    /// Send `message_text` and return the generated reply.
    ///
    /// `credential` is attached as the `key` query parameter and is not
    /// validated here.
    pub async fn dispatch(&self, message_text: &str, credential: &str) -> Result<String, DispatchError> {
        let total = self.endpoints.len();
        let mut last_error = DispatchError::EndpointNotFound;

        for (index, endpoint) in self.endpoints.iter().enumerate() {
            debug!(
                "Trying API endpoint {}/{}: {} (key {})",
                index + 1,
                total,
                endpoint,
                redact_credential(credential)
            );

            match self.attempt(endpoint, message_text, credential).await {
                AttemptOutcome::Reply(text) => {
                    info!("Success with endpoint: {}", endpoint);
                    return Ok(text);
                }
                AttemptOutcome::TryNext(error) => {
                    debug!("Endpoint {} failed ({}), trying next one", endpoint, error);
                    last_error = error;
                }
                AttemptOutcome::Definitive(error) => {
                    warn!("API call failed for endpoint {}: {}", endpoint, error);
                    return Err(error);
                }
            }
        }

        warn!("All {} endpoints exhausted: {}", total, last_error);
        Err(last_error)
    }
}
