//! Chat-messages correction client (blocking response mode).
//!
//! Each request carries the conversation id returned by the previous reply
//! so the service keeps context across correction cycles.

use crate::config::CorrectionConfig;
use crate::correction::CorrectionService;
use crate::error::{Result, SpeechError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tracing::debug;

#[derive(Serialize)]
struct CorrectionRequest<'a> {
    inputs: serde_json::Map<String, serde_json::Value>,
    query: &'a str,
    response_mode: &'static str,
    conversation_id: &'a str,
    user: &'a str,
}

#[derive(Deserialize)]
struct CorrectionResponse {
    answer: String,
    #[serde(default)]
    conversation_id: Option<String>,
}

/// HTTP correction client.
pub struct DifyCorrectionClient {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    user: String,
    conversation_id: Mutex<Option<String>>,
}

impl std::fmt::Debug for DifyCorrectionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DifyCorrectionClient")
            .field("api_url", &self.api_url)
            .field("api_key", &"<redacted>")
            .field("user", &self.user)
            .finish()
    }
}

impl DifyCorrectionClient {
    /// Build a client from config.
    ///
    /// # Errors
    ///
    /// Returns [`SpeechError::Config`] when no API key is configured.
    pub fn new(config: &CorrectionConfig) -> Result<Self> {
        let api_key = config.resolved_api_key().ok_or_else(|| {
            SpeechError::Config("correction API key is not set".to_owned())
        })?;
        Ok(Self {
            client: reqwest::Client::new(),
            api_url: config.api_url.clone(),
            api_key,
            user: config.user.clone(),
            conversation_id: Mutex::new(None),
        })
    }

    /// Conversation id remembered from the last successful reply.
    pub fn conversation_id(&self) -> Option<String> {
        self.conversation_id
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn map_http_error(status: reqwest::StatusCode, body: &str) -> SpeechError {
        let message = extract_error_message(body);
        match status.as_u16() {
            401 => SpeechError::Correction(format!("authentication failed: {message}")),
            429 => SpeechError::Correction(format!("rate limited: {message}")),
            code => SpeechError::Correction(format!("HTTP {code}: {message}")),
        }
    }
}

fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
        .unwrap_or_else(|| body.to_string())
}

#[async_trait]
impl CorrectionService for DifyCorrectionClient {
    async fn correct(&self, text: &str) -> Result<String> {
        let conversation_id = self.conversation_id().unwrap_or_default();
        let body = CorrectionRequest {
            inputs: serde_json::Map::new(),
            query: text,
            response_mode: "blocking",
            conversation_id: &conversation_id,
            user: &self.user,
        };

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| SpeechError::Correction(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(Self::map_http_error(status, &body_text));
        }

        let parsed: CorrectionResponse = response
            .json()
            .await
            .map_err(|e| SpeechError::Correction(format!("invalid response: {e}")))?;

        if let Some(id) = parsed.conversation_id.filter(|id| !id.is_empty()) {
            debug!(conversation_id = %id, "correction conversation updated");
            *self.conversation_id.lock().unwrap_or_else(|e| e.into_inner()) = Some(id);
        }
        Ok(parsed.answer)
    }
}
