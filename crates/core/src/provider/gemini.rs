use std::{fmt, time::Duration};

use reqwest::blocking::Client;
use serde_json::{json, Value};
use tracing::debug;

use super::{ProviderError, TextGenerator};
use crate::config::AppConfig;

/// Gemini v1beta REST API base.
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
/// Request timeout used when none is configured.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Blocking client for the Gemini `generateContent` endpoint.
pub struct GeminiClient {
    api_key: String,
    api_base: String,
    model: String,
    client: Client,
}

impl fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiClient")
            .field("api_key", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .finish()
    }
}

impl GeminiClient {
    /// Build a client for `model` authenticated with `api_key`.
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ProviderError::MissingApiKey);
        }
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            api_key,
            api_base: DEFAULT_API_BASE.to_string(),
            model: model.into(),
            client,
        })
    }

    /// Build from application configuration.
    pub fn from_config(config: &AppConfig) -> Result<Self, ProviderError> {
        let api_key = config.api_key.clone().ok_or(ProviderError::MissingApiKey)?;
        let mut client = Self::new(
            api_key,
            config.model.clone(),
            Duration::from_secs(config.timeout_secs),
        )?;
        client.api_base = config.api_base.trim_end_matches('/').to_string();
        Ok(client)
    }

    /// Model the client talks to.
    pub fn model(&self) -> &str {
        &self.model
    }

    fn api_url(&self) -> String {
        format!("{}/models/{}:generateContent", self.api_base, self.model)
    }

    /// One-turn request body with the generation settings lookups use.
    pub fn request_body(prompt: &str) -> Value {
        json!({
            "contents": [{
                "parts": [{ "text": prompt }]
            }],
            "generationConfig": {
                "temperature": 0.7,
                "topK": 1,
                "topP": 0.8,
                "maxOutputTokens": 1024
            }
        })
    }

    /// Final answer text of a `generateContent` response.
    ///
    /// Thinking models tag intermediate parts with `"thought": true`; those
    /// are skipped unless nothing else is present.
    pub fn extract_text(response: &Value) -> Option<String> {
        let parts = response["candidates"][0]["content"]["parts"].as_array()?;

        let answer: Vec<&str> = parts
            .iter()
            .filter(|part| !part["thought"].as_bool().unwrap_or(false))
            .filter_map(|part| part["text"].as_str())
            .collect();
        if !answer.is_empty() {
            return Some(answer.concat());
        }

        let thoughts: Vec<&str> = parts.iter().filter_map(|part| part["text"].as_str()).collect();
        if thoughts.is_empty() {
            None
        } else {
            Some(thoughts.concat())
        }
    }

    fn error_message(body: &str) -> String {
        serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|value| value["error"]["message"].as_str().map(str::to_string))
            .unwrap_or_else(|| body.to_string())
    }
}

impl TextGenerator for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
    }

    fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        debug!(model = %self.model, "gemini request");
        let response = self
            .client
            .post(self.api_url())
            .query(&[("key", self.api_key.as_str())])
            .json(&Self::request_body(prompt))
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ProviderError::Status {
                status: status.as_u16(),
                message: Self::error_message(&body),
            });
        }

        let payload: Value = response.json()?;
        Self::extract_text(&payload).ok_or(ProviderError::EmptyResponse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_blank_key() {
        let err = GeminiClient::new("  ", DEFAULT_MODEL, Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, ProviderError::MissingApiKey));
    }

    #[test]
    fn debug_output_redacts_key() {
        let client = GeminiClient::new("secret-key", DEFAULT_MODEL, Duration::from_secs(1))
            .expect("client");
        let rendered = format!("{client:?}");
        assert!(!rendered.contains("secret-key"));
        assert!(rendered.contains("REDACTED"));
        assert!(client
            .api_url()
            .ends_with("/models/gemini-2.5-flash:generateContent"));
    }

    #[test]
    fn request_body_carries_prompt_and_settings() {
        let body = GeminiClient::request_body("hello");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "hello");
        assert_eq!(body["generationConfig"]["topK"], 1);
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 1024);
    }

    #[test]
    fn extract_text_skips_thoughts() {
        let response = json!({
            "candidates": [{
                "content": {
                    "parts": [
                        { "text": "thinking...", "thought": true },
                        { "text": "{\"nome\": " },
                        { "text": "\"Hades\"}" }
                    ]
                }
            }]
        });
        assert_eq!(
            GeminiClient::extract_text(&response).as_deref(),
            Some("{\"nome\": \"Hades\"}")
        );

        let only_thoughts = json!({
            "candidates": [{ "content": { "parts": [{ "text": "hmm", "thought": true }] } }]
        });
        assert_eq!(GeminiClient::extract_text(&only_thoughts).as_deref(), Some("hmm"));

        assert_eq!(GeminiClient::extract_text(&json!({ "candidates": [] })), None);
    }

    #[test]
    fn error_message_prefers_api_message() {
        let body = r#"{"error": {"code": 400, "message": "API key not valid"}}"#;
        assert_eq!(GeminiClient::error_message(body), "API key not valid");
        assert_eq!(GeminiClient::error_message("gateway down"), "gateway down");
    }
}
