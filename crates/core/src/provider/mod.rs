//! Text-generation backends used to enrich lookups.

/// Google Gemini REST client.
pub mod gemini;
/// Prompt construction for game lookups.
pub mod prompt;

use thiserror::Error;

pub use gemini::GeminiClient;

/// Failures talking to a text-generation backend.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// No credentials were configured.
    #[error("no API key configured (set GEMINI_API_KEY)")]
    MissingApiKey,
    /// Transport-level failure, including timeouts.
    #[error("request failed")]
    Http(#[from] reqwest::Error),
    /// The service answered with a non-success status.
    #[error("service returned {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Error message extracted from the body, or the raw body.
        message: String,
    },
    /// The response carried no text to work with.
    #[error("response contained no text")]
    EmptyResponse,
}

/// Anything that turns a prompt into raw model text.
///
/// Calls are blocking and made exactly once; there is no retry.
pub trait TextGenerator {
    /// Short label used in logs and the UI.
    fn name(&self) -> &str;

    /// Send `prompt` and return the raw text answer.
    fn generate(&self, prompt: &str) -> Result<String, ProviderError>;

    /// Cheap connectivity check.
    fn probe(&self) -> bool {
        self.generate(prompt::PROBE_PROMPT)
            .map(|answer| answer.contains("OK"))
            .unwrap_or(false)
    }
}

impl<T: TextGenerator + ?Sized> TextGenerator for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        (**self).generate(prompt)
    }

    fn probe(&self) -> bool {
        (**self).probe()
    }
}
