use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("LLM client is not configured: {0}")]
    NotConfigured(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("LLM API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Invalid LLM response format: {0}")]
    InvalidResponse(String),
}

/// A generative-text model: takes a prompt, returns the model's reply text.
///
/// Implementations make no promise about the reply's shape; callers are
/// expected to clean and validate whatever comes back.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError>;

    /// Short name used in log lines.
    fn name(&self) -> &str {
        "llm"
    }
}
