use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use shared_config::AppConfig;
use shared_llm::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError, LlmClient, LlmError, OpenAiClient};

use crate::models::ExtractionSchema;
use crate::services::normalizer::normalize_reply;
use crate::services::sanitizer::sanitize_into;

/// Reply the model is told to give when the input is not what was asked for.
pub const NO_ANSWER_REPLY: &str = "Sorry, I don't have an answer for this question.";

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("LLM call failed: {0}")]
    Llm(#[from] LlmError),

    #[error("LLM circuit breaker is open")]
    CircuitOpen,

    #[error("LLM call timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("LLM returned an empty reply")]
    EmptyReply,

    #[error("LLM declined to answer")]
    NoAnswer,

    #[error("LLM reply is not valid JSON: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("Sanitized reply does not match the record type: {0}")]
    Shape(#[source] serde_json::Error),
}

impl From<CircuitBreakerError<LlmError>> for ExtractionError {
    fn from(error: CircuitBreakerError<LlmError>) -> Self {
        match error {
            CircuitBreakerError::CircuitOpen => ExtractionError::CircuitOpen,
            CircuitBreakerError::Timeout(after) => ExtractionError::Timeout(after),
            CircuitBreakerError::OperationFailed(e) => ExtractionError::Llm(e),
        }
    }
}

/// Builds extraction prompts, calls the LLM and turns replies into typed records.
pub struct ExtractionService {
    llm: Arc<dyn LlmClient>,
    breaker: CircuitBreaker,
}

impl ExtractionService {
    pub fn new(llm: Arc<dyn LlmClient>, breaker: CircuitBreaker) -> Self {
        Self { llm, breaker }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            Arc::new(OpenAiClient::new(config)),
            CircuitBreaker::new(CircuitBreakerConfig::from(config)),
        )
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// Extract a record from free text. Never fails: any problem along the way
    /// is logged and the empty record is returned instead.
    pub async fn extract<S: ExtractionSchema>(&self, text: &str) -> S {
        if text.trim().is_empty() {
            debug!(category = S::CATEGORY, "Blank input, skipping LLM call");
            return S::default();
        }

        match self.try_extract::<S>(text).await {
            Ok(record) => record,
            Err(ExtractionError::NoAnswer) => {
                info!(category = S::CATEGORY, "LLM found nothing to extract, returning empty record");
                S::default()
            }
            Err(e) => {
                warn!(category = S::CATEGORY, error = %e, "Extraction failed, returning empty record");
                S::default()
            }
        }
    }

    /// Extract a record from free text, reporting why extraction failed.
    #[instrument(skip(self, text), fields(category = S::CATEGORY, llm = self.llm.name()))]
    pub async fn try_extract<S: ExtractionSchema>(&self, text: &str) -> Result<S, ExtractionError> {
        let prompt = build_prompt::<S>(text);

        let raw = self.breaker.execute(self.llm.generate(&prompt)).await?;
        let cleaned = normalize_reply(&raw);
        debug!("Normalized reply is {} characters", cleaned.len());

        if cleaned.is_empty() {
            return Err(ExtractionError::EmptyReply);
        }
        if is_no_answer(&cleaned) {
            return Err(ExtractionError::NoAnswer);
        }

        let decoded: Value = serde_json::from_str(&cleaned).map_err(ExtractionError::Decode)?;
        sanitize_into::<S>(&decoded).map_err(ExtractionError::Shape)
    }
}

/// Prompt asking the model to fill `S::template()` from `text`.
pub fn build_prompt<S: ExtractionSchema>(text: &str) -> String {
    let schema = serde_json::to_string_pretty(&S::template()).unwrap_or_default();

    format!(
        "{instructions}\n\n\
         If the text is irrelevant or does not resemble valid {subject}, respond with:\n\
         \"{no_answer}\"\n\n\
         If the information is missing, leave it empty.\n\n\
         {label}:\n\
         {text}\n\n\
         Return the response in **exactly** this JSON structure, even if some fields are empty:\n\
         {schema}\n",
        instructions = S::INSTRUCTIONS,
        subject = S::SUBJECT,
        no_answer = NO_ANSWER_REPLY,
        label = S::INPUT_LABEL,
        text = text.trim(),
        schema = schema,
    )
}

fn is_no_answer(cleaned: &str) -> bool {
    let unquoted = cleaned.trim_matches(|c| c == '"' || c == '\'');
    unquoted.eq_ignore_ascii_case(NO_ANSWER_REPLY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DemographicInfo, MedicalHistory, PersonalInfo};

    #[test]
    fn test_prompt_embeds_text_schema_and_refusal() {
        let prompt = build_prompt::<MedicalHistory>("  Asthma since childhood.  ");

        assert!(prompt.starts_with("You are a medical record analyzer."));
        assert!(prompt.contains("Medical History Text:\nAsthma since childhood.\n"));
        assert!(prompt.contains(NO_ANSWER_REPLY));
        assert!(prompt.contains("\"current_medications\""));
        assert!(prompt.contains("\"condition\": \"\""));
    }

    #[test]
    fn test_prompts_differ_per_category() {
        let personal = build_prompt::<PersonalInfo>("x");
        let demographic = build_prompt::<DemographicInfo>("x");

        assert!(personal.contains("\"contact_info\""));
        assert!(!personal.contains("\"preferred_language\""));
        assert!(demographic.contains("\"preferred_language\""));
        assert!(demographic.contains("valid demographic information"));
    }

    #[test]
    fn test_no_answer_detection() {
        assert!(is_no_answer(NO_ANSWER_REPLY));
        assert!(is_no_answer("\"Sorry, I don't have an answer for this question.\""));
        assert!(!is_no_answer("{\"illnesses\": []}"));
    }
}
