use async_trait::async_trait;
use reqwest::{
    Client,
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
};
use serde_json::{json, Value};
use tracing::{debug, error};

use shared_config::AppConfig;

use crate::client::{LlmClient, LlmError};

/// Chat-completions client for OpenAI and API-compatible endpoints.
pub struct OpenAiClient {
    http_client: Client,
    api_url: String,
    api_key: String,
    model: String,
    temperature: f32,
}

impl OpenAiClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            http_client: Client::new(),
            api_url: config.openai_api_url.clone(),
            api_key: config.openai_api_key.clone(),
            model: config.llm_model.clone(),
            temperature: config.llm_temperature,
        }
    }

    fn get_headers(&self) -> Result<HeaderMap, LlmError> {
        let mut headers = HeaderMap::new();

        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.api_key))
            .map_err(|_| LlmError::NotConfigured("API key contains invalid header characters".to_string()))?;
        headers.insert(AUTHORIZATION, bearer);

        Ok(headers)
    }

    fn request_body(&self, prompt: &str) -> Value {
        json!({
            "model": self.model,
            "messages": [
                {
                    "role": "user",
                    "content": prompt
                }
            ],
            "temperature": self.temperature
        })
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        if self.api_key.is_empty() {
            return Err(LlmError::NotConfigured("OPENAI_API_KEY is empty".to_string()));
        }

        debug!("Sending {} character prompt to {}", prompt.len(), self.api_url);

        let response = self.http_client.post(&self.api_url)
            .headers(self.get_headers()?)
            .json(&self.request_body(prompt))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            error!("LLM API error ({}): {}", status, error_text);
            return Err(LlmError::Api {
                status: status.as_u16(),
                body: error_text,
            });
        }

        let ai_response: Value = response.json().await?;
        let content = ai_response["choices"][0]["message"]["content"].as_str()
            .ok_or_else(|| LlmError::InvalidResponse("missing choices[0].message.content".to_string()))?
            .to_string();

        debug!("Received {} character reply", content.len());
        Ok(content)
    }

    fn name(&self) -> &str {
        &self.model
    }
}
