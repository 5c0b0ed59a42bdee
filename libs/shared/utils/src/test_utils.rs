use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use shared_config::AppConfig;
use shared_llm::{CircuitBreaker, CircuitBreakerConfig, LlmClient, LlmError};

pub struct TestConfig {
    pub openai_api_key: String,
    pub openai_api_url: String,
    pub llm_timeout_secs: u64,
    pub llm_failure_threshold: u64,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            openai_api_key: "sk-test-key".to_string(),
            openai_api_url: "http://localhost:54321/v1/chat/completions".to_string(),
            llm_timeout_secs: 1,
            llm_failure_threshold: 100,
        }
    }
}

impl TestConfig {
    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            openai_api_key: self.openai_api_key.clone(),
            openai_api_url: self.openai_api_url.clone(),
            llm_model: "gpt-test".to_string(),
            llm_timeout_secs: self.llm_timeout_secs,
            llm_failure_threshold: self.llm_failure_threshold,
            ..AppConfig::default()
        }
    }

    /// Breaker that never opens during a test and gives up on stalled calls quickly.
    pub fn breaker(timeout: Duration) -> CircuitBreaker {
        CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: 1_000,
            recovery_timeout: Duration::from_secs(60),
            success_threshold: 1,
            timeout,
        })
    }
}

#[derive(Debug, Clone)]
enum Behaviour {
    Reply(String),
    Fail(String),
    Stall,
}

/// In-process stand-in for the LLM collaborator.
///
/// Replies are served from a queue first, then from the fallback behaviour.
/// Every prompt is recorded so tests can assert on what was sent.
pub struct ScriptedLlmClient {
    queued: Mutex<VecDeque<Behaviour>>,
    fallback: Behaviour,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedLlmClient {
    fn with_fallback(fallback: Behaviour) -> Self {
        Self {
            queued: Mutex::new(VecDeque::new()),
            fallback,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn replying(reply: &str) -> Self {
        Self::with_fallback(Behaviour::Reply(reply.to_string()))
    }

    pub fn failing(message: &str) -> Self {
        Self::with_fallback(Behaviour::Fail(message.to_string()))
    }

    /// Never answers; only a timeout gets the caller out.
    pub fn stalled() -> Self {
        Self::with_fallback(Behaviour::Stall)
    }

    pub fn then_reply(self, reply: &str) -> Self {
        self.queued.lock().unwrap().push_back(Behaviour::Reply(reply.to_string()));
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlmClient {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        self.prompts.lock().unwrap().push(prompt.to_string());

        let behaviour = self.queued.lock().unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());
        debug!("Scripted LLM answering with {:?}", behaviour);

        match behaviour {
            Behaviour::Reply(reply) => Ok(reply),
            Behaviour::Fail(message) => Err(LlmError::Api { status: 503, body: message }),
            Behaviour::Stall => std::future::pending().await,
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
