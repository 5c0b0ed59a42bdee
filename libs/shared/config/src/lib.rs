use std::env;
use std::str::FromStr;
use tracing::warn;

pub const DEFAULT_OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_LLM_MODEL: &str = "gpt-4o";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub openai_api_key: String,
    pub openai_api_url: String,
    pub llm_model: String,
    pub llm_temperature: f32,
    pub llm_timeout_secs: u64,
    pub llm_failure_threshold: u64,
    pub llm_recovery_timeout_secs: u64,
    pub llm_success_threshold: u64,
    pub server_port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            openai_api_key: String::new(),
            openai_api_url: DEFAULT_OPENAI_API_URL.to_string(),
            llm_model: DEFAULT_LLM_MODEL.to_string(),
            llm_temperature: 0.0,
            llm_timeout_secs: 30,
            llm_failure_threshold: 5,
            llm_recovery_timeout_secs: 60,
            llm_success_threshold: 1,
            server_port: 9000,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let config = Self {
            openai_api_key: env::var("OPENAI_API_KEY")
                .unwrap_or_else(|_| {
                    warn!("OPENAI_API_KEY not set, using empty value");
                    String::new()
                }),
            openai_api_url: env::var("OPENAI_API_URL")
                .unwrap_or_else(|_| {
                    warn!("OPENAI_API_URL not set, using default");
                    defaults.openai_api_url.clone()
                }),
            llm_model: env::var("LLM_MODEL")
                .unwrap_or_else(|_| {
                    warn!("LLM_MODEL not set, using default");
                    defaults.llm_model.clone()
                }),
            llm_temperature: parse_var("LLM_TEMPERATURE", defaults.llm_temperature),
            llm_timeout_secs: parse_var("LLM_TIMEOUT_SECS", defaults.llm_timeout_secs),
            llm_failure_threshold: parse_var("LLM_FAILURE_THRESHOLD", defaults.llm_failure_threshold),
            llm_recovery_timeout_secs: parse_var(
                "LLM_RECOVERY_TIMEOUT_SECS",
                defaults.llm_recovery_timeout_secs,
            ),
            llm_success_threshold: parse_var("LLM_SUCCESS_THRESHOLD", defaults.llm_success_threshold),
            server_port: parse_var("PORT", defaults.server_port),
        };

        if !config.is_llm_configured() {
            warn!("LLM not configured - extraction requests will fall back to empty records");
        }

        config
    }

    pub fn is_llm_configured(&self) -> bool {
        !self.openai_api_key.is_empty() && !self.openai_api_url.is_empty()
    }
}

fn parse_var<T>(name: &str, default: T) -> T
where
    T: FromStr + std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has invalid value {:?}, using default {}", name, raw, default);
            default
        }),
        Err(_) => {
            warn!("{} not set, using default {}", name, default);
            default
        }
    }
}
