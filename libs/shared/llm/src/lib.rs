pub mod breaker;
pub mod client;
pub mod openai;

pub use breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError, CircuitBreakerState};
pub use client::{LlmClient, LlmError};
pub use openai::OpenAiClient;
