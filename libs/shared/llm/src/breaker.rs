// =====================================================================================
// CIRCUIT BREAKER FOR THE LLM COLLABORATOR
// =====================================================================================
// Every outbound model call runs with a hard timeout. Repeated failures open the
// circuit so stalled or erroring upstreams are skipped until the recovery window
// elapses, after which a half-open probe decides whether to close it again.
// =====================================================================================

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use shared_config::AppConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitBreakerState {
    Closed,    // Normal operation
    Open,      // Failing, reject requests
    HalfOpen,  // Testing if service recovered
}

#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u64,
    pub recovery_timeout: Duration,
    pub success_threshold: u64,
    pub timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(60),
            success_threshold: 1,
            timeout: Duration::from_secs(30),
        }
    }
}

impl From<&AppConfig> for CircuitBreakerConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            failure_threshold: config.llm_failure_threshold.max(1),
            recovery_timeout: Duration::from_secs(config.llm_recovery_timeout_secs),
            success_threshold: config.llm_success_threshold.max(1),
            timeout: Duration::from_secs(config.llm_timeout_secs),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    state: Arc<RwLock<CircuitBreakerState>>,
    failure_count: Arc<AtomicU64>,
    success_count: Arc<AtomicU64>,
    last_failure_time: Arc<RwLock<Option<Instant>>>,
    config: CircuitBreakerConfig,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            state: Arc::new(RwLock::new(CircuitBreakerState::Closed)),
            failure_count: Arc::new(AtomicU64::new(0)),
            success_count: Arc::new(AtomicU64::new(0)),
            last_failure_time: Arc::new(RwLock::new(None)),
            config,
        }
    }

    pub async fn state(&self) -> CircuitBreakerState {
        *self.state.read().await
    }

    pub async fn execute<F, R, E>(&self, operation: F) -> Result<R, CircuitBreakerError<E>>
    where
        F: std::future::Future<Output = Result<R, E>>,
        E: std::fmt::Debug,
    {
        if !self.should_allow_request().await {
            return Err(CircuitBreakerError::CircuitOpen);
        }

        let result = tokio::time::timeout(self.config.timeout, operation).await;

        match result {
            Ok(Ok(success)) => {
                self.on_success().await;
                Ok(success)
            },
            Ok(Err(error)) => {
                self.on_failure().await;
                Err(CircuitBreakerError::OperationFailed(error))
            },
            Err(_) => {
                self.on_failure().await;
                Err(CircuitBreakerError::Timeout(self.config.timeout))
            },
        }
    }

    async fn should_allow_request(&self) -> bool {
        // Lock order matches on_failure: failure time first, then state.
        let recovered = self.last_failure_time.read().await
            .map(|last_failure| last_failure.elapsed() >= self.config.recovery_timeout)
            .unwrap_or(true);

        let mut state = self.state.write().await;
        match *state {
            CircuitBreakerState::Closed | CircuitBreakerState::HalfOpen => true,
            CircuitBreakerState::Open => {
                if recovered {
                    *state = CircuitBreakerState::HalfOpen;
                    self.success_count.store(0, Ordering::SeqCst);
                    debug!("Circuit breaker moved to HALF-OPEN state");
                }
                recovered
            },
        }
    }

    async fn on_success(&self) {
        let mut state = self.state.write().await;
        match *state {
            CircuitBreakerState::HalfOpen => {
                let success_count = self.success_count.fetch_add(1, Ordering::SeqCst) + 1;
                if success_count >= self.config.success_threshold {
                    *state = CircuitBreakerState::Closed;
                    self.failure_count.store(0, Ordering::SeqCst);
                    self.success_count.store(0, Ordering::SeqCst);
                    info!("Circuit breaker reset to CLOSED state");
                }
            },
            _ => {
                self.failure_count.store(0, Ordering::SeqCst);
            }
        }
    }

    async fn on_failure(&self) {
        let failure_count = self.failure_count.fetch_add(1, Ordering::SeqCst) + 1;
        *self.last_failure_time.write().await = Some(Instant::now());

        let mut state = self.state.write().await;
        let reopen = *state == CircuitBreakerState::HalfOpen;
        if reopen || failure_count >= self.config.failure_threshold {
            if *state != CircuitBreakerState::Open {
                warn!("Circuit breaker opened after {} consecutive failures", failure_count);
            }
            *state = CircuitBreakerState::Open;
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CircuitBreakerError<E> {
    #[error("Circuit breaker is open")]
    CircuitOpen,
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),
    #[error("Operation failed: {0:?}")]
    OperationFailed(E),
}
