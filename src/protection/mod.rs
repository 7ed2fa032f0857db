//! # Protection Hooks
//!
//! Optional resilience policies wrapped around the executor call. Every hook
//! defaults to a no-op pass-through; production systems plug in real
//! implementations without touching the core.
//!
//! Composition order on the hot path:
//!
//! ```text
//! Timeout -> CircuitBreaker -> Bulkhead -> RateLimiter -> Executor
//! ```
//!
//! Hedging is consulted by the worker's poll loop rather than the start
//! path, since an attempt is started non-blocking.

pub mod noop;

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::contract::Envelope;
use crate::error::{OrchestratorError, Result};
use crate::executor::Executor;
use crate::model::OpId;

pub use noop::{
    NoOpBulkhead, NoOpCircuitBreaker, NoOpHedgePolicy, NoOpRateLimiter, NoOpTimeoutPolicy,
};

/// Circuit breaker states representing the current operational mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CircuitState {
    /// Normal operation - all calls are allowed through
    Closed,
    /// Failure mode - all calls fail fast without executing
    Open,
    /// Testing recovery - limited calls allowed to test system health
    HalfOpen,
}

/// Fail-fast guard against a repeatedly failing external system.
pub trait CircuitBreaker: Send + Sync {
    /// Whether a call for this operation may proceed.
    fn try_acquire(&self, op_id: &OpId) -> bool;

    fn record_success(&self, op_id: &OpId);

    fn record_failure(&self, op_id: &OpId, error: &OrchestratorError);

    fn state(&self) -> CircuitState;

    fn reset(&self);
}

/// Request-rate guard.
pub trait RateLimiter: Send + Sync {
    /// Whether a call for this operation may proceed right now.
    fn try_acquire(&self, op_id: &OpId) -> bool;
}

/// Concurrency guard limiting in-flight executor calls.
pub trait Bulkhead: Send + Sync {
    fn try_acquire(&self, op_id: &OpId) -> bool;

    fn release(&self, op_id: &OpId);

    fn current_concurrency(&self) -> usize;
}

/// Per-attempt timeout policy.
pub trait TimeoutPolicy: Send + Sync {
    /// Timeout for one attempt of this operation, `None` for unlimited.
    fn per_attempt_timeout(&self, op_id: &OpId) -> Option<Duration>;

    fn record_timeout(&self, op_id: &OpId, elapsed: Duration);
}

/// Speculative retry policy for tail-latency reduction.
pub trait HedgePolicy: Send + Sync {
    fn should_hedge(&self, op_id: &OpId) -> bool;

    fn hedge_delay(&self, op_id: &OpId) -> Duration;

    fn max_hedges(&self, op_id: &OpId) -> u32;

    fn record_hedge_attempt(&self, op_id: &OpId, hedge_number: u32);

    fn record_success(&self, op_id: &OpId, was_hedge: bool);
}

/// Thin composition layer applying the hooks in order around
/// [`Executor::execute`].
#[derive(Clone)]
pub struct ProtectionChain {
    timeout: Arc<dyn TimeoutPolicy>,
    circuit_breaker: Arc<dyn CircuitBreaker>,
    bulkhead: Arc<dyn Bulkhead>,
    rate_limiter: Arc<dyn RateLimiter>,
    hedge: Arc<dyn HedgePolicy>,
}

impl ProtectionChain {
    /// Chain with all hooks as no-op pass-throughs.
    pub fn noop() -> Self {
        Self {
            timeout: Arc::new(NoOpTimeoutPolicy),
            circuit_breaker: Arc::new(NoOpCircuitBreaker),
            bulkhead: Arc::new(NoOpBulkhead::default()),
            rate_limiter: Arc::new(NoOpRateLimiter),
            hedge: Arc::new(NoOpHedgePolicy),
        }
    }

    pub fn with_timeout(mut self, timeout: Arc<dyn TimeoutPolicy>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_circuit_breaker(mut self, circuit_breaker: Arc<dyn CircuitBreaker>) -> Self {
        self.circuit_breaker = circuit_breaker;
        self
    }

    pub fn with_bulkhead(mut self, bulkhead: Arc<dyn Bulkhead>) -> Self {
        self.bulkhead = bulkhead;
        self
    }

    pub fn with_rate_limiter(mut self, rate_limiter: Arc<dyn RateLimiter>) -> Self {
        self.rate_limiter = rate_limiter;
        self
    }

    pub fn with_hedge(mut self, hedge: Arc<dyn HedgePolicy>) -> Self {
        self.hedge = hedge;
        self
    }

    /// Hedge policy, consulted by the worker while polling for completion.
    pub fn hedge(&self) -> &dyn HedgePolicy {
        self.hedge.as_ref()
    }

    /// Start an attempt through the full hook chain.
    pub async fn execute(&self, executor: &dyn Executor, envelope: &Envelope) -> Result<()> {
        let op_id = &envelope.op_id;

        if !self.circuit_breaker.try_acquire(op_id) {
            return Err(OrchestratorError::ProtectionRejected(format!(
                "circuit breaker open for {op_id}"
            )));
        }
        if !self.bulkhead.try_acquire(op_id) {
            return Err(OrchestratorError::ProtectionRejected(format!(
                "bulkhead at capacity for {op_id}"
            )));
        }
        if !self.rate_limiter.try_acquire(op_id) {
            self.bulkhead.release(op_id);
            return Err(OrchestratorError::ProtectionRejected(format!(
                "rate limit exceeded for {op_id}"
            )));
        }

        let result = match self.timeout.per_attempt_timeout(op_id) {
            Some(limit) => match tokio::time::timeout(limit, executor.execute(envelope)).await {
                Ok(result) => result,
                Err(_) => {
                    self.timeout.record_timeout(op_id, limit);
                    Err(OrchestratorError::ProtectionRejected(format!(
                        "attempt timed out after {}ms for {op_id}",
                        limit.as_millis()
                    )))
                }
            },
            None => executor.execute(envelope).await,
        };

        self.bulkhead.release(op_id);
        match &result {
            std::result::Result::Ok(()) => self.circuit_breaker.record_success(op_id),
            Err(error) => self.circuit_breaker.record_failure(op_id, error),
        }
        result
    }
}

impl Default for ProtectionChain {
    fn default() -> Self {
        Self::noop()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::{test_command, StubExecutor};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct RejectingBreaker;

    impl CircuitBreaker for RejectingBreaker {
        fn try_acquire(&self, _op_id: &OpId) -> bool {
            false
        }
        fn record_success(&self, _op_id: &OpId) {}
        fn record_failure(&self, _op_id: &OpId, _error: &OrchestratorError) {}
        fn state(&self) -> CircuitState {
            CircuitState::Open
        }
        fn reset(&self) {}
    }

    struct CountingBulkhead {
        acquired: AtomicUsize,
        released: AtomicUsize,
    }

    impl Bulkhead for CountingBulkhead {
        fn try_acquire(&self, _op_id: &OpId) -> bool {
            self.acquired.fetch_add(1, Ordering::SeqCst);
            true
        }
        fn release(&self, _op_id: &OpId) {
            self.released.fetch_add(1, Ordering::SeqCst);
        }
        fn current_concurrency(&self) -> usize {
            0
        }
    }

    struct DenyingLimiter;

    impl RateLimiter for DenyingLimiter {
        fn try_acquire(&self, _op_id: &OpId) -> bool {
            false
        }
    }

    fn envelope() -> Envelope {
        Envelope::now(
            crate::model::OpId::generate(),
            test_command("BIZ-001", "IDEM-001"),
            0,
        )
    }

    #[tokio::test]
    async fn noop_chain_passes_through() {
        let executor = StubExecutor::new();
        let chain = ProtectionChain::noop();
        assert!(chain.execute(&executor, &envelope()).await.is_ok());
        assert_eq!(executor.execution_count(), 1);
    }

    #[tokio::test]
    async fn default_chain_constructs_every_noop_hook() {
        let executor = StubExecutor::new();
        let chain = ProtectionChain::default();
        assert!(chain.execute(&executor, &envelope()).await.is_ok());
        assert!(!chain.hedge().should_hedge(&OpId::generate()));
    }

    #[tokio::test]
    async fn open_circuit_rejects_before_executor() {
        let executor = StubExecutor::new();
        let chain = ProtectionChain::noop().with_circuit_breaker(Arc::new(RejectingBreaker));
        let err = chain.execute(&executor, &envelope()).await.unwrap_err();
        assert!(matches!(err, OrchestratorError::ProtectionRejected(_)));
        assert_eq!(executor.execution_count(), 0);
    }

    #[tokio::test]
    async fn rate_limit_rejection_releases_bulkhead() {
        let executor = StubExecutor::new();
        let bulkhead = Arc::new(CountingBulkhead {
            acquired: AtomicUsize::new(0),
            released: AtomicUsize::new(0),
        });
        let chain = ProtectionChain::noop()
            .with_bulkhead(bulkhead.clone())
            .with_rate_limiter(Arc::new(DenyingLimiter));
        assert!(chain.execute(&executor, &envelope()).await.is_err());
        assert_eq!(bulkhead.acquired.load(Ordering::SeqCst), 1);
        assert_eq!(bulkhead.released.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn success_is_recorded_on_breaker() {
        struct RecordingBreaker {
            saw_success: AtomicBool,
        }
        impl CircuitBreaker for RecordingBreaker {
            fn try_acquire(&self, _op_id: &OpId) -> bool {
                true
            }
            fn record_success(&self, _op_id: &OpId) {
                self.saw_success.store(true, Ordering::SeqCst);
            }
            fn record_failure(&self, _op_id: &OpId, _error: &OrchestratorError) {}
            fn state(&self) -> CircuitState {
                CircuitState::Closed
            }
            fn reset(&self) {}
        }

        let breaker = Arc::new(RecordingBreaker {
            saw_success: AtomicBool::new(false),
        });
        let chain = ProtectionChain::noop().with_circuit_breaker(breaker.clone());
        chain
            .execute(&StubExecutor::new(), &envelope())
            .await
            .unwrap();
        assert!(breaker.saw_success.load(Ordering::SeqCst));
    }
}
