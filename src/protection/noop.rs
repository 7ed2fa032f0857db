//! No-op pass-through implementations, the default for every hook.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::{Bulkhead, CircuitBreaker, CircuitState, HedgePolicy, RateLimiter, TimeoutPolicy};
use crate::error::OrchestratorError;
use crate::model::OpId;

/// Always-closed circuit breaker.
#[derive(Debug, Default)]
pub struct NoOpCircuitBreaker;

impl CircuitBreaker for NoOpCircuitBreaker {
    fn try_acquire(&self, _op_id: &OpId) -> bool {
        true
    }

    fn record_success(&self, _op_id: &OpId) {}

    fn record_failure(&self, _op_id: &OpId, _error: &OrchestratorError) {}

    fn state(&self) -> CircuitState {
        CircuitState::Closed
    }

    fn reset(&self) {}
}

/// Unlimited rate limiter.
#[derive(Debug, Default)]
pub struct NoOpRateLimiter;

impl RateLimiter for NoOpRateLimiter {
    fn try_acquire(&self, _op_id: &OpId) -> bool {
        true
    }
}

/// Unbounded bulkhead that still reports its in-flight count.
#[derive(Debug, Default)]
pub struct NoOpBulkhead {
    in_flight: AtomicUsize,
}

impl Bulkhead for NoOpBulkhead {
    fn try_acquire(&self, _op_id: &OpId) -> bool {
        self.in_flight.fetch_add(1, Ordering::AcqRel);
        true
    }

    fn release(&self, _op_id: &OpId) {
        // Saturating: release without acquire must not underflow.
        let _ = self
            .in_flight
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
    }

    fn current_concurrency(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }
}

/// Timeout policy that never bounds an attempt.
#[derive(Debug, Default)]
pub struct NoOpTimeoutPolicy;

impl TimeoutPolicy for NoOpTimeoutPolicy {
    fn per_attempt_timeout(&self, _op_id: &OpId) -> Option<Duration> {
        None
    }

    fn record_timeout(&self, _op_id: &OpId, _elapsed: Duration) {}
}

/// Hedge policy that never hedges.
#[derive(Debug, Default)]
pub struct NoOpHedgePolicy;

impl HedgePolicy for NoOpHedgePolicy {
    fn should_hedge(&self, _op_id: &OpId) -> bool {
        false
    }

    fn hedge_delay(&self, _op_id: &OpId) -> Duration {
        Duration::ZERO
    }

    fn max_hedges(&self, _op_id: &OpId) -> u32 {
        0
    }

    fn record_hedge_attempt(&self, _op_id: &OpId, _hedge_number: u32) {}

    fn record_success(&self, _op_id: &OpId, _was_hedge: bool) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_hooks_always_allow() {
        let op_id = OpId::generate();
        assert!(NoOpCircuitBreaker.try_acquire(&op_id));
        assert_eq!(NoOpCircuitBreaker.state(), CircuitState::Closed);
        assert!(NoOpRateLimiter.try_acquire(&op_id));
        assert!(NoOpTimeoutPolicy.per_attempt_timeout(&op_id).is_none());
        assert!(!NoOpHedgePolicy.should_hedge(&op_id));
    }

    #[test]
    fn bulkhead_tracks_in_flight_without_underflow() {
        let op_id = OpId::generate();
        let bulkhead = NoOpBulkhead::default();
        assert!(bulkhead.try_acquire(&op_id));
        assert_eq!(bulkhead.current_concurrency(), 1);
        bulkhead.release(&op_id);
        bulkhead.release(&op_id);
        assert_eq!(bulkhead.current_concurrency(), 0);
    }
}
