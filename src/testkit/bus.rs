//! In-memory reference implementation of the [`Bus`] port.
//!
//! Models the semantics downstream code must survive: delayed visibility,
//! at-least-once delivery and a visibility timeout that returns unacked
//! messages to the queue.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;

use crate::contract::Envelope;
use crate::error::Result;
use crate::model::OpId;
use crate::outcome::Outcome;
use crate::spi::Bus;

const DEFAULT_VISIBILITY_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
struct QueuedEnvelope {
    envelope: Envelope,
    visible_at: Instant,
}

#[derive(Debug, Clone)]
struct InFlightEnvelope {
    envelope: Envelope,
    taken_at: Instant,
}

/// Single-process [`Bus`] with delay and visibility-timeout semantics.
#[derive(Debug)]
pub struct InMemoryBus {
    queue: Mutex<Vec<QueuedEnvelope>>,
    in_flight: DashMap<OpId, InFlightEnvelope>,
    dlq: Mutex<Vec<(Envelope, Outcome)>>,
    visibility_timeout: Duration,
}

impl Default for InMemoryBus {
    fn default() -> Self {
        Self::with_visibility_timeout(DEFAULT_VISIBILITY_TIMEOUT)
    }
}

impl InMemoryBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorter timeouts let tests exercise redelivery without waiting.
    pub fn with_visibility_timeout(visibility_timeout: Duration) -> Self {
        Self {
            queue: Mutex::new(Vec::new()),
            in_flight: DashMap::new(),
            dlq: Mutex::new(Vec::new()),
            visibility_timeout,
        }
    }

    /// Envelopes waiting in the queue, visible or not. Test accessor.
    pub fn queued_len(&self) -> usize {
        self.queue.lock().len()
    }

    /// Envelopes dequeued but not yet acked. Test accessor.
    pub fn in_flight_len(&self) -> usize {
        self.in_flight.len()
    }

    /// Dead-letter contents. Test accessor.
    pub fn dlq_entries(&self) -> Vec<(Envelope, Outcome)> {
        self.dlq.lock().clone()
    }

    /// Move expired in-flight messages back to the queue.
    fn requeue_expired(&self, now: Instant) {
        let expired: Vec<OpId> = self
            .in_flight
            .iter()
            .filter(|entry| now.duration_since(entry.taken_at) >= self.visibility_timeout)
            .map(|entry| entry.key().clone())
            .collect();

        for op_id in expired {
            if let Some((_, stale)) = self.in_flight.remove(&op_id) {
                self.queue.lock().push(QueuedEnvelope {
                    envelope: stale.envelope,
                    visible_at: now,
                });
            }
        }
    }
}

#[async_trait]
impl Bus for InMemoryBus {
    async fn publish(&self, envelope: &Envelope, delay_ms: u64) -> Result<()> {
        self.queue.lock().push(QueuedEnvelope {
            envelope: envelope.clone(),
            visible_at: Instant::now() + Duration::from_millis(delay_ms),
        });
        Ok(())
    }

    async fn dequeue(&self, batch_size: usize) -> Result<Vec<Envelope>> {
        let now = Instant::now();
        self.requeue_expired(now);

        let mut taken = Vec::new();
        {
            let mut queue = self.queue.lock();
            let mut index = 0;
            while index < queue.len() && taken.len() < batch_size {
                if queue[index].visible_at <= now {
                    taken.push(queue.remove(index).envelope);
                } else {
                    index += 1;
                }
            }
        }

        for envelope in &taken {
            self.in_flight.insert(
                envelope.op_id.clone(),
                InFlightEnvelope {
                    envelope: envelope.clone(),
                    taken_at: now,
                },
            );
        }
        Ok(taken)
    }

    async fn ack(&self, envelope: &Envelope) -> Result<()> {
        // Idempotent: acking an unknown or already-acked message is a no-op.
        self.in_flight.remove(&envelope.op_id);
        Ok(())
    }

    async fn nack(&self, envelope: &Envelope) -> Result<()> {
        if let Some((_, returned)) = self.in_flight.remove(&envelope.op_id) {
            self.queue.lock().push(QueuedEnvelope {
                envelope: returned.envelope,
                visible_at: Instant::now(),
            });
        }
        Ok(())
    }

    async fn publish_to_dlq(&self, envelope: &Envelope, outcome: &Outcome) -> Result<()> {
        self.in_flight.remove(&envelope.op_id);
        self.dlq.lock().push((envelope.clone(), outcome.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::test_envelope;

    #[tokio::test]
    async fn publish_then_dequeue_delivers() {
        let bus = InMemoryBus::new();
        let envelope = test_envelope("BIZ-001", "IDEM-001");
        bus.publish(&envelope, 0).await.unwrap();

        let delivered = bus.dequeue(10).await.unwrap();
        assert_eq!(delivered, vec![envelope]);
        assert_eq!(bus.in_flight_len(), 1);
    }

    #[tokio::test]
    async fn delayed_publish_is_invisible_until_due() {
        let bus = InMemoryBus::new();
        let envelope = test_envelope("BIZ-001", "IDEM-001");
        bus.publish(&envelope, 50).await.unwrap();

        assert!(bus.dequeue(10).await.unwrap().is_empty());
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(bus.dequeue(10).await.unwrap(), vec![envelope]);
    }

    #[tokio::test]
    async fn nack_returns_envelope_for_redelivery() {
        let bus = InMemoryBus::new();
        let envelope = test_envelope("BIZ-001", "IDEM-001");
        bus.publish(&envelope, 0).await.unwrap();

        let delivered = bus.dequeue(10).await.unwrap();
        bus.nack(&delivered[0]).await.unwrap();
        assert_eq!(bus.in_flight_len(), 0);
        assert_eq!(bus.dequeue(10).await.unwrap(), vec![envelope]);
    }

    #[tokio::test]
    async fn visibility_timeout_requeues_unacked_messages() {
        let bus = InMemoryBus::with_visibility_timeout(Duration::from_millis(30));
        let envelope = test_envelope("BIZ-001", "IDEM-001");
        bus.publish(&envelope, 0).await.unwrap();

        let first = bus.dequeue(10).await.unwrap();
        assert_eq!(first.len(), 1);
        assert!(bus.dequeue(10).await.unwrap().is_empty());

        tokio::time::sleep(Duration::from_millis(40)).await;
        let redelivered = bus.dequeue(10).await.unwrap();
        assert_eq!(redelivered, vec![envelope]);
    }

    #[tokio::test]
    async fn ack_is_idempotent_and_final() {
        let bus = InMemoryBus::with_visibility_timeout(Duration::from_millis(10));
        let envelope = test_envelope("BIZ-001", "IDEM-001");
        bus.publish(&envelope, 0).await.unwrap();

        let delivered = bus.dequeue(10).await.unwrap();
        bus.ack(&delivered[0]).await.unwrap();
        bus.ack(&delivered[0]).await.unwrap();

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(bus.dequeue(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn dlq_captures_envelope_and_outcome() {
        let bus = InMemoryBus::new();
        let envelope = test_envelope("BIZ-001", "IDEM-001");
        bus.publish(&envelope, 0).await.unwrap();
        let delivered = bus.dequeue(10).await.unwrap();

        let outcome = Outcome::fail("E422", "unprocessable");
        bus.publish_to_dlq(&delivered[0], &outcome).await.unwrap();
        assert_eq!(bus.in_flight_len(), 0);
        assert_eq!(bus.dlq_entries(), vec![(envelope, outcome)]);
    }
}
