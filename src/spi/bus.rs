//! Message bus port with at-least-once delivery semantics.

use async_trait::async_trait;

use crate::contract::Envelope;
use crate::error::Result;
use crate::outcome::Outcome;

/// At-least-once message transport for envelopes.
///
/// Implementations provide a visibility timeout for dequeued messages:
/// a message neither acked nor nacked reappears for another consumer.
/// Duplicate delivery is expected and tolerated downstream via idempotency;
/// `ack`/`nack` themselves must be idempotent.
#[async_trait]
pub trait Bus: Send + Sync {
    /// Queue an envelope, visible after `delay_ms` (0 for immediate).
    async fn publish(&self, envelope: &Envelope, delay_ms: u64) -> Result<()>;

    /// Take up to `batch_size` visible envelopes, making them invisible to
    /// other consumers until ack/nack or visibility timeout.
    async fn dequeue(&self, batch_size: usize) -> Result<Vec<Envelope>>;

    /// Permanently remove a processed envelope.
    async fn ack(&self, envelope: &Envelope) -> Result<()>;

    /// Return an envelope to the queue for redelivery.
    async fn nack(&self, envelope: &Envelope) -> Result<()>;

    /// Move a permanently failed envelope to the dead-letter queue together
    /// with the outcome that killed it.
    async fn publish_to_dlq(&self, envelope: &Envelope, outcome: &Outcome) -> Result<()>;
}
