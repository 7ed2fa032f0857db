//! # Operation Contracts
//!
//! `Command` is what a caller submits; `Envelope` is the command wrapped
//! with its assigned [`OpId`] and accept-time metadata, and is the unit
//! that travels through the [`Bus`](crate::spi::Bus).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{BizKey, Domain, EventType, IdemKey, IdempotencyKey, OpId, Payload};

/// A request to perform one external-call operation. Immutable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub domain: Domain,
    pub event_type: EventType,
    pub biz_key: BizKey,
    pub idem_key: IdemKey,
    /// Optional opaque payload handed to the executor.
    pub payload: Option<Payload>,
}

impl Command {
    pub fn new(
        domain: Domain,
        event_type: EventType,
        biz_key: BizKey,
        idem_key: IdemKey,
        payload: Option<Payload>,
    ) -> Self {
        Self {
            domain,
            event_type,
            biz_key,
            idem_key,
            payload,
        }
    }

    /// Derive the idempotency key used for OpId lookup.
    pub fn idempotency_key(&self) -> IdempotencyKey {
        IdempotencyKey::new(
            self.domain.clone(),
            self.event_type.clone(),
            self.biz_key.clone(),
            self.idem_key.clone(),
        )
    }
}

/// A [`Command`] bound to its operation, created at accept-time.
///
/// `seq` is a monotonic sequence number assigned by the Store when the
/// operation is accepted. It is advisory metadata for Bus adapters that want
/// ordering hints; the core builds no logic on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub op_id: OpId,
    pub command: Command,
    pub seq: u64,
    pub accepted_at: DateTime<Utc>,
}

impl Envelope {
    pub fn new(op_id: OpId, command: Command, seq: u64, accepted_at: DateTime<Utc>) -> Self {
        Self {
            op_id,
            command,
            seq,
            accepted_at,
        }
    }

    /// Wrap a command with the current timestamp.
    pub fn now(op_id: OpId, command: Command, seq: u64) -> Self {
        Self::new(op_id, command, seq, Utc::now())
    }
}
