//! In-memory reference implementation of the [`Store`] port.
//!
//! Backed by `DashMap` so concurrent runners exercise the same races a real
//! database adapter has to survive. Each method is atomic at the entry level;
//! finalize races resolve through the entry lock, the loser observing
//! [`AlreadyFinalized`](OrchestratorError::AlreadyFinalized).

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::contract::{Command, Envelope};
use crate::error::{OrchestratorError, Result};
use crate::model::OpId;
use crate::outcome::Outcome;
use crate::spi::Store;
use crate::state_machine::{validate_transition, OperationState, WriteAheadState};

#[derive(Debug, Clone)]
struct OperationRecord {
    state: OperationState,
    /// Set when the operation enters `InProgress`, basis for reaper scans.
    started_at: Option<Instant>,
}

#[derive(Debug, Clone)]
struct WalEntry {
    outcome: Outcome,
    state: WriteAheadState,
    recorded_at: DateTime<Utc>,
}

/// Single-process [`Store`] for tests and embedding experiments.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    operations: DashMap<OpId, OperationRecord>,
    envelopes: DashMap<OpId, Envelope>,
    wal: DashMap<OpId, WalEntry>,
    seq: AtomicU64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// WAL state for an operation, if one was recorded. Test accessor.
    pub fn wal_state(&self, op_id: &OpId) -> Option<WriteAheadState> {
        self.wal.get(op_id).map(|entry| entry.state)
    }

    /// Number of accepted operations. Test accessor.
    pub fn operation_count(&self) -> usize {
        self.operations.len()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn accept(&self, op_id: &OpId, command: &Command) -> Result<Envelope> {
        match self.envelopes.entry(op_id.clone()) {
            Entry::Occupied(existing) => Ok(existing.get().clone()),
            Entry::Vacant(slot) => {
                let seq = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
                let envelope = Envelope::now(op_id.clone(), command.clone(), seq);
                self.operations.insert(
                    op_id.clone(),
                    OperationRecord {
                        state: OperationState::Pending,
                        started_at: None,
                    },
                );
                slot.insert(envelope.clone());
                Ok(envelope)
            }
        }
    }

    async fn mark_in_progress(&self, op_id: &OpId) -> Result<()> {
        let mut record = self
            .operations
            .get_mut(op_id)
            .ok_or_else(|| OrchestratorError::OperationNotFound(op_id.clone()))?;

        match record.state {
            OperationState::Pending => {
                record.state = OperationState::InProgress;
                record.started_at = Some(Instant::now());
                Ok(())
            }
            // Redelivery of an in-flight operation is expected traffic.
            OperationState::InProgress => Ok(()),
            terminal => Err(OrchestratorError::AlreadyFinalized {
                op_id: op_id.clone(),
                state: terminal,
            }),
        }
    }

    async fn write_ahead(&self, op_id: &OpId, outcome: &Outcome) -> Result<()> {
        let record = self
            .operations
            .get(op_id)
            .ok_or_else(|| OrchestratorError::OperationNotFound(op_id.clone()))?;
        if record.state.is_terminal() {
            return Err(OrchestratorError::AlreadyFinalized {
                op_id: op_id.clone(),
                state: record.state,
            });
        }
        drop(record);

        // Later attempts overwrite until finalize flips the entry.
        self.wal.insert(
            op_id.clone(),
            WalEntry {
                outcome: outcome.clone(),
                state: WriteAheadState::Pending,
                recorded_at: Utc::now(),
            },
        );
        Ok(())
    }

    async fn finalize(&self, op_id: &OpId, state: OperationState) -> Result<()> {
        if !state.is_terminal() {
            return Err(OrchestratorError::Validation(format!(
                "finalize requires a terminal state, got {state}"
            )));
        }

        let mut record = self
            .operations
            .get_mut(op_id)
            .ok_or_else(|| OrchestratorError::OperationNotFound(op_id.clone()))?;
        if record.state.is_terminal() {
            return Err(OrchestratorError::AlreadyFinalized {
                op_id: op_id.clone(),
                state: record.state,
            });
        }
        validate_transition(record.state, state)?;
        record.state = state;
        drop(record);

        if let Some(mut entry) = self.wal.get_mut(op_id) {
            entry.state = WriteAheadState::Completed;
        }
        Ok(())
    }

    async fn scan_write_ahead(
        &self,
        state: WriteAheadState,
        batch_size: usize,
    ) -> Result<Vec<OpId>> {
        let mut matches: Vec<(OpId, DateTime<Utc>)> = self
            .wal
            .iter()
            .filter(|entry| entry.state == state)
            .map(|entry| (entry.key().clone(), entry.recorded_at))
            .collect();
        matches.sort_by_key(|(_, recorded_at)| *recorded_at);
        Ok(matches
            .into_iter()
            .take(batch_size)
            .map(|(op_id, _)| op_id)
            .collect())
    }

    async fn write_ahead_outcome(&self, op_id: &OpId) -> Result<Outcome> {
        self.wal
            .get(op_id)
            .map(|entry| entry.outcome.clone())
            .ok_or_else(|| OrchestratorError::WriteAheadNotFound(op_id.clone()))
    }

    async fn scan_in_progress(
        &self,
        timeout_threshold_ms: u64,
        batch_size: usize,
    ) -> Result<Vec<OpId>> {
        let now = Instant::now();
        let mut stuck: Vec<(OpId, Instant)> = self
            .operations
            .iter()
            .filter_map(|entry| {
                let started_at = entry.started_at?;
                if entry.state == OperationState::InProgress
                    && now.duration_since(started_at).as_millis() as u64 > timeout_threshold_ms
                {
                    Some((entry.key().clone(), started_at))
                } else {
                    None
                }
            })
            .collect();
        stuck.sort_by_key(|(_, started_at)| *started_at);
        Ok(stuck
            .into_iter()
            .take(batch_size)
            .map(|(op_id, _)| op_id)
            .collect())
    }

    async fn envelope(&self, op_id: &OpId) -> Result<Envelope> {
        self.envelopes
            .get(op_id)
            .map(|envelope| envelope.clone())
            .ok_or_else(|| OrchestratorError::EnvelopeNotFound(op_id.clone()))
    }

    async fn state(&self, op_id: &OpId) -> Result<OperationState> {
        self.operations
            .get(op_id)
            .map(|record| record.state)
            .ok_or_else(|| OrchestratorError::OperationNotFound(op_id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::test_command;

    async fn accepted(store: &InMemoryStore, biz: &str, idem: &str) -> OpId {
        let op_id = OpId::generate();
        store
            .accept(&op_id, &test_command(biz, idem))
            .await
            .unwrap();
        op_id
    }

    #[tokio::test]
    async fn accept_assigns_monotonic_seq() {
        let store = InMemoryStore::new();
        let first = accepted(&store, "BIZ-001", "IDEM-001").await;
        let second = accepted(&store, "BIZ-002", "IDEM-002").await;
        let a = store.envelope(&first).await.unwrap();
        let b = store.envelope(&second).await.unwrap();
        assert!(b.seq > a.seq);
    }

    #[tokio::test]
    async fn accept_is_idempotent_per_op_id() {
        let store = InMemoryStore::new();
        let op_id = OpId::generate();
        let command = test_command("BIZ-001", "IDEM-001");
        let first = store.accept(&op_id, &command).await.unwrap();
        let second = store.accept(&op_id, &command).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(store.operation_count(), 1);
    }

    #[tokio::test]
    async fn finalize_flips_wal_to_completed() {
        let store = InMemoryStore::new();
        let op_id = accepted(&store, "BIZ-001", "IDEM-001").await;
        store.mark_in_progress(&op_id).await.unwrap();
        store
            .write_ahead(&op_id, &Outcome::ok("txn-1", None))
            .await
            .unwrap();
        assert_eq!(store.wal_state(&op_id), Some(WriteAheadState::Pending));

        store
            .finalize(&op_id, OperationState::Completed)
            .await
            .unwrap();
        assert_eq!(store.wal_state(&op_id), Some(WriteAheadState::Completed));
        assert_eq!(
            store.state(&op_id).await.unwrap(),
            OperationState::Completed
        );
    }

    #[tokio::test]
    async fn concurrent_finalize_has_exactly_one_winner() {
        let store = std::sync::Arc::new(InMemoryStore::new());
        let op_id = accepted(&store, "BIZ-001", "IDEM-001").await;
        store.mark_in_progress(&op_id).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = std::sync::Arc::clone(&store);
            let op_id = op_id.clone();
            handles.push(tokio::spawn(async move {
                store.finalize(&op_id, OperationState::Completed).await
            }));
        }

        let mut winners = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(()) => winners += 1,
                Err(err) => assert!(err.is_already_finalized()),
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn mark_in_progress_tolerates_redelivery_but_not_terminal() {
        let store = InMemoryStore::new();
        let op_id = accepted(&store, "BIZ-001", "IDEM-001").await;
        store.mark_in_progress(&op_id).await.unwrap();
        store.mark_in_progress(&op_id).await.unwrap();

        store
            .finalize(&op_id, OperationState::Failed)
            .await
            .unwrap();
        let err = store.mark_in_progress(&op_id).await.unwrap_err();
        assert!(err.is_already_finalized());
    }

    #[tokio::test]
    async fn scan_in_progress_honors_threshold_and_batch() {
        let store = InMemoryStore::new();
        let old = accepted(&store, "BIZ-001", "IDEM-001").await;
        store.mark_in_progress(&old).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(40)).await;
        let fresh = accepted(&store, "BIZ-002", "IDEM-002").await;
        store.mark_in_progress(&fresh).await.unwrap();

        let stuck = store.scan_in_progress(25, 10).await.unwrap();
        assert_eq!(stuck, vec![old.clone()]);

        let none = store.scan_in_progress(10_000, 10).await.unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn write_ahead_is_overwritable_until_finalized() {
        let store = InMemoryStore::new();
        let op_id = accepted(&store, "BIZ-001", "IDEM-001").await;
        store.mark_in_progress(&op_id).await.unwrap();

        store
            .write_ahead(&op_id, &Outcome::retry("timeout", 1, 100))
            .await
            .unwrap();
        store
            .write_ahead(&op_id, &Outcome::ok("txn-2", None))
            .await
            .unwrap();
        assert_eq!(
            store.write_ahead_outcome(&op_id).await.unwrap(),
            Outcome::ok("txn-2", None)
        );

        store
            .finalize(&op_id, OperationState::Completed)
            .await
            .unwrap();
        let err = store
            .write_ahead(&op_id, &Outcome::fail("E1", "late"))
            .await
            .unwrap_err();
        assert!(err.is_already_finalized());
    }
}
