// crates/txnsim-core/src/runtime/memory.rs
// ============================================================================
// Module: txnsim In-Memory Session
// Description: Deterministic in-memory store session for tests and demos.
// Purpose: Provide a transactional session implementation without external deps.
// Dependencies: crate::{core, interfaces}, rand
// ============================================================================

//! ## Overview
//! This module provides an in-memory implementation of [`StoreSession`] for
//! tests and local demos. It is not intended for production use. Mutation
//! application follows the semantics of the targeted store family: inserting
//! an existing identity fails with already-exists, updating a missing
//! identity fails with not-found, and every committed transaction receives a
//! strictly-increasing commit timestamp.
//!
//! The `replay_attempts` knob re-invokes transaction bodies with discarded
//! buffers before the final attempt, simulating the automatic retry a real
//! store performs on transient contention.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicI64;
use std::sync::atomic::Ordering;

use rand::Rng;

use crate::core::Record;
use crate::core::RecordId;
use crate::core::ReplicatedTable;
use crate::core::Row;
use crate::core::SecondaryKey;
use crate::core::Timestamp;
use crate::core::Value;
use crate::interfaces::CancelToken;
use crate::interfaces::CommitOutcome;
use crate::interfaces::Mutation;
use crate::interfaces::MutationKind;
use crate::interfaces::Query;
use crate::interfaces::ReadWriteTransaction;
use crate::interfaces::RowIter;
use crate::interfaces::StoreError;
use crate::interfaces::StoreSession;
use crate::interfaces::TransactionBody;

// ============================================================================
// SECTION: Storage
// ============================================================================

/// Stored representation of one committed row.
#[derive(Debug, Clone)]
struct StoredRow {
    /// Optional secondary key.
    secondary_key: Option<String>,
    /// Creation time as written.
    created_at: Timestamp,
    /// Commit timestamp assigned at commit.
    committed_at: Timestamp,
}

/// Committed state of the three replicated tables.
#[derive(Debug, Default)]
struct MemoryState {
    /// Tables indexed by [`ReplicatedTable::index`].
    tables: [BTreeMap<String, StoredRow>; 3],
}

// ============================================================================
// SECTION: Session
// ============================================================================

/// In-memory store session for tests and examples.
///
/// # Invariants
/// - Transactions are serialized through a mutex, giving each attempt a
///   single consistent snapshot.
/// - Commit timestamps are strictly increasing across commits.
#[derive(Debug, Clone, Default)]
pub struct InMemorySession {
    /// Committed state protected by a mutex.
    state: Arc<Mutex<MemoryState>>,
    /// Last assigned commit timestamp in unix microseconds.
    clock: Arc<AtomicI64>,
    /// Number of simulated transient aborts before the final attempt.
    replay_attempts: u32,
}

impl InMemorySession {
    /// Creates an empty in-memory session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a session that re-invokes every transaction body `attempts`
    /// extra times with discarded buffers, simulating transient aborts.
    #[must_use]
    pub fn with_replay_attempts(attempts: u32) -> Self {
        Self {
            replay_attempts: attempts,
            ..Self::default()
        }
    }

    /// Returns the number of committed rows in a table.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] when the state mutex is poisoned.
    pub fn row_count(&self, table: ReplicatedTable) -> Result<usize, StoreError> {
        let guard = self
            .state
            .lock()
            .map_err(|_| StoreError::Backend("memory session mutex poisoned".to_string()))?;
        Ok(guard.tables[table.index()].len())
    }

    /// Reads one committed record by identity, if present.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the state mutex is poisoned or the stored
    /// row fails mapping.
    pub fn read_record(
        &self,
        table: ReplicatedTable,
        id: &RecordId,
    ) -> Result<Option<Record>, StoreError> {
        let guard = self
            .state
            .lock()
            .map_err(|_| StoreError::Backend("memory session mutex poisoned".to_string()))?;
        guard.tables[table.index()]
            .get(id.as_str())
            .map(|stored| Record::from_row(&stored_to_row(id.as_str(), stored)).map_err(Into::into))
            .transpose()
    }

    /// Assigns the next strictly-increasing commit timestamp.
    fn next_commit_timestamp(&self) -> Timestamp {
        let now = Timestamp::now().as_unix_micros();
        let mut assigned = now;
        let _ = self.clock.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
            assigned = last.saturating_add(1).max(now);
            Some(assigned)
        });
        Timestamp::from_unix_micros(assigned)
    }
}

impl StoreSession for InMemorySession {
    fn read_write(
        &self,
        cancel: &CancelToken,
        work: &mut TransactionBody<'_>,
    ) -> Result<CommitOutcome, StoreError> {
        cancel.check()?;
        let mut guard = self
            .state
            .lock()
            .map_err(|_| StoreError::Backend("memory session mutex poisoned".to_string()))?;
        let attempts = self.replay_attempts.saturating_add(1);
        let mut buffer = Vec::new();
        for _ in 0 .. attempts {
            cancel.check()?;
            buffer.clear();
            let mut txn = MemoryTransaction {
                state: &guard,
                buffer: &mut buffer,
                cancel,
            };
            work(&mut txn)?;
        }
        cancel.check()?;
        let commit_timestamp = self.next_commit_timestamp();
        apply_mutations(&mut guard, &buffer, commit_timestamp)?;
        Ok(CommitOutcome {
            commit_timestamp,
            attempts,
        })
    }

    fn single_read(&self, cancel: &CancelToken, query: &Query) -> Result<Vec<Row>, StoreError> {
        cancel.check()?;
        let guard = self
            .state
            .lock()
            .map_err(|_| StoreError::Backend("memory session mutex poisoned".to_string()))?;
        Ok(run_query(&guard, query))
    }
}

// ============================================================================
// SECTION: Transaction
// ============================================================================

/// Transaction handle over a locked snapshot of the committed state.
struct MemoryTransaction<'a> {
    /// Committed state snapshot; buffered writes are not visible to reads.
    state: &'a MemoryState,
    /// Mutations deferred until commit.
    buffer: &'a mut Vec<Mutation>,
    /// Caller cancellation signal.
    cancel: &'a CancelToken,
}

impl ReadWriteTransaction for MemoryTransaction<'_> {
    fn point_read(&mut self, table: ReplicatedTable, id: &RecordId) -> Result<Row, StoreError> {
        self.cancel.check()?;
        self.state.tables[table.index()].get(id.as_str()).map_or_else(
            || {
                Err(StoreError::NotFound {
                    table,
                    id: id.to_string(),
                })
            },
            |stored| Ok(stored_to_row(id.as_str(), stored)),
        )
    }

    fn query(&mut self, query: &Query) -> Result<RowIter<'_>, StoreError> {
        self.cancel.check()?;
        let rows = run_query(self.state, query);
        Ok(Box::new(rows.into_iter().map(Ok)))
    }

    fn buffer_write(&mut self, mutations: Vec<Mutation>) -> Result<(), StoreError> {
        self.cancel.check()?;
        self.buffer.extend(mutations);
        Ok(())
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Runs a query against committed state.
fn run_query(state: &MemoryState, query: &Query) -> Vec<Row> {
    match query {
        Query::SampleOne {
            table,
        } => sample_one(&state.tables[table.index()]),
        Query::BySecondaryKey {
            table,
            key,
        } => by_secondary_key(&state.tables[table.index()], key),
    }
}

/// Picks one pseudo-random row, or none when the table is empty.
fn sample_one(table: &BTreeMap<String, StoredRow>) -> Vec<Row> {
    if table.is_empty() {
        return Vec::new();
    }
    let pick = rand::thread_rng().gen_range(0 .. table.len());
    table
        .iter()
        .nth(pick)
        .map(|(id, stored)| stored_to_row(id, stored))
        .into_iter()
        .collect()
}

/// Scans for rows matching a secondary key, in identity order.
fn by_secondary_key(table: &BTreeMap<String, StoredRow>, key: &SecondaryKey) -> Vec<Row> {
    table
        .iter()
        .filter(|(_, stored)| stored.secondary_key.as_deref() == Some(key.as_str()))
        .map(|(id, stored)| stored_to_row(id, stored))
        .collect()
}

/// Encodes a stored row into the static column layout.
fn stored_to_row(id: &str, stored: &StoredRow) -> Row {
    Row::new(vec![
        ("id".to_string(), Value::Text(id.to_string())),
        (
            "secondary_key".to_string(),
            stored.secondary_key.as_ref().map_or(Value::Null, |key| Value::Text(key.clone())),
        ),
        ("created_at".to_string(), Value::Timestamp(stored.created_at)),
        ("committed_at".to_string(), Value::Timestamp(stored.committed_at)),
    ])
}

/// Converts a buffered record into its stored representation.
fn stored_from_record(record: &Record, commit_timestamp: Timestamp) -> StoredRow {
    StoredRow {
        secondary_key: record.secondary_key.as_ref().map(|key| key.as_str().to_string()),
        created_at: record.created_at,
        committed_at: commit_timestamp,
    }
}

/// Applies buffered mutations all-or-nothing with one shared commit
/// timestamp.
fn apply_mutations(
    state: &mut MemoryState,
    mutations: &[Mutation],
    commit_timestamp: Timestamp,
) -> Result<(), StoreError> {
    let mut staged = state.tables.clone();
    for mutation in mutations {
        let table = &mut staged[mutation.table.index()];
        let id = mutation.record.id.as_str().to_string();
        match mutation.kind {
            MutationKind::Insert => {
                if table.contains_key(&id) {
                    return Err(StoreError::AlreadyExists {
                        table: mutation.table,
                        id,
                    });
                }
            }
            MutationKind::Update => {
                if !table.contains_key(&id) {
                    return Err(StoreError::NotFound {
                        table: mutation.table,
                        id,
                    });
                }
            }
        }
        table.insert(id, stored_from_record(&mutation.record, commit_timestamp));
    }
    state.tables = staged;
    Ok(())
}
