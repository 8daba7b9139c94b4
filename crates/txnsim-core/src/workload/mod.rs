// crates/txnsim-core/src/workload/mod.rs
// ============================================================================
// Module: txnsim Workload Operations
// Description: The transactional access patterns exercised against the store.
// Purpose: Compose reads, existence checks, and writes into retry-safe atomic units.
// Dependencies: crate::{core, interfaces}, thiserror, tracing
// ============================================================================

//! ## Overview
//! Each workload operation is a self-contained procedure performing one
//! atomic unit of work: a plain replicated insert, a read-modify-write on a
//! sampled row, a check-then-act upsert, index-forced lookups combined with
//! writes, and a read-write transaction carrying only reads. Operations are
//! retry-safe: transaction bodies are repeatable functions of inputs
//! computed before the transaction opens, so the session may re-invoke them
//! on transient contention.
//!
//! Every operation runs inside a tracing span tagged with structured
//! attributes and returns a single success or error; the only errors handled
//! silently are the explicitly modeled not-found branches.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::Record;
use crate::core::RecordId;
use crate::core::ReplicatedTable;
use crate::core::SecondaryKey;
use crate::core::Timestamp;
use crate::interfaces::CancelToken;
use crate::interfaces::CommitOutcome;
use crate::interfaces::Mutation;
use crate::interfaces::Query;
use crate::interfaces::ReadWriteTransaction;
use crate::interfaces::StoreError;
use crate::interfaces::StoreSession;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Workload operation errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WorkloadError {
    /// The store reported an error.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// An index-forced query observed zero rows for a key whose writing
    /// transaction had already committed.
    #[error("secondary-key index returned zero rows for committed key: {key}")]
    StaleIndex {
        /// Secondary key that should have been visible.
        key: String,
    },
}

// ============================================================================
// SECTION: Workload
// ============================================================================

/// Index-mutation variant selected for the second phase of the two-phase
/// index operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IndexPhaseTwo {
    /// Update the looked-up row's commit timestamp.
    Update,
    /// Leave the lookup result unused and insert one more fresh record.
    InsertHeavy,
}

/// The transactional workload engine: one method per access pattern.
///
/// # Invariants
/// - Operations never retry on their own; transient contention is retried
///   transparently by the session.
/// - A failed operation returns its error to the caller; it never crashes
///   the process or swallows errors outside the modeled not-found branches.
#[derive(Debug, Clone)]
pub struct RecordWorkload<S> {
    /// Shared store session; read concurrently, never mutated.
    session: S,
}

impl<S: StoreSession> RecordWorkload<S> {
    /// Creates a workload over a store session.
    pub const fn new(session: S) -> Self {
        Self {
            session,
        }
    }

    /// Returns the underlying session.
    pub const fn session(&self) -> &S {
        &self.session
    }

    /// Inserts one logical record as a 3-way replicated, all-or-nothing
    /// multi-table insert sharing one identity and creation time.
    ///
    /// # Errors
    ///
    /// Returns [`WorkloadError`] when mutation building fails (before
    /// anything is buffered) or when the commit fails, surfacing duplicate
    /// identities unchanged.
    pub fn insert(
        &self,
        cancel: &CancelToken,
        id: &RecordId,
    ) -> Result<CommitOutcome, WorkloadError> {
        let span = op_span("insert");
        let _guard = span.enter();
        let mutations = replicated_inserts(id, None, Timestamp::now())?;
        let outcome =
            self.session.read_write(cancel, &mut |txn| txn.buffer_write(mutations.clone()))?;
        tracing::debug!(id = %id, commit_timestamp = %outcome.commit_timestamp, "inserted");
        Ok(outcome)
    }

    /// Read-modify-writes a storage-side sampled row of `entity0`: drains a
    /// one-row sample keeping only the last row, then rewrites that row with
    /// a refreshed commit-timestamp sentinel.
    ///
    /// When the table is empty the retained row is the zero-value record, so
    /// the buffered update targets the empty identity and the store reports
    /// it as not found at commit. That behavior is intentional and pinned by
    /// tests; see DESIGN.md.
    ///
    /// # Errors
    ///
    /// Returns [`WorkloadError`] on query, mapping, or commit failure.
    pub fn sampled_update(&self, cancel: &CancelToken) -> Result<CommitOutcome, WorkloadError> {
        let span = op_span("sampled_update");
        let _guard = span.enter();
        let outcome = self.session.read_write(cancel, &mut |txn| {
            let record = last_sampled_record(txn, ReplicatedTable::Entity0)?;
            let mutation =
                Mutation::update(ReplicatedTable::Entity0, record.with_pending_commit())?;
            txn.buffer_write(vec![mutation])
        })?;
        Ok(outcome)
    }

    /// Check-then-act upsert with a freshly generated identity.
    ///
    /// # Errors
    ///
    /// Returns [`WorkloadError`] on any read error other than not-found, or
    /// on commit failure.
    pub fn conditional_upsert(&self, cancel: &CancelToken) -> Result<CommitOutcome, WorkloadError> {
        self.conditional_upsert_with(cancel, &RecordId::random())
    }

    /// Check-then-act upsert by an explicit identity: inside one read-write
    /// transaction, point-read the identity; on not-found buffer an insert
    /// of a brand-new record, on found (defensively) buffer an update
    /// re-saving the read record with a refreshed commit-timestamp sentinel.
    ///
    /// The store's isolation makes the existence check race-free: no other
    /// transaction can interleave between the check and the mutation.
    ///
    /// # Errors
    ///
    /// Returns [`WorkloadError`] on any read error other than not-found, or
    /// on commit failure.
    pub fn conditional_upsert_with(
        &self,
        cancel: &CancelToken,
        id: &RecordId,
    ) -> Result<CommitOutcome, WorkloadError> {
        let span = op_span("conditional_upsert");
        let _guard = span.enter();
        let now = Timestamp::now();
        let outcome = self.session.read_write(cancel, &mut |txn| {
            let mutation = match txn.point_read(ReplicatedTable::Entity0, id) {
                Err(StoreError::NotFound {
                    ..
                }) => {
                    tracing::debug!(id = %id, table = %ReplicatedTable::Entity0, "identity not found; inserting");
                    Mutation::insert(
                        ReplicatedTable::Entity0,
                        Record::new(id.clone(), None, now),
                    )?
                }
                Ok(row) => {
                    let record = Record::from_row(&row)?;
                    Mutation::update(ReplicatedTable::Entity0, record.with_pending_commit())?
                }
                Err(err) => return Err(err),
            };
            txn.buffer_write(vec![mutation])
        })?;
        Ok(outcome)
    }

    /// Two-phase index exercise: phase 1 inserts 3 replicated records under
    /// one identity and one secondary key; phase 2, issued only after phase
    /// 1 committed, looks the row up through the secondary-key index and
    /// advances its commit timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`WorkloadError::StaleIndex`] when the index-forced query
    /// observes zero rows for the committed key, or [`WorkloadError`] on any
    /// store failure.
    pub fn index_lookup_update(
        &self,
        cancel: &CancelToken,
    ) -> Result<CommitOutcome, WorkloadError> {
        self.index_lookup(cancel, "index_lookup_update", IndexPhaseTwo::Update)
    }

    /// Two-phase index exercise, insert-heavy variant: phase 1 as in
    /// [`Self::index_lookup_update`]; phase 2 runs the index-forced lookup,
    /// leaves its result unused, and inserts one more fresh record under the
    /// same secondary key.
    ///
    /// # Errors
    ///
    /// Returns [`WorkloadError::StaleIndex`] when the index-forced query
    /// observes zero rows for the committed key, or [`WorkloadError`] on any
    /// store failure.
    pub fn index_lookup_insert_heavy(
        &self,
        cancel: &CancelToken,
    ) -> Result<CommitOutcome, WorkloadError> {
        self.index_lookup(cancel, "index_lookup_insert_heavy", IndexPhaseTwo::InsertHeavy)
    }

    /// Shared two-phase index protocol; the phases run as separate
    /// transactions and are never pipelined.
    fn index_lookup(
        &self,
        cancel: &CancelToken,
        operation: &'static str,
        phase_two: IndexPhaseTwo,
    ) -> Result<CommitOutcome, WorkloadError> {
        let span = op_span(operation);
        let _guard = span.enter();
        let id = RecordId::random();
        let key = SecondaryKey::random();

        let inserts = replicated_inserts(&id, Some(&key), Timestamp::now())?;
        self.session.read_write(cancel, &mut |txn| txn.buffer_write(inserts.clone()))?;

        let now = Timestamp::now();
        let mut visible = false;
        let outcome = self.session.read_write(cancel, &mut |txn| {
            visible = false;
            let mut last = None;
            {
                let rows = txn.query(&Query::BySecondaryKey {
                    table: ReplicatedTable::Entity0,
                    key: key.clone(),
                })?;
                for row in rows {
                    last = Some(Record::from_row(&row?)?);
                }
            }
            let Some(record) = last else {
                return Ok(());
            };
            visible = true;
            let mutation = match phase_two {
                IndexPhaseTwo::Update => {
                    Mutation::update(ReplicatedTable::Entity0, record.with_pending_commit())?
                }
                IndexPhaseTwo::InsertHeavy => Mutation::insert(
                    ReplicatedTable::Entity0,
                    Record::new(RecordId::random(), Some(key.clone()), now),
                )?,
            };
            txn.buffer_write(vec![mutation])
        })?;
        if !visible {
            return Err(WorkloadError::StaleIndex {
                key: key.to_string(),
            });
        }
        Ok(outcome)
    }

    /// Read-write transaction performing only read-shaped work: drains the
    /// sampling query discarding rows, probe-reads a fresh identity
    /// tolerating not-found silently, and commits zero buffered mutations.
    ///
    /// # Errors
    ///
    /// Returns [`WorkloadError`] on any error other than the tolerated
    /// not-found probe result.
    pub fn combined_read_write(
        &self,
        cancel: &CancelToken,
    ) -> Result<CommitOutcome, WorkloadError> {
        let span = op_span("combined_read_write");
        let _guard = span.enter();
        let probe = RecordId::random();
        let outcome = self.session.read_write(cancel, &mut |txn| {
            {
                let rows = txn.query(&Query::SampleOne {
                    table: ReplicatedTable::Entity0,
                })?;
                for row in rows {
                    let _ = row?;
                }
            }
            match txn.point_read(ReplicatedTable::Entity0, &probe) {
                Ok(_)
                | Err(StoreError::NotFound {
                    ..
                }) => Ok(()),
                Err(err) => Err(err),
            }
        })?;
        Ok(outcome)
    }

    /// Compound mutation: one read-write transaction fanning out the 3-way
    /// replicated insert, the sampled-row update, and the check-then-act
    /// upsert branch into a single buffered mutation set.
    ///
    /// # Errors
    ///
    /// Returns [`WorkloadError`] on any store failure; not-found on the
    /// upsert probe is the only silently handled branch.
    pub fn compound_write(
        &self,
        cancel: &CancelToken,
        id: &RecordId,
    ) -> Result<CommitOutcome, WorkloadError> {
        let span = op_span("compound_write");
        let _guard = span.enter();
        let now = Timestamp::now();
        let inserts = replicated_inserts(id, None, now)?;
        let probe = RecordId::random();
        let outcome = self.session.read_write(cancel, &mut |txn| {
            let mut mutations = inserts.clone();
            let sampled = last_sampled_record(txn, ReplicatedTable::Entity0)?;
            mutations
                .push(Mutation::update(ReplicatedTable::Entity0, sampled.with_pending_commit())?);
            match txn.point_read(ReplicatedTable::Entity0, &probe) {
                Err(StoreError::NotFound {
                    ..
                }) => {
                    tracing::debug!(id = %probe, table = %ReplicatedTable::Entity0, "identity not found; inserting");
                    mutations.push(Mutation::insert(
                        ReplicatedTable::Entity0,
                        Record::new(probe.clone(), None, now),
                    )?);
                }
                Ok(row) => {
                    let record = Record::from_row(&row)?;
                    mutations.push(Mutation::update(
                        ReplicatedTable::Entity0,
                        record.with_pending_commit(),
                    )?);
                }
                Err(err) => return Err(err),
            }
            txn.buffer_write(mutations)
        })?;
        Ok(outcome)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Opens the per-operation tracing span; the operation name is a structured
/// attribute rather than part of the span name.
fn op_span(operation: &'static str) -> tracing::Span {
    tracing::info_span!("workload_op", operation = operation)
}

/// Builds the 3-way replicated insert mutation set sharing one identity,
/// secondary key, and creation time. Any build failure aborts before any
/// mutation is buffered.
fn replicated_inserts(
    id: &RecordId,
    secondary_key: Option<&SecondaryKey>,
    created_at: Timestamp,
) -> Result<Vec<Mutation>, StoreError> {
    let mut mutations = Vec::with_capacity(ReplicatedTable::ALL.len());
    for table in ReplicatedTable::ALL {
        let record = Record::new(id.clone(), secondary_key.cloned(), created_at);
        mutations.push(Mutation::insert(table, record)?);
    }
    Ok(mutations)
}

/// Drains a one-row sample keeping only the last row; yields the zero-value
/// record when the sample is empty.
fn last_sampled_record(
    txn: &mut dyn ReadWriteTransaction,
    table: ReplicatedTable,
) -> Result<Record, StoreError> {
    let mut record = Record::zero();
    let rows = txn.query(&Query::SampleOne {
        table,
    })?;
    for row in rows {
        record = Record::from_row(&row?)?;
    }
    Ok(record)
}
