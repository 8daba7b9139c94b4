// crates/txnsim-core/src/interfaces/mod.rs
// ============================================================================
// Module: txnsim Interfaces
// Description: Backend-agnostic store session and transaction contracts.
// Purpose: Define the surfaces a transactional store backend must implement.
// Dependencies: crate::core, thiserror
// ============================================================================

//! ## Overview
//! Interfaces define how the workload engine consumes an externally provided
//! transactional store without embedding backend-specific details. The store
//! guarantees atomicity, isolation, and a server-assigned commit timestamp;
//! the engine only owns the in-flight mutation set for the duration of one
//! transaction attempt.
//!
//! The retry contract: [`StoreSession::read_write`] may re-invoke the
//! transaction body zero or more times on transient contention before
//! returning a final result, each time on a fresh transaction with an empty
//! mutation buffer. Bodies must therefore be repeatable functions of their
//! inputs with no side effects outside the buffer.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use thiserror::Error;

use crate::core::CommitTime;
use crate::core::Record;
use crate::core::RecordId;
use crate::core::ReplicatedTable;
use crate::core::Row;
use crate::core::RowMapError;
use crate::core::SecondaryKey;
use crate::core::Timestamp;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Store errors surfaced to workload operations.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
/// - `NotFound` is an expected, handled branch in check-then-act operations,
///   not a failure.
/// - `Aborted` is only returned after the session has exhausted its own
///   transparent retries of transient contention.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Point read or update targeted a row that does not exist.
    #[error("row not found in {table}: {id}")]
    NotFound {
        /// Table the read or update targeted.
        table: ReplicatedTable,
        /// Identity that was not found.
        id: String,
    },
    /// Insert targeted an identity that already exists.
    #[error("row already exists in {table}: {id}")]
    AlreadyExists {
        /// Table the insert targeted.
        table: ReplicatedTable,
        /// Duplicate identity.
        id: String,
    },
    /// Transaction aborted after contention retries were exhausted.
    #[error("transaction aborted: {0}")]
    Aborted(String),
    /// Malformed mutation or row; fatal to the current operation.
    #[error("invalid store data: {0}")]
    Invalid(String),
    /// The caller's cancellation signal fired mid-transaction.
    #[error("operation cancelled")]
    Cancelled,
    /// Store engine reported an error.
    #[error("store backend error: {0}")]
    Backend(String),
}

impl From<RowMapError> for StoreError {
    fn from(error: RowMapError) -> Self {
        Self::Invalid(error.to_string())
    }
}

// ============================================================================
// SECTION: Cancellation
// ============================================================================

/// Cancellation signal checked by sessions at every suspension point.
///
/// # Invariants
/// - Cancellation is sticky: once set it is never cleared.
/// - Cloning shares the underlying flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    /// Shared cancellation flag.
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Creates a new, uncancelled token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Signals cancellation to every holder of the token.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Returns `true` once cancellation has been signalled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Returns `Ok` while uncancelled, [`StoreError::Cancelled`] afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Cancelled`] once cancellation has fired.
    pub fn check(&self) -> Result<(), StoreError> {
        if self.is_cancelled() {
            return Err(StoreError::Cancelled);
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Mutations
// ============================================================================

/// Kind of a buffered write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    /// Insert a new row; fails at commit when the identity exists.
    Insert,
    /// Rewrite an existing row; fails at commit when the identity is absent.
    Update,
}

/// One buffered write of a record into a replicated table.
///
/// # Invariants
/// - The record always carries the commit-timestamp sentinel; constructors
///   reject records with a client-assigned commit time before anything is
///   buffered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mutation {
    /// Whether this mutation inserts or updates.
    pub kind: MutationKind,
    /// Target replicated table.
    pub table: ReplicatedTable,
    /// Record payload carrying the commit-timestamp sentinel.
    pub record: Record,
}

impl Mutation {
    /// Builds an insert mutation.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Invalid`] when the record does not carry the
    /// commit-timestamp sentinel.
    pub fn insert(table: ReplicatedTable, record: Record) -> Result<Self, StoreError> {
        Self::build(MutationKind::Insert, table, record)
    }

    /// Builds an update mutation.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Invalid`] when the record does not carry the
    /// commit-timestamp sentinel.
    pub fn update(table: ReplicatedTable, record: Record) -> Result<Self, StoreError> {
        Self::build(MutationKind::Update, table, record)
    }

    /// Validates the sentinel invariant and assembles the mutation.
    fn build(
        kind: MutationKind,
        table: ReplicatedTable,
        record: Record,
    ) -> Result<Self, StoreError> {
        if let CommitTime::Assigned(value) = record.committed_at {
            return Err(StoreError::Invalid(format!(
                "mutation for {table} carries a client-assigned commit time: {value}"
            )));
        }
        Ok(Self {
            kind,
            table,
            record,
        })
    }
}

// ============================================================================
// SECTION: Queries
// ============================================================================

/// Statically-checked query forms issued by workload operations.
///
/// The engine never carries raw SQL; backends translate these forms into
/// their own dialect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    /// Storage-side pseudo-random sample of at most one row.
    SampleOne {
        /// Table to sample from.
        table: ReplicatedTable,
    },
    /// Index-forced lookup of rows matching a secondary key.
    BySecondaryKey {
        /// Table to query.
        table: ReplicatedTable,
        /// Secondary key to match.
        key: SecondaryKey,
    },
}

/// Finite, single-pass sequence of rows produced by a query.
///
/// Callers must drain the iterator or drop it before issuing further calls
/// on the transaction handle.
pub type RowIter<'a> = Box<dyn Iterator<Item = Result<Row, StoreError>> + 'a>;

// ============================================================================
// SECTION: Transactions
// ============================================================================

/// Outcome of a committed read-write transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitOutcome {
    /// Server-assigned commit timestamp; assigned even when the transaction
    /// buffered zero mutations.
    pub commit_timestamp: Timestamp,
    /// Number of times the transaction body ran before the final result.
    pub attempts: u32,
}

/// Transaction handle passed to read-write transaction bodies.
///
/// # Invariants
/// - Reads observe a single consistent snapshot for the whole attempt.
/// - Buffered mutations are deferred until commit and discarded when the
///   attempt does not commit.
pub trait ReadWriteTransaction {
    /// Reads one row by identity.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when the identity is absent, or any
    /// other [`StoreError`] on transport failure.
    fn point_read(&mut self, table: ReplicatedTable, id: &RecordId) -> Result<Row, StoreError>;

    /// Executes a query, yielding a finite single-pass row sequence.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the query cannot be issued; per-row
    /// failures surface through the iterator items.
    fn query(&mut self, query: &Query) -> Result<RowIter<'_>, StoreError>;

    /// Buffers mutations for application at commit.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the buffer rejects the mutations.
    fn buffer_write(&mut self, mutations: Vec<Mutation>) -> Result<(), StoreError>;
}

/// Transaction body invoked by [`StoreSession::read_write`].
pub type TransactionBody<'a> =
    dyn FnMut(&mut dyn ReadWriteTransaction) -> Result<(), StoreError> + 'a;

// ============================================================================
// SECTION: Store Session
// ============================================================================

/// Opaque handle to a pooled connection to the transactional store.
///
/// Sessions are shared process-wide, used concurrently by callers, and never
/// mutated by the workload engine.
pub trait StoreSession {
    /// Executes `work` in a read-write transaction with automatic retry on
    /// transient contention, blocking until a final commit or final error.
    ///
    /// `work` may be invoked multiple times; every invocation sees a fresh
    /// transaction and an empty mutation buffer, so bodies must be
    /// repeatable functions of their inputs.
    ///
    /// # Errors
    ///
    /// Returns the body's error unchanged, [`StoreError::Aborted`] when
    /// contention retries are exhausted, or [`StoreError::Cancelled`] when
    /// the token fires mid-transaction.
    fn read_write(
        &self,
        cancel: &CancelToken,
        work: &mut TransactionBody<'_>,
    ) -> Result<CommitOutcome, StoreError>;

    /// Executes a non-transactional snapshot read outside any read-write
    /// transaction.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the read fails or cancellation fires.
    fn single_read(&self, cancel: &CancelToken, query: &Query) -> Result<Vec<Row>, StoreError>;
}
