// crates/txnsim-core/src/lib.rs
// ============================================================================
// Module: txnsim Core Library
// Description: Public API surface for the txnsim workload engine.
// Purpose: Expose the entity model, session interfaces, and workload operations.
// Dependencies: crate::{core, interfaces, runtime, workload}
// ============================================================================

//! ## Overview
//! txnsim core implements the transactional workload engine: the record
//! entity model, the backend-agnostic store session interfaces, and the
//! workload operations that compose reads, existence checks, and writes into
//! atomic units. It is backend-agnostic and integrates with concrete stores
//! through explicit interfaces; a deterministic in-memory session is provided
//! for tests and demos.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;
pub mod workload;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use interfaces::CancelToken;
pub use interfaces::CommitOutcome;
pub use interfaces::Mutation;
pub use interfaces::MutationKind;
pub use interfaces::Query;
pub use interfaces::ReadWriteTransaction;
pub use interfaces::RowIter;
pub use interfaces::StoreError;
pub use interfaces::StoreSession;
pub use interfaces::TransactionBody;
pub use runtime::InMemorySession;
pub use workload::RecordWorkload;
pub use workload::WorkloadError;
