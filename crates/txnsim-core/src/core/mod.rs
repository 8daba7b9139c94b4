// crates/txnsim-core/src/core/mod.rs
// ============================================================================
// Module: txnsim Core Types
// Description: Canonical record entity model and row representation.
// Purpose: Provide stable, serializable types shared by every workload operation.
// Dependencies: rand, serde, time
// ============================================================================

//! ## Overview
//! Core types define the record entity written and read by all workload
//! operations, the replicated table set it fans out to, and the static
//! column mapping between records and the store's row representation.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod record;
pub mod time;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use record::ColumnKind;
pub use record::ColumnSpec;
pub use record::RECORD_COLUMNS;
pub use record::Record;
pub use record::RecordId;
pub use record::ReplicatedTable;
pub use record::Row;
pub use record::RowMapError;
pub use record::SecondaryKey;
pub use record::Value;
pub use time::CommitTime;
pub use time::Timestamp;
