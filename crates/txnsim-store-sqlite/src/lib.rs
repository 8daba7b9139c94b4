// crates/txnsim-store-sqlite/src/lib.rs
// ============================================================================
// Module: SQLite Store Session
// Description: Durable StoreSession backend using SQLite WAL.
// Purpose: Provide a persistent transactional backend for the workload engine.
// Dependencies: txnsim-core, rusqlite
// ============================================================================

//! ## Overview
//! This crate provides a `SQLite`-backed [`txnsim_core::StoreSession`]
//! implementation: one serialized write connection carrying immediate
//! transactions with transparent retry on contention, plus a warm pool of
//! read connections for non-transactional snapshot reads. Commit timestamps
//! are assigned by the session and strictly increase across commits.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use store::SqliteJournalMode;
pub use store::SqliteSession;
pub use store::SqliteSessionConfig;
pub use store::SqliteSessionError;
pub use store::SqliteSyncMode;
