// crates/txnsim-core/src/runtime/mod.rs
// ============================================================================
// Module: txnsim Runtime
// Description: Session implementations bundled with the core engine.
// Purpose: Provide a deterministic in-memory session for tests and demos.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! Runtime modules host session implementations that ship with the core:
//! currently the in-memory reference session. Production backends live in
//! their own crates and implement the same interfaces.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod memory;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use memory::InMemorySession;
