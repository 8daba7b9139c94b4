// crates/txnsim-config/src/lib.rs
// ============================================================================
// Module: txnsim Configuration
// Description: Configuration loading and validation for the workload driver.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: serde, toml, txnsim-store-sqlite
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path
//! limits. Missing or invalid values fail closed; the driver only runs with
//! a configuration it fully understands.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::ConfigError;
pub use config::DriverConfig;
pub use config::TxnSimConfig;
