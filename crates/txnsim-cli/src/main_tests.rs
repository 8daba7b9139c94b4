// crates/txnsim-cli/src/main_tests.rs
// ============================================================================
// Module: CLI Main Helpers Tests
// Description: Unit tests for the command-line definition and overrides.
// Purpose: Ensure argument parsing stays consistent and overrides apply.
// Dependencies: txnsim-cli main helpers
// ============================================================================

//! ## Overview
//! Validates the clap command definition and the flag parsing used to
//! override configuration values.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only panic-based assertions are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;

use clap::CommandFactory;
use clap::Parser;

use super::Cli;

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn command_definition_is_consistent() {
    Cli::command().debug_assert();
}

#[test]
fn parses_all_override_flags() {
    let cli = Cli::parse_from([
        "txnsim",
        "--config",
        "custom.toml",
        "--rounds",
        "3",
        "--database",
        "custom.db",
        "--round-delay-ms",
        "250",
    ]);
    assert_eq!(cli.config, Some(PathBuf::from("custom.toml")));
    assert_eq!(cli.rounds, Some(3));
    assert_eq!(cli.database, Some(PathBuf::from("custom.db")));
    assert_eq!(cli.round_delay_ms, Some(250));
}

#[test]
fn defaults_to_no_overrides() {
    let cli = Cli::parse_from(["txnsim"]);
    assert!(cli.config.is_none());
    assert!(cli.rounds.is_none());
    assert!(cli.database.is_none());
    assert!(cli.round_delay_ms.is_none());
}
