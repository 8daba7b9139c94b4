// crates/txnsim-cli/src/main.rs
// ============================================================================
// Module: txnsim CLI Entry Point
// Description: Workload driver running the access patterns against SQLite.
// Purpose: Load configuration, open the store session, and drive rounds.
// Dependencies: clap, tracing, txnsim-config, txnsim-core, txnsim-store-sqlite
// ============================================================================

//! ## Overview
//! The driver loads configuration, opens the `SQLite` store session, and
//! runs the workload operations in sequential rounds with a configurable
//! delay between rounds. A failed operation is logged and the round
//! continues; only startup failures terminate the process.

// ============================================================================
// SECTION: Modules
// ============================================================================

#[cfg(test)]
mod main_tests;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use thiserror::Error;
use txnsim_config::ConfigError;
use txnsim_config::TxnSimConfig;
use txnsim_core::CancelToken;
use txnsim_core::CommitOutcome;
use txnsim_core::RecordId;
use txnsim_core::RecordWorkload;
use txnsim_core::WorkloadError;
use txnsim_store_sqlite::SqliteSession;
use txnsim_store_sqlite::SqliteSessionError;

// ============================================================================
// SECTION: CLI
// ============================================================================

/// Workload driver command line.
#[derive(Parser, Debug)]
#[command(name = "txnsim", version, about = "Transactional store workload driver")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Override the number of workload rounds.
    #[arg(long, value_name = "N")]
    rounds: Option<u64>,
    /// Override the database file path.
    #[arg(long, value_name = "PATH")]
    database: Option<PathBuf>,
    /// Override the delay between rounds in milliseconds.
    #[arg(long, value_name = "MS")]
    round_delay_ms: Option<u64>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Driver startup errors.
#[derive(Debug, Error)]
enum DriverError {
    /// Configuration failed to load or validate.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Store session failed to open.
    #[error(transparent)]
    Session(#[from] SqliteSessionError),
}

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(error = %error, "driver failed to start");
            ExitCode::FAILURE
        }
    }
}

/// Loads configuration, opens the session, and drives the workload rounds.
fn run() -> Result<(), DriverError> {
    let cli = Cli::parse();
    let mut config = TxnSimConfig::load_or_default(cli.config.as_deref())?;
    if let Some(rounds) = cli.rounds {
        config.driver.rounds = rounds;
    }
    if let Some(database) = cli.database {
        config.store.path = database;
    }
    if let Some(round_delay_ms) = cli.round_delay_ms {
        config.driver.round_delay_ms = round_delay_ms;
    }
    config.validate()?;

    tracing::info!(
        database = %config.store.path.display(),
        rounds = config.driver.rounds,
        round_delay_ms = config.driver.round_delay_ms,
        "starting workload driver"
    );
    let session = SqliteSession::open(config.store.clone())?;
    let workload = RecordWorkload::new(session);
    let cancel = CancelToken::new();
    let delay = Duration::from_millis(config.driver.round_delay_ms);

    for round in 1 ..= config.driver.rounds {
        tracing::info!(round, "workload round");
        run_round(&workload, &cancel, config.driver.insert_per_round);
        if round < config.driver.rounds {
            std::thread::sleep(delay);
        }
    }
    tracing::info!(rounds = config.driver.rounds, "workload driver finished");
    Ok(())
}

/// Runs every workload operation once, logging failures and continuing.
fn run_round(workload: &RecordWorkload<SqliteSession>, cancel: &CancelToken, inserts: u64) {
    for _ in 0 .. inserts {
        report("insert", workload.insert(cancel, &RecordId::random()));
    }
    report("sampled_update", workload.sampled_update(cancel));
    report("conditional_upsert", workload.conditional_upsert(cancel));
    report("index_lookup_update", workload.index_lookup_update(cancel));
    report("index_lookup_insert_heavy", workload.index_lookup_insert_heavy(cancel));
    report("combined_read_write", workload.combined_read_write(cancel));
    report("compound_write", workload.compound_write(cancel, &RecordId::random()));
}

/// Logs one operation result at the appropriate level.
fn report(operation: &'static str, result: Result<CommitOutcome, WorkloadError>) {
    match result {
        Ok(outcome) => {
            tracing::info!(
                operation,
                commit_timestamp = %outcome.commit_timestamp,
                attempts = outcome.attempts,
                "operation committed"
            );
        }
        Err(error) => {
            tracing::error!(operation, error = %error, "operation failed");
        }
    }
}
