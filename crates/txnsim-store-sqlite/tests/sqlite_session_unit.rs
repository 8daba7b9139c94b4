// crates/txnsim-store-sqlite/tests/sqlite_session_unit.rs
// ============================================================================
// Module: SQLite Session Unit Tests
// Description: Targeted tests for the SQLite store session.
// Purpose: Validate path safety, schema bootstrap and validation, mutation
//          semantics, index-forced lookups, and concurrency safety.
// ============================================================================

//! ## Overview
//! Unit-level tests for `SQLite` session invariants:
//! - Config and path safety checks (fail-closed)
//! - Schema bootstrap, reopen, and column-mapping validation
//! - Insert/update semantics (duplicate and missing identities)
//! - Workload operations end to end on a real database file
//! - Snapshot reads rotating across the warm reader pool
//! - Concurrency safety (multi-threaded upserts)

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::path::PathBuf;
use std::thread;

use tempfile::TempDir;
use txnsim_core::CancelToken;
use txnsim_core::Mutation;
use txnsim_core::Query;
use txnsim_core::Record;
use txnsim_core::RecordId;
use txnsim_core::RecordWorkload;
use txnsim_core::ReplicatedTable;
use txnsim_core::SecondaryKey;
use txnsim_core::StoreError;
use txnsim_core::StoreSession;
use txnsim_core::Timestamp;
use txnsim_core::WorkloadError;
use txnsim_store_sqlite::SqliteSession;
use txnsim_store_sqlite::SqliteSessionConfig;
use txnsim_store_sqlite::SqliteSessionError;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn temp_db(dir: &TempDir) -> PathBuf {
    dir.path().join("workload.db")
}

fn open_session(dir: &TempDir) -> SqliteSession {
    SqliteSession::open(SqliteSessionConfig::new(temp_db(dir))).expect("open session")
}

fn table_count(dir: &TempDir, table: ReplicatedTable) -> usize {
    let connection = rusqlite::Connection::open(temp_db(dir)).expect("open raw connection");
    let count: i64 = connection
        .query_row(&format!("SELECT COUNT(*) FROM {}", table.name()), [], |row| row.get(0))
        .expect("count rows");
    usize::try_from(count).expect("non-negative count")
}

fn counts(dir: &TempDir) -> [usize; 3] {
    [
        table_count(dir, ReplicatedTable::Entity0),
        table_count(dir, ReplicatedTable::Entity1),
        table_count(dir, ReplicatedTable::Entity2),
    ]
}

// ============================================================================
// SECTION: Config and Path Safety
// ============================================================================

#[test]
fn open_rejects_zero_min_sessions() {
    let dir = TempDir::new().expect("tempdir");
    let mut config = SqliteSessionConfig::new(temp_db(&dir));
    config.min_sessions = 0;
    let error = SqliteSession::open(config).expect_err("must fail closed");
    assert!(matches!(error, SqliteSessionError::Invalid(_)));
}

#[test]
fn open_rejects_zero_attempt_budget() {
    let dir = TempDir::new().expect("tempdir");
    let mut config = SqliteSessionConfig::new(temp_db(&dir));
    config.max_txn_attempts = 0;
    let error = SqliteSession::open(config).expect_err("must fail closed");
    assert!(matches!(error, SqliteSessionError::Invalid(_)));
}

#[test]
fn open_rejects_directory_path() {
    let dir = TempDir::new().expect("tempdir");
    let config = SqliteSessionConfig::new(dir.path().to_path_buf());
    let error = SqliteSession::open(config).expect_err("directory path must be rejected");
    assert!(matches!(error, SqliteSessionError::Invalid(_)));
}

#[test]
fn open_rejects_overlong_path_component() {
    let dir = TempDir::new().expect("tempdir");
    let config = SqliteSessionConfig::new(dir.path().join("a".repeat(300)));
    let error = SqliteSession::open(config).expect_err("overlong component must be rejected");
    assert!(matches!(error, SqliteSessionError::Invalid(_)));
}

// ============================================================================
// SECTION: Schema
// ============================================================================

#[test]
fn open_bootstraps_schema_and_reopens_cleanly() {
    let dir = TempDir::new().expect("tempdir");
    {
        let _session = open_session(&dir);
    }
    let _session = open_session(&dir);
    assert_eq!(counts(&dir), [0, 0, 0]);
}

#[test]
fn open_rejects_mismatched_column_layout() {
    let dir = TempDir::new().expect("tempdir");
    let connection = rusqlite::Connection::open(temp_db(&dir)).expect("open raw connection");
    connection
        .execute_batch(
            "CREATE TABLE store_meta (version INTEGER NOT NULL);
            INSERT INTO store_meta (version) VALUES (1);
            CREATE TABLE entity0 (id TEXT PRIMARY KEY, extra TEXT);
            CREATE TABLE entity1 (id TEXT PRIMARY KEY, extra TEXT);
            CREATE TABLE entity2 (id TEXT PRIMARY KEY, extra TEXT);",
        )
        .expect("seed foreign schema");
    drop(connection);

    let error = SqliteSession::open(SqliteSessionConfig::new(temp_db(&dir)))
        .expect_err("foreign schema must be rejected");
    assert!(matches!(error, SqliteSessionError::SchemaMismatch(_)));
}

#[test]
fn open_rejects_unsupported_schema_version() {
    let dir = TempDir::new().expect("tempdir");
    let connection = rusqlite::Connection::open(temp_db(&dir)).expect("open raw connection");
    connection
        .execute_batch(
            "CREATE TABLE store_meta (version INTEGER NOT NULL);
            INSERT INTO store_meta (version) VALUES (99);",
        )
        .expect("seed version");
    drop(connection);

    let error = SqliteSession::open(SqliteSessionConfig::new(temp_db(&dir)))
        .expect_err("unknown version must be rejected");
    assert!(matches!(error, SqliteSessionError::VersionMismatch(_)));
}

// ============================================================================
// SECTION: Mutation Semantics
// ============================================================================

#[test]
fn insert_fans_out_and_duplicate_fails_without_partial_write() {
    let dir = TempDir::new().expect("tempdir");
    let workload = RecordWorkload::new(open_session(&dir));
    let cancel = CancelToken::new();
    let id = RecordId::new("A");

    workload.insert(&cancel, &id).expect("insert");
    assert_eq!(counts(&dir), [1, 1, 1]);

    let error = workload.insert(&cancel, &id).expect_err("duplicate must fail");
    assert_eq!(
        error,
        WorkloadError::Store(StoreError::AlreadyExists {
            table: ReplicatedTable::Entity0,
            id: "A".to_string(),
        })
    );
    assert_eq!(counts(&dir), [1, 1, 1]);
}

#[test]
fn sampled_update_on_empty_database_reports_empty_identity_missing() {
    let dir = TempDir::new().expect("tempdir");
    let workload = RecordWorkload::new(open_session(&dir));
    let cancel = CancelToken::new();

    let error = workload.sampled_update(&cancel).expect_err("empty sample must fail");
    assert_eq!(
        error,
        WorkloadError::Store(StoreError::NotFound {
            table: ReplicatedTable::Entity0,
            id: String::new(),
        })
    );
    assert_eq!(counts(&dir), [0, 0, 0]);
}

#[test]
fn sampled_update_advances_commit_time_of_existing_row() {
    let dir = TempDir::new().expect("tempdir");
    let workload = RecordWorkload::new(open_session(&dir));
    let cancel = CancelToken::new();
    let id = RecordId::new("A");

    let insert = workload.insert(&cancel, &id).expect("insert");
    let update = workload.sampled_update(&cancel).expect("sampled update");
    assert!(update.commit_timestamp > insert.commit_timestamp);
}

#[test]
fn conditional_upsert_branches_cover_insert_and_update() {
    let dir = TempDir::new().expect("tempdir");
    let workload = RecordWorkload::new(open_session(&dir));
    let cancel = CancelToken::new();
    let id = RecordId::new("B");

    workload.conditional_upsert_with(&cancel, &id).expect("insert branch");
    assert_eq!(counts(&dir), [1, 0, 0]);
    workload.conditional_upsert_with(&cancel, &id).expect("update branch");
    assert_eq!(counts(&dir), [1, 0, 0]);
}

// ============================================================================
// SECTION: Index Lookup
// ============================================================================

#[test]
fn index_lookup_update_sees_committed_secondary_key() {
    let dir = TempDir::new().expect("tempdir");
    let workload = RecordWorkload::new(open_session(&dir));
    let cancel = CancelToken::new();

    workload.index_lookup_update(&cancel).expect("index lookup update");
    assert_eq!(counts(&dir), [1, 1, 1]);
}

#[test]
fn index_lookup_insert_heavy_adds_a_record_under_the_same_key() {
    let dir = TempDir::new().expect("tempdir");
    let workload = RecordWorkload::new(open_session(&dir));
    let cancel = CancelToken::new();

    workload.index_lookup_insert_heavy(&cancel).expect("index lookup insert");
    assert_eq!(counts(&dir), [2, 1, 1]);
}

// ============================================================================
// SECTION: Combined and Compound Operations
// ============================================================================

#[test]
fn combined_read_write_commits_with_zero_mutations() {
    let dir = TempDir::new().expect("tempdir");
    let workload = RecordWorkload::new(open_session(&dir));
    let cancel = CancelToken::new();

    let outcome = workload.combined_read_write(&cancel).expect("empty-mutation commit");
    assert_eq!(outcome.attempts, 1);
    assert_eq!(counts(&dir), [0, 0, 0]);
}

#[test]
fn compound_write_applies_all_branches_in_one_transaction() {
    let dir = TempDir::new().expect("tempdir");
    let workload = RecordWorkload::new(open_session(&dir));
    let cancel = CancelToken::new();

    workload.insert(&cancel, &RecordId::new("A")).expect("seed insert");
    workload.compound_write(&cancel, &RecordId::new("C")).expect("compound write");
    assert_eq!(counts(&dir), [3, 2, 2]);
}

// ============================================================================
// SECTION: Snapshot Read
// ============================================================================

#[test]
fn single_read_serves_both_query_forms_across_the_warm_pool() {
    let dir = TempDir::new().expect("tempdir");
    let mut config = SqliteSessionConfig::new(temp_db(&dir));
    config.min_sessions = 2;
    let session = SqliteSession::open(config).expect("open session");
    let cancel = CancelToken::new();
    let key = SecondaryKey::new("k");

    session
        .read_write(&cancel, &mut |txn| {
            let record =
                Record::new(RecordId::new("A"), Some(SecondaryKey::new("k")), Timestamp::now());
            txn.buffer_write(vec![Mutation::insert(ReplicatedTable::Entity0, record)?])
        })
        .expect("seed entity0");

    // More reads than pooled readers, so the rotation wraps around and every
    // pooled connection observes the committed write.
    for _ in 0 .. 5 {
        let sampled = session
            .single_read(
                &cancel,
                &Query::SampleOne {
                    table: ReplicatedTable::Entity0,
                },
            )
            .expect("sample read");
        assert_eq!(sampled.len(), 1);
        let record = Record::from_row(&sampled[0]).expect("decode sampled row");
        assert_eq!(record.id, RecordId::new("A"));

        let matched = session
            .single_read(
                &cancel,
                &Query::BySecondaryKey {
                    table: ReplicatedTable::Entity0,
                    key: key.clone(),
                },
            )
            .expect("secondary-key read");
        assert_eq!(matched.len(), 1);
    }

    let missed = session
        .single_read(
            &cancel,
            &Query::BySecondaryKey {
                table: ReplicatedTable::Entity0,
                key: SecondaryKey::new("absent"),
            },
        )
        .expect("secondary-key miss");
    assert!(missed.is_empty());
}

// ============================================================================
// SECTION: Concurrency
// ============================================================================

#[test]
fn concurrent_upserts_from_many_threads_produce_exactly_one_row_each() {
    const WRITERS: usize = 8;
    let dir = TempDir::new().expect("tempdir");
    let workload = RecordWorkload::new(open_session(&dir));
    let cancel = CancelToken::new();

    thread::scope(|scope| {
        for _ in 0 .. WRITERS {
            let workload = workload.clone();
            let cancel = cancel.clone();
            scope.spawn(move || {
                workload.conditional_upsert(&cancel).expect("concurrent upsert");
            });
        }
    });

    assert_eq!(counts(&dir), [WRITERS, 0, 0]);
}

// ============================================================================
// SECTION: Cancellation
// ============================================================================

#[test]
fn cancelled_token_fails_before_touching_the_database() {
    let dir = TempDir::new().expect("tempdir");
    let workload = RecordWorkload::new(open_session(&dir));
    let cancel = CancelToken::new();
    cancel.cancel();

    let error = workload.insert(&cancel, &RecordId::new("never")).expect_err("must cancel");
    assert_eq!(error, WorkloadError::Store(StoreError::Cancelled));
    assert_eq!(counts(&dir), [0, 0, 0]);
}
