// crates/txnsim-core/tests/row_mapping.rs
// ============================================================================
// Module: Row Mapping Tests
// Description: Static column mapping between records and store rows.
// Purpose: Validate decode failures, sentinel handling, and mapping stability.
// ============================================================================

//! ## Overview
//! Tests for the static record/row mapping:
//! - Missing-column, type-mismatch, and missing-commit-timestamp failures
//! - Pending commit time encodes as null and never decodes back
//! - Mutation constructors reject client-assigned commit times
//! - Property: decoded committed rows re-encode to the same row

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use proptest::prelude::*;
use txnsim_core::CommitTime;
use txnsim_core::Mutation;
use txnsim_core::Record;
use txnsim_core::RecordId;
use txnsim_core::ReplicatedTable;
use txnsim_core::Row;
use txnsim_core::RowMapError;
use txnsim_core::SecondaryKey;
use txnsim_core::StoreError;
use txnsim_core::Timestamp;
use txnsim_core::Value;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn committed_row(id: &str, secondary_key: Option<&str>, created: i64, committed: i64) -> Row {
    Row::new(vec![
        ("id".to_string(), Value::Text(id.to_string())),
        (
            "secondary_key".to_string(),
            secondary_key.map_or(Value::Null, |key| Value::Text(key.to_string())),
        ),
        ("created_at".to_string(), Value::Timestamp(Timestamp::from_unix_micros(created))),
        ("committed_at".to_string(), Value::Timestamp(Timestamp::from_unix_micros(committed))),
    ])
}

// ============================================================================
// SECTION: Decode Failures
// ============================================================================

#[test]
fn from_row_rejects_missing_column() {
    let row = Row::new(vec![("id".to_string(), Value::Text("A".to_string()))]);
    assert_eq!(
        Record::from_row(&row),
        Err(RowMapError::MissingColumn {
            column: "secondary_key",
        })
    );
}

#[test]
fn from_row_rejects_type_mismatch() {
    let row = Row::new(vec![
        ("id".to_string(), Value::Timestamp(Timestamp::from_unix_micros(1))),
        ("secondary_key".to_string(), Value::Null),
        ("created_at".to_string(), Value::Timestamp(Timestamp::from_unix_micros(1))),
        ("committed_at".to_string(), Value::Timestamp(Timestamp::from_unix_micros(2))),
    ]);
    assert_eq!(
        Record::from_row(&row),
        Err(RowMapError::TypeMismatch {
            column: "id",
        })
    );
}

#[test]
fn from_row_rejects_null_commit_timestamp() {
    let row = Row::new(vec![
        ("id".to_string(), Value::Text("A".to_string())),
        ("secondary_key".to_string(), Value::Null),
        ("created_at".to_string(), Value::Timestamp(Timestamp::from_unix_micros(1))),
        ("committed_at".to_string(), Value::Null),
    ]);
    assert_eq!(
        Record::from_row(&row),
        Err(RowMapError::MissingCommitTimestamp {
            id: "A".to_string(),
        })
    );
}

// ============================================================================
// SECTION: Sentinel Handling
// ============================================================================

#[test]
fn pending_commit_time_encodes_as_null() {
    let record = Record::new(RecordId::new("A"), None, Timestamp::from_unix_micros(7));
    let row = record.to_row();
    assert_eq!(row.get("committed_at"), Some(&Value::Null));
}

#[test]
fn with_pending_commit_clears_an_assigned_commit_time() {
    let row = committed_row("A", Some("k"), 1, 2);
    let record = Record::from_row(&row).expect("decode committed row");
    assert_eq!(record.committed_at, CommitTime::Assigned(Timestamp::from_unix_micros(2)));
    let resaved = record.with_pending_commit();
    assert_eq!(resaved.committed_at, CommitTime::Pending);
    assert_eq!(resaved.id, RecordId::new("A"));
    assert_eq!(resaved.secondary_key, Some(SecondaryKey::new("k")));
}

#[test]
fn mutation_constructors_reject_assigned_commit_times() {
    let row = committed_row("A", None, 1, 2);
    let record = Record::from_row(&row).expect("decode committed row");
    let err = Mutation::update(ReplicatedTable::Entity0, record).expect_err("must reject");
    assert!(matches!(err, StoreError::Invalid(_)));
}

// ============================================================================
// SECTION: Properties
// ============================================================================

proptest! {
    #[test]
    fn committed_rows_decode_and_reencode_identically(
        id in "[a-f0-9]{1,32}",
        key in proptest::option::of("[a-f0-9]{1,32}"),
        created in 0_i64 .. 1_i64 << 52,
        committed in 1_i64 .. 1_i64 << 52,
    ) {
        let row = committed_row(&id, key.as_deref(), created, committed);
        let record = Record::from_row(&row).expect("decode generated row");
        prop_assert_eq!(record.id.as_str(), id.as_str());
        prop_assert_eq!(record.to_row(), row);
    }
}
