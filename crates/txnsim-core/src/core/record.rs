// crates/txnsim-core/src/core/record.rs
// ============================================================================
// Module: txnsim Record Model
// Description: The record entity, replicated table set, and static row mapping.
// Purpose: Provide the unit entity written and read by every workload operation.
// Dependencies: rand, serde, thiserror
// ============================================================================

//! ## Overview
//! A [`Record`] is one logical row: a caller-generated identity, an optional
//! secondary key for index lookup, a creation time set at mutation-build
//! time, and a commit time owned by the store. Logically the same record is
//! replicated across three tables written together in one transaction.
//!
//! The mapping between records and the store's row representation is a
//! static column table ([`RECORD_COLUMNS`]); backends validate their
//! physical schema against it once at startup rather than resolving fields
//! by name per row.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use rand::Rng;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::time::CommitTime;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Identifiers
// ============================================================================

/// Record identity: an opaque unique string key, caller-generated.
///
/// # Invariants
/// - Opaque UTF-8 string; no normalization or validation is applied.
/// - Never generated by the entity model itself; callers supply it before
///   any insert (the [`RecordId::random`] helper is still caller-invoked).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Creates a new record identity.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh random identity (128 random bits as hex).
    #[must_use]
    pub fn random() -> Self {
        let value: u128 = rand::thread_rng().r#gen();
        Self(format!("{value:032x}"))
    }

    /// Returns the identity as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` when the identity is the empty string.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for RecordId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Secondary key used for index-based lookup.
///
/// # Invariants
/// - Opaque UTF-8 string, independent of the record identity.
/// - Not guaranteed unique across records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SecondaryKey(String);

impl SecondaryKey {
    /// Creates a new secondary key.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Generates a fresh random secondary key (128 random bits as hex).
    #[must_use]
    pub fn random() -> Self {
        let value: u128 = rand::thread_rng().r#gen();
        Self(format!("{value:032x}"))
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SecondaryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for SecondaryKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for SecondaryKey {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

// ============================================================================
// SECTION: Replicated Tables
// ============================================================================

/// One of the three identical tables holding copies of the same record.
///
/// # Invariants
/// - Every logical insert fans out to all three tables atomically.
/// - Storage names are stable and lowercase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplicatedTable {
    /// First replicated table; sampled queries and point reads target it.
    Entity0,
    /// Second replicated table.
    Entity1,
    /// Third replicated table.
    Entity2,
}

impl ReplicatedTable {
    /// All replicated tables in fan-out order.
    pub const ALL: [Self; 3] = [Self::Entity0, Self::Entity1, Self::Entity2];

    /// Returns the stable storage name of the table.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Entity0 => "entity0",
            Self::Entity1 => "entity1",
            Self::Entity2 => "entity2",
        }
    }

    /// Returns the zero-based table index.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Entity0 => 0,
            Self::Entity1 => 1,
            Self::Entity2 => 2,
        }
    }
}

impl fmt::Display for ReplicatedTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// SECTION: Row Representation
// ============================================================================

/// Typed cell value in a store row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// UTF-8 text value.
    Text(String),
    /// Timestamp value in unix microseconds.
    Timestamp(Timestamp),
    /// Absent value for nullable columns.
    Null,
}

/// One row as produced by a store read or query.
///
/// # Invariants
/// - Column order and names follow [`RECORD_COLUMNS`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    /// Ordered column name/value pairs.
    columns: Vec<(String, Value)>,
}

impl Row {
    /// Creates a row from ordered column name/value pairs.
    #[must_use]
    pub fn new(columns: Vec<(String, Value)>) -> Self {
        Self {
            columns,
        }
    }

    /// Returns the value of the named column when present.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.columns.iter().find(|(column, _)| column == name).map(|(_, value)| value)
    }

    /// Returns the ordered column name/value pairs.
    #[must_use]
    pub fn columns(&self) -> &[(String, Value)] {
        &self.columns
    }
}

/// Expected type of a mapped column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// Required text column.
    Text,
    /// Nullable text column.
    OptionalText,
    /// Required timestamp column.
    Timestamp,
}

/// Static specification of one mapped column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    /// Stable column name.
    pub name: &'static str,
    /// Expected value kind.
    pub kind: ColumnKind,
}

/// Static column mapping for the record entity, in storage order.
///
/// Backends validate their physical schema against this table once at
/// startup; per-row decoding never resolves fields dynamically.
pub const RECORD_COLUMNS: [ColumnSpec; 4] = [
    ColumnSpec {
        name: "id",
        kind: ColumnKind::Text,
    },
    ColumnSpec {
        name: "secondary_key",
        kind: ColumnKind::OptionalText,
    },
    ColumnSpec {
        name: "created_at",
        kind: ColumnKind::Timestamp,
    },
    ColumnSpec {
        name: "committed_at",
        kind: ColumnKind::Timestamp,
    },
];

/// Row mapping errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RowMapError {
    /// A mapped column is missing from the row.
    #[error("row is missing column: {column}")]
    MissingColumn {
        /// Name of the missing column.
        column: &'static str,
    },
    /// A row value does not match the mapped column kind.
    #[error("row column has unexpected type: {column}")]
    TypeMismatch {
        /// Name of the mismatched column.
        column: &'static str,
    },
    /// A row arrived without an assigned commit timestamp.
    #[error("row has no assigned commit timestamp: {id}")]
    MissingCommitTimestamp {
        /// Identity of the offending row.
        id: String,
    },
}

// ============================================================================
// SECTION: Record
// ============================================================================

/// The unit entity written and read by all workload operations.
///
/// # Invariants
/// - `id` is caller-supplied before any insert.
/// - Every write carries [`CommitTime::Pending`]; the store assigns the true
///   commit time atomically at commit.
/// - Records are never deleted by the workload engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Opaque unique identity, caller-generated.
    pub id: RecordId,
    /// Optional secondary key for index lookup.
    pub secondary_key: Option<SecondaryKey>,
    /// Wall-clock creation time set at mutation-build time.
    pub created_at: Timestamp,
    /// Commit time: the sentinel on writes, assigned on reads.
    pub committed_at: CommitTime,
}

impl Record {
    /// Creates a new record carrying the commit-timestamp sentinel.
    #[must_use]
    pub const fn new(
        id: RecordId,
        secondary_key: Option<SecondaryKey>,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id,
            secondary_key,
            created_at,
            committed_at: CommitTime::Pending,
        }
    }

    /// Returns the zero-value record: empty identity, zero creation time.
    ///
    /// This is the value retained when a sampling query returns no rows.
    #[must_use]
    pub fn zero() -> Self {
        Self::new(RecordId::new(""), None, Timestamp::from_unix_micros(0))
    }

    /// Rebuilds the record for re-saving: same fields, pending commit time.
    #[must_use]
    pub fn with_pending_commit(mut self) -> Self {
        self.committed_at = CommitTime::Pending;
        self
    }

    /// Decodes a record from a store row using the static column mapping.
    ///
    /// # Errors
    ///
    /// Returns [`RowMapError`] when a mapped column is missing, has the
    /// wrong type, or the commit timestamp is absent.
    pub fn from_row(row: &Row) -> Result<Self, RowMapError> {
        let id = match required(row, &RECORD_COLUMNS[0])? {
            Value::Text(text) => RecordId::new(text.clone()),
            _ => {
                return Err(RowMapError::TypeMismatch {
                    column: RECORD_COLUMNS[0].name,
                });
            }
        };
        let secondary_key = match required(row, &RECORD_COLUMNS[1])? {
            Value::Text(text) => Some(SecondaryKey::new(text.clone())),
            Value::Null => None,
            Value::Timestamp(_) => {
                return Err(RowMapError::TypeMismatch {
                    column: RECORD_COLUMNS[1].name,
                });
            }
        };
        let created_at = match required(row, &RECORD_COLUMNS[2])? {
            Value::Timestamp(value) => *value,
            _ => {
                return Err(RowMapError::TypeMismatch {
                    column: RECORD_COLUMNS[2].name,
                });
            }
        };
        let committed_at = match required(row, &RECORD_COLUMNS[3])? {
            Value::Timestamp(value) => CommitTime::Assigned(*value),
            Value::Null => {
                return Err(RowMapError::MissingCommitTimestamp {
                    id: id.to_string(),
                });
            }
            Value::Text(_) => {
                return Err(RowMapError::TypeMismatch {
                    column: RECORD_COLUMNS[3].name,
                });
            }
        };
        Ok(Self {
            id,
            secondary_key,
            created_at,
            committed_at,
        })
    }

    /// Encodes the record as a store row using the static column mapping.
    ///
    /// A pending commit time encodes as [`Value::Null`]; only the store's
    /// commit path produces rows with assigned commit timestamps.
    #[must_use]
    pub fn to_row(&self) -> Row {
        let committed = match self.committed_at {
            CommitTime::Pending => Value::Null,
            CommitTime::Assigned(value) => Value::Timestamp(value),
        };
        Row::new(vec![
            (RECORD_COLUMNS[0].name.to_string(), Value::Text(self.id.to_string())),
            (
                RECORD_COLUMNS[1].name.to_string(),
                self.secondary_key
                    .as_ref()
                    .map_or(Value::Null, |key| Value::Text(key.to_string())),
            ),
            (RECORD_COLUMNS[2].name.to_string(), Value::Timestamp(self.created_at)),
            (RECORD_COLUMNS[3].name.to_string(), committed),
        ])
    }
}

/// Looks up a mapped column, failing when it is absent.
fn required<'a>(row: &'a Row, spec: &ColumnSpec) -> Result<&'a Value, RowMapError> {
    row.get(spec.name).ok_or(RowMapError::MissingColumn {
        column: spec.name,
    })
}
