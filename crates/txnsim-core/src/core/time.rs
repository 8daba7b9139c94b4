// crates/txnsim-core/src/core/time.rs
// ============================================================================
// Module: txnsim Time Model
// Description: Timestamp and commit-time sentinel representations.
// Purpose: Distinguish caller-assigned creation times from server-assigned commit times.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! txnsim carries two kinds of time: wall-clock creation times set by the
//! writer at mutation-build time, and commit times assigned by the store at
//! transaction commit. A record is always written with the commit-timestamp
//! sentinel ([`CommitTime::Pending`]); only the store may replace it with an
//! assigned value, and assigned values are the only timestamps trusted for
//! ordering across concurrent writers.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Timestamp
// ============================================================================

/// Canonical timestamp used in record fields and commit outcomes.
///
/// # Invariants
/// - Values are unix microseconds.
/// - Ordering follows the integer value; strict ordering across commits is a
///   store responsibility, not enforced by this type.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Creates a timestamp from unix microseconds.
    #[must_use]
    pub const fn from_unix_micros(micros: i64) -> Self {
        Self(micros)
    }

    /// Returns the timestamp as unix microseconds.
    #[must_use]
    pub const fn as_unix_micros(self) -> i64 {
        self.0
    }

    /// Reads the current wall-clock time.
    #[must_use]
    pub fn now() -> Self {
        let nanos = time::OffsetDateTime::now_utc().unix_timestamp_nanos();
        Self(i64::try_from(nanos / 1_000).unwrap_or(i64::MAX))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ============================================================================
// SECTION: Commit Time
// ============================================================================

/// Commit time of a record: the sentinel or a server-assigned value.
///
/// # Invariants
/// - Callers only ever construct [`CommitTime::Pending`] when building
///   mutations; [`CommitTime::Assigned`] values originate from the store.
/// - A record read back from the store always carries an assigned value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum CommitTime {
    /// Sentinel meaning "assign the server's commit timestamp at commit".
    Pending,
    /// Commit timestamp assigned by the store's commit protocol.
    Assigned(Timestamp),
}

impl CommitTime {
    /// Returns `true` when this is the commit-timestamp sentinel.
    #[must_use]
    pub const fn is_pending(self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Returns the assigned commit timestamp when present.
    #[must_use]
    pub const fn assigned(self) -> Option<Timestamp> {
        match self {
            Self::Pending => None,
            Self::Assigned(value) => Some(value),
        }
    }
}
