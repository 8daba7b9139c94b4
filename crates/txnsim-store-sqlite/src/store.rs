// crates/txnsim-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Store Session
// Description: Durable StoreSession backed by SQLite WAL.
// Purpose: Execute workload transactions against the replicated entity tables.
// Dependencies: txnsim-core, rusqlite, serde, thiserror, tracing
// ============================================================================

//! ## Overview
//! This module implements [`StoreSession`] over `SQLite`. Read-write
//! transactions run on a single serialized write connection using immediate
//! transactions; transient lock contention is retried transparently with
//! linear backoff up to a configured attempt budget, after which the
//! transaction surfaces as aborted. Snapshot reads round-robin over a warm
//! pool of read connections opened at startup.
//!
//! The physical schema is validated against the static column mapping once
//! at open; per-row decoding is positional and never resolves columns by
//! name.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicI64;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::TransactionBehavior;
use rusqlite::params;
use serde::Deserialize;
use thiserror::Error;
use txnsim_core::CancelToken;
use txnsim_core::CommitOutcome;
use txnsim_core::Mutation;
use txnsim_core::MutationKind;
use txnsim_core::Query;
use txnsim_core::RECORD_COLUMNS;
use txnsim_core::ReadWriteTransaction;
use txnsim_core::RecordId;
use txnsim_core::ReplicatedTable;
use txnsim_core::Row;
use txnsim_core::RowIter;
use txnsim_core::StoreError;
use txnsim_core::StoreSession;
use txnsim_core::Timestamp;
use txnsim_core::TransactionBody;
use txnsim_core::Value;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// `SQLite` schema version for the session.
const SCHEMA_VERSION: i64 = 1;
/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Default number of warm read connections.
const DEFAULT_MIN_SESSIONS: usize = 4;
/// Default transaction attempt budget.
const DEFAULT_MAX_TXN_ATTEMPTS: u32 = 5;
/// Default backoff unit between transaction attempts (ms).
const DEFAULT_RETRY_BACKOFF_MS: u64 = 10;
/// Maximum accepted number of warm read connections.
const MAX_MIN_SESSIONS: usize = 64;
/// Maximum accepted transaction attempt budget.
const MAX_TXN_ATTEMPT_LIMIT: u32 = 100;
/// Maximum accepted backoff unit (ms).
const MAX_RETRY_BACKOFF_MS: u64 = 10_000;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;

// ============================================================================
// SECTION: Config
// ============================================================================

/// `SQLite` journal mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteJournalMode {
    /// WAL journal mode (recommended).
    #[default]
    Wal,
    /// Delete journal mode (legacy).
    Delete,
}

impl SqliteJournalMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode (safest).
    #[default]
    Full,
    /// Normal synchronous mode (balanced).
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration for the `SQLite` store session.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SqliteSessionConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteJournalMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
    /// Number of warm read connections opened at startup.
    #[serde(default = "default_min_sessions")]
    pub min_sessions: usize,
    /// Transaction attempt budget before contention surfaces as aborted.
    #[serde(default = "default_max_txn_attempts")]
    pub max_txn_attempts: u32,
    /// Backoff unit between transaction attempts in milliseconds; attempt
    /// `n` sleeps `n` units before retrying.
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl SqliteSessionConfig {
    /// Creates a config for `path` with default tuning.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteJournalMode::default(),
            sync_mode: SqliteSyncMode::default(),
            min_sessions: DEFAULT_MIN_SESSIONS,
            max_txn_attempts: DEFAULT_MAX_TXN_ATTEMPTS,
            retry_backoff_ms: DEFAULT_RETRY_BACKOFF_MS,
        }
    }

    /// Validates tuning limits, failing closed on out-of-range values.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteSessionError::Invalid`] when any knob is out of range.
    pub fn validate(&self) -> Result<(), SqliteSessionError> {
        if self.min_sessions == 0 || self.min_sessions > MAX_MIN_SESSIONS {
            return Err(SqliteSessionError::Invalid(format!(
                "min_sessions out of range: {} (1..={MAX_MIN_SESSIONS})",
                self.min_sessions
            )));
        }
        if self.max_txn_attempts == 0 || self.max_txn_attempts > MAX_TXN_ATTEMPT_LIMIT {
            return Err(SqliteSessionError::Invalid(format!(
                "max_txn_attempts out of range: {} (1..={MAX_TXN_ATTEMPT_LIMIT})",
                self.max_txn_attempts
            )));
        }
        if self.retry_backoff_ms > MAX_RETRY_BACKOFF_MS {
            return Err(SqliteSessionError::Invalid(format!(
                "retry_backoff_ms out of range: {} (0..={MAX_RETRY_BACKOFF_MS})",
                self.retry_backoff_ms
            )));
        }
        Ok(())
    }
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

/// Returns the default warm read connection count.
const fn default_min_sessions() -> usize {
    DEFAULT_MIN_SESSIONS
}

/// Returns the default transaction attempt budget.
const fn default_max_txn_attempts() -> u32 {
    DEFAULT_MAX_TXN_ATTEMPTS
}

/// Returns the default retry backoff unit.
const fn default_retry_backoff_ms() -> u64 {
    DEFAULT_RETRY_BACKOFF_MS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` session errors.
#[derive(Debug, Error)]
pub enum SqliteSessionError {
    /// Session I/O error.
    #[error("sqlite session io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite session db error: {0}")]
    Db(String),
    /// Physical schema does not match the static column mapping.
    #[error("sqlite session schema mismatch: {0}")]
    SchemaMismatch(String),
    /// Store schema version mismatch.
    #[error("sqlite session version mismatch: {0}")]
    VersionMismatch(String),
    /// Invalid configuration or data.
    #[error("sqlite session invalid: {0}")]
    Invalid(String),
}

impl From<SqliteSessionError> for StoreError {
    fn from(error: SqliteSessionError) -> Self {
        match error {
            SqliteSessionError::Io(message)
            | SqliteSessionError::Db(message)
            | SqliteSessionError::SchemaMismatch(message)
            | SqliteSessionError::VersionMismatch(message) => Self::Backend(message),
            SqliteSessionError::Invalid(message) => Self::Invalid(message),
        }
    }
}

// ============================================================================
// SECTION: Session
// ============================================================================

/// `SQLite`-backed store session.
///
/// # Invariants
/// - Write transactions are serialized through one connection; reads observe
///   the transaction's snapshot via WAL.
/// - Commit timestamps are strictly increasing across commits.
/// - The physical schema matches [`RECORD_COLUMNS`] (validated at open).
#[derive(Debug, Clone)]
pub struct SqliteSession {
    /// Session configuration.
    config: SqliteSessionConfig,
    /// Serialized write connection.
    writer: Arc<Mutex<Connection>>,
    /// Warm read connections for snapshot reads.
    readers: Arc<Vec<Mutex<Connection>>>,
    /// Round-robin cursor over the read pool.
    read_cursor: Arc<AtomicUsize>,
    /// Last assigned commit timestamp in unix microseconds.
    clock: Arc<AtomicI64>,
}

impl SqliteSession {
    /// Opens a `SQLite`-backed store session, bootstrapping and validating
    /// the schema and warming the read pool.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteSessionError`] when the config is out of range, the
    /// database cannot be opened or initialized, or the physical schema does
    /// not match the static column mapping.
    pub fn open(config: SqliteSessionConfig) -> Result<Self, SqliteSessionError> {
        config.validate()?;
        validate_store_path(&config.path)?;
        ensure_parent_dir(&config.path)?;
        let mut writer = open_connection(&config)?;
        initialize_schema(&mut writer)?;
        validate_schema(&writer)?;
        let mut readers = Vec::with_capacity(config.min_sessions);
        for _ in 0 .. config.min_sessions {
            readers.push(Mutex::new(open_connection(&config)?));
        }
        tracing::info!(
            path = %config.path.display(),
            min_sessions = config.min_sessions,
            "sqlite session opened"
        );
        Ok(Self {
            config,
            writer: Arc::new(Mutex::new(writer)),
            readers: Arc::new(readers),
            read_cursor: Arc::new(AtomicUsize::new(0)),
            clock: Arc::new(AtomicI64::new(0)),
        })
    }

    /// Assigns the next strictly-increasing commit timestamp.
    fn next_commit_timestamp(&self) -> Timestamp {
        let now = Timestamp::now().as_unix_micros();
        let mut assigned = now;
        let _ = self.clock.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
            assigned = last.saturating_add(1).max(now);
            Some(assigned)
        });
        Timestamp::from_unix_micros(assigned)
    }

    /// Runs one transaction attempt: body, commit-timestamp assignment,
    /// mutation application, commit. Dropping the transaction on any error
    /// rolls the attempt back.
    fn attempt(
        &self,
        cancel: &CancelToken,
        work: &mut TransactionBody<'_>,
    ) -> Result<Timestamp, StoreError> {
        let mut guard = self
            .writer
            .lock()
            .map_err(|_| StoreError::Backend("sqlite write connection mutex poisoned".to_string()))?;
        let tx = guard
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(backend_error)?;
        let mut buffer = Vec::new();
        {
            let mut handle = SqliteTransaction {
                tx: &tx,
                buffer: &mut buffer,
                cancel,
            };
            work(&mut handle)?;
        }
        cancel.check()?;
        let commit_timestamp = self.next_commit_timestamp();
        apply_mutations(&tx, &buffer, commit_timestamp)?;
        tx.commit().map_err(backend_error)?;
        Ok(commit_timestamp)
    }
}

impl StoreSession for SqliteSession {
    fn read_write(
        &self,
        cancel: &CancelToken,
        work: &mut TransactionBody<'_>,
    ) -> Result<CommitOutcome, StoreError> {
        cancel.check()?;
        let mut attempts: u32 = 0;
        loop {
            attempts = attempts.saturating_add(1);
            cancel.check()?;
            match self.attempt(cancel, &mut *work) {
                Ok(commit_timestamp) => {
                    return Ok(CommitOutcome {
                        commit_timestamp,
                        attempts,
                    });
                }
                Err(error) if is_transient(&error) => {
                    if attempts >= self.config.max_txn_attempts {
                        return Err(StoreError::Aborted(error.to_string()));
                    }
                    tracing::debug!(attempt = attempts, error = %error, "transient contention; retrying");
                    let backoff = self
                        .config
                        .retry_backoff_ms
                        .saturating_mul(u64::from(attempts));
                    std::thread::sleep(Duration::from_millis(backoff));
                }
                Err(error) => return Err(error),
            }
        }
    }

    fn single_read(&self, cancel: &CancelToken, query: &Query) -> Result<Vec<Row>, StoreError> {
        cancel.check()?;
        let index = self.read_cursor.fetch_add(1, Ordering::Relaxed) % self.readers.len();
        let guard = self.readers[index]
            .lock()
            .map_err(|_| StoreError::Backend("sqlite read connection mutex poisoned".to_string()))?;
        run_query(&guard, query)
    }
}

// ============================================================================
// SECTION: Transaction
// ============================================================================

/// Transaction handle over one immediate write transaction.
struct SqliteTransaction<'a> {
    /// Open `SQLite` transaction; reads observe its snapshot.
    tx: &'a rusqlite::Transaction<'a>,
    /// Mutations deferred until commit.
    buffer: &'a mut Vec<Mutation>,
    /// Caller cancellation signal.
    cancel: &'a CancelToken,
}

impl ReadWriteTransaction for SqliteTransaction<'_> {
    fn point_read(&mut self, table: ReplicatedTable, id: &RecordId) -> Result<Row, StoreError> {
        self.cancel.check()?;
        let sql = format!(
            "SELECT id, secondary_key, created_at, committed_at FROM {} WHERE id = ?1",
            table.name()
        );
        let mut statement = self.tx.prepare_cached(&sql).map_err(backend_error)?;
        let mut rows = statement.query(params![id.as_str()]).map_err(backend_error)?;
        match rows.next().map_err(backend_error)? {
            Some(row) => decode_row(row).map_err(backend_error),
            None => Err(StoreError::NotFound {
                table,
                id: id.to_string(),
            }),
        }
    }

    fn query(&mut self, query: &Query) -> Result<RowIter<'_>, StoreError> {
        self.cancel.check()?;
        let rows = run_query(self.tx, query)?;
        Ok(Box::new(rows.into_iter().map(Ok)))
    }

    fn buffer_write(&mut self, mutations: Vec<Mutation>) -> Result<(), StoreError> {
        self.cancel.check()?;
        self.buffer.extend(mutations);
        Ok(())
    }
}

// ============================================================================
// SECTION: Queries
// ============================================================================

/// Runs one statically-shaped query on a connection or open transaction.
fn run_query(connection: &Connection, query: &Query) -> Result<Vec<Row>, StoreError> {
    match query {
        Query::SampleOne {
            table,
        } => {
            let sql = format!(
                "SELECT id, secondary_key, created_at, committed_at FROM {} ORDER BY RANDOM() \
                 LIMIT 1",
                table.name()
            );
            collect_rows(connection, &sql, params![])
        }
        Query::BySecondaryKey {
            table,
            key,
        } => {
            let sql = format!(
                "SELECT id, secondary_key, created_at, committed_at FROM {table} INDEXED BY \
                 idx_{table}_secondary_key WHERE secondary_key = ?1 ORDER BY id",
                table = table.name()
            );
            collect_rows(connection, &sql, params![key.as_str()])
        }
    }
}

/// Prepares and fully drains one query into decoded rows.
fn collect_rows(
    connection: &Connection,
    sql: &str,
    parameters: &[&dyn rusqlite::ToSql],
) -> Result<Vec<Row>, StoreError> {
    let mut statement = connection.prepare_cached(sql).map_err(backend_error)?;
    let mut rows = statement.query(parameters).map_err(backend_error)?;
    let mut decoded = Vec::new();
    while let Some(row) = rows.next().map_err(backend_error)? {
        decoded.push(decode_row(row).map_err(backend_error)?);
    }
    Ok(decoded)
}

/// Decodes one physical row positionally, following the static column
/// mapping order.
fn decode_row(row: &rusqlite::Row<'_>) -> Result<Row, rusqlite::Error> {
    let id: String = row.get(0)?;
    let secondary_key: Option<String> = row.get(1)?;
    let created_at: i64 = row.get(2)?;
    let committed_at: i64 = row.get(3)?;
    Ok(Row::new(vec![
        (RECORD_COLUMNS[0].name.to_string(), Value::Text(id)),
        (
            RECORD_COLUMNS[1].name.to_string(),
            secondary_key.map_or(Value::Null, Value::Text),
        ),
        (
            RECORD_COLUMNS[2].name.to_string(),
            Value::Timestamp(Timestamp::from_unix_micros(created_at)),
        ),
        (
            RECORD_COLUMNS[3].name.to_string(),
            Value::Timestamp(Timestamp::from_unix_micros(committed_at)),
        ),
    ]))
}

// ============================================================================
// SECTION: Mutation Application
// ============================================================================

/// Applies buffered mutations inside the open transaction with one shared
/// commit timestamp. Any failure rolls the whole transaction back.
fn apply_mutations(
    tx: &rusqlite::Transaction<'_>,
    mutations: &[Mutation],
    commit_timestamp: Timestamp,
) -> Result<(), StoreError> {
    for mutation in mutations {
        let record = &mutation.record;
        let secondary_key = record.secondary_key.as_ref().map(|key| key.as_str().to_string());
        match mutation.kind {
            MutationKind::Insert => {
                let sql = format!(
                    "INSERT INTO {} (id, secondary_key, created_at, committed_at) VALUES (?1, \
                     ?2, ?3, ?4)",
                    mutation.table.name()
                );
                let result = tx.execute(
                    &sql,
                    params![
                        record.id.as_str(),
                        secondary_key,
                        record.created_at.as_unix_micros(),
                        commit_timestamp.as_unix_micros()
                    ],
                );
                match result {
                    Ok(_) => {}
                    Err(error) if is_constraint_violation(&error) => {
                        return Err(StoreError::AlreadyExists {
                            table: mutation.table,
                            id: record.id.to_string(),
                        });
                    }
                    Err(error) => return Err(backend_error(error)),
                }
            }
            MutationKind::Update => {
                let sql = format!(
                    "UPDATE {} SET secondary_key = ?2, created_at = ?3, committed_at = ?4 WHERE \
                     id = ?1",
                    mutation.table.name()
                );
                let changed = tx
                    .execute(
                        &sql,
                        params![
                            record.id.as_str(),
                            secondary_key,
                            record.created_at.as_unix_micros(),
                            commit_timestamp.as_unix_micros()
                        ],
                    )
                    .map_err(backend_error)?;
                if changed == 0 {
                    return Err(StoreError::NotFound {
                        table: mutation.table,
                        id: record.id.to_string(),
                    });
                }
            }
        }
    }
    Ok(())
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Converts an engine error into the backend error variant.
fn backend_error(error: rusqlite::Error) -> StoreError {
    StoreError::Backend(error.to_string())
}

/// Returns `true` for unique/primary-key constraint violations.
fn is_constraint_violation(error: &rusqlite::Error) -> bool {
    matches!(
        error,
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

/// Returns `true` for contention errors the session retries transparently.
fn is_transient(error: &StoreError) -> bool {
    match error {
        StoreError::Backend(message) => {
            message.contains("database is locked")
                || message.contains("database table is locked")
                || message.contains("busy")
        }
        _ => false,
    }
}

/// Ensures the parent directory for the database exists.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteSessionError> {
    let Some(parent) = path.parent() else {
        return Err(SqliteSessionError::Io("database path missing parent directory".to_string()));
    };
    std::fs::create_dir_all(parent).map_err(|err| SqliteSessionError::Io(err.to_string()))
}

/// Validates database paths for safety limits.
fn validate_store_path(path: &Path) -> Result<(), SqliteSessionError> {
    let path_string = path.display().to_string();
    if path_string.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteSessionError::Invalid(
            "database path exceeds length limit".to_string(),
        ));
    }
    for component in path.components() {
        let name = component.as_os_str().to_string_lossy();
        if name.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(SqliteSessionError::Invalid(
                "database path contains an overlong component".to_string(),
            ));
        }
    }
    if path.exists() && path.is_dir() {
        return Err(SqliteSessionError::Invalid(
            "database path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Opens a `SQLite` connection with the configured pragmas.
fn open_connection(config: &SqliteSessionConfig) -> Result<Connection, SqliteSessionError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags)
        .map_err(|err| SqliteSessionError::Db(err.to_string()))?;
    apply_pragmas(&connection, config)?;
    Ok(connection)
}

/// Applies `SQLite` pragmas required for durability.
fn apply_pragmas(
    connection: &Connection,
    config: &SqliteSessionConfig,
) -> Result<(), SqliteSessionError> {
    connection
        .execute_batch("PRAGMA foreign_keys = ON;")
        .map_err(|err| SqliteSessionError::Db(err.to_string()))?;
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))
        .map_err(|err| SqliteSessionError::Db(err.to_string()))?;
    connection
        .execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))
        .map_err(|err| SqliteSessionError::Db(err.to_string()))?;
    connection
        .busy_timeout(Duration::from_millis(config.busy_timeout_ms))
        .map_err(|err| SqliteSessionError::Db(err.to_string()))?;
    Ok(())
}

/// Initializes the `SQLite` schema or validates the existing version.
fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteSessionError> {
    let tx = connection.transaction().map_err(|err| SqliteSessionError::Db(err.to_string()))?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")
        .map_err(|err| SqliteSessionError::Db(err.to_string()))?;
    let version: Option<i64> = {
        let mut statement = tx
            .prepare("SELECT version FROM store_meta LIMIT 1")
            .map_err(|err| SqliteSessionError::Db(err.to_string()))?;
        let mut rows =
            statement.query(params![]).map_err(|err| SqliteSessionError::Db(err.to_string()))?;
        match rows.next().map_err(|err| SqliteSessionError::Db(err.to_string()))? {
            Some(row) => {
                Some(row.get(0).map_err(|err| SqliteSessionError::Db(err.to_string()))?)
            }
            None => None,
        }
    };
    match version {
        None => {
            tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION])
                .map_err(|err| SqliteSessionError::Db(err.to_string()))?;
            for table in ReplicatedTable::ALL {
                let name = table.name();
                tx.execute_batch(&format!(
                    "CREATE TABLE IF NOT EXISTS {name} (
                        id TEXT PRIMARY KEY,
                        secondary_key TEXT,
                        created_at INTEGER NOT NULL,
                        committed_at INTEGER NOT NULL
                    );
                    CREATE INDEX IF NOT EXISTS idx_{name}_secondary_key
                        ON {name} (secondary_key);"
                ))
                .map_err(|err| SqliteSessionError::Db(err.to_string()))?;
            }
        }
        Some(value) if value == SCHEMA_VERSION => {}
        Some(value) => {
            return Err(SqliteSessionError::VersionMismatch(format!(
                "unsupported schema version: {value}"
            )));
        }
    }
    tx.commit().map_err(|err| SqliteSessionError::Db(err.to_string()))?;
    Ok(())
}

/// Validates every replicated table against the static column mapping, once
/// at open.
fn validate_schema(connection: &Connection) -> Result<(), SqliteSessionError> {
    for table in ReplicatedTable::ALL {
        let mut statement = connection
            .prepare(&format!("PRAGMA table_info({})", table.name()))
            .map_err(|err| SqliteSessionError::Db(err.to_string()))?;
        let mut rows =
            statement.query(params![]).map_err(|err| SqliteSessionError::Db(err.to_string()))?;
        let mut names = Vec::new();
        while let Some(row) = rows.next().map_err(|err| SqliteSessionError::Db(err.to_string()))? {
            let name: String =
                row.get(1).map_err(|err| SqliteSessionError::Db(err.to_string()))?;
            names.push(name);
        }
        let expected: Vec<&str> = RECORD_COLUMNS.iter().map(|spec| spec.name).collect();
        if names != expected {
            return Err(SqliteSessionError::SchemaMismatch(format!(
                "table {} has columns {names:?}, expected {expected:?}",
                table.name()
            )));
        }
    }
    Ok(())
}
