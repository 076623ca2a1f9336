//! SQLite-backed history store.
//!
//! One process-wide store instance owns durable storage for run records and
//! workflow events. Uses WAL mode for concurrent reads; all writers are
//! plain appends, so no locking discipline beyond the internal connection
//! mutex is needed.

mod run_ops;
mod workflow_ops;

use std::path::Path;
use std::sync::Mutex;

use rusqlite::Connection;
use tracing::{debug, info};

use crate::error::{HistoryError, Result};

/// Current schema version for migrations.
const SCHEMA_VERSION: i32 = 2;

/// History store backed by SQLite.
///
/// Thread-safe via internal `Mutex<Connection>`. Initialization is
/// idempotent: tables are created if absent and additive column migrations
/// are applied to pre-existing databases without touching rows.
pub struct HistoryStore {
    conn: Mutex<Connection>,
}

impl std::fmt::Debug for HistoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryStore").finish_non_exhaustive()
    }
}

impl HistoryStore {
    /// Open (or create) the database at `path` and bring the schema up to
    /// date.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.initialize()?;

        info!("History store opened at {:?}", path);
        Ok(store)
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.initialize()?;
        Ok(store)
    }

    /// Lock the connection for use. Panics if poisoned.
    pub(crate) fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap()
    }

    fn initialize(&self) -> Result<()> {
        let conn = self.conn();
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        self.create_schema(&conn)?;
        Ok(())
    }

    fn create_schema(&self, conn: &Connection) -> Result<()> {
        let current_version: i32 = conn
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .unwrap_or(0);

        if current_version >= SCHEMA_VERSION {
            debug!("Schema up to date (version {})", current_version);
            return Ok(());
        }

        info!(
            "Migrating schema from version {} to {}",
            current_version, SCHEMA_VERSION
        );

        conn.execute_batch(
            r#"
            -- One row per execution attempt; append-only.
            CREATE TABLE IF NOT EXISTS script_runs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp INTEGER NOT NULL,
                script TEXT NOT NULL,
                success INTEGER NOT NULL,
                output TEXT NOT NULL,
                error TEXT,
                duration_ms INTEGER NOT NULL,
                session_id TEXT,
                input TEXT,
                api_calls TEXT,
                node_ids_affected TEXT,
                workspace_id TEXT
            );

            -- Per-session progress timelines; append-only.
            CREATE TABLE IF NOT EXISTS workflow_events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id TEXT NOT NULL,
                timestamp INTEGER NOT NULL,
                event_type TEXT NOT NULL,
                message TEXT NOT NULL,
                metadata TEXT
            );
            "#,
        )?;

        if current_version < 2 {
            self.migrate_v2(conn)?;
        }

        conn.execute_batch(
            r#"
            CREATE INDEX IF NOT EXISTS idx_script_runs_timestamp
                ON script_runs(timestamp DESC);
            CREATE INDEX IF NOT EXISTS idx_script_runs_session
                ON script_runs(session_id);
            CREATE INDEX IF NOT EXISTS idx_script_runs_workspace
                ON script_runs(workspace_id);
            CREATE INDEX IF NOT EXISTS idx_workflow_session
                ON workflow_events(session_id, timestamp);
            "#,
        )?;

        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
        info!("Schema ready (version {})", SCHEMA_VERSION);
        Ok(())
    }

    /// Migration v2: tracking columns on `script_runs`.
    ///
    /// Databases created before call tracking existed lack these columns;
    /// fresh databases get them in CREATE TABLE. Each is probed before the
    /// ALTER so the step is idempotent and never rewrites existing rows.
    fn migrate_v2(&self, conn: &Connection) -> Result<()> {
        for column in ["input", "api_calls", "node_ids_affected", "workspace_id"] {
            let has_column: bool = conn
                .prepare(&format!("SELECT {column} FROM script_runs LIMIT 0"))
                .is_ok();
            if !has_column {
                info!("Running migration v2: adding column {column}");
                conn.execute_batch(&format!(
                    "ALTER TABLE script_runs ADD COLUMN {column} TEXT;"
                ))
                .map_err(|e| {
                    HistoryError::Migration(format!("adding column {column}: {e}"))
                })?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_in_memory_initializes_schema() {
        let store = HistoryStore::open_in_memory().unwrap();
        let conn = store.conn();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'
                 AND name IN ('script_runs', 'workflow_events')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn test_reopen_is_idempotent() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("history.db");

        let store = HistoryStore::open(&path).unwrap();
        drop(store);
        // Second open must not disturb the existing schema.
        let store = HistoryStore::open(&path).unwrap();
        let version: i32 = store
            .conn()
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .unwrap();
        assert_eq!(version, SCHEMA_VERSION);
    }

    #[test]
    fn test_additive_migration_preserves_existing_rows() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("history.db");

        // Simulate a database from before call tracking existed.
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch(
                r#"
                CREATE TABLE script_runs (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    timestamp INTEGER NOT NULL,
                    script TEXT NOT NULL,
                    success INTEGER NOT NULL,
                    output TEXT NOT NULL,
                    error TEXT,
                    duration_ms INTEGER NOT NULL,
                    session_id TEXT
                );
                INSERT INTO script_runs
                    (timestamp, script, success, output, error, duration_ms, session_id)
                VALUES (1000, 'log("old")', 1, 'old', NULL, 5, 'legacy');
                "#,
            )
            .unwrap();
            conn.pragma_update(None, "user_version", 1).unwrap();
        }

        let store = HistoryStore::open(&path).unwrap();
        let runs = store.recent_runs(10, None).unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].output, "old");
        assert_eq!(runs[0].session_id.as_deref(), Some("legacy"));
        // New columns exist and read back as NULL for the old row.
        assert!(runs[0].api_calls.is_none());
        assert!(runs[0].workspace_id.is_none());
    }
}
