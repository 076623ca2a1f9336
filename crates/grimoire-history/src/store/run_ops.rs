//! Run record operations: append, query, retention cleanup.

use grimoire_types::{NewRunRecord, RunRecord, now_ms};
use rusqlite::params;
use tracing::warn;

use super::HistoryStore;
use crate::error::Result;

impl HistoryStore {
    /// Append one run record, swallowing any storage failure.
    ///
    /// This is the settle-path entry point: by the time it runs, the result
    /// has already been handed to the caller, so a failure here must never
    /// propagate. It is logged and dropped.
    pub fn save_run(&self, record: NewRunRecord) {
        if let Err(e) = self.try_save_run(&record) {
            warn!(error = %e, "failed to save run record");
        }
    }

    /// Append one run record, surfacing storage failures.
    pub fn try_save_run(&self, record: &NewRunRecord) -> Result<()> {
        let api_calls = record
            .api_calls
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let node_ids = record
            .node_ids
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        self.conn().execute(
            "INSERT INTO script_runs
                (timestamp, script, success, output, error, duration_ms, session_id,
                 input, api_calls, node_ids_affected, workspace_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                now_ms(),
                record.code,
                record.success as i32,
                record.output,
                record.error,
                record.duration_ms as i64,
                record.session_id,
                record.input,
                api_calls,
                node_ids,
                record.workspace_id,
            ],
        )?;
        Ok(())
    }

    /// The most recent `limit` run records, newest first, optionally
    /// filtered to one session.
    pub fn recent_runs(&self, limit: u32, session_id: Option<&str>) -> Result<Vec<RunRecord>> {
        const BASE: &str = "SELECT id, timestamp, script, success, output, error, duration_ms,
                    session_id, input, api_calls, node_ids_affected, workspace_id
             FROM script_runs";

        let conn = self.conn();
        let mut runs = Vec::new();

        if let Some(session) = session_id {
            let mut stmt = conn.prepare(&format!(
                "{BASE} WHERE session_id = ?1 ORDER BY timestamp DESC, id DESC LIMIT ?2"
            ))?;
            let iter = stmt.query_map(params![session, limit], row_to_run)?;
            for r in iter {
                runs.push(r?);
            }
        } else {
            let mut stmt =
                conn.prepare(&format!("{BASE} ORDER BY timestamp DESC, id DESC LIMIT ?1"))?;
            let iter = stmt.query_map(params![limit], row_to_run)?;
            for r in iter {
                runs.push(r?);
            }
        }

        Ok(runs)
    }

    /// Delete run records older than `max_age_days`; returns the count
    /// removed. Workflow events are not cascaded.
    pub fn cleanup(&self, max_age_days: u32) -> Result<usize> {
        let cutoff = now_ms() - i64::from(max_age_days) * 24 * 60 * 60 * 1000;
        let removed = self
            .conn()
            .execute("DELETE FROM script_runs WHERE timestamp < ?1", params![cutoff])?;
        Ok(removed)
    }
}

fn row_to_run(row: &rusqlite::Row<'_>) -> rusqlite::Result<RunRecord> {
    let api_calls: Option<String> = row.get(9)?;
    let node_ids: Option<String> = row.get(10)?;

    Ok(RunRecord {
        id: row.get(0)?,
        timestamp: row.get(1)?,
        code: row.get(2)?,
        success: row.get::<_, i32>(3)? != 0,
        output: row.get(4)?,
        error: row.get(5)?,
        duration_ms: row.get::<_, i64>(6)? as u64,
        session_id: row.get(7)?,
        input: row.get(8)?,
        api_calls: api_calls.and_then(|s| serde_json::from_str(&s).ok()),
        node_ids: node_ids.and_then(|s| serde_json::from_str(&s).ok()),
        workspace_id: row.get(11)?,
    })
}
