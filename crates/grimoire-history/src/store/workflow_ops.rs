//! Workflow event operations: append and timeline retrieval.

use grimoire_types::{SessionSummary, WorkflowEvent, WorkflowEventKind, now_ms};
use rusqlite::params;

use super::HistoryStore;
use crate::error::Result;

impl HistoryStore {
    /// Append one workflow event for a session.
    ///
    /// Fallible; the workflow handle that calls this during script
    /// execution is responsible for swallowing failures.
    pub fn append_event(
        &self,
        session_id: &str,
        kind: WorkflowEventKind,
        message: &str,
        metadata: Option<&serde_json::Value>,
    ) -> Result<()> {
        let metadata = metadata.map(serde_json::to_string).transpose()?;
        self.conn().execute(
            "INSERT INTO workflow_events (session_id, timestamp, event_type, message, metadata)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![session_id, now_ms(), kind.as_str(), message, metadata],
        )?;
        Ok(())
    }

    /// Up to `limit` events for one session, ascending by timestamp.
    pub fn events(&self, session_id: &str, limit: u32) -> Result<Vec<WorkflowEvent>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, session_id, timestamp, event_type, message, metadata
             FROM workflow_events
             WHERE session_id = ?1
             ORDER BY timestamp ASC, id ASC
             LIMIT ?2",
        )?;

        let iter = stmt.query_map(params![session_id, limit], row_to_event)?;
        let mut events = Vec::new();
        for e in iter {
            events.push(e?);
        }
        Ok(events)
    }

    /// The most recent `limit` distinct sessions, ordered by earliest event
    /// time descending, each with its event count and last message.
    pub fn recent_sessions(&self, limit: u32) -> Result<Vec<SessionSummary>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT session_id,
                    MIN(timestamp) AS started_at,
                    COUNT(*) AS event_count,
                    (SELECT message FROM workflow_events w2
                      WHERE w2.session_id = workflow_events.session_id
                      ORDER BY w2.timestamp DESC, w2.id DESC LIMIT 1) AS last_message
             FROM workflow_events
             GROUP BY session_id
             ORDER BY started_at DESC
             LIMIT ?1",
        )?;

        let iter = stmt.query_map(params![limit], |row| {
            Ok(SessionSummary {
                session_id: row.get(0)?,
                started_at: row.get(1)?,
                event_count: row.get::<_, i64>(2)? as u32,
                last_message: row.get(3)?,
            })
        })?;

        let mut sessions = Vec::new();
        for s in iter {
            sessions.push(s?);
        }
        Ok(sessions)
    }
}

fn row_to_event(row: &rusqlite::Row<'_>) -> rusqlite::Result<WorkflowEvent> {
    let kind_str: String = row.get(3)?;
    let kind = kind_str.parse::<WorkflowEventKind>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            3,
            rusqlite::types::Type::Text,
            Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, e)),
        )
    })?;
    let metadata: Option<String> = row.get(5)?;

    Ok(WorkflowEvent {
        id: row.get(0)?,
        session_id: row.get(1)?,
        timestamp: row.get(2)?,
        kind,
        message: row.get(4)?,
        metadata: metadata.and_then(|s| serde_json::from_str(&s).ok()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_events_ascending_per_session() {
        let store = HistoryStore::open_in_memory().unwrap();
        store
            .append_event("s1", WorkflowEventKind::Start, "begin", None)
            .unwrap();
        store
            .append_event("s2", WorkflowEventKind::Start, "other session", None)
            .unwrap();
        store
            .append_event("s1", WorkflowEventKind::Step, "middle", None)
            .unwrap();
        store
            .append_event("s1", WorkflowEventKind::Complete, "end", None)
            .unwrap();

        let events = store.events("s1", 100).unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].kind, WorkflowEventKind::Start);
        assert_eq!(events[1].kind, WorkflowEventKind::Step);
        assert_eq!(events[2].kind, WorkflowEventKind::Complete);
        assert!(events.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }

    #[test]
    fn test_events_limit() {
        let store = HistoryStore::open_in_memory().unwrap();
        for i in 0..10 {
            store
                .append_event("s1", WorkflowEventKind::Step, &format!("step {i}"), None)
                .unwrap();
        }

        let events = store.events("s1", 4).unwrap();
        assert_eq!(events.len(), 4);
        assert_eq!(events[0].message, "step 0");
    }

    #[test]
    fn test_metadata_roundtrip() {
        let store = HistoryStore::open_in_memory().unwrap();
        let meta = json!({"current": 3, "total": 10});
        store
            .append_event("s1", WorkflowEventKind::Progress, "3/10", Some(&meta))
            .unwrap();

        let events = store.events("s1", 10).unwrap();
        assert_eq!(events[0].metadata.as_ref(), Some(&meta));
    }

    #[test]
    fn test_recent_sessions_summary() {
        let store = HistoryStore::open_in_memory().unwrap();
        store
            .append_event("early", WorkflowEventKind::Start, "first", None)
            .unwrap();
        store
            .append_event("early", WorkflowEventKind::Complete, "early done", None)
            .unwrap();
        store
            .append_event("late", WorkflowEventKind::Start, "late begin", None)
            .unwrap();

        // Force distinct start times regardless of clock resolution.
        store
            .conn()
            .execute(
                "UPDATE workflow_events SET timestamp = timestamp - 10000
                 WHERE session_id = 'early'",
                [],
            )
            .unwrap();

        let sessions = store.recent_sessions(10).unwrap();
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].session_id, "late");
        assert_eq!(sessions[0].event_count, 1);
        assert_eq!(sessions[0].last_message, "late begin");
        assert_eq!(sessions[1].session_id, "early");
        assert_eq!(sessions[1].event_count, 2);
        assert_eq!(sessions[1].last_message, "early done");
    }

    #[test]
    fn test_recent_sessions_limit() {
        let store = HistoryStore::open_in_memory().unwrap();
        for i in 0..5 {
            store
                .append_event(&format!("s{i}"), WorkflowEventKind::Start, "go", None)
                .unwrap();
        }
        assert_eq!(store.recent_sessions(2).unwrap().len(), 2);
    }
}
