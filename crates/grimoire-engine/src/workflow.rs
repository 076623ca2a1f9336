//! Per-session workflow timeline.
//!
//! Scripts report coarse-grained progress through the `workflow` binding;
//! each call synchronously appends one event to the history store. Every
//! operation is fire-and-forget with respect to persistence: a script must
//! never fail because its own progress report failed to persist, so storage
//! errors are logged and swallowed here.

use std::sync::Arc;

use grimoire_history::HistoryStore;
use grimoire_types::WorkflowEventKind;
use serde_json::json;
use tracing::warn;

/// Handle bound into a script for one session's timeline.
#[derive(Clone)]
pub struct WorkflowHandle {
    session_id: String,
    store: Arc<HistoryStore>,
}

impl WorkflowHandle {
    pub fn new(session_id: impl Into<String>, store: Arc<HistoryStore>) -> Self {
        Self {
            session_id: session_id.into(),
            store,
        }
    }

    /// The session this handle reports into.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Start a new workflow with a description.
    pub fn start(&self, message: &str) {
        self.append(WorkflowEventKind::Start, message, None);
    }

    /// Log an intermediate step.
    pub fn step(&self, message: &str) {
        self.append(WorkflowEventKind::Step, message, None);
    }

    /// Log progress through a counted sequence.
    ///
    /// The stored message is `"<message> (<current>/<total>)"` when a
    /// message is given, else `"<current>/<total>"`; `{current, total}` is
    /// always attached as metadata.
    pub fn progress(&self, current: i64, total: i64, message: Option<&str>) {
        let composed = match message {
            Some(msg) => format!("{msg} ({current}/{total})"),
            None => format!("{current}/{total}"),
        };
        let metadata = json!({ "current": current, "total": total });
        self.append(WorkflowEventKind::Progress, &composed, Some(metadata));
    }

    /// Mark the workflow as successfully completed.
    pub fn complete(&self, message: Option<&str>) {
        self.append(WorkflowEventKind::Complete, message.unwrap_or("Completed"), None);
    }

    /// Mark the workflow as aborted.
    pub fn abort(&self, reason: &str) {
        self.append(WorkflowEventKind::Abort, reason, None);
    }

    fn append(&self, kind: WorkflowEventKind, message: &str, metadata: Option<serde_json::Value>) {
        if let Err(e) =
            self.store
                .append_event(&self.session_id, kind, message, metadata.as_ref())
        {
            warn!(
                session_id = %self.session_id,
                kind = %kind,
                error = %e,
                "failed to save workflow event"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle() -> (WorkflowHandle, Arc<HistoryStore>) {
        let store = Arc::new(HistoryStore::open_in_memory().unwrap());
        (WorkflowHandle::new("s1", store.clone()), store)
    }

    #[test]
    fn test_five_operations_append_events() {
        let (wf, store) = handle();
        wf.start("begin");
        wf.step("working");
        wf.progress(1, 3, None);
        wf.complete(None);
        wf.abort("nope");

        let events = store.events("s1", 100).unwrap();
        let kinds: Vec<_> = events.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                WorkflowEventKind::Start,
                WorkflowEventKind::Step,
                WorkflowEventKind::Progress,
                WorkflowEventKind::Complete,
                WorkflowEventKind::Abort,
            ]
        );
    }

    #[test]
    fn test_progress_message_composition() {
        let (wf, store) = handle();
        wf.progress(25, 100, Some("processed"));
        wf.progress(2, 4, None);

        let events = store.events("s1", 10).unwrap();
        assert_eq!(events[0].message, "processed (25/100)");
        assert_eq!(events[1].message, "2/4");
        assert_eq!(
            events[0].metadata,
            Some(json!({"current": 25, "total": 100}))
        );
    }

    #[test]
    fn test_complete_default_message() {
        let (wf, store) = handle();
        wf.complete(None);
        wf.complete(Some("all done"));

        let events = store.events("s1", 10).unwrap();
        assert_eq!(events[0].message, "Completed");
        assert_eq!(events[1].message, "all done");
    }
}
