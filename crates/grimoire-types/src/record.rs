//! Durable record types: run records and workflow events.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Current time as unix milliseconds, the timestamp unit used throughout
/// the history store.
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Result of one script execution, as returned to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub success: bool,
    pub output: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_ms: u64,
}

impl ExecutionResult {
    /// A successful result.
    pub fn ok(output: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            success: true,
            output: output.into(),
            error: None,
            duration_ms,
        }
    }

    /// A failed result with whatever output was captured before the failure.
    pub fn failed(output: impl Into<String>, error: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            success: false,
            output: output.into(),
            error: Some(error.into()),
            duration_ms,
        }
    }
}

/// The durable record of one execution attempt.
///
/// Append-only: written exactly once at settle time, never mutated, deleted
/// only by retention cleanup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub id: i64,
    /// Creation instant, unix milliseconds.
    pub timestamp: i64,
    /// The submitted source code, verbatim.
    pub code: String,
    pub success: bool,
    /// Captured output lines, joined with newlines.
    pub output: String,
    pub error: Option<String>,
    pub duration_ms: u64,
    pub session_id: Option<String>,
    /// Opaque input payload, when the caller supplied one.
    pub input: Option<String>,
    /// Qualified capability operation names, in invocation order.
    pub api_calls: Option<Vec<String>>,
    /// Entity identifiers touched by the run, deduplicated.
    pub node_ids: Option<Vec<String>>,
    /// Workspace the run was inferred to operate in.
    pub workspace_id: Option<String>,
}

/// The insert shape of a run record; the store assigns id and timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRunRecord {
    pub code: String,
    pub success: bool,
    pub output: String,
    pub error: Option<String>,
    pub duration_ms: u64,
    pub session_id: Option<String>,
    pub input: Option<String>,
    pub api_calls: Option<Vec<String>>,
    pub node_ids: Option<Vec<String>>,
    pub workspace_id: Option<String>,
}

/// Kind of a workflow timeline entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowEventKind {
    Start,
    Step,
    Progress,
    Complete,
    Abort,
}

impl WorkflowEventKind {
    /// The string stored in the `event_type` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowEventKind::Start => "start",
            WorkflowEventKind::Step => "step",
            WorkflowEventKind::Progress => "progress",
            WorkflowEventKind::Complete => "complete",
            WorkflowEventKind::Abort => "abort",
        }
    }
}

impl std::fmt::Display for WorkflowEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for WorkflowEventKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "start" => Ok(WorkflowEventKind::Start),
            "step" => Ok(WorkflowEventKind::Step),
            "progress" => Ok(WorkflowEventKind::Progress),
            "complete" => Ok(WorkflowEventKind::Complete),
            "abort" => Ok(WorkflowEventKind::Abort),
            other => Err(format!("unknown workflow event kind: {other}")),
        }
    }
}

/// One entry in a session's progress timeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowEvent {
    pub id: i64,
    pub session_id: String,
    /// Unix milliseconds.
    pub timestamp: i64,
    pub kind: WorkflowEventKind,
    pub message: String,
    /// Structured payload, e.g. `{"current": 3, "total": 10}` for progress.
    pub metadata: Option<serde_json::Value>,
}

/// Aggregate view of one session's timeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    /// Earliest event timestamp, unix milliseconds.
    pub started_at: i64,
    pub event_count: u32,
    /// Message of the most recent event.
    pub last_message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_kind_roundtrip() {
        for kind in [
            WorkflowEventKind::Start,
            WorkflowEventKind::Step,
            WorkflowEventKind::Progress,
            WorkflowEventKind::Complete,
            WorkflowEventKind::Abort,
        ] {
            let parsed: WorkflowEventKind = kind.as_str().parse().unwrap();
            assert_eq!(parsed, kind);
        }
        assert!("pause".parse::<WorkflowEventKind>().is_err());
    }

    #[test]
    fn test_execution_result_constructors() {
        let ok = ExecutionResult::ok("hi", 12);
        assert!(ok.success);
        assert!(ok.error.is_none());

        let failed = ExecutionResult::failed("partial", "boom", 34);
        assert!(!failed.success);
        assert_eq!(failed.error.as_deref(), Some("boom"));
        assert_eq!(failed.output, "partial");
    }

    #[test]
    fn test_now_ms_is_monotonic_enough() {
        let a = now_ms();
        let b = now_ms();
        assert!(b >= a);
    }
}
