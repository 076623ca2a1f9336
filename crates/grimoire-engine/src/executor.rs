//! The execution engine.
//!
//! One [`Executor`] is constructed per capability/store pair and reused;
//! the script engine itself is built fresh for every call, so invocations
//! share no interpreter state. Independent calls may run concurrently —
//! the history store is the only shared sink, and it only ever sees
//! appends.

use std::sync::Arc;
use std::time::Instant;

use rhai::{EvalAltResult, Scope};
use tokio::runtime::Handle;
use tracing::{debug, warn};
use uuid::Uuid;

use grimoire_history::HistoryStore;
use grimoire_types::{ExecutionResult, KnowledgeBase, NewRunRecord};

use crate::bindings::{KbHandle, build_engine};
use crate::config::ExecutorConfig;
use crate::output::OutputBuffer;
use crate::tracker::{CallTracker, Tracked};
use crate::workflow::WorkflowHandle;

/// Runs caller-supplied scripts against the injected capability.
pub struct Executor {
    capability: Arc<dyn KnowledgeBase>,
    history: Arc<HistoryStore>,
    config: ExecutorConfig,
}

impl Executor {
    /// Create an executor with the default configuration.
    pub fn new(capability: Arc<dyn KnowledgeBase>, history: Arc<HistoryStore>) -> Self {
        Self {
            capability,
            history,
            config: ExecutorConfig::default(),
        }
    }

    /// Replace the configuration.
    pub fn with_config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }

    /// Execute one script.
    ///
    /// Always returns a well-formed result; script errors and deadline
    /// expiry surface as `success: false` with an error message, and
    /// exactly one run record is persisted (fire-and-forget) regardless of
    /// outcome. When `session_id` is absent a fresh unique id is generated
    /// and used for both the workflow timeline and the run record.
    pub async fn execute(&self, code: &str, session_id: Option<String>) -> ExecutionResult {
        let started = Instant::now();
        let session_id = session_id.unwrap_or_else(|| Uuid::new_v4().to_string());
        debug!(session_id = %session_id, "executing script");

        let output = OutputBuffer::new();
        let tracker = CallTracker::new(self.capability.default_workspace());
        let tracked: Arc<dyn KnowledgeBase> =
            Arc::new(Tracked::new(self.capability.clone(), tracker.clone()));
        let workflow = WorkflowHandle::new(session_id.clone(), self.history.clone());
        let kb = KbHandle::new(tracked, Handle::current());

        let engine = build_engine(output.clone());
        let script = code.to_string();
        let task = tokio::task::spawn_blocking(move || {
            let mut scope = Scope::new();
            scope.push("kb", kb);
            scope.push("workflow", workflow);
            engine.run_with_scope(&mut scope, &script)
        });

        let budget = self.config.timeout;
        let error = match tokio::time::timeout(budget, task).await {
            Err(_elapsed) => {
                // The race only stops the wait. The script thread is still
                // running and may keep mutating remote state.
                warn!(
                    session_id = %session_id,
                    budget_ms = budget.as_millis() as u64,
                    "script exceeded budget; abandoning wait"
                );
                Some(format!(
                    "Execution timed out after {}ms",
                    budget.as_millis()
                ))
            }
            Ok(Err(join_err)) => Some(format!("Script task failed: {join_err}")),
            Ok(Ok(Ok(()))) => None,
            Ok(Ok(Err(err))) => Some(script_error_message(&err)),
        };

        let duration_ms = started.elapsed().as_millis() as u64;
        let result = match error {
            Some(err) => ExecutionResult::failed(output.snapshot(), err, duration_ms),
            None => ExecutionResult::ok(output.snapshot(), duration_ms),
        };

        let trace = tracker.snapshot();
        let record = NewRunRecord {
            code: code.to_string(),
            success: result.success,
            output: result.output.clone(),
            error: result.error.clone(),
            duration_ms,
            session_id: Some(session_id),
            input: None,
            api_calls: (!trace.calls.is_empty()).then(|| trace.calls.clone()),
            node_ids: (!trace.node_ids.is_empty())
                .then(|| trace.node_ids.iter().cloned().collect()),
            workspace_id: trace.workspace_id.clone(),
        };

        let store = self.history.clone();
        tokio::spawn(async move {
            // save_run logs its own failures; nothing here can reach the
            // result already returned to the caller.
            let _ = tokio::task::spawn_blocking(move || store.save_run(record)).await;
        });

        result
    }
}

/// Extract the message a script author would expect from a Rhai error.
///
/// A thrown value surfaces verbatim (`throw "boom"` yields `boom`); errors
/// raised inside registered capability functions are unwrapped from the
/// call-site wrapper.
fn script_error_message(err: &EvalAltResult) -> String {
    match err {
        EvalAltResult::ErrorRuntime(value, _) => {
            if value.is_string() {
                value.clone().into_string().unwrap_or_default()
            } else {
                value.to_string()
            }
        }
        EvalAltResult::ErrorInFunctionCall(_, _, inner, _) => script_error_message(inner),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rhai::{Dynamic, Position};

    #[test]
    fn test_thrown_string_surfaces_verbatim() {
        let err = EvalAltResult::ErrorRuntime(Dynamic::from("boom"), Position::NONE);
        assert_eq!(script_error_message(&err), "boom");
    }

    #[test]
    fn test_function_call_wrapper_is_unwrapped() {
        let inner = EvalAltResult::ErrorRuntime(Dynamic::from("node not found"), Position::NONE);
        let err = EvalAltResult::ErrorInFunctionCall(
            "read_node".to_string(),
            String::new(),
            Box::new(inner),
            Position::NONE,
        );
        assert_eq!(script_error_message(&err), "node not found");
    }

    #[test]
    fn test_non_string_thrown_value() {
        let err = EvalAltResult::ErrorRuntime(Dynamic::from(42_i64), Position::NONE);
        assert_eq!(script_error_message(&err), "42");
    }
}
