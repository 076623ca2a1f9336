//! Script execution engine for grimoire.
//!
//! Runs caller-supplied Rhai code against an injected knowledge-base
//! capability, under a hard wall-clock budget, with console-style output
//! captured deterministically and every capability invocation recorded for
//! audit. On settle (success, script error, or timeout) exactly one run
//! record is written to the history store, fire-and-forget.
//!
//! # Binding surface
//!
//! A script sees exactly three meaningful bindings:
//!
//! - `kb` — the instrumented capability handle (`kb.search_nodes(...)`,
//!   `kb.read_node(...)`, ...)
//! - `workflow` — the session's progress timeline
//!   (`workflow.start(...)`, `workflow.step(...)`, ...)
//! - `log`/`warn`/`error` (and Rhai's own `print`/`debug`) — the output sink
//!
//! Rhai registers nothing else: no filesystem, no process, no module
//! loading, and `eval` is disabled. This is an allow-list surface, not a
//! shadowed block-list. It narrows accidental access to host state; it is
//! not a security boundary against the capability itself.
//!
//! # Deadline semantics
//!
//! The script races a timer. When the timer wins, the caller gets a timeout
//! result immediately, but the script thread is *not* terminated — it may
//! keep running (and keep mutating remote state) in the background. This is
//! a documented limitation of the race-based pattern.

mod bindings;
mod config;
mod executor;
mod output;
mod tracker;
mod workflow;

pub use config::ExecutorConfig;
pub use executor::Executor;
pub use tracker::{CallTracker, CallTrace, Tracked};
pub use workflow::WorkflowHandle;
