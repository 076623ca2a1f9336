//! Durable run history and workflow timelines, backed by SQLite.
//!
//! [`HistoryStore`] owns two append-only tables: `script_runs` (one row per
//! execution attempt) and `workflow_events` (per-session progress
//! timelines). It is constructed once at process start and passed by
//! dependency injection into everything that persists — there is no hidden
//! global handle.
//!
//! Writes on the execution settle path go through [`HistoryStore::save_run`],
//! which never fails outward: storage errors are logged and swallowed so a
//! slow or broken disk can never change a result already computed for the
//! caller.

mod error;
mod paths;
mod store;

pub use error::{HistoryError, Result};
pub use paths::{HISTORY_PATH_ENV, default_path};
pub use store::HistoryStore;
