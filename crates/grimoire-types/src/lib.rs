//! Shared types for the grimoire scripting system.
//!
//! This crate defines the capability surface that scripts program against
//! (the [`KnowledgeBase`] trait and its request/response types), the domain
//! error type, and the durable record types (run records and workflow
//! events). It carries no behavior beyond constructors and conversions, so
//! every other crate in the workspace can depend on it without pulling in
//! storage or runtime machinery.

pub mod api;
pub mod error;
pub mod record;

pub use api::{
    AddFieldRequest, CalendarGranularity, ChildNode, ChildrenPage, ChildrenRequest,
    CreateTagRequest, DoneStateMapping, EditNodeRequest, FieldDataType, HealthStatus,
    ImportOutcome, KnowledgeBase, SearchHit, SearchRequest, SetCheckboxRequest, Tag, TagAction,
    TextEdit, Workspace,
};
pub use error::{DomainError, Result};
pub use record::{
    ExecutionResult, NewRunRecord, RunRecord, SessionSummary, WorkflowEvent, WorkflowEventKind,
    now_ms,
};
