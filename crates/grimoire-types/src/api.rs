//! The knowledge-base capability surface.
//!
//! [`KnowledgeBase`] is the only sanctioned way for a script to affect the
//! outside world. Operations are grouped by resource kind (workspaces,
//! nodes, tags, fields, calendar, import) and exchange plain-data requests
//! and responses. The HTTP client that implements this trait against a live
//! service lives outside this workspace.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Service liveness probe response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub timestamp: String,
    pub node_space_ready: bool,
}

/// A workspace visible to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workspace {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A structured node search.
///
/// The query itself is an opaque JSON structure defined by the service;
/// the engine passes it through without interpretation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_ids: Option<Vec<String>>,
}

/// One node matched by a search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub node_id: String,
    pub name: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
}

/// Paging controls for a children listing.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ChildrenRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
}

/// A child node in a children listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChildNode {
    pub node_id: String,
    pub name: String,
    #[serde(default)]
    pub has_children: bool,
}

/// One page of a node's children.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChildrenPage {
    pub children: Vec<ChildNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u32>,
}

/// An old-string/new-string text replacement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextEdit {
    pub old_string: String,
    pub new_string: String,
    #[serde(default)]
    pub replace_all: bool,
}

/// Edit a node's name and/or description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditNodeRequest {
    pub node_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<TextEdit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<TextEdit>,
}

/// Whether tags are being attached or detached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagAction {
    Add,
    Remove,
}

impl std::fmt::Display for TagAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TagAction::Add => write!(f, "add"),
            TagAction::Remove => write!(f, "remove"),
        }
    }
}

/// A tag defined in a workspace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub tag_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Data type of a tag field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldDataType {
    Text,
    Number,
    Date,
    Checkbox,
    Options,
    Node,
}

/// Create a new tag in a workspace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTagRequest {
    pub workspace_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extends_tag_ids: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_checkbox: Option<bool>,
}

/// Add a field to an existing tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddFieldRequest {
    pub tag_id: String,
    pub name: String,
    pub data_type: FieldDataType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_tag_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_multi_value: Option<bool>,
}

/// Maps field values to a tag's done state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoneStateMapping {
    pub field_id: String,
    pub checked_values: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unchecked_values: Option<Vec<String>>,
}

/// Configure a tag's checkbox behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetCheckboxRequest {
    pub tag_id: String,
    pub show_checkbox: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub done_state_mapping: Option<DoneStateMapping>,
}

/// Calendar node granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalendarGranularity {
    Day,
    Week,
    Month,
    Year,
}

impl std::fmt::Display for CalendarGranularity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CalendarGranularity::Day => "day",
            CalendarGranularity::Week => "week",
            CalendarGranularity::Month => "month",
            CalendarGranularity::Year => "year",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for CalendarGranularity {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "day" => Ok(CalendarGranularity::Day),
            "week" => Ok(CalendarGranularity::Week),
            "month" => Ok(CalendarGranularity::Month),
            "year" => Ok(CalendarGranularity::Year),
            other => Err(format!("unknown calendar granularity: {other}")),
        }
    }
}

/// Result of a bulk paste import.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportOutcome {
    pub success: bool,
    #[serde(default)]
    pub node_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The asynchronous domain operations injected into scripts.
///
/// Implementations must be safe to share across invocations; the engine
/// holds one behind an `Arc` and wraps it per-invocation for call tracking.
#[async_trait]
pub trait KnowledgeBase: Send + Sync {
    /// The pre-bound workspace id, if the implementation carries one.
    ///
    /// Seeds the scope inference of the call tracker before any call is made.
    fn default_workspace(&self) -> Option<String> {
        None
    }

    /// Check service liveness.
    async fn health(&self) -> Result<HealthStatus>;

    /// List available workspaces.
    async fn list_workspaces(&self) -> Result<Vec<Workspace>>;

    /// Search for nodes.
    async fn search_nodes(&self, req: SearchRequest) -> Result<Vec<SearchHit>>;

    /// Read a node rendered as markdown, down to `max_depth` levels.
    async fn read_node(&self, node_id: &str, max_depth: u32) -> Result<String>;

    /// List a node's children, paged.
    async fn node_children(&self, node_id: &str, req: ChildrenRequest) -> Result<ChildrenPage>;

    /// Edit a node's name and/or description.
    async fn edit_node(&self, req: EditNodeRequest) -> Result<bool>;

    /// Move a node to the trash.
    async fn trash_node(&self, node_id: &str) -> Result<bool>;

    /// Check a node's checkbox.
    async fn check_node(&self, node_id: &str) -> Result<bool>;

    /// Uncheck a node's checkbox.
    async fn uncheck_node(&self, node_id: &str) -> Result<bool>;

    /// List tags in a workspace.
    async fn list_tags(&self, workspace_id: &str, limit: u32) -> Result<Vec<Tag>>;

    /// Get a tag's schema rendered as markdown.
    async fn tag_schema(&self, tag_id: &str, include_edit_instructions: bool) -> Result<String>;

    /// Attach or detach tags on a node.
    async fn modify_tags(&self, node_id: &str, action: TagAction, tag_ids: &[String])
    -> Result<bool>;

    /// Create a new tag; returns the new tag id.
    async fn create_tag(&self, req: CreateTagRequest) -> Result<String>;

    /// Add a field to a tag; returns the new field id.
    async fn add_field(&self, req: AddFieldRequest) -> Result<String>;

    /// Configure a tag's checkbox behavior.
    async fn set_tag_checkbox(&self, req: SetCheckboxRequest) -> Result<bool>;

    /// Set a field on a node to one of its predefined options.
    async fn set_field_option(
        &self,
        node_id: &str,
        attribute_id: &str,
        option_id: &str,
    ) -> Result<bool>;

    /// Set a field on a node to a string value.
    async fn set_field_content(
        &self,
        node_id: &str,
        attribute_id: &str,
        content: &str,
    ) -> Result<bool>;

    /// Get or create a calendar node; returns its node id.
    ///
    /// `date` defaults to today when absent, in the service's local time.
    async fn calendar_node(
        &self,
        workspace_id: &str,
        granularity: CalendarGranularity,
        date: Option<&str>,
    ) -> Result<String>;

    /// Import paste-formatted content under a parent node.
    async fn import_paste(&self, parent_node_id: &str, content: &str) -> Result<ImportOutcome>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_action_roundtrip() {
        let json = serde_json::to_string(&TagAction::Add).unwrap();
        assert_eq!(json, "\"add\"");
        let back: TagAction = serde_json::from_str(&json).unwrap();
        assert_eq!(back, TagAction::Add);
    }

    #[test]
    fn test_granularity_display_parse() {
        for g in [
            CalendarGranularity::Day,
            CalendarGranularity::Week,
            CalendarGranularity::Month,
            CalendarGranularity::Year,
        ] {
            let parsed: CalendarGranularity = g.to_string().parse().unwrap();
            assert_eq!(parsed, g);
        }
        assert!("decade".parse::<CalendarGranularity>().is_err());
    }

    #[test]
    fn test_search_request_defaults() {
        let req: SearchRequest = serde_json::from_str(r#"{"query": {"name": "x"}}"#).unwrap();
        assert!(req.limit.is_none());
        assert!(req.workspace_ids.is_none());
    }
}
