//! Capability call tracking.
//!
//! [`Tracked`] wraps the real capability object with a same-shaped
//! implementation that records which operations were invoked, in what
//! order, and which entity identifiers they touched — then delegates
//! unchanged. Tracking is purely observational: arguments, return values,
//! and errors pass through untouched.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use grimoire_types::{
    AddFieldRequest, CalendarGranularity, ChildrenPage, ChildrenRequest, CreateTagRequest,
    EditNodeRequest, HealthStatus, ImportOutcome, KnowledgeBase, Result, SearchHit, SearchRequest,
    SetCheckboxRequest, Tag, TagAction, Workspace,
};

/// Snapshot of what one invocation touched.
#[derive(Debug, Clone, Default)]
pub struct CallTrace {
    /// Qualified operation names, in invocation order.
    pub calls: Vec<String>,
    /// Entity identifiers touched, deduplicated.
    pub node_ids: BTreeSet<String>,
    /// Workspace the invocation was inferred to operate in.
    pub workspace_id: Option<String>,
}

/// Per-invocation accumulator shared between the tracked capability and the
/// settle path. Never shared across invocations.
#[derive(Debug, Clone)]
pub struct CallTracker {
    inner: Arc<Mutex<CallTrace>>,
}

impl CallTracker {
    /// Create a tracker, seeding the inferred workspace from the
    /// capability's pre-bound default when it has one.
    pub fn new(default_workspace: Option<String>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(CallTrace {
                workspace_id: default_workspace,
                ..CallTrace::default()
            })),
        }
    }

    /// Record an operation at call entry, so the list reflects invocation
    /// order rather than settle order.
    pub fn record_call(&self, name: &str) {
        self.inner.lock().calls.push(name.to_string());
    }

    /// Record a touched entity identifier.
    pub fn record_node(&self, node_id: &str) {
        self.inner.lock().node_ids.insert(node_id.to_string());
    }

    /// Record a disclosed workspace identifier.
    pub fn record_workspace(&self, workspace_id: &str) {
        self.inner.lock().workspace_id = Some(workspace_id.to_string());
    }

    /// Clone out the accumulated trace.
    pub fn snapshot(&self) -> CallTrace {
        self.inner.lock().clone()
    }
}

/// A same-shaped capability that records every call before delegating.
pub struct Tracked {
    inner: Arc<dyn KnowledgeBase>,
    tracker: CallTracker,
}

impl Tracked {
    pub fn new(inner: Arc<dyn KnowledgeBase>, tracker: CallTracker) -> Self {
        Self { inner, tracker }
    }
}

#[async_trait]
impl KnowledgeBase for Tracked {
    fn default_workspace(&self) -> Option<String> {
        self.inner.default_workspace()
    }

    async fn health(&self) -> Result<HealthStatus> {
        self.tracker.record_call("health");
        self.inner.health().await
    }

    async fn list_workspaces(&self) -> Result<Vec<Workspace>> {
        self.tracker.record_call("workspaces.list");
        self.inner.list_workspaces().await
    }

    async fn search_nodes(&self, req: SearchRequest) -> Result<Vec<SearchHit>> {
        self.tracker.record_call("nodes.search");
        if let Some(ws) = req.workspace_ids.as_ref().and_then(|ids| ids.first()) {
            self.tracker.record_workspace(ws);
        }
        self.inner.search_nodes(req).await
    }

    async fn read_node(&self, node_id: &str, max_depth: u32) -> Result<String> {
        self.tracker.record_call("nodes.read");
        self.tracker.record_node(node_id);
        self.inner.read_node(node_id, max_depth).await
    }

    async fn node_children(&self, node_id: &str, req: ChildrenRequest) -> Result<ChildrenPage> {
        self.tracker.record_call("nodes.children");
        self.tracker.record_node(node_id);
        self.inner.node_children(node_id, req).await
    }

    async fn edit_node(&self, req: EditNodeRequest) -> Result<bool> {
        self.tracker.record_call("nodes.edit");
        self.tracker.record_node(&req.node_id);
        self.inner.edit_node(req).await
    }

    async fn trash_node(&self, node_id: &str) -> Result<bool> {
        self.tracker.record_call("nodes.trash");
        self.tracker.record_node(node_id);
        self.inner.trash_node(node_id).await
    }

    async fn check_node(&self, node_id: &str) -> Result<bool> {
        self.tracker.record_call("nodes.check");
        self.tracker.record_node(node_id);
        self.inner.check_node(node_id).await
    }

    async fn uncheck_node(&self, node_id: &str) -> Result<bool> {
        self.tracker.record_call("nodes.uncheck");
        self.tracker.record_node(node_id);
        self.inner.uncheck_node(node_id).await
    }

    async fn list_tags(&self, workspace_id: &str, limit: u32) -> Result<Vec<Tag>> {
        self.tracker.record_call("tags.list");
        self.tracker.record_workspace(workspace_id);
        self.inner.list_tags(workspace_id, limit).await
    }

    async fn tag_schema(&self, tag_id: &str, include_edit_instructions: bool) -> Result<String> {
        self.tracker.record_call("tags.schema");
        self.inner
            .tag_schema(tag_id, include_edit_instructions)
            .await
    }

    async fn modify_tags(
        &self,
        node_id: &str,
        action: TagAction,
        tag_ids: &[String],
    ) -> Result<bool> {
        self.tracker.record_call("tags.modify");
        self.tracker.record_node(node_id);
        self.inner.modify_tags(node_id, action, tag_ids).await
    }

    async fn create_tag(&self, req: CreateTagRequest) -> Result<String> {
        self.tracker.record_call("tags.create");
        self.tracker.record_workspace(&req.workspace_id);
        self.inner.create_tag(req).await
    }

    async fn add_field(&self, req: AddFieldRequest) -> Result<String> {
        self.tracker.record_call("tags.add_field");
        self.inner.add_field(req).await
    }

    async fn set_tag_checkbox(&self, req: SetCheckboxRequest) -> Result<bool> {
        self.tracker.record_call("tags.set_checkbox");
        self.inner.set_tag_checkbox(req).await
    }

    async fn set_field_option(
        &self,
        node_id: &str,
        attribute_id: &str,
        option_id: &str,
    ) -> Result<bool> {
        self.tracker.record_call("fields.set_option");
        self.tracker.record_node(node_id);
        self.inner
            .set_field_option(node_id, attribute_id, option_id)
            .await
    }

    async fn set_field_content(
        &self,
        node_id: &str,
        attribute_id: &str,
        content: &str,
    ) -> Result<bool> {
        self.tracker.record_call("fields.set_content");
        self.tracker.record_node(node_id);
        self.inner
            .set_field_content(node_id, attribute_id, content)
            .await
    }

    async fn calendar_node(
        &self,
        workspace_id: &str,
        granularity: CalendarGranularity,
        date: Option<&str>,
    ) -> Result<String> {
        self.tracker.record_call("calendar.get_or_create");
        self.tracker.record_workspace(workspace_id);
        self.inner
            .calendar_node(workspace_id, granularity, date)
            .await
    }

    async fn import_paste(&self, parent_node_id: &str, content: &str) -> Result<ImportOutcome> {
        self.tracker.record_call("import");
        self.tracker.record_node(parent_node_id);
        self.inner.import_paste(parent_node_id, content).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracker_seeds_default_workspace() {
        let tracker = CallTracker::new(Some("ws-default".to_string()));
        assert_eq!(
            tracker.snapshot().workspace_id.as_deref(),
            Some("ws-default")
        );

        // A disclosed workspace overrides the seed.
        tracker.record_workspace("ws-live");
        assert_eq!(tracker.snapshot().workspace_id.as_deref(), Some("ws-live"));
    }

    #[test]
    fn test_calls_keep_order_nodes_dedupe() {
        let tracker = CallTracker::new(None);
        tracker.record_call("nodes.search");
        tracker.record_call("nodes.read");
        tracker.record_call("nodes.read");
        tracker.record_node("n1");
        tracker.record_node("n2");
        tracker.record_node("n1");

        let trace = tracker.snapshot();
        assert_eq!(trace.calls, vec!["nodes.search", "nodes.read", "nodes.read"]);
        assert_eq!(trace.node_ids.len(), 2);
        assert!(trace.node_ids.contains("n1") && trace.node_ids.contains("n2"));
    }
}
