//! Rhai binding surface.
//!
//! Builds the per-invocation script engine and registers the three
//! bindings a script is allowed to touch: the capability handle (`kb`),
//! the workflow handle (`workflow`), and the output sinks. Capability
//! methods run on the script's blocking thread and bridge back into the
//! async runtime through a captured handle.

use std::sync::Arc;

use rhai::serde::{from_dynamic, to_dynamic};
use rhai::{Array, Dynamic, Engine, EvalAltResult, Map, Position};
use serde::Deserialize;
use tokio::runtime::Handle;

use grimoire_types::{
    CalendarGranularity, ChildrenRequest, DomainError, KnowledgeBase, SearchRequest, TagAction,
};

use crate::output::{OutputBuffer, format_value};
use crate::workflow::WorkflowHandle;

type ScriptResult<T> = Result<T, Box<EvalAltResult>>;

fn runtime_err(msg: impl Into<String>) -> Box<EvalAltResult> {
    Box::new(EvalAltResult::ErrorRuntime(
        msg.into().into(),
        Position::NONE,
    ))
}

/// A capability failure surfaces into the script as an ordinary thrown
/// error, indistinguishable from script logic errors.
fn kb_err(e: DomainError) -> Box<EvalAltResult> {
    runtime_err(e.to_string())
}

/// Options accepted by the two-argument search form.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SearchOptions {
    limit: Option<u32>,
    workspace_ids: Option<Vec<String>>,
}

/// The `kb` binding: capability calls exposed as script methods.
#[derive(Clone)]
pub(crate) struct KbHandle {
    kb: Arc<dyn KnowledgeBase>,
    rt: Handle,
}

impl KbHandle {
    pub(crate) fn new(kb: Arc<dyn KnowledgeBase>, rt: Handle) -> Self {
        Self { kb, rt }
    }

    fn health(&mut self) -> ScriptResult<Dynamic> {
        let status = self.rt.block_on(self.kb.health()).map_err(kb_err)?;
        to_dynamic(status)
    }

    fn list_workspaces(&mut self) -> ScriptResult<Dynamic> {
        let workspaces = self
            .rt
            .block_on(self.kb.list_workspaces())
            .map_err(kb_err)?;
        to_dynamic(workspaces)
    }

    fn search_nodes(&mut self, query: Dynamic) -> ScriptResult<Dynamic> {
        let req = SearchRequest {
            query: from_dynamic(&query)?,
            ..SearchRequest::default()
        };
        self.search(req)
    }

    fn search_nodes_with(&mut self, query: Dynamic, options: Map) -> ScriptResult<Dynamic> {
        let opts: SearchOptions = from_dynamic(&Dynamic::from(options))?;
        let req = SearchRequest {
            query: from_dynamic(&query)?,
            limit: opts.limit,
            workspace_ids: opts.workspace_ids,
        };
        self.search(req)
    }

    fn search(&mut self, req: SearchRequest) -> ScriptResult<Dynamic> {
        let hits = self
            .rt
            .block_on(self.kb.search_nodes(req))
            .map_err(kb_err)?;
        to_dynamic(hits)
    }

    fn read_node(&mut self, node_id: &str) -> ScriptResult<String> {
        self.read_node_depth(node_id, 1)
    }

    fn read_node_depth(&mut self, node_id: &str, max_depth: i64) -> ScriptResult<String> {
        let depth = u32::try_from(max_depth)
            .map_err(|_| runtime_err(format!("invalid max_depth: {max_depth}")))?;
        self.rt
            .block_on(self.kb.read_node(node_id, depth))
            .map_err(kb_err)
    }

    fn node_children(&mut self, node_id: &str) -> ScriptResult<Dynamic> {
        self.children(node_id, ChildrenRequest::default())
    }

    fn node_children_with(&mut self, node_id: &str, options: Map) -> ScriptResult<Dynamic> {
        let req: ChildrenRequest = from_dynamic(&Dynamic::from(options))?;
        self.children(node_id, req)
    }

    fn children(&mut self, node_id: &str, req: ChildrenRequest) -> ScriptResult<Dynamic> {
        let page = self
            .rt
            .block_on(self.kb.node_children(node_id, req))
            .map_err(kb_err)?;
        to_dynamic(page)
    }

    fn edit_node(&mut self, req: Map) -> ScriptResult<bool> {
        let req = from_dynamic(&Dynamic::from(req))?;
        self.rt.block_on(self.kb.edit_node(req)).map_err(kb_err)
    }

    fn trash_node(&mut self, node_id: &str) -> ScriptResult<bool> {
        self.rt
            .block_on(self.kb.trash_node(node_id))
            .map_err(kb_err)
    }

    fn check_node(&mut self, node_id: &str) -> ScriptResult<bool> {
        self.rt
            .block_on(self.kb.check_node(node_id))
            .map_err(kb_err)
    }

    fn uncheck_node(&mut self, node_id: &str) -> ScriptResult<bool> {
        self.rt
            .block_on(self.kb.uncheck_node(node_id))
            .map_err(kb_err)
    }

    fn list_tags(&mut self, workspace_id: &str) -> ScriptResult<Dynamic> {
        self.list_tags_limit(workspace_id, 50)
    }

    fn list_tags_limit(&mut self, workspace_id: &str, limit: i64) -> ScriptResult<Dynamic> {
        let limit =
            u32::try_from(limit).map_err(|_| runtime_err(format!("invalid limit: {limit}")))?;
        let tags = self
            .rt
            .block_on(self.kb.list_tags(workspace_id, limit))
            .map_err(kb_err)?;
        to_dynamic(tags)
    }

    fn tag_schema(&mut self, tag_id: &str) -> ScriptResult<String> {
        self.tag_schema_full(tag_id, false)
    }

    fn tag_schema_full(
        &mut self,
        tag_id: &str,
        include_edit_instructions: bool,
    ) -> ScriptResult<String> {
        self.rt
            .block_on(self.kb.tag_schema(tag_id, include_edit_instructions))
            .map_err(kb_err)
    }

    fn modify_tags(&mut self, node_id: &str, action: &str, tag_ids: Array) -> ScriptResult<bool> {
        let action = match action {
            "add" => TagAction::Add,
            "remove" => TagAction::Remove,
            other => return Err(runtime_err(format!("unknown tag action: {other}"))),
        };
        let tag_ids = tag_ids
            .into_iter()
            .map(|t| {
                t.into_string()
                    .map_err(|typ| runtime_err(format!("expected string tag id, got {typ}")))
            })
            .collect::<ScriptResult<Vec<String>>>()?;
        self.rt
            .block_on(self.kb.modify_tags(node_id, action, &tag_ids))
            .map_err(kb_err)
    }

    fn create_tag(&mut self, req: Map) -> ScriptResult<String> {
        let req = from_dynamic(&Dynamic::from(req))?;
        self.rt.block_on(self.kb.create_tag(req)).map_err(kb_err)
    }

    fn add_field(&mut self, req: Map) -> ScriptResult<String> {
        let req = from_dynamic(&Dynamic::from(req))?;
        self.rt.block_on(self.kb.add_field(req)).map_err(kb_err)
    }

    fn set_tag_checkbox(&mut self, req: Map) -> ScriptResult<bool> {
        let req = from_dynamic(&Dynamic::from(req))?;
        self.rt
            .block_on(self.kb.set_tag_checkbox(req))
            .map_err(kb_err)
    }

    fn set_field_option(
        &mut self,
        node_id: &str,
        attribute_id: &str,
        option_id: &str,
    ) -> ScriptResult<bool> {
        self.rt
            .block_on(self.kb.set_field_option(node_id, attribute_id, option_id))
            .map_err(kb_err)
    }

    fn set_field_content(
        &mut self,
        node_id: &str,
        attribute_id: &str,
        content: &str,
    ) -> ScriptResult<bool> {
        self.rt
            .block_on(self.kb.set_field_content(node_id, attribute_id, content))
            .map_err(kb_err)
    }

    fn calendar_node(&mut self, workspace_id: &str, granularity: &str) -> ScriptResult<String> {
        self.calendar(workspace_id, granularity, None)
    }

    fn calendar_node_date(
        &mut self,
        workspace_id: &str,
        granularity: &str,
        date: &str,
    ) -> ScriptResult<String> {
        self.calendar(workspace_id, granularity, Some(date))
    }

    fn calendar(
        &mut self,
        workspace_id: &str,
        granularity: &str,
        date: Option<&str>,
    ) -> ScriptResult<String> {
        let granularity: CalendarGranularity = granularity.parse().map_err(runtime_err)?;
        self.rt
            .block_on(self.kb.calendar_node(workspace_id, granularity, date))
            .map_err(kb_err)
    }

    fn import_paste(&mut self, parent_node_id: &str, content: &str) -> ScriptResult<Dynamic> {
        let outcome = self
            .rt
            .block_on(self.kb.import_paste(parent_node_id, content))
            .map_err(kb_err)?;
        to_dynamic(outcome)
    }
}

/// Build a fresh engine for one invocation.
///
/// The engine exposes only the registered surface; `eval` is disabled so a
/// script cannot re-enter the interpreter with unvetted text.
pub(crate) fn build_engine(output: OutputBuffer) -> Engine {
    let mut engine = Engine::new();
    engine.disable_symbol("eval");

    register_output(&mut engine, output);
    register_kb(&mut engine);
    register_workflow(&mut engine);

    engine
}

fn register_output(engine: &mut Engine, output: OutputBuffer) {
    {
        let buf = output.clone();
        engine.on_print(move |s| buf.push(s));
    }
    {
        let buf = output.clone();
        engine.on_debug(move |s, _source, _pos| buf.push(s));
    }

    let buf = output.clone();
    engine.register_fn("log", move |v: Dynamic| buf.push(format_value(&v)));
    let buf = output.clone();
    engine.register_fn("log", move |a: Dynamic, b: Dynamic| {
        buf.push(format!("{} {}", format_value(&a), format_value(&b)));
    });
    let buf = output.clone();
    engine.register_fn("log", move |a: Dynamic, b: Dynamic, c: Dynamic| {
        buf.push(format!(
            "{} {} {}",
            format_value(&a),
            format_value(&b),
            format_value(&c)
        ));
    });

    let buf = output.clone();
    engine.register_fn("warn", move |v: Dynamic| {
        buf.push(format!("[WARN] {}", format_value(&v)));
    });
    let buf = output;
    engine.register_fn("error", move |v: Dynamic| {
        buf.push(format!("[ERROR] {}", format_value(&v)));
    });
}

fn register_kb(engine: &mut Engine) {
    engine.register_type_with_name::<KbHandle>("KnowledgeBase");

    engine.register_fn("health", KbHandle::health);
    engine.register_fn("list_workspaces", KbHandle::list_workspaces);
    engine.register_fn("search_nodes", KbHandle::search_nodes);
    engine.register_fn("search_nodes", KbHandle::search_nodes_with);
    engine.register_fn("read_node", KbHandle::read_node);
    engine.register_fn("read_node", KbHandle::read_node_depth);
    engine.register_fn("node_children", KbHandle::node_children);
    engine.register_fn("node_children", KbHandle::node_children_with);
    engine.register_fn("edit_node", KbHandle::edit_node);
    engine.register_fn("trash_node", KbHandle::trash_node);
    engine.register_fn("check_node", KbHandle::check_node);
    engine.register_fn("uncheck_node", KbHandle::uncheck_node);
    engine.register_fn("list_tags", KbHandle::list_tags);
    engine.register_fn("list_tags", KbHandle::list_tags_limit);
    engine.register_fn("tag_schema", KbHandle::tag_schema);
    engine.register_fn("tag_schema", KbHandle::tag_schema_full);
    engine.register_fn("modify_tags", KbHandle::modify_tags);
    engine.register_fn("create_tag", KbHandle::create_tag);
    engine.register_fn("add_field", KbHandle::add_field);
    engine.register_fn("set_tag_checkbox", KbHandle::set_tag_checkbox);
    engine.register_fn("set_field_option", KbHandle::set_field_option);
    engine.register_fn("set_field_content", KbHandle::set_field_content);
    engine.register_fn("calendar_node", KbHandle::calendar_node);
    engine.register_fn("calendar_node", KbHandle::calendar_node_date);
    engine.register_fn("import_paste", KbHandle::import_paste);
}

fn register_workflow(engine: &mut Engine) {
    engine.register_type_with_name::<WorkflowHandle>("Workflow");

    engine.register_fn("start", |wf: &mut WorkflowHandle, msg: &str| wf.start(msg));
    engine.register_fn("step", |wf: &mut WorkflowHandle, msg: &str| wf.step(msg));
    engine.register_fn("progress", |wf: &mut WorkflowHandle, current: i64, total: i64| {
        wf.progress(current, total, None);
    });
    engine.register_fn(
        "progress",
        |wf: &mut WorkflowHandle, current: i64, total: i64, msg: &str| {
            wf.progress(current, total, Some(msg));
        },
    );
    engine.register_fn("complete", |wf: &mut WorkflowHandle| wf.complete(None));
    engine.register_fn("complete", |wf: &mut WorkflowHandle, msg: &str| {
        wf.complete(Some(msg));
    });
    engine.register_fn("abort", |wf: &mut WorkflowHandle, reason: &str| {
        wf.abort(reason);
    });
}
