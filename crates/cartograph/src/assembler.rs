#![forbid(unsafe_code)]

//! Graph assembler: turns collector records into branded nodes and routes
//! them to the store.
//!
//! Nodes are either written immediately or parked in the pending set, per a
//! kind-based deferral policy: function nodes wait for the module-runtime
//! builder to attach rejection-handling metadata, everything else goes
//! straight through. The pending flush is the last node write of the run;
//! after it the assembler refuses further writes.

use std::collections::{HashMap, HashSet};

use tracing::warn;

use crate::collect::{
    CallRecord, ClassRecord, Collections, ExportRecord, FlowRecord, FunctionRecord, ImportRecord,
    ParamRecord, VariableRecord,
};
use crate::error::AnalysisError;
use crate::store::GraphStore;
use crate::types::{Diagnostic, Edge, FileSummary, Metadata, Node, NodeKind};

/// Lifecycle of one file's assembly. Transitions are one-way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblyState {
    Collecting,
    DomainBuildersRunning,
    FlushingPending,
    Committed,
}

impl AssemblyState {
    const fn name(self) -> &'static str {
        match self {
            Self::Collecting => "collecting",
            Self::DomainBuildersRunning => "builders_running",
            Self::FlushingPending => "flushing_pending",
            Self::Committed => "committed",
        }
    }
}

/// A branded node and its routing decision. Function nodes are deferred:
/// they are the only kind whose metadata a later builder amends.
enum BrandedNode {
    Direct(Node),
    Deferred(Node),
}

fn brand(node: Node) -> BrandedNode {
    match node.kind {
        NodeKind::Function => BrandedNode::Deferred(node),
        _ => BrandedNode::Direct(node),
    }
}

pub struct GraphAssembler<'s> {
    store: &'s mut dyn GraphStore,
    file: String,
    state: AssemblyState,
    pending: HashMap<String, Node>,
    // Flush order is insertion order, so re-runs write identical sequences.
    pending_order: Vec<String>,
    singletons: HashSet<String>,
    nodes_written: usize,
    edges_written: usize,
    node_ids: Vec<String>,
}

impl<'s> GraphAssembler<'s> {
    pub fn new(store: &'s mut dyn GraphStore, file: impl Into<String>) -> Self {
        if !store.supports_batching() {
            warn!("store does not batch writes; durability degraded to per-write");
        }
        Self {
            store,
            file: file.into(),
            state: AssemblyState::Collecting,
            pending: HashMap::new(),
            pending_order: Vec::new(),
            singletons: HashSet::new(),
            nodes_written: 0,
            edges_written: 0,
            node_ids: Vec::new(),
        }
    }

    fn expect_state(&self, expected: AssemblyState) -> Result<(), AnalysisError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(AnalysisError::InvalidState {
                state: self.state.name(),
                expected: expected.name(),
            })
        }
    }

    /// Brand every collected record into a node and write or defer it. The
    /// module root is written first so Contains anchors always have their
    /// target present by commit time.
    pub fn ingest(&mut self, module: Node, records: &Collections) -> Result<(), AnalysisError> {
        self.expect_state(AssemblyState::Collecting)?;

        self.write_now(module)?;
        for function in &records.functions {
            self.route(function_node(function))?;
            for param in &function.params {
                self.route(param_node(param, &function.file))?;
            }
        }
        for class in &records.classes {
            self.route(class_node(class))?;
        }
        for variable in &records.variables {
            self.route(variable_node(variable))?;
        }
        for call in &records.calls {
            self.route(call_node(call))?;
        }
        for flow in &records.flow {
            self.route(flow_node(flow))?;
        }
        for import in &records.imports {
            self.route(import_node(import))?;
        }
        for export in &records.exports {
            self.route(export_node(export))?;
        }
        Ok(())
    }

    fn route(&mut self, node: Node) -> Result<(), AnalysisError> {
        match brand(node) {
            BrandedNode::Direct(node) => self.write_now(node),
            BrandedNode::Deferred(node) => {
                self.node_ids.push(node.id.clone());
                if self.pending.insert(node.id.clone(), node.clone()).is_none() {
                    self.pending_order.push(node.id);
                }
                Ok(())
            }
        }
    }

    fn write_now(&mut self, node: Node) -> Result<(), AnalysisError> {
        self.node_ids.push(node.id.clone());
        self.store.write_node(&node).map_err(AnalysisError::from)?;
        self.nodes_written += 1;
        Ok(())
    }

    pub fn begin_builders(&mut self) -> Result<(), AnalysisError> {
        self.expect_state(AssemblyState::Collecting)?;
        self.state = AssemblyState::DomainBuildersRunning;
        Ok(())
    }

    pub fn write_edge(&mut self, edge: Edge) -> Result<(), AnalysisError> {
        self.expect_state(AssemblyState::DomainBuildersRunning)?;
        self.store
            .write_edge(&edge, &self.file)
            .map_err(AnalysisError::from)?;
        self.edges_written += 1;
        Ok(())
    }

    /// Write a file-independent singleton (resource, external module) at
    /// most once per run. Returns whether this call created it.
    pub fn write_singleton(&mut self, node: Node) -> Result<bool, AnalysisError> {
        self.expect_state(AssemblyState::DomainBuildersRunning)?;
        if !self.singletons.insert(node.id.clone()) {
            return Ok(false);
        }
        self.store.write_node(&node).map_err(AnalysisError::from)?;
        self.nodes_written += 1;
        self.node_ids.push(node.id);
        Ok(true)
    }

    /// Look up a deferred node for in-place metadata mutation. Only valid
    /// while builders run; after flush the pending set is gone.
    pub fn find_pending_node(&mut self, id: &str) -> Option<&mut Node> {
        if self.state != AssemblyState::DomainBuildersRunning {
            return None;
        }
        self.pending.get_mut(id)
    }

    /// Write out the pending set. This is the last write of the run.
    pub fn flush_pending(&mut self) -> Result<(), AnalysisError> {
        self.expect_state(AssemblyState::DomainBuildersRunning)?;
        self.state = AssemblyState::FlushingPending;
        for id in std::mem::take(&mut self.pending_order) {
            if let Some(node) = self.pending.remove(&id) {
                self.store.write_node(&node).map_err(AnalysisError::from)?;
                self.nodes_written += 1;
            }
        }
        self.state = AssemblyState::Committed;
        Ok(())
    }

    pub fn into_summary(self, diagnostics: Vec<Diagnostic>) -> Result<FileSummary, AnalysisError> {
        self.expect_state(AssemblyState::Committed)?;
        Ok(FileSummary {
            file: self.file,
            nodes_created: self.nodes_written,
            edges_created: self.edges_written,
            node_ids: self.node_ids,
            diagnostics,
        })
    }
}

fn function_node(record: &FunctionRecord) -> Node {
    let mut metadata = Metadata::new();
    metadata.insert("is_async".into(), record.is_async.into());
    metadata.insert("is_generator".into(), record.is_generator.into());
    metadata.insert("is_arrow".into(), record.is_arrow.into());
    metadata.insert("is_method".into(), record.is_method.into());
    metadata.insert("param_count".into(), record.params.len().into());
    Node {
        id: record.id.clone(),
        kind: NodeKind::Function,
        name: record.name.clone(),
        file: record.file.clone(),
        line: record.line,
        column: record.column,
        metadata: Some(metadata),
    }
}

fn param_node(record: &ParamRecord, file: &str) -> Node {
    let mut metadata = Metadata::new();
    metadata.insert("index".into(), record.index.into());
    if let Some(ty) = &record.type_annotation {
        metadata.insert("type".into(), ty.clone().into());
    }
    Node {
        id: record.id.clone(),
        kind: NodeKind::Parameter,
        name: record.name.clone(),
        file: file.to_string(),
        line: record.line,
        column: record.column,
        metadata: Some(metadata),
    }
}

fn class_node(record: &ClassRecord) -> Node {
    let mut metadata = Metadata::new();
    if let Some(superclass) = &record.superclass {
        metadata.insert("extends".into(), superclass.clone().into());
    }
    if !record.implements.is_empty() {
        metadata.insert("implements".into(), record.implements.clone().into());
    }
    if !record.fields.is_empty() {
        let fields: Vec<serde_json::Value> = record
            .fields
            .iter()
            .map(|f| {
                serde_json::json!({
                    "name": f.name,
                    "static": f.is_static,
                    "private": f.is_private,
                })
            })
            .collect();
        metadata.insert("fields".into(), fields.into());
    }
    Node {
        id: record.id.clone(),
        kind: NodeKind::Class,
        name: record.name.clone(),
        file: record.file.clone(),
        line: record.line,
        column: record.column,
        metadata: if metadata.is_empty() { None } else { Some(metadata) },
    }
}

fn variable_node(record: &VariableRecord) -> Node {
    let mut metadata = Metadata::new();
    metadata.insert("is_const".into(), record.is_const.into());
    if let Some(ty) = &record.type_annotation {
        metadata.insert("type".into(), ty.clone().into());
    }
    if let Some(init) = &record.init {
        metadata.insert("init".into(), init.text.clone().into());
    }
    Node {
        id: record.id.clone(),
        kind: NodeKind::Variable,
        name: record.name.clone(),
        file: record.file.clone(),
        line: record.line,
        column: record.column,
        metadata: Some(metadata),
    }
}

fn call_node(record: &CallRecord) -> Node {
    let mut metadata = Metadata::new();
    metadata.insert("callee".into(), record.callee_text.clone().into());
    metadata.insert("usage".into(), record.usage.tag().into());
    metadata.insert("awaited".into(), record.is_awaited.into());
    metadata.insert("arg_count".into(), record.arg_count.into());
    Node {
        id: record.id.clone(),
        kind: if record.is_constructor {
            NodeKind::ConstructorCall
        } else {
            NodeKind::CallSite
        },
        name: record.callee.clone(),
        file: record.file.clone(),
        line: record.line,
        column: record.column,
        metadata: Some(metadata),
    }
}

fn flow_node(record: &FlowRecord) -> Node {
    Node {
        id: record.id.clone(),
        kind: record.kind,
        name: record.name.clone(),
        file: record.file.clone(),
        line: record.line,
        column: record.column,
        metadata: None,
    }
}

fn import_node(record: &ImportRecord) -> Node {
    let mut metadata = Metadata::new();
    metadata.insert("specifier".into(), record.specifier.clone().into());
    if let Some(export) = &record.export_name {
        metadata.insert("imported".into(), export.clone().into());
    }
    Node {
        id: record.id.clone(),
        kind: NodeKind::Import,
        name: record.local_name.clone(),
        file: record.file.clone(),
        line: record.line,
        column: record.column,
        metadata: Some(metadata),
    }
}

fn export_node(record: &ExportRecord) -> Node {
    let metadata = record.specifier.as_ref().map(|specifier| {
        let mut metadata = Metadata::new();
        metadata.insert("specifier".into(), specifier.clone().into());
        metadata
    });
    Node {
        id: record.id.clone(),
        kind: NodeKind::Export,
        name: record.name.clone(),
        file: record.file.clone(),
        line: record.line,
        column: record.column,
        metadata,
    }
}
