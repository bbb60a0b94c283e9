#![forbid(unsafe_code)]

//! Entity collectors.
//!
//! One collector per syntactic category. Each collector walks the syntax
//! tree once through the shared scope-aware walker and appends structured
//! records (not yet graph nodes) to the per-file [`Collections`]. Exactly one
//! collector claims each construct kind; the claim is expressed in the
//! [`owning_collector`] table rather than guard clauses scattered per
//! visitor, so ownership stays auditable in one place.

pub mod calls;
pub mod classes;
pub mod control_flow;
pub mod functions;
pub mod module_runtime;
pub mod variables;
pub mod walk;

use tree_sitter::{Node as TsNode, Tree};

use crate::scope::ScopeTracker;
use crate::types::{Diagnostic, NodeKind};

/// The collector that owns a construct kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectorKind {
    Functions,
    Classes,
    Variables,
    Calls,
    ControlFlow,
    ModuleRuntime,
}

impl CollectorKind {
    pub const ALL: [Self; 6] = [
        Self::Functions,
        Self::Classes,
        Self::Variables,
        Self::Calls,
        Self::ControlFlow,
        Self::ModuleRuntime,
    ];
}

/// Construct ownership table. A syntax kind missing here is owned by nobody
/// and produces no record. Class-body member kinds belong to the class
/// collector even though a naive "has enclosing function" check would hand
/// them to a top-level collector. For-in and catch constructs stay with the
/// control-flow collector; the walker hands the bindings they introduce to
/// the variable collector separately.
pub fn owning_collector(ts_kind: &str) -> Option<CollectorKind> {
    Some(match ts_kind {
        "function_declaration"
        | "generator_function_declaration"
        | "function_expression"
        | "function"
        | "generator_function"
        | "arrow_function"
        | "method_definition" => CollectorKind::Functions,

        "class_declaration" | "class" | "field_definition" | "public_field_definition" => {
            CollectorKind::Classes
        }

        "variable_declarator" | "assignment_expression" | "augmented_assignment_expression"
        | "update_expression" => CollectorKind::Variables,

        "call_expression" | "new_expression" => CollectorKind::Calls,

        "if_statement" | "else_clause" | "switch_statement" | "switch_case" | "switch_default"
        | "for_statement" | "for_in_statement" | "while_statement" | "do_statement"
        | "try_statement" | "catch_clause" | "finally_clause" | "statement_block" => {
            CollectorKind::ControlFlow
        }

        "import_statement" | "export_statement" => CollectorKind::ModuleRuntime,

        _ => return None,
    })
}

/// How an expression value is used at its site. The Contains anchor is
/// emitted for every usage; the call-flow builder adds Throws / Returns /
/// Yields edges on top.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueUsage {
    Assigned,
    Thrown,
    Returned,
    Yielded,
    Argument,
    Chained,
    Statement,
}

impl ValueUsage {
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Assigned => "assigned",
            Self::Thrown => "thrown",
            Self::Returned => "returned",
            Self::Yielded => "yielded",
            Self::Argument => "argument",
            Self::Chained => "chained",
            Self::Statement => "statement",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ParamRecord {
    pub id: String,
    pub name: String,
    pub index: usize,
    pub type_annotation: Option<String>,
    pub line: i64,
    pub column: i64,
}

#[derive(Debug, Clone)]
pub struct FunctionRecord {
    pub id: String,
    pub name: String,
    /// Id of the lexically enclosing scope, recorded at visit time.
    pub scope_id: String,
    pub file: String,
    pub line: i64,
    pub column: i64,
    pub is_async: bool,
    pub is_generator: bool,
    pub is_arrow: bool,
    pub is_method: bool,
    pub params: Vec<ParamRecord>,
}

#[derive(Debug, Clone)]
pub struct FieldRecord {
    pub name: String,
    pub is_static: bool,
    pub is_private: bool,
    pub line: i64,
    pub column: i64,
}

#[derive(Debug, Clone)]
pub struct ClassRecord {
    pub id: String,
    pub name: String,
    pub scope_id: String,
    pub file: String,
    pub line: i64,
    pub column: i64,
    /// Raw superclass expression text, if any.
    pub superclass: Option<String>,
    pub implements: Vec<String>,
    pub fields: Vec<FieldRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitKind {
    Call,
    Constructor,
    Function,
    Identifier,
    Other,
}

/// Reference to a variable's initializer expression, matched back to the
/// producing record by byte offset in the data-flow builder.
#[derive(Debug, Clone)]
pub struct InitRef {
    pub start_byte: usize,
    pub kind: InitKind,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct VariableRecord {
    pub id: String,
    pub name: String,
    pub scope_id: String,
    pub file: String,
    pub line: i64,
    pub column: i64,
    pub is_const: bool,
    pub type_annotation: Option<String>,
    pub init: Option<InitRef>,
}

#[derive(Debug, Clone)]
pub struct MutationRecord {
    /// Name of the assignment target (innermost identifier).
    pub target_name: String,
    /// Rendered scope path at the mutation site, used for scope-chain
    /// resolution against variable ids.
    pub scope_path: Vec<String>,
    pub enclosing_function_id: Option<String>,
    pub operator: String,
    /// True when the target is a property write (`obj.count += 1` mutates
    /// `obj`), not a rebinding of the identifier itself.
    pub is_property: bool,
    pub line: i64,
    pub column: i64,
}

#[derive(Debug, Clone)]
pub struct CallRecord {
    pub id: String,
    /// Innermost callee name (`json` for `res.json(...)`).
    pub callee: String,
    /// Full callee expression text (`res.json`).
    pub callee_text: String,
    pub is_constructor: bool,
    pub scope_id: String,
    pub enclosing_function_id: Option<String>,
    pub file: String,
    pub line: i64,
    pub column: i64,
    pub start_byte: usize,
    pub usage: ValueUsage,
    pub is_awaited: bool,
    /// True when the callee is a member expression (`promise.catch(...)`).
    pub is_member_call: bool,
    /// True when the call sits inside a `try` that has a catch clause,
    /// without a function boundary in between.
    pub in_try_with_catch: bool,
    pub arg_count: usize,
}

#[derive(Debug, Clone)]
pub struct FlowRecord {
    pub id: String,
    pub kind: NodeKind,
    pub name: String,
    pub scope_id: String,
    pub file: String,
    pub line: i64,
    pub column: i64,
    /// Byte span of the condition expression, when the construct has one.
    pub condition_span: Option<(usize, usize)>,
}

#[derive(Debug, Clone)]
pub struct ImportRecord {
    pub id: String,
    pub local_name: String,
    pub specifier: String,
    pub export_name: Option<String>,
    pub scope_id: String,
    pub file: String,
    pub line: i64,
    pub column: i64,
}

#[derive(Debug, Clone)]
pub struct ExportRecord {
    pub id: String,
    pub name: String,
    pub specifier: Option<String>,
    pub scope_id: String,
    pub file: String,
    pub line: i64,
    pub column: i64,
}

/// Per-file output of all collector passes. Owned by the assembler once
/// collection completes.
#[derive(Debug, Default)]
pub struct Collections {
    pub functions: Vec<FunctionRecord>,
    pub classes: Vec<ClassRecord>,
    pub variables: Vec<VariableRecord>,
    pub mutations: Vec<MutationRecord>,
    pub calls: Vec<CallRecord>,
    pub flow: Vec<FlowRecord>,
    pub imports: Vec<ImportRecord>,
    pub exports: Vec<ExportRecord>,
}

/// Shared state for one collector pass: source access, a fresh scope
/// tracker, and the output collections.
pub struct CollectCx<'a> {
    pub source: &'a str,
    pub file: &'a str,
    pub module_id: &'a str,
    pub tracker: ScopeTracker,
    pub out: &'a mut Collections,
    pub diagnostics: &'a mut Vec<Diagnostic>,
}

impl<'a> CollectCx<'a> {
    pub fn text(&self, node: TsNode<'_>) -> &'a str {
        node.utf8_text(self.source.as_bytes()).unwrap_or_default()
    }

    pub fn diagnostic(&mut self, node: TsNode<'_>, code: &str, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic {
            message: message.into(),
            line: Some(node.start_position().row as i64 + 1),
            column: Some(node.start_position().column as i64),
            code: Some(code.to_string()),
        });
    }
}

/// A collector pass: reacts to the constructs it owns while the shared
/// walker drives traversal and scope tracking.
pub trait Collector {
    fn kind(&self) -> CollectorKind;

    /// Called for an owned construct that does not form a scope.
    fn visit(&mut self, node: TsNode<'_>, cx: &mut CollectCx<'_>);

    /// Called for an owned construct right after its scope was entered.
    /// `scope` carries the id the walker assigned to the new scope.
    fn visit_scope(&mut self, _node: TsNode<'_>, _scope: &walk::EnteredScope, _cx: &mut CollectCx<'_>) {}
}

/// Run every collector over the tree, each with a fresh scope tracker so all
/// passes observe identical scope paths and identical ids.
pub fn run_collectors(
    tree: &Tree,
    source: &str,
    file: &str,
    module_id: &str,
) -> (Collections, Vec<Diagnostic>) {
    let mut out = Collections::default();
    let mut diagnostics = Vec::new();

    for kind in CollectorKind::ALL {
        let mut collector: Box<dyn Collector> = match kind {
            CollectorKind::Functions => Box::new(functions::FunctionCollector::default()),
            CollectorKind::Classes => Box::new(classes::ClassCollector::default()),
            CollectorKind::Variables => Box::new(variables::VariableCollector::default()),
            CollectorKind::Calls => Box::new(calls::CallCollector::default()),
            CollectorKind::ControlFlow => Box::new(control_flow::ControlFlowCollector::default()),
            CollectorKind::ModuleRuntime => {
                Box::new(module_runtime::ModuleRuntimeCollector::default())
            }
        };

        let mut cx = CollectCx {
            source,
            file,
            module_id,
            tracker: ScopeTracker::new(file, module_id),
            out: &mut out,
            diagnostics: &mut diagnostics,
        };
        walk::walk(tree.root_node(), &mut cx, collector.as_mut());
    }

    (out, diagnostics)
}
