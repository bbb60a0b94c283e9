#![forbid(unsafe_code)]

//! Shared scope-aware tree walker.
//!
//! Every collector pass traverses through this walker so scope entry, sibling
//! counters and scope-node ids are computed identically in each pass. The
//! walker enters scopes for all scope-forming constructs regardless of which
//! collector is running; it only dispatches visit callbacks to the collector
//! that owns the construct per [`super::owning_collector`].

use tree_sitter::Node as TsNode;

use crate::identity::semantic_id;
use crate::scope::ScopeKind;
use crate::types::NodeKind;

use super::{CollectCx, Collector, CollectorKind, owning_collector};

/// A scope the walker just entered, with the id it assigned to the scope's
/// node and the ids that were current immediately before entry.
#[derive(Debug, Clone)]
pub struct EnteredScope {
    pub id: String,
    pub node_kind: NodeKind,
    pub name: String,
    pub counter: u32,
    /// Contains-owner id at the point the construct was visited.
    pub parent_scope_id: String,
    pub parent_function_id: Option<String>,
}

struct ScopePlan {
    name: String,
    scope_kind: ScopeKind,
    node_kind: NodeKind,
}

pub fn walk(node: TsNode<'_>, cx: &mut CollectCx<'_>, visitor: &mut dyn Collector) {
    let owned = owning_collector(node.kind()) == Some(visitor.kind());

    let Some(plan) = scope_plan(node, cx) else {
        if owned {
            visitor.visit(node, cx);
        }
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            walk(child, cx, visitor);
        }
        return;
    };

    let parent_scope_id = cx.tracker.current_scope_id().to_string();
    let parent_function_id = cx.tracker.current_function_id().map(str::to_string);
    let counter = cx
        .tracker
        .enter(plan.name.clone(), plan.scope_kind, plan.node_kind.tag());

    match semantic_id(
        cx.file,
        cx.tracker.parent_path(),
        plan.node_kind,
        &plan.name,
        counter,
    ) {
        Ok(id) => {
            cx.tracker
                .promote_owner(id.clone(), plan.scope_kind == ScopeKind::Function);
            if owned {
                let entered = EnteredScope {
                    id,
                    node_kind: plan.node_kind,
                    name: plan.name,
                    counter,
                    parent_scope_id,
                    parent_function_id,
                };
                visitor.visit_scope(node, &entered, cx);
            }
            // For-in and catch constructs are owned by the control-flow
            // collector, but the bindings they introduce are declarations;
            // those are handed to the variable collector inside the scope
            // just entered.
            if binds_variables(node.kind()) && visitor.kind() == CollectorKind::Variables {
                visitor.visit(node, cx);
            }
        }
        Err(err) => {
            // The record is dropped; children still anchor to the outer
            // scope, and sibling counters stay consistent across passes.
            if owned {
                cx.diagnostic(node, "identity", err.to_string());
            }
        }
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        walk(child, cx, visitor);
    }
    cx.tracker.exit();
}

/// Constructs whose record belongs to another collector but which still
/// introduce a variable binding (`for (const k in obj)`, `catch (e)`).
fn binds_variables(ts_kind: &str) -> bool {
    matches!(ts_kind, "for_in_statement" | "catch_clause")
}

fn scope_plan(node: TsNode<'_>, cx: &mut CollectCx<'_>) -> Option<ScopePlan> {
    let plan = match node.kind() {
        "function_declaration" | "generator_function_declaration" => ScopePlan {
            name: declared_name(node, cx).unwrap_or_else(|| "anonymous".to_string()),
            scope_kind: ScopeKind::Function,
            node_kind: NodeKind::Function,
        },
        "function_expression" | "function" | "generator_function" | "arrow_function" => ScopePlan {
            name: contextual_function_name(node, cx),
            scope_kind: ScopeKind::Function,
            node_kind: NodeKind::Function,
        },
        "method_definition" => ScopePlan {
            name: declared_name(node, cx).unwrap_or_else(|| "anonymous".to_string()),
            scope_kind: ScopeKind::Function,
            node_kind: NodeKind::Function,
        },
        "class_declaration" => ScopePlan {
            name: declared_name(node, cx).unwrap_or_else(|| "anonymous".to_string()),
            scope_kind: ScopeKind::Class,
            node_kind: NodeKind::Class,
        },
        "class" => ScopePlan {
            name: declared_name(node, cx).unwrap_or_else(|| contextual_function_name(node, cx)),
            scope_kind: ScopeKind::Class,
            node_kind: NodeKind::Class,
        },
        "if_statement" => flow_plan("if", ScopeKind::Branch, NodeKind::Branch),
        "else_clause" => flow_plan("else", ScopeKind::Block, NodeKind::Scope),
        "switch_statement" => flow_plan("switch", ScopeKind::Branch, NodeKind::Branch),
        "switch_case" => flow_plan("case", ScopeKind::Case, NodeKind::Case),
        "switch_default" => flow_plan("default", ScopeKind::Case, NodeKind::Case),
        "for_statement" | "for_in_statement" => flow_plan("for", ScopeKind::Loop, NodeKind::Loop),
        "while_statement" => flow_plan("while", ScopeKind::Loop, NodeKind::Loop),
        "do_statement" => flow_plan("do", ScopeKind::Loop, NodeKind::Loop),
        "try_statement" => flow_plan("try", ScopeKind::Try, NodeKind::TryBlock),
        "catch_clause" => flow_plan("catch", ScopeKind::Catch, NodeKind::CatchBlock),
        "finally_clause" => flow_plan("finally", ScopeKind::Finally, NodeKind::FinallyBlock),
        "statement_block" => {
            // Only the consequence block of an `if` forms a named sub-scope.
            let parent = node.parent()?;
            if parent.kind() == "if_statement"
                && parent
                    .child_by_field_name("consequence")
                    .is_some_and(|c| c.id() == node.id())
            {
                flow_plan("then", ScopeKind::Block, NodeKind::Scope)
            } else {
                return None;
            }
        }
        _ => return None,
    };
    Some(plan)
}

fn flow_plan(name: &str, scope_kind: ScopeKind, node_kind: NodeKind) -> ScopePlan {
    ScopePlan {
        name: name.to_string(),
        scope_kind,
        node_kind,
    }
}

pub fn declared_name(node: TsNode<'_>, cx: &CollectCx<'_>) -> Option<String> {
    let name = node.child_by_field_name("name")?;
    let text = name.utf8_text(cx.source.as_bytes()).ok()?.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

/// Name an anonymous function (or class expression) from the construct it is
/// attached to. The class-member check comes first: a field initializer is
/// owned by its class member, not by whatever a naive "no enclosing
/// function" check would conclude.
pub fn contextual_function_name(node: TsNode<'_>, cx: &CollectCx<'_>) -> String {
    let mut current = node;
    while let Some(parent) = current.parent() {
        match parent.kind() {
            // `class A { handler = () => ... }` names the arrow `handler`.
            "field_definition" | "public_field_definition" => {
                if let Some(name) = property_name(parent, cx) {
                    return name;
                }
                return "anonymous".to_string();
            }
            "pair" => {
                if let Some(key) = parent.child_by_field_name("key") {
                    let text = cx.text(key).trim_matches(['"', '\'']).to_string();
                    if !text.is_empty() {
                        return text;
                    }
                }
                return "anonymous".to_string();
            }
            "variable_declarator" => {
                if let Some(name) = declared_name(parent, cx) {
                    return name;
                }
                return "anonymous".to_string();
            }
            "assignment_expression" => {
                if let Some(left) = parent.child_by_field_name("left") {
                    if let Some(name) = innermost_identifier(left, cx) {
                        return name;
                    }
                }
                return "anonymous".to_string();
            }
            // Transparent wrappers between the function and its binding.
            "parenthesized_expression" | "await_expression" | "type_assertion"
            | "as_expression" | "satisfies_expression" | "non_null_expression" => {
                current = parent;
            }
            _ => return "anonymous".to_string(),
        }
    }
    "anonymous".to_string()
}

pub fn property_name(member: TsNode<'_>, cx: &CollectCx<'_>) -> Option<String> {
    let name = member
        .child_by_field_name("name")
        .or_else(|| member.child_by_field_name("property"))?;
    let text = cx.text(name).trim().to_string();
    if text.is_empty() { None } else { Some(text) }
}

/// Rightmost identifier of an expression (`c` for `a.b.c`, `x` for `x`).
pub fn innermost_identifier(node: TsNode<'_>, cx: &CollectCx<'_>) -> Option<String> {
    match node.kind() {
        "identifier" | "property_identifier" | "private_property_identifier"
        | "shorthand_property_identifier" => Some(cx.text(node).to_string()),
        "member_expression" => {
            let property = node.child_by_field_name("property")?;
            Some(cx.text(property).to_string())
        }
        "subscript_expression" => {
            let object = node.child_by_field_name("object")?;
            innermost_identifier(object, cx)
        }
        _ => None,
    }
}

/// Does this node sit inside a function body? Used as the boundary check
/// deciding module-level vs function-level attribution.
pub fn has_enclosing_function(node: TsNode<'_>) -> bool {
    let mut current = node;
    while let Some(parent) = current.parent() {
        if is_function_kind(parent.kind()) {
            return true;
        }
        current = parent;
    }
    false
}

pub fn is_function_kind(kind: &str) -> bool {
    matches!(
        kind,
        "function_declaration"
            | "generator_function_declaration"
            | "function_expression"
            | "function"
            | "generator_function"
            | "arrow_function"
            | "method_definition"
    )
}

/// Nearest enclosing class-body member (field or method) without crossing a
/// function boundary. A field initializer looks module-level to the naive
/// "no enclosing function" check; this is the precedence check that hands it
/// to the class collector instead.
pub fn enclosing_class_member<'t>(node: TsNode<'t>) -> Option<TsNode<'t>> {
    let mut current = node;
    while let Some(parent) = current.parent() {
        match parent.kind() {
            "field_definition" | "public_field_definition" | "method_definition" => {
                return Some(parent);
            }
            kind if is_function_kind(kind) => return None,
            _ => current = parent,
        }
    }
    None
}
