#![forbid(unsafe_code)]

//! Call collector: call sites and constructor calls, each with the usage of
//! its value at the site. Every call gets a record with the current scope id
//! regardless of usage; a thrown or discarded value is still anchored in the
//! graph, it just carries a different usage-specific edge later.

use tree_sitter::Node as TsNode;

use crate::identity::semantic_id;
use crate::types::NodeKind;

use super::walk;
use super::{CallRecord, CollectCx, Collector, CollectorKind, ValueUsage};

#[derive(Default)]
pub struct CallCollector;

impl Collector for CallCollector {
    fn kind(&self) -> CollectorKind {
        CollectorKind::Calls
    }

    fn visit(&mut self, node: TsNode<'_>, cx: &mut CollectCx<'_>) {
        let is_constructor = node.kind() == "new_expression";
        let callee_field = if is_constructor { "constructor" } else { "function" };
        let Some(callee_node) = node.child_by_field_name(callee_field) else {
            return;
        };

        let callee_text = cx.text(callee_node).trim().to_string();
        let callee = if callee_node.kind() == "import" {
            "import".to_string()
        } else {
            walk::innermost_identifier(callee_node, cx).unwrap_or_else(|| "dynamic".to_string())
        };

        let kind = if is_constructor {
            NodeKind::ConstructorCall
        } else {
            NodeKind::CallSite
        };
        let counter = cx.tracker.bump_counter(kind.tag(), &callee);
        let id = match semantic_id(cx.file, cx.tracker.path(), kind, &callee, counter) {
            Ok(id) => id,
            Err(err) => {
                cx.diagnostic(node, "identity", err.to_string());
                return;
            }
        };

        let (usage, is_awaited) = classify_usage(node);
        let pos = node.start_position();
        cx.out.calls.push(CallRecord {
            id,
            callee,
            callee_text,
            is_constructor,
            scope_id: cx.tracker.current_scope_id().to_string(),
            enclosing_function_id: cx.tracker.current_function_id().map(str::to_string),
            file: cx.file.to_string(),
            line: pos.row as i64 + 1,
            column: pos.column as i64,
            start_byte: node.start_byte(),
            usage,
            is_awaited,
            is_member_call: callee_node.kind() == "member_expression",
            in_try_with_catch: in_try_with_catch(node),
            arg_count: node
                .child_by_field_name("arguments")
                .map(|args| args.named_child_count())
                .unwrap_or(0),
        });
    }
}

/// Classify how the call's value is used, climbing through wrappers that do
/// not change the usage (`await`, parentheses, operators). An `await` seen on
/// the way up also marks the call as awaited.
fn classify_usage(node: TsNode<'_>) -> (ValueUsage, bool) {
    let mut awaited = false;
    let mut current = node;
    while let Some(parent) = current.parent() {
        match parent.kind() {
            "variable_declarator" | "assignment_expression"
            | "augmented_assignment_expression" | "pair" | "field_definition"
            | "public_field_definition" => return (ValueUsage::Assigned, awaited),
            "throw_statement" => return (ValueUsage::Thrown, awaited),
            "return_statement" => return (ValueUsage::Returned, awaited),
            "yield_expression" => return (ValueUsage::Yielded, awaited),
            "arguments" => return (ValueUsage::Argument, awaited),
            "member_expression" | "subscript_expression" => {
                return (ValueUsage::Chained, awaited);
            }
            "expression_statement" => return (ValueUsage::Statement, awaited),
            "await_expression" => {
                awaited = true;
                current = parent;
            }
            "parenthesized_expression" | "binary_expression" | "unary_expression"
            | "ternary_expression" | "sequence_expression" | "template_substitution"
            | "as_expression" | "satisfies_expression" | "non_null_expression"
            | "type_assertion" | "spread_element" | "array" => current = parent,
            _ => return (ValueUsage::Statement, awaited),
        }
    }
    (ValueUsage::Statement, awaited)
}

/// Is this call protected by a `try` with a catch clause, without a function
/// boundary in between? A `try { await f() } finally {}` does not count.
fn in_try_with_catch(node: TsNode<'_>) -> bool {
    let mut current = node;
    while let Some(parent) = current.parent() {
        if walk::is_function_kind(parent.kind()) {
            return false;
        }
        if parent.kind() == "try_statement"
            && parent.child_by_field_name("handler").is_some()
            && parent
                .child_by_field_name("body")
                .is_some_and(|body| within(current, body))
        {
            return true;
        }
        current = parent;
    }
    false
}

fn within(node: TsNode<'_>, ancestor: TsNode<'_>) -> bool {
    node.start_byte() >= ancestor.start_byte() && node.end_byte() <= ancestor.end_byte()
}
