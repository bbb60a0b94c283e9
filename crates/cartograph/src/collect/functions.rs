#![forbid(unsafe_code)]

//! Function collector: one record per function-like construct, with its
//! parameter list. The shared walker already named the function (declared
//! name, binding name, or class-member name) and entered its scope, so
//! parameter ids are computed inside the function's own path.

use tree_sitter::Node as TsNode;

use crate::identity::semantic_id;
use crate::types::NodeKind;

use super::walk::EnteredScope;
use super::{CollectCx, Collector, CollectorKind, FunctionRecord, ParamRecord};

#[derive(Default)]
pub struct FunctionCollector;

impl Collector for FunctionCollector {
    fn kind(&self) -> CollectorKind {
        CollectorKind::Functions
    }

    fn visit(&mut self, _node: TsNode<'_>, _cx: &mut CollectCx<'_>) {}

    fn visit_scope(&mut self, node: TsNode<'_>, scope: &EnteredScope, cx: &mut CollectCx<'_>) {
        let pos = node.start_position();
        let params = collect_params(node, cx);
        cx.out.functions.push(FunctionRecord {
            id: scope.id.clone(),
            name: scope.name.clone(),
            scope_id: scope.parent_scope_id.clone(),
            file: cx.file.to_string(),
            line: pos.row as i64 + 1,
            column: pos.column as i64,
            is_async: is_async(node),
            is_generator: is_generator(node),
            is_arrow: node.kind() == "arrow_function",
            is_method: node.kind() == "method_definition",
            params,
        });
    }
}

fn is_async(node: TsNode<'_>) -> bool {
    let mut cursor = node.walk();
    node.children(&mut cursor).any(|c| c.kind() == "async")
}

fn is_generator(node: TsNode<'_>) -> bool {
    if node.kind().contains("generator") {
        return true;
    }
    // Generator methods carry a bare `*` token before the name.
    let mut cursor = node.walk();
    node.children(&mut cursor).any(|c| c.kind() == "*")
}

/// Collect parameter records. Destructuring patterns contribute one record
/// per bound identifier, all sharing the positional index of the pattern.
fn collect_params(node: TsNode<'_>, cx: &mut CollectCx<'_>) -> Vec<ParamRecord> {
    let mut params = Vec::new();

    // Arrow functions with a single bare identifier use the `parameter`
    // field instead of a `formal_parameters` list.
    if let Some(single) = node.child_by_field_name("parameter") {
        push_param(single, single, 0, &mut params, cx);
        return params;
    }

    let Some(list) = node.child_by_field_name("parameters") else {
        return params;
    };
    let mut cursor = list.walk();
    for (index, param) in list.named_children(&mut cursor).enumerate() {
        push_param(param, param, index, &mut params, cx);
    }
    params
}

fn push_param(
    root: TsNode<'_>,
    node: TsNode<'_>,
    index: usize,
    params: &mut Vec<ParamRecord>,
    cx: &mut CollectCx<'_>,
) {
    match node.kind() {
        "identifier" | "shorthand_property_identifier_pattern" => {
            let name = cx.text(node).to_string();
            let type_annotation = param_type(root, cx);
            let pos = node.start_position();
            match semantic_id(cx.file, cx.tracker.path(), NodeKind::Parameter, &name, 0) {
                Ok(id) => params.push(ParamRecord {
                    id,
                    name,
                    index,
                    type_annotation,
                    line: pos.row as i64 + 1,
                    column: pos.column as i64,
                }),
                Err(err) => cx.diagnostic(node, "identity", err.to_string()),
            }
        }
        // TypeScript wraps each parameter; the binding sits in `pattern`.
        "required_parameter" | "optional_parameter" => {
            if let Some(pattern) = node.child_by_field_name("pattern") {
                push_param(node, pattern, index, params, cx);
            }
        }
        "assignment_pattern" | "object_assignment_pattern" => {
            if let Some(left) = node.child_by_field_name("left") {
                push_param(root, left, index, params, cx);
            }
        }
        "pair_pattern" => {
            if let Some(value) = node.child_by_field_name("value") {
                push_param(root, value, index, params, cx);
            }
        }
        "rest_pattern" | "object_pattern" | "array_pattern" => {
            let mut cursor = node.walk();
            for child in node.named_children(&mut cursor) {
                push_param(root, child, index, params, cx);
            }
        }
        // `this` parameters and type-only constructs bind nothing.
        _ => {}
    }
}

fn param_type(node: TsNode<'_>, cx: &CollectCx<'_>) -> Option<String> {
    let annotation = node.child_by_field_name("type")?;
    let text = cx.text(annotation).trim_start_matches(':').trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}
