#![forbid(unsafe_code)]

//! Variable collector: declarations (with a classified initializer
//! reference) and mutation sites. Assignments record the target name and the
//! scope path at the site; resolution to a declared variable happens later,
//! in the mutation builder, against the committed variable ids.

use tree_sitter::Node as TsNode;

use crate::identity::semantic_id;
use crate::types::NodeKind;

use super::walk;
use super::{
    CollectCx, Collector, CollectorKind, InitKind, InitRef, MutationRecord, VariableRecord,
};

#[derive(Default)]
pub struct VariableCollector;

impl Collector for VariableCollector {
    fn kind(&self) -> CollectorKind {
        CollectorKind::Variables
    }

    fn visit(&mut self, node: TsNode<'_>, cx: &mut CollectCx<'_>) {
        match node.kind() {
            "variable_declarator" => self.declaration(node, cx),
            "assignment_expression" | "augmented_assignment_expression" => {
                self.mutation(node, cx);
            }
            "update_expression" => self.update(node, cx),
            "for_in_statement" => self.loop_binding(node, cx),
            "catch_clause" => self.catch_binding(node, cx),
            _ => {}
        }
    }
}

impl VariableCollector {
    fn declaration(&mut self, node: TsNode<'_>, cx: &mut CollectCx<'_>) {
        let Some(pattern) = node.child_by_field_name("name") else {
            return;
        };
        let init = node.child_by_field_name("value").map(|value| {
            // Peel `await` and parentheses so the byte offset matches the
            // record the inner expression produced.
            let value = unwrap_init(value);
            InitRef {
                start_byte: value.start_byte(),
                kind: classify_init(value),
                text: cx.text(value).chars().take(120).collect(),
            }
        });
        let type_annotation = node
            .child_by_field_name("type")
            .map(|t| cx.text(t).trim_start_matches(':').trim().to_string())
            .filter(|t| !t.is_empty());
        let is_const = is_const_declaration(node, cx);

        // Function and class initializers already produce their own records
        // under this binding's name; a variable record on top would
        // double-count the construct.
        if matches!(&init, Some(init) if init.kind == InitKind::Function) {
            return;
        }

        self.declare_bindings(pattern, cx, is_const, type_annotation, init);
    }

    // `for (const k in obj)` and `for (const x of items)` bind their loop
    // variable without a declarator node. A bare `for (k in obj)` writes an
    // existing binding and declares nothing.
    fn loop_binding(&mut self, node: TsNode<'_>, cx: &mut CollectCx<'_>) {
        let mut cursor = node.walk();
        let Some(keyword) = node
            .children(&mut cursor)
            .find(|c| matches!(c.kind(), "const" | "let" | "var"))
        else {
            return;
        };
        let Some(left) = node.child_by_field_name("left") else {
            return;
        };
        let is_const = keyword.kind() == "const";
        self.declare_bindings(left, cx, is_const, None, None);
    }

    // `catch (err)` binds the caught value for the handler's scope.
    fn catch_binding(&mut self, node: TsNode<'_>, cx: &mut CollectCx<'_>) {
        let Some(parameter) = node.child_by_field_name("parameter") else {
            return;
        };
        self.declare_bindings(parameter, cx, false, None, None);
    }

    fn declare_bindings(
        &mut self,
        pattern: TsNode<'_>,
        cx: &mut CollectCx<'_>,
        is_const: bool,
        type_annotation: Option<String>,
        init: Option<InitRef>,
    ) {
        let mut bindings = Vec::new();
        binding_identifiers(pattern, cx, &mut bindings);
        for (name, name_node) in bindings {
            let counter = cx.tracker.bump_counter(NodeKind::Variable.tag(), &name);
            let pos = name_node.start_position();
            match semantic_id(cx.file, cx.tracker.path(), NodeKind::Variable, &name, counter) {
                Ok(id) => cx.out.variables.push(VariableRecord {
                    id,
                    name,
                    scope_id: cx.tracker.current_scope_id().to_string(),
                    file: cx.file.to_string(),
                    line: pos.row as i64 + 1,
                    column: pos.column as i64,
                    is_const,
                    type_annotation: type_annotation.clone(),
                    init: init.clone(),
                }),
                Err(err) => cx.diagnostic(name_node, "identity", err.to_string()),
            }
        }
    }

    fn mutation(&mut self, node: TsNode<'_>, cx: &mut CollectCx<'_>) {
        let Some(left) = node.child_by_field_name("left") else {
            return;
        };
        let Some((target_name, is_property)) = assignment_base(left, cx) else {
            return;
        };
        let operator = node
            .child_by_field_name("operator")
            .map(|op| cx.text(op).to_string())
            .unwrap_or_else(|| "=".to_string());
        let pos = node.start_position();
        cx.out.mutations.push(MutationRecord {
            target_name,
            scope_path: cx.tracker.path().iter().map(|s| s.render()).collect(),
            enclosing_function_id: cx.tracker.current_function_id().map(str::to_string),
            operator,
            is_property,
            line: pos.row as i64 + 1,
            column: pos.column as i64,
        });
    }

    // `i++` and `--n` mutate their operand just like an assignment does.
    fn update(&mut self, node: TsNode<'_>, cx: &mut CollectCx<'_>) {
        let Some(argument) = node.child_by_field_name("argument") else {
            return;
        };
        let Some((target_name, is_property)) = assignment_base(argument, cx) else {
            return;
        };
        let operator = node
            .child_by_field_name("operator")
            .map(|op| cx.text(op).to_string())
            .unwrap_or_else(|| "++".to_string());
        let pos = node.start_position();
        cx.out.mutations.push(MutationRecord {
            target_name,
            scope_path: cx.tracker.path().iter().map(|s| s.render()).collect(),
            enclosing_function_id: cx.tracker.current_function_id().map(str::to_string),
            operator,
            is_property,
            line: pos.row as i64 + 1,
            column: pos.column as i64,
        });
    }
}

fn unwrap_init(value: TsNode<'_>) -> TsNode<'_> {
    let mut current = value;
    while matches!(
        current.kind(),
        "await_expression" | "parenthesized_expression" | "as_expression" | "non_null_expression"
    ) {
        match current.named_child(0) {
            Some(inner) => current = inner,
            None => break,
        }
    }
    current
}

fn classify_init(value: TsNode<'_>) -> InitKind {
    match value.kind() {
        "call_expression" => InitKind::Call,
        "new_expression" => InitKind::Constructor,
        "identifier" => InitKind::Identifier,
        kind if walk::is_function_kind(kind) || kind == "class" => InitKind::Function,
        _ => InitKind::Other,
    }
}

fn is_const_declaration(declarator: TsNode<'_>, cx: &CollectCx<'_>) -> bool {
    declarator
        .parent()
        .filter(|p| p.kind() == "lexical_declaration")
        .and_then(|p| p.child(0))
        .is_some_and(|kw| cx.text(kw) == "const")
}

/// All identifiers bound by a declaration pattern, in source order.
fn binding_identifiers<'t>(
    pattern: TsNode<'t>,
    cx: &CollectCx<'_>,
    out: &mut Vec<(String, TsNode<'t>)>,
) {
    match pattern.kind() {
        "identifier" | "shorthand_property_identifier_pattern" => {
            out.push((cx.text(pattern).to_string(), pattern));
        }
        "pair_pattern" => {
            if let Some(value) = pattern.child_by_field_name("value") {
                binding_identifiers(value, cx, out);
            }
        }
        "object_assignment_pattern" | "assignment_pattern" => {
            if let Some(left) = pattern.child_by_field_name("left") {
                binding_identifiers(left, cx, out);
            }
        }
        "object_pattern" | "array_pattern" | "rest_pattern" => {
            let mut cursor = pattern.walk();
            for child in pattern.named_children(&mut cursor) {
                binding_identifiers(child, cx, out);
            }
        }
        _ => {}
    }
}

/// Base identifier of an assignment target, with whether the write goes
/// through a property access. `count = 1` rebinds `count`; `state.count = 1`
/// mutates `state`.
fn assignment_base(node: TsNode<'_>, cx: &CollectCx<'_>) -> Option<(String, bool)> {
    match node.kind() {
        "identifier" => Some((cx.text(node).to_string(), false)),
        "member_expression" | "subscript_expression" => {
            let object = node.child_by_field_name("object")?;
            let (name, _) = assignment_base(object, cx)?;
            Some((name, true))
        }
        "parenthesized_expression" | "non_null_expression" | "as_expression" => {
            assignment_base(node.named_child(0)?, cx)
        }
        _ => None,
    }
}
