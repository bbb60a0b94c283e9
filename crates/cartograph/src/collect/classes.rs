#![forbid(unsafe_code)]

//! Class collector: class records plus their field members. Fields attach to
//! the class whose scope is current at visit time, so nested class
//! expressions inside a method body never steal an outer class's fields.

use tree_sitter::Node as TsNode;

use super::walk::{self, EnteredScope};
use super::{ClassRecord, CollectCx, Collector, CollectorKind, FieldRecord};

#[derive(Default)]
pub struct ClassCollector;

impl Collector for ClassCollector {
    fn kind(&self) -> CollectorKind {
        CollectorKind::Classes
    }

    fn visit(&mut self, node: TsNode<'_>, cx: &mut CollectCx<'_>) {
        if !matches!(node.kind(), "field_definition" | "public_field_definition") {
            return;
        }
        let Some(name) = walk::property_name(node, cx) else {
            return;
        };
        let pos = node.start_position();
        let field = FieldRecord {
            is_private: name.starts_with('#'),
            name,
            is_static: has_static_modifier(node),
            line: pos.row as i64 + 1,
            column: pos.column as i64,
        };
        let class_id = cx.tracker.current_scope_id().to_string();
        if let Some(class) = cx.out.classes.iter_mut().rev().find(|c| c.id == class_id) {
            class.fields.push(field);
        }
    }

    fn visit_scope(&mut self, node: TsNode<'_>, scope: &EnteredScope, cx: &mut CollectCx<'_>) {
        if !matches!(node.kind(), "class_declaration" | "class") {
            return;
        }
        let (superclass, implements) = heritage(node, cx);
        let pos = node.start_position();
        cx.out.classes.push(ClassRecord {
            id: scope.id.clone(),
            name: scope.name.clone(),
            scope_id: scope.parent_scope_id.clone(),
            file: cx.file.to_string(),
            line: pos.row as i64 + 1,
            column: pos.column as i64,
            superclass,
            implements,
            fields: Vec::new(),
        });
    }
}

fn has_static_modifier(node: TsNode<'_>) -> bool {
    let mut cursor = node.walk();
    node.children(&mut cursor).any(|c| c.kind() == "static")
}

/// Extract the extends expression and any implements clause. The JavaScript
/// grammar puts the expression directly under `class_heritage`; the
/// TypeScript grammar nests `extends_clause` / `implements_clause`.
fn heritage(node: TsNode<'_>, cx: &CollectCx<'_>) -> (Option<String>, Vec<String>) {
    let mut superclass = None;
    let mut implements = Vec::new();

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() != "class_heritage" {
            continue;
        }
        let mut hc = child.walk();
        for part in child.children(&mut hc) {
            match part.kind() {
                "extends_clause" => {
                    if let Some(value) = part.named_child(0) {
                        superclass = Some(cx.text(value).trim().to_string());
                    }
                }
                "implements_clause" => {
                    let mut ic = part.walk();
                    for ty in part.named_children(&mut ic) {
                        implements.push(cx.text(ty).trim().to_string());
                    }
                }
                _ if part.is_named() && superclass.is_none() => {
                    superclass = Some(cx.text(part).trim().to_string());
                }
                _ => {}
            }
        }
    }
    (superclass, implements)
}
