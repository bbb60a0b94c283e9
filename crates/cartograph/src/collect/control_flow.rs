#![forbid(unsafe_code)]

//! Control-flow collector: one record per branch, case, loop, and try /
//! catch / finally block, plus the synthetic `then` / `else` scope records
//! under an `if`. The walker already assigned ids and sibling counters
//! (`if`, `if#1`); this collector only captures the record and the byte span
//! of the condition expression for later condition-edge matching.

use tree_sitter::Node as TsNode;

use super::walk::EnteredScope;
use super::{CollectCx, Collector, CollectorKind, FlowRecord};

#[derive(Default)]
pub struct ControlFlowCollector;

impl Collector for ControlFlowCollector {
    fn kind(&self) -> CollectorKind {
        CollectorKind::ControlFlow
    }

    // Plain statement blocks that do not form a scope need no record.
    fn visit(&mut self, _node: TsNode<'_>, _cx: &mut CollectCx<'_>) {}

    fn visit_scope(&mut self, node: TsNode<'_>, scope: &EnteredScope, cx: &mut CollectCx<'_>) {
        let pos = node.start_position();
        cx.out.flow.push(FlowRecord {
            id: scope.id.clone(),
            kind: scope.node_kind,
            name: scope.name.clone(),
            scope_id: scope.parent_scope_id.clone(),
            file: cx.file.to_string(),
            line: pos.row as i64 + 1,
            column: pos.column as i64,
            condition_span: condition_span(node),
        });
    }
}

fn condition_span(node: TsNode<'_>) -> Option<(usize, usize)> {
    let condition = match node.kind() {
        "if_statement" | "while_statement" | "do_statement" | "for_statement" => {
            node.child_by_field_name("condition")?
        }
        "for_in_statement" => node.child_by_field_name("right")?,
        "switch_statement" | "switch_case" => node.child_by_field_name("value")?,
        _ => return None,
    };
    Some((condition.start_byte(), condition.end_byte()))
}
