#![forbid(unsafe_code)]

//! Containment edges. Every record carries the scope id that was current
//! when it was collected; every one of them gets a Contains anchor here,
//! unconditionally. A thrown-away value, a call used as a bare statement, a
//! parameter of a nested arrow: all reachable from the module root.

use crate::error::AnalysisError;
use crate::types::EdgeKind;

use super::{BuildCx, edge};

pub fn build(cx: &mut BuildCx<'_, '_>) -> Result<(), AnalysisError> {
    let mut anchors: Vec<(&str, &str, i64, i64)> = Vec::new();

    for function in &cx.records.functions {
        anchors.push((&function.scope_id, &function.id, function.line, function.column));
        for param in &function.params {
            anchors.push((&function.id, &param.id, param.line, param.column));
        }
    }
    for class in &cx.records.classes {
        anchors.push((&class.scope_id, &class.id, class.line, class.column));
    }
    for variable in &cx.records.variables {
        anchors.push((&variable.scope_id, &variable.id, variable.line, variable.column));
    }
    for call in &cx.records.calls {
        anchors.push((&call.scope_id, &call.id, call.line, call.column));
    }
    for flow in &cx.records.flow {
        anchors.push((&flow.scope_id, &flow.id, flow.line, flow.column));
    }
    for import in &cx.records.imports {
        anchors.push((&import.scope_id, &import.id, import.line, import.column));
    }
    for export in &cx.records.exports {
        anchors.push((&export.scope_id, &export.id, export.line, export.column));
    }

    for (scope_id, id, line, column) in anchors {
        cx.assembler
            .write_edge(edge(scope_id, id, EdgeKind::Contains, line, column))?;
    }
    Ok(())
}
