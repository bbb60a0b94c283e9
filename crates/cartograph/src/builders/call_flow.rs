#![forbid(unsafe_code)]

//! Call-flow edges. Every call site gets a Calls edge from its enclosing
//! function (or the module, at top level). Call sites additionally link to a
//! same-file callee when the name resolves unambiguously, and constructor
//! calls link to the class they instantiate. Usage-specific edges (Throws,
//! Returns, Yields) ride on top of the unconditional Contains anchor.

use std::collections::HashMap;

use crate::collect::ValueUsage;
use crate::error::AnalysisError;
use crate::types::EdgeKind;

use super::{BuildCx, edge};

pub fn build(cx: &mut BuildCx<'_, '_>) -> Result<(), AnalysisError> {
    let mut functions_by_name: HashMap<&str, Vec<&str>> = HashMap::new();
    for function in &cx.records.functions {
        functions_by_name
            .entry(function.name.as_str())
            .or_default()
            .push(function.id.as_str());
    }
    let mut classes_by_name: HashMap<&str, Vec<&str>> = HashMap::new();
    for class in &cx.records.classes {
        classes_by_name
            .entry(class.name.as_str())
            .or_default()
            .push(class.id.as_str());
    }

    for call in &cx.records.calls {
        let caller = call
            .enclosing_function_id
            .as_deref()
            .unwrap_or(cx.module_id);
        cx.assembler
            .write_edge(edge(caller, &call.id, EdgeKind::Calls, call.line, call.column))?;

        if call.is_constructor {
            if let Some([class_id]) = classes_by_name
                .get(call.callee.as_str())
                .map(Vec::as_slice)
            {
                cx.assembler.write_edge(edge(
                    &call.id,
                    *class_id,
                    EdgeKind::Instantiates,
                    call.line,
                    call.column,
                ))?;
            }
        } else if !call.is_member_call {
            // Member calls stay unresolved here: `a.b()` needs type
            // information this pipeline does not compute.
            if let Some([function_id]) = functions_by_name
                .get(call.callee.as_str())
                .map(Vec::as_slice)
            {
                cx.assembler.write_edge(edge(
                    &call.id,
                    *function_id,
                    EdgeKind::Calls,
                    call.line,
                    call.column,
                ))?;
            }
        }

        let usage_kind = match call.usage {
            ValueUsage::Thrown => Some(EdgeKind::Throws),
            ValueUsage::Returned => Some(EdgeKind::Returns),
            ValueUsage::Yielded => Some(EdgeKind::Yields),
            _ => None,
        };
        if let Some(kind) = usage_kind {
            cx.assembler
                .write_edge(edge(caller, &call.id, kind, call.line, call.column))?;
        }
    }
    Ok(())
}
