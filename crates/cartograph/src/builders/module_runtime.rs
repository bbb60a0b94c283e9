#![forbid(unsafe_code)]

//! Module-runtime edges and late metadata.
//!
//! Imports and exports link the module to its dependencies: relative
//! specifiers point at the target file's module node (dangling until that
//! file is analyzed), bare specifiers at a shared external-module node.
//! Runtime singletons (network, console, timers, storage) are deduplicated
//! through the assembler's singleton registry: three `fetch` calls yield one
//! resource node and three Uses edges.
//!
//! This builder also runs the rejection-handling analysis and is the only
//! writer into pending function nodes, which is why it runs last.

use std::collections::HashMap;

use crate::collect::CallRecord;
use crate::error::AnalysisError;
use crate::identity::{external_module_id, resource_id};
use crate::types::{EdgeKind, Metadata, Node, NodeKind};

use super::{BuildCx, edge, import_target_id};

pub fn build(cx: &mut BuildCx<'_, '_>) -> Result<(), AnalysisError> {
    link_imports(cx)?;
    link_exports(cx)?;
    link_resources(cx)?;
    annotate_rejection_handling(cx);
    Ok(())
}

fn link_imports(cx: &mut BuildCx<'_, '_>) -> Result<(), AnalysisError> {
    for import in &cx.records.imports {
        let target = import_target_id(&import.specifier, cx.file);
        if target == external_module_id(&import.specifier) {
            cx.assembler.write_singleton(external_node(&import.specifier))?;
        }
        cx.assembler.write_edge(edge(
            &import.id,
            target,
            EdgeKind::Imports,
            import.line,
            import.column,
        ))?;
    }
    Ok(())
}

fn link_exports(cx: &mut BuildCx<'_, '_>) -> Result<(), AnalysisError> {
    for export in &cx.records.exports {
        cx.assembler.write_edge(edge(
            cx.module_id,
            &export.id,
            EdgeKind::Exports,
            export.line,
            export.column,
        ))?;
        // Re-exports also import from their source module.
        if let Some(specifier) = &export.specifier {
            let target = import_target_id(specifier, cx.file);
            if target == external_module_id(specifier) {
                cx.assembler.write_singleton(external_node(specifier))?;
            }
            cx.assembler.write_edge(edge(
                &export.id,
                target,
                EdgeKind::Imports,
                export.line,
                export.column,
            ))?;
        }
    }
    Ok(())
}

fn link_resources(cx: &mut BuildCx<'_, '_>) -> Result<(), AnalysisError> {
    for call in &cx.records.calls {
        let Some(resource) = resource_of(call) else {
            continue;
        };
        cx.assembler.write_singleton(Node {
            id: resource_id(resource),
            kind: NodeKind::Resource,
            name: resource.to_string(),
            file: String::new(),
            line: 0,
            column: 0,
            metadata: None,
        })?;
        cx.assembler.write_edge(edge(
            &call.id,
            resource_id(resource),
            EdgeKind::Uses,
            call.line,
            call.column,
        ))?;
    }
    Ok(())
}

fn external_node(specifier: &str) -> Node {
    Node {
        id: external_module_id(specifier),
        kind: NodeKind::ExternalModule,
        name: specifier.to_string(),
        file: String::new(),
        line: 0,
        column: 0,
        metadata: None,
    }
}

/// Map a call to the runtime singleton it touches, if any.
fn resource_of(call: &CallRecord) -> Option<&'static str> {
    if call.is_constructor {
        return match call.callee.as_str() {
            "XMLHttpRequest" | "WebSocket" => Some("net"),
            "Worker" => Some("worker"),
            _ => None,
        };
    }
    for (prefix, resource) in [
        ("console.", "console"),
        ("localStorage.", "storage"),
        ("sessionStorage.", "storage"),
        ("process.", "process"),
    ] {
        if call.callee_text.starts_with(prefix) {
            return Some(resource);
        }
    }
    match call.callee_text.as_str() {
        "fetch" => Some("net"),
        "setTimeout" | "setInterval" | "clearTimeout" | "clearInterval" => Some("timer"),
        _ => None,
    }
}

/// Decide, per function, whether it uses promises and whether a rejection
/// path is handled: a `.catch`, a two-argument `.then`, or an awaited call
/// inside a `try` with a catch clause. Written into the still-pending
/// function nodes before the flush.
fn annotate_rejection_handling(cx: &mut BuildCx<'_, '_>) {
    let mut by_function: HashMap<&str, Vec<&CallRecord>> = HashMap::new();
    for call in &cx.records.calls {
        if let Some(function_id) = call.enclosing_function_id.as_deref() {
            by_function.entry(function_id).or_default().push(call);
        }
    }

    for (function_id, calls) in by_function {
        let uses_promises = calls.iter().any(|c| {
            c.is_awaited
                || (c.is_member_call && matches!(c.callee.as_str(), "then" | "catch" | "finally"))
        });
        if !uses_promises {
            continue;
        }
        let handled = calls.iter().any(|c| {
            (c.is_member_call && c.callee == "catch")
                || (c.is_member_call && c.callee == "then" && c.arg_count >= 2)
                || (c.is_awaited && c.in_try_with_catch)
        });
        if let Some(node) = cx.assembler.find_pending_node(function_id) {
            let metadata = node.metadata.get_or_insert_with(Metadata::new);
            metadata.insert("uses_promises".into(), true.into());
            metadata.insert("handles_rejection".into(), handled.into());
        }
    }
}
