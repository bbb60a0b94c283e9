#![forbid(unsafe_code)]

//! Inheritance edges: DerivesFrom for extends clauses, Implements for
//! implements clauses. Same-file names resolve directly; imported names
//! resolve to a forward id inside the resolved module (which may not be
//! analyzed yet) or to an external module. Unresolvable bases produce no
//! edge.

use crate::collect::Collections;
use crate::error::AnalysisError;
use crate::identity::{SCOPE_SEP, external_module_id};
use crate::types::{EdgeKind, NodeKind};

use super::{BuildCx, edge, resolve_relative};

pub fn build(cx: &mut BuildCx<'_, '_>) -> Result<(), AnalysisError> {
    for class in &cx.records.classes {
        if let Some(superclass) = &class.superclass {
            let base = last_name_segment(superclass);
            if let Some(target) = type_target(cx.records, cx.file, base) {
                cx.assembler.write_edge(edge(
                    &class.id,
                    target,
                    EdgeKind::DerivesFrom,
                    class.line,
                    class.column,
                ))?;
            }
        }
        for interface in &class.implements {
            let base = last_name_segment(interface);
            if let Some(target) = type_target(cx.records, cx.file, base) {
                cx.assembler.write_edge(edge(
                    &class.id,
                    target,
                    EdgeKind::Implements,
                    class.line,
                    class.column,
                ))?;
            }
        }
    }
    Ok(())
}

/// `ns.Base` and `Base<T>` both resolve by their trailing simple name.
fn last_name_segment(raw: &str) -> &str {
    let no_generics = raw.split('<').next().unwrap_or(raw).trim();
    no_generics.rsplit('.').next().unwrap_or(no_generics)
}

fn type_target(records: &Collections, file: &str, name: &str) -> Option<String> {
    if let Some(class) = records.classes.iter().find(|c| c.name == name) {
        return Some(class.id.clone());
    }
    let import = records.imports.iter().find(|i| i.local_name == name)?;
    match resolve_relative(&import.specifier, file) {
        Some(path) => {
            // Forward id into the target module: valid even before that
            // file is analyzed, and identical to the id its own analysis
            // will produce for a top-level class of that name.
            let exported = import
                .export_name
                .as_deref()
                .filter(|n| *n != "default" && *n != "*")
                .unwrap_or(name);
            Some(format!(
                "{path}{SCOPE_SEP}{}:{exported}",
                NodeKind::Class.tag()
            ))
        }
        None => Some(external_module_id(&import.specifier)),
    }
}
