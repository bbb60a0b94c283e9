#![forbid(unsafe_code)]

//! Domain builders: each owns one edge family and runs after collection has
//! fully completed, so every builder sees the complete entity tables. Run
//! order is fixed; the module-runtime builder goes last because it mutates
//! pending function nodes right before the flush.

pub mod call_flow;
pub mod control_flow;
pub mod data_flow;
pub mod module_runtime;
pub mod mutation;
pub mod structural;
pub mod type_system;

use std::path::Path;

use crate::assembler::GraphAssembler;
use crate::collect::{Collections, VariableRecord};
use crate::error::AnalysisError;
use crate::identity::{SCOPE_SEP, external_module_id, parse_id};
use crate::types::{Edge, EdgeKind, NodeKind};

pub struct BuildCx<'a, 's> {
    pub records: &'a Collections,
    pub file: &'a str,
    pub module_id: &'a str,
    pub assembler: &'a mut GraphAssembler<'s>,
}

pub fn run_builders(cx: &mut BuildCx<'_, '_>) -> Result<(), AnalysisError> {
    structural::build(cx)?;
    control_flow::build(cx)?;
    data_flow::build(cx)?;
    call_flow::build(cx)?;
    mutation::build(cx)?;
    type_system::build(cx)?;
    module_runtime::build(cx)?;
    Ok(())
}

pub(crate) fn edge(
    src: impl Into<String>,
    dst: impl Into<String>,
    kind: EdgeKind,
    line: i64,
    column: i64,
) -> Edge {
    Edge {
        src: src.into(),
        dst: dst.into(),
        kind,
        metadata: None,
        line: Some(line),
        column: Some(column),
    }
}

/// Resolve a name to a declared variable visible from the given scope path:
/// candidates are variables whose declaring scope is a prefix of the site's
/// path; the deepest one wins (shadowing).
pub(crate) fn resolve_variable<'r>(
    records: &'r Collections,
    name: &str,
    scope_path: &[String],
) -> Option<&'r VariableRecord> {
    let mut best: Option<(usize, &VariableRecord)> = None;
    for variable in &records.variables {
        if variable.name != name {
            continue;
        }
        let Ok(parsed) = parse_id(&variable.id) else {
            continue;
        };
        let segments: Vec<String> = parsed
            .segments
            .iter()
            .map(|(n, c)| render_segment(n, *c))
            .collect();
        if segments.len() > scope_path.len() {
            continue;
        }
        if segments.iter().zip(scope_path).all(|(a, b)| a == b)
            && best.is_none_or(|(depth, _)| segments.len() >= depth)
        {
            best = Some((segments.len(), variable));
        }
    }
    best.map(|(_, variable)| variable)
}

fn render_segment(name: &str, counter: u32) -> String {
    if counter == 0 {
        name.to_string()
    } else {
        format!("{name}#{counter}")
    }
}

/// Resolve a relative import specifier against the importing file, yielding
/// a repository-relative path. The importing file's extension fills in when
/// the specifier has none.
pub(crate) fn resolve_relative(specifier: &str, importing_file: &str) -> Option<String> {
    if !specifier.starts_with('.') {
        return None;
    }
    let base = Path::new(importing_file).parent().unwrap_or(Path::new(""));
    let mut parts: Vec<String> = base
        .components()
        .filter_map(|c| c.as_os_str().to_str().map(str::to_string))
        .collect();
    for component in specifier.split('/') {
        match component {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other.to_string()),
        }
    }
    let mut path = parts.join("/");
    if Path::new(&path).extension().is_none() {
        if let Some(ext) = Path::new(importing_file).extension().and_then(|e| e.to_str()) {
            path.push('.');
            path.push_str(ext);
        }
    }
    Some(path)
}

/// Target id for an import edge. Relative specifiers point at the resolved
/// file's module node, which may not exist yet; dangling edges are valid and
/// connect once that file is analyzed. Bare specifiers point at a shared
/// external-module node.
pub(crate) fn import_target_id(specifier: &str, importing_file: &str) -> String {
    match resolve_relative(specifier, importing_file) {
        Some(path) => {
            let stem = Path::new(&path)
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("module")
                .to_string();
            format!("{path}{SCOPE_SEP}{}:{stem}", NodeKind::Module.tag())
        }
        None => external_module_id(specifier),
    }
}
