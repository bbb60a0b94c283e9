#![forbid(unsafe_code)]

//! Mutation edges: the mutating function (or module) to the variable it
//! writes. The target resolves through the scope chain recorded at the
//! assignment site; writes to names with no visible declaration (globals,
//! imports) produce no edge.

use crate::error::AnalysisError;
use crate::types::{EdgeKind, Metadata};

use super::{BuildCx, edge, resolve_variable};

pub fn build(cx: &mut BuildCx<'_, '_>) -> Result<(), AnalysisError> {
    for mutation in &cx.records.mutations {
        let Some(variable) = resolve_variable(cx.records, &mutation.target_name, &mutation.scope_path)
        else {
            continue;
        };
        let src = mutation
            .enclosing_function_id
            .as_deref()
            .unwrap_or(cx.module_id);

        let mut metadata = Metadata::new();
        metadata.insert("operator".into(), mutation.operator.clone().into());
        if mutation.is_property {
            metadata.insert("property_write".into(), true.into());
        }
        let mut mutates = edge(src, &variable.id, EdgeKind::Mutates, mutation.line, mutation.column);
        mutates.metadata = Some(metadata);
        cx.assembler.write_edge(mutates)?;
    }
    Ok(())
}
