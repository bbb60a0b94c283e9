#![forbid(unsafe_code)]

//! Assignment provenance: a variable to the value node its initializer
//! produced. Calls and constructor calls are matched back by the byte offset
//! of the initializer expression; identifier initializers resolve through
//! the scope chain to the variable they copy from.

use crate::collect::InitKind;
use crate::error::AnalysisError;
use crate::identity::parse_id;
use crate::types::EdgeKind;

use super::{BuildCx, edge, render_segment, resolve_variable};

pub fn build(cx: &mut BuildCx<'_, '_>) -> Result<(), AnalysisError> {
    for variable in &cx.records.variables {
        let Some(init) = &variable.init else {
            continue;
        };
        let target = match init.kind {
            InitKind::Call | InitKind::Constructor => cx
                .records
                .calls
                .iter()
                .find(|call| call.start_byte == init.start_byte)
                .map(|call| call.id.clone()),
            InitKind::Identifier => {
                let Ok(parsed) = parse_id(&variable.id) else {
                    continue;
                };
                let site_path: Vec<String> = parsed
                    .segments
                    .iter()
                    .map(|(n, c)| render_segment(n, *c))
                    .collect();
                resolve_variable(cx.records, &init.text, &site_path)
                    .filter(|source| source.id != variable.id)
                    .map(|source| source.id.clone())
            }
            InitKind::Function | InitKind::Other => None,
        };
        if let Some(target) = target {
            cx.assembler.write_edge(edge(
                &variable.id,
                target,
                EdgeKind::AssignedFrom,
                variable.line,
                variable.column,
            ))?;
        }
    }
    Ok(())
}
