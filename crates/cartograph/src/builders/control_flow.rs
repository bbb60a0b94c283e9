#![forbid(unsafe_code)]

//! Control-flow edges: a branch to its then / else scopes, a try block to
//! its handlers, and any conditional construct to the value nodes sitting
//! inside its condition expression.

use crate::error::AnalysisError;
use crate::types::{EdgeKind, NodeKind};

use super::{BuildCx, edge};

pub fn build(cx: &mut BuildCx<'_, '_>) -> Result<(), AnalysisError> {
    for flow in &cx.records.flow {
        match flow.kind {
            NodeKind::Branch => {
                // Then / else scope records name the branch as their scope.
                for body in &cx.records.flow {
                    if body.scope_id == flow.id
                        && matches!(body.kind, NodeKind::Scope | NodeKind::Case)
                    {
                        cx.assembler.write_edge(edge(
                            &flow.id,
                            &body.id,
                            EdgeKind::HasBody,
                            body.line,
                            body.column,
                        ))?;
                    }
                }
            }
            NodeKind::TryBlock => {
                for handler in &cx.records.flow {
                    if handler.scope_id == flow.id
                        && matches!(handler.kind, NodeKind::CatchBlock | NodeKind::FinallyBlock)
                    {
                        cx.assembler.write_edge(edge(
                            &flow.id,
                            &handler.id,
                            EdgeKind::HasHandler,
                            handler.line,
                            handler.column,
                        ))?;
                    }
                }
            }
            _ => {}
        }

        if let Some((start, end)) = flow.condition_span {
            for call in &cx.records.calls {
                if call.start_byte >= start && call.start_byte < end {
                    cx.assembler.write_edge(edge(
                        &flow.id,
                        &call.id,
                        EdgeKind::HasCondition,
                        call.line,
                        call.column,
                    ))?;
                }
            }
        }
    }
    Ok(())
}
