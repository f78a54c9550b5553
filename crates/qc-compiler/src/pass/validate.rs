//! Closed-world check before rendering
//!
//! After binding only relational and scalar SQL nodes may remain outside
//! selections. Host-side shapes (constructions, groupings, dispatches) may
//! only live in a selection, and binder-only nodes may not survive at all.

use super::{IrPass, PassState};
use crate::context::CompileContext;
use crate::error::{CompileError, CompileResult};
use crate::ir::{Ir, NodeId, NodeKind};

/// Rejects nodes the renderer cannot express
pub struct ClosedWorldValidator;

impl IrPass for ClosedWorldValidator {
    fn name(&self) -> &'static str {
        "validate"
    }

    fn description(&self) -> &'static str {
        "Reject nodes that have no SQL text form"
    }

    fn run(
        &self,
        ir: &mut Ir,
        root: NodeId,
        cx: &CompileContext<'_>,
        _state: &mut PassState,
    ) -> CompileResult<NodeId> {
        if cx.config.debug_render {
            log::debug!("Debug rendering enabled; skipping closed-world validation");
            return Ok(root);
        }
        check(ir, root, false)?;
        Ok(root)
    }
}

/// Nodes that must be gone once binding finished
fn binder_only(kind: &NodeKind) -> bool {
    matches!(
        kind,
        NodeKind::AliasRef { .. }
            | NodeKind::Member { .. }
            | NodeKind::Link { .. }
            | NodeKind::Shared { .. }
            | NodeKind::SharedRef { .. }
            | NodeKind::Simple { .. }
            | NodeKind::MethodCall { .. }
    )
}

/// Host-side shapes, legal inside a selection only
fn selection_only(kind: &NodeKind) -> bool {
    matches!(
        kind,
        NodeKind::New { .. }
            | NodeKind::Grouping { .. }
            | NodeKind::TypeCase { .. }
            | NodeKind::ClientCase { .. }
            | NodeKind::OptionalValue { .. }
    )
}

fn invalid(kind: &NodeKind) -> CompileError {
    CompileError::InvalidNodeForFormat {
        node: kind.name().to_string(),
        format: "SQL text".to_string(),
    }
}

fn check(ir: &Ir, id: NodeId, in_selection: bool) -> CompileResult<()> {
    let kind = ir.kind(id);
    if binder_only(kind) || (!in_selection && selection_only(kind)) {
        return Err(invalid(kind));
    }
    match kind {
        NodeKind::Select(sel) => {
            let selection = sel.selection;
            for kid in ir.children(id) {
                check(ir, kid, Some(kid) == selection)?;
            }
        }
        // a nested query is a statement of its own
        NodeKind::SubSelect { select, .. } => check(ir, *select, false)?,
        _ => {
            for kid in ir.children(id) {
                check(ir, kid, in_selection)?;
            }
        }
    }
    Ok(())
}
