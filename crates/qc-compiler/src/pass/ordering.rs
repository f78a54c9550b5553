//! ORDER BY cleanup
//!
//! SQL Server rejects ORDER BY in derived tables and sub-queries unless TOP
//! is also present, and an order under a set operator or an aggregate is
//! never observed. Such orders are removed here.

use std::collections::HashSet;

use super::{selects_post_order, IrPass, PassState};
use crate::context::CompileContext;
use crate::error::CompileResult;
use crate::ir::{Ir, NodeId, NodeKind, OrderingType, SubSelectKind};

/// Removes orders that cannot or need not be rendered
pub struct OrderingCleanup;

impl IrPass for OrderingCleanup {
    fn name(&self) -> &'static str {
        "ordering"
    }

    fn description(&self) -> &'static str {
        "Drop ORDER BY where it is unobservable or illegal"
    }

    fn run(
        &self,
        ir: &mut Ir,
        root: NodeId,
        _cx: &CompileContext<'_>,
        _state: &mut PassState,
    ) -> CompileResult<NodeId> {
        let nested = nested_selects(ir, root);
        for select in selects_post_order(ir, root) {
            let Some(sel) = ir.select(select) else {
                continue;
            };
            if sel.order_by.is_empty() {
                continue;
            }
            let discard = match sel.ordering {
                OrderingType::Never => {
                    log::debug!("Dropping unobservable order of select {select}");
                    true
                }
                OrderingType::Blocked if sel.top.is_none() => {
                    log::warn!(
                        "Ordering of select {select} does not survive a set operation and was discarded"
                    );
                    true
                }
                _ if sel.top.is_none() && nested.contains(&select) => {
                    log::debug!("Dropping order of nested select {select} without TOP");
                    true
                }
                _ => false,
            };
            if discard {
                if let Some(s) = ir.select_mut(select) {
                    s.order_by.clear();
                }
            }
        }
        Ok(root)
    }
}

/// Derived tables, union legs and scalar or EXISTS sub-queries
fn nested_selects(ir: &Ir, root: NodeId) -> HashSet<NodeId> {
    let mut out = HashSet::new();
    for id in ir.subtree(root) {
        match ir.kind(id) {
            NodeKind::Alias { node } => {
                out.insert(*node);
            }
            NodeKind::Union { left, right, .. } => {
                out.insert(*left);
                out.insert(*right);
            }
            NodeKind::SubSelect {
                kind: SubSelectKind::Scalar | SubSelectKind::Exists,
                select,
            } => {
                out.insert(*select);
            }
            _ => {}
        }
    }
    out.retain(|&id| ir.select(id).is_some());
    out
}
