//! Simple-select removal
//!
//! Lowering wraps every operator in a fresh select. A select over a single
//! aliased select is merged with it when the merged statement means the
//! same thing: either the inner select only projects, or the outer one
//! does. Join legs that merely rename the columns of one source are
//! replaced by that source.

use super::{selects_post_order, IrPass, PassState};
use crate::context::CompileContext;
use crate::error::CompileResult;
use crate::ir::{Ir, NodeId, NodeKind, OrderingType, SelectNode};

/// Merges nested selects into their parents
pub struct SelectFlattener;

impl IrPass for SelectFlattener {
    fn name(&self) -> &'static str {
        "flatten"
    }

    fn description(&self) -> &'static str {
        "Merge selects that add nothing over their source"
    }

    fn run(
        &self,
        ir: &mut Ir,
        root: NodeId,
        _cx: &CompileContext<'_>,
        _state: &mut PassState,
    ) -> CompileResult<NodeId> {
        // any merge detaches nodes, so restart from a fresh walk
        'restart: loop {
            for select in selects_post_order(ir, root) {
                if merge_source(ir, root, select) || flatten_legs(ir, root, select) {
                    continue 'restart;
                }
            }
            break;
        }
        Ok(root)
    }
}

/// Whether any node of `id`'s subtree matches, not looking into nested selects
fn contains(ir: &Ir, id: NodeId, pred: &impl Fn(&NodeKind) -> bool) -> bool {
    let kind = ir.kind(id);
    if pred(kind) {
        return true;
    }
    if matches!(kind, NodeKind::Select(_)) {
        return false;
    }
    ir.children(id).into_iter().any(|kid| contains(ir, kid, pred))
}

fn row_contains(ir: &Ir, sel: &SelectNode, pred: impl Fn(&NodeKind) -> bool) -> bool {
    sel.row.iter().any(|&c| contains(ir, c, &pred))
}

fn is_aggregate(kind: &NodeKind) -> bool {
    matches!(kind, NodeKind::Aggregate { .. })
}

fn is_row_number(kind: &NodeKind) -> bool {
    matches!(kind, NodeKind::RowNumber { .. })
}

fn is_sub_select(kind: &NodeKind) -> bool {
    matches!(kind, NodeKind::SubSelect { .. })
}

/// Select aliased directly by `from`, if that is all `from` is
fn aliased_select(ir: &Ir, from: NodeId) -> Option<NodeId> {
    match ir.kind(from) {
        NodeKind::Alias { node } if ir.select(*node).is_some() => Some(*node),
        _ => None,
    }
}

/// Replace every reference to a row column of `inner` by a copy of the
/// column's expression
fn inline_columns(ir: &mut Ir, root: NodeId, inner: NodeId) {
    let row = ir.select(inner).map(|s| s.row.clone()).unwrap_or_default();
    for id in ir.subtree(root) {
        let NodeKind::ColumnRef { column } = *ir.kind(id) else {
            continue;
        };
        if !row.contains(&column) {
            continue;
        }
        let NodeKind::Column { expr: Some(expr), .. } = *ir.kind(column) else {
            continue;
        };
        let copy = ir.duplicate(expr);
        let replacement = ir.node(copy).clone();
        let node = ir.node_mut(id);
        node.kind = replacement.kind;
        node.ty = replacement.ty;
        if node.provider.is_none() {
            node.provider = replacement.provider;
        }
    }
}

fn merge_source(ir: &mut Ir, root: NodeId, outer: NodeId) -> bool {
    let Some(sel) = ir.select(outer).cloned() else {
        return false;
    };
    let Some(inner) = sel.from.and_then(|f| aliased_select(ir, f)) else {
        return false;
    };
    let Some(inner_sel) = ir.select(inner).cloned() else {
        return false;
    };
    if inner_sel.do_not_output || row_contains(ir, &inner_sel, is_row_number) {
        return false;
    }

    let inner_projects = inner_sel.is_projection_only()
        && !row_contains(ir, &inner_sel, is_aggregate)
        && !(!sel.group_by.is_empty() && row_contains(ir, &inner_sel, is_sub_select));
    let outer_projects = sel.is_projection_only()
        && !row_contains(ir, &sel, is_aggregate)
        && !row_contains(ir, &sel, is_row_number)
        && !inner_sel.distinct
        && !(!inner_sel.group_by.is_empty() && row_contains(ir, &sel, is_sub_select));
    if !inner_projects && !outer_projects {
        return false;
    }

    log::debug!("Merging select {inner} into {outer}");
    inline_columns(ir, root, inner);
    // inlining rewrote the inner clauses too
    let Some(inner_sel) = ir.select(inner).cloned() else {
        return false;
    };
    let Some(s) = ir.select_mut(outer) else {
        return false;
    };
    s.from = inner_sel.from;
    if !inner_projects {
        s.where_ = inner_sel.where_;
        s.group_by = inner_sel.group_by;
        s.having = inner_sel.having;
        s.order_by = inner_sel.order_by;
        s.top = inner_sel.top;
        s.distinct = inner_sel.distinct;
        if s.ordering == OrderingType::Default {
            s.ordering = inner_sel.ordering;
        }
    }
    true
}

/// Replace pass-through join legs by their source
fn flatten_legs(ir: &mut Ir, root: NodeId, select: NodeId) -> bool {
    let Some(from) = ir.select(select).and_then(|s| s.from) else {
        return false;
    };
    if !matches!(ir.kind(from), NodeKind::Join { .. }) {
        return false;
    }
    let mut legs = Vec::new();
    collect_legs(ir, from, &mut legs);
    for leg in legs {
        let Some(inner) = aliased_select(ir, leg) else {
            continue;
        };
        let Some(inner_sel) = ir.select(inner).cloned() else {
            continue;
        };
        let Some(source) = inner_sel.from else {
            continue;
        };
        let NodeKind::Alias { node: source_node } = *ir.kind(source) else {
            continue;
        };
        let renames_only = inner_sel.is_projection_only()
            && !inner_sel.do_not_output
            && inner_sel.row.iter().all(|&c| {
                matches!(ir.kind(c), NodeKind::Column { expr: Some(e), .. }
                    if matches!(ir.kind(*e), NodeKind::ColumnRef { .. }))
            });
        if !renames_only {
            continue;
        }
        log::debug!("Replacing join leg {inner} by its source");
        inline_columns(ir, root, inner);
        ir.node_mut(leg).kind = NodeKind::Alias { node: source_node };
        return true;
    }
    false
}

fn collect_legs(ir: &Ir, node: NodeId, out: &mut Vec<NodeId>) {
    match ir.kind(node) {
        NodeKind::Join { left, right, .. } => {
            let (left, right) = (*left, *right);
            collect_legs(ir, left, out);
            collect_legs(ir, right, out);
        }
        NodeKind::Alias { .. } => out.push(node),
        _ => {}
    }
}
