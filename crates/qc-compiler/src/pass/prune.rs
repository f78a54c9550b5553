//! Unused column removal for derived tables and statement selects

use std::collections::HashSet;

use super::{statement_selects, IrPass, PassState};
use crate::context::CompileContext;
use crate::error::CompileResult;
use crate::ir::{Ir, NodeId, NodeKind};

/// Drops row columns nobody reads
pub struct UnusedColumnPruner;

impl IrPass for UnusedColumnPruner {
    fn name(&self) -> &'static str {
        "prune"
    }

    fn description(&self) -> &'static str {
        "Remove select columns that are never referenced"
    }

    fn run(
        &self,
        ir: &mut Ir,
        root: NodeId,
        _cx: &CompileContext<'_>,
        _state: &mut PassState,
    ) -> CompileResult<NodeId> {
        // removing a column can orphan the columns it read
        while prune_once(ir, root) {}
        Ok(root)
    }
}

/// Selects standing as derived tables: aliased directly and not distinct
fn derived_tables(ir: &Ir, root: NodeId) -> Vec<NodeId> {
    ir.subtree(root)
        .into_iter()
        .filter_map(|id| ir.alias_node(id))
        .filter(|&node| {
            ir.select(node)
                .is_some_and(|s| !s.distinct && !s.do_not_output)
        })
        .collect()
}

fn prune_once(ir: &mut Ir, root: NodeId) -> bool {
    let derived = derived_tables(ir, root);

    // a derived table's own selection never reaches the output
    let mut dead: HashSet<NodeId> = HashSet::new();
    for &select in &derived {
        if let Some(selection) = ir.select(select).and_then(|s| s.selection) {
            dead.extend(ir.subtree(selection));
        }
    }

    let mut used: HashSet<NodeId> = HashSet::new();
    for id in ir.subtree(root) {
        if dead.contains(&id) {
            continue;
        }
        match ir.kind(id) {
            NodeKind::ColumnRef { column } => {
                used.insert(*column);
            }
            NodeKind::Parameter {
                outer: Some(column),
                ..
            } => {
                used.insert(*column);
            }
            NodeKind::Insert {
                output_key: Some(column),
                ..
            } => {
                used.insert(*column);
            }
            _ => {}
        }
    }

    // a statement's columns are read through its selection
    let statements = statement_selects(ir, root)
        .into_iter()
        .filter(|&s| ir.select(s).is_some_and(|s| !s.distinct && s.selection.is_some()))
        .collect::<Vec<_>>();

    let mut changed = false;
    for select in derived.into_iter().chain(statements) {
        let Some(row) = ir.select(select).map(|s| s.row.clone()) else {
            continue;
        };
        let mut kept: Vec<NodeId> = row.iter().copied().filter(|c| used.contains(c)).collect();
        if kept.is_empty() {
            // a derived table needs at least one column
            kept.extend(row.first().copied());
        }
        if kept.len() == row.len() {
            continue;
        }
        log::debug!(
            "Pruned {} unused column(s) from select {select}",
            row.len() - kept.len()
        );
        if let Some(s) = ir.select_mut(select) {
            s.row = kept;
        }
        changed = true;
    }
    changed
}
