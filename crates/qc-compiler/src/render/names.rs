//! Generated alias and column names
//!
//! Aliases are named `A0`, `A1`, ... and unnamed columns `C0`, `C1`, ... in
//! the order a pre-order walk of the statement meets them. The table lives
//! for one render call.

use std::collections::{HashMap, HashSet};

use crate::ir::{Ir, NodeId, NodeKind, UnaryOp};

#[derive(Debug, Default)]
pub(crate) struct NameTable {
    aliases: HashMap<NodeId, String>,
    columns: HashMap<NodeId, String>,
    next_alias: usize,
    next_column: usize,
}

impl NameTable {
    /// Names for every alias and select column under `root`
    pub(crate) fn assign(ir: &Ir, root: NodeId) -> Self {
        let mut names = Self::default();
        names.extend(ir, root);
        names
    }

    /// Add names for a subtree not seen yet
    pub(crate) fn extend(&mut self, ir: &Ir, root: NodeId) {
        for id in ir.subtree(root) {
            match ir.kind(id) {
                NodeKind::Alias { .. } => {
                    self.alias(id);
                }
                NodeKind::Select(sel) => {
                    let row = sel.row.clone();
                    self.name_row(ir, &row);
                }
                _ => {}
            }
        }
    }

    pub(crate) fn alias(&mut self, alias: NodeId) -> String {
        if let Some(name) = self.aliases.get(&alias) {
            return name.clone();
        }
        let name = format!("A{}", self.next_alias);
        self.next_alias += 1;
        self.aliases.insert(alias, name.clone());
        name
    }

    /// Name of a column: stored, inferred from what it reads, or generated
    pub(crate) fn column(&mut self, ir: &Ir, column: NodeId) -> String {
        if let Some(name) = self.columns.get(&column) {
            return name.clone();
        }
        let name = inferred_name(ir, column).unwrap_or_else(|| self.generated());
        self.columns.insert(column, name.clone());
        name
    }

    fn generated(&mut self) -> String {
        let name = format!("C{}", self.next_column);
        self.next_column += 1;
        name
    }

    /// Names for one select row, unique within it
    fn name_row(&mut self, ir: &Ir, row: &[NodeId]) {
        let mut taken: HashSet<String> = HashSet::new();
        for &column in row {
            if let Some(name) = self.columns.get(&column) {
                taken.insert(name.to_ascii_lowercase());
                continue;
            }
            let mut name = inferred_name(ir, column).unwrap_or_else(|| self.generated());
            while taken.contains(&name.to_ascii_lowercase()) {
                name = self.generated();
            }
            taken.insert(name.to_ascii_lowercase());
            self.columns.insert(column, name);
        }
    }
}

/// Stored name, else the name of the column a pass-through reads
pub(crate) fn inferred_name(ir: &Ir, column: NodeId) -> Option<String> {
    match ir.kind(column) {
        NodeKind::Column { name: Some(name), .. } => Some(name.clone()),
        NodeKind::Column { expr: Some(expr), .. } => match ir.kind(read_through(ir, *expr)) {
            NodeKind::ColumnRef { column: inner } => inferred_name(ir, *inner),
            _ => None,
        },
        _ => None,
    }
}

/// Skip wrappers that pass their operand's value through unchanged
fn read_through(ir: &Ir, mut expr: NodeId) -> NodeId {
    while let NodeKind::Unary {
        op: UnaryOp::OuterJoinedValue | UnaryOp::Treat,
        operand,
    } = ir.kind(expr)
    {
        expr = *operand;
    }
    expr
}
