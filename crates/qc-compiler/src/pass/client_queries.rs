//! Client sub-queries
//!
//! A collection (or structured single row) nested in a statement's
//! selection cannot be returned by one flat result set. Each becomes a
//! child query run once per parent row; the parent values it correlates on
//! are passed as `@xN` parameters bound to columns of the parent row.

use std::collections::{HashMap, HashSet};

use super::{statement_selects, ChildQuery, IrPass, PassState};
use crate::context::CompileContext;
use crate::error::CompileResult;
use crate::ir::{Ir, NodeId, NodeKind, SubSelectKind};

/// Splits nested multisets out of top-level selections
pub struct ClientQuerySplitter;

impl IrPass for ClientQuerySplitter {
    fn name(&self) -> &'static str {
        "client_queries"
    }

    fn description(&self) -> &'static str {
        "Split nested collections into parameterized child queries"
    }

    fn run(
        &self,
        ir: &mut Ir,
        root: NodeId,
        _cx: &CompileContext<'_>,
        state: &mut PassState,
    ) -> CompileResult<NodeId> {
        let next = state.children.iter().map(|c| c.parameters.len()).sum();
        let mut splitter = Splitter { ir, state, next };
        for select in statement_selects(splitter.ir, root) {
            splitter.split(select);
        }
        Ok(root)
    }
}

struct Splitter<'a> {
    ir: &'a mut Ir,
    state: &'a mut PassState,
    next: usize,
}

impl Splitter<'_> {
    fn split(&mut self, parent: NodeId) {
        let Some(selection) = self.ir.select(parent).and_then(|s| s.selection) else {
            return;
        };
        let mut nested = Vec::new();
        self.find_nested(selection, &mut nested);
        for (node, select) in nested {
            let parameters = self.parameterize(parent, select);
            log::debug!(
                "Child query {select} of {parent} takes {} parameter(s)",
                parameters.len()
            );
            self.state.children.push(ChildQuery {
                parent,
                node,
                select,
                parameters,
            });
            self.split(select);
        }
    }

    /// Multiset and element nodes of a selection, not looking inside them
    fn find_nested(&self, id: NodeId, out: &mut Vec<(NodeId, NodeId)>) {
        match self.ir.kind(id) {
            NodeKind::SubSelect {
                kind: SubSelectKind::Multiset | SubSelectKind::Element,
                select,
            } => out.push((id, *select)),
            NodeKind::ColumnRef { .. } => {}
            _ => {
                for kid in self.ir.children(id) {
                    self.find_nested(kid, out);
                }
            }
        }
    }

    /// Replace references to parent columns inside `child` by parameters
    fn parameterize(&mut self, parent: NodeId, child: NodeId) -> Vec<(String, NodeId)> {
        let subtree = self.ir.subtree(child);
        let inside: HashSet<NodeId> = subtree.iter().copied().collect();
        let mut names: HashMap<NodeId, String> = HashMap::new();
        let mut parameters = Vec::new();
        for id in subtree {
            let NodeKind::ColumnRef { column } = *self.ir.kind(id) else {
                continue;
            };
            let Some(owner) = self.ir.column_owner(column) else {
                continue;
            };
            if inside.contains(&owner) {
                continue;
            }
            let source = self.parent_column(parent, column);
            let name = match names.get(&source) {
                Some(name) => name.clone(),
                None => {
                    let name = format!("@x{}", self.next);
                    self.next += 1;
                    names.insert(source, name.clone());
                    parameters.push((name.clone(), source));
                    name
                }
            };
            self.ir.node_mut(id).kind = NodeKind::Parameter {
                name,
                value: None,
                outer: Some(source),
            };
        }
        parameters
    }

    /// Row column of the parent carrying `column`
    fn parent_column(&mut self, parent: NodeId, column: NodeId) -> NodeId {
        if self.ir.column_owner(column) == Some(parent) {
            return column;
        }
        let row = self.ir.select(parent).map(|s| s.row.clone()).unwrap_or_default();
        let existing = row.into_iter().find(|&c| {
            matches!(self.ir.kind(c), NodeKind::Column { expr: Some(e), .. }
                if self.ir.column_of(*e) == Some(column))
        });
        if let Some(existing) = existing {
            return existing;
        }
        let name = match self.ir.kind(column) {
            NodeKind::Column { name, .. } => name.clone(),
            _ => None,
        };
        let reference = self.ir.column_ref(column);
        let carried = self.ir.column(name, reference);
        self.ir.node_mut(carried).provider = self.ir.node(column).provider;
        self.ir.push_row_column(parent, carried);
        carried
    }
}
