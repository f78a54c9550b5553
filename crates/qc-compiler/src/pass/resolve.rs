//! Column bubbling
//!
//! A column reference must name a column of a source visible from where it
//! is used. Binding can leave references to columns that sit one or more
//! selects deeper (a select pushed under the current one, say). Those are
//! rewritten to pass-through columns added to each intermediate select.

use super::{IrPass, PassState};
use crate::context::CompileContext;
use crate::error::CompileResult;
use crate::ir::{Ir, NodeId, NodeKind};

/// Rewrites out-of-scope column references
pub struct ColumnResolver;

impl IrPass for ColumnResolver {
    fn name(&self) -> &'static str {
        "resolve"
    }

    fn description(&self) -> &'static str {
        "Route column references through intermediate selects"
    }

    fn run(
        &self,
        ir: &mut Ir,
        root: NodeId,
        _cx: &CompileContext<'_>,
        _state: &mut PassState,
    ) -> CompileResult<NodeId> {
        let mut resolver = Resolver { ir };
        let mut scopes = Vec::new();
        resolver.walk(root, &mut scopes);
        Ok(root)
    }
}

/// Columns visible inside one select: its own row and its sources' rows
#[derive(Debug, Default)]
struct Frame {
    select: Option<NodeId>,
    sources: Vec<NodeId>,
}

impl Frame {
    fn sees(&self, owner: NodeId) -> bool {
        self.select == Some(owner) || self.sources.contains(&owner)
    }
}

/// A source visible from a select and whether columns may be routed
/// through it
#[derive(Debug, Clone, Copy)]
struct Source {
    node: NodeId,
    routable: bool,
}

struct Resolver<'a> {
    ir: &'a mut Ir,
}

impl Resolver<'_> {
    fn walk(&mut self, id: NodeId, scopes: &mut Vec<Frame>) {
        let pushed = match self.ir.kind(id) {
            NodeKind::Select(sel) => Some(Frame {
                select: Some(id),
                sources: self.source_nodes(sel.from),
            }),
            NodeKind::Insert { table, .. } => Some(Frame {
                select: None,
                sources: vec![*table],
            }),
            NodeKind::Update { select, .. } => {
                let from = self.ir.select(*select).and_then(|s| s.from);
                Some(Frame {
                    select: None,
                    sources: self.source_nodes(from),
                })
            }
            NodeKind::ColumnRef { column } => {
                let column = *column;
                self.resolve(id, column, scopes);
                None
            }
            _ => None,
        };
        let has_scope = pushed.is_some();
        if let Some(owners) = pushed {
            scopes.push(owners);
        }
        for kid in self.ir.children(id) {
            self.walk(kid, scopes);
        }
        if has_scope {
            scopes.pop();
        }
    }

    fn source_nodes(&self, from: Option<NodeId>) -> Vec<NodeId> {
        from.map(|f| self.sources(f).into_iter().map(|s| s.node).collect())
            .unwrap_or_default()
    }

    /// Tables and selects named directly by a FROM clause
    fn sources(&self, from: NodeId) -> Vec<Source> {
        let mut out = Vec::new();
        self.collect_sources(from, &mut out);
        out
    }

    fn collect_sources(&self, node: NodeId, out: &mut Vec<Source>) {
        match self.ir.kind(node) {
            NodeKind::Alias { node: inner } => match self.ir.kind(*inner) {
                NodeKind::Union { .. } => {
                    // union columns are named by the first leg
                    let mut leg = *inner;
                    while let NodeKind::Union { left, .. } = self.ir.kind(leg) {
                        leg = *left;
                    }
                    out.push(Source {
                        node: leg,
                        routable: false,
                    });
                }
                NodeKind::Select(_) => out.push(Source {
                    node: *inner,
                    routable: true,
                }),
                _ => out.push(Source {
                    node: *inner,
                    routable: false,
                }),
            },
            NodeKind::Join { left, right, .. } => {
                let (left, right) = (*left, *right);
                self.collect_sources(left, out);
                self.collect_sources(right, out);
            }
            NodeKind::Select(_) => out.push(Source {
                node,
                routable: true,
            }),
            _ => out.push(Source {
                node,
                routable: false,
            }),
        }
    }

    fn resolve(&mut self, reference: NodeId, column: NodeId, scopes: &[Frame]) {
        let Some(owner) = self.ir.column_owner(column) else {
            return;
        };
        if scopes.iter().any(|s| s.sees(owner)) {
            return;
        }
        // only a source's row can be read from inside a select
        let visible: Vec<NodeId> = scopes
            .iter()
            .rev()
            .flat_map(|s| s.sources.iter().copied())
            .collect();
        for candidate in visible {
            if candidate == owner || !matches!(self.ir.kind(candidate), NodeKind::Select(_)) {
                continue;
            }
            if !self.reaches(candidate, owner) {
                continue;
            }
            let exposed = self.expose(candidate, column);
            log::debug!("Routed {reference} to column {exposed} of select {candidate}");
            if let NodeKind::ColumnRef { column: c } = self.ir.kind_mut(reference) {
                *c = exposed;
            }
            return;
        }
        log::debug!("Column {column} referenced from {reference} has no visible route");
    }

    /// Owner is `select`'s own source or nested inside one
    fn reaches(&self, select: NodeId, owner: NodeId) -> bool {
        let Some(from) = self.ir.select(select).and_then(|s| s.from) else {
            return false;
        };
        self.sources(from).into_iter().any(|s| {
            s.node == owner || (s.routable && self.reaches(s.node, owner))
        })
    }

    /// A row column of `select` carrying `column`, added when missing
    fn expose(&mut self, select: NodeId, column: NodeId) -> NodeId {
        let owner = self.ir.column_owner(column);
        if owner == Some(select) {
            return column;
        }
        let Some(from) = self.ir.select(select).and_then(|s| s.from) else {
            return column;
        };
        let Some(owner) = owner else {
            return column;
        };
        let mut inner = None;
        for source in self.sources(from) {
            if source.node == owner {
                inner = Some(column);
                break;
            }
            if source.routable && self.reaches(source.node, owner) {
                inner = Some(self.expose(source.node, column));
                break;
            }
        }
        let Some(inner) = inner else {
            return column;
        };

        let row = self.ir.select(select).map(|s| s.row.clone()).unwrap_or_default();
        let existing = row.into_iter().find(|&c| {
            matches!(self.ir.kind(c), NodeKind::Column { expr: Some(e), .. }
                if self.ir.column_of(*e) == Some(inner))
        });
        if let Some(existing) = existing {
            return existing;
        }
        let name = match self.ir.kind(inner) {
            NodeKind::Column { name, .. } => name.clone(),
            _ => None,
        };
        let reference = self.ir.column_ref(inner);
        let pass_through = self.ir.column(name, reference);
        self.ir.node_mut(pass_through).provider = self.ir.node(inner).provider;
        self.ir.push_row_column(select, pass_through);
        pass_through
    }
}
