//! IR binder
//!
//! Resolves everything lowering left symbolic. Alias references expand to
//! the projections they name, member accesses become columns, links become
//! joins or nested selects, and structural comparisons expand over identity
//! members. Each select's selection is finally split into row columns.
//!
//! Binding an already bound tree changes nothing.

pub(crate) mod columnize;
pub(crate) mod equals;
pub(crate) mod expand;
pub(crate) mod link;
pub(crate) mod member;
pub(crate) mod simplify;

use crate::context::CompileContext;
use crate::error::{CompileError, CompileResult};
use crate::ir::{Ir, LinkKey, NodeId, NodeKind, OrderExpr, SelectNode, SubSelectKind, UnaryOp};
use qc_core::{CoreError, MetaModel, MetaType, TypeName, ValueType};
use std::collections::HashMap;

/// Bind the tree rooted at `root`, returning the (possibly replaced) root
pub fn bind(ir: &mut Ir, cx: &CompileContext<'_>, root: NodeId) -> CompileResult<NodeId> {
    let mut binder = Binder::new(ir, cx);
    let root = binder.visit(root, Scope::root())?;
    log::debug!("Bound tree now spans {} IR nodes", binder.ir.len());
    Ok(root)
}

/// Position of the node being bound
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Scope {
    /// Select whose clauses are being bound
    pub(crate) select: Option<NodeId>,
    /// Links may be joined into the select's FROM
    pub(crate) can_join: bool,
}

impl Scope {
    pub(crate) fn root() -> Self {
        Self {
            select: None,
            can_join: false,
        }
    }

    pub(crate) fn clause(select: NodeId) -> Self {
        Self {
            select: Some(select),
            can_join: true,
        }
    }

    /// Same select, but nothing may be joined in
    pub(crate) fn no_join(self) -> Self {
        Self {
            can_join: false,
            ..self
        }
    }
}

/// Links resolved while binding one select
#[derive(Debug, Default)]
struct LinkFrame {
    /// Links of the enclosing frame are visible
    inherit: bool,
    resolved: HashMap<LinkKey, NodeId>,
}

/// Binding state for one compilation
pub(crate) struct Binder<'a, 'c> {
    pub(crate) ir: &'a mut Ir,
    pub(crate) cx: &'a CompileContext<'c>,
    links: Vec<LinkFrame>,
    /// Bound form of each shared expression
    shared: HashMap<NodeId, NodeId>,
    /// Row column a shared expression was projected into
    shared_columns: HashMap<NodeId, NodeId>,
    /// Alias naming each bound source
    pub(crate) alias_of: HashMap<NodeId, NodeId>,
}

impl<'a, 'c> Binder<'a, 'c> {
    pub(crate) fn new(ir: &'a mut Ir, cx: &'a CompileContext<'c>) -> Self {
        Self {
            ir,
            cx,
            links: Vec::new(),
            shared: HashMap::new(),
            shared_columns: HashMap::new(),
            alias_of: HashMap::new(),
        }
    }

    /// Bind one node, returning its replacement
    pub(crate) fn visit(&mut self, id: NodeId, scope: Scope) -> CompileResult<NodeId> {
        let prev = self.ir.set_origin(self.ir.node(id).origin.clone());
        let result = self.visit_inner(id, scope);
        self.ir.set_origin(prev);
        result
    }

    fn visit_inner(&mut self, id: NodeId, scope: Scope) -> CompileResult<NodeId> {
        match self.ir.kind(id).clone() {
            NodeKind::Select(_) => self.bind_select(id, false),
            NodeKind::Alias { node } => self.bind_alias(id, node, scope),
            NodeKind::Join {
                left,
                right,
                condition,
                ..
            } => {
                let left = self.visit(left, scope.no_join())?;
                let right = self.visit(right, scope.no_join())?;
                let condition = match condition {
                    Some(c) => Some(self.visit(c, scope.no_join())?),
                    None => None,
                };
                if let NodeKind::Join {
                    left: l,
                    right: r,
                    condition: c,
                    ..
                } = self.ir.kind_mut(id)
                {
                    *l = left;
                    *r = right;
                    *c = condition;
                }
                Ok(id)
            }
            NodeKind::Union { left, right, .. } => {
                let left = self.visit(left, scope.no_join())?;
                let right = self.visit(right, scope.no_join())?;
                self.align_union(left, right)?;
                Ok(id)
            }
            NodeKind::Table { .. } | NodeKind::ColumnRef { .. } => Ok(id),
            NodeKind::AliasRef { alias } => self.expand_alias_ref(alias),
            NodeKind::Member { target, member } => {
                let ty = self.ir.ty(id).clone();
                self.bind_member(target, &member, &ty, scope)
            }
            NodeKind::Link { .. } => self.resolve_link(id, scope),
            NodeKind::Binary { op, left, right } => {
                let left = self.visit(left, scope)?;
                let right = self.visit(right, scope)?;
                self.bind_binary(id, op, left, right)
            }
            NodeKind::Unary { op, operand } => {
                let operand = self.visit(operand, scope)?;
                self.bind_unary(id, op, operand)
            }
            NodeKind::Shared { expr } => self.bind_shared(id, expr, scope),
            NodeKind::SharedRef { shared } => self.bind_shared_ref(shared, scope),
            NodeKind::Simple { expr } => {
                let expr = self.visit(expr, scope)?;
                self.push_down(expr, scope)
            }
            NodeKind::SubSelect { kind, select } => self.bind_sub_select(id, kind, select),
            NodeKind::SearchedCase { .. } => {
                self.bind_children(id, scope)?;
                self.simplify_case(id)
            }
            NodeKind::Update {
                select,
                assignments,
            } => {
                let select = self.visit(select, scope)?;
                let inner = Scope::clause(select).no_join();
                for assignment in &assignments {
                    self.visit(*assignment, inner)?;
                }
                if let NodeKind::Update { select: s, .. } = self.ir.kind_mut(id) {
                    *s = select;
                }
                Ok(id)
            }
            _ => {
                self.bind_children(id, scope)?;
                Ok(id)
            }
        }
    }

    /// Bind every owned child in place
    pub(crate) fn bind_children(&mut self, id: NodeId, scope: Scope) -> CompileResult<()> {
        let kids = self.ir.children(id);
        let mut mapped = Vec::with_capacity(kids.len());
        for kid in kids {
            mapped.push(self.visit(kid, scope)?);
        }
        let mut kind = self.ir.kind(id).clone();
        for (slot, new) in kind.children_mut().into_iter().zip(mapped) {
            *slot = new;
        }
        self.ir.node_mut(id).kind = kind;
        Ok(())
    }

    /// Bind a select's clauses with a fresh link frame
    pub(crate) fn bind_select(&mut self, id: NodeId, inherit: bool) -> CompileResult<NodeId> {
        let Some(sel) = self.ir.select(id).cloned() else {
            return Ok(id);
        };
        // a join inserted below GROUP BY or DISTINCT would change the groups
        let barrier = !sel.group_by.is_empty() || sel.distinct;
        self.links.push(LinkFrame {
            inherit: inherit && !barrier,
            resolved: HashMap::new(),
        });
        let result = self.bind_clauses(id, sel);
        self.links.pop();
        result.map(|()| id)
    }

    fn bind_clauses(&mut self, id: NodeId, sel: SelectNode) -> CompileResult<()> {
        let scope = Scope::clause(id);
        if let Some(from) = sel.from {
            let from = self.visit(from, scope.no_join())?;
            if let Some(s) = self.ir.select_mut(id) {
                s.from = Some(from);
            }
        }
        if let Some(w) = sel.where_ {
            let w = self.visit(w, scope)?;
            let w = (self.ir.as_bool(w) != Some(true)).then_some(w);
            if let Some(s) = self.ir.select_mut(id) {
                s.where_ = w;
            }
        }
        let mut group_by = Vec::with_capacity(sel.group_by.len());
        for g in sel.group_by {
            let g = self.visit(g, scope)?;
            self.scalar_leaves(g, &mut group_by)?;
        }
        if let Some(s) = self.ir.select_mut(id) {
            s.group_by = group_by;
        }
        if let Some(h) = sel.having {
            let h = self.visit(h, scope)?;
            if let Some(s) = self.ir.select_mut(id) {
                s.having = Some(h);
            }
        }
        let mut order_by = Vec::with_capacity(sel.order_by.len());
        for o in sel.order_by {
            let expr = self.visit(o.expr, scope)?;
            let mut leaves = Vec::new();
            self.scalar_leaves(expr, &mut leaves)?;
            order_by.extend(leaves.into_iter().map(|expr| OrderExpr { kind: o.kind, expr }));
        }
        if let Some(s) = self.ir.select_mut(id) {
            s.order_by = order_by;
        }
        if let Some(top) = sel.top {
            let top = self.visit(top, scope)?;
            if let Some(s) = self.ir.select_mut(id) {
                s.top = Some(top);
            }
        }
        for column in sel.row {
            self.visit(column, scope)?;
        }
        if let Some(selection) = sel.selection {
            let shared = match self.ir.kind(selection) {
                NodeKind::SharedRef { shared } => Some(*shared),
                _ => None,
            };
            let bound = self.visit(selection, scope)?;
            let bound = self.columnize(id, bound)?;
            self.ir.set_selection(id, bound);
            if let (Some(shared), Some(column)) = (shared, self.ir.column_of(bound)) {
                if self.ir.column_owner(column) == Some(id) {
                    self.shared_columns.insert(shared, column);
                }
            }
        }
        Ok(())
    }

    fn bind_alias(&mut self, alias: NodeId, node: NodeId, scope: Scope) -> CompileResult<NodeId> {
        let bound = self.visit(node, scope.no_join())?;
        // a fetched sequence is just its select
        let bound = match self.ir.kind(bound) {
            NodeKind::SubSelect {
                kind: SubSelectKind::Multiset | SubSelectKind::Element,
                select,
            } => *select,
            _ => bound,
        };
        if let NodeKind::Alias { node: n } = self.ir.kind_mut(alias) {
            *n = bound;
        }
        self.alias_of.insert(bound, alias);
        let mut leg = bound;
        while let NodeKind::Union { left, .. } = self.ir.kind(leg) {
            leg = *left;
            self.alias_of.insert(leg, alias);
        }
        Ok(alias)
    }

    fn bind_sub_select(
        &mut self,
        id: NodeId,
        kind: SubSelectKind,
        select: NodeId,
    ) -> CompileResult<NodeId> {
        if kind == SubSelectKind::Exists {
            // EXISTS never reads the selection
            let null = self.ir.null(ValueType::int32());
            let column = self.ir.column(Some("EMPTY".to_string()), null);
            let column_ref = self.ir.column_ref(column);
            if let Some(s) = self.ir.select_mut(select) {
                s.row.clear();
            }
            self.ir.push_row_column(select, column);
            self.ir.set_selection(select, column_ref);
        }
        let select = self.bind_select(select, false)?;
        let selection = self.ir.select(select).and_then(|s| s.selection);
        let kind = match (kind, selection) {
            (SubSelectKind::Element, Some(sel)) if self.ir.ty(sel).is_simple() => {
                SubSelectKind::Scalar
            }
            (kind, _) => kind,
        };
        if matches!(
            self.ir.kind(id),
            NodeKind::SubSelect { kind: k, select: s } if *k == kind && *s == select
        ) {
            return Ok(id);
        }
        Ok(self.ir.sub_select(kind, select))
    }

    /// Bind a shared expression once; later uses get copies
    fn bind_shared(&mut self, shared: NodeId, expr: NodeId, scope: Scope) -> CompileResult<NodeId> {
        if let Some(&bound) = self.shared.get(&shared) {
            return Ok(self.ir.duplicate(bound));
        }
        let bound = self.visit(expr, scope)?;
        let bound = self.push_down(bound, scope)?;
        let template = self.ir.duplicate(bound);
        self.shared.insert(shared, template);
        Ok(bound)
    }

    fn bind_shared_ref(&mut self, shared: NodeId, scope: Scope) -> CompileResult<NodeId> {
        if let Some(&column) = self.shared_columns.get(&shared) {
            return Ok(self.ir.column_ref(column));
        }
        if let Some(&bound) = self.shared.get(&shared) {
            return Ok(self.ir.duplicate(bound));
        }
        match self.ir.kind(shared) {
            NodeKind::Shared { expr } => {
                let expr = *expr;
                self.bind_shared(shared, expr, scope)
            }
            other => Err(CompileError::InvalidNodeForFormat {
                node: other.name().to_string(),
                format: "shared expression reference".to_string(),
            }),
        }
    }

    /// Move an expression SQL cannot evaluate in place into a column of a
    /// new select wrapped around the current source
    pub(crate) fn push_down(&mut self, expr: NodeId, scope: Scope) -> CompileResult<NodeId> {
        if !self.needs_push_down(expr) {
            return Ok(expr);
        }
        let Some(select) = scope.select else {
            return Ok(expr);
        };
        let Some(from) = self.ir.select(select).and_then(|s| s.from) else {
            return Ok(expr);
        };
        log::debug!("Pushing {} below select {select}", self.ir.kind(expr).name());
        let column = self.ir.column(None, expr);
        self.ir.node_mut(column).provider = self.ir.node(expr).provider.clone();
        let column_ref = self.ir.column_ref(column);
        let inner = self.ir.new_select(column_ref, Some(from));
        self.ir.push_row_column(inner, column);
        let alias = self.ir.alias(inner);
        self.alias_of.insert(inner, alias);
        if let Some(s) = self.ir.select_mut(select) {
            s.from = Some(alias);
        }
        Ok(self.ir.column_ref(column))
    }

    fn needs_push_down(&self, expr: NodeId) -> bool {
        if matches!(self.ir.kind(expr), NodeKind::ColumnRef { .. }) {
            return false;
        }
        self.ir.subtree(expr).into_iter().any(|id| {
            matches!(
                self.ir.kind(id),
                NodeKind::Aggregate { .. }
                    | NodeKind::RowNumber { .. }
                    | NodeKind::SubSelect {
                        kind: SubSelectKind::Scalar | SubSelectKind::Exists,
                        ..
                    }
            )
        })
    }

    /// Flatten a structured grouping or ordering key into its scalar parts
    fn scalar_leaves(&mut self, expr: NodeId, out: &mut Vec<NodeId>) -> CompileResult<()> {
        let ty = self.ir.ty(expr).clone();
        if ty.is_simple() {
            out.push(expr);
            return Ok(());
        }
        if let Some(name) = ty.entity_name().cloned() {
            let meta = self.meta(&name)?;
            let root = self.meta(meta.root_name())?;
            let keys: Vec<_> = root
                .identity_members()
                .into_iter()
                .map(|m| (m.name.clone(), m.ty.clone()))
                .collect();
            if !keys.is_empty() {
                for (key, key_ty) in keys {
                    let target = self.ir.duplicate(expr);
                    let value = self.access_member(target, &key, &key_ty, Scope::root())?;
                    self.scalar_leaves(value, out)?;
                }
                return Ok(());
            }
        }
        match self.ir.kind(expr).clone() {
            NodeKind::New { members } => {
                for (_, value) in members {
                    self.scalar_leaves(value, out)?;
                }
                Ok(())
            }
            NodeKind::TypeCase {
                discriminator,
                whens,
            } => {
                self.scalar_leaves(discriminator, out)?;
                if let Some(first) = whens.first() {
                    self.scalar_leaves(first.binding, out)?;
                }
                Ok(())
            }
            NodeKind::OptionalValue { value, .. } => self.scalar_leaves(value, out),
            NodeKind::Grouping { key, .. } => self.scalar_leaves(key, out),
            NodeKind::Unary {
                op: UnaryOp::OuterJoinedValue,
                operand,
            } => self.scalar_leaves(operand, out),
            _ => Err(CompileError::TypeCannotBeOrdered {
                type_name: ty.display_name(),
            }),
        }
    }

    /// Mapping of a type
    pub(crate) fn meta(&self, name: &TypeName) -> CompileResult<&'c MetaType> {
        let model: &'c dyn MetaModel = self.cx.model;
        model.meta_type(name).ok_or_else(|| {
            CoreError::UnmappedType {
                type_name: name.to_string(),
            }
            .into()
        })
    }

    /// Previously resolved link visible from the current frame
    pub(crate) fn cached_link(&self, key: &LinkKey) -> Option<NodeId> {
        for frame in self.links.iter().rev() {
            if let Some(&hit) = frame.resolved.get(key) {
                return Some(hit);
            }
            if !frame.inherit {
                break;
            }
        }
        None
    }

    pub(crate) fn cache_link(&mut self, key: LinkKey, value: NodeId) {
        if let Some(frame) = self.links.last_mut() {
            frame.resolved.insert(key, value);
        }
    }

    /// Run `f` under a frame that hides every resolved link
    pub(crate) fn with_link_barrier<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> CompileResult<T>,
    ) -> CompileResult<T> {
        self.links.push(LinkFrame::default());
        let result = f(self);
        self.links.pop();
        result
    }
}

#[cfg(test)]
#[path = "bind_test.rs"]
mod tests;
