//! Association links
//!
//! A to-one link read in a clause of a select is joined into that select's
//! FROM, once per alias and association. Everything else becomes a
//! correlated sub-select over the associated table.

use super::{Binder, Scope};
use crate::error::{CompileError, CompileResult};
use crate::ir::{BinaryOp, JoinKind, NodeId, NodeKind, SubSelectKind, TypeWhen, UnaryOp};
use crate::lowering::Lowerer;
use qc_core::Session;
use std::collections::HashSet;

impl<'a, 'c> Binder<'a, 'c> {
    /// Replace a link with the associated rows
    pub(crate) fn resolve_link(&mut self, link: NodeId, scope: Scope) -> CompileResult<NodeId> {
        let NodeKind::Link {
            owner,
            member,
            keys,
            expansion,
            key,
        } = self.ir.kind(link).clone()
        else {
            return Ok(link);
        };
        if let Some(expansion) = expansion {
            let copy = self.ir.duplicate(expansion);
            return self.visit(copy, scope);
        }
        if let Some(hit) = self.cached_link(&key) {
            log::trace!("Reusing link {owner}.{member} read from {}", key.alias);
            return Ok(self.ir.duplicate(hit));
        }

        let owner_meta = self.declaring_type(&owner, member.as_str())?;
        let assoc = owner_meta
            .association(member.as_str())
            .ok_or_else(|| CompileError::UnresolvedMember {
                member: member.to_string(),
                target: owner.to_string(),
            })?;
        let other = self.meta(&assoc.other_type)?;
        let mut bound_keys = Vec::with_capacity(keys.len());
        for k in keys {
            bound_keys.push(self.visit(k, scope.no_join())?);
        }

        let table = Lowerer::new(&mut *self.ir, self.cx).table_node(&assoc.other_type)?;
        let alias = self.ir.alias(table);
        self.alias_of.insert(table, alias);

        let mut terms = Vec::with_capacity(bound_keys.len() + 1);
        for (&k, other_key) in bound_keys.iter().zip(&assoc.other_key) {
            let data = other.member(other_key.as_str()).ok_or_else(|| {
                CompileError::UnresolvedMember {
                    member: other_key.to_string(),
                    target: other.name.to_string(),
                }
            })?;
            let column = self.member_column_ref(table, data)?;
            terms.push(self.ir.binary(BinaryOp::EQ, k, column));
        }
        let session: &'c dyn Session = self.cx.session;
        if let Some(filter) = session.association_filter(&owner, &member) {
            let aref = self.ir.alias_ref(alias);
            let filter = Lowerer::new(&mut *self.ir, self.cx).visit_lambda(
                &format!("{owner}.{member}"),
                filter,
                &[aref],
            )?;
            terms.push(filter);
        }
        let condition = match self.ir.and_all(terms) {
            Some(c) => c,
            None => self.ir.bool_lit(true),
        };

        let joinable = scope
            .select
            .filter(|_| scope.can_join && !assoc.many && self.cx.strategy.can_use_join_on)
            .filter(|&s| self.ir.select(s).is_some_and(|s| s.from.is_some()));
        let value = match joinable {
            Some(select) => {
                let nullable_key = bound_keys.iter().any(|&k| self.ir.ty(k).is_nullable());
                let mut kind = if assoc.foreign_key && !nullable_key {
                    JoinKind::Inner
                } else {
                    JoinKind::LeftOuter
                };
                if kind == JoinKind::Inner && self.reads_through_outer_join(select, &bound_keys) {
                    log::warn!(
                        "Link {owner}.{member} reads keys from the outer side of a join; using LEFT OUTER JOIN"
                    );
                    kind = JoinKind::LeftOuter;
                }
                let condition = self.visit(condition, Scope::clause(select).no_join())?;
                let from = self.ir.select(select).and_then(|s| s.from);
                if let Some(from) = from {
                    let mut consumed = self.consumed_aliases(condition);
                    consumed.remove(&alias);
                    let placed = self.place_join(from, kind, alias, condition, &consumed);
                    if let Some(s) = self.ir.select_mut(select) {
                        s.from = Some(placed);
                    }
                }
                log::debug!("Joined {owner}.{member} into select {select} with {}", kind.keyword());
                let row = self.entity_projection(table)?;
                if kind.is_outer() {
                    self.outer_joined(row)
                } else {
                    row
                }
            }
            None => {
                let aref = self.ir.alias_ref(alias);
                let select = self.ir.new_select(aref, Some(alias));
                if let Some(s) = self.ir.select_mut(select) {
                    s.where_ = Some(condition);
                }
                let kind = if assoc.many {
                    SubSelectKind::Multiset
                } else {
                    SubSelectKind::Element
                };
                let sub = self.ir.sub_select(kind, select);
                self.with_link_barrier(|this| this.visit(sub, Scope::root()))?
            }
        };
        if let NodeKind::Link { expansion, .. } = self.ir.kind_mut(link) {
            *expansion = Some(value);
        }
        if !assoc.many {
            let template = self.ir.duplicate(value);
            self.cache_link(key, template);
        }
        Ok(value)
    }

    /// True when any key is read from an alias on the nullable side of an
    /// outer join of the select's FROM
    fn reads_through_outer_join(&self, select: NodeId, keys: &[NodeId]) -> bool {
        let Some(from) = self.ir.select(select).and_then(|s| s.from) else {
            return false;
        };
        let mut outer_side = HashSet::new();
        self.collect_outer_side(from, false, &mut outer_side);
        if outer_side.is_empty() {
            return false;
        }
        keys.iter()
            .flat_map(|&k| self.ir.subtree(k))
            .filter_map(|id| self.ir.column_of(id))
            .filter_map(|c| self.ir.column_owner(c))
            .filter_map(|owner| self.alias_of.get(&owner))
            .any(|alias| outer_side.contains(alias))
    }

    /// Aliases whose columns a bound expression reads
    fn consumed_aliases(&self, expr: NodeId) -> HashSet<NodeId> {
        self.ir
            .subtree(expr)
            .into_iter()
            .filter_map(|id| self.ir.column_of(id))
            .filter_map(|c| self.ir.column_owner(c))
            .filter_map(|owner| self.alias_of.get(&owner).copied())
            .collect()
    }

    fn produced_aliases(&self, node: NodeId, out: &mut HashSet<NodeId>) {
        match self.ir.kind(node) {
            NodeKind::Join { left, right, .. } => {
                let (left, right) = (*left, *right);
                self.produced_aliases(left, out);
                self.produced_aliases(right, out);
            }
            NodeKind::Alias { .. } => {
                out.insert(node);
            }
            _ => {}
        }
    }

    /// Join `alias` directly above the smallest left-hand part of `from`
    /// that produces every alias in `consumed`, returning the new FROM
    fn place_join(
        &mut self,
        from: NodeId,
        kind: JoinKind,
        alias: NodeId,
        condition: NodeId,
        consumed: &HashSet<NodeId>,
    ) -> NodeId {
        if let NodeKind::Join { left, .. } = *self.ir.kind(from) {
            let mut produced = HashSet::new();
            self.produced_aliases(left, &mut produced);
            if !consumed.is_empty() && consumed.is_subset(&produced) {
                let placed = self.place_join(left, kind, alias, condition, consumed);
                if let NodeKind::Join { left, .. } = self.ir.kind_mut(from) {
                    *left = placed;
                }
                return from;
            }
        }
        self.ir.join(kind, from, alias, Some(condition))
    }

    fn collect_outer_side(&self, node: NodeId, nullable: bool, out: &mut HashSet<NodeId>) {
        match self.ir.kind(node) {
            NodeKind::Join {
                kind, left, right, ..
            } => {
                self.collect_outer_side(*left, nullable, out);
                self.collect_outer_side(*right, nullable || kind.is_outer(), out);
            }
            NodeKind::Alias { .. } if nullable => {
                out.insert(node);
            }
            _ => {}
        }
    }

    /// Mark a value as read through an outer join
    pub(crate) fn outer_joined(&mut self, value: NodeId) -> NodeId {
        match self.ir.kind(value).clone() {
            NodeKind::New { members } => {
                let members = members
                    .into_iter()
                    .map(|(name, v)| (name, self.outer_joined(v)))
                    .collect();
                let ty = self.ir.ty(value).clone();
                self.ir.add(NodeKind::New { members }, ty)
            }
            NodeKind::TypeCase {
                discriminator,
                whens,
            } => {
                let discriminator = self.outer_joined(discriminator);
                let whens = whens
                    .into_iter()
                    .map(|w| TypeWhen {
                        binding: self.outer_joined(w.binding),
                        ..w
                    })
                    .collect();
                let ty = self.ir.ty(value).clone();
                self.ir.add(
                    NodeKind::TypeCase {
                        discriminator,
                        whens,
                    },
                    ty,
                )
            }
            NodeKind::Unary {
                op: UnaryOp::OuterJoinedValue,
                ..
            }
            | NodeKind::Value { .. }
            | NodeKind::SubSelect { .. } => value,
            _ => self.ir.unary(UnaryOp::OuterJoinedValue, value),
        }
    }
}
