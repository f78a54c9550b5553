//! Projection of a selection into row columns
//!
//! Every scalar part of a bound selection becomes a column of the select's
//! row, and the selection keeps only references to those columns plus the
//! structure the client rebuilds (constructions, groupings, nested
//! multisets).

use super::Binder;
use crate::error::CompileResult;
use crate::ir::{NodeId, NodeKind, SubSelectKind, TypeWhen, When};

impl<'a, 'c> Binder<'a, 'c> {
    /// Columnize `expr` into the row of `select`
    pub(crate) fn columnize(&mut self, select: NodeId, expr: NodeId) -> CompileResult<NodeId> {
        self.columnize_named(select, expr, None)
    }

    fn columnize_named(
        &mut self,
        select: NodeId,
        expr: NodeId,
        name: Option<&str>,
    ) -> CompileResult<NodeId> {
        let ty = self.ir.ty(expr).clone();
        match self.ir.kind(expr).clone() {
            NodeKind::ColumnRef { column } if self.ir.column_owner(column) == Some(select) => {
                Ok(expr)
            }
            NodeKind::New { members } => {
                let mut out = Vec::with_capacity(members.len());
                for (member, value) in members {
                    let value = self.columnize_named(select, value, Some(member.as_str()))?;
                    out.push((member, value));
                }
                Ok(self.ir.add(NodeKind::New { members: out }, ty))
            }
            NodeKind::TypeCase {
                discriminator,
                whens,
            } => {
                let discriminator = self.columnize_named(select, discriminator, None)?;
                let mut arms = Vec::with_capacity(whens.len());
                for w in whens {
                    let binding = self.columnize_named(select, w.binding, None)?;
                    arms.push(TypeWhen { binding, ..w });
                }
                Ok(self.ir.add(
                    NodeKind::TypeCase {
                        discriminator,
                        whens: arms,
                    },
                    ty,
                ))
            }
            NodeKind::Grouping { key, group } => {
                let key = self.columnize_named(select, key, Some("Key"))?;
                Ok(self.ir.add(NodeKind::Grouping { key, group }, ty))
            }
            NodeKind::OptionalValue { has_value, value } => {
                let has_value = self.columnize_named(select, has_value, Some("test"))?;
                let value = self.columnize_named(select, value, name)?;
                Ok(self.ir.add(NodeKind::OptionalValue { has_value, value }, ty))
            }
            NodeKind::ClientCase {
                discriminator,
                whens,
                else_,
            } => {
                let discriminator = self.columnize_named(select, discriminator, None)?;
                let mut arms = Vec::with_capacity(whens.len());
                for w in whens {
                    let value = self.columnize_named(select, w.value, name)?;
                    arms.push(When { test: w.test, value });
                }
                let else_ = match else_ {
                    Some(e) => Some(self.columnize_named(select, e, name)?),
                    None => None,
                };
                Ok(self.ir.add(
                    NodeKind::ClientCase {
                        discriminator,
                        whens: arms,
                        else_,
                    },
                    ty,
                ))
            }
            NodeKind::SubSelect {
                kind: SubSelectKind::Multiset | SubSelectKind::Element,
                ..
            } => Ok(expr),
            NodeKind::Value { .. } if !ty.is_simple() => Ok(expr),
            _ if ty.is_simple() => Ok(self.add_row_column(select, expr, name)),
            _ => Ok(expr),
        }
    }

    /// A row column computing `expr`; a column already reading the same
    /// source column is reused
    pub(crate) fn add_row_column(
        &mut self,
        select: NodeId,
        expr: NodeId,
        name: Option<&str>,
    ) -> NodeId {
        if let NodeKind::ColumnRef { column: target } = *self.ir.kind(expr) {
            let row = self.ir.select(select).map(|s| s.row.clone()).unwrap_or_default();
            let existing = row.into_iter().find(|&c| {
                matches!(self.ir.kind(c), NodeKind::Column { expr: Some(e), .. }
                    if self.ir.column_of(*e) == Some(target))
            });
            if let Some(existing) = existing {
                return self.ir.column_ref(existing);
            }
        }
        let name = name.map(str::to_string).or_else(|| self.inferred_name(expr));
        let column = self.ir.column(name, expr);
        let ty = self.ir.ty(expr).clone();
        self.ir.node_mut(column).provider = self
            .ir
            .node(expr)
            .provider
            .clone()
            .or_else(|| self.cx.provider_type(&ty));
        self.ir.push_row_column(select, column);
        self.ir.column_ref(column)
    }

    fn inferred_name(&self, expr: NodeId) -> Option<String> {
        let column = self.ir.column_of(expr)?;
        match self.ir.kind(column) {
            NodeKind::Column { name, .. } => name.clone(),
            _ => None,
        }
    }
}
