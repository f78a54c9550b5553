//! Alias reference expansion and union unification

use super::Binder;
use crate::error::{CompileError, CompileResult};
use crate::ir::{NodeId, NodeKind, TypeWhen};
use qc_core::{MetaDataMember, MetaModel, MetaType, TypeName, ValueType};
use std::collections::HashMap;

impl<'a, 'c> Binder<'a, 'c> {
    /// Replace a reference to an alias with what the alias produces
    pub(crate) fn expand_alias_ref(&mut self, alias: NodeId) -> CompileResult<NodeId> {
        let node = self.ir.alias_node(alias).ok_or_else(|| {
            CompileError::unsupported(format!("a reference to {}", self.ir.kind(alias).name()))
        })?;
        match self.ir.kind(node) {
            NodeKind::Table { .. } | NodeKind::TableValuedFunction { .. } => {
                self.entity_projection(node)
            }
            NodeKind::Select(_) | NodeKind::Union { .. } => {
                let leg = self.leftmost_leg(node);
                let selection = self
                    .ir
                    .select(leg)
                    .and_then(|s| s.selection)
                    .ok_or_else(|| CompileError::unsupported("a select without a selection"))?;
                Ok(self.ir.duplicate(selection))
            }
            _ => Ok(self.ir.duplicate(node)),
        }
    }

    /// First select of a (possibly nested) union
    pub(crate) fn leftmost_leg(&self, mut node: NodeId) -> NodeId {
        while let NodeKind::Union { left, .. } = self.ir.kind(node) {
            node = *left;
        }
        node
    }

    /// Entity construction over every mapped column of a table
    ///
    /// Tables of an inheritance hierarchy dispatch on the discriminator to
    /// one construction per type assignable to the table's row type.
    pub(crate) fn entity_projection(&mut self, table: NodeId) -> CompileResult<NodeId> {
        let row_type = match self.ir.kind(table) {
            NodeKind::Table { row_type, .. } | NodeKind::TableValuedFunction { row_type, .. } => {
                row_type.clone()
            }
            other => {
                return Err(CompileError::InvalidNodeForFormat {
                    node: other.name().to_string(),
                    format: "entity projection".to_string(),
                })
            }
        };
        let model: &'c dyn MetaModel = self.cx.model;
        let meta = self.meta(&row_type)?;
        let root = self.meta(meta.root_name())?;
        let Some(disc) = root.discriminator().filter(|_| root.has_inheritance()) else {
            return self.entity_new(table, meta);
        };

        let discriminator = self.member_column_ref(table, disc)?;
        let mut whens = Vec::new();
        for ty in model.hierarchy(root.root_name()) {
            if !model.is_assignable(&ty.name, &row_type) {
                continue;
            }
            let binding = self.entity_new(table, ty)?;
            whens.push(TypeWhen {
                code: ty.inheritance_code.clone(),
                type_name: ty.name.clone(),
                binding,
            });
        }
        Ok(self.ir.add(
            NodeKind::TypeCase {
                discriminator,
                whens,
            },
            ValueType::Entity { name: row_type },
        ))
    }

    /// `new T { m = table.m, ... }` for the data members of one type
    fn entity_new(&mut self, table: NodeId, meta: &MetaType) -> CompileResult<NodeId> {
        let mut members = Vec::with_capacity(meta.members.len());
        for member in &meta.members {
            let value = self.member_column_ref(table, member)?;
            members.push((member.name.clone(), value));
        }
        Ok(self.ir.add(
            NodeKind::New { members },
            ValueType::Entity {
                name: meta.name.clone(),
            },
        ))
    }

    /// Reference to the column backing a mapped member
    pub(crate) fn member_column_ref(
        &mut self,
        table: NodeId,
        member: &MetaDataMember,
    ) -> CompileResult<NodeId> {
        let provider = self.cx.member_provider(member)?;
        let column = self.ir.table_column(
            table,
            &member.name,
            member.column_name(),
            member.ty.clone(),
            provider,
        );
        Ok(self.ir.column_ref(column))
    }

    /// Type of the hierarchy rooted at the table's type declaring `member`
    pub(crate) fn declaring_type(
        &self,
        row_type: &TypeName,
        member: &str,
    ) -> CompileResult<&'c MetaType> {
        let model: &'c dyn MetaModel = self.cx.model;
        let meta = self.meta(row_type)?;
        if meta.member(member).is_some() || meta.association(member).is_some() {
            return Ok(meta);
        }
        model
            .hierarchy(meta.root_name())
            .into_iter()
            .find(|t| t.member(member).is_some() || t.association(member).is_some())
            .ok_or_else(|| CompileError::UnresolvedMember {
                member: member.to_string(),
                target: row_type.to_string(),
            })
    }

    /// Make the right leg's row line up position-wise with the left leg's
    ///
    /// Both selections are walked in parallel; every pair of columns they
    /// reach must occupy the same position. The right row is rebuilt in the
    /// left row's order, copying columns that the left side uses twice.
    pub(crate) fn align_union(&mut self, left: NodeId, right: NodeId) -> CompileResult<()> {
        let left_leg = self.leftmost_leg(left);
        let right_leg = self.leftmost_leg(right);
        let (Some(ls), Some(rs)) = (
            self.ir.select(left_leg).and_then(|s| s.selection),
            self.ir.select(right_leg).and_then(|s| s.selection),
        ) else {
            return Err(CompileError::UnionIncompatibleConstruction {
                detail: "both sides must be selects".to_string(),
            });
        };
        let mut pairs = Vec::new();
        self.pair_columns(ls, rs, &mut pairs)?;

        let mut paired: HashMap<NodeId, NodeId> = HashMap::new();
        for (l, r) in pairs {
            match paired.get(&l) {
                Some(&existing) if existing != r => {
                    return Err(CompileError::UnionIncompatibleConstruction {
                        detail: "a member is projected from different columns".to_string(),
                    })
                }
                _ => {
                    paired.insert(l, r);
                }
            }
        }

        let left_row = self.ir.select(left_leg).map(|s| s.row.clone()).unwrap_or_default();
        let mut row = Vec::with_capacity(left_row.len());
        let mut used = Vec::new();
        for l in left_row {
            let r = *paired
                .get(&l)
                .ok_or_else(|| CompileError::UnionIncompatibleConstruction {
                    detail: "the second query has no value for a projected member".to_string(),
                })?;
            if used.contains(&r) {
                let expr = match self.ir.kind(r) {
                    NodeKind::Column { expr: Some(e), .. } => self.ir.duplicate(*e),
                    _ => self.ir.column_ref(r),
                };
                let name = match self.ir.kind(r) {
                    NodeKind::Column { name, .. } => name.clone(),
                    _ => None,
                };
                let copy = self.ir.column(name, expr);
                self.ir.node_mut(copy).provider = self.ir.node(r).provider.clone();
                if let NodeKind::Column { owner, .. } = self.ir.kind_mut(copy) {
                    *owner = Some(right_leg);
                }
                row.push(copy);
            } else {
                used.push(r);
                row.push(r);
            }
        }
        if let Some(s) = self.ir.select_mut(right_leg) {
            s.row = row;
        }
        Ok(())
    }

    fn pair_columns(
        &self,
        left: NodeId,
        right: NodeId,
        out: &mut Vec<(NodeId, NodeId)>,
    ) -> CompileResult<()> {
        let mismatch = |detail: &str| CompileError::UnionIncompatibleConstruction {
            detail: detail.to_string(),
        };
        match (self.ir.kind(left), self.ir.kind(right)) {
            (NodeKind::ColumnRef { column: l }, NodeKind::ColumnRef { column: r }) => {
                out.push((*l, *r));
                Ok(())
            }
            (NodeKind::New { members: lm }, NodeKind::New { members: rm }) => {
                if !self.ir.ty(left).same_shape(self.ir.ty(right))
                    && self.ir.ty(left).entity_name() != self.ir.ty(right).entity_name()
                {
                    return Err(mismatch("the projected types differ"));
                }
                let same_names = lm.len() == rm.len()
                    && lm.iter().zip(rm.iter()).all(|((a, _), (b, _))| a == b);
                if !same_names {
                    return Err(mismatch(
                        "members must be initialized in the same order with the same names",
                    ));
                }
                for ((_, l), (_, r)) in lm.iter().zip(rm.iter()) {
                    self.pair_columns(*l, *r, out)?;
                }
                Ok(())
            }
            (
                NodeKind::TypeCase {
                    discriminator: ld,
                    whens: lw,
                },
                NodeKind::TypeCase {
                    discriminator: rd,
                    whens: rw,
                },
            ) => {
                if lw.len() != rw.len()
                    || lw.iter().zip(rw.iter()).any(|(a, b)| a.type_name != b.type_name)
                {
                    return Err(mismatch("the inheritance dispatches differ"));
                }
                self.pair_columns(*ld, *rd, out)?;
                for (l, r) in lw.iter().zip(rw.iter()) {
                    self.pair_columns(l.binding, r.binding, out)?;
                }
                Ok(())
            }
            (
                NodeKind::OptionalValue {
                    has_value: lh,
                    value: lv,
                },
                NodeKind::OptionalValue {
                    has_value: rh,
                    value: rv,
                },
            ) => {
                self.pair_columns(*lh, *rh, out)?;
                self.pair_columns(*lv, *rv, out)
            }
            (NodeKind::Grouping { .. }, _) | (_, NodeKind::Grouping { .. }) => {
                Err(mismatch("groupings cannot be combined"))
            }
            (NodeKind::SubSelect { .. }, _) | (_, NodeKind::SubSelect { .. }) => {
                Err(mismatch("nested sequences cannot be combined"))
            }
            (NodeKind::Value { value: a, .. }, NodeKind::Value { value: b, .. }) if a == b => {
                Ok(())
            }
            (l, r) => Err(mismatch(&format!("{} cannot be combined with {}", l.name(), r.name()))),
        }
    }
}
