//! Member access resolution

use super::{Binder, Scope};
use crate::error::{CompileError, CompileResult};
use crate::ir::{JoinKind, LinkKey, NodeId, NodeKind, SubSelectKind, UnaryOp, When};
use qc_core::{Declaring, MemberName, MetaAssociation, ScalarKind, TypeName, Value, ValueType};

impl<'a, 'c> Binder<'a, 'c> {
    /// Bind `target.member`
    pub(crate) fn bind_member(
        &mut self,
        target: NodeId,
        member: &MemberName,
        ty: &ValueType,
        scope: Scope,
    ) -> CompileResult<NodeId> {
        // `alias.member` over a table reads the column without expanding the row
        if let NodeKind::AliasRef { alias } = *self.ir.kind(target) {
            let table = self
                .ir
                .alias_node(alias)
                .filter(|&n| {
                    matches!(
                        self.ir.kind(n),
                        NodeKind::Table { .. } | NodeKind::TableValuedFunction { .. }
                    )
                });
            if let Some(table) = table {
                return self.table_member(alias, table, member, scope);
            }
        }
        let target = self.visit(target, scope)?;
        self.access_member(target, member, ty, scope)
    }

    fn table_member(
        &mut self,
        alias: NodeId,
        table: NodeId,
        member: &MemberName,
        scope: Scope,
    ) -> CompileResult<NodeId> {
        let row_type = match self.ir.kind(table) {
            NodeKind::Table { row_type, .. } | NodeKind::TableValuedFunction { row_type, .. } => {
                row_type.clone()
            }
            other => {
                return Err(CompileError::InvalidNodeForFormat {
                    node: other.name().to_string(),
                    format: "table member".to_string(),
                })
            }
        };
        let owner = self.declaring_type(&row_type, member.as_str())?;
        if let Some(data) = owner.member(member.as_str()) {
            return self.member_column_ref(table, data);
        }
        let Some(assoc) = owner.association(member.as_str()) else {
            return Err(CompileError::UnresolvedMember {
                member: member.to_string(),
                target: row_type.to_string(),
            });
        };
        let mut keys = Vec::with_capacity(assoc.this_key.len());
        for key in &assoc.this_key {
            let data = self
                .declaring_type(&row_type, key.as_str())?
                .member(key.as_str())
                .ok_or_else(|| CompileError::UnresolvedMember {
                    member: key.to_string(),
                    target: row_type.to_string(),
                })?;
            keys.push(self.member_column_ref(table, data)?);
        }
        let link = self.make_link(&owner.name, assoc, keys, alias);
        self.resolve_link(link, scope)
    }

    /// Access `member` on an already bound value
    pub(crate) fn access_member(
        &mut self,
        target: NodeId,
        member: &MemberName,
        ty: &ValueType,
        scope: Scope,
    ) -> CompileResult<NodeId> {
        match self.ir.kind(target).clone() {
            NodeKind::New { members } => {
                if let Some((_, value)) = members.iter().find(|(m, _)| m == member) {
                    return Ok(self.ir.duplicate(*value));
                }
                if let Some(owner) = self.ir.ty(target).entity_name().cloned() {
                    if let Some(link) = self.link_from_new(&owner, member, &members)? {
                        return self.resolve_link(link, scope);
                    }
                }
                Err(self.unresolved(member, target))
            }
            NodeKind::TypeCase {
                discriminator,
                whens,
            } => self.type_case_member(target, discriminator, &whens, member, ty, scope),
            NodeKind::Grouping { key, .. } if member == "Key" => Ok(self.ir.duplicate(key)),
            NodeKind::OptionalValue { value, .. } => {
                let value = self.ir.duplicate(value);
                self.access_member(value, member, ty, scope)
            }
            NodeKind::Unary {
                op: UnaryOp::OuterJoinedValue | UnaryOp::Treat,
                operand,
            } if !self.ir.ty(operand).is_simple() => {
                let op_is_ojv = matches!(
                    self.ir.kind(target),
                    NodeKind::Unary {
                        op: UnaryOp::OuterJoinedValue,
                        ..
                    }
                );
                let operand = self.ir.duplicate(operand);
                let value = self.access_member(operand, member, ty, scope)?;
                Ok(if op_is_ojv { self.outer_joined(value) } else { value })
            }
            NodeKind::SearchedCase { whens, else_ } => {
                let mut arms = Vec::with_capacity(whens.len());
                for w in whens {
                    let value = self.ir.duplicate(w.value);
                    let value = self.access_member(value, member, ty, scope)?;
                    arms.push(When { test: w.test, value });
                }
                let else_ = self.ir.duplicate(else_);
                let else_ = self.access_member(else_, member, ty, scope)?;
                Ok(self.ir.searched_case(arms, else_))
            }
            NodeKind::SimpleCase {
                discriminator,
                whens,
                else_,
            }
            | NodeKind::ClientCase {
                discriminator,
                whens,
                else_,
            } => {
                let mut arms = Vec::with_capacity(whens.len());
                let mut all_simple = true;
                for w in whens {
                    let value = self.ir.duplicate(w.value);
                    let value = self.access_member(value, member, ty, scope)?;
                    all_simple &= self.ir.ty(value).is_simple();
                    arms.push(When { test: w.test, value });
                }
                let else_ = match else_ {
                    Some(e) => {
                        let e = self.ir.duplicate(e);
                        let e = self.access_member(e, member, ty, scope)?;
                        all_simple &= self.ir.ty(e).is_simple();
                        Some(e)
                    }
                    None => None,
                };
                let kind = if all_simple {
                    NodeKind::SimpleCase {
                        discriminator,
                        whens: arms,
                        else_,
                    }
                } else {
                    NodeKind::ClientCase {
                        discriminator,
                        whens: arms,
                        else_,
                    }
                };
                Ok(self.ir.add(kind, ty.clone()))
            }
            NodeKind::SubSelect {
                kind: SubSelectKind::Element | SubSelectKind::Scalar,
                select,
            } => self.sub_select_member(select, member, ty),
            NodeKind::Value {
                value: Value::Object(obj),
                ..
            } => Ok(self.ir.client_value(obj.field(member.as_str()), ty.clone())),
            NodeKind::Value {
                value: Value::Null, ..
            } => Ok(self.ir.null(ty.clone())),
            NodeKind::Link { .. } => {
                let resolved = self.resolve_link(target, scope)?;
                self.access_member(resolved, member, ty, scope)
            }
            _ if self.ir.ty(target).is_simple() => self.scalar_member(target, member, ty),
            _ => Err(self.unresolved(member, target)),
        }
    }

    /// Member of an inheritance dispatch
    ///
    /// Structured members come from the first arm that declares them.
    /// Scalar members read the same column from every declaring arm; arms
    /// that do not declare the member (or were treated away) yield NULL.
    fn type_case_member(
        &mut self,
        target: NodeId,
        discriminator: NodeId,
        whens: &[crate::ir::TypeWhen],
        member: &MemberName,
        ty: &ValueType,
        scope: Scope,
    ) -> CompileResult<NodeId> {
        let declares = |this: &Self, w: &crate::ir::TypeWhen| {
            !matches!(this.ir.kind(w.binding), NodeKind::Value { .. })
                && this.meta(&w.type_name).is_ok_and(|m| {
                    m.member(member.as_str()).is_some() || m.association(member.as_str()).is_some()
                })
        };
        let declaring: Vec<bool> = whens.iter().map(|w| declares(self, w)).collect();
        let Some(first) = declaring.iter().position(|d| *d) else {
            if whens.iter().all(|w| matches!(self.ir.kind(w.binding), NodeKind::Value { .. })) {
                return Ok(self.ir.null(ty.clone()));
            }
            return Err(self.unresolved(member, target));
        };
        let binding = self.ir.duplicate(whens[first].binding);
        let value = self.access_member(binding, member, ty, scope)?;
        if !self.ir.ty(value).is_simple() || declaring.iter().all(|d| *d) {
            return Ok(value);
        }

        let mut arms = Vec::new();
        let mut else_ = None;
        for (w, declared) in whens.iter().zip(&declaring) {
            let arm_value = if *declared {
                let binding = self.ir.duplicate(w.binding);
                self.access_member(binding, member, ty, scope)?
            } else {
                self.ir.null(ty.clone())
            };
            match &w.code {
                Some(code) => {
                    let code_ty = self.ir.ty(discriminator).clone();
                    let test = self.ir.value(code.clone(), code_ty);
                    arms.push(When {
                        test,
                        value: arm_value,
                    });
                }
                None => else_ = Some(arm_value),
            }
        }
        let discriminator = self.ir.duplicate(discriminator);
        Ok(self.ir.add(
            NodeKind::SimpleCase {
                discriminator,
                whens: arms,
                else_,
            },
            ty.as_nullable(),
        ))
    }

    /// Member of a single-row sub-select, evaluated inside it
    fn sub_select_member(
        &mut self,
        select: NodeId,
        member: &MemberName,
        ty: &ValueType,
    ) -> CompileResult<NodeId> {
        let selection = self
            .ir
            .select(select)
            .and_then(|s| s.selection)
            .ok_or_else(|| CompileError::unsupported("a select without a selection"))?;
        let selection = self.ir.duplicate(selection);
        let value = self.with_link_barrier(|this| {
            this.access_member(selection, member, ty, Scope::clause(select))
        })?;
        if let NodeKind::SubSelect {
            kind: SubSelectKind::Multiset,
            select: inner,
        } = *self.ir.kind(value)
        {
            return self.fold_multiset(select, inner);
        }
        let value = self.columnize(select, value)?;
        self.ir.set_selection(select, value);
        let kind = if self.ir.ty(value).is_simple() {
            SubSelectKind::Scalar
        } else {
            SubSelectKind::Element
        };
        Ok(self.ir.sub_select(kind, select))
    }

    /// `ELEMENT(SELECT MULTISET(inner) FROM ...)` as one multiset over a
    /// cross apply
    fn fold_multiset(&mut self, outer: NodeId, inner: NodeId) -> CompileResult<NodeId> {
        log::debug!("Folding a nested multiset of {outer} into CROSS APPLY");
        let outer_alias = self.ir.alias(outer);
        let inner_alias = self.ir.alias(inner);
        let join = self.ir.join(JoinKind::CrossApply, outer_alias, inner_alias, None);
        let aref = self.ir.alias_ref(inner_alias);
        let select = self.ir.new_select(aref, Some(join));
        let select = self.bind_select(select, false)?;
        Ok(self.ir.sub_select(SubSelectKind::Multiset, select))
    }

    /// Member of a scalar value, left to the method pass
    fn scalar_member(
        &mut self,
        target: NodeId,
        member: &MemberName,
        ty: &ValueType,
    ) -> CompileResult<NodeId> {
        let target_ty = self.ir.ty(target).clone();
        let declaring = match (member.as_str(), target_ty.scalar_kind()) {
            ("HasValue" | "Value", _) if target_ty.is_nullable() => Declaring::Nullable,
            (_, Some(kind)) if kind.is_string_like() => Declaring::String,
            (_, Some(ScalarKind::DateTime)) => Declaring::DateTime,
            (_, Some(ScalarKind::DateTimeOffset)) => Declaring::DateTimeOffset,
            (_, Some(ScalarKind::TimeSpan)) => Declaring::TimeSpan,
            _ => return Err(self.unresolved(member, target)),
        };
        Ok(self.ir.add(
            NodeKind::MethodCall {
                declaring,
                method: member.to_string(),
                target: Some(target),
                args: Vec::new(),
            },
            ty.clone(),
        ))
    }

    /// Link for an association read from an entity construction
    fn link_from_new(
        &mut self,
        owner: &TypeName,
        member: &MemberName,
        members: &[(MemberName, NodeId)],
    ) -> CompileResult<Option<NodeId>> {
        let meta = self.declaring_type(owner, member.as_str())?;
        let Some(assoc) = meta.association(member.as_str()) else {
            return Ok(None);
        };
        let mut keys = Vec::with_capacity(assoc.this_key.len());
        for key in &assoc.this_key {
            let (_, value) = members.iter().find(|(m, _)| m == key).ok_or_else(|| {
                CompileError::UnresolvedMember {
                    member: key.to_string(),
                    target: owner.to_string(),
                }
            })?;
            keys.push(self.ir.duplicate(*value));
        }
        let Some(&first) = keys.first() else {
            return Ok(None);
        };
        // links are cached by the alias their keys are read from
        let column = self.ir.column_of(first);
        let anchor = column
            .and_then(|c| self.ir.column_owner(c))
            .and_then(|owner| self.alias_of.get(&owner).copied())
            .or(column)
            .unwrap_or(first);
        Ok(Some(self.make_link(&meta.name, assoc, keys, anchor)))
    }

    pub(crate) fn make_link(
        &mut self,
        owner: &TypeName,
        assoc: &MetaAssociation,
        keys: Vec<NodeId>,
        anchor: NodeId,
    ) -> NodeId {
        let other = ValueType::Entity {
            name: assoc.other_type.clone(),
        };
        let ty = if assoc.many {
            ValueType::sequence(other)
        } else {
            other
        };
        self.ir.add(
            NodeKind::Link {
                owner: owner.clone(),
                member: assoc.name.clone(),
                keys,
                expansion: None,
                key: LinkKey {
                    alias: anchor,
                    member: assoc.name.clone(),
                },
            },
            ty,
        )
    }

    pub(crate) fn unresolved(&self, member: &MemberName, target: NodeId) -> CompileError {
        CompileError::UnresolvedMember {
            member: member.to_string(),
            target: self.ir.ty(target).display_name(),
        }
    }
}
