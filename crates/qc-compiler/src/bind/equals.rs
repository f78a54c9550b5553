//! Comparisons
//!
//! Equality of structured values expands over their members: entities
//! compare identity members, records compare every member. Two-valued
//! equality (`EQ2V`/`NE2V`) treats two NULLs as equal and never yields
//! NULL itself.

use super::{Binder, Scope};
use crate::error::{CompileError, CompileResult};
use crate::ir::{BinaryOp, NodeId, NodeKind, UnaryOp};
use qc_core::{MemberName, MetaModel, Value, ValueType};

impl<'a, 'c> Binder<'a, 'c> {
    /// Rebuild a binary node over bound operands
    pub(crate) fn bind_binary(
        &mut self,
        id: NodeId,
        op: BinaryOp,
        left: NodeId,
        right: NodeId,
    ) -> CompileResult<NodeId> {
        match op {
            BinaryOp::And | BinaryOp::Or => Ok(self.logical(op, left, right)),
            BinaryOp::EQ | BinaryOp::NE | BinaryOp::EQ2V | BinaryOp::NE2V => {
                self.translate_equals(op, left, right)
            }
            op if op.is_comparison() => {
                if !self.ir.ty(left).is_simple() || !self.ir.ty(right).is_simple() {
                    return Err(self.not_comparable(left, right));
                }
                Ok(self.ir.binary(op, left, right))
            }
            _ => {
                if let NodeKind::Binary { left: l, right: r, .. } = self.ir.kind_mut(id) {
                    *l = left;
                    *r = right;
                }
                Ok(id)
            }
        }
    }

    /// Expand an equality over bound operands
    pub(crate) fn translate_equals(
        &mut self,
        op: BinaryOp,
        left: NodeId,
        right: NodeId,
    ) -> CompileResult<NodeId> {
        let negated = matches!(op, BinaryOp::NE | BinaryOp::NE2V);
        let two_valued = matches!(op, BinaryOp::EQ2V | BinaryOp::NE2V);
        let (lt, rt) = (self.ir.ty(left).clone(), self.ir.ty(right).clone());
        if lt.is_sequence() || rt.is_sequence() || lt.is_grouping() || rt.is_grouping() {
            return Err(self.not_comparable(left, right));
        }

        let null_test = if negated {
            UnaryOp::IsNotNull
        } else {
            UnaryOp::IsNull
        };
        if self.is_null_literal(right) {
            return self.null_test(null_test, left);
        }
        if self.is_null_literal(left) {
            return self.null_test(null_test, right);
        }
        if !lt.is_simple() || !rt.is_simple() {
            return self.compare_structured(op, left, right);
        }

        if let (Some(a), Some(b)) = (self.ir.as_value(left), self.ir.as_value(right)) {
            let same = a == b;
            return Ok(self.ir.bool_lit(same != negated));
        }
        // `p == true` is `p`
        if !two_valued {
            for (value, other) in [(right, left), (left, right)] {
                let Some(b) = self.ir.as_bool(value) else {
                    continue;
                };
                if self.ir.ty(other).scalar_kind() != Some(qc_core::ScalarKind::Bool)
                    || self.ir.ty(other).is_nullable()
                {
                    continue;
                }
                return Ok(if b != negated {
                    other
                } else {
                    self.negate(other)
                });
            }
        }
        if two_valued {
            return Ok(self.two_valued(negated, left, right));
        }
        Ok(self.ir.binary(op, left, right))
    }

    /// Two-valued equality of scalars
    pub(crate) fn two_valued(&mut self, negated: bool, left: NodeId, right: NodeId) -> NodeId {
        let ln = self.may_be_null(left);
        let rn = self.may_be_null(right);
        let cmp = if negated { BinaryOp::NE } else { BinaryOp::EQ };
        match (ln, rn, negated) {
            (false, false, _) => self.ir.binary_typed(cmp, left, right, ValueType::bool()),
            // a NULL side never matches a non-NULL side
            (true, false, false) | (false, true, false) => {
                self.ir.binary_typed(cmp, left, right, ValueType::bool())
            }
            (true, false, true) | (false, true, true) => {
                let nullable = if ln { left } else { right };
                let nullable = self.ir.duplicate(nullable);
                let is_null = self.ir.unary(UnaryOp::IsNull, nullable);
                let ne = self.ir.binary(BinaryOp::NE, left, right);
                self.ir.binary_typed(BinaryOp::Or, is_null, ne, ValueType::bool())
            }
            (true, true, false) => {
                let both_null = self.null_pair(left, right, UnaryOp::IsNull, UnaryOp::IsNull);
                let both_set = self.null_pair(left, right, UnaryOp::IsNotNull, UnaryOp::IsNotNull);
                let eq = self.ir.binary(BinaryOp::EQ, left, right);
                let matched = self.ir.binary_typed(BinaryOp::And, both_set, eq, ValueType::bool());
                self.ir.binary_typed(BinaryOp::Or, both_null, matched, ValueType::bool())
            }
            (true, true, true) => {
                let left_only = self.null_pair(left, right, UnaryOp::IsNull, UnaryOp::IsNotNull);
                let right_only = self.null_pair(left, right, UnaryOp::IsNotNull, UnaryOp::IsNull);
                let both_set = self.null_pair(left, right, UnaryOp::IsNotNull, UnaryOp::IsNotNull);
                let ne = self.ir.binary(BinaryOp::NE, left, right);
                let differ = self.ir.binary_typed(BinaryOp::And, both_set, ne, ValueType::bool());
                let one_null =
                    self.ir
                        .binary_typed(BinaryOp::Or, left_only, right_only, ValueType::bool());
                self.ir.binary_typed(BinaryOp::Or, one_null, differ, ValueType::bool())
            }
        }
    }

    /// `left <lop> AND right <rop>` over copies of both operands
    fn null_pair(&mut self, left: NodeId, right: NodeId, lop: UnaryOp, rop: UnaryOp) -> NodeId {
        let l = self.ir.duplicate(left);
        let r = self.ir.duplicate(right);
        let l = self.ir.unary(lop, l);
        let r = self.ir.unary(rop, r);
        self.ir.binary_typed(BinaryOp::And, l, r, ValueType::bool())
    }

    fn may_be_null(&self, id: NodeId) -> bool {
        match self.ir.as_value(id) {
            Some(v) => v.is_null(),
            None => self.ir.ty(id).is_nullable(),
        }
    }

    pub(crate) fn is_null_literal(&self, id: NodeId) -> bool {
        self.ir.as_value(id).is_some_and(Value::is_null)
    }

    /// Equality of entities and records
    fn compare_structured(
        &mut self,
        op: BinaryOp,
        left: NodeId,
        right: NodeId,
    ) -> CompileResult<NodeId> {
        let negated = matches!(op, BinaryOp::NE | BinaryOp::NE2V);
        let (lt, rt) = (self.ir.ty(left).clone(), self.ir.ty(right).clone());
        let members: Vec<(MemberName, ValueType)> = match (lt.entity_name(), rt.entity_name()) {
            (Some(ln), Some(rn)) => {
                let model: &'c dyn MetaModel = self.cx.model;
                let (lm, rm) = (self.meta(ln)?, self.meta(rn)?);
                if lm.root_name() != rm.root_name() {
                    // rows of unrelated tables are never the same row
                    return Ok(self.ir.bool_lit(negated));
                }
                let root = model.meta_type(lm.root_name()).unwrap_or(lm);
                let keys: Vec<_> = root
                    .identity_members()
                    .into_iter()
                    .map(|m| (m.name.clone(), m.ty.clone()))
                    .collect();
                if keys.is_empty() {
                    return Err(self.not_comparable(left, right));
                }
                keys
            }
            (None, None) => {
                let (NodeKind::New { members: lm }, NodeKind::New { members: rm }) =
                    (self.ir.kind(left), self.ir.kind(right))
                else {
                    return Err(self.not_comparable(left, right));
                };
                let same = lm.len() == rm.len()
                    && lm.iter().all(|(name, _)| rm.iter().any(|(n, _)| n == name));
                if !same {
                    return Err(self.not_comparable(left, right));
                }
                lm.iter()
                    .map(|(name, value)| (name.clone(), self.ir.ty(*value).clone()))
                    .collect()
            }
            _ => return Err(self.not_comparable(left, right)),
        };

        let member_op = match op {
            BinaryOp::NE => BinaryOp::EQ,
            BinaryOp::NE2V => BinaryOp::EQ2V,
            other => other,
        };
        let mut terms = Vec::with_capacity(members.len());
        for (name, ty) in members {
            let l = self.ir.duplicate(left);
            let r = self.ir.duplicate(right);
            let l = self.access_member(l, &name, &ty, Scope::root())?;
            let r = self.access_member(r, &name, &ty, Scope::root())?;
            terms.push(self.translate_equals(member_op, l, r)?);
        }
        let mut result = match terms.split_first() {
            Some((&first, rest)) => rest
                .iter()
                .fold(first, |acc, &t| self.logical(BinaryOp::And, acc, t)),
            None => self.ir.bool_lit(true),
        };
        if negated {
            result = self.negate(result);
        }
        Ok(result)
    }

    pub(crate) fn not_comparable(&self, left: NodeId, right: NodeId) -> CompileError {
        CompileError::ComparisonNotSupported {
            left: self.ir.ty(left).display_name(),
            right: self.ir.ty(right).display_name(),
        }
    }
}
