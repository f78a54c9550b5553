//! Unary operators, boolean folding and CASE simplification

use super::Binder;
use crate::error::CompileResult;
use crate::ir::{BinaryOp, NodeId, NodeKind, SubSelectKind, TypeWhen, UnaryOp, When};
use qc_core::{MetaModel, Value, ValueType};

impl<'a, 'c> Binder<'a, 'c> {
    /// Rebuild a unary node over a bound operand
    pub(crate) fn bind_unary(
        &mut self,
        id: NodeId,
        op: UnaryOp,
        operand: NodeId,
    ) -> CompileResult<NodeId> {
        match op {
            UnaryOp::OuterJoinedValue => Ok(self.outer_joined(operand)),
            UnaryOp::Treat => {
                let ty = self.ir.ty(id).clone();
                self.treat(operand, &ty)
            }
            UnaryOp::IsNull | UnaryOp::IsNotNull => self.null_test(op, operand),
            UnaryOp::Not => Ok(self.negate(operand)),
            UnaryOp::Not2V => Ok(self.negate_2v(operand)),
            UnaryOp::Convert if !self.ir.ty(operand).is_simple() => Ok(operand),
            _ => {
                if let NodeKind::Unary { operand: o, .. } = self.ir.kind_mut(id) {
                    *o = operand;
                }
                Ok(id)
            }
        }
    }

    /// `left AND right` / `left OR right` with literal operands folded
    pub(crate) fn logical(&mut self, op: BinaryOp, left: NodeId, right: NodeId) -> NodeId {
        let (l, r) = (self.ir.as_bool(left), self.ir.as_bool(right));
        match op {
            BinaryOp::And => match (l, r) {
                (Some(true), _) => right,
                (_, Some(true)) => left,
                (Some(false), _) | (_, Some(false)) => self.ir.bool_lit(false),
                _ => self.ir.binary(op, left, right),
            },
            _ => match (l, r) {
                (Some(false), _) => right,
                (_, Some(false)) => left,
                (Some(true), _) | (_, Some(true)) => self.ir.bool_lit(true),
                _ => self.ir.binary(op, left, right),
            },
        }
    }

    /// `NOT p`, folded where the operand allows it
    pub(crate) fn negate(&mut self, p: NodeId) -> NodeId {
        if let Some(b) = self.ir.as_bool(p) {
            return self.ir.bool_lit(!b);
        }
        match self.ir.kind(p).clone() {
            NodeKind::Unary {
                op: UnaryOp::Not,
                operand,
            } => operand,
            NodeKind::Unary {
                op: UnaryOp::IsNull,
                operand,
            } => self.ir.unary(UnaryOp::IsNotNull, operand),
            NodeKind::Unary {
                op: UnaryOp::IsNotNull,
                operand,
            } => self.ir.unary(UnaryOp::IsNull, operand),
            NodeKind::Binary { op, left, right } if op.is_comparison() => {
                let inverse = match op {
                    BinaryOp::EQ => BinaryOp::NE,
                    BinaryOp::NE => BinaryOp::EQ,
                    BinaryOp::EQ2V => BinaryOp::NE2V,
                    BinaryOp::NE2V => BinaryOp::EQ2V,
                    BinaryOp::LT => BinaryOp::GE,
                    BinaryOp::LE => BinaryOp::GT,
                    BinaryOp::GT => BinaryOp::LE,
                    BinaryOp::GE => BinaryOp::LT,
                    _ => return self.ir.unary(UnaryOp::Not, p),
                };
                let ty = self.ir.ty(p).clone();
                self.ir.binary_typed(inverse, left, right, ty)
            }
            _ => self.ir.unary(UnaryOp::Not, p),
        }
    }

    /// Two-valued NOT: NULL counts as false, so the result is true
    pub(crate) fn negate_2v(&mut self, p: NodeId) -> NodeId {
        if !self.ir.ty(p).is_nullable() {
            return self.negate(p);
        }
        let bit = self.ir.case_bool(p, 1, 0);
        let zero = self.ir.int_lit(0);
        self.ir.binary(BinaryOp::EQ, bit, zero)
    }

    /// `x IS [NOT] NULL` for any bound value
    pub(crate) fn null_test(&mut self, op: UnaryOp, x: NodeId) -> CompileResult<NodeId> {
        let is_null = op == UnaryOp::IsNull;
        if let Some(v) = self.ir.as_value(x) {
            let null = v.is_null();
            return Ok(self.ir.bool_lit(null == is_null));
        }
        match self.ir.kind(x).clone() {
            NodeKind::New { members } => {
                let Some(name) = self.ir.ty(x).entity_name().cloned() else {
                    // a constructed record is never NULL
                    return Ok(self.ir.bool_lit(!is_null));
                };
                let meta = self.meta(&name)?;
                let root = self.meta(meta.root_name())?;
                let key = root
                    .identity_members()
                    .first()
                    .and_then(|k| members.iter().find(|(m, _)| *m == k.name))
                    .map(|(_, v)| *v);
                match key {
                    Some(key) => {
                        let key = self.ir.duplicate(key);
                        self.null_test(op, key)
                    }
                    None => Ok(self.ir.bool_lit(!is_null)),
                }
            }
            NodeKind::TypeCase {
                discriminator,
                whens,
            } => self.type_case_null_test(is_null, discriminator, &whens),
            NodeKind::OptionalValue { has_value, .. } => {
                let has_value = self.ir.duplicate(has_value);
                Ok(self.ir.unary(op, has_value))
            }
            NodeKind::Grouping { .. }
            | NodeKind::SubSelect {
                kind: SubSelectKind::Multiset,
                ..
            } => Ok(self.ir.bool_lit(!is_null)),
            NodeKind::SubSelect {
                kind: SubSelectKind::Element,
                select,
            } => {
                let exists = self.ir.sub_select(SubSelectKind::Exists, select);
                let exists = self.visit(exists, super::Scope::root())?;
                Ok(if is_null { self.negate(exists) } else { exists })
            }
            _ => Ok(self.ir.unary(op, x)),
        }
    }

    fn type_case_null_test(
        &mut self,
        is_null: bool,
        discriminator: NodeId,
        whens: &[TypeWhen],
    ) -> CompileResult<NodeId> {
        let present: Vec<&TypeWhen> = whens
            .iter()
            .filter(|w| !matches!(self.ir.as_value(w.binding), Some(Value::Null)))
            .collect();
        if present.len() == whens.len() {
            let disc = self.ir.duplicate(discriminator);
            let op = if is_null {
                UnaryOp::IsNull
            } else {
                UnaryOp::IsNotNull
            };
            return Ok(self.ir.unary(op, disc));
        }
        let disc_ty = self.ir.ty(discriminator).clone();
        let mut terms = Vec::with_capacity(present.len());
        for w in present {
            let Some(code) = &w.code else {
                continue;
            };
            let disc = self.ir.duplicate(discriminator);
            let code = self.ir.value(code.clone(), disc_ty.clone());
            terms.push(self.ir.binary(BinaryOp::EQ, disc, code));
        }
        let matched = match self.ir.or_all(terms) {
            Some(m) => m,
            None => self.ir.bool_lit(false),
        };
        Ok(if is_null {
            self.negate_2v(matched)
        } else {
            matched
        })
    }

    /// `x as T` for structured values
    pub(crate) fn treat(&mut self, x: NodeId, ty: &ValueType) -> CompileResult<NodeId> {
        let Some(target) = ty.entity_name().cloned() else {
            return Ok(self.ir.unary_typed(UnaryOp::Treat, x, ty.clone()));
        };
        let model: &'c dyn MetaModel = self.cx.model;
        match self.ir.kind(x).clone() {
            NodeKind::TypeCase {
                discriminator,
                whens,
            } => {
                let mut arms = Vec::with_capacity(whens.len());
                let mut any = false;
                for w in whens {
                    let binding = if model.is_assignable(&w.type_name, &target) {
                        any = true;
                        w.binding
                    } else {
                        self.ir.null(ty.clone())
                    };
                    arms.push(TypeWhen { binding, ..w });
                }
                if !any {
                    return Ok(self.ir.null(ty.clone()));
                }
                Ok(self.ir.add(
                    NodeKind::TypeCase {
                        discriminator,
                        whens: arms,
                    },
                    ty.clone(),
                ))
            }
            NodeKind::New { .. } => {
                let assignable = self
                    .ir
                    .ty(x)
                    .entity_name()
                    .is_some_and(|name| model.is_assignable(name, &target));
                Ok(if assignable { x } else { self.ir.null(ty.clone()) })
            }
            NodeKind::Value {
                value: Value::Object(obj),
                ..
            } => Ok(if model.is_assignable(&obj.type_name, &target) {
                x
            } else {
                self.ir.null(ty.clone())
            }),
            NodeKind::Value { .. } => Ok(x),
            _ => Ok(self.ir.unary_typed(UnaryOp::Treat, x, ty.clone())),
        }
    }

    /// Fold literal arms of a bound searched CASE
    pub(crate) fn simplify_case(&mut self, id: NodeId) -> CompileResult<NodeId> {
        let NodeKind::SearchedCase { whens, else_ } = self.ir.kind(id).clone() else {
            return Ok(id);
        };
        let mut kept = Vec::with_capacity(whens.len());
        let mut else_ = else_;
        for w in whens {
            match self.ir.as_bool(w.test) {
                Some(false) => continue,
                Some(true) => {
                    else_ = w.value;
                    break;
                }
                None => kept.push(w),
            }
        }
        if kept.is_empty() {
            return Ok(else_);
        }

        if kept.len() == 1 && !self.ir.ty(kept[0].test).is_nullable() {
            let When { test, value } = kept[0];
            match (self.ir.as_bool(value), self.ir.as_bool(else_)) {
                (Some(true), Some(false)) => return Ok(test),
                (Some(false), Some(true)) => return Ok(self.negate(test)),
                (_, Some(false)) if self.is_predicate(value) => {
                    return Ok(self.logical(BinaryOp::And, test, value))
                }
                (_, Some(true)) if self.is_predicate(value) => {
                    let not = self.negate(test);
                    return Ok(self.logical(BinaryOp::Or, not, value));
                }
                _ => {}
            }
        }

        let structured = kept.iter().any(|w| !self.ir.ty(w.value).is_simple())
            || !self.ir.ty(else_).is_simple();
        if !structured {
            let ty = self.ir.ty(id).clone();
            return Ok(self.ir.add(NodeKind::SearchedCase { whens: kept, else_ }, ty));
        }

        // structured arms are chosen on the client by arm number
        let mut numbered = Vec::with_capacity(kept.len());
        let mut arms = Vec::with_capacity(kept.len());
        for (i, w) in kept.iter().enumerate() {
            let n = self.ir.int_lit(i as i64);
            numbered.push(When {
                test: w.test,
                value: n,
            });
            let test = self.ir.int_lit(i as i64);
            arms.push(When {
                test,
                value: w.value,
            });
        }
        let last = self.ir.int_lit(kept.len() as i64);
        let discriminator = self.ir.searched_case(numbered, last);
        let ty = self.ir.ty(id).clone();
        Ok(self.ir.add(
            NodeKind::ClientCase {
                discriminator,
                whens: arms,
                else_: Some(else_),
            },
            ty,
        ))
    }

    fn is_predicate(&self, id: NodeId) -> bool {
        let ty = self.ir.ty(id);
        ty.scalar_kind() == Some(qc_core::ScalarKind::Bool) && !ty.is_nullable()
    }
}
