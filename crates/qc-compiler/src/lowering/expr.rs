//! Scalar expression lowering

use super::Lowerer;
use crate::error::{CompileError, CompileResult};
use crate::ir::{BinaryOp, NodeId, NodeKind, UnaryOp, When};
use qc_core::{
    BinaryOperator, CoreError, Declaring, FunctionKind, MemberInit, MemberName, QueryExpr,
    ScalarKind, TypeName, UnaryOperator, Value, ValueType,
};
use qc_sql::ConversionMethod;

impl Lowerer<'_, '_> {
    pub(crate) fn visit_constant(&mut self, value: &Value, ty: &ValueType) -> NodeId {
        self.ir.client_value(value.clone(), ty.clone())
    }

    /// Host variables always become query parameters
    pub(crate) fn visit_variable(
        &mut self,
        name: &str,
        value: Option<Value>,
        ty: &ValueType,
    ) -> NodeId {
        self.ir.add(
            NodeKind::Parameter {
                name: name.to_string(),
                value,
                outer: None,
            },
            ty.clone(),
        )
    }

    pub(crate) fn visit_member(
        &mut self,
        target: &QueryExpr,
        member: &MemberName,
        ty: &ValueType,
    ) -> CompileResult<NodeId> {
        let t = self.visit(target, false)?;
        Ok(self.ir.member(t, member, ty.clone()))
    }

    /// Library calls are kept as method calls for the method pass
    pub(crate) fn visit_method_call(
        &mut self,
        declaring: &Declaring,
        method: &str,
        target: Option<&QueryExpr>,
        args: &[QueryExpr],
        ty: &ValueType,
    ) -> CompileResult<NodeId> {
        if let Declaring::Other { name } = declaring {
            return Err(CompileError::UnsupportedMethod {
                declaring: name.clone(),
                method: method.to_string(),
            });
        }
        let target = match target {
            Some(t) => Some(self.visit(t, false)?),
            None => None,
        };
        let mut lowered = Vec::with_capacity(args.len());
        for a in args {
            lowered.push(self.visit(a, false)?);
        }
        Ok(self.ir.add(
            NodeKind::MethodCall {
                declaring: declaring.clone(),
                method: method.to_string(),
                target,
                args: lowered,
            },
            ty.clone(),
        ))
    }

    /// Calls of mapped database functions and stored procedures
    pub(crate) fn visit_mapped_function(
        &mut self,
        function: &str,
        args: &[QueryExpr],
        ty: &ValueType,
        outer: bool,
    ) -> CompileResult<NodeId> {
        let meta = self
            .cx
            .model
            .function(function)
            .ok_or_else(|| CompileError::UnsupportedMethod {
                declaring: "mapped function".to_string(),
                method: function.to_string(),
            })?
            .clone();
        if !meta.composable && !outer {
            return Err(CompileError::SprocsCannotBeComposed {
                name: meta.name.clone(),
            });
        }
        if meta.parameters.len() != args.len() {
            return Err(CompileError::UnsupportedOverload {
                operator: meta.name.clone(),
                detail: format!(
                    "expected {} arguments, got {}",
                    meta.parameters.len(),
                    args.len()
                ),
            });
        }

        let mut lowered = Vec::with_capacity(args.len());
        for (param, arg) in meta.parameters.iter().zip(args) {
            let node = self.visit(arg, false)?;
            let node = match &param.db_type {
                Some(db_type) => {
                    let provider = self.cx.types.parse_db_type(db_type)?;
                    let conv = self
                        .ir
                        .unary_typed(UnaryOp::Convert, node, param.ty.clone());
                    self.ir.node_mut(conv).provider = Some(provider);
                    conv
                }
                None => node,
            };
            lowered.push(node);
        }

        match meta.kind {
            FunctionKind::Procedure => {
                if !outer {
                    return Err(CompileError::SprocsCannotBeComposed { name: meta.name });
                }
                Ok(self.ir.add(
                    NodeKind::Exec {
                        function: meta.db_name,
                        args: lowered,
                    },
                    ty.clone(),
                ))
            }
            FunctionKind::Scalar => Ok(self.ir.function(&meta.db_name, lowered, meta.returns)),
            FunctionKind::TableValued => {
                let row_type = meta
                    .returns
                    .element_type()
                    .and_then(|e| e.entity_name())
                    .cloned()
                    .ok_or_else(|| CompileError::UnsupportedOverload {
                        operator: meta.name.clone(),
                        detail: "table-valued result must be a sequence of a mapped type"
                            .to_string(),
                    })?;
                let tvf = self.ir.add(
                    NodeKind::TableValuedFunction {
                        function: meta.name.clone(),
                        db_name: meta.db_name.clone(),
                        row_type,
                        args: lowered,
                        columns: Vec::new(),
                    },
                    meta.returns.clone(),
                );
                let (alias, aref) = self.alias_select(tvf);
                Ok(self.ir.new_select(aref, Some(alias)))
            }
        }
    }

    pub(crate) fn visit_binary(
        &mut self,
        op: BinaryOperator,
        left: &QueryExpr,
        right: &QueryExpr,
        ty: &ValueType,
    ) -> CompileResult<NodeId> {
        let lt = left.ty();
        let rt = right.ty();
        if matches!(op, BinaryOperator::Equal | BinaryOperator::NotEqual)
            && (lt.is_sequence() || rt.is_sequence())
        {
            return Err(CompileError::ComparisonNotSupported {
                left: lt.display_name(),
                right: rt.display_name(),
            });
        }

        if matches!(op, BinaryOperator::Add | BinaryOperator::Subtract)
            && lt.scalar_kind().is_some_and(ScalarKind::is_temporal)
        {
            let method = if op == BinaryOperator::Add {
                "op_Addition"
            } else {
                "op_Subtraction"
            };
            let declaring = match lt.scalar_kind() {
                Some(ScalarKind::DateTimeOffset) => Declaring::DateTimeOffset,
                _ => Declaring::DateTime,
            };
            return self.visit_method_call(
                &declaring,
                method,
                None,
                &[left.clone(), right.clone()],
                ty,
            );
        }

        let l = self.visit(left, false)?;
        let r = self.visit(right, false)?;
        let is_bool = ty.scalar_kind() == Some(ScalarKind::Bool);
        let node = match op {
            BinaryOperator::Add if lt.scalar_kind().is_some_and(ScalarKind::is_string_like) => {
                self.ir.binary_typed(BinaryOp::Concat, l, r, ty.clone())
            }
            BinaryOperator::Add => self.ir.binary_typed(BinaryOp::Add, l, r, ty.clone()),
            BinaryOperator::Subtract => self.ir.binary_typed(BinaryOp::Sub, l, r, ty.clone()),
            BinaryOperator::Multiply => self.ir.binary_typed(BinaryOp::Mul, l, r, ty.clone()),
            BinaryOperator::Divide => self.ir.binary_typed(BinaryOp::Div, l, r, ty.clone()),
            BinaryOperator::Modulo => self.ir.binary_typed(BinaryOp::Mod, l, r, ty.clone()),
            BinaryOperator::AndAlso => self.ir.binary(BinaryOp::And, l, r),
            BinaryOperator::OrElse => self.ir.binary(BinaryOp::Or, l, r),
            BinaryOperator::And if is_bool => self.ir.binary(BinaryOp::And, l, r),
            BinaryOperator::Or if is_bool => self.ir.binary(BinaryOp::Or, l, r),
            BinaryOperator::And => self.ir.binary_typed(BinaryOp::BitAnd, l, r, ty.clone()),
            BinaryOperator::Or => self.ir.binary_typed(BinaryOp::BitOr, l, r, ty.clone()),
            BinaryOperator::ExclusiveOr if is_bool => self.ir.binary(BinaryOp::NE, l, r),
            BinaryOperator::ExclusiveOr => {
                self.ir.binary_typed(BinaryOp::BitXor, l, r, ty.clone())
            }
            BinaryOperator::Equal => self.ir.binary(BinaryOp::EQ, l, r),
            BinaryOperator::NotEqual => self.ir.binary(BinaryOp::NE, l, r),
            BinaryOperator::LessThan => self.ir.binary(BinaryOp::LT, l, r),
            BinaryOperator::LessThanOrEqual => self.ir.binary(BinaryOp::LE, l, r),
            BinaryOperator::GreaterThan => self.ir.binary(BinaryOp::GT, l, r),
            BinaryOperator::GreaterThanOrEqual => self.ir.binary(BinaryOp::GE, l, r),
            BinaryOperator::Coalesce => {
                if ty.is_simple() {
                    self.ir.function("COALESCE", vec![l, r], ty.clone())
                } else {
                    let test_l = self.ir.duplicate(l);
                    let test = self.ir.unary(UnaryOp::IsNotNull, test_l);
                    self.ir.searched_case(vec![When { test, value: l }], r)
                }
            }
            BinaryOperator::Power => self.ir.function("POWER", vec![l, r], ty.clone()),
            BinaryOperator::LeftShift | BinaryOperator::RightShift => {
                let two = self.ir.int_lit(2);
                let factor = self.ir.function("POWER", vec![two, r], rt.clone());
                let op = if op == BinaryOperator::LeftShift {
                    BinaryOp::Mul
                } else {
                    BinaryOp::Div
                };
                self.ir.binary_typed(op, l, factor, ty.clone())
            }
        };
        Ok(node)
    }

    pub(crate) fn visit_unary(
        &mut self,
        op: UnaryOperator,
        operand: &QueryExpr,
        ty: &ValueType,
    ) -> CompileResult<NodeId> {
        if op == UnaryOperator::Quote {
            return Err(CompileError::unsupported("a quoted lambda used as a value"));
        }
        let x = self.visit(operand, false)?;
        let node = match op {
            UnaryOperator::Not if ty.scalar_kind() == Some(ScalarKind::Bool) => {
                self.ir.unary(UnaryOp::Not, x)
            }
            UnaryOperator::Not => self.ir.unary_typed(UnaryOp::BitNot, x, ty.clone()),
            UnaryOperator::Negate => self.ir.unary_typed(UnaryOp::Negate, x, ty.clone()),
            UnaryOperator::UnaryPlus => x,
            UnaryOperator::ArrayLength => {
                self.ir.function("DATALENGTH", vec![x], ty.clone())
            }
            UnaryOperator::Convert => {
                let from = operand.ty();
                match self.cx.types.conversion_method(&from, ty) {
                    ConversionMethod::Treat => self.ir.unary_typed(UnaryOp::Treat, x, ty.clone()),
                    ConversionMethod::Ignore | ConversionMethod::Lift => {
                        self.ir.node_mut(x).ty = ty.clone();
                        x
                    }
                    ConversionMethod::Convert => {
                        self.ir.unary_typed(UnaryOp::Convert, x, ty.clone())
                    }
                }
            }
            UnaryOperator::Quote => x,
        };
        Ok(node)
    }

    /// `test ? a : b`; nested conditionals in the else branch share one CASE
    pub(crate) fn visit_conditional(
        &mut self,
        test: &QueryExpr,
        if_true: &QueryExpr,
        if_false: &QueryExpr,
    ) -> CompileResult<NodeId> {
        let mut whens = vec![When {
            test: self.visit(test, false)?,
            value: self.visit(if_true, false)?,
        }];
        let mut else_ = if_false;
        while let QueryExpr::Conditional {
            test,
            if_true,
            if_false,
            ..
        } = else_
        {
            whens.push(When {
                test: self.visit(test, false)?,
                value: self.visit(if_true, false)?,
            });
            else_ = if_false;
        }
        let else_node = self.visit(else_, false)?;
        Ok(self.ir.searched_case(whens, else_node))
    }

    pub(crate) fn visit_new(
        &mut self,
        ty: &ValueType,
        members: &[MemberInit],
    ) -> CompileResult<NodeId> {
        if let ValueType::Entity { name } = ty {
            if self.cx.model.meta_type(name).is_some() {
                return Err(CompileError::EntityConstructionNotAllowed {
                    type_name: name.to_string(),
                });
            }
        }
        let mut lowered = Vec::with_capacity(members.len());
        for m in members {
            lowered.push((m.member.clone(), self.visit_expression(&m.value)?));
        }
        Ok(self.ir.add(NodeKind::New { members: lowered }, ty.clone()))
    }

    /// `x is T` becomes `TREAT(x AS T) IS NOT NULL`
    pub(crate) fn visit_type_is(
        &mut self,
        operand: &QueryExpr,
        type_name: &TypeName,
    ) -> CompileResult<NodeId> {
        let treat = self.visit_type_as(operand, type_name)?;
        Ok(self.ir.unary(UnaryOp::IsNotNull, treat))
    }

    pub(crate) fn visit_type_as(
        &mut self,
        operand: &QueryExpr,
        type_name: &TypeName,
    ) -> CompileResult<NodeId> {
        if self.cx.model.meta_type(type_name).is_none() {
            return Err(CoreError::UnmappedType {
                type_name: type_name.to_string(),
            }
            .into());
        }
        let x = self.visit(operand, false)?;
        Ok(self.ir.unary_typed(
            UnaryOp::Treat,
            x,
            ValueType::Entity {
                name: type_name.clone(),
            },
        ))
    }

    /// Beta-reduce an invocation of a literal lambda with constant arguments
    pub(crate) fn visit_invoke(
        &mut self,
        lambda: &QueryExpr,
        args: &[QueryExpr],
    ) -> CompileResult<NodeId> {
        let constant_args = args
            .iter()
            .all(|a| matches!(a, QueryExpr::Constant { .. } | QueryExpr::Variable { .. }));
        match lambda.as_lambda() {
            Some((params, body)) if params.len() == args.len() && constant_args => {
                let mut bound = Vec::with_capacity(args.len());
                for a in args {
                    bound.push(self.visit(a, false)?);
                }
                let bindings = params.iter().zip(bound).collect();
                self.with_bindings(bindings, |this| this.visit(body, false))
            }
            _ => Err(CompileError::ConstantRequired {
                operator: "Invoke".to_string(),
                found: lambda.describe(),
            }),
        }
    }
}

#[cfg(test)]
#[path = "expr_test.rs"]
mod tests;
