//! Method and operator lowering
//!
//! Library calls that survive binding as `MethodCall` nodes are rewritten
//! here into expressions the target dialect understands: built-in
//! functions, arithmetic and CASE. Every recognized call has one lowering.
//! A method with no translation raises [`CompileError::UnsupportedMethod`];
//! a known method called with an argument shape it cannot take raises
//! [`CompileError::UnsupportedMethodForm`].

mod convert;
mod datetime;
mod math;
mod string;

use std::collections::HashMap;

use crate::context::CompileContext;
use crate::error::{CompileError, CompileResult};
use crate::ir::{BinaryOp, Ir, NodeId, NodeKind, UnaryOp, When};
use qc_core::{Declaring, ScalarKind, Value, ValueType};
use qc_sql::{ProviderType, SqlTypeKind};

/// Rewrite every method call under `root`
pub fn lower_methods(ir: &mut Ir, cx: &CompileContext<'_>, root: NodeId) -> CompileResult<NodeId> {
    let mut lowerer = MethodLowerer {
        ir,
        cx,
        done: HashMap::new(),
    };
    lowerer.visit(root)
}

/// One call being translated
pub(crate) struct Call {
    pub declaring: Declaring,
    pub method: String,
    pub target: Option<NodeId>,
    pub args: Vec<NodeId>,
    pub ty: ValueType,
}

impl Call {
    /// No translation exists for this method
    pub fn unsupported(&self) -> CompileError {
        CompileError::UnsupportedMethod {
            declaring: self.declaring.to_string(),
            method: self.method.clone(),
        }
    }

    /// The method exists but not in this form
    pub fn form(&self, detail: impl Into<String>) -> CompileError {
        CompileError::method_form(&self.declaring, &self.method, detail)
    }

    /// The receiver, required for instance calls and members
    pub fn this(&self) -> CompileResult<NodeId> {
        self.target
            .ok_or_else(|| self.form("an instance receiver is required"))
    }

    /// Exactly `n` arguments
    pub fn args<const N: usize>(&self) -> CompileResult<[NodeId; N]> {
        <[NodeId; N]>::try_from(self.args.as_slice())
            .map_err(|_| self.form(format!("{} argument(s)", self.args.len())))
    }
}

pub(crate) struct MethodLowerer<'a, 'c> {
    pub(crate) ir: &'a mut Ir,
    pub(crate) cx: &'a CompileContext<'c>,
    done: HashMap<NodeId, NodeId>,
}

impl<'a, 'c> MethodLowerer<'a, 'c> {
    fn visit(&mut self, id: NodeId) -> CompileResult<NodeId> {
        if let Some(&mapped) = self.done.get(&id) {
            return Ok(mapped);
        }
        let kids = self.ir.children(id);
        let mut mapped = Vec::with_capacity(kids.len());
        for kid in kids {
            mapped.push(self.visit(kid)?);
        }
        let mut kind = self.ir.kind(id).clone();
        for (slot, new) in kind.children_mut().into_iter().zip(mapped) {
            *slot = new;
        }
        let result = match kind {
            NodeKind::MethodCall {
                declaring,
                method,
                target,
                args,
            } => {
                let call = Call {
                    declaring,
                    method,
                    target,
                    args,
                    ty: self.ir.ty(id).clone(),
                };
                let lowered = self.translate(&call)?;
                log::debug!("Lowered {}.{} at {id} to {lowered}", call.declaring, call.method);
                lowered
            }
            kind => {
                self.ir.node_mut(id).kind = kind;
                id
            }
        };
        self.done.insert(id, result);
        Ok(result)
    }

    fn translate(&mut self, call: &Call) -> CompileResult<NodeId> {
        match &call.declaring {
            Declaring::String => self.string_method(call),
            Declaring::SqlMethods if call.method == "Like" => self.sql_like(call),
            Declaring::SqlMethods if call.method.starts_with("DateDiff") => self.date_diff(call),
            Declaring::Math => self.math_method(call),
            Declaring::Decimal => self.decimal_method(call),
            Declaring::DateTime | Declaring::DateTimeOffset => self.datetime_method(call),
            Declaring::TimeSpan => self.timespan_member(call),
            Declaring::Convert => self.convert_method(call),
            Declaring::Object => self.object_method(call),
            Declaring::Nullable => self.nullable_member(call),
            _ => Err(call.unsupported()),
        }
    }

    // building blocks shared by the method families

    pub(crate) fn func(&mut self, name: &str, args: Vec<NodeId>, ty: ValueType) -> NodeId {
        self.ir.function(name, args, ty)
    }

    /// Keyword argument such as the date part of `DATEADD`
    pub(crate) fn keyword(&mut self, name: &str) -> NodeId {
        self.ir.variable(name, ValueType::Unit)
    }

    pub(crate) fn int(&mut self, i: i64) -> NodeId {
        self.ir.int_lit(i)
    }

    pub(crate) fn long(&mut self, i: i64) -> NodeId {
        let id = self.ir.value(Value::Int(i), ValueType::int64());
        self.ir.node_mut(id).provider = Some(ProviderType::bigint());
        id
    }

    pub(crate) fn string_lit(&mut self, s: &str) -> NodeId {
        self.ir.value(Value::String(s.to_string()), ValueType::string())
    }

    /// Fresh copy of an operand used more than once
    pub(crate) fn dup(&mut self, id: NodeId) -> NodeId {
        self.ir.duplicate(id)
    }

    pub(crate) fn bin(&mut self, op: BinaryOp, left: NodeId, right: NodeId) -> NodeId {
        self.ir.binary(op, left, right)
    }

    pub(crate) fn bin_typed(
        &mut self,
        op: BinaryOp,
        left: NodeId,
        right: NodeId,
        ty: &ValueType,
    ) -> NodeId {
        self.ir.binary_typed(op, left, right, ty.clone())
    }

    /// `CONVERT(<provider>, x)`
    pub(crate) fn convert(&mut self, x: NodeId, ty: ValueType, provider: ProviderType) -> NodeId {
        let id = self.ir.unary_typed(UnaryOp::Convert, x, ty);
        self.ir.node_mut(id).provider = Some(provider);
        id
    }

    pub(crate) fn to_bigint(&mut self, x: NodeId) -> NodeId {
        let nullable = self.ir.ty(x).is_nullable();
        let ty = if nullable {
            ValueType::nullable(ScalarKind::Int64)
        } else {
            ValueType::int64()
        };
        self.convert(x, ty, ProviderType::bigint())
    }

    pub(crate) fn to_int(&mut self, x: NodeId) -> NodeId {
        let nullable = self.ir.ty(x).is_nullable();
        let ty = if nullable {
            ValueType::nullable(ScalarKind::Int32)
        } else {
            ValueType::int32()
        };
        self.convert(x, ty, ProviderType::int())
    }

    pub(crate) fn to_float(&mut self, x: NodeId) -> NodeId {
        let nullable = self.ir.ty(x).is_nullable();
        let ty = if nullable {
            ValueType::nullable(ScalarKind::Double)
        } else {
            ValueType::scalar(ScalarKind::Double)
        };
        self.convert(x, ty, ProviderType::simple(SqlTypeKind::Float))
    }

    /// `LEN(x)`
    pub(crate) fn len(&mut self, x: NodeId) -> NodeId {
        let ty = if self.ir.ty(x).is_nullable() {
            ValueType::nullable(ScalarKind::Int32)
        } else {
            ValueType::int32()
        };
        self.func("LEN", vec![x], ty)
    }

    /// `CASE WHEN test THEN a ELSE b END`
    pub(crate) fn iif(&mut self, test: NodeId, a: NodeId, b: NodeId) -> NodeId {
        self.ir.searched_case(vec![When { test, value: a }], b)
    }

    /// `x + 1`, folded for literals
    pub(crate) fn plus_one(&mut self, x: NodeId) -> NodeId {
        if let Some(i) = self.ir.as_value(x).and_then(Value::as_i64) {
            return self.int(i + 1);
        }
        let one = self.int(1);
        self.bin(BinaryOp::Add, x, one)
    }

    /// `Nullable<T>` members
    fn nullable_member(&mut self, call: &Call) -> CompileResult<NodeId> {
        let x = call.this()?;
        match (call.method.as_str(), call.args.len()) {
            ("HasValue", 0) => Ok(self.ir.unary(UnaryOp::IsNotNull, x)),
            ("Value", 0) => {
                let ty = self.ir.ty(x).as_non_nullable();
                self.ir.node_mut(x).ty = ty;
                Ok(x)
            }
            ("GetValueOrDefault", 0) => {
                let default = self.default_of(call, x)?;
                Ok(self.func("COALESCE", vec![x, default], call.ty.clone()))
            }
            ("GetValueOrDefault", 1) => {
                let [default] = call.args()?;
                Ok(self.func("COALESCE", vec![x, default], call.ty.clone()))
            }
            ("HasValue" | "Value" | "GetValueOrDefault", _) => {
                Err(call.form(format!("{} argument(s)", call.args.len())))
            }
            _ => Err(call.unsupported()),
        }
    }

    fn default_of(&mut self, call: &Call, x: NodeId) -> CompileResult<NodeId> {
        let ty = self.ir.ty(x).as_non_nullable();
        let value = match ty.scalar_kind() {
            Some(ScalarKind::Bool) => Value::Bool(false),
            Some(ScalarKind::Decimal) => Value::Decimal("0".to_string()),
            Some(ScalarKind::Single | ScalarKind::Double) => Value::Float(0.0),
            Some(ScalarKind::TimeSpan) => Value::TimeSpan(0),
            Some(kind) if kind.is_integral() => Value::Int(0),
            _ => {
                return Err(call.form(format!(
                    "no default value for {}",
                    ty.display_name()
                )))
            }
        };
        Ok(self.ir.value(value, ty))
    }

    /// `Equals` on any value
    fn object_method(&mut self, call: &Call) -> CompileResult<NodeId> {
        match (call.method.as_str(), call.target, call.args.as_slice()) {
            ("Equals", Some(a), &[b]) | ("Equals", None, &[a, b]) => {
                Ok(self.bin(BinaryOp::EQ, a, b))
            }
            ("ToString", Some(x), []) => Ok(self.to_nvarchar(x)),
            ("Equals" | "ToString", ..) => {
                Err(call.form(format!("{} argument(s)", call.args.len())))
            }
            _ => Err(call.unsupported()),
        }
    }
}

#[cfg(test)]
#[path = "methods_test.rs"]
mod tests;
