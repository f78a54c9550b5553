//! Math and Decimal methods

use super::{Call, MethodLowerer};
use crate::error::CompileResult;
use crate::ir::{BinaryOp, NodeId, UnaryOp, When};
use qc_core::{MidpointRounding, Value, ValueType};

/// One-argument functions with a direct SQL counterpart
fn direct_function(method: &str) -> Option<&'static str> {
    let name = match method {
        "Abs" => "ABS",
        "Acos" => "ACOS",
        "Asin" => "ASIN",
        "Atan" => "ATAN",
        "Ceiling" => "CEILING",
        "Cos" => "COS",
        "Exp" => "EXP",
        "Floor" => "FLOOR",
        "Log10" => "LOG10",
        "Sign" => "SIGN",
        "Sin" => "SIN",
        "Sqrt" => "SQRT",
        "Tan" => "TAN",
        _ => return None,
    };
    Some(name)
}

impl<'a, 'c> MethodLowerer<'a, 'c> {
    pub(super) fn math_method(&mut self, call: &Call) -> CompileResult<NodeId> {
        let ty = call.ty.clone();
        let method = call.method.as_str();
        if let Some(name) = direct_function(method) {
            let [x] = call.args()?;
            return Ok(self.func(name, vec![x], ty));
        }
        match method {
            "Atan2" => {
                let [y, x] = call.args()?;
                Ok(self.func("ATN2", vec![y, x], ty))
            }
            "Pow" => {
                let [x, y] = call.args()?;
                Ok(self.func("POWER", vec![x, y], ty))
            }
            "Log" => match call.args.as_slice() {
                &[x] => Ok(self.func("LOG", vec![x], ty)),
                &[x, base] => {
                    let num = self.func("LOG", vec![x], ty.clone());
                    let den = self.func("LOG", vec![base], ty.clone());
                    Ok(self.bin_typed(BinaryOp::Div, num, den, &ty))
                }
                args => Err(call.form(format!("{} argument(s)", args.len()))),
            },
            "Cosh" | "Sinh" | "Tanh" => {
                let [x] = call.args()?;
                Ok(self.hyperbolic(method, x, &ty))
            }
            "Truncate" => {
                let [x] = call.args()?;
                let zero = self.int(0);
                let one = self.int(1);
                Ok(self.func("ROUND", vec![x, zero, one], ty))
            }
            "Max" | "Min" => {
                let [a, b] = call.args()?;
                let op = if method == "Max" {
                    BinaryOp::GT
                } else {
                    BinaryOp::LT
                };
                let (a2, b2) = (self.dup(a), self.dup(b));
                let test = self.bin(op, a, b);
                Ok(self.iif(test, a2, b2))
            }
            "Round" => self.round(call),
            _ => Err(call.unsupported()),
        }
    }

    pub(super) fn decimal_method(&mut self, call: &Call) -> CompileResult<NodeId> {
        let op = match call.method.as_str() {
            "Add" => BinaryOp::Add,
            "Subtract" => BinaryOp::Sub,
            "Multiply" => BinaryOp::Mul,
            "Divide" => BinaryOp::Div,
            "Remainder" => BinaryOp::Mod,
            "Negate" => {
                let [x] = call.args()?;
                return Ok(self.ir.unary(UnaryOp::Negate, x));
            }
            "Compare" => {
                let [a, b] = call.args()?;
                return Ok(self.compare(a, b));
            }
            _ => return self.math_method(call),
        };
        let [a, b] = call.args()?;
        Ok(self.bin_typed(op, a, b, &call.ty))
    }

    /// `(EXP(x) ± EXP(-x))` combinations
    fn hyperbolic(&mut self, method: &str, x: NodeId, ty: &ValueType) -> NodeId {
        let exp_pair = |this: &mut Self| {
            let copy = this.dup(x);
            let pos = this.func("EXP", vec![copy], ty.clone());
            let copy = this.dup(x);
            let neg = this.ir.unary(UnaryOp::Negate, copy);
            let neg = this.func("EXP", vec![neg], ty.clone());
            (pos, neg)
        };
        let (pos, neg) = exp_pair(self);
        match method {
            "Cosh" | "Sinh" => {
                let op = if method == "Cosh" {
                    BinaryOp::Add
                } else {
                    BinaryOp::Sub
                };
                let sum = self.bin_typed(op, pos, neg, ty);
                let two = self.int(2);
                self.bin_typed(BinaryOp::Div, sum, two, ty)
            }
            _ => {
                let num = self.bin_typed(BinaryOp::Sub, pos, neg, ty);
                let (pos, neg) = exp_pair(self);
                let den = self.bin_typed(BinaryOp::Add, pos, neg, ty);
                self.bin_typed(BinaryOp::Div, num, den, ty)
            }
        }
    }

    /// `Round(x [, digits], mode)`
    ///
    /// `ROUND` rounds half away from zero; half-to-even needs a CASE that
    /// detects the exact midpoint and rounds to the even neighbour.
    fn round(&mut self, call: &Call) -> CompileResult<NodeId> {
        let Some((&mode_arg, rest)) = call.args.split_last() else {
            return Err(call.form("no arguments"));
        };
        if !matches!(self.ir.ty(mode_arg).scalar_kind(), Some(qc_core::ScalarKind::Rounding)) {
            return Err(call.form("an explicit MidpointRounding argument is required"));
        }
        let mode = match self.ir.as_value(mode_arg) {
            Some(Value::Rounding(mode)) => *mode,
            _ => return Err(call.form("the MidpointRounding argument must be a constant")),
        };
        let (x, digits) = match *rest {
            [x] => (x, self.int(0)),
            [x, digits] => (x, digits),
            _ => return Err(call.form(format!("{} argument(s)", call.args.len()))),
        };
        let ty = call.ty.clone();
        if mode == MidpointRounding::AwayFromZero {
            return Ok(self.func("ROUND", vec![x, digits], ty));
        }

        // CASE WHEN 2*x = ROUND(2*x, d) AND x <> ROUND(x, d)
        //      THEN 2 * ROUND(x/2, d) ELSE ROUND(x, d) END
        let double_x = self.scaled(x, BinaryOp::Mul, &ty);
        let double_x2 = self.scaled(x, BinaryOp::Mul, &ty);
        let d = self.dup(digits);
        let rounded_double = self.func("ROUND", vec![double_x2, d], ty.clone());
        let on_midpoint = self.bin(BinaryOp::EQ, double_x, rounded_double);

        let x1 = self.dup(x);
        let x2 = self.dup(x);
        let d = self.dup(digits);
        let rounded = self.func("ROUND", vec![x2, d], ty.clone());
        let moved = self.bin(BinaryOp::NE, x1, rounded);
        let test = self.bin_typed(BinaryOp::And, on_midpoint, moved, &ValueType::bool());

        let half = self.scaled(x, BinaryOp::Div, &ty);
        let d = self.dup(digits);
        let rounded_half = self.func("ROUND", vec![half, d], ty.clone());
        let two = self.int(2);
        let even = self.bin_typed(BinaryOp::Mul, two, rounded_half, &ty);

        let plain = self.func("ROUND", vec![x, digits], ty);
        Ok(self.ir.searched_case(
            vec![When {
                test,
                value: even,
            }],
            plain,
        ))
    }

    /// `x * 2` or `x / 2` over a copy of `x`
    fn scaled(&mut self, x: NodeId, op: BinaryOp, ty: &ValueType) -> NodeId {
        let copy = self.dup(x);
        let two = self.int(2);
        self.bin_typed(op, copy, two, ty)
    }
}
