//! DateTime, DateTimeOffset and TimeSpan methods
//!
//! Time spans are stored as BIGINT ticks (100ns units). Differences are
//! computed as whole days plus a millisecond remainder since a plain
//! millisecond DATEDIFF overflows INT past roughly 24 days.

use super::{Call, MethodLowerer};
use crate::error::CompileResult;
use crate::ir::{BinaryOp, NodeId, UnaryOp};
use qc_core::{ProviderMode, ScalarKind, ValueType};
use qc_sql::{ProviderType, SqlTypeKind};

const TICKS_PER_MILLISECOND: i64 = 10_000;
const TICKS_PER_SECOND: i64 = 10_000_000;
const TICKS_PER_MINUTE: i64 = 600_000_000;
const TICKS_PER_HOUR: i64 = 36_000_000_000;
const TICKS_PER_DAY: i64 = 864_000_000_000;
const MILLISECONDS_PER_DAY: i64 = 86_400_000;

/// DATEPART name of a date member
fn date_part(member: &str) -> Option<&'static str> {
    let part = match member {
        "Year" => "YEAR",
        "Month" => "MONTH",
        "Day" => "DAY",
        "Hour" => "HOUR",
        "Minute" => "MINUTE",
        "Second" => "SECOND",
        "Millisecond" => "MILLISECOND",
        "DayOfYear" => "DAYOFYEAR",
        _ => return None,
    };
    Some(part)
}

/// DATEADD unit and milliseconds per unit of an `AddX` method
fn add_unit(method: &str) -> Option<(&'static str, Option<i64>)> {
    let unit = match method {
        "AddYears" => ("YEAR", None),
        "AddMonths" => ("MONTH", None),
        "AddDays" => ("DAY", Some(MILLISECONDS_PER_DAY)),
        "AddHours" => ("HOUR", Some(3_600_000)),
        "AddMinutes" => ("MINUTE", Some(60_000)),
        "AddSeconds" => ("SECOND", Some(1_000)),
        "AddMilliseconds" => ("MILLISECOND", None),
        _ => return None,
    };
    Some(unit)
}

impl<'a, 'c> MethodLowerer<'a, 'c> {
    pub(super) fn datetime_method(&mut self, call: &Call) -> CompileResult<NodeId> {
        let Some(x) = call.target else {
            return self.datetime_operator(call);
        };
        let method = call.method.as_str();
        if let Some(part) = date_part(method) {
            if !call.args.is_empty() {
                return Err(call.form("a date part takes no arguments"));
            }
            return Ok(self.datepart(part, x));
        }
        if let Some((unit, ms_per_unit)) = add_unit(method) {
            let [n] = call.args()?;
            return Ok(self.date_add(unit, ms_per_unit, n, x, &call.ty));
        }
        match (method, call.args.as_slice()) {
            ("DayOfWeek", []) => {
                // DATEPART(dw) depends on SET DATEFIRST; normalize to Sunday = 0
                let dw = self.datepart("WEEKDAY", x);
                let first = self.ir.variable("@@DATEFIRST", ValueType::int32());
                let shifted = self.bin(BinaryOp::Add, dw, first);
                let six = self.int(6);
                let shifted = self.bin(BinaryOp::Add, shifted, six);
                let seven = self.int(7);
                Ok(self.bin_typed(BinaryOp::Mod, shifted, seven, &call.ty))
            }
            ("Date", []) => Ok(self.date_only(x, &call.ty)),
            ("Add", &[span]) => Ok(self.add_ticks(x, span, &call.ty)),
            ("Subtract", &[other]) => Ok(self.subtract(x, other, &call.ty)),
            ("DayOfWeek" | "Date" | "Add" | "Subtract", args) => {
                Err(call.form(format!("{} argument(s)", args.len())))
            }
            _ => Err(call.unsupported()),
        }
    }

    /// `date + span`, `date - span` and `date - date`
    fn datetime_operator(&mut self, call: &Call) -> CompileResult<NodeId> {
        let [left, right] = match call.method.as_str() {
            "op_Addition" | "op_Subtraction" => call.args()?,
            _ => return Err(call.unsupported()),
        };
        if call.method == "op_Addition" {
            return Ok(self.add_ticks(left, right, &call.ty));
        }
        Ok(self.subtract(left, right, &call.ty))
    }

    fn subtract(&mut self, left: NodeId, right: NodeId, ty: &ValueType) -> NodeId {
        let right_is_date = matches!(
            self.ir.ty(right).scalar_kind(),
            Some(ScalarKind::DateTime | ScalarKind::DateTimeOffset)
        );
        if right_is_date {
            return self.date_difference(left, right, ty);
        }
        let negated = self.ir.unary(UnaryOp::Negate, right);
        self.add_ticks(left, negated, ty)
    }

    /// `SqlMethods.DateDiffX(start, end)`
    pub(super) fn date_diff(&mut self, call: &Call) -> CompileResult<NodeId> {
        let part = match call.method.trim_start_matches("DateDiff") {
            "Year" => "YEAR",
            "Month" => "MONTH",
            "Day" => "DAY",
            "Hour" => "HOUR",
            "Minute" => "MINUTE",
            "Second" => "SECOND",
            "Millisecond" => "MILLISECOND",
            "Microsecond" => "MICROSECOND",
            "Nanosecond" => "NANOSECOND",
            _ => return Err(call.unsupported()),
        };
        let [start, end] = call.args()?;
        let part = self.keyword(part);
        Ok(self.func("DATEDIFF", vec![part, start, end], call.ty.clone()))
    }

    pub(super) fn timespan_member(&mut self, call: &Call) -> CompileResult<NodeId> {
        let x = call.this()?;
        if !call.args.is_empty() {
            return Err(call.form(format!("{} argument(s)", call.args.len())));
        }
        let total = |method: &str| match method {
            "TotalMilliseconds" => Some(TICKS_PER_MILLISECOND),
            "TotalSeconds" => Some(TICKS_PER_SECOND),
            "TotalMinutes" => Some(TICKS_PER_MINUTE),
            "TotalHours" => Some(TICKS_PER_HOUR),
            "TotalDays" => Some(TICKS_PER_DAY),
            _ => None,
        };
        if let Some(per) = total(&call.method) {
            let x = self.to_float(x);
            let per = self.long(per);
            return Ok(self.bin_typed(BinaryOp::Div, x, per, &call.ty));
        }
        let (per, modulo) = match call.method.as_str() {
            "Ticks" => {
                let ty = call.ty.clone();
                self.ir.node_mut(x).ty = ty;
                return Ok(x);
            }
            "Milliseconds" => (TICKS_PER_MILLISECOND, Some(1_000)),
            "Seconds" => (TICKS_PER_SECOND, Some(60)),
            "Minutes" => (TICKS_PER_MINUTE, Some(60)),
            "Hours" => (TICKS_PER_HOUR, Some(24)),
            "Days" => (TICKS_PER_DAY, None),
            _ => return Err(call.unsupported()),
        };
        let ticks = self.to_bigint(x);
        let per = self.long(per);
        let mut part = self.bin(BinaryOp::Div, ticks, per);
        if let Some(modulo) = modulo {
            let modulo = self.long(modulo);
            part = self.bin(BinaryOp::Mod, part, modulo);
        }
        Ok(self.to_int(part))
    }

    fn datepart(&mut self, part: &str, x: NodeId) -> NodeId {
        let ty = if self.ir.ty(x).is_nullable() {
            ValueType::nullable(ScalarKind::Int32)
        } else {
            ValueType::int32()
        };
        let part = self.keyword(part);
        self.func("DATEPART", vec![part, x], ty)
    }

    /// `DATEADD(unit, n, x)`; fractional counts are applied in milliseconds
    fn date_add(
        &mut self,
        unit: &str,
        ms_per_unit: Option<i64>,
        n: NodeId,
        x: NodeId,
        ty: &ValueType,
    ) -> NodeId {
        let integral = self
            .ir
            .ty(n)
            .scalar_kind()
            .is_some_and(ScalarKind::is_integral);
        match ms_per_unit {
            Some(per) if !integral => {
                let per = self.long(per);
                let ms = self.bin(BinaryOp::Mul, n, per);
                let ms = self.to_bigint(ms);
                let unit = self.keyword("MILLISECOND");
                self.func("DATEADD", vec![unit, ms, x], ty.clone())
            }
            _ => {
                let unit = self.keyword(unit);
                self.func("DATEADD", vec![unit, n, x], ty.clone())
            }
        }
    }

    /// Midnight of a date
    fn date_only(&mut self, x: NodeId, ty: &ValueType) -> NodeId {
        if self.cx.provider() == ProviderMode::Sql2008 {
            return self.convert(x, ty.clone(), ProviderType::simple(SqlTypeKind::Date));
        }
        let mut acc = x;
        for part in ["HOUR", "MINUTE", "SECOND", "MILLISECOND"] {
            let source = self.dup(x);
            let amount = self.datepart(part, source);
            let back = self.ir.unary(UnaryOp::Negate, amount);
            let unit = self.keyword(part);
            acc = self.func("DATEADD", vec![unit, back, acc], ty.clone());
        }
        acc
    }

    /// `DATEADD(MILLISECOND, (t / 10000) % 86400000, DATEADD(DAY, t / 864000000000, d))`
    fn add_ticks(&mut self, date: NodeId, ticks: NodeId, ty: &ValueType) -> NodeId {
        let ticks_copy = self.dup(ticks);
        let per_day = self.long(TICKS_PER_DAY);
        let days = self.bin(BinaryOp::Div, ticks, per_day);
        let days = self.to_int(days);
        let day_unit = self.keyword("DAY");
        let shifted = self.func("DATEADD", vec![day_unit, days, date], ty.clone());

        let per_ms = self.long(TICKS_PER_MILLISECOND);
        let ms = self.bin(BinaryOp::Div, ticks_copy, per_ms);
        let ms_per_day = self.long(MILLISECONDS_PER_DAY);
        let ms = self.bin(BinaryOp::Mod, ms, ms_per_day);
        let ms = self.to_int(ms);
        let ms_unit = self.keyword("MILLISECOND");
        self.func("DATEADD", vec![ms_unit, ms, shifted], ty.clone())
    }

    /// Ticks between two dates
    fn date_difference(&mut self, end: NodeId, start: NodeId, ty: &ValueType) -> NodeId {
        let int_ty = ValueType::int32();
        let day_diff = |this: &mut Self| {
            let unit = this.keyword("DAY");
            let (s, e) = (this.dup(start), this.dup(end));
            this.func("DATEDIFF", vec![unit, s, e], int_ty.clone())
        };

        let days = day_diff(self);
        let days = self.to_bigint(days);
        let per_day = self.long(TICKS_PER_DAY);
        let day_ticks = self.bin(BinaryOp::Mul, days, per_day);

        let days = day_diff(self);
        let day_unit = self.keyword("DAY");
        let start_copy = self.dup(start);
        let start_ty = self.ir.ty(start).clone();
        let start_plus_days = self.func("DATEADD", vec![day_unit, days, start_copy], start_ty);
        let ms_unit = self.keyword("MILLISECOND");
        let ms = self.func("DATEDIFF", vec![ms_unit, start_plus_days, end], int_ty.clone());
        let ms = self.to_bigint(ms);
        let per_ms = self.long(TICKS_PER_MILLISECOND);
        let ms_ticks = self.bin(BinaryOp::Mul, ms, per_ms);

        self.bin_typed(BinaryOp::Add, day_ticks, ms_ticks, ty)
    }
}
