//! Aggregates
//!
//! Three shapes, tried in order:
//!
//! 1. the outermost operator: `SELECT AGG(e) FROM seq`
//! 2. an aggregate over a group: `AGG(e)` becomes a row column of the select
//!    carrying the GROUP BY and the aggregate is a reference to that column
//! 3. anything else: `SCALAR(SELECT AGG(e) FROM seq)`

use super::sequence::is_identity_lambda;
use super::{lambda_parts, Lowerer};
use crate::error::{CompileError, CompileResult};
use crate::ir::{AggregateFunc, NodeId, NodeKind, OrderingType, SubSelectKind, UnaryOp};
use qc_core::{QueryExpr, ScalarKind, ValueType};

impl Lowerer<'_, '_> {
    pub(crate) fn visit_aggregate<'q>(
        &mut self,
        func: AggregateFunc,
        source: &'q QueryExpr,
        selector: Option<&'q QueryExpr>,
        ty: &ValueType,
        outer: bool,
    ) -> CompileResult<NodeId> {
        let operator = func.sql_name();
        let is_count = func.is_count();
        let mut lambda = selector.filter(|l| !is_identity_lambda(l));

        let source_node = self.visit(source, false)?;
        let select = self.coerce_to_sequence(source_node)?;
        let (mut alias, mut aref) = self.alias_select(select);
        let mut group_source = source_node;

        // x.Select(e).Agg() is evaluated as x.Agg(e)
        if !outer && !is_count && lambda.is_none() {
            if let QueryExpr::Call {
                declaring,
                method,
                args,
                ..
            } = source.unquote()
            {
                let from = self.ir.select(select).and_then(|s| s.from);
                if let Some(from) = from {
                    if declaring.is_sequence_operator()
                        && method == "Select"
                        && args.len() == 2
                        && matches!(self.ir.kind(from), NodeKind::Alias { .. })
                    {
                        lambda = Some(&args[1]);
                        alias = from;
                        aref = self.ir.alias_ref(from);
                        group_source = from;
                    }
                }
            }
        }

        if let Some(l) = lambda {
            let (_, body) = lambda_parts(operator, l, 1)?;
            if !body.ty().is_simple() {
                return Err(CompileError::CannotAggregateType {
                    aggregate: operator.to_string(),
                    type_name: body.ty().display_name(),
                });
            }
        } else if !is_count && !source.ty().is_grouping() {
            let selection = self.selection(select)?;
            if !self.ir.ty(selection).is_simple() {
                return Err(CompileError::UnsupportedOverload {
                    operator: operator.to_string(),
                    detail: "a selector is required over a projection".to_string(),
                });
            }
        }

        if outer {
            let exp = match lambda {
                Some(l) => Some(self.visit_lambda(operator, l, &[aref])?),
                None => None,
            };
            let (arg, where_) = if is_count {
                (None, exp)
            } else {
                (Some(exp.unwrap_or(aref)), None)
            };
            let arg = arg.map(|a| self.simple(a));
            let agg = self.make_aggregate(func, arg, ty);
            let sel = self.ir.new_select(agg, Some(alias));
            if let Some(s) = self.ir.select_mut(sel) {
                s.where_ = where_;
                s.ordering = OrderingType::Never;
            }
            return Ok(sel);
        }

        if !is_count || lambda.is_none() {
            if let Some(info) = self.find_group_info(group_source) {
                log::debug!(
                    "Pushing {operator} into the grouped select {}",
                    info.select_with_group
                );
                let exp = match lambda {
                    Some(l) => Some(self.visit_lambda(
                        operator,
                        l,
                        &[info.element_on_group_source],
                    )?),
                    None if !is_count => Some(self.ir.duplicate(info.element_on_group_source)),
                    None => None,
                };
                let exp = exp.map(|e| self.simple(e));
                let agg = self.make_aggregate(func, exp, ty);
                let column = self.ir.column(None, agg);
                self.ir.push_row_column(info.select_with_group, column);
                return Ok(self.ir.column_ref(column));
            }
        }

        let exp = match lambda {
            Some(l) => Some(self.visit_lambda(operator, l, &[aref])?),
            None => None,
        };
        let (arg, where_) = if is_count {
            (None, exp)
        } else {
            let arg = match exp {
                Some(e) => self.simple(e),
                None => aref,
            };
            (Some(arg), None)
        };
        let agg = self.make_aggregate(func, arg, ty);
        let sel = self.ir.new_select(agg, Some(alias));
        if let Some(s) = self.ir.select_mut(sel) {
            s.where_ = where_;
        }
        Ok(self.ir.sub_select(SubSelectKind::Scalar, sel))
    }

    /// Marks an aggregate argument that may itself contain an aggregate
    fn simple(&mut self, expr: NodeId) -> NodeId {
        let ty = self.ir.ty(expr).clone();
        self.ir.add(NodeKind::Simple { expr }, ty)
    }

    fn make_aggregate(
        &mut self,
        func: AggregateFunc,
        arg: Option<NodeId>,
        ty: &ValueType,
    ) -> NodeId {
        // AVG over integers truncates unless the argument is widened first
        let arg = match arg {
            Some(a)
                if func == AggregateFunc::Avg
                    && self.ir.ty(a).scalar_kind().is_some_and(ScalarKind::is_integral)
                    && !ty.scalar_kind().is_some_and(ScalarKind::is_integral) =>
            {
                Some(self.ir.unary_typed(UnaryOp::Convert, a, ty.as_non_nullable()))
            }
            other => other,
        };
        self.ir.aggregate(func, arg, ty.clone())
    }
}
