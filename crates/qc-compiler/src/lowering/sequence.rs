//! Sequence operators

use super::{lambda_parts, Lowerer};
use crate::error::{CompileError, CompileResult};
use crate::ir::{
    AggregateFunc, BinaryOp, JoinKind, NodeId, NodeKind, OrderExpr, OrderKind, OrderingType,
    SubSelectKind, UnaryOp, When,
};
use qc_core::{CoreError, Declaring, QueryExpr, TypeName, Value, ValueType};
use qc_sql::ConversionMethod;

/// Checks the argument count of an operator call
fn expect_args(method: &str, args: &[QueryExpr], allowed: &[usize]) -> CompileResult<()> {
    if allowed.contains(&args.len()) {
        Ok(())
    } else {
        Err(CompileError::UnsupportedOverload {
            operator: method.to_string(),
            detail: format!("{} arguments", args.len()),
        })
    }
}

/// Groupings and nested sequences cannot be compared row by row
pub(crate) fn is_hierarchical(ty: &ValueType) -> bool {
    match ty {
        ValueType::Sequence { .. } | ValueType::Grouping { .. } => true,
        ValueType::Record { fields } => fields.iter().any(|f| is_hierarchical(&f.ty)),
        _ => false,
    }
}

impl Lowerer<'_, '_> {
    fn check_context(&self, construct: &str, context: Option<&str>) -> CompileResult<()> {
        match (context, self.cx.context_id()) {
            (Some(found), Some(expected)) if found != expected => {
                Err(CompileError::WrongDataContext {
                    construct: construct.to_string(),
                    expected: expected.to_string(),
                    found: found.to_string(),
                })
            }
            _ => Ok(()),
        }
    }

    /// `SELECT t FROM table AS t`
    pub(crate) fn visit_table(
        &mut self,
        row_type: &TypeName,
        context: Option<&str>,
    ) -> CompileResult<NodeId> {
        self.check_context(&format!("Table<{row_type}>"), context)?;
        let table = self.table_node(row_type)?;
        let (alias, aref) = self.alias_select(table);
        Ok(self.ir.new_select(aref, Some(alias)))
    }

    /// Bare table node for a mapped type
    pub(crate) fn table_node(&mut self, row_type: &TypeName) -> CompileResult<NodeId> {
        let name = self
            .cx
            .model
            .table_name(row_type)
            .ok_or_else(|| CoreError::UnmappedType {
                type_name: row_type.to_string(),
            })?
            .to_string();
        Ok(self.ir.add(
            NodeKind::Table {
                row_type: row_type.clone(),
                name,
                columns: Vec::new(),
            },
            ValueType::sequence(ValueType::Entity {
                name: row_type.clone(),
            }),
        ))
    }

    pub(crate) fn visit_queryable(
        &mut self,
        name: &str,
        context: Option<&str>,
        outer: bool,
    ) -> CompileResult<NodeId> {
        self.check_context(&format!("queryable '{name}'"), context)?;
        if self.expanding.iter().any(|n| n == name) {
            return Err(CompileError::SelfReferencingQuery {
                name: name.to_string(),
            });
        }
        let expansion = self
            .cx
            .session
            .resolve_queryable(name)
            .ok_or_else(|| CompileError::unsupported(format!("unknown queryable '{name}'")))?
            .clone();
        self.expanding.push(name.to_string());
        let result = self.visit(&expansion, outer);
        self.expanding.pop();
        result
    }

    pub(crate) fn visit_sequence_call(
        &mut self,
        declaring: &Declaring,
        method: &str,
        args: &[QueryExpr],
        ty: &ValueType,
        outer: bool,
    ) -> CompileResult<NodeId> {
        log::trace!("Lowering sequence operator {method}");
        match method {
            "Select" => {
                expect_args(method, args, &[2])?;
                self.visit_select(&args[0], &args[1])
            }
            "SelectMany" => {
                expect_args(method, args, &[2, 3])?;
                self.visit_select_many(&args[0], &args[1], args.get(2))
            }
            "Where" => {
                expect_args(method, args, &[2])?;
                self.visit_where(&args[0], &args[1])
            }
            "Join" => {
                expect_args(method, args, &[5])?;
                self.visit_join(&args[0], &args[1], &args[2], &args[3], &args[4])
            }
            "GroupJoin" => {
                expect_args(method, args, &[5])?;
                self.visit_group_join(&args[0], &args[1], &args[2], &args[3], &args[4])
            }
            "GroupBy" => {
                expect_args(method, args, &[2, 3, 4])?;
                self.visit_group_by(args)
            }
            "OrderBy" | "OrderByDescending" | "ThenBy" | "ThenByDescending" => {
                expect_args(method, args, &[2])?;
                let kind = if method.ends_with("Descending") {
                    OrderKind::Descending
                } else {
                    OrderKind::Ascending
                };
                self.visit_order_by(&args[0], &args[1], kind, method.starts_with("Then"))
            }
            "Take" => {
                expect_args(method, args, &[2])?;
                self.visit_take(&args[0], &args[1])
            }
            "Skip" => {
                expect_args(method, args, &[2])?;
                self.visit_skip(&args[0], &args[1])
            }
            "Distinct" => {
                expect_args(method, args, &[1])?;
                self.visit_distinct(&args[0])
            }
            "Union" | "Concat" => {
                expect_args(method, args, &[2])?;
                self.visit_union(&args[0], &args[1], method == "Concat")
            }
            "Intersect" | "Except" => {
                expect_args(method, args, &[2])?;
                self.visit_intersect(method, &args[0], &args[1], method == "Intersect")
            }
            "Any" => {
                expect_args(method, args, &[1, 2])?;
                self.visit_quantifier(method, &args[0], args.get(1), true, outer)
            }
            "All" => {
                expect_args(method, args, &[2])?;
                self.visit_quantifier(method, &args[0], args.get(1), false, outer)
            }
            "Contains" => {
                expect_args(method, args, &[2])?;
                self.visit_contains(&args[0], &args[1], outer)
            }
            "Count" | "LongCount" | "Sum" | "Min" | "Max" | "Average" => {
                expect_args(method, args, &[1, 2])?;
                let func = match method {
                    "Count" => AggregateFunc::Count,
                    "LongCount" => AggregateFunc::LongCount,
                    "Sum" => AggregateFunc::Sum,
                    "Min" => AggregateFunc::Min,
                    "Max" => AggregateFunc::Max,
                    _ => AggregateFunc::Avg,
                };
                self.visit_aggregate(func, &args[0], args.get(1), ty, outer)
            }
            "First" | "FirstOrDefault" | "Single" | "SingleOrDefault" => {
                expect_args(method, args, &[1, 2])?;
                self.visit_first(&args[0], args.get(1), method.starts_with("First"), outer)
            }
            "Cast" => {
                expect_args(method, args, &[1])?;
                self.visit_cast(&args[0], ty)
            }
            "OfType" => {
                expect_args(method, args, &[1])?;
                self.visit_of_type(&args[0], ty)
            }
            "DefaultIfEmpty" => {
                expect_args(method, args, &[1])?;
                self.visit_default_if_empty(&args[0])
            }
            "AsQueryable" | "AsEnumerable" => {
                expect_args(method, args, &[1])?;
                self.visit(&args[0], outer)
            }
            _ => Err(CompileError::UnsupportedMethod {
                declaring: declaring.to_string(),
                method: method.to_string(),
            }),
        }
    }

    fn visit_select(&mut self, source: &QueryExpr, selector: &QueryExpr) -> CompileResult<NodeId> {
        let select = self.visit_sequence(source)?;
        let (alias, aref) = self.alias_select(select);
        let projection = self.visit_lambda("Select", selector, &[aref])?;
        let projection = self.as_expression(projection);
        self.project(alias, projection)
    }

    /// Select `projection` from `from`, turning a correlated single-row
    /// projection into an OUTER APPLY when the dialect allows it
    pub(crate) fn project(&mut self, from: NodeId, projection: NodeId) -> CompileResult<NodeId> {
        let inner = match self.ir.kind(projection) {
            NodeKind::SubSelect {
                kind: kind @ (SubSelectKind::Element | SubSelectKind::Scalar),
                select,
            } if self.cx.strategy.can_use_outer_apply => Some((*kind, *select)),
            _ => None,
        };
        let Some((kind, inner)) = inner else {
            return Ok(self.ir.new_select(projection, Some(from)));
        };

        log::debug!("Rewriting correlated {kind:?} projection into OUTER APPLY");
        let (inner_alias, inner_ref) = self.alias_select(inner);
        let value = self.ir.unary(UnaryOp::OuterJoinedValue, inner_ref);
        let selection = match kind {
            SubSelectKind::Element => self.optional_value(inner, value),
            _ => value,
        };
        let join = self.ir.join(JoinKind::OuterApply, from, inner_alias, None);
        Ok(self.ir.new_select(selection, Some(join)))
    }

    /// Pair `value` with a "has a row" flag column added to `select`
    pub(crate) fn optional_value(&mut self, select: NodeId, value: NodeId) -> NodeId {
        let one = self.ir.int_lit(1);
        let test = self.ir.column(Some("test".to_string()), one);
        self.ir.push_row_column(select, test);
        let test_ref = self.ir.column_ref(test);
        let has_value = self.ir.unary(UnaryOp::OuterJoinedValue, test_ref);
        let ty = self.ir.ty(value).clone();
        self.ir.add(NodeKind::OptionalValue { has_value, value }, ty)
    }

    fn visit_select_many(
        &mut self,
        source: &QueryExpr,
        collection: &QueryExpr,
        result: Option<&QueryExpr>,
    ) -> CompileResult<NodeId> {
        let select = self.visit_sequence(source)?;
        let (alias, aref) = self.alias_select(select);
        let inner = self.visit_lambda("SelectMany", collection, &[aref])?;
        let inner = self.coerce_to_sequence(inner)?;
        let (inner_alias, inner_ref) = self.alias_select(inner);
        let join = self.ir.join(JoinKind::CrossApply, alias, inner_alias, None);
        let projection = match result {
            Some(result) => {
                let body = self.visit_lambda("SelectMany", result, &[aref, inner_ref])?;
                self.as_expression(body)
            }
            None => inner_ref,
        };
        Ok(self.ir.new_select(projection, Some(join)))
    }

    fn visit_where(&mut self, source: &QueryExpr, predicate: &QueryExpr) -> CompileResult<NodeId> {
        let select = self.visit_sequence(source)?;
        let select = self.lock_select(select);
        let row = self.selection(select)?;
        let pred = self.visit_lambda("Where", predicate, &[row])?;
        let existing = self.ir.select(select).and_then(|s| s.where_);
        let combined = self.ir.and_opt(existing, Some(pred));
        if let Some(s) = self.ir.select_mut(select) {
            s.where_ = combined;
        }
        Ok(select)
    }

    fn visit_join(
        &mut self,
        outer: &QueryExpr,
        inner: &QueryExpr,
        outer_key: &QueryExpr,
        inner_key: &QueryExpr,
        result: &QueryExpr,
    ) -> CompileResult<NodeId> {
        let outer_select = self.visit_sequence(outer)?;
        let (outer_alias, outer_ref) = self.alias_select(outer_select);
        let inner_select = self.visit_sequence(inner)?;
        let (inner_alias, inner_ref) = self.alias_select(inner_select);

        let ok = self.visit_lambda("Join", outer_key, &[outer_ref])?;
        let ik = self.visit_lambda("Join", inner_key, &[inner_ref])?;
        let condition = self.ir.binary(BinaryOp::EQ, ok, ik);
        let projection = self.visit_lambda("Join", result, &[outer_ref, inner_ref])?;
        let projection = self.as_expression(projection);

        if self.cx.strategy.can_use_join_on {
            let join = self
                .ir
                .join(JoinKind::Inner, outer_alias, inner_alias, Some(condition));
            Ok(self.ir.new_select(projection, Some(join)))
        } else {
            log::debug!("Join condition moved into WHERE; the dialect has no ON clause");
            let join = self.ir.join(JoinKind::Cross, outer_alias, inner_alias, None);
            let select = self.ir.new_select(projection, Some(join));
            if let Some(s) = self.ir.select_mut(select) {
                s.where_ = Some(condition);
            }
            Ok(select)
        }
    }

    /// The inner side becomes a correlated multiset filtered by the key match
    fn visit_group_join(
        &mut self,
        outer: &QueryExpr,
        inner: &QueryExpr,
        outer_key: &QueryExpr,
        inner_key: &QueryExpr,
        result: &QueryExpr,
    ) -> CompileResult<NodeId> {
        let outer_select = self.visit_sequence(outer)?;
        let (outer_alias, outer_ref) = self.alias_select(outer_select);
        let inner_select = self.visit_sequence(inner)?;
        let (inner_alias, inner_ref) = self.alias_select(inner_select);

        let ok = self.visit_lambda("GroupJoin", outer_key, &[outer_ref])?;
        let ik = self.visit_lambda("GroupJoin", inner_key, &[inner_ref])?;
        let pred = self.ir.binary(BinaryOp::EQ, ok, ik);

        let group_row = self.ir.duplicate(inner_ref);
        let group_select = self.ir.new_select(group_row, Some(inner_alias));
        if let Some(s) = self.ir.select_mut(group_select) {
            s.where_ = Some(pred);
        }
        let group = self.ir.sub_select(SubSelectKind::Multiset, group_select);

        let projection = self.visit_lambda("GroupJoin", result, &[outer_ref, group])?;
        let projection = self.as_expression(projection);
        Ok(self.ir.new_select(projection, Some(outer_alias)))
    }

    fn visit_order_by(
        &mut self,
        source: &QueryExpr,
        key: &QueryExpr,
        kind: OrderKind,
        then_by: bool,
    ) -> CompileResult<NodeId> {
        let (_, body) = lambda_parts("OrderBy", key, 1)?;
        let key_ty = body.ty();
        if key_ty.is_grouping() {
            return Err(CompileError::unsupported("a grouping as an ordering criterion"));
        }
        if key_ty.is_simple()
            && !self
                .cx
                .provider_type(&key_ty)
                .is_some_and(|pt| pt.is_orderable())
        {
            return Err(CompileError::TypeCannotBeOrdered {
                type_name: key_ty.display_name(),
            });
        }

        let select = self.visit_sequence(source)?;
        let select = if then_by {
            select
        } else {
            let select = self.lock_select(select);
            let has_order = self
                .ir
                .select(select)
                .is_some_and(|s| !s.order_by.is_empty());
            if has_order {
                let (alias, aref) = self.alias_select(select);
                self.ir.new_select(aref, Some(alias))
            } else {
                select
            }
        };
        let row = self.selection(select)?;
        if !matches!(self.ir.kind(row), NodeKind::AliasRef { .. }) {
            return Err(CompileError::unsupported("ThenBy without a preceding OrderBy"));
        }
        let expr = self.visit_lambda("OrderBy", key, &[row])?;
        if let Some(s) = self.ir.select_mut(select) {
            s.order_by.push(OrderExpr { kind, expr });
        }
        Ok(select)
    }

    fn visit_distinct(&mut self, source: &QueryExpr) -> CompileResult<NodeId> {
        let select = self.visit_sequence(source)?;
        let select = self.lock_select(select);
        if let Some(s) = self.ir.select_mut(select) {
            s.distinct = true;
            s.ordering = OrderingType::Blocked;
        }
        Ok(select)
    }

    fn visit_union(
        &mut self,
        left: &QueryExpr,
        right: &QueryExpr,
        all: bool,
    ) -> CompileResult<NodeId> {
        let l = self.visit_sequence(left)?;
        let r = self.visit_sequence(right)?;
        let ty = self.ir.ty(l).clone();
        let union = self.ir.add(
            NodeKind::Union {
                left: l,
                right: r,
                all,
            },
            ty,
        );
        let (alias, aref) = self.alias_select(union);
        let select = self.ir.new_select(aref, Some(alias));
        if let Some(s) = self.ir.select_mut(select) {
            s.ordering = OrderingType::Blocked;
        }
        Ok(select)
    }

    /// `SELECT DISTINCT a FROM l AS a WHERE [NOT] EXISTS(SELECT ... FROM r AS b WHERE a = b)`
    fn visit_intersect(
        &mut self,
        method: &str,
        left: &QueryExpr,
        right: &QueryExpr,
        intersect: bool,
    ) -> CompileResult<NodeId> {
        let element = left.ty().element_type().cloned().unwrap_or(ValueType::Unit);
        if is_hierarchical(&element) {
            return Err(CompileError::IntersectNotSupportedForHierarchicalTypes {
                operator: method.to_string(),
                element: element.display_name(),
            });
        }
        let l = self.visit_sequence(left)?;
        let l = self.lock_select(l);
        let r = self.visit_sequence(right)?;
        let (alias, aref) = self.alias_select(l);
        let (right_alias, right_ref) = self.alias_select(r);

        let left_cmp = self.ir.duplicate(aref);
        let cond = self.ir.binary(BinaryOp::EQ2V, left_cmp, right_ref);
        let any = self.quantifier(right_alias, Some(cond), true);
        let exists = if intersect {
            any
        } else {
            self.ir.unary(UnaryOp::Not, any)
        };

        let select = self.ir.new_select(aref, Some(alias));
        if let Some(s) = self.ir.select_mut(select) {
            s.where_ = Some(exists);
            s.distinct = true;
            s.ordering = OrderingType::Blocked;
        }
        Ok(select)
    }

    /// `EXISTS(SELECT ... WHERE cond)` or `NOT EXISTS(SELECT ... WHERE NOT cond)`
    pub(crate) fn quantifier(
        &mut self,
        alias: NodeId,
        cond: Option<NodeId>,
        is_any: bool,
    ) -> NodeId {
        let aref = self.ir.alias_ref(alias);
        let select = self.ir.new_select(aref, Some(alias));
        let where_ = if is_any {
            cond
        } else {
            cond.map(|c| self.ir.unary(UnaryOp::Not2V, c))
        };
        if let Some(s) = self.ir.select_mut(select) {
            s.where_ = where_;
            s.ordering = OrderingType::Never;
        }
        let exists = self.ir.sub_select(SubSelectKind::Exists, select);
        if is_any {
            exists
        } else {
            self.ir.unary(UnaryOp::Not, exists)
        }
    }

    /// A predicate returned as the whole query: `SELECT CASE WHEN p THEN 1 ELSE 0 END`
    fn predicate_query(&mut self, pred: NodeId) -> NodeId {
        let t = self.ir.bool_lit(true);
        let f = self.ir.bool_lit(false);
        let case = self.ir.searched_case(vec![When { test: pred, value: t }], f);
        self.ir.new_select(case, None)
    }

    fn visit_quantifier(
        &mut self,
        method: &str,
        source: &QueryExpr,
        predicate: Option<&QueryExpr>,
        is_any: bool,
        outer: bool,
    ) -> CompileResult<NodeId> {
        let select = self.visit_sequence(source)?;
        let (alias, aref) = self.alias_select(select);
        let cond = match predicate {
            Some(p) => Some(self.visit_lambda(method, p, &[aref])?),
            None => None,
        };
        let quant = self.quantifier(alias, cond, is_any);
        Ok(if outer {
            self.predicate_query(quant)
        } else {
            quant
        })
    }

    fn visit_contains(
        &mut self,
        source: &QueryExpr,
        item: &QueryExpr,
        outer: bool,
    ) -> CompileResult<NodeId> {
        let source = source.unquote();
        let elem_ty = source
            .ty()
            .element_type()
            .cloned()
            .unwrap_or_else(|| item.ty());
        let in_memory: Option<Vec<NodeId>> = match source {
            QueryExpr::Constant {
                value: Value::List(items),
                ..
            }
            | QueryExpr::Variable {
                value: Some(Value::List(items)),
                ..
            } => Some(
                items
                    .iter()
                    .map(|v| self.ir.client_value(v.clone(), elem_ty.clone()))
                    .collect(),
            ),
            QueryExpr::NewArray { elements, .. } => {
                let mut values = Vec::with_capacity(elements.len());
                for e in elements {
                    values.push(self.visit(e, false)?);
                }
                Some(values)
            }
            _ => None,
        };

        let pred = match in_memory {
            Some(values) => {
                let x = self.visit(item, false)?;
                if values.is_empty() {
                    self.ir.bool_lit(false)
                } else if self.cx.types.can_be_column(&elem_ty) {
                    self.ir.add(
                        NodeKind::In { expr: x, values },
                        ValueType::bool(),
                    )
                } else {
                    let mut terms = Vec::with_capacity(values.len());
                    for (i, v) in values.into_iter().enumerate() {
                        let lhs = if i == 0 { x } else { self.ir.duplicate(x) };
                        terms.push(self.ir.binary(BinaryOp::EQ, lhs, v));
                    }
                    self.ir.or_all(terms).unwrap_or(x)
                }
            }
            None => {
                let select = self.visit_sequence(source)?;
                let (alias, aref) = self.alias_select(select);
                let x = self.visit(item, false)?;
                let cond = self.ir.binary(BinaryOp::EQ, aref, x);
                self.quantifier(alias, Some(cond), true)
            }
        };
        Ok(if outer { self.predicate_query(pred) } else { pred })
    }

    fn visit_first(
        &mut self,
        source: &QueryExpr,
        predicate: Option<&QueryExpr>,
        is_first: bool,
        outer: bool,
    ) -> CompileResult<NodeId> {
        let select = self.visit_sequence(source)?;
        let select = self.lock_select(select);
        if let Some(p) = predicate {
            let row = self.selection(select)?;
            let pred = self.visit_lambda("First", p, &[row])?;
            if let Some(s) = self.ir.select_mut(select) {
                s.where_ = Some(pred);
            }
        }
        if is_first {
            let one = self.ir.int_lit(1);
            if let Some(s) = self.ir.select_mut(select) {
                s.top = Some(one);
            }
        }
        if outer {
            return Ok(select);
        }
        let selection = self.selection(select)?;
        let kind = if self.cx.types.can_be_column(self.ir.ty(selection)) {
            SubSelectKind::Scalar
        } else {
            SubSelectKind::Element
        };
        Ok(self.ir.sub_select(kind, select))
    }

    /// `Cast<T>` is `Select(x => (T)x)`
    fn visit_cast(&mut self, source: &QueryExpr, ty: &ValueType) -> CompileResult<NodeId> {
        let target = ty
            .element_type()
            .cloned()
            .ok_or_else(|| CompileError::UnsupportedOverload {
                operator: "Cast".to_string(),
                detail: format!("result type {} is not a sequence", ty.display_name()),
            })?;
        let select = self.visit_sequence(source)?;
        let (alias, aref) = self.alias_select(select);
        let from = self.ir.ty(aref).clone();
        let converted = match self.cx.types.conversion_method(&from, &target) {
            ConversionMethod::Treat => self.ir.unary_typed(UnaryOp::Treat, aref, target),
            ConversionMethod::Convert => self.ir.unary_typed(UnaryOp::Convert, aref, target),
            ConversionMethod::Ignore | ConversionMethod::Lift => {
                self.ir.node_mut(aref).ty = target;
                aref
            }
        };
        Ok(self.ir.new_select(converted, Some(alias)))
    }

    /// `OfType<T>` keeps the rows whose TREAT to `T` is not null
    fn visit_of_type(&mut self, source: &QueryExpr, ty: &ValueType) -> CompileResult<NodeId> {
        let target = ty
            .element_type()
            .cloned()
            .ok_or_else(|| CompileError::UnsupportedOverload {
                operator: "OfType".to_string(),
                detail: format!("result type {} is not a sequence", ty.display_name()),
            })?;
        if let Some(name) = target.entity_name() {
            if self.cx.model.meta_type(name).is_none() {
                return Err(CoreError::UnmappedType {
                    type_name: name.to_string(),
                }
                .into());
            }
        }
        let select = self.visit_sequence(source)?;
        let select = self.lock_select(select);
        let row = self.selection(select)?;
        let treat = self.ir.unary_typed(UnaryOp::Treat, row, target);
        self.ir.set_selection(select, treat);

        let select = self.lock_select(select);
        let row = self.selection(select)?;
        let row = self.ir.duplicate(row);
        let not_null = self.ir.unary(UnaryOp::IsNotNull, row);
        let existing = self.ir.select(select).and_then(|s| s.where_);
        let combined = self.ir.and_opt(existing, Some(not_null));
        if let Some(s) = self.ir.select_mut(select) {
            s.where_ = combined;
        }
        Ok(select)
    }

    /// Left outer join against a one-row select so an empty source yields
    /// a single empty row
    fn visit_default_if_empty(&mut self, source: &QueryExpr) -> CompileResult<NodeId> {
        let select = self.visit_sequence(source)?;
        let (alias, aref) = self.alias_select(select);
        let value = self.ir.unary(UnaryOp::OuterJoinedValue, aref);
        let opt_select = self.ir.new_select(value, Some(alias));
        let opt = self.optional_value(opt_select, value);
        self.ir.set_selection(opt_select, opt);
        let (opt_alias, opt_ref) = self.alias_select(opt_select);

        let dummy = self.ir.dummy_select();
        let (dummy_alias, _) = self.alias_select(dummy);
        let on = self.ir.bool_lit(true);
        let join = self
            .ir
            .join(JoinKind::LeftOuter, dummy_alias, opt_alias, Some(on));
        Ok(self.ir.new_select(opt_ref, Some(join)))
    }
}

/// True when the argument is a lambda whose body is its own parameter
pub(crate) fn is_identity_lambda(e: &QueryExpr) -> bool {
    matches!(
        e.as_lambda(),
        Some(([p], QueryExpr::Parameter { name, .. })) if *name == p.name
    )
}
