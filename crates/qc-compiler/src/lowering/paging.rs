//! Skip and Take

use super::Lowerer;
use crate::error::{CompileError, CompileResult};
use crate::ir::{
    BinaryOp, NodeId, NodeKind, OrderExpr, OrderKind, OrderingType, SubSelectKind, UnaryOp,
};
use qc_core::{QueryExpr, SkipStrategy, Value, ValueType};

impl Lowerer<'_, '_> {
    pub(crate) fn visit_take(
        &mut self,
        source: &QueryExpr,
        count: &QueryExpr,
    ) -> CompileResult<NodeId> {
        let take = self.visit_count("Take", "count", count)?;

        // Take(Skip(x, n), m) is paged in one step
        if let QueryExpr::Call {
            declaring,
            method,
            args,
            ..
        } = source.unquote()
        {
            if declaring.is_sequence_operator() && method == "Skip" && args.len() == 2 {
                let skip = self.visit_count("Skip", "count", &args[1])?;
                let select = self.visit_sequence(&args[0])?;
                return self.skip_take(select, Some(skip), Some(take));
            }
        }
        let select = self.visit_sequence(source)?;
        self.skip_take(select, None, Some(take))
    }

    pub(crate) fn visit_skip(
        &mut self,
        source: &QueryExpr,
        count: &QueryExpr,
    ) -> CompileResult<NodeId> {
        let skip = self.visit_count("Skip", "count", count)?;
        let select = self.visit_sequence(source)?;
        self.skip_take(select, Some(skip), None)
    }

    /// Lower a row count, rejecting negative constants
    fn visit_count(
        &mut self,
        operator: &str,
        argument: &str,
        count: &QueryExpr,
    ) -> CompileResult<NodeId> {
        let node = self.visit(count, false)?;
        if let Some(n) = self.ir.as_value(node).and_then(Value::as_i64) {
            if n < 0 {
                return Err(CompileError::ArgumentOutOfRange {
                    operator: operator.to_string(),
                    argument: argument.to_string(),
                    value: n,
                });
            }
        }
        Ok(node)
    }

    fn skip_take(
        &mut self,
        select: NodeId,
        skip: Option<NodeId>,
        take: Option<NodeId>,
    ) -> CompileResult<NodeId> {
        // Skip(0) changes nothing
        let skip = skip.filter(|&s| self.ir.as_value(s).and_then(Value::as_i64) != Some(0));

        let Some(skip) = skip else {
            let select = self.lock_select(select);
            if let Some(take) = take {
                if let Some(s) = self.ir.select_mut(select) {
                    s.top = Some(take);
                }
            }
            return Ok(select);
        };

        match self.cx.strategy.skip_strategy {
            SkipStrategy::RowNumber => self.skip_with_row_number(select, skip, take),
            SkipStrategy::NotExists => self.skip_with_not_exists(select, skip, take),
        }
    }

    /// `SELECT ... FROM (SELECT ..., ROW_NUMBER() OVER (ORDER BY ...) AS ROW_NUMBER ...)
    /// WHERE ROW_NUMBER BETWEEN skip + 1 AND skip + take`
    fn skip_with_row_number(
        &mut self,
        select: NodeId,
        skip: NodeId,
        take: Option<NodeId>,
    ) -> CompileResult<NodeId> {
        // an ordered projection is numbered in place
        let numbered_in_place = self.ir.select(select).is_some_and(|s| {
            !s.order_by.is_empty()
                && s.where_.is_none()
                && s.group_by.is_empty()
                && s.having.is_none()
                && s.top.is_none()
                && !s.distinct
                && s.ordering == OrderingType::Default
        });
        let select = if numbered_in_place {
            select
        } else {
            self.lock_select(select)
        };
        let order_by = self.take_order(select);
        let ordered = !order_by.is_empty();

        let row_number = self.ir.add(NodeKind::RowNumber { order_by }, ValueType::int64());
        let rn_column = self.ir.column(Some("ROW_NUMBER".to_string()), row_number);
        self.ir.push_row_column(select, rn_column);

        let (alias, aref) = self.alias_select(select);
        let result = self.ir.new_select(aref, Some(alias));
        let rn_ref = self.ir.column_ref(rn_column);
        let pred = match take {
            Some(take) => {
                let low = self.offset(skip, None);
                let skip_dup = self.ir.duplicate(skip);
                let high = self.offset(skip_dup, Some(take));
                self.ir.add(
                    NodeKind::Between {
                        expr: rn_ref,
                        low,
                        high,
                    },
                    ValueType::bool(),
                )
            }
            None => self.ir.binary(BinaryOp::GT, rn_ref, skip),
        };
        let order_ref = ordered.then(|| self.ir.column_ref(rn_column));
        if let Some(s) = self.ir.select_mut(result) {
            s.where_ = Some(pred);
            if let Some(expr) = order_ref {
                s.order_by.push(OrderExpr {
                    kind: OrderKind::Ascending,
                    expr,
                });
            }
        }
        Ok(result)
    }

    /// `skip + 1` or `skip + take`, folded when both are literals
    fn offset(&mut self, skip: NodeId, take: Option<NodeId>) -> NodeId {
        let skip_value = self.ir.as_value(skip).and_then(Value::as_i64);
        let take_value = match take {
            Some(t) => self.ir.as_value(t).and_then(Value::as_i64),
            None => Some(1),
        };
        if let (Some(s), Some(t)) = (skip_value, take_value) {
            return self.ir.int_lit(s + t);
        }
        let rhs = match take {
            Some(t) => t,
            None => self.ir.int_lit(1),
        };
        self.ir.binary(BinaryOp::Add, skip, rhs)
    }

    /// Move the ordering that governs `select`'s rows into a row-number list
    fn take_order(&mut self, select: NodeId) -> Vec<OrderExpr> {
        let own = self
            .ir
            .select_mut(select)
            .map(|s| std::mem::take(&mut s.order_by))
            .unwrap_or_default();
        if !own.is_empty() {
            return own;
        }
        let inner = self
            .ir
            .select(select)
            .and_then(|s| s.from)
            .and_then(|from| self.ir.alias_node(from))
            .filter(|&inner| self.ir.select(inner).is_some_and(|s| s.top.is_none()));
        match inner {
            Some(inner) => self
                .ir
                .select_mut(inner)
                .map(|s| std::mem::take(&mut s.order_by))
                .unwrap_or_default(),
            None => Vec::new(),
        }
    }

    /// `SELECT TOP take a FROM seq AS a WHERE NOT EXISTS(SELECT TOP skip ... WHERE a = b)`
    fn skip_with_not_exists(
        &mut self,
        select: NodeId,
        skip: NodeId,
        take: Option<NodeId>,
    ) -> CompileResult<NodeId> {
        let select = self.lock_select(select);
        let selection = self.selection(select)?;
        if super::sequence::is_hierarchical(self.ir.ty(selection))
            || matches!(
                self.ir.kind(selection),
                NodeKind::SubSelect {
                    kind: SubSelectKind::Multiset,
                    ..
                }
            )
        {
            return Err(CompileError::SkipNotSupportedForSequenceTypes);
        }
        if !self.is_single_table_query(select) {
            return Err(CompileError::SkipRequiresSingleTableQueryWithPks);
        }

        let (alias, aref) = self.alias_select(select);
        let dup = self.ir.duplicate(select);
        if let Some(s) = self.ir.select_mut(dup) {
            s.top = Some(skip);
        }
        let (dup_alias, dup_ref) = self.alias_select(dup);
        let left = self.ir.duplicate(aref);
        let cond = self.ir.binary(BinaryOp::EQ2V, left, dup_ref);
        let eq_ref = self.ir.duplicate(dup_ref);
        let eq_select = self.ir.new_select(eq_ref, Some(dup_alias));
        if let Some(s) = self.ir.select_mut(eq_select) {
            s.where_ = Some(cond);
        }
        let exists = self.ir.sub_select(SubSelectKind::Exists, eq_select);
        let not_exists = self.ir.unary(UnaryOp::Not, exists);

        let result = self.ir.new_select(aref, Some(alias));
        if let Some(s) = self.ir.select_mut(result) {
            s.where_ = Some(not_exists);
            s.top = take;
        }
        Ok(result)
    }

    /// Rows of `node` are identifiable: a single keyed table projected
    /// whole or through its key, a DISTINCT, or a set UNION
    pub(crate) fn is_single_table_query(&self, node: NodeId) -> bool {
        self.row_identity(node).is_some()
    }

    fn row_identity(&self, node: NodeId) -> Option<RowIdentity> {
        match self.ir.kind(node) {
            NodeKind::Select(s) => {
                if s.distinct {
                    return Some(RowIdentity::Distinct);
                }
                let identity = self.row_identity(s.from?)?;
                let selection = s.selection?;
                self.selection_keeps_identity(selection, &identity)
                    .then_some(identity)
            }
            NodeKind::Alias { node } => self.row_identity(*node),
            NodeKind::Table { row_type, .. } => {
                let meta = self.cx.model.meta_type(row_type)?;
                let keys: Vec<KeyMember> = meta
                    .identity_members()
                    .into_iter()
                    .map(|m| KeyMember {
                        member: m.name.to_string(),
                        column: m.column.clone(),
                    })
                    .collect();
                (!keys.is_empty()).then_some(RowIdentity::Keys(keys))
            }
            NodeKind::Union { all: false, .. } => Some(RowIdentity::Distinct),
            _ => None,
        }
    }

    fn selection_keeps_identity(&self, selection: NodeId, identity: &RowIdentity) -> bool {
        match self.ir.kind(selection) {
            NodeKind::AliasRef { .. }
            | NodeKind::TypeCase { .. }
            | NodeKind::Unary {
                op: UnaryOp::Treat,
                ..
            } => true,
            NodeKind::Member { .. } | NodeKind::Column { .. } | NodeKind::ColumnRef { .. } => {
                match identity {
                    RowIdentity::Keys(keys) => {
                        keys.len() == 1 && self.is_key_column(&keys[0], selection)
                    }
                    RowIdentity::Distinct => false,
                }
            }
            NodeKind::New { members } => match identity {
                RowIdentity::Keys(keys) => keys.iter().all(|key| {
                    members
                        .iter()
                        .any(|&(_, value)| self.is_key_column(key, value))
                }),
                RowIdentity::Distinct => false,
            },
            _ => false,
        }
    }

    /// `expr` reads `key` directly
    fn is_key_column(&self, key: &KeyMember, expr: NodeId) -> bool {
        match self.ir.kind(expr) {
            NodeKind::Member { member, .. } => *member == key.member.as_str(),
            NodeKind::Column { name: Some(name), .. } => {
                name == key.column.as_deref().unwrap_or(&key.member)
            }
            NodeKind::ColumnRef { column } => self.is_key_column(key, *column),
            _ => false,
        }
    }
}

/// How the rows of a source can be told apart
#[derive(Debug)]
enum RowIdentity {
    /// Every row is distinct as a whole
    Distinct,
    /// Rows of one table, by its key members
    Keys(Vec<KeyMember>),
}

#[derive(Debug)]
struct KeyMember {
    member: String,
    column: Option<String>,
}
