//! Smart constructors that compute result types

use super::*;
use qc_core::ScalarKind;

impl Ir {
    /// A compiler-generated literal
    pub fn value(&mut self, value: Value, ty: ValueType) -> NodeId {
        self.add(
            NodeKind::Value {
                value,
                client: false,
            },
            ty,
        )
    }

    /// A caller-supplied literal
    pub fn client_value(&mut self, value: Value, ty: ValueType) -> NodeId {
        self.add(NodeKind::Value { value, client: true }, ty)
    }

    pub fn bool_lit(&mut self, b: bool) -> NodeId {
        self.value(Value::Bool(b), ValueType::bool())
    }

    pub fn int_lit(&mut self, i: i64) -> NodeId {
        self.value(Value::Int(i), ValueType::int32())
    }

    pub fn null(&mut self, ty: ValueType) -> NodeId {
        self.value(Value::Null, ty.as_nullable())
    }

    /// Raw keyword text
    pub fn variable(&mut self, name: &str, ty: ValueType) -> NodeId {
        self.add(
            NodeKind::Variable {
                name: name.to_string(),
            },
            ty,
        )
    }

    pub fn function(&mut self, name: &str, args: Vec<NodeId>, ty: ValueType) -> NodeId {
        self.add(
            NodeKind::Function {
                name: name.to_string(),
                args,
            },
            ty,
        )
    }

    /// Unary node; the result type follows the operator
    pub fn unary(&mut self, op: UnaryOp, operand: NodeId) -> NodeId {
        let operand_ty = self.ty(operand).clone();
        let ty = match op {
            UnaryOp::Not | UnaryOp::Not2V => {
                if op == UnaryOp::Not && operand_ty.is_nullable() {
                    ValueType::nullable(ScalarKind::Bool)
                } else {
                    ValueType::bool()
                }
            }
            UnaryOp::IsNull | UnaryOp::IsNotNull => ValueType::bool(),
            UnaryOp::OuterJoinedValue => operand_ty.as_nullable(),
            _ => operand_ty,
        };
        self.add(NodeKind::Unary { op, operand }, ty)
    }

    /// Unary node with an explicit result type (CONVERT, TREAT)
    pub fn unary_typed(&mut self, op: UnaryOp, operand: NodeId, ty: ValueType) -> NodeId {
        self.add(NodeKind::Unary { op, operand }, ty)
    }

    /// Binary node
    ///
    /// Comparisons yield non-null booleans except plain comparisons of
    /// nullable operands. Arithmetic takes the left type, nullable when
    /// either side is.
    pub fn binary(&mut self, op: BinaryOp, left: NodeId, right: NodeId) -> NodeId {
        let lt = self.ty(left).clone();
        let rt = self.ty(right).clone();
        let either_null = lt.is_nullable() || rt.is_nullable();
        let ty = match op {
            BinaryOp::EQ2V | BinaryOp::NE2V => ValueType::bool(),
            op if op.is_comparison() => {
                if either_null && lt.is_simple() && rt.is_simple() {
                    ValueType::nullable(ScalarKind::Bool)
                } else {
                    ValueType::bool()
                }
            }
            BinaryOp::And | BinaryOp::Or => {
                if either_null {
                    ValueType::nullable(ScalarKind::Bool)
                } else {
                    ValueType::bool()
                }
            }
            _ => {
                if either_null {
                    lt.as_nullable()
                } else {
                    lt
                }
            }
        };
        self.add(NodeKind::Binary { op, left, right }, ty)
    }

    /// Binary node with an explicit result type
    pub fn binary_typed(
        &mut self,
        op: BinaryOp,
        left: NodeId,
        right: NodeId,
        ty: ValueType,
    ) -> NodeId {
        self.add(NodeKind::Binary { op, left, right }, ty)
    }

    /// `left AND right`, either side optional
    pub fn and_opt(&mut self, left: Option<NodeId>, right: Option<NodeId>) -> Option<NodeId> {
        match (left, right) {
            (Some(l), Some(r)) => Some(self.binary(BinaryOp::And, l, r)),
            (l, r) => l.or(r),
        }
    }

    /// Left-deep AND of all terms; `None` for no terms
    pub fn and_all(&mut self, terms: Vec<NodeId>) -> Option<NodeId> {
        terms
            .into_iter()
            .fold(None, |acc, t| self.and_opt(acc, Some(t)))
    }

    /// Left-deep OR of all terms; `None` for no terms
    pub fn or_all(&mut self, terms: Vec<NodeId>) -> Option<NodeId> {
        let mut acc: Option<NodeId> = None;
        for t in terms {
            acc = Some(match acc {
                Some(a) => self.binary(BinaryOp::Or, a, t),
                None => t,
            });
        }
        acc
    }

    pub fn column_ref(&mut self, column: NodeId) -> NodeId {
        let ty = self.ty(column).clone();
        self.add(NodeKind::ColumnRef { column }, ty)
    }

    /// Unowned column over an expression
    pub fn column(&mut self, name: Option<String>, expr: NodeId) -> NodeId {
        let ty = self.ty(expr).clone();
        self.add(
            NodeKind::Column {
                name,
                owner: None,
                expr: Some(expr),
                member: None,
            },
            ty,
        )
    }

    /// Alias over a source or expression
    pub fn alias(&mut self, node: NodeId) -> NodeId {
        let ty = self.ty(node).clone();
        self.add(NodeKind::Alias { node }, ty)
    }

    /// Reference to everything an alias produces
    pub fn alias_ref(&mut self, alias: NodeId) -> NodeId {
        let ty = match self.alias_node(alias) {
            Some(node) => match self.kind(node) {
                NodeKind::Table { row_type, .. }
                | NodeKind::TableValuedFunction { row_type, .. } => ValueType::Entity {
                    name: row_type.clone(),
                },
                _ => self.ty(node).clone(),
            },
            None => self.ty(alias).clone(),
        };
        self.add(NodeKind::AliasRef { alias }, ty)
    }

    /// Select over `from` whose type is its selection's type
    pub fn new_select(&mut self, selection: NodeId, from: Option<NodeId>) -> NodeId {
        let ty = self.ty(selection).clone();
        self.add(
            NodeKind::Select(Box::new(SelectNode::new(selection, from))),
            ty,
        )
    }

    /// Set a select's selection, keeping the select's type in sync
    pub fn set_selection(&mut self, select: NodeId, selection: NodeId) {
        let ty = self.ty(selection).clone();
        if let Some(s) = self.select_mut(select) {
            s.selection = Some(selection);
        }
        self.node_mut(select).ty = ty;
    }

    pub fn join(
        &mut self,
        kind: JoinKind,
        left: NodeId,
        right: NodeId,
        condition: Option<NodeId>,
    ) -> NodeId {
        self.add(
            NodeKind::Join {
                kind,
                left,
                right,
                condition,
            },
            ValueType::Unit,
        )
    }

    /// Nested select in an expression position
    pub fn sub_select(&mut self, kind: SubSelectKind, select: NodeId) -> NodeId {
        let sel_ty = self.ty(select).clone();
        let ty = match kind {
            SubSelectKind::Scalar => sel_ty.as_nullable(),
            SubSelectKind::Element => sel_ty,
            SubSelectKind::Multiset => ValueType::sequence(sel_ty),
            SubSelectKind::Exists => ValueType::bool(),
        };
        self.add(NodeKind::SubSelect { kind, select }, ty)
    }

    pub fn member(&mut self, target: NodeId, member: &MemberName, ty: ValueType) -> NodeId {
        self.add(
            NodeKind::Member {
                target,
                member: member.clone(),
            },
            ty,
        )
    }

    /// `CASE WHEN ... END`; the type is the first arm's, nullable if any arm is
    pub fn searched_case(&mut self, whens: Vec<When>, else_: NodeId) -> NodeId {
        let mut ty = match whens.first() {
            Some(w) => self.ty(w.value).clone(),
            None => self.ty(else_).clone(),
        };
        let nullable = self.ty(else_).is_nullable()
            || whens.iter().any(|w| self.ty(w.value).is_nullable());
        if nullable {
            ty = ty.as_nullable();
        }
        self.add(NodeKind::SearchedCase { whens, else_ }, ty)
    }

    /// `CASE WHEN p THEN 1 ELSE 0 END`-style boolean to bit value
    pub fn case_bool(&mut self, predicate: NodeId, when_true: i64, when_false: i64) -> NodeId {
        let t = self.int_lit(when_true);
        let f = self.int_lit(when_false);
        self.searched_case(
            vec![When {
                test: predicate,
                value: t,
            }],
            f,
        )
    }

    /// Aggregate with its result type
    pub fn aggregate(&mut self, func: AggregateFunc, arg: Option<NodeId>, ty: ValueType) -> NodeId {
        self.add(NodeKind::Aggregate { func, arg }, ty)
    }

    /// Shared expression and a reference to it
    pub fn shared(&mut self, expr: NodeId) -> (NodeId, NodeId) {
        let ty = self.ty(expr).clone();
        let shared = self.add(NodeKind::Shared { expr }, ty.clone());
        let shared_ref = self.add(NodeKind::SharedRef { shared }, ty);
        (shared, shared_ref)
    }

    /// `SELECT NULL AS [EMPTY]` one-row select used by DefaultIfEmpty
    pub fn dummy_select(&mut self) -> NodeId {
        let null = self.null(ValueType::int32());
        let col = self.column(Some("EMPTY".to_string()), null);
        let col_ref = self.column_ref(col);
        let sel = self.new_select(col_ref, None);
        self.push_row_column(sel, col);
        sel
    }

    /// Column of a table for a mapped member, created on first use
    pub fn table_column(
        &mut self,
        table: NodeId,
        member: &MemberName,
        column_name: &str,
        ty: ValueType,
        provider: Option<ProviderType>,
    ) -> NodeId {
        let existing = match self.kind(table) {
            NodeKind::Table { columns, .. } | NodeKind::TableValuedFunction { columns, .. } => {
                columns.iter().copied().find(|&c| {
                    matches!(self.kind(c), NodeKind::Column { member: Some(m), .. } if m == member)
                })
            }
            _ => None,
        };
        if let Some(column) = existing {
            return column;
        }
        let column = self.add(
            NodeKind::Column {
                name: Some(column_name.to_string()),
                owner: Some(table),
                expr: None,
                member: Some(member.clone()),
            },
            ty,
        );
        self.node_mut(column).provider = provider;
        if let NodeKind::Table { columns, .. } | NodeKind::TableValuedFunction { columns, .. } =
            self.kind_mut(table)
        {
            columns.push(column);
        }
        column
    }

    /// Attach an unowned column to a select's row
    pub fn push_row_column(&mut self, select: NodeId, column: NodeId) {
        if let NodeKind::Column { owner, .. } = self.kind_mut(column) {
            *owner = Some(select);
        }
        if let Some(s) = self.select_mut(select) {
            s.row.push(column);
        }
    }
}

#[cfg(test)]
#[path = "factory_test.rs"]
mod tests;
