//! Scalar expressions and parenthesization

use qc_core::{LiteralMode, Value};

use super::{QueryParameter, Renderer};
use crate::error::CompileResult;
use crate::ir::{BinaryOp, Ir, NodeId, NodeKind, OrderExpr, OrderKind, SubSelectKind, UnaryOp};

/// Operators whose left-nested chains read the same without parentheses
fn is_associative(op: BinaryOp) -> bool {
    matches!(
        op,
        BinaryOp::And
            | BinaryOp::Or
            | BinaryOp::Add
            | BinaryOp::Mul
            | BinaryOp::BitAnd
            | BinaryOp::BitOr
            | BinaryOp::BitXor
            | BinaryOp::Concat
    )
}

/// Whether `node` needs parentheses as an operand of `outer`
///
/// Only compound forms (operators, predicates) ever do, and a left operand
/// carrying the same associative operator as its parent does not.
pub(crate) fn needs_parens(ir: &Ir, node: NodeId, outer: NodeId) -> bool {
    match ir.kind(node) {
        NodeKind::Binary { op, .. } => match ir.kind(outer) {
            NodeKind::Binary {
                op: parent, left, ..
            } => !(op == parent && is_associative(*op) && *left == node),
            _ => true,
        },
        NodeKind::Unary { op, .. } => !matches!(
            op,
            UnaryOp::Convert | UnaryOp::Treat | UnaryOp::OuterJoinedValue
        ) || needs_parens_through(ir, node, outer),
        NodeKind::Like { .. } | NodeKind::Between { .. } | NodeKind::In { .. } => true,
        _ => false,
    }
}

/// Transparent wrappers take the parenthesization of what they wrap
fn needs_parens_through(ir: &Ir, node: NodeId, outer: NodeId) -> bool {
    match ir.kind(node) {
        NodeKind::Unary {
            op: UnaryOp::Treat | UnaryOp::OuterJoinedValue,
            operand,
        } => needs_parens(ir, *operand, outer),
        _ => false,
    }
}

impl Renderer<'_, '_> {
    /// Operand of `outer`, parenthesized when precedence requires
    pub(super) fn operand(&mut self, node: NodeId, outer: NodeId) -> CompileResult<()> {
        if needs_parens(self.ir, node, outer) {
            self.push("(");
            self.expr(node)?;
            self.push(")");
            Ok(())
        } else {
            self.expr(node)
        }
    }

    pub(super) fn expr_list(&mut self, items: &[NodeId]) -> CompileResult<()> {
        for (i, &item) in items.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.expr(item)?;
        }
        Ok(())
    }

    pub(super) fn order_list(&mut self, items: &[OrderExpr]) -> CompileResult<()> {
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.expr(item.expr)?;
            if item.kind == OrderKind::Descending {
                self.push(" DESC");
            }
        }
        Ok(())
    }

    pub(super) fn expr(&mut self, id: NodeId) -> CompileResult<()> {
        let ir = self.ir;
        match ir.kind(id) {
            NodeKind::ColumnRef { column } => self.column_ref(*column),
            NodeKind::Column { .. } => self.column_ref(id),
            NodeKind::Value { value, client } => self.literal(id, value, *client),
            NodeKind::Parameter { name, value, outer } => {
                let name = if name.starts_with('@') {
                    name.clone()
                } else {
                    format!("@{name}")
                };
                if !self.parameters.iter().any(|p| p.name == name) {
                    let db_type = self.type_text(id).ok();
                    self.parameters.push(QueryParameter {
                        name: name.clone(),
                        value: value.clone(),
                        db_type,
                        parent_column: None,
                        outer: *outer,
                    });
                }
                self.push(&name);
                Ok(())
            }
            NodeKind::Variable { name } => {
                self.push(name);
                Ok(())
            }
            NodeKind::Function { name, args } => {
                // user functions are schema qualified
                let name = if name.contains('.') {
                    self.dialect.quote_table_name(name)
                } else {
                    name.clone()
                };
                self.push(&format!("{name}("));
                self.expr_list(args)?;
                self.push(")");
                Ok(())
            }
            NodeKind::Aggregate { func, arg } => {
                self.push(&format!("{}(", func.sql_name()));
                match arg {
                    Some(arg) => self.expr(*arg)?,
                    None => self.push("*"),
                }
                self.push(")");
                Ok(())
            }
            NodeKind::RowNumber { order_by } => {
                self.push("ROW_NUMBER() OVER (ORDER BY ");
                if order_by.is_empty() {
                    self.push("(SELECT NULL)");
                } else {
                    self.order_list(order_by)?;
                }
                self.push(")");
                Ok(())
            }
            NodeKind::Unary { op, operand } => self.unary(id, *op, *operand),
            NodeKind::Binary { op, left, right } => {
                self.operand(*left, id)?;
                self.push(&format!(" {} ", op.symbol()));
                self.operand(*right, id)
            }
            NodeKind::Like {
                expr,
                pattern,
                escape,
            } => {
                self.operand(*expr, id)?;
                self.push(" LIKE ");
                self.operand(*pattern, id)?;
                if let Some(escape) = escape {
                    self.push(" ESCAPE ");
                    self.operand(*escape, id)?;
                }
                Ok(())
            }
            NodeKind::Between { expr, low, high } => {
                self.operand(*expr, id)?;
                self.push(" BETWEEN ");
                self.operand(*low, id)?;
                self.push(" AND ");
                self.operand(*high, id)
            }
            NodeKind::In { expr, values } => {
                if values.is_empty() {
                    self.push("1 = 0");
                    return Ok(());
                }
                self.operand(*expr, id)?;
                self.push(" IN (");
                self.expr_list(values)?;
                self.push(")");
                Ok(())
            }
            NodeKind::SearchedCase { whens, else_ } => {
                self.push("CASE");
                for when in whens {
                    self.push(" WHEN ");
                    self.expr(when.test)?;
                    self.push(" THEN ");
                    self.expr(when.value)?;
                }
                self.push(" ELSE ");
                self.expr(*else_)?;
                self.push(" END");
                Ok(())
            }
            NodeKind::SimpleCase {
                discriminator,
                whens,
                else_,
            } => {
                self.push("CASE ");
                self.expr(*discriminator)?;
                for when in whens {
                    self.push(" WHEN ");
                    self.expr(when.test)?;
                    self.push(" THEN ");
                    self.expr(when.value)?;
                }
                if let Some(else_) = else_ {
                    self.push(" ELSE ");
                    self.expr(*else_)?;
                }
                self.push(" END");
                Ok(())
            }
            NodeKind::SubSelect {
                kind: SubSelectKind::Scalar,
                select,
            } => self.nested(*select),
            NodeKind::SubSelect {
                kind: SubSelectKind::Exists,
                select,
            } => {
                self.push("EXISTS");
                self.nested(*select)
            }
            NodeKind::Select(_) | NodeKind::Union { .. } => self.nested(id),
            _ if self.debug => self.debug_node(id),
            _ => Err(self.invalid(id)),
        }
    }

    fn unary(&mut self, id: NodeId, op: UnaryOp, operand: NodeId) -> CompileResult<()> {
        match op {
            UnaryOp::Not | UnaryOp::Not2V => {
                self.push("NOT ");
                self.operand(operand, id)
            }
            UnaryOp::Negate => {
                self.push("-");
                self.operand(operand, id)
            }
            UnaryOp::BitNot => {
                self.push("~");
                self.operand(operand, id)
            }
            UnaryOp::IsNull => {
                self.operand(operand, id)?;
                self.push(" IS NULL");
                Ok(())
            }
            UnaryOp::IsNotNull => {
                self.operand(operand, id)?;
                self.push(" IS NOT NULL");
                Ok(())
            }
            UnaryOp::Convert => {
                let ty = self.type_text(id)?;
                self.push(&format!("CONVERT({ty}, "));
                self.expr(operand)?;
                self.push(")");
                Ok(())
            }
            // the value itself; nullability is a host concern
            UnaryOp::Treat | UnaryOp::OuterJoinedValue => self.expr(operand),
        }
    }

    /// Inline text of a literal, or a `@pN` parameter for client values
    /// when parameterizing
    fn literal(&mut self, id: NodeId, value: &Value, client: bool) -> CompileResult<()> {
        let provider = self.ir.node(id).provider;
        let parameterize = client
            && self.cx.config.literals == LiteralMode::Parameterize
            && !value.is_null();
        if parameterize {
            let name = format!("@p{}", self.next_literal);
            self.next_literal += 1;
            let db_type = self.type_text(id).ok();
            self.parameters.push(QueryParameter {
                name: name.clone(),
                value: Some(value.clone()),
                db_type,
                parent_column: None,
                outer: None,
            });
            self.push(&name);
            return Ok(());
        }
        let text = self.dialect.format_literal(value, provider.as_ref())?;
        self.push(&text);
        Ok(())
    }

    /// A column read from where the walk currently is
    ///
    /// Columns of a select being rendered are inlined, columns of an
    /// aliased source are qualified by the alias, and columns of a
    /// directly named target are left bare.
    pub(super) fn column_ref(&mut self, column: NodeId) -> CompileResult<()> {
        let ir = self.ir;
        let NodeKind::Column { expr, .. } = ir.kind(column) else {
            return Err(self.invalid(column));
        };
        let owner = ir.column_owner(column);
        let in_scope = owner.is_some_and(|o| self.scopes.contains(&o));
        if in_scope || owner.is_none() {
            if let Some(expr) = expr {
                return self.expr(*expr);
            }
        }
        let name = self.names.column(ir, column);
        let quoted = self.quote(&name);
        match owner.and_then(|o| self.owners.get(&o).copied()) {
            Some(alias) if !self.suppressed.contains(&alias) => {
                let alias = self.names.alias(alias);
                let alias = self.quote(&alias);
                self.push(&format!("{alias}.{quoted}"));
            }
            _ => self.push(&quoted),
        }
        Ok(())
    }
}
