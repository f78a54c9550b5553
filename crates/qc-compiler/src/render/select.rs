//! SELECT statements, unions and FROM clauses

use super::Renderer;
use crate::error::CompileResult;
use crate::ir::{JoinKind, NodeId, NodeKind};

impl Renderer<'_, '_> {
    /// A select or union at the current position
    pub(super) fn query(&mut self, id: NodeId) -> CompileResult<()> {
        match self.ir.kind(id) {
            NodeKind::Union { left, right, all } => {
                let (left, right, all) = (*left, *right, *all);
                self.query(left)?;
                self.newline();
                self.push(if all { "UNION ALL" } else { "UNION" });
                self.newline();
                self.query(right)
            }
            NodeKind::Select(_) => self.select(id),
            _ => Err(self.invalid(id)),
        }
    }

    /// A query in parentheses, one level deeper
    pub(super) fn nested(&mut self, id: NodeId) -> CompileResult<()> {
        self.push("(");
        self.depth += 1;
        self.newline();
        self.query(id)?;
        self.depth -= 1;
        self.newline();
        self.push(")");
        Ok(())
    }

    fn select(&mut self, id: NodeId) -> CompileResult<()> {
        let Some(sel) = self.ir.select(id).cloned() else {
            return Err(self.invalid(id));
        };
        self.scopes.push(id);

        self.push("SELECT ");
        if sel.distinct {
            self.push("DISTINCT ");
        }
        if let Some(top) = sel.top {
            // a constant count is part of the statement, never a parameter
            if let Some(n) = self.ir.as_value(top).and_then(|v| v.as_i64()) {
                self.push(&format!("TOP {n}"));
            } else {
                self.push("TOP (");
                self.expr(top)?;
                self.push(")");
            }
            self.push(" ");
        }
        if sel.row.is_empty() {
            let empty = self.quote("EMPTY");
            self.push(&format!("NULL AS {empty}"));
        }
        for (i, &column) in sel.row.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.row_column(column)?;
        }

        if let Some(from) = sel.from {
            self.newline();
            self.push("FROM ");
            self.source(from)?;
        }
        if let Some(where_) = sel.where_ {
            self.newline();
            self.push("WHERE ");
            self.expr(where_)?;
        }
        if !sel.group_by.is_empty() {
            self.newline();
            self.push("GROUP BY ");
            self.expr_list(&sel.group_by)?;
        }
        if let Some(having) = sel.having {
            self.newline();
            self.push("HAVING ");
            self.expr(having)?;
        }
        if !sel.order_by.is_empty() {
            self.newline();
            self.push("ORDER BY ");
            self.order_list(&sel.order_by)?;
        }

        self.scopes.pop();
        Ok(())
    }

    /// `expr [AS name]`, the alias left out when the expression already
    /// carries the name
    fn row_column(&mut self, column: NodeId) -> CompileResult<()> {
        let ir = self.ir;
        let name = self.names.column(ir, column);
        let NodeKind::Column { expr: Some(expr), .. } = ir.kind(column) else {
            let quoted = self.quote(&name);
            self.push(&quoted);
            return Ok(());
        };
        self.expr(*expr)?;
        let carried = match ir.kind(*expr) {
            NodeKind::ColumnRef { column: read } => {
                let inlined = ir
                    .column_owner(*read)
                    .map_or(true, |o| self.scopes.contains(&o));
                (!inlined).then(|| self.names.column(ir, *read))
            }
            _ => None,
        };
        if carried.as_deref() != Some(name.as_str()) {
            let quoted = self.quote(&name);
            self.push(&format!(" AS {quoted}"));
        }
        Ok(())
    }

    /// A FROM clause item
    pub(super) fn source(&mut self, id: NodeId) -> CompileResult<()> {
        let ir = self.ir;
        match ir.kind(id) {
            NodeKind::Alias { node } => self.aliased(id, *node),
            NodeKind::Join { .. } => {
                let mut items = Vec::new();
                if self.cross_join_list(id, &mut items) && items.len() > 2 {
                    for (i, &item) in items.iter().enumerate() {
                        if i > 0 {
                            self.push(", ");
                        }
                        self.source(item)?;
                    }
                    return Ok(());
                }
                self.join(id)
            }
            NodeKind::Table { name, .. } => {
                let name = self.dialect.quote_table_name(name);
                self.push(&name);
                Ok(())
            }
            _ if self.debug => self.debug_node(id),
            _ => Err(self.invalid(id)),
        }
    }

    fn aliased(&mut self, alias: NodeId, node: NodeId) -> CompileResult<()> {
        let ir = self.ir;
        let name = self.names.alias(alias);
        let name = self.quote(&name);
        match ir.kind(node) {
            NodeKind::Table { name: table, .. } => {
                let table = self.dialect.quote_table_name(table);
                if self.suppressed.contains(&alias) {
                    self.push(&table);
                } else {
                    self.push(&format!("{table} AS {name}"));
                }
            }
            NodeKind::TableValuedFunction { db_name, args, .. } => {
                let function = self.dialect.quote_table_name(db_name);
                self.push(&format!("{function}("));
                self.expr_list(args)?;
                self.push(&format!(") AS {name}"));
            }
            NodeKind::Select(_) | NodeKind::Union { .. } => {
                self.nested(node)?;
                self.push(&format!(" AS {name}"));
            }
            _ if self.debug => {
                self.debug_node(node)?;
                self.push(&format!(" AS {name}"));
            }
            _ => return Err(self.invalid(node)),
        }
        Ok(())
    }

    /// Items of a left-deep chain of plain cross joins
    fn cross_join_list(&self, id: NodeId, items: &mut Vec<NodeId>) -> bool {
        match self.ir.kind(id) {
            NodeKind::Join {
                kind: JoinKind::Cross,
                left,
                right,
                condition: None,
            } => {
                if matches!(self.ir.kind(*right), NodeKind::Join { .. }) {
                    return false;
                }
                let ok = match self.ir.kind(*left) {
                    NodeKind::Join { .. } => self.cross_join_list(*left, items),
                    _ => {
                        items.push(*left);
                        true
                    }
                };
                items.push(*right);
                ok
            }
            _ => false,
        }
    }

    fn join(&mut self, id: NodeId) -> CompileResult<()> {
        let NodeKind::Join {
            kind,
            left,
            right,
            condition,
        } = *self.ir.kind(id)
        else {
            return Err(self.invalid(id));
        };
        self.source(left)?;
        self.newline();
        // a condition on a cross join still has to be applied
        let keyword = match (kind, condition) {
            (JoinKind::Cross, Some(_)) => JoinKind::Inner.keyword(),
            _ => kind.keyword(),
        };
        self.push(&format!("{keyword} "));
        if matches!(self.ir.kind(right), NodeKind::Join { .. }) {
            self.push("(");
            self.source(right)?;
            self.push(")");
        } else {
            self.source(right)?;
        }
        match (kind, condition) {
            (JoinKind::CrossApply | JoinKind::OuterApply, _) => {}
            (_, Some(condition)) => {
                self.push(" ON ");
                self.expr(condition)?;
            }
            (JoinKind::Inner | JoinKind::LeftOuter, None) => self.push(" ON 1 = 1"),
            (JoinKind::Cross, None) => {}
        }
        Ok(())
    }
}
