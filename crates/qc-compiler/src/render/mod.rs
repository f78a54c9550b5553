//! Text renderer - bound IR to T-SQL text
//!
//! A depth-first printer over the reduced IR. It threads two pieces of
//! state through the walk: the indentation depth used for nested selects,
//! and a [`NameTable`](names::NameTable) of generated alias and column
//! names. With `debug` set, nodes that have no SQL form are printed in a
//! diagnostic notation instead of failing.

mod debug;
mod expr;
pub(crate) mod names;
mod select;
pub mod shape;

use std::collections::{HashMap, HashSet};

use qc_core::Value;
use qc_sql::{dialect_for, SqlDialect};
use serde::Serialize;

use crate::context::CompileContext;
use crate::error::{CompileError, CompileResult};
use crate::ir::{Ir, NodeId, NodeKind};
use names::NameTable;

pub use shape::ResultShape;

/// A parameter the rendered text expects
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryParameter {
    /// Name including the leading `@`
    pub name: String,
    /// Value known at compile time
    pub value: Option<Value>,
    /// Storage type, when known
    pub db_type: Option<String>,
    /// Parent row column feeding a child query parameter
    pub parent_column: Option<String>,
    #[serde(skip)]
    pub(crate) outer: Option<NodeId>,
}

/// Output of one render call
#[derive(Debug)]
pub(crate) struct Rendered {
    pub statements: Vec<String>,
    pub parameters: Vec<QueryParameter>,
    /// Names assigned during the call, for shapes and child parameters
    pub names: NameTable,
}

/// Render every emitted statement under `root`
pub(crate) fn render(
    ir: &Ir,
    root: NodeId,
    cx: &CompileContext<'_>,
    debug: bool,
) -> CompileResult<Rendered> {
    let mut renderer = Renderer::new(ir, root, cx, debug);
    let statements = match ir.kind(root) {
        NodeKind::Block { statements } => {
            let mut out = Vec::with_capacity(statements.len());
            for &statement in statements {
                if is_hidden(ir, statement) {
                    log::debug!("Skipping do-not-output statement {statement}");
                    continue;
                }
                out.push(renderer.statement_text(statement)?);
            }
            out
        }
        _ => vec![renderer.statement_text(root)?],
    };
    Ok(Rendered {
        statements,
        parameters: renderer.parameters,
        names: renderer.names,
    })
}

/// Statement computed for its effect on others only
pub(crate) fn is_hidden(ir: &Ir, statement: NodeId) -> bool {
    ir.select(statement).is_some_and(|s| s.do_not_output)
}

pub(crate) struct Renderer<'a, 'c> {
    ir: &'a Ir,
    cx: &'a CompileContext<'c>,
    dialect: Box<dyn SqlDialect>,
    debug: bool,
    names: NameTable,
    /// Source (select, table, union leg) to the alias naming it
    owners: HashMap<NodeId, NodeId>,
    /// Aliases whose sources are named directly (UPDATE/DELETE targets)
    suppressed: HashSet<NodeId>,
    /// Selects being rendered, innermost last
    scopes: Vec<NodeId>,
    parameters: Vec<QueryParameter>,
    next_literal: usize,
    out: String,
    depth: usize,
}

impl<'a, 'c> Renderer<'a, 'c> {
    fn new(ir: &'a Ir, root: NodeId, cx: &'a CompileContext<'c>, debug: bool) -> Self {
        Self {
            ir,
            cx,
            dialect: dialect_for(cx.provider()),
            debug,
            names: NameTable::assign(ir, root),
            owners: ir.alias_owner_map(root),
            suppressed: HashSet::new(),
            scopes: Vec::new(),
            parameters: Vec::new(),
            next_literal: 0,
            out: String::new(),
            depth: 0,
        }
    }

    fn statement_text(&mut self, statement: NodeId) -> CompileResult<String> {
        self.out.clear();
        self.depth = 0;
        self.statement(statement)?;
        Ok(std::mem::take(&mut self.out))
    }

    fn push(&mut self, text: &str) {
        self.out.push_str(text);
    }

    fn newline(&mut self) {
        self.out.push('\n');
        for _ in 0..self.depth {
            self.out.push_str("    ");
        }
    }

    fn quote(&self, ident: &str) -> String {
        self.dialect.quote_ident(ident)
    }

    fn invalid(&self, id: NodeId) -> CompileError {
        CompileError::InvalidNodeForFormat {
            node: self.ir.kind(id).name().to_string(),
            format: "SQL text".to_string(),
        }
    }

    fn statement(&mut self, id: NodeId) -> CompileResult<()> {
        match self.ir.kind(id) {
            NodeKind::Select(_) | NodeKind::Union { .. } => self.query(id),
            NodeKind::Insert { .. } => self.insert(id),
            NodeKind::Update { .. } => self.update(id),
            NodeKind::Delete { .. } => self.delete(id),
            NodeKind::Exec { function, args } => {
                let (function, args) = (function.clone(), args.clone());
                let name = self.dialect.quote_table_name(&function);
                self.push(&format!("EXEC {name}"));
                for (i, &arg) in args.iter().enumerate() {
                    self.push(if i == 0 { " " } else { ", " });
                    self.expr(arg)?;
                }
                Ok(())
            }
            NodeKind::Block { statements } => {
                let statements = statements.clone();
                let mut first = true;
                for statement in statements {
                    if is_hidden(self.ir, statement) {
                        continue;
                    }
                    if !first {
                        self.push("\n\n");
                    }
                    first = false;
                    self.statement(statement)?;
                }
                Ok(())
            }
            _ if self.debug => self.expr(id),
            _ => Err(self.invalid(id)),
        }
    }

    fn insert(&mut self, id: NodeId) -> CompileResult<()> {
        let NodeKind::Insert {
            table,
            bindings,
            output_key,
            output_to_local,
        } = self.ir.kind(id).clone()
        else {
            return Err(self.invalid(id));
        };
        let table_name = self.table_name(table)?;
        let key = match output_key {
            Some(key) => {
                let name = self.names.column(self.ir, key);
                Some((self.quote(&name), self.type_text(key)?))
            }
            None => None,
        };

        if let (Some((name, ty)), true) = (&key, output_to_local) {
            self.push(&format!("DECLARE @output TABLE({name} {ty})"));
            self.newline();
            self.push(&format!("DECLARE @id {ty}"));
            self.newline();
        }
        self.push(&format!("INSERT INTO {table_name}"));

        let mut columns = Vec::with_capacity(bindings.len());
        let mut values = Vec::with_capacity(bindings.len());
        for &binding in &bindings {
            let NodeKind::Assign { column, value } = *self.ir.kind(binding) else {
                return Err(self.invalid(binding));
            };
            columns.push(column);
            values.push(value);
        }
        if !columns.is_empty() {
            let mut names = Vec::with_capacity(columns.len());
            for &column in &columns {
                let name = self.names.column(self.ir, column);
                names.push(self.quote(&name));
            }
            self.push(&format!("({})", names.join(", ")));
        }
        if let Some((name, _)) = &key {
            self.newline();
            self.push(&format!("OUTPUT INSERTED.{name}"));
            if output_to_local {
                self.push(" INTO @output");
            }
        }
        self.newline();
        if values.is_empty() {
            self.push("DEFAULT VALUES");
        } else {
            self.push("VALUES (");
            for (i, &value) in values.iter().enumerate() {
                if i > 0 {
                    self.push(", ");
                }
                self.expr(value)?;
            }
            self.push(")");
        }
        if let (Some((name, _)), true) = (&key, output_to_local) {
            self.newline();
            self.push(&format!("SELECT @id = {name} FROM @output"));
        }
        Ok(())
    }

    /// The single table a statement targets, named directly
    fn direct_target(&self, select: NodeId) -> Option<(NodeId, NodeId)> {
        let from = self.ir.select(select)?.from?;
        let table = self.ir.alias_node(from)?;
        matches!(self.ir.kind(table), NodeKind::Table { .. }).then_some((from, table))
    }

    /// Left-most alias of a FROM clause
    fn first_alias(&self, from: NodeId) -> Option<NodeId> {
        match self.ir.kind(from) {
            NodeKind::Alias { .. } => Some(from),
            NodeKind::Join { left, .. } => self.first_alias(*left),
            _ => None,
        }
    }

    fn update(&mut self, id: NodeId) -> CompileResult<()> {
        let NodeKind::Update {
            select,
            assignments,
        } = self.ir.kind(id).clone()
        else {
            return Err(self.invalid(id));
        };
        let Some(sel) = self.ir.select(select).cloned() else {
            return Err(self.invalid(select));
        };
        let direct = self.direct_target(select);
        match direct {
            Some((alias, table)) => {
                self.suppressed.insert(alias);
                let name = self.table_name(table)?;
                self.push(&format!("UPDATE {name}"));
            }
            None => {
                let alias = sel.from.and_then(|f| self.first_alias(f));
                let Some(alias) = alias else {
                    return Err(self.invalid(select));
                };
                let name = self.names.alias(alias);
                self.push(&format!("UPDATE {}", self.quote(&name)));
            }
        }

        self.scopes.push(select);
        self.newline();
        self.push("SET ");
        for (i, &assignment) in assignments.iter().enumerate() {
            let NodeKind::Assign { column, value } = *self.ir.kind(assignment) else {
                return Err(self.invalid(assignment));
            };
            if i > 0 {
                self.push(", ");
            }
            self.expr(column)?;
            self.push(" = ");
            self.expr(value)?;
        }
        if direct.is_none() {
            if let Some(from) = sel.from {
                self.newline();
                self.push("FROM ");
                self.source(from)?;
            }
        }
        if let Some(where_) = sel.where_ {
            self.newline();
            self.push("WHERE ");
            self.expr(where_)?;
        }
        self.scopes.pop();
        Ok(())
    }

    fn delete(&mut self, id: NodeId) -> CompileResult<()> {
        let NodeKind::Delete { select } = *self.ir.kind(id) else {
            return Err(self.invalid(id));
        };
        let Some(sel) = self.ir.select(select).cloned() else {
            return Err(self.invalid(select));
        };
        match self.direct_target(select) {
            Some((alias, table)) => {
                self.suppressed.insert(alias);
                let name = self.table_name(table)?;
                self.push(&format!("DELETE FROM {name}"));
            }
            None => {
                let alias = sel.from.and_then(|f| self.first_alias(f));
                let (Some(alias), Some(from)) = (alias, sel.from) else {
                    return Err(self.invalid(select));
                };
                let name = self.names.alias(alias);
                self.push(&format!("DELETE {}", self.quote(&name)));
                self.newline();
                self.push("FROM ");
                self.source(from)?;
            }
        }
        self.scopes.push(select);
        if let Some(where_) = sel.where_ {
            self.newline();
            self.push("WHERE ");
            self.expr(where_)?;
        }
        self.scopes.pop();
        Ok(())
    }

    fn table_name(&self, table: NodeId) -> CompileResult<String> {
        match self.ir.kind(table) {
            NodeKind::Table { name, .. } => Ok(self.dialect.quote_table_name(name)),
            _ => Err(self.invalid(table)),
        }
    }

    /// Storage type text of a node: its own provider type or its host type's default
    fn type_text(&self, id: NodeId) -> CompileResult<String> {
        let node = self.ir.node(id);
        match node.provider.or_else(|| self.cx.provider_type(&node.ty)) {
            Some(pt) => Ok(pt.to_query_string()),
            None => Err(CompileError::unsupported(format!(
                "a conversion to {}",
                node.ty.display_name()
            ))),
        }
    }
}

#[cfg(test)]
#[path = "render_test.rs"]
mod tests;
