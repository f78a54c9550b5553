//! Compiler facade - query tree in, rendered statements out

use std::collections::HashMap;

use qc_core::{CompilerConfig, MetaModel, QueryExpr, Session};
use qc_sql::TypeProvider;
use serde::Serialize;

use crate::bind::bind;
use crate::context::CompileContext;
use crate::error::CompileResult;
use crate::ir::{Ir, NodeId, NodeKind};
use crate::lowering::lower_query;
use crate::methods::lower_methods;
use crate::pass::{PassManager, PassState};
use crate::render::names::NameTable;
use crate::render::shape::result_shape;
use crate::render::{is_hidden, render, QueryParameter, ResultShape};

/// Output of one compilation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledQuery {
    /// Rendered statements in execution order
    pub statements: Vec<String>,
    pub parameters: Vec<QueryParameter>,
    /// How the host builds results from the last statement's rows
    pub shape: Option<ResultShape>,
    /// Statement whose result row carries a generated identity
    pub identity_statement: Option<usize>,
    /// Queries run once per parent row
    pub children: Vec<CompiledChild>,
    /// Diagnostic rendering, showing nodes without a SQL form
    pub debug_text: String,
}

impl CompiledQuery {
    /// All statements separated by blank lines
    pub fn text(&self) -> String {
        self.statements.join("\n\n")
    }
}

/// A nested collection compiled into its own query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledChild {
    pub text: String,
    /// `@xN` parameters, each fed by a parent row column
    pub parameters: Vec<QueryParameter>,
    pub shape: Option<ResultShape>,
}

/// Compiles query trees against one mapping, session and provider
///
/// Every call to [`compile`](QueryCompiler::compile) works on a fresh arena;
/// nothing is shared between compilations.
pub struct QueryCompiler<'a> {
    cx: CompileContext<'a>,
}

impl<'a> QueryCompiler<'a> {
    pub fn new(
        model: &'a dyn MetaModel,
        session: &'a dyn Session,
        types: &'a dyn TypeProvider,
        config: &'a CompilerConfig,
    ) -> Self {
        Self {
            cx: CompileContext::new(model, session, types, config),
        }
    }

    /// Lower, bind, reduce and render `query`
    pub fn compile(&self, query: &QueryExpr) -> CompileResult<CompiledQuery> {
        self.compile_with_passes(query, None)
    }

    /// Compile running only the reduction passes named in `pass_filter`
    pub fn compile_with_passes(
        &self,
        query: &QueryExpr,
        pass_filter: Option<&[String]>,
    ) -> CompileResult<CompiledQuery> {
        let cx = &self.cx;
        let mut ir = Ir::new();
        let root = lower_query(&mut ir, cx, query)?;
        log::debug!("Lowered query into {} IR nodes", ir.len());
        let root = bind(&mut ir, cx, root)?;
        let root = lower_methods(&mut ir, cx, root)?;

        let mut state = PassState::default();
        let root = PassManager::with_defaults().run(&mut ir, root, cx, &mut state, pass_filter)?;

        let debug = cx.config.debug_render;
        let mut main = render(&ir, root, cx, debug)?;
        let child_index: HashMap<NodeId, usize> = state
            .children
            .iter()
            .enumerate()
            .map(|(i, child)| (child.node, i))
            .collect();

        // names of each rendered select tree, so child parameters can name
        // the parent column they read
        let mut child_names: HashMap<NodeId, NameTable> = HashMap::new();
        let mut children = Vec::with_capacity(state.children.len());
        for child in &state.children {
            let mut rendered = render(&ir, child.select, cx, debug)?;
            let parent_names = child_names
                .get_mut(&child.parent)
                .unwrap_or(&mut main.names);
            for parameter in &mut rendered.parameters {
                if let Some(outer) = parameter.outer {
                    parameter.parent_column = Some(parent_names.column(&ir, outer));
                }
            }
            let shape = result_shape(&ir, child.select, &mut rendered.names, &child_index);
            children.push(CompiledChild {
                text: rendered.statements.join("\n\n"),
                parameters: rendered.parameters,
                shape,
            });
            child_names.insert(child.select, rendered.names);
        }

        let shape = shape_select(&ir, root)
            .and_then(|select| result_shape(&ir, select, &mut main.names, &child_index));
        let identity_statement = identity_statement(&ir, root, main.statements.len());
        let debug_text = if debug {
            main.statements.join("\n\n")
        } else {
            render(&ir, root, cx, true)?.statements.join("\n\n")
        };
        log::debug!(
            "Compiled {} statement(s) with {} child quer(ies)",
            main.statements.len(),
            children.len()
        );

        Ok(CompiledQuery {
            statements: main.statements,
            parameters: main.parameters,
            shape,
            identity_statement,
            children,
            debug_text,
        })
    }
}

/// The select whose rows the caller reads
fn shape_select(ir: &Ir, root: NodeId) -> Option<NodeId> {
    match ir.kind(root) {
        NodeKind::Select(_) => Some(root),
        NodeKind::Union { left, .. } => shape_select(ir, *left),
        NodeKind::Block { statements } => statements
            .iter()
            .rev()
            .filter(|&&s| !is_hidden(ir, s))
            .find_map(|&s| shape_select(ir, s)),
        _ => None,
    }
}

/// Index of the last emitted statement when a block inserts and reads back
fn identity_statement(ir: &Ir, root: NodeId, emitted: usize) -> Option<usize> {
    let NodeKind::Block { statements } = ir.kind(root) else {
        return None;
    };
    let first = statements.first()?;
    if !matches!(ir.kind(*first), NodeKind::Insert { .. }) {
        return None;
    }
    emitted.checked_sub(1)
}

#[cfg(test)]
#[path = "compiler_test.rs"]
mod tests;
