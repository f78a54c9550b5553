//! Pass infrastructure - reduction passes over the bound IR
//!
//! Passes run after binding and method lowering, in registration order.
//! Each one rewrites the arena in place and returns the (possibly
//! replaced) root.

pub mod booleanize;
pub mod client_queries;
pub mod flatten;
pub mod ordering;
pub mod prune;
pub mod resolve;
pub mod validate;

use crate::context::CompileContext;
use crate::error::CompileResult;
use crate::ir::{Ir, NodeId, NodeKind};

/// A query split out of its parent's selection and run on its own
#[derive(Debug, Clone, PartialEq)]
pub struct ChildQuery {
    /// Select whose selection holds the nested query
    pub parent: NodeId,
    /// The multiset or element node inside the parent's selection
    pub node: NodeId,
    /// Root select of the child
    pub select: NodeId,
    /// `@xN` parameters with the parent row column feeding each
    pub parameters: Vec<(String, NodeId)>,
}

/// Facts passes hand to later stages
#[derive(Debug, Default)]
pub struct PassState {
    pub children: Vec<ChildQuery>,
}

/// A reduction pass over the bound IR
pub trait IrPass: Send + Sync {
    /// Pass name (used for filtering and display)
    fn name(&self) -> &'static str;
    /// Human-readable description
    fn description(&self) -> &'static str;
    /// Run the pass over the tree rooted at `root`
    fn run(
        &self,
        ir: &mut Ir,
        root: NodeId,
        cx: &CompileContext<'_>,
        state: &mut PassState,
    ) -> CompileResult<NodeId>;
}

/// Manages and runs reduction passes
pub struct PassManager {
    passes: Vec<Box<dyn IrPass>>,
}

impl PassManager {
    /// Create a PassManager with all built-in passes registered
    pub fn with_defaults() -> Self {
        Self {
            passes: vec![
                Box::new(resolve::ColumnResolver),
                Box::new(client_queries::ClientQuerySplitter),
                Box::new(flatten::SelectFlattener),
                Box::new(prune::UnusedColumnPruner),
                Box::new(ordering::OrderingCleanup),
                Box::new(booleanize::Booleanizer),
                Box::new(validate::ClosedWorldValidator),
            ],
        }
    }

    /// Run all passes, or only those named in `pass_filter`
    pub fn run(
        &self,
        ir: &mut Ir,
        root: NodeId,
        cx: &CompileContext<'_>,
        state: &mut PassState,
        pass_filter: Option<&[String]>,
    ) -> CompileResult<NodeId> {
        let mut root = root;
        for pass in &self.passes {
            if let Some(filter) = pass_filter {
                if !filter.iter().any(|f| f == pass.name()) {
                    continue;
                }
            }
            log::debug!("Running pass '{}'", pass.name());
            root = pass.run(ir, root, cx, state)?;
        }
        Ok(root)
    }

    /// List all available pass names
    pub fn pass_names(&self) -> Vec<&'static str> {
        self.passes.iter().map(|p| p.name()).collect()
    }
}

/// Every select of the subtree, children before parents
pub(crate) fn selects_post_order(ir: &Ir, root: NodeId) -> Vec<NodeId> {
    let mut selects: Vec<NodeId> = ir
        .subtree(root)
        .into_iter()
        .filter(|&id| matches!(ir.kind(id), NodeKind::Select(_)))
        .collect();
    selects.reverse();
    selects
}

/// Selects that are whole statements: the root itself or members of a block
pub(crate) fn statement_selects(ir: &Ir, root: NodeId) -> Vec<NodeId> {
    match ir.kind(root) {
        NodeKind::Select(_) => vec![root],
        NodeKind::Block { statements } => statements
            .iter()
            .copied()
            .filter(|&s| matches!(ir.kind(s), NodeKind::Select(_)))
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
#[path = "pass_test.rs"]
mod tests;
