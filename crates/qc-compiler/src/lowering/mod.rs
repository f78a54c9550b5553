//! Query lowering - converts the operator-call tree into relational IR
//!
//! One outside-in pass. Sequence operators build `Select`/`Alias`/`Join`
//! trees; lambda bodies are lowered with their parameters bound to
//! references of the aliases they range over. Member accesses, links and
//! method calls are left for the binder and the method pass.

pub(crate) mod aggregate;
pub(crate) mod dml;
pub(crate) mod expr;
pub(crate) mod group;
pub(crate) mod paging;
pub(crate) mod sequence;

use crate::context::CompileContext;
use crate::error::{CompileError, CompileResult};
use crate::ir::{Ir, NodeId, NodeKind, SubSelectKind};
use qc_core::{Declaring, LambdaParam, QueryExpr};
use std::collections::HashMap;
use std::sync::Arc;

pub(crate) use group::GroupInfo;

/// Lower a query tree into `ir`, returning the root node
pub fn lower_query(
    ir: &mut Ir,
    cx: &CompileContext<'_>,
    query: &QueryExpr,
) -> CompileResult<NodeId> {
    let mut lowerer = Lowerer::new(ir, cx);
    let root = lowerer.visit(query, true)?;
    log::debug!("Lowered {} into {} IR nodes", query.kind_name(), lowerer.ir.len());
    Ok(root)
}

/// Lowering state for one compilation
pub(crate) struct Lowerer<'a, 'c> {
    pub(crate) ir: &'a mut Ir,
    pub(crate) cx: &'a CompileContext<'c>,
    /// Lambda parameter bindings, innermost last
    scopes: Vec<HashMap<String, NodeId>>,
    /// Grouped selects keyed by the node that exposes the group
    gmap: HashMap<NodeId, GroupInfo>,
    /// Named queryables being expanded
    expanding: Vec<String>,
}

impl<'a, 'c> Lowerer<'a, 'c> {
    pub(crate) fn new(ir: &'a mut Ir, cx: &'a CompileContext<'c>) -> Self {
        Self {
            ir,
            cx,
            scopes: Vec::new(),
            gmap: HashMap::new(),
            expanding: Vec::new(),
        }
    }

    /// Lower one node; `outer` is true only for the root of the query
    pub(crate) fn visit(&mut self, e: &QueryExpr, outer: bool) -> CompileResult<NodeId> {
        let origin: Arc<str> = Arc::from(e.describe());
        let prev = self.ir.set_origin(Some(origin));
        let result = self.visit_inner(e, outer);
        self.ir.set_origin(prev);
        result
    }

    fn visit_inner(&mut self, e: &QueryExpr, outer: bool) -> CompileResult<NodeId> {
        match e {
            QueryExpr::Table { row_type, context } => {
                self.visit_table(row_type, context.as_deref())
            }
            QueryExpr::Queryable { name, context, .. } => {
                self.visit_queryable(name, context.as_deref(), outer)
            }
            QueryExpr::Constant { value, ty } => Ok(self.visit_constant(value, ty)),
            QueryExpr::Variable { name, ty, value } => {
                Ok(self.visit_variable(name, value.clone(), ty))
            }
            QueryExpr::Parameter { name, .. } => self.visit_parameter(name),
            QueryExpr::Lambda { .. } => Err(CompileError::unsupported(
                "a lambda outside an operator argument",
            )),
            QueryExpr::Member { target, member, ty } => self.visit_member(target, member, ty),
            QueryExpr::Call {
                declaring,
                method,
                target,
                args,
                ty,
            } => match declaring {
                d if d.is_sequence_operator() => {
                    self.visit_sequence_call(d, method, args, ty, outer)
                }
                Declaring::DataManipulation => self.visit_dml(method, args, ty, outer),
                Declaring::Mapped { function } => {
                    self.visit_mapped_function(function, args, ty, outer)
                }
                _ => self.visit_method_call(declaring, method, target.as_deref(), args, ty),
            },
            QueryExpr::Binary {
                op,
                left,
                right,
                ty,
            } => self.visit_binary(*op, left, right, ty),
            QueryExpr::Unary { op, operand, ty } => self.visit_unary(*op, operand, ty),
            QueryExpr::Conditional {
                test,
                if_true,
                if_false,
                ..
            } => self.visit_conditional(test, if_true, if_false),
            QueryExpr::New { ty, members } => self.visit_new(ty, members),
            QueryExpr::NewArray { .. } => Err(CompileError::unsupported(
                "constructed arrays outside Contains",
            )),
            QueryExpr::TypeIs { operand, type_name } => self.visit_type_is(operand, type_name),
            QueryExpr::TypeAs { operand, type_name } => self.visit_type_as(operand, type_name),
            QueryExpr::Invoke { lambda, args } => self.visit_invoke(lambda, args),
        }
    }

    /// Run `f` with lambda parameters bound; the scope is popped even on error
    pub(crate) fn with_bindings<T>(
        &mut self,
        bindings: Vec<(&LambdaParam, NodeId)>,
        f: impl FnOnce(&mut Self) -> CompileResult<T>,
    ) -> CompileResult<T> {
        let scope = bindings
            .into_iter()
            .map(|(p, node)| (p.name.clone(), node))
            .collect();
        self.scopes.push(scope);
        let result = f(self);
        self.scopes.pop();
        result
    }

    /// Lower a lambda body with each parameter bound to the given node
    pub(crate) fn visit_lambda(
        &mut self,
        operator: &str,
        lambda: &QueryExpr,
        bound: &[NodeId],
    ) -> CompileResult<NodeId> {
        let (params, body) = lambda_parts(operator, lambda, bound.len())?;
        let bindings = params.iter().zip(bound.iter().copied()).collect();
        self.with_bindings(bindings, |this| this.visit(body, false))
    }

    fn visit_parameter(&mut self, name: &str) -> CompileResult<NodeId> {
        let template = self
            .scopes
            .iter()
            .rev()
            .find_map(|s| s.get(name).copied())
            .ok_or_else(|| CompileError::ParameterNotInScope {
                name: name.to_string(),
            })?;
        Ok(self.ir.duplicate(template))
    }

    /// Lower a value position; a nested select becomes a multiset
    pub(crate) fn visit_expression(&mut self, e: &QueryExpr) -> CompileResult<NodeId> {
        let node = self.visit(e, false)?;
        Ok(self.as_expression(node))
    }

    /// View a lowered node as a value
    pub(crate) fn as_expression(&mut self, node: NodeId) -> NodeId {
        match self.ir.kind(node) {
            NodeKind::Select(_) => self.ir.sub_select(SubSelectKind::Multiset, node),
            _ => node,
        }
    }

    /// Lower a sequence-valued argument into a select
    pub(crate) fn visit_sequence(&mut self, e: &QueryExpr) -> CompileResult<NodeId> {
        let node = self.visit(e, false)?;
        self.coerce_to_sequence(node)
    }

    /// View any sequence-valued node as a select
    pub(crate) fn coerce_to_sequence(&mut self, node: NodeId) -> CompileResult<NodeId> {
        match self.ir.kind(node) {
            NodeKind::Select(_) => Ok(node),
            NodeKind::SubSelect {
                kind: SubSelectKind::Multiset | SubSelectKind::Element,
                select,
            } => Ok(*select),
            NodeKind::Parameter { .. } => Err(CompileError::unsupported(
                "a query parameter used as a sequence",
            )),
            _ => {
                if let Some(elements) = self.group_elements(node) {
                    return Ok(self.ir.duplicate(elements));
                }
                let alias = self.ir.alias(node);
                let aref = self.ir.alias_ref(alias);
                Ok(self.ir.new_select(aref, Some(alias)))
            }
        }
    }

    /// Element select of the grouping `node` reads, through aliases and selections
    fn group_elements(&self, node: NodeId) -> Option<NodeId> {
        let mut current = node;
        loop {
            current = match self.ir.kind(current) {
                NodeKind::AliasRef { alias } => *alias,
                NodeKind::Alias { node } => match self.ir.select(*node) {
                    Some(select) => select.selection?,
                    None => *node,
                },
                NodeKind::Grouping { group, .. } => {
                    return match self.ir.kind(*group) {
                        NodeKind::SubSelect {
                            kind: SubSelectKind::Multiset,
                            select,
                        } => Some(*select),
                        _ => None,
                    };
                }
                _ => return None,
            };
        }
    }

    /// Wrap `select` so a new clause cannot change its existing semantics
    pub(crate) fn lock_select(&mut self, select: NodeId) -> NodeId {
        let needs_lock = match self.ir.select(select) {
            Some(s) => {
                let selection_is_ref = s
                    .selection
                    .is_some_and(|sel| matches!(self.ir.kind(sel), NodeKind::AliasRef { .. }));
                !selection_is_ref
                    || !s.is_projection_only()
                    || s.ordering != crate::ir::OrderingType::Default
            }
            None => true,
        };
        if !needs_lock {
            return select;
        }
        let alias = self.ir.alias(select);
        let aref = self.ir.alias_ref(alias);
        self.ir.new_select(aref, Some(alias))
    }

    /// Alias a select and return `(alias, alias_ref)`
    pub(crate) fn alias_select(&mut self, select: NodeId) -> (NodeId, NodeId) {
        let alias = self.ir.alias(select);
        let aref = self.ir.alias_ref(alias);
        (alias, aref)
    }

    /// Selection of a select
    pub(crate) fn selection(&self, select: NodeId) -> CompileResult<NodeId> {
        self.ir
            .select(select)
            .and_then(|s| s.selection)
            .ok_or_else(|| CompileError::unsupported("a select without a selection"))
    }
}

/// Parameters and body of a lambda argument with the expected arity
pub(crate) fn lambda_parts<'q>(
    operator: &str,
    lambda: &'q QueryExpr,
    arity: usize,
) -> CompileResult<(&'q [LambdaParam], &'q QueryExpr)> {
    match lambda.as_lambda() {
        Some((params, body)) if params.len() == arity => Ok((params, body)),
        Some((params, _)) => Err(CompileError::UnsupportedOverload {
            operator: operator.to_string(),
            detail: format!("expected a {arity}-parameter lambda, got {}", params.len()),
        }),
        None => Err(CompileError::UnsupportedOverload {
            operator: operator.to_string(),
            detail: format!("expected a lambda, got {}", lambda.kind_name()),
        }),
    }
}

#[cfg(test)]
#[path = "lowering_test.rs"]
mod tests;
