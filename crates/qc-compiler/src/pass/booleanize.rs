//! Boolean representation fix-up
//!
//! T-SQL keeps predicates and bit values apart: a predicate cannot be
//! selected or compared, and a bit cannot stand where a search condition
//! is expected. Predicates in value positions become
//! `CASE WHEN p THEN 1 ELSE 0 END`; bit values in predicate positions are
//! compared with 1.

use qc_core::{ScalarKind, Value, ValueType};
use qc_sql::ProviderType;

use super::{IrPass, PassState};
use crate::context::CompileContext;
use crate::error::CompileResult;
use crate::ir::{BinaryOp, Ir, NodeId, NodeKind, SubSelectKind, UnaryOp, When};

/// Converts between predicates and bit values by position
pub struct Booleanizer;

impl IrPass for Booleanizer {
    fn name(&self) -> &'static str {
        "booleanize"
    }

    fn description(&self) -> &'static str {
        "Convert predicates to bit values and back where positions require"
    }

    fn run(
        &self,
        ir: &mut Ir,
        root: NodeId,
        _cx: &CompileContext<'_>,
        _state: &mut PassState,
    ) -> CompileResult<NodeId> {
        Ok(visit(ir, root, Position::Value))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Position {
    /// Search condition
    Predicate,
    /// Anything producing a value
    Value,
}

/// Node is a SQL search condition
fn is_predicate(kind: &NodeKind) -> bool {
    match kind {
        NodeKind::Binary { op, .. } => op.is_comparison() || op.is_logical(),
        NodeKind::Unary { op, .. } => matches!(
            op,
            UnaryOp::Not | UnaryOp::Not2V | UnaryOp::IsNull | UnaryOp::IsNotNull
        ),
        NodeKind::Like { .. } | NodeKind::Between { .. } | NodeKind::In { .. } => true,
        NodeKind::SubSelect { kind, .. } => *kind == SubSelectKind::Exists,
        _ => false,
    }
}

/// Node produces a plain value that may be boolean
fn is_value(kind: &NodeKind) -> bool {
    match kind {
        NodeKind::ColumnRef { .. }
        | NodeKind::Value { .. }
        | NodeKind::Parameter { .. }
        | NodeKind::Function { .. }
        | NodeKind::Aggregate { .. }
        | NodeKind::SearchedCase { .. }
        | NodeKind::SimpleCase { .. } => true,
        NodeKind::SubSelect { kind, .. } => *kind == SubSelectKind::Scalar,
        NodeKind::Unary { op, .. } => matches!(op, UnaryOp::Convert | UnaryOp::OuterJoinedValue),
        _ => false,
    }
}

fn is_bool(ty: &ValueType) -> bool {
    ty.scalar_kind() == Some(ScalarKind::Bool)
}

/// Children that sit in predicate position, and the child not to touch
fn layout(kind: &NodeKind) -> (Vec<NodeId>, Option<NodeId>) {
    match kind {
        NodeKind::Select(sel) => (
            sel.where_.iter().chain(sel.having.iter()).copied().collect(),
            sel.selection,
        ),
        NodeKind::Join { condition, .. } => (condition.iter().copied().collect(), None),
        NodeKind::SearchedCase { whens, .. } => (whens.iter().map(|w| w.test).collect(), None),
        NodeKind::Binary { op, left, right } if op.is_logical() => (vec![*left, *right], None),
        NodeKind::Unary {
            op: UnaryOp::Not | UnaryOp::Not2V,
            operand,
        } => (vec![*operand], None),
        _ => (Vec::new(), None),
    }
}

fn visit(ir: &mut Ir, id: NodeId, position: Position) -> NodeId {
    let (predicates, skip) = layout(ir.kind(id));
    let kids = ir.children(id);
    let mut mapped = Vec::with_capacity(kids.len());
    for kid in kids {
        if Some(kid) == skip {
            mapped.push(kid);
            continue;
        }
        let at = if predicates.contains(&kid) {
            Position::Predicate
        } else {
            Position::Value
        };
        mapped.push(visit(ir, kid, at));
    }
    let mut kind = ir.kind(id).clone();
    for (slot, new) in kind.children_mut().into_iter().zip(mapped) {
        *slot = new;
    }
    ir.node_mut(id).kind = kind;

    // queries nested in a selection are rendered on their own
    if let Some(selection) = skip {
        let nested: Vec<NodeId> = ir
            .subtree(selection)
            .into_iter()
            .filter_map(|n| match ir.kind(n) {
                NodeKind::SubSelect { select, .. } => Some(*select),
                _ => None,
            })
            .collect();
        for select in nested {
            visit(ir, select, Position::Value);
        }
    }

    match position {
        Position::Value if is_predicate(ir.kind(id)) => to_bit(ir, id),
        Position::Predicate if is_value(ir.kind(id)) && is_bool(ir.ty(id)) => to_predicate(ir, id),
        _ => id,
    }
}

/// `CASE WHEN p THEN 1 ELSE 0 END`, three-valued when `p` can be unknown
fn to_bit(ir: &mut Ir, predicate: NodeId) -> NodeId {
    let nullable = ir.ty(predicate).is_nullable();
    let one = ir.int_lit(1);
    let zero = ir.int_lit(0);
    let case = if nullable {
        let copy = ir.duplicate(predicate);
        let negated = ir.unary(UnaryOp::Not, copy);
        let null = ir.null(ValueType::int32());
        ir.searched_case(
            vec![
                When {
                    test: predicate,
                    value: one,
                },
                When {
                    test: negated,
                    value: zero,
                },
            ],
            null,
        )
    } else {
        ir.searched_case(
            vec![When {
                test: predicate,
                value: one,
            }],
            zero,
        )
    };
    let node = ir.node_mut(case);
    node.ty = if nullable {
        ValueType::nullable(ScalarKind::Bool)
    } else {
        ValueType::bool()
    };
    node.provider = Some(ProviderType::bit());
    case
}

/// `1 = 1` / `1 = 0` for literals, `x = 1` otherwise
fn to_predicate(ir: &mut Ir, value: NodeId) -> NodeId {
    if let Some(Value::Bool(b)) = ir.as_value(value).cloned() {
        let one = ir.int_lit(1);
        let other = ir.int_lit(i64::from(b));
        return ir.binary(BinaryOp::EQ, one, other);
    }
    let one = ir.int_lit(1);
    ir.binary(BinaryOp::EQ, value, one)
}
