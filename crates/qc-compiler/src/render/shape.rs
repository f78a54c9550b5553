//! Result shapes - how the host builds values from result rows

use std::collections::HashMap;

use qc_core::Value;
use serde::Serialize;

use super::names::NameTable;
use crate::ir::{Ir, NodeId, NodeKind, UnaryOp};

/// Host-side construction of one result value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResultShape {
    /// A column of the result row
    Column {
        name: String,
        #[serde(rename = "type")]
        ty: String,
    },
    /// A value fixed at compile time
    Constant { value: Value },
    /// A query parameter echoed back
    Parameter { name: String },
    /// An entity or record built from member shapes
    Record {
        #[serde(rename = "type")]
        ty: String,
        members: Vec<ShapeMember>,
    },
    /// A key with the child query producing its elements
    Grouping {
        key: Box<ResultShape>,
        group: Box<ResultShape>,
    },
    /// A value read through an outer join, absent when the flag is null
    Optional {
        has_value: Box<ResultShape>,
        value: Box<ResultShape>,
    },
    /// Construction chosen by an inheritance discriminator
    Inheritance {
        discriminator: Box<ResultShape>,
        arms: Vec<ShapeArm>,
    },
    /// Construction chosen by comparing a value on the client
    Conditional {
        discriminator: Box<ResultShape>,
        whens: Vec<(ResultShape, ResultShape)>,
        otherwise: Option<Box<ResultShape>>,
    },
    /// Rows of a child query, run once per parent row
    Child { index: usize },
    /// Anything the host cannot build from the row
    Opaque { node: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShapeMember {
    pub name: String,
    pub shape: ResultShape,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShapeArm {
    /// Discriminator value; `None` for the default type
    pub code: Option<Value>,
    pub type_name: String,
    pub shape: ResultShape,
}

/// Shape of a statement select's selection
///
/// `children` maps multiset and element nodes to their child query index.
pub(crate) fn result_shape(
    ir: &Ir,
    select: NodeId,
    names: &mut NameTable,
    children: &HashMap<NodeId, usize>,
) -> Option<ResultShape> {
    let selection = ir.select(select)?.selection?;
    let mut builder = ShapeBuilder { ir, names, children };
    Some(builder.shape(selection))
}

struct ShapeBuilder<'a> {
    ir: &'a Ir,
    names: &'a mut NameTable,
    children: &'a HashMap<NodeId, usize>,
}

impl ShapeBuilder<'_> {
    fn boxed(&mut self, id: NodeId) -> Box<ResultShape> {
        Box::new(self.shape(id))
    }

    fn shape(&mut self, id: NodeId) -> ResultShape {
        let ir = self.ir;
        if let Some(&index) = self.children.get(&id) {
            return ResultShape::Child { index };
        }
        match ir.kind(id) {
            NodeKind::ColumnRef { column } => self.column(*column),
            NodeKind::Column { .. } => self.column(id),
            NodeKind::Value { value, .. } => ResultShape::Constant {
                value: value.clone(),
            },
            NodeKind::Parameter { name, .. } => ResultShape::Parameter { name: name.clone() },
            NodeKind::New { members } => ResultShape::Record {
                ty: ir.ty(id).display_name(),
                members: members
                    .iter()
                    .map(|(name, value)| ShapeMember {
                        name: name.to_string(),
                        shape: self.shape(*value),
                    })
                    .collect(),
            },
            NodeKind::Grouping { key, group } => ResultShape::Grouping {
                key: self.boxed(*key),
                group: self.boxed(*group),
            },
            NodeKind::OptionalValue { has_value, value } => ResultShape::Optional {
                has_value: self.boxed(*has_value),
                value: self.boxed(*value),
            },
            NodeKind::TypeCase {
                discriminator,
                whens,
            } => ResultShape::Inheritance {
                discriminator: self.boxed(*discriminator),
                arms: whens
                    .iter()
                    .map(|w| ShapeArm {
                        code: w.code.clone(),
                        type_name: w.type_name.to_string(),
                        shape: self.shape(w.binding),
                    })
                    .collect(),
            },
            NodeKind::ClientCase {
                discriminator,
                whens,
                else_,
            } => ResultShape::Conditional {
                discriminator: self.boxed(*discriminator),
                whens: whens
                    .iter()
                    .map(|w| (self.shape(w.test), self.shape(w.value)))
                    .collect(),
                otherwise: else_.map(|e| self.boxed(e)),
            },
            NodeKind::Unary {
                op: UnaryOp::Treat | UnaryOp::OuterJoinedValue,
                operand,
            } => self.shape(*operand),
            other => ResultShape::Opaque {
                node: other.name().to_string(),
            },
        }
    }

    fn column(&mut self, column: NodeId) -> ResultShape {
        ResultShape::Column {
            name: self.names.column(self.ir, column),
            ty: self.ir.ty(column).display_name(),
        }
    }
}
