//! The input operator-call tree
//!
//! A `QueryExpr` is what the front end hands to the compiler: a strongly
//! typed composition of sequence operators, lambdas, member accesses and
//! literals. It is a plain serde tree so it can be read from JSON.

use crate::names::{MemberName, TypeName};
use crate::types::ValueType;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Binary operators of the host expression language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    /// Bitwise/logical `&`
    And,
    /// Bitwise/logical `|`
    Or,
    ExclusiveOr,
    /// Short-circuit `&&`
    AndAlso,
    /// Short-circuit `||`
    OrElse,
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    /// `??`
    Coalesce,
    LeftShift,
    RightShift,
    Power,
}

/// Unary operators of the host expression language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnaryOperator {
    Not,
    Negate,
    UnaryPlus,
    /// Type conversion to the node's type
    Convert,
    /// Quoted lambda
    Quote,
    ArrayLength,
}

/// Method family a call belongs to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Declaring {
    /// Composable sequence operators
    Queryable,
    /// In-memory sequence operators (same names as `Queryable`)
    Enumerable,
    /// Insert/Update/Delete
    DataManipulation,
    String,
    Math,
    Decimal,
    DateTime,
    DateTimeOffset,
    TimeSpan,
    Convert,
    Object,
    Nullable,
    SqlMethods,
    /// A mapped database function or stored procedure
    Mapped { function: String },
    /// Anything else; never lowered
    Other { name: String },
}

impl Declaring {
    /// Returns true for the sequence operator families
    pub fn is_sequence_operator(&self) -> bool {
        matches!(self, Declaring::Queryable | Declaring::Enumerable)
    }
}

impl fmt::Display for Declaring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Declaring::Queryable => write!(f, "Queryable"),
            Declaring::Enumerable => write!(f, "Enumerable"),
            Declaring::DataManipulation => write!(f, "DataManipulation"),
            Declaring::String => write!(f, "String"),
            Declaring::Math => write!(f, "Math"),
            Declaring::Decimal => write!(f, "Decimal"),
            Declaring::DateTime => write!(f, "DateTime"),
            Declaring::DateTimeOffset => write!(f, "DateTimeOffset"),
            Declaring::TimeSpan => write!(f, "TimeSpan"),
            Declaring::Convert => write!(f, "Convert"),
            Declaring::Object => write!(f, "Object"),
            Declaring::Nullable => write!(f, "Nullable"),
            Declaring::SqlMethods => write!(f, "SqlMethods"),
            Declaring::Mapped { function } => write!(f, "{function}"),
            Declaring::Other { name } => write!(f, "{name}"),
        }
    }
}

/// A lambda parameter declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LambdaParam {
    pub name: String,
    pub ty: ValueType,
}

/// One member initializer of a `new` expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberInit {
    pub member: MemberName,
    pub value: QueryExpr,
}

/// A node of the operator-call tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QueryExpr {
    /// A mapped table handle
    Table {
        row_type: TypeName,
        #[serde(default)]
        context: Option<String>,
    },
    /// A named query resolved through the session
    Queryable {
        name: String,
        ty: ValueType,
        #[serde(default)]
        context: Option<String>,
    },
    /// A literal
    Constant { value: Value, ty: ValueType },
    /// A captured host variable (always a query parameter)
    Variable {
        name: String,
        ty: ValueType,
        #[serde(default)]
        value: Option<Value>,
    },
    /// Reference to a lambda parameter
    Parameter { name: String, ty: ValueType },
    Lambda {
        params: Vec<LambdaParam>,
        body: Box<QueryExpr>,
    },
    Member {
        target: Box<QueryExpr>,
        member: MemberName,
        ty: ValueType,
    },
    Call {
        declaring: Declaring,
        method: String,
        #[serde(default)]
        target: Option<Box<QueryExpr>>,
        #[serde(default)]
        args: Vec<QueryExpr>,
        ty: ValueType,
    },
    Binary {
        op: BinaryOperator,
        left: Box<QueryExpr>,
        right: Box<QueryExpr>,
        ty: ValueType,
    },
    Unary {
        op: UnaryOperator,
        operand: Box<QueryExpr>,
        ty: ValueType,
    },
    Conditional {
        test: Box<QueryExpr>,
        if_true: Box<QueryExpr>,
        if_false: Box<QueryExpr>,
        ty: ValueType,
    },
    New {
        ty: ValueType,
        #[serde(default)]
        members: Vec<MemberInit>,
    },
    NewArray {
        #[serde(default)]
        elements: Vec<QueryExpr>,
        ty: ValueType,
    },
    TypeIs {
        operand: Box<QueryExpr>,
        type_name: TypeName,
    },
    TypeAs {
        operand: Box<QueryExpr>,
        type_name: TypeName,
    },
    /// Invocation of a lambda
    Invoke {
        lambda: Box<QueryExpr>,
        #[serde(default)]
        args: Vec<QueryExpr>,
    },
}

impl QueryExpr {
    /// Result type of this node
    pub fn ty(&self) -> ValueType {
        match self {
            QueryExpr::Table { row_type, .. } => ValueType::sequence(ValueType::Entity {
                name: row_type.clone(),
            }),
            QueryExpr::Queryable { ty, .. }
            | QueryExpr::Constant { ty, .. }
            | QueryExpr::Variable { ty, .. }
            | QueryExpr::Parameter { ty, .. }
            | QueryExpr::Member { ty, .. }
            | QueryExpr::Call { ty, .. }
            | QueryExpr::Binary { ty, .. }
            | QueryExpr::Unary { ty, .. }
            | QueryExpr::Conditional { ty, .. }
            | QueryExpr::New { ty, .. }
            | QueryExpr::NewArray { ty, .. } => ty.clone(),
            QueryExpr::Lambda { body, .. } => body.ty(),
            QueryExpr::TypeIs { .. } => ValueType::bool(),
            QueryExpr::TypeAs { type_name, .. } => ValueType::Entity {
                name: type_name.clone(),
            },
            QueryExpr::Invoke { lambda, .. } => lambda.ty(),
        }
    }

    /// Short node-kind label for diagnostics
    pub fn kind_name(&self) -> &'static str {
        match self {
            QueryExpr::Table { .. } => "Table",
            QueryExpr::Queryable { .. } => "Queryable",
            QueryExpr::Constant { .. } => "Constant",
            QueryExpr::Variable { .. } => "Variable",
            QueryExpr::Parameter { .. } => "Parameter",
            QueryExpr::Lambda { .. } => "Lambda",
            QueryExpr::Member { .. } => "MemberAccess",
            QueryExpr::Call { .. } => "Call",
            QueryExpr::Binary { .. } => "Binary",
            QueryExpr::Unary { .. } => "Unary",
            QueryExpr::Conditional { .. } => "Conditional",
            QueryExpr::New { .. } => "New",
            QueryExpr::NewArray { .. } => "NewArray",
            QueryExpr::TypeIs { .. } => "TypeIs",
            QueryExpr::TypeAs { .. } => "TypeAs",
            QueryExpr::Invoke { .. } => "Invoke",
        }
    }

    /// Strip a quote wrapper, if any
    pub fn unquote(&self) -> &QueryExpr {
        match self {
            QueryExpr::Unary {
                op: UnaryOperator::Quote,
                operand,
                ..
            } => operand.unquote(),
            other => other,
        }
    }

    /// Returns the lambda parameters and body, seeing through a quote
    pub fn as_lambda(&self) -> Option<(&[LambdaParam], &QueryExpr)> {
        match self.unquote() {
            QueryExpr::Lambda { params, body } => Some((params.as_slice(), body.as_ref())),
            _ => None,
        }
    }

    /// Constant payload, if this is a constant
    pub fn as_constant(&self) -> Option<&Value> {
        match self {
            QueryExpr::Constant { value, .. } => Some(value),
            _ => None,
        }
    }

    /// Short description of the construct for error messages
    pub fn describe(&self) -> String {
        match self {
            QueryExpr::Table { row_type, .. } => format!("Table<{row_type}>"),
            QueryExpr::Queryable { name, .. } => format!("queryable '{name}'"),
            QueryExpr::Constant { value, .. } => format!("constant {value}"),
            QueryExpr::Variable { name, .. } | QueryExpr::Parameter { name, .. } => name.clone(),
            QueryExpr::Member { target, member, .. } => {
                format!("{}.{member}", target.describe())
            }
            QueryExpr::Call {
                declaring, method, ..
            } => format!("{declaring}.{method}"),
            QueryExpr::Binary { op, .. } => format!("binary {op:?}"),
            QueryExpr::Unary { op, .. } => format!("unary {op:?}"),
            other => other.kind_name().to_string(),
        }
    }
}

/// Convenience constructors for building query trees in code and tests
pub mod build {
    use super::*;

    /// `Table<T>`
    pub fn table(row_type: &str) -> QueryExpr {
        QueryExpr::Table {
            row_type: TypeName::new(row_type),
            context: None,
        }
    }

    /// A literal of the value's natural type (or `ty` for nulls)
    pub fn constant(value: Value, ty: ValueType) -> QueryExpr {
        QueryExpr::Constant { value, ty }
    }

    /// An `Int32` literal
    pub fn int(i: i64) -> QueryExpr {
        constant(Value::Int(i), ValueType::int32())
    }

    /// A string literal
    pub fn string(s: &str) -> QueryExpr {
        constant(Value::String(s.to_string()), ValueType::string())
    }

    /// A boolean literal
    pub fn boolean(b: bool) -> QueryExpr {
        constant(Value::Bool(b), ValueType::bool())
    }

    /// A null literal of the given type
    pub fn null(ty: ValueType) -> QueryExpr {
        constant(Value::Null, ty)
    }

    /// A captured host variable
    pub fn variable(name: &str, value: Value, ty: ValueType) -> QueryExpr {
        QueryExpr::Variable {
            name: name.to_string(),
            ty,
            value: Some(value),
        }
    }

    /// Lambda parameter reference
    pub fn param(name: &str, ty: ValueType) -> QueryExpr {
        QueryExpr::Parameter {
            name: name.to_string(),
            ty,
        }
    }

    /// Single-parameter lambda
    pub fn lambda(name: &str, ty: ValueType, body: QueryExpr) -> QueryExpr {
        lambda_n(vec![(name, ty)], body)
    }

    /// Multi-parameter lambda
    pub fn lambda_n(params: Vec<(&str, ValueType)>, body: QueryExpr) -> QueryExpr {
        QueryExpr::Lambda {
            params: params
                .into_iter()
                .map(|(name, ty)| LambdaParam {
                    name: name.to_string(),
                    ty,
                })
                .collect(),
            body: Box::new(body),
        }
    }

    /// `target.member`
    pub fn member(target: QueryExpr, member: &str, ty: ValueType) -> QueryExpr {
        QueryExpr::Member {
            target: Box::new(target),
            member: MemberName::new(member),
            ty,
        }
    }

    /// A sequence operator call (`Queryable.method(args...)`)
    pub fn seq(method: &str, args: Vec<QueryExpr>, ty: ValueType) -> QueryExpr {
        QueryExpr::Call {
            declaring: Declaring::Queryable,
            method: method.to_string(),
            target: None,
            args,
            ty,
        }
    }

    /// A static or instance call on another family
    pub fn call(
        declaring: Declaring,
        method: &str,
        target: Option<QueryExpr>,
        args: Vec<QueryExpr>,
        ty: ValueType,
    ) -> QueryExpr {
        QueryExpr::Call {
            declaring,
            method: method.to_string(),
            target: target.map(Box::new),
            args,
            ty,
        }
    }

    /// A binary operator node
    pub fn binary(
        op: BinaryOperator,
        left: QueryExpr,
        right: QueryExpr,
        ty: ValueType,
    ) -> QueryExpr {
        QueryExpr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
            ty,
        }
    }

    /// A boolean comparison
    pub fn compare(op: BinaryOperator, left: QueryExpr, right: QueryExpr) -> QueryExpr {
        binary(op, left, right, ValueType::bool())
    }

    /// A unary operator node
    pub fn unary(op: UnaryOperator, operand: QueryExpr, ty: ValueType) -> QueryExpr {
        QueryExpr::Unary {
            op,
            operand: Box::new(operand),
            ty,
        }
    }

    /// `new { a = ..., b = ... }` with the record type computed from members
    pub fn record(members: Vec<(&str, QueryExpr)>) -> QueryExpr {
        let ty = ValueType::record(members.iter().map(|(n, e)| (n.to_string(), e.ty())));
        QueryExpr::New {
            ty,
            members: members
                .into_iter()
                .map(|(n, value)| MemberInit {
                    member: MemberName::new(n),
                    value,
                })
                .collect(),
        }
    }
}

#[cfg(test)]
#[path = "query_test.rs"]
mod tests;
