//! Runtime value types seen by the query compiler
//!
//! A `ValueType` is the host-side type of an expression: a nullable-aware
//! scalar, a mapped entity, an anonymous record, a sequence or a grouping.
//! Provider storage types live in `qc-sql`.

use crate::names::{MemberName, TypeName};
use serde::{Deserialize, Serialize};

/// Primitive scalar kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarKind {
    /// Boolean
    Bool,
    /// Unsigned 8-bit integer
    Byte,
    /// 16-bit integer
    Int16,
    /// 32-bit integer
    Int32,
    /// 64-bit integer
    Int64,
    /// Exact decimal
    Decimal,
    /// 32-bit float
    Single,
    /// 64-bit float
    Double,
    /// Single character
    Char,
    /// Unicode string
    String,
    /// Date and time without offset
    DateTime,
    /// Date and time with offset
    DateTimeOffset,
    /// Duration measured in 100ns ticks
    TimeSpan,
    /// 128-bit GUID
    Guid,
    /// Byte array
    Binary,
    /// Midpoint rounding mode (only meaningful as a constant argument)
    Rounding,
}

impl ScalarKind {
    /// Returns true for integer kinds
    pub fn is_integral(self) -> bool {
        matches!(
            self,
            ScalarKind::Byte | ScalarKind::Int16 | ScalarKind::Int32 | ScalarKind::Int64
        )
    }

    /// Returns true for any numeric kind
    pub fn is_numeric(self) -> bool {
        self.is_integral()
            || matches!(
                self,
                ScalarKind::Decimal | ScalarKind::Single | ScalarKind::Double
            )
    }

    /// Returns true for string and char kinds
    pub fn is_string_like(self) -> bool {
        matches!(self, ScalarKind::String | ScalarKind::Char)
    }

    /// Returns true for date/time kinds
    pub fn is_temporal(self) -> bool {
        matches!(self, ScalarKind::DateTime | ScalarKind::DateTimeOffset)
    }

    /// Display name used in diagnostics
    pub fn display_name(self) -> &'static str {
        match self {
            ScalarKind::Bool => "Boolean",
            ScalarKind::Byte => "Byte",
            ScalarKind::Int16 => "Int16",
            ScalarKind::Int32 => "Int32",
            ScalarKind::Int64 => "Int64",
            ScalarKind::Decimal => "Decimal",
            ScalarKind::Single => "Single",
            ScalarKind::Double => "Double",
            ScalarKind::Char => "Char",
            ScalarKind::String => "String",
            ScalarKind::DateTime => "DateTime",
            ScalarKind::DateTimeOffset => "DateTimeOffset",
            ScalarKind::TimeSpan => "TimeSpan",
            ScalarKind::Guid => "Guid",
            ScalarKind::Binary => "Binary",
            ScalarKind::Rounding => "MidpointRounding",
        }
    }
}

/// One named field of an anonymous record type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordField {
    /// Member name
    pub name: MemberName,
    /// Member type
    pub ty: ValueType,
}

/// Host-side type of an expression
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ValueType {
    /// A primitive value
    Scalar {
        kind: ScalarKind,
        #[serde(default)]
        nullable: bool,
    },
    /// A mapped entity (reference type, may be null)
    Entity { name: TypeName },
    /// An anonymous record with ordered members
    Record { fields: Vec<RecordField> },
    /// A sequence of elements
    Sequence { element: Box<ValueType> },
    /// A group produced by GroupBy
    Grouping {
        key: Box<ValueType>,
        element: Box<ValueType>,
    },
    /// No value (statements, keywords)
    Unit,
}

impl ValueType {
    /// A non-nullable scalar
    pub fn scalar(kind: ScalarKind) -> Self {
        ValueType::Scalar {
            kind,
            nullable: false,
        }
    }

    /// A nullable scalar
    pub fn nullable(kind: ScalarKind) -> Self {
        ValueType::Scalar {
            kind,
            nullable: true,
        }
    }

    /// Non-nullable boolean
    pub fn bool() -> Self {
        Self::scalar(ScalarKind::Bool)
    }

    /// Non-nullable 32-bit integer
    pub fn int32() -> Self {
        Self::scalar(ScalarKind::Int32)
    }

    /// Non-nullable 64-bit integer
    pub fn int64() -> Self {
        Self::scalar(ScalarKind::Int64)
    }

    /// Non-nullable string
    pub fn string() -> Self {
        Self::scalar(ScalarKind::String)
    }

    /// An entity type
    pub fn entity(name: impl Into<String>) -> Self {
        ValueType::Entity {
            name: TypeName::new(name),
        }
    }

    /// A sequence of `element`
    pub fn sequence(element: ValueType) -> Self {
        ValueType::Sequence {
            element: Box::new(element),
        }
    }

    /// A record built from `(name, type)` pairs
    pub fn record<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = (S, ValueType)>,
        S: Into<String>,
    {
        ValueType::Record {
            fields: fields
                .into_iter()
                .map(|(name, ty)| RecordField {
                    name: MemberName::new(name),
                    ty,
                })
                .collect(),
        }
    }

    /// A grouping with the given key and element types
    pub fn grouping(key: ValueType, element: ValueType) -> Self {
        ValueType::Grouping {
            key: Box::new(key),
            element: Box::new(element),
        }
    }

    /// The scalar kind, if this is a scalar
    pub fn scalar_kind(&self) -> Option<ScalarKind> {
        match self {
            ValueType::Scalar { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Returns true for scalars (the only types that can be a SQL column)
    pub fn is_simple(&self) -> bool {
        matches!(self, ValueType::Scalar { .. })
    }

    /// Returns true when a value of this type may be null
    ///
    /// Entities and records are references and therefore nullable; scalars
    /// carry an explicit flag.
    pub fn is_nullable(&self) -> bool {
        match self {
            ValueType::Scalar { nullable, .. } => *nullable,
            ValueType::Entity { .. } | ValueType::Record { .. } => true,
            ValueType::Sequence { .. } | ValueType::Grouping { .. } | ValueType::Unit => false,
        }
    }

    /// Same type with the nullable flag set (no-op for non-scalars)
    pub fn as_nullable(&self) -> ValueType {
        match self {
            ValueType::Scalar { kind, .. } => ValueType::nullable(*kind),
            other => other.clone(),
        }
    }

    /// Same type with the nullable flag cleared (no-op for non-scalars)
    pub fn as_non_nullable(&self) -> ValueType {
        match self {
            ValueType::Scalar { kind, .. } => ValueType::scalar(*kind),
            other => other.clone(),
        }
    }

    /// Returns true for sequences and groupings
    pub fn is_sequence(&self) -> bool {
        matches!(
            self,
            ValueType::Sequence { .. } | ValueType::Grouping { .. }
        )
    }

    /// Returns true for groupings
    pub fn is_grouping(&self) -> bool {
        matches!(self, ValueType::Grouping { .. })
    }

    /// Element type of a sequence or grouping
    pub fn element_type(&self) -> Option<&ValueType> {
        match self {
            ValueType::Sequence { element } | ValueType::Grouping { element, .. } => {
                Some(element)
            }
            _ => None,
        }
    }

    /// Entity name, if this is an entity
    pub fn entity_name(&self) -> Option<&TypeName> {
        match self {
            ValueType::Entity { name } => Some(name),
            _ => None,
        }
    }

    /// Type of a record member or of a grouping's `Key`
    pub fn member_type(&self, member: &str) -> Option<&ValueType> {
        match self {
            ValueType::Record { fields } => fields.iter().find(|f| f.name == member).map(|f| &f.ty),
            ValueType::Grouping { key, .. } if member == "Key" => Some(key),
            _ => None,
        }
    }

    /// Returns true when both types have the same shape, ignoring scalar nullability
    pub fn same_shape(&self, other: &ValueType) -> bool {
        match (self, other) {
            (ValueType::Scalar { kind: a, .. }, ValueType::Scalar { kind: b, .. }) => a == b,
            (ValueType::Record { fields: a }, ValueType::Record { fields: b }) => {
                a.len() == b.len()
                    && a
                        .iter()
                        .zip(b.iter())
                        .all(|(x, y)| x.name == y.name && x.ty.same_shape(&y.ty))
            }
            (ValueType::Sequence { element: a }, ValueType::Sequence { element: b }) => {
                a.same_shape(b)
            }
            (
                ValueType::Grouping {
                    key: ka,
                    element: ea,
                },
                ValueType::Grouping {
                    key: kb,
                    element: eb,
                },
            ) => ka.same_shape(kb) && ea.same_shape(eb),
            (a, b) => a == b,
        }
    }

    /// Human-readable name used in error messages
    pub fn display_name(&self) -> String {
        match self {
            ValueType::Scalar {
                kind,
                nullable: true,
            } => format!("{}?", kind.display_name()),
            ValueType::Scalar { kind, .. } => kind.display_name().to_string(),
            ValueType::Entity { name } => name.to_string(),
            ValueType::Record { fields } => {
                let parts: Vec<String> = fields
                    .iter()
                    .map(|f| format!("{}: {}", f.name, f.ty.display_name()))
                    .collect();
                format!("{{ {} }}", parts.join(", "))
            }
            ValueType::Sequence { element } => format!("Sequence<{}>", element.display_name()),
            ValueType::Grouping { key, element } => format!(
                "Grouping<{}, {}>",
                key.display_name(),
                element.display_name()
            ),
            ValueType::Unit => "Void".to_string(),
        }
    }
}

impl std::fmt::Display for ValueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.display_name())
    }
}

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;
