//! Literal values carried by query trees and IR constants

use crate::names::{MemberName, TypeName};
use crate::types::{ScalarKind, ValueType};
use chrono::{DateTime, FixedOffset, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Midpoint rounding mode for `Math.Round`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MidpointRounding {
    /// Banker's rounding (round half to even)
    ToEven,
    /// Round half away from zero
    AwayFromZero,
}

/// An entity instance supplied as a constant (DML targets)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectValue {
    /// Concrete runtime type of the instance
    pub type_name: TypeName,
    /// Current member values
    #[serde(default)]
    pub fields: BTreeMap<MemberName, Value>,
    /// Member values as originally loaded, used for the modified-member diff
    #[serde(default)]
    pub original: Option<BTreeMap<MemberName, Value>>,
}

impl ObjectValue {
    /// Current value of a member, `Null` when absent
    pub fn field(&self, member: &str) -> Value {
        self.fields.get(member).cloned().unwrap_or(Value::Null)
    }
}

/// A literal value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Value {
    /// Null
    Null,
    /// Boolean
    Bool(bool),
    /// Any integer
    Int(i64),
    /// Any float
    Float(f64),
    /// Exact decimal kept in its textual form
    Decimal(String),
    /// String
    String(String),
    /// Single character
    Char(char),
    /// Date/time without offset
    DateTime(NaiveDateTime),
    /// Date/time with offset
    DateTimeOffset(DateTime<FixedOffset>),
    /// Duration in 100ns ticks
    TimeSpan(i64),
    /// GUID
    Guid(Uuid),
    /// Byte array
    Binary(Vec<u8>),
    /// In-memory list (used by `Contains`)
    List(Vec<Value>),
    /// Entity instance
    Object(ObjectValue),
    /// Midpoint rounding mode
    Rounding(MidpointRounding),
}

impl Value {
    /// Returns true for `Null`
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Boolean payload
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Integer payload
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// String payload
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// The natural type of this value, when it has one
    pub fn natural_type(&self) -> Option<ValueType> {
        let kind = match self {
            Value::Null | Value::List(_) => return None,
            Value::Object(o) => {
                return Some(ValueType::Entity {
                    name: o.type_name.clone(),
                })
            }
            Value::Bool(_) => ScalarKind::Bool,
            Value::Int(_) => ScalarKind::Int32,
            Value::Float(_) => ScalarKind::Double,
            Value::Decimal(_) => ScalarKind::Decimal,
            Value::String(_) => ScalarKind::String,
            Value::Char(_) => ScalarKind::Char,
            Value::DateTime(_) => ScalarKind::DateTime,
            Value::DateTimeOffset(_) => ScalarKind::DateTimeOffset,
            Value::TimeSpan(_) => ScalarKind::TimeSpan,
            Value::Guid(_) => ScalarKind::Guid,
            Value::Binary(_) => ScalarKind::Binary,
            Value::Rounding(_) => ScalarKind::Rounding,
        };
        Some(ValueType::scalar(kind))
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Decimal(d) => write!(f, "{d}"),
            Value::String(s) => write!(f, "\"{s}\""),
            Value::Char(c) => write!(f, "'{c}'"),
            Value::DateTime(d) => write!(f, "{d}"),
            Value::DateTimeOffset(d) => write!(f, "{d}"),
            Value::TimeSpan(t) => write!(f, "{t} ticks"),
            Value::Guid(g) => write!(f, "{g}"),
            Value::Binary(b) => write!(f, "<{} bytes>", b.len()),
            Value::List(items) => write!(f, "[{} items]", items.len()),
            Value::Object(o) => write!(f, "{} instance", o.type_name),
            Value::Rounding(m) => write!(f, "{m:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_json_round_shape() {
        let v: Value = serde_json::from_str(r#"{"kind":"int","value":5}"#).unwrap();
        assert_eq!(v, Value::Int(5));
        let v: Value = serde_json::from_str(r#"{"kind":"null"}"#).unwrap();
        assert!(v.is_null());
    }

    #[test]
    fn test_object_field_defaults_to_null() {
        let obj = ObjectValue {
            type_name: TypeName::new("Customer"),
            fields: BTreeMap::from([(MemberName::new("Id"), Value::Int(1))]),
            original: None,
        };
        assert_eq!(obj.field("Id"), Value::Int(1));
        assert_eq!(obj.field("Name"), Value::Null);
    }

    #[test]
    fn test_natural_type() {
        assert_eq!(
            Value::String("a".into()).natural_type(),
            Some(ValueType::string())
        );
        assert_eq!(Value::Null.natural_type(), None);
    }
}
