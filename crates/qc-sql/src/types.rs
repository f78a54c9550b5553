//! Provider storage types
//!
//! A `ProviderType` describes how a value is stored in the target database.
//! The [`TypeProvider`] trait maps host value types onto provider types and
//! classifies conversions between them.

use crate::error::{SqlError, SqlResult};
use qc_core::{ScalarKind, ValueType};
use serde::{Deserialize, Serialize};
use std::fmt;

/// SQL Server storage type names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SqlTypeKind {
    Bit,
    TinyInt,
    SmallInt,
    Int,
    BigInt,
    Decimal,
    Money,
    Real,
    Float,
    Char,
    NChar,
    VarChar,
    NVarChar,
    Text,
    NText,
    DateTime,
    DateTime2,
    Date,
    Time,
    DateTimeOffset,
    UniqueIdentifier,
    Binary,
    VarBinary,
    Image,
    Timestamp,
}

impl SqlTypeKind {
    fn keyword(self) -> &'static str {
        match self {
            SqlTypeKind::Bit => "Bit",
            SqlTypeKind::TinyInt => "TinyInt",
            SqlTypeKind::SmallInt => "SmallInt",
            SqlTypeKind::Int => "Int",
            SqlTypeKind::BigInt => "BigInt",
            SqlTypeKind::Decimal => "Decimal",
            SqlTypeKind::Money => "Money",
            SqlTypeKind::Real => "Real",
            SqlTypeKind::Float => "Float",
            SqlTypeKind::Char => "Char",
            SqlTypeKind::NChar => "NChar",
            SqlTypeKind::VarChar => "VarChar",
            SqlTypeKind::NVarChar => "NVarChar",
            SqlTypeKind::Text => "Text",
            SqlTypeKind::NText => "NText",
            SqlTypeKind::DateTime => "DateTime",
            SqlTypeKind::DateTime2 => "DateTime2",
            SqlTypeKind::Date => "Date",
            SqlTypeKind::Time => "Time",
            SqlTypeKind::DateTimeOffset => "DateTimeOffset",
            SqlTypeKind::UniqueIdentifier => "UniqueIdentifier",
            SqlTypeKind::Binary => "Binary",
            SqlTypeKind::VarBinary => "VarBinary",
            SqlTypeKind::Image => "Image",
            SqlTypeKind::Timestamp => "rowversion",
        }
    }

    fn from_keyword(word: &str) -> Option<Self> {
        let kind = match word.to_ascii_lowercase().as_str() {
            "bit" => SqlTypeKind::Bit,
            "tinyint" => SqlTypeKind::TinyInt,
            "smallint" => SqlTypeKind::SmallInt,
            "int" | "integer" => SqlTypeKind::Int,
            "bigint" => SqlTypeKind::BigInt,
            "decimal" | "numeric" => SqlTypeKind::Decimal,
            "money" | "smallmoney" => SqlTypeKind::Money,
            "real" => SqlTypeKind::Real,
            "float" => SqlTypeKind::Float,
            "char" => SqlTypeKind::Char,
            "nchar" => SqlTypeKind::NChar,
            "varchar" => SqlTypeKind::VarChar,
            "nvarchar" => SqlTypeKind::NVarChar,
            "text" => SqlTypeKind::Text,
            "ntext" => SqlTypeKind::NText,
            "datetime" | "smalldatetime" => SqlTypeKind::DateTime,
            "datetime2" => SqlTypeKind::DateTime2,
            "date" => SqlTypeKind::Date,
            "time" => SqlTypeKind::Time,
            "datetimeoffset" => SqlTypeKind::DateTimeOffset,
            "uniqueidentifier" => SqlTypeKind::UniqueIdentifier,
            "binary" => SqlTypeKind::Binary,
            "varbinary" => SqlTypeKind::VarBinary,
            "image" => SqlTypeKind::Image,
            "timestamp" | "rowversion" => SqlTypeKind::Timestamp,
            _ => return None,
        };
        Some(kind)
    }
}

/// Length of a sized type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeSize {
    Fixed(u32),
    Max,
}

/// A provider storage type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProviderType {
    pub kind: SqlTypeKind,
    pub size: Option<TypeSize>,
    pub precision: Option<u8>,
    pub scale: Option<u8>,
}

impl ProviderType {
    /// A type with no size arguments
    pub const fn simple(kind: SqlTypeKind) -> Self {
        Self {
            kind,
            size: None,
            precision: None,
            scale: None,
        }
    }

    /// A sized type
    pub const fn sized(kind: SqlTypeKind, size: TypeSize) -> Self {
        Self {
            kind,
            size: Some(size),
            precision: None,
            scale: None,
        }
    }

    /// `Decimal(p, s)`
    pub const fn decimal(precision: u8, scale: u8) -> Self {
        Self {
            kind: SqlTypeKind::Decimal,
            size: None,
            precision: Some(precision),
            scale: Some(scale),
        }
    }

    /// `Int`
    pub const fn int() -> Self {
        Self::simple(SqlTypeKind::Int)
    }

    /// `BigInt`
    pub const fn bigint() -> Self {
        Self::simple(SqlTypeKind::BigInt)
    }

    /// `Bit`
    pub const fn bit() -> Self {
        Self::simple(SqlTypeKind::Bit)
    }

    /// `NVarChar(4000)`
    pub const fn nvarchar_default() -> Self {
        Self::sized(SqlTypeKind::NVarChar, TypeSize::Fixed(4000))
    }

    /// Character types
    pub fn is_string(&self) -> bool {
        matches!(
            self.kind,
            SqlTypeKind::Char
                | SqlTypeKind::NChar
                | SqlTypeKind::VarChar
                | SqlTypeKind::NVarChar
                | SqlTypeKind::Text
                | SqlTypeKind::NText
        )
    }

    /// Unicode character types
    pub fn is_unicode(&self) -> bool {
        matches!(
            self.kind,
            SqlTypeKind::NChar | SqlTypeKind::NVarChar | SqlTypeKind::NText
        )
    }

    /// Single-character types
    pub fn is_char(&self) -> bool {
        matches!(self.kind, SqlTypeKind::Char | SqlTypeKind::NChar)
            && matches!(self.size, None | Some(TypeSize::Fixed(1)))
    }

    /// Large object types (not comparable, not orderable)
    pub fn is_large_type(&self) -> bool {
        matches!(
            self.kind,
            SqlTypeKind::Text | SqlTypeKind::NText | SqlTypeKind::Image
        ) || self.size == Some(TypeSize::Max)
    }

    /// Whether values may appear in ORDER BY, GROUP BY and DISTINCT
    pub fn is_orderable(&self) -> bool {
        !matches!(
            self.kind,
            SqlTypeKind::Text | SqlTypeKind::NText | SqlTypeKind::Image
        )
    }

    /// Exact integer types
    pub fn is_integral(&self) -> bool {
        matches!(
            self.kind,
            SqlTypeKind::TinyInt | SqlTypeKind::SmallInt | SqlTypeKind::Int | SqlTypeKind::BigInt
        )
    }

    /// Integral or decimal types (valid identity column types)
    pub fn is_exact_numeric(&self) -> bool {
        self.is_integral() || matches!(self.kind, SqlTypeKind::Decimal | SqlTypeKind::Money)
    }

    /// Any numeric type
    pub fn is_numeric(&self) -> bool {
        self.is_exact_numeric() || matches!(self.kind, SqlTypeKind::Real | SqlTypeKind::Float)
    }

    /// Text used in CONVERT and DECLARE
    pub fn to_query_string(&self) -> String {
        let kw = self.kind.keyword();
        match (self.size, self.precision, self.scale) {
            (Some(TypeSize::Max), _, _) => format!("{kw}(MAX)"),
            (Some(TypeSize::Fixed(n)), _, _) => format!("{kw}({n})"),
            (None, Some(p), Some(s)) => format!("{kw}({p},{s})"),
            (None, Some(p), None) => format!("{kw}({p})"),
            _ => kw.to_string(),
        }
    }

    /// Parse a mapping db type such as `NVarChar(40) NOT NULL IDENTITY`
    ///
    /// Only the leading type is read; nullability and identity modifiers
    /// are ignored.
    pub fn parse(db_type: &str) -> SqlResult<Self> {
        let text = db_type.trim();
        let end = text
            .find(|c: char| c.is_whitespace() || c == '(')
            .unwrap_or(text.len());
        let word = &text[..end];
        let kind = SqlTypeKind::from_keyword(word)
            .ok_or_else(|| SqlError::UnknownDbType(db_type.to_string()))?;
        let rest = text[end..].trim_start();
        let mut ty = ProviderType::simple(kind);
        if let Some(args) = rest.strip_prefix('(') {
            let close = args
                .find(')')
                .ok_or_else(|| SqlError::UnknownDbType(db_type.to_string()))?;
            let parts: Vec<&str> = args[..close].split(',').map(str::trim).collect();
            if kind == SqlTypeKind::Decimal {
                ty.precision = parts.first().and_then(|p| p.parse().ok());
                ty.scale = parts.get(1).and_then(|s| s.parse().ok());
            } else if parts.first().is_some_and(|p| p.eq_ignore_ascii_case("max")) {
                ty.size = Some(TypeSize::Max);
            } else {
                let n = parts
                    .first()
                    .and_then(|p| p.parse().ok())
                    .ok_or_else(|| SqlError::UnknownDbType(db_type.to_string()))?;
                ty.size = Some(TypeSize::Fixed(n));
            }
        }
        Ok(ty)
    }
}

impl fmt::Display for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_query_string())
    }
}

/// How a value converts between two types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionMethod {
    /// Reference conversion within a hierarchy
    Treat,
    /// Same storage; no conversion needed
    Ignore,
    /// Same kind, nullability lifted
    Lift,
    /// Explicit CONVERT required
    Convert,
}

/// Maps host value types onto provider storage types
pub trait TypeProvider {
    /// Default provider type of a host type; `None` for non-scalars
    fn from_value_type(&self, ty: &ValueType) -> Option<ProviderType>;

    /// Whether a value of this host type can be a result column
    fn can_be_column(&self, ty: &ValueType) -> bool {
        self.from_value_type(ty).is_some()
    }

    /// Parse an explicit db type from the mapping
    fn parse_db_type(&self, db_type: &str) -> SqlResult<ProviderType> {
        ProviderType::parse(db_type)
    }

    /// Classify the conversion from one host type to another
    fn conversion_method(&self, from: &ValueType, to: &ValueType) -> ConversionMethod {
        match (from, to) {
            (ValueType::Entity { .. }, ValueType::Entity { .. }) => ConversionMethod::Treat,
            (
                ValueType::Scalar {
                    kind: a,
                    nullable: na,
                },
                ValueType::Scalar {
                    kind: b,
                    nullable: nb,
                },
            ) if a == b => {
                if na == nb {
                    ConversionMethod::Ignore
                } else {
                    ConversionMethod::Lift
                }
            }
            _ => {
                if self.from_value_type(from) == self.from_value_type(to) {
                    ConversionMethod::Ignore
                } else {
                    ConversionMethod::Convert
                }
            }
        }
    }

    /// The wider of two provider types, used to unify CASE arms
    fn most_precise(&self, a: &ProviderType, b: &ProviderType) -> ProviderType {
        if a == b {
            return *a;
        }
        if a.is_string() && b.is_string() {
            let size = match (a.size, b.size) {
                (Some(TypeSize::Max), _) | (_, Some(TypeSize::Max)) => TypeSize::Max,
                (Some(TypeSize::Fixed(x)), Some(TypeSize::Fixed(y))) => TypeSize::Fixed(x.max(y)),
                _ => TypeSize::Fixed(4000),
            };
            let kind = if a.is_unicode() || b.is_unicode() {
                SqlTypeKind::NVarChar
            } else {
                SqlTypeKind::VarChar
            };
            return ProviderType::sized(kind, size);
        }
        if numeric_rank(a) >= numeric_rank(b) {
            *a
        } else {
            *b
        }
    }
}

fn numeric_rank(t: &ProviderType) -> u8 {
    match t.kind {
        SqlTypeKind::Bit => 1,
        SqlTypeKind::TinyInt => 2,
        SqlTypeKind::SmallInt => 3,
        SqlTypeKind::Int => 4,
        SqlTypeKind::BigInt => 5,
        SqlTypeKind::Money => 6,
        SqlTypeKind::Decimal => 7,
        SqlTypeKind::Real => 8,
        SqlTypeKind::Float => 9,
        _ => 0,
    }
}

/// SQL Server type mapping
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlServerTypeProvider;

impl SqlServerTypeProvider {
    /// Create a new provider
    pub fn new() -> Self {
        Self
    }
}

impl TypeProvider for SqlServerTypeProvider {
    fn from_value_type(&self, ty: &ValueType) -> Option<ProviderType> {
        let kind = ty.scalar_kind()?;
        let pt = match kind {
            ScalarKind::Bool => ProviderType::bit(),
            ScalarKind::Byte => ProviderType::simple(SqlTypeKind::TinyInt),
            ScalarKind::Int16 => ProviderType::simple(SqlTypeKind::SmallInt),
            ScalarKind::Int32 => ProviderType::int(),
            ScalarKind::Int64 | ScalarKind::TimeSpan => ProviderType::bigint(),
            ScalarKind::Decimal => ProviderType::decimal(29, 4),
            ScalarKind::Single => ProviderType::simple(SqlTypeKind::Real),
            ScalarKind::Double => ProviderType::simple(SqlTypeKind::Float),
            ScalarKind::Char => ProviderType::sized(SqlTypeKind::NChar, TypeSize::Fixed(1)),
            ScalarKind::String => ProviderType::nvarchar_default(),
            ScalarKind::DateTime => ProviderType::simple(SqlTypeKind::DateTime),
            ScalarKind::DateTimeOffset => ProviderType::simple(SqlTypeKind::DateTimeOffset),
            ScalarKind::Guid => ProviderType::simple(SqlTypeKind::UniqueIdentifier),
            ScalarKind::Binary => {
                ProviderType::sized(SqlTypeKind::VarBinary, TypeSize::Fixed(8000))
            }
            ScalarKind::Rounding => return None,
        };
        Some(pt)
    }
}

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;
