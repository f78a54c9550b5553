//! SQL dialect abstraction

use qc_core::{MidpointRounding, ProviderMode, Value};
use sqlparser::ast::{Expr, Statement};
use sqlparser::dialect::{Dialect, MsSqlDialect};
use sqlparser::parser::Parser;

use crate::error::{SqlError, SqlResult};
use crate::types::ProviderType;

/// Escape character used for LIKE patterns built from literals
pub const LIKE_ESCAPE: char = '~';

/// Trait for SQL dialect implementations
pub trait SqlDialect: Send + Sync {
    /// Get the underlying sqlparser dialect
    fn parser_dialect(&self) -> &dyn Dialect;

    /// Parse SQL into AST statements
    fn parse(&self, sql: &str) -> SqlResult<Vec<Statement>> {
        if sql.trim().is_empty() {
            return Err(SqlError::EmptySql);
        }
        Parser::parse_sql(self.parser_dialect(), sql).map_err(|e| to_parse_error(e.to_string()))
    }

    /// Parse a single expression
    fn parse_expr(&self, sql: &str) -> SqlResult<Expr> {
        let mut parser = Parser::new(self.parser_dialect())
            .try_with_sql(sql)
            .map_err(|e| to_parse_error(e.to_string()))?;
        parser
            .parse_expr()
            .map_err(|e| to_parse_error(e.to_string()))
    }

    /// Quote an identifier for this dialect
    fn quote_ident(&self, ident: &str) -> String;

    /// Quote a possibly dotted table name, leaving already-quoted parts alone
    fn quote_table_name(&self, name: &str) -> String {
        split_compound_name(name)
            .iter()
            .map(|part| {
                if part.starts_with('[') && part.ends_with(']') {
                    part.to_string()
                } else {
                    self.quote_ident(part)
                }
            })
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Render a literal value
    fn format_literal(&self, value: &Value, ty: Option<&ProviderType>) -> SqlResult<String> {
        format_sql_server_literal(value, ty)
    }

    /// Whether `ROW_NUMBER() OVER` is available
    fn supports_row_number(&self) -> bool;

    /// Get the dialect name
    fn name(&self) -> &'static str;
}

fn to_parse_error(msg: String) -> SqlError {
    let (line, column) = parse_location_from_error(&msg);
    SqlError::ParseError {
        message: msg,
        line,
        column,
    }
}

/// Parse line and column from a sqlparser error message
/// ("... at Line: X, Column: Y").
fn parse_location_from_error(msg: &str) -> (usize, usize) {
    let Some(line_idx) = msg.find("Line: ") else {
        return (0, 0);
    };
    let line_start = line_idx + 6;
    let Some(comma_idx) = msg[line_start..].find(',') else {
        return (0, 0);
    };
    let Ok(line) = msg[line_start..line_start + comma_idx]
        .trim()
        .parse::<usize>()
    else {
        return (0, 0);
    };
    let Some(col_idx) = msg.find("Column: ") else {
        return (0, 0);
    };
    let col_start = col_idx + 8;
    let col_end = msg[col_start..]
        .find(|c: char| !c.is_ascii_digit())
        .map(|i| col_start + i)
        .unwrap_or(msg.len());
    let Ok(column) = msg[col_start..col_end].trim().parse::<usize>() else {
        return (0, 0);
    };
    (line, column)
}

/// Split `dbo.[Order Details]` into `["dbo", "[Order Details]"]`
fn split_compound_name(name: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut in_bracket = false;
    for (i, c) in name.char_indices() {
        match c {
            '[' => in_bracket = true,
            ']' => in_bracket = false,
            '.' if !in_bracket => {
                parts.push(&name[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&name[start..]);
    parts
}

/// Literal formatting shared by the SQL Server family
pub fn format_sql_server_literal(value: &Value, ty: Option<&ProviderType>) -> SqlResult<String> {
    let unicode = ty.map(|t| !t.is_string() || t.is_unicode()).unwrap_or(true);
    let prefix = if unicode { "N" } else { "" };
    let text = match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(b) => if *b { "1" } else { "0" }.to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => {
            if f.is_finite() {
                format!("{f:E}")
            } else {
                return Err(SqlError::UnformattableLiteral(f.to_string()));
            }
        }
        Value::Decimal(d) => d.clone(),
        Value::String(s) => format!("{prefix}'{}'", s.replace('\'', "''")),
        Value::Char(c) => format!("{prefix}'{}'", c.to_string().replace('\'', "''")),
        Value::DateTime(d) => format!("'{}'", d.format("%Y-%m-%dT%H:%M:%S%.3f")),
        Value::DateTimeOffset(d) => format!("'{}'", d.format("%Y-%m-%dT%H:%M:%S%.7f%:z")),
        Value::TimeSpan(ticks) => ticks.to_string(),
        Value::Guid(g) => format!("'{g}'"),
        Value::Binary(bytes) => {
            let hex: String = bytes.iter().map(|b| format!("{b:02X}")).collect();
            format!("0x{hex}")
        }
        Value::Rounding(MidpointRounding::ToEven) => "0".to_string(),
        Value::Rounding(MidpointRounding::AwayFromZero) => "1".to_string(),
        Value::List(_) | Value::Object(_) => {
            return Err(SqlError::UnformattableLiteral(value.to_string()))
        }
    };
    Ok(text)
}

/// Escape LIKE metacharacters in a literal pattern
///
/// Returns the escaped text and whether anything was escaped (in which case
/// the LIKE needs an `ESCAPE '~'` clause).
///
/// ```
/// use qc_sql::dialect::escape_like;
/// assert_eq!(escape_like("50%"), ("50~%".to_string(), true));
/// assert_eq!(escape_like("abc"), ("abc".to_string(), false));
/// ```
pub fn escape_like(pattern: &str) -> (String, bool) {
    let mut out = String::with_capacity(pattern.len());
    let mut escaped = false;
    for c in pattern.chars() {
        if matches!(c, '~' | '%' | '_' | '[') {
            out.push(LIKE_ESCAPE);
            escaped = true;
        }
        out.push(c);
    }
    (out, escaped)
}

/// SQL Server 2000/2005/2008
pub struct SqlServerDialect {
    dialect: MsSqlDialect,
    mode: ProviderMode,
}

impl SqlServerDialect {
    /// Create a dialect for a provider version
    pub fn new(mode: ProviderMode) -> Self {
        Self {
            dialect: MsSqlDialect {},
            mode,
        }
    }
}

impl Default for SqlServerDialect {
    fn default() -> Self {
        Self::new(ProviderMode::Sql2008)
    }
}

impl SqlDialect for SqlServerDialect {
    fn parser_dialect(&self) -> &dyn Dialect {
        &self.dialect
    }

    fn quote_ident(&self, ident: &str) -> String {
        format!("[{}]", ident.replace(']', "]]"))
    }

    fn supports_row_number(&self) -> bool {
        self.mode != ProviderMode::Sql2000
    }

    fn name(&self) -> &'static str {
        match self.mode {
            ProviderMode::Sql2000 => "sql2000",
            ProviderMode::Sql2005 => "sql2005",
            _ => "sql2008",
        }
    }
}

/// SQL Server Compact Edition
pub struct SqlCeDialect {
    dialect: MsSqlDialect,
}

impl SqlCeDialect {
    /// Create a new SQL CE dialect
    pub fn new() -> Self {
        Self {
            dialect: MsSqlDialect {},
        }
    }
}

impl Default for SqlCeDialect {
    fn default() -> Self {
        Self::new()
    }
}

impl SqlDialect for SqlCeDialect {
    fn parser_dialect(&self) -> &dyn Dialect {
        &self.dialect
    }

    fn quote_ident(&self, ident: &str) -> String {
        format!("[{}]", ident.replace(']', "]]"))
    }

    fn supports_row_number(&self) -> bool {
        false
    }

    fn name(&self) -> &'static str {
        "sql_ce"
    }
}

/// Dialect for a provider mode
pub fn dialect_for(mode: ProviderMode) -> Box<dyn SqlDialect> {
    match mode {
        ProviderMode::SqlCe => Box::new(SqlCeDialect::new()),
        other => Box::new(SqlServerDialect::new(other)),
    }
}

#[cfg(test)]
#[path = "dialect_test.rs"]
mod tests;
