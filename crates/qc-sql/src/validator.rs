//! Re-parse validation of rendered text
//!
//! Rendered statements are fed back through sqlparser's MS SQL dialect. This
//! catches malformed output (unbalanced parentheses, missing keywords)
//! without a database connection.

use crate::dialect::SqlDialect;
use crate::error::SqlResult;
use sqlparser::ast::Expr;

/// Statement kinds the validator re-parses
///
/// `DECLARE` blocks and `EXEC` calls are passed through unchecked.
fn is_checkable(sql: &str) -> bool {
    let head = sql
        .trim_start()
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_ascii_uppercase();
    matches!(head.as_str(), "SELECT" | "INSERT" | "UPDATE" | "DELETE")
}

/// Re-parse every checkable statement, returning how many were checked
pub fn validate_rendered(dialect: &dyn SqlDialect, statements: &[String]) -> SqlResult<usize> {
    let mut checked = 0;
    for sql in statements {
        if !is_checkable(sql) {
            log::debug!("Skipping validation of non-DML statement");
            continue;
        }
        dialect.parse(sql)?;
        checked += 1;
    }
    Ok(checked)
}

/// Operator-tree shape of a parsed expression, with grouping parentheses
/// removed: `a + b * c` becomes `(+ leaf (* leaf leaf))`
pub fn expression_shape(expr: &Expr) -> String {
    match expr {
        Expr::Nested(inner) => expression_shape(inner),
        Expr::BinaryOp { left, op, right } => format!(
            "({op} {} {})",
            expression_shape(left),
            expression_shape(right)
        ),
        Expr::UnaryOp { op, expr } => format!("({op} {})", expression_shape(expr)),
        Expr::IsNull(inner) => format!("(IS NULL {})", expression_shape(inner)),
        Expr::IsNotNull(inner) => format!("(IS NOT NULL {})", expression_shape(inner)),
        _ => "leaf".to_string(),
    }
}

#[cfg(test)]
#[path = "validator_test.rs"]
mod tests;
