use super::*;
use crate::dialect::SqlServerDialect;
use crate::error::SqlError;

#[test]
fn test_validate_accepts_select() {
    let dialect = SqlServerDialect::default();
    let stmts = vec!["SELECT [A0].[City] FROM [dbo].[Customers] AS [A0]".to_string()];
    assert_eq!(validate_rendered(&dialect, &stmts).unwrap(), 1);
}

#[test]
fn test_validate_skips_declare() {
    let dialect = SqlServerDialect::default();
    let stmts = vec!["DECLARE @output TABLE([OrderID] Int)".to_string()];
    assert_eq!(validate_rendered(&dialect, &stmts).unwrap(), 0);
}

#[test]
fn test_validate_rejects_broken_text() {
    let dialect = SqlServerDialect::default();
    let stmts = vec!["SELECT ([A0].[X] FROM [T] AS [A0]".to_string()];
    assert!(matches!(
        validate_rendered(&dialect, &stmts),
        Err(SqlError::ParseError { .. })
    ));
}

#[test]
fn test_expression_shape_ignores_parens() {
    let dialect = SqlServerDialect::default();
    let a = dialect.parse_expr("(x + y) * 2").unwrap();
    let b = dialect.parse_expr("((x + y)) * (2)").unwrap();
    assert_eq!(expression_shape(&a), expression_shape(&b));
    assert_eq!(expression_shape(&a), "(* (+ leaf leaf) leaf)");
}

#[test]
fn test_expression_shape_precedence() {
    let dialect = SqlServerDialect::default();
    let e = dialect.parse_expr("x + y * 2").unwrap();
    assert_eq!(expression_shape(&e), "(+ leaf (* leaf leaf))");
    let e = dialect.parse_expr("a = 1 AND NOT b = 2").unwrap();
    assert_eq!(expression_shape(&e), "(AND (= leaf leaf) (NOT (= leaf leaf)))");
}
