//! End-to-end scenarios: query trees in, SQL text out

use pretty_assertions::assert_eq;
use qc_compiler::test_utils::*;
use qc_compiler::ResultShape;
use qc_core::query::build;
use qc_core::{BinaryOperator, ScalarKind, ValueType};
use qc_sql::{expression_shape, SqlDialect, SqlServerDialect};

/// Text of the last WHERE clause of a single-line-per-clause statement
fn where_clause(sql: &str) -> &str {
    let start = sql.rfind("WHERE ").map(|i| i + "WHERE ".len()).unwrap_or(0);
    let rest = &sql[start..];
    rest.split('\n').next().unwrap_or(rest)
}

fn grouping_ty() -> ValueType {
    ValueType::grouping(int32(), order_ty())
}

fn grouped_by_employee() -> qc_core::QueryExpr {
    build::seq(
        "GroupBy",
        vec![orders(), order_lambda(o("EmployeeID", int32()))],
        seq_of(grouping_ty()),
    )
}

/// `orders.GroupBy(o => o.EmployeeID).Select(g => new { Key = g.Key, Count = count })`
fn grouped_count(count: qc_core::QueryExpr) -> qc_core::QueryExpr {
    grouped(vec![("Count", count)])
}

/// `orders.GroupBy(o => o.EmployeeID).Select(g => new { Key = g.Key, ... })`
fn grouped(members: Vec<(&str, qc_core::QueryExpr)>) -> qc_core::QueryExpr {
    let g = build::param("g", grouping_ty());
    let mut fields = vec![("Key", build::member(g, "Key", int32()))];
    fields.extend(members);
    let body = build::record(fields);
    let ty = seq_of(body.ty());
    build::seq(
        "Select",
        vec![grouped_by_employee(), build::lambda("g", grouping_ty(), body)],
        ty,
    )
}

// ── Scenario 1: filtered projection ─────────────────────────────────────

#[test]
fn test_where_then_select_is_one_select() {
    let env = TestEnv::new();
    let filtered = orders_where(cmp(
        BinaryOperator::GreaterThan,
        o("EmployeeID", int32()),
        build::int(5),
    ));
    let query = build::seq(
        "Select",
        vec![filtered, order_lambda(o("ShipCity", nullable_string()))],
        seq_of(nullable_string()),
    );
    let sql = env.sql(&query);

    assert_eq!(
        sql,
        "SELECT [A0].[ShipCity]\nFROM [dbo].[Orders] AS [A0]\nWHERE [A0].[EmployeeID] > 5"
    );
}

// ── Scenario 2: grouped aggregate push-down ─────────────────────────────

#[test]
fn test_group_count_is_a_grouped_column() {
    let env = TestEnv::new();
    let count = build::seq("Count", vec![build::param("g", grouping_ty())], int32());
    let sql = env.sql(&grouped_count(count));

    assert!(sql.contains("COUNT(*)"), "{sql}");
    assert!(sql.contains("GROUP BY "), "{sql}");
    assert!(!sql.contains("SELECT COUNT(*)"), "{sql}");
}

#[test]
fn test_filtered_group_count_falls_back_to_sub_select() {
    let env = TestEnv::new();
    let pred = cmp(
        BinaryOperator::GreaterThan,
        o("EmployeeID", int32()),
        build::int(0),
    );
    let count = build::seq(
        "Count",
        vec![build::param("g", grouping_ty()), order_lambda(pred)],
        int32(),
    );
    let fallback = env.compile(&grouped_count(count)).unwrap();
    let pushed = env
        .compile(&grouped_count(build::seq(
            "Count",
            vec![build::param("g", grouping_ty())],
            int32(),
        )))
        .unwrap();

    assert!(fallback.text().contains("SELECT COUNT(*)"), "{}", fallback.text());
    let names = |shape: &Option<ResultShape>| match shape {
        Some(ResultShape::Record { members, .. }) => {
            members.iter().map(|m| m.name.clone()).collect::<Vec<_>>()
        }
        other => panic!("expected a record shape, got {other:?}"),
    };
    assert_eq!(names(&fallback.shape), names(&pushed.shape));
}

/// Items of the outermost select list
fn select_list_len(sql: &str) -> usize {
    let body = sql.strip_prefix("SELECT ").unwrap_or(sql);
    let mut depth = 0usize;
    let mut items = 1;
    for (i, ch) in body.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => items += 1,
            '\n' if depth == 0 && body[i..].starts_with("\nFROM ") => break,
            _ => {}
        }
    }
    items
}

#[test]
fn test_pushed_aggregates_are_computed_once() {
    let env = TestEnv::new();
    let g = || build::param("g", grouping_ty());
    let freight_ty = ValueType::nullable(ScalarKind::Decimal);
    let total = |source: qc_core::QueryExpr| {
        build::seq(
            "Sum",
            vec![source, order_lambda(o("Freight", freight_ty.clone()))],
            freight_ty.clone(),
        )
    };
    let pushed = env.sql(&grouped(vec![
        ("Count", build::seq("Count", vec![g()], int32())),
        ("Total", total(g())),
    ]));
    assert_eq!(pushed.matches("COUNT(*)").count(), 1, "{pushed}");
    assert_eq!(pushed.matches("SUM(").count(), 1, "{pushed}");

    let filtered = build::seq(
        "Where",
        vec![g(), order_lambda(positive_order_id())],
        seq_of(order_ty()),
    );
    let fallback = env.sql(&grouped(vec![
        ("Count", build::seq("Count", vec![g(), order_lambda(positive_order_id())], int32())),
        ("Total", total(filtered)),
    ]));
    assert!(fallback.contains("SELECT COUNT(*)"), "{fallback}");
    assert_eq!(select_list_len(&pushed), 3, "{pushed}");
    assert_eq!(select_list_len(&fallback), select_list_len(&pushed), "{fallback}");
}

fn positive_order_id() -> qc_core::QueryExpr {
    cmp(
        BinaryOperator::GreaterThan,
        o("OrderID", int32()),
        build::int(0),
    )
}

#[test]
fn test_filtered_group_elements_count_reads_the_group_rows() {
    let env = TestEnv::new();
    let filtered = build::seq(
        "Where",
        vec![build::param("g", grouping_ty()), order_lambda(positive_order_id())],
        seq_of(order_ty()),
    );
    let count = build::seq("Count", vec![filtered], int32());
    let sql = env.sql(&grouped_count(count));

    assert!(sql.contains("SELECT COUNT(*)"), "{sql}");
    assert!(sql.contains("[OrderID] > 0"), "{sql}");
    assert!(sql.contains("GROUP BY "), "{sql}");
}

#[test]
fn test_group_any_with_predicate_is_exists_over_the_group() {
    let env = TestEnv::new();
    let any = build::seq(
        "Any",
        vec![build::param("g", grouping_ty()), order_lambda(positive_order_id())],
        ValueType::bool(),
    );
    let sql = env.sql(&grouped_count(any));

    assert!(sql.contains("EXISTS("), "{sql}");
    assert!(sql.contains("[OrderID] > 0"), "{sql}");
}

// ── Scenario 3: ROW_NUMBER paging ───────────────────────────────────────

#[test]
fn test_skip_take_pages_with_row_number() {
    let env = TestEnv::new();
    let skip = build::seq("Skip", vec![orders(), build::int(2)], seq_of(order_ty()));
    let query = build::seq("Take", vec![skip, build::int(3)], seq_of(order_ty()));
    let sql = env.sql(&query);

    assert!(sql.contains("ROW_NUMBER() OVER (ORDER BY "), "{sql}");
    assert!(where_clause(&sql).ends_with("BETWEEN 3 AND 5"), "{sql}");
}

#[test]
fn test_take_zero_is_top_zero() {
    let env = TestEnv::new();
    let query = build::seq("Take", vec![orders(), build::int(0)], seq_of(order_ty()));
    assert!(env.sql(&query).starts_with("SELECT TOP 0 "));
}

#[test]
fn test_skip_zero_adds_nothing() {
    let env = TestEnv::new();
    let query = build::seq("Skip", vec![orders(), build::int(0)], seq_of(order_ty()));
    assert_eq!(env.sql(&query), env.sql(&orders()));
}

// ── Scenario 4: join strategies ─────────────────────────────────────────

fn orders_join_customers() -> qc_core::QueryExpr {
    let c = build::param("c", customer_ty());
    let body = build::record(vec![
        ("OrderID", o("OrderID", int32())),
        (
            "CompanyName",
            build::member(c.clone(), "CompanyName", ValueType::string()),
        ),
    ]);
    let ty = seq_of(body.ty());
    build::seq(
        "Join",
        vec![
            orders(),
            customers(),
            order_lambda(o("CustomerID", nullable_string())),
            build::lambda(
                "c",
                customer_ty(),
                build::member(c, "CustomerID", ValueType::string()),
            ),
            build::lambda_n(vec![("o", order_ty()), ("c", customer_ty())], body),
        ],
        ty,
    )
}

#[test]
fn test_join_renders_on_clause() {
    let env = TestEnv::new();
    let sql = env.sql(&orders_join_customers());
    assert!(
        sql.contains("INNER JOIN [dbo].[Customers] AS [A1] ON [A0].[CustomerID] = [A1].[CustomerID]"),
        "{sql}"
    );
}

#[test]
fn test_join_without_on_uses_cross_join_and_where() {
    let env = TestEnv::new().without_join_on();
    let sql = env.sql(&orders_join_customers());
    assert!(sql.contains("CROSS JOIN [dbo].[Customers] AS [A1]"), "{sql}");
    assert_eq!(where_clause(&sql), "[A0].[CustomerID] = [A1].[CustomerID]");
    assert!(!sql.contains(" ON "), "{sql}");
}

// ── Scenario 5: composite key equality ──────────────────────────────────

#[test]
fn test_entity_equality_compares_each_key_column() {
    let env = TestEnv::new();
    let line = ValueType::entity("OrderLine");
    let inner = build::seq(
        "Where",
        vec![
            order_lines(),
            build::lambda(
                "b",
                line.clone(),
                cmp(
                    BinaryOperator::Equal,
                    build::param("a", line.clone()),
                    build::param("b", line.clone()),
                ),
            ),
        ],
        seq_of(line.clone()),
    );
    let query = build::seq(
        "SelectMany",
        vec![order_lines(), build::lambda("a", line.clone(), inner)],
        seq_of(line),
    );
    let sql = env.sql(&query);
    let predicate = where_clause(&sql);

    assert!(predicate.contains("[OrderID]"), "{sql}");
    assert!(predicate.contains("[ProductID]"), "{sql}");
    let dialect = SqlServerDialect::default();
    let parsed = dialect.parse_expr(predicate).unwrap();
    assert_eq!(expression_shape(&parsed), "(AND (= leaf leaf) (= leaf leaf))");
}

// ── Scenario 6: null comparison ─────────────────────────────────────────

#[test]
fn test_equality_with_null_is_null_test() {
    let env = TestEnv::new();
    let query = orders_where(cmp(
        BinaryOperator::Equal,
        o("EmployeeID", int32()),
        build::null(ValueType::nullable(ScalarKind::Int32)),
    ));
    let sql = env.sql(&query);
    assert!(sql.ends_with("WHERE [A0].[EmployeeID] IS NULL"), "{sql}");
    assert!(!sql.contains("= NULL"));
}

// ── Unions ──────────────────────────────────────────────────────────────

fn employee_ids(name: &str) -> qc_core::QueryExpr {
    orders_select(build::record(vec![(name, o("EmployeeID", int32()))]))
}

#[test]
fn test_union_of_matching_projections() {
    let env = TestEnv::new();
    let ty = employee_ids("Id").ty();
    let union = build::seq("Union", vec![employee_ids("Id"), employee_ids("Id")], ty.clone());
    let sql = env.sql(&union);
    assert!(sql.lines().any(|line| line.trim() == "UNION"), "{sql}");

    let concat = build::seq("Concat", vec![employee_ids("Id"), employee_ids("Id")], ty);
    let sql = env.sql(&concat);
    assert!(sql.lines().any(|line| line.trim() == "UNION ALL"), "{sql}");
}

#[test]
fn test_union_of_mismatched_projections_is_rejected() {
    let env = TestEnv::new();
    let ty = employee_ids("Id").ty();
    let union = build::seq("Union", vec![employee_ids("Id"), employee_ids("Other")], ty);
    let err = env.compile(&union).unwrap_err();
    assert_eq!(err.code(), "QC009");
}
