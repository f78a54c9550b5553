//! Properties that must hold for any query of a given form

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use qc_compiler::bind::bind;
use qc_compiler::test_utils::*;
use qc_core::query::build;
use qc_core::{BinaryOperator, QueryExpr};
use qc_sql::{expression_shape, validate_rendered, SqlDialect, SqlServerDialect};

/// Integer expression over two non-null order columns
#[derive(Debug, Clone)]
enum Arith {
    Column(&'static str),
    Op(BinaryOperator, Box<Arith>, Box<Arith>),
}

/// Boolean expression over comparisons of [`Arith`] trees
#[derive(Debug, Clone)]
enum Pred {
    Compare(BinaryOperator, Arith, Arith),
    And(Box<Pred>, Box<Pred>),
    Or(Box<Pred>, Box<Pred>),
}

fn sql_symbol(op: BinaryOperator) -> &'static str {
    match op {
        BinaryOperator::Add => "+",
        BinaryOperator::Subtract => "-",
        BinaryOperator::Multiply => "*",
        BinaryOperator::Divide => "/",
        BinaryOperator::Modulo => "%",
        BinaryOperator::LessThan => "<",
        BinaryOperator::LessThanOrEqual => "<=",
        BinaryOperator::GreaterThan => ">",
        BinaryOperator::GreaterThanOrEqual => ">=",
        other => panic!("no symbol for {other:?}"),
    }
}

impl Arith {
    fn query(&self) -> QueryExpr {
        match self {
            Arith::Column(name) => o(name, int32()),
            Arith::Op(op, l, r) => build::binary(*op, l.query(), r.query(), int32()),
        }
    }

    /// Tree shape as re-parsed SQL reports it
    fn shape(&self) -> String {
        match self {
            Arith::Column(_) => "leaf".to_string(),
            Arith::Op(op, l, r) => format!("({} {} {})", sql_symbol(*op), l.shape(), r.shape()),
        }
    }
}

impl Pred {
    fn query(&self) -> QueryExpr {
        match self {
            Pred::Compare(op, l, r) => cmp(*op, l.query(), r.query()),
            Pred::And(l, r) => build::compare(BinaryOperator::AndAlso, l.query(), r.query()),
            Pred::Or(l, r) => build::compare(BinaryOperator::OrElse, l.query(), r.query()),
        }
    }

    fn shape(&self) -> String {
        match self {
            Pred::Compare(op, l, r) => format!("({} {} {})", sql_symbol(*op), l.shape(), r.shape()),
            Pred::And(l, r) => format!("(AND {} {})", l.shape(), r.shape()),
            Pred::Or(l, r) => format!("(OR {} {})", l.shape(), r.shape()),
        }
    }
}

fn arith() -> impl Strategy<Value = Arith> {
    let leaf = prop_oneof![Just(Arith::Column("EmployeeID")), Just(Arith::Column("OrderID"))];
    leaf.prop_recursive(4, 16, 2, |inner| {
        let op = prop_oneof![
            Just(BinaryOperator::Add),
            Just(BinaryOperator::Subtract),
            Just(BinaryOperator::Multiply),
            Just(BinaryOperator::Divide),
            Just(BinaryOperator::Modulo),
        ];
        (op, inner.clone(), inner).prop_map(|(op, l, r)| Arith::Op(op, Box::new(l), Box::new(r)))
    })
}

fn pred() -> impl Strategy<Value = Pred> {
    let op = prop_oneof![
        Just(BinaryOperator::LessThan),
        Just(BinaryOperator::LessThanOrEqual),
        Just(BinaryOperator::GreaterThan),
        Just(BinaryOperator::GreaterThanOrEqual),
    ];
    let compare = (op, arith(), arith()).prop_map(|(op, l, r)| Pred::Compare(op, l, r));
    compare.prop_recursive(3, 8, 2, |inner| {
        prop_oneof![
            (inner.clone(), inner.clone()).prop_map(|(l, r)| Pred::And(Box::new(l), Box::new(r))),
            (inner.clone(), inner).prop_map(|(l, r)| Pred::Or(Box::new(l), Box::new(r))),
        ]
    })
}

/// Predicate text following the statement's WHERE keyword
fn where_text(sql: &str) -> String {
    let start = sql.rfind("WHERE ").map(|i| i + "WHERE ".len()).unwrap_or(0);
    sql[start..].to_string()
}

// ── Parenthesization ────────────────────────────────────────────────────

proptest! {
    #[test]
    fn test_rendered_predicate_reparses_to_same_tree(p in pred()) {
        let env = TestEnv::new();
        let sql = env.sql(&orders_where(p.query()));
        let dialect = SqlServerDialect::default();
        let parsed = dialect.parse_expr(&where_text(&sql)).unwrap();
        prop_assert_eq!(expression_shape(&parsed), p.shape());
    }

    #[test]
    fn test_rendered_statement_is_valid_sql(p in pred()) {
        let env = TestEnv::new();
        let compiled = env.compile(&orders_where(p.query())).unwrap();
        let dialect = SqlServerDialect::default();
        prop_assert_eq!(validate_rendered(&dialect, &compiled.statements).unwrap(), 1);
    }

    #[test]
    fn test_negative_counts_are_rejected(n in i64::MIN..0, take in any::<bool>()) {
        let env = TestEnv::new();
        let method = if take { "Take" } else { "Skip" };
        let query = build::seq(method, vec![orders(), build::int(n)], seq_of(order_ty()));
        let err = env.compile(&query).unwrap_err();
        prop_assert_eq!(err.code(), "QC005");
    }

    #[test]
    fn test_take_renders_exact_top(n in 0i64..10_000) {
        let env = TestEnv::new();
        let query = build::seq("Take", vec![orders(), build::int(n)], seq_of(order_ty()));
        let sql = env.sql(&query);
        let expected = format!("SELECT TOP {n} ");
        prop_assert!(sql.starts_with(&expected), "{}", sql);
    }
}

#[test]
fn test_subtraction_on_the_right_keeps_its_parens() {
    let env = TestEnv::new();
    let right = build::binary(
        BinaryOperator::Subtract,
        o("OrderID", int32()),
        o("EmployeeID", int32()),
        int32(),
    );
    let left = build::binary(BinaryOperator::Subtract, o("EmployeeID", int32()), right, int32());
    let sql = env.sql(&orders_where(cmp(BinaryOperator::GreaterThan, left, build::int(0))));
    assert_eq!(
        where_text(&sql),
        "([A0].[EmployeeID] - ([A0].[OrderID] - [A0].[EmployeeID])) > 0"
    );
}

// ── Binding ─────────────────────────────────────────────────────────────

#[test]
fn test_binding_a_bound_tree_changes_nothing() {
    let env = TestEnv::new();
    let filtered = orders_where(cmp(
        BinaryOperator::GreaterThan,
        o("EmployeeID", int32()),
        build::int(5),
    ));
    let query = orders_select_from(
        filtered,
        build::record(vec![
            ("Id", o("OrderID", int32())),
            ("City", o("ShipCity", nullable_string())),
        ]),
    );
    let (mut ir, root) = env.lower(&query);
    let cx = env.context();

    let once = bind(&mut ir, &cx, root).unwrap();
    let size = ir.subtree(once).len();
    let twice = bind(&mut ir, &cx, once).unwrap();

    assert_eq!(twice, once);
    assert_eq!(ir.subtree(twice).len(), size);
}

/// `source.Select(o => body)`
fn orders_select_from(source: QueryExpr, body: QueryExpr) -> QueryExpr {
    let ty = seq_of(body.ty());
    build::seq("Select", vec![source, order_lambda(body)], ty)
}
