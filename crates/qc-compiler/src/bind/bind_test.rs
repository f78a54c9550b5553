use super::*;
use crate::ir::{BinaryOp, JoinKind};
use crate::lowering::Lowerer;
use crate::test_utils::*;
use qc_core::query::build;
use qc_core::{BinaryOperator, MemberName, QueryExpr};

fn bound(env: &TestEnv, query: &QueryExpr) -> (Ir, NodeId) {
    let (mut ir, root) = env.lower(query);
    let cx = env.context();
    let root = bind(&mut ir, &cx, root).expect("query binds");
    (ir, root)
}

fn bind_err(env: &TestEnv, query: &QueryExpr) -> CompileError {
    let (mut ir, root) = env.lower(query);
    let cx = env.context();
    match bind(&mut ir, &cx, root) {
        Ok(_) => panic!("expected binding to fail"),
        Err(e) => e,
    }
}

fn count(ir: &Ir, root: NodeId, pred: impl Fn(&NodeKind) -> bool) -> usize {
    ir.subtree(root).into_iter().filter(|&id| pred(ir.kind(id))).count()
}

fn joins(ir: &Ir, root: NodeId) -> Vec<JoinKind> {
    ir.subtree(root)
        .into_iter()
        .filter_map(|id| match ir.kind(id) {
            NodeKind::Join { kind, .. } => Some(*kind),
            _ => None,
        })
        .collect()
}

fn employee_of_order(member: &str, ty: ValueType) -> QueryExpr {
    let employee = build::member(build::param("o", order_ty()), "Employee", ValueType::entity("Employee"));
    build::member(employee, member, ty)
}

#[test]
fn test_table_row_is_projected_into_columns() {
    let env = TestEnv::new();
    let (ir, root) = bound(&env, &orders());
    let select = ir.select(root).expect("select");
    assert_eq!(select.row.len(), 7);
    let selection = select.selection.expect("selection");
    let NodeKind::New { members } = ir.kind(selection) else {
        panic!("expected an entity construction");
    };
    for (_, value) in members {
        let column = ir.column_of(*value).expect("member reads a column");
        assert_eq!(ir.column_owner(column), Some(root));
    }
}

#[test]
fn test_required_foreign_key_joins_inner() {
    let env = TestEnv::new();
    let pred = cmp(
        BinaryOperator::Equal,
        employee_of_order("LastName", ValueType::string()),
        build::string("King"),
    );
    let (ir, root) = bound(&env, &orders_where(pred));
    assert_eq!(joins(&ir, root), vec![JoinKind::Inner]);
}

#[test]
fn test_nullable_foreign_key_joins_left_outer() {
    let env = TestEnv::new();
    let customer = build::member(build::param("o", order_ty()), "Customer", customer_ty());
    let city = build::member(customer, "City", nullable_string());
    let pred = cmp(BinaryOperator::Equal, city, build::string("Berlin"));
    let (ir, root) = bound(&env, &orders_where(pred));
    assert_eq!(joins(&ir, root), vec![JoinKind::LeftOuter]);
}

#[test]
fn test_same_link_is_joined_once() {
    let env = TestEnv::new();
    let by_name = cmp(
        BinaryOperator::Equal,
        employee_of_order("LastName", ValueType::string()),
        build::string("King"),
    );
    let has_manager = cmp(
        BinaryOperator::NotEqual,
        employee_of_order("ReportsTo", ValueType::nullable(qc_core::ScalarKind::Int32)),
        build::null(ValueType::nullable(qc_core::ScalarKind::Int32)),
    );
    let pred = build::binary(BinaryOperator::AndAlso, by_name, has_manager, ValueType::bool());
    let (ir, root) = bound(&env, &orders_where(pred));
    assert_eq!(joins(&ir, root).len(), 1);
}

#[test]
fn test_collection_association_is_a_multiset() {
    let env = TestEnv::new();
    let lines = build::member(
        build::param("o", order_ty()),
        "Lines",
        seq_of(ValueType::entity("OrderLine")),
    );
    let (ir, root) = bound(&env, &orders_select(lines));
    let multisets = count(&ir, root, |k| {
        matches!(
            k,
            NodeKind::SubSelect {
                kind: SubSelectKind::Multiset,
                ..
            }
        )
    });
    assert_eq!(multisets, 1);
    assert!(joins(&ir, root).is_empty());
}

#[test]
fn test_hierarchy_table_dispatches_on_discriminator() {
    let env = TestEnv::new();
    let (ir, root) = bound(&env, &people());
    let selection = ir.select(root).and_then(|s| s.selection).expect("selection");
    let NodeKind::TypeCase { whens, .. } = ir.kind(selection) else {
        panic!("expected a type case, got {}", ir.kind(selection).name());
    };
    let names: Vec<&str> = whens.iter().map(|w| w.type_name.as_str()).collect();
    assert_eq!(names, vec!["Person", "Contact", "Supplier"]);
}

#[test]
fn test_derived_member_reads_shared_column() {
    let env = TestEnv::new();
    let person = ValueType::entity("Person");
    let contact = QueryExpr::TypeAs {
        operand: Box::new(build::param("p", person.clone())),
        type_name: qc_core::TypeName::new("Contact"),
    };
    let phone = build::member(contact, "Phone", nullable_string());
    let query = build::seq(
        "Select",
        vec![people(), build::lambda("p", person, phone)],
        seq_of(nullable_string()),
    );
    let (ir, root) = bound(&env, &query);
    let cases = count(&ir, root, |k| matches!(k, NodeKind::SimpleCase { .. }));
    assert_eq!(cases, 1);
}

#[test]
fn test_union_of_differently_named_records_is_rejected() {
    let env = TestEnv::new();
    let left = orders_select(build::record(vec![("A", o("EmployeeID", int32()))]));
    let right = orders_select(build::record(vec![("B", o("EmployeeID", int32()))]));
    let ty = left.ty();
    let query = build::seq("Union", vec![left, right], ty);
    let err = bind_err(&env, &query);
    assert!(matches!(err, CompileError::UnionIncompatibleConstruction { .. }));
}

#[test]
fn test_union_legs_share_row_layout() {
    let env = TestEnv::new();
    let query = build::seq("Concat", vec![orders(), orders()], seq_of(order_ty()));
    let (ir, root) = bound(&env, &query);
    let legs: Vec<NodeId> = ir
        .subtree(root)
        .into_iter()
        .filter_map(|id| match ir.kind(id) {
            NodeKind::Union { left, right, .. } => Some(vec![*left, *right]),
            _ => None,
        })
        .flatten()
        .collect();
    assert_eq!(legs.len(), 2);
    let widths: Vec<usize> = legs
        .iter()
        .map(|&l| ir.select(l).map(|s| s.row.len()).unwrap_or_default())
        .collect();
    assert_eq!(widths[0], widths[1]);
}

#[test]
fn test_composite_key_equality_compares_each_key() {
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
    let (ir, root) = bound(&env, &query);
    let eqs = count(&ir, root, |k| matches!(k, NodeKind::Binary { op: BinaryOp::EQ, .. }));
    assert_eq!(eqs, 2);
}

#[test]
fn test_sequence_comparison_is_rejected() {
    let env = TestEnv::new();
    let grouping = ValueType::grouping(int32(), order_ty());
    let group_by = build::seq(
        "GroupBy",
        vec![orders(), order_lambda(o("EmployeeID", int32()))],
        seq_of(grouping.clone()),
    );
    let pred = cmp(
        BinaryOperator::Equal,
        build::param("g", grouping.clone()),
        build::param("g", grouping.clone()),
    );
    let query = build::seq(
        "Where",
        vec![group_by, build::lambda("g", grouping.clone(), pred)],
        seq_of(grouping),
    );
    let err = env.compile(&query).unwrap_err();
    assert!(matches!(err, CompileError::ComparisonNotSupported { .. }));
}

#[test]
fn test_comparison_with_null_becomes_is_null() {
    let env = TestEnv::new();
    let pred = cmp(
        BinaryOperator::Equal,
        o("ShipCity", nullable_string()),
        build::null(nullable_string()),
    );
    let (ir, root) = bound(&env, &orders_where(pred));
    let where_ = ir.select(root).and_then(|s| s.where_).expect("where");
    assert!(matches!(
        ir.kind(where_),
        NodeKind::Unary {
            op: UnaryOp::IsNull,
            ..
        }
    ));
}

#[test]
fn test_where_true_is_dropped() {
    let env = TestEnv::new();
    let (ir, root) = bound(&env, &orders_where(build::boolean(true)));
    assert!(ir.select(root).and_then(|s| s.where_).is_none());
}

#[test]
fn test_rebinding_is_stable() {
    let env = TestEnv::new();
    let pred = cmp(
        BinaryOperator::Equal,
        employee_of_order("LastName", ValueType::string()),
        build::string("King"),
    );
    let (mut ir, root) = bound(&env, &orders_where(pred));
    let before = ir.subtree(root).len();
    let cx = env.context();
    let again = bind(&mut ir, &cx, root).expect("rebinds");
    assert_eq!(again, root);
    assert_eq!(ir.subtree(again).len(), before);
    assert_eq!(joins(&ir, again).len(), 1);
}

/// `SELECT link.EmployeeID FROM orders LEFT|INNER JOIN lines ON true`
/// where the link's key is read from the lines side
fn link_through(kind: JoinKind) -> JoinKind {
    let env = TestEnv::new();
    let cx = env.context();
    let mut ir = Ir::new();
    let mut lowerer = Lowerer::new(&mut ir, &cx);
    let orders_table = lowerer.table_node(&qc_core::TypeName::new("Order")).expect("mapped");
    let lines_table = lowerer.table_node(&qc_core::TypeName::new("OrderLine")).expect("mapped");
    let key_column = ir.table_column(
        lines_table,
        &MemberName::new("OrderID"),
        "OrderID",
        int32(),
        None,
    );
    let key = ir.column_ref(key_column);
    let left = ir.alias(orders_table);
    let right = ir.alias(lines_table);
    let on = ir.bool_lit(true);
    let join = ir.join(kind, left, right, Some(on));
    let link = ir.add(
        NodeKind::Link {
            owner: qc_core::TypeName::new("OrderLine"),
            member: MemberName::new("Order"),
            keys: vec![key],
            expansion: None,
            key: LinkKey {
                alias: right,
                member: MemberName::new("Order"),
            },
        },
        order_ty(),
    );
    let employee = ir.member(link, &MemberName::new("EmployeeID"), int32());
    let select = ir.new_select(employee, Some(join));
    let root = bind(&mut ir, &cx, select).expect("binds");
    let from = ir.select(root).and_then(|s| s.from).expect("from");
    match ir.kind(from) {
        NodeKind::Join { kind, .. } => *kind,
        other => panic!("expected a join, got {}", other.name()),
    }
}

#[test]
fn test_link_through_outer_join_side_stays_outer() {
    assert_eq!(link_through(JoinKind::LeftOuter), JoinKind::LeftOuter);
}

#[test]
fn test_link_through_inner_join_is_inner() {
    assert_eq!(link_through(JoinKind::Inner), JoinKind::Inner);
}

#[test]
fn test_link_join_sits_below_a_later_outer_apply() {
    let env = TestEnv::new();
    let cx = env.context();
    let mut ir = Ir::new();
    let mut lowerer = Lowerer::new(&mut ir, &cx);
    let orders_table = lowerer.table_node(&qc_core::TypeName::new("Order")).expect("mapped");
    let lines_table = lowerer.table_node(&qc_core::TypeName::new("OrderLine")).expect("mapped");
    let key_column = ir.table_column(
        orders_table,
        &MemberName::new("EmployeeID"),
        "EmployeeID",
        int32(),
        None,
    );
    let key = ir.column_ref(key_column);
    let orders_alias = ir.alias(orders_table);
    let lines_alias = ir.alias(lines_table);
    let apply = ir.join(JoinKind::OuterApply, orders_alias, lines_alias, None);
    let link = ir.add(
        NodeKind::Link {
            owner: qc_core::TypeName::new("Order"),
            member: MemberName::new("Employee"),
            keys: vec![key],
            expansion: None,
            key: LinkKey {
                alias: orders_alias,
                member: MemberName::new("Employee"),
            },
        },
        ValueType::entity("Employee"),
    );
    let last_name = ir.member(link, &MemberName::new("LastName"), ValueType::string());
    let select = ir.new_select(last_name, Some(apply));
    let root = bind(&mut ir, &cx, select).expect("binds");

    let from = ir.select(root).and_then(|s| s.from).expect("from");
    let NodeKind::Join {
        kind: JoinKind::OuterApply,
        left,
        right,
        ..
    } = *ir.kind(from)
    else {
        panic!("expected the OUTER APPLY to stay outermost, got {}", ir.kind(from).name());
    };
    assert_eq!(right, lines_alias);
    let NodeKind::Join {
        kind: JoinKind::Inner,
        left: inner_left,
        ..
    } = *ir.kind(left)
    else {
        panic!("expected the link join under the apply, got {}", ir.kind(left).name());
    };
    assert_eq!(inner_left, orders_alias);
}

/// Three-valued evaluation of a bound predicate; booleans are 1/0
fn eval(ir: &Ir, id: NodeId, row: &HashMap<NodeId, Option<i64>>) -> Option<i64> {
    match ir.kind(id) {
        NodeKind::ColumnRef { column } => row.get(column).copied().flatten(),
        NodeKind::Value { value, .. } => match value {
            qc_core::Value::Bool(b) => Some(i64::from(*b)),
            qc_core::Value::Int(i) => Some(*i),
            _ => None,
        },
        NodeKind::Unary { op, operand } => {
            let v = eval(ir, *operand, row);
            match op {
                UnaryOp::IsNull => Some(i64::from(v.is_none())),
                UnaryOp::IsNotNull => Some(i64::from(v.is_some())),
                UnaryOp::Not | UnaryOp::Not2V => v.map(|b| 1 - b),
                other => panic!("unexpected unary {other:?}"),
            }
        }
        NodeKind::Binary { op, left, right } => {
            let (l, r) = (eval(ir, *left, row), eval(ir, *right, row));
            match op {
                BinaryOp::And => match (l, r) {
                    (Some(0), _) | (_, Some(0)) => Some(0),
                    (Some(_), Some(_)) => Some(1),
                    _ => None,
                },
                BinaryOp::Or => match (l, r) {
                    (Some(1), _) | (_, Some(1)) => Some(1),
                    (Some(_), Some(_)) => Some(0),
                    _ => None,
                },
                BinaryOp::EQ => Some(i64::from(l? == r?)),
                BinaryOp::NE => Some(i64::from(l? != r?)),
                other => panic!("unexpected binary {other:?}"),
            }
        }
        NodeKind::SearchedCase { whens, else_ } => {
            for when in whens {
                if eval(ir, when.test, row) == Some(1) {
                    return eval(ir, when.value, row);
                }
            }
            eval(ir, *else_, row)
        }
        other => panic!("unexpected node {}", other.name()),
    }
}

/// Bound `a op b` over two nullable int columns, evaluated for each pair
fn truth_table(op: BinaryOp) -> Vec<Option<i64>> {
    let env = TestEnv::new();
    let cx = env.context();
    let mut ir = Ir::new();
    let table = ir.add(
        NodeKind::Table {
            row_type: qc_core::TypeName::new("T"),
            name: "dbo.T".to_string(),
            columns: vec![],
        },
        ValueType::sequence(ValueType::entity("T")),
    );
    let nullable_int = ValueType::nullable(qc_core::ScalarKind::Int32);
    let a = ir.table_column(table, &MemberName::new("A"), "A", nullable_int.clone(), None);
    let b = ir.table_column(table, &MemberName::new("B"), "B", nullable_int, None);
    let (a_ref, b_ref) = (ir.column_ref(a), ir.column_ref(b));
    let cmp = ir.binary(op, a_ref, b_ref);
    let bound = bind(&mut ir, &cx, cmp).expect("comparison binds");

    [(None, None), (None, Some(1)), (Some(1), None), (Some(1), Some(1)), (Some(1), Some(2))]
        .into_iter()
        .map(|(x, y)| eval(&ir, bound, &HashMap::from([(a, x), (b, y)])))
        .collect()
}

#[test]
fn test_two_valued_equality_truth_table() {
    assert_eq!(
        truth_table(BinaryOp::EQ2V),
        vec![Some(1), Some(0), Some(0), Some(1), Some(0)]
    );
    assert_eq!(
        truth_table(BinaryOp::NE2V),
        vec![Some(0), Some(1), Some(1), Some(0), Some(1)]
    );
}

#[test]
fn test_plain_equality_propagates_null() {
    assert_eq!(
        truth_table(BinaryOp::EQ),
        vec![None, None, None, Some(1), Some(0)]
    );
}
