use super::*;
use crate::error::CompileError;
use crate::ir::{
    AggregateFunc, BinaryOp, OrderExpr, OrderKind, OrderingType, SubSelectKind, When,
};
use crate::test_utils::TestEnv;
use qc_core::{MemberName, ScalarKind, TypeName, ValueType};

/// `[dbo].[T]` with int `A`, string `B` and bool `C`
struct Source {
    alias: NodeId,
    a: NodeId,
    b: NodeId,
    c: NodeId,
}

fn source(ir: &mut Ir) -> Source {
    let table = ir.add(
        NodeKind::Table {
            row_type: TypeName::new("T"),
            name: "dbo.T".to_string(),
            columns: vec![],
        },
        ValueType::sequence(ValueType::entity("T")),
    );
    let a = ir.table_column(table, &MemberName::new("A"), "A", ValueType::int32(), None);
    let b = ir.table_column(table, &MemberName::new("B"), "B", ValueType::string(), None);
    let c = ir.table_column(table, &MemberName::new("C"), "C", ValueType::bool(), None);
    let alias = ir.alias(table);
    Source { alias, a, b, c }
}

/// Select over `from` with one row column per expression
fn select_of(ir: &mut Ir, from: Option<NodeId>, exprs: Vec<NodeId>) -> (NodeId, Vec<NodeId>) {
    let placeholder = ir.int_lit(0);
    let select = ir.new_select(placeholder, from);
    let mut columns = Vec::new();
    for expr in exprs {
        let column = ir.column(None, expr);
        ir.push_row_column(select, column);
        columns.push(column);
    }
    if let Some(&first) = columns.first() {
        let selection = ir.column_ref(first);
        ir.set_selection(select, selection);
    }
    (select, columns)
}

fn run_pass(env: &TestEnv, pass: &dyn IrPass, ir: &mut Ir, root: NodeId) -> CompileResult<NodeId> {
    let cx = env.context();
    let mut state = PassState::default();
    pass.run(ir, root, &cx, &mut state)
}

fn expr_of(ir: &Ir, column: NodeId) -> NodeId {
    match ir.kind(column) {
        NodeKind::Column { expr: Some(e), .. } => *e,
        other => panic!("expected a computed column, got {}", other.name()),
    }
}

#[test]
fn test_default_pass_order() {
    let manager = PassManager::with_defaults();
    assert_eq!(
        manager.pass_names(),
        vec!["resolve", "client_queries", "flatten", "prune", "ordering", "booleanize", "validate"]
    );
}

#[test]
fn test_pass_filter_skips_unlisted_passes() {
    let env = TestEnv::new();
    let mut ir = Ir::new();
    let src = source(&mut ir);
    let a_ref = ir.column_ref(src.a);
    let (inner, inner_cols) = select_of(&mut ir, Some(src.alias), vec![a_ref]);
    let inner_alias = ir.alias(inner);
    let outer_ref = ir.column_ref(inner_cols[0]);
    let (outer, _) = select_of(&mut ir, Some(inner_alias), vec![outer_ref]);

    let cx = env.context();
    let mut state = PassState::default();
    let filter = vec!["ordering".to_string()];
    PassManager::with_defaults()
        .run(&mut ir, outer, &cx, &mut state, Some(&filter))
        .expect("passes run");
    assert_eq!(ir.select(outer).and_then(|s| s.from), Some(inner_alias));
}

#[test]
fn test_flatten_merges_filtering_select_under_projection() {
    let env = TestEnv::new();
    let mut ir = Ir::new();
    let src = source(&mut ir);
    let a_ref = ir.column_ref(src.a);
    let b_ref = ir.column_ref(src.b);
    let (inner, inner_cols) = select_of(&mut ir, Some(src.alias), vec![a_ref, b_ref]);
    let a_where = ir.column_ref(src.a);
    let five = ir.int_lit(5);
    let gt = ir.binary(BinaryOp::GT, a_where, five);
    ir.select_mut(inner).unwrap().where_ = Some(gt);

    let inner_alias = ir.alias(inner);
    let outer_ref = ir.column_ref(inner_cols[1]);
    let (outer, outer_cols) = select_of(&mut ir, Some(inner_alias), vec![outer_ref]);

    run_pass(&env, &flatten::SelectFlattener, &mut ir, outer).unwrap();

    let sel = ir.select(outer).unwrap();
    assert_eq!(sel.from, Some(src.alias));
    let where_ = sel.where_.expect("filter moved up");
    let NodeKind::Binary { left, .. } = *ir.kind(where_) else {
        panic!("expected a comparison");
    };
    assert_eq!(ir.column_of(left), Some(src.a));
    assert_eq!(ir.column_of(expr_of(&ir, outer_cols[0])), Some(src.b));
}

#[test]
fn test_flatten_keeps_distinct_under_aggregate() {
    let env = TestEnv::new();
    let mut ir = Ir::new();
    let src = source(&mut ir);
    let b_ref = ir.column_ref(src.b);
    let (inner, _) = select_of(&mut ir, Some(src.alias), vec![b_ref]);
    ir.select_mut(inner).unwrap().distinct = true;
    let inner_alias = ir.alias(inner);
    let count = ir.aggregate(AggregateFunc::Count, None, ValueType::int32());
    let (outer, _) = select_of(&mut ir, Some(inner_alias), vec![count]);

    run_pass(&env, &flatten::SelectFlattener, &mut ir, outer).unwrap();
    assert_eq!(ir.select(outer).unwrap().from, Some(inner_alias));
}

#[test]
fn test_flatten_keeps_row_number_select() {
    let env = TestEnv::new();
    let mut ir = Ir::new();
    let src = source(&mut ir);
    let a_ref = ir.column_ref(src.a);
    let row_number = ir.add(NodeKind::RowNumber { order_by: vec![] }, ValueType::int64());
    let (inner, inner_cols) = select_of(&mut ir, Some(src.alias), vec![a_ref, row_number]);
    let inner_alias = ir.alias(inner);
    let rn_ref = ir.column_ref(inner_cols[1]);
    let ten = ir.value(qc_core::Value::Int(10), ValueType::int64());
    let gt = ir.binary(BinaryOp::GT, rn_ref, ten);
    let a_out = ir.column_ref(inner_cols[0]);
    let (outer, _) = select_of(&mut ir, Some(inner_alias), vec![a_out]);
    ir.select_mut(outer).unwrap().where_ = Some(gt);

    run_pass(&env, &flatten::SelectFlattener, &mut ir, outer).unwrap();
    assert_eq!(ir.select(outer).unwrap().from, Some(inner_alias));
}

#[test]
fn test_prune_drops_unread_derived_columns() {
    let env = TestEnv::new();
    let mut ir = Ir::new();
    let src = source(&mut ir);
    let a_ref = ir.column_ref(src.a);
    let b_ref = ir.column_ref(src.b);
    let c_ref = ir.column_ref(src.c);
    let (inner, inner_cols) = select_of(&mut ir, Some(src.alias), vec![a_ref, b_ref, c_ref]);
    let inner_alias = ir.alias(inner);
    let b_out = ir.column_ref(inner_cols[1]);
    let (outer, _) = select_of(&mut ir, Some(inner_alias), vec![b_out]);

    run_pass(&env, &prune::UnusedColumnPruner, &mut ir, outer).unwrap();
    assert_eq!(ir.select(inner).unwrap().row, vec![inner_cols[1]]);
    assert_eq!(ir.select(outer).unwrap().row.len(), 1);
}

#[test]
fn test_prune_keeps_one_column() {
    let env = TestEnv::new();
    let mut ir = Ir::new();
    let src = source(&mut ir);
    let a_ref = ir.column_ref(src.a);
    let b_ref = ir.column_ref(src.b);
    let (inner, inner_cols) = select_of(&mut ir, Some(src.alias), vec![a_ref, b_ref]);
    let inner_alias = ir.alias(inner);
    let one = ir.int_lit(1);
    let (outer, _) = select_of(&mut ir, Some(inner_alias), vec![one]);

    run_pass(&env, &prune::UnusedColumnPruner, &mut ir, outer).unwrap();
    assert_eq!(ir.select(inner).unwrap().row, vec![inner_cols[0]]);
}

#[test]
fn test_ordering_drops_derived_order_without_top() {
    let env = TestEnv::new();
    let mut ir = Ir::new();
    let src = source(&mut ir);
    let a_ref = ir.column_ref(src.a);
    let (inner, inner_cols) = select_of(&mut ir, Some(src.alias), vec![a_ref]);
    let key = ir.column_ref(src.a);
    ir.select_mut(inner).unwrap().order_by = vec![OrderExpr {
        kind: OrderKind::Ascending,
        expr: key,
    }];
    let inner_alias = ir.alias(inner);
    let a_out = ir.column_ref(inner_cols[0]);
    let (outer, _) = select_of(&mut ir, Some(inner_alias), vec![a_out]);
    let outer_key = ir.column_ref(inner_cols[0]);
    ir.select_mut(outer).unwrap().order_by = vec![OrderExpr {
        kind: OrderKind::Descending,
        expr: outer_key,
    }];

    run_pass(&env, &ordering::OrderingCleanup, &mut ir, outer).unwrap();
    assert!(ir.select(inner).unwrap().order_by.is_empty());
    assert_eq!(ir.select(outer).unwrap().order_by.len(), 1);
}

#[test]
fn test_ordering_keeps_derived_order_with_top() {
    let env = TestEnv::new();
    let mut ir = Ir::new();
    let src = source(&mut ir);
    let a_ref = ir.column_ref(src.a);
    let (inner, inner_cols) = select_of(&mut ir, Some(src.alias), vec![a_ref]);
    let key = ir.column_ref(src.a);
    let top = ir.int_lit(3);
    let s = ir.select_mut(inner).unwrap();
    s.order_by = vec![OrderExpr {
        kind: OrderKind::Ascending,
        expr: key,
    }];
    s.top = Some(top);
    let inner_alias = ir.alias(inner);
    let a_out = ir.column_ref(inner_cols[0]);
    let (outer, _) = select_of(&mut ir, Some(inner_alias), vec![a_out]);

    run_pass(&env, &ordering::OrderingCleanup, &mut ir, outer).unwrap();
    assert_eq!(ir.select(inner).unwrap().order_by.len(), 1);
}

#[test]
fn test_ordering_drops_unobservable_root_order() {
    let env = TestEnv::new();
    let mut ir = Ir::new();
    let src = source(&mut ir);
    let a_ref = ir.column_ref(src.a);
    let (select, _) = select_of(&mut ir, Some(src.alias), vec![a_ref]);
    let key = ir.column_ref(src.a);
    let s = ir.select_mut(select).unwrap();
    s.order_by = vec![OrderExpr {
        kind: OrderKind::Ascending,
        expr: key,
    }];
    s.ordering = OrderingType::Never;

    run_pass(&env, &ordering::OrderingCleanup, &mut ir, select).unwrap();
    assert!(ir.select(select).unwrap().order_by.is_empty());
}

#[test]
fn test_booleanize_selected_predicate_becomes_bit() {
    let env = TestEnv::new();
    let mut ir = Ir::new();
    let src = source(&mut ir);
    let a_ref = ir.column_ref(src.a);
    let five = ir.int_lit(5);
    let gt = ir.binary(BinaryOp::GT, a_ref, five);
    let (select, cols) = select_of(&mut ir, Some(src.alias), vec![gt]);

    run_pass(&env, &booleanize::Booleanizer, &mut ir, select).unwrap();
    let expr = expr_of(&ir, cols[0]);
    let NodeKind::SearchedCase { whens, .. } = ir.kind(expr) else {
        panic!("expected a CASE, got {}", ir.kind(expr).name());
    };
    assert_eq!(whens.len(), 1);
    assert_eq!(whens[0].test, gt);
    assert_eq!(ir.node(expr).provider, Some(qc_sql::ProviderType::bit()));
}

#[test]
fn test_booleanize_nullable_predicate_keeps_unknown() {
    let env = TestEnv::new();
    let mut ir = Ir::new();
    let src = source(&mut ir);
    let a_ref = ir.column_ref(src.a);
    let null = ir.null(ValueType::int32());
    let eq = ir.binary(BinaryOp::EQ, a_ref, null);
    assert!(ir.ty(eq).is_nullable());
    let (select, cols) = select_of(&mut ir, Some(src.alias), vec![eq]);

    run_pass(&env, &booleanize::Booleanizer, &mut ir, select).unwrap();
    let expr = expr_of(&ir, cols[0]);
    let NodeKind::SearchedCase { whens, else_ } = ir.kind(expr) else {
        panic!("expected a CASE");
    };
    assert_eq!(whens.len(), 2);
    assert_eq!(ir.as_value(*else_), Some(&qc_core::Value::Null));
    assert_eq!(ir.ty(expr), &ValueType::nullable(ScalarKind::Bool));
}

#[test]
fn test_booleanize_bit_values_in_conditions() {
    let env = TestEnv::new();
    let mut ir = Ir::new();
    let src = source(&mut ir);
    let a_ref = ir.column_ref(src.a);
    let (select, _) = select_of(&mut ir, Some(src.alias), vec![a_ref]);
    let flag = ir.column_ref(src.c);
    let yes = ir.bool_lit(true);
    let both = ir.binary(BinaryOp::And, flag, yes);
    ir.select_mut(select).unwrap().where_ = Some(both);

    run_pass(&env, &booleanize::Booleanizer, &mut ir, select).unwrap();
    let where_ = ir.select(select).unwrap().where_.unwrap();
    let NodeKind::Binary { op: BinaryOp::And, left, right } = *ir.kind(where_) else {
        panic!("expected AND");
    };
    let NodeKind::Binary { op: BinaryOp::EQ, left: flag_side, .. } = *ir.kind(left) else {
        panic!("bit column should be compared with 1");
    };
    assert_eq!(ir.column_of(flag_side), Some(src.c));
    let NodeKind::Binary { op: BinaryOp::EQ, left: l, right: r } = *ir.kind(right) else {
        panic!("literal should become a comparison");
    };
    assert_eq!(ir.as_value(l), Some(&qc_core::Value::Int(1)));
    assert_eq!(ir.as_value(r), Some(&qc_core::Value::Int(1)));
}

#[test]
fn test_booleanize_case_test_position() {
    let env = TestEnv::new();
    let mut ir = Ir::new();
    let src = source(&mut ir);
    let flag = ir.column_ref(src.c);
    let one = ir.int_lit(1);
    let two = ir.int_lit(2);
    let case = ir.searched_case(vec![When { test: flag, value: one }], two);
    let (select, cols) = select_of(&mut ir, Some(src.alias), vec![case]);

    run_pass(&env, &booleanize::Booleanizer, &mut ir, select).unwrap();
    let NodeKind::SearchedCase { whens, .. } = ir.kind(expr_of(&ir, cols[0])) else {
        panic!("expected a CASE");
    };
    assert!(matches!(
        ir.kind(whens[0].test),
        NodeKind::Binary { op: BinaryOp::EQ, .. }
    ));
}

#[test]
fn test_validate_rejects_member_access() {
    let env = TestEnv::new();
    let mut ir = Ir::new();
    let src = source(&mut ir);
    let a_ref = ir.column_ref(src.a);
    let (select, _) = select_of(&mut ir, Some(src.alias), vec![a_ref]);
    let target = ir.alias_ref(src.alias);
    let member = ir.member(target, &MemberName::new("A"), ValueType::int32());
    let five = ir.int_lit(5);
    let gt = ir.binary(BinaryOp::GT, member, five);
    ir.select_mut(select).unwrap().where_ = Some(gt);

    let err = run_pass(&env, &validate::ClosedWorldValidator, &mut ir, select).unwrap_err();
    assert_eq!(err.code(), "QC022");
    assert!(matches!(err, CompileError::InvalidNodeForFormat { node, .. } if node == "Member"));
}

#[test]
fn test_validate_allows_construction_in_selection_only() {
    let env = TestEnv::new();
    let mut ir = Ir::new();
    let src = source(&mut ir);
    let a_ref = ir.column_ref(src.a);
    let (select, cols) = select_of(&mut ir, Some(src.alias), vec![a_ref]);
    let member = ir.column_ref(cols[0]);
    let new = ir.add(
        NodeKind::New {
            members: vec![(MemberName::new("A"), member)],
        },
        ValueType::record([("A", ValueType::int32())]),
    );
    ir.set_selection(select, new);
    run_pass(&env, &validate::ClosedWorldValidator, &mut ir, select).unwrap();

    let copy = ir.duplicate(new);
    ir.select_mut(select).unwrap().group_by = vec![copy];
    let err = run_pass(&env, &validate::ClosedWorldValidator, &mut ir, select).unwrap_err();
    assert_eq!(err.code(), "QC022");
}

#[test]
fn test_validate_skipped_for_debug_rendering() {
    let mut env = TestEnv::new();
    env.config.debug_render = true;
    let mut ir = Ir::new();
    let src = source(&mut ir);
    let target = ir.alias_ref(src.alias);
    let member = ir.member(target, &MemberName::new("A"), ValueType::int32());
    let (select, _) = select_of(&mut ir, Some(src.alias), vec![member]);
    run_pass(&env, &validate::ClosedWorldValidator, &mut ir, select).unwrap();
}

#[test]
fn test_resolve_routes_reference_through_derived_table() {
    let env = TestEnv::new();
    let mut ir = Ir::new();
    let src = source(&mut ir);
    let a_ref = ir.column_ref(src.a);
    let (inner, _) = select_of(&mut ir, Some(src.alias), vec![a_ref]);
    let inner_alias = ir.alias(inner);
    // reads B straight off the table, which is not visible here
    let hidden = ir.column_ref(src.b);
    let (outer, outer_cols) = select_of(&mut ir, Some(inner_alias), vec![hidden]);

    run_pass(&env, &resolve::ColumnResolver, &mut ir, outer).unwrap();
    let routed = ir.column_of(expr_of(&ir, outer_cols[0])).unwrap();
    assert_eq!(ir.column_owner(routed), Some(inner));
    assert_eq!(ir.select(inner).unwrap().row.len(), 2);
    assert_eq!(ir.column_of(expr_of(&ir, routed)), Some(src.b));
}

#[test]
fn test_client_queries_parameterize_parent_columns() {
    let env = TestEnv::new();
    let mut ir = Ir::new();
    let parent_src = source(&mut ir);
    let child_src = source(&mut ir);

    let child_b = ir.column_ref(child_src.b);
    let (child, _) = select_of(&mut ir, Some(child_src.alias), vec![child_b]);
    let child_a = ir.column_ref(child_src.a);
    let parent_a = ir.column_ref(parent_src.a);
    let eq = ir.binary(BinaryOp::EQ, child_a, parent_a);
    ir.select_mut(child).unwrap().where_ = Some(eq);
    let multiset = ir.sub_select(SubSelectKind::Multiset, child);

    let a_ref = ir.column_ref(parent_src.a);
    let (parent, parent_cols) = select_of(&mut ir, Some(parent_src.alias), vec![a_ref]);
    ir.set_selection(parent, multiset);

    let cx = env.context();
    let mut state = PassState::default();
    client_queries::ClientQuerySplitter
        .run(&mut ir, parent, &cx, &mut state)
        .unwrap();

    assert_eq!(state.children.len(), 1);
    let child_query = &state.children[0];
    assert_eq!(child_query.select, child);
    assert_eq!(child_query.node, multiset);
    assert_eq!(child_query.parameters, vec![("@x0".to_string(), parent_cols[0])]);
    assert!(matches!(
        ir.kind(parent_a),
        NodeKind::Parameter { name, outer: Some(c), .. } if name == "@x0" && *c == parent_cols[0]
    ));
}
