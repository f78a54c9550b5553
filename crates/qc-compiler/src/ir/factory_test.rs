use super::*;

#[test]
fn test_comparison_types() {
    let mut ir = Ir::new();
    let a = ir.value(Value::Int(1), ValueType::nullable(ScalarKind::Int32));
    let b = ir.int_lit(2);
    let eq = ir.binary(BinaryOp::EQ, a, b);
    assert_eq!(ir.ty(eq), &ValueType::nullable(ScalarKind::Bool));
    let eq2 = ir.binary(BinaryOp::EQ2V, a, b);
    assert_eq!(ir.ty(eq2), &ValueType::bool());
}

#[test]
fn test_arithmetic_takes_left_type() {
    let mut ir = Ir::new();
    let a = ir.value(Value::Int(1), ValueType::int64());
    let b = ir.value(Value::Null, ValueType::nullable(ScalarKind::Int32));
    let sum = ir.binary(BinaryOp::Add, a, b);
    assert_eq!(ir.ty(sum), &ValueType::nullable(ScalarKind::Int64));
}

#[test]
fn test_and_all() {
    let mut ir = Ir::new();
    assert_eq!(ir.and_all(vec![]), None);
    let t = ir.bool_lit(true);
    assert_eq!(ir.and_all(vec![t]), Some(t));
    let f = ir.bool_lit(false);
    let both = ir.and_all(vec![t, f]).unwrap();
    assert!(matches!(
        ir.kind(both),
        NodeKind::Binary {
            op: BinaryOp::And,
            ..
        }
    ));
}

#[test]
fn test_sub_select_types() {
    let mut ir = Ir::new();
    let x = ir.int_lit(1);
    let sel = ir.new_select(x, None);
    let scalar = ir.sub_select(SubSelectKind::Scalar, sel);
    assert!(ir.ty(scalar).is_nullable());
    let multiset = ir.sub_select(SubSelectKind::Multiset, sel);
    assert_eq!(ir.ty(multiset), &ValueType::sequence(ValueType::int32()));
    let exists = ir.sub_select(SubSelectKind::Exists, sel);
    assert_eq!(ir.ty(exists), &ValueType::bool());
}

#[test]
fn test_dummy_select_has_one_column() {
    let mut ir = Ir::new();
    let sel = ir.dummy_select();
    let s = ir.select(sel).unwrap();
    assert_eq!(s.row.len(), 1);
    assert_eq!(ir.column_owner(s.row[0]), Some(sel));
}

#[test]
fn test_searched_case_nullability() {
    let mut ir = Ir::new();
    let p = ir.bool_lit(true);
    let one = ir.int_lit(1);
    let null = ir.null(ValueType::int32());
    let case = ir.searched_case(vec![When { test: p, value: one }], null);
    assert_eq!(ir.ty(case), &ValueType::nullable(ScalarKind::Int32));
}
