use super::*;
use crate::ir::Ir;
use crate::lowering::lower_query;
use crate::test_utils::*;
use qc_core::query::build;
use qc_core::UnaryOperator;

fn find(ir: &Ir, root: NodeId, pred: impl Fn(&NodeKind) -> bool) -> Option<NodeId> {
    ir.subtree(root).into_iter().find(|&id| pred(ir.kind(id)))
}

fn lower_err(query: &QueryExpr) -> CompileError {
    let env = TestEnv::new();
    let cx = env.context();
    let mut ir = Ir::new();
    match lower_query(&mut ir, &cx, query) {
        Ok(_) => panic!("expected lowering to fail"),
        Err(e) => e,
    }
}

#[test]
fn test_string_addition_is_concatenation() {
    let body = build::binary(
        BinaryOperator::Add,
        o("ShipCity", nullable_string()),
        build::string("!"),
        nullable_string(),
    );
    let (ir, root) = TestEnv::new().lower(&orders_select(body));
    assert!(find(&ir, root, |k| matches!(k, NodeKind::Binary { op: BinaryOp::Concat, .. })).is_some());
}

#[test]
fn test_scalar_coalesce_is_a_function() {
    let body = build::binary(
        BinaryOperator::Coalesce,
        o("ShipCity", nullable_string()),
        build::string("none"),
        ValueType::string(),
    );
    let (ir, root) = TestEnv::new().lower(&orders_select(body));
    let call = find(&ir, root, |k| matches!(k, NodeKind::Function { name, .. } if name == "COALESCE"));
    assert!(call.is_some());
}

#[test]
fn test_date_arithmetic_becomes_a_method_call() {
    let date = ValueType::nullable(ScalarKind::DateTime);
    let body = build::binary(
        BinaryOperator::Add,
        o("OrderDate", date.clone()),
        build::constant(Value::TimeSpan(864_000_000_000), ValueType::scalar(ScalarKind::TimeSpan)),
        date,
    );
    let (ir, root) = TestEnv::new().lower(&orders_select(body));
    let call = find(&ir, root, |k| {
        matches!(k, NodeKind::MethodCall { declaring: Declaring::DateTime, method, .. } if method == "op_Addition")
    });
    assert!(call.is_some());
}

#[test]
fn test_sequence_equality_is_rejected() {
    let lines = build::member(build::param("o", order_ty()), "Lines", seq_of(ValueType::entity("OrderLine")));
    let pred = cmp(BinaryOperator::Equal, lines.clone(), lines);
    let err = lower_err(&orders_where(pred));
    assert!(matches!(err, CompileError::ComparisonNotSupported { .. }));
}

#[test]
fn test_nested_conditionals_share_one_case() {
    let employee = o("EmployeeID", int32());
    let inner = QueryExpr::Conditional {
        test: Box::new(cmp(BinaryOperator::GreaterThan, employee.clone(), build::int(5))),
        if_true: Box::new(build::string("mid")),
        if_false: Box::new(build::string("low")),
        ty: ValueType::string(),
    };
    let body = QueryExpr::Conditional {
        test: Box::new(cmp(BinaryOperator::GreaterThan, employee, build::int(10))),
        if_true: Box::new(build::string("high")),
        if_false: Box::new(inner),
        ty: ValueType::string(),
    };
    let (ir, root) = TestEnv::new().lower(&orders_select(body));
    let cases: Vec<NodeId> = ir
        .subtree(root)
        .into_iter()
        .filter(|&id| matches!(ir.kind(id), NodeKind::SearchedCase { .. }))
        .collect();
    assert_eq!(cases.len(), 1);
    let NodeKind::SearchedCase { whens, .. } = ir.kind(cases[0]) else {
        unreachable!()
    };
    assert_eq!(whens.len(), 2);
}

#[test]
fn test_constructing_mapped_entity_is_rejected() {
    let body = QueryExpr::New {
        ty: customer_ty(),
        members: Vec::new(),
    };
    let err = lower_err(&orders_select(body));
    assert!(matches!(err, CompileError::EntityConstructionNotAllowed { ref type_name } if type_name == "Customer"));
}

#[test]
fn test_type_is_checks_the_treated_value() {
    let person = ValueType::entity("Person");
    let pred = QueryExpr::TypeIs {
        operand: Box::new(build::param("p", person.clone())),
        type_name: TypeName::new("Contact"),
    };
    let query = build::seq(
        "Where",
        vec![people(), build::lambda("p", person.clone(), pred)],
        seq_of(person),
    );
    let (ir, root) = TestEnv::new().lower(&query);
    let check = find(&ir, root, |k| matches!(k, NodeKind::Unary { op: UnaryOp::IsNotNull, .. }))
        .expect("IS NOT NULL");
    let NodeKind::Unary { operand, .. } = ir.kind(check) else {
        unreachable!()
    };
    assert!(matches!(ir.kind(*operand), NodeKind::Unary { op: UnaryOp::Treat, .. }));
}

#[test]
fn test_type_as_unmapped_type_is_rejected() {
    let pred = QueryExpr::TypeIs {
        operand: Box::new(build::param("o", order_ty())),
        type_name: TypeName::new("Invoice"),
    };
    assert!(matches!(lower_err(&orders_where(pred)), CompileError::Core(_)));
}

#[test]
fn test_host_variable_becomes_parameter() {
    let pred = cmp(
        BinaryOperator::Equal,
        o("EmployeeID", int32()),
        build::variable("employee", Value::Int(7), int32()),
    );
    let (ir, root) = TestEnv::new().lower(&orders_where(pred));
    let param = find(&ir, root, |k| matches!(k, NodeKind::Parameter { name, .. } if name == "employee"));
    assert!(param.is_some());
}

#[test]
fn test_unknown_method_family_is_rejected() {
    let body = build::call(
        Declaring::Other {
            name: "Regex".to_string(),
        },
        "IsMatch",
        None,
        vec![o("ShipCity", nullable_string())],
        ValueType::bool(),
    );
    let err = lower_err(&orders_select(body));
    assert!(matches!(err, CompileError::UnsupportedMethod { ref declaring, .. } if declaring == "Regex"));
}

#[test]
fn test_stored_procedure_inside_query_is_rejected() {
    let purge = build::call(
        Declaring::Mapped {
            function: "Purge".to_string(),
        },
        "Purge",
        None,
        Vec::new(),
        int32(),
    );
    let err = lower_err(&orders_select(purge));
    assert!(matches!(err, CompileError::SprocsCannotBeComposed { .. }));
}

#[test]
fn test_scalar_function_converts_typed_arguments() {
    let total = build::call(
        Declaring::Mapped {
            function: "TotalFor".to_string(),
        },
        "TotalFor",
        None,
        vec![o("OrderID", int32())],
        ValueType::nullable(ScalarKind::Decimal),
    );
    let (ir, root) = TestEnv::new().lower(&orders_select(total));
    let call = find(&ir, root, |k| matches!(k, NodeKind::Function { name, .. } if name == "dbo.fn_TotalFor"))
        .expect("function call");
    let NodeKind::Function { args, .. } = ir.kind(call) else {
        unreachable!()
    };
    assert!(matches!(ir.kind(args[0]), NodeKind::Unary { op: UnaryOp::Convert, .. }));
    assert!(ir.node(args[0]).provider.is_some());
}

#[test]
fn test_invoke_with_non_constant_argument_is_rejected() {
    let lambda = build::lambda("x", int32(), build::param("x", int32()));
    let body = QueryExpr::Invoke {
        lambda: Box::new(lambda),
        args: vec![o("EmployeeID", int32())],
    };
    assert!(matches!(lower_err(&orders_select(body)), CompileError::ConstantRequired { .. }));
}

#[test]
fn test_unary_plus_is_dropped() {
    let body = build::unary(UnaryOperator::UnaryPlus, o("EmployeeID", int32()), int32());
    let (ir, root) = TestEnv::new().lower(&orders_select(body));
    assert!(find(&ir, root, |k| matches!(k, NodeKind::Unary { .. })).is_none());
}
