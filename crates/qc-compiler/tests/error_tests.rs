//! Rejected queries and the codes they report

use qc_compiler::test_utils::*;
use qc_core::query::build;
use qc_core::{BinaryOperator, Declaring, QueryExpr, StaticSession, TypeName, ValueType};

fn code_of(env: &TestEnv, query: &QueryExpr) -> &'static str {
    match env.compile(query) {
        Ok(compiled) => panic!("expected an error, compiled to:\n{}", compiled.text()),
        Err(err) => err.code(),
    }
}

// ── Methods ─────────────────────────────────────────────────────────────

#[test]
fn test_unknown_method_family() {
    let call = build::call(
        Declaring::Other {
            name: "Guid".to_string(),
        },
        "NewGuid",
        None,
        Vec::new(),
        nullable_string(),
    );
    assert_eq!(code_of(&TestEnv::new(), &orders_select(call)), "QC003");
}

#[test]
fn test_unknown_mapped_function() {
    let call = build::call(
        Declaring::Mapped {
            function: "Nope".to_string(),
        },
        "Nope",
        None,
        Vec::new(),
        int32(),
    );
    assert_eq!(code_of(&TestEnv::new(), &orders_select(call)), "QC003");
}

#[test]
fn test_stored_procedure_in_projection() {
    let purge = build::call(
        Declaring::Mapped {
            function: "Purge".to_string(),
        },
        "Purge",
        None,
        Vec::new(),
        int32(),
    );
    assert_eq!(code_of(&TestEnv::new(), &orders_select(purge)), "QC020");
}

#[test]
fn test_function_with_wrong_arity() {
    let total = build::call(
        Declaring::Mapped {
            function: "TotalFor".to_string(),
        },
        "TotalFor",
        None,
        Vec::new(),
        int32(),
    );
    assert_eq!(code_of(&TestEnv::new(), &orders_select(total)), "QC002");
}

// ── Paging ──────────────────────────────────────────────────────────────

#[test]
fn test_negative_skip() {
    let query = build::seq("Skip", vec![orders(), build::int(-1)], seq_of(order_ty()));
    assert_eq!(code_of(&TestEnv::new(), &query), "QC005");
}

#[test]
fn test_not_exists_skip_over_a_join() {
    let env = TestEnv::new().not_exists_skip();
    let c = build::param("c", customer_ty());
    let body = build::record(vec![
        ("OrderID", o("OrderID", int32())),
        ("CustomerID", build::member(c, "CustomerID", ValueType::string())),
    ]);
    let joined_ty = seq_of(body.ty());
    let joined = build::seq(
        "SelectMany",
        vec![
            orders(),
            order_lambda(customers()),
            build::lambda_n(vec![("o", order_ty()), ("c", customer_ty())], body),
        ],
        joined_ty.clone(),
    );
    let query = build::seq("Skip", vec![joined, build::int(2)], joined_ty);
    assert_eq!(code_of(&env, &query), "QC007");
}

// ── Comparisons and construction ────────────────────────────────────────

#[test]
fn test_sequence_equality() {
    let pred = cmp(BinaryOperator::Equal, orders(), orders());
    assert_eq!(code_of(&TestEnv::new(), &orders_where(pred)), "QC010");
}

#[test]
fn test_entity_construction_in_projection() {
    let new_order = QueryExpr::New {
        ty: order_ty(),
        members: Vec::new(),
    };
    assert_eq!(code_of(&TestEnv::new(), &orders_select(new_order)), "QC013");
}

// ── Scope and context ───────────────────────────────────────────────────

#[test]
fn test_table_from_another_context() {
    let env = TestEnv::new().session(StaticSession::new().with_context("sales"));
    let foreign = QueryExpr::Table {
        row_type: TypeName::new("Order"),
        context: Some("archive".to_string()),
    };
    assert_eq!(code_of(&env, &foreign), "QC014");
}

#[test]
fn test_table_from_the_same_context_compiles() {
    let env = TestEnv::new().session(StaticSession::new().with_context("sales"));
    let own = QueryExpr::Table {
        row_type: TypeName::new("Order"),
        context: Some("sales".to_string()),
    };
    assert!(env.compile(&own).is_ok());
}

#[test]
fn test_parameter_outside_its_lambda() {
    let stray = build::member(build::param("x", order_ty()), "EmployeeID", int32());
    let pred = cmp(BinaryOperator::GreaterThan, stray, build::int(5));
    assert_eq!(code_of(&TestEnv::new(), &orders_where(pred)), "QC016");
}

#[test]
fn test_error_messages_carry_the_code() {
    let query = build::seq("Take", vec![orders(), build::int(-4)], seq_of(order_ty()));
    let err = TestEnv::new().compile(&query).unwrap_err();
    let message = err.to_string();
    assert!(message.starts_with("[QC005]"), "{message}");
    assert!(message.contains("-4"), "{message}");
}
