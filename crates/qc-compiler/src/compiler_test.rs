use super::*;
use crate::test_utils::*;
use qc_core::query::build;
use qc_core::{BinaryOperator, Declaring, MemberName, ObjectValue, TypeName, Value, ValueType};
use std::collections::BTreeMap;

fn employee_over_five() -> QueryExpr {
    orders_where(cmp(
        BinaryOperator::GreaterThan,
        o("EmployeeID", int32()),
        build::int(5),
    ))
}

fn new_order() -> QueryExpr {
    let mut fields = BTreeMap::new();
    fields.insert(MemberName::new("CustomerID"), Value::String("ALFKI".to_string()));
    fields.insert(MemberName::new("EmployeeID"), Value::Int(3));
    build::constant(
        Value::Object(ObjectValue {
            type_name: TypeName::new("Order"),
            fields,
            original: None,
        }),
        order_ty(),
    )
}

#[test]
fn test_text_joins_statements_with_blank_lines() {
    let compiled = CompiledQuery {
        statements: vec!["SELECT 1".to_string(), "SELECT 2".to_string()],
        parameters: vec![],
        shape: None,
        identity_statement: None,
        children: vec![],
        debug_text: String::new(),
    };
    assert_eq!(compiled.text(), "SELECT 1\n\nSELECT 2");
}

#[test]
fn test_filtered_table_compiles_to_one_select() {
    let env = TestEnv::new();
    let compiled = env.compile(&employee_over_five()).unwrap();

    assert_eq!(compiled.statements.len(), 1);
    let sql = compiled.text();
    assert_eq!(sql.matches("SELECT").count(), 1, "{sql}");
    assert!(sql.contains("FROM [dbo].[Orders] AS [A0]"), "{sql}");
    assert!(sql.ends_with("WHERE [A0].[EmployeeID] > 5"), "{sql}");
    assert!(compiled.parameters.is_empty());
    assert!(compiled.children.is_empty());
    assert_eq!(compiled.identity_statement, None);
}

#[test]
fn test_entity_rows_have_a_record_shape() {
    let env = TestEnv::new();
    let compiled = env.compile(&employee_over_five()).unwrap();
    let Some(ResultShape::Record { members, .. }) = compiled.shape else {
        panic!("expected a record shape, got {:?}", compiled.shape);
    };
    assert!(members.iter().any(|m| m.name == "OrderID"));
    assert!(members.iter().any(|m| m.name == "EmployeeID"));
}

#[test]
fn test_parameterized_literals_are_listed() {
    let env = TestEnv::new().parameterized();
    let compiled = env.compile(&employee_over_five()).unwrap();

    assert!(compiled.text().ends_with("WHERE [A0].[EmployeeID] > @p0"));
    assert_eq!(compiled.parameters.len(), 1);
    assert_eq!(compiled.parameters[0].name, "@p0");
    assert_eq!(compiled.parameters[0].value, Some(Value::Int(5)));
}

#[test]
fn test_take_count_stays_inline_when_parameterizing() {
    let env = TestEnv::new().parameterized();
    let query = build::seq("Take", vec![orders(), build::int(3)], seq_of(order_ty()));
    let sql = env.sql(&query);
    assert!(sql.starts_with("SELECT TOP 3 "), "{sql}");
}

#[test]
fn test_debug_text_matches_plain_rendering() {
    let env = TestEnv::new();
    let compiled = env.compile(&employee_over_five()).unwrap();
    assert_eq!(compiled.debug_text, compiled.text());
}

#[test]
fn test_insert_reports_identity_statement() {
    let env = TestEnv::new();
    let selector = order_lambda(o("OrderID", int32()));
    let query = build::call(
        Declaring::DataManipulation,
        "Insert",
        None,
        vec![new_order(), selector],
        int32(),
    );
    let compiled = env.compile(&query).unwrap();

    assert_eq!(compiled.statements.len(), 2);
    assert!(compiled.statements[0].starts_with("INSERT INTO [dbo].[Orders]"));
    assert_eq!(compiled.identity_statement, Some(1));
}

#[test]
fn test_delete_has_no_identity_statement() {
    let env = TestEnv::new();
    let query = build::call(
        Declaring::DataManipulation,
        "Delete",
        None,
        vec![new_order()],
        ValueType::Unit,
    );
    let compiled = env.compile(&query).unwrap();
    assert!(compiled.text().starts_with("DELETE FROM [dbo].[Orders]"));
    assert_eq!(compiled.identity_statement, None);
}

#[test]
fn test_pass_filter_is_honored() {
    let env = TestEnv::new();
    let filter = vec!["resolve".to_string(), "validate".to_string()];
    let compiled = env
        .compiler()
        .compile_with_passes(&employee_over_five(), Some(&filter))
        .unwrap();
    assert!(compiled.text().contains("[dbo].[Orders]"));
}

#[test]
fn test_serialized_form_tags_shapes_and_hides_node_ids() {
    let env = TestEnv::new().parameterized();
    let compiled = env.compile(&employee_over_five()).unwrap();
    let json = serde_json::to_value(&compiled).unwrap();

    assert_eq!(json["shape"]["kind"], "record");
    assert_eq!(json["parameters"][0]["name"], "@p0");
    assert!(json["parameters"][0].get("outer").is_none());
    assert!(json["identity_statement"].is_null());
}
