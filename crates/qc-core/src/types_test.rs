use super::*;

#[test]
fn test_scalar_kind_families() {
    assert!(ScalarKind::Int16.is_integral());
    assert!(ScalarKind::Decimal.is_numeric());
    assert!(!ScalarKind::Decimal.is_integral());
    assert!(ScalarKind::Char.is_string_like());
    assert!(ScalarKind::DateTimeOffset.is_temporal());
    assert!(!ScalarKind::Guid.is_numeric());
}

#[test]
fn test_nullability_of_reference_types() {
    assert!(!ValueType::int32().is_nullable());
    assert!(ValueType::nullable(ScalarKind::Int32).is_nullable());
    assert!(ValueType::entity("Customer").is_nullable());
    assert!(!ValueType::sequence(ValueType::int32()).is_nullable());
}

#[test]
fn test_member_type_on_record_and_grouping() {
    let rec = ValueType::record([("Id", ValueType::int32()), ("Name", ValueType::string())]);
    assert_eq!(rec.member_type("Name"), Some(&ValueType::string()));
    assert_eq!(rec.member_type("Missing"), None);

    let g = ValueType::grouping(ValueType::string(), ValueType::entity("Order"));
    assert_eq!(g.member_type("Key"), Some(&ValueType::string()));
    assert_eq!(g.element_type(), Some(&ValueType::entity("Order")));
}

#[test]
fn test_same_shape_ignores_scalar_nullability() {
    let a = ValueType::record([("X", ValueType::int32())]);
    let b = ValueType::record([("X", ValueType::nullable(ScalarKind::Int32))]);
    let c = ValueType::record([("Y", ValueType::int32())]);
    assert!(a.same_shape(&b));
    assert!(!a.same_shape(&c));
}

#[test]
fn test_value_type_json_shape() {
    let json = r#"{"type":"scalar","kind":"int32","nullable":true}"#;
    let ty: ValueType = serde_json::from_str(json).unwrap();
    assert_eq!(ty, ValueType::nullable(ScalarKind::Int32));

    let json = r#"{"type":"sequence","element":{"type":"entity","name":"Customer"}}"#;
    let ty: ValueType = serde_json::from_str(json).unwrap();
    assert_eq!(ty.element_type(), Some(&ValueType::entity("Customer")));
}

#[test]
fn test_display_name() {
    assert_eq!(ValueType::nullable(ScalarKind::Int32).display_name(), "Int32?");
    assert_eq!(
        ValueType::sequence(ValueType::entity("Order")).to_string(),
        "Sequence<Order>"
    );
}
