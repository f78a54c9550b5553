use super::*;

#[test]
fn test_parse_sized_string() {
    let t = ProviderType::parse("NVarChar(40) NOT NULL").unwrap();
    assert_eq!(t.kind, SqlTypeKind::NVarChar);
    assert_eq!(t.size, Some(TypeSize::Fixed(40)));
    assert!(t.is_string());
    assert!(t.is_unicode());
    assert_eq!(t.to_query_string(), "NVarChar(40)");
}

#[test]
fn test_parse_max_and_decimal() {
    let t = ProviderType::parse("varbinary(max)").unwrap();
    assert_eq!(t.size, Some(TypeSize::Max));
    assert!(t.is_large_type());

    let d = ProviderType::parse("Decimal(18, 2)").unwrap();
    assert_eq!(d.to_query_string(), "Decimal(18,2)");
    assert!(d.is_exact_numeric());
}

#[test]
fn test_parse_identity_modifiers_ignored() {
    let t = ProviderType::parse("Int NOT NULL IDENTITY").unwrap();
    assert_eq!(t, ProviderType::int());
    assert!(t.is_integral());
}

#[test]
fn test_parse_unknown_type() {
    assert!(matches!(
        ProviderType::parse("Geography"),
        Err(SqlError::UnknownDbType(_))
    ));
}

#[test]
fn test_text_is_not_orderable() {
    assert!(!ProviderType::parse("NText").unwrap().is_orderable());
    assert!(ProviderType::nvarchar_default().is_orderable());
}

#[test]
fn test_default_mapping() {
    let p = SqlServerTypeProvider::new();
    assert_eq!(
        p.from_value_type(&ValueType::string()),
        Some(ProviderType::nvarchar_default())
    );
    assert_eq!(
        p.from_value_type(&ValueType::nullable(ScalarKind::Int32)),
        Some(ProviderType::int())
    );
    assert_eq!(p.from_value_type(&ValueType::entity("Customer")), None);
    assert_eq!(
        p.from_value_type(&ValueType::scalar(ScalarKind::Decimal))
            .map(|t| t.to_query_string()),
        Some("Decimal(29,4)".to_string())
    );
}

#[test]
fn test_conversion_method() {
    let p = SqlServerTypeProvider::new();
    let int = ValueType::int32();
    let nint = ValueType::nullable(ScalarKind::Int32);
    assert_eq!(p.conversion_method(&int, &int), ConversionMethod::Ignore);
    assert_eq!(p.conversion_method(&int, &nint), ConversionMethod::Lift);
    assert_eq!(
        p.conversion_method(&int, &ValueType::int64()),
        ConversionMethod::Convert
    );
    assert_eq!(
        p.conversion_method(&ValueType::entity("Contact"), &ValueType::entity("Person")),
        ConversionMethod::Treat
    );
}

#[test]
fn test_most_precise() {
    let p = SqlServerTypeProvider::new();
    let a = ProviderType::sized(SqlTypeKind::VarChar, TypeSize::Fixed(10));
    let b = ProviderType::sized(SqlTypeKind::NVarChar, TypeSize::Fixed(20));
    assert_eq!(
        p.most_precise(&a, &b),
        ProviderType::sized(SqlTypeKind::NVarChar, TypeSize::Fixed(20))
    );
    assert_eq!(
        p.most_precise(&ProviderType::int(), &ProviderType::bigint()),
        ProviderType::bigint()
    );
}
