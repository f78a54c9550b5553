use super::*;
use crate::test_utils::northwind;
use std::io::Write;

#[test]
fn test_fixture_loads() {
    let model = northwind();
    let order = model.meta_type(&TypeName::new("Order")).unwrap();
    assert_eq!(order.table.as_deref(), Some("dbo.Orders"));
    assert_eq!(order.identity_members().len(), 1);
    assert!(order.association("Customer").unwrap().foreign_key);
}

#[test]
fn test_composite_key() {
    let model = northwind();
    let line = model.meta_type(&TypeName::new("OrderLine")).unwrap();
    let keys: Vec<&str> = line
        .identity_members()
        .iter()
        .map(|m| m.name.as_str())
        .collect();
    assert_eq!(keys, vec!["OrderID", "ProductID"]);
}

#[test]
fn test_inherited_members_and_root() {
    let model = northwind();
    let supplier = model.meta_type(&TypeName::new("Supplier")).unwrap();
    assert_eq!(supplier.root_name(), "Person");
    assert_eq!(supplier.table.as_deref(), Some("dbo.People"));
    let names: Vec<&str> = supplier.members.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["PersonID", "Kind", "Name", "Phone", "HomePage"]);
    assert!(supplier.discriminator().is_some());
}

#[test]
fn test_derived_types_and_assignability() {
    let model = northwind();
    let person = TypeName::new("Person");
    let hierarchy: Vec<&str> = model
        .hierarchy(&person)
        .iter()
        .map(|t| t.name.as_str())
        .collect();
    assert_eq!(hierarchy.len(), 3);
    assert!(hierarchy.contains(&"Supplier"));
    assert!(model.is_assignable(&TypeName::new("Supplier"), &person));
    assert!(!model.is_assignable(&person, &TypeName::new("Contact")));
    assert_eq!(model.table_name(&TypeName::new("Contact")), Some("dbo.People"));
}

#[test]
fn test_default_association_keys() {
    let yaml = r#"
types:
  - name: A
    table: A
    members:
      - { name: Id, ty: { type: scalar, kind: int32 }, primary_key: true }
    associations:
      - { name: Bs, other_type: B, other_key: [AId], many: true }
  - name: B
    table: B
    members:
      - { name: Id, ty: { type: scalar, kind: int32 }, primary_key: true }
      - { name: AId, ty: { type: scalar, kind: int32 } }
"#;
    let model = MappingModel::from_yaml(yaml).unwrap();
    let a = model.meta_type(&TypeName::new("A")).unwrap();
    assert_eq!(a.association("Bs").unwrap().this_key, vec![MemberName::new("Id")]);
}

#[test]
fn test_key_length_mismatch_rejected() {
    let yaml = r#"
types:
  - name: A
    table: A
    members:
      - { name: Id, ty: { type: scalar, kind: int32 }, primary_key: true }
    associations:
      - { name: Bs, other_type: A, this_key: [Id], other_key: [], many: true }
  - name: X
    table: X
    members:
      - { name: P, ty: { type: scalar, kind: int32 }, primary_key: true }
      - { name: Q, ty: { type: scalar, kind: int32 }, primary_key: true }
    associations:
      - { name: As, other_type: X, this_key: [P] , other_key: [P, Q] }
"#;
    let err = MappingModel::from_yaml(yaml).unwrap_err();
    assert!(matches!(err, CoreError::MappingInvalid { .. }), "{err}");
}

#[test]
fn test_hierarchy_requires_discriminator() {
    let yaml = r#"
types:
  - name: Base
    table: T
    members:
      - { name: Id, ty: { type: scalar, kind: int32 }, primary_key: true }
  - name: Derived
    base: Base
"#;
    let err = MappingModel::from_yaml(yaml).unwrap_err();
    assert!(err.to_string().contains("discriminator"));
}

#[test]
fn test_unknown_field_rejected() {
    let yaml = "types:\n  - name: A\n    tabel: A\n";
    assert!(matches!(
        MappingModel::from_yaml(yaml),
        Err(CoreError::MappingParseError { .. })
    ));
}

#[test]
fn test_load_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(crate::test_utils::NORTHWIND_YAML.as_bytes())
        .unwrap();
    let model = MappingModel::load(file.path()).unwrap();
    assert!(model.function("TotalFor").is_some());
    assert_eq!(
        model.function("Purge").map(|f| f.composable),
        Some(false)
    );
}

#[test]
fn test_load_missing_file() {
    let err = MappingModel::load(Path::new("/nonexistent/mapping.yml")).unwrap_err();
    assert!(matches!(err, CoreError::MappingNotFound { .. }));
}
