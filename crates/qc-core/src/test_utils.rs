//! Shared fixtures for tests across the workspace
//!
//! Exposed under the `test-support` feature so downstream crates can build
//! their tests on the same mapping.

use crate::mapping::MappingModel;

/// A small order-entry schema with a composite key, an inheritance
/// hierarchy and both association directions.
pub const NORTHWIND_YAML: &str = r#"
types:
  - name: Customer
    table: dbo.Customers
    members:
      - { name: CustomerID, ty: { type: scalar, kind: string }, primary_key: true, db_type: "NChar(5) NOT NULL" }
      - { name: CompanyName, ty: { type: scalar, kind: string }, db_type: "NVarChar(40) NOT NULL" }
      - { name: City, ty: { type: scalar, kind: string, nullable: true }, db_type: "NVarChar(15)" }
      - { name: Country, ty: { type: scalar, kind: string, nullable: true }, db_type: "NVarChar(15)" }
    associations:
      - { name: Orders, other_type: Order, this_key: [CustomerID], other_key: [CustomerID], many: true }

  - name: Order
    table: dbo.Orders
    members:
      - { name: OrderID, ty: { type: scalar, kind: int32 }, primary_key: true, db_generated: true, db_type: "Int NOT NULL IDENTITY" }
      - { name: CustomerID, ty: { type: scalar, kind: string, nullable: true }, db_type: "NChar(5)" }
      - { name: EmployeeID, ty: { type: scalar, kind: int32 }, db_type: "Int NOT NULL" }
      - { name: OrderDate, ty: { type: scalar, kind: date_time, nullable: true }, db_type: "DateTime" }
      - { name: Freight, ty: { type: scalar, kind: decimal, nullable: true }, db_type: "Money" }
      - { name: ShipCity, ty: { type: scalar, kind: string, nullable: true }, db_type: "NVarChar(15)" }
      - { name: Version, ty: { type: scalar, kind: binary }, version: true, db_generated: true, db_type: "rowversion NOT NULL" }
    associations:
      - { name: Customer, other_type: Customer, this_key: [CustomerID], other_key: [CustomerID], foreign_key: true }
      - { name: Employee, other_type: Employee, this_key: [EmployeeID], other_key: [EmployeeID], foreign_key: true }
      - { name: Lines, other_type: OrderLine, this_key: [OrderID], other_key: [OrderID], many: true }

  - name: OrderLine
    table: dbo.[Order Details]
    members:
      - { name: OrderID, ty: { type: scalar, kind: int32 }, primary_key: true }
      - { name: ProductID, ty: { type: scalar, kind: int32 }, primary_key: true }
      - { name: Quantity, ty: { type: scalar, kind: int16 }, db_type: "SmallInt NOT NULL" }
      - { name: UnitPrice, ty: { type: scalar, kind: decimal }, db_type: "Money NOT NULL" }
    associations:
      - { name: Order, other_type: Order, this_key: [OrderID], other_key: [OrderID], foreign_key: true }

  - name: Employee
    table: dbo.Employees
    members:
      - { name: EmployeeID, ty: { type: scalar, kind: int32 }, primary_key: true, db_generated: true }
      - { name: LastName, ty: { type: scalar, kind: string } }
      - { name: ReportsTo, ty: { type: scalar, kind: int32, nullable: true } }
    associations:
      - { name: Manager, other_type: Employee, this_key: [ReportsTo], other_key: [EmployeeID], foreign_key: true }

  - name: Person
    table: dbo.People
    inheritance_code: { kind: string, value: "P" }
    is_inheritance_default: true
    members:
      - { name: PersonID, ty: { type: scalar, kind: guid }, primary_key: true }
      - { name: Kind, ty: { type: scalar, kind: string }, discriminator: true }
      - { name: Name, ty: { type: scalar, kind: string } }

  - name: Contact
    base: Person
    inheritance_code: { kind: string, value: "C" }
    members:
      - { name: Phone, ty: { type: scalar, kind: string, nullable: true } }

  - name: Supplier
    base: Contact
    inheritance_code: { kind: string, value: "S" }
    members:
      - { name: HomePage, ty: { type: scalar, kind: string, nullable: true } }

functions:
  - { name: TotalFor, db_name: dbo.fn_TotalFor, kind: scalar, parameters: [{ name: id, ty: { type: scalar, kind: int32 }, db_type: "BigInt" }], returns: { type: scalar, kind: decimal, nullable: true } }
  - { name: OrdersSince, db_name: dbo.fn_OrdersSince, kind: table_valued, parameters: [{ name: since, ty: { type: scalar, kind: date_time } }], returns: { type: sequence, element: { type: entity, name: Order } } }
  - { name: Purge, db_name: dbo.sp_Purge, kind: procedure, composable: false, returns: { type: scalar, kind: int32 } }
"#;

/// The fixture mapping, resolved
pub fn northwind() -> MappingModel {
    match MappingModel::from_yaml(NORTHWIND_YAML) {
        Ok(m) => m,
        Err(e) => panic!("fixture mapping is invalid: {e}"),
    }
}
