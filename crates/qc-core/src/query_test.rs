use super::build::*;
use super::*;

fn customer() -> ValueType {
    ValueType::entity("Customer")
}

#[test]
fn test_table_type_is_sequence_of_entity() {
    let t = table("Customer");
    assert_eq!(t.ty(), ValueType::sequence(customer()));
}

#[test]
fn test_as_lambda_sees_through_quote() {
    let body = member(param("c", customer()), "City", ValueType::string());
    let lam = lambda("c", customer(), body.clone());
    let quoted = unary(UnaryOperator::Quote, lam, ValueType::Unit);
    let (params, b) = quoted.as_lambda().unwrap();
    assert_eq!(params[0].name, "c");
    assert_eq!(b, &body);
}

#[test]
fn test_json_call_shape() {
    let json = r#"{
        "kind": "call",
        "declaring": "queryable",
        "method": "Where",
        "args": [
            {"kind": "table", "row_type": "Customer"},
            {"kind": "lambda",
             "params": [{"name": "c", "ty": {"type": "entity", "name": "Customer"}}],
             "body": {"kind": "constant", "value": {"kind": "bool", "value": true},
                      "ty": {"type": "scalar", "kind": "bool"}}}
        ],
        "ty": {"type": "sequence", "element": {"type": "entity", "name": "Customer"}}
    }"#;
    let q: QueryExpr = serde_json::from_str(json).unwrap();
    let QueryExpr::Call {
        declaring, method, args, ..
    } = &q
    else {
        panic!("expected call");
    };
    assert_eq!(declaring, &Declaring::Queryable);
    assert_eq!(method, "Where");
    assert_eq!(args.len(), 2);
}

#[test]
fn test_mapped_declaring_json() {
    let d: Declaring = serde_json::from_str(r#"{"mapped":{"function":"fn_Total"}}"#).unwrap();
    assert_eq!(
        d,
        Declaring::Mapped {
            function: "fn_Total".into()
        }
    );
    assert!(!d.is_sequence_operator());
}

#[test]
fn test_record_builder_computes_type() {
    let r = record(vec![("A", int(1)), ("B", string("x"))]);
    assert_eq!(
        r.ty(),
        ValueType::record([("A", ValueType::int32()), ("B", ValueType::string())])
    );
}

#[test]
fn test_describe_member_chain() {
    let e = member(param("c", customer()), "City", ValueType::string());
    assert_eq!(e.describe(), "c.City");
}
