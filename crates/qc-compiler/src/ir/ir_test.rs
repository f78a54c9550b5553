use super::*;
use qc_core::ScalarKind;

fn table(ir: &mut Ir) -> NodeId {
    ir.add(
        NodeKind::Table {
            row_type: TypeName::new("Customer"),
            name: "dbo.Customers".to_string(),
            columns: vec![],
        },
        ValueType::sequence(ValueType::entity("Customer")),
    )
}

#[test]
fn test_children_exclude_back_references() {
    let mut ir = Ir::new();
    let t = table(&mut ir);
    let a = ir.alias(t);
    let r = ir.alias_ref(a);
    assert!(ir.children(r).is_empty());
    assert_eq!(ir.children(a), vec![t]);
}

#[test]
fn test_select_children_order() {
    let mut ir = Ir::new();
    let t = table(&mut ir);
    let a = ir.alias(t);
    let r = ir.alias_ref(a);
    let sel = ir.new_select(r, Some(a));
    let w = ir.bool_lit(true);
    ir.select_mut(sel).unwrap().where_ = Some(w);
    assert_eq!(ir.children(sel), vec![a, r, w]);
    assert_eq!(ir.ty(sel), &ValueType::entity("Customer"));
}

#[test]
fn test_alias_owner_map_covers_union_legs() {
    let mut ir = Ir::new();
    let x = ir.int_lit(1);
    let left = ir.new_select(x, None);
    let y = ir.int_lit(2);
    let right = ir.new_select(y, None);
    let u = ir.add(
        NodeKind::Union {
            left,
            right,
            all: false,
        },
        ValueType::int32(),
    );
    let a = ir.alias(u);
    let map = ir.alias_owner_map(a);
    assert_eq!(map.get(&u), Some(&a));
    assert_eq!(map.get(&left), Some(&a));
    assert_eq!(map.get(&right), None);
}

#[test]
fn test_map_children_rewrites_slots() {
    let mut ir = Ir::new();
    let l = ir.int_lit(1);
    let r = ir.int_lit(2);
    let add = ir.binary(BinaryOp::Add, l, r);
    let three = ir.int_lit(3);
    ir.map_children::<()>(add, |_, kid| Ok(if kid == r { three } else { kid }))
        .unwrap();
    assert_eq!(ir.children(add), vec![l, three]);
}

#[test]
fn test_replace_refs() {
    let mut ir = Ir::new();
    let x = ir.int_lit(1);
    let c1 = ir.column(Some("X".into()), x);
    let c2 = ir.column(Some("Y".into()), x);
    let r = ir.column_ref(c1);
    let not_null = ir.unary(UnaryOp::IsNotNull, r);
    ir.replace_refs(not_null, c1, c2);
    assert_eq!(ir.column_of(r), Some(c2));
    assert_eq!(
        ir.ty(not_null),
        &ValueType::Scalar {
            kind: ScalarKind::Bool,
            nullable: false
        }
    );
}
