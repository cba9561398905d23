mod common;

use common::{pass, sum};
use graphwire::{Error, GraphSchema, Rule};
use pretty_assertions::assert_eq;

#[test]
fn derived_schema_redefines_an_input() {
    let base = GraphSchema::builder("C")
        .rule("foo", Rule::value(sum("foo", &["x", "y"])))
        .value("x", 1)
        .value("y", 2)
        .build()
        .expect("declare");
    let derived = GraphSchema::builder("D")
        .extends(&base)
        .value("y", 5)
        .build()
        .expect("declare");

    assert_eq!(derived.get("foo").expect("build").as_i64(), Some(6));
    assert_eq!(base.get("foo").expect("build").as_i64(), Some(3));
}

fn leaf_schema(name: &str, attrs: &[&str], parents: &[&GraphSchema]) -> GraphSchema {
    let mut builder = GraphSchema::builder(name);
    for p in parents {
        builder = builder.extends(p);
    }
    for a in attrs {
        builder = builder.value(*a, name);
    }
    builder.build().expect("declare")
}

#[test]
fn multiple_inheritance_follows_the_linearization() {
    // A(B, C), B(D, E), C(D, F): resolution order A, B, C, D, E, F.
    let f = leaf_schema("F", &["a", "b", "c", "d", "e"], &[]);
    let e = leaf_schema("E", &["a", "b", "c", "d"], &[]);
    let d = leaf_schema("D", &["a", "b", "c"], &[]);
    let c = leaf_schema("C", &["a", "b"], &[&d, &f]);
    let b = leaf_schema("B", &["a"], &[&d, &e]);
    let a = leaf_schema("A", &[], &[&b, &c]);

    let order: Vec<String> = a.linearization().iter().map(|s| s.name().to_string()).collect();
    assert_eq!(order, vec!["A", "B", "C", "D", "E", "F"]);

    let seen: Vec<String> = ["a", "b", "c", "d", "e"]
        .iter()
        .map(|attr| a.get(attr).expect("build").as_str().unwrap_or_default().to_string())
        .collect();
    assert_eq!(seen, vec!["B", "C", "D", "E", "F"]);
}

#[test]
fn inconsistent_parent_order_is_rejected() {
    let x = leaf_schema("X", &[], &[]);
    let y = leaf_schema("Y", &[], &[]);
    let xy = leaf_schema("XY", &[], &[&x, &y]);
    let yx = leaf_schema("YX", &[], &[&y, &x]);
    let err = GraphSchema::builder("Bad")
        .extends(&xy)
        .extends(&yx)
        .build()
        .unwrap_err();
    assert!(matches!(err, Error::InvalidDeclaration(_)));
}

#[test]
fn abstract_bases_may_be_incomplete() {
    let base = GraphSchema::builder("Base")
        .abstract_schema()
        .rule("foo", Rule::value(pass("foo", "x")))
        .build()
        .expect("abstract schemas skip validation");
    assert!(matches!(base.get("foo"), Err(Error::AbstractSchema { .. })));

    let concrete = GraphSchema::builder("Concrete")
        .extends(&base)
        .value("x", 3)
        .build()
        .expect("declare");
    assert_eq!(concrete.get("foo").expect("build").as_i64(), Some(3));

    let incomplete = GraphSchema::builder("Incomplete").extends(&base).build().unwrap_err();
    assert!(matches!(incomplete, Error::UnknownAttribute { .. }));
}
