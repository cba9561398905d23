mod common;

use common::{Counter, fresh, func, pass, sum};
use graphwire::value::{Parameter, ParamKind};
use graphwire::{Args, Class, Error, GraphSchema, Rule, Signature, Value};
use pretty_assertions::assert_eq;

#[test]
fn computes_from_other_attributes() {
    let c = GraphSchema::builder("C")
        .rule("foo", Rule::value(sum("foo", &["x", "y"])))
        .value("x", 1)
        .value("y", 2)
        .build()
        .expect("declare");
    assert_eq!(c.get("foo").expect("build").as_i64(), Some(3));
}

#[test]
fn diamond_prerequisite_is_created_once_and_shared() {
    let calls = Counter::default();
    let c = GraphSchema::builder("C")
        .rule(
            "top",
            Rule::value(func("top", &["left", "right"], |args| {
                Ok(Value::from(args.require("left")?.ptr_eq(args.require("right")?)))
            })),
        )
        .rule("left", Rule::value(pass("left", "base")))
        .rule("right", Rule::value(pass("right", "base")))
        .rule("base", Rule::value(fresh("base", &[], &calls)))
        .build()
        .expect("declare");

    assert_eq!(c.get("top").expect("build").as_bool(), Some(true));
    assert_eq!(calls.get(), 1);
}

#[test]
fn separate_builds_do_not_share_results() {
    let calls = Counter::default();
    let c = GraphSchema::builder("C")
        .rule("base", Rule::value(fresh("base", &[], &calls)))
        .build()
        .expect("declare");

    let first = c.get("base").expect("build");
    let second = c.get("base").expect("build");
    assert!(!first.ptr_eq(&second));
    assert_eq!(calls.get(), 2);
}

#[test]
fn optional_parameters_fall_back_to_defaults() {
    let add = |name: &str| {
        graphwire::Callable::new(name, Signature::new().required("x").optional("y", 7), |args: &Args| {
            Ok(Value::from(args.i64("x")? + args.i64("y")?))
        })
    };
    let without = GraphSchema::builder("Without")
        .rule("foo", Rule::value(add("foo")))
        .value("x", 1)
        .build()
        .expect("declare");
    assert_eq!(without.get("foo").expect("build").as_i64(), Some(8));

    let with = GraphSchema::builder("With")
        .rule("foo", Rule::value(add("foo")))
        .value("x", 1)
        .value("y", 2)
        .build()
        .expect("declare");
    assert_eq!(with.get("foo").expect("build").as_i64(), Some(3));
}

#[test]
fn operations_bind_prerequisites_and_run_on_call() {
    let op = graphwire::Callable::new(
        "scale",
        Signature::new().required("factor").optional("n", 1),
        |args: &Args| Ok(Value::from(args.i64("factor")? * args.i64("n")?)),
    );
    let c = GraphSchema::builder("C")
        .rule("scale", Rule::operation(op))
        .value("factor", 10)
        .build()
        .expect("declare");

    let scale = c.get("scale").expect("build");
    let deferred = scale.as_deferred().expect("deferred");
    assert_eq!(deferred.bound().get("factor").and_then(Value::as_i64), Some(10));

    let call = |n: i64| {
        let args: Args = [("n", n)].into_iter().collect();
        scale.call(args).expect("call").as_i64()
    };
    assert_eq!(scale.call(Args::new()).expect("call").as_i64(), Some(10));
    assert_eq!(call(2), Some(20));
    assert_eq!(call(3), Some(30));
}

#[test]
fn missing_attribute_names_its_requester() {
    let c = GraphSchema::builder("C")
        .rule("foo", Rule::value(pass("foo", "bar")))
        .value("bar", 1)
        .build()
        .expect("declare");
    let d = GraphSchema::builder("D")
        .rule("foo", Rule::value(pass("foo", "missing")))
        .build()
        .unwrap_err();

    assert_eq!(c.get("foo").expect("build").as_i64(), Some(1));
    assert_eq!(
        d.to_string(),
        "attribute 'D.missing' doesn't exist (required to build 'D.foo')"
    );
    assert!(matches!(c.get("nope"), Err(Error::UnknownAttribute { .. })));
}

#[test]
fn failing_callables_abort_the_build() {
    let c = GraphSchema::builder("C")
        .rule("foo", Rule::value(pass("foo", "bar")))
        .rule("bar", Rule::value(func("bar", &[], |_| Err("boom".into()))))
        .build()
        .expect("declare");

    let err = c.get("foo").unwrap_err();
    assert_eq!(
        err.to_string(),
        "failed to build 'C.bar': boom (required to build 'C.foo')"
    );
}

#[derive(Debug)]
struct Connection {
    url: String,
}

impl graphwire::Object for Connection {}

fn connection_class() -> Class {
    Class::new("Connection", Signature::new().required("url"), |args: &Args| {
        Ok(Value::object(Connection {
            url: args.str("url")?.to_string(),
        }))
    })
}

#[test]
fn classes_are_instantiated_unless_suffixed() {
    let c = GraphSchema::builder("C")
        .value("connection", connection_class())
        .value("connection_class", connection_class())
        .value("url", "db://local")
        .build()
        .expect("declare");

    let conn = c.get("connection").expect("build");
    assert_eq!(
        conn.downcast_ref::<Connection>().map(|c| c.url.as_str()),
        Some("db://local")
    );
    let class = c.get("connection_class").expect("build");
    assert_eq!(class.as_class().map(Class::name), Some("Connection"));
}

#[test]
fn plain_callables_are_values() {
    let handler = func("handler", &["x"], |args| Ok(Value::from(args.i64("x")? + 1)));
    let c = GraphSchema::builder("C")
        .value("handler", handler)
        .build()
        .expect("declare");

    let value = c.get("handler").expect("build");
    let args: Args = [("x", 1)].into_iter().collect();
    assert_eq!(value.call(args).expect("call").as_i64(), Some(2));
}

#[test]
fn registration_rejects_methods_and_variadics() {
    let method = func("method", &["self", "x"], |_| Ok(Value::from(0)));
    assert!(matches!(Rule::value(method), Err(Error::InvalidDeclaration(_))));

    let variadic = graphwire::Callable::new(
        "variadic",
        Signature::new().with(Parameter::new("rest").kind(ParamKind::VarKeyword)),
        |_: &Args| Ok(Value::from(0)),
    );
    let err = GraphSchema::builder("C")
        .rule("foo", Rule::value(variadic))
        .build()
        .unwrap_err();
    assert!(matches!(err, Error::UnsupportedParameterKind { .. }));
}

#[test]
fn abstract_schemas_are_not_accessible() {
    let base = GraphSchema::builder("Base")
        .abstract_schema()
        .rule("foo", Rule::value(pass("foo", "x")))
        .value("x", 1)
        .build()
        .expect("declare");
    assert!(matches!(base.get("foo"), Err(Error::AbstractSchema { .. })));

    let outer = GraphSchema::builder("Outer")
        .nested("inner", &base)
        .build()
        .expect("declare");
    let inner = outer.get("inner").expect("build");
    let inner = inner.as_graph().expect("graph");
    assert!(matches!(inner.get("foo"), Err(Error::AbstractSchema { .. })));
}

#[test]
fn dynamic_values_need_a_scoped_schema() {
    let err = GraphSchema::builder("Plain")
        .rule("user", Rule::dynamic())
        .build()
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "ordinary graph schemas are not allowed to have dynamic values (user)"
    );
}
