mod common;

use common::{Captured, Counter, fresh, func};
use graphwire::{Args, Error, GraphSchema, Path, Rule, Signature, Value, begin_scope};
use pretty_assertions::assert_eq;

fn pool(counter: &Counter) -> graphwire::Callable {
    let counter = counter.clone();
    graphwire::Callable::new(
        "pool",
        Signature::new().required("settings").required("size"),
        move |args: &Args| {
            let n = counter.bump();
            Ok(Value::json(serde_json::json!({
                "instance": n,
                "size": args.i64("size")?,
            })))
        },
    )
}

#[test]
fn unscoped_cached_values_are_process_wide_singletons() {
    let calls = Counter::default();
    let c = GraphSchema::builder("C")
        .rule("pool", Rule::cached(pool(&calls)))
        .value("settings", "s")
        .value("size", 4)
        .build()
        .expect("declare");

    let first = c.get("pool").expect("build");
    let second = c.get("pool").expect("build");
    assert!(first.ptr_eq(&second));
    assert_eq!(calls.get(), 1);
}

#[test]
fn changed_parameters_warn_and_return_the_stale_value() {
    let calls = Counter::default();
    let settings_calls = Counter::default();
    let c = GraphSchema::builder("C")
        .rule("pool", Rule::cached(pool(&calls)))
        // Rebuilt on every request, so its identity changes.
        .rule("settings", Rule::value(fresh("settings", &[], &settings_calls)))
        .value("size", 4)
        .build()
        .expect("declare");

    let logs = Captured::default();
    let sink = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || sink.clone())
        .with_ansi(false)
        .finish();

    let (first, second) = tracing::subscriber::with_default(subscriber, || {
        (c.get("pool").expect("build"), c.get("pool").expect("build"))
    });

    assert!(first.ptr_eq(&second));
    assert_eq!(calls.get(), 1);
    assert_eq!(settings_calls.get(), 2);

    let text = logs.text();
    assert_eq!(text.matches("have changed since the first invocation").count(), 1);
    assert!(
        text.contains(
            "'C.pool' was requested to be built, but some of the dependencies values ('settings') have changed"
        ),
        "unexpected log output: {}",
        text
    );
}

#[test]
fn values_reached_through_a_leaf_do_not_look_stale() {
    let calls = Counter::default();
    let counter = calls.clone();
    let c = GraphSchema::builder("C")
        .value("settings", serde_json::json!({ "db": { "url": "pg://local" } }))
        .rule("db", Rule::reference(Path::this().attr("settings").index("db")))
        .rule(
            "pool",
            Rule::cached(func("pool", &["db"], move |args| {
                counter.bump();
                Ok(args.require("db")?.clone())
            })),
        )
        .build()
        .expect("declare");

    let logs = Captured::default();
    let sink = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || sink.clone())
        .with_ansi(false)
        .finish();

    let (first, second, db) = tracing::subscriber::with_default(subscriber, || {
        (
            c.get("pool").expect("build"),
            c.get("pool").expect("build"),
            c.get("db").expect("build"),
        )
    });

    assert!(first.ptr_eq(&second));
    assert!(db.ptr_eq(&first));
    assert_eq!(calls.get(), 1);
    assert_eq!(logs.text(), "");
}

#[test]
fn scoped_cached_values_live_as_long_as_the_scope() {
    let calls = Counter::default();
    let counter = calls.clone();
    let s = GraphSchema::builder("Request")
        .scoped()
        .rule("user", Rule::dynamic())
        .rule(
            "profile",
            Rule::cached(func("profile", &["user"], move |args| {
                counter.bump();
                Ok(Value::from(format!("profile of {}", args.str("user")?)))
            })),
        )
        .build()
        .expect("declare");

    assert!(matches!(s.get("profile"), Err(Error::DynamicValueUnset { .. })));

    let first = {
        let _guard = begin_scope(&s, [("user", "alice")]).expect("begin").enter().expect("start");
        let a = s.get("profile").expect("build");
        let b = s.get("profile").expect("build");
        assert!(a.ptr_eq(&b));
        a
    };
    assert_eq!(calls.get(), 1);

    let _guard = begin_scope(&s, [("user", "bob")]).expect("begin").enter().expect("start");
    let second = s.get("profile").expect("build");
    assert!(!first.ptr_eq(&second));
    assert_eq!(second.as_str(), Some("profile of bob"));
    assert_eq!(calls.get(), 2);
}
