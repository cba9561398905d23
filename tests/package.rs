mod common;

use std::collections::HashMap;
use std::sync::Arc;

use common::{Counter, func};
use graphwire::{Args, Class, Error, GraphSchema, ModuleProvider, Object, Path, Rule, Signature, Value};
use pretty_assertions::assert_eq;

#[derive(Debug)]
struct Module {
    attrs: HashMap<String, Value>,
}

impl Object for Module {
    fn attr(&self, name: &str) -> Option<Value> {
        self.attrs.get(name).cloned()
    }
}

struct Modules {
    loads: Counter,
    modules: HashMap<String, Value>,
}

impl ModuleProvider for Modules {
    fn load(&self, path: &str) -> Option<Value> {
        self.loads.bump();
        self.modules.get(path).cloned()
    }
}

#[derive(Debug)]
struct Client {
    port: i64,
}

impl Object for Client {}

fn provider(loads: &Counter) -> Arc<dyn ModuleProvider> {
    let client = Class::new("Client", Signature::new().required("port"), |args: &Args| {
        Ok(Value::object(Client { port: args.i64("port")? }))
    });
    let config = Value::object(Module {
        attrs: HashMap::from([
            ("port".to_string(), Value::from(8080)),
            ("settings".to_string(), Value::json(serde_json::json!({ "debug": true }))),
            ("Client".to_string(), Value::from(client)),
            (
                "make_name".to_string(),
                Value::from(func("make_name", &["port"], |args| {
                    Ok(Value::from(format!("svc-{}", args.i64("port")?)))
                })),
            ),
        ]),
    });
    let app = Value::object(Module { attrs: HashMap::new() });
    Arc::new(Modules {
        loads: loads.clone(),
        modules: HashMap::from([("app".to_string(), app), ("app.config".to_string(), config)]),
    })
}

#[test]
fn packages_load_on_first_build() {
    let loads = Counter::default();
    let modules = provider(&loads);
    let c = GraphSchema::builder("C")
        .rule("port", Rule::package(modules.clone(), "app.config.port"))
        .rule("debug", Rule::package(modules, "app.config.settings.debug"))
        .build()
        .expect("declare");
    assert_eq!(loads.get(), 0);

    assert_eq!(c.get("port").expect("build").as_i64(), Some(8080));
    let after_first = loads.get();
    assert_eq!(c.get("port").expect("build").as_i64(), Some(8080));
    assert_eq!(loads.get(), after_first);

    assert_eq!(c.get("debug").expect("build").as_bool(), Some(true));
}

#[test]
fn package_classes_and_functions_become_rules() {
    let loads = Counter::default();
    let modules = provider(&loads);
    let c = GraphSchema::builder("C")
        .rule("client", Rule::package(modules.clone(), "app.config.Client"))
        .rule("name", Rule::package(modules, "app.config.make_name"))
        .value("port", 9000)
        .build()
        .expect("declare");

    let client = c.get("client").expect("build");
    assert_eq!(client.downcast_ref::<Client>().map(|c| c.port), Some(9000));

    let name = c.get("name").expect("build");
    assert_eq!(name.as_callable().map(|f| f.name()), Some("make_name"));
    let args: Args = [("port", 9000)].into_iter().collect();
    assert_eq!(name.call(args).expect("call").as_str(), Some("svc-9000"));
}

#[test]
fn package_schemas_become_nested_graphs() {
    let database = GraphSchema::builder("Database")
        .rule("url", Rule::reference(Path::this().parent(1).attr("dsn")))
        .build()
        .expect("declare");
    let modules: Arc<dyn ModuleProvider> = Arc::new(Modules {
        loads: Counter::default(),
        modules: HashMap::from([(
            "db".to_string(),
            Value::object(Module {
                attrs: HashMap::from([("Database".to_string(), Value::from(&database))]),
            }),
        )]),
    });

    let app = GraphSchema::builder("App")
        .rule("db", Rule::package(modules, "db.Database"))
        .value("dsn", "pg://local")
        .build()
        .expect("declare");

    let db = app.get("db").expect("build");
    let db = db.as_graph().expect("graph");
    assert_eq!(db.schema().name(), "Database");
    assert_eq!(db.get("url").expect("build").as_str(), Some("pg://local"));
}

#[test]
fn missing_modules_fail_at_first_use() {
    let loads = Counter::default();
    let c = GraphSchema::builder("C")
        .rule("gone", Rule::package(provider(&loads), "nowhere.value"))
        .rule("typo", Rule::package(provider(&loads), "app.config.prot"))
        .build()
        .expect("declare");

    let err = c.get("gone").unwrap_err();
    assert!(matches!(err, Error::Provider { .. }));
    assert!(err.to_string().contains("no module named 'nowhere'"), "{}", err);

    let err = c.get("typo").unwrap_err();
    assert!(err.to_string().contains("has no attribute 'prot'"), "{}", err);
}
