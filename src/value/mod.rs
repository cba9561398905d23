//! Dynamic values flowing through the builder.
//!
//! A [`Value`] is a cheap handle: clones share one allocation and therefore
//! one identity. The builder hands the same handle to every consumer of a
//! dependency within a build, and the cached rule compares identities (not
//! equality) of its parameters between invocations.
//!
//! JSON arrays and objects are split into nested values once, when wrapped,
//! so reaching into them by attribute or index returns the same handle every
//! time.

mod callable;

pub use callable::{Args, Callable, Class, Deferred, ParamKind, Parameter, Signature};

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::error::BoxError;
use crate::schema::{GraphInstance, GraphSchema};

/// Key for index access inside a path expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Int(i64),
    Str(String),
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Int(i) => write!(f, "{}", i),
            Key::Str(s) => write!(f, "{:?}", s),
        }
    }
}

impl From<i64> for Key {
    fn from(i: i64) -> Self {
        Key::Int(i)
    }
}

impl From<i32> for Key {
    fn from(i: i32) -> Self {
        Key::Int(i64::from(i))
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::Str(s.to_string())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key::Str(s)
    }
}

/// Upcast helper so [`Value::downcast_ref`] can reach the concrete type.
pub trait AsAny {
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// User-defined values that path expressions can look into.
pub trait Object: AsAny + Send + Sync + fmt::Debug + 'static {
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Attribute access (`.name` in a path).
    fn attr(&self, _name: &str) -> Option<Value> {
        None
    }

    /// Index access (`[key]` in a path).
    fn index(&self, _key: &Key) -> Option<Value> {
        None
    }
}

pub enum Data {
    /// A JSON scalar: null, bool, number or string.
    Json(serde_json::Value),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Graph(GraphInstance),
    /// A schema handed out as a value; registered as a nested graph.
    Schema(GraphSchema),
    Class(Class),
    Callable(Callable),
    Deferred(Deferred),
    Object(Box<dyn Object>),
}

#[derive(Clone)]
pub struct Value(Arc<Data>);

impl Value {
    pub fn new(data: Data) -> Self {
        Self(Arc::new(data))
    }

    pub fn json(value: impl Into<serde_json::Value>) -> Self {
        let data = match value.into() {
            serde_json::Value::Array(items) => Data::List(items.into_iter().map(Value::json).collect()),
            serde_json::Value::Object(map) => {
                Data::Map(map.into_iter().map(|(k, v)| (k, Value::json(v))).collect())
            }
            scalar => Data::Json(scalar),
        };
        Self::new(data)
    }

    pub fn schema(schema: &GraphSchema) -> Self {
        Self::new(Data::Schema(schema.clone()))
    }

    pub fn object<T: Object>(object: T) -> Self {
        Self::new(Data::Object(Box::new(object)))
    }

    pub(crate) fn graph(instance: GraphInstance) -> Self {
        Self::new(Data::Graph(instance))
    }

    pub fn data(&self) -> &Data {
        &self.0
    }

    /// Address of the shared allocation. Equal for clones of one value only.
    pub fn identity(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }

    pub fn ptr_eq(&self, other: &Value) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// The JSON scalar, if this is one.
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self.data() {
            Data::Json(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.as_json().and_then(serde_json::Value::as_i64)
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.as_json().and_then(serde_json::Value::as_f64)
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_json().and_then(serde_json::Value::as_str)
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.as_json().and_then(serde_json::Value::as_bool)
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self.data() {
            Data::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self.data() {
            Data::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_schema(&self) -> Option<&GraphSchema> {
        match self.data() {
            Data::Schema(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_graph(&self) -> Option<&GraphInstance> {
        match self.data() {
            Data::Graph(g) => Some(g),
            _ => None,
        }
    }

    pub fn as_class(&self) -> Option<&Class> {
        match self.data() {
            Data::Class(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_callable(&self) -> Option<&Callable> {
        match self.data() {
            Data::Callable(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_deferred(&self) -> Option<&Deferred> {
        match self.data() {
            Data::Deferred(d) => Some(d),
            _ => None,
        }
    }

    pub fn is_class(&self) -> bool {
        matches!(self.data(), Data::Class(_))
    }

    pub fn downcast_ref<T: Object>(&self) -> Option<&T> {
        match self.data() {
            Data::Object(obj) => {
                let obj: &dyn Object = obj.as_ref();
                obj.as_any().downcast_ref::<T>()
            }
            _ => None,
        }
    }

    /// Short type description used in error messages.
    pub fn type_name(&self) -> String {
        match self.data() {
            Data::Json(v) => match v {
                serde_json::Value::Null => "null",
                serde_json::Value::Bool(_) => "bool",
                serde_json::Value::Number(_) => "number",
                serde_json::Value::String(_) => "string",
                serde_json::Value::Array(_) => "array",
                serde_json::Value::Object(_) => "object",
            }
            .to_string(),
            Data::List(_) => "array".to_string(),
            Data::Map(_) => "object".to_string(),
            Data::Graph(g) => format!("graph '{}'", g.schema().name()),
            Data::Schema(s) => format!("schema '{}'", s.name()),
            Data::Class(c) => format!("class '{}'", c.name()),
            Data::Callable(c) => format!("callable '{}'", c.name()),
            Data::Deferred(d) => format!("deferred '{}'", d.name()),
            Data::Object(o) => o.type_name().to_string(),
        }
    }

    /// Attribute access on a built value. Graph instances are handled by the
    /// cross-reference cursor, not here.
    pub fn attr(&self, name: &str) -> Option<Value> {
        match self.data() {
            Data::Map(map) => map.get(name).cloned(),
            Data::Object(obj) => obj.attr(name),
            _ => None,
        }
    }

    /// Index access on a built value. Negative integers count from the end.
    pub fn index(&self, key: &Key) -> Option<Value> {
        match (self.data(), key) {
            (Data::List(items), Key::Int(i)) => {
                let len = items.len() as i64;
                let at = if *i < 0 { len + i } else { *i };
                if at < 0 || at >= len {
                    return None;
                }
                items.get(at as usize).cloned()
            }
            (Data::Map(map), Key::Str(s)) => map.get(s).cloned(),
            (Data::Object(obj), key) => obj.index(key),
            _ => None,
        }
    }

    /// Invoke a callable, deferred operation or class.
    pub fn call(&self, args: Args) -> Result<Value, BoxError> {
        match self.data() {
            Data::Callable(c) => c.call(args),
            Data::Deferred(d) => d.call(args),
            Data::Class(c) => c.instantiate(args),
            _ => Err(format!("'{}' value is not callable", self.type_name()).into()),
        }
    }

    /// JSON rendering for plain data and graph handles.
    pub fn to_json(&self) -> Option<serde_json::Value> {
        match self.data() {
            Data::Json(v) => Some(v.clone()),
            Data::List(items) => items
                .iter()
                .map(Value::to_json)
                .collect::<Option<Vec<_>>>()
                .map(serde_json::Value::Array),
            Data::Map(map) => map
                .iter()
                .map(|(k, v)| v.to_json().map(|v| (k.clone(), v)))
                .collect::<Option<serde_json::Map<_, _>>>()
                .map(serde_json::Value::Object),
            Data::Graph(g) => Some(serde_json::json!({ "graph": g.schema().name() })),
            _ => None,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.data() {
            Data::Json(v) => write!(f, "{}", v),
            Data::List(items) => f.debug_list().entries(items).finish(),
            Data::Map(map) => f.debug_map().entries(map).finish(),
            Data::Graph(g) => write!(f, "{:?}", g),
            Data::Schema(s) => write!(f, "{:?}", s),
            Data::Class(c) => write!(f, "{:?}", c),
            Data::Callable(c) => write!(f, "{:?}", c),
            Data::Deferred(d) => write!(f, "{:?}", d),
            Data::Object(o) => write!(f, "{:?}", o),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Value::json(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::json(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::json(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::json(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::json(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::json(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::json(v)
    }
}

impl From<Callable> for Value {
    fn from(c: Callable) -> Self {
        Value::new(Data::Callable(c))
    }
}

impl From<Class> for Value {
    fn from(c: Class) -> Self {
        Value::new(Data::Class(c))
    }
}

impl From<Deferred> for Value {
    fn from(d: Deferred) -> Self {
        Value::new(Data::Deferred(d))
    }
}

impl From<&GraphSchema> for Value {
    fn from(schema: &GraphSchema) -> Self {
        Value::schema(schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug)]
    struct Point {
        x: i64,
    }

    impl Object for Point {
        fn attr(&self, name: &str) -> Option<Value> {
            (name == "x").then(|| Value::from(self.x))
        }
    }

    #[test]
    fn clones_share_identity() {
        let a = Value::from(1);
        let b = a.clone();
        let c = Value::from(1);
        assert!(a.ptr_eq(&b));
        assert_eq!(a.identity(), b.identity());
        assert!(!a.ptr_eq(&c));
    }

    #[test]
    fn index_and_attr_on_json() {
        let v = Value::json(json!({"items": [1, 2, 3], "name": "n"}));
        let items = v.attr("items").expect("items");
        assert_eq!(items.index(&Key::Int(0)).and_then(|v| v.as_i64()), Some(1));
        assert_eq!(items.index(&Key::Int(-1)).and_then(|v| v.as_i64()), Some(3));
        assert!(items.index(&Key::Int(3)).is_none());
        assert_eq!(v.index(&Key::from("name")).as_ref().and_then(Value::as_str), Some("n"));
    }

    #[test]
    fn nested_json_keeps_its_identity() {
        let v = Value::json(json!({"db": {"url": "pg://"}, "hosts": ["a", "b"]}));
        let db = v.attr("db").expect("db");
        assert!(db.ptr_eq(&v.index(&Key::from("db")).expect("db")));
        let host = v.attr("hosts").and_then(|h| h.index(&Key::Int(1))).expect("host");
        assert!(host.ptr_eq(&v.attr("hosts").and_then(|h| h.index(&Key::Int(-1))).expect("host")));
        assert_eq!(v.to_json(), Some(json!({"db": {"url": "pg://"}, "hosts": ["a", "b"]})));
        assert_eq!(db.type_name(), "object");
    }

    #[test]
    fn objects_downcast_and_expose_attributes() {
        let v = Value::object(Point { x: 4 });
        assert_eq!(v.downcast_ref::<Point>().map(|p| p.x), Some(4));
        assert_eq!(v.attr("x").and_then(|x| x.as_i64()), Some(4));
        assert!(v.attr("y").is_none());
    }
}
