//! Named functions that declarations can compute with.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{Map, Value as Json};

use crate::error::BoxError;
use crate::value::Value;

/// Arguments in declared parameter order.
pub type NamedArgs = [(String, Value)];

pub type TableFn = dyn Fn(&NamedArgs) -> Result<Value, BoxError> + Send + Sync;

#[derive(Clone)]
pub struct FunctionTable {
    functions: BTreeMap<String, Arc<TableFn>>,
}

impl Default for FunctionTable {
    /// Table with the built-ins `sum`, `concat`, `list` and `object`.
    fn default() -> Self {
        let mut table = Self::empty();
        table.register("sum", sum);
        table.register("concat", concat);
        table.register("list", |args: &NamedArgs| {
            let items = args
                .iter()
                .map(|(name, v)| json_of(name, v))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Value::json(Json::Array(items)))
        });
        table.register("object", |args: &NamedArgs| {
            let mut map = Map::new();
            for (name, v) in args {
                map.insert(name.clone(), json_of(name, v)?);
            }
            Ok(Value::json(Json::Object(map)))
        });
        table
    }
}

impl FunctionTable {
    pub fn empty() -> Self {
        Self {
            functions: BTreeMap::new(),
        }
    }

    pub fn register<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(&NamedArgs) -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        self.functions.insert(name.into(), Arc::new(f));
    }

    pub fn get(&self, name: &str) -> Option<Arc<TableFn>> {
        self.functions.get(name).cloned()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }
}

fn json_of(name: &str, v: &Value) -> Result<Json, BoxError> {
    v.to_json()
        .ok_or_else(|| format!("argument '{}' ({}) has no JSON form", name, v.type_name()).into())
}

fn sum(args: &NamedArgs) -> Result<Value, BoxError> {
    if let Some(ints) = args.iter().map(|(_, v)| v.as_i64()).collect::<Option<Vec<_>>>() {
        return Ok(Value::from(ints.iter().sum::<i64>()));
    }
    let mut total = 0.0;
    for (name, v) in args {
        total += v
            .as_f64()
            .ok_or_else(|| format!("argument '{}' is not a number", name))?;
    }
    Ok(Value::from(total))
}

fn concat(args: &NamedArgs) -> Result<Value, BoxError> {
    let mut out = String::new();
    for (name, v) in args {
        match v.as_str() {
            Some(s) => out.push_str(s),
            None => out.push_str(&json_of(name, v)?.to_string()),
        }
    }
    Ok(Value::from(out))
}
