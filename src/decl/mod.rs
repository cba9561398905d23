//! Declaration layer: graphs described in JSON.
//!
//! JSON shape:
//! {
//!   "graphs": [
//!     {
//!       "name": "App",
//!       "extends": ["Base"],            // optional, earlier graphs only
//!       "abstract": false,              // optional
//!       "scoped": false,                // optional
//!       "attrs": {
//!         "port": { "value": 8080 },
//!         "url": { "compute": "concat", "params": ["host", {"name": "sep", "default": ":"}, "port"] },
//!         "ping": { "operation": "concat", "params": ["url"] },
//!         "pool": { "cached": "object", "params": ["url"] },
//!         "db": { "nested": "Db" },      // earlier graphs only
//!         "host": { "ref": "^1.host" },
//!         "user": { "dynamic": true }
//!       }
//!     }
//!   ]
//! }
//!
//! `validate_and_build` checks names and references, then declares each
//! graph in order as a [`GraphSchema`], which also proves it acyclic.

mod functions;
mod path;

pub use functions::{FunctionTable, NamedArgs, TableFn};
pub use path::parse_path;

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{Context, bail};
use serde::Deserialize;

use crate::rule::Rule;
use crate::schema::GraphSchema;
use crate::value::{Callable, Parameter, Signature, Value};

#[derive(Debug, Clone, Deserialize)]
pub struct GraphsSpec {
    #[serde(default)]
    pub graphs: Vec<RawGraph>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawGraph {
    pub name: String,

    #[serde(default)]
    pub extends: Vec<String>,

    #[serde(default, rename = "abstract")]
    pub is_abstract: bool,

    #[serde(default)]
    pub scoped: bool,

    #[serde(default)]
    pub attrs: BTreeMap<String, RuleDecl>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RuleDecl {
    Value {
        value: serde_json::Value,
    },
    Compute {
        compute: String,
        #[serde(default)]
        params: Vec<ParamDecl>,
    },
    Operation {
        operation: String,
        #[serde(default)]
        params: Vec<ParamDecl>,
    },
    Cached {
        cached: String,
        #[serde(default)]
        params: Vec<ParamDecl>,
    },
    Nested {
        nested: String,
    },
    Reference {
        #[serde(rename = "ref")]
        reference: String,
    },
    Dynamic {
        dynamic: bool,
    },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ParamDecl {
    // "name"
    Required(String),
    // { "name": "...", "default": ... }
    Optional {
        name: String,
        default: serde_json::Value,
    },
}

/// Graphs declared from a document, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct Declared {
    order: Vec<String>,
    schemas: BTreeMap<String, GraphSchema>,
}

impl Declared {
    pub fn get(&self, name: &str) -> Option<&GraphSchema> {
        self.schemas.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &GraphSchema> {
        self.order.iter().filter_map(|n| self.schemas.get(n))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Split `Graph.attr[.attr...]` into the graph and its attribute chain.
    pub fn resolve_target<'a>(&self, target: &'a str) -> anyhow::Result<(&GraphSchema, Vec<&'a str>)> {
        let mut parts = target.split('.');
        let graph = parts.next().unwrap_or_default();
        let schema = match self.schemas.get(graph) {
            Some(s) => s,
            None => bail!("unknown graph in target '{}': {}", target, graph),
        };
        let attrs: Vec<&str> = parts.collect();
        if attrs.is_empty() || attrs.iter().any(|a| a.is_empty()) {
            bail!("target '{}' must look like Graph.attr[.attr...]", target);
        }
        Ok((schema, attrs))
    }
}

impl GraphsSpec {
    pub fn from_path(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("failed to parse {}", path.display()))
    }

    /// Validate the document and declare every graph:
    /// - unique graph names
    /// - `extends` and `nested` only name earlier graphs
    /// - function names exist in `functions`
    /// - every schema is consistent and acyclic
    pub fn validate_and_build(&self, functions: &FunctionTable) -> anyhow::Result<Declared> {
        // 1) Unique names.
        let mut seen = BTreeMap::new();
        for (i, g) in self.graphs.iter().enumerate() {
            if seen.insert(g.name.as_str(), i).is_some() {
                bail!("duplicate graph name in declaration: {}", g.name);
            }
        }
        if self.graphs.is_empty() {
            bail!("declaration contained no graphs");
        }

        // 2) Declare in order, so references only see earlier graphs.
        let mut declared = Declared::default();
        for g in &self.graphs {
            let mut builder = GraphSchema::builder(g.name.clone());
            for parent in &g.extends {
                match declared.get(parent) {
                    Some(p) => builder = builder.extends(p),
                    None => bail!(
                        "graph '{}' extends '{}', which is not declared before it",
                        g.name,
                        parent
                    ),
                }
            }
            if g.is_abstract {
                builder = builder.abstract_schema();
            }
            if g.scoped {
                builder = builder.scoped();
            }

            for (attr, decl) in &g.attrs {
                let rule = build_rule(decl, &declared, functions)
                    .with_context(|| format!("invalid rule '{}.{}'", g.name, attr))?;
                builder = builder.rule(attr.clone(), rule);
            }

            let schema = builder
                .build()
                .with_context(|| format!("graph '{}' is invalid", g.name))?;
            declared.order.push(g.name.clone());
            declared.schemas.insert(g.name.clone(), schema);
        }

        Ok(declared)
    }
}

fn build_rule(decl: &RuleDecl, declared: &Declared, functions: &FunctionTable) -> anyhow::Result<Rule> {
    let rule = match decl {
        RuleDecl::Value { value } => Rule::leaf(value.clone()),
        RuleDecl::Compute { compute, params } => Rule::value(table_callable(compute, params, functions)?)?,
        RuleDecl::Operation { operation, params } => {
            Rule::operation(table_callable(operation, params, functions)?)?
        }
        RuleDecl::Cached { cached, params } => Rule::cached(table_callable(cached, params, functions)?)?,
        RuleDecl::Nested { nested } => match declared.get(nested) {
            Some(schema) => Rule::nested(schema),
            None => bail!("nested graph '{}' is not declared before it", nested),
        },
        RuleDecl::Reference { reference } => Rule::reference(parse_path(reference)?)?,
        RuleDecl::Dynamic { dynamic: true } => Rule::dynamic(),
        RuleDecl::Dynamic { dynamic: false } => bail!("'dynamic' can only be true"),
    };
    Ok(rule)
}

/// Wrap a table function into a callable with the declared parameters.
fn table_callable(name: &str, params: &[ParamDecl], functions: &FunctionTable) -> anyhow::Result<Callable> {
    let Some(f) = functions.get(name) else {
        let known: Vec<&str> = functions.names().collect();
        bail!("unknown function '{}' (known: {})", name, known.join(", "));
    };

    let mut signature = Signature::new();
    let mut order = Vec::new();
    for p in params {
        let param = match p {
            ParamDecl::Required(n) => Parameter::new(n.clone()),
            ParamDecl::Optional { name, default } => Parameter::new(name.clone()).default(default.clone()),
        };
        order.push(param.name().to_string());
        signature = signature.with(param);
    }

    let order: Arc<[String]> = order.into();
    Ok(Callable::new(name, signature, move |args| {
        let named: Vec<(String, Value)> = order
            .iter()
            .filter_map(|n| args.get(n).map(|v| (n.clone(), v.clone())))
            .collect();
        f(named.as_slice())
    }))
}
