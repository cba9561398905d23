use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::error::BoxError;
use crate::value::Value;

type Function = dyn Fn(&Args) -> Result<Value, BoxError> + Send + Sync;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    PositionalOnly,
    PositionalOrKeyword,
    VarPositional,
    KeywordOnly,
    VarKeyword,
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ParamKind::PositionalOnly => "positional-only",
            ParamKind::PositionalOrKeyword => "positional-or-keyword",
            ParamKind::VarPositional => "variadic positional",
            ParamKind::KeywordOnly => "keyword-only",
            ParamKind::VarKeyword => "variadic keyword",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone)]
pub struct Parameter {
    name: String,
    kind: ParamKind,
    default: Option<Value>,
}

impl Parameter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ParamKind::PositionalOrKeyword,
            default: None,
        }
    }

    pub fn kind(mut self, kind: ParamKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn param_kind(&self) -> ParamKind {
        self.kind
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }
}

/// Declared parameters of a callable or class constructor, in order.
#[derive(Debug, Clone, Default)]
pub struct Signature {
    params: Vec<Parameter>,
}

impl Signature {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required(self, name: impl Into<String>) -> Self {
        self.with(Parameter::new(name))
    }

    pub fn optional(self, name: impl Into<String>, default: impl Into<Value>) -> Self {
        self.with(Parameter::new(name).default(default))
    }

    pub fn with(mut self, param: Parameter) -> Self {
        self.params.push(param);
        self
    }

    pub fn params(&self) -> &[Parameter] {
        &self.params
    }

    fn fill_defaults(&self, args: &mut Args) {
        for p in &self.params {
            if let Some(default) = &p.default {
                if !args.contains(&p.name) {
                    args.insert(p.name.clone(), default.clone());
                }
            }
        }
    }
}

/// Keyword arguments handed to a callable.
#[derive(Debug, Clone, Default)]
pub struct Args(BTreeMap<String, Value>);

impl Args {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn require(&self, name: &str) -> Result<&Value, BoxError> {
        self.get(name)
            .ok_or_else(|| format!("missing argument '{}'", name).into())
    }

    pub fn i64(&self, name: &str) -> Result<i64, BoxError> {
        self.require(name)?
            .as_i64()
            .ok_or_else(|| format!("argument '{}' is not an integer", name).into())
    }

    pub fn str(&self, name: &str) -> Result<&str, BoxError> {
        self.require(name)?
            .as_str()
            .ok_or_else(|| format!("argument '{}' is not a string", name).into())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn extend(&mut self, other: Args) {
        self.0.extend(other.0);
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Args {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// A named function with a declared signature.
#[derive(Clone)]
pub struct Callable {
    name: Arc<str>,
    signature: Signature,
    func: Arc<Function>,
}

impl Callable {
    pub fn new<F>(name: impl Into<Arc<str>>, signature: Signature, func: F) -> Self
    where
        F: Fn(&Args) -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            signature,
            func: Arc::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Invoke with keyword arguments; absent optional parameters get their defaults.
    pub fn call(&self, mut args: Args) -> Result<Value, BoxError> {
        self.signature.fill_defaults(&mut args);
        (self.func)(&args)
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Callable({})", self.name)
    }
}

/// A constructible type. Registered under a plain name it is instantiated on
/// build; under a `_class`-suffixed name the class itself is the value.
#[derive(Clone)]
pub struct Class {
    name: Arc<str>,
    signature: Signature,
    construct: Arc<Function>,
}

impl Class {
    pub fn new<F>(name: impl Into<Arc<str>>, signature: Signature, construct: F) -> Self
    where
        F: Fn(&Args) -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            signature,
            construct: Arc::new(construct),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn instantiate(&self, mut args: Args) -> Result<Value, BoxError> {
        self.signature.fill_defaults(&mut args);
        (self.construct)(&args)
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Class({})", self.name)
    }
}

/// A callable with some arguments already bound; produced by operation rules.
#[derive(Clone)]
pub struct Deferred {
    callable: Callable,
    bound: Args,
}

impl Deferred {
    pub fn new(callable: Callable, bound: Args) -> Self {
        Self { callable, bound }
    }

    pub fn name(&self) -> &str {
        self.callable.name()
    }

    pub fn bound(&self) -> &Args {
        &self.bound
    }

    /// Call with the bound arguments plus `extra`; `extra` wins on conflicts.
    pub fn call(&self, extra: Args) -> Result<Value, BoxError> {
        let mut args = self.bound.clone();
        args.extend(extra);
        self.callable.call(args)
    }
}

impl fmt::Debug for Deferred {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Deferred({})", self.callable.name())
    }
}
