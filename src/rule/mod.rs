//! Production rules: the strategies that turn one attribute into a value.
//!
//! Every rule works in two steps. `prepare` looks at the values already built
//! in the current build and reports the prerequisites still missing, plus a
//! creation context. Once nothing is missing, `create` consumes that context
//! and produces the value.

mod cached;
mod computed;
mod package;
mod path;

pub use cached::Cached;
pub use computed::Computed;
pub use package::{ModuleProvider, Package};
pub use path::{Path, PathCursor, Step};

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::dependency::Dependency;
use crate::error::Error;
use crate::introspect::{self, CLASS_SUFFIX};
use crate::schema::{GraphInstance, GraphSchema};
use crate::scope::{Lookup, Slot};
use crate::value::{Args, Callable, Class, Value};

use computed::Invoke;

/// Values produced so far within one build.
pub type Memo = HashMap<Dependency, Value>;

/// Context handed from `prepare` to `create`.
#[derive(Debug)]
pub enum Context {
    Empty,
    Args(Args),
    Parent(GraphInstance),
    Cursor(PathCursor, Option<Value>),
}

#[derive(Debug)]
pub struct Prepared {
    pub context: Context,
    pub unmet: Vec<Dependency>,
}

impl Prepared {
    fn ready(context: Context) -> Self {
        Self {
            context,
            unmet: Vec::new(),
        }
    }
}

#[derive(Clone)]
pub enum Rule {
    /// A stored value returned as is.
    Leaf(Value),
    Computed(Computed),
    /// A sub-graph instantiated with the current instance as parent.
    Nested(GraphSchema),
    CrossReference(Path),
    Cached(Cached),
    /// Supplied by the active scope.
    DynamicSlot,
    Package(Package),
}

impl Rule {
    pub fn leaf(value: impl Into<Value>) -> Self {
        Rule::Leaf(value.into())
    }

    /// Call `callable` with the attributes named by its parameters.
    pub fn value(callable: Callable) -> crate::Result<Self> {
        Ok(Rule::Computed(function("value", callable, false)?))
    }

    /// Instantiate `class` with the attributes named by its parameters.
    pub fn class(class: Class) -> crate::Result<Self> {
        Ok(Rule::Computed(constructor(class)?))
    }

    /// Bind prerequisites now, call later: the built value is a [`crate::value::Deferred`].
    pub fn operation(callable: Callable) -> crate::Result<Self> {
        Ok(Rule::Computed(function("operation", callable, true)?))
    }

    pub fn nested(schema: &GraphSchema) -> Self {
        Rule::Nested(schema.clone())
    }

    pub fn reference(path: Path) -> crate::Result<Self> {
        if path.steps().iter().any(|s| matches!(s, Step::Parent(0))) {
            return Err(Error::invalid_path(format!(
                "parent hop in '{}' must go at least one level up",
                path
            )));
        }
        Ok(Rule::CrossReference(path))
    }

    /// Like [`Rule::value`], but computed once per cache storage.
    pub fn cached(callable: Callable) -> crate::Result<Self> {
        Ok(Rule::Cached(Cached {
            inner: function("cached_value", callable, false)?,
        }))
    }

    pub fn cached_class(class: Class) -> crate::Result<Self> {
        Ok(Rule::Cached(Cached {
            inner: constructor(class)?,
        }))
    }

    pub fn dynamic() -> Self {
        Rule::DynamicSlot
    }

    pub fn package(provider: Arc<dyn ModuleProvider>, path: impl Into<String>) -> Self {
        Rule::Package(Package::new(provider, path))
    }

    /// The rule a plain value registers as under `attr`. Schemas become
    /// nested graphs.
    pub fn from_value(value: Value, attr: &str) -> crate::Result<Self> {
        if let Some(schema) = value.as_schema() {
            return Ok(Rule::nested(schema));
        }
        match value.as_class() {
            Some(class) if !attr.ends_with(CLASS_SUFFIX) => Rule::class(class.clone()),
            _ => Ok(Rule::Leaf(value)),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Rule::Leaf(_) => "leaf",
            Rule::Computed(c) if c.deferred => "operation",
            Rule::Computed(_) => "computed",
            Rule::Nested(_) => "nested",
            Rule::CrossReference(_) => "cross-reference",
            Rule::Cached(_) => "cached",
            Rule::DynamicSlot => "dynamic",
            Rule::Package(_) => "package",
        }
    }

    pub fn is_nested(&self) -> bool {
        matches!(self, Rule::Nested(_))
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(self, Rule::DynamicSlot)
    }

    pub fn nested_schema(&self) -> Option<&GraphSchema> {
        match self {
            Rule::Nested(schema) => Some(schema),
            _ => None,
        }
    }

    pub fn prepare(&self, memo: &Memo, target: &Dependency) -> crate::Result<Prepared> {
        match self {
            Rule::Leaf(_) | Rule::DynamicSlot => Ok(Prepared::ready(Context::Empty)),
            Rule::Computed(c) => Ok(c.prepare(memo, target)),
            Rule::Cached(c) => Ok(c.inner.prepare(memo, target)),
            Rule::Nested(_) => Ok(Prepared::ready(Context::Parent(target.instance().clone()))),
            Rule::CrossReference(path) => {
                let cursor = PathCursor::start(path, target.instance())?;
                let pending = cursor.pending().clone();
                if pending.schema().rule(pending.attr()).is_none() {
                    return Err(Error::unknown_attribute(&pending).referred_from(target));
                }
                match memo.get(&pending) {
                    Some(value) => Ok(Prepared::ready(Context::Cursor(cursor, Some(value.clone())))),
                    None => Ok(Prepared {
                        context: Context::Cursor(cursor, None),
                        unmet: vec![pending],
                    }),
                }
            }
            Rule::Package(p) => p.prepare(memo, target),
        }
    }

    pub fn create(&self, target: &Dependency, context: Context) -> crate::Result<Value> {
        match (self, context) {
            (Rule::Leaf(value), _) => Ok(value.clone()),
            (Rule::Computed(c), Context::Args(args)) => c.invoke(target, args),
            (Rule::Cached(c), Context::Args(args)) => c.create(target, args),
            (Rule::Nested(schema), Context::Parent(parent)) => {
                Ok(Value::graph(GraphInstance::child(schema.clone(), parent)))
            }
            (Rule::CrossReference(_), Context::Cursor(cursor, Some(built))) => cursor.resume(built, target),
            (Rule::DynamicSlot, _) => match target.schema().cache().get(target.attr()) {
                Lookup::Present(Slot::Dynamic(value)) => Ok(value),
                _ => Err(Error::dynamic_value_unset(target)),
            },
            (Rule::Package(p), context) => p.create(target, context),
            (rule, context) => Err(Error::create(
                target,
                format!("{} rule got an unexpected creation context {:?}", rule.kind(), context).into(),
            )),
        }
    }

    /// Prerequisites checked by validation. Lazy rules are not forced.
    pub(crate) fn prerequisites(&self, target: &Dependency) -> crate::Result<Vec<Dependency>> {
        match self {
            Rule::Package(_) => Ok(Vec::new()),
            rule => Ok(rule.prepare(&Memo::new(), target)?.unmet),
        }
    }
}

fn function(kind: &str, callable: Callable, deferred: bool) -> crate::Result<Computed> {
    let params = introspect::inspect(callable.name(), callable.signature())?;
    introspect::reject_methods(kind, &params)?;
    Ok(Computed {
        invoke: Invoke::Function(callable),
        params,
        deferred,
    })
}

fn constructor(class: Class) -> crate::Result<Computed> {
    let params = introspect::inspect(class.name(), class.signature())?;
    Ok(Computed {
        invoke: Invoke::Class(class),
        params,
        deferred: false,
    })
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::Leaf(value) => write!(f, "Leaf({:?})", value),
            Rule::Computed(c) => write!(f, "Computed({})", c.invoke.name()),
            Rule::Nested(schema) => write!(f, "Nested({})", schema.name()),
            Rule::CrossReference(path) => write!(f, "CrossReference({})", path),
            Rule::Cached(c) => write!(f, "Cached({})", c.inner.invoke.name()),
            Rule::DynamicSlot => f.write_str("DynamicSlot"),
            Rule::Package(p) => write!(f, "Package({})", p.path()),
        }
    }
}
