//! Graph schemas: named, frozen registries of production rules.
//!
//! A schema is declared once through [`SchemaBuilder`]. At that point its
//! parents are linearized (C3), their rules merged most-derived-wins, and a
//! concrete schema is proven acyclic before it can be used. After that the
//! registry only changes through an override (see [`crate::testing`]).

mod instance;
mod linearize;
mod registry;

pub use instance::GraphInstance;
pub use registry::{Registry, RuleMap};

use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

use crate::error::Error;
use crate::rule::Rule;
use crate::scope::{CacheStorage, ContextStorage, SharedStorage};
use crate::validate;
use crate::value::Value;

static NEXT_SCHEMA_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SchemaId(u64);

struct SchemaInner {
    id: SchemaId,
    name: String,
    parents: Vec<GraphSchema>,
    ancestors: Vec<GraphSchema>,
    is_abstract: bool,
    scoped: bool,
    registry: RwLock<Arc<Registry>>,
    cache: Arc<dyn CacheStorage>,
}

#[derive(Clone)]
pub struct GraphSchema(Arc<SchemaInner>);

impl GraphSchema {
    pub fn builder(name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder::new(name)
    }

    pub fn id(&self) -> SchemaId {
        self.0.id
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn is_abstract(&self) -> bool {
        self.0.is_abstract
    }

    /// Scoped schemas take dynamic values from an active scope.
    pub fn is_scoped(&self) -> bool {
        self.0.scoped
    }

    pub fn parents(&self) -> &[GraphSchema] {
        &self.0.parents
    }

    /// This schema followed by its ancestors in resolution order.
    pub fn linearization(&self) -> Vec<GraphSchema> {
        std::iter::once(self.clone())
            .chain(self.0.ancestors.iter().cloned())
            .collect()
    }

    /// Snapshot of the current registry.
    pub fn registry(&self) -> Arc<Registry> {
        self.0
            .registry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Swap the registry, returning the previous one.
    pub(crate) fn replace_registry(&self, registry: Arc<Registry>) -> Arc<Registry> {
        let mut guard = self
            .0
            .registry
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *guard, registry)
    }

    pub fn rule(&self, attr: &str) -> Option<Rule> {
        self.registry().rule(attr).cloned()
    }

    pub fn dynamic_slots(&self) -> BTreeSet<String> {
        self.registry().dynamic_slots().clone()
    }

    pub(crate) fn cache(&self) -> &Arc<dyn CacheStorage> {
        &self.0.cache
    }

    /// A fresh topmost instance.
    pub fn instance(&self) -> GraphInstance {
        GraphInstance::root(self.clone())
    }

    /// Build `attr` on a fresh topmost instance.
    pub fn get(&self, attr: &str) -> crate::Result<Value> {
        self.instance().get(attr)
    }
}

impl PartialEq for GraphSchema {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl Eq for GraphSchema {}

impl Hash for GraphSchema {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

impl fmt::Debug for GraphSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GraphSchema({})", self.0.name)
    }
}

/// Anything [`SchemaBuilder::rule`] accepts: a rule, or a fallible rule
/// constructor whose error surfaces from [`SchemaBuilder::build`].
pub trait IntoRule {
    fn into_rule(self) -> crate::Result<Rule>;
}

impl IntoRule for Rule {
    fn into_rule(self) -> crate::Result<Rule> {
        Ok(self)
    }
}

impl IntoRule for crate::Result<Rule> {
    fn into_rule(self) -> crate::Result<Rule> {
        self
    }
}

pub struct SchemaBuilder {
    name: String,
    parents: Vec<GraphSchema>,
    is_abstract: bool,
    scoped: bool,
    rules: Vec<(String, crate::Result<Rule>)>,
}

impl SchemaBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parents: Vec::new(),
            is_abstract: false,
            scoped: false,
            rules: Vec::new(),
        }
    }

    pub fn extends(mut self, parent: &GraphSchema) -> Self {
        self.parents.push(parent.clone());
        self
    }

    /// Skip validation and forbid direct access.
    pub fn abstract_schema(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    pub fn scoped(mut self) -> Self {
        self.scoped = true;
        self
    }

    pub fn rule(mut self, name: impl Into<String>, rule: impl IntoRule) -> Self {
        self.rules.push((name.into(), rule.into_rule()));
        self
    }

    /// Register a plain value; classes are instantiated unless `name` ends in `_class`.
    pub fn value(self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        let name = name.into();
        let rule = Rule::from_value(value.into(), &name);
        self.rule(name, rule)
    }

    pub fn nested(self, name: impl Into<String>, schema: &GraphSchema) -> Self {
        self.rule(name, Rule::nested(schema))
    }

    /// Freeze the schema: merge inherited rules and, unless abstract, validate.
    pub fn build(self) -> crate::Result<GraphSchema> {
        let SchemaBuilder {
            name,
            parents,
            is_abstract,
            scoped,
            rules,
        } = self;

        // 1) Own rules; the first registration error wins.
        let mut own = RuleMap::default();
        for (attr, rule) in rules {
            own.insert(attr, rule?);
        }

        // 2) Linearize parents.
        let mut sequences: Vec<Vec<GraphSchema>> =
            parents.iter().map(GraphSchema::linearization).collect();
        sequences.push(parents.clone());
        let ancestors = linearize::c3_merge(sequences).ok_or_else(|| {
            Error::InvalidDeclaration(format!(
                "cannot create a consistent resolution order for the parents of '{}'",
                name
            ))
        })?;

        // 3) Merge, most basic ancestor first.
        let inherited: Vec<Arc<Registry>> = ancestors.iter().rev().map(GraphSchema::registry).collect();
        let registry = Registry::merge(inherited.iter().map(|r| r.own()), own);

        // 4) Dynamic values need a scope.
        let scoped = scoped || parents.iter().any(GraphSchema::is_scoped);
        if !scoped && !registry.dynamic_slots().is_empty() {
            let names: Vec<&str> = registry.dynamic_slots().iter().map(String::as_str).collect();
            return Err(Error::InvalidDeclaration(format!(
                "ordinary graph schemas are not allowed to have dynamic values ({})",
                names.join(", ")
            )));
        }

        let id = SchemaId(NEXT_SCHEMA_ID.fetch_add(1, Ordering::Relaxed));
        let cache: Arc<dyn CacheStorage> = if scoped {
            Arc::new(ContextStorage::new(id))
        } else {
            Arc::new(SharedStorage::default())
        };

        let schema = GraphSchema(Arc::new(SchemaInner {
            id,
            name,
            parents,
            ancestors,
            is_abstract,
            scoped,
            registry: RwLock::new(Arc::new(registry)),
            cache,
        }));

        // 5) Prove acyclicity.
        if !is_abstract {
            validate::validate(&schema)?;
        }

        debug!(
            schema = schema.name(),
            attrs = schema.registry().len(),
            scoped,
            is_abstract,
            "graph schema declared"
        );
        Ok(schema)
    }
}
