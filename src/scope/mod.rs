//! Scopes: execution-context-bound storage for dynamic values and cached results.

mod context;
mod storage;

pub use context::{fork, isolated, isolated_sync};
pub use storage::{CacheStorage, CachedEntry, ContextStorage, Lookup, SharedStorage, Slot, Token};

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::error::Error;
use crate::schema::GraphSchema;
use crate::value::Value;

/// Prepare a scope for `schema` supplying exactly its dynamic values.
pub fn begin_scope<I, K, V>(schema: &GraphSchema, values: I) -> crate::Result<Scope>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
{
    if !schema.is_scoped() {
        return Err(Error::NotScoped {
            schema: schema.name().to_string(),
        });
    }

    let values: BTreeMap<String, Value> = values
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect();
    let expected = schema.dynamic_slots();
    let given: BTreeSet<String> = values.keys().cloned().collect();

    let missing: Vec<String> = expected.difference(&given).cloned().collect();
    let unexpected: Vec<String> = given.difference(&expected).cloned().collect();
    if !missing.is_empty() || !unexpected.is_empty() {
        return Err(Error::ScopeMismatch {
            schema: schema.name().to_string(),
            missing,
            unexpected,
        });
    }

    Ok(Scope {
        schema: schema.clone(),
        storage: ContextStorage::new(schema.id()),
        values,
        token: None,
    })
}

/// A prepared activation. Starting it makes its values visible to builds in
/// the current execution context until it is stopped.
pub struct Scope {
    schema: GraphSchema,
    storage: ContextStorage,
    values: BTreeMap<String, Value>,
    token: Option<Token>,
}

impl Scope {
    pub fn start(&mut self) -> crate::Result<()> {
        if self.token.is_some() {
            return Err(Error::ScopeAlreadyActive {
                schema: self.schema.name().to_string(),
            });
        }
        let slots = self
            .values
            .iter()
            .map(|(k, v)| (k.clone(), Slot::Dynamic(v.clone())))
            .collect();
        let token = self.storage.activate(slots).ok_or_else(|| Error::NoTaskContext {
            schema: self.schema.name().to_string(),
        })?;
        self.token = Some(token);
        debug!(schema = self.schema.name(), values = self.values.len(), "scope started");
        Ok(())
    }

    /// Stopping an inactive scope does nothing.
    pub fn stop(&mut self) {
        if let Some(token) = self.token.take() {
            self.storage.deactivate(token);
            debug!(schema = self.schema.name(), "scope stopped");
        }
    }

    pub fn is_active(&self) -> bool {
        self.token.is_some()
    }

    pub fn schema(&self) -> &GraphSchema {
        &self.schema
    }

    /// Start and stop again when the guard drops.
    pub fn enter(mut self) -> crate::Result<ScopeGuard> {
        self.start()?;
        Ok(ScopeGuard { scope: self })
    }
}

pub struct ScopeGuard {
    scope: Scope,
}

impl ScopeGuard {
    pub fn scope(&self) -> &Scope {
        &self.scope
    }
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        self.scope.stop();
    }
}
