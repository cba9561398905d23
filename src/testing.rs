//! Temporary rule overrides for tests.
//!
//! Overrides swap a schema's registry for a patched copy and skip validation.
//! Callers must serialize overrides of one schema; overlapping start/stop
//! pairs on the same schema are not supported.

use std::sync::Arc;

use tracing::debug;

use crate::error::Error;
use crate::schema::{GraphSchema, IntoRule, Registry};

/// Prepare an override of existing rules of `schema`.
pub fn override_rules<I, K, R>(schema: &GraphSchema, rules: I) -> crate::Result<Patcher>
where
    I: IntoIterator<Item = (K, R)>,
    K: Into<String>,
    R: IntoRule,
{
    let registry = schema.registry();
    let mut overrides = Vec::new();
    let mut unknown = Vec::new();
    for (name, rule) in rules {
        let name = name.into();
        if !registry.contains(&name) {
            unknown.push(name);
            continue;
        }
        overrides.push((name, rule.into_rule()?));
    }
    if !unknown.is_empty() {
        unknown.sort();
        return Err(Error::OverrideMismatch {
            schema: schema.name().to_string(),
            unknown,
        });
    }
    if !schema.is_scoped() && overrides.iter().any(|(_, r)| r.is_dynamic()) {
        return Err(Error::InvalidDeclaration(format!(
            "ordinary graph schema '{}' can not be overridden with dynamic values",
            schema.name()
        )));
    }
    Ok(Patcher {
        schema: schema.clone(),
        overrides,
        previous: None,
    })
}

pub struct Patcher {
    schema: GraphSchema,
    overrides: Vec<(String, crate::rule::Rule)>,
    previous: Option<Arc<Registry>>,
}

impl Patcher {
    pub fn start(&mut self) -> crate::Result<()> {
        if self.previous.is_some() {
            return Err(Error::OverrideAlreadyActive {
                schema: self.schema.name().to_string(),
            });
        }
        let patched = self.schema.registry().patched(&self.overrides);
        self.previous = Some(self.schema.replace_registry(Arc::new(patched)));
        debug!(schema = self.schema.name(), rules = self.overrides.len(), "override started");
        Ok(())
    }

    /// Stopping an inactive override does nothing.
    pub fn stop(&mut self) {
        if let Some(previous) = self.previous.take() {
            self.schema.replace_registry(previous);
            debug!(schema = self.schema.name(), "override stopped");
        }
    }

    pub fn is_active(&self) -> bool {
        self.previous.is_some()
    }

    pub fn enter(mut self) -> crate::Result<PatchGuard> {
        self.start()?;
        Ok(PatchGuard { patcher: self })
    }
}

pub struct PatchGuard {
    patcher: Patcher,
}

impl Drop for PatchGuard {
    fn drop(&mut self) {
        self.patcher.stop();
    }
}
