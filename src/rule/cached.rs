use std::collections::BTreeMap;

use tracing::warn;

use crate::dependency::Dependency;
use crate::error::Error;
use crate::rule::Computed;
use crate::scope::{CachedEntry, Lookup, Slot};
use crate::value::{Args, Value};

/// A computed rule whose first result is kept in the schema's cache storage.
#[derive(Debug, Clone)]
pub struct Cached {
    pub(crate) inner: Computed,
}

impl Cached {
    pub(crate) fn create(&self, target: &Dependency, args: Args) -> crate::Result<Value> {
        let storage = target.schema().cache();
        match storage.get(target.attr()) {
            Lookup::Present(Slot::Cached(entry)) => {
                warn_if_stale(target, &entry, &args);
                Ok(entry.value)
            }
            Lookup::Inactive => Err(Error::dynamic_value_unset(target)),
            Lookup::Present(Slot::Dynamic(_)) | Lookup::Absent => {
                let params = args
                    .iter()
                    .map(|(name, value)| (name.to_string(), value.clone()))
                    .collect();
                let value = self.inner.invoke(target, args)?;
                let entry = CachedEntry {
                    value: value.clone(),
                    params,
                };
                // Under contention the first stored entry wins.
                match storage.insert(target.attr(), Slot::Cached(entry)) {
                    Some(Slot::Cached(existing)) => Ok(existing.value),
                    _ => Ok(value),
                }
            }
        }
    }
}

fn warn_if_stale(target: &Dependency, entry: &CachedEntry, args: &Args) {
    let violators = stale_params(&entry.params, args);
    if violators.is_empty() {
        return;
    }
    let violators = violators
        .iter()
        .map(|v| format!("'{}'", v))
        .collect::<Vec<_>>()
        .join(", ");
    warn!(
        target: "graphwire::cached",
        "'{}' was requested to be built, but some of the dependencies values ({}) have changed \
         since the first invocation. New values are ignored and an instance with stale values was returned.",
        target,
        violators
    );
}

/// Parameters whose value is not the very one used at the first invocation.
fn stale_params<'a>(recorded: &BTreeMap<String, Value>, args: &'a Args) -> Vec<&'a str> {
    args.iter()
        .filter(|(name, value)| !recorded.get(*name).is_some_and(|old| old.ptr_eq(value)))
        .map(|(name, _)| name)
        .collect()
}
