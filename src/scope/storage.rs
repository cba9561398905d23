use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::scope::context;
use crate::schema::SchemaId;
use crate::value::Value;

/// A cached result with the arguments it was built from.
///
/// The arguments are held so their identities stay unique while the entry
/// lives; staleness is judged by identity, not equality.
#[derive(Debug, Clone)]
pub struct CachedEntry {
    pub value: Value,
    pub params: BTreeMap<String, Value>,
}

#[derive(Debug, Clone)]
pub enum Slot {
    Dynamic(Value),
    Cached(CachedEntry),
}

impl Slot {
    pub fn value(&self) -> &Value {
        match self {
            Slot::Dynamic(v) => v,
            Slot::Cached(entry) => &entry.value,
        }
    }
}

/// Outcome of a read. Reading with no active scope differs from a miss.
#[derive(Debug, Clone)]
pub enum Lookup {
    Inactive,
    Absent,
    Present(Slot),
}

/// Backing store for dynamic values and cached results of one schema.
pub trait CacheStorage: Send + Sync {
    fn get(&self, key: &str) -> Lookup;

    /// Store `slot` unless the key is taken; returns the existing slot if so.
    fn insert(&self, key: &str, slot: Slot) -> Option<Slot>;
}

pub(crate) type Slots = Arc<Mutex<HashMap<String, Slot>>>;

pub(crate) fn lock(slots: &Slots) -> MutexGuard<'_, HashMap<String, Slot>> {
    slots.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Process-wide storage used by schemas without scopes.
#[derive(Default)]
pub struct SharedStorage {
    slots: Slots,
}

impl CacheStorage for SharedStorage {
    fn get(&self, key: &str) -> Lookup {
        match lock(&self.slots).get(key) {
            Some(slot) => Lookup::Present(slot.clone()),
            None => Lookup::Absent,
        }
    }

    fn insert(&self, key: &str, slot: Slot) -> Option<Slot> {
        let mut slots = lock(&self.slots);
        if let Some(existing) = slots.get(key) {
            return Some(existing.clone());
        }
        slots.insert(key.to_string(), slot);
        None
    }
}

/// Storage bound to the current execution context.
///
/// Reads and writes go to whatever storage the current thread or task has
/// activated for this schema. On a tokio runtime thread outside
/// [`crate::scope::isolated`] or [`crate::scope::fork`] nothing is active.
pub struct ContextStorage {
    schema: SchemaId,
}

/// Restores the previous activation on [`ContextStorage::deactivate`].
#[derive(Debug)]
pub struct Token {
    previous: Option<Slots>,
}

impl ContextStorage {
    pub fn new(schema: SchemaId) -> Self {
        Self { schema }
    }

    pub fn is_active(&self) -> bool {
        self.current().is_some()
    }

    /// `None` when the current execution context cannot hold scopes.
    pub fn activate(&self, values: HashMap<String, Slot>) -> Option<Token> {
        let slots = Arc::new(Mutex::new(values));
        let previous = context::with_context(|ctx| ctx.set(self.schema, Some(slots)))?;
        Some(Token { previous })
    }

    pub fn deactivate(&self, token: Token) {
        context::with_context(|ctx| ctx.set(self.schema, token.previous));
    }

    fn current(&self) -> Option<Slots> {
        context::with_context(|ctx| ctx.get(self.schema)).flatten()
    }
}

impl CacheStorage for ContextStorage {
    fn get(&self, key: &str) -> Lookup {
        let Some(slots) = self.current() else {
            return Lookup::Inactive;
        };
        match lock(&slots).get(key) {
            Some(slot) => Lookup::Present(slot.clone()),
            None => Lookup::Absent,
        }
    }

    fn insert(&self, key: &str, slot: Slot) -> Option<Slot> {
        let slots = self.current()?;
        let mut slots = lock(&slots);
        if let Some(existing) = slots.get(key) {
            return Some(existing.clone());
        }
        slots.insert(key.to_string(), slot);
        None
    }
}
