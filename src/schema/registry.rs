use std::collections::{BTreeSet, HashMap};

use crate::rule::Rule;

/// Insertion-ordered name → rule map. Re-inserting a name keeps its slot.
#[derive(Debug, Clone, Default)]
pub struct RuleMap {
    entries: Vec<(String, Rule)>,
    index: HashMap<String, usize>,
}

impl RuleMap {
    pub fn insert(&mut self, name: String, rule: Rule) {
        match self.index.get(&name) {
            Some(&i) => self.entries[i].1 = rule,
            None => {
                self.index.insert(name.clone(), self.entries.len());
                self.entries.push((name, rule));
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Rule> {
        self.index.get(name).map(|&i| &self.entries[i].1)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Rule)> {
        self.entries.iter().map(|(n, r)| (n.as_str(), r))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Flattened rules of one schema, inherited ones included.
#[derive(Debug, Clone)]
pub struct Registry {
    rules: RuleMap,
    own: RuleMap,
    dynamic_slots: BTreeSet<String>,
}

impl Registry {
    /// `inherited` is ordered most-basic first; later entries win.
    pub(crate) fn merge<'a>(inherited: impl IntoIterator<Item = &'a RuleMap>, own: RuleMap) -> Self {
        let mut rules = RuleMap::default();
        for layer in inherited {
            for (name, rule) in layer.iter() {
                rules.insert(name.to_string(), rule.clone());
            }
        }
        for (name, rule) in own.iter() {
            rules.insert(name.to_string(), rule.clone());
        }
        let dynamic_slots = dynamic_slots(&rules);
        Self {
            rules,
            own,
            dynamic_slots,
        }
    }

    pub fn rule(&self, name: &str) -> Option<&Rule> {
        self.rules.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.rules.contains(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Rule)> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Names that an active scope must supply.
    pub fn dynamic_slots(&self) -> &BTreeSet<String> {
        &self.dynamic_slots
    }

    /// Rules declared on this schema itself, as seen by derived schemas.
    pub(crate) fn own(&self) -> &RuleMap {
        &self.own
    }

    /// Copy with some rules replaced. Declared rules seen by derived schemas
    /// are left untouched.
    pub(crate) fn patched(&self, overrides: &[(String, Rule)]) -> Self {
        let mut rules = self.rules.clone();
        for (name, rule) in overrides {
            rules.insert(name.clone(), rule.clone());
        }
        let dynamic_slots = dynamic_slots(&rules);
        Self {
            rules,
            own: self.own.clone(),
            dynamic_slots,
        }
    }
}

fn dynamic_slots(rules: &RuleMap) -> BTreeSet<String> {
    rules
        .iter()
        .filter(|(_, r)| r.is_dynamic())
        .map(|(n, _)| n.to_string())
        .collect()
}
