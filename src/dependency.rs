use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::error::Error;
use crate::rule::Rule;
use crate::schema::{GraphInstance, GraphSchema};

/// A (graph schema, attribute) pair: the unit of resolution and memoization.
///
/// The instance is carried along so rules can walk to parents, but equality
/// and hashing only look at the schema and attribute. Sibling instances of
/// one schema therefore share memo entries within a build.
#[derive(Clone)]
pub struct Dependency {
    instance: GraphInstance,
    attr: Arc<str>,
}

impl Dependency {
    pub fn new(instance: GraphInstance, attr: impl Into<Arc<str>>) -> Self {
        Self {
            instance,
            attr: attr.into(),
        }
    }

    pub fn instance(&self) -> &GraphInstance {
        &self.instance
    }

    pub fn schema(&self) -> &GraphSchema {
        self.instance.schema()
    }

    pub fn attr(&self) -> &str {
        &self.attr
    }

    /// Another attribute on the same instance.
    pub fn with_attr(&self, attr: impl Into<Arc<str>>) -> Self {
        Self::new(self.instance.clone(), attr)
    }

    /// The rule producing this attribute, or `UnknownAttribute`.
    pub fn rule(&self) -> crate::Result<Rule> {
        self.schema()
            .rule(&self.attr)
            .ok_or_else(|| Error::unknown_attribute(self))
    }
}

impl PartialEq for Dependency {
    fn eq(&self, other: &Self) -> bool {
        self.schema().id() == other.schema().id() && self.attr == other.attr
    }
}

impl Eq for Dependency {}

impl Hash for Dependency {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.schema().id().hash(state);
        self.attr.hash(state);
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema().name(), self.attr)
    }
}

impl fmt::Debug for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Dependency({})", self)
    }
}
