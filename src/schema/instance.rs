use std::fmt;
use std::sync::Arc;

use crate::builder;
use crate::dependency::Dependency;
use crate::error::{Error, Trace};
use crate::schema::GraphSchema;
use crate::value::Value;

struct InstanceInner {
    schema: GraphSchema,
    parent: Option<GraphInstance>,
}

/// Runtime instantiation of a schema, linked to the instance that nests it.
#[derive(Clone)]
pub struct GraphInstance(Arc<InstanceInner>);

impl GraphInstance {
    /// A topmost instance with no parent.
    pub fn root(schema: GraphSchema) -> Self {
        Self(Arc::new(InstanceInner {
            schema,
            parent: None,
        }))
    }

    pub(crate) fn child(schema: GraphSchema, parent: GraphInstance) -> Self {
        Self(Arc::new(InstanceInner {
            schema,
            parent: Some(parent),
        }))
    }

    pub fn schema(&self) -> &GraphSchema {
        &self.0.schema
    }

    pub fn parent(&self) -> Option<&GraphInstance> {
        self.0.parent.as_ref()
    }

    /// Walk `levels` parents up.
    pub fn ancestor(&self, levels: usize) -> crate::Result<GraphInstance> {
        let mut current = self.clone();
        for _ in 0..levels {
            current = match current.parent() {
                Some(p) => p.clone(),
                None => return Err(Error::no_active_parent()),
            };
        }
        Ok(current)
    }

    /// Build one attribute of this instance.
    pub fn get(&self, attr: &str) -> crate::Result<Value> {
        if self.schema().is_abstract() {
            return Err(Error::AbstractSchema {
                schema: self.schema().name().to_string(),
                trace: Trace::default(),
            });
        }
        builder::build(Dependency::new(self.clone(), attr))
    }

    pub fn ptr_eq(&self, other: &GraphInstance) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for GraphInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GraphInstance({})", self.schema().name())
    }
}
