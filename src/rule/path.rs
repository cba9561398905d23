//! Cross-reference path expressions and their resumable evaluation.

use std::fmt;

use crate::dependency::Dependency;
use crate::error::Error;
use crate::schema::GraphInstance;
use crate::value::{Key, Value};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Attr(String),
    Index(Key),
    /// Hop this many parents up.
    Parent(usize),
}

/// Immutable chain of steps evaluated against the instance owning the rule.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Path {
    steps: Vec<Step>,
}

impl Path {
    /// The empty path: the owning instance itself.
    pub fn this() -> Self {
        Self::default()
    }

    pub fn attr(mut self, name: impl Into<String>) -> Self {
        self.steps.push(Step::Attr(name.into()));
        self
    }

    pub fn index(mut self, key: impl Into<Key>) -> Self {
        self.steps.push(Step::Index(key.into()));
        self
    }

    pub fn parent(mut self, levels: usize) -> Self {
        self.steps.push(Step::Parent(levels));
        self
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for step in &self.steps {
            match step {
                Step::Attr(name) => {
                    if !first {
                        f.write_str(".")?;
                    }
                    f.write_str(name)?;
                }
                Step::Index(key) => write!(f, "[{}]", key)?,
                Step::Parent(n) => {
                    if !first {
                        f.write_str(".")?;
                    }
                    write!(f, "^{}", n)?;
                }
            }
            first = false;
        }
        Ok(())
    }
}

/// A path evaluation suspended at the first schema attribute it needs.
///
/// [`PathCursor::start`] walks graph instances until it meets an attribute
/// that has to be built; that attribute becomes `pending`. Once the builder
/// has produced it, [`PathCursor::resume`] finishes the remaining steps.
#[derive(Debug, Clone)]
pub struct PathCursor {
    path: Path,
    resume_at: usize,
    pending: Dependency,
}

impl PathCursor {
    pub fn start(path: &Path, instance: &GraphInstance) -> crate::Result<Self> {
        let mut current = instance.clone();
        for (i, step) in path.steps().iter().enumerate() {
            match step {
                Step::Parent(levels) => current = current.ancestor(*levels)?,
                Step::Index(key) => {
                    return Err(Error::invalid_path(format!(
                        "graph '{}' can not be indexed with [{}]",
                        current.schema().name(),
                        key
                    )));
                }
                Step::Attr(name) => {
                    let nested = current
                        .schema()
                        .rule(name)
                        .and_then(|r| r.nested_schema().cloned());
                    match nested {
                        Some(schema) => current = GraphInstance::child(schema, current),
                        None => {
                            return Ok(Self {
                                path: path.clone(),
                                resume_at: i + 1,
                                pending: Dependency::new(current, name.as_str()),
                            });
                        }
                    }
                }
            }
        }
        Err(Error::invalid_path(format!(
            "path '{}' must reach some attribute of the graph",
            path
        )))
    }

    /// The attribute the cursor waits for.
    pub fn pending(&self) -> &Dependency {
        &self.pending
    }

    /// Finish evaluation given the built value of [`Self::pending`].
    ///
    /// `target` is the attribute owning the cross-reference; failures of
    /// builds issued from here are annotated as referred from it.
    pub fn resume(&self, built: Value, target: &Dependency) -> crate::Result<Value> {
        let mut current = built;
        for step in &self.path.steps()[self.resume_at..] {
            current = match step {
                Step::Attr(name) => match current.as_graph() {
                    Some(inst) => inst.get(name).map_err(|e| e.referred_from(target))?,
                    None => current.attr(name).ok_or_else(|| {
                        Error::invalid_path(format!(
                            "'{}' value has no attribute '{}'",
                            current.type_name(),
                            name
                        ))
                    })?,
                },
                Step::Index(key) => {
                    if current.as_graph().is_some() {
                        return Err(Error::invalid_path(format!(
                            "{} can not be indexed with [{}]",
                            current.type_name(),
                            key
                        )));
                    }
                    current.index(key).ok_or_else(|| {
                        Error::invalid_path(format!(
                            "'{}' value has no item [{}]",
                            current.type_name(),
                            key
                        ))
                    })?
                }
                Step::Parent(levels) => match current.as_graph() {
                    Some(inst) => Value::graph(inst.ancestor(*levels)?),
                    None => {
                        return Err(Error::invalid_path(format!(
                            "cannot get parent of '{}' value",
                            current.type_name()
                        )));
                    }
                },
            };
        }
        Ok(current)
    }
}
