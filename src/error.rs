//! Error taxonomy for declaration, validation and resolution.
//!
//! Resolution-time failures carry a [`Trace`]: every frame the failure
//! crosses on its way out of a build adds either a "required to build" or a
//! "referred from" annotation, so the final message names the chain of
//! attributes that led to it.

use std::fmt;

use thiserror::Error;

use crate::dependency::Dependency;
use crate::value::ParamKind;

/// Error type returned by user callables.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// One annotation added while a failure propagates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    RequiredBy(String),
    ReferredFrom(String),
}

/// Ordered annotations, innermost first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Trace(Vec<Frame>);

impl Trace {
    pub fn frames(&self) -> &[Frame] {
        &self.0
    }

    fn push(&mut self, frame: Frame) {
        self.0.push(frame);
    }
}

impl fmt::Display for Trace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for frame in &self.0 {
            match frame {
                Frame::RequiredBy(dep) => write!(f, " (required to build '{}')", dep)?,
                Frame::ReferredFrom(dep) => write!(f, " (referred from '{}')", dep)?,
            }
        }
        Ok(())
    }
}

/// A closed chain of dependencies, each requiring the next.
///
/// Stored in canonical rotation: the open part starts at its smallest member,
/// and the first member is repeated at the end. Two discoveries of the same
/// cycle from different entry points therefore compare equal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cycle(Vec<String>);

impl Cycle {
    /// Build a cycle from its open member list (no repeated closing member).
    pub fn canonical(mut members: Vec<String>) -> Self {
        if let Some(start) = members
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.cmp(b.1))
            .map(|(i, _)| i)
        {
            members.rotate_left(start);
        }
        if let Some(first) = members.first().cloned() {
            members.push(first);
        }
        Self(members)
    }

    /// Members without the closing repetition.
    pub fn members(&self) -> &[String] {
        match self.0.split_last() {
            Some((_, open)) => open,
            None => &[],
        }
    }
}

impl fmt::Display for Cycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(" -> "))
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("attribute '{dependency}' doesn't exist{trace}")]
    UnknownAttribute { dependency: String, trace: Trace },

    #[error("there are cycles in dependency resolution:\n{}", render_cycles(.cycles))]
    CycleDetected { cycles: Vec<Cycle> },

    #[error(
        "parameter '{owner}(... {name})' is {kind}; *args, **kwargs and positional-only parameters are not supported"
    )]
    UnsupportedParameterKind {
        owner: String,
        name: String,
        kind: ParamKind,
    },

    #[error("{}", convention_message(.owner, .name, .class_provided))]
    InconsistentDefaultValueConvention {
        owner: String,
        name: String,
        class_provided: bool,
    },

    #[error("'{dependency}' is accessed but there is no active scope{trace}")]
    DynamicValueUnset { dependency: String, trace: Trace },

    #[error("cannot get the parent of the topmost graph{trace}")]
    NoActiveParent { trace: Trace },

    #[error("{}", scope_mismatch_message(.schema, .missing, .unexpected))]
    ScopeMismatch {
        schema: String,
        missing: Vec<String>,
        unexpected: Vec<String>,
    },

    #[error("scope for '{schema}' is already active; stop it before starting it again")]
    ScopeAlreadyActive { schema: String },

    #[error(
        "scope for '{schema}' started on a tokio runtime outside a task context; wrap the task in scope::isolated or scope::fork"
    )]
    NoTaskContext { schema: String },

    #[error("scopes can only be started for scoped graph schemas, '{schema}' is not one")]
    NotScoped { schema: String },

    #[error("override got rules which are unknown to '{schema}': {}", .unknown.join(", "))]
    OverrideMismatch {
        schema: String,
        unknown: Vec<String>,
    },

    #[error("override of '{schema}' is already active; stop it before starting it again")]
    OverrideAlreadyActive { schema: String },

    #[error(
        "direct use of abstract graph schema '{schema}' is disallowed; use a concrete schema derived from it{trace}"
    )]
    AbstractSchema { schema: String, trace: Trace },

    #[error("{message}{trace}")]
    InvalidPath { message: String, trace: Trace },

    #[error("{0}")]
    InvalidDeclaration(String),

    #[error("failed to build '{dependency}': {source}{trace}")]
    Create {
        dependency: String,
        source: BoxError,
        trace: Trace,
    },

    #[error("cannot resolve '{path}': {message}{trace}")]
    Provider {
        path: String,
        message: String,
        trace: Trace,
    },
}

impl Error {
    pub(crate) fn unknown_attribute(dependency: &Dependency) -> Self {
        Error::UnknownAttribute {
            dependency: dependency.to_string(),
            trace: Trace::default(),
        }
    }

    pub(crate) fn dynamic_value_unset(dependency: &Dependency) -> Self {
        Error::DynamicValueUnset {
            dependency: dependency.to_string(),
            trace: Trace::default(),
        }
    }

    pub(crate) fn no_active_parent() -> Self {
        Error::NoActiveParent {
            trace: Trace::default(),
        }
    }

    pub(crate) fn invalid_path(message: impl Into<String>) -> Self {
        Error::InvalidPath {
            message: message.into(),
            trace: Trace::default(),
        }
    }

    pub(crate) fn create(dependency: &Dependency, source: BoxError) -> Self {
        Error::Create {
            dependency: dependency.to_string(),
            source,
            trace: Trace::default(),
        }
    }

    /// Annotate with the dependency whose build needed the failing one.
    pub fn required_by(mut self, dependency: &Dependency) -> Self {
        if let Some(trace) = self.trace_mut() {
            trace.push(Frame::RequiredBy(dependency.to_string()));
        }
        self
    }

    /// Annotate with the cross-reference that pointed at the failing one.
    pub fn referred_from(mut self, dependency: &Dependency) -> Self {
        if let Some(trace) = self.trace_mut() {
            trace.push(Frame::ReferredFrom(dependency.to_string()));
        }
        self
    }

    /// Frames accumulated so far, for resolution-time failures.
    pub fn trace(&self) -> Option<&Trace> {
        match self {
            Error::UnknownAttribute { trace, .. }
            | Error::DynamicValueUnset { trace, .. }
            | Error::NoActiveParent { trace }
            | Error::AbstractSchema { trace, .. }
            | Error::InvalidPath { trace, .. }
            | Error::Create { trace, .. }
            | Error::Provider { trace, .. } => Some(trace),
            _ => None,
        }
    }

    fn trace_mut(&mut self) -> Option<&mut Trace> {
        match self {
            Error::UnknownAttribute { trace, .. }
            | Error::DynamicValueUnset { trace, .. }
            | Error::NoActiveParent { trace }
            | Error::AbstractSchema { trace, .. }
            | Error::InvalidPath { trace, .. }
            | Error::Create { trace, .. }
            | Error::Provider { trace, .. } => Some(trace),
            _ => None,
        }
    }
}

fn render_cycles(cycles: &[Cycle]) -> String {
    cycles
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

fn convention_message(owner: &str, name: &str, class_provided: &bool) -> String {
    if *class_provided {
        format!(
            "the default value of '{}(... {})' parameter is directly set to a class.\n\n\
             Either add '_class' suffix to the parameter name\n\
             or set the default value to an instance of the class.",
            owner, name
        )
    } else {
        format!(
            "the default value of '{}(... {})' parameter is set to an instance of a class.\n\n\
             Either remove '_class' suffix from the parameter name\n\
             or set the default value to the class itself.",
            owner, name
        )
    }
}

fn scope_mismatch_message(schema: &str, missing: &[String], unexpected: &[String]) -> String {
    let mut parts = Vec::new();
    if !missing.is_empty() {
        parts.push(format!(
            "didn't get dynamic values which are required by '{}': {}",
            schema,
            missing.join(", ")
        ));
    }
    if !unexpected.is_empty() {
        parts.push(format!(
            "got dynamic values which are unknown to '{}': {}",
            schema,
            unexpected.join(", ")
        ));
    }
    format!("begin_scope() {}", parts.join("; "))
}
