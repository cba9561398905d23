//! graphwire: on-demand dependency graphs.
//!
//! A [`GraphSchema`] maps attribute names to production [`Rule`]s. Asking an
//! instance for an attribute builds it together with everything it needs,
//! each prerequisite exactly once per request. Schemas can inherit from and
//! nest each other, refer to attributes elsewhere in the instance tree with
//! [`Path`] expressions, cache results, and take values from a [`Scope`]
//! bound to the current thread or task.

pub mod builder;
pub mod decl;
pub mod dependency;
pub mod error;
pub mod introspect;
pub mod rule;
pub mod schema;
pub mod scope;
pub mod testing;
pub mod validate;
pub mod value;

pub use dependency::Dependency;
pub use error::{Cycle, Error};
pub use rule::{ModuleProvider, Path, Rule};
pub use schema::{GraphInstance, GraphSchema, SchemaBuilder};
pub use scope::{Scope, begin_scope};
pub use testing::override_rules;
pub use value::{Args, Callable, Class, Key, Object, Signature, Value};

pub type Result<T> = std::result::Result<T, Error>;
