//! Parameter introspection for registered callables.
//!
//! Turns a [`Signature`] into the ordered `(name, required)` pairs the
//! computed rules resolve against the registry.

use crate::error::Error;
use crate::value::{ParamKind, Signature};

/// Parameter names with this suffix ask for the class itself, not an instance.
pub const CLASS_SUFFIX: &str = "_class";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: String,
    pub required: bool,
}

/// Inspect the parameters of `owner`.
///
/// Rejects variadic and positional-only parameters, and defaults that break
/// the `_class` suffix convention.
pub fn inspect(owner: &str, signature: &Signature) -> crate::Result<Vec<ParamSpec>> {
    for p in signature.params() {
        if let Some(default) = p.default_value() {
            let class_name = p.name().ends_with(CLASS_SUFFIX);
            if class_name != default.is_class() {
                return Err(Error::InconsistentDefaultValueConvention {
                    owner: owner.to_string(),
                    name: p.name().to_string(),
                    class_provided: default.is_class(),
                });
            }
        }
    }

    signature
        .params()
        .iter()
        .map(|p| match p.param_kind() {
            ParamKind::PositionalOrKeyword | ParamKind::KeywordOnly => Ok(ParamSpec {
                name: p.name().to_string(),
                required: p.default_value().is_none(),
            }),
            kind => Err(Error::UnsupportedParameterKind {
                owner: owner.to_string(),
                name: p.name().to_string(),
                kind,
            }),
        })
        .collect()
}

/// Functions taking `self` first are methods and cannot back a rule.
pub fn reject_methods(rule_kind: &str, params: &[ParamSpec]) -> crate::Result<()> {
    match params.first() {
        Some(first) if first.name == "self" => Err(Error::InvalidDeclaration(format!(
            "'{}' rules can not be built from methods",
            rule_kind
        ))),
        _ => Ok(()),
    }
}
