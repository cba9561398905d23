//! Rules resolved lazily from an external module provider.

use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::dependency::Dependency;
use crate::error::{Error, Trace};
use crate::rule::{Memo, Prepared, Rule};
use crate::value::Value;

/// Source of externally defined values, addressed by dotted module paths.
pub trait ModuleProvider: Send + Sync {
    /// Load the module at `path`, or `None` if there is no such module.
    fn load(&self, path: &str) -> Option<Value>;
}

type Resolved = Result<(Rule, Vec<String>), String>;

/// A dotted path resolved on first use.
///
/// Modules are loaded progressively (`root`, `root.a`, `root.a.b`, ...). At
/// the first segment that is not a module, that segment is read as an
/// attribute of the last loaded module and loading stops. The result becomes
/// a rule; any remaining segments are read as attributes of the value that
/// rule creates.
#[derive(Clone)]
pub struct Package {
    path: String,
    provider: Arc<dyn ModuleProvider>,
    resolved: Arc<OnceLock<Resolved>>,
}

impl Package {
    pub(crate) fn new(provider: Arc<dyn ModuleProvider>, path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            provider,
            resolved: Arc::new(OnceLock::new()),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    fn resolve(&self, target: &Dependency) -> crate::Result<&(Rule, Vec<String>)> {
        self.resolved
            .get_or_init(|| self.load(target.attr()))
            .as_ref()
            .map_err(|message| Error::Provider {
                path: self.path.clone(),
                message: message.clone(),
                trace: Trace::default(),
            })
    }

    fn load(&self, attr: &str) -> Resolved {
        let mut segments = self.path.split('.');
        let root = segments.next().unwrap_or_default();
        let mut module = root.to_string();
        let mut current = self
            .provider
            .load(root)
            .ok_or_else(|| format!("no module named '{}'", root))?;

        let rest: Vec<&str> = segments.collect();
        let mut consumed = 0;
        for segment in &rest {
            consumed += 1;
            module.push('.');
            module.push_str(segment);
            match self.provider.load(&module) {
                Some(loaded) => current = loaded,
                None => {
                    current = current.attr(segment).ok_or_else(|| {
                        format!("'{}' has no attribute '{}'", module_parent(&module), segment)
                    })?;
                    break;
                }
            }
        }

        let rule = Rule::from_value(current, attr).map_err(|e| e.to_string())?;
        let remaining = rest[consumed..].iter().map(|s| s.to_string()).collect();
        Ok((rule, remaining))
    }

    pub(crate) fn prepare(&self, memo: &Memo, target: &Dependency) -> crate::Result<Prepared> {
        let (rule, _) = self.resolve(target)?;
        rule.prepare(memo, target)
    }

    pub(crate) fn create(&self, target: &Dependency, context: crate::rule::Context) -> crate::Result<Value> {
        let (rule, remaining) = self.resolve(target)?;
        let mut value = rule.create(target, context)?;
        for name in remaining {
            value = value.attr(name).ok_or_else(|| Error::Provider {
                path: self.path.clone(),
                message: format!("'{}' value has no attribute '{}'", value.type_name(), name),
                trace: Trace::default(),
            })?;
        }
        Ok(value)
    }
}

fn module_parent(module: &str) -> &str {
    module.rsplit_once('.').map(|(parent, _)| parent).unwrap_or(module)
}

impl fmt::Debug for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Package({})", self.path)
    }
}
