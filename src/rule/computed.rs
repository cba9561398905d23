use crate::dependency::Dependency;
use crate::error::Error;
use crate::introspect::ParamSpec;
use crate::rule::{Context, Memo, Prepared};
use crate::value::{Args, Callable, Class, Deferred, Value};

#[derive(Debug, Clone)]
pub(crate) enum Invoke {
    Function(Callable),
    Class(Class),
}

impl Invoke {
    pub(crate) fn name(&self) -> &str {
        match self {
            Invoke::Function(c) => c.name(),
            Invoke::Class(c) => c.name(),
        }
    }
}

/// A value computed from other attributes of the same instance.
#[derive(Debug, Clone)]
pub struct Computed {
    pub(crate) invoke: Invoke,
    pub(crate) params: Vec<ParamSpec>,
    pub(crate) deferred: bool,
}

impl Computed {
    /// One prerequisite per parameter that is required or present in the registry.
    pub(crate) fn prepare(&self, memo: &Memo, target: &Dependency) -> Prepared {
        let registry = target.schema().registry();
        let mut args = Args::new();
        let mut unmet = Vec::new();
        for param in &self.params {
            let dep = target.with_attr(param.name.as_str());
            match memo.get(&dep) {
                Some(value) => args.insert(param.name.clone(), value.clone()),
                None if param.required || registry.contains(&param.name) => unmet.push(dep),
                None => {}
            }
        }
        Prepared {
            context: Context::Args(args),
            unmet,
        }
    }

    pub(crate) fn invoke(&self, target: &Dependency, args: Args) -> crate::Result<Value> {
        let result = match &self.invoke {
            Invoke::Function(f) if self.deferred => Ok(Value::from(Deferred::new(f.clone(), args))),
            Invoke::Function(f) => f.call(args),
            Invoke::Class(c) => c.instantiate(args),
        };
        result.map_err(|e| Error::create(target, e))
    }
}
