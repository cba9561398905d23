//! The builder: resolves one dependency and everything it transitively needs.
//!
//! Resolution uses an explicit backlog rather than recursion. The top entry is
//! prepared; if some prerequisites are missing they are pushed on top and the
//! entry is revisited once they are built. Every dependency is created at most
//! once per call; the memo table is dropped on return.

use std::collections::HashMap;

use tracing::{debug, trace};

use crate::dependency::Dependency;
use crate::error::{Cycle, Error};
use crate::rule::Memo;
use crate::value::Value;

enum Step {
    Created(Value),
    Unmet(Vec<Dependency>),
}

pub fn build(root: Dependency) -> crate::Result<Value> {
    debug!(dependency = %root, "build started");
    let mut memo = Memo::new();
    let mut backlog: Vec<(Dependency, Option<Dependency>)> = vec![(root.clone(), None)];
    // Entries waiting on prerequisites, mapped to the entry that needed them.
    let mut waiting: HashMap<Dependency, Option<Dependency>> = HashMap::new();

    while let Some((current, cause)) = backlog.last().cloned() {
        if memo.contains_key(&current) {
            backlog.pop();
            continue;
        }

        match step(&memo, &current) {
            Ok(Step::Created(value)) => {
                waiting.remove(&current);
                memo.insert(current, value);
                backlog.pop();
            }
            Ok(Step::Unmet(unmet)) => {
                waiting.insert(current.clone(), cause);
                for dep in unmet {
                    // Overridden registries skip validation, so cycles can still show up here.
                    if waiting.contains_key(&dep) {
                        return Err(cycle_through(&waiting, &dep, &current));
                    }
                    backlog.push((dep, Some(current.clone())));
                }
            }
            Err(e) => {
                return Err(match cause {
                    Some(cause) => e.required_by(&cause),
                    None => e,
                });
            }
        }
    }

    debug!(dependency = %root, "build finished");
    memo.remove(&root)
        .ok_or_else(|| Error::unknown_attribute(&root))
}

fn step(memo: &Memo, current: &Dependency) -> crate::Result<Step> {
    let rule = current.rule()?;
    let prepared = rule.prepare(memo, current)?;
    if !prepared.unmet.is_empty() {
        return Ok(Step::Unmet(prepared.unmet));
    }
    let value = rule.create(current, prepared.context)?;
    trace!(dependency = %current, kind = rule.kind(), "created");
    Ok(Step::Created(value))
}

/// `current` needs `dep`, which is itself waiting on `current`.
fn cycle_through(
    waiting: &HashMap<Dependency, Option<Dependency>>,
    dep: &Dependency,
    current: &Dependency,
) -> Error {
    let mut members = Vec::new();
    let mut node = Some(current.clone());
    while let Some(n) = node {
        members.push(n.to_string());
        if &n == dep {
            break;
        }
        node = waiting.get(&n).cloned().flatten();
    }
    members.reverse();
    Error::CycleDetected {
        cycles: vec![Cycle::canonical(members)],
    }
}
