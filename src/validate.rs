//! Static validation of a freshly declared schema.
//!
//! Every attribute is walked depth first over the prerequisites its rule
//! reports for an empty memo. Nested schemas are walked as child instances,
//! so cycles running through parent hops are found as well. A parent hop past
//! the topmost instance ends the walk of that attribute without error: the
//! schema may yet be nested somewhere deeper.

use std::collections::{BTreeSet, HashSet};

use tracing::debug;

use crate::dependency::Dependency;
use crate::error::{Cycle, Error};
use crate::schema::{GraphInstance, GraphSchema, SchemaId};

pub fn validate(schema: &GraphSchema) -> crate::Result<()> {
    let mut state = State::default();
    validate_instance(&schema.instance(), &mut state)?;
    if state.cycles.is_empty() {
        debug!(schema = schema.name(), visited = state.visited.len(), "graph schema is acyclic");
        return Ok(());
    }
    debug!(schema = schema.name(), cycles = state.cycles.len(), "cycles found");
    Err(Error::CycleDetected {
        cycles: state.cycles,
    })
}

#[derive(Default)]
struct State {
    visited: HashSet<Dependency>,
    cycles: Vec<Cycle>,
    seen: HashSet<BTreeSet<(SchemaId, String)>>,
}

impl State {
    fn record(&mut self, trail: Trail) {
        let members: BTreeSet<_> = trail
            .members
            .iter()
            .map(|d| (d.schema().id(), d.attr().to_string()))
            .collect();
        if self.seen.insert(members) {
            // Collected innermost first; the last element repeats the first.
            let mut open: Vec<String> = trail.members.iter().rev().map(ToString::to_string).collect();
            open.pop();
            self.cycles.push(Cycle::canonical(open));
        }
    }
}

enum Stop {
    Cycle(Trail),
    NoParent,
    Failed(Error),
}

/// Dependencies collected while a cycle unwinds, until it closes.
struct Trail {
    members: Vec<Dependency>,
    closed: bool,
}

impl Trail {
    fn accumulate(&mut self, next: &Dependency) {
        if self.closed {
            return;
        }
        self.members.push(next.clone());
        self.closed = self.members.first() == Some(next);
    }
}

fn validate_instance(instance: &GraphInstance, state: &mut State) -> crate::Result<()> {
    let registry = instance.schema().registry();
    for (name, rule) in registry.iter() {
        if let Some(nested) = rule.nested_schema() {
            let child = GraphInstance::child(nested.clone(), instance.clone());
            validate_instance(&child, state)?;
            continue;
        }

        let mut in_progress = HashSet::new();
        let target = Dependency::new(instance.clone(), name);
        match check(&target, None, state, &mut in_progress) {
            Ok(()) | Err(Stop::NoParent) => {}
            Err(Stop::Cycle(trail)) => state.record(trail),
            Err(Stop::Failed(e)) => return Err(e),
        }
    }
    Ok(())
}

fn check(
    target: &Dependency,
    cause: Option<&Dependency>,
    state: &mut State,
    in_progress: &mut HashSet<Dependency>,
) -> Result<(), Stop> {
    if state.visited.contains(target) {
        return Ok(());
    }
    if !in_progress.insert(target.clone()) {
        return Err(Stop::Cycle(Trail {
            members: vec![target.clone()],
            closed: false,
        }));
    }

    let rule = target.rule().map_err(|e| {
        Stop::Failed(match cause {
            Some(cause) => e.required_by(cause),
            None => e,
        })
    })?;
    let prerequisites = rule.prerequisites(target).map_err(|e| match e {
        Error::NoActiveParent { .. } => Stop::NoParent,
        e => Stop::Failed(e),
    })?;

    for next in &prerequisites {
        match check(next, Some(target), state, in_progress) {
            Err(Stop::Cycle(mut trail)) => {
                trail.accumulate(target);
                return Err(Stop::Cycle(trail));
            }
            other => other?,
        }
    }
    state.visited.insert(target.clone());
    Ok(())
}
