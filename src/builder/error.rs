//! Errors for machine construction and start-time validation.

use crate::core::{StateId, StateKind};
use thiserror::Error;

/// Errors that can occur while building the state tree and transitions.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum BuildError {
    #[error("State {0} does not belong to this machine")]
    UnknownState(StateId),

    #[error("State {child} already has parent {parent}. State trees cannot share nodes")]
    AlreadyHasParent { child: StateId, parent: StateId },

    #[error("State {state} is a {kind} state and cannot have children")]
    CannotHaveChildren { state: StateId, kind: StateKind },

    #[error("Adding {child} under {parent} would create a cycle")]
    WouldCreateCycle { parent: StateId, child: StateId },

    #[error("State {child} is not a child of {parent}")]
    NotAChild { parent: StateId, child: StateId },

    #[error("Parallel state {0} enters all children and has no initial child")]
    InitialOnParallel(StateId),

    #[error("State {0} is not a history state")]
    NotHistory(StateId),

    #[error("History state {0} cannot be the source of a transition")]
    HistorySource(StateId),

    #[error("Transition source not specified. Call .from(state)")]
    MissingSource,

    #[error("Transition targets not specified. Call .to(state)")]
    MissingTargets,

    #[error("Transition trigger not specified. Call .on_signal(), .on_input(), .on_completion() or .on_event()")]
    MissingTrigger,
}

/// Structural problems detected when a machine starts.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StructureError {
    #[error("State '{name}' ({state}) is not attached to the tree")]
    Orphan { state: StateId, name: String },

    #[error("Compound state '{name}' ({state}) has no children")]
    EmptyCompound { state: StateId, name: String },

    #[error("Parallel state '{name}' ({state}) has no regions")]
    EmptyParallel { state: StateId, name: String },

    #[error("Default of history state '{name}' ({state}) lies outside its parent")]
    HistoryDefaultOutsideParent { state: StateId, name: String },

    #[error("Transition from '{source_name}' targets states {first} and {second}, which cannot be active together")]
    ConflictingTargets {
        source_name: String,
        first: StateId,
        second: StateId,
    },
}

/// Errors returned by `Machine::start`.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StartError {
    #[error("Machine is already running")]
    AlreadyRunning,

    #[error("Machine structure is invalid ({} problem(s)): {}", .0.len(), describe(.0))]
    Invalid(Vec<StructureError>),
}

fn describe(errors: &[StructureError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_lists_every_problem() {
        let error = StartError::Invalid(vec![
            StructureError::EmptyCompound {
                state: StateId(1),
                name: "menu".into(),
            },
            StructureError::Orphan {
                state: StateId(2),
                name: "lost".into(),
            },
        ]);

        let message = error.to_string();
        assert!(message.contains("2 problem(s)"));
        assert!(message.contains("'menu'"));
        assert!(message.contains("'lost'"));
    }
}
