//! Transition edges between states.

use super::action::Action;
use super::event::{Event, InputKind};
use super::guard::Guard;
use super::state::StateId;
use serde::{Deserialize, Serialize};

/// What kind of event a transition reacts to.
pub enum TransitionKind<C> {
    /// A signal with the given name, optionally from one sender only.
    Signal {
        sender: Option<String>,
        signal: String,
    },
    /// User input of a kind, optionally restricted to a target and key.
    Input {
        kind: InputKind,
        target: Option<String>,
        key: Option<u32>,
    },
    /// Completion of the transition's own source state.
    Completion,
    /// Arbitrary event test.
    Custom(Guard<C>),
}

impl<C> TransitionKind<C> {
    /// Whether `event` triggers this kind of transition from `source`.
    pub fn matches(&self, source: StateId, event: &Event, ctx: &C) -> bool {
        match (self, event) {
            (
                TransitionKind::Signal { sender, signal },
                Event::Signal {
                    sender: from,
                    signal: name,
                    ..
                },
            ) => signal == name && sender.as_ref().is_none_or(|s| s == from),
            (TransitionKind::Input { kind, target, key }, Event::Input(input)) => {
                *kind == input.kind
                    && target
                        .as_ref()
                        .is_none_or(|t| input.target.as_ref() == Some(t))
                    && key.is_none_or(|k| input.key == Some(k))
            }
            (TransitionKind::Completion, Event::Completion(state)) => *state == source,
            (TransitionKind::Custom(test), _) => test.check(event, ctx),
            _ => false,
        }
    }
}

/// Whether a transition leaves its source when targeting its descendants.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransitionType {
    /// The source is exited and re-entered.
    #[default]
    External,
    /// A compound source stays active when every target lies below it.
    Internal,
}

/// A transition from one source to one or more targets.
pub struct Transition<C> {
    pub(crate) source: StateId,
    pub(crate) targets: Vec<StateId>,
    pub(crate) kind: TransitionKind<C>,
    pub(crate) guard: Option<Guard<C>>,
    pub(crate) actions: Vec<Action<C>>,
    pub(crate) transition_type: TransitionType,
}

impl<C> Transition<C> {
    pub fn source(&self) -> StateId {
        self.source
    }

    pub fn targets(&self) -> &[StateId] {
        &self.targets
    }

    pub fn kind(&self) -> &TransitionKind<C> {
        &self.kind
    }

    pub fn transition_type(&self) -> TransitionType {
        self.transition_type
    }

    pub fn actions(&self) -> &[Action<C>] {
        &self.actions
    }

    /// Check trigger and guard against `event` (side-effect free).
    pub fn is_enabled(&self, event: &Event, ctx: &C) -> bool {
        if !self.kind.matches(self.source, event, ctx) {
            return false;
        }

        self.guard.as_ref().is_none_or(|g| g.check(event, ctx))
    }
}
