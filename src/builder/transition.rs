//! Builder for constructing transitions.

use crate::builder::error::BuildError;
use crate::core::{
    Action, Event, Guard, InputKind, Outbox, StateId, Transition, TransitionKind, TransitionType,
};
use serde_json::Value;

/// Builder for constructing transitions with a fluent API.
pub struct TransitionBuilder<C> {
    source: Option<StateId>,
    targets: Vec<StateId>,
    kind: Option<TransitionKind<C>>,
    guard: Option<Guard<C>>,
    actions: Vec<Action<C>>,
    transition_type: TransitionType,
}

impl<C> TransitionBuilder<C> {
    /// Create a new transition builder.
    pub fn new() -> Self {
        Self {
            source: None,
            targets: Vec::new(),
            kind: None,
            guard: None,
            actions: Vec::new(),
            transition_type: TransitionType::External,
        }
    }

    /// Set the source state (required).
    pub fn from(mut self, state: StateId) -> Self {
        self.source = Some(state);
        self
    }

    /// Add a target state (at least one required). Repeat for multi-target
    /// transitions into different parallel regions.
    pub fn to(mut self, state: StateId) -> Self {
        self.targets.push(state);
        self
    }

    /// Trigger on a signal from any sender.
    pub fn on_signal(mut self, signal: impl Into<String>) -> Self {
        self.kind = Some(TransitionKind::Signal {
            sender: None,
            signal: signal.into(),
        });
        self
    }

    /// Trigger on a signal from one sender.
    pub fn on_signal_from(mut self, sender: impl Into<String>, signal: impl Into<String>) -> Self {
        self.kind = Some(TransitionKind::Signal {
            sender: Some(sender.into()),
            signal: signal.into(),
        });
        self
    }

    /// Trigger on user input of the given kind.
    pub fn on_input(mut self, kind: InputKind) -> Self {
        self.kind = Some(TransitionKind::Input {
            kind,
            target: None,
            key: None,
        });
        self
    }

    /// Trigger on a key event for one key.
    pub fn on_key(mut self, kind: InputKind, key: u32) -> Self {
        self.kind = Some(TransitionKind::Input {
            kind,
            target: None,
            key: Some(key),
        });
        self
    }

    /// Trigger when the source state completes.
    pub fn on_completion(mut self) -> Self {
        self.kind = Some(TransitionKind::Completion);
        self
    }

    /// Trigger on any event accepted by `test`.
    pub fn on_event<F>(mut self, test: F) -> Self
    where
        F: Fn(&Event, &C) -> bool + Send + Sync + 'static,
    {
        self.kind = Some(TransitionKind::Custom(Guard::new(test)));
        self
    }

    /// Set the trigger explicitly.
    pub fn kind(mut self, kind: TransitionKind<C>) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Add a guard (optional).
    pub fn guard(mut self, guard: Guard<C>) -> Self {
        self.guard = Some(guard);
        self
    }

    /// Add a guard using a closure (optional).
    pub fn when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Event, &C) -> bool + Send + Sync + 'static,
    {
        self.guard = Some(Guard::new(predicate));
        self
    }

    /// Append an action run while the transition fires.
    pub fn action(mut self, action: Action<C>) -> Self {
        self.actions.push(action);
        self
    }

    /// Append a callback action.
    pub fn run<F>(self, f: F) -> Self
    where
        F: Fn(&mut C, Option<&Event>, &mut Outbox) + Send + Sync + 'static,
    {
        self.action(Action::callback(f))
    }

    /// Append a property assignment run while the transition fires.
    pub fn assign(
        self,
        target: impl Into<String>,
        property: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        self.action(Action::assign(target, property, value))
    }

    /// Keep a compound source active when targeting its descendants.
    pub fn internal(mut self) -> Self {
        self.transition_type = TransitionType::Internal;
        self
    }

    /// Build the transition.
    pub fn build(self) -> Result<Transition<C>, BuildError> {
        let source = self.source.ok_or(BuildError::MissingSource)?;
        if self.targets.is_empty() {
            return Err(BuildError::MissingTargets);
        }
        let kind = self.kind.ok_or(BuildError::MissingTrigger)?;

        Ok(Transition {
            source,
            targets: self.targets,
            kind,
            guard: self.guard,
            actions: self.actions,
            transition_type: self.transition_type,
        })
    }
}

impl<C> Default for TransitionBuilder<C> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_validates_required_fields() {
        let result = TransitionBuilder::<()>::new().to(StateId(1)).build();
        assert!(matches!(result, Err(BuildError::MissingSource)));

        let result = TransitionBuilder::<()>::new().from(StateId(1)).build();
        assert!(matches!(result, Err(BuildError::MissingTargets)));
    }

    #[test]
    fn builder_validates_missing_trigger() {
        let result = TransitionBuilder::<()>::new()
            .from(StateId(1))
            .to(StateId(2))
            .build();

        assert!(matches!(result, Err(BuildError::MissingTrigger)));
    }

    #[test]
    fn fluent_api_builds_transition() {
        let transition = TransitionBuilder::<i64>::new()
            .from(StateId(1))
            .to(StateId(2))
            .to(StateId(3))
            .on_signal_from("factorial", "xChanged")
            .when(|_, x: &i64| *x > 1)
            .assign("label", "text", "busy")
            .internal()
            .build()
            .unwrap();

        assert_eq!(transition.source(), StateId(1));
        assert_eq!(transition.targets(), &[StateId(2), StateId(3)]);
        assert_eq!(transition.transition_type(), TransitionType::Internal);
        assert_eq!(transition.actions().len(), 1);

        let changed = Event::signal("factorial", "xChanged");
        assert!(transition.is_enabled(&changed, &2));
        assert!(!transition.is_enabled(&changed, &1));
    }

    #[test]
    fn custom_event_test() {
        let transition = TransitionBuilder::<()>::new()
            .from(StateId(1))
            .to(StateId(1))
            .on_event(|e: &Event, _: &()| matches!(e, Event::Custom(_)))
            .build()
            .unwrap();

        assert!(transition.is_enabled(&Event::custom(1), &()));
        assert!(!transition.is_enabled(&Event::key_press(1), &()));
    }
}
