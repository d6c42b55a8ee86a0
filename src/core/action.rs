//! Side effects executed on state entry/exit and when transitions fire.

use super::event::{Event, EventPriority};
use serde_json::Value;
use std::fmt;

type CallbackFn<C> = Box<dyn Fn(&mut C, Option<&Event>, &mut Outbox) + Send + Sync>;

/// Generic callback action.
///
/// Receives the host context, the triggering event (`None` for entries made
/// by `start`) and an [`Outbox`] for posting follow-up events.
pub struct Callback<C>(CallbackFn<C>);

impl<C> Callback<C> {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&mut C, Option<&Event>, &mut Outbox) + Send + Sync + 'static,
    {
        Callback(Box::new(f))
    }

    pub(crate) fn invoke(&self, ctx: &mut C, event: Option<&Event>, outbox: &mut Outbox) {
        (self.0)(ctx, event, outbox)
    }
}

/// An action owned by a state or transition.
pub enum Action<C> {
    /// Set `property` on the named target object.
    AssignProperty {
        target: String,
        property: String,
        value: Value,
    },
    /// Hand a signal to the host's emit handler.
    EmitSignal { signal: String, args: Vec<Value> },
    Callback(Callback<C>),
}

impl<C> Action<C> {
    pub fn assign(
        target: impl Into<String>,
        property: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        Action::AssignProperty {
            target: target.into(),
            property: property.into(),
            value: value.into(),
        }
    }

    pub fn emit(signal: impl Into<String>, args: Vec<Value>) -> Self {
        Action::EmitSignal {
            signal: signal.into(),
            args,
        }
    }

    /// # Example
    ///
    /// ```rust
    /// use statecraft::core::{Action, Event, Outbox};
    ///
    /// struct Score {
    ///     points: u32,
    /// }
    ///
    /// let bump: Action<Score> = Action::callback(|s: &mut Score, _: Option<&Event>, out: &mut Outbox| {
    ///     s.points += 10;
    ///     out.post(Event::signal("score", "changed"));
    /// });
    /// # let _ = bump;
    /// ```
    pub fn callback<F>(f: F) -> Self
    where
        F: Fn(&mut C, Option<&Event>, &mut Outbox) + Send + Sync + 'static,
    {
        Action::Callback(Callback::new(f))
    }
}

impl<C> fmt::Debug for Action<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::AssignProperty {
                target,
                property,
                value,
            } => write!(f, "AssignProperty({target}.{property} = {value})"),
            Action::EmitSignal { signal, args } => write!(f, "EmitSignal({signal}, {args:?})"),
            Action::Callback(_) => f.write_str("Callback"),
        }
    }
}

/// Events posted by actions during a microstep.
///
/// The machine moves them into its queue once the microstep has committed,
/// so an action never observes its own follow-up events mid-transition.
#[derive(Debug, Default)]
pub struct Outbox {
    posted: Vec<(Event, EventPriority)>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn post(&mut self, event: Event) {
        self.posted.push((event, EventPriority::Normal));
    }

    pub fn post_with_priority(&mut self, event: Event, priority: EventPriority) {
        self.posted.push((event, priority));
    }

    pub fn len(&self) -> usize {
        self.posted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posted.is_empty()
    }

    pub(crate) fn take(&mut self) -> Vec<(Event, EventPriority)> {
        std::mem::take(&mut self.posted)
    }
}
