//! Guard predicates for controlling transitions.
//!
//! Guards are side-effect free predicates over the triggering event and the
//! host context. They are evaluated speculatively while transitions are
//! selected, before anything is committed.

use super::event::Event;
use std::panic::{self, AssertUnwindSafe};
use thiserror::Error;

/// Failure reported by a fallible guard.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum GuardError {
    #[error("guard failed: {0}")]
    Failed(String),

    #[error("guard panicked: {0}")]
    Panicked(String),
}

type Predicate<C> = Box<dyn Fn(&Event, &C) -> Result<bool, GuardError> + Send + Sync>;

/// Predicate that determines whether a transition may fire.
///
/// A guard that fails or panics counts as "not enabled": the transition is
/// skipped and the machine keeps running.
///
/// # Example
///
/// ```rust
/// use statecraft::core::{Event, Guard};
///
/// struct Counter {
///     x: i64,
/// }
///
/// let positive = Guard::on_context(|c: &Counter| c.x > 1);
/// let event = Event::signal("counter", "xChanged");
///
/// assert!(positive.check(&event, &Counter { x: 6 }));
/// assert!(!positive.check(&event, &Counter { x: 1 }));
/// ```
pub struct Guard<C> {
    predicate: Predicate<C>,
}

impl<C> Guard<C> {
    /// Create a guard from an infallible predicate over event and context.
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&Event, &C) -> bool + Send + Sync + 'static,
    {
        Guard {
            predicate: Box::new(move |event, ctx| Ok(predicate(event, ctx))),
        }
    }

    /// Create a guard that only inspects the host context.
    pub fn on_context<F>(predicate: F) -> Self
    where
        F: Fn(&C) -> bool + Send + Sync + 'static,
    {
        Self::new(move |_, ctx| predicate(ctx))
    }

    /// Create a guard whose evaluation may fail.
    ///
    /// ```rust
    /// use statecraft::core::{Event, Guard};
    ///
    /// let first_arg_positive: Guard<()> = Guard::fallible(|event: &Event, _: &()| {
    ///     event
    ///         .args()
    ///         .first()
    ///         .and_then(|v| v.as_i64())
    ///         .map(|x| x > 0)
    ///         .ok_or("missing integer argument")
    /// });
    ///
    /// assert!(!first_arg_positive.check(&Event::signal("s", "changed"), &()));
    /// ```
    pub fn fallible<F, E>(predicate: F) -> Self
    where
        F: Fn(&Event, &C) -> Result<bool, E> + Send + Sync + 'static,
        E: std::fmt::Display,
    {
        Guard {
            predicate: Box::new(move |event, ctx| {
                predicate(event, ctx).map_err(|e| GuardError::Failed(e.to_string()))
            }),
        }
    }

    /// Evaluate the guard, surfacing failures and panics as errors.
    pub fn try_check(&self, event: &Event, ctx: &C) -> Result<bool, GuardError> {
        panic::catch_unwind(AssertUnwindSafe(|| (self.predicate)(event, ctx)))
            .unwrap_or_else(|payload| Err(GuardError::Panicked(panic_message(payload.as_ref()))))
    }

    /// Evaluate the guard; failures are logged and count as `false`.
    pub fn check(&self, event: &Event, ctx: &C) -> bool {
        match self.try_check(event, ctx) {
            Ok(enabled) => enabled,
            Err(error) => {
                tracing::warn!(%event, %error, "guard evaluation failed, treating as disabled");
                false
            }
        }
    }
}

pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
