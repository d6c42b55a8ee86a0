//! Events consumed by the state machine.
//!
//! Events are plain immutable values. External collaborators (widgets,
//! timers, network callbacks) construct them and post them into the
//! machine; the machine itself only ever creates [`Event::Completion`].

use super::state::StateId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Kind of a user-input event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InputKind {
    /// Pointer entered the target.
    Enter,
    /// Pointer left the target.
    Leave,
    /// Pointer button pressed.
    Press,
    /// Pointer button released.
    Release,
    KeyPress,
    KeyRelease,
}

/// A user-input event, optionally scoped to a target object and key.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InputEvent {
    pub kind: InputKind,
    pub target: Option<String>,
    pub key: Option<u32>,
}

/// An event delivered to the machine.
///
/// # Example
///
/// ```rust
/// use statecraft::core::{Event, InputKind};
/// use serde_json::json;
///
/// let changed = Event::signal("factorial", "xChanged").with_args(vec![json!(5)]);
/// let hover = Event::input(InputKind::Enter).on_target("button");
///
/// assert_eq!(changed.to_string(), "factorial.xChanged");
/// assert_eq!(hover.to_string(), "button:Enter");
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Event {
    /// A signal emitted by a named sender.
    Signal {
        sender: String,
        signal: String,
        args: Vec<Value>,
    },
    /// Pointer or keyboard input.
    Input(InputEvent),
    /// The given compound or parallel state reached a final configuration.
    Completion(StateId),
    /// Application-defined payload.
    Custom(Value),
}

impl Event {
    pub fn signal(sender: impl Into<String>, signal: impl Into<String>) -> Self {
        Event::Signal {
            sender: sender.into(),
            signal: signal.into(),
            args: Vec::new(),
        }
    }

    pub fn input(kind: InputKind) -> Self {
        Event::Input(InputEvent {
            kind,
            target: None,
            key: None,
        })
    }

    pub fn key_press(key: u32) -> Self {
        Event::Input(InputEvent {
            kind: InputKind::KeyPress,
            target: None,
            key: Some(key),
        })
    }

    pub fn key_release(key: u32) -> Self {
        Event::Input(InputEvent {
            kind: InputKind::KeyRelease,
            target: None,
            key: Some(key),
        })
    }

    pub fn custom(payload: impl Into<Value>) -> Self {
        Event::Custom(payload.into())
    }

    /// Attach arguments to a signal event. Other events are returned as is.
    pub fn with_args(mut self, values: Vec<Value>) -> Self {
        if let Event::Signal { args, .. } = &mut self {
            *args = values;
        }
        self
    }

    /// Scope an input event to a target object. Other events are returned as is.
    pub fn on_target(mut self, name: impl Into<String>) -> Self {
        if let Event::Input(input) = &mut self {
            input.target = Some(name.into());
        }
        self
    }

    /// Arguments carried by a signal event; empty for other kinds.
    pub fn args(&self) -> &[Value] {
        match self {
            Event::Signal { args, .. } => args,
            _ => &[],
        }
    }

    pub fn is_completion(&self) -> bool {
        matches!(self, Event::Completion(_))
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Signal { sender, signal, .. } => write!(f, "{sender}.{signal}"),
            Event::Input(input) => {
                if let Some(target) = &input.target {
                    write!(f, "{target}:")?;
                }
                write!(f, "{:?}", input.kind)?;
                if let Some(key) = input.key {
                    write!(f, "({key})")?;
                }
                Ok(())
            }
            Event::Completion(state) => write!(f, "done.state{state}"),
            Event::Custom(payload) => write!(f, "custom({payload})"),
        }
    }
}

/// Where a posted event is placed in the queue.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventPriority {
    /// Appended to the tail.
    #[default]
    Normal,
    /// Inserted at the head, ahead of everything already queued.
    High,
}
