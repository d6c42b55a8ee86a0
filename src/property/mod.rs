//! Property assignment and host callbacks.
//!
//! The engine never depends on concrete UI types. Instead, host objects
//! implement [`Settable`] and the host context implements
//! [`MachineContext`] to resolve named targets and receive emitted signals.
//!
//! # Example
//!
//! ```rust
//! use statecraft::property::{MachineContext, PropertyBag, Settable};
//! use serde_json::json;
//!
//! struct Ui {
//!     label: PropertyBag,
//! }
//!
//! impl MachineContext for Ui {
//!     fn target(&mut self, id: &str) -> Option<&mut dyn Settable> {
//!         match id {
//!             "label" => Some(&mut self.label),
//!             _ => None,
//!         }
//!     }
//! }
//!
//! let mut ui = Ui { label: PropertyBag::with_properties(["text"]) };
//! let label = ui.target("label").unwrap();
//! label.set("text", json!("Hello")).unwrap();
//! assert!(label.set("colour", json!("red")).is_err());
//! assert_eq!(ui.label.get("text"), Some(json!("Hello")));
//! ```

mod restore;

pub(crate) use restore::RestoreLedger;

use crate::core::Event;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

/// A property name the target does not know.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("unknown property '{name}'")]
pub struct UnknownProperty {
    pub name: String,
}

impl UnknownProperty {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Capability of an external object to have named properties set.
pub trait Settable {
    /// Set `name` to `value`.
    fn set(&mut self, name: &str, value: Value) -> Result<(), UnknownProperty>;

    /// Current value of `name`, used to restore properties on exit.
    ///
    /// Default implementation returns `None`, which disables restoring for
    /// this target.
    fn get(&self, name: &str) -> Option<Value> {
        let _ = name;
        None
    }
}

/// The host side of a running machine.
///
/// Guards and callbacks receive the context directly; property and signal
/// actions go through these hooks.
pub trait MachineContext {
    /// Resolve a property target by name.
    fn target(&mut self, id: &str) -> Option<&mut dyn Settable> {
        let _ = id;
        None
    }

    /// Receive an `EmitSignal` action. `cause` is the triggering event.
    fn emit(&mut self, signal: &str, args: &[Value], cause: Option<&Event>) {
        let _ = (signal, args, cause);
    }
}

impl MachineContext for () {}

/// Whether properties assigned on entry are put back when the state is left.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestorePolicy {
    #[default]
    DontRestore,
    RestoreProperties,
}

/// `Settable` over a fixed set of property names.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyBag {
    values: BTreeMap<String, Value>,
}

impl PropertyBag {
    /// Declare the known properties, all starting as `null`.
    pub fn with_properties<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            values: names
                .into_iter()
                .map(|name| (name.into(), Value::Null))
                .collect(),
        }
    }

    /// Declare a property with an initial value.
    pub fn property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    pub fn value(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }
}

impl Settable for PropertyBag {
    fn set(&mut self, name: &str, value: Value) -> Result<(), UnknownProperty> {
        match self.values.get_mut(name) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(UnknownProperty::new(name)),
        }
    }

    fn get(&self, name: &str) -> Option<Value> {
        self.values.get(name).cloned()
    }
}
