//! Runtime of a built machine.
//!
//! This module contains everything that changes while a machine runs:
//! - The active [`Configuration`] and its invariant checks
//! - The event queue and external [`EventSource`]s
//! - Transition resolution (domains, exit and entry sets, conflicts)
//! - The [`Machine`] dispatch loop and its notifications

mod configuration;
mod machine;
mod options;
mod queue;
pub(crate) mod resolver;

pub use configuration::{Configuration, InvariantViolation};
pub use machine::{Dispatch, Machine, MachineStatus, Notification};
pub use options::{MachineOptions, OptionsError};
pub use queue::{EventQueue, EventSource};
