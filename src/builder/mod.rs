//! Builder API for state machine construction.
//!
//! This module provides fluent builders for the state tree and its
//! transitions. Builders catch misuse (shared children, unknown states,
//! missing triggers) immediately; whole-tree problems are reported when
//! the machine starts.

pub mod error;
pub mod machine;
pub mod transition;
pub(crate) mod validate;

pub use error::{BuildError, StartError, StructureError};
pub use machine::MachineBuilder;
pub use transition::TransitionBuilder;
