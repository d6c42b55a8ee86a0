//! Core state machine types.
//!
//! This module contains the static model of a hierarchical state machine:
//! - State nodes and the arena tree that owns them
//! - Events, transitions and their triggers
//! - Guards and actions
//! - Microstep history records
//!
//! Nothing in here mutates a running configuration; that is the job of
//! the [`engine`](crate::engine).

mod action;
mod event;
mod guard;
mod history;
mod state;
mod transition;
mod tree;

pub use action::{Action, Callback, Outbox};
pub use event::{Event, EventPriority, InputEvent, InputKind};
pub use guard::{Guard, GuardError};
pub(crate) use guard::panic_message;
pub use history::{MicrostepRecord, TransitionLog};
pub use state::{HistoryDepth, StateId, StateKind, StateNode};
pub use transition::{Transition, TransitionKind, TransitionType};
pub use tree::StateTree;
