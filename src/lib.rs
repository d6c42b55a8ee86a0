//! Statecraft: a hierarchical event-driven state machine engine
//!
//! Statecraft runs statecharts: states nest inside compound states, run
//! side by side in parallel regions, and finish through final states that
//! raise completion events. The engine owns no host objects. Guards and
//! actions receive a host context, and property assignments reach host
//! objects through the [`Settable`](property::Settable) capability.
//!
//! # Core Concepts
//!
//! - **State tree**: simple, compound, parallel, final and history states,
//!   built once with [`MachineBuilder`] and frozen into a [`Machine`]
//! - **Transitions**: triggered by signals, input, completion or custom
//!   tests, gated by side-effect free guards
//! - **Dispatch**: one event at a time, innermost transitions first, exits
//!   deepest first and entries shallowest first
//! - **Actions**: property assignment, signal emission and callbacks
//!
//! # Example
//!
//! ```rust
//! use statecraft::{Event, MachineBuilder, TransitionBuilder};
//! use statecraft::core::InputKind;
//! use statecraft::property::{MachineContext, PropertyBag, Settable};
//! use serde_json::json;
//!
//! struct Ui {
//!     button: PropertyBag,
//! }
//!
//! impl MachineContext for Ui {
//!     fn target(&mut self, id: &str) -> Option<&mut dyn Settable> {
//!         (id == "button").then_some(&mut self.button as &mut dyn Settable)
//!     }
//! }
//!
//! let mut builder = MachineBuilder::<Ui>::new("hover");
//! let root = builder.root();
//! let outside = builder.simple(root, "outside").unwrap();
//! let inside = builder.simple(root, "inside").unwrap();
//! builder.assign_property(outside, "button", "highlighted", false).unwrap();
//! builder.assign_property(inside, "button", "highlighted", true).unwrap();
//! builder
//!     .transition(TransitionBuilder::new().from(outside).to(inside).on_input(InputKind::Enter))
//!     .unwrap();
//!
//! let mut ui = Ui { button: PropertyBag::with_properties(["highlighted"]) };
//! let mut machine = builder.build();
//! machine.start(&mut ui).unwrap();
//! machine.post(Event::input(InputKind::Enter));
//! machine.process(&mut ui);
//!
//! assert!(machine.is_active(inside));
//! assert_eq!(ui.button.value("highlighted"), Some(&json!(true)));
//! ```

pub mod builder;
pub mod core;
pub mod engine;
pub mod property;

// Re-export commonly used types
pub use crate::builder::{BuildError, MachineBuilder, StartError, TransitionBuilder};
pub use crate::core::{Action, Event, Guard, StateId, StateKind};
pub use crate::engine::{Machine, MachineOptions, Notification};
