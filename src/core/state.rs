//! State nodes of a hierarchical state machine.
//!
//! A state node is one vertex of the state tree. Nodes are stored in an
//! arena owned by the machine and addressed through [`StateId`] handles,
//! never through references or addresses.

use super::action::Action;
use super::transition::Transition;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque handle of a state node, unique within one machine.
///
/// # Example
///
/// ```rust
/// use statecraft::builder::MachineBuilder;
///
/// let mut builder = MachineBuilder::<()>::new("player");
/// let idle = builder.simple(builder.root(), "idle").unwrap();
/// assert_ne!(idle, builder.root());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StateId(pub(crate) usize);

impl StateId {
    /// Arena index of this state.
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// How much of a parent's configuration a history state remembers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum HistoryDepth {
    /// Only the parent's direct active children.
    Shallow,
    /// Every active atomic descendant of the parent.
    Deep,
}

/// The role a node plays in the tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StateKind {
    /// Leaf state without children.
    Simple,
    /// Exactly one child is active while the state is active.
    Compound,
    /// Every child (region) is active while the state is active.
    Parallel,
    /// Leaf state whose entry completes the parent region.
    Final,
    /// Pseudo-state that re-enters the parent's remembered configuration.
    History(HistoryDepth),
}

impl StateKind {
    /// Whether nodes of this kind may own children.
    pub fn accepts_children(self) -> bool {
        matches!(self, Self::Simple | Self::Compound | Self::Parallel)
    }

    /// Whether a node of this kind is a leaf of the active configuration.
    pub fn is_atomic(self) -> bool {
        matches!(self, Self::Simple | Self::Final)
    }

    pub fn is_history(self) -> bool {
        matches!(self, Self::History(_))
    }
}

impl fmt::Display for StateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Simple => "simple",
            Self::Compound => "compound",
            Self::Parallel => "parallel",
            Self::Final => "final",
            Self::History(HistoryDepth::Shallow) => "shallow history",
            Self::History(HistoryDepth::Deep) => "deep history",
        };
        f.write_str(label)
    }
}

/// One node of the state tree.
///
/// Nodes own their children (by id), their outgoing transitions and their
/// entry/exit actions. The generic parameter `C` is the host context type
/// that guards and callbacks operate on.
pub struct StateNode<C> {
    pub(crate) name: String,
    pub(crate) kind: StateKind,
    pub(crate) parent: Option<StateId>,
    pub(crate) children: Vec<StateId>,
    pub(crate) initial: Option<StateId>,
    pub(crate) history_default: Option<StateId>,
    pub(crate) transitions: Vec<Transition<C>>,
    pub(crate) on_entry: Vec<Action<C>>,
    pub(crate) on_exit: Vec<Action<C>>,
}

impl<C> StateNode<C> {
    pub(crate) fn new(name: impl Into<String>, kind: StateKind) -> Self {
        Self {
            name: name.into(),
            kind,
            parent: None,
            children: Vec::new(),
            initial: None,
            history_default: None,
            transitions: Vec::new(),
            on_entry: Vec::new(),
            on_exit: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> StateKind {
        self.kind
    }

    pub fn parent(&self) -> Option<StateId> {
        self.parent
    }

    /// Children in insertion order.
    pub fn children(&self) -> &[StateId] {
        &self.children
    }

    /// Explicitly configured initial child, if any.
    pub fn initial(&self) -> Option<StateId> {
        self.initial
    }

    pub fn transitions(&self) -> &[Transition<C>] {
        &self.transitions
    }

    pub fn is_final(&self) -> bool {
        self.kind == StateKind::Final
    }
}

impl<C> fmt::Debug for StateNode<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateNode")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("parent", &self.parent)
            .field("children", &self.children)
            .field("initial", &self.initial)
            .field("transitions", &self.transitions.len())
            .finish()
    }
}
