//! Builder for constructing state machines.

use crate::builder::error::BuildError;
use crate::builder::transition::TransitionBuilder;
use crate::core::{Action, HistoryDepth, StateId, StateKind, StateNode, StateTree};
use crate::engine::{Machine, MachineOptions};
use crate::property::MachineContext;
use serde_json::Value;

/// Builder for a state tree and its transitions.
///
/// States are created detached with [`add_state`](Self::add_state) and
/// attached with [`add_child`](Self::add_child), or created attached in one
/// call with [`child`](Self::child) and its shorthands.
///
/// # Example
///
/// ```rust
/// use statecraft::builder::{MachineBuilder, TransitionBuilder};
/// use statecraft::core::{Event, InputKind};
///
/// let mut builder = MachineBuilder::<()>::new("button");
/// let root = builder.root();
/// let outside = builder.simple(root, "outside").unwrap();
/// let inside = builder.simple(root, "inside").unwrap();
/// builder
///     .transition(TransitionBuilder::new().from(outside).to(inside).on_input(InputKind::Enter))
///     .unwrap();
///
/// let mut machine = builder.build();
/// machine.start(&mut ()).unwrap();
/// machine.post(Event::input(InputKind::Enter));
/// machine.process(&mut ());
/// assert!(machine.is_active(inside));
/// ```
pub struct MachineBuilder<C> {
    name: String,
    tree: StateTree<C>,
    options: MachineOptions,
}

impl<C: MachineContext> MachineBuilder<C> {
    /// Create a builder whose root is a compound state.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_root(name, StateKind::Compound)
    }

    /// Create a builder whose root is a parallel state.
    pub fn new_parallel(name: impl Into<String>) -> Self {
        Self::with_root(name, StateKind::Parallel)
    }

    fn with_root(name: impl Into<String>, kind: StateKind) -> Self {
        let name = name.into();
        Self {
            tree: StateTree::new(StateNode::new(name.clone(), kind)),
            name,
            options: MachineOptions::default(),
        }
    }

    /// Set runtime options.
    pub fn options(mut self, options: MachineOptions) -> Self {
        self.options = options;
        self
    }

    pub fn root(&self) -> StateId {
        self.tree.root()
    }

    /// Create a detached state.
    pub fn add_state(&mut self, name: impl Into<String>, kind: StateKind) -> StateId {
        self.tree.push(StateNode::new(name, kind))
    }

    /// Attach `child` as the last child of `parent`.
    ///
    /// A simple parent becomes compound.
    pub fn add_child(&mut self, parent: StateId, child: StateId) -> Result<(), BuildError> {
        self.check(parent)?;
        self.check(child)?;

        if let Some(existing) = self.tree.parent(child) {
            return Err(BuildError::AlreadyHasParent {
                child,
                parent: existing,
            });
        }
        let kind = self.tree.kind(parent);
        if !kind.accepts_children() {
            return Err(BuildError::CannotHaveChildren {
                state: parent,
                kind,
            });
        }
        if child == self.tree.root() || self.tree.is_descendant_or_self(parent, child) {
            return Err(BuildError::WouldCreateCycle { parent, child });
        }

        let node = self.tree.node_mut(parent);
        if node.kind == StateKind::Simple {
            node.kind = StateKind::Compound;
        }
        node.children.push(child);
        self.tree.node_mut(child).parent = Some(parent);
        Ok(())
    }

    /// Create a state of `kind` as the last child of `parent`.
    pub fn child(
        &mut self,
        parent: StateId,
        name: impl Into<String>,
        kind: StateKind,
    ) -> Result<StateId, BuildError> {
        self.check(parent)?;
        let id = self.add_state(name, kind);
        self.add_child(parent, id)?;
        Ok(id)
    }

    pub fn simple(&mut self, parent: StateId, name: impl Into<String>) -> Result<StateId, BuildError> {
        self.child(parent, name, StateKind::Simple)
    }

    pub fn compound(
        &mut self,
        parent: StateId,
        name: impl Into<String>,
    ) -> Result<StateId, BuildError> {
        self.child(parent, name, StateKind::Compound)
    }

    pub fn parallel(
        &mut self,
        parent: StateId,
        name: impl Into<String>,
    ) -> Result<StateId, BuildError> {
        self.child(parent, name, StateKind::Parallel)
    }

    pub fn final_state(
        &mut self,
        parent: StateId,
        name: impl Into<String>,
    ) -> Result<StateId, BuildError> {
        self.child(parent, name, StateKind::Final)
    }

    pub fn history(
        &mut self,
        parent: StateId,
        name: impl Into<String>,
        depth: HistoryDepth,
    ) -> Result<StateId, BuildError> {
        self.child(parent, name, StateKind::History(depth))
    }

    /// Choose which child of a compound state is entered by default.
    pub fn set_initial(&mut self, parent: StateId, child: StateId) -> Result<(), BuildError> {
        self.check(parent)?;
        self.check(child)?;
        if self.tree.is_parallel(parent) {
            return Err(BuildError::InitialOnParallel(parent));
        }
        if self.tree.parent(child) != Some(parent) {
            return Err(BuildError::NotAChild { parent, child });
        }
        self.tree.node_mut(parent).initial = Some(child);
        Ok(())
    }

    /// Set the state a history state enters when nothing was recorded yet.
    pub fn set_history_default(
        &mut self,
        history: StateId,
        target: StateId,
    ) -> Result<(), BuildError> {
        self.check(history)?;
        self.check(target)?;
        if !self.tree.is_history(history) {
            return Err(BuildError::NotHistory(history));
        }
        self.tree.node_mut(history).history_default = Some(target);
        Ok(())
    }

    pub fn on_entry(&mut self, state: StateId, action: Action<C>) -> Result<(), BuildError> {
        self.check(state)?;
        self.tree.node_mut(state).on_entry.push(action);
        Ok(())
    }

    pub fn on_exit(&mut self, state: StateId, action: Action<C>) -> Result<(), BuildError> {
        self.check(state)?;
        self.tree.node_mut(state).on_exit.push(action);
        Ok(())
    }

    /// Assign `target.property = value` whenever `state` is entered.
    pub fn assign_property(
        &mut self,
        state: StateId,
        target: impl Into<String>,
        property: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<(), BuildError> {
        self.on_entry(state, Action::assign(target, property, value))
    }

    /// Add a transition to its source state.
    pub fn transition(&mut self, builder: TransitionBuilder<C>) -> Result<(), BuildError> {
        let transition = builder.build()?;
        self.check(transition.source())?;
        for target in transition.targets() {
            self.check(*target)?;
        }
        if self.tree.is_history(transition.source()) {
            return Err(BuildError::HistorySource(transition.source()));
        }
        let source = transition.source();
        self.tree.node_mut(source).transitions.push(transition);
        Ok(())
    }

    /// Freeze the tree into a machine. Structure is validated by `start`.
    pub fn build(mut self) -> Machine<C> {
        self.tree.index_document_order();
        Machine::from_parts(self.name, self.tree, self.options)
    }

    fn check(&self, id: StateId) -> Result<(), BuildError> {
        if self.tree.contains(id) {
            Ok(())
        } else {
            Err(BuildError::UnknownState(id))
        }
    }
}
