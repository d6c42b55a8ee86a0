//! Arena-backed state tree.
//!
//! The tree is frozen once a machine is built. Structural queries used by
//! the resolver (ancestry, document order, default entry) live here so
//! they are computed the same way everywhere.

use super::state::{StateId, StateKind, StateNode};

/// All state nodes of one machine, addressed by [`StateId`].
pub struct StateTree<C> {
    nodes: Vec<StateNode<C>>,
    root: StateId,
    order: Vec<usize>,
}

impl<C> StateTree<C> {
    pub(crate) fn new(root: StateNode<C>) -> Self {
        Self {
            nodes: vec![root],
            root: StateId(0),
            order: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, node: StateNode<C>) -> StateId {
        self.nodes.push(node);
        StateId(self.nodes.len() - 1)
    }

    pub(crate) fn node_mut(&mut self, id: StateId) -> &mut StateNode<C> {
        &mut self.nodes[id.0]
    }

    /// Number pre-order positions from the root. Detached nodes sort last.
    pub(crate) fn index_document_order(&mut self) {
        let mut order = vec![usize::MAX; self.nodes.len()];
        let mut stack = vec![self.root];
        let mut next = 0;
        while let Some(id) = stack.pop() {
            order[id.0] = next;
            next += 1;
            stack.extend(self.nodes[id.0].children.iter().rev().copied());
        }
        self.order = order;
    }

    pub fn root(&self) -> StateId {
        self.root
    }

    pub fn contains(&self, id: StateId) -> bool {
        id.0 < self.nodes.len()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Panics if `id` belongs to another machine.
    pub fn node(&self, id: StateId) -> &StateNode<C> {
        &self.nodes[id.0]
    }

    pub fn ids(&self) -> impl Iterator<Item = StateId> + '_ {
        (0..self.nodes.len()).map(StateId)
    }

    pub fn name(&self, id: StateId) -> &str {
        &self.nodes[id.0].name
    }

    pub fn kind(&self, id: StateId) -> StateKind {
        self.nodes[id.0].kind
    }

    pub fn parent(&self, id: StateId) -> Option<StateId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: StateId) -> &[StateId] {
        &self.nodes[id.0].children
    }

    /// First state with the given name, in document order.
    pub fn find(&self, name: &str) -> Option<StateId> {
        self.ids()
            .filter(|id| self.name(*id) == name)
            .min_by_key(|id| self.position(*id))
    }

    /// Pre-order position of `id`; parents always precede their children.
    pub fn position(&self, id: StateId) -> usize {
        self.order.get(id.0).copied().unwrap_or(usize::MAX)
    }

    pub fn is_compound(&self, id: StateId) -> bool {
        self.kind(id) == StateKind::Compound
    }

    pub fn is_parallel(&self, id: StateId) -> bool {
        self.kind(id) == StateKind::Parallel
    }

    pub fn is_final(&self, id: StateId) -> bool {
        self.kind(id) == StateKind::Final
    }

    pub fn is_history(&self, id: StateId) -> bool {
        self.kind(id).is_history()
    }

    pub fn is_atomic(&self, id: StateId) -> bool {
        self.kind(id).is_atomic()
    }

    /// Whether `id` lies strictly below `ancestor`.
    pub fn is_descendant(&self, id: StateId, ancestor: StateId) -> bool {
        let mut current = self.parent(id);
        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }
            current = self.parent(parent);
        }
        false
    }

    pub fn is_descendant_or_self(&self, id: StateId, ancestor: StateId) -> bool {
        id == ancestor || self.is_descendant(id, ancestor)
    }

    /// Ancestors of `id`, innermost first, stopping before `upto` when given.
    pub fn proper_ancestors(&self, id: StateId, upto: Option<StateId>) -> Vec<StateId> {
        let mut ancestors = Vec::new();
        let mut current = self.parent(id);
        while let Some(parent) = current {
            if Some(parent) == upto {
                break;
            }
            ancestors.push(parent);
            current = self.parent(parent);
        }
        ancestors
    }

    /// Children that take part in the configuration (history excluded).
    pub fn regions(&self, id: StateId) -> impl Iterator<Item = StateId> + '_ {
        self.children(id)
            .iter()
            .copied()
            .filter(move |child| !self.is_history(*child))
    }

    pub fn history_children(&self, id: StateId) -> impl Iterator<Item = StateId> + '_ {
        self.children(id)
            .iter()
            .copied()
            .filter(move |child| self.is_history(*child))
    }

    /// Child entered by default: the explicit initial, else the first region.
    pub fn initial_child(&self, id: StateId) -> Option<StateId> {
        self.nodes[id.0].initial.or_else(|| self.regions(id).next())
    }

    /// Sort ids parent-before-child.
    pub fn sort_document_order(&self, states: &mut [StateId]) {
        states.sort_by_key(|id| self.position(*id));
    }

    /// Sort ids child-before-parent.
    pub fn sort_exit_order(&self, states: &mut [StateId]) {
        states.sort_by_key(|id| std::cmp::Reverse(self.position(*id)));
    }
}
