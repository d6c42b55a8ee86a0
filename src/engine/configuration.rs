//! The active configuration of a running machine.

use crate::core::{StateId, StateKind, StateTree};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

/// A broken configuration invariant.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum InvariantViolation {
    #[error("active state {state} has an inactive parent")]
    DetachedActive { state: StateId },

    #[error("active compound state {state} has {active} active children, expected exactly one")]
    CompoundChildren { state: StateId, active: usize },

    #[error("active parallel state {state} has inactive region {region}")]
    InactiveRegion { state: StateId, region: StateId },

    #[error("history state {state} is in the configuration")]
    ActiveHistory { state: StateId },
}

/// The set of currently active states.
///
/// Only the dispatch engine mutates a configuration; hosts get read access
/// between dispatch cycles.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Configuration {
    active: BTreeSet<StateId>,
}

impl Configuration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, state: StateId) -> bool {
        self.active.contains(&state)
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Active states in id order.
    pub fn iter(&self) -> impl Iterator<Item = StateId> + '_ {
        self.active.iter().copied()
    }

    pub(crate) fn insert(&mut self, state: StateId) {
        self.active.insert(state);
    }

    pub(crate) fn remove(&mut self, state: StateId) {
        self.active.remove(&state);
    }

    pub(crate) fn clear(&mut self) {
        self.active.clear();
    }

    /// Active states sorted parent-before-child.
    pub fn in_document_order<C>(&self, tree: &StateTree<C>) -> Vec<StateId> {
        let mut states: Vec<_> = self.iter().collect();
        tree.sort_document_order(&mut states);
        states
    }

    /// Active leaf states in document order.
    pub fn atomic_states<C>(&self, tree: &StateTree<C>) -> Vec<StateId> {
        let mut states: Vec<_> = self.iter().filter(|s| tree.is_atomic(*s)).collect();
        tree.sort_document_order(&mut states);
        states
    }

    /// Names of the active leaf states in document order.
    pub fn atomic_names<'t, C>(&self, tree: &'t StateTree<C>) -> Vec<&'t str> {
        self.atomic_states(tree)
            .into_iter()
            .map(|s| tree.name(s))
            .collect()
    }

    /// Verify that compound states have one active child and parallel states
    /// have all their regions active.
    pub fn check<C>(&self, tree: &StateTree<C>) -> Result<(), InvariantViolation> {
        for state in self.iter() {
            if tree.is_history(state) {
                return Err(InvariantViolation::ActiveHistory { state });
            }
            if let Some(parent) = tree.parent(state) {
                if !self.contains(parent) {
                    return Err(InvariantViolation::DetachedActive { state });
                }
            }
            match tree.kind(state) {
                StateKind::Compound => {
                    let active = tree.regions(state).filter(|c| self.contains(*c)).count();
                    if active != 1 {
                        return Err(InvariantViolation::CompoundChildren { state, active });
                    }
                }
                StateKind::Parallel => {
                    if let Some(region) = tree.regions(state).find(|r| !self.contains(*r)) {
                        return Err(InvariantViolation::InactiveRegion { state, region });
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }
}
