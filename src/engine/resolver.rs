//! Transition resolution over a state tree.
//!
//! These functions compute which transitions fire for an event and which
//! states a set of firing transitions exits and enters. They never mutate
//! the configuration; the machine applies their results in one microstep.

use crate::core::{Event, HistoryDepth, StateId, StateKind, StateTree, Transition, TransitionType};
use crate::engine::Configuration;
use std::collections::{BTreeSet, HashMap};

/// Recorded configuration per history state.
pub(crate) type HistoryMemory = HashMap<StateId, Vec<StateId>>;

/// Enabled, non-conflicting transitions for `event`.
///
/// Every active atomic state is visited in document order; for each, the
/// state and then its ancestors are searched innermost first and the first
/// enabled transition found is taken.
pub(crate) fn select_transitions<'t, C>(
    tree: &'t StateTree<C>,
    configuration: &Configuration,
    history: &HistoryMemory,
    event: &Event,
    ctx: &C,
) -> Vec<&'t Transition<C>> {
    let mut enabled: Vec<&'t Transition<C>> = Vec::new();

    for atomic in configuration.atomic_states(tree) {
        let mut chain = std::iter::once(atomic).chain(tree.proper_ancestors(atomic, None));
        let found = chain.find_map(|state| {
            tree.node(state)
                .transitions()
                .iter()
                .find(|t| t.is_enabled(event, ctx))
        });
        if let Some(transition) = found {
            if !enabled.iter().any(|t| std::ptr::eq(*t, transition)) {
                enabled.push(transition);
            }
        }
    }

    remove_conflicts(tree, configuration, history, enabled)
}

/// Drop transitions whose exit sets overlap an already selected one.
///
/// A candidate whose source is a descendant of an already selected source
/// replaces it; otherwise the one selected first wins.
pub(crate) fn remove_conflicts<'t, C>(
    tree: &StateTree<C>,
    configuration: &Configuration,
    history: &HistoryMemory,
    enabled: Vec<&'t Transition<C>>,
) -> Vec<&'t Transition<C>> {
    let mut selected: Vec<(&'t Transition<C>, BTreeSet<StateId>)> = Vec::new();

    for candidate in enabled {
        let exits: BTreeSet<_> = exit_set(tree, configuration, history, &[candidate])
            .into_iter()
            .collect();
        let mut preempted = false;
        let mut beaten = Vec::new();

        for (index, (chosen, chosen_exits)) in selected.iter().enumerate() {
            if exits.is_disjoint(chosen_exits) {
                continue;
            }
            if tree.is_descendant(candidate.source(), chosen.source()) {
                beaten.push(index);
            } else {
                preempted = true;
                break;
            }
        }

        if !preempted {
            for index in beaten.into_iter().rev() {
                selected.remove(index);
            }
            selected.push((candidate, exits));
        }
    }

    selected.into_iter().map(|(t, _)| t).collect()
}

/// States a history pseudo-state stands for right now.
pub(crate) fn history_targets<C>(
    tree: &StateTree<C>,
    history: &HistoryMemory,
    state: StateId,
) -> Vec<StateId> {
    if let Some(recorded) = history.get(&state) {
        return recorded.clone();
    }
    if let Some(default) = tree
        .node(state)
        .history_default
        .filter(|d| !tree.is_history(*d))
    {
        return vec![default];
    }
    match tree.parent(state) {
        Some(parent) if tree.is_parallel(parent) => tree.regions(parent).collect(),
        Some(parent) => tree.initial_child(parent).into_iter().collect(),
        None => Vec::new(),
    }
}

/// Targets with history states replaced by the states they restore.
pub(crate) fn effective_targets<C>(
    tree: &StateTree<C>,
    history: &HistoryMemory,
    transition: &Transition<C>,
) -> Vec<StateId> {
    let mut targets = Vec::new();
    for target in transition.targets() {
        if tree.is_history(*target) {
            targets.extend(history_targets(tree, history, *target));
        } else {
            targets.push(*target);
        }
    }
    targets
}

/// The state whose active descendants a transition exits and re-enters.
pub(crate) fn transition_domain<C>(
    tree: &StateTree<C>,
    history: &HistoryMemory,
    transition: &Transition<C>,
) -> StateId {
    let source = transition.source();
    let targets = effective_targets(tree, history, transition);

    if transition.transition_type() == TransitionType::Internal
        && tree.is_compound(source)
        && targets.iter().all(|t| tree.is_descendant(*t, source))
    {
        return source;
    }

    least_common_compound_ancestor(tree, source, &targets)
}

/// Innermost compound ancestor of `source` containing every target, or the
/// root. Parallel ancestors are skipped.
pub(crate) fn least_common_compound_ancestor<C>(
    tree: &StateTree<C>,
    source: StateId,
    targets: &[StateId],
) -> StateId {
    tree.proper_ancestors(source, None)
        .into_iter()
        .find(|ancestor| {
            (tree.is_compound(*ancestor) || *ancestor == tree.root())
                && targets.iter().all(|t| tree.is_descendant(*t, *ancestor))
        })
        .unwrap_or_else(|| tree.root())
}

/// Active states the transitions leave, deepest first.
pub(crate) fn exit_set<C>(
    tree: &StateTree<C>,
    configuration: &Configuration,
    history: &HistoryMemory,
    transitions: &[&Transition<C>],
) -> Vec<StateId> {
    let mut exits = BTreeSet::new();
    for transition in transitions {
        let domain = transition_domain(tree, history, transition);
        exits.extend(configuration.iter().filter(|s| tree.is_descendant(*s, domain)));
    }
    let mut exits: Vec<_> = exits.into_iter().collect();
    tree.sort_exit_order(&mut exits);
    exits
}

/// Record what each history child of the exiting states should restore.
pub(crate) fn record_history<C>(
    tree: &StateTree<C>,
    configuration: &Configuration,
    history: &mut HistoryMemory,
    exits: &[StateId],
) {
    for state in exits {
        for keeper in tree.history_children(*state) {
            let recorded: Vec<_> = match tree.kind(keeper) {
                StateKind::History(HistoryDepth::Deep) => configuration
                    .iter()
                    .filter(|s| tree.is_atomic(*s) && tree.is_descendant(*s, *state))
                    .collect(),
                _ => configuration
                    .iter()
                    .filter(|s| tree.parent(*s) == Some(*state))
                    .collect(),
            };
            history.insert(keeper, recorded);
        }
    }
}

/// States the transitions enter, shallowest first.
pub(crate) fn entry_set<C>(
    tree: &StateTree<C>,
    history: &HistoryMemory,
    transitions: &[&Transition<C>],
) -> Vec<StateId> {
    let mut entering = BTreeSet::new();
    for transition in transitions {
        for target in transition.targets() {
            add_descendants(tree, history, *target, &mut entering);
        }
        let domain = transition_domain(tree, history, transition);
        for target in effective_targets(tree, history, transition) {
            add_ancestors(tree, history, target, domain, &mut entering);
        }
    }
    let mut entering: Vec<_> = entering.into_iter().collect();
    tree.sort_document_order(&mut entering);
    entering
}

/// `state` and everything its default entry activates, shallowest first.
pub(crate) fn default_entry<C>(
    tree: &StateTree<C>,
    history: &HistoryMemory,
    state: StateId,
) -> Vec<StateId> {
    let mut entering = BTreeSet::new();
    add_descendants(tree, history, state, &mut entering);
    let mut entering: Vec<_> = entering.into_iter().collect();
    tree.sort_document_order(&mut entering);
    entering
}

fn add_descendants<C>(
    tree: &StateTree<C>,
    history: &HistoryMemory,
    state: StateId,
    entering: &mut BTreeSet<StateId>,
) {
    if tree.is_history(state) {
        let Some(parent) = tree.parent(state) else {
            return;
        };
        let restored = history_targets(tree, history, state);
        for s in &restored {
            add_descendants(tree, history, *s, entering);
        }
        for s in &restored {
            add_ancestors(tree, history, *s, parent, entering);
        }
        return;
    }

    entering.insert(state);
    match tree.kind(state) {
        StateKind::Compound => {
            if let Some(initial) = tree.initial_child(state) {
                add_descendants(tree, history, initial, entering);
            }
        }
        StateKind::Parallel => fan_out(tree, history, state, entering),
        _ => {}
    }
}

/// Enter the ancestors of `state` below `upto`.
fn add_ancestors<C>(
    tree: &StateTree<C>,
    history: &HistoryMemory,
    state: StateId,
    upto: StateId,
    entering: &mut BTreeSet<StateId>,
) {
    for ancestor in tree.proper_ancestors(state, Some(upto)) {
        entering.insert(ancestor);
        if tree.is_parallel(ancestor) {
            fan_out(tree, history, ancestor, entering);
        }
    }
}

/// Default-enter every region of `parallel` nothing is entering yet.
fn fan_out<C>(
    tree: &StateTree<C>,
    history: &HistoryMemory,
    parallel: StateId,
    entering: &mut BTreeSet<StateId>,
) {
    for region in tree.regions(parallel) {
        let covered = entering
            .iter()
            .any(|s| tree.is_descendant_or_self(*s, region));
        if !covered {
            add_descendants(tree, history, region, entering);
        }
    }
}

/// Whether `state` has reached a final configuration.
pub(crate) fn is_in_final_state<C>(
    tree: &StateTree<C>,
    configuration: &Configuration,
    state: StateId,
) -> bool {
    match tree.kind(state) {
        StateKind::Compound => tree
            .regions(state)
            .any(|c| tree.is_final(c) && configuration.contains(c)),
        StateKind::Parallel => tree
            .regions(state)
            .all(|r| is_in_final_state(tree, configuration, r)),
        StateKind::Final => configuration.contains(state),
        _ => false,
    }
}
