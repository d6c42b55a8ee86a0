//! Structural validation of a state tree.
//!
//! Every check returns a `Validation` so that all problems are reported at
//! once instead of stopping at the first one.

use crate::builder::error::StructureError;
use crate::core::{StateId, StateKind, StateTree, Transition};
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;

type Check = Validation<(), NonEmptyVec<StructureError>>;

/// Validate the whole tree, accumulating ALL structural errors.
pub(crate) fn validate_tree<C>(tree: &StateTree<C>) -> Result<(), Vec<StructureError>> {
    let mut checks: Vec<Check> = Vec::new();

    for id in tree.ids() {
        checks.push(check_attached(tree, id));
        checks.push(check_container(tree, id));
        checks.push(check_history_default(tree, id));
        for transition in tree.node(id).transitions() {
            checks.push(check_targets(tree, transition));
        }
    }

    match Validation::all_vec(checks).map(|_| ()) {
        Validation::Success(_) => Ok(()),
        Validation::Failure(errors) => Err(errors.iter().cloned().collect()),
    }
}

fn check_attached<C>(tree: &StateTree<C>, id: StateId) -> Check {
    if tree.position(id) == usize::MAX {
        Validation::fail(StructureError::Orphan {
            state: id,
            name: tree.name(id).to_string(),
        })
    } else {
        Validation::success(())
    }
}

fn check_container<C>(tree: &StateTree<C>, id: StateId) -> Check {
    let has_regions = tree.regions(id).next().is_some();
    let name = tree.name(id).to_string();
    match tree.kind(id) {
        StateKind::Compound if !has_regions => {
            Validation::fail(StructureError::EmptyCompound { state: id, name })
        }
        StateKind::Parallel if !has_regions => {
            Validation::fail(StructureError::EmptyParallel { state: id, name })
        }
        _ => Validation::success(()),
    }
}

fn check_history_default<C>(tree: &StateTree<C>, id: StateId) -> Check {
    let node = tree.node(id);
    match (node.history_default, node.parent()) {
        (Some(target), Some(parent)) if !tree.is_descendant(target, parent) => {
            Validation::fail(StructureError::HistoryDefaultOutsideParent {
                state: id,
                name: node.name().to_string(),
            })
        }
        _ => Validation::success(()),
    }
}

/// Targets of one transition must be able to be active at the same time.
fn check_targets<C>(tree: &StateTree<C>, transition: &Transition<C>) -> Check {
    let targets = transition.targets();
    for (i, first) in targets.iter().enumerate() {
        for second in &targets[i + 1..] {
            if !can_coexist(tree, *first, *second) {
                return Validation::fail(StructureError::ConflictingTargets {
                    source_name: tree.name(transition.source()).to_string(),
                    first: *first,
                    second: *second,
                });
            }
        }
    }
    Validation::success(())
}

fn can_coexist<C>(tree: &StateTree<C>, a: StateId, b: StateId) -> bool {
    if tree.is_descendant_or_self(a, b) || tree.is_descendant_or_self(b, a) {
        return true;
    }
    tree.proper_ancestors(a, None)
        .into_iter()
        .find(|anc| tree.is_descendant(b, *anc))
        .is_some_and(|common| tree.is_parallel(common))
}
