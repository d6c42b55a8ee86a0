//! Bookkeeping for the restore-properties policy.

use crate::core::StateId;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RestoreEntry {
    pub target: String,
    pub property: String,
    pub original: Value,
    pub owner: StateId,
}

/// Values that properties had before an active state assigned them.
///
/// Entries are kept in registration order. A nested state assigning a
/// property its ancestor already assigned gets its own entry, so leaving the
/// nested state puts back the ancestor's value.
#[derive(Debug, Default)]
pub(crate) struct RestoreLedger {
    entries: Vec<RestoreEntry>,
}

impl RestoreLedger {
    /// Hand an entry released in this microstep over to `owner`.
    ///
    /// An entry `owner` already holds for `target.property` is kept as is,
    /// so re-entering a state does not stack a second original. Returns
    /// `false` when neither `owner` nor an inactive owner holds the property,
    /// in which case the caller records a fresh original with [`remember`].
    ///
    /// [`remember`]: Self::remember
    pub fn adopt(
        &mut self,
        target: &str,
        property: &str,
        owner: StateId,
        is_active: impl Fn(StateId) -> bool,
    ) -> bool {
        let matches = |e: &RestoreEntry| e.target == target && e.property == property;
        if self.entries.iter().any(|e| matches(e) && e.owner == owner) {
            return true;
        }

        let released = self
            .entries
            .iter_mut()
            .rev()
            .find(|e| matches(e) && !is_active(e.owner));
        match released {
            Some(entry) => {
                entry.owner = owner;
                true
            }
            None => false,
        }
    }

    /// Note that `owner` is about to assign `target.property`, which currently
    /// holds `original`. Unreadable originals cannot be restored and are skipped.
    pub fn remember(&mut self, target: &str, property: &str, original: Option<Value>, owner: StateId) {
        if let Some(original) = original {
            self.entries.push(RestoreEntry {
                target: target.to_string(),
                property: property.to_string(),
                original,
                owner,
            });
        }
    }

    /// Remove entries whose owner is no longer active, newest first, so
    /// applying them in order leaves the oldest original in place.
    pub fn take_released(&mut self, is_active: impl Fn(StateId) -> bool) -> Vec<RestoreEntry> {
        let (mut released, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.entries)
            .into_iter()
            .partition(|entry| !is_active(entry.owner));
        self.entries = kept;
        released.reverse();
        released
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
