//! Microstep history tracking.
//!
//! Every microstep the engine commits is recorded as a [`MicrostepRecord`]
//! so hosts can inspect how the machine reached its current configuration.

use super::state::StateId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

/// Record of one committed microstep.
///
/// # Example
///
/// ```rust
/// use statecraft::core::{MicrostepRecord, TransitionLog};
/// use chrono::Utc;
///
/// let mut log = TransitionLog::new(None);
/// log.record(MicrostepRecord {
///     event: Some("button:Enter".to_string()),
///     exited: vec![],
///     entered: vec![],
///     timestamp: Utc::now(),
/// });
/// assert_eq!(log.len(), 1);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MicrostepRecord {
    /// Display form of the triggering event; `None` for the start step.
    pub event: Option<String>,
    /// States left, in exit order.
    pub exited: Vec<StateId>,
    /// States entered, in entry order.
    pub entered: Vec<StateId>,
    /// When the microstep committed.
    pub timestamp: DateTime<Utc>,
}

/// Ordered, optionally bounded, log of microsteps.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TransitionLog {
    records: VecDeque<MicrostepRecord>,
    limit: Option<usize>,
}

impl TransitionLog {
    /// Create an empty log keeping at most `limit` records (unbounded if `None`).
    pub fn new(limit: Option<usize>) -> Self {
        Self {
            records: VecDeque::new(),
            limit,
        }
    }

    /// Append a record, evicting the oldest one when the log is full.
    pub fn record(&mut self, record: MicrostepRecord) {
        if self.limit == Some(0) {
            return;
        }
        if let Some(limit) = self.limit {
            while self.records.len() >= limit {
                self.records.pop_front();
            }
        }
        self.records.push_back(record);
    }

    pub fn records(&self) -> impl Iterator<Item = &MicrostepRecord> {
        self.records.iter()
    }

    pub fn last(&self) -> Option<&MicrostepRecord> {
        self.records.back()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// States entered over the whole log, in order.
    pub fn entered_path(&self) -> Vec<StateId> {
        self.records
            .iter()
            .flat_map(|r| r.entered.iter().copied())
            .collect()
    }

    /// Time between the first and the last record.
    ///
    /// Returns `None` if the log is empty.
    pub fn duration(&self) -> Option<Duration> {
        if let (Some(first), Some(last)) = (self.records.front(), self.records.back()) {
            let duration = last.timestamp.signed_duration_since(first.timestamp);
            duration.to_std().ok()
        } else {
            None
        }
    }
}
