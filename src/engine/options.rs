//! Runtime options of a machine.

use crate::property::RestorePolicy;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when loading options.
#[derive(Debug, Error)]
pub enum OptionsError {
    #[error("Invalid machine options: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Tunables of a [`Machine`](crate::engine::Machine).
///
/// Missing fields take their default value, so partial documents are fine:
///
/// ```rust
/// use statecraft::engine::MachineOptions;
/// use statecraft::property::RestorePolicy;
///
/// let options = MachineOptions::from_json(r#"{ "restore_policy": "restore_properties" }"#).unwrap();
/// assert_eq!(options.restore_policy, RestorePolicy::RestoreProperties);
/// assert_eq!(options.history_limit, Some(64));
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineOptions {
    /// Whether entry property assignments are undone when their state is left.
    pub restore_policy: RestorePolicy,
    /// Microsteps kept in the transition log; `None` keeps everything.
    pub history_limit: Option<usize>,
    /// Events the external queue holds before new posts are dropped.
    pub max_queue_size: Option<usize>,
}

impl Default for MachineOptions {
    fn default() -> Self {
        Self {
            restore_policy: RestorePolicy::DontRestore,
            history_limit: Some(64),
            max_queue_size: None,
        }
    }
}

impl MachineOptions {
    /// Parse options from a JSON document.
    pub fn from_json(json: &str) -> Result<Self, OptionsError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn restore_policy(mut self, policy: RestorePolicy) -> Self {
        self.restore_policy = policy;
        self
    }

    pub fn history_limit(mut self, limit: Option<usize>) -> Self {
        self.history_limit = limit;
        self
    }

    pub fn max_queue_size(mut self, size: Option<usize>) -> Self {
        self.max_queue_size = size;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_gives_defaults() {
        let options = MachineOptions::from_json("{}").unwrap();
        assert_eq!(options, MachineOptions::default());
    }

    #[test]
    fn invalid_document_is_an_error() {
        let result = MachineOptions::from_json(r#"{ "history_limit": "lots" }"#);
        assert!(matches!(result, Err(OptionsError::Parse(_))));
    }

    #[test]
    fn setters_chain() {
        let options = MachineOptions::default()
            .restore_policy(RestorePolicy::RestoreProperties)
            .history_limit(None)
            .max_queue_size(Some(8));

        assert_eq!(options.restore_policy, RestorePolicy::RestoreProperties);
        assert_eq!(options.history_limit, None);
        assert_eq!(options.max_queue_size, Some(8));
    }
}
