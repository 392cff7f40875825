//! Feature state value objects
//!
//! A `FeatureState` records whether a feature is enabled, which activation
//! strategy governs it, and the string parameters for that strategy. The
//! strategy id and parameters are opaque to this crate; they are interpreted
//! by the feature-evaluation engine and strategy plugins consuming the
//! repository.
//!
//! States are built with consuming `with_*` methods and handed to the
//! repository as complete records. The repository never mutates a stored
//! record in place; `set` fully replaces the previous record for a name.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Complete mapping from feature name to feature state.
///
/// Equivalent to the full contents of the backing file at a point in time,
/// and the single unit of atomicity for every write. Sorted keys make the
/// encoded form deterministic.
pub type FeatureTable = BTreeMap<String, FeatureState>;

/// Persisted state of a single feature.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureState {
    /// Whether the feature is switched on
    pub enabled: bool,

    /// Identifier of the activation strategy; `None` means default behavior
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy_id: Option<String>,

    /// Strategy parameters, keyed by unique parameter name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, String>,
}

impl FeatureState {
    /// Create a state with the given enabled flag, no strategy and no
    /// parameters
    pub fn new(enabled: bool) -> Self {
        FeatureState {
            enabled,
            strategy_id: None,
            parameters: BTreeMap::new(),
        }
    }

    /// Create an enabled state
    ///
    /// # Example
    ///
    /// ```
    /// use flagfile::FeatureState;
    ///
    /// let state = FeatureState::enabled()
    ///     .with_strategy("gradual-rollout")
    ///     .with_parameter("percentage", "25");
    /// assert!(state.enabled);
    /// ```
    pub fn enabled() -> Self {
        FeatureState::new(true)
    }

    /// Create a disabled state
    pub fn disabled() -> Self {
        FeatureState::new(false)
    }

    /// Set the activation strategy id
    ///
    /// An empty id is normalized to absent, since the on-disk encoding
    /// cannot distinguish the two.
    pub fn with_strategy<S: Into<String>>(mut self, strategy_id: S) -> Self {
        let strategy_id = strategy_id.into();
        self.strategy_id = if strategy_id.is_empty() {
            None
        } else {
            Some(strategy_id)
        };
        self
    }

    /// Add a strategy parameter, replacing any previous value for the key
    pub fn with_parameter<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    /// Look up a strategy parameter
    pub fn parameter(&self, key: &str) -> Option<&str> {
        self.parameters.get(key).map(String::as_str)
    }
}
