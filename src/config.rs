//! Runtime options.
//!
//! Options can be built in code, read from `CYCLOTRON_*` environment
//! variables, or (with the `config` feature) parsed from JSON.

use std::env;

#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};

use crate::error::{DiError, DiResult};

/// Default nested construction depth before resolution fails.
pub const DEFAULT_MAX_DEPTH: usize = 1024;

/// Tunables of one runtime.
///
/// # Examples
///
/// ```
/// use ferrous_cyclotron::RuntimeOptions;
///
/// let options = RuntimeOptions::named("ui").with_max_depth(64);
/// assert_eq!(options.name, "ui");
/// assert_eq!(options.max_depth, 64);
/// assert_eq!(RuntimeOptions::default().max_depth, 1024);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct RuntimeOptions {
    /// Name used in log events and snapshots.
    pub name: String,
    /// Maximum number of provider constructions nested inside each other.
    pub max_depth: usize,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            name: "cyclotron".to_string(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl RuntimeOptions {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Reads `CYCLOTRON_NAME` and `CYCLOTRON_MAX_DEPTH`, falling back to the
    /// defaults for unset variables.
    pub fn from_env() -> DiResult<Self> {
        Self::from_env_with_prefix("CYCLOTRON")
    }

    /// Like [`from_env`](RuntimeOptions::from_env) with a custom variable
    /// prefix.
    pub fn from_env_with_prefix(prefix: &str) -> DiResult<Self> {
        let mut options = Self::default();
        if let Ok(name) = env::var(format!("{}_NAME", prefix)) {
            options.name = name;
        }
        if let Ok(raw) = env::var(format!("{}_MAX_DEPTH", prefix)) {
            options.max_depth = raw.parse().map_err(|_| {
                DiError::Config(format!("{}_MAX_DEPTH is not a number: {}", prefix, raw))
            })?;
        }
        Ok(options)
    }

    /// Parses options from JSON; missing fields take their defaults.
    #[cfg(feature = "config")]
    pub fn from_json(json: &str) -> DiResult<Self> {
        serde_json::from_str(json).map_err(|e| DiError::Config(e.to_string()))
    }
}
