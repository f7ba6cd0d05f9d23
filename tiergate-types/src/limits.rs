//! Static free-tier usage limits.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Free-tier limits keyed by counter name (e.g. `"projects" → 3`).
///
/// Counters without an entry are unlimited.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UsageLimits {
    limits: BTreeMap<String, u64>,
}

impl UsageLimits {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the free-tier limit for a counter.
    #[must_use]
    pub fn with_limit(mut self, counter: impl Into<String>, limit: u64) -> Self {
        self.limits.insert(counter.into(), limit);
        self
    }

    /// Returns the limit for a counter, if one is configured.
    #[must_use]
    pub fn limit(&self, counter: &str) -> Option<u64> {
        self.limits.get(counter).copied()
    }

    /// Iterates configured counters and their limits.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.limits.iter().map(|(k, v)| (k.as_str(), *v))
    }
}
