//! Engine configuration.

use serde::{Deserialize, Serialize};
use tiergate_provider::ProviderConfig;
use tiergate_types::{EntitlementId, FeatureAccessMap, UsageLimits};

/// Default usage percentage at which a free-tier counter is "near" its limit.
pub const DEFAULT_NEAR_LIMIT_PERCENT: f64 = 80.0;

/// Provider entitlement ids that map onto paid tiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntitlementIds {
    pub pro: EntitlementId,
    pub basic: EntitlementId,
}

impl Default for EntitlementIds {
    fn default() -> Self {
        Self {
            pro: EntitlementId::new("pro"),
            basic: EntitlementId::new("basic"),
        }
    }
}

/// Configuration for the entitlement engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Passed through to the billing SDK.
    pub provider: ProviderConfig,
    /// Entitlement ids checked by the plan resolver.
    pub entitlements: EntitlementIds,
    /// Tier → feature table.
    pub features: FeatureAccessMap,
    /// Free-tier usage limits.
    pub usage_limits: UsageLimits,
    /// Percentage at which a counter counts as near its limit.
    pub near_limit_percent: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            provider: ProviderConfig::default(),
            entitlements: EntitlementIds::default(),
            features: FeatureAccessMap::default(),
            usage_limits: UsageLimits::default(),
            near_limit_percent: DEFAULT_NEAR_LIMIT_PERCENT,
        }
    }
}

impl EngineConfig {
    /// Parses a config from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> tiergate_types::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
