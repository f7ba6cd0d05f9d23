//! Static tier → feature table.

use crate::ids::FeatureKey;
use crate::tier::PlanTier;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Maps every plan tier to the set of features it unlocks.
///
/// Grants close upward: granting a feature at a tier also grants it at every
/// higher-ranked tier, so the table is monotonic by construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<PlanTier, BTreeSet<FeatureKey>>",
    into = "BTreeMap<PlanTier, BTreeSet<FeatureKey>>"
)]
pub struct FeatureAccessMap {
    tiers: BTreeMap<PlanTier, BTreeSet<FeatureKey>>,
}

impl FeatureAccessMap {
    /// Creates a table where no tier unlocks anything.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tiers: PlanTier::ALL
                .into_iter()
                .map(|tier| (tier, BTreeSet::new()))
                .collect(),
        }
    }

    /// Grants `features` at `tier` and every tier above it.
    #[must_use]
    pub fn with_grant<I, F>(mut self, tier: PlanTier, features: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<FeatureKey>,
    {
        self.grant(tier, features);
        self
    }

    fn grant<I, F>(&mut self, tier: PlanTier, features: I)
    where
        I: IntoIterator<Item = F>,
        F: Into<FeatureKey>,
    {
        let features: Vec<FeatureKey> = features.into_iter().map(Into::into).collect();
        for (_, granted) in self.tiers.range_mut(tier..) {
            granted.extend(features.iter().cloned());
        }
    }

    /// Returns the features unlocked at `tier`.
    pub fn features(&self, tier: PlanTier) -> impl Iterator<Item = &FeatureKey> {
        self.tiers.get(&tier).into_iter().flatten()
    }

    /// Returns true if `feature` is unlocked at `tier`.
    #[must_use]
    pub fn allows(&self, tier: PlanTier, feature: &FeatureKey) -> bool {
        self.tiers
            .get(&tier)
            .is_some_and(|granted| granted.contains(feature))
    }

    /// Returns the lowest tier that unlocks `feature`, or `None` if no tier does.
    #[must_use]
    pub fn required_tier(&self, feature: &FeatureKey) -> Option<PlanTier> {
        PlanTier::ALL
            .into_iter()
            .find(|tier| self.allows(*tier, feature))
    }
}

impl Default for FeatureAccessMap {
    fn default() -> Self {
        Self::new()
    }
}

impl From<BTreeMap<PlanTier, BTreeSet<FeatureKey>>> for FeatureAccessMap {
    fn from(grants: BTreeMap<PlanTier, BTreeSet<FeatureKey>>) -> Self {
        let mut map = Self::new();
        for (tier, features) in grants {
            map.grant(tier, features);
        }
        map
    }
}

impl From<FeatureAccessMap> for BTreeMap<PlanTier, BTreeSet<FeatureKey>> {
    fn from(map: FeatureAccessMap) -> Self {
        map.tiers
    }
}
