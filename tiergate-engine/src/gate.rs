//! Access control gate.
//!
//! Pure comparisons against the plan hierarchy. Nothing here reads the store
//! or the provider, so answers depend only on the arguments.

use tiergate_types::{FeatureAccessMap, FeatureKey, PlanTier};

/// Returns true if `current` meets or exceeds `required`.
#[must_use]
pub fn is_unlocked(current: PlanTier, required: PlanTier) -> bool {
    current.rank() >= required.rank()
}

/// Returns true if `feature` is available at `current` according to `map`.
#[must_use]
pub fn has_feature_access(map: &FeatureAccessMap, current: PlanTier, feature: &FeatureKey) -> bool {
    map.allows(current, feature)
}

/// Returns the tier the user must upgrade to for `feature`, or `None` if
/// `current` already has it or no tier grants it.
#[must_use]
pub fn upgrade_target(
    map: &FeatureAccessMap,
    current: PlanTier,
    feature: &FeatureKey,
) -> Option<PlanTier> {
    map.required_tier(feature)
        .filter(|required| !is_unlocked(current, *required))
}
