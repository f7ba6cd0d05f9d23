//! Plan resolution.

use crate::config::EntitlementIds;
use tiergate_types::{CustomerRecord, EntitlementId, PlanTier};

/// Maps a customer record's active entitlements to a single tier.
///
/// Resolution is by fixed priority, never recency: an active `pro`
/// entitlement wins regardless of what else is active, then `basic`, then
/// `free`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PlanResolver {
    ids: EntitlementIds,
}

impl PlanResolver {
    /// Creates a resolver checking the given entitlement ids.
    pub fn new(ids: EntitlementIds) -> Self {
        Self { ids }
    }

    /// Returns the entitlement id that grants `tier`, if it is a paid tier.
    pub fn entitlement_for(&self, tier: PlanTier) -> Option<&EntitlementId> {
        match tier {
            PlanTier::Pro => Some(&self.ids.pro),
            PlanTier::Basic => Some(&self.ids.basic),
            PlanTier::Free => None,
        }
    }

    /// Resolves the tier granted by `record`.
    #[must_use]
    pub fn resolve(&self, record: &CustomerRecord) -> PlanTier {
        if record.is_active(&self.ids.pro) {
            PlanTier::Pro
        } else if record.is_active(&self.ids.basic) {
            PlanTier::Basic
        } else {
            PlanTier::Free
        }
    }

    /// Resolves the tier a single entitlement would grant on its own.
    #[must_use]
    pub fn tier_of(&self, entitlement: &EntitlementId) -> PlanTier {
        self.resolve(&CustomerRecord::new([entitlement.clone()]))
    }
}
