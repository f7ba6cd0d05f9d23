//! Customer snapshots produced by the provider adapter.

use crate::ids::EntitlementId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A single entitlement as reported by the billing provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Entitlement {
    /// Provider-side entitlement identifier.
    pub id: EntitlementId,
    /// Whether the entitlement currently grants access.
    pub is_active: bool,
}

impl Entitlement {
    /// Creates an active entitlement.
    pub fn active(id: impl Into<EntitlementId>) -> Self {
        Self {
            id: id.into(),
            is_active: true,
        }
    }

    /// Creates an inactive entitlement.
    pub fn inactive(id: impl Into<EntitlementId>) -> Self {
        Self {
            id: id.into(),
            is_active: false,
        }
    }
}

/// Point-in-time snapshot of a customer's active entitlements.
///
/// Records are immutable once built and are superseded wholesale by later
/// snapshots. The active set is kept sorted so that two records built from
/// the same entitlements compare equal regardless of the order the provider
/// reported them in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerRecord {
    active_entitlements: BTreeSet<EntitlementId>,
}

impl CustomerRecord {
    /// Creates a record with no active entitlements.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Creates a record from the ids of active entitlements.
    pub fn new<I, E>(active: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<EntitlementId>,
    {
        Self {
            active_entitlements: active.into_iter().map(Into::into).collect(),
        }
    }

    /// Creates a record from provider entitlements, keeping only active ones.
    pub fn from_entitlements<I>(entitlements: I) -> Self
    where
        I: IntoIterator<Item = Entitlement>,
    {
        Self {
            active_entitlements: entitlements
                .into_iter()
                .filter(|e| e.is_active)
                .map(|e| e.id)
                .collect(),
        }
    }

    /// Returns the active entitlement ids in sorted order.
    pub fn active_entitlements(&self) -> impl Iterator<Item = &EntitlementId> {
        self.active_entitlements.iter()
    }

    /// Returns true if the given entitlement is active.
    #[must_use]
    pub fn is_active(&self, id: &EntitlementId) -> bool {
        self.active_entitlements.contains(id)
    }

    /// Number of active entitlements.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.active_entitlements.len()
    }

    /// Returns true if at least one entitlement is active.
    #[must_use]
    pub fn has_any_active(&self) -> bool {
        !self.active_entitlements.is_empty()
    }
}
