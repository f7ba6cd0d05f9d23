//! Purchasable offerings.

use crate::ids::{EntitlementId, OfferingId};
use serde::{Deserialize, Serialize};

/// A purchasable package as listed by the billing provider.
///
/// Price and period are opaque display strings; catalog management lives
/// with the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offering {
    /// Offering identifier.
    pub id: OfferingId,
    /// Store product identifier.
    pub product_id: String,
    /// Entitlement granted once purchased, when the provider reports one.
    #[serde(default)]
    pub entitlement: Option<EntitlementId>,
    /// Localized price string (e.g. `"$4.99"`).
    #[serde(default)]
    pub price_label: String,
    /// Billing period label (e.g. `"monthly"`).
    #[serde(default)]
    pub period: Option<String>,
}

impl Offering {
    /// Creates an offering with empty display metadata.
    pub fn new(id: impl Into<OfferingId>, product_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            product_id: product_id.into(),
            entitlement: None,
            price_label: String::new(),
            period: None,
        }
    }

    /// Sets the entitlement this offering grants.
    #[must_use]
    pub fn granting(mut self, entitlement: impl Into<EntitlementId>) -> Self {
        self.entitlement = Some(entitlement.into());
        self
    }

    /// Sets the price label.
    #[must_use]
    pub fn with_price(mut self, price_label: impl Into<String>) -> Self {
        self.price_label = price_label.into();
        self
    }

    /// Sets the billing period label.
    #[must_use]
    pub fn with_period(mut self, period: impl Into<String>) -> Self {
        self.period = Some(period.into());
        self
    }
}
