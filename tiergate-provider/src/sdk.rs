//! Billing SDK abstraction.
//!
//! Defines the narrow surface Tiergate consumes from the vendor billing SDK
//! and the raw shapes it returns. Raw values never leave this crate; the
//! [`ProviderAdapter`](crate::ProviderAdapter) normalizes them into
//! `tiergate_types` values.

use crate::config::ProviderConfig;
use crate::error::PurchaseError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tiergate_types::{CustomerRecord, Entitlement, Offering, UserId};

/// Result type for raw SDK calls.
pub type SdkResult<T> = Result<T, SdkError>;

/// Callback invoked by the SDK whenever it pushes fresh customer info.
pub type CustomerInfoListener = Arc<dyn Fn(SdkCustomerInfo) + Send + Sync>;

/// The vendor billing SDK.
#[async_trait]
pub trait BillingSdk: Send + Sync {
    /// Configures the SDK. Must succeed before any other call.
    async fn configure(&self, config: &ProviderConfig) -> SdkResult<()>;

    /// Fetches the latest customer info.
    async fn customer_info(&self) -> SdkResult<SdkCustomerInfo>;

    /// Fetches the current offerings.
    async fn offerings(&self) -> SdkResult<Vec<SdkPackage>>;

    /// Runs the platform purchase flow for a package.
    async fn purchase_package(&self, product_id: &str) -> SdkResult<SdkCustomerInfo>;

    /// Restores previous purchases.
    async fn restore_purchases(&self) -> SdkResult<SdkCustomerInfo>;

    /// Identifies the current user with the provider.
    async fn log_in(&self, user_id: &UserId) -> SdkResult<SdkCustomerInfo>;

    /// Switches the provider back to an anonymous user.
    async fn log_out(&self) -> SdkResult<SdkCustomerInfo>;

    /// Installs (or with `None`, removes) the push listener.
    fn set_customer_info_listener(&self, listener: Option<CustomerInfoListener>);
}

/// Raw customer info as returned by the SDK.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SdkCustomerInfo {
    /// Provider user id the info belongs to.
    #[serde(default)]
    pub app_user_id: Option<String>,
    /// All known entitlements keyed by identifier, active or not.
    #[serde(default)]
    pub entitlements: HashMap<String, SdkEntitlement>,
}

impl SdkCustomerInfo {
    /// Builds customer info with the given entitlements.
    pub fn with_entitlements<I>(entitlements: I) -> Self
    where
        I: IntoIterator<Item = SdkEntitlement>,
    {
        Self {
            app_user_id: None,
            entitlements: entitlements
                .into_iter()
                .map(|e| (e.identifier.clone(), e))
                .collect(),
        }
    }

    /// Normalizes into a `CustomerRecord`, keeping only active entitlements.
    pub fn to_record(&self) -> CustomerRecord {
        CustomerRecord::from_entitlements(self.entitlements.values().map(|e| Entitlement {
            id: e.identifier.as_str().into(),
            is_active: e.is_active,
        }))
    }
}

/// Raw entitlement info.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SdkEntitlement {
    pub identifier: String,
    pub is_active: bool,
    #[serde(default)]
    pub product_identifier: Option<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl SdkEntitlement {
    /// An active entitlement with no expiry.
    pub fn active(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            is_active: true,
            product_identifier: None,
            expires_at: None,
        }
    }

    /// An inactive (lapsed) entitlement.
    pub fn inactive(identifier: impl Into<String>) -> Self {
        Self {
            is_active: false,
            ..Self::active(identifier)
        }
    }
}

/// Raw package from the SDK's current offering.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SdkPackage {
    pub identifier: String,
    #[serde(default)]
    pub product_identifier: Option<String>,
    #[serde(default)]
    pub entitlement_identifier: Option<String>,
    #[serde(default)]
    pub price_string: Option<String>,
    #[serde(default)]
    pub period: Option<String>,
}

impl SdkPackage {
    /// Normalizes into an `Offering`. Packages without a store product are
    /// not purchasable and yield `None`.
    pub fn to_offering(&self) -> Option<Offering> {
        let product_id = self.product_identifier.as_deref()?;
        let mut offering = Offering::new(self.identifier.as_str(), product_id);
        offering.entitlement = self.entitlement_identifier.as_deref().map(Into::into);
        offering.price_label = self.price_string.clone().unwrap_or_default();
        offering.period = self.period.clone();
        Some(offering)
    }
}

/// Error codes reported by the SDK.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SdkErrorCode {
    PurchaseCancelled,
    StoreProblem,
    NetworkError,
    PurchaseNotAllowed,
    PurchaseInvalid,
    ProductNotAvailableForPurchase,
    ProductAlreadyPurchased,
    Configuration,
    InvalidCredentials,
    Unknown,
}

impl fmt::Display for SdkErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::PurchaseCancelled => "purchase_cancelled",
            Self::StoreProblem => "store_problem",
            Self::NetworkError => "network_error",
            Self::PurchaseNotAllowed => "purchase_not_allowed",
            Self::PurchaseInvalid => "purchase_invalid",
            Self::ProductNotAvailableForPurchase => "product_not_available_for_purchase",
            Self::ProductAlreadyPurchased => "product_already_purchased",
            Self::Configuration => "configuration",
            Self::InvalidCredentials => "invalid_credentials",
            Self::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// A raw SDK error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code}: {message}")]
pub struct SdkError {
    pub code: SdkErrorCode,
    pub message: String,
}

impl SdkError {
    pub fn new(code: SdkErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Maps the SDK code onto the closed purchase error set.
    pub fn to_purchase_error(&self) -> PurchaseError {
        match self.code {
            SdkErrorCode::PurchaseCancelled => PurchaseError::Cancelled,
            SdkErrorCode::StoreProblem | SdkErrorCode::NetworkError => {
                PurchaseError::StoreUnavailable
            }
            SdkErrorCode::PurchaseNotAllowed => PurchaseError::NotAllowed,
            SdkErrorCode::PurchaseInvalid => PurchaseError::InvalidProduct,
            SdkErrorCode::ProductNotAvailableForPurchase => PurchaseError::ProductUnavailable,
            SdkErrorCode::ProductAlreadyPurchased
            | SdkErrorCode::Configuration
            | SdkErrorCode::InvalidCredentials
            | SdkErrorCode::Unknown => PurchaseError::Unknown(self.message.clone()),
        }
    }
}
