//! The closed error taxonomy surfaced to callers.
//!
//! Adapter errors are caught at the orchestrator boundary and mapped onto
//! exactly one [`ErrorKind`]; nothing from the provider crate leaks past it.
//! `Display` yields the user-facing message.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tiergate_provider::{ProviderError, PurchaseError};

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, ErrorKind>;

/// Every error the engine reports.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum ErrorKind {
    #[error("Unable to connect to the store. Please try again later.")]
    Initialization,

    #[error(
        "There was a problem connecting to the store. Please check your connection and try again."
    )]
    NetworkOrStore,

    #[error("Purchases are not allowed on this device.")]
    PurchaseNotAllowed,

    #[error("This product is not valid. Please choose a different option.")]
    InvalidProduct,

    #[error("This product is not available for purchase right now.")]
    ProductUnavailable,

    /// Informational; never stored in `SubscriptionState::error`.
    #[error("Purchase was cancelled.")]
    PurchaseCancelled,

    #[error("Unable to restore purchases. Please try again.")]
    RestoreFailed,

    #[error("This operation is already in progress.")]
    ConcurrentOperation,

    #[error("{}", unknown_message(.0))]
    Unknown(String),
}

fn unknown_message(message: &str) -> &str {
    if message.is_empty() {
        "An unexpected error occurred."
    } else {
        message
    }
}

impl ErrorKind {
    /// The message to show the user.
    pub fn user_message(&self) -> String {
        self.to_string()
    }

    /// Returns true for outcomes that are not degraded states.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, ErrorKind::PurchaseCancelled)
    }

    /// Maps a provider error raised during a purchase.
    pub fn from_purchase(err: ProviderError) -> Self {
        match err {
            ProviderError::Purchase(purchase) => purchase.into(),
            other => Self::from_fetch(other),
        }
    }

    /// Maps a provider error raised during a restore. Restores have no
    /// cancelled outcome, so every failure other than a missing
    /// initialization is a restore failure.
    pub fn from_restore(err: ProviderError) -> Self {
        match err {
            ProviderError::NotInitialized | ProviderError::Initialization(_) => {
                Self::Initialization
            }
            _ => Self::RestoreFailed,
        }
    }

    /// Maps a provider error raised while fetching state or syncing identity.
    pub fn from_fetch(err: ProviderError) -> Self {
        match err {
            ProviderError::NotInitialized | ProviderError::Initialization(_) => {
                Self::Initialization
            }
            ProviderError::Fetch(_) | ProviderError::AuthSync(_) => Self::NetworkOrStore,
            ProviderError::Purchase(purchase) => purchase.into(),
            ProviderError::Restore(_) => Self::RestoreFailed,
            other @ ProviderError::ListenerAlreadyRegistered => Self::Unknown(other.to_string()),
        }
    }
}

impl From<PurchaseError> for ErrorKind {
    fn from(err: PurchaseError) -> Self {
        match err {
            PurchaseError::Cancelled => Self::PurchaseCancelled,
            PurchaseError::StoreUnavailable => Self::NetworkOrStore,
            PurchaseError::NotAllowed => Self::PurchaseNotAllowed,
            PurchaseError::InvalidProduct => Self::InvalidProduct,
            PurchaseError::ProductUnavailable => Self::ProductUnavailable,
            PurchaseError::Unknown(message) => Self::Unknown(message),
        }
    }
}
