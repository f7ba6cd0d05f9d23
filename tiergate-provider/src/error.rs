//! Error types for the provider layer.

use thiserror::Error;

/// Result type for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Normalized purchase failure reported by the billing provider.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PurchaseError {
    /// The user dismissed the platform purchase sheet.
    #[error("purchase cancelled by user")]
    Cancelled,

    /// The store could not be reached or reported a problem.
    #[error("store unavailable")]
    StoreUnavailable,

    /// Purchases are disabled for this user or device.
    #[error("purchase not allowed")]
    NotAllowed,

    /// The product is misconfigured or unknown to the store.
    #[error("invalid product")]
    InvalidProduct,

    /// The product exists but cannot be bought right now.
    #[error("product unavailable")]
    ProductUnavailable,

    /// Anything else.
    #[error("unknown purchase error: {0}")]
    Unknown(String),
}

/// Errors that can occur in provider operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// An adapter method was called before a successful `initialize`.
    #[error("billing provider not initialized")]
    NotInitialized,

    /// SDK configuration failed.
    #[error("initialization failed: {0}")]
    Initialization(String),

    /// Fetching customer info or offerings failed.
    #[error("fetch failed: {0}")]
    Fetch(String),

    /// A purchase did not complete.
    #[error("purchase failed: {0}")]
    Purchase(PurchaseError),

    /// Restoring purchases failed.
    #[error("restore failed: {0}")]
    Restore(String),

    /// Logging a user in or out of the provider failed.
    #[error("auth sync failed: {0}")]
    AuthSync(String),

    /// A push listener is already registered.
    #[error("customer info listener already registered")]
    ListenerAlreadyRegistered,
}

impl ProviderError {
    /// Returns true if this error reports a user-cancelled purchase.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ProviderError::Purchase(PurchaseError::Cancelled))
    }

    /// Returns true if the adapter was used before initialization.
    pub fn is_not_initialized(&self) -> bool {
        matches!(self, ProviderError::NotInitialized)
    }
}

impl From<PurchaseError> for ProviderError {
    fn from(err: PurchaseError) -> Self {
        ProviderError::Purchase(err)
    }
}
