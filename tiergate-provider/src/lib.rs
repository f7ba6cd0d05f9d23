//! Billing provider integration for Tiergate.
//!
//! The vendor SDK is consumed through the [`BillingSdk`] trait. The
//! [`ProviderAdapter`] wraps it and is the only component that talks to it:
//!
//! - owns the SDK initialization lifecycle (idempotent `initialize`)
//! - normalizes customer info into `CustomerRecord` snapshots
//! - maps raw SDK error codes onto the closed [`PurchaseError`] set
//! - registers at most one push listener at a time, torn down by dropping
//!   the returned [`Subscription`]
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use tiergate_provider::{ProviderAdapter, ProviderConfig};
//! use tiergate_provider::mock::MockBillingSdk;
//!
//! let sdk = Arc::new(MockBillingSdk::with_active(&["basic"]));
//! let adapter = ProviderAdapter::new(sdk, ProviderConfig::new("public_key"));
//! assert!(!adapter.is_initialized());
//! ```

mod adapter;
mod config;
mod error;
pub mod mock;
pub mod sdk;

pub use adapter::{ProviderAdapter, Subscription};
pub use config::ProviderConfig;
pub use error::{ProviderError, ProviderResult, PurchaseError};
pub use sdk::{
    BillingSdk, CustomerInfoListener, SdkCustomerInfo, SdkEntitlement, SdkError, SdkErrorCode,
    SdkPackage, SdkResult,
};
