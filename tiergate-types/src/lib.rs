//! Core type definitions for Tiergate.
//!
//! This crate defines the data model shared by the provider adapter and the
//! entitlement engine:
//! - Identifier newtypes (entitlements, offerings, features, users, attempts)
//! - The ordered `PlanTier`
//! - Point-in-time `CustomerRecord` snapshots and `Offering`s
//! - Static configuration tables (`FeatureAccessMap`, `UsageLimits`)
//!
//! Nothing in here performs I/O.

mod features;
mod ids;
mod limits;
mod offering;
mod record;
mod tier;

pub use features::FeatureAccessMap;
pub use ids::{AttemptId, EntitlementId, FeatureKey, OfferingId, UserId};
pub use limits::UsageLimits;
pub use offering::Offering;
pub use record::{CustomerRecord, Entitlement};
pub use tier::PlanTier;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("unknown plan tier: {0}")]
    UnknownTier(String),
}
