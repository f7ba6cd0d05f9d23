//! Entitlement engine for Tiergate.
//!
//! Reconciles the billing provider's view of a customer into one ordered
//! [`PlanTier`](tiergate_types::PlanTier) and answers access questions
//! against it.
//!
//! # Architecture
//!
//! - [`PlanResolver`]: active entitlements → tier, by fixed priority
//! - [`EntitlementStore`]: the single [`SubscriptionState`], updated
//!   atomically and observable through [`StateWatcher`]
//! - [`Orchestrator`]: purchase and restore attempts, error mapping and
//!   analytics
//! - [`gate`]: pure tier and feature checks
//! - [`UsageLimitTracker`]: free-tier usage limits and the paywall trigger
//! - [`Engine`]: wires the above to a [`ProviderAdapter`](tiergate_provider::ProviderAdapter)
//!   and runs the push/identity event loop
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use tiergate_engine::{Engine, EngineConfig};
//! use tiergate_provider::mock::MockBillingSdk;
//! use tiergate_types::PlanTier;
//!
//! # tokio_test::block_on(async {
//! let sdk = Arc::new(MockBillingSdk::with_active(&["basic"]));
//! let engine = Engine::new(sdk, EngineConfig::default());
//! engine.initialize().await.unwrap();
//!
//! assert_eq!(engine.snapshot().current_plan, PlanTier::Basic);
//! assert!(engine.is_feature_unlocked(PlanTier::Basic));
//! assert!(!engine.is_feature_unlocked(PlanTier::Pro));
//! # });
//! ```

pub mod analytics;
mod config;
mod engine;
mod error;
pub mod gate;
mod orchestrator;
mod resolver;
mod store;
pub mod usage;

pub use analytics::{AnalyticsEvent, AnalyticsSink, EventName, NoopAnalytics};
pub use config::{DEFAULT_NEAR_LIMIT_PERCENT, EngineConfig, EntitlementIds};
pub use engine::{Engine, EngineEvent, LogPaywall, PlanInfo};
pub use error::{EngineResult, ErrorKind};
pub use orchestrator::{
    AttemptState, OperationKind, Orchestrator, PurchaseOutcome, RestoreOutcome,
};
pub use resolver::PlanResolver;
pub use store::{EntitlementStore, StateWatcher, SubscriptionState};
pub use usage::{PaywallPresenter, PaywallTrigger, UsageLimitTracker};
