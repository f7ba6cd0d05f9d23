//! The entitlement store.
//!
//! Holds the canonical [`SubscriptionState`] behind a `watch` channel. Every
//! transition is a single synchronous write under the channel's lock, so a
//! reader never sees a customer record paired with a stale plan or
//! subscription flag. Readers take snapshots without suspending and can
//! await change notifications through a [`StateWatcher`].

use crate::error::ErrorKind;
use crate::resolver::PlanResolver;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tiergate_types::{CustomerRecord, Offering, PlanTier};
use tokio::sync::watch;
use tracing::{debug, info};

/// Snapshot of the customer's subscription as seen by the engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SubscriptionState {
    pub is_loading: bool,
    pub has_active_subscription: bool,
    pub current_plan: PlanTier,
    pub customer_record: Option<CustomerRecord>,
    pub offerings: Option<Vec<Offering>>,
    pub error: Option<ErrorKind>,
    /// When the current customer record was applied.
    pub last_synced_at: Option<DateTime<Utc>>,
}

impl SubscriptionState {
    /// Checks the derived fields against the customer record.
    pub fn check_invariants(&self, resolver: &PlanResolver) -> Result<(), String> {
        match &self.customer_record {
            Some(record) => {
                let expected = resolver.resolve(record);
                if self.current_plan != expected {
                    return Err(format!(
                        "current_plan is {} but record resolves to {expected}",
                        self.current_plan
                    ));
                }
                if self.has_active_subscription != record.has_any_active() {
                    return Err(format!(
                        "has_active_subscription is {} but record has {} active entitlement(s)",
                        self.has_active_subscription,
                        record.active_count()
                    ));
                }
            }
            None => {
                if self.current_plan != PlanTier::Free || self.has_active_subscription {
                    return Err("derived fields set without a customer record".to_string());
                }
            }
        }
        if self.error == Some(ErrorKind::PurchaseCancelled) {
            return Err("cancellation stored as an error".to_string());
        }
        Ok(())
    }
}

/// Single source of truth for subscription state.
#[derive(Debug)]
pub struct EntitlementStore {
    resolver: PlanResolver,
    state: watch::Sender<SubscriptionState>,
}

impl EntitlementStore {
    /// Creates a store holding the all-free defaults.
    pub fn new(resolver: PlanResolver) -> Self {
        let (state, _) = watch::channel(SubscriptionState::default());
        Self { resolver, state }
    }

    /// Returns the resolver used to derive `current_plan`.
    pub fn resolver(&self) -> &PlanResolver {
        &self.resolver
    }

    /// Replaces the customer record and recomputes the plan and subscription
    /// flag in one write. Concurrent writers are applied in completion order.
    /// Returns the resolved plan.
    pub fn apply_customer_record(&self, record: CustomerRecord) -> PlanTier {
        let plan = self.resolver.resolve(&record);
        let has_active = record.has_any_active();
        let mut previous = plan;

        self.state.send_modify(|state| {
            previous = state.current_plan;
            state.customer_record = Some(record);
            state.current_plan = plan;
            state.has_active_subscription = has_active;
            state.last_synced_at = Some(Utc::now());
        });

        if previous != plan {
            info!("plan changed: {previous} -> {plan}");
        } else {
            debug!("customer record applied, plan unchanged ({plan})");
        }
        plan
    }

    /// Marks the start of an asynchronous operation: loading on, error
    /// cleared.
    pub fn begin_operation(&self) {
        self.state.send_modify(|state| {
            state.is_loading = true;
            state.error = None;
        });
    }

    pub fn set_loading(&self, loading: bool) {
        self.state.send_if_modified(|state| {
            let changed = state.is_loading != loading;
            state.is_loading = loading;
            changed
        });
    }

    /// Sets or clears the error. A cancellation is not a degraded state and
    /// is ignored, leaving any stored error as it was.
    pub fn set_error(&self, error: Option<ErrorKind>) {
        if error.as_ref().is_some_and(ErrorKind::is_cancellation) {
            return;
        }
        self.state.send_modify(|state| state.error = error);
    }

    pub fn set_offerings(&self, offerings: Vec<Offering>) {
        self.state
            .send_modify(|state| state.offerings = Some(offerings));
    }

    /// Returns to the all-free defaults. `is_loading` is kept: it tracks
    /// work still in flight, not customer data.
    pub fn reset(&self) {
        self.state.send_modify(|state| {
            *state = SubscriptionState {
                is_loading: state.is_loading,
                ..SubscriptionState::default()
            };
        });
        info!("subscription state reset");
    }

    /// Drops the customer record and its derived plan, keeping offerings and
    /// loading state. Used while the customer identity is being resynced.
    pub fn clear_customer_record(&self) {
        self.state.send_modify(|state| {
            state.customer_record = None;
            state.current_plan = PlanTier::Free;
            state.has_active_subscription = false;
            state.last_synced_at = None;
        });
        debug!("customer record cleared pending resync");
    }

    /// Returns a copy of the current state.
    pub fn snapshot(&self) -> SubscriptionState {
        self.state.borrow().clone()
    }

    /// Returns the current plan.
    pub fn current_plan(&self) -> PlanTier {
        self.state.borrow().current_plan
    }

    /// Returns a read-only handle that observes state changes.
    pub fn watch(&self) -> StateWatcher {
        StateWatcher {
            rx: self.state.subscribe(),
        }
    }
}

/// Read-only view of the store.
#[derive(Debug, Clone)]
pub struct StateWatcher {
    rx: watch::Receiver<SubscriptionState>,
}

impl StateWatcher {
    /// Returns a copy of the current state without waiting.
    pub fn snapshot(&self) -> SubscriptionState {
        self.rx.borrow().clone()
    }

    /// Returns the current plan without waiting.
    pub fn current_plan(&self) -> PlanTier {
        self.rx.borrow().current_plan
    }

    /// Waits for the next transition and returns the new state. Returns
    /// `None` once the store is gone.
    pub async fn changed(&mut self) -> Option<SubscriptionState> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }
}
