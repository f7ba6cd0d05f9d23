//! Purchase and restore orchestration.
//!
//! Each attempt runs through a short state machine:
//!
//! ```text
//! Idle → InFlight → { Succeeded | Cancelled | Failed }
//! ```
//!
//! Only one attempt per [`OperationKind`] may be in flight; a second call is
//! rejected with [`ErrorKind::ConcurrentOperation`] without touching the
//! store. Provider errors are mapped onto [`ErrorKind`] here and never
//! returned raw. `is_loading` is cleared when the attempt guard drops, which
//! covers every branch including a caller dropping the future mid-flight.

use crate::analytics::{AnalyticsEvent, AnalyticsSink, EventName, emit};
use crate::error::ErrorKind;
use crate::store::EntitlementStore;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use tiergate_provider::ProviderAdapter;
use tiergate_types::{AttemptId, CustomerRecord, Offering, PlanTier};
use tracing::{info, warn};

/// The two orchestrated operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Purchase,
    Restore,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Purchase => f.write_str("purchase"),
            Self::Restore => f.write_str("restore"),
        }
    }
}

/// State of the latest attempt of one operation kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AttemptState {
    #[default]
    Idle,
    InFlight,
    Succeeded,
    Cancelled,
    Failed,
}

impl AttemptState {
    /// Returns true for `Succeeded`, `Cancelled` and `Failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Cancelled | Self::Failed)
    }

    /// Returns whether `next` is a legal successor. A new attempt may start
    /// from `Idle` or any terminal state; an in-flight attempt may only end.
    pub fn can_transition_to(&self, next: AttemptState) -> bool {
        match next {
            Self::InFlight => *self != Self::InFlight,
            Self::Succeeded | Self::Cancelled | Self::Failed => *self == Self::InFlight,
            Self::Idle => false,
        }
    }
}

/// Result of a purchase call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PurchaseOutcome {
    Succeeded {
        plan: PlanTier,
        record: CustomerRecord,
    },
    /// The user dismissed the purchase sheet. Not an error.
    Cancelled,
    Failed(ErrorKind),
}

impl PurchaseOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }

    pub fn error(&self) -> Option<&ErrorKind> {
        match self {
            Self::Failed(kind) => Some(kind),
            _ => None,
        }
    }
}

/// Result of a restore call. Restores cannot be cancelled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreOutcome {
    Succeeded {
        plan: PlanTier,
        record: CustomerRecord,
    },
    Failed(ErrorKind),
}

impl RestoreOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }

    pub fn error(&self) -> Option<&ErrorKind> {
        match self {
            Self::Failed(kind) => Some(kind),
            Self::Succeeded { .. } => None,
        }
    }
}

#[derive(Debug, Default)]
struct Attempts {
    purchase: AttemptState,
    restore: AttemptState,
}

impl Attempts {
    fn slot(&mut self, kind: OperationKind) -> &mut AttemptState {
        match kind {
            OperationKind::Purchase => &mut self.purchase,
            OperationKind::Restore => &mut self.restore,
        }
    }

    fn any_in_flight(&self) -> bool {
        self.purchase == AttemptState::InFlight || self.restore == AttemptState::InFlight
    }
}

/// Drives purchases and restores and feeds results into the store.
pub struct Orchestrator {
    adapter: Arc<ProviderAdapter>,
    store: Arc<EntitlementStore>,
    analytics: Arc<dyn AnalyticsSink>,
    attempts: Mutex<Attempts>,
}

impl Orchestrator {
    pub fn new(
        adapter: Arc<ProviderAdapter>,
        store: Arc<EntitlementStore>,
        analytics: Arc<dyn AnalyticsSink>,
    ) -> Self {
        Self {
            adapter,
            store,
            analytics,
            attempts: Mutex::new(Attempts::default()),
        }
    }

    fn attempts(&self) -> MutexGuard<'_, Attempts> {
        self.attempts.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Returns the state of the latest attempt of `kind`.
    pub fn state(&self, kind: OperationKind) -> AttemptState {
        *self.attempts().slot(kind)
    }

    /// Returns whether an attempt of `kind` is in flight.
    pub fn is_in_flight(&self, kind: OperationKind) -> bool {
        self.state(kind) == AttemptState::InFlight
    }

    /// Returns whether any attempt is in flight.
    pub fn any_in_flight(&self) -> bool {
        self.attempts().any_in_flight()
    }

    fn try_begin(&self, kind: OperationKind) -> Option<AttemptGuard<'_>> {
        let mut attempts = self.attempts();
        let slot = attempts.slot(kind);
        if !slot.can_transition_to(AttemptState::InFlight) {
            return None;
        }
        *slot = AttemptState::InFlight;
        Some(AttemptGuard {
            orchestrator: self,
            kind,
            id: AttemptId::new(),
            terminal: None,
        })
    }

    /// Purchases `offering`.
    ///
    /// Success merges the new customer record into the store. Cancellation
    /// leaves the store's error untouched. Any other failure sets the error
    /// and leaves the plan as it was.
    pub async fn purchase(&self, offering: &Offering) -> PurchaseOutcome {
        let Some(mut attempt) = self.try_begin(OperationKind::Purchase) else {
            warn!("purchase of {} rejected: another purchase is in flight", offering.id);
            return PurchaseOutcome::Failed(ErrorKind::ConcurrentOperation);
        };

        info!(attempt = %attempt.id, offering = %offering.id, "purchase started");
        self.store.begin_operation();
        let mut started = AnalyticsEvent::new(EventName::PurchaseStarted);
        if let Some(entitlement) = &offering.entitlement {
            started = started.with_plan(self.store.resolver().tier_of(entitlement));
        }
        emit(&self.analytics, started);

        match self.adapter.purchase(offering).await {
            Ok(record) => {
                let plan = self.store.apply_customer_record(record.clone());
                emit(
                    &self.analytics,
                    AnalyticsEvent::new(EventName::PurchaseCompleted).with_plan(plan),
                );
                info!(attempt = %attempt.id, "purchase succeeded, plan is {plan}");
                attempt.finish(AttemptState::Succeeded);
                PurchaseOutcome::Succeeded { plan, record }
            }
            Err(err) => match ErrorKind::from_purchase(err) {
                ErrorKind::PurchaseCancelled => {
                    emit(
                        &self.analytics,
                        AnalyticsEvent::new(EventName::PurchaseCancelled),
                    );
                    info!(attempt = %attempt.id, "purchase cancelled by user");
                    attempt.finish(AttemptState::Cancelled);
                    PurchaseOutcome::Cancelled
                }
                kind => {
                    self.store.set_error(Some(kind.clone()));
                    emit(
                        &self.analytics,
                        AnalyticsEvent::new(EventName::PurchaseFailed)
                            .with_error(kind.user_message()),
                    );
                    warn!(attempt = %attempt.id, "purchase failed: {kind:?}");
                    attempt.finish(AttemptState::Failed);
                    PurchaseOutcome::Failed(kind)
                }
            },
        }
    }

    /// Restores previous purchases.
    pub async fn restore(&self) -> RestoreOutcome {
        let Some(mut attempt) = self.try_begin(OperationKind::Restore) else {
            warn!("restore rejected: another restore is in flight");
            return RestoreOutcome::Failed(ErrorKind::ConcurrentOperation);
        };

        info!(attempt = %attempt.id, "restore started");
        self.store.begin_operation();
        emit(&self.analytics, AnalyticsEvent::new(EventName::RestoreStarted));

        match self.adapter.restore().await {
            Ok(record) => {
                let plan = self.store.apply_customer_record(record.clone());
                emit(
                    &self.analytics,
                    AnalyticsEvent::new(EventName::RestoreCompleted).with_plan(plan),
                );
                info!(attempt = %attempt.id, "restore succeeded, plan is {plan}");
                attempt.finish(AttemptState::Succeeded);
                RestoreOutcome::Succeeded { plan, record }
            }
            Err(err) => {
                let kind = ErrorKind::from_restore(err);
                self.store.set_error(Some(kind.clone()));
                emit(
                    &self.analytics,
                    AnalyticsEvent::new(EventName::RestoreFailed).with_error(kind.user_message()),
                );
                warn!(attempt = %attempt.id, "restore failed: {kind:?}");
                attempt.finish(AttemptState::Failed);
                RestoreOutcome::Failed(kind)
            }
        }
    }
}

impl fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("attempts", &*self.attempts())
            .finish_non_exhaustive()
    }
}

/// Marks one attempt in flight. Dropping it records the terminal state and
/// clears `is_loading` once no other attempt is running.
struct AttemptGuard<'a> {
    orchestrator: &'a Orchestrator,
    kind: OperationKind,
    id: AttemptId,
    terminal: Option<AttemptState>,
}

impl AttemptGuard<'_> {
    fn finish(&mut self, state: AttemptState) {
        self.terminal = Some(state);
    }
}

impl Drop for AttemptGuard<'_> {
    fn drop(&mut self) {
        let terminal = self.terminal.unwrap_or_else(|| {
            warn!(attempt = %self.id, "{} attempt abandoned before completion", self.kind);
            AttemptState::Failed
        });

        let still_loading = {
            let mut attempts = self.orchestrator.attempts();
            *attempts.slot(self.kind) = terminal;
            attempts.any_in_flight()
        };
        self.orchestrator.store.set_loading(still_loading);
    }
}
