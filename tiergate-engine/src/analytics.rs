//! Analytics sink seam.
//!
//! Events are fire-and-forget: a failing sink is logged and otherwise
//! ignored, and never changes the outcome of the operation that emitted it.

use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tiergate_types::PlanTier;
use tracing::debug;

/// Names of the events the engine emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventName {
    PurchaseStarted,
    PurchaseCompleted,
    PurchaseCancelled,
    PurchaseFailed,
    RestoreStarted,
    RestoreCompleted,
    RestoreFailed,
    PaywallShown,
}

impl EventName {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::PurchaseStarted => "purchase_started",
            Self::PurchaseCompleted => "purchase_completed",
            Self::PurchaseCancelled => "purchase_cancelled",
            Self::PurchaseFailed => "purchase_failed",
            Self::RestoreStarted => "restore_started",
            Self::RestoreCompleted => "restore_completed",
            Self::RestoreFailed => "restore_failed",
            Self::PaywallShown => "paywall_shown",
        }
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One analytics record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalyticsEvent {
    pub event_name: EventName,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan_type: Option<PlanTier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl AnalyticsEvent {
    pub fn new(event_name: EventName) -> Self {
        Self {
            event_name,
            plan_type: None,
            error_message: None,
        }
    }

    #[must_use]
    pub fn with_plan(mut self, plan: PlanTier) -> Self {
        self.plan_type = Some(plan);
        self
    }

    #[must_use]
    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }
}

/// Destination for analytics events.
pub trait AnalyticsSink: Send + Sync {
    fn track(&self, event: &AnalyticsEvent) -> anyhow::Result<()>;
}

/// Sink that drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAnalytics;

impl AnalyticsSink for NoopAnalytics {
    fn track(&self, _event: &AnalyticsEvent) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Sends `event` to `sink`, swallowing failures.
pub(crate) fn emit(sink: &Arc<dyn AnalyticsSink>, event: AnalyticsEvent) {
    if let Err(e) = sink.track(&event) {
        debug!("analytics event {} dropped: {e:#}", event.event_name);
    }
}
