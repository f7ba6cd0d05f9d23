//! Free-tier usage limits.
//!
//! Limits only apply on the free tier; paid tiers are unbounded. The free
//! functions are pure. [`UsageLimitTracker`] reads the current tier from the
//! store and owns the one side effect in this module: showing the paywall
//! when [`UsageLimitTracker::check_limit`] blocks an action.

use crate::analytics::{AnalyticsEvent, AnalyticsSink, EventName, emit};
use crate::store::StateWatcher;
use std::sync::Arc;
use tiergate_types::{PlanTier, UsageLimits};
use tracing::info;

/// Why the paywall is being shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaywallTrigger {
    /// Counter that hit its limit, when the check was made by key.
    pub counter: Option<String>,
    pub used: u64,
    pub limit: u64,
}

/// Presents the upgrade paywall.
pub trait PaywallPresenter: Send + Sync {
    fn show_paywall(&self, trigger: &PaywallTrigger);
}

/// Percentage of `limit` consumed, clamped to `[0, 100]`. Always `0` off the
/// free tier. A zero limit counts as fully used.
#[must_use]
pub fn usage_percentage(plan: PlanTier, used: u64, limit: u64) -> f64 {
    if plan != PlanTier::Free {
        return 0.0;
    }
    if limit == 0 {
        return 100.0;
    }
    (used as f64 / limit as f64 * 100.0).clamp(0.0, 100.0)
}

/// Returns true once usage reaches `threshold` percent.
#[must_use]
pub fn is_near_limit(plan: PlanTier, used: u64, limit: u64, threshold: f64) -> bool {
    plan == PlanTier::Free && usage_percentage(plan, used, limit) >= threshold
}

/// Returns true if another unit may be consumed. Pure; never shows the
/// paywall.
#[must_use]
pub fn within_limit(plan: PlanTier, used: u64, limit: u64) -> bool {
    plan != PlanTier::Free || used < limit
}

/// Usage gating over the store's current tier.
pub struct UsageLimitTracker {
    state: StateWatcher,
    limits: UsageLimits,
    near_limit_percent: f64,
    paywall: Arc<dyn PaywallPresenter>,
    analytics: Arc<dyn AnalyticsSink>,
}

impl UsageLimitTracker {
    pub fn new(
        state: StateWatcher,
        limits: UsageLimits,
        near_limit_percent: f64,
        paywall: Arc<dyn PaywallPresenter>,
        analytics: Arc<dyn AnalyticsSink>,
    ) -> Self {
        Self {
            state,
            limits,
            near_limit_percent,
            paywall,
            analytics,
        }
    }

    pub fn usage_percentage(&self, used: u64, limit: u64) -> f64 {
        usage_percentage(self.state.current_plan(), used, limit)
    }

    pub fn is_near_limit(&self, used: u64, limit: u64) -> bool {
        is_near_limit(
            self.state.current_plan(),
            used,
            limit,
            self.near_limit_percent,
        )
    }

    /// Returns true if the action is allowed.
    ///
    /// Side effect: when the free tier is at or over `limit`, shows the
    /// paywall and emits `paywall_shown` before returning false.
    pub fn check_limit(&self, used: u64, limit: u64) -> bool {
        self.check(None, used, limit)
    }

    /// Like [`check_limit`](Self::check_limit) with the limit looked up by
    /// counter key. Counters without a configured limit are always allowed.
    pub fn check_counter(&self, counter: &str, used: u64) -> bool {
        match self.limits.limit(counter) {
            Some(limit) => self.check(Some(counter), used, limit),
            None => true,
        }
    }

    /// Usage percentage for a configured counter; `0` if unconfigured.
    pub fn counter_percentage(&self, counter: &str, used: u64) -> f64 {
        self.limits
            .limit(counter)
            .map_or(0.0, |limit| self.usage_percentage(used, limit))
    }

    /// Near-limit signal for a configured counter; false if unconfigured.
    pub fn is_counter_near_limit(&self, counter: &str, used: u64) -> bool {
        self.limits
            .limit(counter)
            .is_some_and(|limit| self.is_near_limit(used, limit))
    }

    fn check(&self, counter: Option<&str>, used: u64, limit: u64) -> bool {
        let plan = self.state.current_plan();
        if within_limit(plan, used, limit) {
            return true;
        }

        info!(
            counter = counter.unwrap_or("-"),
            used, limit, "free-tier limit reached, showing paywall"
        );
        self.paywall.show_paywall(&PaywallTrigger {
            counter: counter.map(str::to_string),
            used,
            limit,
        });
        emit(
            &self.analytics,
            AnalyticsEvent::new(EventName::PaywallShown).with_plan(plan),
        );
        false
    }
}
