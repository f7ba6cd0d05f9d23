mod common;

use common::{RecordingAnalytics, RecordingPaywall, init_tracing};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use tiergate_engine::usage::{is_near_limit, usage_percentage, within_limit};
use tiergate_engine::{
    DEFAULT_NEAR_LIMIT_PERCENT, EntitlementStore, EventName, PaywallTrigger, PlanResolver,
    UsageLimitTracker,
};
use tiergate_types::{CustomerRecord, PlanTier, UsageLimits};

#[test]
fn percentage_on_free_tier() {
    assert_eq!(usage_percentage(PlanTier::Free, 5, 10), 50.0);
    assert_eq!(usage_percentage(PlanTier::Free, 0, 10), 0.0);
    assert_eq!(usage_percentage(PlanTier::Free, 10, 10), 100.0);
}

#[test]
fn percentage_is_zero_on_paid_tiers() {
    assert_eq!(usage_percentage(PlanTier::Basic, 5, 10), 0.0);
    assert_eq!(usage_percentage(PlanTier::Pro, 5, 10), 0.0);
    assert_eq!(usage_percentage(PlanTier::Pro, 50, 10), 0.0);
}

#[test]
fn percentage_is_clamped() {
    assert_eq!(usage_percentage(PlanTier::Free, 25, 10), 100.0);
}

#[test]
fn zero_limit_counts_as_full() {
    assert_eq!(usage_percentage(PlanTier::Free, 0, 0), 100.0);
    assert!(!within_limit(PlanTier::Free, 0, 0));
    assert!(within_limit(PlanTier::Basic, 0, 0));
}

#[test]
fn near_limit_threshold() {
    assert!(!is_near_limit(PlanTier::Free, 7, 10, DEFAULT_NEAR_LIMIT_PERCENT));
    assert!(is_near_limit(PlanTier::Free, 8, 10, DEFAULT_NEAR_LIMIT_PERCENT));
    assert!(!is_near_limit(PlanTier::Basic, 10, 10, DEFAULT_NEAR_LIMIT_PERCENT));
}

#[test]
fn within_limit_only_binds_free() {
    assert!(within_limit(PlanTier::Free, 2, 3));
    assert!(!within_limit(PlanTier::Free, 3, 3));
    assert!(within_limit(PlanTier::Basic, 300, 3));
    assert!(within_limit(PlanTier::Pro, 300, 3));
}

struct Fixture {
    store: EntitlementStore,
    paywall: Arc<RecordingPaywall>,
    analytics: Arc<RecordingAnalytics>,
    tracker: UsageLimitTracker,
}

fn fixture() -> Fixture {
    init_tracing();
    let store = EntitlementStore::new(PlanResolver::default());
    let paywall = Arc::new(RecordingPaywall::default());
    let analytics = Arc::new(RecordingAnalytics::default());
    let tracker = UsageLimitTracker::new(
        store.watch(),
        UsageLimits::new().with_limit("projects", 3),
        DEFAULT_NEAR_LIMIT_PERCENT,
        paywall.clone(),
        analytics.clone(),
    );
    Fixture {
        store,
        paywall,
        analytics,
        tracker,
    }
}

#[test]
fn check_limit_allows_under_limit_without_side_effects() {
    let f = fixture();
    assert!(f.tracker.check_limit(2, 3));
    assert!(f.paywall.shown().is_empty());
    assert!(f.analytics.events().is_empty());
}

#[test]
fn check_limit_at_limit_shows_paywall() {
    let f = fixture();
    assert!(!f.tracker.check_limit(3, 3));

    assert_eq!(
        f.paywall.shown(),
        vec![PaywallTrigger {
            counter: None,
            used: 3,
            limit: 3,
        }]
    );
    let events = f.analytics.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_name, EventName::PaywallShown);
    assert_eq!(events[0].plan_type, Some(PlanTier::Free));
}

#[test]
fn paid_tier_is_never_blocked() {
    let f = fixture();
    f.store.apply_customer_record(CustomerRecord::new(["basic"]));

    assert!(f.tracker.check_limit(100, 3));
    assert_eq!(f.tracker.usage_percentage(5, 10), 0.0);
    assert!(f.paywall.shown().is_empty());
}

#[test]
fn tracker_follows_store_changes() {
    let f = fixture();
    assert_eq!(f.tracker.usage_percentage(5, 10), 50.0);
    assert!(f.tracker.is_near_limit(9, 10));

    f.store.apply_customer_record(CustomerRecord::new(["pro"]));
    assert_eq!(f.tracker.usage_percentage(5, 10), 0.0);
    assert!(!f.tracker.is_near_limit(9, 10));
}

#[test]
fn counters_use_configured_limits() {
    let f = fixture();

    assert!(f.tracker.check_counter("projects", 2));
    assert!(!f.tracker.check_counter("projects", 3));
    assert!(f.tracker.check_counter("unconfigured", 1_000));

    assert_eq!(f.paywall.shown()[0].counter.as_deref(), Some("projects"));
    assert_eq!(f.tracker.counter_percentage("unconfigured", 5), 0.0);
    assert!(f.tracker.is_counter_near_limit("projects", 3));
    assert!(!f.tracker.is_counter_near_limit("unconfigured", 3));
}
