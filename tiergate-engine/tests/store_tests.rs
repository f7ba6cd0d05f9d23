mod common;

use common::{basic_monthly, init_tracing};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use proptest::sample::subsequence;
use tiergate_engine::{EntitlementStore, ErrorKind, PlanResolver, SubscriptionState};
use tiergate_types::{CustomerRecord, PlanTier};

fn store() -> EntitlementStore {
    init_tracing();
    EntitlementStore::new(PlanResolver::default())
}

#[test]
fn starts_at_free_defaults() {
    let store = store();
    let state = store.snapshot();
    assert_eq!(state, SubscriptionState::default());
    assert_eq!(state.current_plan, PlanTier::Free);
    assert!(!state.is_loading);
    assert!(state.customer_record.is_none());
    assert!(state.check_invariants(store.resolver()).is_ok());
}

#[test]
fn apply_record_updates_derived_fields_together() {
    let store = store();
    let plan = store.apply_customer_record(CustomerRecord::new(["basic", "pro"]));

    let state = store.snapshot();
    assert_eq!(plan, PlanTier::Pro);
    assert_eq!(state.current_plan, PlanTier::Pro);
    assert!(state.has_active_subscription);
    assert_eq!(state.customer_record, Some(CustomerRecord::new(["basic", "pro"])));
    assert!(state.last_synced_at.is_some());
    assert!(state.check_invariants(store.resolver()).is_ok());
}

#[test]
fn unknown_active_entitlement_is_active_but_free() {
    let store = store();
    store.apply_customer_record(CustomerRecord::new(["promo"]));

    let state = store.snapshot();
    assert_eq!(state.current_plan, PlanTier::Free);
    assert!(state.has_active_subscription);
    assert!(state.check_invariants(store.resolver()).is_ok());
}

#[test]
fn last_writer_wins() {
    let store = store();
    store.apply_customer_record(CustomerRecord::new(["pro"]));
    store.apply_customer_record(CustomerRecord::new(["basic"]));
    assert_eq!(store.current_plan(), PlanTier::Basic);
}

#[test]
fn begin_operation_sets_loading_and_clears_error() {
    let store = store();
    store.set_error(Some(ErrorKind::NetworkOrStore));
    store.begin_operation();

    let state = store.snapshot();
    assert!(state.is_loading);
    assert_eq!(state.error, None);
}

#[test]
fn cancellation_is_never_stored() {
    let store = store();
    store.set_error(Some(ErrorKind::PurchaseCancelled));
    assert_eq!(store.snapshot().error, None);
}

#[test]
fn cancellation_leaves_existing_error_in_place() {
    let store = store();
    store.set_error(Some(ErrorKind::NetworkOrStore));
    store.set_error(Some(ErrorKind::PurchaseCancelled));
    assert_eq!(store.snapshot().error, Some(ErrorKind::NetworkOrStore));
}

#[test]
fn reset_keeps_loading_flag() {
    let store = store();
    store.apply_customer_record(CustomerRecord::new(["pro"]));
    store.begin_operation();

    store.reset();

    let state = store.snapshot();
    assert!(state.is_loading);
    assert_eq!(state.current_plan, PlanTier::Free);
    assert_eq!(state.customer_record, None);
}

#[test]
fn clear_customer_record_drops_plan_but_keeps_offerings() {
    let store = store();
    store.apply_customer_record(CustomerRecord::new(["pro"]));
    store.set_offerings(vec![basic_monthly()]);

    store.clear_customer_record();

    let state = store.snapshot();
    assert_eq!(state.current_plan, PlanTier::Free);
    assert!(!state.has_active_subscription);
    assert_eq!(state.customer_record, None);
    assert_eq!(state.last_synced_at, None);
    assert_eq!(state.offerings, Some(vec![basic_monthly()]));
    assert!(state.check_invariants(store.resolver()).is_ok());
}

#[test]
fn reset_returns_to_defaults() {
    let store = store();
    store.apply_customer_record(CustomerRecord::new(["pro"]));
    store.set_offerings(vec![basic_monthly()]);
    store.set_error(Some(ErrorKind::RestoreFailed));

    store.reset();
    assert_eq!(store.snapshot(), SubscriptionState::default());
}

#[test]
fn invariant_check_flags_a_stale_plan() {
    let store = store();
    let mut state = SubscriptionState {
        customer_record: Some(CustomerRecord::new(["pro"])),
        current_plan: PlanTier::Basic,
        has_active_subscription: true,
        ..SubscriptionState::default()
    };
    assert!(state.check_invariants(store.resolver()).is_err());

    state.current_plan = PlanTier::Pro;
    assert!(state.check_invariants(store.resolver()).is_ok());
}

#[tokio::test]
async fn watchers_see_each_transition() {
    let store = store();
    let mut watcher = store.watch();

    store.apply_customer_record(CustomerRecord::new(["basic"]));
    let state = watcher.changed().await.expect("store alive");
    assert_eq!(state.current_plan, PlanTier::Basic);
    assert_eq!(watcher.current_plan(), PlanTier::Basic);

    store.reset();
    let state = watcher.changed().await.expect("store alive");
    assert_eq!(state.current_plan, PlanTier::Free);
}

#[tokio::test]
async fn watcher_returns_none_once_store_is_dropped() {
    let store = store();
    let mut watcher = store.watch();
    drop(store);
    assert!(watcher.changed().await.is_none());
}

#[tokio::test]
async fn set_loading_without_change_does_not_notify() {
    let store = store();
    let mut watcher = store.watch();

    store.set_loading(false);
    let pending =
        tokio::time::timeout(std::time::Duration::from_millis(20), watcher.changed()).await;
    assert!(pending.is_err());
}

// ── Property tests ───────────────────────────────────────────────

#[derive(Debug, Clone)]
enum Transition {
    Apply(Vec<&'static str>),
    Begin,
    Loading(bool),
    Error(Option<ErrorKind>),
    Offerings,
    Clear,
    Reset,
}

fn error_strategy() -> impl Strategy<Value = Option<ErrorKind>> {
    prop_oneof![
        Just(None),
        Just(Some(ErrorKind::NetworkOrStore)),
        Just(Some(ErrorKind::PurchaseCancelled)),
        Just(Some(ErrorKind::RestoreFailed)),
        Just(Some(ErrorKind::Unknown(String::new()))),
    ]
}

fn transition_strategy() -> impl Strategy<Value = Transition> {
    prop_oneof![
        4 => subsequence(vec!["pro", "basic", "promo"], 0..=3).prop_map(Transition::Apply),
        1 => Just(Transition::Begin),
        1 => any::<bool>().prop_map(Transition::Loading),
        2 => error_strategy().prop_map(Transition::Error),
        1 => Just(Transition::Offerings),
        1 => Just(Transition::Clear),
        1 => Just(Transition::Reset),
    ]
}

proptest! {
    #[test]
    fn invariants_hold_after_any_transition_sequence(
        transitions in prop::collection::vec(transition_strategy(), 0..40)
    ) {
        let store = EntitlementStore::new(PlanResolver::default());
        for transition in transitions {
            match transition {
                Transition::Apply(ids) => {
                    store.apply_customer_record(CustomerRecord::new(ids));
                }
                Transition::Begin => store.begin_operation(),
                Transition::Loading(loading) => store.set_loading(loading),
                Transition::Error(error) => store.set_error(error),
                Transition::Offerings => store.set_offerings(vec![basic_monthly()]),
                Transition::Clear => store.clear_customer_record(),
                Transition::Reset => store.reset(),
            }
            let state = store.snapshot();
            prop_assert!(state.check_invariants(store.resolver()).is_ok(), "{:?}", state);
        }
    }

    #[test]
    fn applied_plan_matches_resolver(ids in subsequence(vec!["pro", "basic", "promo"], 0..=3)) {
        let store = EntitlementStore::new(PlanResolver::default());
        let record = CustomerRecord::new(ids);
        let expected = store.resolver().resolve(&record);
        prop_assert_eq!(store.apply_customer_record(record), expected);
        prop_assert_eq!(store.current_plan(), expected);
    }
}
