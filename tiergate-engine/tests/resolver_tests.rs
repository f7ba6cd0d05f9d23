use pretty_assertions::assert_eq;
use proptest::prelude::*;
use proptest::sample::subsequence;
use tiergate_engine::{EntitlementIds, PlanResolver};
use tiergate_types::{CustomerRecord, EntitlementId, PlanTier};

fn resolver() -> PlanResolver {
    PlanResolver::default()
}

#[test]
fn empty_record_is_free() {
    assert_eq!(resolver().resolve(&CustomerRecord::empty()), PlanTier::Free);
}

#[test]
fn single_entitlements_resolve_to_their_tier() {
    assert_eq!(resolver().resolve(&CustomerRecord::new(["basic"])), PlanTier::Basic);
    assert_eq!(resolver().resolve(&CustomerRecord::new(["pro"])), PlanTier::Pro);
}

#[test]
fn pro_beats_basic() {
    let record = CustomerRecord::new(["basic", "pro"]);
    assert_eq!(resolver().resolve(&record), PlanTier::Pro);
}

#[test]
fn unknown_entitlements_are_ignored() {
    let record = CustomerRecord::new(["legacy_lifetime", "promo"]);
    assert_eq!(resolver().resolve(&record), PlanTier::Free);
}

#[test]
fn custom_ids_are_honored() {
    let resolver = PlanResolver::new(EntitlementIds {
        pro: EntitlementId::new("premium_plus"),
        basic: EntitlementId::new("premium"),
    });
    assert_eq!(resolver.resolve(&CustomerRecord::new(["pro"])), PlanTier::Free);
    assert_eq!(resolver.resolve(&CustomerRecord::new(["premium"])), PlanTier::Basic);
    assert_eq!(
        resolver.resolve(&CustomerRecord::new(["premium", "premium_plus"])),
        PlanTier::Pro
    );
}

#[test]
fn entitlement_for_paid_tiers_only() {
    let resolver = resolver();
    assert_eq!(resolver.entitlement_for(PlanTier::Free), None);
    assert_eq!(
        resolver.entitlement_for(PlanTier::Basic),
        Some(&EntitlementId::new("basic"))
    );
    assert_eq!(
        resolver.entitlement_for(PlanTier::Pro),
        Some(&EntitlementId::new("pro"))
    );
}

#[test]
fn tier_of_single_entitlement() {
    let resolver = resolver();
    assert_eq!(resolver.tier_of(&EntitlementId::new("pro")), PlanTier::Pro);
    assert_eq!(resolver.tier_of(&EntitlementId::new("other")), PlanTier::Free);
}

const POOL: [&str; 5] = ["pro", "basic", "trial", "promo", "legacy"];

proptest! {
    #[test]
    fn resolution_ignores_entitlement_order(
        ids in subsequence(POOL.to_vec(), 0..=POOL.len()).prop_shuffle()
    ) {
        let forward = CustomerRecord::new(ids.iter().copied());
        let reversed = CustomerRecord::new(ids.iter().rev().copied());
        prop_assert_eq!(resolver().resolve(&forward), resolver().resolve(&reversed));
    }

    #[test]
    fn resolution_follows_fixed_priority(
        ids in subsequence(POOL.to_vec(), 0..=POOL.len())
    ) {
        let expected = if ids.contains(&"pro") {
            PlanTier::Pro
        } else if ids.contains(&"basic") {
            PlanTier::Basic
        } else {
            PlanTier::Free
        };
        prop_assert_eq!(resolver().resolve(&CustomerRecord::new(ids)), expected);
    }

    #[test]
    fn adding_an_entitlement_never_lowers_the_tier(
        ids in subsequence(POOL.to_vec(), 0..POOL.len()),
        extra in proptest::sample::select(POOL.to_vec()),
    ) {
        let before = resolver().resolve(&CustomerRecord::new(ids.iter().copied()));
        let after = resolver().resolve(
            &CustomerRecord::new(ids.iter().copied().chain(std::iter::once(extra))),
        );
        prop_assert!(after >= before);
    }
}
