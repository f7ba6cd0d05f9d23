//! Shared test helpers for engine tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tiergate_engine::{
    AnalyticsEvent, AnalyticsSink, Engine, EngineConfig, EntitlementStore, EventName,
    Orchestrator, PaywallPresenter, PaywallTrigger, PlanResolver, StateWatcher,
    SubscriptionState,
};
use tiergate_provider::mock::MockBillingSdk;
use tiergate_provider::{ProviderAdapter, ProviderConfig};
use tiergate_types::{FeatureAccessMap, Offering, PlanTier, UsageLimits};

/// Installs a test subscriber honoring `RUST_LOG`. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Analytics sink that records every event.
#[derive(Default)]
pub struct RecordingAnalytics {
    events: Mutex<Vec<AnalyticsEvent>>,
}

impl RecordingAnalytics {
    pub fn events(&self) -> Vec<AnalyticsEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn names(&self) -> Vec<EventName> {
        self.events().into_iter().map(|e| e.event_name).collect()
    }
}

impl AnalyticsSink for RecordingAnalytics {
    fn track(&self, event: &AnalyticsEvent) -> anyhow::Result<()> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

/// Analytics sink that always fails.
pub struct FailingAnalytics;

impl AnalyticsSink for FailingAnalytics {
    fn track(&self, _event: &AnalyticsEvent) -> anyhow::Result<()> {
        anyhow::bail!("analytics backend offline")
    }
}

/// Paywall presenter that records every trigger.
#[derive(Default)]
pub struct RecordingPaywall {
    shown: Mutex<Vec<PaywallTrigger>>,
}

impl RecordingPaywall {
    pub fn shown(&self) -> Vec<PaywallTrigger> {
        self.shown.lock().unwrap().clone()
    }
}

impl PaywallPresenter for RecordingPaywall {
    fn show_paywall(&self, trigger: &PaywallTrigger) {
        self.shown.lock().unwrap().push(trigger.clone());
    }
}

pub fn basic_monthly() -> Offering {
    Offering::new("basic_monthly", "com.app.basic.monthly").granting("basic")
}

pub fn pro_monthly() -> Offering {
    Offering::new("pro_monthly", "com.app.pro.monthly").granting("pro")
}

/// Feature table used across tests: `export` on basic, `sync` on pro.
pub fn feature_map() -> FeatureAccessMap {
    FeatureAccessMap::new()
        .with_grant(PlanTier::Free, ["notes"])
        .with_grant(PlanTier::Basic, ["export"])
        .with_grant(PlanTier::Pro, ["sync"])
}

pub fn test_config() -> EngineConfig {
    EngineConfig {
        provider: ProviderConfig::new("test_key"),
        features: feature_map(),
        usage_limits: UsageLimits::new().with_limit("projects", 3),
        ..EngineConfig::default()
    }
}

/// Harness around an orchestrator over an initialized adapter.
pub struct OrchestratorHarness {
    pub sdk: Arc<MockBillingSdk>,
    pub store: Arc<EntitlementStore>,
    pub analytics: Arc<RecordingAnalytics>,
    pub orchestrator: Arc<Orchestrator>,
}

impl OrchestratorHarness {
    pub async fn new(sdk: MockBillingSdk) -> Self {
        init_tracing();
        let sdk = Arc::new(sdk);
        let adapter = Arc::new(ProviderAdapter::new(
            sdk.clone(),
            ProviderConfig::new("test_key"),
        ));
        adapter.initialize().await.expect("initialize");
        let store = Arc::new(EntitlementStore::new(PlanResolver::default()));
        let analytics = Arc::new(RecordingAnalytics::default());
        let orchestrator = Arc::new(Orchestrator::new(
            adapter,
            store.clone(),
            analytics.clone(),
        ));
        Self {
            sdk,
            store,
            analytics,
            orchestrator,
        }
    }
}

/// Harness around a full engine.
pub struct EngineHarness {
    pub sdk: Arc<MockBillingSdk>,
    pub analytics: Arc<RecordingAnalytics>,
    pub paywall: Arc<RecordingPaywall>,
    pub engine: Engine,
}

impl EngineHarness {
    pub fn new(sdk: MockBillingSdk) -> Self {
        Self::with_config(sdk, test_config())
    }

    pub fn with_config(sdk: MockBillingSdk, config: EngineConfig) -> Self {
        init_tracing();
        let sdk = Arc::new(sdk);
        let analytics = Arc::new(RecordingAnalytics::default());
        let paywall = Arc::new(RecordingPaywall::default());
        let engine = Engine::with_collaborators(
            sdk.clone(),
            config,
            analytics.clone(),
            paywall.clone(),
        );
        Self {
            sdk,
            analytics,
            paywall,
            engine,
        }
    }

    pub async fn ready(sdk: MockBillingSdk) -> Self {
        let harness = Self::new(sdk);
        harness.engine.initialize().await.expect("initialize");
        harness
    }
}

/// Yields to other tasks until `cond` holds, failing after a bounded number
/// of turns.
pub async fn yield_until<F>(cond: F)
where
    F: Fn() -> bool,
{
    for _ in 0..1_000 {
        if cond() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition never became true");
}

/// Waits until the watched state satisfies `pred`, failing after a second.
pub async fn wait_for<F>(watcher: &mut StateWatcher, pred: F) -> SubscriptionState
where
    F: Fn(&SubscriptionState) -> bool,
{
    let current = watcher.snapshot();
    if pred(&current) {
        return current;
    }
    tokio::time::timeout(Duration::from_secs(1), async {
        loop {
            let state = watcher.changed().await.expect("store dropped");
            if pred(&state) {
                return state;
            }
        }
    })
    .await
    .expect("state never reached the expected condition")
}
