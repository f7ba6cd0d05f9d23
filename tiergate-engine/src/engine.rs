//! Engine public surface.
//!
//! [`Engine`] wires the adapter, store, orchestrator and gate together and is
//! the only type UI code needs. It is a cheap `Clone` handle; all clones
//! share one store.
//!
//! Push updates and identity changes are delivered as [`EngineEvent`]s into a
//! single event loop task that owns their application to the store. Purchase
//! and restore completions write through the same synchronous store update,
//! so writers never interleave and the last to complete wins.

use crate::analytics::{AnalyticsSink, NoopAnalytics};
use crate::config::EngineConfig;
use crate::error::{EngineResult, ErrorKind};
use crate::gate;
use crate::orchestrator::{
    AttemptState, OperationKind, Orchestrator, PurchaseOutcome, RestoreOutcome,
};
use crate::resolver::PlanResolver;
use crate::store::{EntitlementStore, StateWatcher, SubscriptionState};
use crate::usage::{PaywallPresenter, PaywallTrigger, UsageLimitTracker};
use serde::Serialize;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use tiergate_provider::{BillingSdk, ProviderAdapter, Subscription};
use tiergate_types::{CustomerRecord, FeatureKey, Offering, PlanTier, UserId};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Messages processed by the engine event loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// The provider pushed a fresh customer record.
    CustomerUpdated(CustomerRecord),
    /// The identity provider reported a new current user.
    IdentityChanged(Option<UserId>),
}

/// Summary of the current plan for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanInfo {
    pub tier: PlanTier,
    pub name: String,
    pub rank: u8,
    pub has_active_subscription: bool,
    pub features: Vec<FeatureKey>,
}

/// Paywall presenter that only logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogPaywall;

impl PaywallPresenter for LogPaywall {
    fn show_paywall(&self, trigger: &PaywallTrigger) {
        info!(
            "paywall requested ({} of {} used)",
            trigger.used, trigger.limit
        );
    }
}

/// Listener registration and background tasks for one initialized lifetime.
struct EngineRuntime {
    events: mpsc::UnboundedSender<EngineEvent>,
    _subscription: Subscription,
    event_loop: JoinHandle<()>,
    identity: Option<JoinHandle<()>>,
}

impl Drop for EngineRuntime {
    fn drop(&mut self) {
        self.event_loop.abort();
        if let Some(identity) = self.identity.take() {
            identity.abort();
        }
    }
}

struct EngineInner {
    config: EngineConfig,
    adapter: Arc<ProviderAdapter>,
    store: Arc<EntitlementStore>,
    orchestrator: Arc<Orchestrator>,
    analytics: Arc<dyn AnalyticsSink>,
    paywall: Arc<dyn PaywallPresenter>,
    /// Serializes `initialize` calls.
    init_lock: tokio::sync::Mutex<()>,
    runtime: Mutex<Option<EngineRuntime>>,
}

/// The entitlement engine.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<EngineInner>,
}

impl Engine {
    /// Creates an engine with no analytics and a logging paywall.
    pub fn new(sdk: Arc<dyn BillingSdk>, config: EngineConfig) -> Self {
        Self::with_collaborators(sdk, config, Arc::new(NoopAnalytics), Arc::new(LogPaywall))
    }

    /// Creates an engine with the given analytics sink and paywall presenter.
    pub fn with_collaborators(
        sdk: Arc<dyn BillingSdk>,
        config: EngineConfig,
        analytics: Arc<dyn AnalyticsSink>,
        paywall: Arc<dyn PaywallPresenter>,
    ) -> Self {
        let adapter = Arc::new(ProviderAdapter::new(sdk, config.provider.clone()));
        let store = Arc::new(EntitlementStore::new(PlanResolver::new(
            config.entitlements.clone(),
        )));
        let orchestrator = Arc::new(Orchestrator::new(
            Arc::clone(&adapter),
            Arc::clone(&store),
            Arc::clone(&analytics),
        ));

        Self {
            inner: Arc::new(EngineInner {
                config,
                adapter,
                store,
                orchestrator,
                analytics,
                paywall,
                init_lock: tokio::sync::Mutex::new(()),
                runtime: Mutex::new(None),
            }),
        }
    }

    fn runtime(&self) -> MutexGuard<'_, Option<EngineRuntime>> {
        self.inner.runtime.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Returns the engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    /// Returns whether `initialize` has completed and the push listener is
    /// live.
    pub fn is_initialized(&self) -> bool {
        self.runtime().is_some()
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Initializes the provider, registers the push listener, and loads the
    /// customer record and offerings. Calling it again while initialized is
    /// a no-op. Concurrent calls run one at a time; the engine only reports
    /// itself initialized once the customer record has been applied.
    ///
    /// Offerings failing to load does not fail initialization.
    pub async fn initialize(&self) -> EngineResult<()> {
        let _guard = self.inner.init_lock.lock().await;
        if self.is_initialized() {
            debug!("engine already initialized");
            return Ok(());
        }

        self.inner.store.begin_operation();
        let result = match self.initialize_inner().await {
            Ok(runtime) => {
                *self.runtime() = Some(runtime);
                Ok(())
            }
            Err(kind) => {
                error!("engine initialization failed: {kind:?}");
                self.inner.store.set_error(Some(kind.clone()));
                Err(kind)
            }
        };
        self.finish_loading();
        result
    }

    /// Runs the startup sequence. The listener is registered before the
    /// first fetch so no push is missed; dropping the returned runtime on
    /// failure removes it again.
    async fn initialize_inner(&self) -> EngineResult<EngineRuntime> {
        let inner = &self.inner;
        inner
            .adapter
            .initialize()
            .await
            .map_err(|_| ErrorKind::Initialization)?;
        let runtime = self.start_runtime()?;

        let record = inner
            .adapter
            .get_customer_info()
            .await
            .map_err(ErrorKind::from_fetch)?;
        let plan = inner.store.apply_customer_record(record);

        match inner.adapter.get_offerings().await {
            Ok(offerings) => inner.store.set_offerings(offerings),
            Err(e) => warn!("offerings unavailable at startup: {e}"),
        }

        info!("engine initialized, plan is {plan}");
        Ok(runtime)
    }

    fn start_runtime(&self) -> EngineResult<EngineRuntime> {
        let (events, rx) = mpsc::unbounded_channel();
        let push = events.clone();
        let subscription = self
            .inner
            .adapter
            .subscribe(move |record| {
                if push.send(EngineEvent::CustomerUpdated(record)).is_err() {
                    debug!("push update arrived after shutdown, dropped");
                }
            })
            .map_err(ErrorKind::from_fetch)?;

        let event_loop = tokio::spawn(run_event_loop(
            Arc::clone(&self.inner.adapter),
            Arc::clone(&self.inner.store),
            Arc::clone(&self.inner.orchestrator),
            rx,
        ));

        Ok(EngineRuntime {
            events,
            _subscription: subscription,
            event_loop,
            identity: None,
        })
    }

    /// Removes the push listener and stops background tasks. The store keeps
    /// its last state; a later `initialize` starts a fresh runtime.
    pub fn shutdown(&self) {
        if self.runtime().take().is_some() {
            info!("engine shut down");
        }
    }

    /// Forwards identity changes into the event loop. Each change logs the
    /// provider in or out before the store is trusted again. The value
    /// current at the time of the call is treated as already synced.
    pub fn follow_identity(
        &self,
        mut identity: watch::Receiver<Option<UserId>>,
    ) -> EngineResult<()> {
        let mut runtime = self.runtime();
        let Some(runtime) = runtime.as_mut() else {
            return Err(ErrorKind::Initialization);
        };

        identity.mark_unchanged();
        let events = runtime.events.clone();
        let task = tokio::spawn(async move {
            while identity.changed().await.is_ok() {
                let user = identity.borrow_and_update().clone();
                if events.send(EngineEvent::IdentityChanged(user)).is_err() {
                    break;
                }
            }
            debug!("identity source closed");
        });

        if let Some(previous) = runtime.identity.replace(task) {
            previous.abort();
        }
        Ok(())
    }

    /// Identifies `user_id` with the provider and applies their record.
    pub async fn log_in(&self, user_id: &UserId) -> EngineResult<PlanTier> {
        resync_identity(
            &self.inner.adapter,
            &self.inner.store,
            &self.inner.orchestrator,
            Some(user_id),
        )
        .await
    }

    /// Logs out of the provider and resets the store.
    pub async fn log_out(&self) -> EngineResult<PlanTier> {
        resync_identity(
            &self.inner.adapter,
            &self.inner.store,
            &self.inner.orchestrator,
            None,
        )
        .await
    }

    /// Resets the store to the all-free defaults.
    pub fn reset(&self) {
        self.inner.store.reset();
    }

    // ── Write intents ────────────────────────────────────────────

    /// Purchases `offering`.
    pub async fn purchase(&self, offering: &Offering) -> PurchaseOutcome {
        self.inner.orchestrator.purchase(offering).await
    }

    /// Restores previous purchases.
    pub async fn restore(&self) -> RestoreOutcome {
        self.inner.orchestrator.restore().await
    }

    /// Returns the state of the latest attempt of `kind`.
    pub fn attempt_state(&self, kind: OperationKind) -> AttemptState {
        self.inner.orchestrator.state(kind)
    }

    // ── Queries against the provider ─────────────────────────────

    /// Fetches offerings and caches them in the store.
    pub async fn get_offerings(&self) -> EngineResult<Vec<Offering>> {
        self.inner.store.begin_operation();
        let result = self
            .inner
            .adapter
            .get_offerings()
            .await
            .map_err(ErrorKind::from_fetch);
        match &result {
            Ok(offerings) => self.inner.store.set_offerings(offerings.clone()),
            Err(kind) => self.inner.store.set_error(Some(kind.clone())),
        }
        self.finish_loading();
        result
    }

    /// Re-fetches the customer record and returns the updated state.
    pub async fn check_subscription_status(&self) -> EngineResult<SubscriptionState> {
        self.inner.store.begin_operation();
        let result = self
            .inner
            .adapter
            .get_customer_info()
            .await
            .map_err(ErrorKind::from_fetch);
        match result {
            Ok(record) => {
                self.inner.store.apply_customer_record(record);
                self.finish_loading();
                Ok(self.inner.store.snapshot())
            }
            Err(kind) => {
                self.inner.store.set_error(Some(kind.clone()));
                self.finish_loading();
                Err(kind)
            }
        }
    }

    fn finish_loading(&self) {
        self.inner
            .store
            .set_loading(self.inner.orchestrator.any_in_flight());
    }

    // ── Synchronous reads ────────────────────────────────────────

    /// Returns whether the current plan includes `feature`.
    pub fn has_feature_access(&self, feature: &FeatureKey) -> bool {
        gate::has_feature_access(
            &self.inner.config.features,
            self.inner.store.current_plan(),
            feature,
        )
    }

    /// Returns whether the current plan meets `required`.
    pub fn is_feature_unlocked(&self, required: PlanTier) -> bool {
        gate::is_unlocked(self.inner.store.current_plan(), required)
    }

    /// Returns the tier to upgrade to for `feature`, if an upgrade is needed.
    pub fn upgrade_target(&self, feature: &FeatureKey) -> Option<PlanTier> {
        gate::upgrade_target(
            &self.inner.config.features,
            self.inner.store.current_plan(),
            feature,
        )
    }

    /// Describes the current plan.
    pub fn current_plan_info(&self) -> PlanInfo {
        let state = self.inner.store.snapshot();
        let tier = state.current_plan;
        PlanInfo {
            tier,
            name: tier.display_name().to_string(),
            rank: tier.rank(),
            has_active_subscription: state.has_active_subscription,
            features: self.inner.config.features.features(tier).cloned().collect(),
        }
    }

    /// Returns a copy of the current state.
    pub fn snapshot(&self) -> SubscriptionState {
        self.inner.store.snapshot()
    }

    /// Returns a read-only subscription to state changes.
    pub fn watch(&self) -> StateWatcher {
        self.inner.store.watch()
    }

    /// Returns a usage tracker bound to this engine's store and config.
    pub fn usage_tracker(&self) -> UsageLimitTracker {
        UsageLimitTracker::new(
            self.inner.store.watch(),
            self.inner.config.usage_limits.clone(),
            self.inner.config.near_limit_percent,
            Arc::clone(&self.inner.paywall),
            Arc::clone(&self.inner.analytics),
        )
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("initialized", &self.is_initialized())
            .field("plan", &self.inner.store.current_plan())
            .finish_non_exhaustive()
    }
}

/// Logs the provider in (or out) and applies the resulting record.
///
/// Logging in drops the previous customer's record before the provider call,
/// so gate checks answer `free` until the new record arrives. Logging out
/// resets the store once the provider confirms.
async fn resync_identity(
    adapter: &ProviderAdapter,
    store: &EntitlementStore,
    orchestrator: &Orchestrator,
    user: Option<&UserId>,
) -> EngineResult<PlanTier> {
    store.begin_operation();
    let result = match user {
        Some(user_id) => {
            info!("resyncing entitlements for user {user_id}");
            store.clear_customer_record();
            adapter.login_user(user_id).await
        }
        None => {
            info!("resyncing entitlements after logout");
            adapter.logout_user().await.inspect(|_| store.reset())
        }
    };

    let outcome = match result {
        Ok(record) => Ok(store.apply_customer_record(record)),
        Err(e) => {
            let kind = ErrorKind::from_fetch(e);
            warn!("identity resync failed: {kind:?}");
            store.set_error(Some(kind.clone()));
            Err(kind)
        }
    };
    store.set_loading(orchestrator.any_in_flight());
    outcome
}

async fn run_event_loop(
    adapter: Arc<ProviderAdapter>,
    store: Arc<EntitlementStore>,
    orchestrator: Arc<Orchestrator>,
    mut events: mpsc::UnboundedReceiver<EngineEvent>,
) {
    debug!("engine event loop started");
    while let Some(event) = events.recv().await {
        match event {
            EngineEvent::CustomerUpdated(record) => {
                debug!("push update with {} active entitlement(s)", record.active_count());
                store.apply_customer_record(record);
            }
            EngineEvent::IdentityChanged(user) => {
                // Errors are already recorded in the store.
                let _ = resync_identity(&adapter, &store, &orchestrator, user.as_ref()).await;
            }
        }
    }
    debug!("engine event loop stopped");
}
