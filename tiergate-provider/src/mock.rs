//! A scriptable in-memory billing SDK for tests.

use crate::config::ProviderConfig;
use crate::sdk::{
    BillingSdk, CustomerInfoListener, SdkCustomerInfo, SdkEntitlement, SdkError, SdkPackage,
    SdkResult,
};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use tiergate_types::UserId;
use tokio::sync::Semaphore;

#[derive(Debug, Default)]
struct MockState {
    configure_error: Option<SdkError>,
    customer_info: SdkCustomerInfo,
    customer_info_error: Option<SdkError>,
    packages: Vec<SdkPackage>,
    offerings_error: Option<SdkError>,
    purchase_results: VecDeque<SdkResult<SdkCustomerInfo>>,
    restore_results: VecDeque<SdkResult<SdkCustomerInfo>>,
    users: HashMap<UserId, SdkCustomerInfo>,
    auth_error: Option<SdkError>,
    gates: Gates,
    calls: MockCalls,
}

/// Holds one SDK method inside its call until released.
#[derive(Debug, Default)]
struct Gate(Option<Arc<Semaphore>>);

impl Gate {
    fn hold(&mut self) {
        self.0 = Some(Arc::new(Semaphore::new(0)));
    }

    fn release(&mut self) {
        if let Some(gate) = self.0.take() {
            gate.close();
        }
    }

    fn handle(&self) -> Option<Arc<Semaphore>> {
        self.0.clone()
    }
}

#[derive(Debug, Default)]
struct Gates {
    customer_info: Gate,
    purchase: Gate,
    restore: Gate,
    auth: Gate,
}

/// Waits on a held gate. A released gate is closed, which lets every waiter
/// through.
async fn pass(gate: Option<Arc<Semaphore>>) {
    if let Some(gate) = gate {
        if let Ok(permit) = gate.acquire().await {
            permit.forget();
        }
    }
}

/// Per-method call counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MockCalls {
    pub configure: usize,
    pub customer_info: usize,
    pub offerings: usize,
    pub purchase: usize,
    pub restore: usize,
    pub log_in: usize,
    pub log_out: usize,
    pub listener_installs: usize,
}

/// In-memory [`BillingSdk`] with scripted responses.
///
/// Purchases and restores pop queued results; when the queue is empty they
/// succeed with the current customer info. A successful purchase, restore or
/// login replaces the current customer info, as the real SDK's cache does.
#[derive(Default)]
pub struct MockBillingSdk {
    state: Mutex<MockState>,
    listener: Mutex<Option<CustomerInfoListener>>,
}

impl MockBillingSdk {
    /// Creates a mock with an empty customer and no offerings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a mock whose customer holds the given active entitlements.
    pub fn with_active(entitlements: &[&str]) -> Self {
        let sdk = Self::new();
        sdk.set_active(entitlements);
        sdk
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Makes `configure` fail with `err`.
    pub fn fail_configure(&self, err: SdkError) {
        self.state().configure_error = Some(err);
    }

    /// Lets `configure` succeed again.
    pub fn clear_configure_error(&self) {
        self.state().configure_error = None;
    }

    /// Replaces the current customer info.
    pub fn set_customer_info(&self, info: SdkCustomerInfo) {
        self.state().customer_info = info;
    }

    /// Replaces the current customer info with the given active entitlements.
    pub fn set_active(&self, entitlements: &[&str]) {
        self.set_customer_info(active_info(entitlements));
    }

    /// Makes `customer_info` fail with `err` until cleared.
    pub fn fail_customer_info(&self, err: Option<SdkError>) {
        self.state().customer_info_error = err;
    }

    /// Sets the packages returned by `offerings`.
    pub fn set_packages(&self, packages: Vec<SdkPackage>) {
        self.state().packages = packages;
    }

    /// Makes `offerings` fail with `err` until cleared.
    pub fn fail_offerings(&self, err: Option<SdkError>) {
        self.state().offerings_error = err;
    }

    /// Queues the result of the next purchase.
    pub fn queue_purchase(&self, result: SdkResult<SdkCustomerInfo>) {
        self.state().purchase_results.push_back(result);
    }

    /// Queues the result of the next restore.
    pub fn queue_restore(&self, result: SdkResult<SdkCustomerInfo>) {
        self.state().restore_results.push_back(result);
    }

    /// Sets the customer info returned when `user_id` logs in.
    pub fn set_user(&self, user_id: impl Into<UserId>, info: SdkCustomerInfo) {
        self.state().users.insert(user_id.into(), info);
    }

    /// Makes `log_in`/`log_out` fail with `err` until cleared.
    pub fn fail_auth(&self, err: Option<SdkError>) {
        self.state().auth_error = err;
    }

    /// Holds every subsequent purchase inside the SDK call until
    /// [`release_purchases`](Self::release_purchases).
    pub fn hold_purchases(&self) {
        self.state().gates.purchase.hold();
    }

    /// Lets held purchases (and future ones) through.
    pub fn release_purchases(&self) {
        self.state().gates.purchase.release();
    }

    /// Holds every subsequent restore until
    /// [`release_restores`](Self::release_restores).
    pub fn hold_restores(&self) {
        self.state().gates.restore.hold();
    }

    pub fn release_restores(&self) {
        self.state().gates.restore.release();
    }

    /// Holds every subsequent customer info fetch until
    /// [`release_customer_info`](Self::release_customer_info).
    pub fn hold_customer_info(&self) {
        self.state().gates.customer_info.hold();
    }

    pub fn release_customer_info(&self) {
        self.state().gates.customer_info.release();
    }

    /// Holds every subsequent `log_in`/`log_out` until
    /// [`release_auth`](Self::release_auth).
    pub fn hold_auth(&self) {
        self.state().gates.auth.hold();
    }

    pub fn release_auth(&self) {
        self.state().gates.auth.release();
    }

    /// Delivers a push update to the registered listener. Returns false if
    /// no listener is registered.
    pub fn push_customer_info(&self, info: SdkCustomerInfo) -> bool {
        self.state().customer_info = info.clone();
        let listener = self
            .listener
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        match listener {
            Some(listener) => {
                listener(info);
                true
            }
            None => false,
        }
    }

    /// Pushes customer info with the given active entitlements.
    pub fn push_active(&self, entitlements: &[&str]) -> bool {
        self.push_customer_info(active_info(entitlements))
    }

    /// Returns whether a listener is installed.
    pub fn has_listener(&self) -> bool {
        self.listener
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    /// Returns the call counters.
    pub fn calls(&self) -> MockCalls {
        self.state().calls
    }
}

/// Builds customer info with the given active entitlements.
pub fn active_info(entitlements: &[&str]) -> SdkCustomerInfo {
    SdkCustomerInfo::with_entitlements(entitlements.iter().map(|id| SdkEntitlement::active(*id)))
}

#[async_trait]
impl BillingSdk for MockBillingSdk {
    async fn configure(&self, _config: &ProviderConfig) -> SdkResult<()> {
        let mut state = self.state();
        state.calls.configure += 1;
        match &state.configure_error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    async fn customer_info(&self) -> SdkResult<SdkCustomerInfo> {
        let gate = {
            let mut state = self.state();
            state.calls.customer_info += 1;
            state.gates.customer_info.handle()
        };
        pass(gate).await;

        let state = self.state();
        match &state.customer_info_error {
            Some(err) => Err(err.clone()),
            None => Ok(state.customer_info.clone()),
        }
    }

    async fn offerings(&self) -> SdkResult<Vec<SdkPackage>> {
        let mut state = self.state();
        state.calls.offerings += 1;
        match &state.offerings_error {
            Some(err) => Err(err.clone()),
            None => Ok(state.packages.clone()),
        }
    }

    async fn purchase_package(&self, _product_id: &str) -> SdkResult<SdkCustomerInfo> {
        let gate = {
            let mut state = self.state();
            state.calls.purchase += 1;
            state.gates.purchase.handle()
        };
        pass(gate).await;

        let mut state = self.state();
        let result = state
            .purchase_results
            .pop_front()
            .unwrap_or_else(|| Ok(state.customer_info.clone()));
        if let Ok(info) = &result {
            state.customer_info = info.clone();
        }
        result
    }

    async fn restore_purchases(&self) -> SdkResult<SdkCustomerInfo> {
        let gate = {
            let mut state = self.state();
            state.calls.restore += 1;
            state.gates.restore.handle()
        };
        pass(gate).await;

        let mut state = self.state();
        let result = state
            .restore_results
            .pop_front()
            .unwrap_or_else(|| Ok(state.customer_info.clone()));
        if let Ok(info) = &result {
            state.customer_info = info.clone();
        }
        result
    }

    async fn log_in(&self, user_id: &UserId) -> SdkResult<SdkCustomerInfo> {
        let gate = {
            let mut state = self.state();
            state.calls.log_in += 1;
            state.gates.auth.handle()
        };
        pass(gate).await;

        let mut state = self.state();
        if let Some(err) = &state.auth_error {
            return Err(err.clone());
        }
        let mut info = state.users.get(user_id).cloned().unwrap_or_default();
        info.app_user_id = Some(user_id.to_string());
        state.customer_info = info.clone();
        Ok(info)
    }

    async fn log_out(&self) -> SdkResult<SdkCustomerInfo> {
        let gate = {
            let mut state = self.state();
            state.calls.log_out += 1;
            state.gates.auth.handle()
        };
        pass(gate).await;

        let mut state = self.state();
        if let Some(err) = &state.auth_error {
            return Err(err.clone());
        }
        state.customer_info = SdkCustomerInfo::default();
        Ok(SdkCustomerInfo::default())
    }

    fn set_customer_info_listener(&self, listener: Option<CustomerInfoListener>) {
        if listener.is_some() {
            self.state().calls.listener_installs += 1;
        }
        *self.listener.lock().unwrap_or_else(|e| e.into_inner()) = listener;
    }
}
