//! Provider sync adapter.
//!
//! Wraps a [`BillingSdk`] and turns every response and push update into a
//! `CustomerRecord`. The adapter owns the SDK initialization lifecycle: any
//! call made before a successful [`ProviderAdapter::initialize`] fails with
//! [`ProviderError::NotInitialized`].

use crate::config::ProviderConfig;
use crate::error::{ProviderError, ProviderResult};
use crate::sdk::{BillingSdk, SdkCustomerInfo};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tiergate_types::{CustomerRecord, Offering, UserId};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Normalizing wrapper around the billing SDK.
pub struct ProviderAdapter {
    sdk: Arc<dyn BillingSdk>,
    config: ProviderConfig,
    /// Serializes concurrent `initialize` calls.
    init_lock: Mutex<()>,
    initialized: AtomicBool,
    /// Set while a push `Subscription` is live.
    listener_active: Arc<AtomicBool>,
}

impl ProviderAdapter {
    /// Creates an adapter. The SDK is not touched until `initialize`.
    pub fn new(sdk: Arc<dyn BillingSdk>, config: ProviderConfig) -> Self {
        Self {
            sdk,
            config,
            init_lock: Mutex::new(()),
            initialized: AtomicBool::new(false),
            listener_active: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Returns the configuration the SDK is initialized with.
    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Returns whether the SDK has been configured.
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    /// Returns whether a push listener is currently registered.
    pub fn has_listener(&self) -> bool {
        self.listener_active.load(Ordering::SeqCst)
    }

    /// Configures the SDK. Calling this again once it has succeeded is a
    /// no-op.
    pub async fn initialize(&self) -> ProviderResult<()> {
        let _guard = self.init_lock.lock().await;
        if self.is_initialized() {
            debug!("billing provider already initialized");
            return Ok(());
        }

        self.sdk.configure(&self.config).await.map_err(|e| {
            warn!("billing provider initialization failed: {e}");
            ProviderError::Initialization(e.to_string())
        })?;

        self.initialized.store(true, Ordering::SeqCst);
        info!(
            observer_mode = self.config.observer_mode,
            identified = self.config.app_user_id.is_some(),
            "billing provider initialized"
        );
        Ok(())
    }

    fn ensure_initialized(&self) -> ProviderResult<()> {
        if self.is_initialized() {
            Ok(())
        } else {
            Err(ProviderError::NotInitialized)
        }
    }

    /// Fetches the latest customer record.
    pub async fn get_customer_info(&self) -> ProviderResult<CustomerRecord> {
        self.ensure_initialized()?;
        let info = self
            .sdk
            .customer_info()
            .await
            .map_err(|e| ProviderError::Fetch(e.to_string()))?;
        Ok(info.to_record())
    }

    /// Fetches purchasable offerings. Packages without a store product are
    /// skipped.
    pub async fn get_offerings(&self) -> ProviderResult<Vec<Offering>> {
        self.ensure_initialized()?;
        let packages = self
            .sdk
            .offerings()
            .await
            .map_err(|e| ProviderError::Fetch(e.to_string()))?;

        let offerings: Vec<Offering> = packages.iter().filter_map(|p| p.to_offering()).collect();
        if offerings.len() < packages.len() {
            debug!(
                "skipped {} package(s) without a store product",
                packages.len() - offerings.len()
            );
        }
        Ok(offerings)
    }

    /// Purchases an offering and returns the resulting customer record.
    pub async fn purchase(&self, offering: &Offering) -> ProviderResult<CustomerRecord> {
        self.ensure_initialized()?;
        let info = self
            .sdk
            .purchase_package(&offering.product_id)
            .await
            .map_err(|e| {
                debug!("purchase of {} returned {e}", offering.product_id);
                ProviderError::Purchase(e.to_purchase_error())
            })?;
        Ok(info.to_record())
    }

    /// Restores previous purchases.
    pub async fn restore(&self) -> ProviderResult<CustomerRecord> {
        self.ensure_initialized()?;
        let info = self
            .sdk
            .restore_purchases()
            .await
            .map_err(|e| ProviderError::Restore(e.to_string()))?;
        Ok(info.to_record())
    }

    /// Identifies `user_id` with the provider.
    pub async fn login_user(&self, user_id: &UserId) -> ProviderResult<CustomerRecord> {
        self.ensure_initialized()?;
        let info = self
            .sdk
            .log_in(user_id)
            .await
            .map_err(|e| ProviderError::AuthSync(e.to_string()))?;
        Ok(info.to_record())
    }

    /// Returns the provider to an anonymous user.
    pub async fn logout_user(&self) -> ProviderResult<CustomerRecord> {
        self.ensure_initialized()?;
        let info = self
            .sdk
            .log_out()
            .await
            .map_err(|e| ProviderError::AuthSync(e.to_string()))?;
        Ok(info.to_record())
    }

    /// Registers the push listener.
    ///
    /// Only one listener may be live at a time; a second call while the
    /// returned `Subscription` is still held fails with
    /// [`ProviderError::ListenerAlreadyRegistered`]. Dropping the
    /// subscription removes the listener from the SDK.
    pub fn subscribe<F>(&self, on_update: F) -> ProviderResult<Subscription>
    where
        F: Fn(CustomerRecord) + Send + Sync + 'static,
    {
        self.ensure_initialized()?;
        if self
            .listener_active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!("refusing to register a second customer info listener");
            return Err(ProviderError::ListenerAlreadyRegistered);
        }

        self.sdk
            .set_customer_info_listener(Some(Arc::new(move |info: SdkCustomerInfo| {
                on_update(info.to_record());
            })));
        info!("customer info listener registered");

        Ok(Subscription {
            sdk: Arc::clone(&self.sdk),
            active: Arc::clone(&self.listener_active),
            released: false,
        })
    }
}

impl fmt::Debug for ProviderAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderAdapter")
            .field("initialized", &self.is_initialized())
            .field("has_listener", &self.has_listener())
            .finish_non_exhaustive()
    }
}

/// Handle to the registered push listener. Unregisters on drop.
pub struct Subscription {
    sdk: Arc<dyn BillingSdk>,
    active: Arc<AtomicBool>,
    released: bool,
}

impl Subscription {
    /// Removes the listener from the SDK.
    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.sdk.set_customer_info_listener(None);
        self.active.store(false, Ordering::SeqCst);
        self.released = true;
        info!("customer info listener removed");
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("released", &self.released)
            .finish_non_exhaustive()
    }
}
