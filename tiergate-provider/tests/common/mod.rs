//! Shared test helpers for provider tests.

#![allow(dead_code)]

use std::sync::Arc;
use tiergate_provider::mock::MockBillingSdk;
use tiergate_provider::{ProviderAdapter, ProviderConfig};

/// Installs a test subscriber honoring `RUST_LOG`. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Returns an adapter over a fresh mock SDK, not yet initialized.
pub fn adapter_with(sdk: MockBillingSdk) -> (Arc<MockBillingSdk>, ProviderAdapter) {
    init_tracing();
    let sdk = Arc::new(sdk);
    let adapter = ProviderAdapter::new(sdk.clone(), ProviderConfig::new("test_key"));
    (sdk, adapter)
}

/// Returns an initialized adapter over a fresh mock SDK.
pub async fn ready_adapter(sdk: MockBillingSdk) -> (Arc<MockBillingSdk>, ProviderAdapter) {
    let (sdk, adapter) = adapter_with(sdk);
    adapter.initialize().await.expect("initialize");
    (sdk, adapter)
}
