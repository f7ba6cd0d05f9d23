//! Provider configuration.

use serde::{Deserialize, Serialize};
use tiergate_types::UserId;

/// Configuration handed to the SDK at initialization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Public SDK key.
    pub api_key: String,
    /// User to identify as at startup; anonymous when `None`.
    pub app_user_id: Option<UserId>,
    /// When set, the SDK observes transactions made elsewhere instead of
    /// finishing them itself.
    pub observer_mode: bool,
}

impl ProviderConfig {
    /// Creates a config for an anonymous user.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Default::default()
        }
    }

    /// Sets the initial user id.
    #[must_use]
    pub fn with_user(mut self, user_id: impl Into<UserId>) -> Self {
        self.app_user_id = Some(user_id.into());
        self
    }
}
