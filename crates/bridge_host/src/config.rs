//! Bridge configuration and its default slot names.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Protocol tag stamped on outbound envelopes unless overridden.
pub const DEFAULT_PROTOCOL_VERSION: &str = "1.0";
/// Delay before a pending request with a fallback gives up on the peer.
pub const DEFAULT_RESPONSE_TIMEOUT_MS: u64 = 500;
/// Namespace used when a storage call does not name one.
pub const DEFAULT_STORAGE_KEY: &str = "embed_bridge.storage";
/// Well-known slot written to signal sibling contexts about local store changes.
pub const DEFAULT_BROADCAST_KEY: &str = "embed_bridge.broadcast";
/// Slot holding the emulated user record in standalone mode.
pub const DEFAULT_USER_KEY: &str = "embed_bridge.user";
/// Slot holding the emulated language preference in standalone mode.
pub const DEFAULT_LANGUAGE_KEY: &str = "embed_bridge.language";

/// Runtime configuration shared by the transport and the capability façade.
///
/// Every field has a default, so a partially specified JSON object deserializes cleanly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BridgeConfig {
    /// Version tag written into every outbound envelope.
    pub protocol_version: String,
    /// Fallback timer delay in milliseconds.
    pub response_timeout_ms: u64,
    /// Namespace used when callers omit a storage key.
    pub default_storage_key: String,
    /// Cross-tab signal slot.
    pub broadcast_key: String,
    /// Standalone user record slot.
    pub user_key: String,
    /// Standalone language preference slot.
    pub language_key: String,
}

impl BridgeConfig {
    /// Returns the fallback timer delay.
    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }

    /// Resolves an optional caller-supplied namespace against the default one.
    pub fn storage_key<'a>(&'a self, storage_key: Option<&'a str>) -> &'a str {
        storage_key.unwrap_or(&self.default_storage_key)
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            protocol_version: DEFAULT_PROTOCOL_VERSION.to_string(),
            response_timeout_ms: DEFAULT_RESPONSE_TIMEOUT_MS,
            default_storage_key: DEFAULT_STORAGE_KEY.to_string(),
            broadcast_key: DEFAULT_BROADCAST_KEY.to_string(),
            user_key: DEFAULT_USER_KEY.to_string(),
            language_key: DEFAULT_LANGUAGE_KEY.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_fills_remaining_fields_with_defaults() {
        let config: BridgeConfig =
            serde_json::from_str(r#"{"responseTimeoutMs": 1200, "defaultStorageKey": "game"}"#)
                .expect("config should deserialize");

        assert_eq!(config.response_timeout(), Duration::from_millis(1200));
        assert_eq!(config.default_storage_key, "game");
        assert_eq!(config.broadcast_key, DEFAULT_BROADCAST_KEY);
        assert_eq!(config.protocol_version, DEFAULT_PROTOCOL_VERSION);
    }

    #[test]
    fn storage_key_falls_back_to_the_default_namespace() {
        let config = BridgeConfig::default();
        assert_eq!(config.storage_key(None), DEFAULT_STORAGE_KEY);
        assert_eq!(config.storage_key(Some("scores")), "scores");
    }
}
