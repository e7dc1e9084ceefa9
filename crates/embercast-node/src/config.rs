//! Configuration for the bridge binary.
//! Parsed from embercast.toml; every field has a default.

use std::path::Path;

use serde::{Deserialize, Serialize};

use embercast_protocol::{
    SIGNALING_IDLE_TIMEOUT_MS, SIGNALING_REAP_INTERVAL_SECS, WS_HEARTBEAT_INTERVAL_SECS,
};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BridgeConfig {
    #[serde(default)]
    pub bridge: BridgeSection,
    #[serde(default)]
    pub network: NetworkSection,
    #[serde(default)]
    pub timing: TimingSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeSection {
    /// Name shown to senders by the (external) discovery layer. Per instance,
    /// never shared mutable state.
    #[serde(default = "default_friendly_name")]
    pub friendly_name: String,
}

impl Default for BridgeSection {
    fn default() -> Self {
        Self {
            friendly_name: default_friendly_name(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkSection {
    /// CastV2 TLS listener.
    #[serde(default = "default_cast_listen_addr")]
    pub cast_listen_addr: String,
    /// Display WebSocket listener.
    #[serde(default = "default_ws_listen_addr")]
    pub ws_listen_addr: String,
}

impl Default for NetworkSection {
    fn default() -> Self {
        Self {
            cast_listen_addr: default_cast_listen_addr(),
            ws_listen_addr: default_ws_listen_addr(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingSection {
    #[serde(default = "default_ws_heartbeat_secs")]
    pub ws_heartbeat_secs: u64,
    #[serde(default = "default_signaling_reap_secs")]
    pub signaling_reap_secs: u64,
    #[serde(default = "default_signaling_idle_ms")]
    pub signaling_idle_ms: u64,
}

impl Default for TimingSection {
    fn default() -> Self {
        Self {
            ws_heartbeat_secs: WS_HEARTBEAT_INTERVAL_SECS,
            signaling_reap_secs: SIGNALING_REAP_INTERVAL_SECS,
            signaling_idle_ms: SIGNALING_IDLE_TIMEOUT_MS,
        }
    }
}

// Default value functions
fn default_friendly_name() -> String {
    "Embercast".into()
}
fn default_cast_listen_addr() -> String {
    "0.0.0.0:8009".into()
}
fn default_ws_listen_addr() -> String {
    "0.0.0.0:8010".into()
}
fn default_ws_heartbeat_secs() -> u64 {
    WS_HEARTBEAT_INTERVAL_SECS
}
fn default_signaling_reap_secs() -> u64 {
    SIGNALING_REAP_INTERVAL_SECS
}
fn default_signaling_idle_ms() -> u64 {
    SIGNALING_IDLE_TIMEOUT_MS
}

impl BridgeConfig {
    /// Load config from file, or fall back to defaults when absent.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: BridgeConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }
}
