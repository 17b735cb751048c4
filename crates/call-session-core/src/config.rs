//! Call session configuration
//!
//! [`CallConfig`] carries relay servers for the peer transport, timeout
//! policy and cleanup behaviour. It can be built in code with the `with_*`
//! methods or loaded from YAML:
//!
//! ```yaml
//! ice_servers:
//!   - urls: ["stun:stun.l.google.com:19302"]
//!   - urls: ["turn:turn.example.com:3478"]
//!     username: "user"
//!     credential: "secret"
//! ice_transport_policy: all
//! ring_timeout_secs: 45
//! negotiation_timeout_secs: 30
//! reject_when_busy: true
//! sweep_on_release: true
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::errors::ConfigError;

/// Environment variable naming a YAML file to load in [`CallConfig::from_env`]
pub const CONFIG_ENV_VAR: &str = "CALL_SESSION_CONFIG";

/// A STUN/TURN relay option for the peer transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceServer {
    pub urls: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,
}

impl IceServer {
    pub fn stun(url: impl Into<String>) -> Self {
        Self {
            urls: vec![url.into()],
            username: None,
            credential: None,
        }
    }

    pub fn turn(url: impl Into<String>, username: impl Into<String>, credential: impl Into<String>) -> Self {
        Self {
            urls: vec![url.into()],
            username: Some(username.into()),
            credential: Some(credential.into()),
        }
    }
}

/// Which candidates the transport is allowed to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IceTransportPolicy {
    All,
    Relay,
}

impl Default for IceTransportPolicy {
    fn default() -> Self {
        Self::All
    }
}

/// Configuration for a [`CallSessionManager`](crate::CallSessionManager)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CallConfig {
    /// Relay options handed to every peer transport
    pub ice_servers: Vec<IceServer>,
    pub ice_transport_policy: IceTransportPolicy,
    /// Seconds a call may ring before it is ended; `None` rings forever
    pub ring_timeout_secs: Option<u64>,
    /// Seconds `Connecting` may last before the call fails; `None` disables
    pub negotiation_timeout_secs: Option<u64>,
    /// Refuse incoming calls while another call is live
    pub reject_when_busy: bool,
    /// Stop orphaned capture tracks after the last handle is released
    pub sweep_on_release: bool,
    /// Capacity of the application event broadcast channel
    pub event_channel_capacity: usize,
    /// Maximum transition records kept per session
    pub history_limit: usize,
}

impl Default for CallConfig {
    fn default() -> Self {
        Self {
            ice_servers: vec![IceServer::stun("stun:stun.l.google.com:19302")],
            ice_transport_policy: IceTransportPolicy::All,
            ring_timeout_secs: Some(45),
            negotiation_timeout_secs: Some(30),
            reject_when_busy: true,
            sweep_on_release: true,
            event_channel_capacity: 64,
            history_limit: 32,
        }
    }
}

impl CallConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ice_servers(mut self, servers: Vec<IceServer>) -> Self {
        self.ice_servers = servers;
        self
    }

    pub fn with_ice_transport_policy(mut self, policy: IceTransportPolicy) -> Self {
        self.ice_transport_policy = policy;
        self
    }

    /// Ring timeout in whole seconds, `None` to ring until answered
    pub fn with_ring_timeout_secs(mut self, secs: Option<u64>) -> Self {
        self.ring_timeout_secs = secs;
        self
    }

    /// Time allowed in `Connecting`, in whole seconds
    pub fn with_negotiation_timeout_secs(mut self, secs: Option<u64>) -> Self {
        self.negotiation_timeout_secs = secs;
        self
    }

    pub fn with_reject_when_busy(mut self, reject: bool) -> Self {
        self.reject_when_busy = reject;
        self
    }

    pub fn with_sweep_on_release(mut self, sweep: bool) -> Self {
        self.sweep_on_release = sweep;
        self
    }

    pub fn with_event_channel_capacity(mut self, capacity: usize) -> Self {
        self.event_channel_capacity = capacity;
        self
    }

    pub fn ring_timeout(&self) -> Option<Duration> {
        self.ring_timeout_secs.map(Duration::from_secs)
    }

    pub fn negotiation_timeout(&self) -> Option<Duration> {
        self.negotiation_timeout_secs.map(Duration::from_secs)
    }

    /// Parse and validate a YAML document
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: CallConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&yaml)
    }

    /// Load from the file named by `CALL_SESSION_CONFIG`, or use defaults
    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var(CONFIG_ENV_VAR) {
            Ok(path) => {
                tracing::info!("Loading call session config from: {}", path);
                Self::from_yaml_file(path)
            }
            Err(_) => {
                tracing::debug!("{} not set, using default call session config", CONFIG_ENV_VAR);
                Ok(Self::default())
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.event_channel_capacity == 0 {
            return Err(ConfigError::invalid("event_channel_capacity must be > 0"));
        }
        if self.ring_timeout_secs == Some(0) {
            return Err(ConfigError::invalid("ring_timeout_secs must be > 0 when set"));
        }
        if self.negotiation_timeout_secs == Some(0) {
            return Err(ConfigError::invalid("negotiation_timeout_secs must be > 0 when set"));
        }
        for server in &self.ice_servers {
            if server.urls.is_empty() {
                return Err(ConfigError::invalid("ice server entry has no urls"));
            }
            let is_turn = server
                .urls
                .iter()
                .any(|u| u.starts_with("turn:") || u.starts_with("turns:"));
            if is_turn && (server.username.is_none() || server.credential.is_none()) {
                return Err(ConfigError::invalid(format!(
                    "turn server {:?} requires username and credential",
                    server.urls
                )));
            }
        }
        if self.ice_transport_policy == IceTransportPolicy::Relay
            && !self
                .ice_servers
                .iter()
                .flat_map(|s| s.urls.iter())
                .any(|u| u.starts_with("turn"))
        {
            return Err(ConfigError::invalid("relay policy requires at least one turn server"));
        }
        Ok(())
    }
}
