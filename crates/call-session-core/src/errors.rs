//! Error types for call-session-core
//!
//! Every collaborator has its own error enum; [`CallError`] is the
//! top-level error returned from manager operations.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::SessionId;

/// Result type for call session operations
pub type Result<T> = std::result::Result<T, CallError>;

/// Errors raised by local media acquisition
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum DeviceError {
    /// The user or platform refused access to the camera/microphone
    #[error("Permission to use capture device denied")]
    PermissionDenied,

    /// No usable device, or the device is held by another application
    #[error("Capture device unavailable: {reason}")]
    DeviceUnavailable { reason: String },
}

impl DeviceError {
    /// Create a device unavailable error
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::DeviceUnavailable {
            reason: reason.into(),
        }
    }
}

/// Errors raised by the peer-to-peer media transport
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PeerError {
    #[error("Peer transport could not be created: {message}")]
    Creation { message: String },

    #[error("Negotiation failed: {reason}")]
    NegotiationFailed { reason: String },

    #[error("Peer session is closed")]
    Closed,

    #[error("Operation {operation} not valid in connection state {state}")]
    InvalidState { operation: &'static str, state: String },

    #[error("Transport error: {message}")]
    Transport { message: String },
}

impl PeerError {
    /// Create a negotiation failure
    pub fn negotiation(reason: impl Into<String>) -> Self {
        Self::NegotiationFailed {
            reason: reason.into(),
        }
    }

    /// Create a transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }
}

/// Errors raised by the signaling layer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignalingError {
    #[error("Malformed signaling message: {message}")]
    Malformed { message: String },

    #[error("Signaling transport error: {message}")]
    Transport { message: String },
}

impl SignalingError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for SignalingError {
    fn from(err: serde_json::Error) -> Self {
        Self::Malformed {
            message: err.to_string(),
        }
    }
}

/// Errors raised by the secondary rendering surface host
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SurfaceError {
    #[error("Surface could not be opened: {reason}")]
    OpenFailed { reason: String },

    #[error("Surface could not be closed: {reason}")]
    CloseFailed { reason: String },
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read configuration file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {message}")]
    Invalid { message: String },
}

impl ConfigError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }
}

/// Top-level error for call session operations
#[derive(Debug, Error)]
pub enum CallError {
    /// Local media could not be acquired; the session has ended
    #[error("Media error: {0}")]
    Device(#[from] DeviceError),

    /// Peer negotiation failed; the session has ended
    #[error("Peer error: {0}")]
    Peer(#[from] PeerError),

    #[error("Signaling error: {0}")]
    Signaling(#[from] SignalingError),

    #[error("Surface error: {0}")]
    Surface(#[from] SurfaceError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A call is already live; only one call per local user is supported
    #[error("Call {session_id} is already in progress")]
    CallInProgress { session_id: SessionId },

    /// The manager has not been given a required collaborator
    #[error("Missing collaborator: {0}")]
    MissingCollaborator(&'static str),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CallError {
    /// True for errors caused by the local capture devices
    pub fn is_device_error(&self) -> bool {
        matches!(self, CallError::Device(_))
    }
}
