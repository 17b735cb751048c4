//! Core types for call-session-core
//!
//! Identifiers, call enums and the read-only snapshot of a call session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::DeviceError;
use crate::state_table::EventType;

/// Session ID type
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(format!("session-{}", uuid::Uuid::new_v4()))
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable identifier of a messenger user
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for UserId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Which side started the call
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum CallDirection {
    /// Local user is the caller
    Outgoing,
    /// Local user is the callee
    Incoming,
}

/// Kind of media carried by the call
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Audio,
    Video,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Audio => f.write_str("audio"),
            MediaKind::Video => f.write_str("video"),
        }
    }
}

/// Lifecycle state of a call session
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum CallState {
    Idle,
    Ringing,
    Connecting,
    Active,
    Ending,
    Ended,
}

impl CallState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, CallState::Ended)
    }
}

impl fmt::Display for CallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Negotiation state of a peer session
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum ConnectionState {
    New,
    Negotiating,
    Connected,
    Disconnected,
    Closed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Why a call session ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndReason {
    /// Local user hung up (or cancelled an unanswered outgoing call)
    LocalHangup,
    /// Remote user hung up
    RemoteHangup,
    /// Local user declined an incoming call
    Declined,
    /// Remote user declined our call
    Rejected,
    /// Outgoing call rang out without an answer
    Unanswered,
    /// Incoming call rang out without local action
    Missed,
    /// Camera/microphone could not be acquired
    MediaUnavailable(DeviceError),
    /// Peer negotiation or transport failed
    NegotiationFailed(String),
    /// Peer never reached connected within the negotiation timeout
    NegotiationTimeout,
    /// The call window was closed by the user
    SurfaceClosed,
    /// The hosting application is shutting down
    Shutdown,
}

impl EndReason {
    /// Failures carry a user-visible message; normal hang-ups do not
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            EndReason::MediaUnavailable(_)
                | EndReason::NegotiationFailed(_)
                | EndReason::NegotiationTimeout
        )
    }

    pub fn user_message(&self) -> Option<String> {
        match self {
            EndReason::MediaUnavailable(DeviceError::PermissionDenied) => {
                Some("Camera or microphone permission was denied".to_string())
            }
            EndReason::MediaUnavailable(DeviceError::DeviceUnavailable { reason }) => {
                Some(format!("Camera or microphone unavailable: {}", reason))
            }
            EndReason::NegotiationFailed(reason) => Some(format!("Call failed: {}", reason)),
            EndReason::NegotiationTimeout => Some("Call could not be connected".to_string()),
            _ => None,
        }
    }
}

/// One applied state transition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub timestamp: DateTime<Utc>,
    pub from_state: CallState,
    pub event: EventType,
    pub to_state: CallState,
}

/// Read-only view of a call session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallSnapshot {
    pub session_id: SessionId,
    pub local_user_id: UserId,
    pub remote_user_id: UserId,
    pub direction: CallDirection,
    pub media_kind: MediaKind,
    pub state: CallState,
    pub connection_state: Option<ConnectionState>,
    pub has_surface: bool,
    pub end_reason: Option<EndReason>,
    pub created_at: DateTime<Utc>,
    pub connected_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub history: Vec<TransitionRecord>,
}

impl CallSnapshot {
    /// Duration of the connected part of the call, if it connected
    pub fn talk_time(&self) -> Option<chrono::Duration> {
        let connected = self.connected_at?;
        let end = self.ended_at.unwrap_or_else(Utc::now);
        Some(end - connected)
    }
}
