//! Events published to the application and results of manager operations

use serde::{Deserialize, Serialize};

use crate::peer::RemoteTrack;
use crate::types::{CallState, ConnectionState, EndReason, MediaKind, SessionId, UserId};

/// Broadcast to every [`subscribe`](crate::CallSessionManager::subscribe)r
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallEvent {
    StateChanged {
        session_id: SessionId,
        old_state: CallState,
        new_state: CallState,
    },
    /// Ring indication for an incoming call
    IncomingCall {
        session_id: SessionId,
        caller_id: UserId,
        media_kind: MediaKind,
    },
    RemoteTrack {
        session_id: SessionId,
        track: RemoteTrack,
    },
    ConnectionChanged {
        session_id: SessionId,
        state: ConnectionState,
    },
    CallEnded {
        session_id: SessionId,
        reason: EndReason,
    },
}

impl CallEvent {
    pub fn session_id(&self) -> &SessionId {
        match self {
            CallEvent::StateChanged { session_id, .. }
            | CallEvent::IncomingCall { session_id, .. }
            | CallEvent::RemoteTrack { session_id, .. }
            | CallEvent::ConnectionChanged { session_id, .. }
            | CallEvent::CallEnded { session_id, .. } => session_id,
        }
    }
}

/// Outcome of feeding one event to the state machine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessEventResult {
    /// Session the event was applied to, if any
    pub session_id: Option<SessionId>,
    pub old_state: CallState,
    pub next_state: CallState,
    /// False when no transition matched (the event was a no-op)
    pub transition_applied: bool,
}

impl ProcessEventResult {
    pub(crate) fn ignored(session_id: Option<SessionId>, state: CallState) -> Self {
        Self {
            session_id,
            old_state: state,
            next_state: state,
            transition_applied: false,
        }
    }
}
