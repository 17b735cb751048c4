//! Per-call state owned by the manager

use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use tokio::task::JoinHandle;

use crate::peer::PeerSession;
use crate::resource_guard::MediaHandle;
use crate::state_table::EventType;
use crate::surface::SurfaceHandle;
use crate::types::{
    CallDirection, CallSnapshot, CallState, EndReason, MediaKind, SessionId, TransitionRecord, UserId,
};

/// One logical call between the local user and a single remote user
pub(crate) struct CallSession {
    pub id: SessionId,
    pub local_user_id: UserId,
    pub remote_user_id: UserId,
    pub direction: CallDirection,
    pub media_kind: MediaKind,
    pub state: CallState,

    /// Present iff state is Connecting, Active or Ending
    pub peer: Option<PeerSession>,
    pub surface: Option<SurfaceHandle>,

    /// Ticket of the device acquisition in flight
    pub acquisition: Option<u64>,
    /// Acquired media waiting to be moved into the peer session
    pub staged_media: Option<MediaHandle>,

    pub ring_timer: Option<JoinHandle<()>>,
    pub negotiation_timer: Option<JoinHandle<()>>,

    /// Set by the first cleanup; later cleanups are no-ops
    pub cleaned_up: bool,
    pub end_reason: Option<EndReason>,

    pub created_at: DateTime<Utc>,
    pub connected_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    history: VecDeque<TransitionRecord>,
    history_limit: usize,
}

impl CallSession {
    pub fn new(
        local_user_id: UserId,
        remote_user_id: UserId,
        direction: CallDirection,
        media_kind: MediaKind,
        history_limit: usize,
    ) -> Self {
        Self {
            id: SessionId::new(),
            local_user_id,
            remote_user_id,
            direction,
            media_kind,
            state: CallState::Idle,
            peer: None,
            surface: None,
            acquisition: None,
            staged_media: None,
            ring_timer: None,
            negotiation_timer: None,
            cleaned_up: false,
            end_reason: None,
            created_at: Utc::now(),
            connected_at: None,
            ended_at: None,
            history: VecDeque::new(),
            history_limit,
        }
    }

    pub fn record_transition(&mut self, from_state: CallState, event: EventType, to_state: CallState) {
        if self.history_limit == 0 {
            return;
        }
        if self.history.len() == self.history_limit {
            self.history.pop_front();
        }
        self.history.push_back(TransitionRecord {
            timestamp: Utc::now(),
            from_state,
            event,
            to_state,
        });
    }

    /// Whether the session concerns the given remote user
    pub fn is_with(&self, remote: &UserId) -> bool {
        &self.remote_user_id == remote
    }

    pub fn abort_timers(&mut self) {
        if let Some(timer) = self.ring_timer.take() {
            timer.abort();
        }
        if let Some(timer) = self.negotiation_timer.take() {
            timer.abort();
        }
    }

    pub fn snapshot(&self) -> CallSnapshot {
        CallSnapshot {
            session_id: self.id.clone(),
            local_user_id: self.local_user_id.clone(),
            remote_user_id: self.remote_user_id.clone(),
            direction: self.direction,
            media_kind: self.media_kind,
            state: self.state,
            connection_state: self.peer.as_ref().map(|p| p.state()),
            has_surface: self.surface.is_some(),
            end_reason: self.end_reason.clone(),
            created_at: self.created_at,
            connected_at: self.connected_at,
            ended_at: self.ended_at,
            history: self.history.iter().cloned().collect(),
        }
    }
}

impl Drop for CallSession {
    fn drop(&mut self) {
        self.abort_timers();
    }
}
