//! Routing of inbound signals and driver inputs
//!
//! Call-control signals become table events. Negotiation payloads
//! (descriptions and candidates) are routed straight to the peer session and
//! only reach the table when they fail.

use std::sync::Arc;
use tracing::{debug, info, warn};

use super::events::{CallEvent, ProcessEventResult};
use super::session::CallSession;
use super::{Inner, ManagerInput, ManagerState, PendingAcquisition};
use crate::peer::{IceCandidate, Negotiation, PeerUpdate, SdpType, SessionDescription, TransportEvent};
use crate::signaling::InboundSignal;
use crate::state_table::EventType;
use crate::types::{CallDirection, CallState, ConnectionState, EndReason, MediaKind, SessionId, UserId};

impl Inner {
    pub(crate) async fn handle_signal(self: &Arc<Self>, signal: InboundSignal) -> ProcessEventResult {
        debug!("Inbound signal {:?}", signal);
        match signal {
            InboundSignal::IncomingCall { caller_id, media_kind } => self.on_incoming_call(caller_id, media_kind).await,
            InboundSignal::CallAccepted { callee_id } => self.on_remote(&callee_id, EventType::RemoteAccepted).await,
            InboundSignal::CallRejected { callee_id } => self.on_remote(&callee_id, EventType::RemoteRejected).await,
            InboundSignal::CallEnded { peer_id } => self.on_remote(&peer_id, EventType::RemoteEnded).await,
            InboundSignal::Description { from, description } => self.on_remote_description(&from, description).await,
            InboundSignal::Candidate { from, candidate } => self.on_remote_candidate(&from, candidate).await,
        }
    }

    pub(crate) async fn handle_input(self: &Arc<Self>, input: ManagerInput) {
        match input {
            ManagerInput::Transport { session_id, event } => self.on_transport_event(&session_id, event).await,
            ManagerInput::SurfaceClosed { session_id } => {
                self.drive_session(&session_id, EventType::SurfaceClosed).await;
            }
            ManagerInput::RingTimeout { session_id } => {
                self.drive_session(&session_id, EventType::RingTimeout).await;
            }
            ManagerInput::NegotiationTimeout { session_id } => {
                self.drive_session(&session_id, EventType::NegotiationTimeout).await;
            }
        }
    }

    async fn on_incoming_call(&self, caller_id: UserId, media_kind: MediaKind) -> ProcessEventResult {
        let mut st = self.state.lock().await;

        if let Some(current) = st.current.as_ref() {
            let result = ProcessEventResult::ignored(Some(current.id.clone()), current.state);
            if current.direction == CallDirection::Incoming && current.is_with(&caller_id) {
                debug!("Duplicate incoming call from {} for session {}", caller_id, current.id);
                return result;
            }

            info!("Busy with call {}, refusing call from {}", current.id, caller_id);
            if self.config.reject_when_busy {
                self.bridge.emit_reject(&caller_id).await;
            }
            return result;
        }

        let session = CallSession::new(
            self.local_user.clone(),
            caller_id,
            CallDirection::Incoming,
            media_kind,
            self.config.history_limit,
        );
        info!("Incoming {} call {} from {}", media_kind, session.id, session.remote_user_id);
        st.current = Some(session);

        let outcome = self.drive(&mut st, EventType::IncomingCall, None).await;
        if !outcome.result.transition_applied {
            st.current = None;
        }
        outcome.result
    }

    /// Apply a call-control event from the remote user of the current call
    async fn on_remote(self: &Arc<Self>, remote: &UserId, event: EventType) -> ProcessEventResult {
        let outcome = {
            let mut st = self.state.lock().await;
            if let Some(ignored) = not_with(&st, remote, event) {
                return ignored;
            }
            self.drive(&mut st, event, None).await
        };
        self.spawn_acquisitions(outcome.acquisitions);
        outcome.result
    }

    /// Apply an event scoped to a session id, ignoring stale ids
    async fn drive_session(self: &Arc<Self>, session_id: &SessionId, event: EventType) -> ProcessEventResult {
        let outcome = {
            let mut st = self.state.lock().await;
            let current = st.current.as_ref().filter(|s| &s.id == session_id);
            let Some(session) = current else {
                debug!("Ignoring {} for stale session {}", event.type_name(), session_id);
                let state = st.current.as_ref().map(|s| s.state).unwrap_or(CallState::Idle);
                return ProcessEventResult::ignored(Some(session_id.clone()), state);
            };
            if !timer_armed(session, event) {
                debug!("Ignoring {} for session {}: timer was cancelled", event.type_name(), session_id);
                return ProcessEventResult::ignored(Some(session_id.clone()), session.state);
            }
            self.drive(&mut st, event, None).await
        };
        self.spawn_acquisitions(outcome.acquisitions);
        outcome.result
    }

    async fn on_remote_description(&self, from: &UserId, description: SessionDescription) -> ProcessEventResult {
        let mut st = self.state.lock().await;
        if let Some(ignored) = not_with(&st, from, EventType::NegotiationFailed) {
            return ignored;
        }
        let Some(session) = st.current.as_mut() else {
            return ProcessEventResult::ignored(None, CallState::Idle);
        };
        let result = ProcessEventResult::ignored(Some(session.id.clone()), session.state);

        let Some(peer) = session.peer.as_mut() else {
            debug!("No peer session for description from {} in {}", from, session.state);
            return result;
        };

        let applied = match description.sdp_type {
            SdpType::Offer => match peer.start_negotiation(Negotiation::Answer { remote_offer: description }).await {
                Ok(answer) => {
                    self.bridge.emit_negotiation(&session.remote_user_id, answer).await;
                    Ok(())
                }
                Err(e) => Err(e),
            },
            SdpType::Answer => peer.apply_remote_answer(description).await,
        };

        match applied {
            Ok(()) => result,
            Err(e) => {
                warn!("Negotiation with {} failed: {}", from, e);
                self.drive(
                    &mut st,
                    EventType::NegotiationFailed,
                    Some(EndReason::NegotiationFailed(e.to_string())),
                )
                .await
                .result
            }
        }
    }

    /// Hand a remote candidate to the peer session
    ///
    /// A rejected candidate is dropped. Connectivity failure is reported by
    /// the transport itself.
    async fn on_remote_candidate(&self, from: &UserId, candidate: IceCandidate) -> ProcessEventResult {
        let st = self.state.lock().await;
        if let Some(ignored) = not_with(&st, from, EventType::NegotiationFailed) {
            return ignored;
        }
        let Some(session) = st.current.as_ref() else {
            return ProcessEventResult::ignored(None, CallState::Idle);
        };
        let result = ProcessEventResult::ignored(Some(session.id.clone()), session.state);

        let Some(peer) = session.peer.as_ref() else {
            debug!("No peer session for candidate from {}", from);
            return result;
        };

        if let Err(e) = peer.add_remote_candidate(candidate).await {
            warn!("Dropping remote candidate from {} on session {}: {}", from, session.id, e);
        }
        result
    }

    async fn on_transport_event(&self, session_id: &SessionId, event: TransportEvent) {
        let mut st = self.state.lock().await;
        let Some(session) = st.current.as_mut().filter(|s| &s.id == session_id) else {
            debug!("Ignoring transport event for stale session {}", session_id);
            return;
        };
        let Some(peer) = session.peer.as_mut() else {
            return;
        };

        match peer.apply_transport_event(event) {
            PeerUpdate::LocalCandidate(candidate) => {
                self.bridge.emit_candidate(&session.remote_user_id, candidate).await;
            }
            PeerUpdate::RemoteTrack(track) => {
                info!("Remote {} track {} on session {}", track.kind, track.id, session_id);
                self.emit(CallEvent::RemoteTrack {
                    session_id: session_id.clone(),
                    track,
                });
            }
            PeerUpdate::Connected => {
                self.emit(CallEvent::ConnectionChanged {
                    session_id: session_id.clone(),
                    state: ConnectionState::Connected,
                });
                self.drive(&mut st, EventType::PeerConnected, None).await;
            }
            PeerUpdate::Disconnected => {
                warn!("Peer connection for session {} disconnected", session_id);
                self.emit(CallEvent::ConnectionChanged {
                    session_id: session_id.clone(),
                    state: ConnectionState::Disconnected,
                });
            }
            PeerUpdate::Failed(reason) => {
                warn!("Peer connection for session {} failed: {}", session_id, reason);
                self.drive(&mut st, EventType::NegotiationFailed, Some(EndReason::NegotiationFailed(reason)))
                    .await;
            }
            PeerUpdate::Ignored => {}
        }
    }

    fn spawn_acquisitions(self: &Arc<Self>, acquisitions: Vec<PendingAcquisition>) {
        for pending in acquisitions {
            let inner = Arc::clone(self);
            tokio::spawn(async move {
                if let Err(e) = inner.run_acquisition(pending).await {
                    warn!("Call could not acquire media: {}", e);
                }
            });
        }
    }
}

/// Timer inputs still queued after their timer was cancelled are stale
fn timer_armed(session: &CallSession, event: EventType) -> bool {
    match event {
        EventType::RingTimeout => session.ring_timer.is_some(),
        EventType::NegotiationTimeout => session.negotiation_timer.is_some(),
        _ => true,
    }
}

/// `Some(ignored result)` unless the current session is with `remote`
fn not_with(st: &ManagerState, remote: &UserId, event: EventType) -> Option<ProcessEventResult> {
    match st.current.as_ref() {
        Some(session) if session.is_with(remote) => None,
        Some(session) => {
            debug!(
                "Ignoring {} from {}: session {} is with {}",
                event.type_name(),
                remote,
                session.id,
                session.remote_user_id
            );
            Some(ProcessEventResult::ignored(Some(session.id.clone()), session.state))
        }
        None => {
            debug!("Ignoring {} from {}: no call session", event.type_name(), remote);
            Some(ProcessEventResult::ignored(None, CallState::Idle))
        }
    }
}
