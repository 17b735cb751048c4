//! Table-driven event processing
//!
//! [`Inner::drive`] looks up `(direction, state, event)` in the transition
//! table, checks guards, runs actions, applies the next state, publishes
//! events and then processes any follow-up event, all under the state lock.

use chrono::Utc;
use std::collections::VecDeque;
use tracing::{debug, error, info, warn};

use super::events::{CallEvent, ProcessEventResult};
use super::guards::check_guard;
use super::session::CallSession;
use super::{Inner, ManagerState, PendingAcquisition};
use crate::errors::{DeviceError, Result};
use crate::state_table::{EventTemplate, EventType, StateKey};
use crate::types::{CallDirection, CallState, EndReason, SessionId};

pub(crate) struct DriveOutcome {
    pub result: ProcessEventResult,
    /// Device acquisitions to run once the lock is released
    pub acquisitions: Vec<PendingAcquisition>,
}

impl Inner {
    /// Apply an event to the current session
    ///
    /// `hint` carries the end reason for failure events.
    pub(crate) async fn drive(
        &self,
        st: &mut ManagerState,
        event: EventType,
        hint: Option<EndReason>,
    ) -> DriveOutcome {
        let Some(session) = st.current.as_mut() else {
            debug!("No call session for {}", event.type_name());
            return DriveOutcome {
                result: ProcessEventResult::ignored(None, CallState::Idle),
                acquisitions: Vec::new(),
            };
        };

        let session_id = session.id.clone();
        let old_state = session.state;
        let mut applied = false;
        let mut acquisitions = Vec::new();
        let mut queue = VecDeque::from([(event, hint)]);
        let mut is_trigger = true;

        while let Some((event, hint)) = queue.pop_front() {
            let trigger = std::mem::replace(&mut is_trigger, false);
            let key = StateKey {
                direction: session.direction,
                state: session.state,
                event,
            };

            let Some(transition) = self.table.get(&key) else {
                debug!(
                    "No transition for {} in {} ({:?}) for session {}",
                    event.type_name(),
                    session.state,
                    session.direction,
                    session.id
                );
                continue;
            };

            if let Some(guard) = transition.guards.iter().find(|g| !check_guard(g, session)) {
                debug!("Guard {:?} blocked {} for session {}", guard, event.type_name(), session.id);
                continue;
            }
            if trigger {
                applied = true;
            }

            if matches!(transition.next_state, Some(CallState::Ending | CallState::Ended))
                && session.end_reason.is_none()
            {
                session.end_reason = Some(end_reason_for(event, session, hint.clone()));
            }

            let mut failure = None;
            for action in &transition.actions {
                if let Err(e) = self.execute_action(action, session, &mut acquisitions).await {
                    warn!("Action {:?} failed for session {}: {}", action, session.id, e);
                    failure = Some(e);
                    break;
                }
            }

            let previous = session.state;
            if let Some(next) = transition.next_state {
                if next != previous {
                    session.state = next;
                    session.record_transition(previous, event, next);
                    info!(
                        "Call session {} {} -> {} on {}",
                        session.id,
                        previous,
                        next,
                        event.type_name()
                    );
                }
            }

            for template in &transition.publish_events {
                self.publish(template, session, previous);
            }

            if let Some(follow_up) = transition.follow_up {
                queue.push_back((follow_up, None));
            }
            if let Some(e) = failure {
                queue.push_back((EventType::NegotiationFailed, Some(EndReason::NegotiationFailed(e.to_string()))));
            }
        }

        let next_state = session.state;
        if next_state == CallState::Ended {
            self.finalize(st);
        }

        DriveOutcome {
            result: ProcessEventResult {
                session_id: Some(session_id),
                old_state,
                next_state,
                transition_applied: applied,
            },
            acquisitions,
        }
    }

    /// Move an ended session out of the live slot
    fn finalize(&self, st: &mut ManagerState) {
        let Some(mut session) = st.current.take() else {
            return;
        };
        session.ended_at = Some(Utc::now());
        session.abort_timers();

        if let Some(peer) = session.peer.as_ref() {
            if !peer.is_closed() {
                error!("Peer session for {} still open at finalize", session.id);
            }
        }
        if session.staged_media.is_some() || session.acquisition.is_some() {
            error!("Call session {} ended with media still staged", session.id);
        }

        let snapshot = session.snapshot();
        session.peer = None;
        info!(
            "Call session {} with {} ended: {:?}",
            session.id, session.remote_user_id, snapshot.end_reason
        );
        st.last = Some(snapshot);
    }

    /// Finish a device acquisition started by an `AcquireMedia` action
    ///
    /// The result is applied only if the session is still the current one,
    /// still ringing and still waiting on this ticket.
    pub(crate) async fn run_acquisition(&self, pending: PendingAcquisition) -> Result<ProcessEventResult> {
        let outcome = self.guard.acquire(pending.kind).await;

        let mut st = self.state.lock().await;
        let still_wanted = matches!(
            st.current.as_ref(),
            Some(s) if s.id == pending.session_id
                && s.state == CallState::Ringing
                && s.acquisition == Some(pending.ticket)
        );

        if !still_wanted {
            match outcome {
                Ok(media) => {
                    info!(
                        "Session {} no longer waiting for media, releasing handle {}",
                        pending.session_id,
                        media.id()
                    );
                    self.guard.release(&media).await;
                }
                Err(e) => debug!("Ignoring stale media failure for {}: {}", pending.session_id, e),
            }
            return Ok(settled_result(&st, &pending.session_id));
        }

        match outcome {
            Ok(media) => {
                if let Some(session) = st.current.as_mut() {
                    session.acquisition = None;
                    session.staged_media = Some(media);
                }
                Ok(self.drive(&mut st, EventType::MediaAcquired, None).await.result)
            }
            Err(e) => {
                warn!("Media acquisition failed for {}: {}", pending.session_id, e);
                if let Some(session) = st.current.as_mut() {
                    session.acquisition = None;
                }
                self.drive(
                    &mut st,
                    EventType::MediaAcquisitionFailed,
                    Some(EndReason::MediaUnavailable(e.clone())),
                )
                .await;
                Err(e.into())
            }
        }
    }

    fn publish(&self, template: &EventTemplate, session: &CallSession, old_state: CallState) {
        let event = match template {
            EventTemplate::StateChanged => CallEvent::StateChanged {
                session_id: session.id.clone(),
                old_state,
                new_state: session.state,
            },
            EventTemplate::IncomingCall => CallEvent::IncomingCall {
                session_id: session.id.clone(),
                caller_id: session.remote_user_id.clone(),
                media_kind: session.media_kind,
            },
            EventTemplate::CallEnded => CallEvent::CallEnded {
                session_id: session.id.clone(),
                reason: session.end_reason.clone().unwrap_or(EndReason::LocalHangup),
            },
        };
        self.emit(event);
    }

    /// Broadcast to subscribers; having none is not an error
    pub(crate) fn emit(&self, event: CallEvent) {
        let _ = self.events.send(event);
    }
}

/// Result for an acquisition that completed after its session moved on
fn settled_result(st: &ManagerState, session_id: &SessionId) -> ProcessEventResult {
    let state = match (&st.current, &st.last) {
        (Some(current), _) if &current.id == session_id => current.state,
        (_, Some(last)) if &last.session_id == session_id => last.state,
        _ => CallState::Ended,
    };
    ProcessEventResult {
        session_id: Some(session_id.clone()),
        old_state: CallState::Ringing,
        next_state: state,
        transition_applied: false,
    }
}

fn end_reason_for(event: EventType, session: &CallSession, hint: Option<EndReason>) -> EndReason {
    if let Some(reason) = hint {
        return reason;
    }
    match event {
        EventType::EndCall | EventType::RejectCall
            if session.direction == CallDirection::Incoming && session.state == CallState::Ringing =>
        {
            EndReason::Declined
        }
        EventType::RejectCall => EndReason::Declined,
        EventType::EndCall => EndReason::LocalHangup,
        EventType::RemoteEnded => EndReason::RemoteHangup,
        EventType::RemoteRejected => EndReason::Rejected,
        EventType::RingTimeout => match session.direction {
            CallDirection::Outgoing => EndReason::Unanswered,
            CallDirection::Incoming => EndReason::Missed,
        },
        EventType::NegotiationTimeout => EndReason::NegotiationTimeout,
        EventType::SurfaceClosed => EndReason::SurfaceClosed,
        EventType::Shutdown => EndReason::Shutdown,
        EventType::NegotiationFailed => EndReason::NegotiationFailed("peer negotiation failed".to_string()),
        EventType::MediaAcquisitionFailed => {
            EndReason::MediaUnavailable(DeviceError::unavailable("media acquisition failed"))
        }
        _ => EndReason::LocalHangup,
    }
}
