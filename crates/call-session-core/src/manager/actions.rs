use chrono::Utc;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::session::CallSession;
use super::{Inner, ManagerInput, PendingAcquisition};
use crate::errors::PeerError;
use crate::peer::{Negotiation, PeerSession, TransportEventSink};
use crate::state_table::Action;
use crate::surface::{SurfaceClosedNotifier, SurfaceParams};

impl Inner {
    /// Execute an action from the state table
    ///
    /// Only peer operations can fail; signaling emits and surface failures
    /// are logged and swallowed.
    pub(crate) async fn execute_action(
        &self,
        action: &Action,
        session: &mut CallSession,
        acquisitions: &mut Vec<PendingAcquisition>,
    ) -> Result<(), PeerError> {
        debug!("Executing action {:?} for session {}", action, session.id);

        match action {
            // Signaling
            Action::EmitCallRequest => {
                self.bridge.emit_call(&session.remote_user_id, session.media_kind).await;
            }
            Action::EmitAccept => {
                self.bridge.emit_accept(&session.remote_user_id).await;
            }
            Action::EmitReject => {
                self.bridge.emit_reject(&session.remote_user_id).await;
            }
            Action::EmitEnd => {
                self.bridge.emit_end(&session.remote_user_id).await;
            }

            // Media and peer
            Action::AcquireMedia => {
                let ticket = self.next_ticket.fetch_add(1, Ordering::SeqCst) + 1;
                session.acquisition = Some(ticket);
                acquisitions.push(PendingAcquisition {
                    session_id: session.id.clone(),
                    ticket,
                    kind: session.media_kind,
                });
            }
            Action::CreatePeerSession => {
                let media = session.staged_media.take().ok_or_else(|| PeerError::Creation {
                    message: "no local media staged".to_string(),
                })?;

                let tx = self.input_tx.clone();
                let session_id = session.id.clone();
                let sink: TransportEventSink = Arc::new(move |event| {
                    let _ = tx.send(ManagerInput::Transport {
                        session_id: session_id.clone(),
                        event,
                    });
                });

                let peer = PeerSession::create(
                    &self.peer_config,
                    self.peer_factory.as_ref(),
                    self.guard.clone(),
                    media,
                    sink,
                )
                .await?;
                session.peer = Some(peer);
            }
            Action::StartOffer => {
                let peer = session.peer.as_mut().ok_or(PeerError::InvalidState {
                    operation: "start_offer",
                    state: "no peer session".to_string(),
                })?;
                let offer = peer.start_negotiation(Negotiation::Offer).await?;
                self.bridge.emit_negotiation(&session.remote_user_id, offer).await;
            }
            Action::OpenSurface => self.open_surface(session).await,

            // Timers
            Action::ArmRingTimer => {
                if let Some(timeout) = self.config.ring_timeout() {
                    let input = ManagerInput::RingTimeout {
                        session_id: session.id.clone(),
                    };
                    session.ring_timer = Some(self.spawn_timer(timeout, input));
                }
            }
            Action::CancelRingTimer => {
                if let Some(timer) = session.ring_timer.take() {
                    timer.abort();
                }
            }
            Action::ArmNegotiationTimer => {
                if let Some(timeout) = self.config.negotiation_timeout() {
                    let input = ManagerInput::NegotiationTimeout {
                        session_id: session.id.clone(),
                    };
                    session.negotiation_timer = Some(self.spawn_timer(timeout, input));
                }
            }
            Action::CancelNegotiationTimer => {
                if let Some(timer) = session.negotiation_timer.take() {
                    timer.abort();
                }
            }

            Action::MarkConnected => {
                session.connected_at = Some(Utc::now());
                info!("Call session {} connected with {}", session.id, session.remote_user_id);
            }
            Action::Cleanup => self.cleanup(session).await,
        }

        Ok(())
    }

    /// Release everything the session holds
    ///
    /// Runs at most once per session, however many terminal events arrive.
    pub(crate) async fn cleanup(&self, session: &mut CallSession) {
        if session.cleaned_up {
            debug!("Call session {} already cleaned up", session.id);
            return;
        }
        session.cleaned_up = true;

        session.abort_timers();
        if session.acquisition.take().is_some() {
            debug!("Invalidated pending media acquisition for {}", session.id);
        }
        if let Some(media) = session.staged_media.take() {
            self.guard.release(&media).await;
        }
        if let Some(peer) = session.peer.as_mut() {
            peer.close().await;
        }
        if let Some(handle) = session.surface.take() {
            if let Err(e) = self.surface.close(&handle).await {
                error!("Failed to close surface {} for session {}: {}", handle, session.id, e);
            }
        }

        info!("Cleaned up call session {}", session.id);
    }

    async fn open_surface(&self, session: &mut CallSession) {
        let params = SurfaceParams {
            session_id: session.id.clone(),
            local_user_id: session.local_user_id.clone(),
            remote_user_id: session.remote_user_id.clone(),
            media_kind: session.media_kind,
        };

        match self.surface.open(params).await {
            Ok(handle) => {
                let notifier = SurfaceClosedNotifier::new(session.id.clone(), handle.clone(), self.input_tx.clone());
                self.surface.on_closed(&handle, notifier);
                debug!("Opened surface {} for session {}", handle, session.id);
                session.surface = Some(handle);
            }
            Err(e) => warn!("Continuing call {} without a surface: {}", session.id, e),
        }
    }

    fn spawn_timer(&self, delay: Duration, input: ManagerInput) -> JoinHandle<()> {
        let tx = self.input_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(input);
        })
    }
}
