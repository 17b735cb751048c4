//! Peer Session - one negotiated media connection
//!
//! Owns the transport and the call's local media. Transport hooks are fed
//! back through [`PeerSession::apply_transport_event`], which turns them into
//! [`PeerUpdate`]s for the owner. Once closed, nothing mutates the session.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::transport::{
    IceCandidate, PeerConfig, PeerTransport, PeerTransportFactory, RemoteTrack, SdpType,
    SessionDescription, TransportEvent, TransportEventSink, TransportState,
};
use crate::errors::PeerError;
use crate::resource_guard::{MediaHandle, ResourceGuard};
use crate::types::ConnectionState;

/// Which side of the offer/answer exchange to run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Negotiation {
    /// Create and apply a local offer
    Offer,
    /// Apply the remote offer and create an answer
    Answer { remote_offer: SessionDescription },
}

/// What a transport event means to the session owner
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerUpdate {
    /// Local candidate to forward to the remote peer
    LocalCandidate(IceCandidate),
    RemoteTrack(RemoteTrack),
    Connected,
    Disconnected,
    /// Negotiation or transport failed; not retried
    Failed(String),
    /// Nothing for the owner to do
    Ignored,
}

pub struct PeerSession {
    transport: Arc<dyn PeerTransport>,
    guard: Arc<ResourceGuard>,
    local_media: Option<MediaHandle>,
    remote_tracks: Vec<RemoteTrack>,
    state: ConnectionState,
    /// Cleared on close so late transport callbacks are dropped
    attached: Arc<AtomicBool>,
}

impl PeerSession {
    /// Create a session in `New` with the local tracks attached
    ///
    /// On failure the media handle is released before returning.
    pub async fn create(
        config: &PeerConfig,
        factory: &dyn PeerTransportFactory,
        guard: Arc<ResourceGuard>,
        media: MediaHandle,
        on_event: TransportEventSink,
    ) -> Result<Self, PeerError> {
        let attached = Arc::new(AtomicBool::new(true));
        let gate = attached.clone();
        let sink: TransportEventSink = Arc::new(move |event| {
            if gate.load(Ordering::SeqCst) {
                on_event(event);
            }
        });

        let transport = match factory.create(config, sink) {
            Ok(transport) => transport,
            Err(e) => {
                guard.release(&media).await;
                return Err(e);
            }
        };

        if let Err(e) = transport.add_local_tracks(media.tracks()).await {
            attached.store(false, Ordering::SeqCst);
            transport.close().await;
            guard.release(&media).await;
            return Err(e);
        }

        debug!("Peer session created with {} local tracks", media.tracks().len());

        Ok(Self {
            transport,
            guard,
            local_media: Some(media),
            remote_tracks: Vec::new(),
            state: ConnectionState::New,
            attached,
        })
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_closed(&self) -> bool {
        self.state == ConnectionState::Closed
    }

    pub fn remote_tracks(&self) -> &[RemoteTrack] {
        &self.remote_tracks
    }

    pub fn local_media(&self) -> Option<&MediaHandle> {
        self.local_media.as_ref()
    }

    /// Run our side of the offer/answer exchange
    ///
    /// Returns the local description to send to the remote peer.
    pub async fn start_negotiation(&mut self, negotiation: Negotiation) -> Result<SessionDescription, PeerError> {
        if self.is_closed() {
            return Err(PeerError::Closed);
        }

        let local = match negotiation {
            Negotiation::Offer => {
                let offer = self
                    .transport
                    .create_offer()
                    .await
                    .map_err(|e| PeerError::negotiation(format!("create offer: {}", e)))?;
                self.transport
                    .set_local_description(offer.clone())
                    .await
                    .map_err(|e| PeerError::negotiation(format!("set local offer: {}", e)))?;
                offer
            }
            Negotiation::Answer { remote_offer } => {
                if remote_offer.sdp_type != SdpType::Offer {
                    return Err(PeerError::negotiation("expected a remote offer"));
                }
                self.transport
                    .set_remote_description(remote_offer)
                    .await
                    .map_err(|e| PeerError::negotiation(format!("set remote offer: {}", e)))?;
                let answer = self
                    .transport
                    .create_answer()
                    .await
                    .map_err(|e| PeerError::negotiation(format!("create answer: {}", e)))?;
                self.transport
                    .set_local_description(answer.clone())
                    .await
                    .map_err(|e| PeerError::negotiation(format!("set local answer: {}", e)))?;
                answer
            }
        };

        if self.state == ConnectionState::New {
            self.state = ConnectionState::Negotiating;
        }
        Ok(local)
    }

    /// Apply the remote peer's answer to our offer
    pub async fn apply_remote_answer(&mut self, answer: SessionDescription) -> Result<(), PeerError> {
        match self.state {
            ConnectionState::Closed => return Err(PeerError::Closed),
            ConnectionState::Negotiating => {}
            other => {
                return Err(PeerError::InvalidState {
                    operation: "apply_remote_answer",
                    state: other.to_string(),
                })
            }
        }
        if answer.sdp_type != SdpType::Answer {
            return Err(PeerError::negotiation("expected a remote answer"));
        }
        self.transport
            .set_remote_description(answer)
            .await
            .map_err(|e| PeerError::negotiation(format!("set remote answer: {}", e)))
    }

    /// Add a candidate trickled by the remote peer
    ///
    /// After close the candidate is dropped with a log line.
    pub async fn add_remote_candidate(&self, candidate: IceCandidate) -> Result<(), PeerError> {
        if self.is_closed() {
            warn!("Dropping remote candidate for closed peer session");
            return Ok(());
        }
        self.transport.add_ice_candidate(candidate).await
    }

    pub fn apply_transport_event(&mut self, event: TransportEvent) -> PeerUpdate {
        if self.is_closed() {
            return PeerUpdate::Ignored;
        }

        match event {
            TransportEvent::CandidateGenerated(candidate) => PeerUpdate::LocalCandidate(candidate),
            TransportEvent::TrackReceived(track) => {
                if self.remote_tracks.iter().any(|t| t.id == track.id) {
                    return PeerUpdate::Ignored;
                }
                self.remote_tracks.push(track.clone());
                PeerUpdate::RemoteTrack(track)
            }
            TransportEvent::ConnectionStateChanged(transport_state) => match transport_state {
                TransportState::Connected => {
                    if self.state == ConnectionState::Connected {
                        PeerUpdate::Ignored
                    } else {
                        self.state = ConnectionState::Connected;
                        PeerUpdate::Connected
                    }
                }
                TransportState::Disconnected => {
                    if self.state == ConnectionState::Connected {
                        self.state = ConnectionState::Disconnected;
                        PeerUpdate::Disconnected
                    } else {
                        PeerUpdate::Ignored
                    }
                }
                TransportState::Failed => PeerUpdate::Failed("ice connection failed".to_string()),
                TransportState::Closed => PeerUpdate::Failed("transport closed by remote".to_string()),
                TransportState::New | TransportState::Checking => PeerUpdate::Ignored,
            },
        }
    }

    /// Terminal and idempotent
    ///
    /// Detaches the transport callback, closes the transport and releases
    /// the local media through the resource guard.
    pub async fn close(&mut self) {
        if self.is_closed() {
            return;
        }
        self.state = ConnectionState::Closed;
        self.attached.store(false, Ordering::SeqCst);
        self.transport.close().await;

        if let Some(media) = self.local_media.take() {
            self.guard.release(&media).await;
        }
        info!("Peer session closed");
    }
}
