//! Peer transport capability
//!
//! The peer-to-peer media transport (offer/answer and ICE candidate
//! exchange) is consumed through these traits. Payloads are opaque to this
//! crate beyond pass-through to signaling.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::{CallConfig, IceServer, IceTransportPolicy};
use crate::errors::PeerError;
use crate::resource_guard::{LocalTrack, TrackKind};

/// Offer or answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpType {
    Offer,
    Answer,
}

/// A local or remote session description
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub sdp_type: SdpType,
    pub sdp: String,
}

impl SessionDescription {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            sdp_type: SdpType::Offer,
            sdp: sdp.into(),
        }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            sdp_type: SdpType::Answer,
            sdp: sdp.into(),
        }
    }
}

/// A trickled ICE candidate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidate {
    pub candidate: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdp_mid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdp_m_line_index: Option<u16>,
}

impl IceCandidate {
    pub fn new(candidate: impl Into<String>) -> Self {
        Self {
            candidate: candidate.into(),
            sdp_mid: None,
            sdp_m_line_index: None,
        }
    }
}

/// A track received from the remote peer
///
/// Unowned: the transport layer manages its lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteTrack {
    pub id: String,
    pub kind: TrackKind,
    pub stream_id: Option<String>,
}

/// Connection state reported by the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransportState {
    New,
    Checking,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

/// Lifecycle hooks raised by the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    CandidateGenerated(IceCandidate),
    TrackReceived(RemoteTrack),
    ConnectionStateChanged(TransportState),
}

/// Callback the transport invokes for every [`TransportEvent`]
pub type TransportEventSink = Arc<dyn Fn(TransportEvent) + Send + Sync>;

/// Transport settings derived from [`CallConfig`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerConfig {
    pub ice_servers: Vec<IceServer>,
    pub ice_transport_policy: IceTransportPolicy,
}

impl From<&CallConfig> for PeerConfig {
    fn from(config: &CallConfig) -> Self {
        Self {
            ice_servers: config.ice_servers.clone(),
            ice_transport_policy: config.ice_transport_policy,
        }
    }
}

/// One peer-to-peer media connection
#[async_trait]
pub trait PeerTransport: Send + Sync {
    async fn add_local_tracks(&self, tracks: &[Arc<dyn LocalTrack>]) -> Result<(), PeerError>;

    async fn create_offer(&self) -> Result<SessionDescription, PeerError>;

    async fn create_answer(&self) -> Result<SessionDescription, PeerError>;

    async fn set_local_description(&self, description: SessionDescription) -> Result<(), PeerError>;

    async fn set_remote_description(&self, description: SessionDescription) -> Result<(), PeerError>;

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), PeerError>;

    /// Tear down the connection; must tolerate repeated calls
    async fn close(&self);
}

/// Creates peer transports
pub trait PeerTransportFactory: Send + Sync {
    fn create(&self, config: &PeerConfig, events: TransportEventSink) -> Result<Arc<dyn PeerTransport>, PeerError>;
}
