//! Peer Session
//!
//! Owns exactly one peer-to-peer media connection's negotiation lifecycle:
//! `New → Negotiating → Connected ⇄ Disconnected → Closed`.

pub mod session;
pub mod transport;

pub use session::{Negotiation, PeerSession, PeerUpdate};
pub use transport::{
    IceCandidate, PeerConfig, PeerTransport, PeerTransportFactory, RemoteTrack, SdpType, SessionDescription,
    TransportEvent, TransportEventSink, TransportState,
};
