//! # Call-Session-Core
//!
//! Lifecycle of one-to-one voice/video calls for a realtime messenger.
//!
//! This crate provides:
//! - A table-driven call state machine (`Idle → Ringing → Connecting → Active → Ending → Ended`)
//! - Scoped acquisition of camera/microphone with guaranteed release
//! - Peer session negotiation over a host-supplied transport
//! - Translation to and from the JSON signaling wire format
//!
//! ## Architecture
//!
//! ```text
//!             ┌──────────────────────┐
//! app ───────▶│  CallSessionManager  │──────▶ CallEvent (broadcast)
//!             └──────────┬───────────┘
//!        ┌───────────────┼────────────────┬─────────────────┐
//!        ▼               ▼                ▼                 ▼
//!  ResourceGuard    PeerSession    SignalingBridge   SecondarySurface
//!  (MediaDevices)  (PeerTransport) (SignalingTransport)
//! ```
//!
//! The platform capabilities (capture devices, peer transport, signaling
//! relay and call window) are traits implemented by the host.

pub mod config;
pub mod errors;
pub mod manager;
pub mod peer;
pub mod resource_guard;
pub mod signaling;
pub mod state_table;
pub mod surface;
pub mod types;

pub use config::{CallConfig, IceServer, IceTransportPolicy};
pub use errors::{CallError, ConfigError, DeviceError, PeerError, Result, SignalingError, SurfaceError};
pub use manager::{CallEvent, CallSessionManager, CallSessionManagerBuilder, ProcessEventResult};
pub use peer::{
    IceCandidate, PeerConfig, PeerTransport, PeerTransportFactory, RemoteTrack, SdpType, SessionDescription,
    TransportEvent, TransportEventSink, TransportState,
};
pub use resource_guard::{LocalTrack, MediaDevices, MediaHandle, ResourceGuard, TrackKind};
pub use signaling::{InboundSignal, SignalMessage, SignalingBridge, SignalingTransport};
pub use state_table::{EventType, MASTER_TABLE};
pub use surface::{SecondarySurface, SurfaceClosedNotifier, SurfaceHandle, SurfaceParams};
pub use types::{
    CallDirection, CallSnapshot, CallState, ConnectionState, EndReason, MediaKind, SessionId, TransitionRecord,
    UserId,
};
