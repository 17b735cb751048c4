//! Signaling Bridge
//!
//! Call-control and negotiation messages travel over an external
//! publish/subscribe relay. This module owns the wire format and the
//! translation to and from typed events; the relay itself is a
//! [`SignalingTransport`] supplied by the host.

pub mod bridge;
pub mod messages;

pub use bridge::{SignalingBridge, SignalingTransport};
pub use messages::{InboundSignal, SignalMessage};
