//! Signaling Bridge
//!
//! Translates between typed call events and [`SignalMessage`] frames.
//! Outbound emits are fire-and-forget: a failed publish is logged and the
//! call carries on, since delivery is never confirmed by the relay.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

use super::messages::{InboundSignal, SignalMessage};
use crate::errors::SignalingError;
use crate::peer::{IceCandidate, SessionDescription};
use crate::types::{MediaKind, UserId};

/// Outbound half of the signaling channel
#[async_trait]
pub trait SignalingTransport: Send + Sync {
    async fn publish(&self, message: SignalMessage) -> Result<(), SignalingError>;
}

pub struct SignalingBridge {
    transport: Arc<dyn SignalingTransport>,
    local_user: UserId,
}

impl SignalingBridge {
    pub fn new(transport: Arc<dyn SignalingTransport>, local_user: UserId) -> Self {
        Self { transport, local_user }
    }

    pub fn local_user(&self) -> &UserId {
        &self.local_user
    }

    /// Parse a raw JSON frame
    pub fn decode(raw: &str) -> Result<SignalMessage, SignalingError> {
        SignalMessage::from_json(raw)
    }

    /// Turn a frame into an inbound event for the local user
    ///
    /// Returns `None` for frames addressed to someone else and for frames
    /// that only travel outbound.
    pub fn translate(&self, message: SignalMessage) -> Option<InboundSignal> {
        let me = &self.local_user;
        let inbound = match message {
            SignalMessage::IncomingCall { from_user_id, call_type } => InboundSignal::IncomingCall {
                caller_id: from_user_id,
                media_kind: call_type,
            },
            // Relays that forward the request verbatim
            SignalMessage::CallUser {
                from_user_id,
                to_user_id,
                call_type,
            } if &to_user_id == me => InboundSignal::IncomingCall {
                caller_id: from_user_id,
                media_kind: call_type,
            },
            SignalMessage::AcceptCall { caller_id, callee_id } if &caller_id == me => {
                InboundSignal::CallAccepted { callee_id }
            }
            SignalMessage::RejectCall { caller_id, callee_id } if &caller_id == me => {
                InboundSignal::CallRejected { callee_id }
            }
            SignalMessage::CallEnded {
                to_user_id,
                from_user_id,
            } if &to_user_id == me => InboundSignal::CallEnded { peer_id: from_user_id },
            SignalMessage::Negotiation {
                from_user_id,
                to_user_id,
                description,
            } if &to_user_id == me => InboundSignal::Description {
                from: from_user_id,
                description,
            },
            SignalMessage::IceCandidate {
                from_user_id,
                to_user_id,
                candidate,
            } if &to_user_id == me => InboundSignal::Candidate {
                from: from_user_id,
                candidate,
            },
            other => {
                debug!("Dropping {} frame not addressed to {}", other.event_name(), me);
                return None;
            }
        };
        Some(inbound)
    }

    pub async fn emit_call(&self, callee: &UserId, kind: MediaKind) {
        self.send(SignalMessage::CallUser {
            from_user_id: self.local_user.clone(),
            to_user_id: callee.clone(),
            call_type: kind,
        })
        .await;
    }

    pub async fn emit_accept(&self, caller: &UserId) {
        self.send(SignalMessage::AcceptCall {
            caller_id: caller.clone(),
            callee_id: self.local_user.clone(),
        })
        .await;
    }

    pub async fn emit_reject(&self, caller: &UserId) {
        self.send(SignalMessage::RejectCall {
            caller_id: caller.clone(),
            callee_id: self.local_user.clone(),
        })
        .await;
    }

    pub async fn emit_end(&self, remote: &UserId) {
        self.send(SignalMessage::CallEnded {
            to_user_id: remote.clone(),
            from_user_id: self.local_user.clone(),
        })
        .await;
    }

    pub async fn emit_negotiation(&self, remote: &UserId, description: SessionDescription) {
        self.send(SignalMessage::Negotiation {
            from_user_id: self.local_user.clone(),
            to_user_id: remote.clone(),
            description,
        })
        .await;
    }

    pub async fn emit_candidate(&self, remote: &UserId, candidate: IceCandidate) {
        self.send(SignalMessage::IceCandidate {
            from_user_id: self.local_user.clone(),
            to_user_id: remote.clone(),
            candidate,
        })
        .await;
    }

    async fn send(&self, message: SignalMessage) {
        let event = message.event_name();
        debug!("Publishing {} signal", event);
        if let Err(e) = self.transport.publish(message).await {
            warn!("Failed to publish {} signal: {}", event, e);
        }
    }
}
