//! Wire messages exchanged with the signaling relay
//!
//! JSON frames of the form `{"event": "<name>", "data": {...}}` with
//! camelCase field names.

use serde::{Deserialize, Serialize};

use crate::errors::SignalingError;
use crate::peer::{IceCandidate, SessionDescription};
use crate::types::{MediaKind, UserId};

/// One signaling frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum SignalMessage {
    /// Caller asks the relay to ring the callee
    #[serde(rename_all = "camelCase")]
    CallUser {
        from_user_id: UserId,
        to_user_id: UserId,
        call_type: MediaKind,
    },

    /// Relay rings the callee
    #[serde(rename_all = "camelCase")]
    IncomingCall { from_user_id: UserId, call_type: MediaKind },

    #[serde(rename_all = "camelCase")]
    AcceptCall { caller_id: UserId, callee_id: UserId },

    #[serde(rename_all = "camelCase")]
    RejectCall { caller_id: UserId, callee_id: UserId },

    #[serde(rename_all = "camelCase")]
    CallEnded { to_user_id: UserId, from_user_id: UserId },

    /// Session description (offer or answer)
    #[serde(rename_all = "camelCase")]
    Negotiation {
        from_user_id: UserId,
        to_user_id: UserId,
        description: SessionDescription,
    },

    #[serde(rename_all = "camelCase")]
    IceCandidate {
        from_user_id: UserId,
        to_user_id: UserId,
        candidate: IceCandidate,
    },
}

impl SignalMessage {
    /// Name of the `event` field on the wire
    pub fn event_name(&self) -> &'static str {
        match self {
            SignalMessage::CallUser { .. } => "callUser",
            SignalMessage::IncomingCall { .. } => "incomingCall",
            SignalMessage::AcceptCall { .. } => "acceptCall",
            SignalMessage::RejectCall { .. } => "rejectCall",
            SignalMessage::CallEnded { .. } => "callEnded",
            SignalMessage::Negotiation { .. } => "negotiation",
            SignalMessage::IceCandidate { .. } => "iceCandidate",
        }
    }

    pub fn to_json(&self) -> Result<String, SignalingError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(raw: &str) -> Result<Self, SignalingError> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// Inbound signaling events addressed to the local user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundSignal {
    IncomingCall { caller_id: UserId, media_kind: MediaKind },
    CallAccepted { callee_id: UserId },
    CallRejected { callee_id: UserId },
    CallEnded { peer_id: UserId },
    Description { from: UserId, description: SessionDescription },
    Candidate { from: UserId, candidate: IceCandidate },
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_call_user_wire_shape() {
        let msg = SignalMessage::CallUser {
            from_user_id: UserId::from("alice"),
            to_user_id: UserId::from("bob"),
            call_type: MediaKind::Video,
        };
        let value: serde_json::Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({
                "event": "callUser",
                "data": { "fromUserId": "alice", "toUserId": "bob", "callType": "video" }
            })
        );
        assert_eq!(msg.event_name(), "callUser");
    }

    #[test]
    fn test_parse_accept_call() {
        let raw = r#"{"event":"acceptCall","data":{"callerId":"alice","calleeId":"bob"}}"#;
        let msg = SignalMessage::from_json(raw).unwrap();
        assert_eq!(
            msg,
            SignalMessage::AcceptCall {
                caller_id: UserId::from("alice"),
                callee_id: UserId::from("bob"),
            }
        );
    }

    #[test]
    fn test_parse_negotiation_with_description() {
        let raw = r#"{"event":"negotiation","data":{"fromUserId":"bob","toUserId":"alice",
            "description":{"type":"answer","sdp":"v=0"}}}"#;
        match SignalMessage::from_json(raw).unwrap() {
            SignalMessage::Negotiation { description, .. } => {
                assert_eq!(description, SessionDescription::answer("v=0"));
            }
            other => panic!("unexpected message {:?}", other),
        }
    }

    #[test]
    fn test_unknown_event_is_malformed() {
        let err = SignalMessage::from_json(r#"{"event":"dance","data":{}}"#).unwrap_err();
        assert!(matches!(err, SignalingError::Malformed { .. }));

        let err = SignalMessage::from_json("not json").unwrap_err();
        assert!(matches!(err, SignalingError::Malformed { .. }));
    }
}
