use crate::state_table::{Action, EventTemplate, EventType, Guard, StateTableBuilder, Transition};
use crate::types::{CallDirection, CallState};

/// Add all transitions for calls received by the local user
pub fn add_incoming_transitions(builder: &mut StateTableBuilder) {
    let dir = CallDirection::Incoming;

    // Idle -> Ringing: remote is calling, the UI starts ringing on IncomingCall
    builder.add_transition(
        dir,
        CallState::Idle,
        EventType::IncomingCall,
        Transition {
            guards: vec![],
            actions: vec![Action::ArmRingTimer],
            next_state: Some(CallState::Ringing),
            follow_up: None,
            publish_events: vec![EventTemplate::StateChanged, EventTemplate::IncomingCall],
        },
    );

    // Ringing: local accept starts device acquisition
    builder.add_transition(
        dir,
        CallState::Ringing,
        EventType::AcceptCall,
        Transition {
            guards: vec![Guard::NoAcquisitionPending],
            actions: vec![Action::CancelRingTimer, Action::AcquireMedia],
            next_state: None,
            follow_up: None,
            publish_events: vec![],
        },
    );

    // Ringing -> Connecting: media acquired, wait for the caller's offer
    builder.add_transition(
        dir,
        CallState::Ringing,
        EventType::MediaAcquired,
        Transition {
            guards: vec![Guard::MediaStaged],
            actions: vec![
                Action::CreatePeerSession,
                Action::OpenSurface,
                Action::EmitAccept,
                Action::ArmNegotiationTimer,
            ],
            next_state: Some(CallState::Connecting),
            follow_up: None,
            publish_events: vec![EventTemplate::StateChanged],
        },
    );

    // Ringing -> Ended: local decline, hang-up while ringing, or missed
    builder.add_direct_end(dir, CallState::Ringing, EventType::RejectCall, vec![Action::EmitReject]);
    builder.add_direct_end(dir, CallState::Ringing, EventType::EndCall, vec![Action::EmitReject]);
    builder.add_direct_end(dir, CallState::Ringing, EventType::RingTimeout, vec![Action::EmitReject]);
    builder.add_direct_end(dir, CallState::Ringing, EventType::Shutdown, vec![Action::EmitReject]);
}
