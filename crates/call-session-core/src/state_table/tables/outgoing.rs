use crate::state_table::{Action, EventTemplate, EventType, Guard, StateTableBuilder, Transition};
use crate::types::{CallDirection, CallState};

/// Add all transitions for calls placed by the local user
pub fn add_outgoing_transitions(builder: &mut StateTableBuilder) {
    let dir = CallDirection::Outgoing;

    // Idle -> Ringing: start a call
    builder.add_transition(
        dir,
        CallState::Idle,
        EventType::StartCall,
        Transition {
            guards: vec![],
            actions: vec![Action::EmitCallRequest, Action::ArmRingTimer],
            next_state: Some(CallState::Ringing),
            follow_up: None,
            publish_events: vec![EventTemplate::StateChanged],
        },
    );

    // Ringing: callee accepted, acquire local media before connecting
    builder.add_transition(
        dir,
        CallState::Ringing,
        EventType::RemoteAccepted,
        Transition {
            guards: vec![Guard::NoAcquisitionPending],
            actions: vec![Action::CancelRingTimer, Action::AcquireMedia],
            next_state: None,
            follow_up: None,
            publish_events: vec![],
        },
    );

    // Ringing -> Connecting: media acquired, create the peer and send the offer
    builder.add_transition(
        dir,
        CallState::Ringing,
        EventType::MediaAcquired,
        Transition {
            guards: vec![Guard::MediaStaged],
            actions: vec![
                Action::CreatePeerSession,
                Action::OpenSurface,
                Action::StartOffer,
                Action::ArmNegotiationTimer,
            ],
            next_state: Some(CallState::Connecting),
            follow_up: None,
            publish_events: vec![EventTemplate::StateChanged],
        },
    );

    // Ringing -> Ended: callee declined
    builder.add_direct_end(dir, CallState::Ringing, EventType::RemoteRejected, vec![]);

    // Ringing -> Ended: caller cancels before an answer
    builder.add_direct_end(dir, CallState::Ringing, EventType::EndCall, vec![Action::EmitEnd]);

    // Ringing -> Ended: nobody answered
    builder.add_direct_end(dir, CallState::Ringing, EventType::RingTimeout, vec![Action::EmitEnd]);

    builder.add_direct_end(dir, CallState::Ringing, EventType::Shutdown, vec![Action::EmitEnd]);
}
