use crate::state_table::{Action, EventTemplate, EventType, Guard, StateTableBuilder, Transition, BOTH_DIRECTIONS};
use crate::types::CallState;

/// Add transitions that apply to both outgoing and incoming calls
pub fn add_common_transitions(builder: &mut StateTableBuilder) {
    for dir in BOTH_DIRECTIONS {
        // Remote hang-up ends any live call
        for state in [CallState::Ringing, CallState::Connecting, CallState::Active] {
            builder.add_teardown(dir, state, EventType::RemoteEnded, vec![]);
        }

        // Device acquisition failed while accepting
        builder.add_teardown(dir, CallState::Ringing, EventType::MediaAcquisitionFailed, vec![Action::EmitEnd]);

        // Connecting: negotiation failure or timeout
        builder.add_teardown(dir, CallState::Connecting, EventType::NegotiationFailed, vec![Action::EmitEnd]);
        builder.add_teardown(dir, CallState::Connecting, EventType::NegotiationTimeout, vec![Action::EmitEnd]);

        // Active: transport failed after connecting
        builder.add_teardown(dir, CallState::Active, EventType::NegotiationFailed, vec![Action::EmitEnd]);

        // Local hang-up, call window closed, or application shutdown
        for state in [CallState::Connecting, CallState::Active] {
            builder.add_teardown(dir, state, EventType::EndCall, vec![Action::EmitEnd]);
            builder.add_teardown(dir, state, EventType::SurfaceClosed, vec![Action::EmitEnd]);
            builder.add_teardown(dir, state, EventType::Shutdown, vec![Action::EmitEnd]);
        }
    }

    // Connecting -> Active: peer connected
    builder.add_for_both(
        CallState::Connecting,
        EventType::PeerConnected,
        Transition {
            guards: vec![Guard::HasPeerSession],
            actions: vec![Action::CancelNegotiationTimer, Action::MarkConnected],
            next_state: Some(CallState::Active),
            follow_up: None,
            publish_events: vec![EventTemplate::StateChanged],
        },
    );

    // Ending -> Ended: cleanup finished
    builder.add_for_both(
        CallState::Ending,
        EventType::CleanupComplete,
        Transition {
            guards: vec![],
            actions: vec![],
            next_state: Some(CallState::Ended),
            follow_up: None,
            publish_events: vec![EventTemplate::StateChanged, EventTemplate::CallEnded],
        },
    );
}
