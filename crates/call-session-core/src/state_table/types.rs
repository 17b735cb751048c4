use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::types::{CallDirection, CallState};

/// Key for looking up transitions in the state table
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub struct StateKey {
    pub direction: CallDirection,
    pub state: CallState,
    pub event: EventType,
}

/// Events that trigger transitions
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum EventType {
    // Local user actions
    StartCall,
    AcceptCall,
    RejectCall,
    EndCall,

    // Inbound signaling
    IncomingCall,
    RemoteAccepted,
    RemoteRejected,
    RemoteEnded,

    // Resource guard completions
    MediaAcquired,
    MediaAcquisitionFailed,

    // Peer session
    PeerConnected,
    NegotiationFailed,

    // Secondary surface
    SurfaceClosed,

    // Timers
    RingTimeout,
    NegotiationTimeout,

    // Internal coordination
    CleanupComplete,
    Shutdown,
}

impl EventType {
    pub fn type_name(&self) -> &'static str {
        match self {
            EventType::StartCall => "StartCall",
            EventType::AcceptCall => "AcceptCall",
            EventType::RejectCall => "RejectCall",
            EventType::EndCall => "EndCall",
            EventType::IncomingCall => "IncomingCall",
            EventType::RemoteAccepted => "RemoteAccepted",
            EventType::RemoteRejected => "RemoteRejected",
            EventType::RemoteEnded => "RemoteEnded",
            EventType::MediaAcquired => "MediaAcquired",
            EventType::MediaAcquisitionFailed => "MediaAcquisitionFailed",
            EventType::PeerConnected => "PeerConnected",
            EventType::NegotiationFailed => "NegotiationFailed",
            EventType::SurfaceClosed => "SurfaceClosed",
            EventType::RingTimeout => "RingTimeout",
            EventType::NegotiationTimeout => "NegotiationTimeout",
            EventType::CleanupComplete => "CleanupComplete",
            EventType::Shutdown => "Shutdown",
        }
    }
}

/// Transition definition - what happens when an event occurs in a state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transition {
    /// Conditions that must be true for this transition
    #[serde(default)]
    pub guards: Vec<Guard>,

    /// Actions to execute, in order
    #[serde(default)]
    pub actions: Vec<Action>,

    /// Next state (if changing)
    #[serde(default)]
    pub next_state: Option<CallState>,

    /// Internal event processed right after the actions
    #[serde(default)]
    pub follow_up: Option<EventType>,

    /// Events to publish after transition
    #[serde(default)]
    pub publish_events: Vec<EventTemplate>,
}

impl Transition {
    /// A transition that only changes state
    pub fn to(state: CallState) -> Self {
        Self {
            guards: vec![],
            actions: vec![],
            next_state: Some(state),
            follow_up: None,
            publish_events: vec![EventTemplate::StateChanged],
        }
    }
}

/// Guards that must be satisfied for a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Guard {
    /// No device acquisition is outstanding for the session
    NoAcquisitionPending,
    /// A device acquisition has resolved and its handle is staged
    MediaStaged,
    /// The session owns a peer session
    HasPeerSession,
}

/// Actions to execute during a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    // Signaling
    EmitCallRequest,
    EmitAccept,
    EmitReject,
    EmitEnd,

    // Resource guard
    AcquireMedia,

    // Peer session
    CreatePeerSession,
    StartOffer,

    // Secondary surface
    OpenSurface,

    // Timers
    ArmRingTimer,
    CancelRingTimer,
    ArmNegotiationTimer,
    CancelNegotiationTimer,

    // Bookkeeping
    MarkConnected,

    /// Single idempotent teardown of every resource the session holds
    Cleanup,
}

/// Event templates for publishing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventTemplate {
    StateChanged,
    IncomingCall,
    CallEnded,
}

/// States that must always have exit transitions if used
const CORE_STATES_REQUIRING_EXITS: &[CallState] = &[
    CallState::Idle,
    CallState::Ringing,
    CallState::Connecting,
    CallState::Active,
    CallState::Ending,
];

/// Master state table containing all transitions
#[derive(Debug)]
pub struct MasterStateTable {
    transitions: HashMap<StateKey, Transition>,
}

impl MasterStateTable {
    pub fn new() -> Self {
        Self {
            transitions: HashMap::new(),
        }
    }

    pub fn insert(&mut self, key: StateKey, transition: Transition) {
        self.transitions.insert(key, transition);
    }

    pub fn get(&self, key: &StateKey) -> Option<&Transition> {
        self.transitions.get(key)
    }

    pub fn has_transition(&self, key: &StateKey) -> bool {
        self.transitions.contains_key(key)
    }

    pub fn transition_count(&self) -> usize {
        self.transitions.len()
    }

    pub fn keys(&self) -> impl Iterator<Item = &StateKey> {
        self.transitions.keys()
    }

    /// Collect all states referenced in this state table
    pub fn collect_used_states(&self) -> HashSet<CallState> {
        let mut states = HashSet::new();
        for (key, transition) in &self.transitions {
            states.insert(key.state);
            if let Some(next_state) = &transition.next_state {
                states.insert(*next_state);
            }
        }
        states
    }

    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        for state in self.collect_used_states() {
            if state.is_terminal() {
                continue;
            }
            let has_exit = self.transitions.keys().any(|k| k.state == state);
            if !has_exit && CORE_STATES_REQUIRING_EXITS.contains(&state) {
                errors.push(format!("Core state {:?} has no exit transitions", state));
            }
        }

        for (key, transition) in &self.transitions {
            if key.state.is_terminal() {
                errors.push(format!("Terminal state {:?} has an outgoing transition on {:?}", key.state, key.event));
            }

            // Anything that leaves the live states must tear down
            let ends = matches!(transition.next_state, Some(CallState::Ending) | Some(CallState::Ended));
            if ends && key.state != CallState::Ending && !transition.actions.contains(&Action::Cleanup) {
                errors.push(format!(
                    "{:?}/{:?} on {:?} ends the call without Cleanup",
                    key.direction, key.state, key.event
                ));
            }

            if transition.next_state == Some(CallState::Ending)
                && transition.follow_up != Some(EventType::CleanupComplete)
            {
                errors.push(format!(
                    "{:?}/{:?} on {:?} enters Ending without CleanupComplete follow-up",
                    key.direction, key.state, key.event
                ));
            }

            // Peer sessions only exist once media is staged
            if transition.actions.contains(&Action::CreatePeerSession)
                && !transition.guards.contains(&Guard::MediaStaged)
            {
                errors.push(format!(
                    "{:?}/{:?} on {:?} creates a peer session without staged media",
                    key.direction, key.state, key.event
                ));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
