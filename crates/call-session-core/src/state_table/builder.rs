use super::types::{Action, EventTemplate, EventType, MasterStateTable, StateKey, Transition};
use crate::types::{CallDirection, CallState};

/// Both call directions, for rows that apply to caller and callee alike
pub const BOTH_DIRECTIONS: [CallDirection; 2] = [CallDirection::Outgoing, CallDirection::Incoming];

/// Incrementally assembles a [`MasterStateTable`]
pub struct StateTableBuilder {
    table: MasterStateTable,
}

impl StateTableBuilder {
    pub fn new() -> Self {
        Self {
            table: MasterStateTable::new(),
        }
    }

    pub fn add_transition(
        &mut self,
        direction: CallDirection,
        state: CallState,
        event: EventType,
        transition: Transition,
    ) -> &mut Self {
        let key = StateKey { direction, state, event };
        if self.table.has_transition(&key) {
            tracing::warn!("Overriding transition {:?}/{:?} on {:?}", direction, state, event);
        }
        self.table.insert(key, transition);
        self
    }

    /// Add the same transition for caller and callee
    pub fn add_for_both(&mut self, state: CallState, event: EventType, transition: Transition) -> &mut Self {
        for direction in BOTH_DIRECTIONS {
            self.add_transition(direction, state, event, transition.clone());
        }
        self
    }

    /// Add a transition into `Ending`: run `actions`, then `Cleanup`, then
    /// finish through `CleanupComplete`
    pub fn add_teardown(
        &mut self,
        direction: CallDirection,
        state: CallState,
        event: EventType,
        actions: Vec<Action>,
    ) -> &mut Self {
        let mut actions = actions;
        actions.push(Action::Cleanup);
        self.add_transition(
            direction,
            state,
            event,
            Transition {
                guards: vec![],
                actions,
                next_state: Some(CallState::Ending),
                follow_up: Some(EventType::CleanupComplete),
                publish_events: vec![EventTemplate::StateChanged],
            },
        )
    }

    /// Add a direct transition into `Ended` for sessions holding no peer
    pub fn add_direct_end(
        &mut self,
        direction: CallDirection,
        state: CallState,
        event: EventType,
        actions: Vec<Action>,
    ) -> &mut Self {
        let mut actions = actions;
        actions.push(Action::Cleanup);
        self.add_transition(
            direction,
            state,
            event,
            Transition {
                guards: vec![],
                actions,
                next_state: Some(CallState::Ended),
                follow_up: None,
                publish_events: vec![EventTemplate::StateChanged, EventTemplate::CallEnded],
            },
        )
    }

    pub fn build(self) -> MasterStateTable {
        self.table
    }
}
