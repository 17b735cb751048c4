//! Load a transition table from YAML
//!
//! Rows without a `direction` apply to both caller and callee:
//!
//! ```yaml
//! transitions:
//!   - direction: Outgoing
//!     state: Idle
//!     event: StartCall
//!     actions: [EmitCallRequest, ArmRingTimer]
//!     next_state: Ringing
//!     publish_events: [StateChanged]
//!   - state: Active
//!     event: RemoteEnded
//!     actions: [CancelNegotiationTimer, Cleanup]
//!     next_state: Ending
//!     follow_up: CleanupComplete
//!     publish_events: [StateChanged]
//! ```

use serde::Deserialize;
use std::path::Path;

use super::builder::StateTableBuilder;
use super::types::{EventType, MasterStateTable, Transition};
use crate::errors::ConfigError;
use crate::types::{CallDirection, CallState};

#[derive(Debug, Deserialize)]
struct YamlTable {
    transitions: Vec<YamlTransition>,
}

#[derive(Debug, Deserialize)]
struct YamlTransition {
    #[serde(default)]
    direction: Option<CallDirection>,
    state: CallState,
    event: EventType,
    #[serde(flatten)]
    transition: Transition,
}

pub struct YamlTableLoader;

impl YamlTableLoader {
    /// Parse and validate a table
    pub fn load_from_str(yaml: &str) -> Result<MasterStateTable, ConfigError> {
        let parsed: YamlTable = serde_yaml::from_str(yaml)?;

        let mut builder = StateTableBuilder::new();
        for row in parsed.transitions {
            match row.direction {
                Some(direction) => builder.add_transition(direction, row.state, row.event, row.transition),
                None => builder.add_for_both(row.state, row.event, row.transition),
            };
        }

        let table = builder.build();
        table
            .validate()
            .map_err(|errors| ConfigError::invalid(format!("state table: {}", errors.join("; "))))?;
        Ok(table)
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> Result<MasterStateTable, ConfigError> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::load_from_str(&yaml)
    }
}
