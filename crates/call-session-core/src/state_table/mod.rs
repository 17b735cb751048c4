pub mod types;
pub mod builder;
pub mod tables;
pub mod yaml_loader;

pub use types::*;
pub use builder::{StateTableBuilder, BOTH_DIRECTIONS};
pub use yaml_loader::YamlTableLoader;

use lazy_static::lazy_static;
use std::sync::Arc;

lazy_static! {
    /// The master state table - single source of truth for all transitions
    pub static ref MASTER_TABLE: Arc<MasterStateTable> = Arc::new(build_master_table());
}

/// Assemble the default table without validating it
pub fn default_table() -> MasterStateTable {
    let mut builder = StateTableBuilder::new();
    tables::add_outgoing_transitions(&mut builder);
    tables::add_incoming_transitions(&mut builder);
    tables::add_common_transitions(&mut builder);
    builder.build()
}

/// Environment variable naming a YAML table to use instead of the built-in one
pub const STATE_TABLE_ENV_VAR: &str = "CALL_SESSION_STATE_TABLE";

/// Build the complete master state table
fn build_master_table() -> MasterStateTable {
    if let Ok(custom_path) = std::env::var(STATE_TABLE_ENV_VAR) {
        tracing::info!("Loading custom call state table from: {}", custom_path);
        match YamlTableLoader::load_from_file(&custom_path) {
            Ok(table) => return table,
            Err(e) => tracing::warn!("Custom call state table rejected, using built-in table: {}", e),
        }
    }

    let table = default_table();

    if let Err(errors) = table.validate() {
        panic!("Invalid default state table: {:?}", errors);
    }

    tracing::debug!("Built call state table with {} transitions", table.transition_count());
    table
}
