//! Server state.

use crate::config::EditingConfig;
use crate::editing::{EditingClient, EditingService};

/// Application state shared across handlers.
pub struct AppState {
    pub editing: EditingService<Box<dyn EditingClient>>,
}

impl AppState {
    pub fn new(config: EditingConfig, client: Box<dyn EditingClient>) -> Self {
        Self {
            editing: EditingService::new(client, config),
        }
    }
}
