//! Shared hub state

use std::sync::Arc;

use rh_core::traits::Connector;
use rh_core::{ConnectionRegistry, HubConfig};

use crate::auth::UserTable;
use crate::link::RconConnector;

/// State shared by every SSH connection
pub struct HubState {
    /// Finalized configuration
    pub config: HubConfig,
    /// Connections operators can attach to
    pub registry: Arc<ConnectionRegistry>,
    /// SSH users
    pub users: Arc<UserTable>,
    /// Opens console links for sessions
    pub connector: Arc<dyn Connector>,
}

impl HubState {
    /// Build state from a validated configuration, talking RCON to consoles
    pub fn new(config: HubConfig) -> Self {
        Self::with_connector(config, Arc::new(RconConnector::new()))
    }

    /// Build state with a custom connector
    pub fn with_connector(config: HubConfig, connector: Arc<dyn Connector>) -> Self {
        Self {
            registry: Arc::new(ConnectionRegistry::from_config(&config)),
            users: Arc::new(UserTable::from_config(&config)),
            connector,
            config,
        }
    }

    /// Input history kept per session
    pub fn history_size(&self) -> usize {
        self.config.history_size
    }
}
