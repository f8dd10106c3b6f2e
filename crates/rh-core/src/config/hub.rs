//! Hub configuration

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use super::connection::ConnectionSpec;
use super::serde_utils;
use crate::error::ConfigError;

/// Default SSH listen address
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:2222";

/// Default number of remembered input lines per session
pub const DEFAULT_HISTORY_SIZE: usize = 100;

/// Configuration for the hub daemon
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    /// Address to bind the SSH server to (`host:port` or `:port`)
    pub bind: String,

    /// PEM/OpenSSH file holding the SSH host key
    pub host_key_file: Option<PathBuf>,

    /// Input history kept per operator session
    pub history_size: usize,

    /// SSH users and their passwords
    pub users: BTreeMap<String, UserEntry>,

    /// Pre-defined console connections
    pub connections: BTreeMap<String, ConnectionEntry>,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND_ADDRESS.to_string(),
            host_key_file: None,
            history_size: DEFAULT_HISTORY_SIZE,
            users: BTreeMap::new(),
            connections: BTreeMap::new(),
        }
    }
}

/// An SSH user
#[derive(Debug, Clone, Deserialize)]
pub struct UserEntry {
    pub password: String,
}

/// A console connection as written in the config file
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionEntry {
    /// `host:port` of the console
    pub address: String,
    /// Console password
    pub password: String,
    /// Close the link when the operator detaches
    #[serde(default)]
    pub auto_disconnect: bool,
    /// Give up on a console that sends nothing for this long
    #[serde(default, deserialize_with = "serde_utils::option_duration_secs")]
    pub read_timeout: Option<Duration>,
}

impl HubConfig {
    /// Socket address to listen on, expanding the `:port` shorthand
    pub fn bind_address(&self) -> String {
        if self.bind.starts_with(':') {
            format!("0.0.0.0{}", self.bind)
        } else {
            self.bind.clone()
        }
    }

    /// Register (or replace) an SSH user
    pub fn add_user(&mut self, name: impl Into<String>, password: impl Into<String>) {
        self.users.insert(
            name.into(),
            UserEntry {
                password: password.into(),
            },
        );
    }

    /// Register a connection given as `name=password@host:port`
    pub fn add_extra_connection(&mut self, entry: &str) -> Result<(), ConfigError> {
        let spec: ConnectionSpec = entry.parse()?;
        self.connections.insert(
            spec.name,
            ConnectionEntry {
                address: spec.address,
                password: spec.password,
                auto_disconnect: spec.auto_disconnect,
                read_timeout: spec.read_timeout,
            },
        );
        Ok(())
    }

    /// Check that the hub has someone to let in and somewhere to send them
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.users.is_empty() {
            return Err(ConfigError::NoUsers);
        }
        if self.connections.is_empty() {
            return Err(ConfigError::NoConnections);
        }
        if self.history_size == 0 {
            return Err(ConfigError::Invalid("history_size must be at least 1".to_string()));
        }
        Ok(())
    }
}
