//! Console connection definitions

use std::str::FromStr;
use std::time::Duration;

use super::hub::ConnectionEntry;
use crate::error::ConfigError;

/// Compact form accepted for ad hoc connections
pub const CONNECTION_FORMAT: &str = "name=password@host:port";

/// A named console the operator can attach to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSpec {
    /// Unique, case-sensitive connection name
    pub name: String,
    /// `host:port` of the console
    pub address: String,
    /// Console password
    pub password: String,
    /// Close the link when the operator detaches from it
    pub auto_disconnect: bool,
    /// Optional deadline for console output
    pub read_timeout: Option<Duration>,
}

impl ConnectionSpec {
    /// Build a spec from a config file entry
    pub fn from_entry(name: impl Into<String>, entry: &ConnectionEntry) -> Self {
        Self {
            name: name.into(),
            address: entry.address.clone(),
            password: entry.password.clone(),
            auto_disconnect: entry.auto_disconnect,
            read_timeout: entry.read_timeout,
        }
    }
}

impl FromStr for ConnectionSpec {
    type Err = ConfigError;

    /// Parse `name=password@host:port`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason| ConfigError::InvalidConnection {
            entry: s.to_string(),
            reason,
        };

        let (name, rest) = s.split_once('=').ok_or_else(|| invalid("missing '='"))?;
        if name.is_empty() {
            return Err(invalid("empty name"));
        }

        // Addresses never contain '@', passwords might
        let (password, address) = rest
            .rsplit_once('@')
            .ok_or_else(|| invalid("missing '@'"))?;
        if address.is_empty() {
            return Err(invalid("empty address"));
        }

        Ok(Self {
            name: name.to_string(),
            address: address.to_string(),
            password: password.to_string(),
            auto_disconnect: false,
            read_timeout: None,
        })
    }
}
