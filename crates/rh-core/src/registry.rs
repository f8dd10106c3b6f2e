//! Static registry of console connections

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::{ConnectionSpec, HubConfig};

/// Immutable name -> connection mapping, shared by every session
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    /// Specs indexed by name; ordered so listings are deterministic
    specs: BTreeMap<String, Arc<ConnectionSpec>>,
}

impl ConnectionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the registry from the loaded configuration
    pub fn from_config(config: &HubConfig) -> Self {
        config
            .connections
            .iter()
            .map(|(name, entry)| ConnectionSpec::from_entry(name.clone(), entry))
            .collect()
    }

    /// Add a spec, replacing any entry with the same name
    pub fn with(mut self, spec: ConnectionSpec) -> Self {
        self.specs.insert(spec.name.clone(), Arc::new(spec));
        self
    }

    /// Look up a connection by exact name
    pub fn get(&self, name: &str) -> Option<Arc<ConnectionSpec>> {
        self.specs.get(name).cloned()
    }

    /// Iterate over all connections, ordered by name
    pub fn iter(&self) -> impl Iterator<Item = &Arc<ConnectionSpec>> {
        self.specs.values()
    }

    /// Number of registered connections
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

impl FromIterator<ConnectionSpec> for ConnectionRegistry {
    fn from_iter<I: IntoIterator<Item = ConnectionSpec>>(iter: I) -> Self {
        iter.into_iter()
            .fold(ConnectionRegistry::new(), |registry, spec| registry.with(spec))
    }
}
