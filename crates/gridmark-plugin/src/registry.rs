#![forbid(unsafe_code)]

//! Name-keyed plugin registry.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::boundary;
use crate::contract::{ErasedPlugin, Plugin, PluginMetadata};
use crate::error::{PluginError, Result};

/// A registered plugin and the metadata it reported at registration.
#[derive(Clone)]
pub struct RegistryEntry {
    pub plugin: Arc<dyn ErasedPlugin>,
    pub metadata: PluginMetadata,
}

impl std::fmt::Debug for RegistryEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryEntry")
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

/// Plugins available to start, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct PluginRegistry {
    entries: HashMap<String, RegistryEntry>,
}

impl PluginRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a plugin, replacing any entry with the same name.
    ///
    /// Returns the registered name. Metadata is read once, under the panic
    /// boundary, and validated before anything is stored.
    pub fn register<P: Plugin>(&mut self, plugin: P) -> Result<String> {
        self.register_shared(Arc::new(plugin))
    }

    /// Register an already-shared plugin.
    pub fn register_shared(&mut self, plugin: Arc<dyn ErasedPlugin>) -> Result<String> {
        let metadata = boundary::guard("<unregistered>", "metadata", || plugin.metadata())
            .map_err(|panic| PluginError::InvalidPlugin {
                name: "<unregistered>".into(),
                reason: format!("metadata panicked: {}", panic.message),
            })?;
        metadata
            .validate()
            .map_err(|reason| PluginError::InvalidPlugin {
                name: metadata.name.clone(),
                reason,
            })?;

        let name = metadata.name.clone();
        let replaced = self
            .entries
            .insert(name.clone(), RegistryEntry { plugin, metadata })
            .is_some();
        debug!(plugin = %name, replaced, "plugin registered");
        Ok(name)
    }

    /// Remove a plugin. Returns the entry if it was registered.
    pub fn unregister(&mut self, name: &str) -> Option<RegistryEntry> {
        self.entries.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&RegistryEntry> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Find the plugin launched by `command`. When several plugins claim the
    /// same command, the alphabetically first name wins.
    pub fn find_by_command(&self, command: &str) -> Option<&RegistryEntry> {
        self.entries
            .values()
            .filter(|entry| entry.metadata.commands.iter().any(|c| c == command))
            .min_by(|a, b| a.metadata.name.cmp(&b.metadata.name))
    }

    /// Metadata of every plugin, sorted by name.
    #[must_use]
    pub fn list(&self) -> Vec<&PluginMetadata> {
        let mut list: Vec<&PluginMetadata> = self.entries.values().map(|e| &e.metadata).collect();
        list.sort_unstable_by(|a, b| a.name.cmp(&b.name));
        list
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
