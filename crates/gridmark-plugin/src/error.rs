//! Plugin-specific error types

use thiserror::Error;

/// Errors surfaced by the plugin registry and lifecycle manager.
///
/// These are routine outcomes the host branches on, never panics. A plugin's
/// own panic payload is logged and replaced by [`PluginError::Crashed`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PluginError {
    /// No plugin is registered under this name
    #[error("Plugin not found: {0}")]
    NotFound(String),

    /// The operation needs a running plugin
    #[error("No active plugin")]
    NoActivePlugin,

    /// Metadata failed validation at registration
    #[error("Invalid plugin '{name}': {reason}")]
    InvalidPlugin { name: String, reason: String },

    /// The plugin's `init` refused to start
    #[error("Plugin '{name}' failed to start: {reason}")]
    InitFailed { name: String, reason: String },

    /// The plugin reported an error for one input; the session is unchanged
    #[error("Plugin '{name}' rejected input: {reason}")]
    Rejected { name: String, reason: String },

    /// The plugin panicked and its session was torn down
    #[error("Plugin '{name}' crashed")]
    Crashed { name: String },
}

/// Result alias for plugin operations.
pub type Result<T> = std::result::Result<T, PluginError>;
