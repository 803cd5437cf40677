#![forbid(unsafe_code)]

//! Plugin hosting for gridmark.
//!
//! - [`contract`]: the [`Plugin`] trait and its result types.
//! - [`registry`]: plugins by name, validated at registration.
//! - [`manager`]: the one-at-a-time lifecycle state machine.
//! - [`boundary`]: panic isolation around plugin callbacks.
//! - [`builtin`]: plugins shipped with the crate.

pub mod boundary;
pub mod builtin;
pub mod contract;
pub mod error;
pub mod manager;
pub mod registry;

pub use builtin::NumberGuess;
pub use contract::{
    ErasedPlugin, HostContext, InputResult, KeyResult, Plugin, PluginCategory, PluginMetadata,
    PluginOutput, PluginState,
};
pub use error::{PluginError, Result};
pub use manager::{InputResponse, KeyResponse, ManagerStats, PluginManager};
pub use registry::{PluginRegistry, RegistryEntry};
