#![forbid(unsafe_code)]

//! gridmark public facade crate.
//!
//! Re-exports the common types from the component crates, adds the
//! aggregate [`EngineConfig`], and wires everything into a host-driven
//! [`Session`]: key tokens in, markup out.

use std::fmt;

pub mod config;
pub mod session;

pub use config::EngineConfig;
pub use session::{App, AppCommand, KeyOutcome, Session};

// --- Core re-exports -------------------------------------------------------

pub use gridmark_core::geometry::Rect;
pub use gridmark_core::key::{Key, KeyCode, Modifiers};
pub use gridmark_core::timer::Timer;

// --- Render re-exports -----------------------------------------------------

pub use gridmark_render::buffer::Buffer;
pub use gridmark_render::cell::{Cell, Color, NamedColor, Style, StyleFlags};
pub use gridmark_render::drawing::{BorderStyle, Draw};
pub use gridmark_render::renderer::{
    FrameKind, LinePatch, RenderStats, RenderedFrame, Renderer, RendererConfig,
};

// --- Runtime re-exports ----------------------------------------------------

pub use gridmark_runtime::{
    Admission, DebounceConfig, DebouncePreset, Debouncer, Dispatch, FlowOutcome, FlowStats,
    InputFlow, RefreshConfig, RefreshController, RefreshMode, RefreshTelemetry, TokenBucket,
    TokenBucketConfig,
};

// --- Plugin re-exports -----------------------------------------------------

pub use gridmark_plugin::{
    HostContext, InputResponse, InputResult, KeyResponse, KeyResult, Plugin, PluginError,
    PluginManager, PluginMetadata, PluginOutput,
};

// --- Errors ---------------------------------------------------------------

/// Top-level error type for gridmark hosts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Plugin lifecycle failure.
    Plugin(PluginError),
    /// Configuration rejected at session construction.
    Config(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plugin(err) => write!(f, "{err}"),
            Self::Config(msg) => write!(f, "invalid config: {msg}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Plugin(err) => Some(err),
            Self::Config(_) => None,
        }
    }
}

impl From<PluginError> for Error {
    fn from(err: PluginError) -> Self {
        Self::Plugin(err)
    }
}

/// Standard result type for gridmark APIs.
pub type Result<T> = std::result::Result<T, Error>;

// --- Prelude --------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        App, AppCommand, Buffer, Draw, EngineConfig, Error, HostContext, Key, KeyCode, Plugin,
        PluginOutput, Result, Session, Style,
    };

    pub use crate::{core, plugin, render, runtime};
}

pub use gridmark_core as core;
pub use gridmark_plugin as plugin;
pub use gridmark_render as render;
pub use gridmark_runtime as runtime;
