#![forbid(unsafe_code)]

//! Core: input key tokens, geometry, scheduled timers, and logging shims.
//!
//! Everything here is a leaf: no rendering, no policy. The render, runtime,
//! and plugin crates build on these types.

pub mod geometry;
pub mod key;
pub mod logging;
pub mod timer;

// Re-export tracing macros at crate root for ergonomic use.
#[cfg(feature = "tracing")]
pub use logging::{
    debug, debug_span, error, error_span, info, info_span, trace, trace_span, warn, warn_span,
};
