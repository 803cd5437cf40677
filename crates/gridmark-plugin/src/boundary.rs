#![forbid(unsafe_code)]

//! Panic boundary for plugin callbacks.
//!
//! Every call into plugin code goes through [`guard`]. A panic is caught,
//! its payload reduced to a message, and returned as a [`CapturedPanic`] so
//! the manager can tear the session down without unwinding through its own
//! bookkeeping.
//!
//! The boundary relies on unwinding; a host built with `panic = "abort"`
//! loses isolation.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};

/// A panic captured from a plugin callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedPanic {
    /// Plugin that panicked.
    pub plugin: String,
    /// Callback that was running (`init`, `handle_input`, ...).
    pub operation: &'static str,
    /// Message extracted from the panic payload.
    pub message: String,
}

impl CapturedPanic {
    fn from_payload(payload: Box<dyn Any + Send>, plugin: &str, operation: &'static str) -> Self {
        Self {
            plugin: plugin.to_owned(),
            operation,
            message: panic_message(payload.as_ref()),
        }
    }
}

/// Extract a readable message from a panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    let mut message = if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    };
    if let Some(stripped) = message.strip_prefix("internal error: entered unreachable code: ") {
        message = stripped.to_string();
    }
    message
}

/// Run `f`, converting a panic into a [`CapturedPanic`].
///
/// The closure is asserted unwind-safe: the manager discards every piece of
/// state the plugin could have touched when this returns `Err`.
pub fn guard<R>(
    plugin: &str,
    operation: &'static str,
    f: impl FnOnce() -> R,
) -> Result<R, CapturedPanic> {
    catch_unwind(AssertUnwindSafe(f))
        .map_err(|payload| CapturedPanic::from_payload(payload, plugin, operation))
}
