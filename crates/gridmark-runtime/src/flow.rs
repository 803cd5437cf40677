#![forbid(unsafe_code)]

//! Input flow: admission, then batching.
//!
//! [`InputFlow`] runs every key through a [`TokenBucket`] and hands admitted
//! keys to a [`Debouncer`]. Dropped keys never reach the debouncer and never
//! disturb its ordering.

use std::time::Instant;

use gridmark_core::key::Key;
use tracing::trace;

use crate::debounce::{DebounceConfig, DebouncePreset, Debouncer, Dispatch};
use crate::token_bucket::{Admission, TokenBucket, TokenBucketConfig};

/// Result of pushing one key through the flow.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlowOutcome {
    /// The key was rejected by admission control.
    pub dropped: bool,
    /// Keys released by this push, in dispatch order.
    pub dispatches: Vec<Dispatch>,
}

impl FlowOutcome {
    /// Iterate over every released key, flattened across dispatches.
    pub fn keys(&self) -> impl Iterator<Item = &Key> {
        self.dispatches.iter().flat_map(|d| d.keys().iter())
    }

    /// Whether nothing was released.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.dispatches.is_empty()
    }
}

/// Combined flow counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlowStats {
    /// Keys admitted by the bucket.
    pub allowed: u64,
    /// Keys dropped by the bucket.
    pub blocked: u64,
    /// Batches released by the debouncer.
    pub batches: u64,
    /// Instant keys dispatched.
    pub instant: u64,
}

/// Token bucket followed by a debouncer.
#[derive(Debug, Clone, Default)]
pub struct InputFlow {
    bucket: TokenBucket,
    debouncer: Debouncer,
}

impl InputFlow {
    /// Create a flow from its two stage configs.
    #[must_use]
    pub fn new(bucket: TokenBucketConfig, debounce: DebounceConfig) -> Self {
        Self {
            bucket: TokenBucket::new(bucket),
            debouncer: Debouncer::new(debounce),
        }
    }

    /// Push a key now.
    pub fn push(&mut self, key: Key) -> FlowOutcome {
        self.push_at(key, Instant::now())
    }

    /// Push a key at `now`.
    pub fn push_at(&mut self, key: Key, now: Instant) -> FlowOutcome {
        match self.bucket.allow_event_at(now) {
            Admission::Allowed => FlowOutcome {
                dropped: false,
                dispatches: self.debouncer.push_key_at(key, now),
            },
            Admission::Blocked => {
                trace!(key = %key, "input dropped by admission control");
                FlowOutcome {
                    dropped: true,
                    dispatches: Vec::new(),
                }
            }
        }
    }

    /// Host timer callback at `now`.
    pub fn on_timeout_at(&mut self, now: Instant) -> Option<Dispatch> {
        self.debouncer.on_timeout_at(now)
    }

    /// Release pending keys regardless of the window.
    pub fn flush(&mut self) -> Option<Dispatch> {
        self.debouncer.flush()
    }

    /// When the host should call [`on_timeout_at`](Self::on_timeout_at).
    #[inline]
    pub fn deadline(&self) -> Option<Instant> {
        self.debouncer.deadline()
    }

    /// Switch the debounce timing.
    pub fn apply_preset(&mut self, preset: DebouncePreset) {
        self.debouncer.apply_preset(preset);
    }

    /// Combined counters.
    #[must_use]
    pub fn stats(&self) -> FlowStats {
        let bucket = self.bucket.stats();
        let debounce = self.debouncer.stats();
        FlowStats {
            allowed: bucket.allowed,
            blocked: bucket.blocked,
            batches: debounce.batches,
            instant: debounce.instant,
        }
    }

    /// The admission stage.
    #[inline]
    pub fn bucket(&self) -> &TokenBucket {
        &self.bucket
    }

    /// The batching stage.
    #[inline]
    pub fn debouncer(&self) -> &Debouncer {
        &self.debouncer
    }

    /// Mutable access to the batching stage.
    #[inline]
    pub fn debouncer_mut(&mut self) -> &mut Debouncer {
        &mut self.debouncer
    }
}
