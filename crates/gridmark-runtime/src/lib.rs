#![forbid(unsafe_code)]

//! Runtime policy for gridmark hosts.
//!
//! - [`refresh`]: picks a frame rate from input activity and render cost.
//! - [`token_bucket`]: admission control for raw input.
//! - [`debounce`]: coalesces admitted keys into ordered batches.
//! - [`flow`]: the two input stages composed.
//!
//! Every component is a plain value mutated through `&mut self`. None of them
//! sleep or spawn; time comes in through `*_at(now)` methods and deadlines go
//! out for the host to schedule.

pub mod debounce;
pub mod flow;
pub mod refresh;
pub mod token_bucket;

pub use debounce::{DebounceConfig, DebouncePreset, DebounceStats, Debouncer, Dispatch};
pub use flow::{FlowOutcome, FlowStats, InputFlow};
pub use refresh::{RefreshConfig, RefreshController, RefreshMode, RefreshTelemetry};
pub use token_bucket::{Admission, TokenBucket, TokenBucketConfig, TokenBucketStats};
