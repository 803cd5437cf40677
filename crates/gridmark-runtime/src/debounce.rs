#![forbid(unsafe_code)]

//! Key debouncing and batching.
//!
//! Ordinary keys accumulate into a pending batch that is released either when
//! it reaches `batch_size` or when the debounce window expires. Keys in the
//! instant set (navigation, confirmation, function keys) skip batching, but
//! any pending batch is released ahead of them so dispatch order always
//! matches arrival order.
//!
//! The debouncer never sleeps. After each push the host reads
//! [`Debouncer::deadline`] and schedules a callback that calls
//! [`Debouncer::on_timeout_at`]. Spurious or late callbacks are harmless.
//!
//! # Decision Rule
//!
//! On `push_key_at(key, now)`:
//!
//! 1) If a pending window already expired, release the stale batch.
//! 2) If `key` is instant, release any pending batch, then dispatch `key`.
//! 3) Otherwise append `key`; the first key of a batch arms the window.
//! 4) If the batch reached `batch_size`, cancel the window and release it.

use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use gridmark_core::key::{Key, KeyCode};
use gridmark_core::timer::Timer;
use tracing::trace;

/// Named `{debounce_ms, batch_size}` pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DebouncePreset {
    /// Free text entry: moderate window, large batches.
    #[default]
    Typing,
    /// Cursor movement: about one frame, tiny batches.
    Navigation,
    /// Background input: long window, large batches.
    Idle,
    /// Command palettes and shortcuts.
    Command,
}

impl DebouncePreset {
    /// All presets.
    pub const ALL: [Self; 4] = [Self::Typing, Self::Navigation, Self::Idle, Self::Command];

    /// Window length (ms).
    #[must_use]
    pub const fn debounce_ms(self) -> u64 {
        match self {
            Self::Typing => 50,
            Self::Navigation => 16,
            Self::Idle => 100,
            Self::Command => 30,
        }
    }

    /// Batch size that forces an early release.
    #[must_use]
    pub const fn batch_size(self) -> usize {
        match self {
            Self::Typing => 10,
            Self::Navigation => 3,
            Self::Idle => 20,
            Self::Command => 5,
        }
    }

    /// Get the stable string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Typing => "typing",
            Self::Navigation => "navigation",
            Self::Idle => "idle",
            Self::Command => "command",
        }
    }
}

/// The default instant set: confirmation, navigation, paging and F1-F12.
#[must_use]
pub fn default_instant_keys() -> BTreeSet<KeyCode> {
    let mut keys: BTreeSet<KeyCode> = [
        KeyCode::Enter,
        KeyCode::Escape,
        KeyCode::Tab,
        KeyCode::BackTab,
        KeyCode::Up,
        KeyCode::Down,
        KeyCode::Left,
        KeyCode::Right,
        KeyCode::PageUp,
        KeyCode::PageDown,
        KeyCode::Home,
        KeyCode::End,
    ]
    .into_iter()
    .collect();
    keys.extend((1..=12).map(KeyCode::F));
    keys
}

/// Debouncer configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DebounceConfig {
    /// Window length (ms).
    pub debounce_ms: u64,
    /// Batch size that forces an early release. Values below 1 act as 1.
    pub batch_size: usize,
    /// Key codes that bypass batching.
    #[cfg_attr(feature = "serde", serde(skip, default = "default_instant_keys"))]
    pub instant_keys: BTreeSet<KeyCode>,
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self::from_preset(DebouncePreset::default())
    }
}

impl DebounceConfig {
    /// Config with a preset's timing and the default instant set.
    #[must_use]
    pub fn from_preset(preset: DebouncePreset) -> Self {
        Self {
            debounce_ms: preset.debounce_ms(),
            batch_size: preset.batch_size(),
            instant_keys: default_instant_keys(),
        }
    }

    /// Set the window length (ms).
    #[must_use]
    pub fn with_debounce_ms(mut self, ms: u64) -> Self {
        self.debounce_ms = ms;
        self
    }

    /// Set the batch size.
    #[must_use]
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    /// Replace the instant set.
    #[must_use]
    pub fn with_instant_keys(mut self, keys: impl IntoIterator<Item = KeyCode>) -> Self {
        self.instant_keys = keys.into_iter().collect();
        self
    }

    /// Add one key code to the instant set.
    #[must_use]
    pub fn with_instant_key(mut self, code: KeyCode) -> Self {
        self.instant_keys.insert(code);
        self
    }

    /// Whether a key bypasses batching.
    #[inline]
    #[must_use]
    pub fn is_instant(&self, key: &Key) -> bool {
        self.instant_keys.contains(&key.code)
    }

    fn effective_batch_size(&self) -> usize {
        self.batch_size.max(1)
    }
}

/// Keys released by the debouncer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// A batch of ordinary keys, in arrival order.
    Batch(Vec<Key>),
    /// A single instant key.
    Instant(Key),
}

impl Dispatch {
    /// The dispatched keys, in order.
    #[must_use]
    pub fn keys(&self) -> &[Key] {
        match self {
            Self::Batch(keys) => keys,
            Self::Instant(key) => std::slice::from_ref(key),
        }
    }

    /// Consume into the dispatched keys.
    #[must_use]
    pub fn into_keys(self) -> Vec<Key> {
        match self {
            Self::Batch(keys) => keys,
            Self::Instant(key) => vec![key],
        }
    }

    /// Whether this is an instant dispatch.
    #[inline]
    #[must_use]
    pub const fn is_instant(&self) -> bool {
        matches!(self, Self::Instant(_))
    }
}

/// Debouncer counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DebounceStats {
    /// Keys accepted by `push_key`.
    pub keys_in: u64,
    /// Batches released (size, timeout, flush or preempted by an instant key).
    pub batches: u64,
    /// Instant keys dispatched.
    pub instant: u64,
    /// Batches released because the window expired.
    pub timeouts: u64,
}

/// Debouncing batcher for key input.
#[derive(Debug, Clone, Default)]
pub struct Debouncer {
    config: DebounceConfig,
    pending: Vec<Key>,
    timer: Timer,
    last_input: Option<Instant>,
    stats: DebounceStats,
}

impl Debouncer {
    /// Create a debouncer.
    #[must_use]
    pub fn new(config: DebounceConfig) -> Self {
        Self {
            pending: Vec::with_capacity(config.effective_batch_size()),
            config,
            timer: Timer::new(),
            last_input: None,
            stats: DebounceStats::default(),
        }
    }

    /// Create a debouncer from a preset.
    #[must_use]
    pub fn with_preset(preset: DebouncePreset) -> Self {
        Self::new(DebounceConfig::from_preset(preset))
    }

    /// Push a key now.
    pub fn push_key(&mut self, key: Key) -> Vec<Dispatch> {
        self.push_key_at(key, Instant::now())
    }

    /// Push a key at `now`. Returns everything released by this push, in
    /// dispatch order.
    pub fn push_key_at(&mut self, key: Key, now: Instant) -> Vec<Dispatch> {
        let mut out = Vec::new();
        self.stats.keys_in += 1;
        self.last_input = Some(now);

        if self.timer.fire_at(now) {
            self.stats.timeouts += 1;
            self.release_into(&mut out, "stale");
        }

        if self.config.is_instant(&key) {
            self.release_into(&mut out, "preempted");
            self.stats.instant += 1;
            trace!(key = %key, "instant key");
            out.push(Dispatch::Instant(key));
            return out;
        }

        if self.pending.is_empty() {
            self.timer
                .arm_at(now, Duration::from_millis(self.config.debounce_ms));
        }
        self.pending.push(key);

        if self.pending.len() >= self.config.effective_batch_size() {
            self.release_into(&mut out, "full");
        }
        out
    }

    /// Host timer callback, now.
    pub fn on_timeout(&mut self) -> Option<Dispatch> {
        self.on_timeout_at(Instant::now())
    }

    /// Host timer callback at `now`. Releases the pending batch if its window
    /// has expired; otherwise does nothing.
    pub fn on_timeout_at(&mut self, now: Instant) -> Option<Dispatch> {
        if !self.timer.fire_at(now) {
            return None;
        }
        self.stats.timeouts += 1;
        self.take_batch("timeout")
    }

    /// Release the pending batch regardless of the window.
    pub fn flush(&mut self) -> Option<Dispatch> {
        self.take_batch("flush")
    }

    /// Whether keys are waiting.
    #[inline]
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Number of keys waiting.
    #[inline]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// When the host should call [`on_timeout_at`](Self::on_timeout_at).
    #[inline]
    pub fn deadline(&self) -> Option<Instant> {
        self.timer.deadline()
    }

    /// Time of the most recent push.
    #[inline]
    pub fn last_input(&self) -> Option<Instant> {
        self.last_input
    }

    /// Switch timing to a preset. The instant set and pending keys are kept;
    /// the new window applies from the next batch.
    pub fn apply_preset(&mut self, preset: DebouncePreset) {
        self.config.debounce_ms = preset.debounce_ms();
        self.config.batch_size = preset.batch_size();
        tracing::debug!(preset = preset.as_str(), "debounce preset applied");
    }

    /// Drop pending keys and disarm the window.
    pub fn clear(&mut self) {
        self.pending.clear();
        self.timer.cancel();
    }

    /// Debouncer counters.
    #[inline]
    pub fn stats(&self) -> DebounceStats {
        self.stats
    }

    /// Get a reference to the debouncer configuration.
    #[inline]
    pub fn config(&self) -> &DebounceConfig {
        &self.config
    }

    fn take_batch(&mut self, reason: &'static str) -> Option<Dispatch> {
        self.timer.cancel();
        if self.pending.is_empty() {
            return None;
        }
        let keys = std::mem::take(&mut self.pending);
        self.stats.batches += 1;
        trace!(len = keys.len(), reason, "batch released");
        Some(Dispatch::Batch(keys))
    }

    fn release_into(&mut self, out: &mut Vec<Dispatch>, reason: &'static str) {
        if let Some(batch) = self.take_batch(reason) {
            out.push(batch);
        }
    }
}
