#![forbid(unsafe_code)]

//! Token-bucket admission control.
//!
//! Each admitted event consumes one token; tokens refill lazily in whole
//! windows of `refill_interval_ms`. Time never accrues past a full bucket, so
//! a long pause cannot bank more than `capacity` events.
//!
//! # Invariants
//!
//! - `tokens` stays in `[0, capacity]` after every refill and every call.
//! - With no time advance, at most `tokens` further events are allowed.
//! - `allowed + blocked` equals the number of `allow_event` calls.

use std::time::{Duration, Instant};

#[inline]
fn duration_since_or_zero(now: Instant, earlier: Instant) -> Duration {
    now.checked_duration_since(earlier)
        .unwrap_or(Duration::ZERO)
}

/// Token bucket configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TokenBucketConfig {
    /// Maximum tokens held (burst size).
    pub capacity: u32,
    /// Tokens added per elapsed window.
    pub refill_amount: u32,
    /// Window length (ms). Zero keeps the bucket permanently full.
    pub refill_interval_ms: u64,
}

impl Default for TokenBucketConfig {
    fn default() -> Self {
        Self {
            capacity: 30,
            refill_amount: 10,
            refill_interval_ms: 100,
        }
    }
}

impl TokenBucketConfig {
    /// Set the capacity.
    #[must_use]
    pub fn with_capacity(mut self, capacity: u32) -> Self {
        self.capacity = capacity;
        self
    }

    /// Set the refill rate: `amount` tokens every `interval_ms`.
    #[must_use]
    pub fn with_refill(mut self, amount: u32, interval_ms: u64) -> Self {
        self.refill_amount = amount;
        self.refill_interval_ms = interval_ms;
        self
    }

    /// A tighter bucket for hosts exposed to key-repeat floods.
    #[must_use]
    pub fn strict() -> Self {
        Self::default().with_capacity(10).with_refill(5, 100)
    }

    /// A looser bucket for trusted local input.
    #[must_use]
    pub fn relaxed() -> Self {
        Self::default().with_capacity(120).with_refill(40, 100)
    }
}

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Admission {
    /// A token was consumed; the event may proceed.
    Allowed,
    /// The bucket was empty; the event should be dropped.
    Blocked,
}

impl Admission {
    /// Whether the event was admitted.
    #[inline]
    #[must_use]
    pub const fn is_allowed(self) -> bool {
        matches!(self, Self::Allowed)
    }

    /// Get the stable string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Allowed => "allowed",
            Self::Blocked => "blocked",
        }
    }
}

/// Admission counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenBucketStats {
    /// Events admitted.
    pub allowed: u64,
    /// Events rejected.
    pub blocked: u64,
}

impl TokenBucketStats {
    /// Total admission checks.
    #[inline]
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.allowed + self.blocked
    }
}

/// Token bucket rate limiter.
#[derive(Debug, Clone)]
pub struct TokenBucket {
    config: TokenBucketConfig,
    tokens: u32,
    last_refill: Option<Instant>,
    stats: TokenBucketStats,
}

impl Default for TokenBucket {
    fn default() -> Self {
        Self::new(TokenBucketConfig::default())
    }
}

impl TokenBucket {
    /// Create a full bucket.
    #[must_use]
    pub fn new(config: TokenBucketConfig) -> Self {
        Self {
            tokens: config.capacity,
            config,
            last_refill: None,
            stats: TokenBucketStats::default(),
        }
    }

    /// Check admission for one event now.
    pub fn allow_event(&mut self) -> Admission {
        self.allow_event_at(Instant::now())
    }

    /// Check admission for one event at `now`.
    pub fn allow_event_at(&mut self, now: Instant) -> Admission {
        self.refill_at(now);
        if self.tokens > 0 {
            self.tokens -= 1;
            self.stats.allowed += 1;
            Admission::Allowed
        } else {
            self.stats.blocked += 1;
            Admission::Blocked
        }
    }

    /// Credit tokens for whole windows elapsed since the last refill.
    pub fn refill_at(&mut self, now: Instant) {
        let Some(last) = self.last_refill else {
            self.last_refill = Some(now);
            return;
        };
        let interval_ms = self.config.refill_interval_ms;
        if interval_ms == 0 {
            self.tokens = self.config.capacity;
            self.last_refill = Some(now);
            return;
        }

        let elapsed_ms = duration_since_or_zero(now, last).as_millis();
        let windows = elapsed_ms / u128::from(interval_ms);
        if windows == 0 {
            return;
        }

        let credit = windows.saturating_mul(u128::from(self.config.refill_amount));
        let refilled = (u128::from(self.tokens) + credit).min(u128::from(self.config.capacity));
        // refilled <= capacity, which is a u32
        self.tokens = refilled as u32;

        if self.tokens == self.config.capacity {
            self.last_refill = Some(now);
        } else {
            // windows * interval_ms <= elapsed_ms
            let advance_ms = windows as u64 * interval_ms;
            self.last_refill = Some(last + Duration::from_millis(advance_ms));
        }
    }

    /// Tokens currently available.
    #[inline]
    pub fn tokens(&self) -> u32 {
        self.tokens
    }

    /// Admission counters.
    #[inline]
    pub fn stats(&self) -> TokenBucketStats {
        self.stats
    }

    /// Refill to capacity and clear counters.
    pub fn reset(&mut self) {
        self.tokens = self.config.capacity;
        self.last_refill = None;
        self.stats = TokenBucketStats::default();
    }

    /// Get a reference to the bucket configuration.
    #[inline]
    pub fn config(&self) -> &TokenBucketConfig {
        &self.config
    }
}
