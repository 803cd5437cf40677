#![forbid(unsafe_code)]

//! Aggregate session configuration.

use gridmark_render::renderer::RendererConfig;
use gridmark_runtime::{DebounceConfig, DebouncePreset, RefreshConfig, TokenBucketConfig};

use crate::Error;

/// Everything a [`Session`](crate::Session) needs to start.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Grid columns.
    pub width: u16,
    /// Grid rows.
    pub height: u16,
    pub renderer: RendererConfig,
    pub refresh: RefreshConfig,
    pub debounce: DebounceConfig,
    pub token_bucket: TokenBucketConfig,
    /// How often the session forgets its activity count (ms).
    pub activity_window_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            width: 80,
            height: 24,
            renderer: RendererConfig::default(),
            refresh: RefreshConfig::default(),
            debounce: DebounceConfig::default(),
            token_bucket: TokenBucketConfig::default(),
            activity_window_ms: 1000,
        }
    }
}

impl EngineConfig {
    /// Set the grid size.
    #[must_use]
    pub fn with_size(mut self, width: u16, height: u16) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    #[must_use]
    pub fn with_renderer(mut self, renderer: RendererConfig) -> Self {
        self.renderer = renderer;
        self
    }

    #[must_use]
    pub fn with_refresh(mut self, refresh: RefreshConfig) -> Self {
        self.refresh = refresh;
        self
    }

    #[must_use]
    pub fn with_debounce(mut self, debounce: DebounceConfig) -> Self {
        self.debounce = debounce;
        self
    }

    /// Use a debounce preset's timing with the default instant keys.
    #[must_use]
    pub fn with_debounce_preset(mut self, preset: DebouncePreset) -> Self {
        self.debounce = DebounceConfig::from_preset(preset);
        self
    }

    #[must_use]
    pub fn with_token_bucket(mut self, token_bucket: TokenBucketConfig) -> Self {
        self.token_bucket = token_bucket;
        self
    }

    #[must_use]
    pub fn with_activity_window_ms(mut self, ms: u64) -> Self {
        self.activity_window_ms = ms;
        self
    }

    /// Tuned for cursor-driven interfaces: short debounce, small batches.
    #[must_use]
    pub fn navigation() -> Self {
        Self::default().with_debounce_preset(DebouncePreset::Navigation)
    }

    /// Tuned for battery-constrained hosts.
    #[must_use]
    pub fn low_power() -> Self {
        Self::default()
            .with_refresh(RefreshConfig::low_power())
            .with_debounce_preset(DebouncePreset::Idle)
    }

    /// Reject configurations no session can run with.
    pub fn validate(&self) -> Result<(), Error> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::Config(format!(
                "grid size must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        if self.refresh.normal_fps == 0 {
            return Err(Error::Config("normal_fps must be > 0".into()));
        }
        Ok(())
    }
}
