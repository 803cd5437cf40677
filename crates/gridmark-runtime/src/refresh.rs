#![forbid(unsafe_code)]

//! Adaptive refresh controller.
//!
//! Decides how often the host should render, from two signals: input
//! activity and measured render cost. The host polls [`interval_ms`] to
//! schedule its next tick and [`should_render`] to decide whether to render
//! on that tick.
//!
//! # Modes
//!
//! | Mode         | Default FPS | Entered when                                      |
//! |--------------|-------------|---------------------------------------------------|
//! | `Idle`       | 5           | no activity for > 3000 ms                         |
//! | `Fast`       | 60          | > 5 recent activities, or mean render > 10 ms     |
//! | `Transition` | 15          | no activity for > 500 ms                          |
//! | `Normal`     | 30          | otherwise                                         |
//!
//! Rules are checked top to bottom; the first match wins.
//!
//! # Ramp
//!
//! `current_fps` never jumps to the mode's target. Each evaluation moves it
//! by at most `ramp_up_step` (15) toward a higher target or `ramp_down_step`
//! (5) toward a lower one, and never past the target.
//!
//! # Invariants
//!
//! - Render history holds at most `history_len` samples, most recent first.
//! - `current_fps` always lies between its previous value and `target_fps`.
//! - Identical call sequences with identical instants yield identical state.
//!
//! [`interval_ms`]: RefreshController::interval_ms
//! [`should_render`]: RefreshController::should_render

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use tracing::debug;

#[inline]
fn duration_since_or_zero(now: Instant, earlier: Instant) -> Duration {
    now.checked_duration_since(earlier)
        .unwrap_or(Duration::ZERO)
}

/// Configuration for the refresh controller.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RefreshConfig {
    /// Quiet time after which the controller drops to idle (ms).
    pub idle_after_ms: u64,
    /// Quiet time after which the controller eases to transition (ms).
    pub transition_after_ms: u64,
    /// Activity count above which the controller goes fast.
    pub fast_activity_count: u32,
    /// Mean render time above which the controller goes fast (ms).
    pub fast_render_ms: f64,
    /// Target FPS in idle mode.
    pub idle_fps: u32,
    /// Target FPS in transition mode.
    pub transition_fps: u32,
    /// Target FPS in normal mode.
    pub normal_fps: u32,
    /// Target FPS in fast mode.
    pub fast_fps: u32,
    /// Largest FPS increase per evaluation.
    pub ramp_up_step: u32,
    /// Largest FPS decrease per evaluation.
    pub ramp_down_step: u32,
    /// Number of render-time samples kept.
    pub history_len: usize,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            idle_after_ms: 3000,
            transition_after_ms: 500,
            fast_activity_count: 5,
            fast_render_ms: 10.0,
            idle_fps: 5,
            transition_fps: 15,
            normal_fps: 30,
            fast_fps: 60,
            ramp_up_step: 15,
            ramp_down_step: 5,
            history_len: 10,
        }
    }
}

impl RefreshConfig {
    /// Set the per-mode target rates.
    #[must_use]
    pub fn with_fps(mut self, idle: u32, transition: u32, normal: u32, fast: u32) -> Self {
        self.idle_fps = idle;
        self.transition_fps = transition;
        self.normal_fps = normal;
        self.fast_fps = fast;
        self
    }

    /// Set the ramp steps.
    #[must_use]
    pub fn with_ramp(mut self, up: u32, down: u32) -> Self {
        self.ramp_up_step = up;
        self.ramp_down_step = down;
        self
    }

    /// Set the quiet-time thresholds (ms).
    #[must_use]
    pub fn with_quiet_thresholds(mut self, transition_after_ms: u64, idle_after_ms: u64) -> Self {
        self.transition_after_ms = transition_after_ms;
        self.idle_after_ms = idle_after_ms;
        self
    }

    /// Set the fast-mode triggers.
    #[must_use]
    pub fn with_fast_triggers(mut self, activity_count: u32, render_ms: f64) -> Self {
        self.fast_activity_count = activity_count;
        self.fast_render_ms = render_ms;
        self
    }

    /// Set the render history length.
    #[must_use]
    pub fn with_history_len(mut self, len: usize) -> Self {
        self.history_len = len;
        self
    }

    /// A config for battery-constrained hosts: lower rates, slower ramp-up.
    #[must_use]
    pub fn low_power() -> Self {
        Self::default().with_fps(2, 10, 20, 30).with_ramp(10, 5)
    }

    /// Target FPS for a mode.
    #[must_use]
    pub fn fps_for(&self, mode: RefreshMode) -> u32 {
        match mode {
            RefreshMode::Idle => self.idle_fps,
            RefreshMode::Transition => self.transition_fps,
            RefreshMode::Normal => self.normal_fps,
            RefreshMode::Fast => self.fast_fps,
        }
    }
}

/// Refresh mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RefreshMode {
    /// Nothing is happening.
    Idle,
    /// Activity recently stopped.
    Transition,
    /// Steady interaction.
    #[default]
    Normal,
    /// Bursty input or expensive frames.
    Fast,
}

impl RefreshMode {
    /// Get the stable string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Transition => "transition",
            Self::Normal => "normal",
            Self::Fast => "fast",
        }
    }
}

/// Move `current` toward `target` by at most `up` (increasing) or `down`
/// (decreasing), never past `target`.
#[inline]
#[must_use]
pub fn ramp_step(current: u32, target: u32, up: u32, down: u32) -> u32 {
    if target > current {
        current.saturating_add(up).min(target)
    } else {
        current.saturating_sub(down).max(target)
    }
}

/// Snapshot of controller state for diagnostics.
///
/// All fields are `Copy`; cheap to capture every tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RefreshTelemetry {
    /// Current mode.
    pub mode: RefreshMode,
    /// Rate currently in effect.
    pub current_fps: u32,
    /// Rate the controller is ramping toward.
    pub target_fps: u32,
    /// Activities since the last count reset.
    pub activity_count: u32,
    /// Mean of the render history (ms), zero when empty.
    pub avg_render_ms: f64,
    /// Samples in the render history.
    pub history_len: usize,
    /// Whether a render is owed.
    pub dirty: bool,
    /// Recommended poll interval (ms).
    pub interval_ms: u64,
}

/// Adaptive refresh controller.
#[derive(Debug, Clone)]
pub struct RefreshController {
    config: RefreshConfig,
    mode: RefreshMode,
    current_fps: u32,
    target_fps: u32,
    last_activity: Option<Instant>,
    last_render: Option<Instant>,
    dirty: bool,
    activity_count: u32,
    render_history: VecDeque<f64>,
}

impl Default for RefreshController {
    fn default() -> Self {
        Self::new(RefreshConfig::default())
    }
}

impl RefreshController {
    /// Create a controller in normal mode at the normal rate.
    #[must_use]
    pub fn new(config: RefreshConfig) -> Self {
        let fps = config.normal_fps;
        Self {
            render_history: VecDeque::with_capacity(config.history_len),
            config,
            mode: RefreshMode::Normal,
            current_fps: fps,
            target_fps: fps,
            last_activity: None,
            last_render: None,
            dirty: false,
            activity_count: 0,
        }
    }

    /// Record an input activity now.
    pub fn record_activity(&mut self) {
        self.record_activity_at(Instant::now());
    }

    /// Record an input activity at `now`.
    ///
    /// Quiet time is measured from the previous activity, so a burst after a
    /// long pause first evaluates as the pause it ended.
    pub fn record_activity_at(&mut self, now: Instant) {
        let since = self.since_activity(now);
        self.activity_count = self.activity_count.saturating_add(1);
        self.dirty = true;
        self.last_activity = Some(now);
        self.evaluate(since);
    }

    /// Re-evaluate without new activity, e.g. on a poll tick, so the
    /// controller can decay toward idle.
    pub fn evaluate_at(&mut self, now: Instant) {
        let since = self.since_activity(now);
        self.evaluate(since);
    }

    /// Record how long a render took (ms) and clear the dirty flag.
    pub fn record_render(&mut self, duration_ms: f64) {
        self.record_render_at(duration_ms, Instant::now());
    }

    /// Record a render that finished at `now`.
    pub fn record_render_at(&mut self, duration_ms: f64, now: Instant) {
        self.render_history.push_front(duration_ms.max(0.0));
        self.render_history.truncate(self.config.history_len);
        self.dirty = false;
        self.last_render = Some(now);
    }

    /// Whether the host should render now.
    #[must_use]
    pub fn should_render(&self) -> bool {
        self.should_render_at(Instant::now())
    }

    /// Whether the host should render at `now`: something changed, or a
    /// full frame interval has passed since the last render.
    #[must_use]
    pub fn should_render_at(&self, now: Instant) -> bool {
        if self.dirty {
            return true;
        }
        let Some(last) = self.last_render else {
            return true;
        };
        if self.current_fps == 0 {
            return false;
        }
        let elapsed_ms = duration_since_or_zero(now, last).as_secs_f64() * 1000.0;
        elapsed_ms >= 1000.0 / f64::from(self.current_fps)
    }

    /// Recommended poll interval: `round(1000 / current_fps)` ms.
    #[must_use]
    pub fn interval_ms(&self) -> u64 {
        if self.current_fps == 0 {
            return 1000;
        }
        (1000.0 / f64::from(self.current_fps)).round() as u64
    }

    /// Poll interval as a `Duration`.
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms())
    }

    /// Periodic housekeeping: forget how many activities were seen.
    pub fn reset_activity_count(&mut self) {
        self.activity_count = 0;
    }

    /// Request a render on the next check.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Current mode.
    #[inline]
    pub fn mode(&self) -> RefreshMode {
        self.mode
    }

    /// Rate currently in effect.
    #[inline]
    pub fn current_fps(&self) -> u32 {
        self.current_fps
    }

    /// Rate being ramped toward.
    #[inline]
    pub fn target_fps(&self) -> u32 {
        self.target_fps
    }

    /// Whether a render is owed.
    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Activities since the last count reset.
    #[inline]
    pub fn activity_count(&self) -> u32 {
        self.activity_count
    }

    /// Render-time samples, most recent first.
    pub fn render_history(&self) -> impl ExactSizeIterator<Item = f64> + '_ {
        self.render_history.iter().copied()
    }

    /// Mean render time (ms), zero when no renders were recorded.
    #[must_use]
    pub fn avg_render_ms(&self) -> f64 {
        if self.render_history.is_empty() {
            return 0.0;
        }
        self.render_history.iter().sum::<f64>() / self.render_history.len() as f64
    }

    /// Capture a telemetry snapshot.
    #[must_use]
    pub fn telemetry(&self) -> RefreshTelemetry {
        RefreshTelemetry {
            mode: self.mode,
            current_fps: self.current_fps,
            target_fps: self.target_fps,
            activity_count: self.activity_count,
            avg_render_ms: self.avg_render_ms(),
            history_len: self.render_history.len(),
            dirty: self.dirty,
            interval_ms: self.interval_ms(),
        }
    }

    /// Reset to the initial state, keeping the configuration.
    pub fn reset(&mut self) {
        *self = Self::new(self.config.clone());
    }

    /// Get a reference to the controller configuration.
    #[inline]
    pub fn config(&self) -> &RefreshConfig {
        &self.config
    }

    fn since_activity(&self, now: Instant) -> Duration {
        self.last_activity
            .map_or(Duration::ZERO, |last| duration_since_or_zero(now, last))
    }

    fn classify(&self, since: Duration) -> RefreshMode {
        let since_ms = since.as_millis();
        if since_ms > u128::from(self.config.idle_after_ms) {
            RefreshMode::Idle
        } else if self.activity_count > self.config.fast_activity_count
            || self.avg_render_ms() > self.config.fast_render_ms
        {
            RefreshMode::Fast
        } else if since_ms > u128::from(self.config.transition_after_ms) {
            RefreshMode::Transition
        } else {
            RefreshMode::Normal
        }
    }

    fn evaluate(&mut self, since: Duration) {
        let mode = self.classify(since);
        if mode != self.mode {
            debug!(
                from = self.mode.as_str(),
                to = mode.as_str(),
                current_fps = self.current_fps,
                "refresh mode changed"
            );
            self.mode = mode;
        }
        self.target_fps = self.config.fps_for(mode);
        self.current_fps = ramp_step(
            self.current_fps,
            self.target_fps,
            self.config.ramp_up_step,
            self.config.ramp_down_step,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS: Duration = Duration::from_millis(1);

    /// Drive a fresh controller into fast mode at 60 FPS.
    fn fast_controller(t0: Instant) -> RefreshController {
        let mut c = RefreshController::default();
        for i in 0..7 {
            c.record_activity_at(t0 + i * MS);
        }
        assert_eq!(c.mode(), RefreshMode::Fast);
        assert_eq!(c.current_fps(), 60);
        c
    }

    #[test]
    fn starts_normal_at_thirty() {
        let c = RefreshController::default();
        assert_eq!(c.mode(), RefreshMode::Normal);
        assert_eq!(c.current_fps(), 30);
        assert_eq!(c.target_fps(), 30);
        assert_eq!(c.interval_ms(), 33);
        assert!(!c.is_dirty());
    }

    #[test]
    fn ramp_up_from_thirty_gives_forty_five() {
        let t0 = Instant::now();
        let mut c = RefreshController::default();
        for i in 0..5 {
            c.record_activity_at(t0 + i * MS);
            assert_eq!(c.current_fps(), 30);
        }
        c.record_activity_at(t0 + 5 * MS);
        assert_eq!(c.mode(), RefreshMode::Fast);
        assert_eq!(c.target_fps(), 60);
        assert_eq!(c.current_fps(), 45);
        c.record_activity_at(t0 + 6 * MS);
        assert_eq!(c.current_fps(), 60);
    }

    #[test]
    fn ramp_down_from_sixty_gives_fifty_five() {
        let t0 = Instant::now();
        let mut c = fast_controller(t0);
        c.reset_activity_count();
        c.record_activity_at(t0 + 100 * MS);
        assert_eq!(c.mode(), RefreshMode::Normal);
        assert_eq!(c.current_fps(), 55);
        for (i, expected) in [50, 45, 40, 35, 30, 30].into_iter().enumerate() {
            c.record_activity_at(t0 + (101 + i as u32) * MS);
            c.reset_activity_count();
            assert_eq!(c.current_fps(), expected);
        }
    }

    #[test]
    fn quiet_time_is_measured_from_previous_activity() {
        let t0 = Instant::now();
        let mut c = RefreshController::default();
        c.record_activity_at(t0);
        c.record_activity_at(t0 + 600 * MS);
        assert_eq!(c.mode(), RefreshMode::Transition);
        assert_eq!(c.target_fps(), 15);
        assert_eq!(c.current_fps(), 25);

        c.record_activity_at(t0 + 3700 * MS);
        assert_eq!(c.mode(), RefreshMode::Idle);
        assert_eq!(c.target_fps(), 5);
    }

    #[test]
    fn evaluate_decays_toward_idle() {
        let t0 = Instant::now();
        let mut c = RefreshController::default();
        c.record_activity_at(t0);
        let mut steps = 0;
        while c.current_fps() > 5 {
            c.evaluate_at(t0 + 4000 * MS);
            steps += 1;
        }
        assert_eq!(c.mode(), RefreshMode::Idle);
        assert_eq!(steps, 5);
        assert_eq!(c.interval_ms(), 200);
    }

    #[test]
    fn slow_renders_force_fast_mode() {
        let t0 = Instant::now();
        let mut c = RefreshController::default();
        c.record_render_at(25.0, t0);
        c.record_render_at(5.0, t0);
        assert!(c.avg_render_ms() > 10.0);
        c.record_activity_at(t0 + MS);
        assert_eq!(c.mode(), RefreshMode::Fast);
    }

    #[test]
    fn render_history_is_bounded_and_most_recent_first() {
        let t0 = Instant::now();
        let mut c = RefreshController::default();
        for i in 0..15 {
            c.record_render_at(f64::from(i), t0);
        }
        let history: Vec<f64> = c.render_history().collect();
        assert_eq!(history.len(), 10);
        assert_eq!(history[0], 14.0);
        assert_eq!(history[9], 5.0);
    }

    #[test]
    fn should_render_tracks_dirty_and_interval() {
        let t0 = Instant::now();
        let mut c = RefreshController::default();
        assert!(c.should_render_at(t0), "never rendered");

        c.record_render_at(1.0, t0);
        assert!(!c.should_render_at(t0 + 10 * MS));
        assert!(c.should_render_at(t0 + 34 * MS), "one frame at 30 FPS elapsed");

        c.mark_dirty();
        assert!(c.should_render_at(t0 + MS));
        c.record_render_at(1.0, t0 + MS);
        assert!(!c.is_dirty());
    }

    #[test]
    fn activity_marks_dirty() {
        let t0 = Instant::now();
        let mut c = RefreshController::default();
        c.record_render_at(1.0, t0);
        c.record_activity_at(t0 + MS);
        assert!(c.is_dirty());
        assert!(c.should_render_at(t0 + 2 * MS));
    }

    #[test]
    fn reset_activity_count_keeps_fps() {
        let t0 = Instant::now();
        let mut c = fast_controller(t0);
        c.reset_activity_count();
        assert_eq!(c.activity_count(), 0);
        assert_eq!(c.current_fps(), 60);
    }

    #[test]
    fn telemetry_reflects_state() {
        let t0 = Instant::now();
        let mut c = RefreshController::default();
        c.record_render_at(4.0, t0);
        c.record_render_at(6.0, t0);
        c.record_activity_at(t0);
        let t = c.telemetry();
        assert_eq!(t.mode, RefreshMode::Normal);
        assert_eq!(t.activity_count, 1);
        assert_eq!(t.avg_render_ms, 5.0);
        assert_eq!(t.history_len, 2);
        assert!(t.dirty);
        assert_eq!(t.interval_ms, 33);
    }

    #[test]
    fn reset_restores_initial_state() {
        let t0 = Instant::now();
        let mut c = fast_controller(t0);
        c.record_render_at(3.0, t0);
        c.reset();
        assert_eq!(c.mode(), RefreshMode::Normal);
        assert_eq!(c.current_fps(), 30);
        assert_eq!(c.render_history().len(), 0);
    }

    #[test]
    fn ramp_step_never_overshoots() {
        assert_eq!(ramp_step(30, 60, 15, 5), 45);
        assert_eq!(ramp_step(50, 60, 15, 5), 60);
        assert_eq!(ramp_step(60, 30, 15, 5), 55);
        assert_eq!(ramp_step(7, 5, 15, 5), 5);
        assert_eq!(ramp_step(30, 30, 15, 5), 30);
    }

    #[test]
    fn low_power_preset() {
        let c = RefreshController::new(RefreshConfig::low_power());
        assert_eq!(c.current_fps(), 20);
        assert_eq!(c.interval_ms(), 50);
    }
}
