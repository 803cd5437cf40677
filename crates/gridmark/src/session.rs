#![forbid(unsafe_code)]

//! Host-driven session.
//!
//! [`Session`] owns one instance of every component and runs the pipeline
//! between them. It never sleeps or spawns; the host calls in with key
//! tokens, timer callbacks and poll ticks, and gets markup back.
//!
//! ```text
//!   key token ─▶ InputFlow ─▶ dispatch ─┬─▶ PluginManager (if active)
//!                  │                    └─▶ App::on_key
//!                  ▼                               │
//!            input_deadline()          RefreshController::record_activity
//!                                                  │
//!   tick_at(now) ─▶ should_render? ─▶ compose buffer ─▶ Renderer ─▶ markup
//!                                                  │
//!                                  RefreshController::record_render
//! ```
//!
//! While a plugin runs, keys go to its `handle_key` first. Keys it passes
//! feed a one-line editor: printable characters are typed, `Backspace`
//! deletes, `Enter` submits the line to `handle_input`, and `Escape` stops
//! the plugin.

use std::time::{Duration, Instant};

use gridmark_core::key::{Key, KeyCode};
use gridmark_plugin::{
    HostContext, InputResponse, KeyResponse, PluginError, PluginManager, PluginOutput,
};
use gridmark_render::buffer::Buffer;
use gridmark_render::drawing::Draw;
use gridmark_render::renderer::{RenderedFrame, Renderer};
use gridmark_runtime::{Dispatch, InputFlow, RefreshController};
use tracing::{debug, trace};

use crate::config::EngineConfig;
use crate::{Error, Result};

/// What the app wants the session to do after a key.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AppCommand {
    /// Nothing beyond the usual redraw after activity.
    #[default]
    None,
    /// Force a render on the next tick.
    Redraw,
    /// Start the named plugin, replacing any running one.
    StartPlugin(String),
    /// Drop the renderer's caches and render from scratch.
    Invalidate,
}

/// The host application's own screen, shown whenever no plugin runs.
pub trait App {
    /// Handle one dispatched key.
    fn on_key(&mut self, key: &Key) -> AppCommand;

    /// Draw into a cleared buffer.
    fn view(&self, buf: &mut Buffer);
}

/// Result of pushing one key into the session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyOutcome {
    /// Admission control dropped the key.
    pub dropped: bool,
    /// Keys dispatched by this push (earlier batched keys included).
    pub dispatched: usize,
}

/// One app, one grid, and every component wired together.
pub struct Session<A: App> {
    app: A,
    buffer: Buffer,
    renderer: Renderer,
    refresh: RefreshController,
    flow: InputFlow,
    plugins: PluginManager,
    ctx: HostContext,
    plugin_view: PluginOutput,
    plugin_line: String,
    plugin_status: Option<String>,
    notice: PluginOutput,
    activity_window: Duration,
    window_start: Option<Instant>,
}

impl<A: App> Session<A> {
    /// Create a session with the built-in plugins registered.
    pub fn new(app: A, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            app,
            buffer: Buffer::new(config.width, config.height),
            renderer: Renderer::with_config(config.renderer),
            refresh: RefreshController::new(config.refresh),
            flow: InputFlow::new(config.token_bucket, config.debounce),
            plugins: PluginManager::with_builtins(),
            ctx: HostContext::new(config.width, config.height),
            plugin_view: PluginOutput::default(),
            plugin_line: String::new(),
            plugin_status: None,
            notice: PluginOutput::default(),
            activity_window: Duration::from_millis(config.activity_window_ms),
            window_start: None,
        })
    }

    /// Replace the plugin manager.
    #[must_use]
    pub fn with_plugins(mut self, plugins: PluginManager) -> Self {
        self.plugins = plugins;
        self
    }

    // --- Input ------------------------------------------------------------

    /// Push a host key token now. Unknown tokens return `None`.
    pub fn push_token(&mut self, token: &str) -> Option<KeyOutcome> {
        self.push_token_at(token, Instant::now())
    }

    /// Push a host key token at `now`. Unknown tokens return `None`.
    pub fn push_token_at(&mut self, token: &str, now: Instant) -> Option<KeyOutcome> {
        let Some(key) = Key::parse(token) else {
            trace!(token, "unknown key token ignored");
            return None;
        };
        Some(self.push_key_at(key, now))
    }

    /// Push a key now.
    pub fn push_key(&mut self, key: Key) -> KeyOutcome {
        self.push_key_at(key, Instant::now())
    }

    /// Push a key at `now`.
    pub fn push_key_at(&mut self, key: Key, now: Instant) -> KeyOutcome {
        let outcome = self.flow.push_at(key, now);
        let dispatched = self.dispatch_all(outcome.dispatches, now);
        KeyOutcome {
            dropped: outcome.dropped,
            dispatched,
        }
    }

    /// Host callback for [`input_deadline`](Self::input_deadline). Returns
    /// the number of keys dispatched.
    pub fn on_input_timeout_at(&mut self, now: Instant) -> usize {
        let released = self.flow.on_timeout_at(now);
        self.dispatch_all(released, now)
    }

    /// Dispatch pending keys without waiting for the window.
    pub fn flush_input_at(&mut self, now: Instant) -> usize {
        let released = self.flow.flush();
        self.dispatch_all(released, now)
    }

    /// When the host should call [`on_input_timeout_at`](Self::on_input_timeout_at).
    #[inline]
    pub fn input_deadline(&self) -> Option<Instant> {
        self.flow.deadline()
    }

    // --- Rendering --------------------------------------------------------

    /// How long the host should wait before the next tick.
    #[inline]
    pub fn poll_interval(&self) -> Duration {
        self.refresh.interval()
    }

    /// Poll tick now.
    pub fn tick(&mut self) -> Option<RenderedFrame> {
        self.tick_at(Instant::now())
    }

    /// Poll tick at `now`. Returns a frame when a render is due.
    pub fn tick_at(&mut self, now: Instant) -> Option<RenderedFrame> {
        let window_start = *self.window_start.get_or_insert(now);
        if now.saturating_duration_since(window_start) >= self.activity_window {
            self.refresh.reset_activity_count();
            self.window_start = Some(now);
        }

        self.refresh.evaluate_at(now);
        if !self.refresh.should_render_at(now) {
            return None;
        }
        Some(self.render_at(now))
    }

    /// Render unconditionally.
    pub fn render_at(&mut self, now: Instant) -> RenderedFrame {
        let started = Instant::now();
        self.compose();
        let frame = self.renderer.render_frame(&self.buffer);
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        self.refresh.record_render_at(elapsed_ms, now);
        trace!(kind = frame.kind.as_str(), elapsed_ms, "session frame");
        frame
    }

    /// Request a render on the next tick.
    pub fn mark_dirty(&mut self) {
        self.refresh.mark_dirty();
    }

    /// Change the grid size. The next render is a full one.
    ///
    /// A running plugin is re-rendered against the new size.
    pub fn resize(&mut self, width: u16, height: u16) -> Result<()> {
        if width == 0 || height == 0 {
            return Err(Error::Config(format!(
                "grid size must be non-zero, got {width}x{height}"
            )));
        }
        self.buffer = Buffer::new(width, height);
        self.ctx = HostContext::new(width, height);
        self.refresh.mark_dirty();
        debug!(width, height, "session resized");
        if self.plugins.is_active() {
            match self.plugins.render(&self.ctx) {
                Ok(output) => self.plugin_view = output,
                Err(err) => self.plugin_failed(err),
            }
        }
        Ok(())
    }

    // --- Plugins ----------------------------------------------------------

    /// Start a plugin, replacing any running one.
    pub fn start_plugin(&mut self, name: &str) -> Result<()> {
        self.refresh.mark_dirty();
        match self.plugins.start(name, &self.ctx) {
            Ok(output) => {
                self.plugin_view = output;
                self.plugin_line.clear();
                self.plugin_status = None;
                self.notice = PluginOutput::default();
                Ok(())
            }
            Err(err) => {
                self.notice = PluginOutput::line(err.to_string());
                Err(err.into())
            }
        }
    }

    /// Stop the running plugin. Returns its name.
    pub fn stop_plugin(&mut self) -> Result<String> {
        let name = self.plugins.stop()?;
        self.end_plugin_view();
        Ok(name)
    }

    // --- Accessors --------------------------------------------------------

    #[inline]
    pub fn app(&self) -> &A {
        &self.app
    }

    /// Mutable app access. Call [`mark_dirty`](Self::mark_dirty) if the view
    /// changes.
    #[inline]
    pub fn app_mut(&mut self) -> &mut A {
        &mut self.app
    }

    /// The buffer as of the last render.
    #[inline]
    pub fn buffer(&self) -> &Buffer {
        &self.buffer
    }

    #[inline]
    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    #[inline]
    pub fn refresh(&self) -> &RefreshController {
        &self.refresh
    }

    #[inline]
    pub fn flow(&self) -> &InputFlow {
        &self.flow
    }

    #[inline]
    pub fn plugins(&self) -> &PluginManager {
        &self.plugins
    }

    #[inline]
    pub fn plugins_mut(&mut self) -> &mut PluginManager {
        &mut self.plugins
    }

    #[inline]
    pub fn context(&self) -> HostContext {
        self.ctx
    }

    /// Text being typed for the running plugin.
    #[inline]
    pub fn plugin_line(&self) -> &str {
        &self.plugin_line
    }

    /// Message shown under the app view (plugin farewell or failure).
    #[inline]
    pub fn notice(&self) -> &PluginOutput {
        &self.notice
    }

    // --- Internals --------------------------------------------------------

    fn dispatch_all(&mut self, dispatches: impl IntoIterator<Item = Dispatch>, now: Instant) -> usize {
        let mut count = 0;
        for key in dispatches.into_iter().flat_map(Dispatch::into_keys) {
            self.refresh.record_activity_at(now);
            if self.plugins.is_active() {
                self.plugin_key(key);
            } else {
                self.app_key(key);
            }
            count += 1;
        }
        count
    }

    fn app_key(&mut self, key: Key) {
        self.notice = PluginOutput::default();
        match self.app.on_key(&key) {
            AppCommand::None => {}
            AppCommand::Redraw => self.refresh.mark_dirty(),
            AppCommand::StartPlugin(name) => {
                // Failure is already shown as a notice.
                let _ = self.start_plugin(&name);
            }
            AppCommand::Invalidate => {
                self.renderer.invalidate();
                self.refresh.mark_dirty();
            }
        }
    }

    fn plugin_key(&mut self, key: Key) {
        match self.plugins.handle_key(&key, &self.ctx) {
            Ok(KeyResponse::Handled(output)) => {
                self.plugin_view = output;
                self.plugin_status = None;
            }
            Ok(KeyResponse::Pass) => self.edit_plugin_line(key),
            Err(err) => self.plugin_failed(err),
        }
    }

    fn edit_plugin_line(&mut self, key: Key) {
        match key.code {
            KeyCode::Char(c) if !key.ctrl() => self.plugin_line.push(c),
            KeyCode::Backspace => {
                self.plugin_line.pop();
            }
            KeyCode::Enter => {
                let line = std::mem::take(&mut self.plugin_line);
                self.submit_plugin_line(&line);
            }
            KeyCode::Escape => {
                let _ = self.stop_plugin();
            }
            _ => {}
        }
    }

    fn submit_plugin_line(&mut self, line: &str) {
        match self.plugins.handle_input(line, &self.ctx) {
            Ok(InputResponse::Continue(output)) => {
                self.plugin_view = output;
                self.plugin_status = None;
            }
            Ok(InputResponse::Exited(farewell)) => {
                self.end_plugin_view();
                self.notice = farewell;
            }
            Err(PluginError::Rejected { reason, .. }) => self.plugin_status = Some(reason),
            Err(err) => self.plugin_failed(err),
        }
    }

    fn plugin_failed(&mut self, err: PluginError) {
        self.end_plugin_view();
        self.notice = PluginOutput::line(err.to_string());
    }

    fn end_plugin_view(&mut self) {
        self.plugin_view = PluginOutput::default();
        self.plugin_line.clear();
        self.plugin_status = None;
        self.refresh.mark_dirty();
    }

    fn compose(&mut self) {
        self.buffer.clear();
        let bottom = self.buffer.height() - 1;
        if self.plugins.is_active() {
            self.plugin_view.paint(&mut self.buffer, 0, 0);
            if let (Some(status), Some(row)) = (&self.plugin_status, bottom.checked_sub(1)) {
                self.buffer.write_at(0, row, status);
            }
            let prompt = format!("> {}", self.plugin_line);
            self.buffer.write_at(0, bottom, &prompt);
        } else {
            self.app.view(&mut self.buffer);
            let rows = u16::try_from(self.notice.lines.len()).unwrap_or(u16::MAX);
            let top = self.buffer.height().saturating_sub(rows);
            self.notice.paint(&mut self.buffer, 0, top);
        }
    }
}

impl<A: App> std::fmt::Debug for Session<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("size", &(self.buffer.width(), self.buffer.height()))
            .field("plugin", &self.plugins.active_name())
            .field("refresh", &self.refresh.telemetry())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridmark_render::renderer::FrameKind;

    const MS: Duration = Duration::from_millis(1);

    /// Shows the last typed characters; `p` launches the guessing game.
    #[derive(Default)]
    struct Typist {
        text: String,
    }

    impl App for Typist {
        fn on_key(&mut self, key: &Key) -> AppCommand {
            match key.code {
                KeyCode::Char('p') => AppCommand::StartPlugin("number-guess".into()),
                KeyCode::Char('x') => AppCommand::StartPlugin("missing".into()),
                KeyCode::Char(c) => {
                    self.text.push(c);
                    AppCommand::None
                }
                KeyCode::Enter => AppCommand::Invalidate,
                _ => AppCommand::Redraw,
            }
        }

        fn view(&self, buf: &mut Buffer) {
            buf.write_at(0, 0, &self.text);
        }
    }

    fn session() -> Session<Typist> {
        Session::new(Typist::default(), EngineConfig::default()).unwrap()
    }

    fn row_text(buf: &Buffer, y: u16) -> String {
        let mut out = String::new();
        for cell in buf.row_cells(y) {
            cell.content.with_str(|s| out.push_str(s));
        }
        out.trim_end().to_owned()
    }

    #[test]
    fn rejects_zero_size() {
        let err = Session::new(Typist::default(), EngineConfig::default().with_size(0, 0));
        assert!(matches!(err, Err(Error::Config(_))));
    }

    #[test]
    fn first_tick_renders_full_frame() {
        let t0 = Instant::now();
        let mut s = session();
        let frame = s.tick_at(t0).expect("initial render");
        assert_eq!(frame.kind, FrameKind::Full);
        assert!(s.tick_at(t0 + MS).is_none(), "nothing changed");
    }

    #[test]
    fn batched_keys_reach_app_on_timeout() {
        let t0 = Instant::now();
        let mut s = session();
        s.tick_at(t0);
        assert_eq!(s.push_token_at("h", t0).unwrap().dispatched, 0);
        assert_eq!(s.push_token_at("i", t0 + MS).unwrap().dispatched, 0);
        assert_eq!(s.input_deadline(), Some(t0 + 50 * MS));
        assert_eq!(s.on_input_timeout_at(t0 + 50 * MS), 2);
        assert_eq!(s.app().text, "hi");

        let frame = s.tick_at(t0 + 51 * MS).expect("dirty after activity");
        assert_eq!(frame.kind, FrameKind::Partial);
        assert_eq!(row_text(s.buffer(), 0), "hi");
    }

    #[test]
    fn unknown_tokens_are_ignored() {
        let mut s = session();
        assert_eq!(s.push_token_at("Shift", Instant::now()), None);
    }

    #[test]
    fn instant_key_flushes_typed_text_first() {
        let t0 = Instant::now();
        let mut s = session();
        s.push_token_at("a", t0);
        let outcome = s.push_token_at("ArrowUp", t0 + MS).unwrap();
        assert_eq!(outcome.dispatched, 2);
        assert_eq!(s.app().text, "a");
    }

    #[test]
    fn plugin_round_trip_through_keys() {
        let t0 = Instant::now();
        let mut s = session();
        s.push_token_at("p", t0);
        s.flush_input_at(t0);
        assert_eq!(s.plugins().active_name(), Some("number-guess"));

        s.tick_at(t0 + MS);
        assert_eq!(row_text(s.buffer(), 0), "NUMBER GUESS");
        assert_eq!(row_text(s.buffer(), 23), ">");

        for token in ["4", "2"] {
            s.push_token_at(token, t0 + 2 * MS);
        }
        s.flush_input_at(t0 + 2 * MS);
        assert_eq!(s.plugin_line(), "42");
        s.tick_at(t0 + 3 * MS);
        assert_eq!(row_text(s.buffer(), 23), "> 42");

        s.push_token_at("Escape", t0 + 4 * MS);
        assert!(!s.plugins().is_active());
        assert_eq!(s.plugin_line(), "");
    }

    #[test]
    fn rejected_input_shows_status_and_keeps_plugin() {
        let t0 = Instant::now();
        let mut s = session();
        s.start_plugin("number-guess").unwrap();
        s.push_token_at("z", t0);
        s.push_token_at("Enter", t0);
        assert!(s.plugins().is_active());
        s.tick_at(t0 + MS);
        assert_eq!(row_text(s.buffer(), 22), "not a number: 'z'");
    }

    #[test]
    fn quitting_plugin_leaves_farewell_notice() {
        let t0 = Instant::now();
        let mut s = session();
        s.start_plugin("number-guess").unwrap();
        s.push_token_at("q", t0);
        s.push_token_at("Enter", t0);
        assert!(!s.plugins().is_active());
        assert!(s.notice().lines[0].starts_with("You gave up."));
        s.tick_at(t0 + MS);
        assert!(row_text(s.buffer(), 23).starts_with("You gave up."));
    }

    #[test]
    fn failed_start_surfaces_reason() {
        let t0 = Instant::now();
        let mut s = session();
        s.push_token_at("x", t0);
        s.flush_input_at(t0);
        assert!(!s.plugins().is_active());
        assert_eq!(s.notice().lines, vec!["Plugin not found: missing".to_owned()]);
    }

    #[test]
    fn invalidate_command_forces_full_render() {
        let t0 = Instant::now();
        let mut s = session();
        s.tick_at(t0);
        s.push_token_at("Enter", t0 + MS);
        let frame = s.tick_at(t0 + 2 * MS).expect("dirty");
        assert_eq!(frame.kind, FrameKind::Full);
    }

    #[test]
    fn activity_count_resets_each_window() {
        let t0 = Instant::now();
        let mut s = session();
        s.tick_at(t0);
        for i in 0..8 {
            s.push_token_at("Up", t0 + i * MS);
        }
        assert_eq!(s.refresh().activity_count(), 8);
        s.tick_at(t0 + 1000 * MS);
        assert_eq!(s.refresh().activity_count(), 0);
    }

    #[test]
    fn resize_changes_grid_and_context() {
        let t0 = Instant::now();
        let mut s = session();
        s.tick_at(t0);
        s.resize(40, 10).unwrap();
        assert_eq!(s.context(), HostContext::new(40, 10));
        let frame = s.tick_at(t0 + MS).expect("dirty after resize");
        assert_eq!(frame.kind, FrameKind::Full);
        assert!(s.resize(0, 10).is_err());
    }
}
