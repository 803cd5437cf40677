#![forbid(unsafe_code)]

//! Plugin lifecycle manager.
//!
//! Hosts at most one running plugin. The session slot moves between two
//! states:
//!
//! ```text
//!            start(name) ok
//!   Idle ─────────────────────▶ Active(name, state)
//!    ▲                              │
//!    │ stop / Exit / panic          │ Continue: state replaced
//!    └──────────────────────────────┤ Error:    state kept
//!                                   │ start(other): cleanup, then init other
//! ```
//!
//! Every callback into plugin code runs under [`boundary::guard`]. On a panic
//! the session is torn down (cleanup is attempted, itself guarded), the crash
//! counter is bumped, and the caller receives [`PluginError::Crashed`]. The
//! manager's own fields are only written after the plugin call returns, so a
//! panic cannot leave them half-updated.

use std::sync::Arc;

use gridmark_core::key::Key;
use tracing::{debug, error, warn};

use crate::boundary::{self, CapturedPanic};
use crate::contract::{
    ErasedPlugin, HostContext, InputResult, KeyResult, Plugin, PluginOutput, PluginState,
};
use crate::error::{PluginError, Result};
use crate::registry::PluginRegistry;

/// Outcome of [`PluginManager::handle_input`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputResponse {
    /// The plugin is still running.
    Continue(PluginOutput),
    /// The plugin ended its session; this is its farewell output.
    Exited(PluginOutput),
}

impl InputResponse {
    /// The output either way.
    #[must_use]
    pub fn output(&self) -> &PluginOutput {
        match self {
            Self::Continue(output) | Self::Exited(output) => output,
        }
    }
}

/// Outcome of [`PluginManager::handle_key`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyResponse {
    /// The plugin consumed the key.
    Handled(PluginOutput),
    /// No plugin is active, or the plugin declined the key.
    Pass,
}

/// Lifecycle counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ManagerStats {
    /// Sessions started.
    pub starts: u64,
    /// Sessions ended by `stop`, replacement or plugin exit.
    pub stops: u64,
    /// Sessions ended by a panic.
    pub crashes: u64,
}

struct ActiveSession {
    name: String,
    plugin: Arc<dyn ErasedPlugin>,
    state: PluginState,
}

/// Registry plus the single active-session slot.
#[derive(Default)]
pub struct PluginManager {
    registry: PluginRegistry,
    active: Option<ActiveSession>,
    stats: ManagerStats,
}

impl std::fmt::Debug for PluginManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginManager")
            .field("registry", &self.registry)
            .field("active", &self.active_name())
            .field("stats", &self.stats)
            .finish()
    }
}

impl PluginManager {
    /// An empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A manager with the built-in plugins registered.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut manager = Self::new();
        crate::builtin::register_all(&mut manager.registry);
        manager
    }

    /// Register a plugin. See [`PluginRegistry::register`].
    pub fn register<P: Plugin>(&mut self, plugin: P) -> Result<String> {
        self.registry.register(plugin)
    }

    #[inline]
    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    #[inline]
    pub fn registry_mut(&mut self) -> &mut PluginRegistry {
        &mut self.registry
    }

    /// Start `name`, replacing any running plugin. Returns the first frame.
    pub fn start(&mut self, name: &str, ctx: &HostContext) -> Result<PluginOutput> {
        let plugin = self
            .registry
            .get(name)
            .map(|entry| Arc::clone(&entry.plugin))
            .ok_or_else(|| PluginError::NotFound(name.to_owned()))?;

        if let Some(previous) = self.active.take() {
            debug!(plugin = %previous.name, next = name, "replacing active plugin");
            self.finish(previous);
        }

        let state = match boundary::guard(name, "init", || plugin.init(ctx)) {
            Ok(Ok(state)) => state,
            Ok(Err(reason)) => {
                warn!(plugin = name, %reason, "plugin init failed");
                return Err(PluginError::InitFailed {
                    name: name.to_owned(),
                    reason,
                });
            }
            Err(panic) => return Err(self.crashed(panic, None)),
        };

        let session = ActiveSession {
            name: name.to_owned(),
            plugin,
            state,
        };
        match boundary::guard(name, "render", || session.plugin.render(&session.state, ctx)) {
            Ok(output) => {
                self.stats.starts += 1;
                debug!(plugin = name, "plugin started");
                self.active = Some(session);
                Ok(output)
            }
            Err(panic) => Err(self.crashed(panic, Some(session))),
        }
    }

    /// Route one line of input to the running plugin.
    pub fn handle_input(&mut self, input: &str, ctx: &HostContext) -> Result<InputResponse> {
        let session = self.active.take().ok_or(PluginError::NoActivePlugin)?;
        let result = boundary::guard(&session.name, "handle_input", || {
            session.plugin.handle_input(input, &session.state, ctx)
        });

        match result {
            Ok(InputResult::Continue { state, output }) => {
                self.active = Some(ActiveSession { state, ..session });
                Ok(InputResponse::Continue(output))
            }
            Ok(InputResult::Exit { output }) => {
                debug!(plugin = %session.name, "plugin exited");
                self.finish(session);
                Ok(InputResponse::Exited(output))
            }
            Ok(InputResult::Error(reason)) => {
                warn!(plugin = %session.name, %reason, "plugin rejected input");
                let name = session.name.clone();
                self.active = Some(session);
                Err(PluginError::Rejected { name, reason })
            }
            Err(panic) => Err(self.crashed(panic, Some(session))),
        }
    }

    /// Route one key to the running plugin. With no plugin active this is
    /// [`KeyResponse::Pass`], never an error.
    pub fn handle_key(&mut self, key: &Key, ctx: &HostContext) -> Result<KeyResponse> {
        let Some(session) = self.active.take() else {
            return Ok(KeyResponse::Pass);
        };
        let result = boundary::guard(&session.name, "handle_key", || {
            session.plugin.handle_key(key, &session.state, ctx)
        });

        match result {
            Ok(KeyResult::Handled { state, output }) => {
                self.active = Some(ActiveSession { state, ..session });
                Ok(KeyResponse::Handled(output))
            }
            Ok(KeyResult::Pass) => {
                self.active = Some(session);
                Ok(KeyResponse::Pass)
            }
            Err(panic) => Err(self.crashed(panic, Some(session))),
        }
    }

    /// Draw the running plugin.
    pub fn render(&mut self, ctx: &HostContext) -> Result<PluginOutput> {
        let session = self.active.take().ok_or(PluginError::NoActivePlugin)?;
        match boundary::guard(&session.name, "render", || {
            session.plugin.render(&session.state, ctx)
        }) {
            Ok(output) => {
                self.active = Some(session);
                Ok(output)
            }
            Err(panic) => Err(self.crashed(panic, Some(session))),
        }
    }

    /// Stop the running plugin. Returns its name.
    pub fn stop(&mut self) -> Result<String> {
        let session = self.active.take().ok_or(PluginError::NoActivePlugin)?;
        let name = session.name.clone();
        debug!(plugin = %name, "plugin stopped");
        self.finish(session);
        Ok(name)
    }

    /// Name of the running plugin.
    pub fn active_name(&self) -> Option<&str> {
        self.active.as_ref().map(|s| s.name.as_str())
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    #[inline]
    pub fn stats(&self) -> ManagerStats {
        self.stats
    }

    /// Orderly end of a session.
    fn finish(&mut self, session: ActiveSession) {
        self.stats.stops += 1;
        Self::cleanup(session);
    }

    /// Run cleanup under the boundary. A panic here is logged and dropped.
    fn cleanup(session: ActiveSession) {
        let ActiveSession {
            name,
            plugin,
            state,
        } = session;
        if let Err(panic) = boundary::guard(&name, "cleanup", || plugin.cleanup(state)) {
            error!(plugin = %name, payload = %panic.message, "plugin cleanup panicked");
        }
    }

    /// Tear down after a panic and produce the generic error.
    fn crashed(&mut self, panic: CapturedPanic, session: Option<ActiveSession>) -> PluginError {
        self.stats.crashes += 1;
        error!(
            plugin = %panic.plugin,
            operation = panic.operation,
            payload = %panic.message,
            "plugin panicked; session torn down"
        );
        if let Some(session) = session {
            Self::cleanup(session);
        }
        PluginError::Crashed { name: panic.plugin }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::PluginMetadata;
    use gridmark_core::key::KeyCode;
    use std::sync::Mutex;

    type Journal = Arc<Mutex<Vec<String>>>;

    /// Records every lifecycle call; panics or fails on request.
    struct Probe {
        name: &'static str,
        journal: Journal,
        fail_init: bool,
    }

    impl Probe {
        fn new(name: &'static str, journal: &Journal) -> Self {
            Self {
                name,
                journal: Arc::clone(journal),
                fail_init: false,
            }
        }

        fn log(&self, event: &str) {
            self.journal
                .lock()
                .unwrap()
                .push(format!("{}:{event}", self.name));
        }
    }

    impl Plugin for Probe {
        type State = Vec<String>;

        fn metadata(&self) -> PluginMetadata {
            PluginMetadata::new(self.name, "1.0")
        }

        fn init(&self, _ctx: &HostContext) -> std::result::Result<Vec<String>, String> {
            self.log("init");
            if self.fail_init {
                Err("not today".into())
            } else {
                Ok(Vec::new())
            }
        }

        fn handle_input(
            &self,
            input: &str,
            state: &Vec<String>,
            _ctx: &HostContext,
        ) -> InputResult<Vec<String>> {
            match input {
                "exit" => InputResult::Exit {
                    output: PluginOutput::line("bye"),
                },
                "boom" => panic!("input exploded"),
                "bad" => InputResult::Error("bad input".into()),
                other => {
                    let mut state = state.clone();
                    state.push(other.to_owned());
                    InputResult::Continue {
                        output: PluginOutput::new(state.iter().cloned()),
                        state,
                    }
                }
            }
        }

        fn handle_key(
            &self,
            key: &Key,
            state: &Vec<String>,
            _ctx: &HostContext,
        ) -> KeyResult<Vec<String>> {
            match key.code {
                KeyCode::Char('!') => panic!("key exploded"),
                KeyCode::Char(c) => {
                    let mut state = state.clone();
                    state.push(c.to_string());
                    KeyResult::Handled {
                        state,
                        output: PluginOutput::line("key"),
                    }
                }
                _ => KeyResult::Pass,
            }
        }

        fn render(&self, state: &Vec<String>, ctx: &HostContext) -> PluginOutput {
            if state.iter().any(|s| s == "render-boom") {
                panic!("render exploded");
            }
            PluginOutput::line(format!("{} {}x{} {}", self.name, ctx.width, ctx.height, state.len()))
        }

        fn cleanup(&self, _state: Vec<String>) {
            self.log("cleanup");
        }
    }

    fn setup() -> (PluginManager, Journal) {
        let journal = Journal::default();
        let mut manager = PluginManager::new();
        manager.register(Probe::new("one", &journal)).unwrap();
        manager.register(Probe::new("two", &journal)).unwrap();
        (manager, journal)
    }

    fn events(journal: &Journal) -> Vec<String> {
        journal.lock().unwrap().clone()
    }

    #[test]
    fn start_returns_first_render() {
        let (mut manager, _) = setup();
        let out = manager.start("one", &HostContext::new(40, 10)).unwrap();
        assert_eq!(out, PluginOutput::line("one 40x10 0"));
        assert_eq!(manager.active_name(), Some("one"));
        assert_eq!(manager.stats().starts, 1);
    }

    #[test]
    fn start_unknown_is_not_found() {
        let (mut manager, _) = setup();
        assert_eq!(
            manager.start("nope", &HostContext::default()),
            Err(PluginError::NotFound("nope".into()))
        );
        assert!(!manager.is_active());
    }

    #[test]
    fn second_start_cleans_up_first_before_init() {
        let (mut manager, journal) = setup();
        let ctx = HostContext::default();
        manager.start("one", &ctx).unwrap();
        manager.start("two", &ctx).unwrap();
        assert_eq!(events(&journal), vec!["one:init", "one:cleanup", "two:init"]);
        assert_eq!(manager.active_name(), Some("two"));
        assert_eq!(manager.stats().stops, 1);
    }

    #[test]
    fn init_failure_leaves_no_session() {
        let journal = Journal::default();
        let mut manager = PluginManager::new();
        let mut probe = Probe::new("grumpy", &journal);
        probe.fail_init = true;
        manager.register(probe).unwrap();
        assert_eq!(
            manager.start("grumpy", &HostContext::default()),
            Err(PluginError::InitFailed {
                name: "grumpy".into(),
                reason: "not today".into()
            })
        );
        assert!(!manager.is_active());
        assert_eq!(manager.stats().starts, 0);
    }

    #[test]
    fn continue_updates_state() {
        let (mut manager, _) = setup();
        let ctx = HostContext::default();
        manager.start("one", &ctx).unwrap();
        manager.handle_input("a", &ctx).unwrap();
        let out = manager.handle_input("b", &ctx).unwrap();
        assert_eq!(out, InputResponse::Continue(PluginOutput::new(["a", "b"])));
        assert_eq!(manager.render(&ctx).unwrap(), PluginOutput::line("one 80x24 2"));
    }

    #[test]
    fn exit_clears_session_and_cleans_up() {
        let (mut manager, journal) = setup();
        let ctx = HostContext::default();
        manager.start("one", &ctx).unwrap();
        let out = manager.handle_input("exit", &ctx).unwrap();
        assert_eq!(out, InputResponse::Exited(PluginOutput::line("bye")));
        assert!(!manager.is_active());
        assert_eq!(events(&journal), vec!["one:init", "one:cleanup"]);
    }

    #[test]
    fn error_keeps_state() {
        let (mut manager, _) = setup();
        let ctx = HostContext::default();
        manager.start("one", &ctx).unwrap();
        manager.handle_input("a", &ctx).unwrap();
        assert_eq!(
            manager.handle_input("bad", &ctx),
            Err(PluginError::Rejected {
                name: "one".into(),
                reason: "bad input".into()
            })
        );
        assert_eq!(manager.render(&ctx).unwrap(), PluginOutput::line("one 80x24 1"));
    }

    #[test]
    fn no_active_plugin_outcomes() {
        let mut manager = PluginManager::new();
        let ctx = HostContext::default();
        assert_eq!(manager.handle_input("x", &ctx), Err(PluginError::NoActivePlugin));
        assert_eq!(manager.handle_key(&Key::char('x'), &ctx), Ok(KeyResponse::Pass));
        assert_eq!(manager.render(&ctx), Err(PluginError::NoActivePlugin));
        assert_eq!(manager.stop(), Err(PluginError::NoActivePlugin));
    }

    #[test]
    fn stop_runs_cleanup() {
        let (mut manager, journal) = setup();
        manager.start("two", &HostContext::default()).unwrap();
        assert_eq!(manager.stop(), Ok("two".into()));
        assert!(!manager.is_active());
        assert_eq!(events(&journal), vec!["two:init", "two:cleanup"]);
    }

    #[test]
    fn keys_are_forwarded_or_passed() {
        let (mut manager, _) = setup();
        let ctx = HostContext::default();
        manager.start("one", &ctx).unwrap();
        assert_eq!(
            manager.handle_key(&Key::char('z'), &ctx),
            Ok(KeyResponse::Handled(PluginOutput::line("key")))
        );
        assert_eq!(
            manager.handle_key(&Key::new(KeyCode::Up), &ctx),
            Ok(KeyResponse::Pass)
        );
        assert_eq!(manager.render(&ctx).unwrap(), PluginOutput::line("one 80x24 1"));
    }

    #[test]
    fn panic_in_input_tears_down_session() {
        let (mut manager, journal) = setup();
        let ctx = HostContext::default();
        manager.start("one", &ctx).unwrap();
        assert_eq!(
            manager.handle_input("boom", &ctx),
            Err(PluginError::Crashed { name: "one".into() })
        );
        assert!(!manager.is_active());
        assert_eq!(manager.stats().crashes, 1);
        assert_eq!(events(&journal), vec!["one:init", "one:cleanup"]);

        // The manager is still usable.
        manager.start("two", &ctx).unwrap();
        assert_eq!(manager.active_name(), Some("two"));
    }

    #[test]
    fn panic_in_key_and_render_are_isolated() {
        let (mut manager, _) = setup();
        let ctx = HostContext::default();
        manager.start("one", &ctx).unwrap();
        assert_eq!(
            manager.handle_key(&Key::char('!'), &ctx),
            Err(PluginError::Crashed { name: "one".into() })
        );
        assert!(!manager.is_active());

        manager.start("one", &ctx).unwrap();
        manager.handle_input("render-boom", &ctx).unwrap();
        assert_eq!(
            manager.render(&ctx),
            Err(PluginError::Crashed { name: "one".into() })
        );
        assert_eq!(manager.stats().crashes, 2);
    }
}
