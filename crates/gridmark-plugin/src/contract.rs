#![forbid(unsafe_code)]

//! The plugin capability contract.
//!
//! A plugin is a stateless driver ([`Plugin`]) plus a private state value it
//! creates in `init` and threads through every later callback. Callbacks
//! borrow the current state and return a replacement, so a callback that
//! fails leaves the previous state intact.
//!
//! The manager stores plugins behind [`ErasedPlugin`], which erases the state
//! type to [`PluginState`]. The only implementation of `ErasedPlugin` is the
//! blanket impl over `Plugin`, so anything the registry accepts has been
//! checked against the full contract by the compiler.

use std::any::Any;
use std::fmt;

use gridmark_core::key::Key;
use gridmark_render::buffer::Buffer;
use gridmark_render::drawing::Draw;

/// Grid the plugin is drawing into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HostContext {
    /// Columns available.
    pub width: u16,
    /// Rows available.
    pub height: u16,
}

impl HostContext {
    /// Create a context.
    #[must_use]
    pub const fn new(width: u16, height: u16) -> Self {
        Self { width, height }
    }
}

impl Default for HostContext {
    fn default() -> Self {
        Self::new(80, 24)
    }
}

/// Broad grouping for plugin listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PluginCategory {
    /// Interactive games.
    Game,
    /// Utilities and tools.
    Tool,
    /// Everything else.
    #[default]
    Other,
}

impl PluginCategory {
    /// Get the stable string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Game => "game",
            Self::Tool => "tool",
            Self::Other => "other",
        }
    }
}

/// Descriptive metadata, validated at registration.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PluginMetadata {
    /// Unique registry key. Must be non-empty and contain no whitespace.
    pub name: String,
    /// Must be non-empty.
    pub version: String,
    pub description: String,
    pub author: String,
    /// Commands that launch the plugin. Each must be non-empty and unique.
    pub commands: Vec<String>,
    pub category: PluginCategory,
}

impl PluginMetadata {
    /// Metadata with a name and version; everything else empty.
    #[must_use]
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    /// Add a launch command.
    #[must_use]
    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.commands.push(command.into());
        self
    }

    #[must_use]
    pub fn with_category(mut self, category: PluginCategory) -> Self {
        self.category = category;
        self
    }

    /// Check the registration rules. Returns the first violation.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.is_empty() {
            return Err("name is empty".into());
        }
        if self.name.chars().any(char::is_whitespace) {
            return Err("name contains whitespace".into());
        }
        if self.version.trim().is_empty() {
            return Err("version is empty".into());
        }
        for (i, command) in self.commands.iter().enumerate() {
            if command.trim().is_empty() {
                return Err(format!("command #{i} is empty"));
            }
            if self.commands[..i].contains(command) {
                return Err(format!("duplicate command '{command}'"));
            }
        }
        Ok(())
    }
}

/// Lines of text produced by a plugin.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PluginOutput {
    pub lines: Vec<String>,
}

impl PluginOutput {
    /// Output from any sequence of lines.
    #[must_use]
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }

    /// A single line.
    #[must_use]
    pub fn line(text: impl Into<String>) -> Self {
        Self {
            lines: vec![text.into()],
        }
    }

    /// Append a line.
    pub fn push(&mut self, text: impl Into<String>) {
        self.lines.push(text.into());
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Write the lines into `buf` starting at `(x, y)`, one per row.
    ///
    /// Text is clipped at the buffer edges; rows past the bottom are dropped.
    /// Returns the number of rows written.
    pub fn paint(&self, buf: &mut Buffer, x: u16, y: u16) -> u16 {
        let mut written = 0;
        for (row, line) in (y..buf.height()).zip(&self.lines) {
            buf.write_at(x, row, line);
            written += 1;
        }
        written
    }
}

impl fmt::Display for PluginOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, line) in self.lines.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            f.write_str(line)?;
        }
        Ok(())
    }
}

/// Outcome of [`Plugin::handle_input`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputResult<S> {
    /// Keep running with a new state.
    Continue { state: S, output: PluginOutput },
    /// End the session after showing `output`.
    Exit { output: PluginOutput },
    /// Refuse this input; the current state is kept.
    Error(String),
}

impl<S> InputResult<S> {
    /// Map the state type, keeping the variant.
    pub fn map_state<T>(self, f: impl FnOnce(S) -> T) -> InputResult<T> {
        match self {
            Self::Continue { state, output } => InputResult::Continue {
                state: f(state),
                output,
            },
            Self::Exit { output } => InputResult::Exit { output },
            Self::Error(reason) => InputResult::Error(reason),
        }
    }
}

/// Outcome of [`Plugin::handle_key`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyResult<S> {
    /// The key was consumed.
    Handled { state: S, output: PluginOutput },
    /// Let the host handle the key.
    Pass,
}

impl<S> KeyResult<S> {
    /// Map the state type, keeping the variant.
    pub fn map_state<T>(self, f: impl FnOnce(S) -> T) -> KeyResult<T> {
        match self {
            Self::Handled { state, output } => KeyResult::Handled {
                state: f(state),
                output,
            },
            Self::Pass => KeyResult::Pass,
        }
    }
}

/// An interactive sub-program hosted by the plugin manager.
///
/// # Example
///
/// ```
/// use gridmark_plugin::contract::*;
///
/// struct Echo;
///
/// impl Plugin for Echo {
///     type State = Vec<String>;
///
///     fn metadata(&self) -> PluginMetadata {
///         PluginMetadata::new("echo", "1.0").with_command("echo")
///     }
///
///     fn init(&self, _ctx: &HostContext) -> Result<Self::State, String> {
///         Ok(Vec::new())
///     }
///
///     fn handle_input(
///         &self,
///         input: &str,
///         state: &Self::State,
///         _ctx: &HostContext,
///     ) -> InputResult<Self::State> {
///         if input == "bye" {
///             return InputResult::Exit { output: PluginOutput::line("bye!") };
///         }
///         let mut state = state.clone();
///         state.push(input.to_owned());
///         let output = PluginOutput::new(state.iter().cloned());
///         InputResult::Continue { state, output }
///     }
///
///     fn render(&self, state: &Self::State, _ctx: &HostContext) -> PluginOutput {
///         PluginOutput::new(state.iter().cloned())
///     }
///
///     fn cleanup(&self, _state: Self::State) {}
/// }
/// ```
pub trait Plugin: Send + Sync + 'static {
    /// Private per-session state.
    type State: Send + 'static;

    /// Describe the plugin.
    fn metadata(&self) -> PluginMetadata;

    /// Start a session. `Err` carries a short human-readable reason.
    fn init(&self, ctx: &HostContext) -> Result<Self::State, String>;

    /// Handle one line of input.
    fn handle_input(
        &self,
        input: &str,
        state: &Self::State,
        ctx: &HostContext,
    ) -> InputResult<Self::State>;

    /// Handle a single key. Defaults to [`KeyResult::Pass`].
    fn handle_key(
        &self,
        _key: &Key,
        _state: &Self::State,
        _ctx: &HostContext,
    ) -> KeyResult<Self::State> {
        KeyResult::Pass
    }

    /// Draw the current state.
    fn render(&self, state: &Self::State, ctx: &HostContext) -> PluginOutput;

    /// Release the session.
    fn cleanup(&self, state: Self::State);
}

/// Type-erased plugin state.
pub type PluginState = Box<dyn Any + Send>;

mod sealed {
    pub trait Sealed {}
    impl<P: super::Plugin> Sealed for P {}
}

/// Object-safe view of a [`Plugin`] with its state erased.
///
/// Sealed: obtained only through the blanket impl.
pub trait ErasedPlugin: Send + Sync + sealed::Sealed {
    fn metadata(&self) -> PluginMetadata;
    fn init(&self, ctx: &HostContext) -> Result<PluginState, String>;
    fn handle_input(
        &self,
        input: &str,
        state: &PluginState,
        ctx: &HostContext,
    ) -> InputResult<PluginState>;
    fn handle_key(&self, key: &Key, state: &PluginState, ctx: &HostContext)
    -> KeyResult<PluginState>;
    fn render(&self, state: &PluginState, ctx: &HostContext) -> PluginOutput;
    fn cleanup(&self, state: PluginState);
}

/// Recover the concrete state. The manager only ever pairs a state with the
/// plugin that created it, so a mismatch is an invariant violation.
fn typed<S: 'static>(state: &PluginState) -> &S {
    match state.downcast_ref::<S>() {
        Some(state) => state,
        None => unreachable!("plugin state does not belong to this plugin"),
    }
}

fn erase<S: Send + 'static>(state: S) -> PluginState {
    Box::new(state)
}

impl<P: Plugin> ErasedPlugin for P {
    fn metadata(&self) -> PluginMetadata {
        Plugin::metadata(self)
    }

    fn init(&self, ctx: &HostContext) -> Result<PluginState, String> {
        Plugin::init(self, ctx).map(erase)
    }

    fn handle_input(
        &self,
        input: &str,
        state: &PluginState,
        ctx: &HostContext,
    ) -> InputResult<PluginState> {
        Plugin::handle_input(self, input, typed::<P::State>(state), ctx).map_state(erase)
    }

    fn handle_key(
        &self,
        key: &Key,
        state: &PluginState,
        ctx: &HostContext,
    ) -> KeyResult<PluginState> {
        Plugin::handle_key(self, key, typed::<P::State>(state), ctx).map_state(erase)
    }

    fn render(&self, state: &PluginState, ctx: &HostContext) -> PluginOutput {
        Plugin::render(self, typed::<P::State>(state), ctx)
    }

    fn cleanup(&self, state: PluginState) {
        if let Ok(state) = state.downcast::<P::State>() {
            Plugin::cleanup(self, *state);
        }
    }
}
