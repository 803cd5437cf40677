#![forbid(unsafe_code)]

//! Canonical key tokens.
//!
//! Hosts deliver keys as string identifiers (`"j"`, `"Enter"`, `"ArrowUp"`,
//! `"Ctrl+c"`). [`Key::parse`] maps those onto a small closed vocabulary so
//! that flow control and plugins can match on an enum instead of strings.
//!
//! # Design Notes
//!
//! - Browser-style names (`ArrowUp`, `Esc`, `Del`) and terminal-style names
//!   (`Up`, `Escape`, `Delete`) are both accepted.
//! - A single grapheme that is not a named key becomes [`KeyCode::Char`].
//! - Unknown multi-character tokens (`"Shift"`, `"Dead"`) are rejected; the
//!   host drops them before they reach any component.
//! - `Display` renders the canonical form, which round-trips through `parse`.

use core::fmt;

use bitflags::bitflags;

/// A key press delivered by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Key {
    /// The key that was pressed.
    pub code: KeyCode,
    /// Modifier keys held with it.
    pub modifiers: Modifiers,
}

/// Key codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyCode {
    /// A printable character.
    Char(char),
    /// Enter/Return.
    Enter,
    /// Escape.
    Escape,
    /// Backspace.
    Backspace,
    /// Tab.
    Tab,
    /// Shift+Tab.
    BackTab,
    /// Delete.
    Delete,
    /// Insert.
    Insert,
    /// Home.
    Home,
    /// End.
    End,
    /// Page Up.
    PageUp,
    /// Page Down.
    PageDown,
    /// Up arrow.
    Up,
    /// Down arrow.
    Down,
    /// Left arrow.
    Left,
    /// Right arrow.
    Right,
    /// Function key (F1-F24).
    F(u8),
}

bitflags! {
    /// Modifier keys held during a key press.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Modifiers: u8 {
        /// No modifiers.
        const NONE  = 0b0000;
        /// Shift key.
        const SHIFT = 0b0001;
        /// Alt/Option key.
        const ALT   = 0b0010;
        /// Control key.
        const CTRL  = 0b0100;
        /// Super/Meta/Command key.
        const SUPER = 0b1000;
    }
}

impl Default for Modifiers {
    fn default() -> Self {
        Self::NONE
    }
}

impl Key {
    /// A key with no modifiers.
    #[must_use]
    pub const fn new(code: KeyCode) -> Self {
        Self {
            code,
            modifiers: Modifiers::NONE,
        }
    }

    /// Shorthand for a printable character key.
    #[must_use]
    pub const fn char(c: char) -> Self {
        Self::new(KeyCode::Char(c))
    }

    /// Attach modifiers.
    #[must_use]
    pub const fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Check if this is a specific character key.
    #[must_use]
    pub fn is_char(&self, c: char) -> bool {
        matches!(self.code, KeyCode::Char(ch) if ch == c)
    }

    /// Check if Ctrl is held.
    #[must_use]
    pub const fn ctrl(&self) -> bool {
        self.modifiers.contains(Modifiers::CTRL)
    }

    /// Parse a host key token.
    ///
    /// Modifier prefixes (`Ctrl+`, `Alt+`, `Shift+`, `Meta+`, `Super+`,
    /// `Cmd+`) may be stacked in any order. `"Shift+Tab"` becomes
    /// [`KeyCode::BackTab`].
    ///
    /// ```
    /// use gridmark_core::key::{Key, KeyCode, Modifiers};
    ///
    /// assert_eq!(Key::parse("ArrowUp"), Some(Key::new(KeyCode::Up)));
    /// assert_eq!(Key::parse("j"), Some(Key::char('j')));
    /// assert_eq!(
    ///     Key::parse("Ctrl+c"),
    ///     Some(Key::char('c').with_modifiers(Modifiers::CTRL))
    /// );
    /// assert_eq!(Key::parse("Shift"), None);
    /// ```
    #[must_use]
    pub fn parse(token: &str) -> Option<Self> {
        let mut modifiers = Modifiers::NONE;
        let mut rest = token;

        // A lone "+" is the plus key, not a separator.
        while let Some((prefix, tail)) = rest.split_once('+') {
            if tail.is_empty() {
                break;
            }
            let modifier = match prefix {
                "Ctrl" | "Control" => Modifiers::CTRL,
                "Alt" | "Option" => Modifiers::ALT,
                "Shift" => Modifiers::SHIFT,
                "Meta" | "Super" | "Cmd" => Modifiers::SUPER,
                _ => break,
            };
            modifiers |= modifier;
            rest = tail;
        }

        let code = KeyCode::parse(rest)?;
        if code == KeyCode::Tab && modifiers.contains(Modifiers::SHIFT) {
            return Some(Self::new(KeyCode::BackTab).with_modifiers(modifiers - Modifiers::SHIFT));
        }
        Some(Self { code, modifiers })
    }
}

impl From<KeyCode> for Key {
    fn from(code: KeyCode) -> Self {
        Self::new(code)
    }
}

impl KeyCode {
    /// Parse a bare key name (no modifier prefixes).
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        let code = match name {
            "Enter" | "Return" => Self::Enter,
            "Escape" | "Esc" => Self::Escape,
            "Backspace" => Self::Backspace,
            "Tab" => Self::Tab,
            "BackTab" => Self::BackTab,
            "Delete" | "Del" => Self::Delete,
            "Insert" => Self::Insert,
            "Home" => Self::Home,
            "End" => Self::End,
            "PageUp" => Self::PageUp,
            "PageDown" => Self::PageDown,
            "ArrowUp" | "Up" => Self::Up,
            "ArrowDown" | "Down" => Self::Down,
            "ArrowLeft" | "Left" => Self::Left,
            "ArrowRight" | "Right" => Self::Right,
            "Space" | "Spacebar" => Self::Char(' '),
            _ => return Self::parse_function(name).or_else(|| Self::parse_char(name)),
        };
        Some(code)
    }

    fn parse_function(name: &str) -> Option<Self> {
        let digits = name.strip_prefix('F')?;
        if digits.is_empty() || digits.starts_with('0') {
            return None;
        }
        let n: u8 = digits.parse().ok()?;
        (1..=24).contains(&n).then_some(Self::F(n))
    }

    fn parse_char(name: &str) -> Option<Self> {
        let mut chars = name.chars();
        let c = chars.next()?;
        if chars.next().is_some() || c.is_control() {
            return None;
        }
        Some(Self::Char(c))
    }

    /// True for Up/Down/Left/Right.
    #[must_use]
    pub const fn is_arrow(self) -> bool {
        matches!(self, Self::Up | Self::Down | Self::Left | Self::Right)
    }

    /// True for PageUp/PageDown/Home/End.
    #[must_use]
    pub const fn is_paging(self) -> bool {
        matches!(self, Self::PageUp | Self::PageDown | Self::Home | Self::End)
    }
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Char(' ') => f.write_str("Space"),
            Self::Char(c) => write!(f, "{c}"),
            Self::Enter => f.write_str("Enter"),
            Self::Escape => f.write_str("Escape"),
            Self::Backspace => f.write_str("Backspace"),
            Self::Tab => f.write_str("Tab"),
            Self::BackTab => f.write_str("BackTab"),
            Self::Delete => f.write_str("Delete"),
            Self::Insert => f.write_str("Insert"),
            Self::Home => f.write_str("Home"),
            Self::End => f.write_str("End"),
            Self::PageUp => f.write_str("PageUp"),
            Self::PageDown => f.write_str("PageDown"),
            Self::Up => f.write_str("ArrowUp"),
            Self::Down => f.write_str("ArrowDown"),
            Self::Left => f.write_str("ArrowLeft"),
            Self::Right => f.write_str("ArrowRight"),
            Self::F(n) => write!(f, "F{n}"),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.modifiers.contains(Modifiers::CTRL) {
            f.write_str("Ctrl+")?;
        }
        if self.modifiers.contains(Modifiers::ALT) {
            f.write_str("Alt+")?;
        }
        if self.modifiers.contains(Modifiers::SHIFT) {
            f.write_str("Shift+")?;
        }
        if self.modifiers.contains(Modifiers::SUPER) {
            f.write_str("Meta+")?;
        }
        write!(f, "{}", self.code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_browser_and_terminal_names() {
        assert_eq!(KeyCode::parse("ArrowLeft"), Some(KeyCode::Left));
        assert_eq!(KeyCode::parse("Left"), Some(KeyCode::Left));
        assert_eq!(KeyCode::parse("Esc"), Some(KeyCode::Escape));
        assert_eq!(KeyCode::parse("Escape"), Some(KeyCode::Escape));
        assert_eq!(KeyCode::parse("Return"), Some(KeyCode::Enter));
    }

    #[test]
    fn parses_function_keys_in_range() {
        assert_eq!(KeyCode::parse("F1"), Some(KeyCode::F(1)));
        assert_eq!(KeyCode::parse("F24"), Some(KeyCode::F(24)));
        assert_eq!(KeyCode::parse("F25"), None);
        assert_eq!(KeyCode::parse("F0"), None);
        assert_eq!(KeyCode::parse("F01"), None);
        // A bare "F" is just the letter.
        assert_eq!(KeyCode::parse("F"), Some(KeyCode::Char('F')));
    }

    #[test]
    fn single_graphemes_become_chars() {
        assert_eq!(Key::parse("j"), Some(Key::char('j')));
        assert_eq!(Key::parse("é"), Some(Key::char('é')));
        assert_eq!(Key::parse("+"), Some(Key::char('+')));
        assert_eq!(Key::parse("Space"), Some(Key::char(' ')));
    }

    #[test]
    fn rejects_unknown_and_control_tokens() {
        assert_eq!(Key::parse(""), None);
        assert_eq!(Key::parse("Shift"), None);
        assert_eq!(Key::parse("Unidentified"), None);
        assert_eq!(Key::parse("\u{7}"), None);
    }

    #[test]
    fn stacks_modifier_prefixes() {
        let key = Key::parse("Ctrl+Alt+x").unwrap();
        assert_eq!(key.code, KeyCode::Char('x'));
        assert_eq!(key.modifiers, Modifiers::CTRL | Modifiers::ALT);
        assert!(key.ctrl());
    }

    #[test]
    fn ctrl_plus_plus_is_the_plus_key() {
        let key = Key::parse("Ctrl++").unwrap();
        assert_eq!(key.code, KeyCode::Char('+'));
        assert!(key.ctrl());
    }

    #[test]
    fn shift_tab_is_back_tab() {
        assert_eq!(Key::parse("Shift+Tab"), Some(Key::new(KeyCode::BackTab)));
    }

    #[test]
    fn display_round_trips() {
        for token in ["ArrowUp", "Ctrl+c", "F5", "Space", "Alt+Shift+Enter", "q"] {
            let key = Key::parse(token).unwrap();
            assert_eq!(Key::parse(&key.to_string()), Some(key), "token {token}");
        }
    }

    #[test]
    fn classification_helpers() {
        assert!(KeyCode::Up.is_arrow());
        assert!(!KeyCode::Home.is_arrow());
        assert!(KeyCode::PageDown.is_paging());
        assert!(KeyCode::End.is_paging());
        assert!(!KeyCode::Char('j').is_paging());
    }
}
