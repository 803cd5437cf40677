#![forbid(unsafe_code)]

//! Cell types and invariants.
//!
//! The `Cell` is the fundamental unit of the grid: one grapheme plus the
//! style it is drawn with. Cells are plain values. Two cells that compare
//! equal always produce identical markup, which is what lets the renderer
//! key its fragment cache on the cell itself.
//!
//! # Content
//!
//! ```text
//! CellContent::Char(char)       // fast path, no allocation
//! CellContent::Cluster(Arc<str>) // multi-codepoint grapheme, shared
//! ```
//!
//! Every cell occupies exactly one grid column, whatever its content.

use std::fmt;
use std::sync::Arc;

/// Grapheme stored in a cell.
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum CellContent {
    /// A single Unicode scalar.
    Char(char),
    /// A grapheme cluster of more than one scalar (combining marks, ZWJ
    /// sequences, flags).
    Cluster(Arc<str>),
}

impl CellContent {
    /// The blank cell content.
    pub const SPACE: Self = Self::Char(' ');

    /// Build content from one extended grapheme.
    ///
    /// Single-scalar graphemes take the `Char` fast path. Control characters
    /// are replaced by a space; they have no glyph to draw.
    #[must_use]
    pub fn from_grapheme(grapheme: &str) -> Self {
        let mut chars = grapheme.chars();
        match (chars.next(), chars.next()) {
            (None, _) => Self::SPACE,
            (Some(c), None) => Self::from_char(c),
            (Some(c), Some(_)) if c.is_control() => Self::SPACE,
            _ => Self::Cluster(Arc::from(grapheme)),
        }
    }

    /// Build content from a single character.
    #[inline]
    #[must_use]
    pub fn from_char(c: char) -> Self {
        if c.is_control() {
            Self::SPACE
        } else {
            Self::Char(c)
        }
    }

    /// The character, if this is the single-scalar fast path.
    #[inline]
    #[must_use]
    pub const fn as_char(&self) -> Option<char> {
        match self {
            Self::Char(c) => Some(*c),
            Self::Cluster(_) => None,
        }
    }

    /// Check if this is a blank space.
    #[inline]
    #[must_use]
    pub const fn is_space(&self) -> bool {
        matches!(self, Self::Char(' '))
    }

    /// Call `f` with the content as a string slice.
    pub fn with_str<R>(&self, f: impl FnOnce(&str) -> R) -> R {
        match self {
            Self::Char(c) => {
                let mut tmp = [0u8; 4];
                f(c.encode_utf8(&mut tmp))
            }
            Self::Cluster(s) => f(s),
        }
    }
}

impl Default for CellContent {
    fn default() -> Self {
        Self::SPACE
    }
}

impl fmt::Debug for CellContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Char(c) => write!(f, "Char({c:?})"),
            Self::Cluster(s) => write!(f, "Cluster({:?})", &**s),
        }
    }
}

impl fmt::Display for CellContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Char(c) => write!(f, "{c}"),
            Self::Cluster(s) => f.write_str(s),
        }
    }
}

bitflags::bitflags! {
    /// Cell style flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct StyleFlags: u8 {
        /// Bold / increased intensity.
        const BOLD      = 0b0000_0001;
        /// Italic text.
        const ITALIC    = 0b0000_0010;
        /// Underlined text.
        const UNDERLINE = 0b0000_0100;
        /// Reverse video (swap fg/bg).
        const REVERSE   = 0b0000_1000;
    }
}

/// The 16 named terminal colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamedColor {
    Black,
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    White,
    BrightBlack,
    BrightRed,
    BrightGreen,
    BrightYellow,
    BrightBlue,
    BrightMagenta,
    BrightCyan,
    BrightWhite,
}

impl NamedColor {
    /// All named colors in palette order.
    pub const ALL: [Self; 16] = [
        Self::Black,
        Self::Red,
        Self::Green,
        Self::Yellow,
        Self::Blue,
        Self::Magenta,
        Self::Cyan,
        Self::White,
        Self::BrightBlack,
        Self::BrightRed,
        Self::BrightGreen,
        Self::BrightYellow,
        Self::BrightBlue,
        Self::BrightMagenta,
        Self::BrightCyan,
        Self::BrightWhite,
    ];

    /// Kebab-case name used in markup class names.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Black => "black",
            Self::Red => "red",
            Self::Green => "green",
            Self::Yellow => "yellow",
            Self::Blue => "blue",
            Self::Magenta => "magenta",
            Self::Cyan => "cyan",
            Self::White => "white",
            Self::BrightBlack => "bright-black",
            Self::BrightRed => "bright-red",
            Self::BrightGreen => "bright-green",
            Self::BrightYellow => "bright-yellow",
            Self::BrightBlue => "bright-blue",
            Self::BrightMagenta => "bright-magenta",
            Self::BrightCyan => "bright-cyan",
            Self::BrightWhite => "bright-white",
        }
    }
}

/// A foreground or background color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Color {
    /// One of the 16 palette colors; themed by the host.
    Named(NamedColor),
    /// Exact 24-bit color.
    Rgb(u8, u8, u8),
}

impl Color {
    /// Create an RGB color.
    #[inline]
    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::Rgb(r, g, b)
    }
}

impl From<NamedColor> for Color {
    fn from(named: NamedColor) -> Self {
        Self::Named(named)
    }
}

/// Visual attributes of a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Style {
    /// Text attributes.
    pub flags: StyleFlags,
    /// Foreground color; `None` inherits the host's default.
    pub fg: Option<Color>,
    /// Background color; `None` inherits the host's default.
    pub bg: Option<Color>,
}

impl Style {
    /// The default style: no attributes, no colors.
    pub const DEFAULT: Self = Self {
        flags: StyleFlags::empty(),
        fg: None,
        bg: None,
    };

    /// Create a default style.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self::DEFAULT
    }

    /// Set the foreground color.
    #[must_use]
    pub fn fg(mut self, color: impl Into<Color>) -> Self {
        self.fg = Some(color.into());
        self
    }

    /// Set the background color.
    #[must_use]
    pub fn bg(mut self, color: impl Into<Color>) -> Self {
        self.bg = Some(color.into());
        self
    }

    /// Add attribute flags.
    #[inline]
    #[must_use]
    pub const fn add_flags(mut self, flags: StyleFlags) -> Self {
        self.flags = self.flags.union(flags);
        self
    }

    /// Add bold.
    #[inline]
    #[must_use]
    pub const fn bold(self) -> Self {
        self.add_flags(StyleFlags::BOLD)
    }

    /// Add italic.
    #[inline]
    #[must_use]
    pub const fn italic(self) -> Self {
        self.add_flags(StyleFlags::ITALIC)
    }

    /// Add underline.
    #[inline]
    #[must_use]
    pub const fn underline(self) -> Self {
        self.add_flags(StyleFlags::UNDERLINE)
    }

    /// Add reverse video.
    #[inline]
    #[must_use]
    pub const fn reverse(self) -> Self {
        self.add_flags(StyleFlags::REVERSE)
    }

    /// True if this style renders as plain text.
    #[inline]
    #[must_use]
    pub const fn is_default(&self) -> bool {
        self.flags.is_empty() && self.fg.is_none() && self.bg.is_none()
    }
}

/// A single grid cell.
///
/// # Default
///
/// The default cell is a space under the default style.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct Cell {
    /// Grapheme content.
    pub content: CellContent,
    /// Visual attributes.
    pub style: Style,
}

impl Cell {
    /// A blank cell (space, default style).
    pub const BLANK: Self = Self {
        content: CellContent::SPACE,
        style: Style::DEFAULT,
    };

    /// Create a new cell with the given content and default style.
    #[inline]
    #[must_use]
    pub const fn new(content: CellContent) -> Self {
        Self {
            content,
            style: Style::DEFAULT,
        }
    }

    /// Create a cell from a single character.
    #[inline]
    #[must_use]
    pub fn from_char(c: char) -> Self {
        Self::new(CellContent::from_char(c))
    }

    /// Create a cell from one extended grapheme.
    #[must_use]
    pub fn from_grapheme(grapheme: &str) -> Self {
        Self::new(CellContent::from_grapheme(grapheme))
    }

    /// Set the style.
    #[inline]
    #[must_use]
    pub fn with_style(mut self, style: Style) -> Self {
        self.style = style;
        self
    }

    /// Set the cell content to a character, preserving the style.
    #[inline]
    #[must_use]
    pub fn with_char(mut self, c: char) -> Self {
        self.content = CellContent::from_char(c);
        self
    }

    /// Check if this cell is blank with default style.
    #[inline]
    #[must_use]
    pub const fn is_blank(&self) -> bool {
        self.content.is_space() && self.style.is_default()
    }
}

impl fmt::Debug for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cell")
            .field("content", &self.content)
            .field("style", &self.style)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn default_cell_is_blank() {
        let cell = Cell::default();
        assert!(cell.is_blank());
        assert_eq!(cell, Cell::BLANK);
    }

    #[test]
    fn single_scalar_grapheme_takes_char_path() {
        assert_eq!(CellContent::from_grapheme("a"), CellContent::Char('a'));
        assert_eq!(CellContent::from_grapheme("é"), CellContent::Char('é'));
    }

    #[test]
    fn multi_scalar_grapheme_is_cluster() {
        let content = CellContent::from_grapheme("e\u{301}");
        assert_eq!(content.as_char(), None);
        assert_eq!(content.to_string(), "e\u{301}");
    }

    #[test]
    fn control_characters_become_space() {
        assert_eq!(CellContent::from_char('\t'), CellContent::SPACE);
        assert_eq!(CellContent::from_grapheme("\r\n"), CellContent::SPACE);
        assert_eq!(CellContent::from_grapheme(""), CellContent::SPACE);
    }

    #[test]
    fn with_str_exposes_content() {
        let len = CellContent::Char('─').with_str(str::len);
        assert_eq!(len, '─'.len_utf8());
        let cluster = CellContent::from_grapheme("👍🏽");
        assert!(cluster.with_str(|s| s == "👍🏽"));
    }

    #[test]
    fn style_builders_accumulate() {
        let style = Style::new().bold().underline().fg(NamedColor::Red);
        assert!(style.flags.contains(StyleFlags::BOLD | StyleFlags::UNDERLINE));
        assert!(!style.flags.contains(StyleFlags::ITALIC));
        assert_eq!(style.fg, Some(Color::Named(NamedColor::Red)));
        assert!(!style.is_default());
        assert!(Style::new().is_default());
    }

    #[test]
    fn equal_cells_hash_equal() {
        let a = Cell::from_char('x').with_style(Style::new().bg(Color::rgb(1, 2, 3)));
        let b = Cell::from_char('x').with_style(Style::new().bg(Color::rgb(1, 2, 3)));
        let c = Cell::from_char('x');
        let set: HashSet<Cell> = [a.clone(), b, c].into_iter().collect();
        assert_eq!(set.len(), 2);
        assert!(set.contains(&a));
    }

    #[test]
    fn named_color_names_are_distinct() {
        let names: HashSet<&str> = NamedColor::ALL.iter().map(|c| c.name()).collect();
        assert_eq!(names.len(), 16);
        assert_eq!(NamedColor::BrightBlue.name(), "bright-blue");
    }
}
