#![forbid(unsafe_code)]

//! Drawing primitives for the buffer.
//!
//! Helpers on top of `Buffer::set()` so apps and plugins can write text and
//! draw boxes without duplicating low-level cell loops. Everything clips to
//! the buffer; nothing here can change a buffer's shape.

use gridmark_core::geometry::Rect;
use unicode_segmentation::UnicodeSegmentation;

use crate::buffer::Buffer;
use crate::cell::{Cell, CellContent, Style};

/// Characters used to draw a border around a rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BorderChars {
    pub top_left: char,
    pub top_right: char,
    pub bottom_left: char,
    pub bottom_right: char,
    pub horizontal: char,
    pub vertical: char,
}

impl BorderChars {
    /// Simple box-drawing characters (U+250x).
    pub const SQUARE: Self = Self {
        top_left: '┌',
        top_right: '┐',
        bottom_left: '└',
        bottom_right: '┘',
        horizontal: '─',
        vertical: '│',
    };

    /// Rounded corners.
    pub const ROUNDED: Self = Self {
        top_left: '╭',
        top_right: '╮',
        bottom_left: '╰',
        bottom_right: '╯',
        horizontal: '─',
        vertical: '│',
    };

    /// Double-line border.
    pub const DOUBLE: Self = Self {
        top_left: '╔',
        top_right: '╗',
        bottom_left: '╚',
        bottom_right: '╝',
        horizontal: '═',
        vertical: '║',
    };

    /// Heavy (thick) border.
    pub const HEAVY: Self = Self {
        top_left: '┏',
        top_right: '┓',
        bottom_left: '┗',
        bottom_right: '┛',
        horizontal: '━',
        vertical: '┃',
    };

    /// ASCII-only border.
    pub const ASCII: Self = Self {
        top_left: '+',
        top_right: '+',
        bottom_left: '+',
        bottom_right: '+',
        horizontal: '-',
        vertical: '|',
    };

    /// Every glyph in the set.
    #[must_use]
    pub const fn glyphs(&self) -> [char; 6] {
        [
            self.top_left,
            self.top_right,
            self.bottom_left,
            self.bottom_right,
            self.horizontal,
            self.vertical,
        ]
    }
}

/// Named border glyph sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BorderStyle {
    /// `┌─┐`
    #[default]
    Single,
    /// `╔═╗`
    Double,
    /// `╭─╮`
    Rounded,
    /// `┏━┓`
    Heavy,
    /// `+-+`, for hosts without box-drawing glyphs.
    Ascii,
}

impl BorderStyle {
    /// All border styles.
    pub const ALL: [Self; 5] = [
        Self::Single,
        Self::Double,
        Self::Rounded,
        Self::Heavy,
        Self::Ascii,
    ];

    /// The glyph set for this style.
    #[must_use]
    pub const fn chars(self) -> BorderChars {
        match self {
            Self::Single => BorderChars::SQUARE,
            Self::Double => BorderChars::DOUBLE,
            Self::Rounded => BorderChars::ROUNDED,
            Self::Heavy => BorderChars::HEAVY,
            Self::Ascii => BorderChars::ASCII,
        }
    }
}

/// Extension trait for drawing on a Buffer.
pub trait Draw {
    /// Draw a horizontal line of cells.
    fn draw_horizontal_line(&mut self, x: u16, y: u16, width: u16, cell: &Cell);

    /// Draw a vertical line of cells.
    fn draw_vertical_line(&mut self, x: u16, y: u16, height: u16, cell: &Cell);

    /// Write text at the given coordinates under the default style.
    ///
    /// See [`Draw::write_styled`].
    fn write_at(&mut self, x: u16, y: u16, text: &str) -> u16 {
        self.write_styled(x, y, text, Style::DEFAULT)
    }

    /// Write text at the given coordinates.
    ///
    /// Each extended grapheme takes one cell. Control characters become
    /// spaces. Stops at the end of the line; out-of-range `x` or `y` writes
    /// nothing. Returns the column after the last written grapheme.
    fn write_styled(&mut self, x: u16, y: u16, text: &str, style: Style) -> u16;

    /// Draw a border around a rectangle using the given characters.
    ///
    /// The border is drawn inside the rectangle (edges + corners), clipped
    /// to the buffer.
    fn draw_border(&mut self, rect: Rect, chars: BorderChars, style: Style);

    /// Draw a box outline under the default style.
    fn draw_box(&mut self, x: u16, y: u16, width: u16, height: u16, border: BorderStyle) {
        self.draw_box_styled(x, y, width, height, border, Style::DEFAULT);
    }

    /// Draw a box outline.
    ///
    /// A zero width or height draws nothing. Heights below 2 draw only the
    /// top edge; widths below 2 skip the right edge.
    fn draw_box_styled(
        &mut self,
        x: u16,
        y: u16,
        width: u16,
        height: u16,
        border: BorderStyle,
        style: Style,
    ) {
        self.draw_border(Rect::new(x, y, width, height), border.chars(), style);
    }
}

impl Draw for Buffer {
    fn draw_horizontal_line(&mut self, x: u16, y: u16, width: u16, cell: &Cell) {
        let end = x.saturating_add(width).min(self.width());
        for cx in x..end {
            self.set(cx, y, cell.clone());
        }
    }

    fn draw_vertical_line(&mut self, x: u16, y: u16, height: u16, cell: &Cell) {
        let end = y.saturating_add(height).min(self.height());
        for cy in y..end {
            self.set(x, cy, cell.clone());
        }
    }

    fn write_styled(&mut self, x: u16, y: u16, text: &str, style: Style) -> u16 {
        if y >= self.height() || x >= self.width() {
            return x;
        }

        let max_x = self.width();
        let mut cx = x;
        for grapheme in text.graphemes(true) {
            if cx >= max_x {
                break;
            }
            let cell = Cell::new(CellContent::from_grapheme(grapheme)).with_style(style);
            self.set(cx, y, cell);
            cx += 1;
        }
        cx
    }

    fn draw_border(&mut self, rect: Rect, chars: BorderChars, style: Style) {
        // Off-buffer boxes draw nothing; on-buffer ones have `top() < u16::MAX`.
        if self.bounds().intersection(&rect).is_empty() {
            return;
        }

        let make_cell = |c: char| -> Cell { Cell::from_char(c).with_style(style) };

        let h_cell = make_cell(chars.horizontal);
        let v_cell = make_cell(chars.vertical);

        // Top edge
        self.draw_horizontal_line(rect.left(), rect.top(), rect.width, &h_cell);

        // Bottom edge
        if rect.height > 1 {
            self.draw_horizontal_line(rect.left(), rect.bottom() - 1, rect.width, &h_cell);
        }

        // Left edge (excluding corners)
        if rect.height > 2 {
            self.draw_vertical_line(rect.left(), rect.top() + 1, rect.height - 2, &v_cell);
        }

        // Right edge (excluding corners)
        if rect.width > 1 && rect.height > 2 {
            self.draw_vertical_line(rect.right() - 1, rect.top() + 1, rect.height - 2, &v_cell);
        }

        // Corners (drawn last to overwrite edge chars at corners)
        self.set(rect.left(), rect.top(), make_cell(chars.top_left));

        if rect.width > 1 {
            self.set(rect.right() - 1, rect.top(), make_cell(chars.top_right));
        }

        if rect.height > 1 {
            self.set(rect.left(), rect.bottom() - 1, make_cell(chars.bottom_left));
        }

        if rect.width > 1 && rect.height > 1 {
            self.set(
                rect.right() - 1,
                rect.bottom() - 1,
                make_cell(chars.bottom_right),
            );
        }
    }
}
