#![forbid(unsafe_code)]

//! Buffer grid storage.
//!
//! The `Buffer` is a 2D grid of [`Cell`]s representing one screen of output.
//!
//! # Layout
//!
//! Cells are stored in row-major order: `index = y * width + x`.
//!
//! # Invariants
//!
//! 1. `cells.len() == width * height`
//! 2. Width and height are non-zero and never change after creation
//!
//! Resizing produces a new buffer ([`Buffer::resized`]); nothing mutates the
//! dimensions of an existing one.

use gridmark_core::geometry::Rect;

use crate::cell::{Cell, CellContent, Color, Style};

const FNV64_OFFSET_BASIS: u64 = 0xcbf29ce484222325;
const FNV64_PRIME: u64 = 0x100000001b3;

/// A 2D grid of styled cells.
///
/// # Example
///
/// ```
/// use gridmark_render::buffer::Buffer;
/// use gridmark_render::cell::Cell;
///
/// let mut buffer = Buffer::new(80, 24);
/// buffer.set(0, 0, Cell::from_char('H'));
/// buffer.set(1, 0, Cell::from_char('i'));
/// assert_eq!(buffer.get(1, 0).and_then(|c| c.content.as_char()), Some('i'));
/// ```
#[derive(Debug, Clone)]
pub struct Buffer {
    width: u16,
    height: u16,
    cells: Vec<Cell>,
}

impl Buffer {
    /// Create a new buffer with the given dimensions.
    ///
    /// All cells are initialized to a blank space under the default style.
    ///
    /// # Panics
    ///
    /// Panics if width or height is 0.
    #[must_use]
    pub fn new(width: u16, height: u16) -> Self {
        assert!(width > 0, "buffer width must be > 0");
        assert!(height > 0, "buffer height must be > 0");

        let size = width as usize * height as usize;
        Self {
            width,
            height,
            cells: vec![Cell::BLANK; size],
        }
    }

    /// Alias of [`Buffer::new`], named for what it produces.
    #[inline]
    #[must_use]
    pub fn blank(width: u16, height: u16) -> Self {
        Self::new(width, height)
    }

    /// Buffer width in cells.
    #[inline]
    pub const fn width(&self) -> u16 {
        self.width
    }

    /// Buffer height in cells.
    #[inline]
    pub const fn height(&self) -> u16 {
        self.height
    }

    /// Total number of cells.
    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Check if the buffer is empty (never true for a valid buffer).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Bounding rect of the entire buffer.
    #[inline]
    pub const fn bounds(&self) -> Rect {
        Rect::from_size(self.width, self.height)
    }

    /// Convert (x, y) coordinates to a linear index.
    ///
    /// Returns `None` if coordinates are out of bounds.
    #[inline]
    fn index(&self, x: u16, y: u16) -> Option<usize> {
        if x < self.width && y < self.height {
            Some(y as usize * self.width as usize + x as usize)
        } else {
            None
        }
    }

    /// Get a reference to the cell at (x, y).
    ///
    /// Returns `None` if coordinates are out of bounds.
    #[inline]
    pub fn get(&self, x: u16, y: u16) -> Option<&Cell> {
        self.index(x, y).map(|i| &self.cells[i])
    }

    /// Get a mutable reference to the cell at (x, y).
    ///
    /// Returns `None` if coordinates are out of bounds.
    #[inline]
    pub fn get_mut(&mut self, x: u16, y: u16) -> Option<&mut Cell> {
        self.index(x, y).map(|i| &mut self.cells[i])
    }

    /// Set the cell at (x, y). Out-of-bounds writes are ignored.
    #[inline]
    pub fn set(&mut self, x: u16, y: u16, cell: Cell) {
        if let Some(idx) = self.index(x, y) {
            self.cells[idx] = cell;
        }
    }

    /// Fill a rectangular region with the given cell, clipped to the buffer.
    pub fn fill(&mut self, rect: Rect, cell: Cell) {
        let clipped = self.bounds().intersection(&rect);
        if clipped.is_empty() {
            return;
        }

        let width = self.width as usize;
        for y in clipped.y..clipped.bottom() {
            let start = y as usize * width + clipped.x as usize;
            let end = y as usize * width + clipped.right() as usize;
            self.cells[start..end].fill(cell.clone());
        }
    }

    /// Reset every cell to blank.
    pub fn clear(&mut self) {
        self.cells.fill(Cell::BLANK);
    }

    /// Reset every cell to the given cell.
    pub fn clear_with(&mut self, cell: Cell) {
        self.cells.fill(cell);
    }

    /// Get raw access to the cell slice.
    #[inline]
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Get the cells for a single row as a slice.
    ///
    /// # Panics
    ///
    /// Panics if `y >= height`.
    #[inline]
    pub fn row_cells(&self, y: u16) -> &[Cell] {
        assert!(y < self.height, "row {y} out of range (height {})", self.height);
        let start = y as usize * self.width as usize;
        &self.cells[start..start + self.width as usize]
    }

    /// Iterate rows top to bottom.
    pub fn rows(&self) -> impl ExactSizeIterator<Item = &[Cell]> + '_ {
        self.cells.chunks_exact(self.width as usize)
    }

    /// A new buffer of the given size holding this buffer's overlapping
    /// top-left region; the rest is blank.
    ///
    /// # Panics
    ///
    /// Panics if width or height is 0.
    #[must_use]
    pub fn resized(&self, width: u16, height: u16) -> Self {
        let mut out = Self::new(width, height);
        let copy_w = self.width.min(width) as usize;
        for y in 0..self.height.min(height) {
            let src = &self.row_cells(y)[..copy_w];
            let dst_start = y as usize * width as usize;
            out.cells[dst_start..dst_start + copy_w].clone_from_slice(src);
        }
        out
    }

    /// Check if two buffers have identical dimensions and content.
    pub fn content_eq(&self, other: &Buffer) -> bool {
        self.width == other.width && self.height == other.height && self.cells == other.cells
    }

    /// FNV-1a 64-bit structural hash of dimensions and cells.
    ///
    /// Equal buffers always share a fingerprint. Distinct buffers may
    /// collide, so callers confirm with [`Buffer::content_eq`].
    #[must_use]
    pub fn fingerprint(&self) -> u64 {
        let mut hash = FNV64_OFFSET_BASIS;
        hash = fnv1a64_extend(hash, &self.width.to_le_bytes());
        hash = fnv1a64_extend(hash, &self.height.to_le_bytes());
        for cell in &self.cells {
            hash = hash_cell(hash, cell);
        }
        hash
    }
}

impl Default for Buffer {
    /// Create a 1x1 buffer (minimum size).
    fn default() -> Self {
        Self::new(1, 1)
    }
}

impl PartialEq for Buffer {
    fn eq(&self, other: &Self) -> bool {
        self.content_eq(other)
    }
}

impl Eq for Buffer {}

#[inline]
fn fnv1a64_extend(mut hash: u64, bytes: &[u8]) -> u64 {
    for &byte in bytes {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(FNV64_PRIME);
    }
    hash
}

fn hash_cell(hash: u64, cell: &Cell) -> u64 {
    let hash = match &cell.content {
        CellContent::Char(c) => fnv1a64_extend(hash, &u32::from(*c).to_le_bytes()),
        CellContent::Cluster(s) => {
            // Length prefix keeps adjacent clusters from aliasing.
            let hash = fnv1a64_extend(hash, &[0xFF]);
            let hash = fnv1a64_extend(hash, &(s.len() as u32).to_le_bytes());
            fnv1a64_extend(hash, s.as_bytes())
        }
    };
    hash_style(hash, &cell.style)
}

fn hash_style(hash: u64, style: &Style) -> u64 {
    let hash = fnv1a64_extend(hash, &[style.flags.bits()]);
    let hash = hash_color(hash, style.fg);
    hash_color(hash, style.bg)
}

fn hash_color(hash: u64, color: Option<Color>) -> u64 {
    match color {
        None => fnv1a64_extend(hash, &[0]),
        Some(Color::Named(named)) => fnv1a64_extend(hash, &[1, named as u8]),
        Some(Color::Rgb(r, g, b)) => fnv1a64_extend(hash, &[2, r, g, b]),
    }
}
