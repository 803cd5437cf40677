#![forbid(unsafe_code)]

//! Line-level diff between buffers.
//!
//! The renderer regenerates markup a line at a time, so the unit of change
//! here is the row rather than the cell. A row is dirty if any of its cells
//! differ.
//!
//! # Algorithm
//!
//! Row-major scan, one slice comparison per row. Cells are stored row by row,
//! so each comparison walks contiguous memory.
//!
//! # Usage
//!
//! ```
//! use gridmark_render::buffer::Buffer;
//! use gridmark_render::diff::LineDiff;
//! use gridmark_render::drawing::Draw;
//!
//! let old = Buffer::new(80, 24);
//! let mut new = old.clone();
//! new.write_at(0, 3, "changed");
//! new.write_at(0, 7, "also");
//!
//! let diff = LineDiff::compute(&old, &new);
//! assert_eq!(diff.rows(), &[3, 7]);
//! ```

use smallvec::SmallVec;

use crate::buffer::Buffer;

/// The set of rows that differ between two same-sized buffers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineDiff {
    rows: SmallVec<[u16; 16]>,
}

impl LineDiff {
    /// Compute the changed rows between two buffers.
    ///
    /// # Panics
    ///
    /// Debug-asserts that both buffers have identical dimensions.
    pub fn compute(old: &Buffer, new: &Buffer) -> Self {
        debug_assert_eq!(old.width(), new.width(), "buffer widths must match");
        debug_assert_eq!(old.height(), new.height(), "buffer heights must match");

        let rows = old
            .rows()
            .zip(new.rows())
            .enumerate()
            .filter(|(_, (a, b))| a != b)
            .map(|(y, _)| y as u16)
            .collect();
        Self { rows }
    }

    /// Changed row indices in ascending order.
    #[inline]
    pub fn rows(&self) -> &[u16] {
        &self.rows
    }

    /// Number of changed rows.
    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if no rows changed.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Whether the change is small enough to patch rather than redraw.
    ///
    /// True when at most a third of `height` rows changed.
    #[inline]
    pub fn is_partial(&self, height: u16) -> bool {
        self.rows.len() * 3 <= height as usize
    }
}
