#![forbid(unsafe_code)]

//! Diffing renderer: buffer in, markup out.
//!
//! The renderer is stateful across calls. It remembers the previous buffer,
//! its per-line markup and the final output, so each call does the least
//! work that still produces exactly the markup a from-scratch render would.
//!
//! # Paths
//!
//! | Kind        | When                                           | Work                     |
//! |-------------|------------------------------------------------|--------------------------|
//! | `Unchanged` | buffer equals the previous one                 | none; previous `Arc` reused |
//! | `Cached`    | buffer equals a recent frame (fingerprint hit) | none; cached markup reused |
//! | `Partial`   | at most a third of the rows changed            | changed rows only        |
//! | `Full`      | first frame, resize, or larger change          | every row                |
//!
//! Every path yields byte-identical markup for the same buffer.
//!
//! # Caches
//!
//! - **Fragments**: `Cell -> <span>` markup. A cell is its own key, so equal
//!   cells share one fragment. Seeded with printable ASCII and the border
//!   glyph sets under the default style; grows with the observed cell set.
//! - **Frames**: a short FIFO of recent whole frames keyed by
//!   [`Buffer::fingerprint`], confirmed by structural equality on a hit.
//!
//! # Usage
//!
//! ```
//! use gridmark_render::buffer::Buffer;
//! use gridmark_render::drawing::Draw;
//! use gridmark_render::renderer::Renderer;
//! use std::sync::Arc;
//!
//! let mut renderer = Renderer::new();
//! let mut buffer = Buffer::new(80, 24);
//! buffer.write_at(0, 0, "Hello");
//!
//! let first = renderer.render(&buffer);
//! assert!(first.contains("<span>H</span><span>e</span>"));
//!
//! let again = renderer.render(&buffer);
//! assert!(Arc::ptr_eq(&first, &again));
//! ```

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use crate::buffer::Buffer;
use crate::cell::Cell;
use crate::diff::LineDiff;
use crate::drawing::BorderStyle;
use crate::markup;

/// Renderer configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RendererConfig {
    /// Class on the outer container element.
    pub container_class: String,
    /// Class on each line element.
    pub line_class: String,
    /// Prefix for per-cell style classes (`{prefix}-b`, `{prefix}-fg-red`).
    pub class_prefix: String,
    /// Number of recent frames kept in the frame cache. Zero disables it.
    pub frame_cache_capacity: usize,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            container_class: "gm-screen".to_owned(),
            line_class: "gm-line".to_owned(),
            class_prefix: "gm".to_owned(),
            frame_cache_capacity: 4,
        }
    }
}

impl RendererConfig {
    /// Set the container class.
    #[must_use]
    pub fn with_container_class(mut self, class: impl Into<String>) -> Self {
        self.container_class = class.into();
        self
    }

    /// Set the line class.
    #[must_use]
    pub fn with_line_class(mut self, class: impl Into<String>) -> Self {
        self.line_class = class.into();
        self
    }

    /// Set the style class prefix.
    #[must_use]
    pub fn with_class_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.class_prefix = prefix.into();
        self
    }

    /// Set the frame cache capacity.
    #[must_use]
    pub fn with_frame_cache_capacity(mut self, capacity: usize) -> Self {
        self.frame_cache_capacity = capacity;
        self
    }
}

/// Which path produced a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameKind {
    /// Same as the previous frame.
    Unchanged,
    /// Served from the frame cache.
    Cached,
    /// Every line regenerated.
    Full,
    /// Only changed lines regenerated.
    Partial,
}

impl FrameKind {
    /// Stable lowercase name for logs.
    #[inline]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unchanged => "unchanged",
            Self::Cached => "cached",
            Self::Full => "full",
            Self::Partial => "partial",
        }
    }
}

/// Replacement markup for one line of a partial frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinePatch {
    /// Row index.
    pub row: u16,
    /// Complete markup of the line element.
    pub markup: Arc<str>,
}

/// Output of [`Renderer::render_frame`].
#[derive(Debug, Clone)]
pub struct RenderedFrame {
    /// The path taken.
    pub kind: FrameKind,
    /// The complete markup.
    pub markup: Arc<str>,
    /// Changed lines, for `Partial` frames only.
    pub patches: Vec<LinePatch>,
}

/// Renderer counters.
///
/// All fields are `Copy`; capture with [`Renderer::stats`] as often as needed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// Frames that regenerated every line.
    pub full_renders: u64,
    /// Frames that regenerated only changed lines.
    pub partial_renders: u64,
    /// Frames identical to their predecessor.
    pub unchanged: u64,
    /// Frames served from the frame cache.
    pub frame_cache_hits: u64,
    /// Cell fragments found in the cache.
    pub fragment_hits: u64,
    /// Cell fragments synthesized on a miss.
    pub fragment_misses: u64,
    /// Lines regenerated across all frames.
    pub lines_rendered: u64,
}

#[derive(Debug, Clone)]
struct Frame {
    fingerprint: u64,
    buffer: Buffer,
    lines: Vec<Arc<str>>,
    markup: Arc<str>,
}

/// Cell fragment cache.
#[derive(Debug)]
struct FragmentCache {
    map: HashMap<Cell, Box<str>>,
    class_prefix: String,
}

impl FragmentCache {
    fn new(class_prefix: String) -> Self {
        let mut cache = Self {
            map: HashMap::new(),
            class_prefix,
        };
        cache.seed();
        cache
    }

    fn seed(&mut self) {
        let ascii = (0x20u8..=0x7E).map(char::from);
        let borders = BorderStyle::ALL.into_iter().flat_map(|s| s.chars().glyphs());
        for c in ascii.chain(borders) {
            let cell = Cell::from_char(c);
            let fragment = markup::cell_fragment(&cell, &self.class_prefix);
            self.map.insert(cell, fragment.into_boxed_str());
        }
    }

    fn reset(&mut self) {
        self.map.clear();
        self.seed();
    }

    fn push(&mut self, out: &mut String, cell: &Cell, stats: &mut RenderStats) {
        if let Some(fragment) = self.map.get(cell) {
            stats.fragment_hits += 1;
            out.push_str(fragment);
            return;
        }
        stats.fragment_misses += 1;
        let fragment = markup::cell_fragment(cell, &self.class_prefix);
        out.push_str(&fragment);
        self.map.insert(cell.clone(), fragment.into_boxed_str());
    }
}

/// `<div class="...">` with the class list attribute-escaped.
fn open_tag(class: &str) -> Box<str> {
    let mut out = String::with_capacity(class.len() + 14);
    out.push_str("<div class=\"");
    markup::escape_attr_into(&mut out, class);
    out.push_str("\">");
    out.into_boxed_str()
}

/// Diffing buffer-to-markup renderer.
#[derive(Debug)]
pub struct Renderer {
    config: RendererConfig,
    fragments: FragmentCache,
    frames: VecDeque<Frame>,
    previous: Option<Frame>,
    stats: RenderStats,
    container_open: Box<str>,
    line_open: Box<str>,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer {
    /// Create a renderer with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(RendererConfig::default())
    }

    /// Create a renderer with the given configuration.
    #[must_use]
    pub fn with_config(config: RendererConfig) -> Self {
        let fragments = FragmentCache::new(config.class_prefix.clone());
        Self {
            frames: VecDeque::with_capacity(config.frame_cache_capacity),
            container_open: open_tag(&config.container_class),
            line_open: open_tag(&config.line_class),
            config,
            fragments,
            previous: None,
            stats: RenderStats::default(),
        }
    }

    /// Render a buffer to markup.
    pub fn render(&mut self, buffer: &Buffer) -> Arc<str> {
        self.render_frame(buffer).markup
    }

    /// Render a buffer, reporting which path was taken and which lines changed.
    pub fn render_frame(&mut self, buffer: &Buffer) -> RenderedFrame {
        let _span = gridmark_core::debug_span!(
            "render_frame",
            width = buffer.width(),
            height = buffer.height()
        )
        .entered();

        let same_shape = self.previous.as_ref().is_some_and(|prev| {
            prev.buffer.width() == buffer.width() && prev.buffer.height() == buffer.height()
        });

        if same_shape {
            if let Some(prev) = self.previous.as_ref().filter(|p| p.buffer.content_eq(buffer)) {
                self.stats.unchanged += 1;
                gridmark_core::trace!("frame unchanged");
                return RenderedFrame {
                    kind: FrameKind::Unchanged,
                    markup: Arc::clone(&prev.markup),
                    patches: Vec::new(),
                };
            }
        }

        let fingerprint = buffer.fingerprint();
        if let Some(hit) = self
            .frames
            .iter()
            .find(|f| f.fingerprint == fingerprint && f.buffer.content_eq(buffer))
        {
            let frame = hit.clone();
            let markup = Arc::clone(&frame.markup);
            self.previous = Some(frame);
            self.stats.frame_cache_hits += 1;
            gridmark_core::trace!(fingerprint, "frame cache hit");
            return RenderedFrame {
                kind: FrameKind::Cached,
                markup,
                patches: Vec::new(),
            };
        }

        let diff = match self.previous.as_ref() {
            Some(prev) if same_shape => Some(LineDiff::compute(&prev.buffer, buffer)),
            _ => None,
        };

        let (kind, lines, patches) = match (diff, self.previous.take()) {
            (Some(diff), Some(prev)) if diff.is_partial(buffer.height()) => {
                let mut lines = prev.lines;
                let mut patches = Vec::with_capacity(diff.len());
                for &row in diff.rows() {
                    let line = self.render_line(buffer, row);
                    lines[row as usize] = Arc::clone(&line);
                    patches.push(LinePatch { row, markup: line });
                }
                self.stats.partial_renders += 1;
                (FrameKind::Partial, lines, patches)
            }
            _ => {
                let lines = (0..buffer.height())
                    .map(|row| self.render_line(buffer, row))
                    .collect();
                self.stats.full_renders += 1;
                (FrameKind::Full, lines, Vec::new())
            }
        };

        let markup = self.assemble(&lines);
        gridmark_core::debug!(
            kind = kind.as_str(),
            patched = patches.len(),
            bytes = markup.len(),
            "frame rendered"
        );

        let frame = Frame {
            fingerprint,
            buffer: buffer.clone(),
            lines,
            markup: Arc::clone(&markup),
        };
        self.remember(frame);

        RenderedFrame {
            kind,
            markup,
            patches,
        }
    }

    fn render_line(&mut self, buffer: &Buffer, row: u16) -> Arc<str> {
        let cells = buffer.row_cells(row);
        let mut out = String::with_capacity(cells.len() * 14 + 32);
        out.push_str(&self.line_open);
        for cell in cells {
            self.fragments.push(&mut out, cell, &mut self.stats);
        }
        out.push_str("</div>");
        self.stats.lines_rendered += 1;
        Arc::from(out)
    }

    fn assemble(&self, lines: &[Arc<str>]) -> Arc<str> {
        let body: usize = lines.iter().map(|l| l.len()).sum();
        let mut out = String::with_capacity(body + self.container_open.len() + 6);
        out.push_str(&self.container_open);
        for line in lines {
            out.push_str(line);
        }
        out.push_str("</div>");
        Arc::from(out)
    }

    fn remember(&mut self, frame: Frame) {
        if self.config.frame_cache_capacity > 0 {
            while self.frames.len() >= self.config.frame_cache_capacity {
                self.frames.pop_front();
            }
            self.frames.push_back(frame.clone());
        }
        self.previous = Some(frame);
    }

    /// Drop all cached state. The next render is a full render.
    pub fn invalidate(&mut self) {
        self.previous = None;
        self.frames.clear();
        self.fragments.reset();
        gridmark_core::debug!("renderer invalidated");
    }

    /// Counters since construction.
    #[inline]
    pub fn stats(&self) -> RenderStats {
        self.stats
    }

    /// Number of distinct cell fragments cached.
    #[inline]
    pub fn fragment_cache_len(&self) -> usize {
        self.fragments.map.len()
    }

    /// Number of frames in the frame cache.
    #[inline]
    pub fn frame_cache_len(&self) -> usize {
        self.frames.len()
    }

    /// Get a reference to the renderer configuration.
    #[inline]
    pub fn config(&self) -> &RendererConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::{NamedColor, Style};
    use crate::drawing::Draw;
    use pretty_assertions::assert_eq;

    fn fresh_render(buffer: &Buffer) -> Arc<str> {
        Renderer::new().render(buffer)
    }

    #[test]
    fn full_render_shape() {
        let mut buf = Buffer::new(3, 2);
        buf.write_at(0, 0, "ab");
        let out = fresh_render(&buf);
        assert_eq!(
            &*out,
            "<div class=\"gm-screen\">\
             <div class=\"gm-line\"><span>a</span><span>b</span><span>&nbsp;</span></div>\
             <div class=\"gm-line\"><span>&nbsp;</span><span>&nbsp;</span><span>&nbsp;</span></div>\
             </div>"
        );
    }

    #[test]
    fn configured_classes_are_used() {
        let config = RendererConfig::default()
            .with_container_class("term")
            .with_line_class("row")
            .with_class_prefix("t");
        let mut renderer = Renderer::with_config(config);
        let mut buf = Buffer::new(1, 1);
        buf.write_styled(0, 0, "x", Style::new().bold());
        assert_eq!(
            &*renderer.render(&buf),
            "<div class=\"term\"><div class=\"row\"><span class=\"t-b\">x</span></div></div>"
        );
    }

    #[test]
    fn configured_classes_are_attribute_escaped() {
        let config = RendererConfig::default()
            .with_container_class("term \"x")
            .with_line_class("row<script>")
            .with_class_prefix("p'");
        let mut renderer = Renderer::with_config(config);
        let mut buf = Buffer::new(1, 1);
        buf.write_styled(0, 0, "y", Style::new().italic());
        assert_eq!(
            &*renderer.render(&buf),
            "<div class=\"term &quot;x\">\
             <div class=\"row&lt;script&gt;\"><span class=\"p&#39;-i\">y</span></div>\
             </div>"
        );
    }

    #[test]
    fn repeat_render_is_pointer_identical_without_lookups() {
        let mut renderer = Renderer::new();
        let buf = Buffer::new(10, 4);
        let first = renderer.render(&buf);
        let before = renderer.stats();

        let frame = renderer.render_frame(&buf);
        let after = renderer.stats();
        assert_eq!(frame.kind, FrameKind::Unchanged);
        assert!(Arc::ptr_eq(&first, &frame.markup));
        assert_eq!(after.fragment_hits, before.fragment_hits);
        assert_eq!(after.fragment_misses, before.fragment_misses);
        assert_eq!(after.unchanged, 1);
    }

    #[test]
    fn small_change_renders_partially() {
        let mut renderer = Renderer::new();
        let mut buf = Buffer::new(10, 6);
        renderer.render(&buf);

        buf.write_at(0, 2, "hi");
        let frame = renderer.render_frame(&buf);
        assert_eq!(frame.kind, FrameKind::Partial);
        assert_eq!(frame.patches.len(), 1);
        assert_eq!(frame.patches[0].row, 2);
        assert!(frame.patches[0].markup.contains("<span>h</span><span>i</span>"));
        assert_eq!(frame.markup, fresh_render(&buf));
    }

    #[test]
    fn large_change_renders_fully() {
        let mut renderer = Renderer::new();
        let mut buf = Buffer::new(10, 6);
        renderer.render(&buf);

        for y in 0..3 {
            buf.write_at(0, y, "x");
        }
        let frame = renderer.render_frame(&buf);
        assert_eq!(frame.kind, FrameKind::Full);
        assert!(frame.patches.is_empty());
        assert_eq!(frame.markup, fresh_render(&buf));
    }

    #[test]
    fn partial_threshold_is_inclusive() {
        let mut renderer = Renderer::new();
        let mut buf = Buffer::new(4, 6);
        renderer.render(&buf);
        buf.write_at(0, 0, "a");
        buf.write_at(0, 5, "b");
        assert_eq!(renderer.render_frame(&buf).kind, FrameKind::Partial);
    }

    #[test]
    fn resize_forces_full_render() {
        let mut renderer = Renderer::new();
        renderer.render(&Buffer::new(10, 6));
        let bigger = Buffer::new(12, 6);
        let frame = renderer.render_frame(&bigger);
        assert_eq!(frame.kind, FrameKind::Full);
        assert_eq!(frame.markup, fresh_render(&bigger));
    }

    #[test]
    fn returning_to_recent_frame_hits_frame_cache() {
        let mut renderer = Renderer::new();
        let a = Buffer::new(8, 3);
        let mut b = a.clone();
        b.write_at(0, 0, "toggle");

        let first_a = renderer.render(&a);
        renderer.render(&b);
        let frame = renderer.render_frame(&a);
        assert_eq!(frame.kind, FrameKind::Cached);
        assert!(Arc::ptr_eq(&first_a, &frame.markup));
        assert_eq!(renderer.stats().frame_cache_hits, 1);

        // A partial render after a cache hit still diffs against the right lines.
        let mut c = a.clone();
        c.write_at(0, 2, "z");
        let frame = renderer.render_frame(&c);
        assert_eq!(frame.kind, FrameKind::Partial);
        assert_eq!(frame.markup, fresh_render(&c));
    }

    #[test]
    fn frame_cache_is_bounded() {
        let config = RendererConfig::default().with_frame_cache_capacity(2);
        let mut renderer = Renderer::with_config(config);
        for c in ['a', 'b', 'c', 'd'] {
            let mut buf = Buffer::new(2, 1);
            buf.write_at(0, 0, &c.to_string());
            renderer.render(&buf);
        }
        assert_eq!(renderer.frame_cache_len(), 2);
    }

    #[test]
    fn disabled_frame_cache_still_renders() {
        let config = RendererConfig::default().with_frame_cache_capacity(0);
        let mut renderer = Renderer::with_config(config);
        let a = Buffer::new(4, 4);
        let mut b = a.clone();
        b.write_at(0, 0, "b");
        renderer.render(&a);
        renderer.render(&b);
        let frame = renderer.render_frame(&a);
        assert_eq!(frame.kind, FrameKind::Partial);
        assert_eq!(renderer.frame_cache_len(), 0);
    }

    #[test]
    fn seeded_fragments_hit_for_ascii_and_borders() {
        let mut renderer = Renderer::new();
        let mut buf = Buffer::new(20, 4);
        buf.draw_box(0, 0, 20, 4, BorderStyle::Double);
        buf.write_at(1, 1, "Hello, <world> & co");
        renderer.render(&buf);
        let stats = renderer.stats();
        assert_eq!(stats.fragment_misses, 0);
        assert_eq!(stats.fragment_hits, 80);
    }

    #[test]
    fn styled_cells_miss_once_then_hit() {
        let mut renderer = Renderer::new();
        let seeded = renderer.fragment_cache_len();
        let mut buf = Buffer::new(4, 1);
        buf.write_styled(0, 0, "!!!!", Style::new().fg(NamedColor::Red));
        renderer.render(&buf);
        let stats = renderer.stats();
        assert_eq!(stats.fragment_misses, 1);
        assert_eq!(stats.fragment_hits, 3);
        assert_eq!(renderer.fragment_cache_len(), seeded + 1);
    }

    #[test]
    fn invalidate_forces_full_render_and_reseeds() {
        let mut renderer = Renderer::new();
        let seeded = renderer.fragment_cache_len();
        let mut buf = Buffer::new(4, 1);
        buf.write_styled(0, 0, "€", Style::new().underline());
        let before = renderer.render(&buf);
        assert!(renderer.fragment_cache_len() > seeded);

        renderer.invalidate();
        assert_eq!(renderer.fragment_cache_len(), seeded);
        assert_eq!(renderer.frame_cache_len(), 0);

        let frame = renderer.render_frame(&buf);
        assert_eq!(frame.kind, FrameKind::Full);
        assert_eq!(frame.markup, before);
        assert!(!Arc::ptr_eq(&frame.markup, &before));
    }

    #[test]
    fn stats_count_each_path() {
        let mut renderer = Renderer::new();
        let mut buf = Buffer::new(6, 6);
        renderer.render(&buf);
        renderer.render(&buf);
        buf.write_at(0, 0, "x");
        renderer.render(&buf);
        let stats = renderer.stats();
        assert_eq!(stats.full_renders, 1);
        assert_eq!(stats.unchanged, 1);
        assert_eq!(stats.partial_renders, 1);
        assert_eq!(stats.lines_rendered, 7);
    }
}
