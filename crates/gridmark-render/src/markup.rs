#![forbid(unsafe_code)]

//! Markup synthesis for cells.
//!
//! Each cell becomes one `<span>`. Plain cells carry no attributes; styled
//! cells carry presentation classes and, for RGB colors only, an inline
//! `style`. The host's stylesheet decides what the classes look like.
//!
//! ```text
//! <span>H</span>
//! <span class="gm-b gm-fg-red">!</span>
//! <span style="color:#ff8000">~</span>
//! ```
//!
//! All text is escaped. Spaces become `&nbsp;` so runs of blanks keep their
//! width without relying on `white-space` CSS.

use std::fmt::Write as _;

use crate::cell::{Cell, Color, Style, StyleFlags};

/// Append `text` to `out` with markup-reserved characters escaped.
pub fn escape_into(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            ' ' => out.push_str("&nbsp;"),
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
}

/// Escape `text` into a new string.
#[must_use]
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    escape_into(&mut out, text);
    out
}

/// Append `value` to `out` for use inside a double-quoted attribute.
///
/// Unlike [`escape_into`], spaces are kept so class lists stay lists.
pub fn escape_attr_into(out: &mut String, value: &str) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
}

/// Escape an attribute value into a new string.
#[must_use]
pub fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    escape_attr_into(&mut out, value);
    out
}

/// Build the `<span>` fragment for one cell.
#[must_use]
pub fn cell_fragment(cell: &Cell, class_prefix: &str) -> String {
    let mut out = String::with_capacity(16);
    out.push_str("<span");
    if !cell.style.is_default() {
        push_style_attrs(&mut out, &cell.style, class_prefix);
    }
    out.push('>');
    cell.content.with_str(|s| escape_into(&mut out, s));
    out.push_str("</span>");
    out
}

fn push_style_attrs(out: &mut String, style: &Style, prefix: &str) {
    let mut classes = String::new();
    for (flag, suffix) in [
        (StyleFlags::BOLD, "b"),
        (StyleFlags::ITALIC, "i"),
        (StyleFlags::UNDERLINE, "u"),
        (StyleFlags::REVERSE, "r"),
    ] {
        if style.flags.contains(flag) {
            push_class(&mut classes, prefix, suffix);
        }
    }

    let mut inline = String::new();
    match style.fg {
        Some(Color::Named(named)) => push_class(&mut classes, prefix, &format!("fg-{}", named.name())),
        Some(Color::Rgb(r, g, b)) => push_decl(&mut inline, "color", r, g, b),
        None => {}
    }
    match style.bg {
        Some(Color::Named(named)) => push_class(&mut classes, prefix, &format!("bg-{}", named.name())),
        Some(Color::Rgb(r, g, b)) => push_decl(&mut inline, "background-color", r, g, b),
        None => {}
    }

    if !classes.is_empty() {
        out.push_str(" class=\"");
        out.push_str(&classes);
        out.push('"');
    }
    if !inline.is_empty() {
        out.push_str(" style=\"");
        out.push_str(&inline);
        out.push('"');
    }
}

fn push_class(classes: &mut String, prefix: &str, suffix: &str) {
    if !classes.is_empty() {
        classes.push(' ');
    }
    escape_attr_into(classes, prefix);
    classes.push('-');
    classes.push_str(suffix);
}

fn push_decl(inline: &mut String, property: &str, r: u8, g: u8, b: u8) {
    if !inline.is_empty() {
        inline.push(';');
    }
    // Writing to a String cannot fail.
    let _ = write!(inline, "{property}:#{r:02x}{g:02x}{b:02x}");
}
