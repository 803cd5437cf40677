#![forbid(unsafe_code)]

//! Render kernel: cells, buffers, line diffs, and markup rendering.
//!
//! A [`Buffer`](buffer::Buffer) is a fixed-size grid of styled
//! [`Cell`](cell::Cell)s. Apps and plugins draw into it with the
//! [`Draw`](drawing::Draw) helpers; the [`Renderer`](renderer::Renderer)
//! turns it into markup for the host, doing as little work per frame as the
//! change allows.

pub mod buffer;
pub mod cell;
pub mod diff;
pub mod drawing;
pub mod markup;
pub mod renderer;
