//! Falling-block board engine.
//!
//! [`core`] holds the value types: rectangles, the palette, palette-indexed images and
//! the pieces built from them. [`engine`] holds the board, its phase machine and the
//! placement enumerator used by agents. [`render`] is the output contract.

pub use self::{core::*, engine::*, render::*};

pub mod core;
pub mod engine;
pub mod render;
