//! Windowed decoding of very large text files.
//!
//! - [`text_block`] decodes one byte range and maps addresses to character indices.
//! - [`buffer_window`] keeps one block cached around a moving view and trims
//!   the view to line boundaries.
pub mod address;
pub mod buffer_window;
pub mod encoding;
pub mod errors;
pub mod line_terminator;
pub mod text_block;
