//! # Display
//!
//! The mount never rasterises anything itself. A [`Display`] takes
//! rectangles and strings; the [`render`] layer keeps a dirty-cell grid so
//! only changed characters are erased and redrawn.

pub mod grid;
pub mod render;
pub mod screen;

pub use grid::{Cell, Grid};
pub use render::Renderer;
pub use screen::{status_line, Screen};

use crate::error::Result;

/// 24-bit colour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const RED: Rgb = Rgb::new(255, 0, 0);
    pub const GREEN: Rgb = Rgb::new(0, 255, 0);
    pub const BLUE: Rgb = Rgb::new(0, 0, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Drawing primitives offered by a screen driver
///
/// Coordinates are pixels from the top-left corner; text is placed with
/// its top-left corner at `(x, y)`.
#[cfg_attr(test, mockall::automock)]
pub trait Display: Send {
    /// Fill the whole screen
    fn clear(&mut self, color: Rgb) -> Result<()>;

    fn fill_rect(&mut self, x: u16, y: u16, width: u16, height: u16, color: Rgb) -> Result<()>;

    fn draw_text(&mut self, x: u16, y: u16, text: &str, color: Rgb) -> Result<()>;
}
