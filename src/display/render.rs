//! # Dirty-cell Renderer
//!
//! Holds the display handle and the last rendered text. Rendering the
//! same text twice does nothing; otherwise each changed cell is erased
//! with a background rectangle and its new character drawn on top.

use tracing::trace;

use super::grid::Grid;
use super::{Display, Rgb};
use crate::error::Result;

/// Pixel width of one character cell
pub const CELL_WIDTH: u16 = 10;

/// Pixel height of one character cell
pub const CELL_HEIGHT: u16 = 15;

/// Top-left pixel of cell (0, 0)
pub const ORIGIN: (u16, u16) = (3, 3);

pub struct Renderer<D> {
    display: D,
    grid: Grid,
    foreground: Rgb,
    background: Rgb,
    last_text: Option<String>,
}

impl<D> std::fmt::Debug for Renderer<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renderer")
            .field("rows", &self.grid.rows())
            .field("cols", &self.grid.cols())
            .field("last_text", &self.last_text)
            .finish_non_exhaustive()
    }
}

impl<D: Display> Renderer<D> {
    pub fn new(display: D, rows: usize, cols: usize) -> Self {
        Self {
            display,
            grid: Grid::new(rows, cols),
            foreground: Rgb::BLUE,
            background: Rgb::BLACK,
            last_text: None,
        }
    }

    pub fn with_colors(mut self, foreground: Rgb, background: Rgb) -> Self {
        self.foreground = foreground;
        self.background = background;
        self
    }

    /// Blank the physical screen to match the empty grid
    pub fn clear(&mut self) -> Result<()> {
        self.display.clear(self.background)
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn display_mut(&mut self) -> &mut D {
        &mut self.display
    }

    /// Draw `text`, touching only changed cells; returns the cells redrawn
    ///
    /// A display error leaves the screen in an unknown state, so the next
    /// call redraws every cell even if the text is unchanged.
    pub fn render(&mut self, text: &str) -> Result<usize> {
        if self.last_text.as_deref() == Some(text) {
            return Ok(0);
        }

        self.grid.load(text);

        match self.draw_dirty() {
            Ok(redrawn) => {
                trace!(redrawn, "Screen rendered");
                self.last_text = Some(text.to_string());
                Ok(redrawn)
            }
            Err(e) => {
                self.grid.invalidate();
                self.last_text = None;
                Err(e)
            }
        }
    }

    fn draw_dirty(&mut self) -> Result<usize> {
        let mut redrawn = 0;
        for (row, col, cell) in self.grid.dirty_cells() {
            let x = ORIGIN.0 + CELL_WIDTH * col as u16;
            let y = ORIGIN.1 + CELL_HEIGHT * row as u16;

            self.display.fill_rect(x, y, CELL_WIDTH, CELL_HEIGHT, self.background)?;
            if cell.ch != ' ' {
                let mut buf = [0u8; 4];
                self.display.draw_text(x, y, cell.ch.encode_utf8(&mut buf), self.foreground)?;
            }
            redrawn += 1;
        }
        Ok(redrawn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::MockDisplay;
    use mockall::predicate::*;
    use mockall::Sequence;

    #[test]
    fn test_first_render_draws_every_glyph() {
        let mut display = MockDisplay::new();
        display.expect_fill_rect().times(3).returning(|_, _, _, _, _| Ok(()));
        display.expect_draw_text().times(3).returning(|_, _, _, _| Ok(()));

        let mut renderer = Renderer::new(display, 2, 4);
        assert_eq!(renderer.render("ab\nc").unwrap(), 3);
    }

    #[test]
    fn test_same_text_is_not_redrawn() {
        let mut display = MockDisplay::new();
        display.expect_fill_rect().times(2).returning(|_, _, _, _, _| Ok(()));
        display.expect_draw_text().times(2).returning(|_, _, _, _| Ok(()));

        let mut renderer = Renderer::new(display, 1, 4);
        renderer.render("hi").unwrap();
        assert_eq!(renderer.render("hi").unwrap(), 0);
    }

    #[test]
    fn test_changed_cell_is_erased_then_drawn() {
        let mut display = MockDisplay::new();
        display.expect_fill_rect().times(3).returning(|_, _, _, _, _| Ok(()));
        display.expect_draw_text().times(3).returning(|_, _, _, _| Ok(()));

        let mut renderer = Renderer::new(display, 1, 3);
        renderer.render("abc").unwrap();
        renderer.display_mut().checkpoint();

        let mut seq = Sequence::new();
        let x = ORIGIN.0 + CELL_WIDTH;
        renderer
            .display_mut()
            .expect_fill_rect()
            .with(eq(x), eq(ORIGIN.1), eq(CELL_WIDTH), eq(CELL_HEIGHT), eq(Rgb::BLACK))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _, _, _| Ok(()));
        renderer
            .display_mut()
            .expect_draw_text()
            .with(eq(x), eq(ORIGIN.1), eq("X"), eq(Rgb::BLUE))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _, _| Ok(()));

        assert_eq!(renderer.render("aXc").unwrap(), 1);
    }

    #[test]
    fn test_erased_cell_is_not_drawn() {
        let mut display = MockDisplay::new();
        display.expect_fill_rect().times(3).returning(|_, _, _, _, _| Ok(()));
        display.expect_draw_text().times(2).returning(|_, _, _, _| Ok(()));

        let mut renderer = Renderer::new(display, 1, 2);
        renderer.render("ab").unwrap();
        // Shortening the text only erases
        assert_eq!(renderer.render("a").unwrap(), 1);
    }

    #[test]
    fn test_display_error_propagates() {
        let mut display = MockDisplay::new();
        display
            .expect_fill_rect()
            .returning(|_, _, _, _, _| Err(crate::error::MountError::Hardware("spi".into())));

        let mut renderer = Renderer::new(display, 1, 2);
        assert!(renderer.render("a").is_err());
    }

    #[test]
    fn test_failed_draw_forces_full_redraw() {
        let calls = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let mut display = MockDisplay::new();
        display.expect_fill_rect().returning(|_, _, _, _, _| Ok(()));
        let counter = calls.clone();
        display.expect_draw_text().returning(move |_, _, _, _| {
            if counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst) == 1 {
                Err(crate::error::MountError::Hardware("spi".into()))
            } else {
                Ok(())
            }
        });

        let mut renderer = Renderer::new(display, 1, 3);
        assert!(renderer.render("abc").is_err());
        renderer.display_mut().checkpoint();

        renderer.display_mut().expect_fill_rect().times(3).returning(|_, _, _, _, _| Ok(()));
        renderer.display_mut().expect_draw_text().times(3).returning(|_, _, _, _| Ok(()));
        assert_eq!(renderer.render("abc").unwrap(), 3);
        assert_eq!(renderer.render("abc").unwrap(), 0);
    }
}
