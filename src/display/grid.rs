//! Dirty-cell character grid.

/// One character position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub ch: char,
    pub prev: char,
    pub dirty: bool,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            ch: ' ',
            prev: ' ',
            dirty: false,
        }
    }
}

impl Cell {
    fn set(&mut self, ch: char) {
        self.prev = self.ch;
        self.ch = ch;
        self.dirty = self.ch != self.prev;
    }
}

/// A fixed `rows x cols` grid of cells
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    rows: usize,
    cols: usize,
    cells: Vec<Vec<Cell>>,
    /// Next load marks every cell dirty
    stale: bool,
}

impl Grid {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            cells: vec![vec![Cell::default(); cols]; rows],
            stale: false,
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&Cell> {
        self.cells.get(row).and_then(|r| r.get(col))
    }

    /// Lay `text` out one line per row and return how many cells changed
    ///
    /// Long lines are truncated, extra lines dropped, and every position
    /// the text does not reach is blanked.
    pub fn load(&mut self, text: &str) -> usize {
        let mut lines = text.split('\n');
        let mut changed = 0;

        for row in self.cells.iter_mut() {
            let mut chars = lines.next().unwrap_or("").chars();
            for cell in row.iter_mut() {
                cell.set(chars.next().unwrap_or(' '));
                cell.dirty |= self.stale;
                if cell.dirty {
                    changed += 1;
                }
            }
        }
        self.stale = false;
        changed
    }

    /// Forget what the screen shows; the next load redraws every cell
    pub fn invalidate(&mut self) {
        self.stale = true;
    }

    /// Positions of the cells that changed on the last load
    pub fn dirty_cells(&self) -> impl Iterator<Item = (usize, usize, &Cell)> + '_ {
        self.cells.iter().enumerate().flat_map(|(r, row)| {
            row.iter()
                .enumerate()
                .filter(|(_, cell)| cell.dirty)
                .map(move |(c, cell)| (r, c, cell))
        })
    }

    /// The grid contents as text, trailing blanks trimmed per row
    pub fn text(&self) -> String {
        self.cells
            .iter()
            .map(|row| row.iter().map(|c| c.ch).collect::<String>().trim_end().to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_load_marks_text_dirty() {
        let mut grid = Grid::new(3, 4);
        assert_eq!(grid.load("ab\ncd"), 4);
        assert!(grid.cell(0, 0).unwrap().dirty);
        assert!(!grid.cell(0, 2).unwrap().dirty);
    }

    #[test]
    fn test_reload_same_text_is_clean() {
        let mut grid = Grid::new(2, 5);
        grid.load("hello\nworld");
        assert_eq!(grid.load("hello\nworld"), 0);
        assert_eq!(grid.dirty_cells().count(), 0);
    }

    #[test]
    fn test_only_changed_cells_are_dirty() {
        let mut grid = Grid::new(1, 5);
        grid.load("12345");
        assert_eq!(grid.load("12045"), 1);

        let dirty: Vec<_> = grid.dirty_cells().map(|(r, c, cell)| (r, c, cell.prev, cell.ch)).collect();
        assert_eq!(dirty, vec![(0, 2, '3', '0')]);
    }

    #[test]
    fn test_missing_rows_are_blanked() {
        let mut grid = Grid::new(3, 3);
        grid.load("aaa\nbbb\nccc");
        assert_eq!(grid.load("aaa"), 6);
        assert_eq!(grid.text(), "aaa\n\n");
    }

    #[test]
    fn test_overflow_is_truncated() {
        let mut grid = Grid::new(2, 3);
        grid.load("abcdef\n123\nzzz");
        assert_eq!(grid.text(), "abc\n123");
    }

    #[test]
    fn test_invalidate_marks_every_cell_dirty_once() {
        let mut grid = Grid::new(1, 3);
        grid.load("ab");
        grid.invalidate();

        assert_eq!(grid.load("ab"), 3);
        assert_eq!(grid.dirty_cells().count(), 3);
        assert_eq!(grid.load("ab"), 0);
    }
}
