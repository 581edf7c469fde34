/// Solution grid and its column-major letter view
use crate::error::Error;

/// Largest width or height Across Lite accepts.
pub const MAX_DIMENSION: usize = 39;

/// Only `A`-`Z` cells take part in scrambling. Black squares and rebus
/// symbols stay where they are.
#[inline]
pub fn is_letter(cell: u8) -> bool {
    cell.is_ascii_uppercase()
}

/// `.` is a black square, `:` a black square in a diagramless puzzle.
#[inline]
pub fn is_black(cell: u8) -> bool {
    cell == b'.' || cell == b':'
}

/// A rectangular solution grid stored row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    width: usize,
    height: usize,
    cells: Vec<u8>,
}

impl Grid {
    pub fn new(width: usize, height: usize, cells: Vec<u8>) -> Result<Self, Error> {
        if !(1..=MAX_DIMENSION).contains(&width) || !(1..=MAX_DIMENSION).contains(&height) {
            return Err(Error::InvalidDimensions { width, height });
        }
        if cells.len() != width * height {
            return Err(Error::LengthMismatch {
                expected: width * height,
                actual: cells.len(),
            });
        }
        Ok(Self {
            width,
            height,
            cells,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn cells(&self) -> &[u8] {
        &self.cells
    }

    /// Row-major slices, top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[u8]> {
        self.cells.chunks(self.width)
    }

    /// Row-major indices of the letter cells, top to bottom within a
    /// column, columns left to right.
    fn letter_positions(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.width)
            .flat_map(move |col| (0..self.height).map(move |row| row * self.width + col))
            .filter(|&i| is_letter(self.cells[i]))
    }

    fn open(&self, row: usize, col: usize) -> bool {
        row < self.height && col < self.width && !is_black(self.cells[row * self.width + col])
    }

    /// Whether square `i` starts an across entry of two or more squares.
    pub fn needs_across(&self, i: usize) -> bool {
        let (row, col) = (i / self.width, i % self.width);
        self.open(row, col) && (col == 0 || !self.open(row, col - 1)) && self.open(row, col + 1)
    }

    /// Whether square `i` starts a down entry of two or more squares.
    pub fn needs_down(&self, i: usize) -> bool {
        let (row, col) = (i / self.width, i % self.width);
        self.open(row, col) && (row == 0 || !self.open(row - 1, col)) && self.open(row + 1, col)
    }

    /// Number of clues the numbering of this grid calls for.
    pub fn clue_count(&self) -> usize {
        (0..self.cells.len())
            .map(|i| self.needs_across(i) as usize + self.needs_down(i) as usize)
            .sum()
    }

    pub fn letter_count(&self) -> usize {
        self.cells.iter().filter(|&&c| is_letter(c)).count()
    }

    /// Copies the letters out in column-major order, skipping black squares.
    pub fn extract(&self) -> Vec<u8> {
        self.letter_positions().map(|i| self.cells[i]).collect()
    }

    /// Writes `letters` back over the letter cells in the order `extract`
    /// read them. Black squares are never touched.
    pub fn insert(&mut self, letters: &[u8]) -> Result<(), Error> {
        let count = self.letter_count();
        if letters.len() != count {
            return Err(Error::LengthMismatch {
                expected: count,
                actual: letters.len(),
            });
        }

        let positions: Vec<usize> = self.letter_positions().collect();
        for (pos, &letter) in positions.into_iter().zip(letters) {
            self.cells[pos] = letter;
        }
        Ok(())
    }
}
