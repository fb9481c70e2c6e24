// Alignment matrix for the gapped aligner.
//
// Each cell holds three sub-states: `s` (substitution, the best of all three),
// `h` (deletion, consumes reference only) and `v` (insertion, consumes read
// only). Every sub-state records its score, the move that produced it and
// the number of alignment columns on the path ending there.
//
// The matrix is a flat row-major buffer that only grows. One instance lives
// in each worker's workspace and is reused across candidates.

/// Move that produced a sub-state; drives the backtrace state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Source {
    /// Diagonal move from the previous row and column
    Match,
    /// Deletion opened from the substitution state of the left cell
    DeletionStart,
    /// Deletion extended from the deletion state of the left cell
    DeletionExtension,
    /// Insertion opened from the substitution state of the cell above
    InsertionStart,
    /// Insertion extended from the insertion state of the cell above
    InsertionExtension,
    /// Free start in row 0 (or the seam cell of an extension)
    StartBoundary,
    /// Unreachable
    #[default]
    NoSource,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubCell {
    pub score: f64,
    pub from: Source,
    pub length: usize,
}

impl SubCell {
    pub const UNREACHABLE: SubCell = SubCell {
        score: f64::NEG_INFINITY,
        from: Source::NoSource,
        length: 0,
    };

    pub const fn new(score: f64, from: Source, length: usize) -> Self {
        Self {
            score,
            from,
            length,
        }
    }

    /// Start-of-alignment boundary state with the given score.
    pub const fn boundary(score: f64) -> Self {
        Self::new(score, Source::StartBoundary, 0)
    }
}

impl Default for SubCell {
    fn default() -> Self {
        Self::UNREACHABLE
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Cell {
    pub s: SubCell,
    pub h: SubCell,
    pub v: SubCell,
}

#[derive(Debug, Default)]
pub struct AlignMatrix {
    cells: Vec<Cell>,
    rows: usize,
    cols: usize,
}

impl AlignMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-allocated matrix able to hold `rows x cols` without growing.
    pub fn with_capacity(rows: usize, cols: usize) -> Self {
        let mut matrix = Self::new();
        matrix.ensure(rows, cols);
        matrix
    }

    /// Shape the matrix as `rows x cols`, growing the buffer only when the
    /// current allocation is too small. Cell contents are unspecified after a
    /// reshape; the aligner initialises every cell it reads.
    pub fn ensure(&mut self, rows: usize, cols: usize) {
        let needed = rows * cols;
        if needed > self.cells.len() {
            log::trace!(
                "Growing alignment matrix from {} to {} cells ({}x{})",
                self.cells.len(),
                needed,
                rows,
                cols
            );
            self.cells.resize(needed, Cell::default());
        }
        self.rows = rows;
        self.cols = cols;
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Number of cells the buffer can hold without reallocating.
    pub fn capacity(&self) -> usize {
        self.cells.len()
    }

    pub fn as_ptr(&self) -> *const Cell {
        self.cells.as_ptr()
    }

    #[inline]
    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        debug_assert!(row < self.rows && col < self.cols);
        &self.cells[row * self.cols + col]
    }

    #[inline]
    pub fn cell_mut(&mut self, row: usize, col: usize) -> &mut Cell {
        debug_assert!(row < self.rows && col < self.cols);
        &mut self.cells[row * self.cols + col]
    }
}
