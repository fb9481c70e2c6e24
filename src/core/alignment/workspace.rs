//! Thread-local workspace for reusable allocations
//!
//! Each worker thread owns one alignment matrix that is reshaped for every
//! candidate and only reallocated when a larger read/reference pair shows up.
//! The matrix is never shared across threads.

use crate::core::alignment::matrix::AlignMatrix;
use std::cell::RefCell;

/// Expected read length for pre-allocation
const MAX_READ_LEN: usize = 128;

/// Expected reference window length (read plus padding on both sides)
const MAX_WINDOW_LEN: usize = MAX_READ_LEN + 2 * crate::defaults::OFFSET_LENGTH;

// Thread-local workspace for alignment buffers
thread_local! {
    static WORKSPACE: RefCell<AlignmentWorkspace> = RefCell::new(AlignmentWorkspace::new());
}

/// Reusable buffers for the per-candidate aligners
pub struct AlignmentWorkspace {
    /// DP matrix for the gapped aligner
    pub matrix: AlignMatrix,
    /// Number of times `matrix` had to grow past its pre-allocation
    pub matrix_growths: usize,
}

impl Default for AlignmentWorkspace {
    fn default() -> Self {
        Self::new()
    }
}

impl AlignmentWorkspace {
    pub fn new() -> Self {
        Self {
            matrix: AlignMatrix::with_capacity(MAX_READ_LEN + 1, MAX_WINDOW_LEN + 1),
            matrix_growths: 0,
        }
    }

    /// Shape the matrix for a `read_len x ref_len` alignment (plus the
    /// boundary row and column) and hand it out.
    pub fn matrix_for(&mut self, read_len: usize, ref_len: usize) -> &mut AlignMatrix {
        if (read_len + 1) * (ref_len + 1) > self.matrix.capacity() {
            self.matrix_growths += 1;
        }
        self.matrix.ensure(read_len + 1, ref_len + 1);
        &mut self.matrix
    }
}

/// Run `f` with this thread's workspace.
pub fn with_workspace<F, R>(f: F) -> R
where
    F: FnOnce(&mut AlignmentWorkspace) -> R,
{
    WORKSPACE.with(|ws| f(&mut ws.borrow_mut()))
}
