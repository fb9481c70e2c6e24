//! Bounded gapped alignment.
//!
//! Affine-gap dynamic programming of a whole read against a reference window
//! with a free start anywhere in row 0 and a free end anywhere in the bottom
//! row. The searched region is a band derived from a score lower bound: if a
//! candidate already has an alignment scoring `B`, any gapped alignment that
//! beats it can only use a limited number of gap moves, so cells further from
//! the diagonal never need to be computed.
//!
//! Two modes share the cell recurrence and the backtrace:
//!
//! - free mode ([`align_gapped_bounded`]): banded DP over the whole window;
//! - constrained mode ([`align_gapped_constrained`]): the span between the
//!   first and last anchored read positions is forced onto one diagonal and
//!   only the flanks are aligned with DP.
//!
//! Ties inside a cell prefer the diagonal, then the deletion, then the
//! insertion. Ties in the bottom row prefer the leftmost column. Both orders
//! decide which of several equal-scoring alignments is reported.

use crate::core::alignment::matrix::{AlignMatrix, Source, SubCell};
use crate::core::alignment::scoring::{PairScorer, ScoringModel};
use crate::core::alignment::types::{AlignedEntry, ReferenceWindow, Space};
use crate::core::alignment::ungapped::is_anchored;
use crate::defaults::GAP;
use crate::error::{AlignError, Result};

/// Gap-move budget for the banded DP.
///
/// `max_h` bounds horizontal (deletion) moves and `max_v` vertical
/// (insertion) moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Band {
    pub max_h: usize,
    pub max_v: usize,
}

impl Band {
    /// Derive the band from a score lower bound.
    ///
    /// With `M` the best per-position score, `N` the read length, `P` the gap
    /// open and `E` the gap extension penalty:
    ///
    /// ```text
    /// max_h = max(0, ceil((B - M*N - P + E) / E))
    /// max_v = max(0, ceil((B - M*N - P + E) / (E - M)))
    /// ```
    ///
    /// both clamped to `N`. An unresolved bound (`-inf`) yields the full band.
    pub fn derive(lower_bound: f64, read_len: usize, model: &ScoringModel, space: Space) -> Result<Self> {
        let p = model.gap_open();
        let e = model.gap_extension();
        if p >= e {
            return Err(AlignError::UnsupportedGapRegime {
                gap_open: p,
                gap_extension: e,
            });
        }
        let m = model.max_symbol_score(space);
        let n = read_len as f64;
        let numerator = lower_bound - m * n - p + e;

        let clamp = |x: f64| -> usize {
            if x.is_nan() || x >= n {
                read_len
            } else if x <= 0.0 {
                0
            } else {
                x as usize
            }
        };
        let max_h = if e < 0.0 {
            clamp((numerator / e).ceil())
        } else {
            read_len
        };
        let max_v = if e - m < 0.0 {
            clamp((numerator / (e - m)).ceil())
        } else {
            read_len
        };
        Ok(Self { max_h, max_v })
    }

    /// Band that never excludes a cell of a `read_len x ref_len` matrix.
    pub fn unbounded(read_len: usize, ref_len: usize) -> Self {
        let wide = read_len + ref_len + 1;
        Self {
            max_h: wide,
            max_v: wide,
        }
    }

    /// True when no gapped alignment can beat the bound.
    pub fn is_empty(&self) -> bool {
        self.max_h == 0 && self.max_v == 0
    }
}

// ============================================================================
// Matrix initialisation
// ============================================================================

/// Free-start boundary: row 0 scores 0 everywhere, column 0 is a single
/// insertion run growing down the rows.
fn initialize_at_start(m: &mut AlignMatrix, model: &ScoringModel, end_row: usize, end_col: usize) {
    let edge = SubCell::new(f64::NEG_INFINITY, Source::StartBoundary, 0);
    for j in 0..=end_col {
        let cell = m.cell_mut(0, j);
        cell.s = SubCell::boundary(0.0);
        cell.h = edge;
        cell.v = edge;
    }
    for i in 1..=end_row {
        let v = if i == 1 {
            SubCell::new(model.gap_open(), Source::InsertionStart, 1)
        } else {
            let above = m.cell(i - 1, 0).v;
            SubCell::new(
                above.score + model.gap_extension(),
                Source::InsertionExtension,
                above.length + 1,
            )
        };
        let cell = m.cell_mut(i, 0);
        cell.h = edge;
        cell.v = v;
        cell.s = v;
    }
}

/// Seam after an anchored span: the corner keeps its substitution state,
/// the rest of its row is a deletion run and the rest of its column an
/// insertion run, both opened from the corner.
fn initialize_to_extend(
    m: &mut AlignMatrix,
    model: &ScoringModel,
    start_row: usize,
    start_col: usize,
    read_len: usize,
    ref_len: usize,
) -> Result<()> {
    let edge = SubCell::new(f64::NEG_INFINITY, Source::StartBoundary, 0);
    {
        let corner = m.cell_mut(start_row, start_col);
        if corner.s.from != Source::Match {
            return Err(AlignError::BacktraceMisaligned {
                row: start_row,
                col: start_col,
                remaining: corner.s.length,
                msg: "extension seam does not follow a match",
            });
        }
        corner.h = edge;
        corner.v = edge;
    }

    for j in start_col + 1..=ref_len {
        let left = *m.cell(start_row, j - 1);
        let h = if j == start_col + 1 {
            SubCell::new(
                left.s.score + model.gap_open(),
                Source::DeletionStart,
                left.s.length + 1,
            )
        } else {
            SubCell::new(
                left.h.score + model.gap_extension(),
                Source::DeletionExtension,
                left.h.length + 1,
            )
        };
        let cell = m.cell_mut(start_row, j);
        cell.h = h;
        cell.s = h;
        cell.v = SubCell::UNREACHABLE;
    }

    for i in start_row + 1..=read_len {
        let above = *m.cell(i - 1, start_col);
        let v = if i == start_row + 1 {
            SubCell::new(
                above.s.score + model.gap_open(),
                Source::InsertionStart,
                above.s.length + 1,
            )
        } else {
            SubCell::new(
                above.v.score + model.gap_extension(),
                Source::InsertionExtension,
                above.v.length + 1,
            )
        };
        let cell = m.cell_mut(i, start_col);
        cell.v = v;
        cell.s = v;
        cell.h = SubCell::UNREACHABLE;
    }
    Ok(())
}

// ============================================================================
// Cell recurrence
// ============================================================================

#[inline]
fn fill_cell(m: &mut AlignMatrix, scorer: &PairScorer<'_>, row: usize, col: usize, band: Band) {
    let model = scorer.model();
    let read_len = scorer.read().len() as i64;
    let ref_len = scorer.reference().len() as i64;
    let (r, c) = (row as i64, col as i64);

    // Deletion: consumes reference only
    let h = if band.max_v as i64 <= r - c {
        SubCell::UNREACHABLE
    } else {
        let left = m.cell(row, col - 1);
        let extend = SubCell::new(
            left.h.score + model.gap_extension(),
            Source::DeletionExtension,
            left.h.length + 1,
        );
        let open = left.s.score + model.gap_open();
        if extend.score < open {
            SubCell::new(open, Source::DeletionStart, left.s.length + 1)
        } else {
            extend
        }
    };

    // Insertion: consumes read only
    let v = if band.max_h as i64 <= c - ref_len + read_len - r {
        SubCell::UNREACHABLE
    } else {
        let above = m.cell(row - 1, col);
        let extend = SubCell::new(
            above.v.score + model.gap_extension(),
            Source::InsertionExtension,
            above.v.length + 1,
        );
        let open = above.s.score + model.gap_open();
        if extend.score < open {
            SubCell::new(open, Source::InsertionStart, above.s.length + 1)
        } else {
            extend
        }
    };

    // Substitution, then the best of the three
    let diag = m.cell(row - 1, col - 1).s;
    let mut s = SubCell::new(
        diag.score + scorer.score(row - 1, col - 1),
        Source::Match,
        diag.length + 1,
    );
    if s.score < h.score {
        s = h;
    }
    if s.score < v.score {
        s = v;
    }

    let cell = m.cell_mut(row, col);
    cell.s = s;
    cell.h = h;
    cell.v = v;
}

// ============================================================================
// Backtrace
// ============================================================================

/// Pick the best cell of the bottom row at or right of `first_col` and walk
/// the source tags back to row 0.
fn recover_alignment(
    m: &AlignMatrix,
    scorer: &PairScorer<'_>,
    window: &ReferenceWindow,
    first_col: usize,
) -> Result<AlignedEntry> {
    let read = scorer.read();
    let reference = scorer.reference();
    let read_len = read.len();
    let ref_len = reference.len();

    let mut best_score = f64::NEG_INFINITY;
    let mut best_col = first_col;
    for col in first_col..=ref_len {
        let score = m.cell(read_len, col).s.score;
        if best_score < score {
            best_score = score;
            best_col = col;
        }
    }

    let length = m.cell(read_len, best_col).s.length;
    if length < read_len {
        return Err(AlignError::BacktraceMisaligned {
            row: read_len,
            col: best_col,
            remaining: length,
            msg: "alignment shorter than the read",
        });
    }

    let with_colors = scorer.space() == Space::Color;
    let mut read_aligned = Vec::with_capacity(length);
    let mut ref_aligned = Vec::with_capacity(length);
    let mut color_error = Vec::with_capacity(if with_colors { length } else { 0 });
    let mut reference_length = 0;

    let (mut row, mut col) = (read_len, best_col);
    let mut state = Source::Match;
    for step in 0..length {
        let misaligned = move |msg: &'static str| AlignError::BacktraceMisaligned {
            row,
            col,
            remaining: length - step,
            msg,
        };
        let cell = m.cell(row, col);
        let from = match state {
            Source::DeletionExtension => cell.h.from,
            Source::InsertionExtension => cell.v.from,
            Source::Match | Source::DeletionStart | Source::InsertionStart => cell.s.from,
            Source::StartBoundary | Source::NoSource => {
                return Err(misaligned("walked past the start boundary"));
            }
        };
        match from {
            Source::Match => {
                if row == 0 || col == 0 {
                    return Err(misaligned("diagonal move off the matrix"));
                }
                read_aligned.push(read[row - 1]);
                ref_aligned.push(reference[col - 1]);
                if with_colors {
                    color_error.push(scorer.color_error(row - 1, col - 1).unwrap_or(GAP));
                }
                reference_length += 1;
                row -= 1;
                col -= 1;
            }
            Source::DeletionStart | Source::DeletionExtension => {
                if col == 0 {
                    return Err(misaligned("deletion off the matrix"));
                }
                read_aligned.push(GAP);
                ref_aligned.push(reference[col - 1]);
                if with_colors {
                    color_error.push(GAP);
                }
                reference_length += 1;
                col -= 1;
            }
            Source::InsertionStart | Source::InsertionExtension => {
                if row == 0 {
                    return Err(misaligned("insertion off the matrix"));
                }
                read_aligned.push(read[row - 1]);
                ref_aligned.push(GAP);
                if with_colors {
                    color_error.push(GAP);
                }
                row -= 1;
            }
            Source::StartBoundary | Source::NoSource => {
                return Err(misaligned("reached a boundary before the alignment ended"));
            }
        }
        state = from;
    }

    if row != 0 {
        return Err(AlignError::BacktraceMisaligned {
            row,
            col,
            remaining: 0,
            msg: "backtrace did not end in row 0",
        });
    }

    read_aligned.reverse();
    ref_aligned.reverse();
    color_error.reverse();

    Ok(AlignedEntry {
        contig: window.contig,
        position: window.genomic_position(col, reference_length),
        strand: window.strand,
        score: best_score,
        length,
        reference_length,
        read: read_aligned,
        reference: ref_aligned,
        color_error,
    })
}

// ============================================================================
// Entry points
// ============================================================================

/// Banded DP with an explicit band.
pub fn align_gapped_with_band(
    scorer: &PairScorer<'_>,
    window: &ReferenceWindow,
    band: Band,
    m: &mut AlignMatrix,
) -> Result<AlignedEntry> {
    let read_len = scorer.read().len();
    let ref_len = scorer.reference().len();
    if read_len == 0 || read_len > ref_len {
        return Err(AlignError::InvalidReference(format!(
            "window of {ref_len} bp cannot hold a {read_len} bp read"
        )));
    }
    let max_h = band.max_h.min(read_len);
    let max_v = band.max_v.min(read_len);
    let clamped = Band { max_h, max_v };

    m.ensure(read_len + 1, ref_len + 1);
    initialize_at_start(m, scorer.model(), read_len, ref_len);

    for i in 0..read_len {
        let lo = i.saturating_sub(max_v);
        let hi = (ref_len - 1).min(ref_len - read_len + max_h + i);
        for j in lo..=hi {
            fill_cell(m, scorer, i + 1, j + 1, clamped);
        }
    }

    recover_alignment(m, scorer, window, read_len - max_v)
}

/// Free-mode gapped alignment bounded by `lower_bound`.
///
/// Returns `Ok(None)` when the derived band is empty, i.e. no gapped
/// alignment can beat the bound and the caller should keep its current
/// result.
pub fn align_gapped_bounded(
    scorer: &PairScorer<'_>,
    window: &ReferenceWindow,
    lower_bound: f64,
    m: &mut AlignMatrix,
) -> Result<Option<AlignedEntry>> {
    let read_len = scorer.read().len();
    let band = Band::derive(lower_bound, read_len, scorer.model(), scorer.space())?;
    if band.is_empty() {
        log::trace!("Band empty for bound {lower_bound}, skipping gapped alignment");
        return Ok(None);
    }
    log::trace!(
        "Gapped alignment with bound {lower_bound}: max_h {}, max_v {}",
        band.max_h,
        band.max_v
    );
    align_gapped_with_band(scorer, window, band, m).map(Some)
}

/// Unbanded free-mode alignment over the whole window.
pub fn align_gapped_full(
    scorer: &PairScorer<'_>,
    window: &ReferenceWindow,
    m: &mut AlignMatrix,
) -> Result<AlignedEntry> {
    let band = Band::unbounded(scorer.read().len(), scorer.reference().len());
    align_gapped_with_band(scorer, window, band, m)
}

/// Constrained-mode gapped alignment.
///
/// `mask` marks anchored read positions with `b'1'`; `reference_offset` is the
/// window column the read's first base sits on in the anchoring ungapped
/// alignment. Read positions from the first to the last anchor are aligned on
/// that diagonal, anchored positions must match literally. The left flank is
/// aligned with free-start DP ending at the first anchor, the right flank with
/// DP extending from the last anchor.
pub fn align_gapped_constrained(
    scorer: &PairScorer<'_>,
    window: &ReferenceWindow,
    mask: &[u8],
    reference_offset: usize,
    m: &mut AlignMatrix,
) -> Result<AlignedEntry> {
    let read = scorer.read();
    let reference = scorer.reference();
    let read_len = read.len();
    let ref_len = reference.len();

    let anchored = |i: usize| is_anchored(Some(mask), i);
    let first = (0..read_len).find(|&i| anchored(i)).ok_or(AlignError::EmptyAnchor)?;
    let last = (0..read_len).rev().find(|&i| anchored(i)).ok_or(AlignError::EmptyAnchor)?;
    if reference_offset + read_len > ref_len {
        return Err(AlignError::InvalidReference(format!(
            "anchor offset {reference_offset} places a {read_len} bp read past a {ref_len} bp window"
        )));
    }

    m.ensure(read_len + 1, ref_len + 1);
    let unbounded = Band::unbounded(read_len, ref_len);

    // Left flank: free-start DP ending on the cell before the first anchor
    let end_row = first;
    let end_col = reference_offset + first;
    initialize_at_start(m, scorer.model(), end_row, end_col);
    for i in 1..=end_row {
        for j in 1..=end_col {
            fill_cell(m, scorer, i, j, unbounded);
        }
    }

    // Anchored span: one diagonal
    for k in first..=last {
        let col = reference_offset + k;
        if anchored(k) && !read[k].eq_ignore_ascii_case(&reference[col]) {
            return Err(AlignError::AnchorMismatch {
                row: k,
                read: read[k] as char,
                reference: reference[col] as char,
            });
        }
        let prev = m.cell(k, col).s;
        let cell = m.cell_mut(k + 1, col + 1);
        cell.s = SubCell::new(prev.score + scorer.score(k, col), Source::Match, prev.length + 1);
        cell.h = SubCell::UNREACHABLE;
        cell.v = SubCell::UNREACHABLE;
    }

    // Right flank: DP extending from the last anchor
    let start_row = last + 1;
    let start_col = reference_offset + last + 1;
    initialize_to_extend(m, scorer.model(), start_row, start_col, read_len, ref_len)?;
    for i in start_row + 1..=read_len {
        for j in start_col + 1..=ref_len {
            fill_cell(m, scorer, i, j, unbounded);
        }
    }

    recover_alignment(m, scorer, window, start_col)
}
