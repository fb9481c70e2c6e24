// Mismatches-only fast path: slide the read across the window without gaps.

use crate::core::alignment::scoring::PairScorer;
use crate::core::alignment::types::{AlignedEntry, ReferenceWindow};

/// True when read position `i` is anchored by the constraint mask.
#[inline]
pub fn is_anchored(mask: Option<&[u8]>, i: usize) -> bool {
    matches!(mask.and_then(|m| m.get(i)), Some(b'1'))
}

/// Score of the read placed at window column `offset`, or `-inf` when an
/// anchored position mismatches.
fn score_at_offset(scorer: &PairScorer<'_>, mask: Option<&[u8]>, offset: usize) -> f64 {
    let read = scorer.read();
    let reference = scorer.reference();
    let mut score = 0.0;
    for i in 0..read.len() {
        if is_anchored(mask, i) && !read[i].eq_ignore_ascii_case(&reference[offset + i]) {
            return f64::NEG_INFINITY;
        }
        score += scorer.score(i, offset + i);
    }
    score
}

/// Best ungapped placement of the read.
///
/// Offsets `margin..=window_len - read_len - margin` are tried; the first
/// offset with the maximum score wins. Returns `None` when no offset is valid
/// or every offset was disqualified by the mask (adaptor contamination and
/// similar can make a read unalignable without gaps).
pub fn align_ungapped(
    scorer: &PairScorer<'_>,
    window: &ReferenceWindow,
    mask: Option<&[u8]>,
    margin: usize,
) -> Option<AlignedEntry> {
    let read = scorer.read();
    let reference = scorer.reference();
    let n = read.len();
    let last = reference.len().checked_sub(n + margin)?;
    if n == 0 || last < margin {
        log::debug!(
            "No ungapped placement: read {} bp, window {} bp, margin {}",
            n,
            reference.len(),
            margin
        );
        return None;
    }

    let mut best_score = f64::NEG_INFINITY;
    let mut best_offset = None;
    for offset in margin..=last {
        let score = score_at_offset(scorer, mask, offset);
        if best_score < score {
            best_score = score;
            best_offset = Some(offset);
        }
    }
    let offset = best_offset?;

    let color_error = (0..n)
        .filter_map(|i| scorer.color_error(i, offset + i))
        .collect();

    Some(AlignedEntry {
        contig: window.contig,
        position: window.genomic_position(offset, n),
        strand: window.strand,
        score: best_score,
        length: n,
        reference_length: n,
        read: read.to_vec(),
        reference: reference[offset..offset + n].to_vec(),
        color_error,
    })
}
