//! Per-end entry reduction.
//!
//! Best-score reduction keeps only the entries tying the best score of an end;
//! duplicate removal collapses entries that landed on the same placement from
//! different candidates.

use crate::core::alignment::types::AlignedEntry;
use crate::error::{AlignError, Result};

/// Keep only the entries whose score equals `best`, in discovery order.
///
/// `best` must be the maximum over `entries`: an entry above it means the
/// best-score bookkeeping is broken and is fatal, as is a non-empty input
/// that keeps nothing. Returns the number of entries kept.
pub fn keep_best_score(entries: &mut Vec<AlignedEntry>, best: f64) -> Result<usize> {
    if entries.is_empty() {
        return Ok(0);
    }
    if let Some(above) = entries.iter().find(|e| e.score > best) {
        return Err(AlignError::ScoreAboveBest {
            score: above.score,
            best,
        });
    }
    entries.retain(|e| e.score == best);
    if entries.is_empty() {
        return Err(AlignError::EmptyReduction { best });
    }
    Ok(entries.len())
}

/// Drop entries at an already reported contig, position and strand, keeping
/// the higher-scoring one (the earlier one on ties). Survivors keep their
/// order. Returns the number of entries removed.
pub fn remove_duplicates(entries: &mut Vec<AlignedEntry>) -> usize {
    if entries.len() <= 1 {
        return 0;
    }

    // Sort indices by placement, best score first within a placement
    let mut order: Vec<usize> = (0..entries.len()).collect();
    order.sort_by(|&a, &b| {
        let (ea, eb) = (&entries[a], &entries[b]);
        ea.contig
            .cmp(&eb.contig)
            .then_with(|| ea.position.cmp(&eb.position))
            .then_with(|| ea.strand.cmp(&eb.strand))
            .then_with(|| eb.score.total_cmp(&ea.score))
            .then_with(|| a.cmp(&b))
    });

    let mut keep = vec![false; entries.len()];
    let mut previous = None;
    for &i in &order {
        let key = (entries[i].contig, entries[i].position, entries[i].strand);
        if previous != Some(key) {
            keep[i] = true;
            previous = Some(key);
        }
    }

    let before = entries.len();
    let mut idx = 0;
    entries.retain(|_| {
        let k = keep[idx];
        idx += 1;
        k
    });
    before - entries.len()
}
