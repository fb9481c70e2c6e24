// Exact-match fast path: Knuth-Morris-Pratt search for the whole read.

use crate::core::alignment::scoring::PairScorer;
use crate::core::alignment::types::{AlignedEntry, ReferenceWindow, Space};
use crate::defaults::GAP;

/// KMP failure table: `fail[i]` is the length of the longest proper prefix of
/// `pattern[..=i]` that is also a suffix of it.
fn failure_table(pattern: &[u8]) -> Vec<usize> {
    let mut fail = vec![0usize; pattern.len()];
    let mut k = 0;
    for i in 1..pattern.len() {
        while k > 0 && !pattern[i].eq_ignore_ascii_case(&pattern[k]) {
            k = fail[k - 1];
        }
        if pattern[i].eq_ignore_ascii_case(&pattern[k]) {
            k += 1;
        }
        fail[i] = k;
    }
    fail
}

/// Offset of the first case-insensitive occurrence of `pattern` in `text`.
pub fn knuth_morris_pratt(pattern: &[u8], text: &[u8]) -> Option<usize> {
    if pattern.is_empty() || pattern.len() > text.len() {
        return None;
    }
    let fail = failure_table(pattern);
    let mut k = 0;
    for (i, t) in text.iter().enumerate() {
        while k > 0 && !t.eq_ignore_ascii_case(&pattern[k]) {
            k = fail[k - 1];
        }
        if t.eq_ignore_ascii_case(&pattern[k]) {
            k += 1;
        }
        if k == pattern.len() {
            return Some(i + 1 - k);
        }
    }
    None
}

/// Align the read without gaps or mismatches.
///
/// Returns `None` when the read does not occur in the window. The first
/// occurrence wins. The score is the sum of the read's self-scores, which in
/// colour space also adds the colour match score per base; the colour error
/// track is all gaps.
pub fn align_exact(scorer: &PairScorer<'_>, window: &ReferenceWindow) -> Option<AlignedEntry> {
    let read = scorer.read();
    let offset = knuth_morris_pratt(read, &window.seq)?;
    let n = read.len();

    let score = (0..n).map(|i| scorer.self_score(i)).sum();
    let color_error = match scorer.space() {
        Space::Nucleotide => Vec::new(),
        Space::Color => vec![GAP; n],
    };

    Some(AlignedEntry {
        contig: window.contig,
        position: window.genomic_position(offset, n),
        strand: window.strand,
        score,
        length: n,
        reference_length: n,
        read: read.to_vec(),
        reference: read.to_vec(),
        color_error,
    })
}
