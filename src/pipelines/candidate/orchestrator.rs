//! Per-candidate orchestration for one read end.
//!
//! Every candidate goes through the cheapest aligner that can settle it:
//!
//! 1. fetch the padded reference window, dropping candidates whose window is
//!    shorter than the read;
//! 2. exact match (best-only mode stops here when anything matched);
//! 3. ungapped match for the candidates still unresolved (mismatches-only
//!    mode stops here);
//! 4. bounded gapped DP, with the band derived from the best score so far
//!    (best-only) or from the candidate's own score (all alignments).
//!
//! Unresolved candidates are dropped, then best-score reduction and duplicate
//! removal are applied as configured.

use super::align_opt::{AlignmentMode, CandidateParams};
use super::reduction::{keep_best_score, remove_duplicates};
use crate::core::alignment::bounded::{Band, align_gapped_constrained, align_gapped_with_band};
use crate::core::alignment::exact::align_exact;
use crate::core::alignment::scoring::{PairScorer, ScoringModel};
use crate::core::alignment::types::{AlignedEnd, AlignedEntry, AlignedRead, ReferenceWindow, Space};
use crate::core::alignment::ungapped::align_ungapped;
use crate::core::alignment::workspace::AlignmentWorkspace;
use crate::core::compute::encoding::{from_secondary_space, normalize_base};
use crate::core::io::candidates::{CandidateEnd, CandidateRead};
use crate::core::io::reference::ReferenceSource;
use crate::error::{AlignError, Result};

/// Which aligner settled how many candidates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlignStats {
    pub short_windows: usize, // Window shorter than the read
    pub exact: usize,
    pub ungapped: usize,
    pub gapped: usize,     // DP runs
    pub pruned: usize,     // DP skipped because the band was empty
    pub unresolved: usize, // Dropped after every stage
}

impl AlignStats {
    pub fn merge(&mut self, other: &AlignStats) {
        self.short_windows += other.short_windows;
        self.exact += other.exact;
        self.ungapped += other.ungapped;
        self.gapped += other.gapped;
        self.pruned += other.pruned;
        self.unresolved += other.unresolved;
    }
}

/// Read of an end in the form the aligners consume.
struct PreparedEnd {
    read: Vec<u8>,
    mask: Option<Vec<u8>>,
}

fn prepare_end(end: &CandidateEnd, space: Space) -> Result<PreparedEnd> {
    match space {
        Space::Nucleotide => Ok(PreparedEnd {
            read: end.read.iter().map(|&b| normalize_base(b)).collect(),
            mask: end.mask.clone(),
        }),
        Space::Color => {
            let read = from_secondary_space(&end.read)?;
            // The start symbol has no base of its own
            let mask = end
                .mask
                .as_ref()
                .map(|m| m.get(1..).map(<[u8]>::to_vec).unwrap_or_default());
            Ok(PreparedEnd { read, mask })
        }
    }
}

/// Aligns candidate records against one reference with one scoring model.
pub struct CandidateAligner<'a, R: ?Sized> {
    reference: &'a R,
    model: &'a ScoringModel,
    params: CandidateParams,
}

impl<'a, R: ReferenceSource + ?Sized> CandidateAligner<'a, R> {
    pub fn new(reference: &'a R, model: &'a ScoringModel, params: CandidateParams) -> Self {
        Self {
            reference,
            model,
            params,
        }
    }

    pub fn params(&self) -> CandidateParams {
        self.params
    }

    /// Align every end of `read`.
    pub fn align_read(
        &self,
        read: &CandidateRead,
        ws: &mut AlignmentWorkspace,
        stats: &mut AlignStats,
    ) -> Result<AlignedRead> {
        let ends = read
            .ends
            .iter()
            .map(|end| self.align_end(end, ws, stats))
            .collect::<Result<Vec<_>>>()?;
        Ok(AlignedRead {
            name: read.name.clone(),
            ends,
        })
    }

    /// Align one read end against all of its candidates.
    pub fn align_end(
        &self,
        end: &CandidateEnd,
        ws: &mut AlignmentWorkspace,
        stats: &mut AlignStats,
    ) -> Result<AlignedEnd> {
        let params = self.params;
        let prepared = prepare_end(end, params.space)?;
        let read = prepared.read.as_slice();
        let mask = prepared.mask.as_deref();
        let n = read.len();

        let mut windows: Vec<ReferenceWindow> = Vec::with_capacity(end.candidates.len());
        let mut entries: Vec<AlignedEntry> = Vec::with_capacity(end.candidates.len());
        for c in &end.candidates {
            let window = self
                .reference
                .fetch(c.contig, c.position, c.strand, params.offset_length, n)?;
            if n == 0 || window.len() < n {
                log::debug!(
                    "Dropping candidate {}:{}{}: {} bp window for a {} bp read",
                    c.contig,
                    c.position,
                    c.strand,
                    window.len(),
                    n
                );
                stats.short_windows += 1;
                continue;
            }
            windows.push(window);
            entries.push(AlignedEntry::candidate(c.contig, c.position, c.strand));
        }

        let mut best = f64::NEG_INFINITY;

        // Exact matches
        let mut found_exact = false;
        for (window, entry) in windows.iter().zip(entries.iter_mut()) {
            let scorer = PairScorer::new(self.model, params.space, read, &window.seq);
            if let Some(hit) = align_exact(&scorer, window) {
                best = best.max(hit.score);
                *entry = hit;
                found_exact = true;
                stats.exact += 1;
            }
        }
        if found_exact && params.best_only() {
            return self.finish(end, entries, best, stats);
        }

        // Mismatches only
        for (window, entry) in windows.iter().zip(entries.iter_mut()) {
            if entry.is_resolved() {
                continue;
            }
            let scorer = PairScorer::new(self.model, params.space, read, &window.seq);
            if let Some(hit) = align_ungapped(&scorer, window, mask, 0) {
                best = best.max(hit.score);
                *entry = hit;
                stats.ungapped += 1;
            }
        }
        if params.alignment_mode == AlignmentMode::MismatchesOnly {
            return self.finish(end, entries, best, stats);
        }

        // Bounded gapped alignment
        let anchored = mask.filter(|m| m.contains(&b'1'));
        for (window, entry) in windows.iter().zip(entries.iter_mut()) {
            let bound = if params.best_only() { best } else { entry.score };
            let band = Band::derive(bound, n, self.model, params.space)?;
            if band.is_empty() {
                stats.pruned += 1;
                continue;
            }

            let scorer = PairScorer::new(self.model, params.space, read, &window.seq);
            let gapped = match anchored {
                Some(mask) => {
                    // Every placement broke an anchor
                    if !entry.is_resolved() {
                        continue;
                    }
                    let offset = window
                        .column_of(entry.position, entry.reference_length)
                        .ok_or_else(|| {
                            AlignError::InvalidReference(format!(
                                "entry at {} ({} bp) lies outside its {} bp window",
                                entry.position,
                                entry.reference_length,
                                window.len()
                            ))
                        })?;
                    let matrix = ws.matrix_for(n, window.len());
                    align_gapped_constrained(&scorer, window, mask, offset, matrix)?
                }
                None => {
                    let matrix = ws.matrix_for(n, window.len());
                    align_gapped_with_band(&scorer, window, band, matrix)?
                }
            };
            stats.gapped += 1;
            if gapped.score >= entry.score {
                *entry = gapped;
            }
            best = best.max(entry.score);
        }

        self.finish(end, entries, best, stats)
    }

    fn finish(
        &self,
        end: &CandidateEnd,
        mut entries: Vec<AlignedEntry>,
        best: f64,
        stats: &mut AlignStats,
    ) -> Result<AlignedEnd> {
        let before = entries.len();
        entries.retain(AlignedEntry::is_resolved);
        stats.unresolved += before - entries.len();

        if self.params.best_only() {
            keep_best_score(&mut entries, best)?;
        }
        if self.params.remove_duplicates {
            let removed = remove_duplicates(&mut entries);
            if removed > 0 {
                log::trace!("Removed {removed} duplicate entries");
            }
        }
        Ok(AlignedEnd {
            read: end.read.clone(),
            entries,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::alignment::types::Strand;
    use crate::core::compute::encoding::to_secondary_space;
    use crate::core::io::candidates::Candidate;
    use crate::core::io::reference::ReferenceGenome;
    use crate::defaults::GAP;
    use crate::pipelines::candidate::align_opt::{AlignOpt, ResultMode};

    fn model() -> ScoringModel {
        ScoringModel::new(1.0, -1.0, 0.0, -1.0, -5.0, -1.0).unwrap()
    }

    fn params(padding: usize) -> CandidateParams {
        AlignOpt {
            offset_length: padding,
            ..AlignOpt::default()
        }
        .candidate_params()
    }

    fn end(read: &[u8], mask: Option<&[u8]>, positions: &[u64]) -> CandidateEnd {
        CandidateEnd {
            read: read.to_vec(),
            qual: None,
            mask: mask.map(<[u8]>::to_vec),
            candidates: positions
                .iter()
                .map(|&position| Candidate {
                    contig: 0,
                    position,
                    strand: Strand::Forward,
                })
                .collect(),
        }
    }

    fn run(genome: &ReferenceGenome, params: CandidateParams, end: &CandidateEnd) -> (AlignedEnd, AlignStats) {
        let model = model();
        let aligner = CandidateAligner::new(genome, &model, params);
        let mut ws = AlignmentWorkspace::new();
        let mut stats = AlignStats::default();
        let aligned = aligner.align_end(end, &mut ws, &mut stats).unwrap();
        (aligned, stats)
    }

    fn scores(end: &AlignedEnd) -> Vec<f64> {
        end.entries.iter().map(|e| e.score).collect()
    }

    #[test]
    fn test_exact_candidate() {
        let g = ReferenceGenome::from_contigs(vec![("chr1", b"TTACGTTT".to_vec())]).unwrap();
        let (aligned, stats) = run(&g, params(2), &end(b"ACGT", None, &[3]));
        assert_eq!(aligned.entries.len(), 1);
        let e = &aligned.entries[0];
        assert_eq!(e.position, 3);
        assert_eq!(e.score, 4.0);
        assert_eq!(e.read, b"ACGT".to_vec());
        assert_eq!(e.reference, b"ACGT".to_vec());
        assert_eq!(stats.exact, 1);
        assert_eq!(stats.gapped, 0);
    }

    #[test]
    fn test_gapped_alignment_improves_ungapped() {
        let g = ReferenceGenome::from_contigs(vec![(
            "chr1",
            b"GGACGTACGTACTGTACGTACGTGG".to_vec(),
        )])
        .unwrap();
        let read = b"ACGTACGTACGTACGTACGT";
        let (aligned, stats) = run(&g, params(2), &end(read, None, &[3]));
        let e = &aligned.entries[0];
        assert_eq!(e.score, 15.0);
        assert_eq!(e.position, 3);
        assert_eq!(e.reference_length, 21);
        assert_eq!(e.read.iter().filter(|&&b| b == GAP).count(), 1);
        assert_eq!((stats.ungapped, stats.gapped), (1, 1));

        let mismatches_only = CandidateParams {
            alignment_mode: AlignmentMode::MismatchesOnly,
            ..params(2)
        };
        let (ungapped, stats) = run(&g, mismatches_only, &end(read, None, &[3]));
        assert_eq!(scores(&ungapped), vec![0.0]);
        assert_eq!(ungapped.entries[0].length, read.len());
        assert_eq!(stats.gapped, 0);
    }

    #[test]
    fn test_best_only_stops_after_exact_match() {
        let g = ReferenceGenome::from_contigs(vec![("chr1", b"TTACGTTTGGACCTGG".to_vec())]).unwrap();
        let candidates = end(b"ACGT", None, &[3, 11]);

        let (all, _) = run(&g, params(2), &candidates);
        assert_eq!(scores(&all), vec![4.0, 2.0]);
        assert_eq!(all.entries[1].position, 11);

        let best_only = CandidateParams {
            result_mode: ResultMode::BestOnly,
            ..params(2)
        };
        let (best, stats) = run(&g, best_only, &candidates);
        assert_eq!(scores(&best), vec![4.0]);
        assert_eq!(stats.ungapped, 0, "exact hit ends the search");
    }

    #[test]
    fn test_best_only_keeps_the_maximum_of_all_alignments() {
        let g = ReferenceGenome::from_contigs(vec![(
            "chr1",
            b"AACCGGTTACGAACGTTACCGTACCCAGTAACGTAAGGT".to_vec(),
        )])
        .unwrap();
        let candidates = end(b"ACGTTACG", None, &[9, 13, 21, 30]);
        let (all, _) = run(&g, params(3), &candidates);
        let best_only = CandidateParams {
            result_mode: ResultMode::BestOnly,
            ..params(3)
        };
        let (best, _) = run(&g, best_only, &candidates);

        let max = scores(&all).into_iter().fold(f64::NEG_INFINITY, f64::max);
        assert!(!best.entries.is_empty());
        for e in &best.entries {
            assert_eq!(e.score, max);
        }
    }

    #[test]
    fn test_short_window_is_dropped() {
        let g = ReferenceGenome::from_contigs(vec![("chr1", b"ACGTAC".to_vec())]).unwrap();
        let (aligned, stats) = run(&g, params(2), &end(b"ACGTACGT", None, &[1]));
        assert!(aligned.entries.is_empty());
        assert_eq!(stats.short_windows, 1);
    }

    #[test]
    fn test_anchored_end_extends_flanks_only() {
        let g = ReferenceGenome::from_contigs(vec![(
            "chr1",
            b"GGACGTACGTACGTTTGCAGTGCAGG".to_vec(),
        )])
        .unwrap();
        let read = b"ACGTACGTACGTTTGCATGCA";
        let mask = b"111111111100000000000";
        let (aligned, stats) = run(&g, params(2), &end(read, Some(mask), &[3]));
        let e = &aligned.entries[0];
        assert_eq!(e.score, 16.0);
        assert_eq!(e.position, 3);
        assert_eq!(e.reference_length, 22);
        assert_eq!(&e.read[..10], &read[..10]);
        assert_eq!(stats.gapped, 1);
    }

    #[test]
    fn test_mask_can_leave_candidate_unresolved() {
        let g = ReferenceGenome::from_contigs(vec![("chr1", b"TTACCTTT".to_vec())]).unwrap();
        let (aligned, stats) = run(&g, params(2), &end(b"ACGT", Some(b"0110"), &[3]));
        assert!(aligned.entries.is_empty());
        assert_eq!(stats.unresolved, 1);
    }

    #[test]
    fn test_color_space_read_is_decoded() {
        let g = ReferenceGenome::from_contigs(vec![("chr1", b"GGACGTACGTGG".to_vec())]).unwrap();
        let encoded = to_secondary_space(b"ACGTACGT", b'A').unwrap();
        let color = CandidateParams {
            space: Space::Color,
            ..params(2)
        };
        let (aligned, _) = run(&g, color, &end(&encoded, None, &[3]));
        let e = &aligned.entries[0];
        assert_eq!(e.read, b"ACGTACGT".to_vec());
        assert_eq!(e.score, 8.0);
        assert_eq!(e.color_error, vec![GAP; 8]);
        assert_eq!(aligned.read, encoded);
    }

    #[test]
    fn test_color_space_mask_skips_start_symbol() {
        let g = ReferenceGenome::from_contigs(vec![(
            "chr1",
            b"GGACGTACGTACGTTTGCAGTGCAGG".to_vec(),
        )])
        .unwrap();
        let read = b"ACGTACGTACGTTTGCATGCA";
        let encoded = to_secondary_space(read, b'A').unwrap();
        // One mask element per encoded symbol; bases 6..10 anchored
        let mask = b"0000001111100000000000";
        assert_eq!(mask.len(), encoded.len());
        let color = CandidateParams {
            space: Space::Color,
            ..params(2)
        };
        let (aligned, stats) = run(&g, color, &end(&encoded, Some(mask), &[3]));
        assert_eq!(aligned.read, encoded);
        assert_eq!(aligned.entries.len(), 1);
        let e = &aligned.entries[0];
        assert_eq!(e.score, 14.0);
        assert_eq!(e.position, 3);
        assert_eq!(e.reference_length, 22);
        assert_eq!(e.read, b"ACGTACGTACGTTTGCA-TGCA".to_vec());
        assert_eq!(e.reference, b"ACGTACGTACGTTTGCAGTGCA".to_vec());
        assert_eq!(e.color_error.len(), e.length);
        assert_eq!(e.color_error, b"0-----------------3---".to_vec());
        assert_eq!(stats.gapped, 1);
    }
}
