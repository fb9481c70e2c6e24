//! Candidate pre-filters.
//!
//! Applied to every read before it is handed to a worker: drop candidates
//! outside the requested reference range, clear ends with too many
//! candidates, and decide whether the read is worth aligning at all.

use super::align_opt::RangeFilter;
use crate::core::io::candidates::{Candidate, CandidateRead};
use crate::core::io::reference::ReferenceSource;
use crate::error::{AlignError, Result};

/// Range filter with contig names resolved to reference indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedRange {
    start: (usize, u64),
    end: (usize, u64),
}

impl ResolvedRange {
    pub fn resolve<R: ReferenceSource + ?Sized>(range: &RangeFilter, reference: &R) -> Result<Self> {
        let index = |name: &str| {
            reference
                .contig_index(name)
                .ok_or_else(|| AlignError::UnknownContig(name.to_string()))
        };
        let start = (index(&range.start.contig)?, range.start.position);
        let end = (index(&range.end.contig)?, range.end.position);
        if start > end {
            return Err(AlignError::InvalidConfig(format!(
                "range start {}:{} lies after range end {}:{}",
                range.start.contig, range.start.position, range.end.contig, range.end.position
            )));
        }
        Ok(Self { start, end })
    }

    #[inline]
    pub fn contains(&self, candidate: &Candidate) -> bool {
        let key = (candidate.contig, candidate.position);
        self.start <= key && key <= self.end
    }
}

/// Counts of what [`prefilter_read`] removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrefilterStats {
    pub out_of_range: usize,
    pub cleared_ends: usize,
}

/// Filter the candidates of `read` in place.
///
/// Returns `true` when at least one end still has candidates, i.e. the read
/// should be aligned. Otherwise it belongs in the not-aligned output.
pub fn prefilter_read(
    read: &mut CandidateRead,
    range: Option<&ResolvedRange>,
    max_num_matches: usize,
    stats: &mut PrefilterStats,
) -> bool {
    for (idx, end) in read.ends.iter_mut().enumerate() {
        if let Some(range) = range {
            let before = end.candidates.len();
            end.candidates.retain(|c| range.contains(c));
            stats.out_of_range += before - end.candidates.len();
        }
        if end.candidates.len() > max_num_matches {
            log::debug!(
                "{}: end {} has {} candidates (max {}), not aligning it",
                read.name,
                idx,
                end.candidates.len(),
                max_num_matches
            );
            end.candidates.clear();
            stats.cleared_ends += 1;
        }
    }
    read.ends.iter().any(|end| !end.candidates.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::alignment::types::Strand;
    use crate::core::io::candidates::CandidateEnd;
    use crate::core::io::reference::ReferenceGenome;
    use crate::pipelines::candidate::align_opt::RangeBound;

    fn genome() -> ReferenceGenome {
        ReferenceGenome::from_contigs(vec![
            ("chr1", b"ACGT".to_vec()),
            ("chr2", b"ACGT".to_vec()),
            ("chr3", b"ACGT".to_vec()),
        ])
        .unwrap()
    }

    fn cand(contig: usize, position: u64) -> Candidate {
        Candidate {
            contig,
            position,
            strand: Strand::Forward,
        }
    }

    fn range(start: (&str, u64), end: (&str, u64)) -> RangeFilter {
        RangeFilter {
            start: RangeBound {
                contig: start.0.to_string(),
                position: start.1,
            },
            end: RangeBound {
                contig: end.0.to_string(),
                position: end.1,
            },
        }
    }

    fn read_with(ends: Vec<Vec<Candidate>>) -> CandidateRead {
        CandidateRead {
            name: "r".to_string(),
            ends: ends
                .into_iter()
                .map(|candidates| CandidateEnd {
                    read: b"ACGT".to_vec(),
                    candidates,
                    ..CandidateEnd::default()
                })
                .collect(),
        }
    }

    #[test]
    fn test_range_spans_contigs() {
        let g = genome();
        let r = ResolvedRange::resolve(&range(("chr1", 100), ("chr2", 50)), &g).unwrap();
        assert!(!r.contains(&cand(0, 99)));
        assert!(r.contains(&cand(0, 100)));
        assert!(r.contains(&cand(0, 1_000_000)));
        assert!(r.contains(&cand(1, 50)));
        assert!(!r.contains(&cand(1, 51)));
        assert!(!r.contains(&cand(2, 1)));
    }

    #[test]
    fn test_range_resolution_errors() {
        let g = genome();
        assert!(matches!(
            ResolvedRange::resolve(&range(("chrX", 1), ("chr2", 5)), &g),
            Err(AlignError::UnknownContig(_))
        ));
        assert!(matches!(
            ResolvedRange::resolve(&range(("chr3", 1), ("chr1", 5)), &g),
            Err(AlignError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_too_many_candidates_clears_end() {
        let mut read = read_with(vec![vec![cand(0, 1), cand(0, 2), cand(0, 3)], vec![cand(1, 1)]]);
        let mut stats = PrefilterStats::default();
        assert!(prefilter_read(&mut read, None, 2, &mut stats));
        assert!(read.ends[0].candidates.is_empty());
        assert_eq!(read.ends[1].candidates.len(), 1);
        assert_eq!(stats.cleared_ends, 1);
    }

    #[test]
    fn test_read_without_candidates_is_not_aligned() {
        let mut stats = PrefilterStats::default();
        let mut empty = read_with(vec![vec![], vec![]]);
        assert!(!prefilter_read(&mut empty, None, 10, &mut stats));

        let g = genome();
        let r = ResolvedRange::resolve(&range(("chr2", 1), ("chr2", 100)), &g).unwrap();
        let mut outside = read_with(vec![vec![cand(0, 5), cand(2, 5)]]);
        assert!(!prefilter_read(&mut outside, Some(&r), 10, &mut stats));
        assert_eq!(stats.out_of_range, 2);
    }
}
