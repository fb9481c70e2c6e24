use clap::Args;
use std::path::PathBuf;

use crate::core::alignment::types::Space;
use crate::defaults;

// Aligner configuration
//
// `AlignOpt` carries every knob of a run; `CandidateParams` is the subset the
// per-read orchestrator needs, handed out by value so the hot loop never
// touches the full struct.

/// How far the aligner goes for each candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlignmentMode {
    /// Exact, then ungapped, then bounded gapped alignment
    #[default]
    Full,
    /// Stop after the ungapped matcher
    MismatchesOnly,
}

impl AlignmentMode {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(AlignmentMode::Full),
            1 => Some(AlignmentMode::MismatchesOnly),
            _ => None,
        }
    }
}

/// Which entries of an end are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResultMode {
    #[default]
    AllAlignments,
    /// Only entries tying the best score of the end
    BestOnly,
}

/// One end of the reference range filter (1-based position).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeBound {
    pub contig: String,
    pub position: u64,
}

/// Inclusive `[start, end]` range; candidates outside are dropped before
/// alignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeFilter {
    pub start: RangeBound,
    pub end: RangeBound,
}

#[derive(Debug, Clone)]
pub struct AlignOpt {
    // Alignment parameters
    pub alignment_mode: AlignmentMode, // Full gapped or mismatches only
    pub result_mode: ResultMode,       // All entries or best-scoring only
    pub space: Space,                  // Alphabet of the input reads
    pub offset_length: usize,          // Reference padding on each side of a candidate

    // Filtering parameters
    pub max_num_matches: usize,     // Reads with more candidates on one end are not aligned
    pub range: Option<RangeFilter>, // Keep only candidates inside this range
    pub remove_duplicates: bool,    // Collapse entries at the same contig/position/strand

    // Processing parameters
    pub n_threads: usize,  // Number of worker partitions
    pub batch_size: usize, // Reads handed to the worker pool at once
    pub timing: bool,      // Log per-stage timings
    pub verbosity: i32,    // 1=error, 2=warning, 3=message, 4=debug, 5+=trace
}

impl Default for AlignOpt {
    fn default() -> Self {
        Self {
            alignment_mode: AlignmentMode::from_code(defaults::ALIGNMENT_TYPE).unwrap_or_default(),
            result_mode: ResultMode::AllAlignments,
            space: Space::from_code(defaults::SPACE).unwrap_or_default(),
            offset_length: defaults::OFFSET_LENGTH,

            max_num_matches: defaults::MAX_NUM_MATCHES,
            range: None,
            remove_duplicates: false,

            n_threads: 1,
            batch_size: defaults::BATCH_SIZE,
            timing: false,
            verbosity: defaults::VERBOSITY,
        }
    }
}

/// Per-read parameters consumed by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CandidateParams {
    pub alignment_mode: AlignmentMode,
    pub result_mode: ResultMode,
    pub space: Space,
    pub offset_length: usize,
    pub remove_duplicates: bool,
}

impl CandidateParams {
    #[inline]
    pub fn best_only(&self) -> bool {
        self.result_mode == ResultMode::BestOnly
    }
}

impl AlignOpt {
    pub fn candidate_params(&self) -> CandidateParams {
        CandidateParams {
            alignment_mode: self.alignment_mode,
            result_mode: self.result_mode,
            space: self.space,
            offset_length: self.offset_length,
            remove_duplicates: self.remove_duplicates,
        }
    }

    /// Check the options and report every problem found.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.max_num_matches < 1 {
            errors.push(format!(
                "max_num_matches must be >= 1, got {}",
                self.max_num_matches
            ));
        }
        if self.n_threads < 1 || self.n_threads > defaults::MAX_THREADS {
            errors.push(format!(
                "n_threads must be in [1, {}], got {}",
                defaults::MAX_THREADS,
                self.n_threads
            ));
        }
        if self.batch_size < 1 {
            errors.push(format!("batch_size must be >= 1, got {}", self.batch_size));
        }

        if let Some(range) = &self.range {
            if range.start.position < 1 || range.end.position < 1 {
                errors.push("range positions are 1-based and must be >= 1".to_string());
            }
            if range.start.contig == range.end.contig && range.start.position > range.end.position
            {
                errors.push(format!(
                    "range start {}:{} lies after range end {}:{}",
                    range.start.contig, range.start.position, range.end.contig, range.end.position
                ));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

// ============================================================================
// Command-line options
// ============================================================================

#[derive(Debug, Clone, Args)]
pub struct AlignCliOptions {
    /// Reference FASTA file (optionally gzipped)
    #[arg(short = 'r', long, value_name = "REF.FA")]
    pub reference: PathBuf,

    /// Candidate matches file ('-' for stdin)
    #[arg(short = 'm', long, value_name = "MATCHES")]
    pub matches: PathBuf,

    /// Scoring file (default: built-in scores)
    #[arg(short = 's', long, value_name = "FILE")]
    pub scoring: Option<PathBuf>,

    // ===== Input/Output Options =====
    /// Output file for aligned reads (default: stdout, '.gz' compresses)
    #[arg(short = 'o', long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output file for reads that could not be aligned
    #[arg(short = 'u', long, value_name = "FILE")]
    pub unaligned: Option<PathBuf>,

    // ===== Algorithm Options =====
    /// Alignment type: 0=full gapped, 1=mismatches only
    #[arg(short = 'a', long, value_name = "INT", default_value_t = defaults::ALIGNMENT_TYPE)]
    pub alignment_type: u8,

    /// Report only the best-scoring entries of each end
    #[arg(short = 'b', long)]
    pub best_only: bool,

    /// Space: 0=nucleotide, 1=colour
    #[arg(short = 'A', long, value_name = "INT", default_value_t = defaults::SPACE)]
    pub space: u8,

    /// Reference padding on each side of a candidate
    #[arg(short = 'O', long, value_name = "INT", default_value_t = defaults::OFFSET_LENGTH)]
    pub offset_length: usize,

    /// Reads with more candidates than INT on any end are not aligned
    #[arg(short = 'M', long, value_name = "INT", default_value_t = defaults::MAX_NUM_MATCHES)]
    pub max_num_matches: usize,

    /// Collapse entries at the same contig, position and strand
    #[arg(long)]
    pub remove_duplicates: bool,

    // ===== Range Filter =====
    /// First contig of the range to align against
    #[arg(long, value_name = "NAME")]
    pub start_contig: Option<String>,

    /// First position (1-based) of the range
    #[arg(long, value_name = "INT")]
    pub start_pos: Option<u64>,

    /// Last contig of the range
    #[arg(long, value_name = "NAME")]
    pub end_contig: Option<String>,

    /// Last position (1-based) of the range
    #[arg(long, value_name = "INT")]
    pub end_pos: Option<u64>,

    // ===== Processing Options =====
    /// Number of threads (default: all available cores)
    #[arg(short = 't', long, value_name = "INT")]
    pub threads: Option<usize>,

    /// Reads per batch handed to the worker pool
    #[arg(long, value_name = "INT", default_value_t = defaults::BATCH_SIZE)]
    pub batch_size: usize,

    /// Log the time spent in each stage
    #[arg(long)]
    pub timing: bool,

    /// Verbose level: 1=error, 2=warning, 3=message, 4=debugging, 5+=trace
    #[arg(short = 'v', long, value_name = "INT", default_value_t = defaults::VERBOSITY)]
    pub verbosity: i32,
}

impl AlignCliOptions {
    /// Build the run options. Thread count is resolved by the caller.
    pub fn to_align_opt(&self, n_threads: usize) -> Result<AlignOpt, Vec<String>> {
        let mut errors = Vec::new();

        let alignment_mode = AlignmentMode::from_code(self.alignment_type).unwrap_or_else(|| {
            errors.push(format!(
                "alignment type must be 0 or 1, got {}",
                self.alignment_type
            ));
            AlignmentMode::default()
        });
        let space = Space::from_code(self.space).unwrap_or_else(|| {
            errors.push(format!("space must be 0 or 1, got {}", self.space));
            Space::default()
        });

        let range = match (&self.start_contig, self.start_pos, &self.end_contig, self.end_pos) {
            (Some(sc), Some(sp), Some(ec), Some(ep)) => Some(RangeFilter {
                start: RangeBound {
                    contig: sc.clone(),
                    position: sp,
                },
                end: RangeBound {
                    contig: ec.clone(),
                    position: ep,
                },
            }),
            (None, None, None, None) => None,
            _ => {
                errors.push(
                    "range filter needs start contig/position and end contig/position".to_string(),
                );
                None
            }
        };

        let opt = AlignOpt {
            alignment_mode,
            result_mode: if self.best_only {
                ResultMode::BestOnly
            } else {
                ResultMode::AllAlignments
            },
            space,
            offset_length: self.offset_length,
            max_num_matches: self.max_num_matches,
            range,
            remove_duplicates: self.remove_duplicates,
            n_threads,
            batch_size: self.batch_size,
            timing: self.timing,
            verbosity: self.verbosity,
        };

        if let Err(more) = opt.validate() {
            errors.extend(more);
        }
        if errors.is_empty() {
            Ok(opt)
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        options: AlignCliOptions,
    }

    fn parse(args: &[&str]) -> AlignCliOptions {
        let mut argv = vec!["test", "--reference", "ref.fa", "--matches", "m.txt"];
        argv.extend_from_slice(args);
        TestCli::try_parse_from(argv).unwrap().options
    }

    #[test]
    fn test_default_values() {
        let opt = AlignOpt::default();
        assert_eq!(opt.alignment_mode, AlignmentMode::Full);
        assert_eq!(opt.result_mode, ResultMode::AllAlignments);
        assert_eq!(opt.space, Space::Nucleotide);
        assert_eq!(opt.offset_length, 20, "padding defaults to 20 bp");
        assert_eq!(opt.max_num_matches, 384);
        assert!(opt.range.is_none());
        assert!(opt.validate().is_ok());
    }

    #[test]
    fn test_validate_collects_all_errors() {
        let opt = AlignOpt {
            max_num_matches: 0,
            n_threads: 0,
            batch_size: 0,
            ..AlignOpt::default()
        };
        let errors = opt.validate().unwrap_err();
        assert_eq!(errors.len(), 3, "{errors:?}");
    }

    #[test]
    fn test_validate_range_order() {
        let bound = |position| RangeBound {
            contig: "chr1".to_string(),
            position,
        };
        let mut opt = AlignOpt {
            range: Some(RangeFilter {
                start: bound(500),
                end: bound(100),
            }),
            ..AlignOpt::default()
        };
        assert!(opt.validate().is_err());
        opt.range = Some(RangeFilter {
            start: bound(100),
            end: bound(500),
        });
        assert!(opt.validate().is_ok());
    }

    #[test]
    fn test_cli_to_align_opt() {
        let cli = parse(&["-a", "1", "-b", "-A", "1", "-O", "8", "-M", "10", "--remove-duplicates"]);
        let opt = cli.to_align_opt(4).unwrap();
        assert_eq!(opt.alignment_mode, AlignmentMode::MismatchesOnly);
        assert_eq!(opt.result_mode, ResultMode::BestOnly);
        assert_eq!(opt.space, Space::Color);
        assert_eq!(opt.offset_length, 8);
        assert_eq!(opt.max_num_matches, 10);
        assert_eq!(opt.n_threads, 4);

        let params = opt.candidate_params();
        assert!(params.best_only());
        assert!(params.remove_duplicates);
    }

    #[test]
    fn test_cli_rejects_unknown_codes() {
        let errors = parse(&["-a", "7", "-A", "3"]).to_align_opt(1).unwrap_err();
        assert_eq!(errors.len(), 2, "{errors:?}");
    }

    #[test]
    fn test_cli_partial_range_is_rejected() {
        let errors = parse(&["--start-contig", "chr1", "--start-pos", "10"])
            .to_align_opt(1)
            .unwrap_err();
        assert_eq!(errors.len(), 1, "{errors:?}");
    }

    #[test]
    fn test_cli_range() {
        let cli = parse(&[
            "--start-contig",
            "chr1",
            "--start-pos",
            "10",
            "--end-contig",
            "chr2",
            "--end-pos",
            "5",
        ]);
        let range = cli.to_align_opt(1).unwrap().range.unwrap();
        assert_eq!(range.start.contig, "chr1");
        assert_eq!(range.end.position, 5);
    }
}
