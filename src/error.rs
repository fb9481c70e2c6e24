//! Error types for the aligner.
//!
//! Every fallible operation in the library returns [`AlignError`]. Problems that
//! only affect one candidate (short reference fetch, unresolvable placement) are
//! not errors: the candidate is dropped and the run continues. The variants
//! below are the conditions the caller cannot recover from locally.

use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AlignError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("malformed scoring input at line {line}: {msg}")]
    MalformedScoring { line: usize, msg: String },

    /// Gap open must be strictly more negative than gap extension.
    #[error("unimplemented gap regime: gap open {gap_open} must be < gap extension {gap_extension}")]
    UnsupportedGapRegime { gap_open: f64, gap_extension: f64 },

    #[error("invalid transition symbol '{symbol}' at position {position}")]
    InvalidTransitionSymbol { symbol: char, position: usize },

    #[error("anchored position {row} mismatches the reference ('{read}' vs '{reference}')")]
    AnchorMismatch {
        row: usize,
        read: char,
        reference: char,
    },

    #[error("constraint mask has no anchored positions")]
    EmptyAnchor,

    #[error("backtrace stopped at row {row}, col {col} with {remaining} steps left: {msg}")]
    BacktraceMisaligned {
        row: usize,
        col: usize,
        remaining: usize,
        msg: &'static str,
    },

    #[error("entry score {score} exceeds tracked best score {best}")]
    ScoreAboveBest { score: f64, best: f64 },

    #[error("no entry carries the best score {best}")]
    EmptyReduction { best: f64 },

    #[error("malformed candidate record at line {line}: {msg}")]
    MalformedCandidates { line: usize, msg: String },

    #[error("unknown contig '{0}'")]
    UnknownContig(String),

    #[error("invalid reference: {0}")]
    InvalidReference(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, AlignError>;
