//! Candidate alignment pipeline.
//!
//! Turns candidate records (a read plus the reference positions it may come
//! from) into alignment records: pre-filter, orchestrate the aligners per
//! candidate, reduce the entries of each end, and write the result.

pub mod align_opt; // Run configuration and CLI options
pub mod filters; // Range and candidate-count pre-filters
pub mod orchestrator; // Exact -> ungapped -> bounded gapped, per read end
pub mod reduction; // Best-score reduction and duplicate removal
pub mod runner; // Batching, worker pool and ordered merge

pub use align_opt::{AlignCliOptions, AlignOpt, AlignmentMode, CandidateParams, ResultMode};
pub use orchestrator::{AlignStats, CandidateAligner};
pub use runner::{AlignSummary, align_batch, run_alignment};
