//! Alignment pipelines built on the core aligners.
//!
//! - `candidate`: gapped alignment of reads against supplied candidate positions

pub mod candidate;
