//! Alignment core: scoring, fast paths and the bounded gapped aligner.
//!
//! These modules work on one read against one reference window and know
//! nothing about candidate sets, threads or file formats.

pub mod bounded; // Banded affine-gap DP (free and constrained modes)
pub mod exact; // Exact-match fast path (KMP)
pub mod matrix; // DP cells and the reusable matrix buffer
pub mod scoring; // Substitution tables and gap penalties
pub mod types;
pub mod ungapped; // Mismatches-only fast path
pub mod workspace; // Thread-local matrix reuse
