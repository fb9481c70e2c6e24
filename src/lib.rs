//! Bounded gapped alignment of short reads against candidate reference
//! positions.
//!
//! The `core` modules align one read against one reference window (exact,
//! ungapped and banded affine-gap DP); `pipelines::candidate` drives them over
//! candidate records on a rayon worker pool.

pub mod core; // Aligners, encodings and record I/O
pub mod defaults; // Default scores and run parameters
pub mod error; // Typed library errors
pub mod pipelines; // Candidate alignment pipeline

pub use error::{AlignError, Result};
