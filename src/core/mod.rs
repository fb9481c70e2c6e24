//! Core reusable components for alignment operations.
//!
//! Everything here works on a single read and its reference windows; the
//! per-read pipeline that drives it lives in `pipelines`.

pub mod alignment;
pub mod compute;
pub mod io;
pub mod utils;
