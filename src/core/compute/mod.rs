//! Sequence encodings shared by the aligners.

pub mod encoding;
