// src/defaults.rs

// Scoring Constants
pub const NT_MATCH_SCORE: f64 = 100.0;
pub const NT_MISMATCH_SCORE: f64 = -150.0;
pub const COLOR_MATCH_SCORE: f64 = 0.0;
pub const COLOR_MISMATCH_SCORE: f64 = -125.0;
pub const GAP_OPEN_PENALTY: f64 = -175.0;
pub const GAP_EXTENSION_PENALTY: f64 = -50.0;

// Algorithmic Constants
pub const OFFSET_LENGTH: usize = 20;
pub const MAX_NUM_MATCHES: usize = 384;
pub const ALIGNMENT_TYPE: u8 = 0; // 0 = full gapped, 1 = mismatches only
pub const SPACE: u8 = 0; // 0 = nucleotide, 1 = colour

// Secondary space
pub const COLOR_SPACE_START_NT: u8 = b'A';

// Symbols
pub const GAP: u8 = b'-';

// Other Constants
pub const VERBOSITY: i32 = 3;
pub const MAX_THREADS: usize = 256;
pub const BATCH_SIZE: usize = 65536; // reads per batch handed to the worker pool
