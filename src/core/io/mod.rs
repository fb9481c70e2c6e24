//! Interfaces the aligner consumes and produces: reference windows, candidate
//! records and alignment records.

pub mod aligned_output; // Alignment output record writer
pub mod candidates; // Candidate input records (reader + writer)
pub mod reference; // Reference accessor trait and FASTA-backed genome
