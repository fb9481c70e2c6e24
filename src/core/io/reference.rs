// Reference access for candidate windows.
//
// The aligner only needs one operation from a reference: cut the window around
// a candidate position, padded on both sides, in the candidate's orientation.
// `ReferenceGenome` is the in-memory implementation backed by a FASTA file
// (read with bio::io::fasta).

use bio::io::fasta;
use std::collections::HashMap;
use std::path::Path;

use crate::core::alignment::types::{ReferenceWindow, Strand};
use crate::core::compute::encoding::{normalize_base, reverse_complement};
use crate::core::utils::xzopen;
use crate::error::{AlignError, Result};

pub trait ReferenceSource: Sync {
    fn num_contigs(&self) -> usize;

    fn contig_index(&self, name: &str) -> Option<usize>;

    fn contig_name(&self, contig: usize) -> Option<&str>;

    /// Window `[position - padding, position + required_len - 1 + padding]`
    /// (1-based, inclusive) clamped to the contig, reverse-complemented for
    /// the reverse strand. A window shorter than `required_len` means the
    /// candidate cannot be aligned.
    fn fetch(
        &self,
        contig: usize,
        position: u64,
        strand: Strand,
        padding: usize,
        required_len: usize,
    ) -> Result<ReferenceWindow>;
}

#[derive(Debug, Default)]
pub struct ReferenceGenome {
    names: Vec<String>,
    seqs: Vec<Vec<u8>>,
    index: HashMap<String, usize>,
}

impl ReferenceGenome {
    /// Build from `(name, sequence)` pairs; bases are upper-cased and anything
    /// outside ACGT becomes N.
    pub fn from_contigs<I, S>(contigs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, Vec<u8>)>,
        S: Into<String>,
    {
        let mut genome = Self::default();
        for (name, seq) in contigs {
            genome.push(name.into(), seq)?;
        }
        Ok(genome)
    }

    /// Load a FASTA file (optionally gzipped).
    pub fn from_fasta(path: &Path) -> Result<Self> {
        let reader = fasta::Reader::from_bufread(xzopen(path)?);
        let mut genome = Self::default();
        for record in reader.records() {
            let record = record.map_err(|e| {
                AlignError::InvalidReference(format!("{}: {}", path.display(), e))
            })?;
            genome.push(record.id().to_string(), record.seq().to_vec())?;
        }
        if genome.names.is_empty() {
            return Err(AlignError::InvalidReference(format!(
                "{}: no sequences found",
                path.display()
            )));
        }
        log::info!(
            "Loaded reference {}: {} contigs, {} bp",
            path.display(),
            genome.names.len(),
            genome.total_length()
        );
        Ok(genome)
    }

    fn push(&mut self, name: String, mut seq: Vec<u8>) -> Result<()> {
        if self.index.contains_key(&name) {
            return Err(AlignError::InvalidReference(format!(
                "duplicate contig name '{name}'"
            )));
        }
        for b in seq.iter_mut() {
            *b = normalize_base(*b);
        }
        self.index.insert(name.clone(), self.names.len());
        self.names.push(name);
        self.seqs.push(seq);
        Ok(())
    }

    pub fn contig_len(&self, contig: usize) -> Option<usize> {
        self.seqs.get(contig).map(Vec::len)
    }

    pub fn total_length(&self) -> usize {
        self.seqs.iter().map(Vec::len).sum()
    }
}

impl ReferenceSource for ReferenceGenome {
    fn num_contigs(&self) -> usize {
        self.names.len()
    }

    fn contig_index(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    fn contig_name(&self, contig: usize) -> Option<&str> {
        self.names.get(contig).map(String::as_str)
    }

    fn fetch(
        &self,
        contig: usize,
        position: u64,
        strand: Strand,
        padding: usize,
        required_len: usize,
    ) -> Result<ReferenceWindow> {
        let seq = self
            .seqs
            .get(contig)
            .ok_or_else(|| AlignError::UnknownContig(format!("#{contig}")))?;

        let anchor = position.saturating_sub(1) as usize;
        let begin = anchor.saturating_sub(padding).min(seq.len());
        let end = anchor
            .saturating_add(required_len)
            .saturating_add(padding)
            .min(seq.len())
            .max(begin);

        let slice = &seq[begin..end];
        let window_seq = match strand {
            Strand::Forward => slice.to_vec(),
            Strand::Reverse => reverse_complement(slice),
        };
        Ok(ReferenceWindow {
            contig,
            start: begin as u64 + 1,
            strand,
            seq: window_seq,
        })
    }
}
