// Shared alignment types: strand, space and the per-candidate result.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Strand {
    Forward,
    Reverse,
}

impl Strand {
    pub fn as_char(self) -> char {
        match self {
            Strand::Forward => '+',
            Strand::Reverse => '-',
        }
    }

    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '+' | 'F' | 'f' => Some(Strand::Forward),
            '-' | 'R' | 'r' => Some(Strand::Reverse),
            _ => None,
        }
    }
}

impl fmt::Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Alphabet a read is given in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Space {
    #[default]
    Nucleotide,
    /// Colour space: start base followed by transition colours.
    Color,
}

impl Space {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Space::Nucleotide),
            1 => Some(Space::Color),
            _ => None,
        }
    }
}

/// Reference slice fetched for one candidate.
///
/// `seq` is already reverse-complemented for the reverse strand. `start` is
/// the 1-based genomic coordinate of the leftmost forward-strand base covered
/// by the window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceWindow {
    pub contig: usize,
    pub start: u64,
    pub strand: Strand,
    pub seq: Vec<u8>,
}

impl ReferenceWindow {
    pub fn len(&self) -> usize {
        self.seq.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seq.is_empty()
    }

    /// Genomic position of an aligned block that starts at window column
    /// `offset` and covers `span` reference bases. Reverse-strand windows are
    /// mirrored back onto forward coordinates.
    pub fn genomic_position(&self, offset: usize, span: usize) -> u64 {
        match self.strand {
            Strand::Forward => self.start + offset as u64,
            Strand::Reverse => {
                self.start + self.seq.len().saturating_sub(span + offset) as u64
            }
        }
    }

    /// Window column of an aligned block at genomic `position` covering
    /// `span` reference bases. Inverse of [`Self::genomic_position`].
    pub fn column_of(&self, position: u64, span: usize) -> Option<usize> {
        let delta = usize::try_from(position.checked_sub(self.start)?).ok()?;
        match self.strand {
            Strand::Forward => Some(delta),
            Strand::Reverse => self.seq.len().checked_sub(span + delta),
        }
        .filter(|&col| col + span <= self.seq.len())
    }
}

/// One candidate placement of a read end, resolved or not.
///
/// `score` is `f64::NEG_INFINITY` until one of the aligners resolves the
/// candidate. Once resolved, `read` and `reference` hold the aligned strings
/// (equal length, gap symbol on at most one side per column) and `position`
/// is the 1-based genomic coordinate of the leftmost aligned reference base.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedEntry {
    pub contig: usize,
    pub position: u64,
    pub strand: Strand,
    pub score: f64,
    /// Total alignment length, gaps included
    pub length: usize,
    /// Number of non-gap reference columns
    pub reference_length: usize,
    pub read: Vec<u8>,
    pub reference: Vec<u8>,
    /// Colour error track (secondary space only, empty otherwise)
    pub color_error: Vec<u8>,
}

impl AlignedEntry {
    /// An unresolved candidate at the given placement.
    pub fn candidate(contig: usize, position: u64, strand: Strand) -> Self {
        Self {
            contig,
            position,
            strand,
            score: f64::NEG_INFINITY,
            length: 0,
            reference_length: 0,
            read: Vec::new(),
            reference: Vec::new(),
            color_error: Vec::new(),
        }
    }

    #[inline]
    pub fn is_resolved(&self) -> bool {
        self.score > f64::NEG_INFINITY
    }
}

/// All candidates of one read end.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlignedEnd {
    pub read: Vec<u8>,
    pub entries: Vec<AlignedEntry>,
}

/// Aligned ends of one read, in input order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlignedRead {
    pub name: String,
    pub ends: Vec<AlignedEnd>,
}
