// Candidate input records.
//
// Text format, one record per read:
//
//   @name<TAB>numEnds
//   read<TAB>qual<TAB>mask<TAB>numCandidates        (one line per end)
//   contig<TAB>position<TAB>strand                  (numCandidates lines)
//
// `*` marks an absent quality or mask. Positions are 1-based, strands `+`/`-`.
// Contig names are resolved against the reference when the record is read;
// candidates on unknown contigs are dropped with a warning.

use std::io::{BufRead, Write};

use crate::core::alignment::types::Strand;
use crate::core::io::reference::ReferenceSource;
use crate::error::{AlignError, Result};

/// Upper bound on what a count field may pre-allocate; longer lists grow.
const MAX_PREALLOC: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Candidate {
    pub contig: usize,
    pub position: u64,
    pub strand: Strand,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateEnd {
    pub read: Vec<u8>,
    pub qual: Option<Vec<u8>>,
    /// Per-position constraint mask, `b'1'` = anchored
    pub mask: Option<Vec<u8>>,
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateRead {
    pub name: String,
    pub ends: Vec<CandidateEnd>,
}

impl CandidateRead {
    pub fn num_candidates(&self) -> usize {
        self.ends.iter().map(|e| e.candidates.len()).sum()
    }
}

/// Streaming reader over candidate records.
pub struct CandidateReader<'r, B, R: ?Sized> {
    input: B,
    reference: &'r R,
    line_no: usize,
    buf: String,
    dropped: usize,
}

impl<'r, B: BufRead, R: ReferenceSource + ?Sized> CandidateReader<'r, B, R> {
    pub fn new(input: B, reference: &'r R) -> Self {
        Self {
            input,
            reference,
            line_no: 0,
            buf: String::new(),
            dropped: 0,
        }
    }

    /// Candidates dropped so far because their contig is unknown.
    pub fn dropped_candidates(&self) -> usize {
        self.dropped
    }

    fn malformed(&self, msg: impl Into<String>) -> AlignError {
        AlignError::MalformedCandidates {
            line: self.line_no,
            msg: msg.into(),
        }
    }

    /// Next non-empty line, without its line terminator.
    fn next_line(&mut self) -> Result<Option<String>> {
        loop {
            self.buf.clear();
            if self.input.read_line(&mut self.buf)? == 0 {
                return Ok(None);
            }
            self.line_no += 1;
            let line = self.buf.trim_end_matches(['\n', '\r']);
            if !line.trim().is_empty() {
                return Ok(Some(line.to_string()));
            }
        }
    }

    fn expect_line(&mut self, what: &str) -> Result<String> {
        self.next_line()?
            .ok_or_else(|| self.malformed(format!("unexpected end of input, expected {what}")))
    }

    fn parse_count(&self, field: &str, what: &str) -> Result<usize> {
        field
            .trim()
            .parse::<usize>()
            .map_err(|_| self.malformed(format!("invalid {what} '{field}'")))
    }

    fn read_end(&mut self) -> Result<CandidateEnd> {
        let line = self.expect_line("an end line")?;
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() != 4 {
            return Err(self.malformed(format!(
                "end line needs 4 tab-separated fields, got {}",
                fields.len()
            )));
        }
        let optional = |s: &str| (s != "*").then(|| s.as_bytes().to_vec());
        let read = fields[0].as_bytes().to_vec();
        let qual = optional(fields[1]);
        let mask = optional(fields[2]);
        if let Some(m) = &mask {
            if m.len() != read.len() || m.iter().any(|&b| b != b'0' && b != b'1') {
                return Err(self.malformed("mask must be 0/1 and as long as the read"));
            }
        }
        let count = self.parse_count(fields[3], "candidate count")?;

        let mut candidates = Vec::with_capacity(count.min(MAX_PREALLOC));
        for _ in 0..count {
            let line = self.expect_line("a candidate line")?;
            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() != 3 {
                return Err(self.malformed(format!(
                    "candidate line needs 3 tab-separated fields, got {}",
                    fields.len()
                )));
            }
            let position = fields[1]
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|&p| p > 0)
                .ok_or_else(|| self.malformed(format!("invalid position '{}'", fields[1])))?;
            let strand = fields[2]
                .trim()
                .chars()
                .next()
                .and_then(Strand::from_char)
                .ok_or_else(|| self.malformed(format!("invalid strand '{}'", fields[2])))?;
            match self.reference.contig_index(fields[0]) {
                Some(contig) => candidates.push(Candidate {
                    contig,
                    position,
                    strand,
                }),
                None => {
                    log::warn!(
                        "Line {}: dropping candidate on unknown contig '{}'",
                        self.line_no,
                        fields[0]
                    );
                    self.dropped += 1;
                }
            }
        }

        Ok(CandidateEnd {
            read,
            qual,
            mask,
            candidates,
        })
    }

    pub fn read_record(&mut self) -> Result<Option<CandidateRead>> {
        let Some(header) = self.next_line()? else {
            return Ok(None);
        };
        let Some(rest) = header.strip_prefix('@') else {
            return Err(self.malformed("record header must start with '@'"));
        };
        let (name, num_ends) = rest
            .split_once('\t')
            .ok_or_else(|| self.malformed("header needs a name and an end count"))?;
        let num_ends = self.parse_count(num_ends, "end count")?;
        if num_ends == 0 {
            return Err(self.malformed("a read needs at least one end"));
        }
        let name = name.to_string();

        let mut ends = Vec::with_capacity(num_ends.min(MAX_PREALLOC));
        for _ in 0..num_ends {
            ends.push(self.read_end()?);
        }
        Ok(Some(CandidateRead { name, ends }))
    }
}

impl<B: BufRead, R: ReferenceSource + ?Sized> Iterator for CandidateReader<'_, B, R> {
    type Item = Result<CandidateRead>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_record().transpose()
    }
}

/// Write one record in the candidate format.
pub fn write_candidate_read<W: Write + ?Sized, R: ReferenceSource + ?Sized>(
    out: &mut W,
    read: &CandidateRead,
    reference: &R,
) -> Result<()> {
    writeln!(out, "@{}\t{}", read.name, read.ends.len())?;
    for end in &read.ends {
        let field = |v: &Option<Vec<u8>>| {
            v.as_deref()
                .map(|b| String::from_utf8_lossy(b).into_owned())
                .unwrap_or_else(|| "*".to_string())
        };
        writeln!(
            out,
            "{}\t{}\t{}\t{}",
            String::from_utf8_lossy(&end.read),
            field(&end.qual),
            field(&end.mask),
            end.candidates.len()
        )?;
        for c in &end.candidates {
            let name = reference
                .contig_name(c.contig)
                .ok_or_else(|| AlignError::UnknownContig(format!("#{}", c.contig)))?;
            writeln!(out, "{}\t{}\t{}", name, c.position, c.strand)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::io::reference::ReferenceGenome;
    use std::io::Cursor;

    fn genome() -> ReferenceGenome {
        ReferenceGenome::from_contigs(vec![("chr1", b"ACGT".to_vec()), ("chr2", b"ACGT".to_vec())])
            .unwrap()
    }

    const TWO_READS: &str = "\
@read1\t1
ACGTACGT\tIIIIIIII\t*\t2
chr1\t100\t+
chr2\t5\t-

@read2\t2
TTTT\t*\t1001\t0
GGGG\t*\t*\t1
chr2\t42\t+
";

    #[test]
    fn test_read_records() {
        let g = genome();
        let reads: Vec<CandidateRead> = CandidateReader::new(Cursor::new(TWO_READS), &g)
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(reads.len(), 2);

        assert_eq!(reads[0].name, "read1");
        assert_eq!(reads[0].ends[0].qual.as_deref(), Some(&b"IIIIIIII"[..]));
        assert_eq!(reads[0].ends[0].mask, None);
        assert_eq!(
            reads[0].ends[0].candidates[1],
            Candidate {
                contig: 1,
                position: 5,
                strand: Strand::Reverse
            }
        );

        assert_eq!(reads[1].ends.len(), 2);
        assert_eq!(reads[1].ends[0].mask.as_deref(), Some(&b"1001"[..]));
        assert!(reads[1].ends[0].candidates.is_empty());
        assert_eq!(reads[1].num_candidates(), 1);
    }

    #[test]
    fn test_unknown_contig_is_dropped() {
        let g = genome();
        let text = "@r\t1\nACGT\t*\t*\t2\nchrX\t1\t+\nchr1\t1\t+\n";
        let mut reader = CandidateReader::new(Cursor::new(text), &g);
        let read = reader.read_record().unwrap().unwrap();
        assert_eq!(read.ends[0].candidates.len(), 1);
        assert_eq!(reader.dropped_candidates(), 1);
    }

    #[test]
    fn test_malformed_records_report_line() {
        let g = genome();
        let cases = [
            ("read1\t1\n", 1),
            ("@r\t1\nACGT\t*\t*\n", 2),
            ("@r\t1\nACGT\t*\t*\t1\nchr1\t0\t+\n", 3),
            ("@r\t1\nACGT\t*\t*\t1\nchr1\t5\tx\n", 3),
            ("@r\t1\nACGT\t*\t10\t0\n", 2),
            ("@r\t1\nACGT\t*\t*\t2\nchr1\t5\t+\n", 3),
            // Counts far beyond the input end at EOF instead of allocating
            ("@r\t1\nACGT\t*\t*\t1000000000000000000\nchrX\t1\t+\n", 3),
            ("@r\t1000000000000000000\nACGT\t*\t*\t0\n", 2),
        ];
        for (text, expected_line) in cases {
            match CandidateReader::new(Cursor::new(text), &g).read_record() {
                Err(AlignError::MalformedCandidates { line, .. }) => {
                    assert_eq!(line, expected_line, "input {text:?}")
                }
                other => panic!("expected MalformedCandidates for {text:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_write_then_read_back() {
        let g = genome();
        let reads: Vec<CandidateRead> = CandidateReader::new(Cursor::new(TWO_READS), &g)
            .collect::<Result<_>>()
            .unwrap();
        let mut out = Vec::new();
        for r in &reads {
            write_candidate_read(&mut out, r, &g).unwrap();
        }
        let again: Vec<CandidateRead> = CandidateReader::new(Cursor::new(out), &g)
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(again, reads);
    }
}
