// Scoring model: substitution tables for both spaces plus affine gap penalties.
//
// Tables are 5x5 row-major over codes 0..=4 (A,C,G,T,N for nucleotides,
// colours 0..=3 plus 4 = unknown for the secondary space). Scores are real
// valued and additive over aligned positions; gap penalties are <= 0.

use std::io::BufRead;
use std::path::Path;

use crate::core::alignment::types::Space;
use crate::core::compute::encoding::{
    AMBIGUOUS_CODE, base_to_code, color_char_to_code, color_code_to_char, transition_code,
};
use crate::core::utils::xzopen;
use crate::defaults;
use crate::error::{AlignError, Result};

/// Fill a 5x5 table: `match_score` on the ACGT diagonal, `mismatch` elsewhere.
/// The ambiguous row and column always score as a mismatch.
pub fn fill_score_table(match_score: f64, mismatch: f64) -> [f64; 25] {
    let mut mat = [mismatch; 25];
    for i in 0..4 {
        mat[i * 5 + i] = match_score;
    }
    mat
}

fn table_max(mat: &[f64; 25]) -> f64 {
    mat.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoringModel {
    nt: [f64; 25],
    color: [f64; 25],
    gap_open: f64,
    gap_extension: f64,
    max_nt_score: f64,
    max_color_score: f64,
}

impl Default for ScoringModel {
    fn default() -> Self {
        let nt = fill_score_table(defaults::NT_MATCH_SCORE, defaults::NT_MISMATCH_SCORE);
        let color = fill_score_table(defaults::COLOR_MATCH_SCORE, defaults::COLOR_MISMATCH_SCORE);
        Self {
            max_nt_score: table_max(&nt),
            max_color_score: table_max(&color),
            nt,
            color,
            gap_open: defaults::GAP_OPEN_PENALTY,
            gap_extension: defaults::GAP_EXTENSION_PENALTY,
        }
    }
}

impl ScoringModel {
    /// Build a model from match/mismatch constants.
    ///
    /// Fails when a gap penalty is positive or when `gap_open >= gap_extension`;
    /// the bound derivation in the gapped aligner only covers `gap_open < gap_extension`.
    pub fn new(
        nt_match: f64,
        nt_mismatch: f64,
        color_match: f64,
        color_mismatch: f64,
        gap_open: f64,
        gap_extension: f64,
    ) -> Result<Self> {
        Self::from_tables(
            fill_score_table(nt_match, nt_mismatch),
            fill_score_table(color_match, color_mismatch),
            gap_open,
            gap_extension,
        )
    }

    pub fn from_tables(
        nt: [f64; 25],
        color: [f64; 25],
        gap_open: f64,
        gap_extension: f64,
    ) -> Result<Self> {
        if gap_open > 0.0 || gap_extension > 0.0 {
            return Err(AlignError::InvalidConfig(format!(
                "gap penalties must be <= 0 (open {gap_open}, extension {gap_extension})"
            )));
        }
        if gap_open >= gap_extension {
            return Err(AlignError::UnsupportedGapRegime {
                gap_open,
                gap_extension,
            });
        }
        Ok(Self {
            max_nt_score: table_max(&nt),
            max_color_score: table_max(&color),
            nt,
            color,
            gap_open,
            gap_extension,
        })
    }

    /// Load a scoring file (optionally gzipped).
    pub fn from_path(path: &Path) -> Result<Self> {
        let reader = xzopen(path)?;
        let model = Self::from_reader(reader)?;
        log::info!(
            "Loaded scoring model from {}: gap open {}, gap extension {}",
            path.display(),
            model.gap_open,
            model.gap_extension
        );
        Ok(model)
    }

    /// Parse the keyed text format:
    ///
    /// ```text
    /// # comment
    /// gap_open       -175
    /// gap_extension  -50
    /// nt_match       100
    /// nt_mismatch    -150
    /// color_match    0
    /// color_mismatch -125
    /// nt_row    A  100 -150 -150 -150 -150
    /// color_row 0    0 -125 -125 -125 -125
    /// ```
    ///
    /// Explicit rows are applied after the match/mismatch fill, regardless of
    /// where they appear in the file.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut gap_open = None;
        let mut gap_extension = None;
        let mut nt_match = defaults::NT_MATCH_SCORE;
        let mut nt_mismatch = defaults::NT_MISMATCH_SCORE;
        let mut color_match = defaults::COLOR_MATCH_SCORE;
        let mut color_mismatch = defaults::COLOR_MISMATCH_SCORE;
        let mut nt_rows: Vec<(usize, [f64; 5])> = Vec::new();
        let mut color_rows: Vec<(usize, [f64; 5])> = Vec::new();

        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            let line_no = idx + 1;
            let content = line.split('#').next().unwrap_or("").trim();
            if content.is_empty() {
                continue;
            }
            let fields: Vec<&str> = content.split_whitespace().collect();
            let malformed = |msg: String| AlignError::MalformedScoring { line: line_no, msg };
            let number = |s: &str| {
                s.parse::<f64>()
                    .map_err(|_| malformed(format!("invalid number '{s}'")))
            };

            match fields[0] {
                "nt_row" | "color_row" => {
                    if fields.len() != 7 {
                        return Err(malformed(format!(
                            "{} needs a symbol and 5 scores, got {} fields",
                            fields[0],
                            fields.len() - 1
                        )));
                    }
                    let sym = fields[1].as_bytes();
                    if sym.len() != 1 {
                        return Err(malformed(format!("invalid row symbol '{}'", fields[1])));
                    }
                    let mut row = [0.0; 5];
                    for (slot, field) in row.iter_mut().zip(&fields[2..]) {
                        *slot = number(*field)?;
                    }
                    if fields[0] == "nt_row" {
                        nt_rows.push((base_to_code(sym[0]) as usize, row));
                    } else {
                        let code = color_char_to_code(sym[0])
                            .ok_or_else(|| malformed(format!("invalid colour '{}'", fields[1])))?;
                        color_rows.push((code as usize, row));
                    }
                }
                key => {
                    if fields.len() != 2 {
                        return Err(malformed(format!("expected '{key} <value>'")));
                    }
                    let value = number(fields[1])?;
                    match key {
                        "gap_open" => gap_open = Some(value),
                        "gap_extension" => gap_extension = Some(value),
                        "nt_match" => nt_match = value,
                        "nt_mismatch" => nt_mismatch = value,
                        "color_match" => color_match = value,
                        "color_mismatch" => color_mismatch = value,
                        _ => return Err(malformed(format!("unknown key '{key}'"))),
                    }
                }
            }
        }

        let gap_open = gap_open.ok_or(AlignError::MalformedScoring {
            line: 0,
            msg: "missing gap_open".to_string(),
        })?;
        let gap_extension = gap_extension.ok_or(AlignError::MalformedScoring {
            line: 0,
            msg: "missing gap_extension".to_string(),
        })?;

        let mut nt = fill_score_table(nt_match, nt_mismatch);
        for (code, row) in nt_rows {
            nt[code * 5..code * 5 + 5].copy_from_slice(&row);
        }
        let mut color = fill_score_table(color_match, color_mismatch);
        for (code, row) in color_rows {
            color[code * 5..code * 5 + 5].copy_from_slice(&row);
        }

        Self::from_tables(nt, color, gap_open, gap_extension)
    }

    /// Nucleotide substitution score (case-insensitive, non-ACGT treated as N).
    #[inline]
    pub fn nt_score(&self, read: u8, reference: u8) -> f64 {
        self.nt[base_to_code(read) as usize * 5 + base_to_code(reference) as usize]
    }

    /// Colour substitution score over colour codes 0..=4.
    #[inline]
    pub fn color_score(&self, read: u8, reference: u8) -> f64 {
        self.color[read.min(AMBIGUOUS_CODE) as usize * 5 + reference.min(AMBIGUOUS_CODE) as usize]
    }

    #[inline]
    pub fn gap_open(&self) -> f64 {
        self.gap_open
    }

    #[inline]
    pub fn gap_extension(&self) -> f64 {
        self.gap_extension
    }

    pub fn max_nt_score(&self) -> f64 {
        self.max_nt_score
    }

    pub fn max_color_score(&self) -> f64 {
        self.max_color_score
    }

    /// Largest score a single aligned position can contribute in `space`.
    pub fn max_symbol_score(&self, space: Space) -> f64 {
        match space {
            Space::Nucleotide => self.max_nt_score,
            Space::Color => self.max_nt_score + self.max_color_score,
        }
    }
}

/// Substitution scores of one read against one reference window.
///
/// In colour space each aligned column also scores the read's transition
/// colour against the reference's transition colour. Reference colour `j` is
/// the transition from base `j-1` (or the start base at `j == 0`) to base `j`.
pub struct PairScorer<'a> {
    model: &'a ScoringModel,
    read: &'a [u8],
    reference: &'a [u8],
    colors: Option<(Vec<u8>, Vec<u8>)>,
}

fn color_codes(seq: &[u8], start: u8) -> Vec<u8> {
    let mut prev = base_to_code(start);
    seq.iter()
        .map(|&b| {
            let code = base_to_code(b);
            let color = transition_code(prev, code);
            prev = code;
            color
        })
        .collect()
}

impl<'a> PairScorer<'a> {
    pub fn new(model: &'a ScoringModel, space: Space, read: &'a [u8], reference: &'a [u8]) -> Self {
        let colors = match space {
            Space::Nucleotide => None,
            Space::Color => Some((
                color_codes(read, defaults::COLOR_SPACE_START_NT),
                color_codes(reference, defaults::COLOR_SPACE_START_NT),
            )),
        };
        Self {
            model,
            read,
            reference,
            colors,
        }
    }

    pub fn model(&self) -> &ScoringModel {
        self.model
    }

    pub fn read(&self) -> &'a [u8] {
        self.read
    }

    pub fn reference(&self) -> &'a [u8] {
        self.reference
    }

    pub fn space(&self) -> Space {
        if self.colors.is_some() {
            Space::Color
        } else {
            Space::Nucleotide
        }
    }

    /// Score of read base `i` aligned to reference base `j` (both 0-based).
    #[inline]
    pub fn score(&self, i: usize, j: usize) -> f64 {
        let nt = self.model.nt_score(self.read[i], self.reference[j]);
        match &self.colors {
            None => nt,
            Some((read_colors, ref_colors)) => {
                nt + self.model.color_score(read_colors[i], ref_colors[j])
            }
        }
    }

    /// Score of read base `i` aligned to itself.
    #[inline]
    pub fn self_score(&self, i: usize) -> f64 {
        let nt = self.model.nt_score(self.read[i], self.read[i]);
        match &self.colors {
            None => nt,
            Some((read_colors, _)) => nt + self.model.color_score(read_colors[i], read_colors[i]),
        }
    }

    /// Colour error symbol for read base `i` against reference base `j`:
    /// the gap symbol when the colours agree, the read colour otherwise.
    /// `None` in nucleotide space.
    #[inline]
    pub fn color_error(&self, i: usize, j: usize) -> Option<u8> {
        self.colors.as_ref().map(|(read_colors, ref_colors)| {
            if read_colors[i] == ref_colors[j] {
                defaults::GAP
            } else {
                color_code_to_char(read_colors[i])
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    // ========================================================================
    // Construction
    // ========================================================================

    #[test]
    fn test_fill_score_table() {
        let mat = fill_score_table(1.0, -4.0);
        assert_eq!(mat[0], 1.0); // A-A
        assert_eq!(mat[1], -4.0); // A-C
        assert_eq!(mat[18], 1.0); // T-T
        assert_eq!(mat[24], -4.0); // N-N never matches
        assert_eq!(mat[4], -4.0); // A-N
    }

    #[test]
    fn test_default_model() {
        let model = ScoringModel::default();
        assert_eq!(model.nt_score(b'A', b'a'), defaults::NT_MATCH_SCORE);
        assert_eq!(model.nt_score(b'A', b'G'), defaults::NT_MISMATCH_SCORE);
        assert!(model.gap_open() < model.gap_extension());
        assert_eq!(
            model.max_symbol_score(Space::Color),
            defaults::NT_MATCH_SCORE + defaults::COLOR_MATCH_SCORE
        );
    }

    #[test]
    fn test_gap_regime_is_enforced() {
        match ScoringModel::new(1.0, -1.0, 0.0, -1.0, -1.0, -1.0) {
            Err(AlignError::UnsupportedGapRegime { .. }) => {}
            other => panic!("expected UnsupportedGapRegime, got {other:?}"),
        }
        assert!(ScoringModel::new(1.0, -1.0, 0.0, -1.0, -1.0, -5.0).is_err());
        assert!(ScoringModel::new(1.0, -1.0, 0.0, -1.0, 2.0, 1.0).is_err());
        assert!(ScoringModel::new(1.0, -1.0, 0.0, -1.0, -5.0, -1.0).is_ok());
    }

    // ========================================================================
    // Scoring file parsing
    // ========================================================================

    #[test]
    fn test_parse_scoring_file() {
        let text = "\
# test model
gap_open -5
gap_extension -1   # trailing comment

nt_match 2
nt_mismatch -3
color_match 1
color_mismatch -2
";
        let model = ScoringModel::from_reader(Cursor::new(text)).unwrap();
        assert_eq!(model.gap_open(), -5.0);
        assert_eq!(model.gap_extension(), -1.0);
        assert_eq!(model.nt_score(b'C', b'C'), 2.0);
        assert_eq!(model.nt_score(b'C', b'T'), -3.0);
        assert_eq!(model.color_score(2, 2), 1.0);
        assert_eq!(model.color_score(2, 3), -2.0);
        assert_eq!(model.max_symbol_score(Space::Nucleotide), 2.0);
        assert_eq!(model.max_symbol_score(Space::Color), 3.0);
    }

    #[test]
    fn test_parse_explicit_rows() {
        let text = "gap_open -5\ngap_extension -1\nnt_row G -1 -1 7 -1 -1\ncolor_row 4 0 0 0 0 0\n";
        let model = ScoringModel::from_reader(Cursor::new(text)).unwrap();
        assert_eq!(model.nt_score(b'G', b'G'), 7.0);
        assert_eq!(model.nt_score(b'A', b'A'), defaults::NT_MATCH_SCORE);
        assert_eq!(model.max_nt_score(), defaults::NT_MATCH_SCORE.max(7.0));
        assert_eq!(model.color_score(4, 1), 0.0);
    }

    #[test]
    fn test_malformed_scoring_reports_line() {
        let text = "gap_open -5\ngap_extension abc\n";
        match ScoringModel::from_reader(Cursor::new(text)) {
            Err(AlignError::MalformedScoring { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected MalformedScoring, got {other:?}"),
        }

        let unknown = "gap_open -5\ngap_extension -1\nbonus 3\n";
        assert!(matches!(
            ScoringModel::from_reader(Cursor::new(unknown)),
            Err(AlignError::MalformedScoring { line: 3, .. })
        ));

        let missing = "gap_open -5\n";
        assert!(matches!(
            ScoringModel::from_reader(Cursor::new(missing)),
            Err(AlignError::MalformedScoring { .. })
        ));
    }
    // ========================================================================
    // Pair scoring
    // ========================================================================

    #[test]
    fn test_pair_scorer_color_space() {
        let model = ScoringModel::new(1.0, -1.0, 2.0, -3.0, -5.0, -1.0).unwrap();
        // read colours 0,1,3; reference colours 0,1,2
        let scorer = PairScorer::new(&model, Space::Color, b"ACG", b"ACT");
        assert_eq!(scorer.score(0, 0), 1.0 + 2.0);
        assert_eq!(scorer.score(2, 2), -1.0 - 3.0);
        assert_eq!(scorer.self_score(2), 1.0 + 2.0);
        assert_eq!(scorer.color_error(2, 2), Some(b'3'));
        assert_eq!(scorer.color_error(1, 1), Some(b'-'));

        let nt = PairScorer::new(&model, Space::Nucleotide, b"ACG", b"ACT");
        assert_eq!(nt.score(0, 0), 1.0);
        assert_eq!(nt.score(2, 2), -1.0);
        assert_eq!(nt.color_error(0, 0), None);
    }
}
