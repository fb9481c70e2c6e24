//! # Sequence Encodings
//!
//! Reads can be represented in two spaces:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │  Primary (nucleotide):  A C G T N                                    │
//! │  Secondary (colour):    start base + one transition colour per base  │
//! │                                                                      │
//! │      A  C  G  T                                                      │
//! │   A  0  1  2  3        colour(a, b) = code(a) XOR code(b)            │
//! │   C  1  0  3  2        any N on either side gives colour 4           │
//! │   G  2  3  0  1                                                      │
//! │   T  3  2  1  0                                                      │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Colour `i` of an encoded read depends on bases `i-1` and `i`, with a
//! synthetic start base standing in for base `-1`. Decoding is therefore
//! impossible without the start base, which is carried as the first symbol
//! of the encoded sequence.

use crate::error::{AlignError, Result};

/// Code used for N and any other ambiguous nucleotide.
pub const AMBIGUOUS_CODE: u8 = 4;

const DNA: [u8; 5] = [b'A', b'C', b'G', b'T', b'N'];

// ============================================================================
// NUCLEOTIDE HELPERS
// ============================================================================

/// Convert ASCII base to 2-bit code.
///
/// - A/a → 0
/// - C/c → 1
/// - G/g → 2
/// - T/t → 3
/// - N/n/other → 4
#[inline]
pub fn base_to_code(base: u8) -> u8 {
    match base {
        b'A' | b'a' => 0,
        b'C' | b'c' => 1,
        b'G' | b'g' => 2,
        b'T' | b't' => 3,
        _ => AMBIGUOUS_CODE,
    }
}

#[inline]
pub fn code_to_base(code: u8) -> u8 {
    DNA[code.min(AMBIGUOUS_CODE) as usize]
}

/// Complement of an ASCII base (A↔T, C↔G, anything else → N), upper-cased.
#[inline]
pub fn complement_base(base: u8) -> u8 {
    match base {
        b'A' | b'a' => b'T',
        b'C' | b'c' => b'G',
        b'G' | b'g' => b'C',
        b'T' | b't' => b'A',
        _ => b'N',
    }
}

pub fn reverse_complement(seq: &[u8]) -> Vec<u8> {
    seq.iter().rev().map(|&b| complement_base(b)).collect()
}

/// Upper-case ACGT, everything else collapses to N.
pub fn normalize_base(base: u8) -> u8 {
    code_to_base(base_to_code(base))
}

// ============================================================================
// COLOUR (TRANSITION) ENCODING
// ============================================================================

fn strict_code(base: u8, position: usize) -> Result<u8> {
    match base {
        b'N' | b'n' => Ok(AMBIGUOUS_CODE),
        b'A' | b'a' | b'C' | b'c' | b'G' | b'g' | b'T' | b't' => Ok(base_to_code(base)),
        _ => Err(AlignError::InvalidTransitionSymbol {
            symbol: base as char,
            position,
        }),
    }
}

/// Colour code (0..=4) for the transition between two nucleotide codes.
#[inline]
pub fn transition_code(prev: u8, next: u8) -> u8 {
    if prev >= AMBIGUOUS_CODE || next >= AMBIGUOUS_CODE {
        AMBIGUOUS_CODE
    } else {
        prev ^ next
    }
}

/// Colour character (`b'0'..=b'4'`) to its code, or `None` for anything else.
#[inline]
pub fn color_char_to_code(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'4' => Some(c - b'0'),
        _ => None,
    }
}

#[inline]
pub fn color_code_to_char(code: u8) -> u8 {
    b'0' + code.min(AMBIGUOUS_CODE)
}

/// Colours of the transitions of `seq`, starting from `start`.
///
/// Returns one colour character per input base (no leading start symbol).
pub fn transition_colors(seq: &[u8], start: u8) -> Result<Vec<u8>> {
    let mut prev = strict_code(start, 0)?;
    let mut colors = Vec::with_capacity(seq.len());
    for (i, &base) in seq.iter().enumerate() {
        let code = strict_code(base, i + 1)?;
        colors.push(color_code_to_char(transition_code(prev, code)));
        prev = code;
    }
    Ok(colors)
}

/// Encode a nucleotide sequence into secondary space.
///
/// The output is `start` followed by one colour character per input base, so
/// it is one symbol longer than the input.
pub fn to_secondary_space(seq: &[u8], start: u8) -> Result<Vec<u8>> {
    let colors = transition_colors(seq, start)?;
    let mut encoded = Vec::with_capacity(colors.len() + 1);
    encoded.push(normalize_base(start));
    encoded.extend_from_slice(&colors);
    Ok(encoded)
}

/// Decode a secondary-space sequence back into nucleotides.
///
/// The first symbol is the start base and is consumed, so the output is one
/// symbol shorter than the input. Once an unknown colour (or N) is decoded,
/// every following base is N.
pub fn from_secondary_space(encoded: &[u8]) -> Result<Vec<u8>> {
    let Some((&start, colors)) = encoded.split_first() else {
        return Ok(Vec::new());
    };
    let mut prev = strict_code(start, 0)?;
    let mut decoded = Vec::with_capacity(colors.len());
    for (i, &c) in colors.iter().enumerate() {
        let color = color_char_to_code(c).ok_or(AlignError::InvalidTransitionSymbol {
            symbol: c as char,
            position: i + 1,
        })?;
        let base = transition_code(prev, color);
        decoded.push(code_to_base(base));
        prev = base;
    }
    Ok(decoded)
}

/// Re-encode a secondary-space read so that it starts from `new_start`.
///
/// Only the first colour changes: it becomes the transition from the new
/// start base to the first decoded base.
pub fn normalize_start(encoded: &[u8], new_start: u8) -> Result<Vec<u8>> {
    if encoded.first().map(|&b| normalize_base(b)) == Some(normalize_base(new_start)) {
        return Ok(encoded.to_vec());
    }
    let decoded = from_secondary_space(encoded)?;
    to_secondary_space(&decoded, new_start)
}

// ============================================================================
// UNIT TESTS
// ============================================================================
