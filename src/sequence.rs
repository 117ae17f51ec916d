use crate::error::{MotifError, Result};
use crate::types::Base;
use phf::phf_map;

static BASES: phf::Map<u8, Base> = phf_map! {
    b'A' => Base::A,
    b'C' => Base::C,
    b'G' => Base::G,
    b'T' => Base::T,
};

/// Converts a DNA sequence into its base codes.
///
/// # Arguments
/// * `sequence` - Input DNA sequence, uppercase A/C/G/T only
///
/// # Returns
/// * `Result<Vec<Base>>` - One [`Base`] per input character
///
/// # Errors
/// * Returns `MotifError::InvalidBase` with the byte offset of the first character outside {A,C,G,T}
pub fn encode(sequence: &str) -> Result<Vec<Base>> {
    sequence
        .bytes()
        .enumerate()
        .map(|(position, byte)| {
            BASES
                .get(&byte)
                .copied()
                .ok_or_else(|| invalid_char_at(sequence, position, byte))
        })
        .collect()
}

/// Generates the reverse complement of a DNA sequence.
///
/// # Arguments
/// * `sequence` - Input DNA sequence string
///
/// # Returns
/// * `Result<String>` - The reverse complement sequence where:
///   - A ↔ T
///   - C ↔ G
///
/// # Errors
/// * Returns `MotifError::InvalidBase` if the input contains characters other than A, T, C, or G
pub fn reverse_complement(sequence: &str) -> Result<String> {
    let bases = encode(sequence)?;
    Ok(bases.iter().rev().map(|b| b.complement().as_char()).collect())
}

// Report the full character rather than a lone UTF-8 continuation byte.
fn invalid_char_at(sequence: &str, position: usize, byte: u8) -> MotifError {
    match sequence.get(position..).and_then(|rest| rest.chars().next()) {
        Some(c) => MotifError::InvalidBase { position, base: c },
        None => MotifError::invalid_base(position, byte),
    }
}

/// Dinucleotides in the order of [`dinucleotide_composition`]: AA, AC, ..., TT
pub const DINUCLEOTIDES: [&str; 16] = [
    "AA", "AC", "AG", "AT", "CA", "CC", "CG", "CT", "GA", "GC", "GG", "GT", "TA", "TC", "TG",
    "TT",
];

/// Fraction of each base in a sequence, in A, C, G, T order.
///
/// # Errors
/// * Returns `MotifError::EmptyInput` for an empty sequence
/// * Returns `MotifError::InvalidBase` for a character outside {A,C,G,T}
pub fn composition(sequence: &str) -> Result<[f64; 4]> {
    let bases = encode(sequence)?;
    if bases.is_empty() {
        return Err(MotifError::empty_input("composition of an empty sequence"));
    }
    let mut counts = [0usize; 4];
    for base in &bases {
        counts[base.index()] += 1;
    }
    Ok(counts.map(|c| c as f64 / bases.len() as f64))
}

/// Count of each overlapping dinucleotide divided by the sequence length, in [`DINUCLEOTIDES`] order.
///
/// A sequence of length `n` has `n - 1` dinucleotides, so the fractions sum to `(n - 1) / n`.
///
/// # Errors
/// * Returns `MotifError::EmptyInput` for an empty sequence
/// * Returns `MotifError::InvalidBase` for a character outside {A,C,G,T}
pub fn dinucleotide_composition(sequence: &str) -> Result<[f64; 16]> {
    let bases = encode(sequence)?;
    if bases.is_empty() {
        return Err(MotifError::empty_input("composition of an empty sequence"));
    }
    let mut counts = [0usize; 16];
    for pair in bases.windows(2) {
        counts[pair[0].index() * 4 + pair[1].index()] += 1;
    }
    Ok(counts.map(|c| c as f64 / bases.len() as f64))
}
