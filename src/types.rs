use crate::motif::AffinityModel;
use ndarray::Array2;
use std::collections::HashMap;

/// Dense log-affinity matrix, one row per base (A, C, G, T) and one column per position
pub type WeightMatrix = Array2<f64>;

/// Collection of affinity models indexed by motif ID
pub type ModelCollection = HashMap<String, AffinityModel>;

/// Nucleotide alphabet in row order of a [`WeightMatrix`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Base {
    A,
    C,
    G,
    T,
}

impl Base {
    pub const ALL: [Base; 4] = [Base::A, Base::C, Base::G, Base::T];

    /// Row index of this base in a weight matrix
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn complement(self) -> Base {
        match self {
            Base::A => Base::T,
            Base::C => Base::G,
            Base::G => Base::C,
            Base::T => Base::A,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Base::A => 'A',
            Base::C => 'C',
            Base::G => 'G',
            Base::T => 'T',
        }
    }
}
