//! Ranking of scored probes and aggregation into fixed-size enrichment bins.

use crate::error::{MotifError, Result};
use crate::sequence;
use crate::table::{sum_counts, ScoredProbe};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::cmp::Ordering;
use std::ops::Range;

/// Sizes of the bins cut from a ranked table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinningParams {
    /// Probes per bin
    pub bin_size: usize,
    /// A bin is only cut while at least `bin_size + tail_buffer` probes remain
    pub tail_buffer: usize,
}

impl Default for BinningParams {
    fn default() -> Self {
        BinningParams {
            bin_size: 1000,
            tail_buffer: 10,
        }
    }
}

impl BinningParams {
    pub fn new(bin_size: usize, tail_buffer: usize) -> Result<Self> {
        let params = BinningParams {
            bin_size,
            tail_buffer,
        };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<()> {
        if self.bin_size == 0 {
            return Err(MotifError::invalid_parameter(
                "bin_size",
                self.bin_size,
                "must be positive",
            ));
        }
        Ok(())
    }

    /// Index ranges of the bins cut from `n` ranked probes
    fn windows(&self, n: usize) -> impl Iterator<Item = Range<usize>> {
        let BinningParams {
            bin_size,
            tail_buffer,
        } = *self;
        let required = bin_size.saturating_add(tail_buffer);
        (0..)
            .map(move |k| k * bin_size)
            .take_while(move |&start| n - start >= required)
            .map(move |start| start..start + bin_size)
    }

    /// Number of bins [`bin`] emits for `n` ranked probes
    pub fn bin_count(&self, n: usize) -> usize {
        let required = self.bin_size.saturating_add(self.tail_buffer);
        if n < required {
            0
        } else {
            (n - self.tail_buffer) / self.bin_size
        }
    }
}

/// Aggregate of one window of ranked probes
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bin {
    avg_score: f64,
    r0_sum: u64,
    r1_sum: u64,
    enrichment: Option<f64>,
}

impl Bin {
    fn from_window(window: &[ScoredProbe<'_>]) -> Result<Bin> {
        let avg_score = window.iter().map(|p| p.score).mean();
        let (r0_sum, r1_sum) = sum_counts(window.iter().map(|p| p.probe))?;
        let enrichment = if r0_sum == 0 {
            None
        } else {
            Some(r1_sum as f64 / r0_sum as f64)
        };
        Ok(Bin {
            avg_score,
            r0_sum,
            r1_sum,
            enrichment,
        })
    }

    pub fn avg_score(&self) -> f64 {
        self.avg_score
    }

    pub fn r0_sum(&self) -> u64 {
        self.r0_sum
    }

    pub fn r1_sum(&self) -> u64 {
        self.r1_sum
    }

    /// `r1_sum / r0_sum`, or `None` when `r0_sum` is zero
    pub fn enrichment(&self) -> Option<f64> {
        self.enrichment
    }

    pub fn is_enrichment_defined(&self) -> bool {
        self.enrichment.is_some()
    }
}

/// Bins in rank order, index 0 holding the highest-scoring probes
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct EnrichmentReport {
    bins: Vec<Bin>,
}

impl EnrichmentReport {
    pub fn bins(&self) -> &[Bin] {
        &self.bins
    }

    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    /// Bin of the highest-scoring probes
    pub fn top_bin(&self) -> Option<&Bin> {
        self.bins.first()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Bin> {
        self.bins.iter()
    }
}

impl IntoIterator for EnrichmentReport {
    type Item = Bin;
    type IntoIter = std::vec::IntoIter<Bin>;

    fn into_iter(self) -> Self::IntoIter {
        self.bins.into_iter()
    }
}

impl<'r> IntoIterator for &'r EnrichmentReport {
    type Item = &'r Bin;
    type IntoIter = std::slice::Iter<'r, Bin>;

    fn into_iter(self) -> Self::IntoIter {
        self.bins.iter()
    }
}

// Descending by score; NaN scores sink below every number.
fn by_score_descending(a: &ScoredProbe<'_>, b: &ScoredProbe<'_>) -> Ordering {
    match (a.score.is_nan(), b.score.is_nan()) {
        (false, false) => b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal),
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (true, true) => Ordering::Equal,
    }
}

/// Sorts scored probes by descending score.
///
/// The sort is stable: probes with equal scores keep their input order.
///
/// # Errors
/// * `MotifError::EmptyInput` - If `scored` is empty
pub fn rank<'a>(scored: &[ScoredProbe<'a>]) -> Result<Vec<ScoredProbe<'a>>> {
    if scored.is_empty() {
        return Err(MotifError::empty_input("no scored probes to rank"));
    }
    let mut ranked = scored.to_vec();
    ranked.sort_by(by_score_descending);
    Ok(ranked)
}

/// Cuts ranked probes into consecutive bins of exactly `bin_size` probes.
///
/// A bin is cut only while at least `bin_size + tail_buffer` probes remain; the
/// remainder is discarded rather than reported as a short final bin. Fewer than
/// `bin_size + tail_buffer` probes gives an empty report.
///
/// # Errors
/// * `MotifError::EmptyInput` - If `ranked` is empty
/// * `MotifError::InvalidParameter` - If `bin_size` is zero
/// * `MotifError::DataError` - If a bin's read count sum overflows
pub fn bin(ranked: &[ScoredProbe<'_>], params: &BinningParams) -> Result<EnrichmentReport> {
    if ranked.is_empty() {
        return Err(MotifError::empty_input("no ranked probes to bin"));
    }
    params.validate()?;

    let bins = params
        .windows(ranked.len())
        .map(|range| Bin::from_window(&ranked[range]))
        .collect::<Result<Vec<Bin>>>()?;

    log::debug!(
        "cut {} bins of {} from {} ranked probes, discarded {}",
        bins.len(),
        params.bin_size,
        ranked.len(),
        ranked.len() - bins.len() * params.bin_size
    );

    Ok(EnrichmentReport { bins })
}

/// Enrichment of the top `size` ranked probes
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CurvePoint {
    pub size: usize,
    pub enrichment: f64,
}

/// Enrichment of the top-ranked bin as a function of its size.
///
/// For every prefix size `k` from `min_size` to `ranked.len()`, computes
/// `(sum r1 + pseudocount) / (sum r0 + pseudocount)` over the top `k` probes.
///
/// # Errors
/// * `MotifError::EmptyInput` - If `ranked` is empty
/// * `MotifError::InvalidParameter` - If `min_size` is zero or `pseudocount` is not positive
/// * `MotifError::DataError` - If a read count sum overflows
pub fn top_bin_enrichment_curve(
    ranked: &[ScoredProbe<'_>],
    min_size: usize,
    pseudocount: f64,
) -> Result<Vec<CurvePoint>> {
    if ranked.is_empty() {
        return Err(MotifError::empty_input("no ranked probes for enrichment curve"));
    }
    if min_size == 0 {
        return Err(MotifError::invalid_parameter("min_size", min_size, "must be positive"));
    }
    if !(pseudocount > 0.0) {
        return Err(MotifError::invalid_parameter(
            "pseudocount",
            pseudocount,
            "must be positive",
        ));
    }

    let mut r0 = 0u64;
    let mut r1 = 0u64;
    let mut curve = Vec::with_capacity((ranked.len() + 1).saturating_sub(min_size));
    for (i, probe) in ranked.iter().enumerate() {
        (r0, r1) = match (
            r0.checked_add(probe.probe.r0_count),
            r1.checked_add(probe.probe.r1_count),
        ) {
            (Some(r0), Some(r1)) => (r0, r1),
            _ => return Err(MotifError::DataError("read count sum overflows u64".into())),
        };
        let size = i + 1;
        if size >= min_size {
            curve.push(CurvePoint {
                size,
                enrichment: (r1 as f64 + pseudocount) / (r0 as f64 + pseudocount),
            });
        }
    }
    Ok(curve)
}

/// A bin ranked by one model, annotated with the mean score of a second (co-factor) model
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CofactorBin {
    #[serde(flatten)]
    pub bin: Bin,
    pub avg_cofactor_score: f64,
}

/// Bins probes ranked by a reference model and averages a co-factor score per bin.
///
/// `cofactor_scores` is indexed by each probe's original table index.
///
/// # Errors
/// * As [`bin`]
/// * `MotifError::InvalidParameter` - If a probe index has no co-factor score
pub fn bin_with_cofactor(
    ranked: &[ScoredProbe<'_>],
    cofactor_scores: &[f64],
    params: &BinningParams,
) -> Result<Vec<CofactorBin>> {
    if ranked.is_empty() {
        return Err(MotifError::empty_input("no ranked probes to bin"));
    }
    params.validate()?;

    params
        .windows(ranked.len())
        .map(|range| {
            let window = &ranked[range];
            let cofactor = window
                .iter()
                .map(|p| {
                    cofactor_scores.get(p.index).copied().ok_or_else(|| {
                        MotifError::invalid_parameter(
                            "cofactor_scores",
                            cofactor_scores.len(),
                            format!("no co-factor score for probe {}", p.index),
                        )
                    })
                })
                .collect::<Result<Vec<f64>>>()?;
            Ok(CofactorBin {
                bin: Bin::from_window(window)?,
                avg_cofactor_score: cofactor.mean(),
            })
        })
        .collect()
}

/// A bin annotated with the mean base and dinucleotide composition of its probes
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CompositionBin {
    #[serde(flatten)]
    pub bin: Bin,
    /// Mean fraction of A, C, G, T
    pub mononucleotide: [f64; 4],
    /// Mean dinucleotide fractions in [`sequence::DINUCLEOTIDES`] order
    pub dinucleotide: [f64; 16],
}

/// Bins ranked probes and averages per-probe sequence composition in each bin.
///
/// Per probe, see [`sequence::composition`] and [`sequence::dinucleotide_composition`].
///
/// # Errors
/// * As [`bin`]
/// * `MotifError::InvalidBase` or `MotifError::EmptyInput` for a probe whose composition is undefined
pub fn bin_composition(
    ranked: &[ScoredProbe<'_>],
    params: &BinningParams,
) -> Result<Vec<CompositionBin>> {
    if ranked.is_empty() {
        return Err(MotifError::empty_input("no ranked probes to bin"));
    }
    params.validate()?;

    params
        .windows(ranked.len())
        .map(|range| {
            let window = &ranked[range];
            let mut mononucleotide = [0.0; 4];
            let mut dinucleotide = [0.0; 16];
            for probe in window {
                let mono = sequence::composition(&probe.probe.sequence)?;
                let di = sequence::dinucleotide_composition(&probe.probe.sequence)?;
                mononucleotide.iter_mut().zip(mono).for_each(|(sum, f)| *sum += f);
                dinucleotide.iter_mut().zip(di).for_each(|(sum, f)| *sum += f);
            }
            let n = window.len() as f64;
            Ok(CompositionBin {
                bin: Bin::from_window(window)?,
                mononucleotide: mononucleotide.map(|sum| sum / n),
                dinucleotide: dinucleotide.map(|sum| sum / n),
            })
        })
        .collect()
}
