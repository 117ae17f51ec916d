//! Reduces probe sequences to one score per probe under an affinity model.

use crate::error::{MotifError, Result};
use crate::motif::AffinityModel;
use crate::sequence;
use crate::table::{ProbeTable, ScoredProbe};
use crate::types::Base;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use statrs::statistics::{Data, Median, Statistics};

/// How per-window values are accumulated into a probe score
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoringMode {
    /// Plain sum of window scores over the raw model
    #[default]
    Additive,
    /// Sum of `exp(window score)` over the mean-centered model
    Exponential,
}

/// Which window offsets of a probe are scanned
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WindowRange {
    /// Offsets `0..=len - L - 2`, stopping two short of the last full window
    #[default]
    StopShort,
    /// Every full window, offsets `0..=len - L`
    Complete,
}

/// What to do with a probe that cannot be scored
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// Leave the probe out of the scored table and keep going
    #[default]
    Skip,
    /// Fail the whole table on the first probe (in table order) that cannot be scored
    Abort,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringOptions {
    pub mode: ScoringMode,
    pub include_reverse_complement: bool,
    pub window_range: WindowRange,
    pub on_invalid: ErrorPolicy,
}

impl Default for ScoringOptions {
    fn default() -> Self {
        ScoringOptions {
            mode: ScoringMode::Additive,
            include_reverse_complement: true,
            window_range: WindowRange::StopShort,
            on_invalid: ErrorPolicy::Skip,
        }
    }
}

/// A probe left out of scoring, with the reason
#[derive(Debug)]
pub struct ProbeFailure {
    pub index: usize,
    pub error: MotifError,
}

/// Result of scoring a table: scored probes in table order plus any skipped probes
#[derive(Debug)]
pub struct ScoredTable<'a> {
    pub scored: Vec<ScoredProbe<'a>>,
    pub skipped: Vec<ProbeFailure>,
}

/// Scores a single window of exactly `model.length()` bases.
///
/// Sums `weight(base_i, i)` over the window; with `include_reverse_complement` the
/// reverse complement of the window is scored against the same model and added.
///
/// # Errors
/// * `MotifError::InvalidBase` - If the window contains a character outside {A,C,G,T}
/// * `MotifError::InvalidParameter` - If the window length differs from the model length
pub fn score_window(
    model: &AffinityModel,
    window: &str,
    include_reverse_complement: bool,
) -> Result<f64> {
    let bases = sequence::encode(window)?;
    if bases.len() != model.length() {
        return Err(MotifError::invalid_parameter(
            "window",
            window,
            format!("length must equal model length {}", model.length()),
        ));
    }
    Ok(window_value(model, &bases, include_reverse_complement))
}

fn window_value(model: &AffinityModel, window: &[Base], include_reverse_complement: bool) -> f64 {
    let forward = model.forward_sum(window);
    if include_reverse_complement {
        forward + model.reverse_complement_sum(window)
    } else {
        forward
    }
}

/// Number of window offsets scanned for a sequence of `len` bases
fn offset_count(len: usize, model_length: usize, window_range: WindowRange) -> usize {
    let margin = match window_range {
        WindowRange::StopShort => 2,
        WindowRange::Complete => 0,
    };
    // offsets 0..=len - L - margin
    (len + 1).saturating_sub(model_length + margin)
}

/// Scores a whole probe sequence against an already transformed model
fn accumulate(
    model: &AffinityModel,
    bases: &[Base],
    mode: ScoringMode,
    include_reverse_complement: bool,
    window_range: WindowRange,
) -> f64 {
    let length = model.length();
    let offsets = offset_count(bases.len(), length, window_range);
    let windows = (0..offsets)
        .map(|i| window_value(model, &bases[i..i + length], include_reverse_complement));
    match mode {
        ScoringMode::Additive => windows.sum(),
        ScoringMode::Exponential => windows.map(f64::exp).sum(),
    }
}

/// The model a mode scores against: exponential scoring needs centered weights
fn model_for_mode(model: &AffinityModel, mode: ScoringMode) -> Cow<'_, AffinityModel> {
    match mode {
        ScoringMode::Additive => Cow::Borrowed(model),
        ScoringMode::Exponential => Cow::Owned(model.centered()),
    }
}

fn score_prepared(model: &AffinityModel, sequence: &str, options: &ScoringOptions) -> Result<f64> {
    let bases = sequence::encode(sequence)?;
    if bases.len() < model.length() {
        return Err(MotifError::SequenceTooShort {
            length: bases.len(),
            required: model.length(),
        });
    }
    Ok(accumulate(
        model,
        &bases,
        options.mode,
        options.include_reverse_complement,
        options.window_range,
    ))
}

/// Scores a probe sequence by sliding the model across it.
///
/// Windows start at offsets `0..=len - L - 2` (or every full window under
/// [`WindowRange::Complete`]). The accumulator starts at 0, so a sequence with no
/// scanned offsets scores exactly 0 in either mode. In [`ScoringMode::Exponential`]
/// the model is mean-centered before scoring.
///
/// # Errors
/// * `MotifError::InvalidBase` - If the sequence contains a character outside {A,C,G,T}
/// * `MotifError::SequenceTooShort` - If the sequence is shorter than the model
pub fn score_sequence(
    model: &AffinityModel,
    sequence: &str,
    options: &ScoringOptions,
) -> Result<f64> {
    let model = model_for_mode(model, options.mode);
    score_prepared(&model, sequence, options)
}

/// Scores every probe of a table, in parallel, preserving table order.
///
/// Under [`ErrorPolicy::Skip`] probes that fail are reported in `skipped` and
/// left out of `scored`; under [`ErrorPolicy::Abort`] the first failure in table
/// order is returned.
pub fn score_table<'a>(
    model: &AffinityModel,
    table: &'a ProbeTable,
    options: &ScoringOptions,
) -> Result<ScoredTable<'a>> {
    let prepared = model_for_mode(model, options.mode);
    let results: Vec<Result<f64>> = table
        .probes()
        .par_iter()
        .map(|probe| score_prepared(&prepared, &probe.sequence, options))
        .collect();

    let mut scored = Vec::with_capacity(results.len());
    let mut skipped = Vec::new();
    for (index, (probe, result)) in table.iter().zip(results).enumerate() {
        match result {
            Ok(score) => scored.push(ScoredProbe::new(index, probe, score)),
            Err(error) if options.on_invalid == ErrorPolicy::Skip && error.is_per_probe() => {
                skipped.push(ProbeFailure { index, error })
            }
            Err(error) => return Err(error),
        }
    }

    if !skipped.is_empty() {
        log::warn!(
            "skipped {} of {} probes that could not be scored (first at row {}: {})",
            skipped.len(),
            table.len(),
            skipped[0].index,
            skipped[0].error
        );
    }
    log::debug!("scored {} probes against {}", scored.len(), model.label());

    Ok(ScoredTable { scored, skipped })
}

/// Distribution of scores a model assigns to a set of sequences
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreSummary {
    pub count: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
}

/// Scores background sequences (e.g. random k-mers) and summarises the scores.
///
/// # Errors
/// * `MotifError::EmptyInput` - If no sequences are given
/// * Any scoring error of the first sequence that fails
pub fn score_distribution<S: AsRef<str> + Sync>(
    model: &AffinityModel,
    sequences: &[S],
    options: &ScoringOptions,
) -> Result<ScoreSummary> {
    if sequences.is_empty() {
        return Err(MotifError::empty_input("no sequences to score"));
    }
    let prepared = model_for_mode(model, options.mode);
    let scores = sequences
        .par_iter()
        .map(|s| score_prepared(&prepared, s.as_ref(), options))
        .collect::<Vec<_>>()
        .into_iter()
        .collect::<Result<Vec<f64>>>()?;

    let min = scores.iter().copied().fold(f64::INFINITY, f64::min);
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mean = Statistics::mean(scores.iter());
    // sample standard deviation is undefined for a single value
    let std_dev = if scores.len() > 1 {
        Statistics::std_dev(scores.iter())
    } else {
        0.0
    };
    let count = scores.len();
    let median = Data::new(scores).median();

    Ok(ScoreSummary {
        count,
        mean,
        std_dev,
        median,
        min,
        max,
    })
}
