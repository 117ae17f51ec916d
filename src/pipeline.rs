//! Score, rank and bin a probe table in one call.

use crate::binning::{self, BinningParams, EnrichmentReport};
use crate::error::Result;
use crate::motif::AffinityModel;
use crate::scoring::{self, ProbeFailure, ScoringOptions};
use crate::table::{ProbeTable, ScoredProbe};
use rayon::prelude::*;

/// Outcome of analysing one table against one model
#[derive(Debug)]
pub struct Analysis {
    pub report: EnrichmentReport,
    /// Probes left out under [`scoring::ErrorPolicy::Skip`]
    pub skipped: Vec<ProbeFailure>,
}

/// [`Analysis`] together with the ranking the report was cut from
#[derive(Debug)]
pub struct RankedAnalysis<'a> {
    /// Scored probes by descending score
    pub ranked: Vec<ScoredProbe<'a>>,
    pub report: EnrichmentReport,
    pub skipped: Vec<ProbeFailure>,
}

impl From<RankedAnalysis<'_>> for Analysis {
    fn from(analysis: RankedAnalysis<'_>) -> Self {
        Analysis {
            report: analysis.report,
            skipped: analysis.skipped,
        }
    }
}

/// Scores every probe, ranks by descending score and bins the ranked probes,
/// keeping the ranking for further aggregation.
///
/// # Errors
/// * `MotifError::EmptyInput` - If no probe could be scored
/// * Any error of [`scoring::score_table`] or [`binning::bin`]
pub fn rank_and_bin<'a>(
    model: &AffinityModel,
    table: &'a ProbeTable,
    options: &ScoringOptions,
    params: &BinningParams,
) -> Result<RankedAnalysis<'a>> {
    params.validate()?;
    let scored = scoring::score_table(model, table, options)?;
    let ranked = binning::rank(&scored.scored)?;
    let report = binning::bin(&ranked, params)?;
    log::info!(
        "{}: {} probes scored, {} skipped, {} bins",
        model.label(),
        scored.scored.len(),
        scored.skipped.len(),
        report.len()
    );
    Ok(RankedAnalysis {
        ranked,
        report,
        skipped: scored.skipped,
    })
}

/// Scores every probe, ranks by descending score and bins the ranked probes.
///
/// # Errors
/// * As [`rank_and_bin`]
pub fn analyze(
    model: &AffinityModel,
    table: &ProbeTable,
    options: &ScoringOptions,
    params: &BinningParams,
) -> Result<Analysis> {
    rank_and_bin(model, table, options, params).map(Analysis::from)
}

/// Runs [`analyze`] on independent (model, table) jobs in parallel.
///
/// Results are returned in job order; one job failing does not affect the others.
pub fn analyze_many(
    jobs: &[(&AffinityModel, &ProbeTable)],
    options: &ScoringOptions,
    params: &BinningParams,
) -> Vec<Result<Analysis>> {
    jobs.par_iter()
        .map(|(model, table)| analyze(model, table, options, params))
        .collect()
}
