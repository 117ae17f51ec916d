//! Serialization of enrichment reports for plotting and persistence.
//!
//! Both formats carry one record per bin in rank order with the fields
//! `bin, avg_score, r0_sum, r1_sum, enrichment`. An undefined enrichment
//! (zero round-0 reads) is written as `NA` in TSV and `null` in JSON.

use crate::binning::{CurvePoint, EnrichmentReport};
use crate::error::{MotifError, Result};
use polars::prelude::*;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Column order of a tabular report.
///
/// `bin` is the rank-order index; dropping it leaves the record
/// `(avg_score, r0_sum, r1_sum, enrichment)`.
pub const REPORT_COLUMNS: [&str; 5] = ["bin", "avg_score", "r0_sum", "r1_sum", "enrichment"];

/// Marker written for an undefined enrichment in TSV output
pub const UNDEFINED_ENRICHMENT: &str = "NA";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Tsv,
    Json,
}

impl ReportFormat {
    /// Picks the format from a file extension: `.json` or `.tsv`/`.txt`
    pub fn from_path(path: &Path) -> Result<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Ok(ReportFormat::Json),
            Some("tsv") | Some("txt") => Ok(ReportFormat::Tsv),
            other => Err(MotifError::invalid_parameter(
                "output",
                other.unwrap_or(""),
                "extension must be .tsv, .txt or .json",
            )),
        }
    }
}

/// Converts a report into a DataFrame with the columns of [`REPORT_COLUMNS`]
pub fn to_dataframe(report: &EnrichmentReport) -> Result<DataFrame> {
    let bins = report.bins();
    DataFrame::new(vec![
        Column::new(
            REPORT_COLUMNS[0].into(),
            (0..bins.len() as u64).collect::<Vec<u64>>(),
        ),
        Column::new(
            REPORT_COLUMNS[1].into(),
            bins.iter().map(|b| b.avg_score()).collect::<Vec<f64>>(),
        ),
        Column::new(
            REPORT_COLUMNS[2].into(),
            bins.iter().map(|b| b.r0_sum()).collect::<Vec<u64>>(),
        ),
        Column::new(
            REPORT_COLUMNS[3].into(),
            bins.iter().map(|b| b.r1_sum()).collect::<Vec<u64>>(),
        ),
        Column::new(
            REPORT_COLUMNS[4].into(),
            bins.iter().map(|b| b.enrichment()).collect::<Vec<Option<f64>>>(),
        ),
    ])
    .map_err(|e| MotifError::DataError(e.to_string()))
}

/// Converts an enrichment-vs-size curve into a DataFrame with columns "size" and "enrichment"
pub fn curve_to_dataframe(curve: &[CurvePoint]) -> Result<DataFrame> {
    DataFrame::new(vec![
        Column::new(
            "size".into(),
            curve.iter().map(|p| p.size as u64).collect::<Vec<u64>>(),
        ),
        Column::new(
            "enrichment".into(),
            curve.iter().map(|p| p.enrichment).collect::<Vec<f64>>(),
        ),
    ])
    .map_err(|e| MotifError::DataError(e.to_string()))
}

/// Writes a DataFrame as tab-separated text with a header row
pub fn write_tsv<W: Write>(df: &mut DataFrame, mut writer: W) -> Result<()> {
    CsvWriter::new(&mut writer)
        .include_header(true)
        .with_separator(b'\t')
        .with_null_value(UNDEFINED_ENRICHMENT.to_string())
        .finish(df)
        .map_err(|e| MotifError::DataError(e.to_string()))
}

#[derive(Serialize)]
struct BinRecord {
    bin: usize,
    avg_score: f64,
    r0_sum: u64,
    r1_sum: u64,
    enrichment: Option<f64>,
}

/// Writes a report as a JSON array of bin records
pub fn write_json<W: Write>(report: &EnrichmentReport, writer: W) -> Result<()> {
    let records: Vec<BinRecord> = report
        .iter()
        .enumerate()
        .map(|(bin, b)| BinRecord {
            bin,
            avg_score: b.avg_score(),
            r0_sum: b.r0_sum(),
            r1_sum: b.r1_sum(),
            enrichment: b.enrichment(),
        })
        .collect();
    serde_json::to_writer_pretty(writer, &records)
        .map_err(|e| MotifError::DataError(format!("JSON encode error: {}", e)))
}

/// Writes a report to `filename` in the format its extension names.
///
/// # Errors
/// * Returns `MotifError::InvalidParameter` for an unsupported extension
/// * Returns `MotifError::Io` for file writing issues
pub fn write_report(report: &EnrichmentReport, filename: &str) -> Result<()> {
    let path = Path::new(filename);
    let format = ReportFormat::from_path(path)?;
    let mut writer = BufWriter::new(File::create(path)?);
    match format {
        ReportFormat::Tsv => write_tsv(&mut to_dataframe(report)?, &mut writer)?,
        ReportFormat::Json => write_json(report, &mut writer)?,
    }
    writer.flush()?;
    log::info!("wrote {} bins to {}", report.len(), filename);
    Ok(())
}
