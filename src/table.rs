use crate::error::{MotifError, Result};
use flate2::read::GzDecoder;
use polars::prelude::*;
use std::fs::File;
use std::io::{Cursor, Read};
use std::path::Path;
use std::sync::Arc;

/// One probe of a selection experiment with its read counts in both rounds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Probe {
    pub sequence: String,
    pub r0_count: u64,
    pub r1_count: u64,
}

impl Probe {
    pub fn new(sequence: impl Into<String>, r0_count: u64, r1_count: u64) -> Self {
        Probe {
            sequence: sequence.into(),
            r0_count,
            r1_count,
        }
    }
}

/// Ordered, read-only collection of probes as produced by the table builder.
///
/// Order is preserved from the source and is what ties are broken by when ranking.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeTable {
    probes: Vec<Probe>,
}

impl ProbeTable {
    pub fn new(probes: Vec<Probe>) -> Self {
        ProbeTable { probes }
    }

    pub fn probes(&self) -> &[Probe] {
        &self.probes
    }

    pub fn len(&self) -> usize {
        self.probes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.probes.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Probe> {
        self.probes.iter()
    }

    /// Total round-0 and round-1 reads across the table
    ///
    /// # Errors
    /// * Returns `MotifError::DataError` if a total does not fit in a `u64`
    pub fn totals(&self) -> Result<(u64, u64)> {
        sum_counts(&self.probes)
    }

    /// Number of probes, and of probes seen at least once in round 0 and in round 1
    pub fn probe_counts(&self) -> ProbeCounts {
        ProbeCounts {
            total: self.probes.len(),
            in_r0: self.probes.iter().filter(|p| p.r0_count > 0).count(),
            in_r1: self.probes.iter().filter(|p| p.r1_count > 0).count(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeCounts {
    pub total: usize,
    pub in_r0: usize,
    pub in_r1: usize,
}

/// Sums round-0 and round-1 reads, failing instead of wrapping on overflow
pub(crate) fn sum_counts<'p, I>(probes: I) -> Result<(u64, u64)>
where
    I: IntoIterator<Item = &'p Probe>,
{
    probes.into_iter().try_fold((0u64, 0u64), |(r0, r1), probe| {
        match (r0.checked_add(probe.r0_count), r1.checked_add(probe.r1_count)) {
            (Some(r0), Some(r1)) => Ok((r0, r1)),
            _ => Err(MotifError::DataError(
                "read count sum overflows u64".into(),
            )),
        }
    })
}

impl FromIterator<Probe> for ProbeTable {
    fn from_iter<I: IntoIterator<Item = Probe>>(iter: I) -> Self {
        ProbeTable::new(iter.into_iter().collect())
    }
}

impl<S: Into<String>> FromIterator<(S, u64, u64)> for ProbeTable {
    fn from_iter<I: IntoIterator<Item = (S, u64, u64)>>(iter: I) -> Self {
        iter.into_iter()
            .map(|(sequence, r0, r1)| Probe::new(sequence, r0, r1))
            .collect()
    }
}

impl<'a> IntoIterator for &'a ProbeTable {
    type Item = &'a Probe;
    type IntoIter = std::slice::Iter<'a, Probe>;

    fn into_iter(self) -> Self::IntoIter {
        self.probes.iter()
    }
}

/// A probe paired with the score one model assigned it.
///
/// `index` is the probe's position in the table it was scored from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredProbe<'a> {
    pub index: usize,
    pub probe: &'a Probe,
    pub score: f64,
}

impl<'a> ScoredProbe<'a> {
    pub fn new(index: usize, probe: &'a Probe, score: f64) -> Self {
        ScoredProbe {
            index,
            probe,
            score,
        }
    }
}

fn count_table_schema() -> Schema {
    Schema::from_iter([
        Field::new("sequence".into(), DataType::String),
        Field::new("r0".into(), DataType::Int64),
        Field::new("r1".into(), DataType::Int64),
    ])
}

/// Reads a count table into a DataFrame.
///
/// # Arguments
/// * `filename` - Path to a headerless, tab-separated table; gzip-compressed when it ends in `.gz`
///
/// # Returns
/// * `Result<DataFrame>` - A DataFrame with columns "sequence", "r0" and "r1"
///
/// # Errors
/// * Returns `MotifError::Io` for file reading issues
/// * Returns `MotifError::InvalidFileFormat` if the table cannot be parsed
pub fn read_count_table_df(filename: &str) -> Result<DataFrame> {
    let path = Path::new(filename);
    let options = CsvReadOptions::default()
        .with_has_header(false)
        .with_schema(Some(Arc::new(count_table_schema())))
        .with_parse_options(CsvParseOptions::default().with_separator(b'\t'));

    let parsed = if path.extension().is_some_and(|ext| ext == "gz") {
        let mut bytes = Vec::new();
        GzDecoder::new(File::open(path)?).read_to_end(&mut bytes)?;
        options.into_reader_with_file_handle(Cursor::new(bytes)).finish()
    } else {
        options
            .into_reader_with_file_handle(File::open(path)?)
            .finish()
    };

    parsed.map_err(|e| MotifError::InvalidFileFormat(format!("{}: {}", filename, e)))
}

/// Converts a DataFrame with "sequence", "r0" and "r1" columns into a [`ProbeTable`]
///
/// # Errors
/// * Returns `MotifError::DataError` if a required column is missing or has the wrong type
/// * Returns `MotifError::InvalidFileFormat` on a missing value or a negative count
pub fn probe_table_from_df(df: &DataFrame) -> Result<ProbeTable> {
    let sequences = df
        .column("sequence")
        .map_err(|e| MotifError::DataError(e.to_string()))?
        .str()
        .map_err(|e| MotifError::DataError(e.to_string()))?;
    let r0 = df
        .column("r0")
        .map_err(|e| MotifError::DataError(e.to_string()))?
        .i64()
        .map_err(|e| MotifError::DataError(e.to_string()))?;
    let r1 = df
        .column("r1")
        .map_err(|e| MotifError::DataError(e.to_string()))?
        .i64()
        .map_err(|e| MotifError::DataError(e.to_string()))?;

    let mut probes = Vec::with_capacity(df.height());
    for (row, ((sequence, r0), r1)) in sequences
        .into_iter()
        .zip(r0.into_iter())
        .zip(r1.into_iter())
        .enumerate()
    {
        let sequence = sequence.ok_or_else(|| missing_value(row, "sequence"))?;
        let r0 = count_at(row, "r0", r0)?;
        let r1 = count_at(row, "r1", r1)?;
        probes.push(Probe::new(sequence, r0, r1));
    }

    Ok(ProbeTable::new(probes))
}

/// Reads a count table file (see [`read_count_table_df`]) into a [`ProbeTable`]
pub fn read_count_table(filename: &str) -> Result<ProbeTable> {
    let df = read_count_table_df(filename)?;
    let table = probe_table_from_df(&df)?;
    log::debug!("read {} probes from {}", table.len(), filename);
    Ok(table)
}

fn missing_value(row: usize, column: &str) -> MotifError {
    MotifError::InvalidFileFormat(format!("missing {} at row {}", column, row))
}

fn count_at(row: usize, column: &str, value: Option<i64>) -> Result<u64> {
    let value = value.ok_or_else(|| missing_value(row, column))?;
    u64::try_from(value).map_err(|_| {
        MotifError::InvalidFileFormat(format!("negative {} count {} at row {}", column, value, row))
    })
}
