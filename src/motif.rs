use crate::error::{MotifError, Result};
use crate::types::{Base, ModelCollection, WeightMatrix};
use ndarray::{Array2, Axis, ShapeBuilder};
use serde::Deserialize;
use statrs::statistics::Statistics;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::iter::Peekable;

const PSEUDOCOUNT: f64 = 0.0001;

/// A mononucleotide binding-affinity model (PSAM) over the DNA alphabet.
///
/// Weights are log relative affinities stored as a `4 × length` matrix, one
/// row per base in A, C, G, T order. The label and organism are metadata and
/// never affect scoring. Models are immutable once built; transforms such as
/// [`AffinityModel::centered`] return a new model.
#[derive(Debug, Clone, PartialEq)]
pub struct AffinityModel {
    label: String,
    organism: String,
    weights: WeightMatrix,
}

impl AffinityModel {
    /// Builds a model from a flat list of weights in A,C,G,T order per position
    ///
    /// # Arguments
    /// * `values` - `4 × L` log-affinity values, position-major with the four bases of each position adjacent
    /// * `label` - Transcription factor identifier
    /// * `organism` - Organism tag
    ///
    /// # Errors
    /// * `MotifError::MalformedModel` - If `values` is empty, not a multiple of 4, or holds a non-finite value
    ///
    /// # Example
    /// ```
    /// use motif_enrichment::motif::AffinityModel;
    /// use motif_enrichment::types::Base;
    ///
    /// // position 0: A=1, C=0, G=0, T=0; position 1: A=0, C=1, G=0, T=0
    /// let model = AffinityModel::from_flat_weights(&[1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0], "TF", "9606").unwrap();
    /// assert_eq!(model.length(), 2);
    /// assert_eq!(model.weight(Base::C, 1).unwrap(), 1.0);
    /// ```
    pub fn from_flat_weights(
        values: &[f64],
        label: impl Into<String>,
        organism: impl Into<String>,
    ) -> Result<Self> {
        if values.is_empty() {
            return Err(MotifError::malformed_model("no weights given"));
        }
        if values.len() % 4 != 0 {
            return Err(MotifError::malformed_model(format!(
                "weight count {} is not a multiple of 4",
                values.len()
            )));
        }
        let length = values.len() / 4;
        let weights = Array2::from_shape_vec((4, length).f(), values.to_vec())
            .map_err(|e| MotifError::malformed_model(e.to_string()))?;
        Self::from_matrix(weights, label, organism)
    }

    /// Builds a model from a `4 × L` matrix with rows A, C, G, T
    pub fn from_matrix(
        weights: WeightMatrix,
        label: impl Into<String>,
        organism: impl Into<String>,
    ) -> Result<Self> {
        let (rows, length) = weights.dim();
        if rows != 4 || length == 0 {
            return Err(MotifError::malformed_model(format!(
                "expected a 4 x L matrix with L > 0, got {} x {}",
                rows, length
            )));
        }
        if let Some(bad) = weights.iter().find(|w| !w.is_finite()) {
            return Err(MotifError::malformed_model(format!(
                "non-finite weight {}",
                bad
            )));
        }
        Ok(AffinityModel {
            label: label.into(),
            organism: organism.into(),
            weights,
        })
    }

    /// Number of sequence positions the model covers
    pub fn length(&self) -> usize {
        self.weights.ncols()
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn organism(&self) -> &str {
        &self.organism
    }

    pub fn weights(&self) -> &WeightMatrix {
        &self.weights
    }

    /// Log-affinity contribution of `base` at `position`
    ///
    /// # Errors
    /// * `MotifError::OutOfRange` - If `position >= length`
    pub fn weight(&self, base: Base, position: usize) -> Result<f64> {
        if position >= self.length() {
            return Err(MotifError::OutOfRange {
                position,
                length: self.length(),
            });
        }
        Ok(self.weights[[base.index(), position]])
    }

    /// Returns a copy with the mean of the four base weights subtracted at every position
    pub fn centered(&self) -> AffinityModel {
        // mean_axis only returns None for a zero-length axis; the base axis always has 4 rows
        let means = self
            .weights
            .mean_axis(Axis(0))
            .unwrap_or_else(|| ndarray::Array1::zeros(self.length()));
        AffinityModel {
            label: self.label.clone(),
            organism: self.organism.clone(),
            weights: &self.weights - &means,
        }
    }

    /// Flattens the weights back into A,C,G,T order per position
    pub fn to_flat_weights(&self) -> Vec<f64> {
        self.weights.t().iter().copied().collect()
    }

    /// Pearson correlation between the weights of two models of equal length
    ///
    /// # Errors
    /// * `MotifError::InvalidParameter` - If the models differ in length
    /// * `MotifError::DataError` - If either model has identical weights everywhere
    pub fn correlation(&self, other: &AffinityModel) -> Result<f64> {
        if self.length() != other.length() {
            return Err(MotifError::invalid_parameter(
                "other",
                other.length(),
                format!("model length must equal {}", self.length()),
            ));
        }
        let x = self.to_flat_weights();
        let y = other.to_flat_weights();
        let (sx, sy) = (Statistics::std_dev(x.iter()), Statistics::std_dev(y.iter()));
        if sx == 0.0 || sy == 0.0 {
            return Err(MotifError::DataError(
                "correlation undefined for constant weights".into(),
            ));
        }
        Ok(Statistics::covariance(x.iter(), y.iter()) / (sx * sy))
    }

    /// Sum of forward-strand weights over a window of exactly `length` bases
    pub(crate) fn forward_sum(&self, window: &[Base]) -> f64 {
        window
            .iter()
            .enumerate()
            .map(|(position, base)| self.weights[[base.index(), position]])
            .sum()
    }

    /// Sum of weights for the reverse complement of a window of exactly `length` bases
    pub(crate) fn reverse_complement_sum(&self, window: &[Base]) -> f64 {
        window
            .iter()
            .rev()
            .enumerate()
            .map(|(position, base)| self.weights[[base.complement().index(), position]])
            .sum()
    }
}

#[derive(Debug, Deserialize)]
struct MotifCentralFit {
    metadata: MotifCentralMetadata,
    coefficients: MotifCentralCoefficients,
}

#[derive(Debug, Deserialize)]
struct MotifCentralMetadata {
    factors: Vec<MotifCentralFactor>,
}

#[derive(Debug, Deserialize)]
struct MotifCentralFactor {
    gene_symbol: String,
    #[serde(default)]
    tax_id: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct MotifCentralCoefficients {
    #[serde(rename = "bindingModes")]
    binding_modes: Vec<MotifCentralBindingMode>,
}

#[derive(Debug, Deserialize)]
struct MotifCentralBindingMode {
    #[serde(default)]
    mononucleotide: Vec<f64>,
}

impl TryFrom<MotifCentralFit> for AffinityModel {
    type Error = MotifError;

    fn try_from(fit: MotifCentralFit) -> Result<Self> {
        let factor = fit
            .metadata
            .factors
            .into_iter()
            .next()
            .ok_or_else(|| MotifError::InvalidFileFormat("fit has no factors".into()))?;
        let organism = match factor.tax_id {
            serde_json::Value::String(s) => s,
            serde_json::Value::Null => String::new(),
            other => other.to_string(),
        };
        // the non-specific mode carries no mononucleotide weights
        let mode = fit
            .coefficients
            .binding_modes
            .into_iter()
            .find(|mode| !mode.mononucleotide.is_empty())
            .ok_or_else(|| {
                MotifError::malformed_model(format!(
                    "no mononucleotide binding mode for {}",
                    factor.gene_symbol
                ))
            })?;
        AffinityModel::from_flat_weights(&mode.mononucleotide, factor.gene_symbol, organism)
    }
}

/// Parses a MotifCentral JSON export (an array of fitted models) into affinity models
///
/// Each fit contributes the mononucleotide weights of its first specific binding mode,
/// labelled with the gene symbol and taxonomy ID of its first factor. Fits are returned
/// in file order.
///
/// # Errors
/// * `MotifError::InvalidFileFormat` - If the JSON does not have the expected structure
/// * `MotifError::MalformedModel` - If a fit's weights cannot form a model
pub fn parse_motifcentral(json: &str) -> Result<Vec<AffinityModel>> {
    let fits: Vec<MotifCentralFit> = serde_json::from_str(json)
        .map_err(|e| MotifError::InvalidFileFormat(format!("MotifCentral JSON: {}", e)))?;
    if fits.is_empty() {
        return Err(MotifError::InvalidFileFormat("No fits found".into()));
    }
    fits.into_iter().map(AffinityModel::try_from).collect()
}

/// Reads a MotifCentral JSON file, see [`parse_motifcentral`]
pub fn read_motifcentral(filename: &str) -> Result<Vec<AffinityModel>> {
    let json = std::fs::read_to_string(filename)?;
    parse_motifcentral(&json)
}

/// First model whose label contains `gene`
pub fn find_by_label<'a>(models: &'a [AffinityModel], gene: &str) -> Option<&'a AffinityModel> {
    models.iter().find(|model| model.label().contains(gene))
}

/// Advances the iterator until a MOTIF line is found
fn skip_until_motif<I>(lines: &mut Peekable<I>)
where
    I: Iterator<Item = std::result::Result<String, std::io::Error>>,
{
    while let Some(Ok(line)) = lines.peek() {
        if line.starts_with("MOTIF") {
            break;
        }
        lines.next();
    }
}

fn is_matrix_row(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.starts_with(|c: char| c.is_ascii_digit() || c == '.')
}

/// Parses a single probability matrix from the iterator
fn parse_pwm<I>(lines: &mut Peekable<I>) -> Result<Option<(String, Vec<[f64; 4]>)>>
where
    I: Iterator<Item = std::result::Result<String, std::io::Error>>,
{
    let motif_line = match lines.next() {
        Some(Ok(line)) if line.starts_with("MOTIF") => line,
        Some(Err(e)) => return Err(MotifError::Io(e)),
        _ => return Ok(None),
    };

    let motif_id = motif_line
        .split_whitespace()
        .nth(1)
        .ok_or_else(|| MotifError::InvalidFileFormat("Missing motif ID".into()))?
        .to_string();

    // Skip header lines up to and including the matrix declaration
    loop {
        match lines.next() {
            Some(Ok(line)) if line.trim_start().starts_with("letter-probability") => break,
            Some(Ok(line)) if line.starts_with("MOTIF") => {
                return Err(MotifError::InvalidFileFormat(format!(
                    "Motif {} has no letter-probability matrix",
                    motif_id
                )))
            }
            Some(Ok(_)) => continue,
            Some(Err(e)) => return Err(MotifError::Io(e)),
            None => {
                return Err(MotifError::InvalidFileFormat(format!(
                    "Motif {} has no letter-probability matrix",
                    motif_id
                )))
            }
        }
    }

    let mut rows = Vec::new();
    while let Some(Ok(line)) = lines.peek() {
        if !is_matrix_row(line) {
            break;
        }
        let values: Vec<f64> = line
            .split_whitespace()
            .map(|s| s.parse::<f64>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| MotifError::InvalidFileFormat(format!("Invalid PWM value: {}", e)))?;
        let row: [f64; 4] = values.try_into().map_err(|v: Vec<f64>| {
            MotifError::InvalidFileFormat(format!(
                "Motif {} row has {} columns, expected 4",
                motif_id,
                v.len()
            ))
        })?;
        rows.push(row);
        lines.next();
    }

    if rows.is_empty() {
        return Err(MotifError::InvalidFileFormat(format!(
            "Empty PWM for motif {}",
            motif_id
        )));
    }

    Ok(Some((motif_id, rows)))
}

/// Converts letter probabilities into log relative affinities.
///
/// Each position gets `ln((p_b + PSEUDOCOUNT) / max_b'(p_b' + PSEUDOCOUNT))`, so the
/// consensus base scores 0 and every other base scores below it.
pub fn pwm_to_weights(rows: &[[f64; 4]]) -> WeightMatrix {
    let mut weights = Array2::zeros((4, rows.len()));
    for (position, row) in rows.iter().enumerate() {
        let max = row
            .iter()
            .map(|p| p + PSEUDOCOUNT)
            .fold(f64::NEG_INFINITY, f64::max);
        for (base, p) in row.iter().enumerate() {
            weights[[base, position]] = ((p + PSEUDOCOUNT) / max).ln();
        }
    }
    weights
}

/// Reads letter-probability matrices from a MEME format file as affinity models
///
/// # Arguments
/// * `filename` - Path to the MEME format file to read
///
/// # Returns
/// * `Result<ModelCollection>` - Models keyed by motif ID, weights from [`pwm_to_weights`],
///   with an empty organism tag
///
/// # Errors
/// * `MotifError::Io` - If the file cannot be opened or read
/// * `MotifError::InvalidFileFormat` - If the file format is invalid or no matrices are found
pub fn read_meme_models(filename: &str) -> Result<ModelCollection> {
    let file = File::open(filename)?;
    let reader = BufReader::new(file);
    let mut lines = reader.lines().peekable();
    let mut models = HashMap::new();

    skip_until_motif(&mut lines);

    while let Some((id, rows)) = parse_pwm(&mut lines)? {
        let model = AffinityModel::from_matrix(pwm_to_weights(&rows), id.clone(), "")?;
        models.insert(id, model);
        skip_until_motif(&mut lines);
    }

    if models.is_empty() {
        return Err(MotifError::InvalidFileFormat("No PWMs found".into()));
    }

    Ok(models)
}
