use clap::{ArgAction, Parser, ValueEnum};
use motif_enrichment::binning::{self, BinningParams};
use motif_enrichment::error::MotifError;
use motif_enrichment::motif::{self, AffinityModel};
use motif_enrichment::pipeline;
use motif_enrichment::report;
use motif_enrichment::scoring::{ErrorPolicy, ScoringMode, ScoringOptions, WindowRange};
use motif_enrichment::table;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

#[derive(thiserror::Error, Debug)]
pub enum ScannerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Motif(#[from] MotifError),

    #[error("No model matching {0:?} in model file")]
    ModelNotFound(String),

    #[error("Model file holds {0} models, select one with --tf or --motif")]
    AmbiguousModel(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    Additive,
    Exponential,
}

impl From<Mode> for ScoringMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Additive => ScoringMode::Additive,
            Mode::Exponential => ScoringMode::Exponential,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "enrichment-scanner",
    about = "Scores a SELEX count table against a binding model and reports enrichment per score bin",
    long_about = "Scores every probe of a round-0/round-1 count table against a mononucleotide binding model, \
                  ranks probes by score, cuts the ranking into fixed-size bins and reports the average score, \
                  read sums and round-1/round-0 enrichment of each bin.",
    version,
    after_help = "Example usage:\n    \
                  enrichment-scanner table.tsv.gz motifcentral.json report.tsv --tf CTCF\n    \
                  enrichment-scanner table.tsv motifs.meme report.json --motif MA0139.1 --mode exponential",
    color = clap::ColorChoice::Always
)]
struct Args {
    /// Path to the count table
    /// Headerless TSV with sequence, round-0 count and round-1 count; may be gzipped
    #[arg(value_name = "COUNT_TABLE")]
    count_table: String,

    /// Path to the binding model file
    /// MotifCentral JSON (.json) or MEME letter-probability matrices (any other extension)
    #[arg(value_name = "MODEL_FILE")]
    model_file: String,

    /// Path for the report (.tsv, .txt or .json)
    /// Will create output directory if it doesn't exist
    #[arg(value_name = "OUTPUT_FILE")]
    output_file: String,

    /// Select the first model whose label contains this name
    /// (MotifCentral gene symbol, or MEME motif ID in sorted order)
    #[arg(long, conflicts_with = "motif")]
    tf: Option<String>,

    /// Select a MEME motif by ID, or a MotifCentral model by index
    #[arg(long)]
    motif: Option<String>,

    /// How window scores are accumulated per probe
    #[arg(long, value_enum, default_value_t = Mode::Additive)]
    mode: Mode,

    /// Score the forward strand only
    #[arg(long)]
    forward_only: bool,

    /// Scan every full window instead of stopping two offsets short
    #[arg(long)]
    all_windows: bool,

    /// Fail on the first probe that cannot be scored instead of skipping it
    #[arg(long)]
    abort_on_invalid: bool,

    /// Probes per bin
    #[arg(long, default_value_t = 1000)]
    bin_size: usize,

    /// Minimum number of probes left over beyond a full bin before it is cut
    #[arg(long, default_value_t = 10)]
    tail_buffer: usize,

    /// Also write top-bin enrichment against bin size to this TSV file
    #[arg(long, value_name = "FILE")]
    curve: Option<String>,

    /// Smallest top bin on the enrichment curve
    #[arg(long, default_value_t = 500, requires = "curve")]
    curve_min_size: usize,

    /// Suppress warnings
    #[arg(short = 'q', long, conflicts_with = "verbose")]
    quiet: bool,

    /// Verbosity; repeat to increase
    #[arg(short = 'v', long, action = ArgAction::Count)]
    verbose: u8,
}

impl Args {
    fn scoring_options(&self) -> ScoringOptions {
        ScoringOptions {
            mode: self.mode.into(),
            include_reverse_complement: !self.forward_only,
            window_range: if self.all_windows {
                WindowRange::Complete
            } else {
                WindowRange::StopShort
            },
            on_invalid: if self.abort_on_invalid {
                ErrorPolicy::Abort
            } else {
                ErrorPolicy::Skip
            },
        }
    }

    fn binning_params(&self) -> Result<BinningParams, MotifError> {
        BinningParams::new(self.bin_size, self.tail_buffer)
    }

    fn log_level(&self) -> log::LevelFilter {
        if self.quiet {
            log::LevelFilter::Off
        } else {
            match self.verbose {
                0 => log::LevelFilter::Warn,
                1 => log::LevelFilter::Info,
                2 => log::LevelFilter::Debug,
                _ => log::LevelFilter::Trace,
            }
        }
    }
}

fn init_logger(level: log::LevelFilter) {
    if let Err(e) = env_logger::Builder::new()
        .filter_level(level)
        .target(env_logger::Target::Stderr)
        .format(|buf, record| {
            let level = record.level().as_str().to_lowercase();
            writeln!(buf, "[enrichment-scanner {level:>5}] {}", record.args())
        })
        .try_init()
    {
        eprintln!("failed to setup logger: {e}");
    }
}

fn load_model(args: &Args) -> Result<AffinityModel, ScannerError> {
    if args.model_file.ends_with(".json") {
        let models = motif::read_motifcentral(&args.model_file)?;
        if let Some(tf) = &args.tf {
            return motif::find_by_label(&models, tf)
                .cloned()
                .ok_or_else(|| ScannerError::ModelNotFound(tf.clone()));
        }
        if let Some(selector) = &args.motif {
            return selector
                .parse::<usize>()
                .ok()
                .and_then(|index| models.get(index).cloned())
                .ok_or_else(|| ScannerError::ModelNotFound(selector.clone()));
        }
        single(models)
    } else {
        let mut models = motif::read_meme_models(&args.model_file)?;
        if let Some(id) = &args.motif {
            return models
                .remove(id)
                .ok_or_else(|| ScannerError::ModelNotFound(id.clone()));
        }
        let mut models: Vec<AffinityModel> = models.into_values().collect();
        models.sort_by(|a, b| a.label().cmp(b.label()));
        if let Some(tf) = &args.tf {
            return motif::find_by_label(&models, tf)
                .cloned()
                .ok_or_else(|| ScannerError::ModelNotFound(tf.clone()));
        }
        single(models)
    }
}

fn single(mut models: Vec<AffinityModel>) -> Result<AffinityModel, ScannerError> {
    match models.len() {
        1 => Ok(models.remove(0)),
        n => Err(ScannerError::AmbiguousModel(n)),
    }
}

fn create_parent_dir(path: &str) -> Result<(), ScannerError> {
    if let Some(parent) = Path::new(path).parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

fn run(args: Args) -> Result<(), ScannerError> {
    let start_time = std::time::Instant::now();
    let options = args.scoring_options();
    let params = args.binning_params()?;

    let model = load_model(&args)?;
    log::info!(
        "model {} ({}), length {}",
        model.label(),
        model.organism(),
        model.length()
    );

    let table = table::read_count_table(&args.count_table)?;
    log::info!("{} probes to score", table.len());

    let analysis = pipeline::rank_and_bin(&model, &table, &options, &params)?;
    if analysis.report.is_empty() {
        log::warn!(
            "{} scored probes are fewer than bin size {} plus tail buffer {}, report is empty",
            analysis.ranked.len(),
            params.bin_size,
            params.tail_buffer
        );
    }

    create_parent_dir(&args.output_file)?;
    report::write_report(&analysis.report, &args.output_file)?;

    if let Some(curve_file) = &args.curve {
        let curve = binning::top_bin_enrichment_curve(&analysis.ranked, args.curve_min_size, 1.0)?;
        create_parent_dir(curve_file)?;
        let mut writer = BufWriter::new(File::create(curve_file)?);
        report::write_tsv(&mut report::curve_to_dataframe(&curve)?, &mut writer)?;
        writer.flush()?;
        log::info!("wrote {} curve points to {}", curve.len(), curve_file);
    }

    log::info!(
        "Total execution time: {:.4} minutes",
        start_time.elapsed().as_secs_f64() / 60.0
    );
    Ok(())
}

fn main() {
    let args = Args::parse();
    init_logger(args.log_level());

    if let Err(e) = run(args) {
        eprintln!("{e}");
        std::process::exit(1);
    }
}
