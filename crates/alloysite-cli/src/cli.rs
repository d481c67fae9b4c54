use crate::config::defaults::Preset;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    version,
    about = "alloysite - Fingerprint adsorption sites on alloy surfaces, fit linear energy models and enumerate every site of the alloy.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Set the number of threads for parallel computation.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Turn a manifest of relaxed slabs into a fingerprint dataset.
    Featurize(FeaturizeArgs),
    /// Fit zone weights on a fingerprint dataset and report training and test errors.
    Fit(FitArgs),
    /// Predict every fingerprint of the alloy and write the enumeration table.
    Enumerate(EnumerateArgs),
    /// Aggregate an enumeration table into multiplicity-weighted energy histograms.
    Histogram(HistogramArgs),
}

/// Options shared by every subcommand that needs the model definition.
#[derive(Args, Debug, Clone, Default)]
pub struct ModelArgs {
    /// Path to a configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Start from a built-in model definition.
    #[arg(short = 'P', long, value_enum, value_name = "NAME")]
    pub preset: Option<Preset>,

    /// Override the metal vocabulary (comma-separated, e.g. 'Ir,Pd,Pt,Rh,Ru').
    #[arg(long, value_delimiter = ',', value_name = "SYMBOLS")]
    pub metals: Option<Vec<String>>,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S model.zones=ens:1,s:6,ss:3
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `featurize` subcommand.
#[derive(Args, Debug)]
pub struct FeaturizeArgs {
    /// Path to the sample manifest (TOML, one [[sample]] table per slab).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Path for the fingerprint dataset (CSV).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub output: PathBuf,

    #[command(flatten)]
    pub model: ModelArgs,

    /// Override the adsorbate ('o' or 'oh').
    #[arg(short, long, value_name = "NAME")]
    pub adsorbate: Option<String>,

    /// Override the z-expansion ratio above which a slab counts as distorted.
    #[arg(long, value_name = "FLOAT")]
    pub distortion_threshold: Option<f64>,

    /// Override the in-plane distance (Å) within which the adsorbate counts as on-top.
    #[arg(long, value_name = "FLOAT")]
    pub on_top_distance: Option<f64>,

    /// Keep only hollow-site samples of this type ('fcc' or 'hcp').
    #[arg(long, value_name = "SITE")]
    pub required_site: Option<String>,

    /// Disable the on-top and hollow-site filters, keeping only the distortion check.
    #[arg(long)]
    pub no_site_filters: bool,
}

/// Arguments for the `fit` subcommand.
#[derive(Args, Debug)]
pub struct FitArgs {
    /// Path to the training dataset (CSV).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub train: PathBuf,

    /// Path to an optional test dataset (CSV).
    #[arg(long, value_name = "PATH")]
    pub test: Option<PathBuf>,

    /// Path for the fitted weights (TOML).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub output: PathBuf,

    /// Write predictions for the training set to this file.
    #[arg(long, value_name = "PATH")]
    pub train_predictions: Option<PathBuf>,

    /// Write predictions for the test set to this file.
    #[arg(long, value_name = "PATH", requires = "test")]
    pub test_predictions: Option<PathBuf>,

    #[command(flatten)]
    pub model: ModelArgs,
}

/// Arguments for the `enumerate` subcommand.
#[derive(Args, Debug)]
pub struct EnumerateArgs {
    /// Path to the fitted weights (TOML).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub weights: PathBuf,

    /// Path for the enumeration table (CSV). Large spaces are split into
    /// '<stem>_<ensemble>.<ext>' shards next to it.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub output: PathBuf,

    /// Override the number of rows above which output is split per ensemble.
    #[arg(long, value_name = "ROWS")]
    pub chunk_threshold: Option<u64>,

    #[command(flatten)]
    pub model: ModelArgs,
}

/// Arguments for the `histogram` subcommand.
#[derive(Args, Debug)]
pub struct HistogramArgs {
    /// Path of the enumeration table (or the shard stem it was written with).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Path for the histogram table (CSV).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub output: PathBuf,

    /// Override the first bin edge (eV).
    #[arg(long, value_name = "FLOAT", allow_hyphen_values = true)]
    pub start: Option<f64>,

    /// Override the exclusive upper limit of the bin edges (eV).
    #[arg(long, value_name = "FLOAT", allow_hyphen_values = true)]
    pub stop: Option<f64>,

    /// Override the bin width (eV).
    #[arg(long, value_name = "FLOAT")]
    pub width: Option<f64>,

    #[command(flatten)]
    pub model: ModelArgs,
}
