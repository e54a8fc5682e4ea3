//! Command-line parsing for the coral age-model builder.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the signal-processing code. Every tunable also reads a
//! `CORAL_*` environment variable (a `.env` file is loaded first).

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use crate::domain::MatchPolicy;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "coral", version, about = "Coral depth/age model builder (δ18O vs SST tie points)")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Build an age model from a proxy table and a reference table, print diagnostics, and export results.
    Build(BuildArgs),
    /// Run the pipeline over a grid of smoothing/spacing settings and tabulate the outcomes.
    Sweep(SweepArgs),
    /// Generate synthetic SST and δ18O tables.
    Simulate(SimulateArgs),
    /// Plot the age model from a saved run summary JSON.
    Plot(PlotArgs),
}

/// Input tables and column overrides shared by `build` and `sweep`.
#[derive(Debug, Args, Clone)]
pub struct InputArgs {
    /// Depth-indexed proxy table (CSV or TSV), e.g. `Depth (mm),d18o (per mil)`.
    #[arg(long, value_name = "FILE", env = "CORAL_PROXY", visible_alias = "d18o")]
    pub proxy: PathBuf,

    /// Age-indexed reference table (CSV or TSV), e.g. `Years Ago,SST (°C)`.
    #[arg(long, value_name = "FILE", env = "CORAL_REFERENCE", visible_alias = "sst")]
    pub reference: PathBuf,

    /// Proxy depth column (default: first known alias found).
    #[arg(long, value_name = "NAME")]
    pub proxy_index_col: Option<String>,

    /// Proxy value column.
    #[arg(long, value_name = "NAME")]
    pub proxy_value_col: Option<String>,

    /// Reference age column.
    #[arg(long, value_name = "NAME")]
    pub reference_index_col: Option<String>,

    /// Reference value column.
    #[arg(long, value_name = "NAME")]
    pub reference_value_col: Option<String>,
}

/// Signal conditioning and matching options shared by `build` and `sweep`.
#[derive(Debug, Args, Clone)]
pub struct AlignArgs {
    /// Extremum combination policy.
    #[arg(long, value_enum, env = "CORAL_POLICY", default_value_t = MatchPolicy::PeakTrough)]
    pub policy: MatchPolicy,

    /// Remove a linear trend before smoothing.
    #[arg(long, env = "CORAL_DETREND")]
    pub detrend: bool,

    /// Time step of the output grid in years (default: median spacing of mapped ages).
    #[arg(long, env = "CORAL_STEP", visible_alias = "dt")]
    pub step: Option<f64>,

    /// Origin of the output grid in years (default: youngest mapped age).
    #[arg(long, env = "CORAL_START", visible_alias = "t0", allow_hyphen_values = true)]
    pub start: Option<f64>,
}

/// Options for `coral build`.
#[derive(Debug, Args, Clone)]
pub struct BuildArgs {
    #[command(flatten)]
    pub input: InputArgs,

    #[command(flatten)]
    pub align: AlignArgs,

    /// Gaussian smoothing width, in samples (0 disables smoothing).
    #[arg(long, env = "CORAL_SIGMA", default_value_t = 2.0)]
    pub sigma: f64,

    /// Minimum separation between proxy extrema, in samples.
    #[arg(long, env = "CORAL_PROXY_SPACING", default_value_t = 6, visible_aliases = ["d18o-spacing", "d18o_spacing"])]
    pub proxy_spacing: usize,

    /// Minimum separation between reference extrema, in samples.
    #[arg(long, env = "CORAL_REFERENCE_SPACING", default_value_t = 10, visible_aliases = ["sst-spacing", "sst_spacing"])]
    pub reference_spacing: usize,

    /// Directory receiving the exported tables and summary.
    #[arg(short = 'o', long, value_name = "DIR", env = "CORAL_OUTPUT_DIR", default_value = "outputs")]
    pub output_dir: PathBuf,

    /// Skip writing the run summary JSON.
    #[arg(long)]
    pub no_summary: bool,

    /// Render ASCII plots in the terminal (enabled by default).
    #[arg(long, default_value_t = true)]
    pub plot: bool,

    /// Disable the terminal plots.
    #[arg(long)]
    pub no_plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,
}

/// Options for `coral sweep`.
#[derive(Debug, Args, Clone)]
pub struct SweepArgs {
    #[command(flatten)]
    pub input: InputArgs,

    #[command(flatten)]
    pub align: AlignArgs,

    /// Smoothing widths to try (comma-separated).
    #[arg(long, value_delimiter = ',', default_values_t = [1.0, 2.0, 3.0])]
    pub sigmas: Vec<f64>,

    /// Proxy spacings to try (comma-separated).
    #[arg(long, value_delimiter = ',', default_values_t = [4usize, 6, 8])]
    pub proxy_spacings: Vec<usize>,

    /// Reference spacings to try (comma-separated).
    #[arg(long, value_delimiter = ',', default_values_t = [8usize, 10, 12])]
    pub reference_spacings: Vec<usize>,
}

/// Options for `coral simulate`.
#[derive(Debug, Args, Clone)]
pub struct SimulateArgs {
    /// Record length in years (12 samples per year).
    #[arg(long, default_value_t = 20)]
    pub years: usize,

    /// Most recent month of the record (YYYY-MM-DD, day is ignored).
    #[arg(long, value_name = "DATE", default_value = "2025-12-01")]
    pub end_month: NaiveDate,

    /// SST at the start of the record (°C).
    #[arg(long, default_value_t = 28.0)]
    pub start_temp: f64,

    /// Warming over the record (°C per year).
    #[arg(long, default_value_t = 0.02, allow_hyphen_values = true)]
    pub warming_trend: f64,

    /// Seasonal SST amplitude (°C).
    #[arg(long, default_value_t = 1.0)]
    pub seasonal_amplitude: f64,

    /// SST noise standard deviation (°C).
    #[arg(long, default_value_t = 0.3)]
    pub sst_noise: f64,

    /// δ18O baseline (‰).
    #[arg(long, default_value_t = -5.0, allow_hyphen_values = true)]
    pub baseline_d18o: f64,

    /// δ18O temperature sensitivity (‰ per °C).
    #[arg(long, default_value_t = -0.23, allow_hyphen_values = true)]
    pub temp_coeff: f64,

    /// δ18O noise standard deviation (‰).
    #[arg(long, default_value_t = 0.1)]
    pub d18o_noise: f64,

    /// Random seed.
    #[arg(long, env = "CORAL_SEED", default_value_t = 42)]
    pub seed: u64,

    /// Output directory for the generated tables.
    #[arg(short = 'o', long, value_name = "DIR", env = "CORAL_OUTPUT_DIR", default_value = "outputs")]
    pub output_dir: PathBuf,

    /// SST table file name (inside the output directory).
    #[arg(long, default_value = "simulated_sst_dataset.csv")]
    pub sst_filename: String,

    /// δ18O table file name (inside the output directory).
    #[arg(long, default_value = "simulated_d18o_dataset.csv")]
    pub d18o_filename: String,
}

/// Options for plotting a saved run.
#[derive(Debug, Args, Clone)]
pub struct PlotArgs {
    /// Run summary JSON produced by `coral build`.
    #[arg(long, value_name = "JSON")]
    pub summary: PathBuf,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,
}
