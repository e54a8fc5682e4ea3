//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and parses CLI arguments
//! - ingests the proxy and reference tables
//! - runs the age-model pipeline (or a sweep of it)
//! - prints reports/plots
//! - writes exports into the output directory

use chrono::{Datelike, Utc};
use clap::Parser;
use log::info;

use crate::cli::{AlignArgs, BuildArgs, Command, InputArgs, PlotArgs, SimulateArgs, SweepArgs};
use crate::domain::{AlignParams, ColumnSelection, ConditionOptions, ResampleGrid, RunConfig, SimulateConfig};
use crate::error::AppError;

pub mod pipeline;

/// Entry point for the `coral` binary.
pub fn run() -> Result<(), AppError> {
    // A missing .env is fine; a malformed one is not silently ignored.
    if let Err(err) = dotenvy::dotenv() {
        if !err.not_found() {
            return Err(AppError::new(2, format!("Failed to load .env: {err}")));
        }
    }

    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    match cli.command {
        Command::Build(args) => handle_build(args),
        Command::Sweep(args) => handle_sweep(args),
        Command::Simulate(args) => handle_simulate(args),
        Command::Plot(args) => handle_plot(args),
    }
}

fn handle_build(args: BuildArgs) -> Result<(), AppError> {
    let config = run_config_from_args(&args);
    let run = pipeline::run_build(&config)?;
    let output = &run.output;

    println!("{}", crate::report::format_run_summary(&run, &config.params));

    if config.plot {
        println!(
            "{}",
            crate::plot::render_age_model_plot(
                &output.age_model,
                &output.tie_points.anchors,
                config.plot_width,
                config.plot_height,
            )
        );
        println!(
            "{}",
            crate::plot::render_resampled_plot(&output.resampled, config.plot_width, config.plot_height)
        );
    }

    let paths = crate::io::export::write_run_tables(
        &config.output_dir,
        &output.tie_points,
        &output.annotated,
        &output.resampled,
    )?;
    info!(
        "Wrote {}, {}, {}",
        paths.tie_points.display(),
        paths.annotated.display(),
        paths.resampled.display()
    );

    if config.write_summary {
        let summary = crate::io::summary::RunSummary::new(
            crate::io::summary::SummaryInputs {
                proxy_path: config.proxy_path.clone(),
                reference_path: config.reference_path.clone(),
                proxy_rows: run.proxy.rows_used,
                reference_rows: run.reference.rows_used,
            },
            config.params,
            &output.tie_points,
            output.correlation,
            &output.age_model,
            &output.resampled,
            Utc::now(),
        );
        let path = config.output_dir.join(crate::io::summary::SUMMARY_FILE);
        crate::io::summary::write_run_summary(&path, &summary)?;
        info!("Wrote {}", path.display());
    }

    Ok(())
}

fn handle_sweep(args: SweepArgs) -> Result<(), AppError> {
    if args.sigmas.is_empty() || args.proxy_spacings.is_empty() || args.reference_spacings.is_empty() {
        return Err(AppError::new(2, "Sweep needs at least one value for every swept parameter."));
    }

    let (proxy_columns, reference_columns) = column_selections(&args.input);
    let proxy = crate::io::ingest::load_series(&args.input.proxy, crate::io::ingest::SeriesRole::Proxy, &proxy_columns)?;
    let reference = crate::io::ingest::load_series(
        &args.input.reference,
        crate::io::ingest::SeriesRole::Reference,
        &reference_columns,
    )?;

    let base = align_params(&args.align, ConditionOptions::default().sigma, 0, 0);
    info!(
        "Sweeping {} combinations.",
        args.sigmas.len() * args.proxy_spacings.len() * args.reference_spacings.len()
    );
    let rows = pipeline::run_sweep(
        &proxy.series,
        &reference.series,
        &base,
        &args.sigmas,
        &args.proxy_spacings,
        &args.reference_spacings,
    );

    println!("{}", crate::report::format_sweep(&rows));

    if rows.iter().all(|r| r.outcome.is_err()) {
        return Err(AppError::new(4, "No parameter combination produced an age model."));
    }
    Ok(())
}

fn handle_simulate(args: SimulateArgs) -> Result<(), AppError> {
    let config = simulate_config_from_args(&args);
    let data = crate::data::simulate(&config)?;

    crate::io::export::ensure_output_dir(&args.output_dir)?;
    let sst_path = args.output_dir.join(&args.sst_filename);
    let d18o_path = args.output_dir.join(&args.d18o_filename);

    crate::io::export::with_file(&sst_path, |w| {
        crate::io::export::write_series(w, crate::data::SST_INDEX_HEADER, crate::data::SST_VALUE_HEADER, &data.sst)
    })?;
    crate::io::export::with_file(&d18o_path, |w| {
        crate::io::export::write_series(w, crate::data::D18O_INDEX_HEADER, crate::data::D18O_VALUE_HEADER, &data.d18o)
    })?;

    if let (Some(newest), Some(oldest)) = (data.months.first(), data.months.last()) {
        info!("Simulated {} months from {oldest} to {newest}.", data.months.len());
    }
    println!("Saved SST dataset to {}", sst_path.display());
    println!("Saved d18o dataset to {}", d18o_path.display());
    Ok(())
}

fn handle_plot(args: PlotArgs) -> Result<(), AppError> {
    let summary = crate::io::summary::read_run_summary(&args.summary)?;
    let plot = crate::plot::render_summary_plot(&summary, args.width, args.height);
    println!("{plot}");
    Ok(())
}

pub fn run_config_from_args(args: &BuildArgs) -> RunConfig {
    let (proxy_columns, reference_columns) = column_selections(&args.input);
    RunConfig {
        proxy_path: args.input.proxy.clone(),
        reference_path: args.input.reference.clone(),
        proxy_columns,
        reference_columns,
        params: align_params(&args.align, args.sigma, args.proxy_spacing, args.reference_spacing),
        output_dir: args.output_dir.clone(),
        write_summary: !args.no_summary,
        plot: args.plot && !args.no_plot,
        plot_width: args.width,
        plot_height: args.height,
    }
}

pub fn simulate_config_from_args(args: &SimulateArgs) -> SimulateConfig {
    SimulateConfig {
        years: args.years,
        end_month: args.end_month.with_day(1).unwrap_or(args.end_month),
        start_temp: args.start_temp,
        warming_trend: args.warming_trend,
        seasonal_amplitude: args.seasonal_amplitude,
        sst_noise: args.sst_noise,
        baseline_d18o: args.baseline_d18o,
        temp_coeff: args.temp_coeff,
        d18o_noise: args.d18o_noise,
        seed: args.seed,
    }
}

fn align_params(args: &AlignArgs, sigma: f64, proxy_spacing: usize, reference_spacing: usize) -> AlignParams {
    AlignParams {
        condition: ConditionOptions {
            sigma,
            detrend: args.detrend,
        },
        proxy_spacing,
        reference_spacing,
        policy: args.policy,
        grid: ResampleGrid {
            step: args.step,
            start: args.start,
        },
    }
}

fn column_selections(input: &InputArgs) -> (ColumnSelection, ColumnSelection) {
    (
        ColumnSelection {
            index: input.proxy_index_col.clone(),
            value: input.proxy_value_col.clone(),
        },
        ColumnSelection {
            index: input.reference_index_col.clone(),
            value: input.reference_value_col.clone(),
        },
    )
}

/// Rewrite argv so `coral --proxy ... --reference ...` means `coral build ...`.
///
/// Rules:
/// - `coral --help/--version/-h` -> unchanged (show top-level help/version)
/// - `coral --flag ...`          -> `coral build --flag ...`
/// - anything else               -> unchanged
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        return argv;
    };

    let is_top_level_help_or_version = matches!(arg1.as_str(), "-h" | "--help" | "-V" | "--version" | "help");
    if is_top_level_help_or_version {
        return argv;
    }

    if arg1.starts_with('-') {
        argv.insert(1, "build".to_string());
    }
    argv
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use crate::domain::MatchPolicy;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn bare_flags_default_to_build() {
        assert_eq!(
            rewrite_args(argv(&["coral", "--proxy", "a.csv"])),
            argv(&["coral", "build", "--proxy", "a.csv"])
        );
        assert_eq!(rewrite_args(argv(&["coral", "--help"])), argv(&["coral", "--help"]));
        assert_eq!(rewrite_args(argv(&["coral", "sweep"])), argv(&["coral", "sweep"]));
        assert_eq!(rewrite_args(argv(&["coral"])), argv(&["coral"]));
    }

    #[test]
    fn build_args_map_to_run_config() {
        let cli = Cli::parse_from(argv(&[
            "coral",
            "build",
            "--proxy",
            "d18o.csv",
            "--reference",
            "sst.csv",
            "--sst_spacing",
            "12",
            "--d18o-spacing",
            "5",
            "--sigma",
            "1.5",
            "--policy",
            "extrema",
            "--step",
            "0.25",
            "--start",
            "-1",
            "--no-plot",
            "-o",
            "out",
        ]));
        let Command::Build(args) = cli.command else {
            panic!("expected build");
        };
        let config = run_config_from_args(&args);
        assert_eq!(config.params.reference_spacing, 12);
        assert_eq!(config.params.proxy_spacing, 5);
        assert_eq!(config.params.condition.sigma, 1.5);
        assert_eq!(config.params.policy, MatchPolicy::Extrema);
        assert_eq!(config.params.grid.step, Some(0.25));
        assert_eq!(config.params.grid.start, Some(-1.0));
        assert!(!config.plot);
        assert!(config.write_summary);
        assert_eq!(config.output_dir, std::path::PathBuf::from("out"));
    }

    #[test]
    fn sweep_lists_are_comma_separated() {
        let cli = Cli::parse_from(argv(&[
            "coral",
            "sweep",
            "--proxy",
            "d18o.csv",
            "--reference",
            "sst.csv",
            "--sigmas",
            "0,2",
            "--proxy-spacings",
            "6",
        ]));
        let Command::Sweep(args) = cli.command else {
            panic!("expected sweep");
        };
        assert_eq!(args.sigmas, vec![0.0, 2.0]);
        assert_eq!(args.proxy_spacings, vec![6]);
        assert_eq!(args.reference_spacings, vec![8, 10, 12]);
    }

    #[test]
    fn simulate_end_month_is_first_of_month() {
        let cli = Cli::parse_from(argv(&["coral", "simulate", "--end-month", "2020-06-15", "--years", "3"]));
        let Command::Simulate(args) = cli.command else {
            panic!("expected simulate");
        };
        let config = simulate_config_from_args(&args);
        assert_eq!(config.end_month, chrono::NaiveDate::from_ymd_opt(2020, 6, 1).unwrap());
        assert_eq!(config.years, 3);
        assert_eq!(config.temp_coeff, -0.23);
    }
}
