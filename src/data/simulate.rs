//! Synthetic monthly SST and coral δ18O records.
//!
//! Row `i` of both records is the month `i` months before `end_month`:
//! - SST: `start_temp + amplitude·sin(2π·month/12) + warming·(years − years_ago) + N(0, sst_noise)`
//! - δ18O: `baseline + temp_coeff·SST + N(0, d18o_noise)`, sampled at 1 mm per month
//!
//! so depth 0 is the most recent growth band and ages increase with depth.

use chrono::{Datelike, Months, NaiveDate};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};

use crate::domain::{Series, SimulateConfig};
use crate::error::AppError;

pub const SST_INDEX_HEADER: &str = "Years Ago";
pub const SST_VALUE_HEADER: &str = "SST (°C)";
pub const D18O_INDEX_HEADER: &str = "Depth (mm)";
pub const D18O_VALUE_HEADER: &str = "d18o (per mil)";

impl Default for SimulateConfig {
    fn default() -> Self {
        Self {
            years: 20,
            end_month: NaiveDate::from_ymd_opt(2025, 12, 1).unwrap_or_default(),
            start_temp: 28.0,
            warming_trend: 0.02,
            seasonal_amplitude: 1.0,
            sst_noise: 0.3,
            baseline_d18o: -5.0,
            temp_coeff: -0.23,
            d18o_noise: 0.1,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SimulatedData {
    /// Calendar month of each row, newest first.
    pub months: Vec<NaiveDate>,
    /// Reference series indexed by years before present.
    pub sst: Series,
    /// Proxy series indexed by depth (mm).
    pub d18o: Series,
}

pub fn simulate(config: &SimulateConfig) -> Result<SimulatedData, AppError> {
    if config.years == 0 {
        return Err(AppError::new(2, "Simulation needs at least one year."));
    }
    for (name, std) in [("SST", config.sst_noise), ("d18o", config.d18o_noise)] {
        if !(std.is_finite() && std >= 0.0) {
            return Err(AppError::new(2, format!("{name} noise must be finite and >= 0, got {std}.")));
        }
    }
    let n = config.years * 12;

    let sst_noise = Normal::new(0.0, config.sst_noise)
        .map_err(|e| AppError::new(2, format!("Invalid SST noise: {e}")))?;
    let d18o_noise = Normal::new(0.0, config.d18o_noise)
        .map_err(|e| AppError::new(2, format!("Invalid d18o noise: {e}")))?;
    let mut rng = StdRng::seed_from_u64(config.seed);

    let months = (0..n)
        .map(|i| {
            config
                .end_month
                .checked_sub_months(Months::new(i as u32))
                .ok_or_else(|| AppError::new(2, format!("End month {} is too early for {} years.", config.end_month, config.years)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let years = config.years as f64;
    let years_ago = linspace(0.0, years, n);

    let sst_values: Vec<f64> = months
        .iter()
        .zip(&years_ago)
        .map(|(month, &age)| {
            let seasonal = config.seasonal_amplitude * (std::f64::consts::TAU * month.month() as f64 / 12.0).sin();
            let trend = config.warming_trend * (years - age);
            config.start_temp + seasonal + trend + sst_noise.sample(&mut rng)
        })
        .collect();

    let d18o_values: Vec<f64> = sst_values
        .iter()
        .map(|&t| config.baseline_d18o + config.temp_coeff * t + d18o_noise.sample(&mut rng))
        .collect();
    let depths = (0..n).map(|i| i as f64).collect();

    Ok(SimulatedData {
        months,
        sst: Series::new(years_ago, sst_values)?,
        d18o: Series::new(depths, d18o_values)?,
    })
}

/// `n` evenly spaced values from `start` to `stop` inclusive.
fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (n - 1) as f64;
            let mut v: Vec<f64> = (0..n).map(|i| start + i as f64 * step).collect();
            v[n - 1] = stop;
            v
        }
    }
}
