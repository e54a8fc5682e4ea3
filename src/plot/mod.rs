//! Terminal plots of age models and resampled series.

pub mod ascii;

pub use ascii::*;
