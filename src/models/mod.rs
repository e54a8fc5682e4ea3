//! Age model construction and time-grid resampling.
//!
//! Both are small, pure functions of their inputs so the pipeline, the sweep
//! runner, and the plotting code can share them.

pub mod age_model;
pub mod resample;

pub use age_model::*;
pub use resample::*;
