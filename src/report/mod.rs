//! Reporting utilities: run summaries, tie-point and segment tables, sweep tables.

pub mod format;

pub use format::*;
