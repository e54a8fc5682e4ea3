//! `coral-age` library crate.
//!
//! The binary (`coral`) is a thin wrapper around this library so that:
//!
//! - the age-model pipeline is testable without spawning processes
//! - stages are reusable on in-memory series (notebooks, batch jobs)
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod io;
pub mod math;
pub mod models;
pub mod plot;
pub mod report;
pub mod signal;
pub mod tiepoints;
