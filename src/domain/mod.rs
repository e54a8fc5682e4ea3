//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - indexed data series (`Series`, `SmoothedSeries`, `ExtremumSet`)
//! - matching outputs (`AnchorPair`, `TiePointSet`, `Correlation`)
//! - run configuration (`AlignParams`, `RunConfig`, `SimulateConfig`)

pub mod types;

pub use types::*;
