//! Tie-point selection: extremum combination, rank matching, and the
//! correlation diagnostic.

pub mod matcher;

pub use matcher::*;
