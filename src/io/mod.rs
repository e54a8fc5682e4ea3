//! Input/output helpers.
//!
//! - CSV/TSV ingest + validation (`ingest`)
//! - result table exports (`export`)
//! - run summary JSON read/write (`summary`)

pub mod export;
pub mod ingest;
pub mod summary;

pub use export::*;
pub use ingest::*;
pub use summary::*;
