//! Signal conditioning and extremum detection.
//!
//! Both series pass through the same two steps before matching:
//!
//! - optional linear detrend, then Gaussian smoothing (`smooth`)
//! - strict local maxima/minima with a minimum separation (`extrema`)

pub mod extrema;
pub mod smooth;

pub use extrema::*;
pub use smooth::*;
