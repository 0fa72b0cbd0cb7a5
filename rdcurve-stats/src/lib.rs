//! Per-frame quality score statistics for rdcurve
//!
//! This crate reduces an ordered sequence of per-frame quality scores
//! (SSIMULACRA2 or XPSNR, one value per sampled frame) into the four summary
//! statistics the comparison pipeline plots: arithmetic mean, harmonic mean,
//! population standard deviation, and the 10th percentile. It also provides
//! a streaming accumulator that recomputes interim statistics at a fixed
//! cadence for progress reporting while scores are still arriving.
//!
//! No I/O happens here; everything is a pure function of the score series.

mod error;
mod reduce;
mod streaming;

pub use error::*;
pub use reduce::*;
pub use streaming::*;

/// Result type for statistics operations
pub type Result<T> = std::result::Result<T, StatsError>;
