//! Curve assembly, persistence and rendering for rdcurve
//!
//! Takes the per-codec sweep outcomes, assembles them into label-keyed
//! series (one set per statistic view), persists them as re-loadable JSON,
//! and renders one rate-distortion plot per view.

mod curve;
mod error;
mod plot;
mod store;

pub use curve::*;
pub use error::*;
pub use plot::*;
pub use store::*;

/// Result type for report operations
pub type Result<T> = std::result::Result<T, ReportError>;
