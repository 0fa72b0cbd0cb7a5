//! Statistics errors

use thiserror::Error;

/// Errors from score reduction
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StatsError {
    /// Reduction was requested over an empty score series
    #[error("cannot reduce an empty score series")]
    EmptyInput,
}
