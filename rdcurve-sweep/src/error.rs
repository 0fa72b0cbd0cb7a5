//! Sweep errors

use std::path::PathBuf;

use thiserror::Error;

/// Errors from a quality sweep
#[derive(Error, Debug)]
pub enum SweepError {
    /// External encoder process exited non-zero; fatal to the remaining
    /// sweep for this codec, never retried.
    #[error("encoder exited with status {status}: {stderr}")]
    Encode {
        /// Process exit code, or -1 if killed by a signal.
        status: i32,
        /// Tail of the encoder's stderr output.
        stderr: String,
    },

    /// Metric name not in the supported set
    #[error("unsupported metric '{0}' (expected ssimu2 or xpsnr)")]
    UnsupportedMetric(String),

    /// Container exposes no bitrate metadata
    #[error("no container bitrate for {path}: {reason}")]
    BitrateProbe {
        /// Artifact that was probed.
        path: PathBuf,
        /// Probe-specific explanation.
        reason: String,
    },

    /// Per-frame score stream failed mid-measurement
    #[error("score stream failed: {0}")]
    ScoreStream(String),

    /// Malformed encode template
    #[error("invalid encode template: {0}")]
    Template(String),

    /// Invalid sweep configuration
    #[error("invalid sweep config: {0}")]
    Config(String),

    /// Statistics error (empty score stream)
    #[error("stats error: {0}")]
    Stats(#[from] rdcurve_stats::StatsError),

    /// Process spawn or filesystem error
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
