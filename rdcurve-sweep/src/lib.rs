//! Quality-sweep execution for rdcurve
//!
//! This crate drives one codec's rate-distortion sweep: for each quality
//! (CRF) level it asks an [`Encoder`] for an encoded artifact, streams
//! per-frame scores from a [`ScoreSource`] through the statistics
//! accumulator, reads the achieved bitrate from a [`BitrateProbe`], and
//! collects one rate point per statistic view.
//!
//! The collaborators are traits so the pipeline can be tested without
//! ffmpeg; process-backed implementations live in [`ffmpeg`].

use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

mod error;
mod ffmpeg;
mod runner;
mod template;

pub use error::*;
pub use ffmpeg::*;
pub use runner::*;
pub use template::*;

/// Result type for sweep operations
pub type Result<T> = std::result::Result<T, SweepError>;

/// Perceptual quality metric computed per frame pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    /// SSIMULACRA2 (unbounded above, ~0-100 typical, can go negative)
    Ssimu2,
    /// XPSNR (dB)
    Xpsnr,
}

impl MetricKind {
    /// Short identifier used in file names and on the command line.
    pub fn as_str(self) -> &'static str {
        match self {
            MetricKind::Ssimu2 => "ssimu2",
            MetricKind::Xpsnr => "xpsnr",
        }
    }

    /// Full metric name used in plot titles.
    pub fn display_name(self) -> &'static str {
        match self {
            MetricKind::Ssimu2 => "SSIMULACRA2",
            MetricKind::Xpsnr => "XPSNR",
        }
    }
}

impl FromStr for MetricKind {
    type Err = SweepError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ssimu2" => Ok(MetricKind::Ssimu2),
            "xpsnr" => Ok(MetricKind::Xpsnr),
            other => Err(SweepError::UnsupportedMetric(other.to_string())),
        }
    }
}

/// One point on a rate-distortion curve: a quality level, the statistic
/// value measured there, and the container-reported bitrate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatePoint {
    /// Encoder quality parameter (CRF) for this level.
    pub crf: u32,
    /// Statistic value (which statistic depends on the owning view).
    pub score: f64,
    /// Achieved bitrate in kb/s.
    pub bitrate: f64,
}

/// Produces an encoded artifact for one quality level.
///
/// Synchronous; implementations report a non-zero encoder exit as
/// [`SweepError::Encode`].
pub trait Encoder {
    /// Encode `source` at quality `crf`, writing the artifact to `dest`.
    fn encode(&self, source: &Path, crf: u32, dest: &Path) -> Result<()>;
}

/// Produces the finite, ordered per-frame score stream for one
/// (source, encoded) pair.
pub trait ScoreSource {
    /// Stream one score per sampled frame pair, in temporal frame order,
    /// keeping only every `stride`-th frame when `stride > 1`.
    fn stream(
        &self,
        source: &Path,
        encoded: &Path,
        metric: MetricKind,
        stride: usize,
    ) -> Result<Box<dyn Iterator<Item = Result<f64>>>>;
}

/// Reads the container-reported average bitrate of an artifact.
pub trait BitrateProbe {
    /// Bitrate in kb/s; fails with [`SweepError::BitrateProbe`] when the
    /// container exposes no bitrate metadata.
    fn bitrate_kbps(&self, artifact: &Path) -> Result<f64>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_kind_parsing() {
        assert_eq!("ssimu2".parse::<MetricKind>().unwrap(), MetricKind::Ssimu2);
        assert_eq!("xpsnr".parse::<MetricKind>().unwrap(), MetricKind::Xpsnr);
        assert!(matches!(
            "vmaf".parse::<MetricKind>(),
            Err(SweepError::UnsupportedMetric(s)) if s == "vmaf"
        ));
    }

    #[test]
    fn test_metric_kind_names() {
        assert_eq!(MetricKind::Ssimu2.as_str(), "ssimu2");
        assert_eq!(MetricKind::Xpsnr.display_name(), "XPSNR");
    }

    #[test]
    fn test_rate_point_json_shape() {
        let point = RatePoint {
            crf: 20,
            score: 83.4,
            bitrate: 1532.8,
        };
        let json = serde_json::to_string(&point).unwrap();
        assert!(json.contains("\"crf\":20"));
        assert!(json.contains("\"score\":83.4"));
        assert!(json.contains("\"bitrate\":1532.8"));
    }
}
