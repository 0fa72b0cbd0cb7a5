//! Score reduction into summary statistics

use crate::{Result, StatsError};

/// The four summary statistics derived from one score series.
///
/// Recomputing from the same series always yields the same values; there is
/// no shared accumulator between the four fields.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreSummary {
    /// Arithmetic mean over all scores, non-positive ones included.
    pub mean: f64,
    /// Reciprocal-based mean with an asymmetric penalty for non-positive
    /// scores; see [`reduce`].
    pub harmonic_mean: f64,
    /// Population standard deviation (divide by N).
    pub std_dev: f64,
    /// 10th percentile, nearest-rank on the sorted series.
    pub p10: f64,
}

impl ScoreSummary {
    /// Get the statistic selected by `view`.
    pub fn view(&self, view: StatView) -> f64 {
        match view {
            StatView::Mean => self.mean,
            StatView::HarmonicMean => self.harmonic_mean,
            StatView::StdDev => self.std_dev,
            StatView::P10 => self.p10,
        }
    }
}

/// Which summary statistic a curve is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatView {
    /// Arithmetic mean
    Mean,
    /// Harmonic mean
    HarmonicMean,
    /// Population standard deviation
    StdDev,
    /// 10th percentile
    P10,
}

impl StatView {
    /// All views, in the order curves are derived and persisted.
    pub const ALL: [StatView; 4] = [
        StatView::Mean,
        StatView::HarmonicMean,
        StatView::StdDev,
        StatView::P10,
    ];

    /// Stable position of this view inside [`StatView::ALL`].
    pub fn index(self) -> usize {
        match self {
            StatView::Mean => 0,
            StatView::HarmonicMean => 1,
            StatView::StdDev => 2,
            StatView::P10 => 3,
        }
    }

    /// Short identifier used in file names.
    pub fn suffix(self) -> &'static str {
        match self {
            StatView::Mean => "mean",
            StatView::HarmonicMean => "harmean",
            StatView::StdDev => "stddev",
            StatView::P10 => "p10",
        }
    }

    /// Human-readable name used on plot axes.
    pub fn axis_label(self) -> &'static str {
        match self {
            StatView::Mean => "Average",
            StatView::HarmonicMean => "Harmonic Mean",
            StatView::StdDev => "Standard Deviation",
            StatView::P10 => "10th Percentile",
        }
    }
}

/// Reduce an ordered, non-empty score series into its summary statistics.
///
/// The harmonic mean partitions scores into positive and non-positive
/// subsets. With no positive scores it is `0.0` (a sentinel, not an error).
/// Otherwise it is `|positive| / (sum(1/p) - sum(1/z))`: reciprocals of
/// non-positive scores are subtracted so degenerate frames pull the value
/// down instead of being dropped.
///
/// The 10th percentile is nearest-rank: the value at sorted index
/// `floor(0.1 * N)`, which for fewer than ten scores selects index 0.
pub fn reduce(scores: &[f64]) -> Result<ScoreSummary> {
    if scores.is_empty() {
        return Err(StatsError::EmptyInput);
    }

    let n = scores.len() as f64;
    let mean = scores.iter().sum::<f64>() / n;

    let positive_count = scores.iter().filter(|s| **s > 0.0).count();
    let harmonic_mean = if positive_count == 0 {
        0.0
    } else {
        let pos_reciprocals: f64 = scores
            .iter()
            .filter(|s| **s > 0.0)
            .map(|s| 1.0 / s)
            .sum();
        let nonpos_reciprocals: f64 = scores
            .iter()
            .filter(|s| **s <= 0.0)
            .map(|s| 1.0 / s)
            .sum();
        positive_count as f64 / (pos_reciprocals - nonpos_reciprocals)
    };

    let variance = scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n;
    let std_dev = variance.sqrt();

    let mut sorted = scores.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let p10 = sorted[(n * 0.1).floor() as usize];

    Ok(ScoreSummary {
        mean,
        harmonic_mean,
        std_dev,
        p10,
    })
}
