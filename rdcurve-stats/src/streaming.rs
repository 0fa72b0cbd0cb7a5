//! Streaming accumulation with cadenced interim statistics

use crate::{reduce, Result, ScoreSummary};

/// How many scores arrive between interim recomputations by default.
pub const DEFAULT_CADENCE: usize = 24;

/// Accumulates per-frame scores from a finite, non-restartable stream and
/// periodically recomputes the summary statistics over everything seen so
/// far.
///
/// Every `cadence` scores the accumulator reduces the full prefix and hands
/// the interim summary to the progress callback, so the displayed values
/// always match a from-scratch reduction. The callback is a one-way
/// notification; it cannot reach back into the accumulator.
pub struct ScoreAccumulator<'a> {
    scores: Vec<f64>,
    cadence: usize,
    progress: Option<Box<dyn FnMut(&ScoreSummary, usize) + 'a>>,
}

impl<'a> ScoreAccumulator<'a> {
    /// Create an accumulator that recomputes every `cadence` scores.
    ///
    /// A cadence of zero is treated as one (recompute on every score).
    pub fn new(cadence: usize) -> Self {
        Self {
            scores: Vec::new(),
            cadence: cadence.max(1),
            progress: None,
        }
    }

    /// Attach a progress callback receiving the interim summary and the
    /// number of scores it covers.
    pub fn on_progress(mut self, callback: impl FnMut(&ScoreSummary, usize) + 'a) -> Self {
        self.progress = Some(Box::new(callback));
        self
    }

    /// Consume the next score from the stream.
    pub fn push(&mut self, score: f64) {
        self.scores.push(score);

        // Fires on the first score and every `cadence` scores after it.
        if (self.scores.len() - 1) % self.cadence == 0 {
            if let Some(callback) = self.progress.as_mut() {
                if let Ok(summary) = reduce(&self.scores) {
                    callback(&summary, self.scores.len());
                }
            }
        }
    }

    /// Number of scores consumed so far.
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    /// Whether any score has been consumed.
    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// The scores consumed so far, in arrival order.
    pub fn scores(&self) -> &[f64] {
        &self.scores
    }

    /// Finish the stream and reduce the complete sequence.
    ///
    /// Equals [`reduce`] over everything pushed, for any cadence. Fails with
    /// `EmptyInput` if the stream produced no scores.
    pub fn finish(self) -> Result<ScoreSummary> {
        reduce(&self.scores)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StatsError;

    #[test]
    fn test_final_summary_matches_full_reduction() {
        let scores: Vec<f64> = (0..100).map(|i| 40.0 + (i as f64 * 0.37).sin()).collect();
        let expected = reduce(&scores).unwrap();

        for cadence in [1, 2, 7, 24, 1000] {
            let mut acc = ScoreAccumulator::new(cadence);
            for s in &scores {
                acc.push(*s);
            }
            assert_eq!(acc.finish().unwrap(), expected, "cadence {cadence}");
        }
    }

    #[test]
    fn test_interim_matches_prefix_reduction() {
        let scores = [70.0, 65.0, 80.0, 75.0, 72.0, 68.0, 71.0];
        let mut seen: Vec<(usize, ScoreSummary)> = Vec::new();

        let mut acc =
            ScoreAccumulator::new(3).on_progress(|summary, count| seen.push((count, *summary)));
        for s in scores {
            acc.push(s);
        }
        drop(acc);

        // Fires at counts 1, 4, 7 for cadence 3.
        assert_eq!(
            seen.iter().map(|(n, _)| *n).collect::<Vec<_>>(),
            vec![1, 4, 7]
        );
        for (count, summary) in seen {
            assert_eq!(summary, reduce(&scores[..count]).unwrap());
        }
    }

    #[test]
    fn test_cadence_one_fires_every_score() {
        let mut fired = 0usize;
        let mut acc = ScoreAccumulator::new(1).on_progress(|_, _| fired += 1);
        for s in [1.0, 2.0, 3.0, 4.0] {
            acc.push(s);
        }
        drop(acc);
        assert_eq!(fired, 4);
    }

    #[test]
    fn test_zero_cadence_is_clamped() {
        let mut fired = 0usize;
        let mut acc = ScoreAccumulator::new(0).on_progress(|_, _| fired += 1);
        acc.push(1.0);
        acc.push(2.0);
        drop(acc);
        assert_eq!(fired, 2);
    }

    #[test]
    fn test_empty_stream_fails() {
        let acc = ScoreAccumulator::new(DEFAULT_CADENCE);
        assert_eq!(acc.finish(), Err(StatsError::EmptyInput));
    }

    #[test]
    fn test_no_callback_is_fine() {
        let mut acc = ScoreAccumulator::new(2);
        acc.push(10.0);
        acc.push(12.0);
        let summary = acc.finish().unwrap();
        assert!((summary.mean - 11.0).abs() < 1e-12);
    }
}
