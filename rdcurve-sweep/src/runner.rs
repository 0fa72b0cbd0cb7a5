//! Sweep execution
//!
//! One codec's sweep runs strictly sequentially: each quality level is fully
//! encoded, measured, probed and recorded before the next begins. A failure
//! at any level aborts the remaining sweep and discards the partial results;
//! only temp-artifact deletion is allowed to fail without aborting.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use rdcurve_stats::{ScoreAccumulator, ScoreSummary, StatView, DEFAULT_CADENCE};

use crate::{BitrateProbe, Encoder, MetricKind, RatePoint, Result, ScoreSource, SweepError};

/// Configuration for one codec's quality sweep.
#[derive(Debug, Clone)]
pub struct SweepConfig {
    /// Codec label used in file names and plot legends.
    pub label: String,
    /// First CRF value tested.
    pub crf_start: u32,
    /// Last CRF value tested (inclusive).
    pub crf_end: u32,
    /// CRF increment between levels; must be at least 1.
    pub crf_step: u32,
    /// Score every n-th frame (1 scores every frame).
    pub stride: usize,
    /// Quality metric to measure.
    pub metric: MetricKind,
    /// How many scores between interim progress recomputations.
    pub cadence: usize,
}

impl SweepConfig {
    /// Config with the default progress cadence.
    pub fn new(
        label: impl Into<String>,
        crf_start: u32,
        crf_end: u32,
        crf_step: u32,
        stride: usize,
        metric: MetricKind,
    ) -> Self {
        Self {
            label: label.into(),
            crf_start,
            crf_end,
            crf_step,
            stride,
            metric,
            cadence: DEFAULT_CADENCE,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.crf_step == 0 {
            return Err(SweepError::Config("crf step must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// One-way progress notifications emitted while a sweep runs.
///
/// Implementations observe; they cannot influence the sweep.
pub trait SweepObserver {
    /// An encode is starting for the given quality level.
    fn encode_started(&mut self, _label: &str, _crf: u32) {}

    /// The measurement pass is starting for the given quality level.
    fn measure_started(&mut self, _label: &str, _crf: u32, _metric: MetricKind) {}

    /// Interim statistics over the scores seen so far.
    fn scores_updated(&mut self, _interim: &ScoreSummary, _count: usize) {}

    /// A quality level finished with its final statistics and bitrate.
    fn level_finished(&mut self, _crf: u32, _summary: &ScoreSummary, _bitrate_kbps: f64) {}
}

/// Observer that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl SweepObserver for NullObserver {}

/// Everything one codec's sweep produced: one rate point per quality level
/// for each statistic view, all views sharing each level's bitrate.
#[derive(Debug, Clone)]
pub struct SweepOutcome {
    /// Codec label this sweep belongs to.
    pub label: String,
    /// When the sweep started.
    pub started_at: DateTime<Utc>,
    points: [Vec<RatePoint>; 4],
}

impl SweepOutcome {
    fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            started_at: Utc::now(),
            points: Default::default(),
        }
    }

    /// Rate points for one statistic view, in sweep order.
    pub fn view(&self, view: StatView) -> &[RatePoint] {
        &self.points[view.index()]
    }

    /// Number of quality levels recorded.
    pub fn len(&self) -> usize {
        self.points[0].len()
    }

    /// Whether any level was recorded.
    pub fn is_empty(&self) -> bool {
        self.points[0].is_empty()
    }

    fn push(&mut self, crf: u32, summary: &ScoreSummary, bitrate: f64) {
        for view in StatView::ALL {
            self.points[view.index()].push(RatePoint {
                crf,
                score: summary.view(view),
                bitrate,
            });
        }
    }
}

/// Drives one codec's quality sweep against the collaborator traits.
pub struct SweepRunner<'a> {
    encoder: &'a dyn Encoder,
    scores: &'a dyn ScoreSource,
    probe: &'a dyn BitrateProbe,
    work_dir: PathBuf,
}

impl<'a> SweepRunner<'a> {
    /// Build a runner; `work_dir` is where temporary encoded artifacts are
    /// written (and removed again, one level at a time).
    pub fn new(
        encoder: &'a dyn Encoder,
        scores: &'a dyn ScoreSource,
        probe: &'a dyn BitrateProbe,
        work_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            encoder,
            scores,
            probe,
            work_dir: work_dir.into(),
        }
    }

    /// Run the full sweep for one codec.
    ///
    /// Fail-fast: the first encode, measurement or probe error aborts the
    /// remaining levels and the partial outcome is dropped.
    pub fn run(
        &self,
        config: &SweepConfig,
        source: &Path,
        observer: &mut dyn SweepObserver,
    ) -> Result<SweepOutcome> {
        config.validate()?;

        let mut outcome = SweepOutcome::new(&config.label);
        let mut crf = config.crf_start;
        while crf <= config.crf_end {
            let artifact = self
                .work_dir
                .join(format!("encoded_{}_crf{}.mp4", config.label, crf));

            info!(codec = %config.label, crf, "encoding");
            observer.encode_started(&config.label, crf);
            self.encoder.encode(source, crf, &artifact)?;

            info!(codec = %config.label, crf, metric = config.metric.as_str(), "measuring");
            observer.measure_started(&config.label, crf, config.metric);
            let measured = self.measure(config, source, &artifact, observer);

            // The artifact is removed no matter how measurement went; a
            // failed deletion is logged and the sweep carries on.
            if let Err(err) = fs::remove_file(&artifact) {
                warn!(artifact = %artifact.display(), %err, "could not remove encoded artifact");
            }

            let (summary, bitrate) = measured?;
            outcome.push(crf, &summary, bitrate);
            observer.level_finished(crf, &summary, bitrate);

            crf += config.crf_step;
        }

        Ok(outcome)
    }

    fn measure(
        &self,
        config: &SweepConfig,
        source: &Path,
        artifact: &Path,
        observer: &mut dyn SweepObserver,
    ) -> Result<(ScoreSummary, f64)> {
        let stream = self
            .scores
            .stream(source, artifact, config.metric, config.stride)?;

        let mut accumulator = ScoreAccumulator::new(config.cadence)
            .on_progress(|interim, count| observer.scores_updated(interim, count));
        for score in stream {
            accumulator.push(score?);
        }
        let summary = accumulator.finish()?;

        let bitrate = self.probe.bitrate_kbps(artifact)?;
        Ok((summary, bitrate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rdcurve_stats::reduce;
    use std::cell::RefCell;
    use std::fs;

    struct StubEncoder {
        fail_at_crf: Option<u32>,
    }

    impl Encoder for StubEncoder {
        fn encode(&self, _source: &Path, crf: u32, dest: &Path) -> Result<()> {
            if self.fail_at_crf == Some(crf) {
                return Err(SweepError::Encode {
                    status: 1,
                    stderr: "simulated encoder failure".to_string(),
                });
            }
            fs::write(dest, b"artifact").map_err(SweepError::from)
        }
    }

    struct StubScores {
        per_level: RefCell<Vec<Vec<f64>>>,
    }

    impl StubScores {
        fn new(levels: Vec<Vec<f64>>) -> Self {
            let mut reversed = levels;
            reversed.reverse();
            Self {
                per_level: RefCell::new(reversed),
            }
        }
    }

    impl ScoreSource for StubScores {
        fn stream(
            &self,
            _source: &Path,
            _encoded: &Path,
            _metric: MetricKind,
            _stride: usize,
        ) -> Result<Box<dyn Iterator<Item = Result<f64>>>> {
            let scores = self
                .per_level
                .borrow_mut()
                .pop()
                .expect("more levels requested than stubbed");
            Ok(Box::new(scores.into_iter().map(Ok)))
        }
    }

    struct StubProbe {
        bitrate: f64,
    }

    impl BitrateProbe for StubProbe {
        fn bitrate_kbps(&self, _artifact: &Path) -> Result<f64> {
            Ok(self.bitrate)
        }
    }

    fn config(label: &str, start: u32, end: u32, step: u32) -> SweepConfig {
        SweepConfig::new(label, start, end, step, 1, MetricKind::Ssimu2)
    }

    #[test]
    fn test_sweep_records_one_point_per_level_per_view() {
        let dir = tempfile::tempdir().unwrap();
        let encoder = StubEncoder { fail_at_crf: None };
        let scores = StubScores::new(vec![
            vec![80.0, 82.0, 78.0],
            vec![75.0, 77.0, 73.0],
            vec![70.0, 72.0, 68.0],
        ]);
        let probe = StubProbe { bitrate: 1200.0 };
        let runner = SweepRunner::new(&encoder, &scores, &probe, dir.path());

        let outcome = runner
            .run(&config("x264", 15, 25, 5), Path::new("src.mp4"), &mut NullObserver)
            .unwrap();

        assert_eq!(outcome.len(), 3);
        for view in StatView::ALL {
            let points = outcome.view(view);
            assert_eq!(
                points.iter().map(|p| p.crf).collect::<Vec<_>>(),
                vec![15, 20, 25]
            );
            // All views share the level's bitrate.
            assert!(points.iter().all(|p| p.bitrate == 1200.0));
        }

        let expected = reduce(&[80.0, 82.0, 78.0]).unwrap();
        assert_eq!(outcome.view(StatView::Mean)[0].score, expected.mean);
        assert_eq!(outcome.view(StatView::P10)[0].score, expected.p10);
    }

    #[test]
    fn test_sweep_end_is_inclusive() {
        let dir = tempfile::tempdir().unwrap();
        let encoder = StubEncoder { fail_at_crf: None };
        let scores = StubScores::new(vec![vec![50.0], vec![55.0]]);
        let probe = StubProbe { bitrate: 900.0 };
        let runner = SweepRunner::new(&encoder, &scores, &probe, dir.path());

        let outcome = runner
            .run(&config("x265", 15, 25, 10), Path::new("src.mp4"), &mut NullObserver)
            .unwrap();
        assert_eq!(
            outcome
                .view(StatView::Mean)
                .iter()
                .map(|p| p.crf)
                .collect::<Vec<_>>(),
            vec![15, 25]
        );
    }

    #[test]
    fn test_encode_failure_aborts_sweep() {
        let dir = tempfile::tempdir().unwrap();
        let encoder = StubEncoder {
            fail_at_crf: Some(20),
        };
        let scores = StubScores::new(vec![vec![60.0, 61.0]]);
        let probe = StubProbe { bitrate: 800.0 };
        let runner = SweepRunner::new(&encoder, &scores, &probe, dir.path());

        let err = runner
            .run(&config("x264", 15, 25, 5), Path::new("src.mp4"), &mut NullObserver)
            .unwrap_err();
        assert!(matches!(err, SweepError::Encode { status: 1, .. }));
    }

    #[test]
    fn test_artifacts_are_removed() {
        let dir = tempfile::tempdir().unwrap();
        let encoder = StubEncoder { fail_at_crf: None };
        let scores = StubScores::new(vec![vec![60.0], vec![62.0]]);
        let probe = StubProbe { bitrate: 700.0 };
        let runner = SweepRunner::new(&encoder, &scores, &probe, dir.path());

        runner
            .run(&config("x264", 15, 20, 5), Path::new("src.mp4"), &mut NullObserver)
            .unwrap();

        let leftovers: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert!(leftovers.is_empty(), "temp artifacts left behind");
    }

    #[test]
    fn test_empty_score_stream_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let encoder = StubEncoder { fail_at_crf: None };
        let scores = StubScores::new(vec![vec![]]);
        let probe = StubProbe { bitrate: 700.0 };
        let runner = SweepRunner::new(&encoder, &scores, &probe, dir.path());

        let err = runner
            .run(&config("x264", 15, 15, 5), Path::new("src.mp4"), &mut NullObserver)
            .unwrap_err();
        assert!(matches!(err, SweepError::Stats(_)));
    }

    #[test]
    fn test_zero_step_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let encoder = StubEncoder { fail_at_crf: None };
        let scores = StubScores::new(vec![]);
        let probe = StubProbe { bitrate: 700.0 };
        let runner = SweepRunner::new(&encoder, &scores, &probe, dir.path());

        let err = runner
            .run(&config("x264", 15, 25, 0), Path::new("src.mp4"), &mut NullObserver)
            .unwrap_err();
        assert!(matches!(err, SweepError::Config(_)));
    }

    #[test]
    fn test_observer_sees_interim_statistics() {
        struct Recorder {
            interim_counts: Vec<usize>,
            finished: Vec<u32>,
        }
        impl SweepObserver for Recorder {
            fn scores_updated(&mut self, _interim: &ScoreSummary, count: usize) {
                self.interim_counts.push(count);
            }
            fn level_finished(&mut self, crf: u32, _summary: &ScoreSummary, _bitrate: f64) {
                self.finished.push(crf);
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let encoder = StubEncoder { fail_at_crf: None };
        let scores = StubScores::new(vec![(0..50).map(|i| 60.0 + i as f64).collect()]);
        let probe = StubProbe { bitrate: 500.0 };
        let runner = SweepRunner::new(&encoder, &scores, &probe, dir.path());

        let mut recorder = Recorder {
            interim_counts: Vec::new(),
            finished: Vec::new(),
        };
        let mut cfg = config("x264", 15, 15, 5);
        cfg.cadence = 24;
        runner.run(&cfg, Path::new("src.mp4"), &mut recorder).unwrap();

        // Fires on the 1st score and every 24 after it.
        assert_eq!(recorder.interim_counts, vec![1, 25, 49]);
        assert_eq!(recorder.finished, vec![15]);
    }
}
