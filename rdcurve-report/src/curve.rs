//! Curve assembly
//!
//! A [`CurveSet`] is an insertion-ordered mapping from codec label to that
//! codec's sweep-ordered rate points. Nothing is re-sorted, aligned or
//! interpolated across codecs; consumers must not assume the series are
//! monotonic in bitrate.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use rdcurve_stats::StatView;
use rdcurve_sweep::{MetricKind, RatePoint, SweepOutcome};

use crate::PlotFormat;

/// Insertion-ordered mapping of codec label to rate-distortion series.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CurveSet {
    entries: Vec<(String, Vec<RatePoint>)>,
}

impl CurveSet {
    /// Empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one labeled series; insertion order is the order keys are
    /// serialized and rendered in.
    pub fn insert(&mut self, label: impl Into<String>, points: Vec<RatePoint>) {
        self.entries.push((label.into(), points));
    }

    /// Series for a label, if present.
    pub fn get(&self, label: &str) -> Option<&[RatePoint]> {
        self.entries
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, points)| points.as_slice())
    }

    /// Labeled series in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[RatePoint])> {
        self.entries
            .iter()
            .map(|(label, points)| (label.as_str(), points.as_slice()))
    }

    /// Number of labeled series.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the set holds no series.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for CurveSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (label, points) in &self.entries {
            map.serialize_entry(label, points)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for CurveSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct CurveSetVisitor;

        impl<'de> Visitor<'de> for CurveSetVisitor {
            type Value = CurveSet;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "a map of codec label to rate points")
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut map: A,
            ) -> std::result::Result<Self::Value, A::Error> {
                let mut set = CurveSet::new();
                while let Some((label, points)) = map.next_entry::<String, Vec<RatePoint>>()? {
                    set.insert(label, points);
                }
                Ok(set)
            }
        }

        deserializer.deserialize_map(CurveSetVisitor)
    }
}

/// Assemble two codecs' outcomes into one comparable set for a single
/// statistic view, preserving each codec's sweep order.
pub fn assemble(view: StatView, a: &SweepOutcome, b: &SweepOutcome) -> CurveSet {
    let mut set = CurveSet::new();
    set.insert(a.label.clone(), a.view(view).to_vec());
    set.insert(b.label.clone(), b.view(view).to_vec());
    set
}

/// Everything one comparison run produced: the four statistic-view curve
/// sets, the encoder invocations used, and the run's scope metadata.
/// Immutable once built.
#[derive(Debug, Clone)]
pub struct Comparison {
    /// Source file stem used in output file names and titles.
    pub input_base: String,
    /// First codec's label.
    pub codec_a: String,
    /// Second codec's label.
    pub codec_b: String,
    /// Frame sampling stride used for measurement.
    pub stride: usize,
    /// Metric the curves were measured with.
    pub metric: MetricKind,
    /// When the first sweep started.
    pub started_at: DateTime<Utc>,
    /// (label, encoder command line) pairs, in sweep order.
    pub commands: Vec<(String, String)>,
    views: [CurveSet; 4],
}

impl Comparison {
    /// Assemble a run from both codecs' outcomes.
    pub fn new(
        input_base: impl Into<String>,
        stride: usize,
        metric: MetricKind,
        a: &SweepOutcome,
        b: &SweepOutcome,
        commands: Vec<(String, String)>,
    ) -> Self {
        let views = StatView::ALL.map(|view| assemble(view, a, b));
        Self {
            input_base: input_base.into(),
            codec_a: a.label.clone(),
            codec_b: b.label.clone(),
            stride,
            metric,
            started_at: a.started_at,
            commands,
            views,
        }
    }

    /// The assembled curves for one statistic view.
    pub fn view(&self, view: StatView) -> &CurveSet {
        &self.views[view.index()]
    }

    fn name_stem(&self, kind: &str) -> String {
        format!(
            "{}_{}-{}_vs_{}_every-{}-{}",
            self.input_base,
            kind,
            self.codec_a,
            self.codec_b,
            self.stride,
            self.metric.as_str()
        )
    }

    /// Results JSON path for one view; the mean view carries no suffix.
    pub fn result_path(&self, dir: &Path, view: StatView) -> PathBuf {
        let stem = self.name_stem("results");
        let name = match view {
            StatView::Mean => format!("{stem}.json"),
            other => format!("{stem}-{}.json", other.suffix()),
        };
        dir.join(name)
    }

    /// Path for the persisted encoder command lines.
    pub fn commands_path(&self, dir: &Path) -> PathBuf {
        dir.join(format!("{}.json", self.name_stem("commands")))
    }

    /// Plot image path for one view.
    pub fn plot_path(&self, dir: &Path, view: StatView, format: PlotFormat) -> PathBuf {
        dir.join(format!(
            "{}-{}.{}",
            self.name_stem("curve"),
            view.suffix(),
            format.extension()
        ))
    }

    /// Plot title for this run.
    pub fn title(&self) -> String {
        format!(
            "{}: {} vs {} ({})",
            self.input_base,
            self.codec_a,
            self.codec_b,
            self.metric.display_name()
        )
    }

    /// Y-axis description for one view.
    pub fn y_label(&self, view: StatView) -> String {
        format!(
            "{} {} Score",
            view.axis_label(),
            self.metric.display_name()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rdcurve_stats::StatView;

    fn point(crf: u32, score: f64, bitrate: f64) -> RatePoint {
        RatePoint {
            crf,
            score,
            bitrate,
        }
    }

    #[test]
    fn test_insertion_order_is_preserved() {
        let mut set = CurveSet::new();
        set.insert("x265", vec![point(10, 80.0, 900.0), point(20, 70.0, 500.0)]);
        set.insert("x264", vec![point(15, 75.0, 1100.0)]);

        let labels: Vec<_> = set.iter().map(|(l, _)| l).collect();
        assert_eq!(labels, vec!["x265", "x264"]);

        let json = serde_json::to_string(&set).unwrap();
        let x265_pos = json.find("x265").unwrap();
        let x264_pos = json.find("x264").unwrap();
        assert!(x265_pos < x264_pos);
    }

    #[test]
    fn test_per_codec_order_survives_round_trip() {
        let mut set = CurveSet::new();
        set.insert(
            "a",
            vec![
                point(15, 80.0, 1500.0),
                point(20, 75.0, 1000.0),
                point(25, 70.0, 700.0),
            ],
        );
        set.insert("b", vec![point(10, 85.0, 2000.0), point(20, 72.0, 800.0)]);

        let json = serde_json::to_string_pretty(&set).unwrap();
        let loaded: CurveSet = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded, set);
        assert_eq!(
            loaded
                .get("a")
                .unwrap()
                .iter()
                .map(|p| p.crf)
                .collect::<Vec<_>>(),
            vec![15, 20, 25]
        );
        assert_eq!(
            loaded
                .get("b")
                .unwrap()
                .iter()
                .map(|p| p.crf)
                .collect::<Vec<_>>(),
            vec![10, 20]
        );
    }

    #[test]
    fn test_result_path_convention() {
        let comparison = Comparison {
            input_base: "clip".to_string(),
            codec_a: "x264".to_string(),
            codec_b: "x265".to_string(),
            stride: 3,
            metric: MetricKind::Ssimu2,
            started_at: Utc::now(),
            commands: Vec::new(),
            views: Default::default(),
        };

        let dir = Path::new("json_logs");
        assert_eq!(
            comparison.result_path(dir, StatView::Mean),
            dir.join("clip_results-x264_vs_x265_every-3-ssimu2.json")
        );
        assert_eq!(
            comparison.result_path(dir, StatView::HarmonicMean),
            dir.join("clip_results-x264_vs_x265_every-3-ssimu2-harmean.json")
        );
        assert_eq!(
            comparison.commands_path(dir),
            dir.join("clip_commands-x264_vs_x265_every-3-ssimu2.json")
        );
        assert_eq!(
            comparison.plot_path(Path::new("plots"), StatView::P10, PlotFormat::Svg),
            Path::new("plots").join("clip_curve-x264_vs_x265_every-3-ssimu2-p10.svg")
        );
    }

    #[test]
    fn test_title_and_labels() {
        let comparison = Comparison {
            input_base: "clip".to_string(),
            codec_a: "x264".to_string(),
            codec_b: "x265".to_string(),
            stride: 1,
            metric: MetricKind::Xpsnr,
            started_at: Utc::now(),
            commands: Vec::new(),
            views: Default::default(),
        };
        assert_eq!(comparison.title(), "clip: x264 vs x265 (XPSNR)");
        assert_eq!(
            comparison.y_label(StatView::StdDev),
            "Standard Deviation XPSNR Score"
        );
    }
}
