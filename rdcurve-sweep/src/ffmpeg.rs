//! Process-backed collaborator implementations
//!
//! [`TemplateEncoder`] runs the user's encoder command, [`FfmpegScoreSource`]
//! computes per-frame metric scores with an ffmpeg filter graph, and
//! [`FfprobeBitrate`] reads the container bitrate with ffprobe.

use std::io::{BufRead, BufReader, Lines};
use std::path::Path;
use std::process::{Child, ChildStdout, Command, Stdio};

use tracing::debug;

use crate::{
    BitrateProbe, EncodeTemplate, Encoder, MetricKind, Result, ScoreSource, SweepError,
};

/// How much encoder stderr to keep in error messages.
const STDERR_TAIL: usize = 600;

/// Encoder that runs a parsed [`EncodeTemplate`] as a child process.
#[derive(Debug, Clone)]
pub struct TemplateEncoder {
    template: EncodeTemplate,
}

impl TemplateEncoder {
    /// Wrap a parsed template.
    pub fn new(template: EncodeTemplate) -> Self {
        Self { template }
    }

    /// The wrapped template.
    pub fn template(&self) -> &EncodeTemplate {
        &self.template
    }
}

impl Encoder for TemplateEncoder {
    fn encode(&self, source: &Path, crf: u32, dest: &Path) -> Result<()> {
        let mut cmd = self.template.command(source, dest, crf);
        debug!(program = self.template.program(), crf, "spawning encoder");

        let output = cmd.stdin(Stdio::null()).output()?;
        if !output.status.success() {
            return Err(SweepError::Encode {
                status: output.status.code().unwrap_or(-1),
                stderr: stderr_tail(&output.stderr),
            });
        }
        Ok(())
    }
}

/// Per-frame score stream backed by ffmpeg's `ssimulacra2` and `xpsnr`
/// filters, printing one score line per sampled frame to stdout.
#[derive(Debug, Clone, Copy)]
pub struct FfmpegScoreSource {
    threads: usize,
}

impl FfmpegScoreSource {
    /// `threads` is a hint passed to ffmpeg; zero means auto.
    pub fn new(threads: usize) -> Self {
        Self { threads }
    }

    fn filter_graph(metric: MetricKind, stride: usize) -> String {
        // Keep only every stride-th frame on both inputs so the pairing
        // stays aligned.
        let sample = if stride > 1 {
            format!("select='not(mod(n\\,{stride}))'")
        } else {
            "null".to_string()
        };
        match metric {
            MetricKind::Ssimu2 => format!(
                "[0:v]{sample}[dis];[1:v]{sample}[ref];\
                 [dis][ref]ssimulacra2,metadata=print:file=-"
            ),
            MetricKind::Xpsnr => format!(
                "[0:v]{sample}[dis];[1:v]{sample}[ref];\
                 [dis][ref]xpsnr=stats_file=-"
            ),
        }
    }
}

impl ScoreSource for FfmpegScoreSource {
    fn stream(
        &self,
        source: &Path,
        encoded: &Path,
        metric: MetricKind,
        stride: usize,
    ) -> Result<Box<dyn Iterator<Item = Result<f64>>>> {
        let graph = Self::filter_graph(metric, stride.max(1));

        let mut cmd = Command::new("ffmpeg");
        cmd.args(["-hide_banner", "-loglevel", "error"]);
        if self.threads > 0 {
            cmd.args(["-threads", &self.threads.to_string()]);
        }
        cmd.arg("-i")
            .arg(encoded)
            .arg("-i")
            .arg(source)
            .args(["-filter_complex", &graph, "-an", "-f", "null", "-"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());
        debug!(metric = metric.as_str(), stride, "spawning score stream");

        let mut child = cmd.spawn()?;
        let stdout = child.stdout.take().ok_or_else(|| {
            SweepError::ScoreStream("ffmpeg stdout was not captured".to_string())
        })?;

        Ok(Box::new(ScoreLines {
            lines: BufReader::new(stdout).lines(),
            child,
            parse: match metric {
                MetricKind::Ssimu2 => parse_ssimu2_line,
                MetricKind::Xpsnr => parse_xpsnr_line,
            },
            done: false,
        }))
    }
}

/// Lazily yields scores as ffmpeg emits them, then checks the exit status.
struct ScoreLines {
    lines: Lines<BufReader<ChildStdout>>,
    child: Child,
    parse: fn(&str) -> Option<f64>,
    done: bool,
}

impl Iterator for ScoreLines {
    type Item = Result<f64>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            match self.lines.next() {
                Some(Ok(line)) => {
                    if let Some(score) = (self.parse)(&line) {
                        return Some(Ok(score));
                    }
                }
                Some(Err(err)) => {
                    self.done = true;
                    return Some(Err(err.into()));
                }
                None => {
                    self.done = true;
                    return match self.child.wait() {
                        Ok(status) if status.success() => None,
                        Ok(status) => Some(Err(SweepError::ScoreStream(format!(
                            "ffmpeg exited with status {}",
                            status.code().unwrap_or(-1)
                        )))),
                        Err(err) => Some(Err(err.into())),
                    };
                }
            }
        }
    }
}

/// Bitrate probe backed by ffprobe's container stream metadata.
///
/// Only some containers (MP4, MOV) expose an average bitrate; everything
/// else fails the probe.
#[derive(Debug, Clone, Copy, Default)]
pub struct FfprobeBitrate;

impl BitrateProbe for FfprobeBitrate {
    fn bitrate_kbps(&self, artifact: &Path) -> Result<f64> {
        let output = Command::new("ffprobe")
            .args([
                "-v",
                "quiet",
                "-select_streams",
                "v:0",
                "-show_entries",
                "stream=bit_rate",
                "-of",
                "default=noprint_wrappers=1:nokey=1",
            ])
            .arg(artifact)
            .stdin(Stdio::null())
            .output()?;

        if !output.status.success() {
            return Err(SweepError::BitrateProbe {
                path: artifact.to_path_buf(),
                reason: format!(
                    "ffprobe exited with status {}",
                    output.status.code().unwrap_or(-1)
                ),
            });
        }

        let text = String::from_utf8_lossy(&output.stdout);
        parse_bitrate_kbps(&text).ok_or_else(|| SweepError::BitrateProbe {
            path: artifact.to_path_buf(),
            reason: format!("container reports no bitrate (got '{}')", text.trim()),
        })
    }
}

/// Parse ffprobe's bit_rate value (bits per second) into kb/s.
fn parse_bitrate_kbps(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed == "N/A" {
        return None;
    }
    trimmed.parse::<f64>().ok().map(|bps| bps / 1000.0)
}

/// Parse one `metadata=print` line from the ssimulacra2 filter.
///
/// Score lines look like `lavfi.ssimulacra2.score=84.557861`; frame marker
/// lines (`frame:0 pts:...`) yield nothing.
fn parse_ssimu2_line(line: &str) -> Option<f64> {
    line.trim()
        .strip_prefix("lavfi.ssimulacra2.score=")?
        .parse()
        .ok()
}

/// Parse one per-frame line from the xpsnr filter's stats file, taking the
/// luma value. E.g. `n: 1  XPSNR y: 34.5190  XPSNR u: 38.2310  XPSNR v: 39.0062`.
fn parse_xpsnr_line(line: &str) -> Option<f64> {
    if !line.contains("XPSNR") {
        return None;
    }
    let after = &line[line.find("y:")? + 2..];
    after.split_whitespace().next()?.parse().ok()
}

fn stderr_tail(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    let trimmed = text.trim();
    match trimmed.char_indices().nth_back(STDERR_TAIL) {
        Some((idx, _)) => format!("...{}", &trimmed[idx..]),
        None => trimmed.to_string(),
    }
}
