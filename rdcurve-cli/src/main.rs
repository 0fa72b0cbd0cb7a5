//! rdcurve CLI - encode a source with two codecs across a CRF sweep, score
//! every encode against the source, and compare the resulting
//! rate-distortion curves.

use std::path::PathBuf;
use std::process::exit;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::debug;

use rdcurve_report::{persist, persist_commands, render, Comparison, OutputDirs, PlotFormat};
use rdcurve_stats::{ScoreSummary, StatView};
use rdcurve_sweep::{
    EncodeTemplate, FfmpegScoreSource, FfprobeBitrate, MetricKind, SweepConfig, SweepObserver,
    SweepRunner, TemplateEncoder,
};

/// Default encoder invocation for the first codec.
const X264_TEMPLATE: &str = "ffmpeg -y -hide_banner -loglevel error -i {input} \
     -pix_fmt yuv420p -c:v libx264 -preset ultrafast -crf {crf} -profile:v high {output}";

/// Default encoder invocation for the second codec.
const X265_TEMPLATE: &str = "ffmpeg -y -hide_banner -loglevel error -i {input} \
     -pix_fmt yuv420p -c:v libx265 -preset ultrafast -crf {crf} -profile:v main {output}";

/// Command-line arguments for the rdcurve tool.
#[derive(Parser, Debug)]
#[command(name = "rdcurve")]
#[command(version)]
#[command(about = "Compare two video encoders on rate-distortion curves")]
#[command(long_about = "Encode a source video with two codecs across a CRF sweep, \
    measure per-frame quality against the source, and plot score-vs-bitrate \
    curves for four statistics (mean, harmonic mean, standard deviation, \
    10th percentile).\n\n\
    EXAMPLES:\n    \
    rdcurve clip.mp4\n    \
    rdcurve clip.mp4 --crf-start-1 20 --crf-end-1 40 --crf-step-1 4\n    \
    rdcurve clip.mp4 -e 3 -f png\n    \
    rdcurve clip.mp4 --codec-1 aom --template-1 'ffmpeg -y -i {input} -c:v libaom-av1 -crf {crf} {output}'")]
struct Args {
    /// Source video path
    source: PathBuf,

    /// Starting CRF value (first codec)
    #[arg(long, default_value_t = 15)]
    crf_start_1: u32,

    /// Ending CRF value, inclusive (first codec)
    #[arg(long, default_value_t = 35)]
    crf_end_1: u32,

    /// CRF step size (first codec)
    #[arg(long, default_value_t = 5)]
    crf_step_1: u32,

    /// Starting CRF value (second codec)
    #[arg(long, default_value_t = 15)]
    crf_start_2: u32,

    /// Ending CRF value, inclusive (second codec)
    #[arg(long, default_value_t = 35)]
    crf_end_2: u32,

    /// CRF step size (second codec)
    #[arg(long, default_value_t = 5)]
    crf_step_2: u32,

    /// Only score every nth frame
    #[arg(short, long, default_value_t = 1)]
    every: usize,

    /// Number of ffmpeg threads for scoring (0 = auto)
    #[arg(short, long, default_value_t = 0)]
    threads: usize,

    /// Plot image format (svg, png, webp)
    #[arg(short, long, default_value = "svg")]
    format: String,

    /// Quality metric (ssimu2, xpsnr)
    #[arg(short, long, default_value = "ssimu2")]
    metric: String,

    /// Label for the first codec
    #[arg(long, default_value = "x264")]
    codec_1: String,

    /// Label for the second codec
    #[arg(long, default_value = "x265")]
    codec_2: String,

    /// Encoder command for the first codec; must contain {input}, {output}
    /// and {crf}
    #[arg(long, default_value = X264_TEMPLATE)]
    template_1: String,

    /// Encoder command for the second codec; must contain {input}, {output}
    /// and {crf}
    #[arg(long, default_value = X265_TEMPLATE)]
    template_2: String,

    /// Directory to create plots/ and json_logs/ in (also holds the
    /// temporary encodes)
    #[arg(short, long, default_value = ".")]
    out_dir: PathBuf,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

/// Observer that renders sweep progress on the console.
struct ConsoleObserver {
    bar: Option<ProgressBar>,
}

impl ConsoleObserver {
    fn new() -> Self {
        Self { bar: None }
    }
}

impl SweepObserver for ConsoleObserver {
    fn encode_started(&mut self, label: &str, crf: u32) {
        println!("  {} {} @ CRF {}", style("encoding").cyan(), label, crf);
    }

    fn measure_started(&mut self, _label: &str, _crf: u32, metric: MetricKind) {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("  {spinner:.green} {pos} frames scored | {msg}")
                .unwrap(),
        );
        bar.enable_steady_tick(Duration::from_millis(100));
        bar.set_message(format!("measuring {}", metric.display_name()));
        self.bar = Some(bar);
    }

    fn scores_updated(&mut self, interim: &ScoreSummary, count: usize) {
        if let Some(bar) = &self.bar {
            bar.set_position(count as u64);
            bar.set_message(format_summary(interim));
        }
    }

    fn level_finished(&mut self, crf: u32, summary: &ScoreSummary, bitrate_kbps: f64) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
        println!(
            "  {} CRF {:>2}: {} | {:.0} kb/s",
            style("scored").green(),
            crf,
            format_summary(summary),
            bitrate_kbps
        );
    }
}

/// Format a score summary for the progress line.
fn format_summary(summary: &ScoreSummary) -> String {
    format!(
        "avg {:.2} | harmean {:.2} | std {:.2} | p10 {:.2}",
        summary.mean, summary.harmonic_mean, summary.std_dev, summary.p10
    )
}

fn print_configuration(args: &Args, metric: MetricKind, format: PlotFormat) {
    println!();
    println!("{}", style("Configuration:").cyan().bold());
    println!("  Source:    {}", style(args.source.display()).white());
    println!("  Metric:    {}", style(metric.display_name()).white());
    println!("  Format:    {}", style(format.extension()).white());
    println!("  Stride:    every {} frame(s)", style(args.every).white());
    println!(
        "  {:10} CRF {}..={} step {}",
        format!("{}:", args.codec_1),
        args.crf_start_1,
        args.crf_end_1,
        args.crf_step_1
    );
    println!(
        "  {:10} CRF {}..={} step {}",
        format!("{}:", args.codec_2),
        args.crf_start_2,
        args.crf_end_2,
        args.crf_step_2
    );
    if args.threads > 0 {
        println!("  Threads:   {}", style(args.threads).white());
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(if args.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::WARN
        })
        .with_target(false)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    if !args.source.is_file() {
        eprintln!(
            "{} source not found: {}",
            style("Error:").red().bold(),
            args.source.display()
        );
        exit(1);
    }

    let format: PlotFormat = args.format.parse()?;
    let metric: MetricKind = args.metric.parse()?;
    let template_1 = EncodeTemplate::parse(&args.template_1)
        .with_context(|| format!("invalid encoder command for {}", args.codec_1))?;
    let template_2 = EncodeTemplate::parse(&args.template_2)
        .with_context(|| format!("invalid encoder command for {}", args.codec_2))?;

    let input_base = args
        .source
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("source")
        .to_string();

    let dirs = match OutputDirs::prepare(&args.out_dir) {
        Ok(dirs) => dirs,
        Err(err) => {
            eprintln!("{} {}", style("Error:").red().bold(), err);
            eprintln!("       Existing plots/ or json_logs/ must be cleaned up manually");
            exit(1);
        }
    };

    print_configuration(&args, metric, format);

    let scores = FfmpegScoreSource::new(args.threads);
    let probe = FfprobeBitrate;
    let mut observer = ConsoleObserver::new();

    println!();
    println!("{} {}", style("Sweeping:").cyan().bold(), args.codec_1);
    let encoder_1 = TemplateEncoder::new(template_1);
    let runner = SweepRunner::new(&encoder_1, &scores, &probe, &args.out_dir);
    let outcome_1 = runner
        .run(
            &SweepConfig::new(
                &args.codec_1,
                args.crf_start_1,
                args.crf_end_1,
                args.crf_step_1,
                args.every,
                metric,
            ),
            &args.source,
            &mut observer,
        )
        .with_context(|| format!("{} sweep failed", args.codec_1))?;

    println!();
    println!("{} {}", style("Sweeping:").cyan().bold(), args.codec_2);
    let encoder_2 = TemplateEncoder::new(template_2);
    let runner = SweepRunner::new(&encoder_2, &scores, &probe, &args.out_dir);
    let outcome_2 = runner
        .run(
            &SweepConfig::new(
                &args.codec_2,
                args.crf_start_2,
                args.crf_end_2,
                args.crf_step_2,
                args.every,
                metric,
            ),
            &args.source,
            &mut observer,
        )
        .with_context(|| format!("{} sweep failed", args.codec_2))?;

    let comparison = Comparison::new(
        input_base,
        args.every,
        metric,
        &outcome_1,
        &outcome_2,
        vec![
            (args.codec_1.clone(), encoder_1.template().command_line()),
            (args.codec_2.clone(), encoder_2.template().command_line()),
        ],
    );

    println!();
    println!("{}", style("Writing results").cyan().bold());
    for view in StatView::ALL {
        let curves = comparison.view(view);

        let result_path = comparison.result_path(&dirs.json_logs, view);
        persist(curves, &result_path)?;
        debug!(path = %result_path.display(), "results written");

        let plot_path = comparison.plot_path(&dirs.plots, view, format);
        render(
            curves,
            &plot_path,
            format,
            &comparison.title(),
            &comparison.y_label(view),
        )?;
        println!("  {}", plot_path.display());
    }
    persist_commands(&comparison.commands, &comparison.commands_path(&dirs.json_logs))?;

    println!();
    println!(
        "{} results in {} and {}",
        style("Done:").green().bold(),
        dirs.json_logs.display(),
        dirs.plots.display()
    );

    Ok(())
}
