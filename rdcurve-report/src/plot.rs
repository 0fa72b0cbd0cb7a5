//! Rate-distortion plot rendering
//!
//! One static image per statistic view: bitrate on the x axis, statistic
//! value on the y axis, one annotated line per codec, dark styling. SVG is
//! rendered directly; PNG and WebP are rasterised into a pixel buffer and
//! encoded from there.

use std::path::Path;
use std::str::FromStr;

use plotters::coord::Shift;
use plotters::prelude::*;

use crate::{CurveSet, ReportError, Result};

/// Rendered image dimensions in pixels.
pub const PLOT_SIZE: (u32, u32) = (1000, 620);

const GREY: RGBColor = RGBColor(128, 128, 128);
const GAINSBORO: RGBColor = RGBColor(220, 220, 220);
const SERIES_COLORS: [RGBColor; 4] = [
    RGBColor(66, 165, 245),
    RGBColor(255, 167, 38),
    RGBColor(102, 187, 106),
    RGBColor(236, 64, 122),
];

/// Supported plot image formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlotFormat {
    /// Scalable vector graphics
    Svg,
    /// Portable network graphics
    Png,
    /// Lossless WebP
    Webp,
}

impl PlotFormat {
    /// File extension for this format.
    pub fn extension(self) -> &'static str {
        match self {
            PlotFormat::Svg => "svg",
            PlotFormat::Png => "png",
            PlotFormat::Webp => "webp",
        }
    }
}

impl FromStr for PlotFormat {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "svg" => Ok(PlotFormat::Svg),
            "png" => Ok(PlotFormat::Png),
            "webp" => Ok(PlotFormat::Webp),
            other => Err(ReportError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Render one curve set to a static image.
pub fn render(
    curves: &CurveSet,
    path: &Path,
    format: PlotFormat,
    title: &str,
    y_desc: &str,
) -> Result<()> {
    if curves.iter().all(|(_, points)| points.is_empty()) {
        return Err(ReportError::Render("no points to plot".to_string()));
    }

    match format {
        PlotFormat::Svg => {
            let root = SVGBackend::new(path, PLOT_SIZE).into_drawing_area();
            draw_chart(&root, curves, title, y_desc)?;
            root.present().map_err(render_err)?;
        }
        PlotFormat::Png | PlotFormat::Webp => {
            let (width, height) = PLOT_SIZE;
            let mut buffer = vec![0u8; (width * height * 3) as usize];
            {
                let root =
                    BitMapBackend::with_buffer(&mut buffer, PLOT_SIZE).into_drawing_area();
                draw_chart(&root, curves, title, y_desc)?;
                root.present().map_err(render_err)?;
            }
            let img = image::RgbImage::from_raw(width, height, buffer)
                .ok_or_else(|| ReportError::Render("pixel buffer size mismatch".to_string()))?;
            let encoding = match format {
                PlotFormat::Png => image::ImageFormat::Png,
                _ => image::ImageFormat::WebP,
            };
            img.save_with_format(path, encoding)
                .map_err(|e| ReportError::Render(e.to_string()))?;
        }
    }
    Ok(())
}

fn draw_chart<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    curves: &CurveSet,
    title: &str,
    y_desc: &str,
) -> Result<()> {
    root.fill(&BLACK).map_err(render_err)?;

    let (x_range, y_range) = data_ranges(curves);
    let mut chart = ChartBuilder::on(root)
        .margin(18)
        .caption(title, ("sans-serif", 22).into_font().color(&WHITE))
        .x_label_area_size(48)
        .y_label_area_size(64)
        .build_cartesian_2d(x_range, y_range)
        .map_err(render_err)?;

    chart
        .configure_mesh()
        .axis_style(&GREY)
        .bold_line_style(&GREY.mix(0.4))
        .light_line_style(&GREY.mix(0.15))
        .label_style(("sans-serif", 14).into_font().color(&GAINSBORO))
        .x_desc("Bitrate (kb/s)")
        .y_desc(y_desc)
        .draw()
        .map_err(render_err)?;

    for (i, (label, points)) in curves.iter().enumerate() {
        let color = SERIES_COLORS[i % SERIES_COLORS.len()];

        chart
            .draw_series(LineSeries::new(
                points.iter().map(|p| (p.bitrate, p.score)),
                color.stroke_width(2),
            ))
            .map_err(render_err)?
            .label(label.to_string())
            .legend(move |(x, y)| {
                PathElement::new(vec![(x, y), (x + 18, y)], color.stroke_width(2))
            });

        let annotation = ("sans-serif", 13).into_font().color(&GAINSBORO);
        chart
            .draw_series(points.iter().map(|p| {
                EmptyElement::at((p.bitrate, p.score))
                    + Circle::new((0, 0), 3, color.filled())
                    + Text::new(format!("CRF{}", p.crf), (-14, -20), annotation.clone())
            }))
            .map_err(render_err)?;
    }

    chart
        .configure_series_labels()
        .border_style(&GREY)
        .background_style(&BLACK.mix(0.8))
        .label_font(("sans-serif", 14).into_font().color(&GAINSBORO))
        .position(SeriesLabelPosition::LowerRight)
        .draw()
        .map_err(render_err)?;

    Ok(())
}

fn data_ranges(curves: &CurveSet) -> (std::ops::Range<f64>, std::ops::Range<f64>) {
    let mut x_min = f64::INFINITY;
    let mut x_max = f64::NEG_INFINITY;
    let mut y_min = f64::INFINITY;
    let mut y_max = f64::NEG_INFINITY;
    for (_, points) in curves.iter() {
        for p in points {
            x_min = x_min.min(p.bitrate);
            x_max = x_max.max(p.bitrate);
            y_min = y_min.min(p.score);
            y_max = y_max.max(p.score);
        }
    }

    // Pad so markers and CRF annotations stay inside the plot area.
    let x_pad = ((x_max - x_min) * 0.06).max(1.0);
    let y_pad = ((y_max - y_min) * 0.08).max(0.5);
    (
        (x_min - x_pad)..(x_max + x_pad),
        (y_min - y_pad)..(y_max + y_pad * 1.5),
    )
}

fn render_err<E: std::fmt::Display>(err: E) -> ReportError {
    ReportError::Render(err.to_string())
}
