//! Chart rendering: per-metric line charts and sweep heatmaps.

use crate::config::ImageFormat;
use crate::error::{PlotError, Result};
use crate::fonts::{self, FAMILY};
use crate::sweep::HeatmapGrid;
use crate::table::{ResultTable, ITERATION};
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::ops::Range;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

type DrawResult<DB> = std::result::Result<(), DrawingAreaErrorKind<<DB as DrawingBackend>::ErrorType>>;

/// Pick the encoder from the output file's extension
pub fn format_for(path: &Path) -> ImageFormat {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("svg") => ImageFormat::Svg,
        _ => ImageFormat::Png,
    }
}

/// `<dir>/<metric-lowercased>.<ext>`
pub fn metric_path(dir: &Path, metric: &str, format: ImageFormat) -> PathBuf {
    dir.join(format!("{}.{}", metric.to_lowercase(), format.extension()))
}

/// Render one metric against `Iteration` as a line chart.
pub fn plot_series<P: AsRef<Path>>(
    table: &ResultTable,
    metric: &str,
    path: P,
    size: (u32, u32),
) -> Result<()> {
    let path = path.as_ref();
    let points: Vec<(f64, f64)> = table
        .series(metric)?
        .into_iter()
        .filter(|(_, y)| y.is_finite())
        .collect();
    let title = format!("{} vs. Iteration", metric);
    fonts::ensure_registered(path)?;

    let drawn = match format_for(path) {
        ImageFormat::Png => {
            let root = BitMapBackend::new(path, size).into_drawing_area();
            draw_line_chart(&root, &title, metric, &points)
                .map_err(|e| PlotError::render(path, e))
        }
        ImageFormat::Svg => {
            let root = SVGBackend::new(path, size).into_drawing_area();
            draw_line_chart(&root, &title, metric, &points)
                .map_err(|e| PlotError::render(path, e))
        }
    };
    drawn?;

    info!(metric, output = %path.display(), "plotted series");
    Ok(())
}

/// Outcome of [`plot_series_set`]: what was written and what failed
#[derive(Debug, Default)]
pub struct SeriesReport {
    pub written: Vec<PathBuf>,
    pub failures: Vec<(String, PlotError)>,
}

impl SeriesReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Plot each metric in order into `dir`. A failing metric does not stop the
/// remaining ones.
pub fn plot_series_set<P: AsRef<Path>, S: AsRef<str>>(
    table: &ResultTable,
    metrics: &[S],
    dir: P,
    format: ImageFormat,
    size: (u32, u32),
) -> Result<SeriesReport> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir).map_err(|e| PlotError::io(dir, e))?;

    let mut report = SeriesReport::default();
    for metric in metrics {
        let metric = metric.as_ref();
        let path = metric_path(dir, metric, format);
        match plot_series(table, metric, &path, size) {
            Ok(()) => report.written.push(path),
            Err(e) => {
                warn!(metric, file = %table.source().display(), error = %e, "skipping metric");
                report.failures.push((metric.to_string(), e));
            }
        }
    }
    Ok(report)
}

/// Font and margin sizes scaled to the canvas height
#[derive(Debug, Clone, Copy)]
struct Scale {
    caption: u32,
    label: u32,
    margin: u32,
    axis: u32,
}

impl Scale {
    fn for_height(height: u32) -> Self {
        let unit = (height / 30).max(8);
        Self {
            caption: unit,
            label: unit * 3 / 5,
            margin: unit * 3 / 5,
            axis: unit * 2,
        }
    }
}

/// Data range padded so flat or single-point series still get an axis
fn padded_range(lo: f64, hi: f64) -> Range<f64> {
    if !lo.is_finite() || !hi.is_finite() {
        return 0.0..1.0;
    }
    if (hi - lo).abs() < f64::EPSILON {
        let pad = if lo == 0.0 { 1.0 } else { lo.abs() * 0.1 };
        return (lo - pad)..(hi + pad);
    }
    let pad = (hi - lo) * 0.05;
    (lo - pad)..(hi + pad)
}

fn draw_line_chart<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    title: &str,
    metric: &str,
    points: &[(f64, f64)],
) -> DrawResult<DB> {
    let x_min = points.first().map(|p| p.0).unwrap_or(0.0);
    let x_max = points.last().map(|p| p.0).unwrap_or(1.0);
    let x_range = if x_max > x_min { x_min..x_max } else { padded_range(x_min, x_max) };

    let (y_min, y_max) = points
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
            (lo.min(p.1), hi.max(p.1))
        });

    let scale = Scale::for_height(root.dim_in_pixel().1);
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(root)
        .caption(title, (FAMILY, scale.caption))
        .margin(scale.margin)
        .x_label_area_size(scale.axis)
        .y_label_area_size(scale.axis + scale.axis / 4)
        .build_cartesian_2d(x_range, padded_range(y_min, y_max))?;

    chart
        .configure_mesh()
        .x_desc(ITERATION)
        .y_desc(metric)
        .label_style((FAMILY, scale.label))
        .draw()?;

    chart.draw_series(LineSeries::new(
        points.iter().copied(),
        BLUE.stroke_width(3),
    ))?;

    root.present()?;
    Ok(())
}

/// Gradient stops from dark purple through red to cream
const HEAT_STOPS: [(f64, (u8, u8, u8)); 5] = [
    (0.0, (3, 5, 26)),
    (0.25, (76, 29, 75)),
    (0.5, (161, 26, 91)),
    (0.75, (237, 83, 65)),
    (1.0, (250, 235, 221)),
];

/// Color for a value normalised to [0, 1]
pub fn heat_color(t: f64) -> RGBColor {
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
    for pair in HEAT_STOPS.windows(2) {
        let (t0, c0) = pair[0];
        let (t1, c1) = pair[1];
        if t <= t1 {
            let k = (t - t0) / (t1 - t0);
            let lerp = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * k).round() as u8;
            return RGBColor(lerp(c0.0, c1.0), lerp(c0.1, c1.1), lerp(c0.2, c1.2));
        }
    }
    let (_, c) = HEAT_STOPS[HEAT_STOPS.len() - 1];
    RGBColor(c.0, c.1, c.2)
}

fn normalise(v: f64, lo: f64, hi: f64) -> f64 {
    if hi > lo {
        (v - lo) / (hi - lo)
    } else {
        0.5
    }
}

/// Render a sweep grid as a color-mapped matrix with `d` across and `f` up.
pub fn plot_heatmap<P: AsRef<Path>>(
    grid: &HeatmapGrid,
    title: &str,
    path: P,
    size: (u32, u32),
) -> Result<()> {
    let path = path.as_ref();
    if grid.is_empty() {
        return Err(PlotError::render(path, "heatmap grid has no values"));
    }
    fonts::ensure_registered(path)?;

    let drawn = match format_for(path) {
        ImageFormat::Png => {
            let root = BitMapBackend::new(path, size).into_drawing_area();
            draw_heatmap(&root, grid, title).map_err(|e| PlotError::render(path, e))
        }
        ImageFormat::Svg => {
            let root = SVGBackend::new(path, size).into_drawing_area();
            draw_heatmap(&root, grid, title).map_err(|e| PlotError::render(path, e))
        }
    };
    drawn?;

    info!(
        metric = grid.metric(),
        cells = grid.len(),
        output = %path.display(),
        "plotted heatmap"
    );
    Ok(())
}

/// Axis label for a cell center; blank between cells
fn cell_label(keys: &[i64], v: f64) -> String {
    let idx = v.round();
    if (v - idx).abs() > 1e-6 || idx < 0.0 {
        return String::new();
    }
    keys.get(idx as usize).map(|k| k.to_string()).unwrap_or_default()
}

fn draw_heatmap<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    grid: &HeatmapGrid,
    title: &str,
) -> DrawResult<DB> {
    let rows = grid.rows();
    let cols = grid.cols();
    let (lo, hi) = grid.value_range().unwrap_or((0.0, 1.0));

    root.fill(&WHITE)?;
    let (width, height) = root.dim_in_pixel();
    let scale = Scale::for_height(height);
    let legend_width = (width / 8).max(scale.axis * 2);
    let (main, legend) = root.split_horizontally(width.saturating_sub(legend_width));

    let x_labels = |v: &f64| cell_label(&cols, *v);
    let y_labels = |v: &f64| cell_label(&rows, *v);

    // Cell (r, c) covers [c - 0.5, c + 0.5] x [r - 0.5, r + 0.5]
    let mut chart = ChartBuilder::on(&main)
        .caption(title, (FAMILY, scale.caption))
        .margin(scale.margin)
        .x_label_area_size(scale.axis)
        .y_label_area_size(scale.axis)
        .build_cartesian_2d(
            -0.5..(cols.len() as f64 - 0.5),
            -0.5..(rows.len() as f64 - 0.5),
        )?;

    chart
        .configure_mesh()
        .disable_mesh()
        .x_labels(cols.len() + 1)
        .y_labels(rows.len() + 1)
        .x_label_formatter(&x_labels)
        .y_label_formatter(&y_labels)
        .x_desc("d")
        .y_desc("f")
        .label_style((FAMILY, scale.label))
        .draw()?;

    let centered = Pos::new(HPos::Center, VPos::Center);
    for (r, row) in grid.matrix().iter().enumerate() {
        for (c, cell) in row.iter().enumerate() {
            // Gaps and blank final values stay unfilled
            let Some(value) = cell.filter(|v| v.is_finite()) else {
                continue;
            };
            let (x, y) = (c as f64, r as f64);
            let t = normalise(value, lo, hi);
            chart.draw_series(std::iter::once(Rectangle::new(
                [(x - 0.5, y - 0.5), (x + 0.5, y + 0.5)],
                heat_color(t).filled(),
            )))?;

            let ink = if t > 0.6 { &BLACK } else { &WHITE };
            chart.draw_series(std::iter::once(Text::new(
                format!("{:.2}", value),
                (x, y),
                (FAMILY, scale.label).into_font().color(ink).pos(centered),
            )))?;
        }
    }

    draw_color_legend(&legend, lo, hi, scale)?;

    root.present()?;
    Ok(())
}

/// Vertical gradient strip labelled with the value scale
fn draw_color_legend<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    lo: f64,
    hi: f64,
    scale: Scale,
) -> DrawResult<DB> {
    const STEPS: usize = 64;
    let values = if hi > lo { lo..hi } else { padded_range(lo, hi) };
    let step = (values.end - values.start) / STEPS as f64;
    let base = values.start;

    let mut chart = ChartBuilder::on(area)
        .margin_top(scale.margin + scale.caption * 2)
        .margin_bottom(scale.margin + scale.axis)
        .margin_right(scale.margin)
        .y_label_area_size(scale.axis)
        .build_cartesian_2d(0.0..1.0, values)?;

    chart
        .configure_mesh()
        .disable_mesh()
        .disable_x_axis()
        .y_labels(5)
        .label_style((FAMILY, scale.label))
        .draw()?;

    chart.draw_series((0..STEPS).map(|i| {
        let y0 = base + step * i as f64;
        let t = (i as f64 + 0.5) / STEPS as f64;
        Rectangle::new([(0.0, y0), (1.0, y0 + step)], heat_color(t).filled())
    }))?;

    Ok(())
}
