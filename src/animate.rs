//! Animated cooperation chart.
//!
//! Cooperation is the mean of the two transfer metrics, pulled halfway
//! toward 0.5 so runs stay readable on a fixed `[0.3, 0.7]` axis.

use crate::config::AnimationConfig;
use crate::error::{PlotError, Result};
use crate::fonts::{self, FAMILY};
use crate::table::ResultTable;
use plotters::coord::Shift;
use plotters::prelude::*;
use std::path::Path;
use tracing::{debug, info};

pub const PEER_TRANSFER: &str = "PeerTransfer";
pub const SUB_TRANSFER: &str = "SubTransfer";

/// Derived cooperation for one row's transfer metrics
pub fn cooperation(peer_transfer: f64, sub_transfer: f64) -> f64 {
    let mean = (peer_transfer + sub_transfer) / 2.0;
    0.5 + (mean - 0.5) / 2.0
}

/// `(iteration, cooperation)` for frames `0..frame_count`, sampling the row
/// at position `i * frame_step`.
pub fn cooperation_series(
    table: &ResultTable,
    frame_step: usize,
    frame_count: usize,
) -> Result<Vec<(f64, f64)>> {
    let peer = table.column(PEER_TRANSFER)?;
    let sub = table.column(SUB_TRANSFER)?;

    (0..frame_count)
        .map(|i| {
            let iteration = i * frame_step;
            let row = table.row(iteration)?;
            let idx = row.index();
            Ok((iteration as f64, cooperation(peer[idx], sub[idx])))
        })
        .collect()
}

/// Write an animated GIF that redraws the accumulated cooperation line once
/// per frame on fixed axes. Returns the number of frames written.
///
/// Every frame's row is resolved before the output file is created, so an
/// out-of-range table leaves nothing behind.
pub fn render_cooperation_animation<P: AsRef<Path>>(
    table: &ResultTable,
    path: P,
    config: &AnimationConfig,
) -> Result<usize> {
    let path = path.as_ref();
    config.validate()?;
    let series = cooperation_series(table, config.frame_step, config.frame_count)?;
    fonts::ensure_registered(path)?;

    let root = BitMapBackend::gif(path, config.size, config.frame_delay_ms())
        .map_err(|e| PlotError::render(path, e))?
        .into_drawing_area();

    let x_max = (config.frame_count * config.frame_step) as f64;
    for frame in 1..=series.len() {
        draw_frame(&root, &series[..frame], x_max, config.y_range)
            .map_err(|e| PlotError::render(path, e))?;
        debug!(frame, "rendered animation frame");
    }

    info!(
        frames = series.len(),
        fps = config.fps,
        output = %path.display(),
        "rendered cooperation animation"
    );
    Ok(series.len())
}

fn draw_frame<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    points: &[(f64, f64)],
    x_max: f64,
    (y_min, y_max): (f64, f64),
) -> std::result::Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(root)
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(40)
        .build_cartesian_2d(0f64..x_max, y_min..y_max)?;

    chart
        .configure_mesh()
        .x_desc("Iteration")
        .y_desc("Cooperation")
        .label_style((FAMILY, 12))
        .draw()?;

    chart.draw_series(LineSeries::new(points.iter().copied(), &BLUE))?;

    // Each present() appends one GIF frame
    root.present()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transfer_table(rows: usize) -> ResultTable {
        let peer: Vec<f64> = (0..rows).map(|i| i as f64 / rows as f64).collect();
        let sub = vec![0.5; rows];
        ResultTable::new(
            "transfer.csv",
            (0..rows as i64).collect(),
            vec![
                (PEER_TRANSFER.to_string(), peer),
                (SUB_TRANSFER.to_string(), sub),
            ],
        )
        .unwrap()
    }

    #[test]
    fn cooperation_rescales_toward_half() {
        assert_eq!(cooperation(1.0, 1.0), 0.75);
        assert_eq!(cooperation(0.5, 0.5), 0.5);
        assert_eq!(cooperation(0.0, 0.0), 0.25);
        assert_eq!(cooperation(1.0, 0.0), 0.5);
    }

    #[test]
    fn series_samples_every_step() {
        let table = transfer_table(10);
        let series = cooperation_series(&table, 3, 4).unwrap();
        let xs: Vec<f64> = series.iter().map(|p| p.0).collect();
        assert_eq!(xs, vec![0.0, 3.0, 6.0, 9.0]);
        // peer = 0.9, sub = 0.5 at row 9
        assert!((series[3].1 - cooperation(0.9, 0.5)).abs() < 1e-12);
    }

    #[test]
    fn frame_past_the_end_is_out_of_range() {
        let table = transfer_table(10);
        assert!(matches!(
            cooperation_series(&table, 5, 3),
            Err(PlotError::IndexOutOfRange { index: 10, rows: 10, .. })
        ));

        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("coop.gif");
        let config = AnimationConfig {
            frame_step: 5,
            frame_count: 3,
            ..AnimationConfig::default()
        };
        assert!(render_cooperation_animation(&table, &out, &config).is_err());
        assert!(!out.exists());
    }

    #[test]
    fn missing_transfer_column_is_reported() {
        let table = ResultTable::new(
            "pop.csv",
            vec![0, 1],
            vec![("Population".into(), vec![1.0, 2.0])],
        )
        .unwrap();
        assert!(matches!(
            cooperation_series(&table, 1, 2),
            Err(PlotError::MissingColumn { column, .. }) if column == PEER_TRANSFER
        ));
    }

    #[test]
    fn writes_an_animated_gif() {
        let table = transfer_table(50);
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("coop.gif");
        let config = AnimationConfig {
            frame_step: 10,
            frame_count: 5,
            size: (160, 120),
            ..AnimationConfig::default()
        };

        let frames = render_cooperation_animation(&table, &out, &config).unwrap();
        assert_eq!(frames, 5);
        let bytes = std::fs::read(&out).unwrap();
        assert!(bytes.starts_with(b"GIF8"));
    }
}
