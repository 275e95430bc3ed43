//! `ResultPlotter`: runs the chart pipeline over result files and sweep
//! directories according to a [`PlotterConfig`].

use crate::animate;
use crate::config::{OutputLayout, PlotterConfig};
use crate::error::{PlotError, Result};
use crate::plot::{self, SeriesReport};
use crate::sweep::{self, HeatmapGrid};
use crate::table::ResultTable;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// What a batch run produced
#[derive(Debug, Default)]
pub struct RunSummary {
    pub generated: Vec<PathBuf>,
    /// Failures isolated to one file, metric or sweep group
    pub failures: Vec<(PathBuf, PlotError)>,
}

impl RunSummary {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    fn absorb(&mut self, source: &Path, report: SeriesReport) {
        if !report.is_complete() {
            warn!(
                source = %source.display(),
                missing = report.failures.len(),
                "some metrics could not be plotted"
            );
        }
        self.generated.extend(report.written);
        for (_, err) in report.failures {
            self.failures.push((source.to_path_buf(), err));
        }
    }

    fn fail(&mut self, source: &Path, err: PlotError) {
        error!(source = %source.display(), error = %err, "plotting failed");
        self.failures.push((source.to_path_buf(), err));
    }
}

pub struct ResultPlotter {
    config: PlotterConfig,
}

impl ResultPlotter {
    pub fn new(config: PlotterConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PlotterConfig {
        &self.config
    }

    /// Directory receiving the per-metric charts of one run
    pub fn series_dir(&self, table: &ResultTable) -> PathBuf {
        match self.config.layout {
            OutputLayout::PerRunDirectory => self.config.results_dir.join(table.name()),
            OutputLayout::Flat => self.config.plots_dir.clone(),
        }
    }

    /// Plot the configured metrics of one result file.
    pub fn plot_file<P: AsRef<Path>>(&self, path: P) -> Result<SeriesReport> {
        let path = path.as_ref();
        let table = ResultTable::load(path)?;
        info!(file = %path.display(), rows = table.len(), "loaded result table");
        debug!(columns = ?table.metric_names().collect::<Vec<_>>(), "available metrics");

        match self.config.layout {
            OutputLayout::PerRunDirectory => plot::plot_series_set(
                &table,
                &self.config.metrics,
                self.series_dir(&table),
                self.config.format,
                self.config.size,
            ),
            OutputLayout::Flat => self.plot_flat(&table),
        }
    }

    /// `plots/<name>_<metric>.<ext>`
    fn plot_flat(&self, table: &ResultTable) -> Result<SeriesReport> {
        let dir = &self.config.plots_dir;
        std::fs::create_dir_all(dir).map_err(|e| PlotError::io(dir, e))?;

        let mut report = SeriesReport::default();
        for metric in &self.config.metrics {
            let path = dir.join(format!(
                "{}_{}.{}",
                table.name(),
                metric.to_lowercase(),
                self.config.format.extension()
            ));
            match plot::plot_series(table, metric, &path, self.config.size) {
                Ok(()) => report.written.push(path),
                Err(e) => {
                    warn!(metric = %metric, error = %e, "skipping metric");
                    report.failures.push((metric.clone(), e));
                }
            }
        }
        Ok(report)
    }

    /// Plot `<results_dir>/<name>.csv` for each base name.
    pub fn plot_named<S: AsRef<str>>(&self, names: &[S]) -> RunSummary {
        let mut summary = RunSummary::default();
        for name in names {
            let name = name.as_ref();
            let file = name.strip_suffix(".csv").unwrap_or(name);
            let path = self.config.results_dir.join(format!("{}.csv", file));
            self.run_file(&path, &mut summary);
        }
        summary
    }

    /// Plot every flat result file in `dir` and, when enabled, one heatmap per
    /// sweep subdirectory.
    pub fn plot_directory<P: AsRef<Path>>(&self, dir: P) -> Result<RunSummary> {
        let dir = dir.as_ref();
        let mut summary = RunSummary::default();

        for path in sweep::csv_files(dir)? {
            self.run_file(&path, &mut summary);
        }

        if self.config.include_heatmap {
            for group in sweep_groups(dir)? {
                match self.plot_heatmap_dir(&group) {
                    Ok(path) => summary.generated.push(path),
                    Err(e) => summary.fail(&group, e),
                }
            }
        }

        info!(
            dir = %dir.display(),
            generated = summary.generated.len(),
            failed = summary.failures.len(),
            "directory run finished"
        );
        Ok(summary)
    }

    /// Build and render the heatmap for `<results_dir>/<group>/`.
    pub fn plot_heatmap_group(&self, group: &str) -> Result<PathBuf> {
        self.plot_heatmap_dir(&self.config.results_dir.join(group))
    }

    pub fn build_grid<P: AsRef<Path>>(&self, dir: P) -> Result<HeatmapGrid> {
        sweep::build_heatmap_grid(dir, &self.config.heatmap_metric)
    }

    fn plot_heatmap_dir(&self, dir: &Path) -> Result<PathBuf> {
        let group = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| PlotError::parse(dir, "sweep directory has no name"))?;
        let grid = self.build_grid(dir)?;

        let plots_dir = &self.config.plots_dir;
        std::fs::create_dir_all(plots_dir).map_err(|e| PlotError::io(plots_dir, e))?;
        let out = plots_dir.join(format!("{}.{}", group, self.config.format.extension()));
        plot::plot_heatmap(&grid, &group, &out, self.config.size)?;
        Ok(out)
    }

    /// Render the cooperation animation of `input` into `output`.
    pub fn animate<P: AsRef<Path>, Q: AsRef<Path>>(&self, input: P, output: Q) -> Result<usize> {
        let table = ResultTable::load(input)?;
        animate::render_cooperation_animation(&table, output, &self.config.animation)
    }

    fn run_file(&self, path: &Path, summary: &mut RunSummary) {
        match self.plot_file(path) {
            Ok(report) => summary.absorb(path, report),
            Err(e) => summary.fail(path, e),
        }
    }
}

/// Subdirectories of `dir`, sorted by name
fn sweep_groups(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|e| PlotError::io(dir, e))?;
    let mut groups = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| PlotError::io(dir, e))?.path();
        if path.is_dir() {
            groups.push(path);
        }
    }
    groups.sort();
    Ok(groups)
}
