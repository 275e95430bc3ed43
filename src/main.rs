//! simplot - charts for simulation result files.
//!
//! Renders per-metric line charts from `results/<name>.csv`, heatmaps of a
//! final-iteration metric across `_f_<f>_d_<d>` parameter sweeps, and an
//! animated cooperation chart.

mod animate;
mod config;
mod error;
mod fonts;
mod logging;
mod plot;
mod plotter;
mod sweep;
mod table;

use anyhow::{bail, Context, Result};
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use config::{ImageFormat, PlotterConfig};
use plotter::{ResultPlotter, RunSummary};
use std::path::PathBuf;
use tracing::info;

/// Plot simulation results: metric line charts, sweep heatmaps and
/// cooperation animations
#[derive(Parser, Debug)]
#[command(name = "simplot")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Result file base names to plot (`run` plots <results-dir>/run.csv)
    names: Vec<String>,

    /// Plot every result file and sweep group under the results directory
    #[arg(short, long)]
    all: bool,

    /// Render only the heatmap for one sweep group (<results-dir>/<GROUP>/)
    #[arg(long, value_name = "GROUP")]
    heatmap: Option<String>,

    /// Render the cooperation animation of a result file
    #[arg(long, value_name = "CSV")]
    animate: Option<PathBuf>,

    /// Output path of the cooperation animation
    #[arg(long, default_value = "cooperation.gif")]
    gif_output: PathBuf,

    /// Rows between animation frames
    #[arg(long)]
    frame_step: Option<usize>,

    /// Number of animation frames
    #[arg(long)]
    frame_count: Option<usize>,

    /// Animation frames per second
    #[arg(long)]
    fps: Option<u32>,

    /// Directory holding result files (default: ./results)
    #[arg(short, long)]
    results_dir: Option<PathBuf>,

    /// Output directory for heatmaps (default: ./plots)
    #[arg(short, long)]
    plots_dir: Option<PathBuf>,

    /// Image format for charts
    #[arg(short, long, value_enum)]
    format: Option<ImageFormat>,

    /// Column used as the heatmap value (default: Egalitarianism)
    #[arg(short, long)]
    metric: Option<String>,

    /// Skip sweep heatmaps when plotting a whole directory
    #[arg(long)]
    no_heatmap: bool,

    /// JSON plotter configuration; command-line flags override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Debug-level logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn has_work(&self) -> bool {
        !self.names.is_empty() || self.all || self.heatmap.is_some() || self.animate.is_some()
    }

    /// Defaults, then the config file, then flags
    fn plotter_config(&self) -> Result<PlotterConfig> {
        let mut config = match &self.config {
            Some(path) => PlotterConfig::load(path)
                .with_context(|| format!("Failed to load config: {}", path.display()))?,
            None => PlotterConfig::default(),
        };

        if let Some(dir) = &self.results_dir {
            config.results_dir = dir.clone();
        }
        if let Some(dir) = &self.plots_dir {
            config.plots_dir = dir.clone();
        }
        if let Some(format) = self.format {
            config.format = format;
        }
        if let Some(metric) = &self.metric {
            config.heatmap_metric = metric.clone();
        }
        if self.no_heatmap {
            config.include_heatmap = false;
        }
        if let Some(step) = self.frame_step {
            config.animation.frame_step = step;
        }
        if let Some(count) = self.frame_count {
            config.animation.frame_count = count;
        }
        if let Some(fps) = self.fps {
            config.animation.fps = fps;
        }
        Ok(config)
    }
}

/// Usage message for an invocation that requests no output
fn usage_error() -> clap::Error {
    Args::command().error(
        ErrorKind::MissingRequiredArgument,
        "give at least one result name, or one of --all, --heatmap, --animate",
    )
}

fn report(summary: &RunSummary) {
    if !summary.generated.is_empty() {
        eprintln!("\nGenerated {} plots:", summary.generated.len());
        for path in &summary.generated {
            eprintln!("  • {}", path.display());
        }
    }
    if !summary.failures.is_empty() {
        eprintln!("\n{} failures:", summary.failures.len());
        for (source, err) in &summary.failures {
            eprintln!("  • {}: {}", source.display(), err);
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    if !args.has_work() {
        usage_error().exit();
    }

    logging::init(args.verbose);

    let config = args.plotter_config()?;
    let plotter = ResultPlotter::new(config).context("Invalid plotter configuration")?;
    let mut summary = RunSummary::default();

    if !args.names.is_empty() {
        let named = plotter.plot_named(&args.names);
        summary.generated.extend(named.generated);
        summary.failures.extend(named.failures);
    }

    if args.all {
        let results_dir = &plotter.config().results_dir;
        let all = plotter
            .plot_directory(results_dir)
            .with_context(|| format!("Failed to scan {}", results_dir.display()))?;
        summary.generated.extend(all.generated);
        summary.failures.extend(all.failures);
    }

    if let Some(group) = &args.heatmap {
        let out = plotter
            .plot_heatmap_group(group)
            .with_context(|| format!("Failed to plot heatmap for group {}", group))?;
        summary.generated.push(out);
    }

    if let Some(input) = &args.animate {
        let frames = plotter
            .animate(input, &args.gif_output)
            .with_context(|| format!("Failed to animate {}", input.display()))?;
        info!(frames, output = %args.gif_output.display(), "animation written");
        summary.generated.push(args.gif_output.clone());
    }

    report(&summary);

    if !summary.is_success() {
        bail!("{} of the requested plots failed", summary.failures.len());
    }
    Ok(())
}
