//! Plotter configuration, loadable from JSON and overridable from the CLI.

use crate::error::{PlotError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Metrics plotted for every result file, in output order
pub const DEFAULT_METRICS: [&str; 5] = [
    "Population",
    "AveResources",
    "MaxLoad",
    "PeerTransfer",
    "SubTransfer",
];

/// Raster size of a 6.4x4.8 inch figure at 300 DPI
pub const DEFAULT_SIZE: (u32, u32) = (1920, 1440);

/// Image encoding for charts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    #[default]
    Png,
    Svg,
}

impl ImageFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Svg => "svg",
        }
    }
}

/// Where per-metric charts of `results/<name>.csv` land
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputLayout {
    /// `results/<name>/<metric>.png`
    #[default]
    PerRunDirectory,
    /// `plots/<name>_<metric>.png`
    Flat,
}

/// Cooperation animation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    /// Rows between consecutive frames
    pub frame_step: usize,
    pub frame_count: usize,
    pub fps: u32,
    pub y_range: (f64, f64),
    pub size: (u32, u32),
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            frame_step: 100,
            frame_count: 100,
            fps: 10,
            y_range: (0.3, 0.7),
            size: (640, 480),
        }
    }
}

impl AnimationConfig {
    /// Delay between GIF frames in milliseconds
    pub fn frame_delay_ms(&self) -> u32 {
        1000 / self.fps.max(1)
    }

    pub fn validate(&self) -> Result<()> {
        if self.fps == 0 {
            return Err(PlotError::Config("fps must be positive".into()));
        }
        if self.frame_count == 0 {
            return Err(PlotError::Config("frame count must be positive".into()));
        }
        if self.frame_step == 0 {
            return Err(PlotError::Config("frame step must be positive".into()));
        }
        if self.y_range.0 >= self.y_range.1 {
            return Err(PlotError::Config(format!(
                "animation y range {:?} is empty",
                self.y_range
            )));
        }
        Ok(())
    }
}

/// Everything a [`crate::plotter::ResultPlotter`] run needs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotterConfig {
    pub results_dir: PathBuf,
    pub plots_dir: PathBuf,
    pub metrics: Vec<String>,
    pub layout: OutputLayout,
    pub include_heatmap: bool,
    /// Column used as the heatmap value
    pub heatmap_metric: String,
    pub format: ImageFormat,
    pub size: (u32, u32),
    pub animation: AnimationConfig,
}

impl Default for PlotterConfig {
    fn default() -> Self {
        Self {
            results_dir: PathBuf::from("results"),
            plots_dir: PathBuf::from("plots"),
            metrics: DEFAULT_METRICS.iter().map(|m| m.to_string()).collect(),
            layout: OutputLayout::default(),
            include_heatmap: true,
            heatmap_metric: "Egalitarianism".to_string(),
            format: ImageFormat::default(),
            size: DEFAULT_SIZE,
            animation: AnimationConfig::default(),
        }
    }
}

impl PlotterConfig {
    /// Load from a JSON file; absent fields keep their defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| PlotError::io(path, e))?;
        let config: Self = serde_json::from_str(&text)
            .map_err(|e| PlotError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.metrics.is_empty() {
            return Err(PlotError::Config("metric list is empty".into()));
        }
        if self.size.0 == 0 || self.size.1 == 0 {
            return Err(PlotError::Config(format!("image size {:?} is empty", self.size)));
        }
        if self.heatmap_metric.is_empty() {
            return Err(PlotError::Config("heatmap metric is empty".into()));
        }
        self.animation.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_result_layout() {
        let config = PlotterConfig::default();
        assert_eq!(config.metrics, DEFAULT_METRICS);
        assert_eq!(config.results_dir, PathBuf::from("results"));
        assert_eq!(config.format.extension(), "png");
        assert_eq!(config.animation.frame_delay_ms(), 100);
        config.validate().unwrap();
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plot.json");
        std::fs::write(
            &path,
            r#"{"metrics": ["Population"], "format": "svg", "layout": "flat",
                "animation": {"fps": 20}}"#,
        )
        .unwrap();

        let config = PlotterConfig::load(&path).unwrap();
        assert_eq!(config.metrics, vec!["Population".to_string()]);
        assert_eq!(config.format, ImageFormat::Svg);
        assert_eq!(config.layout, OutputLayout::Flat);
        assert_eq!(config.animation.fps, 20);
        assert_eq!(config.animation.frame_step, 100);
        assert!(config.include_heatmap);
    }

    #[test]
    fn rejects_invalid_settings() {
        let mut config = PlotterConfig::default();
        config.animation.fps = 0;
        assert!(matches!(config.validate(), Err(PlotError::Config(_))));

        let mut config = PlotterConfig::default();
        config.metrics.clear();
        assert!(matches!(config.validate(), Err(PlotError::Config(_))));
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plot.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            PlotterConfig::load(&path),
            Err(PlotError::Config(_))
        ));
    }
}
