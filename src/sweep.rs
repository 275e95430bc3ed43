//! Parameter sweeps: `(f, d)` parsed from file names, pivoted into a grid.

use crate::error::{PlotError, Result};
use crate::table::ResultTable;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Sweep parameters encoded in a file name as `..._f_<f>_d_<d>...`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SweepParams {
    pub f: i64,
    pub d: i64,
}

impl SweepParams {
    /// Parse `f` and `d` from a file path's stem.
    pub fn from_path(path: &Path) -> Result<Self> {
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| PlotError::FilenameFormat {
                path: path.to_path_buf(),
            })?;
        Self::parse(stem).ok_or_else(|| PlotError::FilenameFormat {
            path: path.to_path_buf(),
        })
    }

    /// Find the first `f_<int>_d_<int>` run of tokens in an underscore
    /// separated name.
    pub fn parse(stem: &str) -> Option<Self> {
        let tokens: Vec<&str> = stem.split('_').collect();
        tokens.windows(4).find_map(|w| match w {
            ["f", f, "d", d] => Some(Self {
                f: f.parse().ok()?,
                d: d.parse().ok()?,
            }),
            _ => None,
        })
    }
}

/// Final-iteration value of one sweep run
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterPoint {
    pub params: SweepParams,
    pub iteration: i64,
    pub value: f64,
    pub source: PathBuf,
}

impl ParameterPoint {
    /// Load a sweep file and take `metric` from its last row.
    pub fn from_file(path: &Path, metric: &str) -> Result<Self> {
        // Name is checked before the file is read
        let params = SweepParams::from_path(path)?;
        let table = ResultTable::load(path)?;
        let row = table.last_row();
        Ok(Self {
            params,
            iteration: row.iteration(),
            value: row.get(metric)?,
            source: path.to_path_buf(),
        })
    }
}

/// Values pivoted by `f` (rows) and `d` (columns).
///
/// At most one value per `(f, d)`; absent pairs are gaps. Row and column keys
/// are kept sorted so the grid does not depend on file enumeration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeatmapGrid {
    metric: String,
    cells: BTreeMap<SweepParams, f64>,
}

impl HeatmapGrid {
    pub fn new(metric: impl Into<String>) -> Self {
        Self {
            metric: metric.into(),
            cells: BTreeMap::new(),
        }
    }

    /// Pivot a set of points, rejecting duplicate `(f, d)` pairs.
    #[cfg(test)]
    pub fn from_points<I>(metric: impl Into<String>, points: I) -> Result<Self>
    where
        I: IntoIterator<Item = ParameterPoint>,
    {
        let mut grid = Self::new(metric);
        for point in points {
            grid.insert(point)?;
        }
        Ok(grid)
    }

    pub fn insert(&mut self, point: ParameterPoint) -> Result<()> {
        if self.cells.contains_key(&point.params) {
            return Err(PlotError::DuplicatePoint {
                f: point.params.f,
                d: point.params.d,
                path: point.source,
            });
        }
        self.cells.insert(point.params, point.value);
        Ok(())
    }

    /// Metric the grid is valued by
    pub fn metric(&self) -> &str {
        &self.metric
    }

    /// Sorted distinct `f` values
    pub fn rows(&self) -> Vec<i64> {
        self.cells
            .keys()
            .map(|p| p.f)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Sorted distinct `d` values
    pub fn cols(&self) -> Vec<i64> {
        self.cells
            .keys()
            .map(|p| p.d)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn get(&self, f: i64, d: i64) -> Option<f64> {
        self.cells.get(&SweepParams { f, d }).copied()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Finite value range, if any cell holds a finite value
    pub fn value_range(&self) -> Option<(f64, f64)> {
        self.cells
            .values()
            .copied()
            .filter(|v| v.is_finite())
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }

    /// Dense matrix `[row][col]` in `rows()` x `cols()` order
    pub fn matrix(&self) -> Vec<Vec<Option<f64>>> {
        let cols = self.cols();
        self.rows()
            .into_iter()
            .map(|f| cols.iter().map(|&d| self.get(f, d)).collect())
            .collect()
    }
}

/// List `.csv` files directly inside `dir`, sorted by file name.
pub fn csv_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|e| PlotError::io(dir, e))?;
    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| PlotError::io(dir, e))?.path();
        let is_csv = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("csv"))
            .unwrap_or(false);
        if path.is_file() && is_csv {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Scan a sweep directory and pivot each file's final `metric` value.
pub fn build_heatmap_grid<P: AsRef<Path>>(dir: P, metric: &str) -> Result<HeatmapGrid> {
    let dir = dir.as_ref();
    let files = csv_files(dir)?;
    if files.is_empty() {
        return Err(PlotError::parse(dir, "no result files to aggregate"));
    }

    let mut grid = HeatmapGrid::new(metric);
    for path in files {
        let point = ParameterPoint::from_file(&path, metric)?;
        debug!(
            file = %path.display(),
            f = point.params.f,
            d = point.params.d,
            iteration = point.iteration,
            value = point.value,
            "collected sweep point"
        );
        grid.insert(point)?;
    }
    Ok(grid)
}
