//! Error kinds surfaced by table loading, sweep aggregation and rendering.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PlotError>;

#[derive(Debug, Error)]
pub enum PlotError {
    /// Missing, empty or malformed result file
    #[error("failed to parse {}: {reason}", .path.display())]
    Parse { path: PathBuf, reason: String },

    /// A requested metric is not a column of the table
    #[error("column `{column}` not found in {}", .path.display())]
    MissingColumn { column: String, path: PathBuf },

    /// Sweep file whose name does not encode `_f_<int>_d_<int>`
    #[error("file name {} does not match the `_f_<int>_d_<int>` pattern", .path.display())]
    FilenameFormat { path: PathBuf },

    /// Two sweep files map to the same grid cell
    #[error("duplicate sweep point f={f}, d={d} in {}", .path.display())]
    DuplicatePoint { f: i64, d: i64, path: PathBuf },

    /// Animation frame past the end of the table
    #[error("row {index} is out of range for {} ({rows} rows)", .path.display())]
    IndexOutOfRange {
        index: usize,
        rows: usize,
        path: PathBuf,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failure reported by the charting backend
    #[error("failed to render {}: {reason}", .path.display())]
    Render { path: PathBuf, reason: String },
}

impl PlotError {
    pub(crate) fn parse(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn render(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        Self::Render {
            path: path.into(),
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_file_and_field() {
        let err = PlotError::MissingColumn {
            column: "MaxLoad".into(),
            path: PathBuf::from("results/run.csv"),
        };
        let msg = err.to_string();
        assert!(msg.contains("MaxLoad"));
        assert!(msg.contains("results/run.csv"));

        let err = PlotError::FilenameFormat {
            path: PathBuf::from("results/A/weird.csv"),
        };
        assert!(err.to_string().contains("weird.csv"));
    }
}
