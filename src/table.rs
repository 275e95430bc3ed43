//! Result tables: one simulation run's time series, keyed by `Iteration`.

use crate::error::{PlotError, Result};
use csv::{ReaderBuilder, Trim};
use std::path::{Path, PathBuf};

/// Name of the key column every result file must carry
pub const ITERATION: &str = "Iteration";

/// A named numeric column
#[derive(Debug, Clone)]
struct Column {
    name: String,
    values: Vec<f64>,
}

/// One run's metrics, column-major.
///
/// `Iteration` values are unique and strictly ascending. The position of the
/// `Iteration` column in the source header is kept so [`ResultTable::write`]
/// reproduces the original layout.
#[derive(Debug, Clone)]
pub struct ResultTable {
    source: PathBuf,
    iteration_pos: usize,
    iterations: Vec<i64>,
    metrics: Vec<Column>,
}

impl ResultTable {
    /// Build a table from in-memory columns, enforcing the same invariants as
    /// [`ResultTable::load`].
    #[cfg(test)]
    pub fn new<P: Into<PathBuf>>(
        source: P,
        iterations: Vec<i64>,
        metrics: Vec<(String, Vec<f64>)>,
    ) -> Result<Self> {
        let source = source.into();
        if iterations.is_empty() {
            return Err(PlotError::parse(source, "table has no rows"));
        }
        check_ascending(&source, &iterations)?;

        let mut columns = Vec::with_capacity(metrics.len());
        for (name, values) in metrics {
            if values.len() != iterations.len() {
                return Err(PlotError::parse(
                    source,
                    format!(
                        "column `{}` has {} values, expected {}",
                        name,
                        values.len(),
                        iterations.len()
                    ),
                ));
            }
            if name == ITERATION || columns.iter().any(|c: &Column| c.name == name) {
                return Err(PlotError::parse(source, format!("duplicate column `{}`", name)));
            }
            columns.push(Column { name, values });
        }

        Ok(Self {
            source,
            iteration_pos: 0,
            iterations,
            metrics: columns,
        })
    }

    /// Parse a comma-delimited result file into typed columns.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut reader = ReaderBuilder::new()
            .trim(Trim::All)
            .from_path(path)
            .map_err(|e| PlotError::parse(path, e.to_string()))?;

        let headers = reader
            .headers()
            .map_err(|e| PlotError::parse(path, e.to_string()))?
            .clone();
        if headers.is_empty() || headers.iter().all(str::is_empty) {
            return Err(PlotError::parse(path, "file is empty"));
        }

        let iteration_pos = headers
            .iter()
            .position(|h| h == ITERATION)
            .ok_or_else(|| PlotError::parse(path, format!("no `{}` column", ITERATION)))?;

        let mut metrics: Vec<Column> = Vec::with_capacity(headers.len() - 1);
        for (i, name) in headers.iter().enumerate() {
            if i == iteration_pos {
                continue;
            }
            if name == ITERATION || metrics.iter().any(|c| c.name == name) {
                return Err(PlotError::parse(path, format!("duplicate column `{}`", name)));
            }
            metrics.push(Column {
                name: name.to_string(),
                values: Vec::new(),
            });
        }

        let mut iterations = Vec::new();
        for record in reader.records() {
            // The csv reader rejects ragged rows with an UnequalLengths error
            let record = record.map_err(|e| PlotError::parse(path, e.to_string()))?;
            let line = record.position().map(|p| p.line()).unwrap_or_default();

            let mut metric_idx = 0;
            for (i, cell) in record.iter().enumerate() {
                if i == iteration_pos {
                    iterations.push(parse_iteration(path, line, cell)?);
                } else {
                    let value = parse_value(path, line, &metrics[metric_idx].name, cell)?;
                    metrics[metric_idx].values.push(value);
                    metric_idx += 1;
                }
            }
        }

        if iterations.is_empty() {
            return Err(PlotError::parse(path, "file has a header but no rows"));
        }
        check_ascending(path, &iterations)?;

        Ok(Self {
            source: path.to_path_buf(),
            iteration_pos,
            iterations,
            metrics,
        })
    }

    /// Write the table as CSV, keeping the original column order.
    #[cfg(test)]
    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let mut writer = csv::WriterBuilder::new()
            .from_path(path)
            .map_err(|e| PlotError::io(path, e.into()))?;

        let header: Vec<&str> = self.header().collect();
        writer
            .write_record(&header)
            .map_err(|e| PlotError::io(path, e.into()))?;

        let width = self.metrics.len() + 1;
        for row in 0..self.iterations.len() {
            let mut fields = Vec::with_capacity(width);
            let mut metrics = self.metrics.iter();
            for i in 0..width {
                if i == self.iteration_pos {
                    fields.push(self.iterations[row].to_string());
                } else if let Some(col) = metrics.next() {
                    fields.push(col.values[row].to_string());
                }
            }
            writer
                .write_record(&fields)
                .map_err(|e| PlotError::io(path, e.into()))?;
        }

        writer.flush().map_err(|e| PlotError::io(path, e))?;
        Ok(())
    }

    /// Path the table was loaded from
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Source file stem, used to name the per-run output directory
    pub fn name(&self) -> String {
        self.source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.iterations.len()
    }

    #[cfg(test)]
    pub fn iterations(&self) -> &[i64] {
        &self.iterations
    }

    /// Full header in file order, including `Iteration`
    #[cfg(test)]
    pub fn header(&self) -> impl Iterator<Item = &str> {
        let width = self.metrics.len() + 1;
        let mut metrics = self.metrics.iter();
        (0..width).filter_map(move |i| {
            if i == self.iteration_pos {
                Some(ITERATION)
            } else {
                metrics.next().map(|c| c.name.as_str())
            }
        })
    }

    /// Metric column names in file order, excluding `Iteration`
    pub fn metric_names(&self) -> impl Iterator<Item = &str> {
        self.metrics.iter().map(|c| c.name.as_str())
    }

    /// Values of a metric column
    pub fn column(&self, name: &str) -> Result<&[f64]> {
        self.metrics
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.values.as_slice())
            .ok_or_else(|| PlotError::MissingColumn {
                column: name.to_string(),
                path: self.source.clone(),
            })
    }

    /// Row at a zero-based position
    pub fn row(&self, index: usize) -> Result<Row<'_>> {
        if index >= self.iterations.len() {
            return Err(PlotError::IndexOutOfRange {
                index,
                rows: self.iterations.len(),
                path: self.source.clone(),
            });
        }
        Ok(Row { table: self, index })
    }

    /// Final iteration's row
    pub fn last_row(&self) -> Row<'_> {
        // Tables always have at least one row
        Row {
            table: self,
            index: self.iterations.len() - 1,
        }
    }

    /// `(Iteration, value)` pairs for a metric
    pub fn series(&self, name: &str) -> Result<Vec<(f64, f64)>> {
        let values = self.column(name)?;
        Ok(self
            .iterations
            .iter()
            .zip(values)
            .map(|(&x, &y)| (x as f64, y))
            .collect())
    }
}

/// Tables compare by content; the source path is ignored.
impl PartialEq for ResultTable {
    fn eq(&self, other: &Self) -> bool {
        self.iteration_pos == other.iteration_pos
            && self.iterations == other.iterations
            && self.metrics.len() == other.metrics.len()
            && self.metrics.iter().zip(&other.metrics).all(|(a, b)| {
                a.name == b.name
                    && a.values.len() == b.values.len()
                    && a.values
                        .iter()
                        .zip(&b.values)
                        .all(|(x, y)| x == y || (x.is_nan() && y.is_nan()))
            })
    }
}

/// Borrowed view of one row
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    table: &'a ResultTable,
    index: usize,
}

impl<'a> Row<'a> {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn iteration(&self) -> i64 {
        self.table.iterations[self.index]
    }

    pub fn get(&self, name: &str) -> Result<f64> {
        Ok(self.table.column(name)?[self.index])
    }
}

fn parse_iteration(path: &Path, line: u64, cell: &str) -> Result<i64> {
    if let Ok(v) = cell.parse::<i64>() {
        return Ok(v);
    }
    // Some writers emit integral floats such as `100.0`
    match cell.parse::<f64>() {
        Ok(v) if v.is_finite() && v.fract() == 0.0 => Ok(v as i64),
        _ => Err(PlotError::parse(
            path,
            format!("line {}: `{}` value `{}` is not an integer", line, ITERATION, cell),
        )),
    }
}

fn parse_value(path: &Path, line: u64, column: &str, cell: &str) -> Result<f64> {
    // Empty cells are missing samples
    if cell.is_empty() {
        return Ok(f64::NAN);
    }
    cell.parse::<f64>().map_err(|_| {
        PlotError::parse(
            path,
            format!("line {}: `{}` value `{}` is not a number", line, column, cell),
        )
    })
}

fn check_ascending(path: &Path, iterations: &[i64]) -> Result<()> {
    if let Some(w) = iterations.windows(2).find(|w| w[1] <= w[0]) {
        return Err(PlotError::parse(
            path,
            format!(
                "`{}` values must be unique and ascending ({} follows {})",
                ITERATION, w[1], w[0]
            ),
        ));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::fs;

    pub(crate) const SAMPLE: &str = "\
Iteration,Population,AveResources,MaxLoad,PeerTransfer,SubTransfer
0,9,0.5,0.1,0.5,0.5
1,12,0.6,0.3,0.6,0.4
2,15,0.55,0.7,0.7,0.45
";

    pub(crate) fn write_csv(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn loads_typed_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(dir.path(), "run.csv", SAMPLE);

        let table = ResultTable::load(&path).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.iterations(), &[0, 1, 2]);
        assert_eq!(table.column("Population").unwrap(), &[9.0, 12.0, 15.0]);
        assert_eq!(table.name(), "run");
        assert_eq!(
            table.metric_names().collect::<Vec<_>>(),
            vec!["Population", "AveResources", "MaxLoad", "PeerTransfer", "SubTransfer"]
        );
        assert_eq!(table.last_row().get("MaxLoad").unwrap(), 0.7);
        assert_eq!(table.last_row().iteration(), 2);
    }

    #[test]
    fn missing_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ResultTable::load(dir.path().join("nope.csv")).unwrap_err();
        assert!(matches!(err, PlotError::Parse { .. }));
        assert!(err.to_string().contains("nope.csv"));
    }

    #[test]
    fn empty_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(dir.path(), "empty.csv", "");
        assert!(matches!(
            ResultTable::load(&path),
            Err(PlotError::Parse { .. })
        ));

        let path = write_csv(dir.path(), "header_only.csv", "Iteration,Population\n");
        assert!(matches!(
            ResultTable::load(&path),
            Err(PlotError::Parse { .. })
        ));
    }

    #[test]
    fn missing_iteration_column_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(dir.path(), "bad.csv", "Step,Population\n0,1\n");
        let err = ResultTable::load(&path).unwrap_err();
        assert!(matches!(err, PlotError::Parse { .. }));
        assert!(err.to_string().contains("Iteration"));
    }

    #[test]
    fn rejects_non_numeric_cells_with_line_and_field() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            dir.path(),
            "bad.csv",
            "Iteration,Population\n0,1\n1,lots\n",
        );
        let msg = ResultTable::load(&path).unwrap_err().to_string();
        assert!(msg.contains("line 3"), "{}", msg);
        assert!(msg.contains("Population"), "{}", msg);
    }

    #[test]
    fn rejects_out_of_order_iterations() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(dir.path(), "bad.csv", "Iteration,Population\n0,1\n2,1\n1,1\n");
        assert!(matches!(
            ResultTable::load(&path),
            Err(PlotError::Parse { .. })
        ));
    }

    #[test]
    fn accepts_integral_float_iterations_and_blank_cells() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            dir.path(),
            "floaty.csv",
            "Population,Iteration,MaxLoad\n3,0.0,\n4,100.0,0.2\n",
        );
        let table = ResultTable::load(&path).unwrap();
        assert_eq!(table.iterations(), &[0, 100]);
        assert!(table.column("MaxLoad").unwrap()[0].is_nan());
        assert_eq!(table.header().collect::<Vec<_>>(), vec!["Population", "Iteration", "MaxLoad"]);
    }

    #[test]
    fn write_then_load_yields_the_same_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            dir.path(),
            "run.csv",
            "Population,Iteration,Egalitarianism\n3,0,0.125\n4,10,\n5,20,0.8\n",
        );
        let table = ResultTable::load(&path).unwrap();

        let copy = dir.path().join("copy.csv");
        table.write(&copy).unwrap();
        let reloaded = ResultTable::load(&copy).unwrap();

        assert_eq!(table, reloaded);
        assert_eq!(
            reloaded.header().collect::<Vec<_>>(),
            vec!["Population", "Iteration", "Egalitarianism"]
        );
    }

    #[test]
    fn missing_column_names_the_column() {
        let table = ResultTable::new(
            "mem.csv",
            vec![0, 1],
            vec![("Population".into(), vec![1.0, 2.0])],
        )
        .unwrap();
        match table.column("MaxLoad") {
            Err(PlotError::MissingColumn { column, .. }) => assert_eq!(column, "MaxLoad"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn row_out_of_range() {
        let table = ResultTable::new(
            "mem.csv",
            vec![0, 1],
            vec![("Population".into(), vec![1.0, 2.0])],
        )
        .unwrap();
        assert!(table.row(1).is_ok());
        assert!(matches!(
            table.row(2),
            Err(PlotError::IndexOutOfRange { index: 2, rows: 2, .. })
        ));
    }
}
