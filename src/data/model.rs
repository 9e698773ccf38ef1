use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

/// Index name used for every compound-keyed table written to disk.
pub const INDEX_NAME: &str = "Response_ID";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TableError {
    #[error("row {row} has {found} values but the table has {expected} columns")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("{labels} row labels for {rows} rows")]
    RowLabelCount { labels: usize, rows: usize },
    #[error("row {index} is out of range for a table with {len} rows")]
    RowOutOfRange { index: usize, len: usize },
}

// ---------------------------------------------------------------------------
// Numeric coercion
// ---------------------------------------------------------------------------

/// Interpret a raw text cell as a number.
///
/// Empty, unparseable and non-finite cells all come back as `None`, so callers
/// never have to deal with a parse failure.
pub fn coerce_numeric(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.parse::<f64>() {
        Ok(v) => finite(v),
        Err(_) => None,
    }
}

/// Drop NaN and ±inf produced by arithmetic (a zero area in a divisor) so
/// they read as missing.
pub fn finite(v: f64) -> Option<f64> {
    if v.is_finite() {
        Some(v)
    } else {
        None
    }
}

/// Mean of the present values, `None` when nothing is present.
pub fn mean_present(values: &[Option<f64>]) -> Option<f64> {
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    if present.is_empty() {
        None
    } else {
        finite(present.iter().sum::<f64>() / present.len() as f64)
    }
}

// ---------------------------------------------------------------------------
// Metric – one field of a GC result row
// ---------------------------------------------------------------------------

/// The fields reported per compound in a GC result file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Metric {
    Number,
    Compound,
    RetentionTime,
    QuantIon,
    Response,
    Concentration,
}

impl Metric {
    pub const ALL: [Metric; 6] = [
        Metric::Number,
        Metric::Compound,
        Metric::RetentionTime,
        Metric::QuantIon,
        Metric::Response,
        Metric::Concentration,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Metric::Number => "number",
            Metric::Compound => "compound",
            Metric::RetentionTime => "Rt",
            Metric::QuantIon => "Qion",
            Metric::Response => "Response",
            Metric::Concentration => "Concentration",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

// ---------------------------------------------------------------------------
// SampleResult – one parsed result file
// ---------------------------------------------------------------------------

/// One compound line of a result file, raw text per field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultRow {
    pub fields: BTreeMap<Metric, String>,
}

impl ResultRow {
    pub fn get(&self, metric: Metric) -> &str {
        self.fields.get(&metric).map(String::as_str).unwrap_or("")
    }

    pub fn compound(&self) -> &str {
        self.get(Metric::Compound)
    }
}

/// All compound rows of a single sample, in file order.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleResult {
    pub name: String,
    pub rows: Vec<ResultRow>,
}

impl SampleResult {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn compounds(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().map(ResultRow::compound)
    }
}

// ---------------------------------------------------------------------------
// Series – labelled 1-D values
// ---------------------------------------------------------------------------

/// Labelled column of numbers, e.g. a per-compound blank level.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub name: String,
    pub labels: Vec<String>,
    pub values: Vec<Option<f64>>,
}

impl Series {
    pub fn new(name: &str, labels: Vec<String>, values: Vec<Option<f64>>) -> Self {
        Series {
            name: name.to_string(),
            labels,
            values,
        }
    }

    pub fn get(&self, label: &str) -> Option<f64> {
        self.labels
            .iter()
            .position(|l| l == label)
            .and_then(|i| self.values[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<f64>)> {
        self.labels
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().copied())
    }

    /// One-column table, labels as rows.
    pub fn to_table(&self, index_name: &str) -> Table {
        Table {
            index_name: index_name.to_string(),
            row_labels: self.labels.clone(),
            column_labels: vec![self.name.clone()],
            values: self.values.iter().map(|v| vec![*v]).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Table – labelled 2-D numeric data
// ---------------------------------------------------------------------------

/// Row-major numeric table with string row and column labels.
///
/// Compound-keyed tables use compounds as rows and samples as columns.
/// Missing cells are `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub index_name: String,
    pub row_labels: Vec<String>,
    pub column_labels: Vec<String>,
    pub values: Vec<Vec<Option<f64>>>,
}

impl Table {
    pub fn new(
        index_name: &str,
        row_labels: Vec<String>,
        column_labels: Vec<String>,
        values: Vec<Vec<Option<f64>>>,
    ) -> Result<Self, TableError> {
        if row_labels.len() != values.len() {
            return Err(TableError::RowLabelCount {
                labels: row_labels.len(),
                rows: values.len(),
            });
        }
        for (row, cells) in values.iter().enumerate() {
            if cells.len() != column_labels.len() {
                return Err(TableError::RaggedRow {
                    row,
                    expected: column_labels.len(),
                    found: cells.len(),
                });
            }
        }
        Ok(Table {
            index_name: index_name.to_string(),
            row_labels,
            column_labels,
            values,
        })
    }

    /// All-missing table of the given labels.
    pub fn empty(index_name: &str, row_labels: Vec<String>, column_labels: Vec<String>) -> Self {
        let values = vec![vec![None; column_labels.len()]; row_labels.len()];
        Table {
            index_name: index_name.to_string(),
            row_labels,
            column_labels,
            values,
        }
    }

    /// `(rows, columns)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.row_labels.len(), self.column_labels.len())
    }

    pub fn is_empty(&self) -> bool {
        self.row_labels.is_empty() || self.column_labels.is_empty()
    }

    pub fn row_position(&self, label: &str) -> Option<usize> {
        self.row_labels.iter().position(|l| l == label)
    }

    pub fn column_position(&self, label: &str) -> Option<usize> {
        self.column_labels.iter().position(|l| l == label)
    }

    pub fn get(&self, row: &str, column: &str) -> Option<f64> {
        let r = self.row_position(row)?;
        let c = self.column_position(column)?;
        self.values[r][c]
    }

    pub fn row(&self, label: &str) -> Option<&[Option<f64>]> {
        self.row_position(label).map(|r| self.values[r].as_slice())
    }

    pub fn column(&self, label: &str) -> Option<Vec<Option<f64>>> {
        let c = self.column_position(label)?;
        Some(self.values.iter().map(|row| row[c]).collect())
    }

    /// Remove the row at `index` (0-based); remaining rows keep their content.
    pub fn drop_row(&mut self, index: usize) -> Result<(), TableError> {
        if index >= self.row_labels.len() {
            return Err(TableError::RowOutOfRange {
                index,
                len: self.row_labels.len(),
            });
        }
        self.row_labels.remove(index);
        self.values.remove(index);
        Ok(())
    }

    /// Columns in the order of `labels`; unknown labels become missing columns.
    pub fn select_column_labels(&self, labels: &[String]) -> Table {
        let values = self
            .values
            .iter()
            .map(|row| {
                labels
                    .iter()
                    .map(|l| self.column_position(l).and_then(|c| row[c]))
                    .collect()
            })
            .collect();
        Table {
            index_name: self.index_name.clone(),
            row_labels: self.row_labels.clone(),
            column_labels: labels.to_vec(),
            values,
        }
    }

    /// Rows in the order of `order`; labels not present become all-missing rows.
    pub fn reindex_rows(&self, order: &[String]) -> Table {
        let width = self.column_labels.len();
        let values = order
            .iter()
            .map(|label| match self.row_position(label) {
                Some(r) => self.values[r].clone(),
                None => vec![None; width],
            })
            .collect();
        Table {
            index_name: self.index_name.clone(),
            row_labels: order.to_vec(),
            column_labels: self.column_labels.clone(),
            values,
        }
    }

    pub fn transpose(&self, index_name: &str) -> Table {
        let (rows, cols) = self.shape();
        let values = (0..cols)
            .map(|c| (0..rows).map(|r| self.values[r][c]).collect())
            .collect();
        Table {
            index_name: index_name.to_string(),
            row_labels: self.column_labels.clone(),
            column_labels: self.row_labels.clone(),
            values,
        }
    }

    /// Per-row mean over the present cells.
    pub fn row_means(&self, name: &str) -> Series {
        Series::new(
            name,
            self.row_labels.clone(),
            self.values.iter().map(|row| mean_present(row)).collect(),
        )
    }
}

// ---------------------------------------------------------------------------
// ResultTables – the pair every pipeline produces
// ---------------------------------------------------------------------------

/// Concentration and response tables with identical labels.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultTables {
    pub concentration: Table,
    pub response: Table,
}
