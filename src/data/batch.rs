use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use log::{info, warn};
use thiserror::Error;

use super::discovery::{discover_samples, DiscoveryOptions};
use super::export::{export_tables, ExportFormats};
use super::fixed_width::FixedWidthLayout;
use super::model::{coerce_numeric, Metric, ResultTables, SampleResult, Table, INDEX_NAME};

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("directory not found: {0}")]
    RootNotFound(PathBuf),
    #[error("cannot derive a sample name from {0}")]
    NoSampleName(PathBuf),
    #[error("no result files found")]
    NoSampleFiles,
    #[error("sample '{sample}' has {found} compound rows, expected {expected}")]
    RowCountMismatch {
        sample: String,
        expected: usize,
        found: usize,
    },
    #[error("row {index} is out of range for a batch with {len} rows")]
    RowOutOfRange { index: usize, len: usize },
}

/// How rows of different samples are matched up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Alignment {
    /// Rows are matched by position and labelled from the first sample.
    /// Every sample must have the same number of rows; differing labels are
    /// only logged.
    #[default]
    Strict,
    /// Rows are matched by compound name. Compounds missing from a sample are
    /// left empty.
    ByCompound,
}

// ---------------------------------------------------------------------------
// Batch – samples side by side, keyed by (sample, metric)
// ---------------------------------------------------------------------------

/// One column of the combined batch.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchColumn {
    pub sample: String,
    pub metric: Metric,
    pub cells: Vec<String>,
}

/// All samples of a run combined into one frame with a shared compound axis.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub compounds: Vec<String>,
    pub columns: Vec<BatchColumn>,
}

impl Batch {
    pub fn from_samples(samples: &[SampleResult], alignment: Alignment) -> Result<Self, BatchError> {
        let first = samples.first().ok_or(BatchError::NoSampleFiles)?;
        match alignment {
            Alignment::Strict => Self::positional(first, samples),
            Alignment::ByCompound => Ok(Self::keyed(samples)),
        }
    }

    fn positional(first: &SampleResult, samples: &[SampleResult]) -> Result<Self, BatchError> {
        let compounds: Vec<String> = first.compounds().map(str::to_string).collect();

        for sample in samples {
            if sample.len() != compounds.len() {
                return Err(BatchError::RowCountMismatch {
                    sample: sample.name.clone(),
                    expected: compounds.len(),
                    found: sample.len(),
                });
            }
            if let Some((row, (expected, found))) = compounds
                .iter()
                .zip(sample.compounds())
                .enumerate()
                .find(|(_, (expected, found))| expected.as_str() != *found)
            {
                warn!(
                    "sample '{}' row {row} is '{found}', labelled '{expected}' from '{}'",
                    sample.name, first.name
                );
            }
        }

        let columns = samples
            .iter()
            .flat_map(|sample| {
                Metric::ALL.iter().map(move |&metric| BatchColumn {
                    sample: sample.name.clone(),
                    metric,
                    cells: sample.rows.iter().map(|r| r.get(metric).to_string()).collect(),
                })
            })
            .collect();

        Ok(Batch { compounds, columns })
    }

    /// Join on compound name. A name repeated within a file is matched by its
    /// occurrence count, so the n-th `"-----"` lines up with the n-th one.
    fn keyed(samples: &[SampleResult]) -> Self {
        let mut keys: Vec<(String, usize)> = Vec::new();
        let mut positions: HashMap<(String, usize), usize> = HashMap::new();
        let mut per_sample: Vec<Vec<usize>> = Vec::with_capacity(samples.len());

        for sample in samples {
            let mut seen: HashMap<&str, usize> = HashMap::new();
            let mut rows = Vec::with_capacity(sample.len());
            for compound in sample.compounds() {
                let occurrence = seen.entry(compound).or_insert(0);
                let key = (compound.to_string(), *occurrence);
                *occurrence += 1;
                let pos = *positions.entry(key.clone()).or_insert_with(|| {
                    keys.push(key);
                    keys.len() - 1
                });
                rows.push(pos);
            }
            per_sample.push(rows);
        }

        let mut columns = Vec::with_capacity(samples.len() * Metric::ALL.len());
        for (sample, rows) in samples.iter().zip(&per_sample) {
            if rows.len() != keys.len() {
                warn!(
                    "sample '{}' reports {} of {} compounds",
                    sample.name,
                    rows.len(),
                    keys.len()
                );
            }
            for metric in Metric::ALL {
                let mut cells = vec![String::new(); keys.len()];
                for (row, &pos) in sample.rows.iter().zip(rows) {
                    cells[pos] = row.get(metric).to_string();
                }
                columns.push(BatchColumn {
                    sample: sample.name.clone(),
                    metric,
                    cells,
                });
            }
        }

        Batch {
            compounds: keys.into_iter().map(|(name, _)| name).collect(),
            columns,
        }
    }

    pub fn height(&self) -> usize {
        self.compounds.len()
    }

    pub fn samples(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.metric == Metric::Compound)
            .map(|c| c.sample.as_str())
            .collect()
    }

    /// Remove the row at `index` (0-based) from every column.
    pub fn drop_row(&mut self, index: usize) -> Result<(), BatchError> {
        if index >= self.height() {
            return Err(BatchError::RowOutOfRange {
                index,
                len: self.height(),
            });
        }
        self.compounds.remove(index);
        for column in &mut self.columns {
            column.cells.remove(index);
        }
        Ok(())
    }

    /// Numeric table of one metric: compounds × samples.
    pub fn metric_table(&self, metric: Metric) -> Table {
        let selected: Vec<&BatchColumn> =
            self.columns.iter().filter(|c| c.metric == metric).collect();
        let values = (0..self.height())
            .map(|row| {
                selected
                    .iter()
                    .map(|c| coerce_numeric(&c.cells[row]))
                    .collect()
            })
            .collect();
        Table {
            index_name: INDEX_NAME.to_string(),
            row_labels: self.compounds.clone(),
            column_labels: selected.iter().map(|c| c.sample.clone()).collect(),
            values,
        }
    }

    pub fn split(&self) -> ResultTables {
        ResultTables {
            concentration: self.metric_table(Metric::Concentration),
            response: self.metric_table(Metric::Response),
        }
    }
}

// ---------------------------------------------------------------------------
// Batch processing entry-point
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    pub discovery: DiscoveryOptions,
    pub layout: FixedWidthLayout,
    pub alignment: Alignment,
    /// 0-based row removed from both tables.
    pub index_to_drop: Option<usize>,
    /// Where to write the tables; `None` keeps them in memory only.
    pub export: Option<ExportFormats>,
}

/// Discover, parse and combine every result file under `root`.
pub fn process_batch(root: &Path, options: &BatchOptions) -> Result<ResultTables> {
    let files = discover_samples(root, &options.discovery)?;
    if files.is_empty() {
        return Err(BatchError::NoSampleFiles.into());
    }

    let samples = files
        .iter()
        .map(|f| options.layout.parse_file(&f.sample, &f.path))
        .collect::<Result<Vec<_>>>()?;

    let mut batch = Batch::from_samples(&samples, options.alignment)?;
    if let Some(index) = options.index_to_drop {
        batch.drop_row(index)?;
        info!("dropped row {index}");
    }

    let tables = batch.split();
    info!(
        "combined {} samples × {} compounds",
        batch.samples().len(),
        batch.height()
    );

    if let Some(formats) = &options.export {
        export_tables(root, &tables, formats)?;
    }
    Ok(tables)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::ResultRow;

    fn sample(name: &str, rows: &[(&str, &str, &str)]) -> SampleResult {
        SampleResult {
            name: name.to_string(),
            rows: rows
                .iter()
                .map(|(compound, response, conc)| ResultRow {
                    fields: [
                        (Metric::Compound, compound.to_string()),
                        (Metric::Response, response.to_string()),
                        (Metric::Concentration, conc.to_string()),
                    ]
                    .into_iter()
                    .collect(),
                })
                .collect(),
        }
    }

    #[test]
    fn strict_alignment_splits_metrics_by_label() {
        let samples = vec![
            sample("A", &[("x", "10", "1.0"), ("y", "20", "2.0")]),
            sample("B", &[("x", "30", "3.0"), ("y", "n/a", "4.0")]),
        ];
        let tables = Batch::from_samples(&samples, Alignment::Strict)
            .unwrap()
            .split();
        assert_eq!(tables.response.column_labels, vec!["A", "B"]);
        assert_eq!(tables.response.get("x", "B"), Some(30.0));
        assert_eq!(tables.response.get("y", "B"), None);
        assert_eq!(tables.concentration.get("y", "A"), Some(2.0));
    }

    #[test]
    fn strict_alignment_rejects_row_count_mismatch() {
        let samples = vec![
            sample("A", &[("x", "1", "1"), ("y", "2", "2")]),
            sample("B", &[("x", "1", "1")]),
        ];
        assert!(matches!(
            Batch::from_samples(&samples, Alignment::Strict),
            Err(BatchError::RowCountMismatch { found: 1, .. })
        ));
    }

    #[test]
    fn strict_alignment_labels_rows_from_first_sample() {
        let samples = vec![
            sample("A", &[("BDE-28", "1", "1"), ("BDE-47", "2", "2")]),
            sample("B", &[("BDE-28", "3", "3"), ("BDE 47", "4", "4")]),
        ];
        let batch = Batch::from_samples(&samples, Alignment::Strict).unwrap();
        assert_eq!(batch.compounds, vec!["BDE-28", "BDE-47"]);
        let response = batch.metric_table(Metric::Response);
        assert_eq!(response.get("BDE-47", "B"), Some(4.0));
    }

    #[test]
    fn compound_alignment_joins_by_name() {
        let samples = vec![
            sample("A", &[("x", "1", "1"), ("y", "2", "2")]),
            sample("B", &[("y", "20", "2"), ("z", "30", "3")]),
        ];
        let batch = Batch::from_samples(&samples, Alignment::ByCompound).unwrap();
        assert_eq!(batch.compounds, vec!["x", "y", "z"]);
        let response = batch.metric_table(Metric::Response);
        assert_eq!(response.get("y", "B"), Some(20.0));
        assert_eq!(response.get("x", "B"), None);
        assert_eq!(response.get("z", "A"), None);
    }

    #[test]
    fn drop_row_applies_to_every_column() {
        let samples = vec![
            sample("A", &[("x", "1", "1"), ("sep", "-", "-"), ("y", "2", "2")]),
            sample("B", &[("x", "3", "3"), ("sep", "-", "-"), ("y", "4", "4")]),
        ];
        let mut batch = Batch::from_samples(&samples, Alignment::Strict).unwrap();
        batch.drop_row(1).unwrap();
        let tables = batch.split();
        assert_eq!(tables.concentration.row_labels, vec!["x", "y"]);
        assert_eq!(tables.response.get("y", "B"), Some(4.0));
        assert!(matches!(batch.drop_row(9), Err(BatchError::RowOutOfRange { .. })));
    }

    #[test]
    fn empty_sample_list_is_an_error() {
        assert!(matches!(
            Batch::from_samples(&[], Alignment::Strict),
            Err(BatchError::NoSampleFiles)
        ));
    }
}
