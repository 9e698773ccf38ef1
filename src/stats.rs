//! Descriptive statistics for correction results.

use crate::data::model::{finite, Table};

/// Column labels of a summary table, in order.
pub const SUMMARY_COLUMNS: [&str; 8] = ["count", "mean", "std", "min", "25%", "50%", "75%", "max"];

/// Summary of the present values of one row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub count: usize,
    pub mean: Option<f64>,
    /// Sample standard deviation (n − 1); `None` below two values.
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub q25: Option<f64>,
    pub median: Option<f64>,
    pub q75: Option<f64>,
    pub max: Option<f64>,
}

impl Summary {
    /// Values in `SUMMARY_COLUMNS` order.
    pub fn to_row(&self) -> Vec<Option<f64>> {
        vec![
            Some(self.count as f64),
            self.mean,
            self.std,
            self.min,
            self.q25,
            self.median,
            self.q75,
            self.max,
        ]
    }
}

/// Linear-interpolated percentile of sorted values, `p` in 0..=100.
fn percentile(sorted: &[f64], p: f64) -> Option<f64> {
    let n = sorted.len();
    match n {
        0 => None,
        1 => Some(sorted[0]),
        _ => {
            let rank = (p / 100.0) * (n - 1) as f64;
            let lower = rank.floor() as usize;
            let upper = (rank.ceil() as usize).min(n - 1);
            let frac = rank - lower as f64;
            if lower == upper {
                Some(sorted[lower])
            } else {
                Some(sorted[lower] * (1.0 - frac) + sorted[upper] * frac)
            }
        }
    }
}

/// Describe the present values; missing cells are skipped.
pub fn describe(values: &[Option<f64>]) -> Summary {
    let mut sorted: Vec<f64> = values.iter().flatten().copied().collect();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let n = sorted.len();

    let mean = (n > 0).then(|| sorted.iter().sum::<f64>() / n as f64);
    let std = match mean {
        Some(m) if n > 1 => {
            let variance = sorted.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (n - 1) as f64;
            finite(variance.sqrt())
        }
        _ => None,
    };

    Summary {
        count: n,
        mean,
        std,
        min: sorted.first().copied(),
        q25: percentile(&sorted, 25.0),
        median: percentile(&sorted, 50.0),
        q75: percentile(&sorted, 75.0),
        max: sorted.last().copied(),
    }
}

/// One summary per row of `table`; rows keep their labels.
pub fn summary_table(table: &Table) -> Table {
    Table {
        index_name: table.index_name.clone(),
        row_labels: table.row_labels.clone(),
        column_labels: SUMMARY_COLUMNS.iter().map(|s| s.to_string()).collect(),
        values: table.values.iter().map(|row| describe(row).to_row()).collect(),
    }
}
