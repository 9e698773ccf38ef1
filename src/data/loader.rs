use std::path::Path;

use anyhow::{bail, Context, Result};
use arrow::array::{Array, AsArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Float64Type};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

use super::model::{coerce_numeric, Table};

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a compound table previously written by this tool. Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – first column holds the row labels, the header row the column labels
/// * `.parquet` – first column (string) holds the row labels, the rest are numeric
pub fn load_table(path: &Path) -> Result<Table> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "csv" => load_csv(path),
        "parquet" | "pq" => load_parquet(path),
        other => bail!("Unsupported file extension: .{other}"),
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// Cells that are not numbers are loaded as missing.
fn load_csv(path: &Path) -> Result<Table> {
    let mut reader = csv::Reader::from_path(path).context("opening CSV")?;
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let (index_name, column_labels) = match headers.split_first() {
        Some((first, rest)) => (first.clone(), rest.to_vec()),
        None => bail!("CSV has no header row"),
    };

    let mut row_labels = Vec::new();
    let mut values = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        if record.len() != headers.len() {
            bail!(
                "CSV row {row_no}: {} fields but the header has {}",
                record.len(),
                headers.len()
            );
        }
        row_labels.push(record.get(0).unwrap_or("").to_string());
        values.push(record.iter().skip(1).map(coerce_numeric).collect());
    }

    Ok(Table::new(&index_name, row_labels, column_labels, values)?)
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

fn load_parquet(path: &Path) -> Result<Table> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let schema = builder.schema().clone();
    let reader = builder.build().context("building parquet reader")?;

    let Some((index_field, value_fields)) = schema.fields().split_first() else {
        bail!("Parquet file has no columns");
    };
    let column_labels: Vec<String> = value_fields.iter().map(|f| f.name().clone()).collect();

    let mut row_labels = Vec::new();
    let mut values: Vec<Vec<Option<f64>>> = Vec::new();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;

        let labels = cast(batch.column(0), &DataType::Utf8)
            .with_context(|| format!("index column '{}' is not text", index_field.name()))?;
        let labels = labels.as_string::<i32>();

        let numeric = (1..batch.num_columns())
            .map(|c| {
                cast(batch.column(c), &DataType::Float64)
                    .with_context(|| format!("column '{}' is not numeric", column_labels[c - 1]))
            })
            .collect::<Result<Vec<_>>>()?;

        for row in 0..batch.num_rows() {
            row_labels.push(if labels.is_null(row) {
                String::new()
            } else {
                labels.value(row).to_string()
            });
            values.push(
                numeric
                    .iter()
                    .map(|col| {
                        let col = col.as_primitive::<Float64Type>();
                        if col.is_null(row) {
                            None
                        } else {
                            Some(col.value(row))
                        }
                    })
                    .collect(),
            );
        }
    }

    Ok(Table::new(index_field.name(), row_labels, column_labels, values)?)
}
