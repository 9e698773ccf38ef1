use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use arrow::util::pretty::pretty_format_batches;
use log::info;
use parquet::arrow::ArrowWriter;

use super::model::{ResultTables, Table};

pub const CONCENTRATION_FILE: &str = "concentration";
pub const RESPONSE_FILE: &str = "response";

/// Which files `export_tables` writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportFormats {
    pub csv: bool,
    pub parquet: bool,
}

impl Default for ExportFormats {
    fn default() -> Self {
        ExportFormats {
            csv: true,
            parquet: false,
        }
    }
}

/// Write `concentration.*` and `response.*` into `dir`.
pub fn export_tables(dir: &Path, tables: &ResultTables, formats: &ExportFormats) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();
    for (stem, table) in [
        (CONCENTRATION_FILE, &tables.concentration),
        (RESPONSE_FILE, &tables.response),
    ] {
        if formats.csv {
            let path = dir.join(format!("{stem}.csv"));
            write_table_csv(table, &path)?;
            written.push(path);
        }
        if formats.parquet {
            let path = dir.join(format!("{stem}.parquet"));
            write_table_parquet(table, &path)?;
            written.push(path);
        }
    }
    info!("exported {} files to {}", written.len(), dir.display());
    Ok(written)
}

/// Text of a cell as written to CSV: empty when missing, otherwise always
/// with a fractional part (`12.0`, not `12`).
pub fn format_cell(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v:?}"),
        None => String::new(),
    }
}

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

pub fn write_table_csv(table: &Table, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;

    let header = std::iter::once(table.index_name.as_str())
        .chain(table.column_labels.iter().map(String::as_str));
    writer.write_record(header).context("writing CSV header")?;

    for (label, row) in table.row_labels.iter().zip(&table.values) {
        let record = std::iter::once(label.clone()).chain(row.iter().map(|v| format_cell(*v)));
        writer
            .write_record(record)
            .with_context(|| format!("writing CSV row '{label}'"))?;
    }
    writer.flush().context("flushing CSV")?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Arrow / Parquet
// ---------------------------------------------------------------------------

/// Arrow batch with the row labels as a leading string column.
pub fn table_to_record_batch(table: &Table) -> Result<RecordBatch> {
    let mut fields = vec![Field::new(&table.index_name, DataType::Utf8, false)];
    let mut columns: Vec<ArrayRef> = vec![Arc::new(StringArray::from(
        table.row_labels.iter().map(String::as_str).collect::<Vec<_>>(),
    ))];

    for (c, label) in table.column_labels.iter().enumerate() {
        fields.push(Field::new(label, DataType::Float64, true));
        let values: Vec<Option<f64>> = table.values.iter().map(|row| row[c]).collect();
        columns.push(Arc::new(Float64Array::from(values)));
    }

    RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)
        .context("building record batch")
}

pub fn write_table_parquet(table: &Table, path: &Path) -> Result<()> {
    let batch = table_to_record_batch(table)?;
    let file = std::fs::File::create(path)
        .with_context(|| format!("creating {}", path.display()))?;
    let mut writer =
        ArrowWriter::try_new(file, batch.schema(), None).context("creating parquet writer")?;
    writer.write(&batch).context("writing parquet batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}

/// Boxed text rendering of a table for the terminal.
pub fn render_table(table: &Table) -> Result<String> {
    let batch = table_to_record_batch(table)?;
    let rendered = pretty_format_batches(&[batch]).context("formatting table")?;
    Ok(rendered.to_string())
}
