use std::fs;
use std::path::Path;

use gc_data_processor::data::batch::{process_batch, Alignment, BatchError, BatchOptions};
use gc_data_processor::data::export::ExportFormats;
use gc_data_processor::data::fixed_width::FixedWidthLayout;
use gc_data_processor::data::loader::load_table;

/// (compound, response, concentration)
type Row<'a> = (&'a str, &'a str, &'a str);

fn write_sample(root: &Path, sample: &str, rows: &[Row]) {
    let layout = FixedWidthLayout::default();
    let mut text = String::new();
    for i in 0..layout.header_rows {
        text.push_str(&format!("header {i}\n"));
    }
    for (i, (compound, response, conc)) in rows.iter().enumerate() {
        let number = (i + 1).to_string();
        text.push_str(&layout.format_row(&[&number, compound, "12.34", "486", response, conc]));
        text.push('\n');
    }
    for i in 0..layout.footer_rows {
        text.push_str(&format!("footer {i}\n"));
    }
    let dir = root.join(sample);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("a-all.txt"), text).unwrap();
}

fn two_sample_batch(root: &Path) {
    write_sample(
        root,
        "A",
        &[("BDE-28", "1200", "1.5"), ("BDE-47", "3400", "N.D."), ("BDE-99", "560", "0.25")],
    );
    write_sample(
        root,
        "B",
        &[("BDE-28", "1100", "1.25"), ("BDE-47", "3900", "4.5"), ("BDE-99", "", "0.5")],
    );
}

fn in_memory() -> BatchOptions {
    BatchOptions::default()
}

#[test]
fn samples_become_columns_and_compounds_rows() {
    let dir = tempfile::tempdir().unwrap();
    two_sample_batch(dir.path());

    let tables = process_batch(dir.path(), &in_memory()).unwrap();
    for table in [&tables.concentration, &tables.response] {
        assert_eq!(table.shape(), (3, 2));
        assert_eq!(table.column_labels, vec!["A", "B"]);
        assert_eq!(table.row_labels, vec!["BDE-28", "BDE-47", "BDE-99"]);
        assert_eq!(table.index_name, "Response_ID");
    }
    assert_eq!(tables.concentration.get("BDE-28", "B"), Some(1.25));
    assert_eq!(tables.response.get("BDE-47", "B"), Some(3900.0));
}

#[test]
fn non_numeric_cells_are_missing() {
    let dir = tempfile::tempdir().unwrap();
    two_sample_batch(dir.path());

    let tables = process_batch(dir.path(), &in_memory()).unwrap();
    assert_eq!(tables.concentration.get("BDE-47", "A"), None);
    assert_eq!(tables.response.get("BDE-99", "B"), None);
}

#[test]
fn dropped_row_disappears_from_both_tables() {
    let dir = tempfile::tempdir().unwrap();
    two_sample_batch(dir.path());

    let options = BatchOptions {
        index_to_drop: Some(1),
        ..in_memory()
    };
    let tables = process_batch(dir.path(), &options).unwrap();
    for table in [&tables.concentration, &tables.response] {
        assert_eq!(table.shape(), (2, 2));
        assert_eq!(table.row_labels, vec!["BDE-28", "BDE-99"]);
    }
    assert_eq!(tables.concentration.get("BDE-99", "A"), Some(0.25));

    let out_of_range = BatchOptions {
        index_to_drop: Some(3),
        ..in_memory()
    };
    let err = process_batch(dir.path(), &out_of_range).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<BatchError>(),
        Some(BatchError::RowOutOfRange { index: 3, len: 3 })
    ));
}

#[test]
fn exported_csv_is_identical_across_runs() {
    let dir = tempfile::tempdir().unwrap();
    two_sample_batch(dir.path());
    let options = BatchOptions {
        export: Some(ExportFormats::default()),
        ..in_memory()
    };

    process_batch(dir.path(), &options).unwrap();
    let first = fs::read(dir.path().join("concentration.csv")).unwrap();
    process_batch(dir.path(), &options).unwrap();
    let second = fs::read(dir.path().join("concentration.csv")).unwrap();
    assert_eq!(first, second);

    assert_eq!(
        String::from_utf8(first).unwrap(),
        "Response_ID,A,B\nBDE-28,1.5,1.25\nBDE-47,,4.5\nBDE-99,0.25,0.5\n"
    );
    let response = load_table(&dir.path().join("response.csv")).unwrap();
    assert_eq!(response.get("BDE-28", "A"), Some(1200.0));
}

#[test]
fn mismatched_compounds_need_name_alignment() {
    let dir = tempfile::tempdir().unwrap();
    write_sample(dir.path(), "A", &[("BDE-28", "1", "1"), ("BDE-47", "2", "2")]);
    write_sample(dir.path(), "B", &[("BDE-47", "3", "3")]);

    let err = process_batch(dir.path(), &in_memory()).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<BatchError>(),
        Some(BatchError::RowCountMismatch { .. })
    ));

    let options = BatchOptions {
        alignment: Alignment::ByCompound,
        ..in_memory()
    };
    let tables = process_batch(dir.path(), &options).unwrap();
    assert_eq!(tables.concentration.row_labels, vec!["BDE-28", "BDE-47"]);
    assert_eq!(tables.concentration.get("BDE-28", "B"), None);
    assert_eq!(tables.concentration.get("BDE-47", "B"), Some(3.0));
}

#[test]
fn empty_root_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = process_batch(dir.path(), &in_memory()).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<BatchError>(),
        Some(BatchError::NoSampleFiles)
    ));
}
