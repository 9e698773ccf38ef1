//! SVG charts of a finished correction run.
//!
//! ```text
//!  CorrectionReport ──► recovery.svg                  box per internal standard
//!                   ├─► is_areas.svg                  box per standard, all injections
//!                   ├─► native_areas.svg              box per native, all injections
//!                   ├─► correction_factors.svg        spread box | bar per native
//!                   ├─► concentration_by_sample.svg   box per sample
//!                   └─► concentration_by_analyte.svg  box per native
//! ```
//!
//! Rendering only reads the report; nothing here feeds back into the numbers.
//! Non-finite values never reach an axis.

use std::fmt::Debug;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, ensure, Context, Result};
use log::{info, warn};
use plotters::coord::Shift;
use plotters::prelude::*;

use crate::color::ColorMap;
use crate::correction::CorrectionReport;
use crate::data::model::{Series, Table};

const SIZE: (u32, u32) = (1024, 600);

fn plot_err<E: Debug>(e: E) -> anyhow::Error {
    anyhow!("chart rendering failed: {e:?}")
}

/// Finite values of each group, empty groups dropped.
fn present_groups(labels: &[String], rows: &[Vec<Option<f64>>]) -> Vec<(String, Vec<f64>)> {
    labels
        .iter()
        .zip(rows)
        .map(|(label, row)| {
            let values: Vec<f64> = row.iter().flatten().copied().filter(|v| v.is_finite()).collect();
            (label.clone(), values)
        })
        .filter(|(_, values)| !values.is_empty())
        .collect()
}

fn row_groups(table: &Table) -> Vec<(String, Vec<f64>)> {
    present_groups(&table.row_labels, &table.values)
}

fn column_groups(table: &Table) -> Vec<(String, Vec<f64>)> {
    let transposed = table.transpose(&table.index_name);
    present_groups(&transposed.row_labels, &transposed.values)
}

fn padded_range(lo: f32, hi: f32) -> std::ops::Range<f32> {
    let pad = ((hi - lo).abs() * 0.1).max(1e-3);
    (lo - pad)..(hi + pad)
}

fn draw_boxes<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    title: &str,
    y_desc: &str,
    groups: &[(String, Vec<f64>)],
) -> Result<()> {
    let quartiles: Vec<Quartiles> = groups.iter().map(|(_, v)| Quartiles::new(v.as_slice())).collect();
    let (lo, hi) = quartiles
        .iter()
        .flat_map(|q| q.values())
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    ensure!(lo.is_finite() && hi.is_finite(), "nothing finite to plot in '{title}'");
    let labels: Vec<String> = groups.iter().map(|(l, _)| l.clone()).collect();
    let colors = ColorMap::new(&labels);

    let mut chart = ChartBuilder::on(area)
        .caption(title, ("sans-serif", 22))
        .margin(15)
        .x_label_area_size(60)
        .y_label_area_size(70)
        .build_cartesian_2d((0..labels.len() as i32).into_segmented(), padded_range(lo, hi))
        .map_err(plot_err)?;

    let label_of = |v: &SegmentValue<i32>| match v {
        SegmentValue::CenterOf(i) | SegmentValue::Exact(i) => {
            labels.get(*i as usize).cloned().unwrap_or_default()
        }
        SegmentValue::Last => String::new(),
    };
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(labels.len())
        .x_label_formatter(&label_of)
        .y_desc(y_desc)
        .draw()
        .map_err(plot_err)?;

    chart
        .draw_series(labels.iter().zip(&quartiles).enumerate().map(|(i, (label, q))| {
            Boxplot::new_vertical(SegmentValue::CenterOf(i as i32), q)
                .width(30)
                .style(colors.color_for(label).stroke_width(2))
        }))
        .map_err(plot_err)?;
    Ok(())
}

fn draw_bars<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    title: &str,
    y_desc: &str,
    series: &Series,
) -> Result<()> {
    let bars: Vec<(usize, &str, f64)> = series
        .iter()
        .enumerate()
        .filter_map(|(i, (label, value))| value.filter(|v| v.is_finite()).map(|v| (i, label, v)))
        .collect();
    let hi = bars.iter().map(|(_, _, v)| *v).fold(0.0_f64, f64::max);
    let lo = bars.iter().map(|(_, _, v)| *v).fold(0.0_f64, f64::min);
    let colors = ColorMap::new(&series.labels);
    let width = series.labels.len();

    let mut chart = ChartBuilder::on(area)
        .caption(title, ("sans-serif", 22))
        .margin(15)
        .x_label_area_size(60)
        .y_label_area_size(70)
        .build_cartesian_2d((0..width as i32).into_segmented(), lo..(hi * 1.1).max(lo + 1e-3))
        .map_err(plot_err)?;

    let label_of = |v: &SegmentValue<i32>| match v {
        SegmentValue::CenterOf(i) | SegmentValue::Exact(i) => {
            series.labels.get(*i as usize).cloned().unwrap_or_default()
        }
        SegmentValue::Last => String::new(),
    };
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(width)
        .x_label_formatter(&label_of)
        .y_desc(y_desc)
        .draw()
        .map_err(plot_err)?;

    chart
        .draw_series(bars.iter().map(|&(i, label, v)| {
            let i = i as i32;
            let mut bar = Rectangle::new(
                [(SegmentValue::Exact(i), 0.0), (SegmentValue::Exact(i + 1), v)],
                colors.color_for(label).filled(),
            );
            bar.set_margin(0, 0, 8, 8);
            bar
        }))
        .map_err(plot_err)?;
    Ok(())
}

/// Box plot with one box per group.
pub fn box_chart(path: &Path, title: &str, y_desc: &str, groups: &[(String, Vec<f64>)]) -> Result<()> {
    let root = SVGBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;
    draw_boxes(&root, title, y_desc, groups)?;
    root.present().map_err(plot_err)?;
    Ok(())
}

/// Bar chart of a series, missing and non-finite values skipped.
pub fn bar_chart(path: &Path, title: &str, y_desc: &str, series: &Series) -> Result<()> {
    let root = SVGBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;
    draw_bars(&root, title, y_desc, series)?;
    root.present().map_err(plot_err)?;
    Ok(())
}

/// Spread of the correction factors as one box, next to a bar per native.
pub fn correction_factor_chart(path: &Path, factors: &Series) -> Result<()> {
    let spread = present_groups(&["correction factor".to_string()], &[factors.values.clone()]);
    let root = SVGBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;
    let (left, right) = root.split_horizontally(SIZE.0 / 3);
    draw_boxes(&left, "Spread", "correction factor", &spread)?;
    draw_bars(&right, "QC correction factors", "correction factor", factors)?;
    root.present().map_err(plot_err)?;
    Ok(())
}

/// Write every chart of `report` into `out_dir`, returning the files written.
///
/// Concentration charts use the normalised concentrations when present,
/// otherwise the corrected amounts.
pub fn render_report(report: &CorrectionReport, out_dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("creating report directory {}", out_dir.display()))?;
    let mut written = Vec::new();

    let recovery = row_groups(&report.recovery);
    if recovery.is_empty() {
        warn!("no recoveries to plot");
    } else {
        let path = out_dir.join("recovery.svg");
        box_chart(&path, "Internal standard recovery", "recovery (%)", &recovery)?;
        written.push(path);
    }

    let areas = [
        ("is_areas.svg", "Peak areas of internal standards in all injections", &report.standard_areas),
        ("native_areas.svg", "Peak areas of natives in all injections", &report.native_areas),
    ];
    for (file, title, table) in areas {
        let groups = row_groups(table);
        if groups.is_empty() {
            warn!("no peak areas for {file}");
            continue;
        }
        let path = out_dir.join(file);
        box_chart(&path, title, "peak area", &groups)?;
        written.push(path);
    }

    if report.correction_factors.values.iter().flatten().any(|v| v.is_finite()) {
        let path = out_dir.join("correction_factors.svg");
        correction_factor_chart(&path, &report.correction_factors)?;
        written.push(path);
    }

    let (amounts, unit) = match &report.final_concentration {
        Some(table) => (table, "concentration (pg/g)"),
        None => (&report.corrected_pg, "amount (pg)"),
    };
    let by_sample = column_groups(amounts);
    if !by_sample.is_empty() {
        let path = out_dir.join("concentration_by_sample.svg");
        box_chart(&path, "Concentration by sample", unit, &by_sample)?;
        written.push(path);
    }
    let by_analyte = row_groups(amounts);
    if !by_analyte.is_empty() {
        let path = out_dir.join("concentration_by_analyte.svg");
        box_chart(&path, "Concentration by analyte", unit, &by_analyte)?;
        written.push(path);
    }

    info!("wrote {} charts to {}", written.len(), out_dir.display());
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_skip_empty_rows_and_columns() {
        let table = Table::new(
            "t",
            vec!["a".into(), "b".into()],
            vec!["x".into(), "y".into()],
            vec![vec![Some(1.0), None], vec![None, None]],
        )
        .unwrap();
        assert_eq!(row_groups(&table), vec![("a".to_string(), vec![1.0])]);
        assert_eq!(column_groups(&table), vec![("x".to_string(), vec![1.0])]);
    }

    #[test]
    fn box_and_bar_charts_write_svg() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("box.svg");
        let groups = vec![
            ("IS1".to_string(), vec![80.0, 90.0, 100.0]),
            ("IS2".to_string(), vec![60.0]),
        ];
        box_chart(&path, "recovery", "%", &groups).unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().contains("<svg"));

        let path = dir.path().join("bar.svg");
        let series = Series::new("cf", vec!["N1".into(), "N2".into()], vec![Some(1.2), None]);
        bar_chart(&path, "cf", "factor", &series).unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().contains("<svg"));

        let path = dir.path().join("cf.svg");
        correction_factor_chart(&path, &series).unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().contains("<svg"));
    }

    #[test]
    fn infinite_values_are_left_off_the_axes() {
        let groups = present_groups(
            &["IS".to_string()],
            &[vec![Some(80.0), Some(f64::INFINITY), Some(f64::NEG_INFINITY), None]],
        );
        assert_eq!(groups, vec![("IS".to_string(), vec![80.0])]);

        let dir = tempfile::tempdir().unwrap();
        let series = Series::new("cf", vec!["N1".into(), "N2".into()], vec![Some(f64::INFINITY), Some(2.0)]);
        bar_chart(&dir.path().join("bar.svg"), "cf", "factor", &series).unwrap();

        let only_inf = vec![("IS".to_string(), vec![f64::INFINITY])];
        assert!(box_chart(&dir.path().join("box.svg"), "r", "%", &only_inf).is_err());
    }
}
