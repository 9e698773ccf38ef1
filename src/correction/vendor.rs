//! Reader for the quantitation batch table exported as CSV by the instrument
//! software.
//!
//! The export has two header rows. The first names the compound each block
//! of columns belongs to (`"BDE-47 Results"`, written once and left blank for
//! the rest of the block); the second names the metric in each column
//! (`Final Conc.`, `Area`, `ISTD Resp.`). Columns before the first compound
//! block describe the injection (`Name`, `Data File`, `Type`, ...); the first
//! header cell ending in `Results` opens the first compound block.

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use log::{debug, warn};
use thiserror::Error;

use super::panel::CompoundPanel;
use crate::data::model::{coerce_numeric, ResultTables, Table, INDEX_NAME};

#[derive(Error, Debug)]
pub enum VendorError {
    #[error("export needs two header rows, found {0}")]
    MissingHeader(usize),
    #[error("no compound columns in the export header")]
    NoCompoundColumns,
    #[error(transparent)]
    Csv(#[from] csv::Error),
}

/// What a vendor column measures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VendorMetric {
    FinalConc,
    Area,
    IstdResponse,
    Other(String),
}

impl VendorMetric {
    pub fn from_header(raw: &str) -> Self {
        let h = raw.trim();
        if h.starts_with("Final Conc") || h == "Conc." {
            VendorMetric::FinalConc
        } else if h == "ISTD Resp." || h == "ISTD Resp" {
            VendorMetric::IstdResponse
        } else if h == "Area" || h == "Resp." || h == "Resp" {
            VendorMetric::Area
        } else {
            VendorMetric::Other(h.to_string())
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VendorColumn {
    /// Compound block label as written in the export.
    pub compound: String,
    pub metric: VendorMetric,
    pub cells: Vec<Option<f64>>,
}

/// Parsed export: one entry per injection, columns keyed by (compound, metric).
#[derive(Debug, Clone, PartialEq)]
pub struct VendorExport {
    pub samples: Vec<String>,
    /// Injection type per sample; `None` when the export has no `Type` column.
    pub sample_types: Vec<Option<String>>,
    pub columns: Vec<VendorColumn>,
}

pub fn load_vendor_csv(path: &Path) -> Result<VendorExport> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("opening vendor export {}", path.display()))?;
    parse_vendor_csv(file).with_context(|| format!("parsing vendor export {}", path.display()))
}

pub fn parse_vendor_csv<R: Read>(input: R) -> Result<VendorExport, VendorError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(input);

    let mut records = Vec::new();
    for record in reader.records() {
        records.push(record?);
    }
    if records.len() < 2 {
        return Err(VendorError::MissingHeader(records.len()));
    }
    let (groups, metrics) = (&records[0], &records[1]);
    let data = &records[2..];

    let first_block = groups
        .iter()
        .position(|cell| cell.trim().ends_with("Results"))
        .ok_or(VendorError::NoCompoundColumns)?;

    // Forward-fill the compound block labels across their columns.
    let mut block: Option<String> = None;
    let mut owners: Vec<Option<String>> = vec![None; first_block];
    for cell in groups.iter().skip(first_block) {
        let cell = cell.trim();
        if !cell.is_empty() && !cell.starts_with("Unnamed:") {
            block = Some(cell.to_string());
        }
        owners.push(block.clone());
    }

    let meta_header = |name: &str| {
        (0..first_block).find(|&c| {
            metrics.get(c).map(str::trim) == Some(name) || groups.get(c).map(str::trim) == Some(name)
        })
    };
    let name_col = meta_header("Name").or_else(|| meta_header("Sample")).unwrap_or(0);
    let type_col = meta_header("Type");

    let samples = data
        .iter()
        .map(|r| r.get(name_col).unwrap_or("").trim().to_string())
        .collect();
    let sample_types = data
        .iter()
        .map(|r| type_col.map(|c| r.get(c).unwrap_or("").trim().to_string()))
        .collect();

    let columns: Vec<VendorColumn> = owners
        .iter()
        .enumerate()
        .skip(first_block)
        .filter_map(|(c, owner)| {
            let compound = owner.clone()?;
            Some(VendorColumn {
                compound,
                metric: VendorMetric::from_header(metrics.get(c).unwrap_or("")),
                cells: data
                    .iter()
                    .map(|r| r.get(c).and_then(coerce_numeric))
                    .collect(),
            })
        })
        .collect();

    debug!(
        "vendor export: {} injections, {} compound columns",
        data.len(),
        columns.len()
    );
    Ok(VendorExport {
        samples,
        sample_types,
        columns,
    })
}

impl VendorExport {
    /// Keep injections whose type equals `sample_type` (case-insensitive).
    /// Exports without a `Type` column keep everything.
    pub fn retain_type(&self, sample_type: &str) -> VendorExport {
        let keep: Vec<usize> = self
            .sample_types
            .iter()
            .enumerate()
            .filter(|(_, t)| match t {
                Some(t) => t.eq_ignore_ascii_case(sample_type),
                None => true,
            })
            .map(|(i, _)| i)
            .collect();

        VendorExport {
            samples: keep.iter().map(|&i| self.samples[i].clone()).collect(),
            sample_types: keep.iter().map(|&i| self.sample_types[i].clone()).collect(),
            columns: self
                .columns
                .iter()
                .map(|col| VendorColumn {
                    compound: col.compound.clone(),
                    metric: col.metric.clone(),
                    cells: keep.iter().map(|&i| col.cells[i]).collect(),
                })
                .collect(),
        }
    }

    fn find(&self, panel: &CompoundPanel, name: &str, metric: &VendorMetric) -> Option<&VendorColumn> {
        self.columns
            .iter()
            .find(|c| &c.metric == metric && panel.resolve(&c.compound) == Some(name))
    }

    /// Build panel-ordered response and concentration tables.
    ///
    /// Responses come from each compound's area, falling back to its ISTD
    /// response. Standards get their spiked mass as concentration.
    pub fn assemble(&self, panel: &CompoundPanel) -> ResultTables {
        let kept = self.retain_type(&panel.sample_type);
        let order = panel.compound_order();
        let width = kept.samples.len();

        let mut response = Table::empty(INDEX_NAME, order.clone(), kept.samples.clone());
        let mut concentration = Table::empty(INDEX_NAME, order.clone(), kept.samples.clone());

        for (row, name) in order.iter().enumerate() {
            let area = kept
                .find(panel, name, &VendorMetric::Area)
                .or_else(|| kept.find(panel, name, &VendorMetric::IstdResponse));
            match area {
                Some(col) => response.values[row] = col.cells.clone(),
                None => warn!("no response column for '{name}' in the export"),
            }

            let spiked = panel
                .internal_standards
                .iter()
                .find(|s| &s.name == name)
                .map(|s| s.spiked_mass)
                .or_else(|| {
                    (&panel.recovery_standard.name == name)
                        .then_some(panel.recovery_standard.spiked_mass)
                });
            if let Some(mass) = spiked {
                concentration.values[row] = vec![Some(mass); width];
            } else if let Some(col) = kept.find(panel, name, &VendorMetric::FinalConc) {
                concentration.values[row] = col.cells.clone();
            } else {
                warn!("no concentration column for '{name}' in the export");
            }
        }

        ResultTables {
            concentration,
            response,
        }
    }
}
