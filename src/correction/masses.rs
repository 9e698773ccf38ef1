use std::path::Path;

use anyhow::{Context, Result};
use log::{info, warn};

use crate::data::model::coerce_numeric;

/// Extracted amount per sample, in the order the sample list gives them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleMasses {
    entries: Vec<(String, Option<f64>)>,
}

impl SampleMasses {
    pub fn from_pairs(entries: Vec<(String, Option<f64>)>) -> Self {
        SampleMasses { entries }
    }

    pub fn get(&self, sample: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(name, _)| name == sample)
            .and_then(|(_, mass)| *mass)
    }
}

/// Header of the sample list written for the operator to fill in.
const HEADER: [&str; 2] = ["Sample", "Mass"];

/// Write a sample list with an empty mass column for every sample.
pub fn write_sample_mass_template(samples: &[String], path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating sample list {}", path.display()))?;
    writer.write_record(HEADER)?;
    for sample in samples {
        writer.write_record([sample.as_str(), ""])?;
    }
    writer.flush()?;
    info!("wrote empty sample list for {} samples to {}", samples.len(), path.display());
    Ok(())
}

/// Read a filled-in sample list. Blank or non-numeric masses read as missing.
pub fn read_sample_masses(path: &Path) -> Result<SampleMasses> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("opening sample list {}", path.display()))?;

    let mut entries = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("reading row {} of {}", i + 1, path.display()))?;
        let sample = record.get(0).unwrap_or("").trim();
        if sample.is_empty() {
            continue;
        }
        let mass = record.get(1).and_then(coerce_numeric);
        if mass.is_none() {
            warn!("no mass given for sample '{sample}'");
        }
        entries.push((sample.to_string(), mass));
    }
    Ok(SampleMasses::from_pairs(entries))
}
