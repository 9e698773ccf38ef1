use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::filter::LabelFilter;
use crate::data::model::Table;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PanelError {
    #[error("compound '{0}' appears more than once in the panel")]
    DuplicateCompound(String),
    #[error("compound '{name}' has a non-positive mass ({mass})")]
    NonPositiveMass { name: String, mass: f64 },
    #[error("native '{0}' has no theoretical QC value and is not pinned")]
    MissingTheoretical(String),
    #[error("the panel lists no internal standards")]
    NoInternalStandards,
    #[error("QC extract amount must be positive, got {0}")]
    NonPositiveQcAmount(f64),
}

/// Spiked internal standard used for recovery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InternalStandard {
    pub name: String,
    /// Other labels the instrument export uses for this compound.
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Mass added to every sample, pg.
    pub spiked_mass: f64,
    /// Mass recovery is reported against; defaults to `spiked_mass`.
    #[serde(default)]
    pub recovery_nominal: Option<f64>,
}

impl InternalStandard {
    pub fn nominal(&self) -> f64 {
        self.recovery_nominal.unwrap_or(self.spiked_mass)
    }
}

/// Standard added just before injection, the reference for RRFs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryStandard {
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    pub spiked_mass: f64,
}

/// Target analyte.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Native {
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Assigned value in the QC material, ng/ml.
    #[serde(default)]
    pub theoretical: Option<f64>,
    /// Force the correction factor to 1.0 (analyte absent from the QC).
    #[serde(default)]
    pub pin_correction_factor: bool,
}

fn default_sample_type() -> String {
    "Sample".to_string()
}

fn default_calibration_marker() -> String {
    "IS-RS".to_string()
}

fn default_qc_marker() -> String {
    "AMAP".to_string()
}

fn default_blank_marker() -> String {
    "blank".to_string()
}

fn default_qc_extract_amount() -> f64 {
    0.5
}

/// Everything batch-specific the correction pipeline needs: which compounds
/// exist, what was spiked, and how injections are named.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompoundPanel {
    pub internal_standards: Vec<InternalStandard>,
    pub recovery_standard: RecoveryStandard,
    pub natives: Vec<Native>,
    /// Value of the vendor export's `Type` column for rows to keep.
    #[serde(default = "default_sample_type")]
    pub sample_type: String,
    /// Substring identifying IS/RS calibration injections.
    #[serde(default = "default_calibration_marker")]
    pub calibration_marker: String,
    /// Substring identifying QC reference material injections.
    #[serde(default = "default_qc_marker")]
    pub qc_marker: String,
    /// Substring identifying procedural blanks, case-insensitive.
    #[serde(default = "default_blank_marker")]
    pub blank_marker: String,
    /// Amount of QC material extracted (ml).
    #[serde(default = "default_qc_extract_amount")]
    pub qc_extract_amount: f64,
}

/// Canonical form of an instrument compound label: `"BDE-47 Results"` → `"BDE_47"`.
pub fn normalize_compound_label(raw: &str) -> String {
    let trimmed = raw.trim();
    let stem = trimmed.strip_suffix(" Results").unwrap_or(trimmed);
    stem.trim().replace('-', "_")
}

impl CompoundPanel {
    /// PBDE and Dechlorane Plus panel measured on the 7000D.
    pub fn pbde() -> Self {
        let is = |name: &str, alias: &str, mass: f64, nominal: Option<f64>| InternalStandard {
            name: name.to_string(),
            aliases: vec![alias.to_string()],
            spiked_mass: mass,
            recovery_nominal: nominal,
        };
        let native = |name: &str, theoretical: f64, pinned: bool| Native {
            name: name.to_string(),
            aliases: Vec::new(),
            theoretical: Some(theoretical),
            pin_correction_factor: pinned,
        };

        CompoundPanel {
            internal_standards: vec![
                is("BDE_103_IS", "BDE_103 IS (ISTD)", 5000.0, None),
                is("BDE_128_IS", "BDE_128 IS (ISTD)", 5000.0, None),
                is("13C_syn_DP", "syn_DP IS (ISTD)", 5000.0, None),
                is("13C_anti_DP", "anti_DP IS (ISTD)", 5000.0, None),
                is("13C_BDE209", "BDE_209 IS (ISTD)", 6250.0, Some(6500.0)),
            ],
            recovery_standard: RecoveryStandard {
                name: "CB_207_RS".to_string(),
                aliases: vec!["CB_207".to_string()],
                spiked_mass: 2500.0,
            },
            natives: vec![
                native("BDE_28", 0.225, false),
                native("BDE_47", 1.050, false),
                native("BDE_99", 0.498, false),
                native("BDE_100", 0.340, false),
                native("BDE_153", 0.371, false),
                native("BDE_154", 0.748, false),
                native("BDE_183", 0.409, true),
                native("BDE_209", 0.981, false),
                native("anti_DP", 1.000, true),
                native("syn_DP", 1.000, true),
            ],
            sample_type: default_sample_type(),
            calibration_marker: default_calibration_marker(),
            qc_marker: default_qc_marker(),
            blank_marker: default_blank_marker(),
            qc_extract_amount: default_qc_extract_amount(),
        }
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let panel: CompoundPanel = serde_json::from_str(text).context("parsing panel JSON")?;
        panel.validate()?;
        Ok(panel)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading panel file {}", path.display()))?;
        Self::from_json_str(&text).with_context(|| format!("loading panel {}", path.display()))
    }

    pub fn validate(&self) -> Result<(), PanelError> {
        if self.internal_standards.is_empty() {
            return Err(PanelError::NoInternalStandards);
        }
        if self.qc_extract_amount <= 0.0 {
            return Err(PanelError::NonPositiveQcAmount(self.qc_extract_amount));
        }

        let mut seen = HashSet::new();
        for name in self.compound_order() {
            if !seen.insert(name.clone()) {
                return Err(PanelError::DuplicateCompound(name));
            }
        }

        let masses = self
            .internal_standards
            .iter()
            .map(|s| (&s.name, s.spiked_mass))
            .chain(self.internal_standards.iter().map(|s| (&s.name, s.nominal())))
            .chain(std::iter::once((
                &self.recovery_standard.name,
                self.recovery_standard.spiked_mass,
            )));
        for (name, mass) in masses {
            if mass <= 0.0 {
                return Err(PanelError::NonPositiveMass {
                    name: name.clone(),
                    mass,
                });
            }
        }

        if let Some(native) = self
            .natives
            .iter()
            .find(|n| n.theoretical.is_none() && !n.pin_correction_factor)
        {
            return Err(PanelError::MissingTheoretical(native.name.clone()));
        }
        Ok(())
    }

    pub fn internal_standard_names(&self) -> Vec<String> {
        self.internal_standards.iter().map(|s| s.name.clone()).collect()
    }

    pub fn native_names(&self) -> Vec<String> {
        self.natives.iter().map(|n| n.name.clone()).collect()
    }

    /// Internal standards, recovery standard, natives.
    pub fn compound_order(&self) -> Vec<String> {
        let mut order = self.internal_standard_names();
        order.push(self.recovery_standard.name.clone());
        order.extend(self.native_names());
        order
    }

    /// Canonical panel name for an instrument label, if the panel knows it.
    pub fn resolve(&self, raw_label: &str) -> Option<&str> {
        let label = normalize_compound_label(raw_label);
        let hit = |name: &str, aliases: &[String]| {
            name == label || aliases.iter().any(|a| normalize_compound_label(a) == label)
        };

        self.internal_standards
            .iter()
            .find(|s| hit(s.name.as_str(), s.aliases.as_slice()))
            .map(|s| s.name.as_str())
            .or_else(|| {
                hit(
                    self.recovery_standard.name.as_str(),
                    self.recovery_standard.aliases.as_slice(),
                )
                    .then_some(self.recovery_standard.name.as_str())
            })
            .or_else(|| {
                self.natives
                    .iter()
                    .find(|n| hit(n.name.as_str(), n.aliases.as_slice()))
                    .map(|n| n.name.as_str())
            })
    }

    /// Rename rows to panel names and put them in panel order. Rows the
    /// panel does not know are dropped; panel compounds absent from the
    /// table come back as missing rows.
    pub fn align_rows(&self, table: &Table) -> Table {
        let mut renamed = table.clone();
        renamed.row_labels = table
            .row_labels
            .iter()
            .map(|l| self.resolve(l).map(str::to_string).unwrap_or_else(|| l.clone()))
            .collect();
        renamed.reindex_rows(&self.compound_order())
    }

    pub fn calibration_filter(&self) -> LabelFilter {
        LabelFilter::Contains(self.calibration_marker.clone())
    }

    pub fn qc_filter(&self) -> LabelFilter {
        LabelFilter::Contains(self.qc_marker.clone())
    }

    pub fn blank_filter(&self) -> LabelFilter {
        LabelFilter::ContainsIgnoreCase(self.blank_marker.clone())
    }
}

impl Default for CompoundPanel {
    fn default() -> Self {
        Self::pbde()
    }
}
