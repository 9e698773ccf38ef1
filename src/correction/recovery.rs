use crate::data::model::{finite, Series, Table};

use super::panel::CompoundPanel;
use super::CorrectionError;

fn row<'a>(table: &'a Table, name: &str) -> Result<&'a [Option<f64>], CorrectionError> {
    table
        .row(name)
        .ok_or_else(|| CorrectionError::MissingCompound(name.to_string()))
}

/// Relative response factor of every internal standard against the recovery
/// standard, per calibration injection:
///
/// `RRF = (A_IS · m_RS) / (A_RS · m_IS)`
///
/// Rows are internal standards, columns the calibration injections.
pub fn relative_response_factors(
    response: &Table,
    calibration: &[String],
    panel: &CompoundPanel,
) -> Result<Table, CorrectionError> {
    if calibration.is_empty() {
        return Err(CorrectionError::NoCalibrationInjections(
            panel.calibration_marker.clone(),
        ));
    }
    let cal = response.select_column_labels(calibration);
    let rs = &panel.recovery_standard;
    let rs_area = row(&cal, &rs.name)?;

    let mut rrf = Table::empty("RRF", panel.internal_standard_names(), calibration.to_vec());
    for (r, is) in panel.internal_standards.iter().enumerate() {
        let is_area = row(&cal, &is.name)?;
        for c in 0..calibration.len() {
            rrf.values[r][c] = match (is_area[c], rs_area[c]) {
                (Some(a_is), Some(a_rs)) => {
                    finite((a_is * rs.spiked_mass) / (a_rs * is.spiked_mass))
                }
                _ => None,
            };
        }
    }
    Ok(rrf)
}

/// Mean RRF per internal standard across calibration injections.
pub fn average_rrf(rrf: &Table) -> Series {
    rrf.row_means("average_rrf")
}

/// Internal standard amounts found in each extracted injection.
#[derive(Debug, Clone, PartialEq)]
pub struct RecoveryResult {
    /// Extracted amount, pg.
    pub extracted: Table,
    /// Extracted amount relative to the nominal spike, %.
    pub recovery: Table,
}

/// `extracted = (A_IS · m_RS) / (A_RS · RRF̄)`, `recovery = extracted / nominal · 100`.
pub fn recoveries(
    response: &Table,
    injections: &[String],
    average_rrf: &Series,
    panel: &CompoundPanel,
) -> Result<RecoveryResult, CorrectionError> {
    let table = response.select_column_labels(injections);
    let rs = &panel.recovery_standard;
    let rs_area = row(&table, &rs.name)?;

    let names = panel.internal_standard_names();
    let mut extracted = Table::empty("extracted_pg", names.clone(), injections.to_vec());
    let mut recovery = Table::empty("recovery_pct", names, injections.to_vec());

    for (r, is) in panel.internal_standards.iter().enumerate() {
        let is_area = row(&table, &is.name)?;
        let rrf = average_rrf.get(&is.name);
        for c in 0..injections.len() {
            let amount = match (is_area[c], rs_area[c], rrf) {
                (Some(a_is), Some(a_rs), Some(rrf)) => finite((a_is * rs.spiked_mass) / (a_rs * rrf)),
                _ => None,
            };
            extracted.values[r][c] = amount;
            recovery.values[r][c] = amount.and_then(|pg| finite(pg / is.nominal() * 100.0));
        }
    }

    Ok(RecoveryResult {
        extracted,
        recovery,
    })
}
