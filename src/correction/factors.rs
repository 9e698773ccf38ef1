use log::warn;

use crate::data::model::{mean_present, finite, Series, Table};

use super::masses::SampleMasses;
use super::panel::CompoundPanel;
use super::CorrectionError;

/// pg per ng.
const PG_PER_NG: f64 = 1000.0;

/// Mean native amount found in the procedural blanks.
///
/// Natives never detected in a blank, and every native when there are no
/// blanks at all, get a background of zero.
pub fn blank_means(concentration: &Table, blanks: &[String], panel: &CompoundPanel) -> Series {
    let natives = panel.native_names();
    if blanks.is_empty() {
        warn!("no blank injections; blank subtraction is skipped");
    }
    let table = concentration
        .reindex_rows(&natives)
        .select_column_labels(blanks);
    let values = table
        .values
        .iter()
        .map(|row| Some(mean_present(row).unwrap_or(0.0)))
        .collect();
    Series::new("blank_pg", natives, values)
}

/// QC-derived correction factors and the intermediate QC values.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrectionFactors {
    /// Blank-corrected QC concentration, ng/ml.
    pub qc_corrected: Table,
    pub qc_mean: Series,
    pub factors: Series,
}

/// `CF = theoretical / mean((QC_pg − blank) / (qc_extract_amount · 1000))`.
///
/// Pinned natives get exactly 1.0.
pub fn correction_factors(
    concentration: &Table,
    qc: &[String],
    blank: &Series,
    panel: &CompoundPanel,
) -> Result<CorrectionFactors, CorrectionError> {
    let needs_qc = panel.natives.iter().any(|n| !n.pin_correction_factor);
    if qc.is_empty() && needs_qc {
        return Err(CorrectionError::NoQcInjections(panel.qc_marker.clone()));
    }

    let natives = panel.native_names();
    let divisor = panel.qc_extract_amount * PG_PER_NG;
    let mut qc_corrected = concentration.reindex_rows(&natives).select_column_labels(qc);
    qc_corrected.index_name = "qc_ng_ml".to_string();
    for (row, name) in qc_corrected.values.iter_mut().zip(&natives) {
        let b = blank.get(name).unwrap_or(0.0);
        for cell in row.iter_mut() {
            *cell = cell.and_then(|v| finite((v - b) / divisor));
        }
    }

    let qc_mean = qc_corrected.row_means("qc_mean");
    let factors = panel
        .natives
        .iter()
        .zip(&qc_mean.values)
        .map(|(native, mean)| {
            if native.pin_correction_factor {
                return Some(1.0);
            }
            match (native.theoretical, mean) {
                (Some(t), Some(m)) => finite(t / m),
                _ => {
                    warn!("no correction factor for '{}'", native.name);
                    None
                }
            }
        })
        .collect();

    Ok(CorrectionFactors {
        qc_corrected,
        qc_mean,
        factors: Series::new("correction_factor", natives, factors),
    })
}

/// `(conc − blank) · CF` for every real sample, natives as rows.
pub fn corrected_sample_amounts(
    concentration: &Table,
    samples: &[String],
    blank: &Series,
    factors: &Series,
    panel: &CompoundPanel,
) -> Table {
    let natives = panel.native_names();
    let mut table = concentration
        .reindex_rows(&natives)
        .select_column_labels(samples);
    table.index_name = "Concentration_ID".to_string();

    for (row, name) in table.values.iter_mut().zip(&natives) {
        let b = blank.get(name).unwrap_or(0.0);
        let cf = factors.get(name);
        for cell in row.iter_mut() {
            *cell = match (*cell, cf) {
                (Some(v), Some(cf)) => finite((v - b) * cf),
                _ => None,
            };
        }
    }
    table
}

/// Divide each sample column by its extracted amount; negative results are
/// floored to zero, missing stays missing.
pub fn normalize_by_sample_mass(amounts: &Table, masses: &SampleMasses) -> Result<Table, CorrectionError> {
    let divisors = amounts
        .column_labels
        .iter()
        .map(|sample| match masses.get(sample) {
            Some(m) if m > 0.0 => Ok(m),
            Some(m) => Err(CorrectionError::InvalidSampleMass {
                sample: sample.clone(),
                mass: m,
            }),
            None => Err(CorrectionError::MissingSampleMass(sample.clone())),
        })
        .collect::<Result<Vec<f64>, _>>()?;

    let mut table = amounts.clone();
    for row in &mut table.values {
        for (cell, m) in row.iter_mut().zip(&divisors) {
            *cell = cell.and_then(|v| finite(v / m)).map(|v| v.max(0.0));
        }
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correction::panel::Native;
    use crate::data::model::INDEX_NAME;

    fn panel() -> CompoundPanel {
        CompoundPanel {
            natives: vec![
                Native {
                    name: "N1".into(),
                    aliases: vec![],
                    theoretical: Some(1.0),
                    pin_correction_factor: false,
                },
                Native {
                    name: "N2".into(),
                    aliases: vec![],
                    theoretical: Some(9.0),
                    pin_correction_factor: true,
                },
            ],
            ..CompoundPanel::pbde()
        }
    }

    fn concentration() -> Table {
        Table::new(
            INDEX_NAME,
            vec!["N1".into(), "N2".into()],
            vec![
                "Blank_1".into(),
                "Blank_2".into(),
                "AMAP_1".into(),
                "AMAP_2".into(),
                "S1".into(),
            ],
            vec![
                vec![Some(10.0), Some(30.0), Some(270.0), Some(770.0), Some(120.0)],
                vec![None, None, Some(5.0), Some(5.0), Some(8.0)],
            ],
        )
        .unwrap()
    }

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn blank_mean_per_native_with_zero_for_non_detects() {
        let blank = blank_means(&concentration(), &names(&["Blank_1", "Blank_2"]), &panel());
        assert_eq!(blank.get("N1"), Some(20.0));
        assert_eq!(blank.get("N2"), Some(0.0));
    }

    #[test]
    fn correction_factor_from_blank_corrected_qc() {
        let p = panel();
        let blank = blank_means(&concentration(), &names(&["Blank_1", "Blank_2"]), &p);
        let cf = correction_factors(&concentration(), &names(&["AMAP_1", "AMAP_2"]), &blank, &p)
            .unwrap();
        // (270 − 20) / 500 = 0.5, (770 − 20) / 500 = 1.5 → mean 1.0 → CF 1.0 / 1.0
        assert_eq!(cf.qc_corrected.get("N1", "AMAP_1"), Some(0.5));
        assert_eq!(cf.qc_mean.get("N1"), Some(1.0));
        assert_eq!(cf.factors.get("N1"), Some(1.0));
        assert_eq!(cf.factors.get("N2"), Some(1.0));
    }

    #[test]
    fn missing_qc_is_an_error_unless_everything_is_pinned() {
        let mut p = panel();
        let blank = blank_means(&concentration(), &[], &p);
        assert!(matches!(
            correction_factors(&concentration(), &[], &blank, &p),
            Err(CorrectionError::NoQcInjections(_))
        ));
        p.natives[0].pin_correction_factor = true;
        let cf = correction_factors(&concentration(), &[], &blank, &p).unwrap();
        assert_eq!(cf.factors.values, vec![Some(1.0), Some(1.0)]);
    }

    #[test]
    fn samples_are_blank_subtracted_and_scaled() {
        let p = panel();
        let blank = Series::new("blank_pg", names(&["N1", "N2"]), vec![Some(20.0), Some(10.0)]);
        let cf = Series::new("cf", names(&["N1", "N2"]), vec![Some(2.0), Some(1.0)]);
        let amounts = corrected_sample_amounts(&concentration(), &names(&["S1"]), &blank, &cf, &p);
        assert_eq!(amounts.get("N1", "S1"), Some(200.0));
        assert_eq!(amounts.get("N2", "S1"), Some(-2.0));
    }

    #[test]
    fn normalization_divides_and_floors_negatives() {
        let amounts = Table::new(
            "Concentration_ID",
            names(&["N1", "N2", "N3"]),
            names(&["S1"]),
            vec![vec![Some(200.0)], vec![Some(-2.0)], vec![None]],
        )
        .unwrap();
        let masses = SampleMasses::from_pairs(vec![("S1".to_string(), Some(4.0))]);
        let result = normalize_by_sample_mass(&amounts, &masses).unwrap();
        assert_eq!(result.column("S1").unwrap(), vec![Some(50.0), Some(0.0), None]);
    }

    #[test]
    fn normalization_requires_every_mass() {
        let amounts = Table::empty("Concentration_ID", names(&["N1"]), names(&["S1", "S2"]));
        let masses = SampleMasses::from_pairs(vec![
            ("S1".to_string(), Some(1.0)),
            ("S2".to_string(), None),
        ]);
        assert_eq!(
            normalize_by_sample_mass(&amounts, &masses),
            Err(CorrectionError::MissingSampleMass("S2".into()))
        );
        let zero = SampleMasses::from_pairs(vec![
            ("S1".to_string(), Some(1.0)),
            ("S2".to_string(), Some(0.0)),
        ]);
        assert!(matches!(
            normalize_by_sample_mass(&amounts, &zero),
            Err(CorrectionError::InvalidSampleMass { .. })
        ));
    }
}
