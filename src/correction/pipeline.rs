use log::{debug, info};

use crate::data::model::{ResultTables, Series, Table};

use super::factors::{blank_means, correction_factors, corrected_sample_amounts, normalize_by_sample_mass};
use super::groups::SampleGroups;
use super::masses::SampleMasses;
use super::panel::CompoundPanel;
use super::recovery::{average_rrf, recoveries, relative_response_factors};
use super::CorrectionError;

/// Every intermediate and final table of one correction run.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrectionReport {
    pub groups: SampleGroups,
    /// Peak areas of the internal and recovery standards, every injection.
    pub standard_areas: Table,
    /// Peak areas of the natives, every injection.
    pub native_areas: Table,
    /// Internal standards × calibration injections.
    pub rrf: Table,
    pub average_rrf: Series,
    /// Internal standards × extracted injections, pg.
    pub extracted: Table,
    /// Internal standards × extracted injections, %.
    pub recovery: Table,
    pub blank: Series,
    pub qc_corrected: Table,
    pub qc_mean: Series,
    pub correction_factors: Series,
    /// Natives × real samples, blank-subtracted and QC-corrected, pg.
    pub corrected_pg: Table,
    /// `corrected_pg` per unit of sample; only present when masses were given.
    pub final_concentration: Option<Table>,
}

/// Runs the correction chain for one batch against a compound panel.
pub struct CorrectionPipeline<'a> {
    panel: &'a CompoundPanel,
}

impl<'a> CorrectionPipeline<'a> {
    pub fn new(panel: &'a CompoundPanel) -> Self {
        CorrectionPipeline { panel }
    }

    /// Classify the injections of `tables` without running any correction.
    pub fn classify(&self, tables: &ResultTables) -> SampleGroups {
        SampleGroups::classify(&tables.concentration.column_labels, self.panel)
    }

    /// Run every step. Without `masses` the chain stops at the corrected
    /// amounts and `final_concentration` is `None`.
    pub fn run(
        &self,
        tables: &ResultTables,
        masses: Option<&SampleMasses>,
    ) -> Result<CorrectionReport, CorrectionError> {
        let panel = self.panel;
        panel.validate()?;

        let concentration = panel.align_rows(&tables.concentration);
        let response = panel.align_rows(&tables.response);
        let groups = self.classify(tables);
        info!(
            "{} injections: {} calibration, {} QC, {} blank, {} samples",
            groups.all.len(),
            groups.calibration.len(),
            groups.qc.len(),
            groups.blanks.len(),
            groups.samples.len()
        );

        let rrf = relative_response_factors(&response, &groups.calibration, panel)?;
        let average_rrf = average_rrf(&rrf);
        debug!("average RRF: {:?}", average_rrf.values);

        let recovered = recoveries(&response, &groups.extracted(), &average_rrf, panel)?;

        let blank = blank_means(&concentration, &groups.blanks, panel);
        let cf = correction_factors(&concentration, &groups.qc, &blank, panel)?;
        debug!("correction factors: {:?}", cf.factors.values);

        let corrected_pg =
            corrected_sample_amounts(&concentration, &groups.samples, &blank, &cf.factors, panel);

        let mut standards = panel.internal_standard_names();
        standards.push(panel.recovery_standard.name.clone());
        let standard_areas = response.reindex_rows(&standards);
        let native_areas = response.reindex_rows(&panel.native_names());

        let final_concentration = masses
            .map(|m| normalize_by_sample_mass(&corrected_pg, m))
            .transpose()?;

        Ok(CorrectionReport {
            groups,
            standard_areas,
            native_areas,
            rrf,
            average_rrf,
            extracted: recovered.extracted,
            recovery: recovered.recovery,
            blank,
            qc_corrected: cf.qc_corrected,
            qc_mean: cf.qc_mean,
            correction_factors: cf.factors,
            corrected_pg,
            final_concentration,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correction::panel::{InternalStandard, Native, RecoveryStandard};
    use crate::data::model::INDEX_NAME;

    fn panel() -> CompoundPanel {
        CompoundPanel {
            internal_standards: vec![InternalStandard {
                name: "IS".into(),
                aliases: vec![],
                spiked_mass: 5000.0,
                recovery_nominal: None,
            }],
            recovery_standard: RecoveryStandard {
                name: "RS".into(),
                aliases: vec![],
                spiked_mass: 2500.0,
            },
            natives: vec![Native {
                name: "N".into(),
                aliases: vec!["N-1".into()],
                theoretical: Some(2.0),
                pin_correction_factor: false,
            }],
            ..CompoundPanel::pbde()
        }
    }

    fn labels(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn tables() -> ResultTables {
        let columns = labels(&["IS-RS_1", "Blank_1", "AMAP_1", "S1", "S2"]);
        let response = Table::new(
            INDEX_NAME,
            labels(&["IS", "RS", "N-1"]),
            columns.clone(),
            vec![
                vec![Some(2000.0), Some(1000.0), Some(1000.0), Some(500.0), Some(1000.0)],
                vec![Some(1000.0), Some(1000.0), Some(1000.0), Some(1000.0), Some(1000.0)],
                vec![None, Some(1.0), Some(1.0), Some(1.0), Some(1.0)],
            ],
        )
        .unwrap();
        let concentration = Table::new(
            INDEX_NAME,
            labels(&["IS", "RS", "N-1"]),
            columns,
            vec![
                vec![Some(5000.0); 5],
                vec![Some(2500.0); 5],
                vec![None, Some(100.0), Some(600.0), Some(300.0), Some(50.0)],
            ],
        )
        .unwrap();
        ResultTables {
            concentration,
            response,
        }
    }

    #[test]
    fn full_chain_with_masses() {
        let p = panel();
        let masses = SampleMasses::from_pairs(vec![
            ("S1".to_string(), Some(2.0)),
            ("S2".to_string(), Some(1.0)),
        ]);
        let report = CorrectionPipeline::new(&p).run(&tables(), Some(&masses)).unwrap();

        assert_eq!(report.groups.samples, vec!["S1", "S2"]);
        // RRF = (2000 · 2500) / (1000 · 5000) = 1
        assert_eq!(report.average_rrf.get("IS"), Some(1.0));
        // S1: (500 · 2500) / (1000 · 1) = 1250 pg → 25 %
        assert_eq!(report.recovery.get("IS", "S1"), Some(25.0));
        assert_eq!(report.recovery.column_labels, labels(&["Blank_1", "AMAP_1", "S1", "S2"]));
        // QC: (600 − 100) / 500 = 1.0 → CF = 2.0
        assert_eq!(report.correction_factors.get("N"), Some(2.0));
        // S1: (300 − 100) · 2 = 400 pg, S2: (50 − 100) · 2 = −100 pg
        assert_eq!(report.corrected_pg.get("N", "S1"), Some(400.0));
        assert_eq!(report.corrected_pg.get("N", "S2"), Some(-100.0));

        let final_conc = report.final_concentration.unwrap();
        assert_eq!(final_conc.get("N", "S1"), Some(200.0));
        assert_eq!(final_conc.get("N", "S2"), Some(0.0));
    }

    #[test]
    fn without_masses_stops_before_normalization() {
        let p = panel();
        let report = CorrectionPipeline::new(&p).run(&tables(), None).unwrap();
        assert!(report.final_concentration.is_none());
        assert_eq!(report.corrected_pg.shape(), (1, 2));
    }

    #[test]
    fn area_tables_cover_every_injection() {
        let p = panel();
        let report = CorrectionPipeline::new(&p).run(&tables(), None).unwrap();
        assert_eq!(report.standard_areas.row_labels, labels(&["IS", "RS"]));
        assert_eq!(report.standard_areas.shape(), (2, 5));
        assert_eq!(report.native_areas.row_labels, labels(&["N"]));
        assert_eq!(report.native_areas.get("N", "AMAP_1"), Some(1.0));
    }

    #[test]
    fn zero_areas_and_zero_qc_mean_become_missing() {
        let p = panel();
        let mut t = tables();
        // RS not detected in S1, QC equal to the blank.
        t.response.values[1][3] = Some(0.0);
        t.concentration.values[2][2] = Some(100.0);
        let report = CorrectionPipeline::new(&p).run(&t, None).unwrap();

        assert_eq!(report.extracted.get("IS", "S1"), None);
        assert_eq!(report.recovery.get("IS", "S1"), None);
        // S2: (1000 · 2500) / (1000 · 1) = 2500 pg → 50 %
        assert_eq!(report.recovery.get("IS", "S2"), Some(50.0));
        assert_eq!(report.qc_mean.get("N"), Some(0.0));
        assert_eq!(report.correction_factors.get("N"), None);
        assert_eq!(report.corrected_pg.get("N", "S1"), None);

        let dir = tempfile::tempdir().unwrap();
        let charts = crate::report::render_report(&report, dir.path()).unwrap();
        assert!(charts.iter().any(|c| c.ends_with("recovery.svg")));
        assert!(!charts.iter().any(|c| c.ends_with("correction_factors.svg")));
    }

    #[test]
    fn invalid_panel_is_rejected_before_any_step() {
        let mut p = panel();
        p.internal_standards.clear();
        assert!(matches!(
            CorrectionPipeline::new(&p).run(&tables(), None),
            Err(CorrectionError::Panel(_))
        ));
    }
}
