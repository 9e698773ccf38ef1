use crate::data::filter::filtered_indices;

use super::panel::CompoundPanel;

/// Injections sorted by role, each list in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SampleGroups {
    /// Every injection, as given.
    pub all: Vec<String>,
    pub calibration: Vec<String>,
    pub qc: Vec<String>,
    pub blanks: Vec<String>,
    pub samples: Vec<String>,
}

impl SampleGroups {
    /// Classify by label. A label matching several markers takes the first
    /// of calibration, QC, blank.
    pub fn classify(labels: &[String], panel: &CompoundPanel) -> Self {
        let calibration = filtered_indices(labels, &panel.calibration_filter());
        let qc = filtered_indices(labels, &panel.qc_filter());
        let blanks = filtered_indices(labels, &panel.blank_filter());

        let mut groups = SampleGroups {
            all: labels.to_vec(),
            ..SampleGroups::default()
        };
        for (i, label) in labels.iter().enumerate() {
            let bucket = if calibration.contains(&i) {
                &mut groups.calibration
            } else if qc.contains(&i) {
                &mut groups.qc
            } else if blanks.contains(&i) {
                &mut groups.blanks
            } else {
                &mut groups.samples
            };
            bucket.push(label.clone());
        }
        groups
    }

    /// Everything that went through extraction, i.e. not a calibration injection.
    pub fn extracted(&self) -> Vec<String> {
        self.all
            .iter()
            .filter(|l| !self.calibration.contains(l))
            .cloned()
            .collect()
    }
}
