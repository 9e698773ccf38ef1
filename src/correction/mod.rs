//! Correction chain from raw instrument tables to final concentrations.
//!
//! ```text
//!  vendor CSV ──► vendor::assemble ─┐
//!                                   ├─► ResultTables ──► pipeline::CorrectionPipeline
//!  concentration/response tables ───┘                      │
//!                                                          ├─ groups    calibration / QC / blank / sample
//!                                                          ├─ recovery  RRFs, extracted IS, % recovery
//!                                                          ├─ factors   blank means, QC correction factors
//!                                                          └─ masses    per-sample amount normalisation
//! ```

use thiserror::Error;

pub mod factors;
pub mod groups;
pub mod masses;
pub mod panel;
pub mod pipeline;
pub mod recovery;
pub mod vendor;

pub use panel::{CompoundPanel, PanelError};
pub use pipeline::{CorrectionPipeline, CorrectionReport};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CorrectionError {
    #[error(transparent)]
    Panel(#[from] PanelError),
    #[error("compound '{0}' is missing from the input table")]
    MissingCompound(String),
    #[error("no calibration injections (labels containing '{0}')")]
    NoCalibrationInjections(String),
    #[error("no QC injections (labels containing '{0}')")]
    NoQcInjections(String),
    #[error("no extracted amount given for sample '{0}'")]
    MissingSampleMass(String),
    #[error("sample '{sample}' has a non-positive extracted amount ({mass})")]
    InvalidSampleMass { sample: String, mass: f64 },
}
