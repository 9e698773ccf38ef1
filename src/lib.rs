//! Gas chromatography batch processing.
//!
//! `data` turns a folder of per-sample result files into concentration and
//! response tables; `correction` turns those tables (or a vendor export) into
//! recovery-, blank- and QC-corrected concentrations.

pub mod color;
pub mod correction;
pub mod data;
pub mod report;
pub mod stats;
