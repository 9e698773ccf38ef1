/// Data layer: table types, fixed-width parsing, batch assembly and file IO.
///
/// Architecture:
/// ```text
///  <root>/<sample>/a-all.txt
///        │
///        ▼
///   ┌────────────┐
///   │ discovery   │  walk root → (sample, path) pairs
///   └────────────┘
///        │
///        ▼
///   ┌─────────────┐
///   │ fixed_width  │  cut fields at column offsets → SampleResult
///   └─────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  batch    │  (sample, metric) columns → concentration / response Table
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  export   │  .csv / .parquet / terminal rendering
///   └──────────┘
/// ```

pub mod batch;
pub mod discovery;
pub mod export;
pub mod filter;
pub mod fixed_width;
pub mod loader;
pub mod model;
