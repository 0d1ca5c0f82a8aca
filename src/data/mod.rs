/// Data layer: core types, loading, and sample selection.
///
/// Architecture:
/// ```text
///  .csv / .tsv / .txt / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader  │  parse file (chosen separator) → Table
///   └──────────┘
///        │
///        ▼
///   ┌────────────────────────────────┐
///   │ model                          │  Table → SampleMetadata,
///   │                                │          ComparisonResult
///   └────────────────────────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter  │  selected groups → selected samples
///   └──────────┘
/// ```

pub mod loader;
pub mod model;
pub mod filter;
