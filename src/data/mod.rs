/// Data layer: sheet loading, shape validation, typed table, index split.
///
/// Architecture:
/// ```text
///  .csv / .tsv / .txt
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → RawSheet
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │ validate  │  ≥ 2 columns, else reject
///   └──────────┘
///        │
///        ▼
///   ┌──────────────┐
///   │ PanelDataset  │  typed columns + index → year / month / region
///   └──────────────┘
/// ```

pub mod index;
pub mod loader;
pub mod model;
pub mod validate;
