/// Analysis layer: DE aggregation, PCA and volcano classification.
///
/// ```text
///  SampleMetadata + Vec<ComparisonResult>
///        │
///        ▼
///   ┌───────────┐
///   │ aggregate │  union counts → CPM, infer groups → DeDataset
///   └───────────┘
///        │
///        ├──────────────┐
///        ▼              ▼
///   ┌─────────┐   ┌──────────┐
///   │   pca   │   │ volcano  │  one comparison + cutoffs → points
///   └─────────┘   └──────────┘
/// ```

pub mod aggregate;
pub mod pca;
pub mod volcano;
