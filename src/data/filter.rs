use std::collections::BTreeSet;

use super::model::{MetadataValue, SampleMetadata};

// ---------------------------------------------------------------------------
// Group filter: which metadata values are selected
// ---------------------------------------------------------------------------

/// Selected group values. Values from every annotation column share one set.
pub type GroupSelection = BTreeSet<MetadataValue>;

/// Return the `available` samples that belong to a selected group, in order.
///
/// A sample belongs when any of its annotation cells is in `groups`, so an
/// empty selection selects nothing. Samples without a metadata row never pass.
pub fn selected_samples(
    metadata: &SampleMetadata,
    groups: &GroupSelection,
    available: &[String],
) -> Vec<String> {
    available
        .iter()
        .filter(|sample| match metadata.position(sample) {
            Some(i) => metadata.annotations[i]
                .values()
                .any(|v| groups.contains(v)),
            None => false,
        })
        .cloned()
        .collect()
}
