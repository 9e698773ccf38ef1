// ---------------------------------------------------------------------------
// Label predicates: which sample columns belong to a group
// ---------------------------------------------------------------------------

/// Substring match on a column label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelFilter {
    Contains(String),
    ContainsIgnoreCase(String),
}

impl LabelFilter {
    pub fn matches(&self, label: &str) -> bool {
        match self {
            LabelFilter::Contains(needle) => label.contains(needle.as_str()),
            LabelFilter::ContainsIgnoreCase(needle) => label
                .to_lowercase()
                .contains(&needle.to_lowercase()),
        }
    }
}

/// Return indices of labels that pass `filter`.
///
/// An empty needle matches nothing, so an unset marker never swallows every
/// sample.
pub fn filtered_indices(labels: &[String], filter: &LabelFilter) -> Vec<usize> {
    labels
        .iter()
        .enumerate()
        .filter(|(_, label)| match filter {
            LabelFilter::Contains(n) | LabelFilter::ContainsIgnoreCase(n) if n.is_empty() => false,
            _ => filter.matches(label),
        })
        .map(|(i, _)| i)
        .collect()
}
