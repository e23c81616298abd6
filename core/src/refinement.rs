use serde::Serialize;

use crate::facets::FacetValue;
use crate::format::facet_label;

/// One checkbox row of a categorical filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterOption {
    pub value: String,
    pub label: String,
    pub count: Option<u64>,
    pub checked: bool,
}

/// Rows for a categorical facet. Selected values the facet no longer reports
/// are appended (unchecking them must stay possible).
pub fn categorical_options(values: &[FacetValue], selected: &[String]) -> Vec<FilterOption> {
    let mut out: Vec<FilterOption> = values
        .iter()
        .map(|fv| FilterOption {
            value: fv.value.clone(),
            label: facet_label(&fv.value),
            count: fv.count,
            checked: selected.contains(&fv.value),
        })
        .collect();
    for s in selected {
        if !values.iter().any(|fv| &fv.value == s) {
            out.push(FilterOption { value: s.clone(), label: facet_label(s), count: None, checked: true });
        }
    }
    out
}
