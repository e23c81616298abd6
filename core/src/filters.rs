use serde::Serialize;
use std::collections::BTreeMap;

use crate::catalog::{Catalog, FieldKind};
use crate::facets::{Bounds, FacetSummary};
use crate::format::{facet_label, format_range};

/// Current filter selection of a listing session.
///
/// Categorical fields hold the selected values as a sorted set, so the same
/// selection always serializes to the same URL; a field with nothing
/// selected is absent. Range fields are
/// stored only when narrower than the full facet range, so "absent" always
/// means "everything".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterState {
    categorical: BTreeMap<String, Vec<String>>,
    ranges: BTreeMap<String, Bounds>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleIntent {
    Add,
    Remove,
}

/// What toggling `value` would do given the current selection.
pub fn toggle_intent(selected: &[String], value: &str) -> ToggleIntent {
    if selected.iter().any(|v| v == value) { ToggleIntent::Remove } else { ToggleIntent::Add }
}

/// One entry of the "Active Filters" strip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActiveFilter {
    pub key: &'static str,
    pub label: &'static str,
    pub text: String,
}

impl FilterState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected(&self, key: &str) -> &[String] {
        self.categorical.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_selected(&self, key: &str, value: &str) -> bool {
        self.selected(key).iter().any(|v| v == value)
    }

    pub fn selections(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.categorical.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Add `value` if absent, remove it if present.
    pub fn toggle(&mut self, key: &str, value: &str) -> ToggleIntent {
        let intent = toggle_intent(self.selected(key), value);
        match intent {
            ToggleIntent::Add => {
                let values = self.categorical.entry(key.to_string()).or_default();
                let at = values.partition_point(|v| v.as_str() < value);
                values.insert(at, value.to_string());
            }
            ToggleIntent::Remove => {
                if let Some(values) = self.categorical.get_mut(key) {
                    values.retain(|v| v != value);
                    if values.is_empty() {
                        self.categorical.remove(key);
                    }
                }
            }
        }
        intent
    }

    /// Replace the selection of `key`, dropping duplicates and empty strings.
    pub fn set_selected<I, S>(&mut self, key: &str, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut out: Vec<String> = values.into_iter().map(Into::into).filter(|v| !v.is_empty()).collect();
        out.sort();
        out.dedup();
        if out.is_empty() {
            self.categorical.remove(key);
        } else {
            self.categorical.insert(key.to_string(), out);
        }
    }

    /// Explicit range selection, `None` meaning the full facet range.
    pub fn range(&self, key: &str) -> Option<Bounds> {
        self.ranges.get(key).copied()
    }

    pub fn explicit_ranges(&self) -> impl Iterator<Item = (&str, Bounds)> {
        self.ranges.iter().map(|(k, b)| (k.as_str(), *b))
    }

    /// Range in effect for `key`: the explicit selection or the full bounds.
    pub fn effective_range(&self, catalog: &Catalog, facets: &FacetSummary, key: &str) -> Option<Bounds> {
        let full = facets.bounds(catalog, key)?;
        Some(self.range(key).unwrap_or(full))
    }

    /// Set a range, clamped into the full bounds. A selection equal to the
    /// full bounds is stored as "no selection". Returns the range now in
    /// effect, or `None` when `key` is not a range field of `catalog`.
    pub fn set_range(
        &mut self,
        catalog: &Catalog,
        facets: &FacetSummary,
        key: &str,
        requested: Bounds,
    ) -> Option<Bounds> {
        let full = facets.bounds(catalog, key)?;
        let clamped = full.clamp_bounds(requested);
        if clamped == full {
            self.ranges.remove(key);
        } else {
            self.ranges.insert(key.to_string(), clamped);
        }
        Some(clamped)
    }

    /// Drop the selection of one field, categorical or range.
    pub fn clear_field(&mut self, key: &str) {
        self.categorical.remove(key);
        self.ranges.remove(key);
    }

    pub fn clear(&mut self) {
        self.categorical.clear();
        self.ranges.clear();
    }

    pub fn is_default(&self) -> bool {
        self.categorical.is_empty() && self.ranges.is_empty()
    }

    /// Chips for every non-default field, in catalog order.
    pub fn active_filters(&self, catalog: &Catalog, facets: &FacetSummary) -> Vec<ActiveFilter> {
        let mut out = Vec::new();
        for spec in catalog.fields {
            match spec.kind {
                FieldKind::Categorical { chip_label } => {
                    let selected = self.selected(spec.key);
                    if !selected.is_empty() {
                        let text = selected.iter().map(|v| facet_label(v)).collect::<Vec<_>>().join(", ");
                        out.push(ActiveFilter { key: spec.key, label: chip_label, text });
                    }
                }
                FieldKind::Range { unit, chip_label, .. } => {
                    if let Some(b) = self.range(spec.key) {
                        if facets.bounds(catalog, spec.key).is_some() {
                            let text = format_range(unit, b.min, b.max);
                            out.push(ActiveFilter { key: spec.key, label: chip_label, text });
                        }
                    }
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CREATOR_CATALOG, PROPERTY_CATALOG};

    #[test]
    fn double_toggle_restores_selection() {
        let mut f = FilterState::new();
        f.toggle("city", "Pune");
        let before = f.clone();
        assert_eq!(f.toggle("city", "Mumbai"), ToggleIntent::Add);
        assert_eq!(f.toggle("city", "Mumbai"), ToggleIntent::Remove);
        assert_eq!(f, before);
    }

    #[test]
    fn clear_field_leaves_other_fields() {
        let mut f = FilterState::new();
        f.toggle("city", "Pune");
        f.toggle("propertyType", "PLOT");
        f.clear_field("city");
        assert!(f.selected("city").is_empty());
        assert_eq!(f.selected("propertyType"), ["PLOT".to_string()]);
    }

    #[test]
    fn empty_selection_is_dropped() {
        let mut f = FilterState::new();
        f.toggle("city", "Pune");
        f.toggle("city", "Pune");
        assert!(f.is_default());
        f.set_selected("city", ["", "Pune", "Pune"]);
        assert_eq!(f.selected("city"), &["Pune".to_string()]);
    }

    #[test]
    fn full_range_is_not_stored() {
        let facets = FacetSummary::default();
        let mut f = FilterState::new();
        let got = f.set_range(&PROPERTY_CATALOG, &facets, "totalArea", Bounds { min: -10, max: 50_000 });
        assert_eq!(got, Some(Bounds { min: 0, max: 10_000 }));
        assert!(f.is_default());
        assert_eq!(f.set_range(&PROPERTY_CATALOG, &facets, "city", Bounds { min: 0, max: 1 }), None);
    }

    #[test]
    fn toggling_back_restores_the_same_order() {
        let mut f = FilterState::new();
        f.set_selected("propertyType", ["PLOT", "APARTMENT", "HOUSE"]);
        assert_eq!(f.selected("propertyType"), ["APARTMENT", "HOUSE", "PLOT"].map(String::from));
        let before = f.clone();
        f.toggle("propertyType", "APARTMENT");
        f.toggle("propertyType", "APARTMENT");
        assert_eq!(f, before);
    }

    #[test]
    fn chips_follow_catalog_order() {
        let facets = FacetSummary::default();
        let mut f = FilterState::new();
        f.set_range(&CREATOR_CATALOG, &facets, "instagramFollowers", Bounds { min: 1_000, max: 5_000 });
        f.toggle("mainAdvertizingPlatforms", "instagram");
        let chips = f.active_filters(&CREATOR_CATALOG, &facets);
        assert_eq!(chips.len(), 2);
        assert_eq!(chips[0].text, "Instagram");
        assert_eq!(chips[1].text, "1,000 - 5,000 followers");
    }
}
