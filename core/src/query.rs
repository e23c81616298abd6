//! URL query string <-> [`ListingQuery`].
//!
//! Categorical filters are repeated keys (`city=Pune&city=Mumbai`), range
//! filters are `<field>Min` / `<field>Max`, pagination is `page` / `limit`.
//! Fields at their default are never written, so the default state has an
//! empty query string. The same encoding is sent to the listings API.

use serde::Serialize;
use std::collections::HashMap;
use url::form_urlencoded;

use crate::catalog::{Catalog, FieldKind};
use crate::facets::{Bounds, FacetSummary};
use crate::filters::FilterState;

pub const DEFAULT_LIMIT: u32 = 12;
pub const MAX_LIMIT: u32 = 100;
pub const RESULTS_PER_PAGE_OPTIONS: [u32; 3] = [12, 24, 48];

/// Everything the listing URL carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListingQuery {
    pub filters: FilterState,
    /// 1-based.
    pub page: u32,
    /// Only present when the URL names one; the API default applies otherwise.
    pub limit: Option<u32>,
    /// Keys this catalog does not own, passed through untouched.
    pub extra: Vec<(String, String)>,
}

impl Default for ListingQuery {
    fn default() -> Self {
        ListingQuery { filters: FilterState::default(), page: 1, limit: None, extra: Vec::new() }
    }
}

/// Lenient numeric bound: integers, or finite decimals truncated toward zero.
pub fn parse_bound(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if let Ok(v) = raw.parse::<i64>() {
        return Some(v);
    }
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => Some(v.trunc() as i64),
        _ => None,
    }
}

fn parse_page(raw: &str) -> u32 {
    match parse_bound(raw) {
        Some(p) if p >= 1 => u32::try_from(p).unwrap_or(u32::MAX),
        _ => 1,
    }
}

fn parse_limit(raw: &str) -> Option<u32> {
    parse_bound(raw).filter(|l| *l >= 1).map(|l| l.min(MAX_LIMIT as i64) as u32)
}

impl ListingQuery {
    /// Hydrate from a raw query string (without the leading `?`).
    ///
    /// Absent fields take their defaults. A malformed range endpoint falls
    /// back to the facet bound for that endpoint; the resulting pair is
    /// clamped into the facet range and re-ordered if inverted.
    pub fn hydrate(catalog: &Catalog, facets: &FacetSummary, raw: &str) -> Self {
        let pairs = form_urlencoded::parse(raw.trim_start_matches('?').as_bytes()).into_owned();
        Self::hydrate_pairs(catalog, facets, pairs)
    }

    pub fn hydrate_pairs<I>(catalog: &Catalog, facets: &FacetSummary, pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut query = ListingQuery::default();
        let mut categorical: HashMap<String, Vec<String>> = HashMap::new();
        let mut range_raw: HashMap<String, String> = HashMap::new();

        for (key, value) in pairs {
            match key.as_str() {
                "page" => query.page = parse_page(&value),
                "limit" => query.limit = parse_limit(&value),
                _ if catalog.owns_query_key(&key) => {
                    if catalog.get(&key).is_some_and(|f| !f.is_range()) {
                        categorical.entry(key).or_default().push(value);
                    } else {
                        range_raw.insert(key, value);
                    }
                }
                _ => query.extra.push((key, value)),
            }
        }

        for spec in catalog.fields {
            match spec.kind {
                FieldKind::Categorical { .. } => {
                    if let Some(values) = categorical.remove(spec.key) {
                        query.filters.set_selected(spec.key, values);
                    }
                }
                FieldKind::Range { .. } => {
                    let min_raw = range_raw.get(&spec.min_key());
                    let max_raw = range_raw.get(&spec.max_key());
                    if min_raw.is_none() && max_raw.is_none() {
                        continue;
                    }
                    let Some(full) = facets.bounds(catalog, spec.key) else { continue };
                    let min = min_raw.and_then(|v| parse_bound(v)).unwrap_or(full.min);
                    let max = max_raw.and_then(|v| parse_bound(v)).unwrap_or(full.max);
                    query.filters.set_range(catalog, facets, spec.key, Bounds::new(min, max));
                }
            }
        }
        query
    }

    /// Canonical query string, without the leading `?`.
    pub fn serialize(&self, catalog: &Catalog) -> String {
        let mut out = form_urlencoded::Serializer::new(String::new());
        for spec in catalog.fields {
            match spec.kind {
                FieldKind::Categorical { .. } => {
                    for v in self.filters.selected(spec.key) {
                        out.append_pair(spec.key, v);
                    }
                }
                FieldKind::Range { .. } => {
                    if let Some(b) = self.filters.range(spec.key) {
                        out.append_pair(&spec.min_key(), &b.min.to_string());
                        out.append_pair(&spec.max_key(), &b.max.to_string());
                    }
                }
            }
        }
        for (k, v) in &self.extra {
            out.append_pair(k, v);
        }
        if self.page > 1 {
            out.append_pair("page", &self.page.to_string());
        }
        if let Some(limit) = self.limit {
            out.append_pair("limit", &limit.to_string());
        }
        out.finish()
    }

    /// Results per page in effect.
    pub fn effective_limit(&self) -> u32 {
        self.limit.unwrap_or(DEFAULT_LIMIT)
    }

    /// Same query with new filters, back on page 1.
    pub fn with_filters(&self, filters: FilterState) -> Self {
        ListingQuery { filters, page: 1, ..self.clone() }
    }

    pub fn with_toggled(&self, key: &str, value: &str) -> Self {
        let mut filters = self.filters.clone();
        filters.toggle(key, value);
        self.with_filters(filters)
    }

    pub fn with_cleared_filters(&self) -> Self {
        self.with_filters(FilterState::default())
    }

    pub fn with_page(&self, page: u32) -> Self {
        ListingQuery { page: page.max(1), ..self.clone() }
    }

    pub fn with_limit(&self, limit: u32) -> Self {
        ListingQuery { limit: Some(limit.clamp(1, MAX_LIMIT)), page: 1, ..self.clone() }
    }
}

/// `path` plus `?query` when the query is non-empty.
pub fn href(path: &str, query: &str) -> String {
    if query.is_empty() { path.to_string() } else { format!("{path}?{query}") }
}
