//! Facet summaries reported by the listings API.
//!
//! The API is loose about shape: categorical facets arrive either as bare
//! strings or as `{value, count}` objects, range facets as `{min, max}` with
//! integer or float bounds. Everything is resolved into [`Facet`] here so the
//! rest of the crate never branches on wire shape.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::catalog::{Catalog, FieldKind};

/// Closed numeric interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Bounds {
    pub min: i64,
    pub max: i64,
}

impl Bounds {
    /// Orders the endpoints so that `min <= max`.
    pub fn new(a: i64, b: i64) -> Self {
        if a <= b { Bounds { min: a, max: b } } else { Bounds { min: b, max: a } }
    }

    pub fn clamp(&self, v: i64) -> i64 {
        v.clamp(self.min, self.max)
    }

    /// Clamp both endpoints of `other` into `self`.
    pub fn clamp_bounds(&self, other: Bounds) -> Bounds {
        Bounds::new(self.clamp(other.min), self.clamp(other.max))
    }

    pub fn contains(&self, other: &Bounds) -> bool {
        self.min <= other.min && other.min <= other.max && other.max <= self.max
    }
}

/// One selectable categorical value with its result count, when known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetValue {
    pub value: String,
    pub count: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Facet {
    Categorical { values: Vec<FacetValue> },
    Range { bounds: Bounds },
}

/// Externally supplied facet data, keyed by field. Read-only for sessions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FacetSummary {
    pub fields: BTreeMap<String, Facet>,
}

// Wire shapes, resolved once in `FacetSummary::from_wire`.
#[derive(Deserialize)]
#[serde(untagged)]
enum WireFacet {
    Values(Vec<WireValue>),
    Range { min: f64, max: f64 },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireValue {
    Bare(String),
    Counted { value: String, count: Option<u64> },
}

impl FacetSummary {
    /// Resolve the API `facets` object. Fields with an unrecognized shape are
    /// skipped.
    pub fn from_wire(value: &serde_json::Value) -> Self {
        let mut fields = BTreeMap::new();
        let Some(obj) = value.as_object() else {
            return Self::default();
        };
        for (key, raw) in obj {
            match serde_json::from_value::<WireFacet>(raw.clone()) {
                Ok(WireFacet::Values(values)) => {
                    let values = values
                        .into_iter()
                        .map(|v| match v {
                            WireValue::Bare(value) => FacetValue { value, count: None },
                            WireValue::Counted { value, count } => FacetValue { value, count },
                        })
                        .collect();
                    fields.insert(key.clone(), Facet::Categorical { values });
                }
                Ok(WireFacet::Range { min, max }) if min.is_finite() && max.is_finite() => {
                    let bounds = Bounds::new(min.floor() as i64, max.ceil() as i64);
                    fields.insert(key.clone(), Facet::Range { bounds });
                }
                _ => tracing::debug!(field = %key, "skipping facet with unrecognized shape"),
            }
        }
        FacetSummary { fields }
    }

    pub fn get(&self, key: &str) -> Option<&Facet> {
        self.fields.get(key)
    }

    pub fn values(&self, key: &str) -> &[FacetValue] {
        match self.fields.get(key) {
            Some(Facet::Categorical { values }) => values,
            _ => &[],
        }
    }

    /// Full bounds of a range field: the reported facet range, or the
    /// catalog fallback when the API does not report it.
    pub fn bounds(&self, catalog: &Catalog, key: &str) -> Option<Bounds> {
        let spec = catalog.get(key)?;
        let FieldKind::Range { fallback, .. } = spec.kind else {
            return None;
        };
        match self.fields.get(key) {
            Some(Facet::Range { bounds }) => Some(*bounds),
            _ => Some(fallback),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::PROPERTY_CATALOG;
    use serde_json::json;

    #[test]
    fn resolves_mixed_value_shapes() {
        let raw = json!({
            "propertyType": [{"value": "APARTMENT", "count": 10}, "HOUSE"],
            "priceMin": {"min": 1500.4, "max": 90000.2},
            "weird": 7
        });
        let facets = FacetSummary::from_wire(&raw);
        assert_eq!(
            facets.values("propertyType"),
            &[
                FacetValue { value: "APARTMENT".into(), count: Some(10) },
                FacetValue { value: "HOUSE".into(), count: None },
            ]
        );
        assert_eq!(facets.bounds(&PROPERTY_CATALOG, "priceMin"), Some(Bounds { min: 1500, max: 90001 }));
        assert!(facets.get("weird").is_none());
    }

    #[test]
    fn falls_back_to_catalog_bounds() {
        let facets = FacetSummary::default();
        assert_eq!(facets.bounds(&PROPERTY_CATALOG, "totalArea"), Some(Bounds { min: 0, max: 10_000 }));
        assert_eq!(facets.bounds(&PROPERTY_CATALOG, "propertyType"), None);
    }

    #[test]
    fn clamp_bounds_keeps_order() {
        let full = Bounds { min: 0, max: 100 };
        assert_eq!(full.clamp_bounds(Bounds { min: -5, max: 500 }), full);
        assert_eq!(full.clamp_bounds(Bounds { min: 80, max: 20 }), Bounds { min: 20, max: 80 });
    }
}
