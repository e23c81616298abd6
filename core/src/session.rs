//! Filter-state synchronizer for one listing page.
//!
//! The committed [`ListingQuery`] mirrors the URL and is the source of truth.
//! The in-memory [`FilterState`] runs ahead of it only while a range edit is
//! waiting out the debounce window. Every operation returns the [`Effect`]s
//! the host has to carry out; nothing here touches the clock, the network or
//! the router.

use std::time::Duration;
use tokio::time::Instant;

use crate::catalog::{Catalog, FieldKind};
use crate::client::FetchError;
use crate::facets::Bounds;
use crate::filters::{ActiveFilter, FilterState};
use crate::model::{ListingKind, ResultPage};
use crate::query::ListingQuery;
use crate::range_input::RangeInput;
use crate::refinement::{categorical_options, FilterOption};

/// Quiet period after the last range edit before it is committed.
pub const RANGE_DEBOUNCE: Duration = Duration::from_millis(500);

/// Fetch sequence number. Only the latest issued one may be applied.
pub type Seq = u64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Shallow navigation to this query string (no full page reload).
    PushUrl(String),
    Fetch { seq: Seq, query: String },
    ArmDebounce(Instant),
    CancelDebounce,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Replaced,
    /// A newer fetch was issued after this one; the response was dropped.
    Stale,
    /// The fetch failed; previous results stay on screen.
    Failed,
}

pub struct FilterSession {
    kind: ListingKind,
    query: ListingQuery,
    filters: FilterState,
    results: ResultPage,
    deadline: Option<Instant>,
    next_seq: Seq,
    awaiting: Option<Seq>,
    hydrated: bool,
    /// False until a page with facets has been seen; hydrating before that
    /// could only clamp against the catalog fallbacks.
    facets_known: bool,
    /// URL query sent verbatim while facets were unknown, re-hydrated once
    /// its response brings them.
    unresolved: Option<String>,
}

impl FilterSession {
    /// New session showing `initial` (typically the server-rendered page).
    pub fn new(kind: ListingKind, initial: ResultPage) -> Self {
        let facets_known = !initial.facets.fields.is_empty();
        FilterSession {
            kind,
            query: ListingQuery::default(),
            filters: FilterState::default(),
            results: initial,
            deadline: None,
            next_seq: 1,
            awaiting: None,
            hydrated: false,
            facets_known,
            unresolved: None,
        }
    }

    fn catalog(&self) -> &'static Catalog {
        self.kind.catalog()
    }

    pub fn kind(&self) -> ListingKind {
        self.kind
    }

    pub fn query(&self) -> &ListingQuery {
        &self.query
    }

    /// In-memory filters, including a range edit still inside the window.
    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    pub fn results(&self) -> &ResultPage {
        &self.results
    }

    pub fn current_url_query(&self) -> String {
        self.query.serialize(self.catalog())
    }

    pub fn is_loading(&self) -> bool {
        self.awaiting.is_some()
    }

    pub fn pending_deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn active_filters(&self) -> Vec<ActiveFilter> {
        self.filters.active_filters(self.catalog(), &self.results.facets)
    }

    pub fn has_active_filters(&self) -> bool {
        !self.filters.is_default()
    }

    /// Checkbox rows for a categorical field.
    pub fn options(&self, key: &str) -> Vec<FilterOption> {
        categorical_options(self.results.facets.values(key), self.filters.selected(key))
    }

    /// Slider model for a range field, positioned at the in-memory value.
    pub fn range_input(&self, key: &str) -> Option<RangeInput> {
        let spec = self.catalog().get(key)?;
        let FieldKind::Range { unit, .. } = spec.kind else { return None };
        let full = self.results.facets.bounds(self.catalog(), key)?;
        let value = self.filters.range(key).unwrap_or(full);
        Some(RangeInput::new(full, value, unit))
    }

    /// Navigation-ready or external navigation: re-derive everything from the
    /// URL. Fetches when the resolved query changed (always on the first call).
    ///
    /// Before any facets are known the raw query is forwarded as is, and the
    /// state is hydrated again against the facets of that response.
    pub fn hydrate(&mut self, raw_query: &str) -> Vec<Effect> {
        let raw_query = raw_query.trim_start_matches('?');
        let next = ListingQuery::hydrate(self.catalog(), &self.results.facets, raw_query);
        let mut effects = self.cancel_debounce();
        let changed = next.serialize(self.catalog()) != self.current_url_query();
        self.filters = next.filters.clone();
        self.query = next;
        if self.facets_known {
            self.unresolved = None;
            if changed || !self.hydrated {
                self.hydrated = true;
                effects.push(self.begin_fetch());
            }
        } else if changed || !self.hydrated || self.unresolved.as_deref() != Some(raw_query) {
            self.hydrated = true;
            self.unresolved = Some(raw_query.to_string());
            effects.push(self.begin_fetch_for(raw_query.to_string()));
        }
        effects
    }

    /// Add or remove a categorical value; written to the URL immediately.
    /// A range edit still inside its window is committed along with it.
    pub fn toggle(&mut self, key: &str, value: &str) -> Vec<Effect> {
        if !self.catalog().get(key).is_some_and(|f| !f.is_range()) {
            tracing::debug!(field = key, "toggle on unknown categorical field ignored");
            return Vec::new();
        }
        let mut filters = self.filters.clone();
        filters.toggle(key, value);
        self.commit_filters(filters)
    }

    /// Range edit: in-memory only until `RANGE_DEBOUNCE` passes without
    /// another edit.
    pub fn set_range(&mut self, key: &str, requested: Bounds, now: Instant) -> Vec<Effect> {
        let catalog = self.catalog();
        if self.filters.set_range(catalog, &self.results.facets, key, requested).is_none() {
            tracing::debug!(field = key, "range edit on unknown range field ignored");
            return Vec::new();
        }
        let deadline = now + RANGE_DEBOUNCE;
        self.deadline = Some(deadline);
        vec![Effect::ArmDebounce(deadline)]
    }

    /// Timer callback. Commits the pending range state if the window has
    /// passed and it differs from what was last committed.
    pub fn debounce_elapsed(&mut self, now: Instant) -> Vec<Effect> {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                if self.filters == self.query.filters {
                    return Vec::new();
                }
                self.commit_filters(self.filters.clone())
            }
            _ => Vec::new(),
        }
    }

    pub fn clear_all(&mut self) -> Vec<Effect> {
        self.commit_filters(FilterState::default())
    }

    /// Pagination moves keep a pending range edit pending.
    pub fn set_page(&mut self, page: u32) -> Vec<Effect> {
        let next = self.query.with_page(page);
        self.navigate(next)
    }

    pub fn set_limit(&mut self, limit: u32) -> Vec<Effect> {
        let next = self.query.with_limit(limit);
        self.navigate(next)
    }

    /// Apply a fetch completion. Only the latest issued fetch is applied;
    /// failures are logged and leave the previous results in place.
    pub fn apply_response(&mut self, seq: Seq, result: Result<ResultPage, FetchError>) -> Applied {
        if self.awaiting != Some(seq) {
            tracing::debug!(seq, latest = ?self.awaiting, "discarding stale listing response");
            return Applied::Stale;
        }
        self.awaiting = None;
        match result {
            Ok(page) => {
                self.results = page;
                if !self.results.facets.fields.is_empty() {
                    self.facets_known = true;
                }
                if let Some(raw) = self.unresolved.take() {
                    self.query = ListingQuery::hydrate(self.catalog(), &self.results.facets, &raw);
                }
                // committed ranges are kept even when the new facets are
                // narrower; they only describe the current result set
                if self.deadline.is_none() {
                    self.filters = self.query.filters.clone();
                }
                Applied::Replaced
            }
            Err(e) => {
                tracing::warn!(error = %e, kind = self.kind.segment(), "listing fetch failed; keeping previous results");
                Applied::Failed
            }
        }
    }

    fn cancel_debounce(&mut self) -> Vec<Effect> {
        match self.deadline.take() {
            Some(_) => vec![Effect::CancelDebounce],
            None => Vec::new(),
        }
    }

    fn commit_filters(&mut self, filters: FilterState) -> Vec<Effect> {
        let mut effects = self.cancel_debounce();
        let next = self.query.with_filters(filters);
        self.filters = next.filters.clone();
        effects.extend(self.navigate(next));
        effects
    }

    fn navigate(&mut self, next: ListingQuery) -> Vec<Effect> {
        self.unresolved = None;
        let before = self.current_url_query();
        self.query = next;
        let after = self.current_url_query();
        if after == before {
            return Vec::new();
        }
        vec![Effect::PushUrl(after), self.begin_fetch()]
    }

    fn begin_fetch(&mut self) -> Effect {
        let query = self.current_url_query();
        self.begin_fetch_for(query)
    }

    fn begin_fetch_for(&mut self, query: String) -> Effect {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.awaiting = Some(seq);
        Effect::Fetch { seq, query }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::facets::FacetSummary;

    fn property_page() -> ResultPage {
        ResultPage {
            facets: FacetSummary::from_wire(&json!({
                "priceMin": {"min": 0, "max": 100000000},
                "propertyType": [{"value": "APARTMENT", "count": 10}, {"value": "HOUSE", "count": 4}]
            })),
            ..ResultPage::default()
        }
    }

    fn session() -> FilterSession {
        let mut s = FilterSession::new(ListingKind::Properties, property_page());
        s.hydrate("");
        let seq = s.awaiting.unwrap();
        s.apply_response(seq, Ok(property_page()));
        s
    }

    fn pushes(effects: &[Effect]) -> Vec<String> {
        effects
            .iter()
            .filter_map(|e| match e {
                Effect::PushUrl(q) => Some(q.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn first_hydrate_fetches_once() {
        let mut s = FilterSession::new(ListingKind::Properties, property_page());
        let effects = s.hydrate("propertyType=HOUSE");
        assert_eq!(effects, vec![Effect::Fetch { seq: 1, query: "propertyType=HOUSE".into() }]);
        assert!(s.hydrate("propertyType=HOUSE").is_empty());
    }

    #[test]
    fn categorical_scenario() {
        let mut s = session();
        assert_eq!(pushes(&s.toggle("propertyType", "APARTMENT")), vec!["propertyType=APARTMENT"]);
        assert_eq!(
            pushes(&s.toggle("propertyType", "HOUSE")),
            vec!["propertyType=APARTMENT&propertyType=HOUSE"]
        );
        assert_eq!(pushes(&s.toggle("propertyType", "APARTMENT")), vec!["propertyType=HOUSE"]);
        assert_eq!(s.query().filters.selected("propertyType"), &["HOUSE".to_string()]);
    }

    #[test]
    fn range_waits_for_quiet_window() {
        let mut s = session();
        let t0 = Instant::now();
        let effects = s.set_range("priceMin", Bounds { min: 1_000_000, max: 60_000_000 }, t0);
        assert_eq!(effects, vec![Effect::ArmDebounce(t0 + RANGE_DEBOUNCE)]);
        s.set_range("priceMin", Bounds { min: 2_000_000, max: 50_000_000 }, t0 + Duration::from_millis(300));
        assert!(s.debounce_elapsed(t0 + Duration::from_millis(600)).is_empty());
        assert_eq!(s.current_url_query(), "");

        let effects = s.debounce_elapsed(t0 + Duration::from_millis(800));
        assert_eq!(pushes(&effects), vec!["priceMinMin=2000000&priceMinMax=50000000"]);
        assert!(matches!(effects.last(), Some(Effect::Fetch { .. })));
        assert_eq!(s.pending_deadline(), None);
    }

    #[test]
    fn unchanged_range_is_not_rewritten() {
        let mut s = session();
        let t0 = Instant::now();
        s.set_range("priceMin", Bounds { min: 5, max: 10 }, t0);
        s.set_range("priceMin", Bounds { min: 0, max: 100_000_000 }, t0);
        assert!(s.debounce_elapsed(t0 + RANGE_DEBOUNCE).is_empty());
    }

    #[test]
    fn categorical_flushes_pending_range() {
        let mut s = session();
        let t0 = Instant::now();
        s.set_range("priceMin", Bounds { min: 2_000_000, max: 50_000_000 }, t0);
        let effects = s.toggle("propertyType", "HOUSE");
        assert_eq!(effects[0], Effect::CancelDebounce);
        assert_eq!(
            pushes(&effects),
            vec!["propertyType=HOUSE&priceMinMin=2000000&priceMinMax=50000000"]
        );
        assert!(s.debounce_elapsed(t0 + RANGE_DEBOUNCE).is_empty());
    }

    #[test]
    fn clear_all_restores_defaults() {
        let mut s = session();
        s.toggle("propertyType", "HOUSE");
        s.set_range("priceMin", Bounds { min: 2_000_000, max: 50_000_000 }, Instant::now());
        assert!(s.has_active_filters());
        assert_eq!(pushes(&s.clear_all()), vec![""]);
        assert!(!s.has_active_filters());
        assert_eq!(
            s.range_input("priceMin").unwrap().value(),
            Bounds { min: 0, max: 100_000_000 }
        );
    }

    #[test]
    fn filter_change_resets_page() {
        let mut s = session();
        assert_eq!(pushes(&s.set_page(3)), vec!["page=3"]);
        assert_eq!(pushes(&s.set_limit(24)), vec!["limit=24"]);
        s.set_page(2);
        assert_eq!(pushes(&s.toggle("propertyType", "HOUSE")), vec!["propertyType=HOUSE&limit=24"]);
    }

    #[test]
    fn stale_and_failed_responses() {
        let mut s = session();
        let first = match s.toggle("propertyType", "HOUSE").pop() {
            Some(Effect::Fetch { seq, .. }) => seq,
            other => panic!("expected fetch, got {other:?}"),
        };
        let second = match s.toggle("propertyType", "APARTMENT").pop() {
            Some(Effect::Fetch { seq, .. }) => seq,
            other => panic!("expected fetch, got {other:?}"),
        };
        let mut newer = property_page();
        newer.total_count = 2;
        let mut older = property_page();
        older.total_count = 1;
        assert_eq!(s.apply_response(second, Ok(newer)), Applied::Replaced);
        assert_eq!(s.apply_response(first, Ok(older)), Applied::Stale);
        assert_eq!(s.results().total_count, 2);

        let third = match s.set_page(2).pop() {
            Some(Effect::Fetch { seq, .. }) => seq,
            other => panic!("expected fetch, got {other:?}"),
        };
        assert_eq!(s.apply_response(third, Err(FetchError::Status(500))), Applied::Failed);
        assert_eq!(s.results().total_count, 2);
        assert!(!s.is_loading());
    }

    fn last_fetch(effects: &[Effect]) -> (Seq, String) {
        match effects.last() {
            Some(Effect::Fetch { seq, query }) => (*seq, query.clone()),
            other => panic!("expected fetch, got {other:?}"),
        }
    }

    fn with_price_facet(min: i64, max: i64) -> ResultPage {
        ResultPage {
            facets: FacetSummary::from_wire(&json!({ "priceMin": { "min": min, "max": max } })),
            ..ResultPage::default()
        }
    }

    #[test]
    fn deep_link_before_facets_is_forwarded_verbatim() {
        let mut s = FilterSession::new(ListingKind::Creators, ResultPage::default());
        let (seq, query) = last_fetch(&s.hydrate("?startingPriceMin=20000&startingPriceMax=40000"));
        assert_eq!(query, "startingPriceMin=20000&startingPriceMax=40000");

        let page = ResultPage {
            facets: FacetSummary::from_wire(&json!({ "startingPrice": { "min": 0, "max": 50000 } })),
            ..ResultPage::default()
        };
        assert_eq!(s.apply_response(seq, Ok(page)), Applied::Replaced);
        assert_eq!(s.current_url_query(), "startingPriceMin=20000&startingPriceMax=40000");
        assert_eq!(s.filters().range("startingPrice"), Some(Bounds { min: 20_000, max: 40_000 }));
        assert_eq!(s.active_filters().len(), 1);
    }

    #[test]
    fn one_sided_deep_link_survives_until_facets_arrive() {
        let mut s = FilterSession::new(ListingKind::Properties, ResultPage::default());
        let (seq, query) = last_fetch(&s.hydrate("priceMinMax=250000000"));
        assert_eq!(query, "priceMinMax=250000000");
        s.apply_response(seq, Ok(with_price_facet(1_000_000, 300_000_000)));
        assert_eq!(s.current_url_query(), "priceMinMin=1000000&priceMinMax=250000000");
        // facets are known now, later navigation uses the canonical form
        let (_, query) = last_fetch(&s.hydrate("priceMinMin=2000000"));
        assert_eq!(query, "priceMinMin=2000000&priceMinMax=300000000");
    }

    #[test]
    fn narrower_facets_keep_committed_range() {
        let mut s = session();
        let (seq, _) = last_fetch(&s.hydrate("priceMinMin=2000000&priceMinMax=50000000"));
        s.apply_response(seq, Ok(property_page()));

        let (seq, _) = last_fetch(&s.toggle("city", "Pune"));
        s.apply_response(seq, Ok(with_price_facet(5_000_000, 20_000_000)));
        assert_eq!(s.filters(), &s.query().filters);
        assert_eq!(s.filters().range("priceMin"), Some(Bounds { min: 2_000_000, max: 50_000_000 }));
        assert_eq!(s.active_filters().len(), 2);

        assert_eq!(
            pushes(&s.toggle("propertyType", "HOUSE")),
            vec!["propertyType=HOUSE&city=Pune&priceMinMin=2000000&priceMinMax=50000000"]
        );
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let mut s = session();
        assert!(s.toggle("priceMin", "x").is_empty());
        assert!(s.set_range("propertyType", Bounds { min: 0, max: 1 }, Instant::now()).is_empty());
    }
}
