//! Listing front-end core: filter state, facets, URL codec and the
//! filter-state synchronizer shared by the server and the terminal client.

pub mod catalog;
pub mod client;
pub mod driver;
pub mod facets;
pub mod filters;
pub mod format;
pub mod model;
pub mod pagination;
pub mod query;
pub mod range_input;
pub mod refinement;
pub mod session;

pub use client::{ApiClient, FetchError, ListingSource};
pub use facets::{Bounds, Facet, FacetSummary, FacetValue};
pub use filters::{ActiveFilter, FilterState};
pub use model::{Creator, Listing, ListingKind, Property, ResultPage};
pub use query::ListingQuery;
pub use session::{Effect, FilterSession};
