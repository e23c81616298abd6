use anyhow::Result;
use axum::{
    extract::{Path, RawQuery, State},
    http::{HeaderValue, Method, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use listing_core::{ApiClient, Effect, FacetSummary, FilterSession, ListingKind, ListingSource, ResultPage};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod render;

/// Settings the binary collects from flags and environment.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Base URL of the external listings API.
    pub api_base: String,
    pub api_timeout: Duration,
    /// Public origin of this site, used for absolute share links.
    pub site_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            api_base: "http://localhost:5000".into(),
            api_timeout: Duration::from_secs(12),
            site_url: "http://localhost:8080".into(),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub api: Arc<ApiClient>,
    pub site_url: Arc<str>,
}

pub fn build_app(config: ServerConfig) -> Result<Router> {
    let api = ApiClient::new(&config.api_base, config.api_timeout)?;
    tracing::info!(api_base = api.base_url(), "using listings api");
    let app_state = AppState {
        api: Arc::new(api),
        site_url: Arc::from(config.site_url.trim_end_matches('/')),
    };

    // comma-separated CORS_ALLOW_ORIGIN, any origin when unset; pages are read-only
    let read_only = [Method::GET, Method::HEAD];
    let origins: Vec<HeaderValue> = std::env::var("CORS_ALLOW_ORIGIN")
        .map(|val| val.split(',').filter_map(|s| s.trim().parse().ok()).collect())
        .unwrap_or_default();
    let cors = if origins.is_empty() {
        CorsLayer::new().allow_origin(Any)
    } else {
        CorsLayer::new().allow_origin(AllowOrigin::list(origins))
    }
    .allow_methods(read_only)
    .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/", get(home_handler))
        .route("/properties", get(properties_handler))
        .route("/creators", get(creators_handler))
        .route("/properties/:id/:slug", get(property_detail_handler))
        .route("/creators/:id/:slug", get(creator_detail_handler))
        .route("/api/:kind", get(listing_json_handler))
        .with_state(app_state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());
    Ok(app)
}

/// A listing session driven through exactly one hydrate/fetch cycle.
struct LoadedListing {
    session: FilterSession,
    error: Option<String>,
}

async fn load_listing(api: &ApiClient, kind: ListingKind, raw_query: &str) -> LoadedListing {
    let mut session = FilterSession::new(kind, ResultPage::default());
    let mut error = None;
    for effect in session.hydrate(raw_query) {
        if let Effect::Fetch { seq, query } = effect {
            match api.fetch_page(kind, &query).await {
                Ok(page) => {
                    session.apply_response(seq, Ok(page));
                }
                Err(e) => {
                    error = Some(e.to_string());
                    session.apply_response(seq, Err(e));
                }
            }
        }
    }
    LoadedListing { session, error }
}

async fn home_handler(State(state): State<AppState>) -> Html<String> {
    let facets = match state.api.fetch_home_facets().await {
        Ok(facets) => facets,
        Err(e) => {
            tracing::warn!(error = %e, "home facets unavailable");
            FacetSummary::default()
        }
    };
    Html(render::home_page(&facets))
}

async fn properties_handler(State(state): State<AppState>, RawQuery(raw): RawQuery) -> Html<String> {
    listing_page(&state, ListingKind::Properties, raw).await
}

async fn creators_handler(State(state): State<AppState>, RawQuery(raw): RawQuery) -> Html<String> {
    listing_page(&state, ListingKind::Creators, raw).await
}

async fn listing_page(state: &AppState, kind: ListingKind, raw: Option<String>) -> Html<String> {
    let loaded = load_listing(&state.api, kind, raw.as_deref().unwrap_or("")).await;
    Html(render::listing_page(&loaded.session, loaded.error.is_some()))
}

async fn property_detail_handler(
    State(state): State<AppState>,
    Path((id, _slug)): Path<(String, String)>,
) -> Response {
    detail_page(&state, ListingKind::Properties, &id).await
}

async fn creator_detail_handler(
    State(state): State<AppState>,
    Path((id, _slug)): Path<(String, String)>,
) -> Response {
    detail_page(&state, ListingKind::Creators, &id).await
}

async fn detail_page(state: &AppState, kind: ListingKind, id: &str) -> Response {
    match state.api.fetch_detail(kind, id).await {
        Ok(Some(listing)) => Html(render::detail_page(&listing, &state.site_url)).into_response(),
        Ok(None) => not_found(),
        Err(e) => {
            tracing::warn!(error = %e, id, kind = kind.segment(), "detail fetch failed");
            not_found()
        }
    }
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Html(render::not_found_page())).into_response()
}

async fn listing_json_handler(
    State(state): State<AppState>,
    Path(segment): Path<String>,
    RawQuery(raw): RawQuery,
) -> Response {
    let Some(kind) = ListingKind::from_segment(&segment) else {
        return (StatusCode::NOT_FOUND, Json(json!({ "error": format!("unknown listing kind: {segment}") })))
            .into_response();
    };
    let loaded = load_listing(&state.api, kind, raw.as_deref().unwrap_or("")).await;
    if let Some(error) = loaded.error {
        return (StatusCode::BAD_GATEWAY, Json(json!({ "error": error }))).into_response();
    }
    let session = &loaded.session;
    let results = session.results();
    let links: Vec<String> = results.items.iter().map(|l| format!("{}{}", state.site_url, l.href())).collect();
    Json(json!({
        "kind": kind,
        "query": session.current_url_query(),
        "results": results,
        "filters": session.filters(),
        "activeFilters": session.active_filters(),
        "pagination": results.pagination(),
        "links": links,
    }))
    .into_response()
}
