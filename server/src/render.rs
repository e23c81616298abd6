//! Server-rendered HTML. Every filter control is a plain link or GET form
//! carrying the next URL, so the page works without client script.

use listing_core::catalog::{FieldKind, PROPERTY_CATALOG};
use listing_core::format::{
    construction_status_label, facet_label, format_rupees, format_thousands_short, group_thousands,
    listing_type_label, property_type_label,
};
use listing_core::pagination::PageLink;
use listing_core::query::{href, RESULTS_PER_PAGE_OPTIONS};
use listing_core::refinement::categorical_options;
use listing_core::{Creator, FacetSummary, FilterSession, Listing, ListingQuery, Property};

pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

fn layout(title: &str, body: &str) -> String {
    format!(
        "<!doctype html>\n<html lang=\"en\"><head><meta charset=\"utf-8\">\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\
         <title>{}</title></head><body>\
         <nav><a href=\"/\">Home</a> <a href=\"/properties\">Properties</a> <a href=\"/creators\">Creators</a></nav>\
         <main>{}</main></body></html>\n",
        escape(title),
        body
    )
}

fn amount(v: f64) -> String {
    group_thousands(v.round() as i64)
}

fn price_text(p: &Property) -> String {
    match (p.price_min, p.price_max) {
        (Some(lo), Some(hi)) if hi > lo => format!("{} - {}", format_rupees(lo), format_rupees(hi)),
        (Some(v), _) | (None, Some(v)) => format_rupees(v),
        (None, None) => "Price on request".to_string(),
    }
}

fn property_meta(p: &Property) -> String {
    [
        p.property_type.as_deref().map(property_type_label),
        p.listing_type.as_deref().map(listing_type_label),
        p.place_name.clone(),
        p.city.clone(),
    ]
    .into_iter()
    .flatten()
    .collect::<Vec<_>>()
    .join(" · ")
}

fn creator_reach(c: &Creator) -> Vec<String> {
    let mut out = Vec::new();
    if let Some(n) = c.instagram_followers {
        out.push(format!("{} Instagram followers", format_thousands_short(n)));
    }
    if let Some(n) = c.youtube_subscribers {
        out.push(format!("{} YouTube subscribers", format_thousands_short(n)));
    }
    out
}

pub fn card(listing: &Listing) -> String {
    let link = escape(&listing.href());
    match listing {
        Listing::Property(p) => {
            let area = p
                .total_area
                .map(|a| format!("<p class=\"area\">{} sq ft</p>", amount(a)))
                .unwrap_or_default();
            let verified = if p.verified { " <span class=\"badge\">Verified</span>" } else { "" };
            format!(
                "<article class=\"card\"><h2><a href=\"{link}\">{}</a>{verified}</h2>\
                 <p class=\"meta\">{}</p><p class=\"price\">{}</p>{area}</article>",
                escape(&p.name),
                escape(&property_meta(p)),
                escape(&price_text(p)),
            )
        }
        Listing::Creator(c) => {
            let platforms = c.main_advertizing_platforms.iter().map(|p| facet_label(p)).collect::<Vec<_>>().join(", ");
            let price = c
                .starting_price
                .map(|v| format!("<p class=\"price\">From ${}</p>", amount(v)))
                .unwrap_or_default();
            format!(
                "<article class=\"card\"><h2><a href=\"{link}\">{}</a></h2>\
                 <p class=\"meta\">{}</p><p class=\"reach\">{}</p>{price}</article>",
                escape(&c.display_name()),
                escape(&platforms),
                escape(&creator_reach(c).join(" · ")),
            )
        }
    }
}

fn filter_panel(session: &FilterSession, base: &ListingQuery) -> String {
    let kind = session.kind();
    let catalog = kind.catalog();
    let path = kind.page_path();
    let mut out = String::from("<aside class=\"filters\">");
    for spec in catalog.fields {
        match spec.kind {
            FieldKind::Categorical { .. } => {
                let options = session.options(spec.key);
                if options.is_empty() {
                    continue;
                }
                out.push_str(&format!("<section><h3>{}</h3><ul>", escape(spec.title)));
                for opt in options {
                    let next = base.with_toggled(spec.key, &opt.value).serialize(catalog);
                    let checked = if opt.checked { " checked" } else { "" };
                    let count = opt.count.map(|n| format!(" <span class=\"count\">({n})</span>")).unwrap_or_default();
                    out.push_str(&format!(
                        "<li><a href=\"{}\"><input type=\"checkbox\" tabindex=\"-1\"{checked}> {}</a>{count}</li>",
                        escape(&href(&path, &next)),
                        escape(&opt.label),
                    ));
                }
                out.push_str("</ul></section>");
            }
            FieldKind::Range { .. } => {
                let Some(input) = session.range_input(spec.key) else { continue };
                let mut rest = base.filters.clone();
                rest.clear_field(spec.key);
                let carried = base.with_filters(rest).serialize(catalog);
                let full = input.bounds();
                let value = input.value();
                let (lo, hi) = input.labels();
                out.push_str(&format!(
                    "<section><h3>{}</h3><form method=\"get\" action=\"{}\">",
                    escape(spec.title),
                    escape(&path)
                ));
                for (k, v) in url::form_urlencoded::parse(carried.as_bytes()) {
                    out.push_str(&format!(
                        "<input type=\"hidden\" name=\"{}\" value=\"{}\">",
                        escape(&k),
                        escape(&v)
                    ));
                }
                for (name, v) in [(spec.min_key(), value.min), (spec.max_key(), value.max)] {
                    out.push_str(&format!(
                        "<input type=\"number\" name=\"{name}\" min=\"{}\" max=\"{}\" value=\"{v}\">",
                        full.min, full.max
                    ));
                }
                out.push_str(&format!(
                    "<p class=\"range-labels\">{} - {}</p><button type=\"submit\">Apply</button></form></section>",
                    escape(&lo),
                    escape(&hi)
                ));
            }
        }
    }
    out.push_str("</aside>");
    out
}

fn active_filter_strip(session: &FilterSession, base: &ListingQuery) -> String {
    let chips = session.active_filters();
    if chips.is_empty() {
        return String::new();
    }
    let catalog = session.kind().catalog();
    let path = session.kind().page_path();
    let mut out = String::from("<div class=\"active-filters\"><h3>Active Filters</h3><ul>");
    for chip in chips {
        let mut rest = base.filters.clone();
        rest.clear_field(chip.key);
        let next = base.with_filters(rest).serialize(catalog);
        out.push_str(&format!(
            "<li><span>{}: {}</span> <a href=\"{}\" aria-label=\"Remove {}\">×</a></li>",
            escape(chip.label),
            escape(&chip.text),
            escape(&href(&path, &next)),
            escape(chip.label),
        ));
    }
    let cleared = base.with_cleared_filters().serialize(catalog);
    out.push_str(&format!(
        "</ul><a class=\"clear-all\" href=\"{}\">Clear all</a></div>",
        escape(&href(&path, &cleared))
    ));
    out
}

fn per_page_links(session: &FilterSession) -> String {
    let catalog = session.kind().catalog();
    let path = session.kind().page_path();
    let current = session.query().effective_limit();
    let mut out = String::from("<p class=\"per-page\">Results per page:");
    for n in RESULTS_PER_PAGE_OPTIONS {
        if n == current {
            out.push_str(&format!(" <strong>{n}</strong>"));
        } else {
            let next = session.query().with_limit(n).serialize(catalog);
            out.push_str(&format!(" <a href=\"{}\">{n}</a>", escape(&href(&path, &next))));
        }
    }
    out.push_str("</p>");
    out
}

fn pagination_links(session: &FilterSession) -> String {
    let pagination = session.results().pagination();
    if !pagination.is_visible() {
        return String::new();
    }
    let catalog = session.kind().catalog();
    let path = session.kind().page_path();
    let link = |page: u32, text: &str| {
        let next = session.query().with_page(page).serialize(catalog);
        format!("<a href=\"{}\">{}</a>", escape(&href(&path, &next)), text)
    };
    let current = pagination.current_page;
    let mut out = String::from("<nav class=\"pagination\">");
    if current > 1 {
        out.push_str(&link(current - 1, "Previous"));
    }
    for entry in pagination.links() {
        match entry {
            PageLink::Page(p) if p == current => out.push_str(&format!(" <strong>{p}</strong>")),
            PageLink::Page(p) => {
                out.push(' ');
                out.push_str(&link(p, &p.to_string()));
            }
            PageLink::Gap => out.push_str(" <span class=\"gap\">…</span>"),
        }
    }
    if current < pagination.total_pages {
        out.push(' ');
        out.push_str(&link(current + 1, "Next"));
    }
    out.push_str("</nav>");
    out
}

pub fn listing_page(session: &FilterSession, fetch_failed: bool) -> String {
    let kind = session.kind();
    let results = session.results();
    let base = session.query();

    let mut body = format!("<h1>{}</h1>", kind.title());
    body.push_str(&filter_panel(session, base));
    body.push_str("<section class=\"results\">");
    body.push_str(&active_filter_strip(session, base));
    if fetch_failed {
        body.push_str("<p class=\"notice\">Listings are unavailable right now. Please try again.</p>");
    }
    body.push_str(&format!(
        "<p class=\"total\">We've found {} results</p>",
        group_thousands(results.shown_total() as i64)
    ));
    if results.items.is_empty() {
        body.push_str("<p class=\"empty\">No listings match these filters.</p>");
    }
    for item in &results.items {
        body.push_str(&card(item));
    }
    body.push_str(&per_page_links(session));
    body.push_str(&pagination_links(session));
    body.push_str("</section>");
    layout(kind.title(), &body)
}

fn list_section(title: &str, items: &[String]) -> String {
    if items.is_empty() {
        return String::new();
    }
    let lis: String = items.iter().map(|i| format!("<li>{}</li>", escape(i))).collect();
    format!("<section><h2>{}</h2><ul>{lis}</ul></section>", escape(title))
}

fn property_detail(p: &Property) -> String {
    let mut body = format!(
        "<h1>{}</h1><p class=\"meta\">{}</p><p class=\"price\">{}</p>",
        escape(&p.name),
        escape(&property_meta(p)),
        escape(&price_text(p))
    );
    if let Some(d) = &p.description {
        body.push_str(&format!("<p class=\"description\">{}</p>", escape(d)));
    }
    let mut facts = Vec::new();
    for (label, v) in [("Total area", p.total_area), ("Built-up area", p.built_up_area), ("Carpet area", p.carpet_area)] {
        if let Some(v) = v {
            facts.push(format!("{label}: {} sq ft", amount(v)));
        }
    }
    if let Some(s) = &p.construction_status {
        facts.push(format!("Construction: {}", construction_status_label(s)));
    }
    if let Some(s) = &p.furnishing_status {
        facts.push(format!("Furnishing: {}", facet_label(&s.to_lowercase())));
    }
    if let Some(r) = &p.rera_no {
        facts.push(format!("RERA: {r}"));
    }
    if let Some(c) = &p.creator_name {
        facts.push(format!("Listed by {c}"));
    }
    body.push_str(&list_section("Overview", &facts));
    body.push_str(&list_section("Highlights", &p.highlights));
    let amenities: Vec<String> = p.amenities.labels().into_iter().map(String::from).collect();
    body.push_str(&list_section("Amenities", &amenities));
    let plans: Vec<String> = p
        .floor_plan_details
        .iter()
        .filter_map(|f| match (f.rooms, f.bathroom) {
            (Some(r), Some(b)) => Some(format!("{} BHK, {} bath", amount(r), amount(b))),
            (Some(r), None) => Some(format!("{} BHK", amount(r))),
            _ => None,
        })
        .collect();
    body.push_str(&list_section("Floor plans", &plans));
    if !p.faq.is_empty() {
        body.push_str("<section><h2>FAQ</h2><dl>");
        for f in &p.faq {
            body.push_str(&format!("<dt>{}</dt><dd>{}</dd>", escape(&f.question), escape(&f.answer)));
        }
        body.push_str("</dl></section>");
    }
    body
}

fn creator_detail(c: &Creator) -> String {
    let mut body = format!("<h1>{}</h1>", escape(&c.display_name()));
    if let Some(city) = &c.city {
        body.push_str(&format!("<p class=\"meta\">{}</p>", escape(city)));
    }
    if let Some(bio) = &c.bio {
        body.push_str(&format!("<p class=\"description\">{}</p>", escape(bio)));
    }
    if let Some(v) = c.starting_price {
        body.push_str(&format!("<p class=\"price\">Starting at ${}</p>", amount(v)));
    }
    let platforms: Vec<String> = c.main_advertizing_platforms.iter().map(|p| facet_label(p)).collect();
    body.push_str(&list_section("Platforms", &platforms));
    let projects: Vec<String> = c.types_of_project_available_to_work.iter().map(|p| facet_label(p)).collect();
    body.push_str(&list_section("Available for", &projects));
    let mut reach = creator_reach(c);
    if let Some(v) = c.average_instagram_views {
        reach.push(format!("{} average views", format_thousands_short(v)));
    }
    if let Some(v) = c.average_instagram_likes {
        reach.push(format!("{} average likes", format_thousands_short(v)));
    }
    body.push_str(&list_section("Reach", &reach));
    body
}

pub fn detail_page(listing: &Listing, site_url: &str) -> String {
    let (kind_path, kind_title, mut body) = match listing {
        Listing::Property(p) => ("/properties", "Properties", property_detail(p)),
        Listing::Creator(c) => ("/creators", "Creators", creator_detail(c)),
    };
    let share = format!("{}{}", site_url, listing.href());
    body.push_str(&format!(
        "<p class=\"share\">Share: <a href=\"{0}\">{0}</a></p><p><a href=\"{1}\">Back to {2}</a></p>",
        escape(&share),
        kind_path,
        kind_title
    ));
    layout(&listing.title(), &body)
}

pub fn home_page(facets: &FacetSummary) -> String {
    let mut body = String::from("<h1>Find your next property</h1>");
    let options = categorical_options(facets.values("propertyType"), &[]);
    if !options.is_empty() {
        body.push_str("<section><h2>Browse by type</h2><ul>");
        for opt in options {
            let q = ListingQuery::default().with_toggled("propertyType", &opt.value).serialize(&PROPERTY_CATALOG);
            let count = opt.count.map(|n| format!(" <span class=\"count\">({n})</span>")).unwrap_or_default();
            body.push_str(&format!(
                "<li><a href=\"{}\">{}</a>{count}</li>",
                escape(&href("/properties", &q)),
                escape(&property_type_label(&opt.value))
            ));
        }
        body.push_str("</ul></section>");
    }
    body.push_str(
        "<p><a href=\"/properties\">All properties</a> · <a href=\"/creators\">Work with creators</a></p>",
    );
    layout("Home", &body)
}

pub fn not_found_page() -> String {
    layout("Not found", "<h1>Listing not found</h1><p><a href=\"/\">Back to home</a></p>")
}

#[cfg(test)]
mod tests {
    use super::*;
    use listing_core::{ListingKind, ResultPage};
    use serde_json::json;

    fn session(raw: &str, body: serde_json::Value) -> FilterSession {
        let kind = ListingKind::Properties;
        let page = ResultPage::from_envelope(kind, &body).unwrap();
        let mut s = FilterSession::new(kind, page);
        s.hydrate(raw);
        s
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(escape("<a href=\"x\">'&'</a>"), "&lt;a href=&quot;x&quot;&gt;&#39;&amp;&#39;&lt;/a&gt;");
    }

    #[test]
    fn property_card_links_to_detail() {
        let listing = ListingKind::Properties
            .decode_item(json!({"_id": "p1", "name": "Sea View", "priceMin": 5000000, "city": "Goa"}))
            .unwrap();
        let html = card(&listing);
        assert!(html.contains("href=\"/properties/p1/sea-view\""));
        assert!(html.contains("₹50.0L"));
        assert!(html.contains("Goa"));
    }

    #[test]
    fn checkbox_links_encode_the_toggled_url() {
        let s = session(
            "propertyType=HOUSE&page=3",
            json!({"data": {"properties": [], "facets": {"propertyType": ["APARTMENT", "HOUSE"]}}}),
        );
        let html = listing_page(&s, false);
        assert!(html.contains("href=\"/properties?propertyType=APARTMENT&amp;propertyType=HOUSE\""));
        assert!(html.contains("href=\"/properties\"><input type=\"checkbox\" tabindex=\"-1\" checked> HOUSE"));
        assert!(html.contains("Clear all"));
    }

    #[test]
    fn range_form_carries_other_filters() {
        let s = session(
            "city=Pune&priceMinMin=2000000",
            json!({"data": {"properties": [], "facets": {"priceMin": {"min": 0, "max": 100000000}}}}),
        );
        let html = listing_page(&s, false);
        assert!(html.contains("<input type=\"hidden\" name=\"city\" value=\"Pune\">"));
        assert!(html.contains("name=\"priceMinMin\" min=\"0\" max=\"100000000\" value=\"2000000\""));
        assert!(html.contains("Price: ₹20.0L - ₹10.0Cr"));
    }

    #[test]
    fn pagination_hidden_for_single_page() {
        let s = session("", json!({"data": {"properties": [], "totalCount": 5}}));
        let html = listing_page(&s, false);
        assert!(!html.contains("class=\"pagination\""));
        assert!(html.contains("We've found 5 results"));

        let s = session("page=2", json!({"data": {"properties": [], "totalCount": 40, "currentPage": 2}}));
        let html = listing_page(&s, false);
        assert!(html.contains("class=\"pagination\""));
        assert!(html.contains("href=\"/properties?page=3\">Next"));
        assert!(html.contains("href=\"/properties\">Previous"));
    }
}
