use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::catalog::{Catalog, CREATOR_CATALOG, PROPERTY_CATALOG};
use crate::client::FetchError;
use crate::facets::FacetSummary;
use crate::format::slugify;
use crate::pagination::Pagination;
use crate::query::DEFAULT_LIMIT;

/// The two listing pages of the marketplace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingKind {
    Properties,
    Creators,
}

impl ListingKind {
    /// Path segment of the public pages, e.g. `/properties`.
    pub fn segment(self) -> &'static str {
        match self {
            ListingKind::Properties => "properties",
            ListingKind::Creators => "creators",
        }
    }

    pub fn from_segment(s: &str) -> Option<Self> {
        match s {
            "properties" => Some(ListingKind::Properties),
            "creators" => Some(ListingKind::Creators),
            _ => None,
        }
    }

    pub fn page_path(self) -> String {
        format!("/{}", self.segment())
    }

    /// Listing endpoint of the external API.
    pub fn api_path(self) -> &'static str {
        match self {
            ListingKind::Properties => "/properties",
            ListingKind::Creators => "/creator",
        }
    }

    /// Detail endpoint for `id`, encoded as a single path segment. `None`
    /// for ids that cannot name a listing (empty or a dot segment).
    pub fn detail_api_path(self, id: &str) -> Option<String> {
        if matches!(id, "" | "." | "..") {
            return None;
        }
        Some(format!("{}/{}", self.api_path(), urlencoding::encode(id)))
    }

    /// Key of the item array inside the response `data` object.
    pub fn items_key(self) -> &'static str {
        match self {
            ListingKind::Properties => "properties",
            ListingKind::Creators => "creators",
        }
    }

    pub fn catalog(self) -> &'static Catalog {
        match self {
            ListingKind::Properties => &PROPERTY_CATALOG,
            ListingKind::Creators => &CREATOR_CATALOG,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            ListingKind::Properties => "Properties",
            ListingKind::Creators => "Creators",
        }
    }

    pub fn decode_item(self, raw: Value) -> Result<Listing, serde_json::Error> {
        Ok(match self {
            ListingKind::Properties => Listing::Property(serde_json::from_value(raw)?),
            ListingKind::Creators => Listing::Creator(serde_json::from_value(raw)?),
        })
    }
}

/// Numbers the API sometimes sends as strings.
fn lenient_number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    Ok(match Option::<Value>::deserialize(d)? {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    })
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Amenities {
    pub security: bool,
    pub lift: bool,
    pub parking: bool,
    pub gymnasium: bool,
    pub swimming_pool: bool,
    pub club_house: bool,
    pub garden: bool,
    pub terrace: bool,
    pub balcony: bool,
    pub modular_kitchen: bool,
    pub air_conditioning: bool,
    pub power_backup: bool,
}

impl Amenities {
    pub fn labels(&self) -> Vec<&'static str> {
        [
            (self.security, "24/7 Security"),
            (self.lift, "Lift"),
            (self.parking, "Parking"),
            (self.gymnasium, "Gymnasium"),
            (self.swimming_pool, "Swimming Pool"),
            (self.club_house, "Club House"),
            (self.garden, "Garden"),
            (self.terrace, "Terrace"),
            (self.balcony, "Balcony"),
            (self.modular_kitchen, "Modular Kitchen"),
            (self.air_conditioning, "Air Conditioning"),
            (self.power_backup, "Power Backup"),
        ]
        .into_iter()
        .filter_map(|(on, label)| on.then_some(label))
        .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Faq {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FloorPlan {
    #[serde(deserialize_with = "lenient_number")]
    pub rooms: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub bathroom: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Property {
    #[serde(alias = "_id")]
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub property_type: Option<String>,
    pub listing_type: Option<String>,
    pub city: Option<String>,
    pub state_name: Option<String>,
    pub place_name: Option<String>,
    #[serde(deserialize_with = "lenient_number")]
    pub price_min: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub price_max: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub total_area: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub built_up_area: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub carpet_area: Option<f64>,
    pub construction_status: Option<String>,
    pub furnishing_status: Option<String>,
    pub status: Option<String>,
    pub rera_no: Option<String>,
    pub verified: bool,
    pub featured: bool,
    pub creator_name: Option<String>,
    pub highlights: Vec<String>,
    pub faq: Vec<Faq>,
    pub floor_plan_details: Vec<FloorPlan>,
    #[serde(flatten)]
    pub amenities: Amenities,
}

impl Property {
    /// Slug used in detail URLs; built from type/listing/city when unnamed.
    pub fn slug(&self) -> String {
        let slug = slugify(&self.name);
        if !slug.is_empty() {
            return slug;
        }
        let parts = [&self.property_type, &self.listing_type, &self.city];
        slugify(&parts.iter().filter_map(|p| p.as_deref()).collect::<Vec<_>>().join(" "))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Creator {
    #[serde(alias = "_id")]
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub city: Option<String>,
    pub bio: Option<String>,
    pub main_advertizing_platforms: Vec<String>,
    pub types_of_project_available_to_work: Vec<String>,
    #[serde(deserialize_with = "lenient_number")]
    pub starting_price: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub instagram_followers: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub youtube_subscribers: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub average_instagram_views: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub average_instagram_likes: Option<f64>,
}

impl Creator {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Listing {
    Property(Property),
    Creator(Creator),
}

impl Listing {
    pub fn id(&self) -> &str {
        match self {
            Listing::Property(p) => &p.id,
            Listing::Creator(c) => &c.id,
        }
    }

    pub fn title(&self) -> String {
        match self {
            Listing::Property(p) => p.name.clone(),
            Listing::Creator(c) => c.display_name(),
        }
    }

    /// Public detail page, `/properties/{id}/{slug}`. The slug is never
    /// empty, the detail routes need both segments.
    pub fn href(&self) -> String {
        let (segment, slug) = match self {
            Listing::Property(p) => ("properties", p.slug()),
            Listing::Creator(c) => ("creators", slugify(&c.first_name)),
        };
        let slug = if slug.is_empty() { "listing".to_string() } else { slug };
        format!("/{segment}/{}/{slug}", urlencoding::encode(self.id()))
    }
}

/// One API response: the listing items plus the facets and pagination
/// metadata computed for the same query. Replaced wholesale on every fetch.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultPage {
    pub items: Vec<Listing>,
    pub facets: FacetSummary,
    pub total_count: u64,
    pub current_page: u32,
    pub results_per_page: u32,
}

impl Default for ResultPage {
    fn default() -> Self {
        ResultPage {
            items: Vec::new(),
            facets: FacetSummary::default(),
            total_count: 0,
            current_page: 1,
            results_per_page: DEFAULT_LIMIT,
        }
    }
}

fn positive_u64(v: Option<&Value>) -> Option<u64> {
    let v = v?;
    v.as_u64()
        .or_else(|| v.as_f64().filter(|f| f.is_finite() && *f >= 0.0).map(|f| f as u64))
        .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
        .filter(|n| *n > 0)
}

impl ResultPage {
    /// Decode `{ "data": { <items>, facets, totalCount, currentPage,
    /// resultsPerPage } }`. Items that fail to decode are dropped.
    pub fn from_envelope(kind: ListingKind, body: &Value) -> Result<Self, FetchError> {
        let data = body.get("data").filter(|d| d.is_object()).ok_or(FetchError::MissingData)?;
        let items = match data.get(kind.items_key()) {
            Some(Value::Array(raw)) => raw
                .iter()
                .filter_map(|item| match kind.decode_item(item.clone()) {
                    Ok(listing) => Some(listing),
                    Err(e) => {
                        tracing::warn!(error = %e, kind = kind.segment(), "dropping malformed listing");
                        None
                    }
                })
                .collect(),
            _ => Vec::new(),
        };
        let facets = data.get("facets").map(FacetSummary::from_wire).unwrap_or_default();
        let total_count = positive_u64(data.get("totalCount")).unwrap_or(0);
        let current_page = positive_u64(data.get("currentPage")).map_or(1, |p| p.min(u32::MAX as u64) as u32);
        let results_per_page = positive_u64(data.get("resultsPerPage"))
            .map_or(DEFAULT_LIMIT, |p| p.min(u32::MAX as u64) as u32);
        Ok(ResultPage { items, facets, total_count, current_page, results_per_page })
    }

    /// Total shown in the "We've found N results" line: the API count, or
    /// the number of items when the API reports none.
    pub fn shown_total(&self) -> u64 {
        if self.total_count > 0 { self.total_count } else { self.items.len() as u64 }
    }

    pub fn pagination(&self) -> Pagination {
        Pagination::new(self.shown_total(), self.current_page, self.results_per_page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_property_envelope() {
        let body = json!({
            "data": {
                "properties": [
                    {"_id": "p1", "name": "Sea View 2BHK", "priceMin": "2500000", "lift": true, "propertyType": "APARTMENT"},
                    {"_id": "p2", "name": 42}
                ],
                "facets": {"city": ["Pune"]},
                "totalCount": 31,
                "currentPage": 2,
                "resultsPerPage": 12
            }
        });
        let page = ResultPage::from_envelope(ListingKind::Properties, &body).unwrap();
        assert_eq!(page.items.len(), 1);
        let Listing::Property(p) = &page.items[0] else { panic!("expected a property") };
        assert_eq!(p.id, "p1");
        assert_eq!(p.price_min, Some(2_500_000.0));
        assert_eq!(p.amenities.labels(), vec!["Lift"]);
        assert_eq!(page.items[0].href(), "/properties/p1/sea-view-2bhk");
        assert_eq!(page.pagination().total_pages, 3);
        assert_eq!(page.current_page, 2);
    }

    #[test]
    fn missing_metadata_uses_defaults() {
        let body = json!({"data": {"creators": [{"_id": "c1", "firstName": "Asha", "lastName": "Rao"}]}});
        let page = ResultPage::from_envelope(ListingKind::Creators, &body).unwrap();
        assert_eq!(page.total_count, 0);
        assert_eq!(page.shown_total(), 1);
        assert_eq!(page.current_page, 1);
        assert_eq!(page.results_per_page, DEFAULT_LIMIT);
        assert_eq!(page.items[0].title(), "Asha Rao");
        assert_eq!(page.items[0].href(), "/creators/c1/asha");
    }

    #[test]
    fn missing_data_is_an_error() {
        let err = ResultPage::from_envelope(ListingKind::Creators, &json!({"message": "boom"})).unwrap_err();
        assert!(matches!(err, FetchError::MissingData));
    }

    #[test]
    fn detail_paths_encode_the_id() {
        assert_eq!(ListingKind::Creators.detail_api_path("c1").as_deref(), Some("/creator/c1"));
        assert_eq!(
            ListingKind::Properties.detail_api_path("../creator/c1").as_deref(),
            Some("/properties/..%2Fcreator%2Fc1")
        );
        assert_eq!(ListingKind::Properties.detail_api_path(".."), None);
        let listing = Listing::Property(Property { id: "a b?c".into(), name: "Loft".into(), ..Property::default() });
        assert_eq!(listing.href(), "/properties/a%20b%3Fc/loft");
    }

    #[test]
    fn nameless_listings_still_get_a_slug() {
        let creator = Listing::Creator(Creator { id: "c7".into(), ..Creator::default() });
        assert_eq!(creator.href(), "/creators/c7/listing");
        let property = Listing::Property(Property { id: "p7".into(), ..Property::default() });
        assert_eq!(property.href(), "/properties/p7/listing");
    }

    #[test]
    fn unnamed_property_slug() {
        let p = Property {
            property_type: Some("PLOT".into()),
            listing_type: Some("SALE".into()),
            city: Some("Nashik".into()),
            ..Property::default()
        };
        assert_eq!(p.slug(), "plot-sale-nashik");
    }
}
