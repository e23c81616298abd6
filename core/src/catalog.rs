use crate::facets::Bounds;

/// How a range value is displayed in chips and slider labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    /// Indian rupees, abbreviated to lakh / crore.
    Rupee,
    Dollar,
    SquareFeet,
    /// Plain grouped count followed by a noun, e.g. "followers".
    Count(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Categorical { chip_label: &'static str },
    Range { fallback: Bounds, unit: Unit, chip_label: &'static str },
}

/// One filterable attribute of a listing kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// Query/API key, e.g. `propertyType` or `priceMin`.
    pub key: &'static str,
    /// Heading shown above the filter.
    pub title: &'static str,
    pub kind: FieldKind,
}

impl FieldSpec {
    pub fn is_range(&self) -> bool {
        matches!(self.kind, FieldKind::Range { .. })
    }

    /// `<key>Min` query key for range fields.
    pub fn min_key(&self) -> String {
        format!("{}Min", self.key)
    }

    pub fn max_key(&self) -> String {
        format!("{}Max", self.key)
    }
}

/// Ordered set of filter fields for one listing kind.
#[derive(Debug)]
pub struct Catalog {
    pub fields: &'static [FieldSpec],
}

impl Catalog {
    pub fn get(&self, key: &str) -> Option<&'static FieldSpec> {
        self.fields.iter().find(|f| f.key == key)
    }

    pub fn categorical(&self) -> impl Iterator<Item = &'static FieldSpec> {
        self.fields.iter().filter(|f| !f.is_range())
    }

    pub fn ranges(&self) -> impl Iterator<Item = &'static FieldSpec> {
        self.fields.iter().filter(|f| f.is_range())
    }

    /// True when `key` is owned by this catalog (a categorical key, or a
    /// `Min`/`Max` key of a range field).
    pub fn owns_query_key(&self, key: &str) -> bool {
        self.fields.iter().any(|f| match f.kind {
            FieldKind::Categorical { .. } => f.key == key,
            FieldKind::Range { .. } => key
                .strip_prefix(f.key)
                .is_some_and(|rest| rest == "Min" || rest == "Max"),
        })
    }
}

const fn categorical(key: &'static str, title: &'static str, chip_label: &'static str) -> FieldSpec {
    FieldSpec { key, title, kind: FieldKind::Categorical { chip_label } }
}

const fn range(
    key: &'static str,
    title: &'static str,
    chip_label: &'static str,
    min: i64,
    max: i64,
    unit: Unit,
) -> FieldSpec {
    FieldSpec { key, title, kind: FieldKind::Range { fallback: Bounds { min, max }, unit, chip_label } }
}

pub static PROPERTY_CATALOG: Catalog = Catalog {
    fields: &[
        categorical("propertyType", "Property Type", "Type"),
        categorical("listingType", "Listing Type", "Listing"),
        categorical("city", "City", "City"),
        categorical("constructionStatus", "Construction Status", "Status"),
        categorical("furnishingStatus", "Furnishing Status", "Furnishing"),
        range("priceMin", "Price Range", "Price", 0, 100_000_000, Unit::Rupee),
        range("totalArea", "Total Area", "Total area", 0, 10_000, Unit::SquareFeet),
        range("builtUpArea", "Built Up Area", "Built up", 0, 10_000, Unit::SquareFeet),
        range("carpetArea", "Carpet Area", "Carpet", 0, 10_000, Unit::SquareFeet),
    ],
};

pub static CREATOR_CATALOG: Catalog = Catalog {
    fields: &[
        categorical("mainAdvertizingPlatforms", "Advertisement Platform", "Platforms"),
        categorical("typesOfProjectAvailableToWork", "What content do you want to promote?", "Content"),
        range("startingPrice", "Cost", "Price", 0, 10_000, Unit::Dollar),
        range("instagramFollowers", "Instagram Followers", "Instagram", 0, 1_000_000, Unit::Count("followers")),
        range("youtubeSubscribers", "YouTube Subscribers", "YouTube", 0, 1_000_000, Unit::Count("subscribers")),
    ],
};
