use lazy_static::lazy_static;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use crate::catalog::Unit;

lazy_static! {
    static ref SLUG_SEPARATORS: Regex = Regex::new(r"[\s\W_-]+").expect("valid regex");
}

/// `1234567` -> `1,234,567`.
pub fn group_thousands(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if n < 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Rupee amounts abbreviated the Indian way: crore above 1e7, lakh above 1e5.
pub fn format_rupees(amount: f64) -> String {
    if amount >= 10_000_000.0 {
        format!("₹{:.1}Cr", amount / 10_000_000.0)
    } else if amount >= 100_000.0 {
        format!("₹{:.1}L", amount / 100_000.0)
    } else {
        format!("₹{}", group_thousands(amount.round() as i64))
    }
}

pub fn format_unit(unit: Unit, v: i64) -> String {
    match unit {
        Unit::Rupee => format_rupees(v as f64),
        Unit::Dollar => format!("${}", group_thousands(v)),
        Unit::SquareFeet => format!("{} sq ft", group_thousands(v)),
        Unit::Count(noun) => format!("{} {noun}", group_thousands(v)),
    }
}

/// Both ends of a range; count-like units put the noun once at the end.
pub fn format_range(unit: Unit, min: i64, max: i64) -> String {
    match unit {
        Unit::Count(noun) => format!("{} - {} {noun}", group_thousands(min), group_thousands(max)),
        Unit::SquareFeet => format!("{} - {} sq ft", group_thousands(min), group_thousands(max)),
        Unit::Rupee | Unit::Dollar => format!("{} - {}", format_unit(unit, min), format_unit(unit, max)),
    }
}

/// `1500` -> `1.5k`, used on creator cards.
pub fn format_thousands_short(n: f64) -> String {
    let k = n / 1000.0;
    if k.fract() == 0.0 { format!("{k:.0}k") } else { format!("{k:.1}k") }
}

pub fn property_type_label(raw: &str) -> String {
    match raw {
        "APARTMENT" => "Apartment".into(),
        "HOUSE" => "House".into(),
        "COMMERCIAL" => "Commercial".into(),
        "PLOT" => "Plot".into(),
        other => other.to_string(),
    }
}

pub fn listing_type_label(raw: &str) -> String {
    match raw {
        "SALE" => "For Sale".into(),
        "RENT" => "For Rent".into(),
        "LEASE" => "For Lease".into(),
        other => other.to_string(),
    }
}

pub fn construction_status_label(raw: &str) -> String {
    match raw {
        "UNDER_CONSTRUCTION" => "Under Construction".into(),
        "READY_TO_MOVE" => "Ready to Move".into(),
        "PLANNED" => "Planned".into(),
        "COMPLETED" => "Completed".into(),
        other => other.to_string(),
    }
}

/// Display label for a raw facet value: underscores become spaces, first
/// letter upper-cased.
pub fn facet_label(raw: &str) -> String {
    capitalize_first(&raw.replace('_', " "))
}

pub fn capitalize_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// URL slug: NFKC-normalized, lowercased, separators collapsed to `-`.
pub fn slugify(s: &str) -> String {
    let normalized = s.nfkc().collect::<String>().to_lowercase();
    SLUG_SEPARATORS
        .replace_all(normalized.trim(), "-")
        .trim_matches('-')
        .to_string()
}
