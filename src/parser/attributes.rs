// Brand, model, year and mileage extraction from Persian ad text
use crate::model::{present, AdRecord, VehicleDescriptor};
use crate::normalizer::{contains_term, fold_text, parse_number_field, strip_separators, tokenize};
use crate::parser::vocab::{BrandEntry, BRANDS, MODEL_CODES, TRIM_CODES};
use once_cell::sync::Lazy;
use regex::Regex;

static SOLAR_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|[^0-9])(1[34][0-9]{2})(?:[^0-9]|$)").unwrap());
static GREGORIAN_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|[^0-9])(20[0-9]{2})(?:[^0-9]|$)").unwrap());
static SHORT_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"مدل\s*:?\s*([0-9]{2})(?:[^0-9]|$)").unwrap());
static MILEAGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([0-9]+(?:\.[0-9]+)?)\s*(هزار|thousand|کیلومتر|کیلو متر|کیلو|km|k\b)").unwrap()
});
static MILEAGE_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"کارکرد\s*:?\s*([0-9]+)").unwrap());

const GREGORIAN_OFFSET: i32 = 621;
const MAX_MILEAGE_KM: u64 = 2_000_000;
const ZERO_KM: &[&str] = &["صفر کیلومتر", "صفر km", "کارکرد صفر", "صفر کیلو"];
/// Words that, right after a number, say it is not a model year.
const NON_YEAR_UNITS: &[&str] = &["km", "کیلومتر", "کیلو", "هزار", "تومان", "میلیون"];
const PLACEHOLDERS: &[&str] = &["نامشخص", "سایر", "unknown"];

/// The structured columns of an export that override text inference.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuredColumns<'a> {
    pub brand_type: Option<&'a str>,
    pub model_year: Option<&'a str>,
    pub mileage: Option<&'a str>,
}

impl<'a> StructuredColumns<'a> {
    pub fn from_ad(ad: &'a AdRecord) -> Self {
        Self {
            brand_type: present(&ad.brand_type).filter(|v| !is_placeholder(v)),
            model_year: present(&ad.model_year).filter(|v| !is_placeholder(v)),
            mileage: present(&ad.mileage).filter(|v| !is_placeholder(v)),
        }
    }
}

fn is_placeholder(value: &str) -> bool {
    let folded = fold_text(value);
    PLACEHOLDERS.iter().any(|p| folded == *p)
}

pub struct AttributeExtractor;

impl AttributeExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Builds a descriptor from free text, letting every parseable
    /// structured column override the text-derived value.
    pub fn extract(
        &self,
        title: &str,
        description: &str,
        columns: Option<&StructuredColumns>,
    ) -> VehicleDescriptor {
        let text = fold_text(&format!("{title} {description}"));
        let folded_title = fold_text(title);
        let columns = columns.copied().unwrap_or_default();

        let column_brand_type = columns.brand_type.map(fold_text);
        let column_brand = column_brand_type.as_deref().and_then(detect_brand);

        let (brand, model_hint) = match (column_brand_type.as_deref(), column_brand) {
            (Some(raw), Some(entry)) => (Some(entry), hint_from_column(raw, Some(entry))),
            (Some(raw), None) => match detect_brand(&text) {
                Some(entry) => (Some(entry), hint_from_column(raw, None)),
                None => (None, hint_from_column(raw, None)),
            },
            (None, _) => (
                detect_brand(&text),
                hint_from_codes(&folded_title).or_else(|| hint_from_codes(&text)),
            ),
        };

        let year = columns
            .model_year
            .and_then(year_from_column)
            .or_else(|| self.extract_year(&text));
        let mileage_km = columns
            .mileage
            .and_then(mileage_from_column)
            .or_else(|| self.extract_mileage(&text));

        VehicleDescriptor {
            brand: brand.map(|b| b.name.to_string()),
            model_hint,
            year,
            mileage_km,
        }
    }

    pub fn extract_from_ad(&self, ad: &AdRecord) -> VehicleDescriptor {
        let columns = StructuredColumns::from_ad(ad);
        self.extract(&ad.title, ad.description_text(), Some(&columns))
    }

    /// First brand in table order with a keyword present in `text`.
    pub fn detect_brand(&self, text: &str) -> Option<&'static str> {
        detect_brand(&fold_text(text)).map(|b| b.name)
    }

    /// Solar model year. Solar matches win over Gregorian ones, which are
    /// converted; `مدل ۹۸` style two-digit years are the last resort.
    pub fn extract_year(&self, text: &str) -> Option<i32> {
        let folded = fold_text(text);
        find_year(&SOLAR_YEAR, &folded)
            .or_else(|| find_year(&GREGORIAN_YEAR, &folded).map(|y| y - GREGORIAN_OFFSET))
            .or_else(|| {
                SHORT_YEAR
                    .captures(&folded)
                    .and_then(|cap| cap[1].parse::<i32>().ok())
                    .map(expand_short_year)
            })
    }

    pub fn extract_mileage(&self, text: &str) -> Option<u64> {
        let folded = strip_separators(&fold_text(text));
        if ZERO_KM.iter().any(|z| folded.contains(z)) {
            return Some(0);
        }

        for cap in MILEAGE.captures_iter(&folded) {
            let Ok(value) = cap[1].parse::<f64>() else {
                continue;
            };
            let unit = cap.get(2).map(|m| m.as_str()).unwrap_or("");
            let rest = &folded[cap.get(0).map(|m| m.end()).unwrap_or(folded.len())..];
            // "۵۰۰ هزار تومان" is money, not distance
            if unit == "هزار" && rest.trim_start().starts_with("تومان") {
                continue;
            }
            let km = match unit {
                "هزار" | "thousand" | "کیلو" | "k" => value * 1000.0,
                _ => value,
            };
            if let Some(km) = plausible_mileage(km) {
                return Some(km);
            }
        }

        MILEAGE_LABEL
            .captures(&folded)
            .and_then(|cap| cap[1].parse::<u64>().ok())
            .map(|v| if v < 1000 { v * 1000 } else { v })
            .filter(|v| *v <= MAX_MILEAGE_KM)
    }
}

impl Default for AttributeExtractor {
    fn default() -> Self {
        Self::new()
    }
}

fn detect_brand(folded: &str) -> Option<&'static BrandEntry> {
    BRANDS
        .iter()
        .find(|entry| entry.keywords.iter().any(|k| contains_term(folded, k)))
}

fn find_year(pattern: &Regex, folded: &str) -> Option<i32> {
    for cap in pattern.captures_iter(folded) {
        let Some(m) = cap.get(1) else { continue };
        let rest = folded[m.end()..].trim_start();
        if NON_YEAR_UNITS.iter().any(|u| rest.starts_with(u)) {
            continue;
        }
        // "پژو 2008" names the model, not the year
        if MODEL_CODES.contains(&m.as_str()) && follows_brand(&folded[..m.start()]) {
            continue;
        }
        if let Ok(year) = m.as_str().parse() {
            return Some(year);
        }
    }
    None
}

/// Whether `before` ends with a brand keyword as a whole word.
fn follows_brand(before: &str) -> bool {
    let before = before.trim_end();
    BRANDS.iter().flat_map(|b| b.keywords.iter()).any(|k| {
        before
            .strip_suffix(k)
            .is_some_and(|head| !head.chars().next_back().is_some_and(char::is_alphanumeric))
    })
}

fn expand_short_year(two_digits: i32) -> i32 {
    if two_digits >= 80 {
        1300 + two_digits
    } else {
        1400 + two_digits
    }
}

fn plausible_mileage(km: f64) -> Option<u64> {
    let rounded = km.round();
    if rounded >= 0.0 && rounded <= MAX_MILEAGE_KM as f64 {
        Some(rounded as u64)
    } else {
        None
    }
}

fn year_from_column(value: &str) -> Option<i32> {
    let folded = fold_text(value);
    if let Some(year) = find_year(&SOLAR_YEAR, &folded) {
        return Some(year);
    }
    if let Some(year) = find_year(&GREGORIAN_YEAR, &folded) {
        return Some(year - GREGORIAN_OFFSET);
    }
    match folded.parse::<i32>() {
        Ok(v) if (0..100).contains(&v) => Some(expand_short_year(v)),
        _ => None,
    }
}

fn mileage_from_column(value: &str) -> Option<u64> {
    let folded = fold_text(value);
    if folded.starts_with("صفر") || ZERO_KM.iter().any(|z| folded.contains(z)) {
        return Some(0);
    }
    let km = parse_number_field(&folded)?;
    let km = if folded.contains("هزار") && km < 1000 { km * 1000 } else { km };
    (km <= MAX_MILEAGE_KM).then_some(km)
}

/// Model text left in a brand/type column once the brand keyword is removed.
fn hint_from_column(folded: &str, brand: Option<&BrandEntry>) -> Option<String> {
    let mut rest = folded.to_string();
    if let Some(entry) = brand {
        if let Some(keyword) = entry.keywords.iter().find(|k| rest.contains(**k)) {
            rest = rest.replacen(keyword, " ", 1);
        }
    }
    let hint = tokenize(&rest).join(" ");
    (!hint.is_empty()).then_some(hint)
}

/// Known model and trim codes in `folded`, in order of appearance.
fn hint_from_codes(folded: &str) -> Option<String> {
    let mut codes: Vec<&str> = Vec::new();
    for token in tokenize(folded) {
        let known = MODEL_CODES.contains(&token) || TRIM_CODES.contains(&token);
        if known && !codes.contains(&token) {
            codes.push(token);
        }
    }
    (!codes.is_empty()).then(|| codes.join(" "))
}
