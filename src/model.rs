// Core structs: AdRecord, VehicleDescriptor, IssueSet, ReferenceCatalogEntry, EstimationResult
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

/// Marker written for any output field that could not be determined.
pub const UNKNOWN: &str = "unknown";

/// One classified listing as delivered by the ad export.
///
/// Field aliases accept the Persian column headers of the Divar export, so
/// both `{"title": ..}` and `{"عنوان": ..}` rows deserialize.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct AdRecord {
    #[serde(default, alias = "شناسه", deserialize_with = "text_or_number", serialize_with = "or_unknown")]
    pub id: Option<String>,
    #[serde(default, alias = "عنوان")]
    pub title: String,
    #[serde(default, alias = "توضیحات", serialize_with = "or_unknown")]
    pub description: Option<String>,
    #[serde(default, alias = "برند_و_تیپ", alias = "برند و تیپ", serialize_with = "or_unknown")]
    pub brand_type: Option<String>,
    #[serde(default, alias = "مدل", deserialize_with = "text_or_number", serialize_with = "or_unknown")]
    pub model_year: Option<String>,
    #[serde(default, alias = "کارکرد", deserialize_with = "text_or_number", serialize_with = "or_unknown")]
    pub mileage: Option<String>,
    #[serde(default, alias = "موتور", alias = "وضعیت موتور", serialize_with = "or_unknown")]
    pub engine_status: Option<String>,
    #[serde(default, alias = "شاسی", alias = "وضعیت شاسی", serialize_with = "or_unknown")]
    pub chassis_status: Option<String>,
    #[serde(default, alias = "بدنه", alias = "وضعیت بدنه", serialize_with = "or_unknown")]
    pub body_status: Option<String>,
    #[serde(default, alias = "گیربکس", alias = "وضعیت گیربکس", serialize_with = "or_unknown")]
    pub gearbox_status: Option<String>,
    #[serde(default, alias = "قیمت", deserialize_with = "text_or_number", serialize_with = "or_unknown")]
    pub price: Option<String>,
}

impl AdRecord {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn description_text(&self) -> &str {
        present(&self.description).unwrap_or("")
    }
}

/// Returns the trimmed value of an optional column, treating blanks and the
/// spreadsheet `nan` placeholder as absent.
pub fn present(value: &Option<String>) -> Option<&str> {
    let text = value.as_deref()?.trim();
    if text.is_empty() || text.eq_ignore_ascii_case("nan") {
        None
    } else {
        Some(text)
    }
}

/// Vehicle attributes extracted from one ad. `year` is always a solar year.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VehicleDescriptor {
    pub brand: Option<String>,
    pub model_hint: Option<String>,
    pub year: Option<i32>,
    pub mileage_km: Option<u64>,
}

/// Defect categories. Variant order is the display priority of an `IssueSet`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueTag {
    AccidentHistory,
    PaintChassisDamage,
    FullPaint,
    RoofPaint,
    PillarPaint,
    PaintFourPlus,
    PaintThreeParts,
    PaintTwoParts,
    PaintOnePart,
    RoofPillarRepair,
    BodyPartReplacement,
    EngineOverhaul,
    GearboxRepair,
    SuspensionDefect,
    ElectricalIssues,
    HighMileage,
    OptionDefect,
    OldTires,
    InteriorDamage,
    MinorScratches,
}

impl IssueTag {
    pub const ALL: [IssueTag; 20] = [
        IssueTag::AccidentHistory,
        IssueTag::PaintChassisDamage,
        IssueTag::FullPaint,
        IssueTag::RoofPaint,
        IssueTag::PillarPaint,
        IssueTag::PaintFourPlus,
        IssueTag::PaintThreeParts,
        IssueTag::PaintTwoParts,
        IssueTag::PaintOnePart,
        IssueTag::RoofPillarRepair,
        IssueTag::BodyPartReplacement,
        IssueTag::EngineOverhaul,
        IssueTag::GearboxRepair,
        IssueTag::SuspensionDefect,
        IssueTag::ElectricalIssues,
        IssueTag::HighMileage,
        IssueTag::OptionDefect,
        IssueTag::OldTires,
        IssueTag::InteriorDamage,
        IssueTag::MinorScratches,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IssueTag::AccidentHistory => "accident_history",
            IssueTag::PaintChassisDamage => "paint_chassis_damage",
            IssueTag::FullPaint => "full_paint",
            IssueTag::RoofPaint => "roof_paint",
            IssueTag::PillarPaint => "pillar_paint",
            IssueTag::PaintFourPlus => "paint_four_plus",
            IssueTag::PaintThreeParts => "paint_three_parts",
            IssueTag::PaintTwoParts => "paint_two_parts",
            IssueTag::PaintOnePart => "paint_one_part",
            IssueTag::RoofPillarRepair => "roof_pillar_repair",
            IssueTag::BodyPartReplacement => "body_part_replacement",
            IssueTag::EngineOverhaul => "engine_overhaul",
            IssueTag::GearboxRepair => "gearbox_repair",
            IssueTag::SuspensionDefect => "suspension_defect",
            IssueTag::ElectricalIssues => "electrical_issues",
            IssueTag::HighMileage => "high_mileage",
            IssueTag::OptionDefect => "option_defect",
            IssueTag::OldTires => "old_tires",
            IssueTag::InteriorDamage => "interior_damage",
            IssueTag::MinorScratches => "minor_scratches",
        }
    }

    /// Severity rank of paint tags (higher is worse); `None` for every other tag.
    pub fn paint_severity(&self) -> Option<u8> {
        match self {
            IssueTag::FullPaint => Some(7),
            IssueTag::RoofPaint => Some(6),
            IssueTag::PillarPaint => Some(5),
            IssueTag::PaintFourPlus => Some(4),
            IssueTag::PaintThreeParts => Some(3),
            IssueTag::PaintTwoParts => Some(2),
            IssueTag::PaintOnePart => Some(1),
            _ => None,
        }
    }

    pub fn is_paint(&self) -> bool {
        self.paint_severity().is_some()
    }

    /// Paint tag for a count of repainted parts.
    pub fn paint_for_parts(parts: u32) -> Option<IssueTag> {
        match parts {
            0 => None,
            1 => Some(IssueTag::PaintOnePart),
            2 => Some(IssueTag::PaintTwoParts),
            3 => Some(IssueTag::PaintThreeParts),
            _ => Some(IssueTag::PaintFourPlus),
        }
    }
}

impl fmt::Display for IssueTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Deduplicated issue tags in display-priority order.
///
/// Holds at most one paint tag: inserting a second one keeps whichever is
/// more severe.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IssueSet(BTreeSet<IssueTag>);

impl IssueSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a tag. Returns `true` when the set changed.
    pub fn insert(&mut self, tag: IssueTag) -> bool {
        if let Some(incoming) = tag.paint_severity() {
            if let Some(current) = self.paint() {
                let current_rank = current.paint_severity().unwrap_or(0);
                if incoming <= current_rank {
                    return false;
                }
                self.0.remove(&current);
            }
        }
        self.0.insert(tag)
    }

    pub fn contains(&self, tag: IssueTag) -> bool {
        self.0.contains(&tag)
    }

    pub fn paint(&self) -> Option<IssueTag> {
        self.0.iter().copied().find(IssueTag::is_paint)
    }

    pub fn iter(&self) -> impl Iterator<Item = IssueTag> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<IssueTag> for IssueSet {
    fn from_iter<I: IntoIterator<Item = IssueTag>>(iter: I) -> Self {
        let mut set = IssueSet::new();
        for tag in iter {
            set.insert(tag);
        }
        set
    }
}

impl fmt::Display for IssueSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("none");
        }
        let names: Vec<&str> = self.iter().map(|t| t.as_str()).collect();
        f.write_str(&names.join(", "))
    }
}

/// Which scraped price table a catalog row came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceSource {
    /// Dealer/mechanic network price list (Hamrah Mechanic).
    MechanicNetwork,
    /// Marketplace aggregator price list (z4car).
    MarketplaceAggregator,
}

impl PriceSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            PriceSource::MechanicNetwork => "mechanic_network",
            PriceSource::MarketplaceAggregator => "marketplace_aggregator",
        }
    }
}

impl fmt::Display for PriceSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw `(name, price)` row as supplied by a catalog feed.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CatalogRow {
    #[serde(alias = "Car Name", alias = "نام خودرو")]
    pub name: String,
    #[serde(alias = "Price", alias = "قیمت (تومان)", deserialize_with = "required_text_or_number")]
    pub price: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferenceCatalogEntry {
    pub name: String,
    pub price: u64,
    pub source: PriceSource,
}

/// How the market price of a row was (or was not) found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupStatus {
    Matched,
    NotFound,
    CatalogUnavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogStatus {
    Available,
    Unavailable,
}

/// Output row for one ad. Never mutated after the pipeline builds it.
#[derive(Debug, Clone, Serialize)]
pub struct EstimationResult {
    #[serde(flatten)]
    pub ad: AdRecord,
    #[serde(serialize_with = "or_unknown")]
    pub brand: Option<String>,
    #[serde(serialize_with = "or_unknown")]
    pub model_hint: Option<String>,
    #[serde(serialize_with = "or_unknown")]
    pub year: Option<i32>,
    #[serde(serialize_with = "or_unknown")]
    pub mileage_km: Option<u64>,
    #[serde(serialize_with = "or_unknown")]
    pub ad_price: Option<u64>,
    pub issues: IssueSet,
    pub lookup: LookupStatus,
    #[serde(serialize_with = "or_unknown")]
    pub market_price: Option<u64>,
    #[serde(serialize_with = "or_unknown")]
    pub matched_name: Option<String>,
    #[serde(serialize_with = "or_unknown")]
    pub matched_source: Option<PriceSource>,
    pub mileage_depreciation: f64,
    pub age_depreciation: f64,
    pub issues_depreciation: f64,
    pub total_depreciation: f64,
    #[serde(serialize_with = "or_unknown")]
    pub base_price: Option<f64>,
    #[serde(serialize_with = "or_unknown")]
    pub statistical_prediction: Option<f64>,
    #[serde(serialize_with = "or_unknown")]
    pub estimated_price: Option<f64>,
    pub urgent_sale: bool,
    pub processed_at: DateTime<Utc>,
}

/// A sold (or appraised) car: what the pipeline predicted and what it fetched.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FeedbackRecord {
    #[serde(default)]
    pub ad_id: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    pub predicted_price: f64,
    pub actual_price: f64,
    #[serde(default = "Utc::now")]
    pub recorded_at: DateTime<Utc>,
}

impl FeedbackRecord {
    /// `actual / predicted`, when both prices are positive.
    pub fn ratio(&self) -> Option<f64> {
        let ratio = self.actual_price / self.predicted_price;
        (self.predicted_price > 0.0 && self.actual_price > 0.0 && ratio.is_finite()).then_some(ratio)
    }
}

fn or_unknown<T, S>(value: &Option<T>, serializer: S) -> Result<S::Ok, S::Error>
where
    T: Serialize,
    S: Serializer,
{
    match value {
        Some(v) => v.serialize(serializer),
        None => serializer.serialize_str(UNKNOWN),
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TextOrNumber {
    Text(String),
    Int(i64),
    Float(f64),
}

impl From<TextOrNumber> for String {
    fn from(value: TextOrNumber) -> Self {
        match value {
            TextOrNumber::Text(s) => s,
            TextOrNumber::Int(i) => i.to_string(),
            TextOrNumber::Float(f) => f.to_string(),
        }
    }
}

fn text_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<TextOrNumber> = Option::deserialize(deserializer)?;
    Ok(value.map(String::from))
}

fn required_text_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    TextOrNumber::deserialize(deserializer).map(String::from)
}

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode {path}: {source}")]
    Encode {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("reference catalog unavailable: no price rows could be loaded")]
    Unavailable,
}

#[derive(Debug, Error, PartialEq)]
pub enum RowError {
    #[error("ad has no title")]
    MissingTitle,
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("invalid stored data: {0}")]
    InvalidData(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_set_keeps_most_severe_paint_tag() {
        let mut set = IssueSet::new();
        assert!(set.insert(IssueTag::PaintOnePart));
        assert!(set.insert(IssueTag::FullPaint));
        assert!(!set.insert(IssueTag::PaintTwoParts));

        assert_eq!(set.paint(), Some(IssueTag::FullPaint));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn issue_set_orders_by_priority() {
        let set: IssueSet = [
            IssueTag::MinorScratches,
            IssueTag::EngineOverhaul,
            IssueTag::PaintTwoParts,
            IssueTag::AccidentHistory,
        ]
        .into_iter()
        .collect();

        let order: Vec<IssueTag> = set.iter().collect();
        assert_eq!(
            order,
            vec![
                IssueTag::AccidentHistory,
                IssueTag::PaintTwoParts,
                IssueTag::EngineOverhaul,
                IssueTag::MinorScratches,
            ]
        );
        assert_eq!(
            set.to_string(),
            "accident_history, paint_two_parts, engine_overhaul, minor_scratches"
        );
    }

    #[test]
    fn issue_set_deduplicates() {
        let mut set = IssueSet::new();
        set.insert(IssueTag::AccidentHistory);
        assert!(!set.insert(IssueTag::AccidentHistory));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn ad_record_accepts_persian_headers_and_numbers() {
        let json = r#"{"عنوان": "پژو ۲۰۷", "مدل": 1401, "کارکرد": "۸۰٬۰۰۰", "بدنه": "سالم"}"#;
        let ad: AdRecord = serde_json::from_str(json).unwrap();

        assert_eq!(ad.title, "پژو ۲۰۷");
        assert_eq!(ad.model_year.as_deref(), Some("1401"));
        assert_eq!(ad.mileage.as_deref(), Some("۸۰٬۰۰۰"));
        assert_eq!(ad.body_status.as_deref(), Some("سالم"));
        assert!(ad.description.is_none());
    }

    #[test]
    fn missing_values_serialize_as_unknown() {
        let ad = AdRecord::new("title");
        let value = serde_json::to_value(&ad).unwrap();
        assert_eq!(value["title"], "title");
        assert_eq!(value["description"], UNKNOWN);
        assert_eq!(value["price"], UNKNOWN);
    }

    #[test]
    fn present_treats_blank_and_nan_as_absent() {
        assert_eq!(present(&Some("  ".into())), None);
        assert_eq!(present(&Some("nan".into())), None);
        assert_eq!(present(&None), None);
        assert_eq!(present(&Some(" سالم ".into())), Some("سالم"));
    }
}
