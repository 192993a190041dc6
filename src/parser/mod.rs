// Parser module: turns raw ad text into vehicle attributes, issues and prices.

pub mod attributes;
pub mod issues;
pub mod price;
pub mod vocab;

pub use attributes::{AttributeExtractor, StructuredColumns};
pub use issues::{detect_urgent_sale, ConditionFields, IssueDetector, StatusReading};
pub use price::{parse_ad_price, parse_price};
