use crate::analyzer::depreciation::{DEFAULT_REFERENCE_YEAR, FactorPreset};
use crate::model::PriceSource;
use serde::Deserialize;
use std::fs;

/// One catalog price table on disk.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    pub path: String,
    pub source: PriceSource,
}

/// Thresholds for flagging an ad as priced under its estimate.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DealConfig {
    pub deviation_threshold: f64,
    pub min_price_delta: f64,
    pub min_price: f64,
    pub max_price: Option<f64>,
}

impl Default for DealConfig {
    fn default() -> Self {
        Self {
            deviation_threshold: 0.15,
            min_price_delta: 100_000_000.0,
            min_price: 0.0,
            max_price: None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    pub ads_path: String,
    pub output_path: String,
    #[serde(default)]
    pub catalog_feeds: Vec<FeedConfig>,
    #[serde(default)]
    pub preset: FactorPreset,
    #[serde(default = "default_reference_year")]
    pub reference_year: i32,
    #[serde(default)]
    pub deals: DealConfig,
    /// SQLite file for feedback and batch statistics.
    #[serde(default)]
    pub feedback_db: Option<String>,
    /// JSON file of feedback records ingested before the batch runs.
    #[serde(default)]
    pub feedback_import: Option<String>,
}

fn default_reference_year() -> i32 {
    DEFAULT_REFERENCE_YEAR
}

pub fn load_config(path: &str) -> Result<AppConfig, Box<dyn std::error::Error>> {
    let content = fs::read_to_string(path)?;
    let config: AppConfig = serde_json::from_str(&content)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_uses_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"ads_path": "ads.json", "output_path": "out.json"}"#).unwrap();
        assert!(config.catalog_feeds.is_empty());
        assert_eq!(config.preset, FactorPreset::Standard);
        assert_eq!(config.reference_year, 1404);
        assert_eq!(config.deals.deviation_threshold, 0.15);
        assert!(config.feedback_db.is_none());
    }

    #[test]
    fn full_config_parses() {
        let config: AppConfig = serde_json::from_str(
            r#"{
                "ads_path": "ads.json",
                "output_path": "out.json",
                "catalog_feeds": [
                    {"path": "hamrah.json", "source": "mechanic_network"},
                    {"path": "z4car.json", "source": "marketplace_aggregator"}
                ],
                "preset": "moderate",
                "reference_year": 1403,
                "deals": {"deviation_threshold": 0.2, "max_price": 2000000000},
                "feedback_db": "feedback.db"
            }"#,
        )
        .unwrap();
        assert_eq!(config.catalog_feeds.len(), 2);
        assert_eq!(config.catalog_feeds[1].source, PriceSource::MarketplaceAggregator);
        assert_eq!(config.preset, FactorPreset::Moderate);
        assert_eq!(config.deals.deviation_threshold, 0.2);
        assert_eq!(config.deals.min_price_delta, 100_000_000.0);
        assert_eq!(config.deals.max_price, Some(2_000_000_000.0));
        assert_eq!(config.feedback_db.as_deref(), Some("feedback.db"));
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(load_config("/nonexistent/divar-appraiser.json").is_err());
    }
}
