// Estimation pipeline: ad row -> attributes + issues -> depreciation -> catalog price -> estimate
use crate::analyzer::{
    Analyzer, AnalyzerImpl, BatchSummary, Deal, DepreciationModel, PredictionInput, PricePredictor,
};
use crate::catalog::ReferenceCatalog;
use crate::config::DealConfig;
use crate::matcher::PriceMatcher;
use crate::model::{present, AdRecord, CatalogStatus, EstimationResult, LookupStatus, RowError};
use crate::parser::{detect_urgent_sale, parse_ad_price, AttributeExtractor, IssueDetector, StructuredColumns};
use crate::source::AdBatch;
use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

/// No vehicle is priced below this share of its reference price.
pub const PRICE_FLOOR: f64 = 0.30;
/// Weight of the statistical prediction when one is blended in.
pub const PREDICTION_WEIGHT: f64 = 0.7;

const PROGRESS_EVERY: usize = 50;

/// Condition-adjusted price: `market × (1 − total)`, never below the floor.
pub fn estimate(market_price: f64, total_depreciation: f64) -> f64 {
    (market_price * (1.0 - total_depreciation)).max(PRICE_FLOOR * market_price)
}

/// Blends a positive statistical prediction into the heuristic price.
pub fn blend(prediction: Option<f64>, base_price: f64) -> f64 {
    match prediction {
        Some(p) if p > 0.0 => PREDICTION_WEIGHT * p + (1.0 - PREDICTION_WEIGHT) * base_price,
        _ => base_price,
    }
}

/// Everything one batch run produced.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub catalog_status: CatalogStatus,
    pub catalog_size: usize,
    pub results: Vec<EstimationResult>,
    pub deals: Vec<Deal>,
    pub summary: BatchSummary,
}

pub struct EstimationPipeline {
    extractor: AttributeExtractor,
    detector: IssueDetector,
    depreciation: DepreciationModel,
    matcher: PriceMatcher,
    analyzer: AnalyzerImpl,
    predictor: Option<Box<dyn PricePredictor>>,
}

impl EstimationPipeline {
    pub fn new(depreciation: DepreciationModel) -> Self {
        Self {
            extractor: AttributeExtractor::new(),
            detector: IssueDetector::new(),
            depreciation,
            matcher: PriceMatcher::new(),
            analyzer: AnalyzerImpl::new(),
            predictor: None,
        }
    }

    pub fn with_predictor(mut self, predictor: Box<dyn PricePredictor>) -> Self {
        self.predictor = Some(predictor);
        self
    }

    /// Estimates one ad. Only an ad without a title is rejected; every other
    /// gap in the data shows up as `None` fields in the result.
    pub fn process(&mut self, ad: &AdRecord, catalog: &ReferenceCatalog) -> Result<EstimationResult, RowError> {
        if ad.title.trim().is_empty() {
            return Err(RowError::MissingTitle);
        }

        let columns = StructuredColumns::from_ad(ad);
        let descriptor = self
            .extractor
            .extract(&ad.title, ad.description_text(), Some(&columns));
        let issues = self.detector.detect_for_ad(ad);
        let depreciation = self.depreciation.assess(&descriptor, &issues);

        let (lookup, outcome) = if catalog.is_empty() {
            (LookupStatus::CatalogUnavailable, None)
        } else {
            match self.matcher.lookup(&descriptor, catalog, columns.brand_type) {
                Some(outcome) => (LookupStatus::Matched, Some(outcome)),
                None => (LookupStatus::NotFound, None),
            }
        };

        let market_price = outcome.as_ref().map(|o| o.price);
        let base_price = market_price.map(|m| estimate(m as f64, depreciation.total));
        let statistical_prediction = match (&self.predictor, market_price, base_price) {
            (Some(predictor), Some(market_price), Some(base_price)) => predictor
                .predict(&PredictionInput {
                    descriptor: &descriptor,
                    issues: &issues,
                    market_price,
                    total_depreciation: depreciation.total,
                    base_price,
                })
                .filter(|p| p.is_finite() && *p > 0.0),
            _ => None,
        };
        let estimated_price = base_price.map(|base| blend(statistical_prediction, base));

        debug!(
            title = %ad.title,
            brand = ?descriptor.brand,
            year = ?descriptor.year,
            issues = %issues,
            lookup = ?lookup,
            estimated_price = ?estimated_price,
            "row estimated"
        );

        Ok(EstimationResult {
            ad: ad.clone(),
            brand: descriptor.brand,
            model_hint: descriptor.model_hint,
            year: descriptor.year,
            mileage_km: descriptor.mileage_km,
            ad_price: present(&ad.price).and_then(parse_ad_price),
            urgent_sale: detect_urgent_sale(&format!("{} {}", ad.title, ad.description_text())),
            issues,
            lookup,
            market_price,
            matched_name: outcome.as_ref().map(|o| o.name.clone()),
            matched_source: outcome.map(|o| o.source),
            mileage_depreciation: depreciation.mileage,
            age_depreciation: depreciation.age,
            issues_depreciation: depreciation.issues,
            total_depreciation: depreciation.total,
            base_price,
            statistical_prediction,
            estimated_price,
            processed_at: Utc::now(),
        })
    }

    /// Runs every ad of the batch against one catalog. Rows that cannot be
    /// processed are counted as skipped together with the ones that failed
    /// to decode; the batch itself never fails.
    pub fn run_batch(&mut self, batch: &AdBatch, catalog: &ReferenceCatalog, deals: &DealConfig) -> BatchReport {
        self.matcher.clear_cache();
        let catalog_status = catalog.status();
        if catalog_status == CatalogStatus::Unavailable {
            warn!("⚠️ Reference catalog unavailable: market prices will not be looked up");
        }

        let total = batch.ads.len();
        let mut skipped = batch.malformed;
        let mut results = Vec::with_capacity(total);
        for (index, ad) in batch.ads.iter().enumerate() {
            match self.process(ad, catalog) {
                Ok(result) => results.push(result),
                Err(e) => {
                    warn!("Skipping ad {}: {e}", index + 1);
                    skipped += 1;
                }
            }
            if (index + 1) % PROGRESS_EVERY == 0 {
                info!("⏳ Processed {}/{total} ads", index + 1);
            }
        }

        let summary = self.analyzer.calculate_stats(&results, skipped);
        let deals = self.analyzer.find_deals(&results, deals);
        info!(
            "✅ Batch done: {} processed, {} priced, {} skipped, {} deals",
            summary.processed,
            summary.priced,
            summary.skipped,
            deals.len()
        );

        BatchReport {
            catalog_status,
            catalog_size: catalog.len(),
            results,
            deals,
            summary,
        }
    }
}

impl Default for EstimationPipeline {
    fn default() -> Self {
        Self::new(DepreciationModel::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{IssueTag, PriceSource, ReferenceCatalogEntry};

    const EPS: f64 = 1e-6;

    struct FixedPredictor(Option<f64>);

    impl PricePredictor for FixedPredictor {
        fn predict(&self, _input: &PredictionInput) -> Option<f64> {
            self.0
        }
    }

    fn catalog() -> ReferenceCatalog {
        ReferenceCatalog::new(vec![ReferenceCatalogEntry {
            name: "پژو 207".to_string(),
            price: 1_000_000_000,
            source: PriceSource::MarketplaceAggregator,
        }])
    }

    fn peugeot_ad() -> AdRecord {
        AdRecord {
            brand_type: Some("پژو 207".to_string()),
            model_year: Some("۱۴۰۴".to_string()),
            mileage: Some("۵٬۰۰۰".to_string()),
            body_status: Some("سالم و بی‌خط و خش".to_string()),
            price: Some("۹۰۰٬۰۰۰٬۰۰۰ تومان".to_string()),
            ..AdRecord::new("پژو ۲۰۷ صفر")
        }
    }

    #[test]
    fn estimate_never_drops_below_the_floor() {
        for market in [1.0, 1_000.0, 950_000_000.0] {
            for step in 0..=20 {
                let total = step as f64 / 20.0;
                assert!(estimate(market, total) >= PRICE_FLOOR * market - EPS);
            }
        }
        assert!((estimate(1_000.0, 0.2) - 800.0).abs() < EPS);
        assert!((estimate(1_000.0, 0.9) - 300.0).abs() < EPS);
    }

    #[test]
    fn blend_uses_positive_predictions_only() {
        assert!((blend(Some(1_000.0), 500.0) - 850.0).abs() < EPS);
        assert_eq!(blend(Some(0.0), 500.0), 500.0);
        assert_eq!(blend(None, 500.0), 500.0);
    }

    #[test]
    fn missing_title_is_a_row_error() {
        let mut pipeline = EstimationPipeline::default();
        let err = pipeline.process(&AdRecord::new("  "), &catalog()).unwrap_err();
        assert_eq!(err, RowError::MissingTitle);
    }

    #[test]
    fn new_car_with_low_mileage_gets_the_bonus() {
        let mut pipeline = EstimationPipeline::default();
        let result = pipeline.process(&peugeot_ad(), &catalog()).unwrap();

        assert_eq!(result.lookup, LookupStatus::Matched);
        assert_eq!(result.brand.as_deref(), Some("پژو"));
        assert_eq!(result.year, Some(1404));
        assert!(result.issues.is_empty());
        assert!((result.mileage_depreciation + 0.02).abs() < EPS);
        assert!((result.total_depreciation - 0.0).abs() < EPS);
        assert_eq!(result.market_price, Some(1_000_000_000));
        assert_eq!(result.ad_price, Some(900_000_000));
        assert!((result.estimated_price.unwrap() - 1_000_000_000.0).abs() < 1.0);
    }

    #[test]
    fn predictor_is_blended_in() {
        let mut pipeline =
            EstimationPipeline::default().with_predictor(Box::new(FixedPredictor(Some(2_000_000_000.0))));
        let result = pipeline.process(&peugeot_ad(), &catalog()).unwrap();
        assert_eq!(result.statistical_prediction, Some(2_000_000_000.0));
        assert!((result.estimated_price.unwrap() - 1_700_000_000.0).abs() < 1.0);

        let mut silent = EstimationPipeline::default().with_predictor(Box::new(FixedPredictor(None)));
        let result = silent.process(&peugeot_ad(), &catalog()).unwrap();
        assert_eq!(result.statistical_prediction, None);
        assert!((result.estimated_price.unwrap() - 1_000_000_000.0).abs() < 1.0);
    }

    #[test]
    fn empty_catalog_marks_rows_unavailable() {
        let mut pipeline = EstimationPipeline::default();
        let batch = AdBatch {
            ads: vec![peugeot_ad(), AdRecord::new("")],
            malformed: 2,
        };
        let report = pipeline.run_batch(&batch, &ReferenceCatalog::default(), &DealConfig::default());

        assert_eq!(report.catalog_status, CatalogStatus::Unavailable);
        assert_eq!(report.results.len(), 1);
        assert_eq!(report.results[0].lookup, LookupStatus::CatalogUnavailable);
        assert_eq!(report.results[0].estimated_price, None);
        assert_eq!(report.summary.skipped, 3);
        assert_eq!(report.summary.not_found, 0);
    }

    #[test]
    fn status_columns_drive_depreciation() {
        let mut ad = peugeot_ad();
        ad.body_status = Some("دو لکه رنگ".to_string());
        ad.model_year = Some("1401".to_string());
        ad.mileage = Some("80000".to_string());

        let mut pipeline = EstimationPipeline::default();
        let result = pipeline.process(&ad, &catalog()).unwrap();
        assert!(result.issues.contains(IssueTag::PaintTwoParts));
        assert!((result.age_depreciation - 0.065).abs() < EPS);
        assert!((result.mileage_depreciation - 0.05).abs() < EPS);
        assert!((result.issues_depreciation - 0.08).abs() < EPS);
        assert!((result.total_depreciation - 0.195).abs() < EPS);
    }
}
