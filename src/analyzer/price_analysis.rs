use crate::config::DealConfig;
use crate::model::{EstimationResult, LookupStatus};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// An ad priced noticeably below its estimate.
#[derive(Debug, Clone, Serialize)]
pub struct Deal {
    pub id: Option<String>,
    pub title: String,
    pub ad_price: u64,
    pub estimated_price: f64,
    /// Fraction of the estimate the ad is below it.
    pub discount: f64,
    pub urgent_sale: bool,
}

/// Aggregate figures for one batch run.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BatchSummary {
    pub processed: usize,
    pub skipped: usize,
    pub priced: usize,
    pub not_found: usize,
    pub matched_by_source: BTreeMap<String, usize>,
    pub mean_total_depreciation: f64,
    pub mean_estimated_price: Option<f64>,
    pub estimated_price_std_dev: Option<f64>,
    pub urgent_sales: usize,
    pub generated_at: DateTime<Utc>,
}

/// Trait defining the interface for a batch analyzer.
pub trait Analyzer {
    fn calculate_stats(&self, results: &[EstimationResult], skipped: usize) -> BatchSummary;
    fn find_deals(&self, results: &[EstimationResult], cfg: &DealConfig) -> Vec<Deal>;
}

pub struct AnalyzerImpl;

impl AnalyzerImpl {
    pub fn new() -> Self {
        Self
    }
}

impl Default for AnalyzerImpl {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer for AnalyzerImpl {
    /// Counts, per-source matches, and mean/std-dev of the estimates.
    fn calculate_stats(&self, results: &[EstimationResult], skipped: usize) -> BatchSummary {
        let mut matched_by_source = BTreeMap::new();
        for source in results.iter().filter_map(|r| r.matched_source) {
            *matched_by_source.entry(source.to_string()).or_insert(0) += 1;
        }

        let estimates: Vec<f64> = results
            .iter()
            .filter_map(|r| r.estimated_price)
            .filter(|&p| p > 0.0)
            .collect();
        let (mean, std_dev) = mean_and_std_dev(&estimates).unzip();

        let mean_total_depreciation = if results.is_empty() {
            0.0
        } else {
            results.iter().map(|r| r.total_depreciation).sum::<f64>() / results.len() as f64
        };

        BatchSummary {
            processed: results.len(),
            skipped,
            priced: estimates.len(),
            not_found: results
                .iter()
                .filter(|r| r.lookup == LookupStatus::NotFound)
                .count(),
            matched_by_source,
            mean_total_depreciation,
            mean_estimated_price: mean,
            estimated_price_std_dev: std_dev,
            urgent_sales: results.iter().filter(|r| r.urgent_sale).count(),
            generated_at: Utc::now(),
        }
    }

    /// Ads whose asking price is below `estimate × (1 − deviation_threshold)`
    /// or at least `min_price_delta` below the estimate.
    fn find_deals(&self, results: &[EstimationResult], cfg: &DealConfig) -> Vec<Deal> {
        let mut deals = Vec::new();
        for result in results {
            let (Some(ad_price), Some(estimate)) = (result.ad_price, result.estimated_price) else {
                continue;
            };
            let price = ad_price as f64;
            if price < cfg.min_price || cfg.max_price.is_some_and(|max| price > max) {
                continue;
            }
            let is_under_percent = price < estimate * (1.0 - cfg.deviation_threshold);
            let is_under_absolute = (estimate - price) >= cfg.min_price_delta;
            if is_under_percent || is_under_absolute {
                deals.push(Deal {
                    id: result.ad.id.clone(),
                    title: result.ad.title.clone(),
                    ad_price,
                    estimated_price: estimate,
                    discount: (estimate - price) / estimate,
                    urgent_sale: result.urgent_sale,
                });
            }
        }
        deals.sort_by(|a, b| b.discount.total_cmp(&a.discount));
        deals
    }
}

fn mean_and_std_dev(values: &[f64]) -> Option<(f64, f64)> {
    if values.is_empty() {
        return None;
    }
    let count = values.len() as f64;
    let avg = values.iter().sum::<f64>() / count;
    let std_dev = (values.iter().map(|p| (p - avg).powi(2)).sum::<f64>() / count).sqrt();
    Some((avg, std_dev))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AdRecord, IssueSet, PriceSource};

    fn result(title: &str, ad_price: Option<u64>, estimate: Option<f64>) -> EstimationResult {
        EstimationResult {
            ad: AdRecord::new(title),
            brand: None,
            model_hint: None,
            year: None,
            mileage_km: None,
            ad_price,
            issues: IssueSet::new(),
            lookup: if estimate.is_some() {
                LookupStatus::Matched
            } else {
                LookupStatus::NotFound
            },
            market_price: estimate.map(|e| e as u64),
            matched_name: None,
            matched_source: estimate.map(|_| PriceSource::MechanicNetwork),
            mileage_depreciation: 0.0,
            age_depreciation: 0.0,
            issues_depreciation: 0.0,
            total_depreciation: 0.1,
            base_price: estimate,
            statistical_prediction: None,
            estimated_price: estimate,
            urgent_sale: false,
            processed_at: Utc::now(),
        }
    }

    fn deal_config() -> DealConfig {
        DealConfig {
            deviation_threshold: 0.15,
            min_price_delta: 200_000_000.0,
            min_price: 0.0,
            max_price: None,
        }
    }

    #[test]
    fn finds_deals_by_percent_or_absolute_gap() {
        let results = vec![
            result("cheap", Some(800_000_000), Some(1_000_000_000.0)),
            result("fair", Some(950_000_000), Some(1_000_000_000.0)),
            result("big gap", Some(4_750_000_000), Some(5_000_000_000.0)),
            result("no estimate", Some(100), None),
            result("no price", None, Some(1_000_000_000.0)),
        ];
        let deals = AnalyzerImpl::new().find_deals(&results, &deal_config());
        let titles: Vec<&str> = deals.iter().map(|d| d.title.as_str()).collect();
        assert_eq!(titles, vec!["cheap", "big gap"]);
        assert!((deals[0].discount - 0.2).abs() < 1e-9);
    }

    #[test]
    fn price_bounds_filter_deals() {
        let mut cfg = deal_config();
        cfg.max_price = Some(500_000_000.0);
        let results = vec![result("cheap", Some(800_000_000), Some(1_000_000_000.0))];
        assert!(AnalyzerImpl::new().find_deals(&results, &cfg).is_empty());
    }

    #[test]
    fn stats_count_and_average() {
        let results = vec![
            result("a", None, Some(100.0)),
            result("b", None, Some(300.0)),
            result("c", None, None),
        ];
        let summary = AnalyzerImpl::new().calculate_stats(&results, 2);
        assert_eq!(summary.processed, 3);
        assert_eq!(summary.skipped, 2);
        assert_eq!(summary.priced, 2);
        assert_eq!(summary.not_found, 1);
        assert_eq!(summary.matched_by_source.get("mechanic_network"), Some(&2));
        assert_eq!(summary.mean_estimated_price, Some(200.0));
        assert_eq!(summary.estimated_price_std_dev, Some(100.0));
        assert!((summary.mean_total_depreciation - 0.1).abs() < 1e-9);
    }

    #[test]
    fn stats_of_empty_batch() {
        let summary = AnalyzerImpl::new().calculate_stats(&[], 0);
        assert_eq!(summary.processed, 0);
        assert_eq!(summary.mean_estimated_price, None);
        assert_eq!(summary.mean_total_depreciation, 0.0);
    }
}
