// Statistical predictor calibrated on recorded sale feedback
use crate::model::{FeedbackRecord, IssueSet, VehicleDescriptor};
use std::collections::HashMap;
use tracing::debug;

/// Everything the pipeline knows about a row when it asks for a prediction.
#[derive(Debug, Clone, Copy)]
pub struct PredictionInput<'a> {
    pub descriptor: &'a VehicleDescriptor,
    pub issues: &'a IssueSet,
    pub market_price: u64,
    pub total_depreciation: f64,
    pub base_price: f64,
}

/// Optional statistical price model blended into the heuristic estimate.
///
/// `None` means "no opinion" and leaves the heuristic price untouched.
pub trait PricePredictor: Send + Sync {
    fn predict(&self, input: &PredictionInput) -> Option<f64>;
}

/// Learns how far real sale prices sit from our estimates and scales the
/// heuristic price by the median `actual / predicted` ratio.
#[derive(Debug, Clone, Default)]
pub struct FeedbackCalibrator {
    global: Option<f64>,
    per_brand: HashMap<String, f64>,
    samples: usize,
}

impl FeedbackCalibrator {
    pub const MIN_SAMPLES: usize = 10;

    pub fn from_records(records: &[FeedbackRecord]) -> Self {
        let mut all = Vec::new();
        let mut by_brand: HashMap<String, Vec<f64>> = HashMap::new();
        for record in records {
            let Some(ratio) = record.ratio() else { continue };
            all.push(ratio);
            if let Some(brand) = &record.brand {
                by_brand.entry(brand.clone()).or_default().push(ratio);
            }
        }

        let per_brand = by_brand
            .into_iter()
            .filter(|(_, ratios)| ratios.len() >= Self::MIN_SAMPLES)
            .filter_map(|(brand, mut ratios)| median(&mut ratios).map(|m| (brand, m)))
            .collect();
        let samples = all.len();
        let global = if samples >= Self::MIN_SAMPLES {
            median(&mut all)
        } else {
            None
        };

        Self {
            global,
            per_brand,
            samples,
        }
    }

    /// Brand ratio when that brand has enough samples, else the global one.
    pub fn ratio_for(&self, brand: Option<&str>) -> Option<f64> {
        brand
            .and_then(|b| self.per_brand.get(b).copied())
            .or(self.global)
    }

    pub fn is_trained(&self) -> bool {
        self.global.is_some()
    }

    pub fn sample_count(&self) -> usize {
        self.samples
    }
}

impl PricePredictor for FeedbackCalibrator {
    fn predict(&self, input: &PredictionInput) -> Option<f64> {
        let ratio = self.ratio_for(input.descriptor.brand.as_deref())?;
        let prediction = input.base_price * ratio;
        debug!(ratio, prediction, "calibrated prediction");
        (prediction > 0.0).then_some(prediction)
    }
}

fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    Some(if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    })
}
