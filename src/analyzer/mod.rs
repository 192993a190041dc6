// Analyzer module: aggregates submodules for different aspects of analysis.

pub mod calibration;
pub mod depreciation;
pub mod price_analysis;

// Re-export the main types for ease of use.
pub use calibration::{FeedbackCalibrator, PredictionInput, PricePredictor};
pub use depreciation::{DepreciationBreakdown, DepreciationFactorTable, DepreciationModel, FactorPreset};
pub use price_analysis::{Analyzer, AnalyzerImpl, BatchSummary, Deal};
