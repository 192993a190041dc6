use divar_appraiser::analyzer::{DepreciationFactorTable, DepreciationModel, FeedbackCalibrator};
use divar_appraiser::catalog::{load_catalog, ReferenceCatalog};
use divar_appraiser::config::{load_config, AppConfig};
use divar_appraiser::pipeline::EstimationPipeline;
use divar_appraiser::source::{read_ads, read_feedback, write_report, CatalogFeed, JsonFileFeed};
use divar_appraiser::storage::FeedbackStore;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt::init();

    // Set panic hook to log details about any panic
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("😱 Panic occurred: {:?}", panic_info);
    }));

    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config.json".to_string());
    let config: AppConfig = match load_config(&config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Config load error ({}): {}", config_path, e);
            return;
        }
    };

    // Load the reference catalog from every configured feed
    let feeds: Vec<Box<dyn CatalogFeed>> = config
        .catalog_feeds
        .iter()
        .map(|feed| Box::new(JsonFileFeed::new(&feed.path, feed.source)) as Box<dyn CatalogFeed>)
        .collect();
    let catalog = match load_catalog(&feeds).await {
        Ok(catalog) => catalog,
        Err(e) => {
            error!("❌ {}", e);
            ReferenceCatalog::default()
        }
    };

    let batch = match read_ads(&config.ads_path).await {
        Ok(batch) => batch,
        Err(e) => {
            error!("Failed to read ads: {}", e);
            return;
        }
    };
    info!("📄 Read {} ads ({} malformed rows)", batch.ads.len(), batch.malformed);

    // Optional feedback store feeding the calibrated predictor
    let mut store = config.feedback_db.as_deref().and_then(|path| match FeedbackStore::new(path) {
        Ok(store) => Some(store),
        Err(e) => {
            warn!("Feedback store unavailable: {:?}", e);
            None
        }
    });
    if let (Some(store), Some(import_path)) = (store.as_mut(), config.feedback_import.as_deref()) {
        match read_feedback(import_path).await {
            Ok(records) => match store.import_feedback(&records) {
                Ok(count) => info!("📥 Imported {} feedback records", count),
                Err(e) => warn!("Feedback import failed: {:?}", e),
            },
            Err(e) => warn!("Failed to read feedback: {}", e),
        }
    }

    let depreciation = DepreciationModel::new(
        DepreciationFactorTable::from_preset(config.preset),
        config.reference_year,
    );
    let mut pipeline = EstimationPipeline::new(depreciation);

    if let Some(store) = &store {
        if let Ok(Some(previous)) = store.latest_summary() {
            info!(
                "Previous batch: {} processed, {} priced | {}",
                previous.processed, previous.priced, previous.generated_at
            );
        }
        match store.feedback_records() {
            Ok(records) => {
                let calibrator = FeedbackCalibrator::from_records(&records);
                if calibrator.is_trained() {
                    info!("📈 Calibrated predictor trained on {} samples", calibrator.sample_count());
                    pipeline = pipeline.with_predictor(Box::new(calibrator));
                } else {
                    info!(
                        "Not enough feedback for calibration ({} samples)",
                        calibrator.sample_count()
                    );
                }
            }
            Err(e) => warn!("Failed to load feedback: {:?}", e),
        }
    }

    let report = pipeline.run_batch(&batch, &catalog, &config.deals);

    for deal in report.deals.iter().take(10) {
        info!(
            "💰 {} | asking {} vs estimate {:.0} ({:.0}% below){}",
            deal.title,
            deal.ad_price,
            deal.estimated_price,
            deal.discount * 100.0,
            if deal.urgent_sale { " | urgent" } else { "" }
        );
    }

    if let Some(store) = &store {
        if let Err(e) = store.save_batch_summary(&report.summary) {
            warn!("Stats update failed: {:?}", e);
        }
    }

    if let Err(e) = write_report(&config.output_path, &report).await {
        error!("Failed to write report: {}", e);
        return;
    }
    info!(
        "🏁 Report written to {} ({} rows, catalog {:?} with {} entries)",
        config.output_path,
        report.results.len(),
        report.catalog_status,
        report.catalog_size
    );
}
