use crate::model::{AdRecord, CatalogRow, FeedError, FeedbackRecord, PriceSource};
use crate::source::traits::CatalogFeed;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Catalog feed backed by a JSON array of `{name, price}` rows on disk.
pub struct JsonFileFeed {
    path: PathBuf,
    source: PriceSource,
}

impl JsonFileFeed {
    pub fn new(path: impl Into<PathBuf>, source: PriceSource) -> Self {
        Self {
            path: path.into(),
            source,
        }
    }
}

#[async_trait::async_trait]
impl CatalogFeed for JsonFileFeed {
    fn source(&self) -> PriceSource {
        self.source
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    async fn fetch_rows(&self) -> Result<Vec<CatalogRow>, FeedError> {
        read_json(&self.path).await
    }
}

/// Ads read from an export, with the number of rows that did not decode.
#[derive(Debug, Default)]
pub struct AdBatch {
    pub ads: Vec<AdRecord>,
    pub malformed: usize,
}

/// Reads a JSON array of ads. Rows that fail to decode are counted and
/// skipped so one bad row never loses the batch.
pub async fn read_ads(path: impl AsRef<Path>) -> Result<AdBatch, FeedError> {
    let path = path.as_ref();
    let rows: Vec<serde_json::Value> = read_json(path).await?;
    let mut batch = AdBatch::default();
    for (index, row) in rows.into_iter().enumerate() {
        match serde_json::from_value::<AdRecord>(row) {
            Ok(ad) => batch.ads.push(ad),
            Err(e) => {
                warn!("Skipping malformed ad row {index} in {}: {e}", path.display());
                batch.malformed += 1;
            }
        }
    }
    Ok(batch)
}

pub async fn read_feedback(path: impl AsRef<Path>) -> Result<Vec<FeedbackRecord>, FeedError> {
    read_json(path.as_ref()).await
}

pub async fn write_report<T: Serialize>(path: impl AsRef<Path>, report: &T) -> Result<(), FeedError> {
    let path = path.as_ref();
    let json = serde_json::to_string_pretty(report).map_err(|source| FeedError::Encode {
        path: path.display().to_string(),
        source,
    })?;
    tokio::fs::write(path, json)
        .await
        .map_err(|source| FeedError::Write {
            path: path.display().to_string(),
            source,
        })
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, FeedError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| FeedError::Read {
            path: path.display().to_string(),
            source,
        })?;
    serde_json::from_str(&content).map_err(|source| FeedError::Parse {
        path: path.display().to_string(),
        source,
    })
}
