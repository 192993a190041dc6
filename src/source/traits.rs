use crate::model::{CatalogRow, FeedError, PriceSource};

/// A producer of reference price rows, e.g. one scraped price table.
#[async_trait::async_trait]
pub trait CatalogFeed: Send + Sync {
    fn source(&self) -> PriceSource;

    /// Human-readable label for logs.
    fn describe(&self) -> String;

    async fn fetch_rows(&self) -> Result<Vec<CatalogRow>, FeedError>;
}
