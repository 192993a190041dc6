// Reference price catalog assembled from every configured feed
use crate::model::{CatalogError, CatalogRow, CatalogStatus, PriceSource, ReferenceCatalogEntry};
use crate::normalizer::fold_text;
use crate::parser::parse_price;
use crate::source::CatalogFeed;
use futures::future::join_all;
use std::collections::HashSet;
use tracing::{info, warn};

/// Catalog prices at or below this many toman are parse artifacts, not cars.
pub const MIN_CATALOG_PRICE: u64 = 100_000;

/// Deduplicated catalog entries, most expensive first.
#[derive(Debug, Clone, Default)]
pub struct ReferenceCatalog {
    entries: Vec<ReferenceCatalogEntry>,
    folded_names: Vec<String>,
}

impl ReferenceCatalog {
    pub fn new(entries: Vec<ReferenceCatalogEntry>) -> Self {
        let mut seen = HashSet::new();
        let mut entries: Vec<_> = entries
            .into_iter()
            .map(|mut e| {
                e.name = e.name.trim().to_string();
                e
            })
            .filter(|e| !e.name.is_empty() && e.price > 0)
            .filter(|e| seen.insert((e.name.clone(), e.price)))
            .collect();
        entries.sort_by(|a, b| b.price.cmp(&a.price));
        let folded_names = entries.iter().map(|e| fold_text(&e.name)).collect();
        Self {
            entries,
            folded_names,
        }
    }

    /// Parses raw feed rows. Rows whose price cannot be read, or that read
    /// no higher than `MIN_CATALOG_PRICE`, are dropped.
    pub fn from_rows(batches: Vec<(PriceSource, Vec<CatalogRow>)>) -> Self {
        let mut entries = Vec::new();
        for (source, rows) in batches {
            let total = rows.len();
            let before = entries.len();
            entries.extend(rows.into_iter().filter_map(|row| {
                let price = parse_price(&row.price).filter(|&p| p > MIN_CATALOG_PRICE)?;
                Some(ReferenceCatalogEntry {
                    name: row.name,
                    price,
                    source,
                })
            }));
            let dropped = total - (entries.len() - before);
            if dropped > 0 {
                warn!("⚠️ {source}: dropped {dropped} of {total} rows with unreadable or implausible prices");
            }
        }
        Self::new(entries)
    }

    pub fn entries(&self) -> &[ReferenceCatalogEntry] {
        &self.entries
    }

    /// Entries paired with their folded names.
    pub fn iter_folded(&self) -> impl Iterator<Item = (&ReferenceCatalogEntry, &str)> {
        self.entries
            .iter()
            .zip(self.folded_names.iter().map(String::as_str))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn status(&self) -> CatalogStatus {
        if self.is_empty() {
            CatalogStatus::Unavailable
        } else {
            CatalogStatus::Available
        }
    }
}

/// Fetches every feed concurrently. A failing feed is logged and skipped;
/// only a catalog with no usable rows at all is an error.
pub async fn load_catalog(feeds: &[Box<dyn CatalogFeed>]) -> Result<ReferenceCatalog, CatalogError> {
    let fetched = join_all(feeds.iter().map(|feed| async move {
        (feed.source(), feed.describe(), feed.fetch_rows().await)
    }))
    .await;

    let mut batches = Vec::new();
    for (source, label, result) in fetched {
        match result {
            Ok(rows) => {
                info!("📥 Loaded {} rows from {label} ({source})", rows.len());
                batches.push((source, rows));
            }
            Err(e) => warn!("Catalog feed {label} failed: {e}"),
        }
    }

    let catalog = ReferenceCatalog::from_rows(batches);
    if catalog.is_empty() {
        return Err(CatalogError::Unavailable);
    }
    info!("📚 Reference catalog ready: {} unique entries", catalog.len());
    Ok(catalog)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(name: &str, price: &str) -> CatalogRow {
        CatalogRow {
            name: name.to_string(),
            price: price.to_string(),
        }
    }

    #[test]
    fn dedups_on_name_and_price_and_sorts_descending() {
        let catalog = ReferenceCatalog::from_rows(vec![
            (
                PriceSource::MechanicNetwork,
                vec![
                    row("پژو 207", "900,000,000"),
                    row(" پژو 207 ", "900000000"),
                    row("سمند", "نامشخص"),
                ],
            ),
            (
                PriceSource::MarketplaceAggregator,
                vec![row("پژو 207", "۹۰۰٬۰۰۰٬۰۰۰"), row("پژو 508", "1.8 میلیارد")],
            ),
        ]);

        let names: Vec<(&str, u64)> = catalog
            .entries()
            .iter()
            .map(|e| (e.name.as_str(), e.price))
            .collect();
        assert_eq!(names, vec![("پژو 508", 1_800_000_000), ("پژو 207", 900_000_000)]);
        assert_eq!(catalog.entries()[1].source, PriceSource::MechanicNetwork);
        assert_eq!(catalog.status(), CatalogStatus::Available);
    }

    #[test]
    fn empty_catalog_is_unavailable() {
        let catalog = ReferenceCatalog::from_rows(vec![]);
        assert!(catalog.is_empty());
        assert_eq!(catalog.status(), CatalogStatus::Unavailable);
    }

    #[test]
    fn short_prices_read_as_millions_and_tiny_ones_are_dropped() {
        let catalog = ReferenceCatalog::from_rows(vec![(
            PriceSource::MarketplaceAggregator,
            vec![
                row("تیبا", "50 هزار"),
                row("ساینا", "950"),
                row("کوییک", "850 تا 900 میلیون"),
                row("شاهین", "1.234.000.000"),
            ],
        )]);
        let names: Vec<(&str, u64)> = catalog
            .entries()
            .iter()
            .map(|e| (e.name.as_str(), e.price))
            .collect();
        assert_eq!(
            names,
            vec![("شاهین", 1_234_000_000), ("ساینا", 950_000_000), ("کوییک", 850_000_000)]
        );
    }

    #[test]
    fn folded_names_follow_entries() {
        let catalog = ReferenceCatalog::from_rows(vec![(
            PriceSource::MechanicNetwork,
            vec![row("Peugeot ۲۰۷", "100"), row("KIA Cerato", "200")],
        )]);
        let folded: Vec<&str> = catalog.iter_folded().map(|(_, n)| n).collect();
        assert_eq!(folded, vec!["kia cerato", "peugeot 207"]);
    }
}
