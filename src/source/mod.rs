// Input/output adapters: catalog feeds, ad exports, reports.

pub mod json_file;
pub mod traits;

pub use json_file::{read_ads, read_feedback, write_report, AdBatch, JsonFileFeed};
pub use traits::CatalogFeed;
