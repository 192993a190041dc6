// Storage module: persistence of sale feedback and batch statistics.

pub mod sqlite;

pub use sqlite::FeedbackStore;
