//! Used-car price estimation for Persian classified ads.
//!
//! Ads are parsed into vehicle attributes and condition issues, matched
//! against a reference price catalog and priced by depreciating the
//! catalog price for age, mileage and defects.

pub mod analyzer;
pub mod catalog;
pub mod config;
pub mod matcher;
pub mod model;
pub mod normalizer;
pub mod parser;
pub mod pipeline;
pub mod source;
pub mod storage;
