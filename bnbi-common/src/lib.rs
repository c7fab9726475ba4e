//! # bnbi Common Library
//!
//! Shared code for the bnbi rental-investment analytics services:
//! - Raw table model returned by record sources
//! - Listing, area and investment summary models
//! - Cleaning pipeline (price parsing, normalization, classification)
//! - Grouped IQR outlier filter
//! - Aggregations feeding the dashboard views
//! - Configuration loading
//! - Read-only analytical store access (feature `sqlx`)

pub mod aggregate;
pub mod config;
#[cfg(feature = "sqlx")]
pub mod db;
pub mod error;
pub mod filter;
pub mod models;
pub mod outliers;
pub mod pipeline;
pub mod table;
pub mod values;

pub use error::{Error, Result};
pub use filter::ListingFilter;
pub use models::{AreaRecord, AreaTable, InvestmentSummary, ListingRecord, PropertyGroup};
pub use outliers::{remove_outliers, TargetColumn};
pub use pipeline::{clean, CleanOptions, ListingTable, PipelineWarning};
pub use table::RawTable;
