//! Bootstrap configuration for bnbi-dash
//!
//! Loaded once at startup from TOML. Sources of the configuration file, in
//! priority order:
//!
//! 1. `--config` command-line argument
//! 2. `BNBI_CONFIG` environment variable
//! 3. `<config dir>/bnbi/bnbi-dash.toml`
//! 4. Built-in defaults
//!
//! ```toml
//! port = 5730
//!
//! [logging]
//! level = "info"
//!
//! [listings]
//! backend = "analytical"   # or "document"
//!
//! [analytical]
//! database_path = "db/airbnb.db"
//! listings_table = "airbnb"
//! area_table = "att_bkk"
//!
//! [document]
//! path = "data/listings.json"   # or url = "http://..."
//!
//! [cleaning]
//! flag_policy = "default_false"
//! amenities = { start = 32, end = 65 }
//!
//! [cache]
//! ttl_secs = 3600
//! ```

use bnbi_common::config::LoggingConfig;
use bnbi_common::pipeline::{AmenitySchema, FlagPolicy, IDENTITY_COLUMN};
use bnbi_common::CleanOptions;
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Configuration file name looked up in the bnbi config directory
pub const CONFIG_FILE_NAME: &str = "bnbi-dash.toml";

/// Which record store supplies listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Document store export (JSON array or newline-delimited JSON)
    Document,
    /// Analytical SQL store
    #[default]
    Analytical,
}

impl Backend {
    /// Whether this backend computes `amenities_count` unless configured otherwise
    pub fn computes_amenities_count(&self) -> bool {
        matches!(self, Backend::Document)
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Document => f.write_str("document"),
            Backend::Analytical => f.write_str("analytical"),
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DashConfig {
    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// HTTP bind address
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub listings: ListingsConfig,

    #[serde(default)]
    pub analytical: AnalyticalConfig,

    #[serde(default)]
    pub document: DocumentConfig,

    #[serde(default)]
    pub cleaning: CleaningConfig,

    #[serde(default)]
    pub cache: CacheConfig,
}

impl Default for DashConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            logging: LoggingConfig::default(),
            listings: ListingsConfig::default(),
            analytical: AnalyticalConfig::default(),
            document: DocumentConfig::default(),
            cleaning: CleaningConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

fn default_port() -> u16 {
    5730
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListingsConfig {
    #[serde(default)]
    pub backend: Backend,
}

/// Analytical store location and table names
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyticalConfig {
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    #[serde(default = "default_listings_table")]
    pub listings_table: String,

    /// Area reference table (`neighbourhood`, `area_km2`)
    #[serde(default = "default_area_table")]
    pub area_table: String,
}

impl Default for AnalyticalConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            listings_table: default_listings_table(),
            area_table: default_area_table(),
        }
    }
}

fn default_database_path() -> PathBuf {
    PathBuf::from("db/airbnb.db")
}

fn default_listings_table() -> String {
    "airbnb".to_string()
}

fn default_area_table() -> String {
    "att_bkk".to_string()
}

/// Document store export location; `path` wins when both are set
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DocumentConfig {
    #[serde(default)]
    pub path: Option<PathBuf>,

    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CleaningConfig {
    #[serde(default = "default_identity_column")]
    pub identity_column: String,

    /// Overrides the backend default for `amenities_count`
    #[serde(default)]
    pub compute_amenities_count: Option<bool>,

    #[serde(default)]
    pub flag_policy: FlagPolicy,

    #[serde(default)]
    pub amenities: AmenitySchema,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            identity_column: default_identity_column(),
            compute_amenities_count: None,
            flag_policy: FlagPolicy::default(),
            amenities: AmenitySchema::default(),
        }
    }
}

fn default_identity_column() -> String {
    IDENTITY_COLUMN.to_string()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CacheConfig {
    /// Reload tables older than this; unset means manual invalidation only
    #[serde(default)]
    pub ttl_secs: Option<u64>,
}

impl CacheConfig {
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl_secs.map(Duration::from_secs)
    }
}

impl DashConfig {
    /// Pipeline options for the configured listings backend
    pub fn clean_options(&self) -> CleanOptions {
        let backend = self.listings.backend;
        CleanOptions {
            identity_column: self.cleaning.identity_column.clone(),
            compute_amenities_count: self
                .cleaning
                .compute_amenities_count
                .unwrap_or_else(|| backend.computes_amenities_count()),
            flag_policy: self.cleaning.flag_policy,
            amenities: self.cleaning.amenities.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config: DashConfig = toml::from_str("").unwrap();
        assert_eq!(config.port, 5730);
        assert_eq!(config.listings.backend, Backend::Analytical);
        assert_eq!(config.analytical.listings_table, "airbnb");
        assert_eq!(config.analytical.area_table, "att_bkk");
        assert!(config.cache.ttl().is_none());
        assert_eq!(
            config.cleaning.amenities,
            AmenitySchema::Positional { start: 32, end: 65 }
        );
    }

    #[test]
    fn test_backend_decides_amenities_count() {
        let analytical = DashConfig::default();
        assert!(!analytical.clean_options().compute_amenities_count);

        let document: DashConfig = toml::from_str("[listings]\nbackend = \"document\"\n").unwrap();
        assert!(document.clean_options().compute_amenities_count);

        let forced: DashConfig =
            toml::from_str("[cleaning]\ncompute_amenities_count = true\n").unwrap();
        assert!(forced.clean_options().compute_amenities_count);
    }

    #[test]
    fn test_named_amenities_and_policy() {
        let config: DashConfig = toml::from_str(
            "[cleaning]\nflag_policy = \"reject\"\namenities = [\"wifi\", \"pool\"]\n[cache]\nttl_secs = 60\n",
        )
        .unwrap();
        assert_eq!(config.cleaning.flag_policy, FlagPolicy::Reject);
        assert_eq!(
            config.cleaning.amenities,
            AmenitySchema::Named(vec!["wifi".into(), "pool".into()])
        );
        assert_eq!(config.cache.ttl(), Some(Duration::from_secs(60)));
    }
}
