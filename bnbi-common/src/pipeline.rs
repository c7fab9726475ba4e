//! Cleaning pipeline: raw listing table → analysis-ready `ListingTable`
//!
//! Steps run in a fixed order because later steps read the normalized forms
//! produced by earlier ones:
//!
//! 1. Drop the identity column
//! 2. Parse `price` (strip `$` and `,`)
//! 3. Map `instant_bookable` / `host_is_superhost` from "t"/"f"
//! 4. Normalize `room_type` (trim, lower, title)
//! 5. Normalize `property_type` (trim, title)
//! 6. Classify `property_grouped`
//! 7. Fill remaining missing values (numeric 0, boolean false, text "")
//! 8. Sum the amenity block into `amenities_count` (when enabled)
//!
//! Both record backends share this pipeline; they differ only in whether
//! `amenities_count` is computed.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::{ListingRecord, PropertyGroup};
use crate::table::RawTable;
use crate::values::{amenity_value, as_f64, as_text, parse_flag, parse_price, FlagCell, PriceCell};
use crate::{Error, Result};

/// Identity column dropped at load
pub const IDENTITY_COLUMN: &str = "_id";

/// Default amenity block: source columns 32 through 65 inclusive
pub const DEFAULT_AMENITY_START: usize = 32;
pub const DEFAULT_AMENITY_END: usize = 65;

const PRICE: &str = "price";
const ROOM_TYPE: &str = "room_type";
const NEIGHBOURHOOD: &str = "neighbourhood";
const PROPERTY_TYPE: &str = "property_type";
const BEDROOMS: &str = "bedrooms";
const INSTANT_BOOKABLE: &str = "instant_bookable";
const HOST_IS_SUPERHOST: &str = "host_is_superhost";
const LATITUDE: &str = "latitude";
const LONGITUDE: &str = "longitude";
const REVIEW_SCORES_RATING: &str = "review_scores_rating";

/// What to do with a flag cell that is neither "t" nor "f"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagPolicy {
    /// Map to false and report an `UnmappedFlags` warning
    #[default]
    DefaultFalse,
    /// Fail the pipeline run with `Error::UnmappedFlag`
    Reject,
}

/// Which raw columns hold amenity presence flags
///
/// Resolved once per load against the column list (after the identity
/// column is dropped) into a list of column names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AmenitySchema {
    /// Inclusive column index range
    Positional { start: usize, end: usize },
    /// Explicit column names
    Named(Vec<String>),
}

impl Default for AmenitySchema {
    fn default() -> Self {
        AmenitySchema::Positional {
            start: DEFAULT_AMENITY_START,
            end: DEFAULT_AMENITY_END,
        }
    }
}

impl AmenitySchema {
    /// Resolve to (raw column index, column name) pairs
    ///
    /// `columns` are (raw index, name) pairs of the table with the identity
    /// column already removed.
    fn resolve(&self, columns: &[(usize, &str)]) -> (Vec<(usize, String)>, Vec<PipelineWarning>) {
        let mut warnings = Vec::new();
        let resolved = match self {
            AmenitySchema::Positional { start, end } => {
                if *end >= columns.len() {
                    warnings.push(PipelineWarning::AmenityColumnsTruncated {
                        requested_end: *end,
                        available: columns.len(),
                    });
                }
                columns
                    .iter()
                    .enumerate()
                    .filter(|(pos, _)| pos >= start && pos <= end)
                    .map(|(_, (idx, name))| (*idx, name.to_string()))
                    .collect()
            }
            AmenitySchema::Named(names) => names
                .iter()
                .filter_map(|name| {
                    let found = columns.iter().find(|(_, c)| *c == name.as_str());
                    if found.is_none() {
                        warnings.push(PipelineWarning::AmenityColumnMissing(name.clone()));
                    }
                    found.map(|(idx, c)| (*idx, c.to_string()))
                })
                .collect(),
        };
        (resolved, warnings)
    }
}

/// Pipeline options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanOptions {
    /// Column dropped before any other step
    #[serde(default = "default_identity_column")]
    pub identity_column: String,

    /// Compute `amenities_count` from the amenity block
    #[serde(default = "default_compute_amenities")]
    pub compute_amenities_count: bool,

    #[serde(default)]
    pub flag_policy: FlagPolicy,

    #[serde(default)]
    pub amenities: AmenitySchema,
}

fn default_identity_column() -> String {
    IDENTITY_COLUMN.to_string()
}

fn default_compute_amenities() -> bool {
    true
}

impl Default for CleanOptions {
    fn default() -> Self {
        Self {
            identity_column: default_identity_column(),
            compute_amenities_count: default_compute_amenities(),
            flag_policy: FlagPolicy::default(),
            amenities: AmenitySchema::default(),
        }
    }
}

/// Recoverable conditions raised while cleaning
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum PipelineWarning {
    #[error("optional column '{0}' is absent")]
    MissingColumn(String),

    #[error("{count} value(s) in '{column}' were not \"t\"/\"f\" and were mapped to false")]
    UnmappedFlags { column: String, count: usize },

    #[error("{0} row(s) had no price and were filled with 0")]
    MissingPrices(usize),

    #[error("amenity block ends at column {requested_end} but only {available} columns exist")]
    AmenityColumnsTruncated { requested_end: usize, available: usize },

    #[error("amenity column '{0}' is absent")]
    AmenityColumnMissing(String),
}

/// Analysis-ready listing table
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ListingTable {
    pub records: Vec<ListingRecord>,
    /// Names of the resolved amenity columns, aligned with `ListingRecord::amenities`
    pub amenity_columns: Vec<String>,
    /// Raw column names seen at load (identity column excluded)
    pub source_columns: Vec<String>,
    pub warnings: Vec<PipelineWarning>,
}

impl ListingTable {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Whether the source carried a column (optional-column checks)
    pub fn has_column(&self, name: &str) -> bool {
        self.source_columns.iter().any(|c| c == name)
    }

    pub fn has_bedrooms(&self) -> bool {
        self.has_column(BEDROOMS)
    }

    /// Same table metadata over a different record set
    pub fn with_records(&self, records: Vec<ListingRecord>) -> Self {
        Self {
            records,
            amenity_columns: self.amenity_columns.clone(),
            source_columns: self.source_columns.clone(),
            warnings: self.warnings.clone(),
        }
    }

    /// Options that turn `to_raw()` output back into this table
    ///
    /// `to_raw()` does not keep the source column positions, so the amenity
    /// block is pinned to the names resolved on the first pass.
    pub fn reclean_options(&self, options: &CleanOptions) -> CleanOptions {
        CleanOptions {
            amenities: AmenitySchema::Named(self.amenity_columns.clone()),
            ..options.clone()
        }
    }

    /// Render back into a raw table of canonical values
    pub fn to_raw(&self) -> RawTable {
        let mut columns: Vec<String> = [PRICE, ROOM_TYPE, PROPERTY_TYPE, NEIGHBOURHOOD]
            .iter()
            .map(|c| c.to_string())
            .collect();
        if self.has_bedrooms() {
            columns.push(BEDROOMS.to_string());
        }
        columns.extend(
            [INSTANT_BOOKABLE, HOST_IS_SUPERHOST, LATITUDE, LONGITUDE, REVIEW_SCORES_RATING]
                .iter()
                .map(|c| c.to_string()),
        );
        columns.extend(self.amenity_columns.iter().cloned());

        let mut raw = RawTable::new(columns);
        for r in &self.records {
            let mut row = vec![
                json!(r.price),
                json!(r.room_type),
                json!(r.property_type),
                json!(r.neighbourhood),
            ];
            if self.has_bedrooms() {
                row.push(json!(r.bedrooms.unwrap_or(0.0)));
            }
            row.extend([
                json!(r.instant_bookable),
                json!(r.host_is_superhost),
                json!(r.latitude),
                json!(r.longitude),
                json!(r.review_scores_rating),
            ]);
            row.extend(r.amenities.iter().map(|a| json!(a)));
            raw.push_row(row);
        }
        raw
    }
}

/// Title-case each alphabetic run: first letter upper, rest lower
///
/// A letter is capitalized when the preceding character is not a letter,
/// so `"entire home/apt"` becomes `"Entire Home/Apt"`.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_alpha = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}

/// Canonical room type: trimmed, lower-cased, then title-cased
pub fn normalize_room_type(raw: &str) -> String {
    title_case(&raw.trim().to_lowercase())
}

/// Canonical property type: trimmed and title-cased
pub fn normalize_property_type(raw: &str) -> String {
    title_case(raw.trim())
}

/// Clean a raw listing table
///
/// # Errors
/// - `Error::MissingColumn` when `price`, `room_type` or `neighbourhood` is absent
/// - `Error::MalformedPrice` when a price cannot be parsed, is negative, or non-finite
/// - `Error::UnmappedFlag` under `FlagPolicy::Reject`
pub fn clean(raw: &RawTable, options: &CleanOptions) -> Result<ListingTable> {
    // Step 1: identity column excluded from every lookup below
    let columns: Vec<(usize, &str)> = raw
        .columns
        .iter()
        .enumerate()
        .filter(|(_, name)| name.as_str() != options.identity_column)
        .map(|(i, name)| (i, name.as_str()))
        .collect();
    let find = |name: &str| columns.iter().find(|(_, c)| *c == name).map(|(i, _)| *i);

    let required = |name: &str| find(name).ok_or_else(|| Error::MissingColumn(name.to_string()));
    let price_col = required(PRICE)?;
    let room_type_col = required(ROOM_TYPE)?;
    let neighbourhood_col = required(NEIGHBOURHOOD)?;

    let mut warnings = Vec::new();
    let mut optional = |name: &str| {
        let col = find(name);
        if col.is_none() {
            warnings.push(PipelineWarning::MissingColumn(name.to_string()));
        }
        col
    };
    let property_type_col = optional(PROPERTY_TYPE);
    let bedrooms_col = optional(BEDROOMS);
    let instant_bookable_col = optional(INSTANT_BOOKABLE);
    let superhost_col = optional(HOST_IS_SUPERHOST);
    let latitude_col = optional(LATITUDE);
    let longitude_col = optional(LONGITUDE);
    let rating_col = optional(REVIEW_SCORES_RATING);

    let (amenity_cols, amenity_warnings) = options.amenities.resolve(&columns);
    warnings.extend(amenity_warnings);

    let mut missing_prices = 0usize;
    let mut unmapped = [0usize; 2];
    let flag_cols = [(INSTANT_BOOKABLE, instant_bookable_col), (HOST_IS_SUPERHOST, superhost_col)];

    let mut records = Vec::with_capacity(raw.len());
    for row in 0..raw.len() {
        // Step 2
        let price = match parse_price(raw.cell(row, price_col)) {
            PriceCell::Parsed(p) => p,
            PriceCell::Missing => {
                missing_prices += 1;
                0.0
            }
            PriceCell::Malformed(value) => return Err(Error::MalformedPrice { row, value }),
        };

        // Step 3
        let mut flags = [false; 2];
        for (slot, (name, col)) in flag_cols.iter().enumerate() {
            let Some(col) = col else { continue };
            flags[slot] = match parse_flag(raw.cell(row, *col)) {
                FlagCell::Mapped(b) => b,
                FlagCell::Missing => false,
                FlagCell::Unmapped(value) => match options.flag_policy {
                    FlagPolicy::DefaultFalse => {
                        unmapped[slot] += 1;
                        false
                    }
                    FlagPolicy::Reject => {
                        return Err(Error::UnmappedFlag {
                            column: name.to_string(),
                            row,
                            value,
                        })
                    }
                },
            };
        }

        // Steps 4-6
        let room_type = as_text(raw.cell(row, room_type_col))
            .map(|s| normalize_room_type(&s))
            .unwrap_or_default();
        let property_type = property_type_col
            .and_then(|col| as_text(raw.cell(row, col)))
            .map(|s| normalize_property_type(&s))
            .unwrap_or_default();
        let property_grouped = PropertyGroup::classify(&property_type);

        // Step 7
        let neighbourhood = as_text(raw.cell(row, neighbourhood_col)).unwrap_or_default();
        let number = |col: Option<usize>| col.and_then(|c| as_f64(raw.cell(row, c))).unwrap_or(0.0);
        let bedrooms = bedrooms_col.map(|c| as_f64(raw.cell(row, c)).unwrap_or(0.0));

        // Step 8
        let amenities: Vec<f64> = amenity_cols
            .iter()
            .map(|(col, _)| amenity_value(raw.cell(row, *col)))
            .collect();
        let amenities_count = options
            .compute_amenities_count
            .then(|| amenities.iter().sum::<f64>());

        records.push(ListingRecord {
            price,
            room_type,
            property_type,
            property_grouped,
            neighbourhood,
            bedrooms,
            instant_bookable: flags[0],
            host_is_superhost: flags[1],
            latitude: number(latitude_col),
            longitude: number(longitude_col),
            review_scores_rating: number(rating_col),
            amenities,
            amenities_count,
        });
    }

    if missing_prices > 0 {
        warnings.push(PipelineWarning::MissingPrices(missing_prices));
    }
    for (slot, (name, _)) in flag_cols.iter().enumerate() {
        if unmapped[slot] > 0 {
            warnings.push(PipelineWarning::UnmappedFlags {
                column: name.to_string(),
                count: unmapped[slot],
            });
        }
    }
    for warning in &warnings {
        warn!("Cleaning: {}", warning);
    }
    debug!(
        "Cleaned {} listings ({} amenity columns)",
        records.len(),
        amenity_cols.len()
    );

    Ok(ListingTable {
        records,
        amenity_columns: amenity_cols.into_iter().map(|(_, name)| name).collect(),
        source_columns: columns.iter().map(|(_, name)| name.to_string()).collect(),
        warnings,
    })
}
