//! Listing, area and investment summary models

use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::warn;

use crate::table::RawTable;
use crate::values::{as_f64, as_text};
use crate::{Error, Result};

/// Coarse property classification derived from free-text property type
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PropertyGroup {
    Apartment,
    House,
    Condo,
    Hotel,
    Hostel,
    Other,
}

impl PropertyGroup {
    /// Every group, in classification order
    pub const ALL: [PropertyGroup; 6] = [
        PropertyGroup::Apartment,
        PropertyGroup::House,
        PropertyGroup::Condo,
        PropertyGroup::Hotel,
        PropertyGroup::Hostel,
        PropertyGroup::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyGroup::Apartment => "Apartment",
            PropertyGroup::House => "House",
            PropertyGroup::Condo => "Condo",
            PropertyGroup::Hotel => "Hotel",
            PropertyGroup::Hostel => "Hostel",
            PropertyGroup::Other => "Other",
        }
    }

    /// Classify a property type by case-insensitive substring match
    ///
    /// Rules are evaluated in order and the first match wins:
    /// apartment, house, condominium/condo, hotel, hostel, otherwise Other.
    pub fn classify(property_type: &str) -> Self {
        let lower = property_type.to_lowercase();
        if lower.contains("apartment") {
            PropertyGroup::Apartment
        } else if lower.contains("house") {
            PropertyGroup::House
        } else if lower.contains("condominium") || lower.contains("condo") {
            PropertyGroup::Condo
        } else if lower.contains("hotel") {
            PropertyGroup::Hotel
        } else if lower.contains("hostel") {
            PropertyGroup::Hostel
        } else {
            PropertyGroup::Other
        }
    }

    /// Parse a dashboard selection where "All" means no restriction
    pub fn parse_selection(selection: Option<&str>) -> Result<Option<Self>> {
        match selection.map(str::trim) {
            None | Some("") => Ok(None),
            Some(s) if s.eq_ignore_ascii_case("all") => Ok(None),
            Some(s) => s.parse().map(Some),
        }
    }
}

impl fmt::Display for PropertyGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PropertyGroup {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        PropertyGroup::ALL
            .into_iter()
            .find(|g| g.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::InvalidInput(format!("Unknown property group: {}", s)))
    }
}

/// One cleaned short-term-rental listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingRecord {
    pub price: f64,
    pub room_type: String,
    pub property_type: String,
    pub property_grouped: PropertyGroup,
    pub neighbourhood: String,
    /// `None` only when the source has no bedrooms column at all
    pub bedrooms: Option<f64>,
    pub instant_bookable: bool,
    pub host_is_superhost: bool,
    pub latitude: f64,
    pub longitude: f64,
    pub review_scores_rating: f64,
    /// Amenity presence values, aligned with `ListingTable::amenity_columns`
    pub amenities: Vec<f64>,
    /// Row-wise amenity sum, computed only when the pipeline is asked to
    pub amenities_count: Option<f64>,
}

/// Land area of one neighbourhood
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaRecord {
    pub neighbourhood: String,
    pub area_km2: f64,
}

/// Static area reference data keyed by neighbourhood
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AreaTable {
    areas: BTreeMap<String, f64>,
}

impl AreaTable {
    /// Build from records; a repeated neighbourhood keeps its first area
    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = AreaRecord>,
    {
        let mut areas = BTreeMap::new();
        for record in records {
            if areas.contains_key(&record.neighbourhood) {
                warn!(
                    "Duplicate area row for neighbourhood '{}', keeping the first",
                    record.neighbourhood
                );
                continue;
            }
            areas.insert(record.neighbourhood, record.area_km2);
        }
        Self { areas }
    }

    /// Build from a raw `neighbourhood`/`area_km2` table
    ///
    /// Rows with a missing or non-numeric area are skipped, so those
    /// neighbourhoods join as unmatched.
    pub fn from_raw(raw: &RawTable) -> Result<Self> {
        let name_col = raw
            .column_index("neighbourhood")
            .ok_or_else(|| Error::MissingColumn("neighbourhood".to_string()))?;
        let area_col = raw
            .column_index("area_km2")
            .ok_or_else(|| Error::MissingColumn("area_km2".to_string()))?;

        let mut skipped = 0usize;
        let records: Vec<AreaRecord> = (0..raw.len())
            .filter_map(|row| {
                let neighbourhood = as_text(raw.cell(row, name_col))?;
                match as_f64(raw.cell(row, area_col)) {
                    Some(area_km2) => Some(AreaRecord {
                        neighbourhood,
                        area_km2,
                    }),
                    None => {
                        skipped += 1;
                        None
                    }
                }
            })
            .collect();

        if skipped > 0 {
            warn!("Skipped {} area rows without a numeric area_km2", skipped);
        }

        Ok(Self::from_records(records))
    }

    pub fn get(&self, neighbourhood: &str) -> Option<f64> {
        self.areas.get(neighbourhood).copied()
    }

    pub fn len(&self) -> usize {
        self.areas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.areas.is_empty()
    }
}

/// Per-neighbourhood investment metrics for one filter combination
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvestmentSummary {
    pub neighbourhood: String,
    pub avg_price: f64,
    pub avg_rating: f64,
    pub room_count: usize,
    /// `None` when the neighbourhood has no area reference row
    pub area_km2: Option<f64>,
    /// Listings per km²; non-finite when the area is zero or missing
    #[serde(serialize_with = "finite_or_null")]
    pub density: f64,
}

fn finite_or_null<S: Serializer>(value: &f64, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    if value.is_finite() {
        serializer.serialize_f64(*value)
    } else {
        serializer.serialize_none()
    }
}
