//! User filter selections narrowing the listing table

use serde::{Deserialize, Serialize};

use crate::models::{ListingRecord, PropertyGroup};

/// Dashboard filter selection; `None` fields do not restrict
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListingFilter {
    pub room_type: Option<String>,
    pub property_group: Option<PropertyGroup>,
    pub bedrooms: Option<f64>,
    pub neighbourhood: Option<String>,
}

impl ListingFilter {
    pub fn matches(&self, record: &ListingRecord) -> bool {
        self.room_type.as_deref().map_or(true, |rt| record.room_type == rt)
            && self.property_group.map_or(true, |g| record.property_grouped == g)
            && self.bedrooms.map_or(true, |b| record.bedrooms == Some(b))
            && self
                .neighbourhood
                .as_deref()
                .map_or(true, |n| record.neighbourhood == n)
    }

    /// Matching records, in input order
    pub fn apply(&self, records: &[ListingRecord]) -> Vec<ListingRecord> {
        records.iter().filter(|r| self.matches(r)).cloned().collect()
    }
}
