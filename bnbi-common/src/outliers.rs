//! Grouped IQR outlier removal
//!
//! Rows are partitioned by (neighbourhood, room_type, property_grouped,
//! bedrooms). Within each group, rows whose target value falls outside
//! [Q1 - 1.5·IQR, Q3 + 1.5·IQR] are discarded. A row's outlier status is only
//! meaningful inside its group.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::models::{ListingRecord, PropertyGroup};

/// Fence multiplier applied to the interquartile range
pub const IQR_FENCE: f64 = 1.5;

/// Column the outlier fences are computed on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetColumn {
    #[default]
    Price,
    ReviewScoresRating,
    AmenitiesCount,
}

impl TargetColumn {
    /// Target value of a record; `None` when undefined or non-finite
    pub fn value(&self, record: &ListingRecord) -> Option<f64> {
        let v = match self {
            TargetColumn::Price => Some(record.price),
            TargetColumn::ReviewScoresRating => Some(record.review_scores_rating),
            TargetColumn::AmenitiesCount => record.amenities_count,
        }?;
        v.is_finite().then_some(v)
    }
}

/// Composite grouping key
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct GroupKey<'a> {
    neighbourhood: &'a str,
    room_type: &'a str,
    property_grouped: PropertyGroup,
    bedrooms: Option<u64>,
}

impl<'a> GroupKey<'a> {
    fn of(record: &'a ListingRecord) -> Self {
        Self {
            neighbourhood: &record.neighbourhood,
            room_type: &record.room_type,
            property_grouped: record.property_grouped,
            // +0.0 folds -0.0 into 0.0 so both land in one group
            bedrooms: record.bedrooms.map(|b| (b + 0.0).to_bits()),
        }
    }
}

/// Percentile of sorted values with linear interpolation between ranks
pub fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let idx = q * (sorted.len() - 1) as f64;
    let lo = idx.floor() as usize;
    let hi = idx.ceil() as usize;
    if lo == hi {
        Some(sorted[lo])
    } else {
        let frac = idx - lo as f64;
        Some(sorted[lo] * (1.0 - frac) + sorted[hi] * frac)
    }
}

/// Inclusive outlier fences for one group
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IqrBounds {
    pub q1: f64,
    pub q3: f64,
    pub lower: f64,
    pub upper: f64,
}

impl IqrBounds {
    /// Fences over a set of values; `None` when no value is finite
    pub fn from_values(values: &[f64]) -> Option<Self> {
        let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        sorted.sort_by(|a, b| a.total_cmp(b));

        let q1 = quantile(&sorted, 0.25)?;
        let q3 = quantile(&sorted, 0.75)?;
        let iqr = q3 - q1;
        Some(Self {
            q1,
            q3,
            lower: q1 - IQR_FENCE * iqr,
            upper: q3 + IQR_FENCE * iqr,
        })
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && value <= self.upper
    }
}

/// Remove outliers per composite group
///
/// Pure: the input is not modified. Rows with an undefined target are
/// dropped, so a group with no defined target contributes nothing. The
/// output concatenates groups in key order and keeps input order inside a
/// group; callers must not rely on any particular order across groups.
pub fn remove_outliers(records: &[ListingRecord], target: TargetColumn) -> Vec<ListingRecord> {
    let mut groups: BTreeMap<GroupKey<'_>, Vec<&ListingRecord>> = BTreeMap::new();
    for record in records {
        groups.entry(GroupKey::of(record)).or_default().push(record);
    }

    let group_count = groups.len();
    let mut kept = Vec::with_capacity(records.len());
    for members in groups.into_values() {
        let values: Vec<f64> = members.iter().filter_map(|r| target.value(r)).collect();
        let Some(bounds) = IqrBounds::from_values(&values) else {
            continue;
        };
        kept.extend(
            members
                .into_iter()
                .filter(|r| target.value(r).is_some_and(|v| bounds.contains(v)))
                .cloned(),
        );
    }

    debug!(
        "Outlier filter on {:?}: kept {} of {} rows across {} groups",
        target,
        kept.len(),
        records.len(),
        group_count
    );
    kept
}
