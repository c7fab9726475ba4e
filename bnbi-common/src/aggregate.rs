//! Aggregations over cleaned listings
//!
//! `summarize` produces the investment metrics; the remaining functions feed
//! the distribution, map and amenity views. All of them return an empty
//! result for empty input rather than an error.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::models::{AreaTable, InvestmentSummary, ListingRecord, PropertyGroup};
use crate::pipeline::title_case;

/// Default number of bins for price histograms
pub const DEFAULT_HISTOGRAM_BINS: usize = 50;

#[derive(Default)]
struct Accum {
    price_sum: f64,
    rating_sum: f64,
    count: usize,
}

/// Per-neighbourhood investment metrics
///
/// Groups by neighbourhood (sorted), averages price and rating, counts rows,
/// left-joins the area table and divides count by area. Unmatched
/// neighbourhoods keep `area_km2 = None` and a NaN density; a zero area gives
/// an infinite density.
pub fn summarize(records: &[ListingRecord], areas: &AreaTable) -> Vec<InvestmentSummary> {
    let mut groups: BTreeMap<&str, Accum> = BTreeMap::new();
    for r in records {
        let acc = groups.entry(r.neighbourhood.as_str()).or_default();
        acc.price_sum += r.price;
        acc.rating_sum += r.review_scores_rating;
        acc.count += 1;
    }

    groups
        .into_iter()
        .map(|(neighbourhood, acc)| {
            let area_km2 = areas.get(neighbourhood);
            let n = acc.count as f64;
            InvestmentSummary {
                neighbourhood: neighbourhood.to_string(),
                avg_price: acc.price_sum / n,
                avg_rating: acc.rating_sum / n,
                room_count: acc.count,
                area_km2,
                density: n / area_km2.unwrap_or(f64::NAN),
            }
        })
        .collect()
}

/// Count of listings for one category label
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    pub label: String,
    pub count: usize,
}

fn ranked_counts<'a, I>(labels: I) -> Vec<CategoryCount>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for label in labels {
        *counts.entry(label).or_default() += 1;
    }
    let mut ranked: Vec<CategoryCount> = counts
        .into_iter()
        .map(|(label, count)| CategoryCount {
            label: label.to_string(),
            count,
        })
        .collect();
    // Descending count; the BTreeMap already ordered ties by label
    ranked.sort_by(|a, b| b.count.cmp(&a.count));
    ranked
}

/// Listing count per room type, most common first
pub fn room_type_counts(records: &[ListingRecord]) -> Vec<CategoryCount> {
    ranked_counts(records.iter().map(|r| r.room_type.as_str()))
}

/// Property group counts within one room type, most common first
pub fn property_group_counts(records: &[ListingRecord], room_type: &str) -> Vec<CategoryCount> {
    ranked_counts(
        records
            .iter()
            .filter(|r| r.room_type == room_type)
            .map(|r| r.property_grouped.as_str()),
    )
}

/// Room counts for one neighbourhood, aligned with `RoomTypePivot::room_types`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NeighbourhoodRooms {
    pub neighbourhood: String,
    pub counts: Vec<usize>,
}

/// Neighbourhood × room type listing counts, zero-filled
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RoomTypePivot {
    pub room_types: Vec<String>,
    pub rows: Vec<NeighbourhoodRooms>,
}

pub fn rooms_per_neighbourhood(records: &[ListingRecord]) -> RoomTypePivot {
    let room_types: Vec<String> = records
        .iter()
        .map(|r| r.room_type.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut by_neighbourhood: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for r in records {
        let counts = by_neighbourhood
            .entry(r.neighbourhood.as_str())
            .or_insert_with(|| vec![0; room_types.len()]);
        if let Ok(i) = room_types.binary_search(&r.room_type) {
            counts[i] += 1;
        }
    }

    RoomTypePivot {
        rows: by_neighbourhood
            .into_iter()
            .map(|(neighbourhood, counts)| NeighbourhoodRooms {
                neighbourhood: neighbourhood.to_string(),
                counts,
            })
            .collect(),
        room_types,
    }
}

/// Mean position and price of one neighbourhood
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PricePoint {
    pub neighbourhood: String,
    pub latitude: f64,
    pub longitude: f64,
    pub avg_price: f64,
}

/// Per-neighbourhood mean latitude, longitude and price
pub fn price_map(records: &[ListingRecord]) -> Vec<PricePoint> {
    let mut groups: BTreeMap<&str, (f64, f64, f64, usize)> = BTreeMap::new();
    for r in records {
        let g = groups.entry(r.neighbourhood.as_str()).or_default();
        g.0 += r.latitude;
        g.1 += r.longitude;
        g.2 += r.price;
        g.3 += 1;
    }

    groups
        .into_iter()
        .map(|(neighbourhood, (lat, lon, price, count))| {
            let n = count as f64;
            PricePoint {
                neighbourhood: neighbourhood.to_string(),
                latitude: lat / n,
                longitude: lon / n,
                avg_price: price / n,
            }
        })
        .collect()
}

/// One histogram bin, `[start, end)` except the last bin which includes `end`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBin {
    pub start: f64,
    pub end: f64,
    pub count: usize,
}

/// Equal-width histogram between the minimum and maximum value
///
/// Non-finite values are ignored. When every value is equal a single bin
/// holds them all.
pub fn price_histogram(values: &[f64], bins: usize) -> Vec<HistogramBin> {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() || bins == 0 {
        return Vec::new();
    }

    let min = finite.iter().copied().fold(f64::INFINITY, f64::min);
    let max = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if min == max {
        return vec![HistogramBin {
            start: min,
            end: max,
            count: finite.len(),
        }];
    }

    let width = (max - min) / bins as f64;
    let mut counts = vec![0usize; bins];
    for v in finite {
        let idx = (((v - min) / width).floor() as usize).min(bins - 1);
        counts[idx] += 1;
    }

    counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| HistogramBin {
            start: min + width * i as f64,
            end: if i + 1 == bins { max } else { min + width * (i + 1) as f64 },
            count,
        })
        .collect()
}

/// Summed presence of one amenity across a listing subset
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AmenityFrequency {
    pub amenity: String,
    pub label: String,
    pub count: f64,
}

/// Amenity frequencies in column order, only amenities present at least once
///
/// Labels are the column names with underscores replaced by spaces and
/// title-cased (`air_conditioning` → `Air Conditioning`).
pub fn amenity_frequencies(records: &[ListingRecord], amenity_columns: &[String]) -> Vec<AmenityFrequency> {
    amenity_columns
        .iter()
        .enumerate()
        .filter_map(|(i, column)| {
            let count: f64 = records
                .iter()
                .map(|r| r.amenities.get(i).copied().unwrap_or(0.0))
                .sum();
            (count > 0.0).then(|| AmenityFrequency {
                amenity: column.clone(),
                label: title_case(&column.replace('_', " ")),
                count,
            })
        })
        .collect()
}

/// Choices offered by the dashboard filter widgets
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FilterOptions {
    pub room_types: Vec<String>,
    pub property_groups: Vec<String>,
    pub bedrooms: Vec<f64>,
    pub neighbourhoods: Vec<String>,
}

/// Sorted unique filter values; missing bedrooms are left out
pub fn filter_options(records: &[ListingRecord]) -> FilterOptions {
    let room_types: BTreeSet<&str> = records.iter().map(|r| r.room_type.as_str()).collect();
    let groups: BTreeSet<&str> = records.iter().map(|r| r.property_grouped.as_str()).collect();
    let neighbourhoods: BTreeSet<&str> = records.iter().map(|r| r.neighbourhood.as_str()).collect();

    let mut bedrooms: Vec<f64> = records.iter().filter_map(|r| r.bedrooms).collect();
    bedrooms.sort_by(|a, b| a.total_cmp(b));
    bedrooms.dedup();

    FilterOptions {
        room_types: room_types.into_iter().map(String::from).collect(),
        property_groups: groups.into_iter().map(String::from).collect(),
        bedrooms,
        neighbourhoods: neighbourhoods.into_iter().map(String::from).collect(),
    }
}

/// Property group choices for the investment view: "All" followed by the groups present
pub fn investment_property_options(records: &[ListingRecord]) -> Vec<String> {
    let groups: BTreeSet<PropertyGroup> = records.iter().map(|r| r.property_grouped).collect();
    let mut names: Vec<String> = groups.iter().map(|g| g.as_str().to_string()).collect();
    names.sort();
    names.insert(0, "All".to_string());
    names
}
