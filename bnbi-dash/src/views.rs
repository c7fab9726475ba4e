//! Dashboard view computations
//!
//! Every view starts from the base table (cleaned, outliers removed) and
//! returns a [`ViewOutcome`]. Selections left out of a [`DashboardQuery`]
//! fall back to the first sorted option present in the data, except the
//! property group of the investment view which falls back to "All". The
//! distribution view follows the price map's selection.
//!
//! [`render_all`] computes every view for one query. An error or panic in
//! one view becomes that view's `Failed` outcome; the others still render.

use bnbi_common::aggregate::{
    amenity_frequencies, filter_options, price_histogram, price_map as price_points, property_group_counts,
    room_type_counts, rooms_per_neighbourhood, summarize, AmenityFrequency, CategoryCount, HistogramBin, PricePoint,
    RoomTypePivot, DEFAULT_HISTOGRAM_BINS,
};
use bnbi_common::{
    remove_outliers, AreaTable, Error, InvestmentSummary, ListingFilter, ListingRecord, ListingTable,
    PropertyGroup, Result, TargetColumn,
};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::{error, warn};

/// Result of one dashboard view
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "data", rename_all = "snake_case")]
pub enum ViewOutcome<T> {
    Ready(T),
    /// The selection matched no listings
    NoData(String),
    /// A column the view needs is absent from the source
    Unavailable(String),
    /// The view raised an error; other views are unaffected
    Failed(String),
}

impl<T> ViewOutcome<T> {
    pub fn is_ready(&self) -> bool {
        matches!(self, ViewOutcome::Ready(_))
    }
}

/// User selections shared by the dashboard views
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DashboardQuery {
    pub room_type: Option<String>,
    /// A property group name, or "All"
    pub property_group: Option<String>,
    pub bedrooms: Option<f64>,
    pub neighbourhood: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertyGroupsView {
    pub room_type: String,
    pub counts: Vec<CategoryCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceMapView {
    pub room_type: String,
    pub property_group: String,
    pub bedrooms: f64,
    pub points: Vec<PricePoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceDistributionView {
    pub room_type: String,
    pub property_group: String,
    pub bedrooms: f64,
    pub neighbourhood: String,
    pub bins: Vec<HistogramBin>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvestmentView {
    pub room_type: String,
    pub property_group: String,
    pub bedrooms: f64,
    pub summaries: Vec<InvestmentSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AmenitiesView {
    pub room_type: String,
    pub property_group: String,
    pub frequencies: Vec<AmenityFrequency>,
}

/// Every view for one query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub room_types: ViewOutcome<Vec<CategoryCount>>,
    pub property_groups: ViewOutcome<PropertyGroupsView>,
    pub neighbourhood_rooms: ViewOutcome<RoomTypePivot>,
    pub price_map: ViewOutcome<PriceMapView>,
    pub price_distribution: ViewOutcome<PriceDistributionView>,
    pub investment: ViewOutcome<InvestmentView>,
    pub amenities: ViewOutcome<AmenitiesView>,
}

fn no_bedrooms<T>() -> ViewOutcome<T> {
    ViewOutcome::Unavailable("No bedroom information available in this dataset".to_string())
}

fn no_listings<T>(what: &str) -> ViewOutcome<T> {
    ViewOutcome::NoData(format!("No listings match the {} selection", what))
}

/// Explicit selection, or the first sorted room type in `records`
fn room_type_or_first(query: &DashboardQuery, records: &[ListingRecord]) -> Option<String> {
    query
        .room_type
        .clone()
        .or_else(|| filter_options(records).room_types.into_iter().next())
}

fn bedrooms_or_first(query: &DashboardQuery, records: &[ListingRecord]) -> Option<f64> {
    query
        .bedrooms
        .or_else(|| filter_options(records).bedrooms.into_iter().next())
}

/// Explicit group ("All" clears it), or `fallback` when nothing was selected
fn group_selection(query: &DashboardQuery, fallback: Option<PropertyGroup>) -> Result<Option<PropertyGroup>> {
    match query.property_group.as_deref() {
        None => Ok(fallback),
        Some(selection) => PropertyGroup::parse_selection(Some(selection)),
    }
}

fn first_group(records: &[ListingRecord]) -> Option<PropertyGroup> {
    records
        .iter()
        .map(|r| r.property_grouped)
        .min_by_key(|g| g.as_str())
}

fn group_label(group: Option<PropertyGroup>) -> String {
    group.map_or_else(|| "All".to_string(), |g| g.as_str().to_string())
}

/// Listing count per room type
pub fn room_types(base: &ListingTable) -> ViewOutcome<Vec<CategoryCount>> {
    if base.is_empty() {
        return ViewOutcome::NoData("No listings loaded".to_string());
    }
    ViewOutcome::Ready(room_type_counts(&base.records))
}

/// Property group counts within one room type
pub fn property_groups(base: &ListingTable, query: &DashboardQuery) -> ViewOutcome<PropertyGroupsView> {
    let Some(room_type) = room_type_or_first(query, &base.records) else {
        return ViewOutcome::NoData("No listings loaded".to_string());
    };
    let counts = property_group_counts(&base.records, &room_type);
    if counts.is_empty() {
        return no_listings("room type");
    }
    ViewOutcome::Ready(PropertyGroupsView { room_type, counts })
}

/// Neighbourhood by room type pivot
pub fn neighbourhood_rooms(base: &ListingTable) -> ViewOutcome<RoomTypePivot> {
    if base.is_empty() {
        return ViewOutcome::NoData("No listings loaded".to_string());
    }
    ViewOutcome::Ready(rooms_per_neighbourhood(&base.records))
}

/// Mean position and price per neighbourhood for one room type, group and bedroom count
pub fn price_map(base: &ListingTable, query: &DashboardQuery) -> Result<ViewOutcome<PriceMapView>> {
    if !base.has_bedrooms() {
        return Ok(no_bedrooms());
    }
    let Some(room_type) = room_type_or_first(query, &base.records) else {
        return Ok(ViewOutcome::NoData("No listings loaded".to_string()));
    };
    let group = group_selection(query, first_group(&base.records))?;

    let selected = ListingFilter {
        room_type: Some(room_type.clone()),
        property_group: group,
        ..Default::default()
    }
    .apply(&base.records);

    let Some(bedrooms) = bedrooms_or_first(query, &selected) else {
        return Ok(no_listings("room type and property group"));
    };
    let selected = ListingFilter {
        bedrooms: Some(bedrooms),
        ..Default::default()
    }
    .apply(&selected);

    if selected.is_empty() {
        return Ok(no_listings("map"));
    }
    Ok(ViewOutcome::Ready(PriceMapView {
        room_type,
        property_group: group_label(group),
        bedrooms,
        points: price_points(&selected),
    }))
}

/// Price histogram for one neighbourhood
pub fn price_distribution(base: &ListingTable, query: &DashboardQuery) -> Result<ViewOutcome<PriceDistributionView>> {
    if !base.has_bedrooms() {
        return Ok(no_bedrooms());
    }
    let Some(room_type) = room_type_or_first(query, &base.records) else {
        return Ok(ViewOutcome::NoData("No listings loaded".to_string()));
    };
    let group = group_selection(query, first_group(&base.records))?;

    let selected = ListingFilter {
        room_type: Some(room_type.clone()),
        property_group: group,
        ..Default::default()
    }
    .apply(&base.records);

    // Bedroom default comes from the room type and group subset, as in the map
    let Some(bedrooms) = bedrooms_or_first(query, &selected) else {
        return Ok(no_listings("room type and property group"));
    };
    let selected = ListingFilter {
        bedrooms: Some(bedrooms),
        ..Default::default()
    }
    .apply(&selected);

    let neighbourhood = query
        .neighbourhood
        .clone()
        .or_else(|| filter_options(&selected).neighbourhoods.into_iter().next());
    let Some(neighbourhood) = neighbourhood else {
        return Ok(no_listings("distribution"));
    };

    let prices: Vec<f64> = selected
        .iter()
        .filter(|r| r.neighbourhood == neighbourhood)
        .map(|r| r.price)
        .collect();
    if prices.is_empty() {
        return Ok(no_listings("neighbourhood"));
    }

    Ok(ViewOutcome::Ready(PriceDistributionView {
        room_type,
        property_group: group_label(group),
        bedrooms,
        neighbourhood,
        bins: price_histogram(&prices, DEFAULT_HISTOGRAM_BINS),
    }))
}

/// Investment metrics per neighbourhood
///
/// Filter, remove price outliers within the filtered set, then summarize
/// against the area table.
pub fn investment(base: &ListingTable, areas: &AreaTable, query: &DashboardQuery) -> Result<ViewOutcome<InvestmentView>> {
    if !base.has_bedrooms() {
        return Ok(no_bedrooms());
    }
    let Some(room_type) = room_type_or_first(query, &base.records) else {
        return Ok(ViewOutcome::NoData("No listings loaded".to_string()));
    };
    let Some(bedrooms) = bedrooms_or_first(query, &base.records) else {
        return Ok(no_listings("bedroom"));
    };
    let group = group_selection(query, None)?;

    let selected = ListingFilter {
        room_type: Some(room_type.clone()),
        property_group: group,
        bedrooms: Some(bedrooms),
        neighbourhood: None,
    }
    .apply(&base.records);
    let kept = remove_outliers(&selected, TargetColumn::Price);
    if kept.is_empty() {
        return Ok(no_listings("investment"));
    }

    Ok(ViewOutcome::Ready(InvestmentView {
        room_type,
        property_group: group_label(group),
        bedrooms,
        summaries: summarize(&kept, areas),
    }))
}

/// Amenity frequencies for one room type and property group
pub fn amenities(base: &ListingTable, query: &DashboardQuery) -> Result<ViewOutcome<AmenitiesView>> {
    if base.amenity_columns.is_empty() {
        return Ok(ViewOutcome::Unavailable("No amenity columns in this dataset".to_string()));
    }
    let Some(room_type) = room_type_or_first(query, &base.records) else {
        return Ok(ViewOutcome::NoData("No listings loaded".to_string()));
    };
    let group = group_selection(query, first_group(&base.records))?;

    let selected = ListingFilter {
        room_type: Some(room_type.clone()),
        property_group: group,
        ..Default::default()
    }
    .apply(&base.records);
    let frequencies = amenity_frequencies(&selected, &base.amenity_columns);
    if frequencies.is_empty() {
        return Ok(ViewOutcome::NoData(
            "No amenity data available for this combination".to_string(),
        ));
    }

    Ok(ViewOutcome::Ready(AmenitiesView {
        room_type,
        property_group: group_label(group),
        frequencies,
    }))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "view panicked".to_string()
    }
}

/// Run one view, turning an error or panic into `Failed`
pub fn isolate<T, F>(name: &str, view: F) -> ViewOutcome<T>
where
    F: FnOnce() -> Result<ViewOutcome<T>>,
{
    match catch_unwind(AssertUnwindSafe(view)) {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(e)) => {
            warn!("View '{}' failed: {}", name, e);
            ViewOutcome::Failed(e.to_string())
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            error!("View '{}' panicked: {}", name, message);
            ViewOutcome::Failed(message)
        }
    }
}

/// Compute every view; `areas` failing only fails the investment view
pub fn render_all(
    base: &ListingTable,
    areas: std::result::Result<&AreaTable, &Error>,
    query: &DashboardQuery,
) -> DashboardView {
    DashboardView {
        room_types: isolate("room_types", || Ok(room_types(base))),
        property_groups: isolate("property_groups", || Ok(property_groups(base, query))),
        neighbourhood_rooms: isolate("neighbourhood_rooms", || Ok(neighbourhood_rooms(base))),
        price_map: isolate("price_map", || price_map(base, query)),
        price_distribution: isolate("price_distribution", || price_distribution(base, query)),
        investment: isolate("investment", || match areas {
            Ok(areas) => investment(base, areas, query),
            Err(e) => Ok(ViewOutcome::Failed(format!("Area data unavailable: {}", e))),
        }),
        amenities: isolate("amenities", || amenities(base, query)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bnbi_common::{clean, AreaRecord, CleanOptions, RawTable};
    use serde_json::json;

    fn base_table(with_bedrooms: bool) -> ListingTable {
        let mut columns = vec!["price", "room_type", "property_type", "neighbourhood", "review_scores_rating", "wifi", "pool"];
        if with_bedrooms {
            columns.push("bedrooms");
        }
        let mut raw = RawTable::new(columns.into_iter().map(String::from).collect());
        let rows = [
            ("$1,000", "entire home/apt", "Entire condo", "Bang Rak", 4.8, 1, 0, 1),
            ("$1,200", "entire home/apt", "Entire condo", "Bang Rak", 4.6, 1, 1, 1),
            ("$800", "entire home/apt", "Entire rental unit", "Khlong Toei", 4.2, 1, 0, 1),
            ("$500", "private room", "Private room in hostel", "Khlong Toei", 4.0, 0, 0, 1),
        ];
        for (price, room, property, neighbourhood, rating, wifi, pool, bedrooms) in rows {
            let mut row = vec![
                json!(price),
                json!(room),
                json!(property),
                json!(neighbourhood),
                json!(rating),
                json!(wifi),
                json!(pool),
            ];
            if with_bedrooms {
                row.push(json!(bedrooms));
            }
            raw.push_row(row);
        }
        let options = CleanOptions {
            amenities: bnbi_common::pipeline::AmenitySchema::Named(vec!["wifi".into(), "pool".into()]),
            ..Default::default()
        };
        clean(&raw, &options).unwrap()
    }

    fn areas() -> AreaTable {
        AreaTable::from_records(vec![AreaRecord {
            neighbourhood: "Bang Rak".to_string(),
            area_km2: 5.5,
        }])
    }

    #[test]
    fn test_defaults_pick_first_sorted_option() {
        let base = base_table(true);
        let ViewOutcome::Ready(view) = property_groups(&base, &DashboardQuery::default()) else {
            panic!("expected ready view");
        };
        assert_eq!(view.room_type, "Entire Home/Apt");
        assert_eq!(view.counts.iter().map(|c| c.count).sum::<usize>(), 3);
    }

    #[test]
    fn test_investment_view() {
        let base = base_table(true);
        let outcome = investment(&base, &areas(), &DashboardQuery::default()).unwrap();
        let ViewOutcome::Ready(view) = outcome else {
            panic!("expected ready view");
        };
        assert_eq!(view.property_group, "All");
        assert_eq!(view.bedrooms, 1.0);
        assert_eq!(view.summaries.len(), 2);

        let bang_rak = &view.summaries[0];
        assert_eq!(bang_rak.neighbourhood, "Bang Rak");
        assert_eq!(bang_rak.avg_price, 1100.0);
        assert_eq!(bang_rak.room_count, 2);
        assert!((bang_rak.density - 2.0 / 5.5).abs() < 1e-12);

        let khlong_toei = &view.summaries[1];
        assert_eq!(khlong_toei.area_km2, None);
        assert!(khlong_toei.density.is_nan());
    }

    #[test]
    fn test_missing_bedrooms_is_unavailable() {
        let base = base_table(false);
        let query = DashboardQuery::default();
        assert!(matches!(price_map(&base, &query).unwrap(), ViewOutcome::Unavailable(_)));
        assert!(matches!(investment(&base, &areas(), &query).unwrap(), ViewOutcome::Unavailable(_)));
        assert!(room_types(&base).is_ready());
    }

    #[test]
    fn test_empty_selection_is_no_data() {
        let base = base_table(true);
        let query = DashboardQuery {
            room_type: Some("Shared Room".to_string()),
            ..Default::default()
        };
        assert!(matches!(investment(&base, &areas(), &query).unwrap(), ViewOutcome::NoData(_)));
        assert!(matches!(price_distribution(&base, &query).unwrap(), ViewOutcome::NoData(_)));
    }

    #[test]
    fn test_amenities_view() {
        let base = base_table(true);
        let ViewOutcome::Ready(view) = amenities(&base, &DashboardQuery::default()).unwrap() else {
            panic!("expected ready view");
        };
        assert_eq!(view.property_group, "Condo");
        let labels: Vec<&str> = view.frequencies.iter().map(|f| f.label.as_str()).collect();
        assert_eq!(labels, vec!["Wifi", "Pool"]);
    }

    #[test]
    fn test_price_distribution_view() {
        let base = base_table(true);
        let query = DashboardQuery {
            neighbourhood: Some("Bang Rak".to_string()),
            ..Default::default()
        };
        let ViewOutcome::Ready(view) = price_distribution(&base, &query).unwrap() else {
            panic!("expected ready view");
        };
        assert_eq!(view.bins.iter().map(|b| b.count).sum::<usize>(), 2);
    }

    #[test]
    fn test_price_distribution_follows_map_selection() {
        let base = base_table(true);
        let query = DashboardQuery::default();
        let ViewOutcome::Ready(map) = price_map(&base, &query).unwrap() else {
            panic!("expected ready map");
        };
        let ViewOutcome::Ready(view) = price_distribution(&base, &query).unwrap() else {
            panic!("expected ready view");
        };
        assert_eq!(view.property_group, "Condo");
        assert_eq!(view.property_group, map.property_group);
        assert_eq!(view.bedrooms, map.bedrooms);
        assert_eq!(view.neighbourhood, "Bang Rak");

        let all = DashboardQuery {
            property_group: Some("All".to_string()),
            ..Default::default()
        };
        let ViewOutcome::Ready(view) = price_distribution(&base, &all).unwrap() else {
            panic!("expected ready view");
        };
        assert_eq!(view.property_group, "All");
    }

    #[test]
    fn test_invalid_group_fails_only_that_view() {
        let base = base_table(true);
        let query = DashboardQuery {
            property_group: Some("Castle".to_string()),
            ..Default::default()
        };
        let dashboard = render_all(&base, Ok(&areas()), &query);
        assert!(matches!(dashboard.investment, ViewOutcome::Failed(_)));
        assert!(matches!(dashboard.price_map, ViewOutcome::Failed(_)));
        assert!(dashboard.room_types.is_ready());
        assert!(dashboard.neighbourhood_rooms.is_ready());
    }

    #[test]
    fn test_isolate_captures_panic() {
        let outcome: ViewOutcome<()> = isolate("boom", || panic!("chart exploded"));
        assert_eq!(outcome, ViewOutcome::Failed("chart exploded".to_string()));
    }

    #[test]
    fn test_area_failure_only_fails_investment() {
        let base = base_table(true);
        let err = Error::Source("area table unreachable".into());
        let dashboard = render_all(&base, Err(&err), &DashboardQuery::default());
        assert!(matches!(dashboard.investment, ViewOutcome::Failed(_)));
        assert!(dashboard.price_map.is_ready());
        assert!(dashboard.amenities.is_ready());
    }

    #[test]
    fn test_outcome_serialization() {
        let ready: ViewOutcome<u32> = ViewOutcome::Ready(3);
        assert_eq!(serde_json::to_value(&ready).unwrap(), json!({"status": "ready", "data": 3}));
        let none: ViewOutcome<u32> = ViewOutcome::NoData("empty".into());
        assert_eq!(serde_json::to_value(&none).unwrap(), json!({"status": "no_data", "data": "empty"}));
    }
}
