//! HTTP API handlers for bnbi-dash

pub mod buildinfo;
pub mod cache;
pub mod health;
pub mod listings;
pub mod views;

pub use buildinfo::get_build_info;
pub use cache::invalidate_cache;
pub use health::health_routes;
pub use listings::{get_listings, get_options};
pub use views::{
    get_amenities, get_dashboard, get_investment, get_neighbourhood_rooms, get_price_distribution, get_price_map,
    get_property_groups, get_room_types,
};
