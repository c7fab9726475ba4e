//! Integration tests for bnbi-dash API endpoints
//!
//! Tests cover:
//! - Health and build info
//! - Listing browsing with filters and pagination
//! - Filter options
//! - Single views and the isolated dashboard
//! - Investment density against the area table
//! - Cache invalidation picking up changed source data
//! - Data-integrity failures surfacing as 422

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use bnbi_common::pipeline::AmenitySchema;
use bnbi_common::CleanOptions;
use bnbi_dash::loader::Dataset;
use bnbi_dash::source::{AnalyticalSource, DocumentSource, RecordSource};
use bnbi_dash::{build_router, AppState};
use serde_json::{json, Value};
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tower::util::ServiceExt; // for `oneshot` method

/// Test helper: One listing document as exported by the document store
fn listing(price: &str, room_type: &str, property_type: &str, neighbourhood: &str, bedrooms: u32) -> Value {
    json!({
        "_id": {"$oid": format!("{}-{}", neighbourhood, price)},
        "price": price,
        "instant_bookable": "t",
        "host_is_superhost": "f",
        "room_type": room_type,
        "property_type": property_type,
        "bedrooms": bedrooms,
        "neighbourhood": neighbourhood,
        "latitude": 13.72,
        "longitude": 100.52,
        "review_scores_rating": 4.5,
        "wifi": 1,
        "pool": 0,
    })
}

fn sample_listings() -> Vec<Value> {
    vec![
        listing("$1,000.00", "entire home/apt", "Entire condo", "Bang Rak", 1),
        listing("$1,100.00", "entire home/apt", "Entire condo", "Bang Rak", 1),
        listing("$1,200.00", "entire home/apt", "Entire condo", "Bang Rak", 1),
        listing("$900.00", "entire home/apt", "Entire rental unit", "Khlong Toei", 1),
        listing("$400.00", "private room", "Private room in hostel", "Sathon", 1),
    ]
}

fn write_documents(path: &Path, docs: &[Value]) {
    std::fs::write(path, serde_json::to_string(docs).unwrap()).unwrap();
}

fn clean_options() -> CleanOptions {
    CleanOptions {
        compute_amenities_count: true,
        amenities: AmenitySchema::Named(vec!["wifi".to_string(), "pool".to_string()]),
        ..Default::default()
    }
}

/// Test helper: SQLite analytical store with listings and area tables
async fn create_analytical_db(dir: &Path) -> PathBuf {
    let db_path = dir.join("airbnb.db");
    let url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePool::connect(&url).await.expect("Should create fixture db");

    sqlx::query(
        "CREATE TABLE airbnb (
            _id TEXT, price TEXT, instant_bookable TEXT, host_is_superhost TEXT,
            room_type TEXT, property_type TEXT, bedrooms INTEGER, neighbourhood TEXT,
            latitude REAL, longitude REAL, review_scores_rating REAL
        )",
    )
    .execute(&pool)
    .await
    .unwrap();
    sqlx::query(
        "INSERT INTO airbnb VALUES
            ('a1', '$1,200.50', 't', 'f', ' entire home ', 'Condominium', 2, 'Bang Rak', 13.7, 100.5, 4.9),
            ('a2', '$80.00', 'f', 't', 'private room', 'Room in hostel', 1, 'Sathon', 13.8, 100.6, 4.1)",
    )
    .execute(&pool)
    .await
    .unwrap();

    sqlx::query("CREATE TABLE att_bkk (neighbourhood TEXT, area_km2 REAL)")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query("INSERT INTO att_bkk VALUES ('Bang Rak', 5.5), ('Khlong Toei', 0.0), ('Sathon', 9.3)")
        .execute(&pool)
        .await
        .unwrap();

    pool.close().await;
    db_path
}

/// Test helper: App over a document file, with area data from the analytical fixture
async fn setup_document_app(dir: &TempDir, docs: &[Value]) -> (Router, PathBuf) {
    let docs_path = dir.path().join("listings.json");
    write_documents(&docs_path, docs);

    let db_path = create_analytical_db(dir.path()).await;
    let analytical = AnalyticalSource::connect(&db_path, "airbnb", "att_bkk")
        .await
        .expect("Should connect read-only");

    let dataset = Dataset::new(
        RecordSource::Document(DocumentSource::file(docs_path.clone())),
        Some(analytical),
        clean_options(),
        None,
    );
    (build_router(AppState::new(dataset)), docs_path)
}

fn test_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Test helper: Extract JSON body from response
async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let response = app.clone().oneshot(test_request("GET", uri)).await.unwrap();
    let status = response.status();
    (status, extract_json(response.into_body()).await)
}

// =============================================================================
// Health / build info
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let dir = TempDir::new().unwrap();
    let (app, _) = setup_document_app(&dir, &sample_listings()).await;

    let (status, body) = get_json(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "bnbi-dash");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_buildinfo_reports_backend() {
    let dir = TempDir::new().unwrap();
    let (app, _) = setup_document_app(&dir, &sample_listings()).await;

    let (status, body) = get_json(&app, "/api/buildinfo").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["backend"], "document");
    assert!(body["git_hash"].is_string());
}

// =============================================================================
// Listings and options
// =============================================================================

#[tokio::test]
async fn test_listings_are_cleaned() {
    let dir = TempDir::new().unwrap();
    let (app, _) = setup_document_app(&dir, &sample_listings()).await;

    let (status, body) = get_json(&app, "/api/listings").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_rows"], 5);
    assert_eq!(body["page"], 1);
    assert_eq!(body["page_size"], 100);
    assert_eq!(body["amenity_columns"], json!(["wifi", "pool"]));

    let first = &body["rows"][0];
    assert_eq!(first["price"].as_f64(), Some(1000.0));
    assert_eq!(first["room_type"], "Entire Home/Apt");
    assert_eq!(first["property_type"], "Entire Condo");
    assert_eq!(first["property_grouped"], "Condo");
    assert_eq!(first["instant_bookable"], true);
    assert_eq!(first["host_is_superhost"], false);
    assert_eq!(first["amenities_count"].as_f64(), Some(1.0));
    assert!(first.get("_id").is_none());
}

#[tokio::test]
async fn test_listings_filters() {
    let dir = TempDir::new().unwrap();
    let (app, _) = setup_document_app(&dir, &sample_listings()).await;

    let (_, body) = get_json(&app, "/api/listings?room_type=Entire%20Home%2FApt&property_group=Condo").await;
    assert_eq!(body["total_rows"], 3);

    let (_, body) = get_json(&app, "/api/listings?property_group=All&neighbourhood=Sathon").await;
    assert_eq!(body["total_rows"], 1);
    assert_eq!(body["rows"][0]["property_grouped"], "Hostel");
}

#[tokio::test]
async fn test_listings_unknown_property_group_is_bad_request() {
    let dir = TempDir::new().unwrap();
    let (app, _) = setup_document_app(&dir, &sample_listings()).await;

    let (status, body) = get_json(&app, "/api/listings?property_group=Castle").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_listings_pagination() {
    let dir = TempDir::new().unwrap();
    let docs: Vec<Value> = (0..150)
        .map(|_| listing("$500.00", "entire home/apt", "Entire condo", "Bang Rak", 1))
        .collect();
    let (app, _) = setup_document_app(&dir, &docs).await;

    let (_, body) = get_json(&app, "/api/listings?page=2").await;
    assert_eq!(body["total_rows"], 150);
    assert_eq!(body["total_pages"], 2);
    assert_eq!(body["page"], 2);
    assert_eq!(body["rows"].as_array().unwrap().len(), 50);

    // Out-of-range pages clamp to the last page
    let (_, body) = get_json(&app, "/api/listings?page=99").await;
    assert_eq!(body["page"], 2);
}

#[tokio::test]
async fn test_options() {
    let dir = TempDir::new().unwrap();
    let (app, _) = setup_document_app(&dir, &sample_listings()).await;

    let (status, body) = get_json(&app, "/api/options").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["room_types"], json!(["Entire Home/Apt", "Private Room"]));
    assert_eq!(body["property_groups"], json!(["Condo", "Hostel", "Other"]));
    assert_eq!(body["neighbourhoods"], json!(["Bang Rak", "Khlong Toei", "Sathon"]));
    assert_eq!(body["investment_property_groups"][0], "All");
    assert_eq!(body["has_bedrooms"], true);
}

// =============================================================================
// Views
// =============================================================================

#[tokio::test]
async fn test_room_types_view() {
    let dir = TempDir::new().unwrap();
    let (app, _) = setup_document_app(&dir, &sample_listings()).await;

    let (status, body) = get_json(&app, "/api/views/room-types").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
    assert_eq!(body["data"][0], json!({"label": "Entire Home/Apt", "count": 4}));
    assert_eq!(body["data"][1], json!({"label": "Private Room", "count": 1}));
}

#[tokio::test]
async fn test_investment_view_density() {
    let dir = TempDir::new().unwrap();
    let (app, _) = setup_document_app(&dir, &sample_listings()).await;

    let (status, body) = get_json(&app, "/api/views/investment?property_group=All&bedrooms=1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
    assert_eq!(body["data"]["room_type"], "Entire Home/Apt");

    let summaries = body["data"]["summaries"].as_array().unwrap();
    assert_eq!(summaries.len(), 2);

    let bang_rak = &summaries[0];
    assert_eq!(bang_rak["neighbourhood"], "Bang Rak");
    assert_eq!(bang_rak["room_count"], 3);
    assert_eq!(bang_rak["avg_price"].as_f64(), Some(1100.0));
    let density = bang_rak["density"].as_f64().unwrap();
    assert!((density - 3.0 / 5.5).abs() < 1e-9);

    // Zero area: density is not finite and serializes as null
    let khlong_toei = &summaries[1];
    assert_eq!(khlong_toei["area_km2"].as_f64(), Some(0.0));
    assert!(khlong_toei["density"].is_null());
}

#[tokio::test]
async fn test_investment_view_empty_selection() {
    let dir = TempDir::new().unwrap();
    let (app, _) = setup_document_app(&dir, &sample_listings()).await;

    let (status, body) = get_json(&app, "/api/views/investment?room_type=Shared%20Room").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "no_data");
}

#[tokio::test]
async fn test_amenities_view() {
    let dir = TempDir::new().unwrap();
    let (app, _) = setup_document_app(&dir, &sample_listings()).await;

    let (_, body) = get_json(&app, "/api/views/amenities?room_type=Entire%20Home%2FApt&property_group=Condo").await;
    assert_eq!(body["status"], "ready");
    assert_eq!(
        body["data"]["frequencies"],
        json!([{"amenity": "wifi", "label": "Wifi", "count": 3.0}])
    );
}

#[tokio::test]
async fn test_dashboard_renders_every_view() {
    let dir = TempDir::new().unwrap();
    let (app, _) = setup_document_app(&dir, &sample_listings()).await;

    let (status, body) = get_json(&app, "/api/dashboard").await;
    assert_eq!(status, StatusCode::OK);
    for view in [
        "room_types",
        "property_groups",
        "neighbourhood_rooms",
        "price_map",
        "price_distribution",
        "investment",
        "amenities",
    ] {
        assert_eq!(body[view]["status"], "ready", "view {} not ready: {}", view, body[view]);
    }
    assert!(body["loaded_at"].is_string());
}

#[tokio::test]
async fn test_dashboard_isolates_invalid_selection() {
    let dir = TempDir::new().unwrap();
    let (app, _) = setup_document_app(&dir, &sample_listings()).await;

    let (status, body) = get_json(&app, "/api/dashboard?property_group=Castle").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["investment"]["status"], "failed");
    assert_eq!(body["price_map"]["status"], "failed");
    assert_eq!(body["room_types"]["status"], "ready");
    assert_eq!(body["neighbourhood_rooms"]["status"], "ready");
}

#[tokio::test]
async fn test_dashboard_without_bedrooms_column() {
    let dir = TempDir::new().unwrap();
    let docs: Vec<Value> = sample_listings()
        .into_iter()
        .map(|mut doc| {
            doc.as_object_mut().unwrap().remove("bedrooms");
            doc
        })
        .collect();
    let (app, _) = setup_document_app(&dir, &docs).await;

    let (status, body) = get_json(&app, "/api/dashboard").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["price_map"]["status"], "unavailable");
    assert_eq!(body["investment"]["status"], "unavailable");
    assert_eq!(body["room_types"]["status"], "ready");
    assert_eq!(body["amenities"]["status"], "ready");
}

// =============================================================================
// Cache and failures
// =============================================================================

#[tokio::test]
async fn test_cache_invalidation_reloads_source() {
    let dir = TempDir::new().unwrap();
    let (app, docs_path) = setup_document_app(&dir, &sample_listings()[..1]).await;

    let (_, body) = get_json(&app, "/api/listings").await;
    assert_eq!(body["total_rows"], 1);

    write_documents(&docs_path, &sample_listings());
    let (_, body) = get_json(&app, "/api/listings").await;
    assert_eq!(body["total_rows"], 1, "cached table should be served until invalidated");

    let response = app
        .clone()
        .oneshot(test_request("POST", "/api/cache/invalidate?scope=listings"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["scope"], "listings");
    assert_eq!(body["dropped"], 1);

    let (_, body) = get_json(&app, "/api/listings").await;
    assert_eq!(body["total_rows"], 5);
}

#[tokio::test]
async fn test_malformed_price_is_data_integrity_error() {
    let dir = TempDir::new().unwrap();
    let mut docs = sample_listings();
    docs.push(listing("call for price", "private room", "Hostel", "Sathon", 1));
    let (app, _) = setup_document_app(&dir, &docs).await;

    let (status, body) = get_json(&app, "/api/listings").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "DATA_INTEGRITY");
}

#[tokio::test]
async fn test_missing_document_file_is_source_error() {
    let dir = TempDir::new().unwrap();
    let dataset = Dataset::new(
        RecordSource::Document(DocumentSource::file(dir.path().join("missing.json"))),
        None,
        clean_options(),
        None,
    );
    let app = build_router(AppState::new(dataset));

    let (status, body) = get_json(&app, "/api/dashboard").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"]["code"], "SOURCE_ERROR");
}

// =============================================================================
// Analytical backend
// =============================================================================

#[tokio::test]
async fn test_analytical_backend_end_to_end() {
    let dir = TempDir::new().unwrap();
    let db_path = create_analytical_db(dir.path()).await;
    let analytical = AnalyticalSource::connect(&db_path, "airbnb", "att_bkk").await.unwrap();

    let dataset = Dataset::new(
        RecordSource::Analytical(analytical.clone()),
        Some(analytical),
        CleanOptions {
            compute_amenities_count: false,
            ..Default::default()
        },
        None,
    );
    let app = build_router(AppState::new(dataset));

    let (status, body) = get_json(&app, "/api/listings?stage=cleaned").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_rows"], 2);
    assert_eq!(body["rows"][0]["price"].as_f64(), Some(1200.5));
    assert_eq!(body["rows"][0]["room_type"], "Entire Home");
    assert_eq!(body["rows"][0]["property_grouped"], "Condo");
    assert!(body["rows"][0]["amenities_count"].is_null());

    let (_, body) = get_json(&app, "/api/views/investment?room_type=Entire%20Home&bedrooms=2").await;
    assert_eq!(body["status"], "ready");
    let summary = &body["data"]["summaries"][0];
    assert_eq!(summary["neighbourhood"], "Bang Rak");
    assert_eq!(summary["room_count"], 1);
    assert!((summary["density"].as_f64().unwrap() - 1.0 / 5.5).abs() < 1e-9);
}
