//! # Catalog Ingestion Tests
//!
//! Loads catalogs from a mocked Google Sheet export and from CSV files on disk,
//! including the degraded paths that fall back to an empty catalog.

mod common;

use common::setup_tracing;
use hslookup::ingest::{try_load_catalog, CatalogError};
use hslookup::{load_catalog, CatalogSource};
use httpmock::{Method::GET, MockServer};
use std::io::Write;
use tempfile::NamedTempFile;

const SHEET_CSV: &str = "Product Name,Definition,Material,HS Code,Specifications\n\
Bolt X,A hexagon bolt,steel,7318.15.10,M8\n\
Cable Tie,A nylon strap,nylon,39269097,200 mm\n\
Mystery Part,Unknown,unknown,tbd,n/a\n";

#[tokio::test]
async fn test_load_from_google_sheet_export() {
    setup_tracing();
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/spreadsheets/d/test-sheet-id/export")
                .query_param("format", "csv")
                .query_param("gid", "835818411");
            then.status(200)
                .header("content-type", "text/csv")
                .body(SHEET_CSV);
        })
        .await;

    let source = CatalogSource::Sheet {
        url: server.url("/spreadsheets/d/test-sheet-id/edit"),
        gid: Some("835818411".to_string()),
    };
    let catalog = load_catalog(&source).await;

    mock.assert_async().await;
    assert_eq!(catalog.len(), 2);
    assert_eq!(catalog.rows()[0].product_name, "Bolt X");
    assert_eq!(catalog.rows()[0].hs_code, 73181510);
    assert_eq!(catalog.rows()[1].material, "nylon");
}

#[tokio::test]
async fn test_unreachable_sheet_yields_empty_catalog() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/spreadsheets/d/missing/export");
            then.status(404);
        })
        .await;

    let source = CatalogSource::Sheet {
        url: server.url("/spreadsheets/d/missing/edit"),
        gid: None,
    };
    assert!(matches!(
        try_load_catalog(&source).await,
        Err(CatalogError::Fetch(_))
    ));
    assert!(load_catalog(&source).await.is_empty());
}

#[tokio::test]
async fn test_load_from_csv_file() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(SHEET_CSV.as_bytes()).unwrap();

    let source = CatalogSource::Csv {
        path: file.path().to_string_lossy().to_string(),
    };
    let catalog = load_catalog(&source).await;
    assert_eq!(catalog.len(), 2);
}

#[tokio::test]
async fn test_invalid_sheet_url_is_reported() {
    let source = CatalogSource::Sheet {
        url: "not a url".to_string(),
        gid: None,
    };
    assert!(matches!(
        try_load_catalog(&source).await,
        Err(CatalogError::InvalidUrl(_))
    ));
}

#[tokio::test]
async fn test_seed_catalog_is_available() {
    let catalog = load_catalog(&CatalogSource::Seed).await;
    assert!(catalog
        .rows()
        .iter()
        .any(|row| row.product_name == "Bolt X" && row.material == "steel"));
}
