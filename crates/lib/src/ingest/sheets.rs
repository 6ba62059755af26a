//! # Google Sheets Catalog Source
//!
//! Turns a Google Sheet URL into its CSV export URL, downloads it and reads the
//! first five columns of every data row into catalog rows.

use super::{row_from_cells, CatalogError};
use crate::types::Catalog;
use regex::Regex;
use tracing::{debug, info};

/// Transforms a Google Sheet URL into a CSV export URL.
///
/// `gid` optionally targets a particular tab within the spreadsheet. Local hosts keep
/// their scheme and authority so a mock server can stand in for Google.
pub fn construct_export_url(url_str: &str, gid: Option<&str>) -> Result<String, CatalogError> {
    let parsed_url =
        reqwest::Url::parse(url_str).map_err(|e| CatalogError::InvalidUrl(format!("{e}")))?;

    let re = Regex::new(r"/spreadsheets/d/([a-zA-Z0-9-_]+)")
        .map_err(|e| CatalogError::InvalidUrl(format!("Regex compilation failed: {e}")))?;
    let caps = re.captures(parsed_url.path()).ok_or_else(|| {
        CatalogError::InvalidUrl("Could not find sheet ID in URL path.".to_string())
    })?;

    let spreadsheets_id = caps.get(1).map(|m| m.as_str()).ok_or_else(|| {
        CatalogError::InvalidUrl("Sheet ID capture group is missing.".to_string())
    })?;

    let base_url = match parsed_url.host_str() {
        Some("127.0.0.1") | Some("localhost") => {
            format!("{}://{}", parsed_url.scheme(), parsed_url.authority())
        }
        _ => "https://docs.google.com".to_string(),
    };
    let mut export_url = format!("{base_url}/spreadsheets/d/{spreadsheets_id}/export?format=csv");

    if let Some(gid_val) = gid {
        if !gid_val.is_empty() {
            export_url.push_str(&format!("&gid={gid_val}"));
        }
    }

    Ok(export_url)
}

/// Downloads the content of a Google Sheet as a CSV string.
pub async fn download_csv(export_url: &str) -> Result<String, CatalogError> {
    info!("Fetching Google Sheet CSV from: {export_url}");
    let response = reqwest::get(export_url)
        .await
        .map_err(|e| CatalogError::Fetch(e.to_string()))?;
    if !response.status().is_success() {
        return Err(CatalogError::Fetch(format!(
            "Request failed with status: {}",
            response.status()
        )));
    }
    response
        .text()
        .await
        .map_err(|e| CatalogError::Fetch(e.to_string()))
}

/// Parses catalog CSV text. The header row is skipped and columns are taken by
/// position, so header spelling does not matter. Fully blank rows are ignored.
pub fn parse_catalog_csv(csv_data: &str) -> Result<Catalog, CatalogError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(csv_data.as_bytes());

    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record.map_err(|e| CatalogError::Parse(e.to_string()))?;
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        let cells: Vec<&str> = record.iter().collect();
        // Line 1 is the header.
        if let Some(row) = row_from_cells(index + 2, &cells) {
            rows.push(row);
        }
    }
    debug!("Parsed {} catalog rows from CSV.", rows.len());

    Ok(Catalog::new(rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn export_url_targets_google_or_local_host() {
        let url = construct_export_url(
            "https://docs.google.com/spreadsheets/d/1wgliY7XyZF-p4FU/edit?gid=835818411",
            Some("835818411"),
        )
        .unwrap();
        assert_eq!(
            url,
            "https://docs.google.com/spreadsheets/d/1wgliY7XyZF-p4FU/export?format=csv&gid=835818411"
        );

        let url = construct_export_url("http://127.0.0.1:4040/spreadsheets/d/abc/edit", None).unwrap();
        assert_eq!(url, "http://127.0.0.1:4040/spreadsheets/d/abc/export?format=csv");

        assert!(matches!(
            construct_export_url("https://example.com/not-a-sheet", None),
            Err(CatalogError::InvalidUrl(_))
        ));
    }

    #[test]
    fn extra_columns_are_ignored() {
        let csv = "Name,Def,Mat,Code,Spec,Notes\nBolt X,A bolt,steel,73181510,M8,internal\n,,,,,\n";
        let catalog = parse_catalog_csv(csv).unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.rows()[0].specifications, "M8");
    }
}
