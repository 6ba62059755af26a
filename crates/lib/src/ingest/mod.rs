//! # Catalog Ingestion
//!
//! Loads the product catalog once at startup from a public Google Sheet, a local CSV
//! file, or the built-in seed dataset. Loading never fails the caller: an unreachable
//! or malformed source is logged and replaced by an empty catalog.

pub mod seed;
#[cfg(feature = "sheets")]
pub mod sheets;

use crate::types::{Catalog, CatalogRow};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

/// Custom error types for the catalog loading process.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CatalogError {
    #[error("Invalid Google Sheet URL: {0}")]
    InvalidUrl(String),
    #[error("Failed to fetch sheet: {0}")]
    Fetch(String),
    #[error("Failed to read catalog file '{path}': {message}")]
    Io { path: String, message: String },
    #[error("Failed to parse catalog CSV: {0}")]
    Parse(String),
    #[error("Sheet and CSV sources require the 'sheets' feature.")]
    SheetsFeatureNotEnabled,
}

/// Where the catalog comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "source", rename_all = "lowercase")]
pub enum CatalogSource {
    /// A public Google Sheet; `gid` selects the worksheet tab.
    Sheet {
        url: String,
        #[serde(default)]
        gid: Option<String>,
    },
    /// A local CSV file with the same column layout as the sheet.
    Csv { path: String },
    /// The built-in dataset.
    #[default]
    Seed,
}

/// Loads the catalog, degrading to an empty catalog on any failure.
pub async fn load_catalog(source: &CatalogSource) -> Catalog {
    match try_load_catalog(source).await {
        Ok(catalog) => {
            info!("Loaded catalog with {} products.", catalog.len());
            catalog
        }
        Err(e) => {
            warn!("Failed to load catalog: {e}. Continuing with an empty catalog.");
            Catalog::empty()
        }
    }
}

/// Loads the catalog and reports failures to the caller.
pub async fn try_load_catalog(source: &CatalogSource) -> Result<Catalog, CatalogError> {
    match source {
        CatalogSource::Seed => Ok(seed::seed_catalog()),
        #[cfg(feature = "sheets")]
        CatalogSource::Sheet { url, gid } => {
            let export_url = sheets::construct_export_url(url, gid.as_deref())?;
            let csv_data = sheets::download_csv(&export_url).await?;
            sheets::parse_catalog_csv(&csv_data)
        }
        #[cfg(feature = "sheets")]
        CatalogSource::Csv { path } => {
            let csv_data =
                tokio::fs::read_to_string(path)
                    .await
                    .map_err(|e| CatalogError::Io {
                        path: path.clone(),
                        message: e.to_string(),
                    })?;
            sheets::parse_catalog_csv(&csv_data)
        }
        #[cfg(not(feature = "sheets"))]
        CatalogSource::Sheet { .. } | CatalogSource::Csv { .. } => {
            Err(CatalogError::SheetsFeatureNotEnabled)
        }
    }
}

/// Normalizes a raw HS code cell into an integer.
///
/// Separators are dropped (`7318.15.10` becomes `73181510`). A cell exported as a float
/// (`73181510.0`) keeps its integer part. Returns `None` when no digits remain or the
/// code does not fit in an `i64`.
pub fn parse_hs_code(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    if let Some((whole, fraction)) = trimmed.split_once('.') {
        let is_float_export = !whole.is_empty()
            && whole.chars().all(|c| c.is_ascii_digit())
            && !fraction.is_empty()
            && fraction.chars().all(|c| c == '0');
        if is_float_export {
            return whole.parse().ok();
        }
    }

    let digits: String = trimmed.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

/// Builds a row from the first five cells of a record, in sheet order.
///
/// Returns `None` (after logging) when the record is too short or has no usable HS code.
pub fn row_from_cells(line: usize, cells: &[&str]) -> Option<CatalogRow> {
    if cells.len() < 5 {
        warn!("Skipping catalog row {line}: expected 5 columns, found {}.", cells.len());
        return None;
    }
    let Some(hs_code) = parse_hs_code(cells[3]) else {
        warn!(
            "Skipping catalog row {line}: HS code '{}' has no usable digits.",
            cells[3]
        );
        return None;
    };
    Some(CatalogRow {
        product_name: cells[0].trim().to_string(),
        definition: cells[1].trim().to_string(),
        material: cells[2].trim().to_string(),
        hs_code,
        specifications: cells[4].trim().to_string(),
    })
}
