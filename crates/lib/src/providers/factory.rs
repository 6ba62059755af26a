//! # Query Backend Factory
//!
//! Creates the configured query backend. Keeping this in the `lib` crate lets every
//! consumer (the server, tests) select and prepare a backend the same way.

use crate::{
    errors::PromptError,
    providers::db::{storage::QueryBackend, tabular::TabularBackend},
    types::{Catalog, QueryBackendKind},
};
use std::sync::Arc;
use tracing::info;

/// Builds the backend named by `kind` over `catalog`.
///
/// For [`QueryBackendKind::Sql`] the database at `db_url` is opened and the catalog is
/// mirrored into it before the backend is returned.
pub async fn build_backend(
    kind: QueryBackendKind,
    catalog: Arc<Catalog>,
    db_url: &str,
) -> Result<Box<dyn QueryBackend>, PromptError> {
    match kind {
        QueryBackendKind::Tabular => {
            info!("Using the tabular query backend.");
            Ok(Box::new(TabularBackend::new(catalog)))
        }
        QueryBackendKind::Sql => build_sql_backend(catalog, db_url).await,
    }
}

#[cfg(feature = "sql")]
async fn build_sql_backend(
    catalog: Arc<Catalog>,
    db_url: &str,
) -> Result<Box<dyn QueryBackend>, PromptError> {
    use crate::providers::db::sqlite::SqliteProvider;

    info!("Using the SQLite query backend at '{db_url}'.");
    let provider = SqliteProvider::new(db_url).await?;
    provider.mirror_catalog(&catalog).await?;
    Ok(Box::new(provider))
}

#[cfg(not(feature = "sql"))]
async fn build_sql_backend(
    _catalog: Arc<Catalog>,
    _db_url: &str,
) -> Result<Box<dyn QueryBackend>, PromptError> {
    Err(PromptError::SqlFeatureNotEnabled)
}
