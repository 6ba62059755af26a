//! # Catalog View Handler

use super::{wrap_response, ApiResponse, AppError, AppState, DebugParams};
use axum::{
    extract::{Query, State},
    Json,
};
use hslookup::query::Table;
use serde_json::json;

/// Returns the full catalog as `{columns, rows}`.
pub async fn catalog_handler(
    State(app_state): State<AppState>,
    debug_params: Query<DebugParams>,
) -> Result<Json<ApiResponse<Table>>, AppError> {
    let table = app_state.catalog.to_table();
    let debug_info = json!({ "products": app_state.catalog.len() });
    Ok(wrap_response(table, debug_params, Some(debug_info)))
}
