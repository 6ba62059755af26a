//! # Grounding Prompt
//!
//! Renders the catalog into the system prompt sent with every lookup. The output
//! is a pure function of the catalog snapshot and the query dialect, so the same
//! inputs always produce byte-identical text.

use super::tasks::{LOOKUP_PERSONA_PROMPT, SQL_QUERY_INSTRUCTIONS, TABULAR_QUERY_INSTRUCTIONS};
use crate::{
    query::QueryDialect,
    types::{Catalog, CatalogRow},
};

/// Builds the grounding prompt for `catalog`, advertising `dialect` as the query language.
pub fn build_grounding_prompt(catalog: &Catalog, dialect: QueryDialect) -> String {
    let mut prompt = String::from(LOOKUP_PERSONA_PROMPT);
    prompt.push('\n');

    for row in catalog.rows() {
        prompt.push('\n');
        prompt.push_str(&format_product_block(row));
    }

    prompt.push('\n');
    prompt.push_str(dialect_instructions(dialect));
    prompt.push('\n');
    prompt
}

/// Formats one catalog row as a labeled block.
pub fn format_product_block(row: &CatalogRow) -> String {
    format!(
        "{}\n* Definition: {}\n* Material: {}\n* HS Code: {}\n* Specifications: {}\n",
        row.product_name, row.definition, row.material, row.hs_code, row.specifications
    )
}

/// Returns the query-language instructions for `dialect`.
pub fn dialect_instructions(dialect: QueryDialect) -> &'static str {
    match dialect {
        QueryDialect::Tabular => TABULAR_QUERY_INSTRUCTIONS,
        QueryDialect::Sql => SQL_QUERY_INSTRUCTIONS,
    }
}
