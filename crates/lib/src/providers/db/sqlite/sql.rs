//! # SQLite Specific SQL
//!
//! This module centralizes the SQL used by the SQLite provider: the statements that
//! build the catalog mirror and the guard that admits only read-only queries.

use crate::errors::QueryError;
use regex::Regex;

pub const DROP_CATALOG_TABLE_SQL: &str = "DROP TABLE IF EXISTS catalog;";

pub const CREATE_CATALOG_TABLE_SQL: &str = "CREATE TABLE IF NOT EXISTS catalog (
    product_name TEXT NOT NULL,
    definition TEXT NOT NULL,
    material TEXT NOT NULL,
    hs_code INTEGER NOT NULL,
    specifications TEXT NOT NULL
);";

pub const INSERT_CATALOG_ROW_SQL: &str = "INSERT INTO catalog (product_name, definition, material, hs_code, specifications) VALUES (?, ?, ?, ?, ?)";

/// Statements that rebuild the catalog mirror from scratch.
pub const ALL_TABLE_CREATION_SQL: [&str; 2] = [DROP_CATALOG_TABLE_SQL, CREATE_CATALOG_TABLE_SQL];

// `replace` alone is the string function; only the `REPLACE INTO` statement form is a write.
const FORBIDDEN_KEYWORDS: &str = r"(?i)\b(insert|update|delete|drop|alter|create|attach|detach|pragma|vacuum|reindex)\b|\breplace\s+into\b";

const STRING_LITERAL: &str = r"'(?:[^']|'')*'";

fn compile(pattern: &str) -> Result<Regex, QueryError> {
    Regex::new(pattern)
        .map_err(|e| QueryError::Execution(format!("Regex compilation failed: {e}")))
}

/// Checks that `sql` is a single read-only `SELECT` (or `WITH ... SELECT`) statement
/// and returns it without its trailing semicolon.
///
/// String literals are blanked out before the keyword check so a search for a
/// product named "Drop Forged Hook" is still accepted.
pub fn validate_read_only(sql: &str) -> Result<&str, QueryError> {
    let statement = sql.trim();
    let statement = statement.strip_suffix(';').unwrap_or(statement).trim_end();
    if statement.is_empty() {
        return Err(QueryError::Syntax("empty statement".to_string()));
    }

    let without_literals = compile(STRING_LITERAL)?.replace_all(statement, "''");
    if without_literals.contains(';') {
        return Err(QueryError::Forbidden(
            "only a single statement is allowed".to_string(),
        ));
    }

    let leading = without_literals
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_uppercase();
    if leading != "SELECT" && leading != "WITH" {
        return Err(QueryError::Forbidden(format!(
            "only SELECT statements are allowed, got '{leading}'"
        )));
    }

    if let Some(found) = compile(FORBIDDEN_KEYWORDS)?.find(&without_literals) {
        return Err(QueryError::Forbidden(format!(
            "keyword '{}' is not allowed",
            found.as_str().to_uppercase()
        )));
    }

    Ok(statement)
}
