use crate::{
    errors::{PromptError, QueryError},
    providers::db::storage::QueryBackend,
    query::{QueryDialect, QueryOutcome, Table, Value},
    types::Catalog,
};
use async_trait::async_trait;
use std::fmt::{self, Debug};
use tracing::{debug, info, warn};
use turso::{Database, Value as TursoValue};

pub mod sql;

/// A provider for the SQLite mirror of the catalog, using Turso.
///
/// This provider holds a `Database` instance. When cloned, it shares the same
/// underlying database, so an in-memory mirror built once is visible to every clone.
#[derive(Clone)]
pub struct SqliteProvider {
    /// The Turso database instance. It's cloneable and thread-safe.
    pub db: Database,
}

impl SqliteProvider {
    /// Creates a new `SqliteProvider` from a file path or in-memory.
    ///
    /// # Arguments
    ///
    /// * `db_path`: The path to the SQLite database file. Use ":memory:" for a unique,
    ///   isolated in-memory database.
    pub async fn new(db_path: &str) -> Result<Self, PromptError> {
        let db = turso::Builder::new_local(db_path)
            .build()
            .await
            .map_err(|e| PromptError::StorageConnection(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| PromptError::StorageConnection(e.to_string()))?;
        // Use `query` for PRAGMA statements that return a value to avoid "unexpected row" errors.
        conn.query("PRAGMA journal_mode=WAL;", ())
            .await
            .map_err(|e| PromptError::StorageConnection(e.to_string()))?;

        Ok(Self { db })
    }

    /// Rebuilds the `catalog` table from `catalog` inside a single transaction.
    ///
    /// Returns the number of rows written.
    pub async fn mirror_catalog(&self, catalog: &Catalog) -> Result<usize, PromptError> {
        let conn = self
            .db
            .connect()
            .map_err(|e| PromptError::StorageConnection(e.to_string()))?;

        for statement in sql::ALL_TABLE_CREATION_SQL {
            conn.execute(statement, ())
                .await
                .map_err(|e| PromptError::StorageOperationFailed(e.to_string()))?;
        }

        conn.execute("BEGIN TRANSACTION", ())
            .await
            .map_err(|e| PromptError::StorageOperationFailed(e.to_string()))?;

        let mut stmt = conn
            .prepare(sql::INSERT_CATALOG_ROW_SQL)
            .await
            .map_err(|e| PromptError::StorageOperationFailed(e.to_string()))?;

        let mut insert_count = 0;
        for row in catalog.rows() {
            let params = vec![
                TursoValue::Text(row.product_name.clone()),
                TursoValue::Text(row.definition.clone()),
                TursoValue::Text(row.material.clone()),
                TursoValue::Integer(row.hs_code),
                TursoValue::Text(row.specifications.clone()),
            ];
            match stmt.execute(params).await {
                Ok(changes) => {
                    if changes > 0 {
                        insert_count += 1;
                    }
                }
                Err(e) => {
                    warn!("Failed to insert catalog row: {e:?}. Rolling back transaction.");
                    conn.execute("ROLLBACK", ())
                        .await
                        .map_err(|e| PromptError::StorageOperationFailed(e.to_string()))?;
                    return Err(PromptError::StorageOperationFailed(e.to_string()));
                }
            }
        }

        conn.execute("COMMIT", ())
            .await
            .map_err(|e| PromptError::StorageOperationFailed(e.to_string()))?;
        info!("Mirrored {insert_count} catalog rows into SQLite.");

        Ok(insert_count)
    }
}

impl Debug for SqliteProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteProvider").finish_non_exhaustive()
    }
}

impl AsRef<Database> for SqliteProvider {
    fn as_ref(&self) -> &Database {
        &self.db
    }
}

/// Converts a Turso value to a result cell.
fn turso_value_to_cell(v: TursoValue) -> Value {
    match v {
        TursoValue::Null => Value::Null,
        TursoValue::Integer(i) => Value::Integer(i),
        TursoValue::Real(f) => Value::Real(f),
        TursoValue::Text(s) => Value::Text(s),
        TursoValue::Blob(_) => Value::Text("<blob>".to_string()),
    }
}

fn execution_error(e: impl ToString) -> QueryError {
    QueryError::Execution(e.to_string())
}

#[async_trait]
impl QueryBackend for SqliteProvider {
    fn name(&self) -> &str {
        "SQLite"
    }

    fn dialect(&self) -> QueryDialect {
        QueryDialect::Sql
    }

    /// Validates the statement as read-only, runs it and collects every row.
    async fn execute(&self, expression: &str) -> Result<QueryOutcome, QueryError> {
        let statement = sql::validate_read_only(expression)?;
        debug!(query = %statement, "--> Executing SQLite query");

        let conn = self.db.connect().map_err(execution_error)?;
        let mut stmt = conn.prepare(statement).await.map_err(execution_error)?;

        let column_names: Vec<String> = stmt
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect();

        let mut rows = stmt.query(()).await.map_err(execution_error)?;

        let mut table_rows: Vec<Vec<Value>> = Vec::new();
        while let Some(row) = rows.next().await.map_err(execution_error)? {
            let mut cells = Vec::with_capacity(column_names.len());
            for i in 0..column_names.len() {
                let value = row.get_value(i).map_err(execution_error)?;
                cells.push(turso_value_to_cell(value));
            }
            table_rows.push(cells);
        }

        if column_names.len() == 1 && table_rows.len() == 1 {
            if let Some(cell) = table_rows.pop().and_then(|mut row| row.pop()) {
                return Ok(QueryOutcome::Scalar(cell));
            }
        }

        Ok(QueryOutcome::Table(Table::new(column_names, table_rows)))
    }
}
