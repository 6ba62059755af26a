use crate::{
    errors::QueryError,
    query::{QueryDialect, QueryOutcome},
};
use async_trait::async_trait;
use dyn_clone::DynClone;
use std::fmt::Debug;

/// A trait for executing generated query expressions against the catalog.
///
/// This trait defines a common interface for the interchangeable executors (the
/// in-memory tabular interpreter and the SQLite mirror). Each backend reports the
/// dialect it understands so the grounding prompt can advertise the same syntax.
#[async_trait]
pub trait QueryBackend: Send + Sync + DynClone + Debug {
    /// Returns the name of the backend (e.g., "Tabular", "SQLite").
    fn name(&self) -> &str;

    /// Returns the query dialect this backend executes.
    fn dialect(&self) -> QueryDialect;

    /// Validates and executes an untrusted expression. Every failure, including
    /// syntax errors and disallowed operations, is returned as a `QueryError`.
    async fn execute(&self, expression: &str) -> Result<QueryOutcome, QueryError>;
}

dyn_clone::clone_trait_object!(QueryBackend);
