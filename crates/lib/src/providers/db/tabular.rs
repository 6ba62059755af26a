use crate::{
    errors::QueryError,
    providers::db::storage::QueryBackend,
    query::{interpreter::evaluate, parser::parse, QueryDialect, QueryOutcome},
    types::Catalog,
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Executes DataFrame-style expressions against the in-memory catalog.
///
/// Cloning is cheap: clones share the same catalog snapshot.
#[derive(Clone, Debug)]
pub struct TabularBackend {
    catalog: Arc<Catalog>,
}

impl TabularBackend {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }
}

#[async_trait]
impl QueryBackend for TabularBackend {
    fn name(&self) -> &str {
        "Tabular"
    }

    fn dialect(&self) -> QueryDialect {
        QueryDialect::Tabular
    }

    async fn execute(&self, expression: &str) -> Result<QueryOutcome, QueryError> {
        debug!(expression = %expression, "--> Evaluating tabular expression");
        let query = parse(expression)?;
        evaluate(&query, &self.catalog)
    }
}
