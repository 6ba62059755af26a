//! # HS Code Lookup
//!
//! This crate turns natural-language questions about a product catalog into executable
//! queries using a configurable AI provider, runs them against a query backend and folds
//! the result back into the conversation.

pub mod classify;
pub mod constants;
pub mod errors;
pub mod ingest;
pub mod prompts;
pub mod providers;
pub mod query;
pub mod types;

pub use classify::IntentClassifier;
pub use errors::{PromptError, QueryError};
pub use ingest::{load_catalog, CatalogSource};
pub use query::{QueryDialect, QueryOutcome};
pub use types::{
    Catalog, CatalogRow, Conversation, LookupAssistant, LookupAssistantBuilder,
    QueryBackendKind, Role, Turn, TurnKind, TurnReport,
};

use constants::{ACKNOWLEDGEMENT_REPLY, COMPLETION_FAILURE_REPLY, QUERY_FAILURE_REPLY};
use tracing::{debug, info, warn};

impl LookupAssistant {
    /// The grounding prompt sent as the system message of every lookup.
    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// The dialect of the configured backend.
    pub fn dialect(&self) -> QueryDialect {
        self.backend.dialect()
    }

    /// Runs one submission through the pipeline.
    ///
    /// On success exactly one user turn and one assistant turn have been appended to
    /// `conversation`. Completion and execution failures are turned into friendly
    /// assistant replies; the only error returned is `PromptError::EmptyMessage`, in
    /// which case nothing was recorded.
    pub async fn handle_message(
        &self,
        conversation: &mut Conversation,
        text: &str,
    ) -> Result<TurnReport, PromptError> {
        if text.trim().is_empty() {
            return Err(PromptError::EmptyMessage);
        }
        conversation.append_user(text);

        if !self.classifier.is_lookup(text) {
            info!("[handle_message] Not a lookup request; acknowledging.");
            return Ok(record(conversation, TurnKind::Acknowledged, None, ACKNOWLEDGEMENT_REPLY));
        }

        info!("[handle_message] Lookup request; translating to a query.");
        let expression = match self.translate(conversation).await {
            Ok(expression) => expression,
            Err(e) => {
                warn!("[handle_message] Completion failed: {e}");
                return Ok(record(
                    conversation,
                    TurnKind::CompletionFailed,
                    None,
                    COMPLETION_FAILURE_REPLY,
                ));
            }
        };

        info!(
            backend = self.backend.name(),
            query = %expression,
            "[handle_message] Executing generated query."
        );
        match self.backend.execute(&expression).await {
            Ok(outcome) => {
                let reply = outcome.to_string();
                Ok(record(conversation, TurnKind::Answered, Some(expression), reply))
            }
            Err(e) => {
                warn!(query = %expression, "[handle_message] Query failed: {e}");
                Ok(record(
                    conversation,
                    TurnKind::QueryFailed,
                    Some(expression),
                    QUERY_FAILURE_REPLY,
                ))
            }
        }
    }

    /// Asks the AI provider for a query expression given the full conversation.
    ///
    /// The returned text is trimmed but otherwise passed through untouched; validation
    /// is the backend's job.
    pub async fn translate(&self, conversation: &Conversation) -> Result<String, PromptError> {
        debug!(
            turns = conversation.len(),
            "[translate] Sending conversation to AI provider."
        );
        let expression = self
            .ai_provider
            .complete(&self.system_prompt, conversation.turns())
            .await?;
        Ok(expression.trim().to_string())
    }
}

fn record(
    conversation: &mut Conversation,
    kind: TurnKind,
    executed_query: Option<String>,
    reply: impl Into<String>,
) -> TurnReport {
    let reply = reply.into();
    conversation.append_assistant(reply.clone());
    TurnReport {
        kind,
        executed_query,
        reply,
    }
}
