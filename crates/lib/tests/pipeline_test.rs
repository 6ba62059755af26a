//! # Lookup Pipeline Tests
//!
//! Drives `LookupAssistant::handle_message` end to end with a recording mock AI
//! provider and the tabular backend, checking classification, the exact completion
//! request, result recording and the friendly failure replies.

mod common;

use common::{bolt_catalog, sample_catalog, setup_tracing, MockAiProvider};
use hslookup::constants::{
    ACKNOWLEDGEMENT_REPLY, COMPLETION_FAILURE_REPLY, QUERY_FAILURE_REPLY,
};
use hslookup::prompts::core::build_grounding_prompt;
use hslookup::providers::db::tabular::TabularBackend;
use hslookup::{
    Catalog, Conversation, IntentClassifier, LookupAssistant, LookupAssistantBuilder,
    PromptError, QueryDialect, Role, TurnKind,
};
use std::sync::Arc;

fn assistant(catalog: Catalog, provider: &MockAiProvider) -> LookupAssistant {
    let catalog = Arc::new(catalog);
    LookupAssistantBuilder::new()
        .ai_provider(Box::new(provider.clone()))
        .backend(Box::new(TabularBackend::new(catalog.clone())))
        .catalog(catalog)
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_non_lookup_message_is_acknowledged_without_completion() {
    setup_tracing();
    let provider = MockAiProvider::new(vec![]);
    let assistant = assistant(bolt_catalog(), &provider);
    let mut conversation = Conversation::new();

    let report = assistant
        .handle_message(&mut conversation, "Thanks")
        .await
        .unwrap();

    assert_eq!(report.kind, TurnKind::Acknowledged);
    assert_eq!(report.reply, ACKNOWLEDGEMENT_REPLY);
    assert!(report.executed_query.is_none());
    assert!(provider.calls().is_empty());
    assert_eq!(conversation.len(), 2);
    assert_eq!(conversation.turns()[1].content, ACKNOWLEDGEMENT_REPLY);
}

#[tokio::test]
async fn test_lookup_sends_grounding_prompt_and_full_history() {
    setup_tracing();
    let provider = MockAiProvider::new(vec!["data[data['Material'] == 'steel']"]);
    let assistant = assistant(bolt_catalog(), &provider);
    let mut conversation = Conversation::new();
    conversation.append_user("Hello");
    conversation.append_assistant(ACKNOWLEDGEMENT_REPLY);

    let report = assistant
        .handle_message(&mut conversation, "What products are made of steel?")
        .await
        .unwrap();

    let calls = provider.calls();
    assert_eq!(calls.len(), 1);
    let (system_prompt, history) = &calls[0];
    assert_eq!(
        system_prompt,
        &build_grounding_prompt(&bolt_catalog(), QueryDialect::Tabular)
    );
    assert_eq!(history.len(), 3);
    assert_eq!(history[2].role, Role::User);
    assert_eq!(history[2].content, "What products are made of steel?");

    assert_eq!(report.kind, TurnKind::Answered);
    assert_eq!(
        report.executed_query.as_deref(),
        Some("data[data['Material'] == 'steel']")
    );
    assert!(report.reply.contains("Bolt X"));
    assert!(report.reply.contains("73181510"));
    let last = conversation.last().unwrap();
    assert_eq!(last.role, Role::Assistant);
    assert_eq!(last.content, report.reply);
}

#[tokio::test]
async fn test_completion_text_is_trimmed_before_execution() {
    let provider = MockAiProvider::new(vec!["  data.shape[0]\n"]);
    let assistant = assistant(sample_catalog(), &provider);
    let mut conversation = Conversation::new();

    let report = assistant
        .handle_message(&mut conversation, "How many products are there?")
        .await
        .unwrap();

    assert_eq!(report.executed_query.as_deref(), Some("data.shape[0]"));
    assert_eq!(report.reply, "5");
}

#[tokio::test]
async fn test_failed_query_records_friendly_reply() {
    let provider = MockAiProvider::new(vec!["data[data['Nonexistent'] == 'x']"]);
    let assistant = assistant(bolt_catalog(), &provider);
    let mut conversation = Conversation::new();

    let report = assistant
        .handle_message(&mut conversation, "Find the nonexistent thing")
        .await
        .unwrap();

    assert_eq!(report.kind, TurnKind::QueryFailed);
    assert_eq!(report.reply, QUERY_FAILURE_REPLY);
    assert!(!report.reply.contains("Error executing query"));
    assert!(!report.reply.contains("Nonexistent"));
    assert_eq!(
        report.executed_query.as_deref(),
        Some("data[data['Nonexistent'] == 'x']")
    );
    assert_eq!(conversation.len(), 2);
}

#[tokio::test]
async fn test_completion_failure_records_friendly_reply() {
    let provider = MockAiProvider::failing();
    let assistant = assistant(bolt_catalog(), &provider);
    let mut conversation = Conversation::new();

    let report = assistant
        .handle_message(&mut conversation, "Show me everything")
        .await
        .unwrap();

    assert_eq!(report.kind, TurnKind::CompletionFailed);
    assert_eq!(report.reply, COMPLETION_FAILURE_REPLY);
    assert!(report.executed_query.is_none());
    assert!(!report.reply.contains("upstream unavailable"));
    assert_eq!(conversation.len(), 2);
}

#[tokio::test]
async fn test_every_submission_adds_two_turns() {
    let provider = MockAiProvider::new(vec!["data.shape[0]", "`rm -rf`", "data['HS Code'].max()"]);
    let assistant = assistant(sample_catalog(), &provider);
    let mut conversation = Conversation::new();

    let messages = [
        "How many products?",
        "Nice weather",
        "Show me something broken",
        "Thanks",
        "What is the largest code?",
    ];
    for (n, message) in messages.iter().enumerate() {
        assistant
            .handle_message(&mut conversation, message)
            .await
            .unwrap();
        assert_eq!(conversation.len(), 2 * (n + 1));
    }

    let roles: Vec<Role> = conversation.turns().iter().map(|t| t.role).collect();
    for pair in roles.chunks(2) {
        assert_eq!(pair, [Role::User, Role::Assistant]);
    }
    assert_eq!(provider.calls().len(), 3);
    assert_eq!(conversation.last().unwrap().content, "83021000");
}

#[tokio::test]
async fn test_blank_message_is_rejected_without_recording() {
    let provider = MockAiProvider::new(vec![]);
    let assistant = assistant(bolt_catalog(), &provider);
    let mut conversation = Conversation::new();

    let result = assistant.handle_message(&mut conversation, "   \n").await;

    assert!(matches!(result, Err(PromptError::EmptyMessage)));
    assert!(conversation.is_empty());
    assert!(provider.calls().is_empty());
}

#[tokio::test]
async fn test_whole_word_classifier_skips_embedded_keywords() {
    let provider = MockAiProvider::new(vec![]);
    let catalog = Arc::new(bolt_catalog());
    let assistant = LookupAssistantBuilder::new()
        .ai_provider(Box::new(provider.clone()))
        .backend(Box::new(TabularBackend::new(catalog.clone())))
        .catalog(catalog)
        .classifier(IntentClassifier::WholeWord)
        .build()
        .unwrap();
    let mut conversation = Conversation::new();

    let report = assistant
        .handle_message(&mut conversation, "Whatever, the showroom was nice")
        .await
        .unwrap();

    assert_eq!(report.kind, TurnKind::Acknowledged);
    assert!(provider.calls().is_empty());
}

#[tokio::test]
async fn test_empty_catalog_still_builds_an_assistant() {
    let provider = MockAiProvider::new(vec!["data.shape[0]"]);
    let assistant = assistant(Catalog::empty(), &provider);
    assert!(assistant.system_prompt().contains("Product List:"));

    let mut conversation = Conversation::new();
    let report = assistant
        .handle_message(&mut conversation, "How many records are present?")
        .await
        .unwrap();
    assert_eq!(report.reply, "0");
}

#[test]
fn test_builder_requires_provider_and_backend() {
    let provider = MockAiProvider::new(vec![]);
    let missing_backend = LookupAssistantBuilder::new()
        .ai_provider(Box::new(provider))
        .build();
    assert!(matches!(missing_backend, Err(PromptError::MissingQueryBackend)));

    let missing_provider = LookupAssistantBuilder::new()
        .backend(Box::new(TabularBackend::new(Arc::new(Catalog::empty()))))
        .build();
    assert!(matches!(missing_provider, Err(PromptError::MissingAiProvider)));
}
