use async_trait::async_trait;
use hslookup::errors::PromptError;
use hslookup::providers::ai::AiProvider;
use hslookup::types::Turn;
use std::collections::VecDeque;
use std::fmt::Debug;
use std::sync::{Arc, Mutex};

// --- Mock AI Provider ---

#[derive(Debug, Clone)]
enum Scripted {
    Reply(String),
    Fail { status: u16, body: String },
}

/// An `AiProvider` that returns scripted replies in order and records every call.
///
/// When the script runs out, calls fail with `PromptError::AiApi`.
#[derive(Clone, Debug, Default)]
pub struct MockAiProvider {
    script: Arc<Mutex<VecDeque<Scripted>>>,
    calls: Arc<Mutex<Vec<(String, Vec<Turn>)>>>,
}

impl MockAiProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a provider that answers with `replies` in order.
    pub fn with_replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let provider = Self::new();
        for reply in replies {
            provider.push_reply(reply);
        }
        provider
    }

    /// Queues a successful completion.
    pub fn push_reply(&self, reply: impl Into<String>) {
        self.script
            .lock()
            .unwrap()
            .push_back(Scripted::Reply(reply.into()));
    }

    /// Queues a failed completion with the given status.
    pub fn push_failure(&self, status: u16, body: &str) {
        self.script.lock().unwrap().push_back(Scripted::Fail {
            status,
            body: body.to_string(),
        });
    }

    /// Retrieves the recorded `(system_prompt, history)` pairs for assertion.
    pub fn get_calls(&self) -> Vec<(String, Vec<Turn>)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl AiProvider for MockAiProvider {
    async fn complete(&self, system_prompt: &str, history: &[Turn]) -> Result<String, PromptError> {
        self.calls
            .lock()
            .unwrap()
            .push((system_prompt.to_string(), history.to_vec()));

        match self.script.lock().unwrap().pop_front() {
            Some(Scripted::Reply(reply)) => Ok(reply),
            Some(Scripted::Fail { status, body }) => Err(PromptError::AiApi { status, body }),
            None => Err(PromptError::AiApi {
                status: 500,
                body: "MockAiProvider: no response programmed".to_string(),
            }),
        }
    }
}
