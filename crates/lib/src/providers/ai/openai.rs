use crate::{errors::PromptError, providers::ai::AiProvider, types::Turn};
use async_trait::async_trait;
use reqwest::{Client as ReqwestClient, StatusCode};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::time::Duration;
use tracing::{debug, warn};

/// Default request timeout applied when none is configured.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default cap on generated tokens.
pub const DEFAULT_MAX_TOKENS: u32 = 3000;

const RETRY_DELAY: Duration = Duration::from_millis(250);

// --- OpenAI-compatible request and response structures ---

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
}

#[derive(Serialize, Debug)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize, Debug)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize, Debug)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize, Debug)]
struct ChatResponseMessage {
    content: Option<String>,
}

// --- OpenAI Provider implementation ---

/// Settings for an `OpenAiProvider`.
#[derive(Clone, Debug)]
pub struct OpenAiSettings {
    pub api_url: String,
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
    pub timeout: Duration,
    /// Extra attempts after a transient network failure; capped at one.
    pub max_retries: u32,
}

impl OpenAiSettings {
    pub fn new(api_url: impl Into<String>, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_retries: 1,
        }
    }
}

/// A provider for the OpenAI chat-completions API or any compatible endpoint.
#[derive(Clone)]
pub struct OpenAiProvider {
    client: ReqwestClient,
    settings: OpenAiSettings,
}

impl Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("api_url", &self.settings.api_url)
            .field("model", &self.settings.model)
            .finish_non_exhaustive()
    }
}

impl OpenAiProvider {
    /// Creates a new `OpenAiProvider`. The API key must not be blank.
    pub fn new(settings: OpenAiSettings) -> Result<Self, PromptError> {
        if settings.api_key.trim().is_empty() {
            return Err(PromptError::MissingApiKey);
        }
        let client = ReqwestClient::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(PromptError::ReqwestClientBuild)?;
        Ok(Self { client, settings })
    }

    async fn send_once(&self, request_body: &ChatRequest<'_>) -> Result<String, PromptError> {
        let response = self
            .client
            .post(&self.settings.api_url)
            .bearer_auth(&self.settings.api_key)
            .json(request_body)
            .send()
            .await
            .map_err(PromptError::AiRequest)?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(PromptError::AiAuth(status.as_u16()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PromptError::AiApi {
                status: status.as_u16(),
                body,
            });
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(PromptError::AiDeserialization)?;

        chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or(PromptError::EmptyCompletion)
    }
}

/// Timeouts and connection failures are worth one more attempt; anything the
/// server actually answered is not.
fn is_transient(error: &PromptError) -> bool {
    matches!(error, PromptError::AiRequest(e) if e.is_timeout() || e.is_connect())
}

#[async_trait]
impl AiProvider for OpenAiProvider {
    async fn complete(&self, system_prompt: &str, history: &[Turn]) -> Result<String, PromptError> {
        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(ChatMessage {
            role: "system",
            content: system_prompt,
        });
        messages.extend(history.iter().map(|turn| ChatMessage {
            role: turn.role.as_str(),
            content: &turn.content,
        }));

        let request_body = ChatRequest {
            model: &self.settings.model,
            messages,
            max_tokens: self.settings.max_tokens,
        };

        debug!(
            model = %self.settings.model,
            messages = request_body.messages.len(),
            "--> Sending conversation to completion endpoint"
        );

        let retries = self.settings.max_retries.min(1);
        let mut attempt = 0;
        loop {
            match self.send_once(&request_body).await {
                Err(e) if attempt < retries && is_transient(&e) => {
                    attempt += 1;
                    warn!("Transient completion failure, retrying once: {e}");
                    tokio::time::sleep(RETRY_DELAY).await;
                }
                result => return result,
            }
        }
    }
}
