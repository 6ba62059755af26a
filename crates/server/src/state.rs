//! # Application State
//!
//! This module defines the shared application state (`AppState`) and the logic
//! for building it at startup. The `AppState` holds the configuration, the catalog
//! snapshot, the lookup assistant and the per-session conversations, making them
//! accessible to all request handlers.

use crate::config::{AppConfig, SessionConfig};
use hslookup::{
    load_catalog,
    providers::{
        ai::{
            openai::{OpenAiProvider, OpenAiSettings},
            AiProvider,
        },
        factory::build_backend,
    },
    Catalog, Conversation, LookupAssistant, LookupAssistantBuilder, QueryBackendKind,
};
use std::{
    collections::HashMap,
    path::Path,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};
use uuid::Uuid;

/// A shared handle to one session's conversation.
pub type SharedConversation = Arc<Mutex<Conversation>>;

struct SessionEntry {
    conversation: SharedConversation,
    last_seen: Instant,
}

/// Conversations keyed by session id.
///
/// The map lock is only held to look up or insert a session; each conversation has
/// its own mutex, which serializes submissions within a session. Sessions idle for
/// longer than `idle_timeout` are dropped, and once `max_sessions` are live the
/// least recently used one makes room for a new one.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, SessionEntry>>>,
    max_sessions: usize,
    idle_timeout: Duration,
}

impl SessionStore {
    pub fn new(max_sessions: usize, idle_timeout: Duration) -> Self {
        Self {
            sessions: Arc::default(),
            max_sessions: max_sessions.max(1),
            idle_timeout,
        }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(
            config.max_sessions,
            Duration::from_secs(config.idle_timeout_secs),
        )
    }

    /// Returns the session named `session_id`, creating it if needed. A fresh id is
    /// generated when none is given. Either way the session counts as just used.
    pub async fn get_or_create(&self, session_id: Option<String>) -> (String, SharedConversation) {
        let id = session_id.unwrap_or_else(|| Uuid::new_v4().to_string());
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;

        let before = sessions.len();
        sessions.retain(|_, entry| now.duration_since(entry.last_seen) < self.idle_timeout);
        if sessions.len() < before {
            debug!(expired = before - sessions.len(), "Dropped idle sessions.");
        }

        if let Some(entry) = sessions.get_mut(&id) {
            entry.last_seen = now;
            return (id, entry.conversation.clone());
        }

        if sessions.len() >= self.max_sessions {
            let oldest = sessions
                .iter()
                .min_by_key(|(_, entry)| entry.last_seen)
                .map(|(key, _)| key.clone());
            if let Some(oldest) = oldest {
                sessions.remove(&oldest);
                info!("Session limit reached; dropped least recently used session '{oldest}'.");
            }
        }

        info!("Starting new session '{id}'.");
        let conversation = Arc::new(Mutex::new(Conversation::new()));
        sessions.insert(
            id.clone(),
            SessionEntry {
                conversation: conversation.clone(),
                last_seen: now,
            },
        );
        (id, conversation)
    }

    /// Looks up a live session without marking it as used.
    pub async fn get(&self, session_id: &str) -> Option<SharedConversation> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .filter(|entry| entry.last_seen.elapsed() < self.idle_timeout)
            .map(|entry| entry.conversation.clone())
    }

    /// Number of stored sessions, including idle ones not yet swept.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

/// The shared application state, accessible from all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// The application's configuration, loaded from `config.yml`.
    pub config: Arc<AppConfig>,
    /// The catalog snapshot loaded at startup.
    pub catalog: Arc<Catalog>,
    /// The pipeline shared by every session.
    pub assistant: Arc<LookupAssistant>,
    pub sessions: SessionStore,
}

/// Builds the shared application state from the configuration.
///
/// The completion client is created from the `completion` section; a missing or
/// blank API key is a startup error.
pub async fn build_app_state(config: AppConfig) -> anyhow::Result<AppState> {
    let completion = &config.completion;
    let mut settings = OpenAiSettings::new(
        completion.api_url.clone(),
        completion.api_key.clone().unwrap_or_default(),
        completion.model_name.clone(),
    );
    settings.max_tokens = completion.max_tokens;
    settings.timeout = Duration::from_secs(completion.timeout_secs);
    settings.max_retries = completion.max_retries;

    let ai_provider = OpenAiProvider::new(settings).map_err(|e| {
        anyhow::anyhow!("Failed to configure the completion client (set completion.api_key): {e}")
    })?;

    build_app_state_with_provider(config, Box::new(ai_provider)).await
}

/// Builds the application state around an already constructed AI provider.
///
/// This loads the catalog, prepares the configured query backend and renders the
/// grounding prompt once for the lifetime of the server.
pub async fn build_app_state_with_provider(
    config: AppConfig,
    ai_provider: Box<dyn AiProvider>,
) -> anyhow::Result<AppState> {
    let source = config.catalog.source()?;
    let catalog = Arc::new(load_catalog(&source).await);

    if config.query_backend == QueryBackendKind::Sql {
        if let Some(parent) = Path::new(&config.db_url).parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
    }
    let backend = build_backend(config.query_backend, catalog.clone(), &config.db_url).await?;

    let assistant = LookupAssistantBuilder::new()
        .ai_provider(ai_provider)
        .backend(backend)
        .classifier(config.classifier)
        .catalog(catalog.clone())
        .build()?;
    info!(
        products = catalog.len(),
        backend = assistant.backend.name(),
        "Lookup assistant ready."
    );

    let sessions = SessionStore::from_config(&config.sessions);

    Ok(AppState {
        config: Arc::new(config),
        catalog,
        assistant: Arc::new(assistant),
        sessions,
    })
}
