//! # Common Test Utilities
//!
//! This module centralizes the test harness used across the `hslookup-server`
//! integration tests.
//!
//! - `TestApp`: spawns a real server on a random port, configured from a temporary
//!   `config.yml` whose completion endpoint points at an `httpmock::MockServer`.
//! - Helpers for building mock completion replies and reading API responses.

// Allow unused code because this is a test utility module, and not all
// functions might be used by every test file that includes it.
#![allow(unused)]

use anyhow::Result;
use axum::serve;
use hslookup_server::{
    config,
    router,
    state::{build_app_state, AppState},
};
use httpmock::MockServer;
use reqwest::Client;
use serde_json::{json, Value};
use std::{fs, net::SocketAddr, path::PathBuf};
use tempfile::{tempdir, TempDir};
use tokio::{net::TcpListener, task::JoinHandle};

/// The catalog used by most server tests.
pub const TEST_CATALOG_CSV: &str = "Product Name,Definition,Material,HS Code,Specifications\n\
Bolt X,A hexagon bolt,steel,73181510,M8\n\
Cable Tie,A nylon strap,nylon,39269097,200 mm\n\
Hinge H75,A butt hinge,brass,83021000,75 mm\n";

/// Knobs for the generated `config.yml`.
pub struct TestAppOptions {
    pub query_backend: &'static str,
    pub classifier: &'static str,
    /// Catalog CSV written to disk; `None` points the config at a missing file.
    pub catalog_csv: Option<&'static str>,
}

impl Default for TestAppOptions {
    fn default() -> Self {
        Self {
            query_backend: "tabular",
            classifier: "substring",
            catalog_csv: Some(TEST_CATALOG_CSV),
        }
    }
}

/// A harness for end-to-end testing of the Axum server.
pub struct TestApp {
    pub address: String,
    pub client: Client,
    pub mock_server: MockServer,
    pub app_state: AppState,
    pub upload_dir: PathBuf,
    _work_dir: Option<TempDir>,
    _server_handle: JoinHandle<()>,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestApp {
    /// Spawns the application server with the default options.
    pub async fn spawn() -> Result<Self> {
        Self::spawn_with(TestAppOptions::default()).await
    }

    /// Writes a config file for `options`, builds the state from it and spawns the server.
    pub async fn spawn_with(options: TestAppOptions) -> Result<Self> {
        let mock_server = MockServer::start_async().await;
        let work_dir = tempdir()?;

        let catalog_path = work_dir.path().join("catalog.csv");
        if let Some(csv) = options.catalog_csv {
            fs::write(&catalog_path, csv)?;
        }

        let config_path = work_dir.path().join("config.yml");
        let config_content = format!(
            r#"
port: 0
db_url: "{}"
upload_dir: "{}"
query_backend: {}
classifier: {}
catalog:
  source: csv
  path: "{}"
completion:
  api_url: "{}"
  api_key: "test-key"
  model_name: "mock-chat-model"
  timeout_secs: 5
"#,
            work_dir.path().join("db").join("hslookup.db").display(),
            work_dir.path().join("uploads").display(),
            options.query_backend,
            options.classifier,
            catalog_path.display(),
            mock_server.url("/v1/chat/completions"),
        );
        fs::write(&config_path, config_content)?;

        let config = config::get_config(Some(config_path.to_str().unwrap()))?;
        let app_state = build_app_state(config).await?;

        let mut app = TestApp::spawn_with_state(app_state, mock_server).await?;
        app._work_dir = Some(work_dir);
        Ok(app)
    }

    /// Spawns the server around a prepared `AppState`.
    pub async fn spawn_with_state(app_state: AppState, mock_server: MockServer) -> Result<Self> {
        dotenvy::dotenv().ok();
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .compact()
            .try_init();

        let upload_dir = PathBuf::from(&app_state.config.upload_dir);
        let app_state_for_harness = app_state.clone();

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr: SocketAddr = listener.local_addr()?;
        let address = format!("http://{addr}");

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
        let server_handle = tokio::spawn(async move {
            let app = router::create_router(app_state);
            let server = serve(listener, app).with_graceful_shutdown(async {
                shutdown_rx.await.ok();
            });
            if let Err(e) = server.await {
                tracing::error!("[TestApp] Server error: {}", e);
            }
        });

        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        Ok(Self {
            address,
            client: Client::new(),
            mock_server,
            app_state: app_state_for_harness,
            upload_dir,
            _work_dir: None,
            _server_handle: server_handle,
            shutdown_tx: Some(shutdown_tx),
        })
    }

    /// Posts a chat message and returns the status with the parsed body.
    pub async fn chat(&self, payload: Value) -> Result<(u16, Value)> {
        let response = self
            .client
            .post(format!("{}/chat", self.address))
            .json(&payload)
            .send()
            .await?;
        let status = response.status().as_u16();
        Ok((status, response.json().await?))
    }

    pub async fn history(&self, session_id: &str) -> Result<(u16, Value)> {
        let response = self
            .client
            .get(format!("{}/sessions/{session_id}/history", self.address))
            .send()
            .await?;
        let status = response.status().as_u16();
        Ok((status, response.json().await?))
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// An OpenAI-compatible completion body carrying `content`.
pub fn completion_body(content: &str) -> Value {
    json!({
        "choices": [{"message": {"role": "assistant", "content": content}}]
    })
}
