#![allow(dead_code)]
//! # Common Test Utilities
//!
//! Shared helpers for the library's integration tests: tracing setup, a recording
//! AI provider and small catalog fixtures.

use async_trait::async_trait;
use dotenvy::dotenv;
use hslookup::providers::ai::AiProvider;
use hslookup::types::{Catalog, CatalogRow, Turn};
use hslookup::PromptError;
use std::collections::VecDeque;
use std::sync::{Arc, Once, RwLock};

static INIT: Once = Once::new();

/// Initializes the tracing subscriber and loads .env for tests.
pub fn setup_tracing() {
    INIT.call_once(|| {
        dotenv().ok();
        tracing_subscriber::fmt::init();
    });
}

// --- Mock AI Provider for Logic Testing ---

/// Returns queued replies in order and records `(system_prompt, history)` for each call.
/// A `None` entry in the queue simulates an unreachable endpoint.
#[derive(Clone, Debug)]
pub struct MockAiProvider {
    pub call_history: Arc<RwLock<Vec<(String, Vec<Turn>)>>>,
    pub responses: Arc<RwLock<VecDeque<Option<String>>>>,
}

impl MockAiProvider {
    pub fn new(responses: Vec<&str>) -> Self {
        Self {
            call_history: Arc::new(RwLock::new(Vec::new())),
            responses: Arc::new(RwLock::new(
                responses.into_iter().map(|r| Some(r.to_string())).collect(),
            )),
        }
    }

    /// A provider whose every call fails.
    pub fn failing() -> Self {
        Self {
            call_history: Arc::new(RwLock::new(Vec::new())),
            responses: Arc::new(RwLock::new(VecDeque::new())),
        }
    }

    pub fn calls(&self) -> Vec<(String, Vec<Turn>)> {
        self.call_history.read().unwrap().clone()
    }
}

#[async_trait]
impl AiProvider for MockAiProvider {
    async fn complete(&self, system_prompt: &str, history: &[Turn]) -> Result<String, PromptError> {
        self.call_history
            .write()
            .unwrap()
            .push((system_prompt.to_string(), history.to_vec()));

        match self.responses.write().unwrap().pop_front().flatten() {
            Some(response) => Ok(response),
            None => Err(PromptError::AiApi {
                status: 503,
                body: "upstream unavailable".to_string(),
            }),
        }
    }
}

// --- Catalog Fixtures ---

pub fn row(name: &str, material: &str, hs_code: i64) -> CatalogRow {
    CatalogRow {
        product_name: name.to_string(),
        definition: format!("A {}", name.to_lowercase()),
        material: material.to_string(),
        hs_code,
        specifications: "standard".to_string(),
    }
}

/// The single-row catalog: one steel bolt.
pub fn bolt_catalog() -> Catalog {
    Catalog::new(vec![row("Bolt X", "steel", 73181510)])
}

pub fn sample_catalog() -> Catalog {
    Catalog::new(vec![
        row("Bolt X", "steel", 73181510),
        row("Nut N5", "steel", 73181600),
        row("Cable Tie", "nylon", 39269097),
        row("Hinge H75", "brass", 83021000),
        row("Stainless Washer", "Stainless Steel", 73182200),
    ])
}
