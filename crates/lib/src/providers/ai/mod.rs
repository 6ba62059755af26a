pub mod openai;

use crate::{errors::PromptError, types::Turn};
use async_trait::async_trait;
use dyn_clone::DynClone;
use std::fmt::Debug;

/// A trait for interacting with a chat-completion provider.
///
/// This trait defines a common interface for turning a conversation into a single
/// assistant message using different Large Language Model endpoints.
#[async_trait]
pub trait AiProvider: Send + Sync + Debug + DynClone {
    /// Sends the system prompt followed by `history`, in order, and returns the
    /// assistant's reply trimmed of surrounding whitespace.
    ///
    /// Failures are always reported as errors, never as an empty reply.
    async fn complete(&self, system_prompt: &str, history: &[Turn]) -> Result<String, PromptError>;
}

dyn_clone::clone_trait_object!(AiProvider);
