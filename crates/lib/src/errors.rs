use thiserror::Error;

/// Custom error types for the lookup pipeline.
#[derive(Error, Debug)]
pub enum PromptError {
    #[error("Failed to build Reqwest client: {0}")]
    ReqwestClientBuild(reqwest::Error),
    #[error("Failed to send request to AI provider: {0}")]
    AiRequest(reqwest::Error),
    #[error("AI provider rejected the credentials (status {0})")]
    AiAuth(u16),
    #[error("AI provider returned status {status}: {body}")]
    AiApi { status: u16, body: String },
    #[error("Failed to deserialize AI provider response: {0}")]
    AiDeserialization(reqwest::Error),
    #[error("AI provider response contained no completion")]
    EmptyCompletion,
    #[error("API key is missing")]
    MissingApiKey,
    #[error("No AI provider was configured")]
    MissingAiProvider,
    #[error("No query backend was configured")]
    MissingQueryBackend,
    #[error("The 'sql' feature is not enabled for this build")]
    SqlFeatureNotEnabled,
    #[error("Message text is empty")]
    EmptyMessage,
    #[error("Storage provider connection error: {0}")]
    StorageConnection(String),
    #[error("Storage operation failed: {0}")]
    StorageOperationFailed(String),
}

/// Failures raised while validating or evaluating a query expression.
///
/// These never reach the end user verbatim; the pipeline replaces them with a
/// fixed fallback reply and only logs the detail.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    #[error("Syntax error: {0}")]
    Syntax(String),
    #[error("Unknown field: '{0}'")]
    UnknownField(String),
    #[error("Type error: {0}")]
    Type(String),
    #[error("Operation not allowed: {0}")]
    Forbidden(String),
    #[error("Execution failed: {0}")]
    Execution(String),
}
