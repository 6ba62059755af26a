use hslookup::{Turn, TurnKind};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Deserialize, Default)]
pub struct DebugParams {
    pub debug: Option<bool>,
}

#[derive(Serialize, Deserialize)]
pub struct ApiResponse<T> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<Value>,
    pub result: T,
}

// --- Chat ---

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Continue an existing session; a new one is created when absent.
    #[serde(default)]
    pub session_id: Option<String>,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub session_id: String,
    pub kind: TurnKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub executed_query: Option<String>,
    pub reply: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub session_id: String,
    /// Paths of the images written for this submission.
    pub saved_images: Vec<String>,
    /// Present when the submission carried text and went through the pipeline.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<TurnKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub executed_query: Option<String>,
    pub reply: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub session_id: String,
    pub turns: Vec<Turn>,
}
