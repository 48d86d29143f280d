//! Boundary with the external API layer.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

/// Shown in place of raw failure detail when a dispatch goes wrong.
pub const UNEXPECTED_ERROR_MESSAGE: &str = "An unexpected error occurred. Please try again.";

/// Side-effecting request sent to the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRequest {
    pub action: String,
    pub session_id: Uuid,
    pub payload: Map<String, Value>,
}

/// Response envelope: `{ success, data?, error? }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ApiResponse {
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn ok_empty() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }

    /// Data on success; the server message verbatim on failure.
    pub fn into_result(self) -> Result<Option<Value>, String> {
        if self.success {
            Ok(self.data)
        } else {
            Err(self
                .error
                .unwrap_or_else(|| UNEXPECTED_ERROR_MESSAGE.to_string()))
        }
    }
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("unexpected dispatcher failure: {0}")]
    Unexpected(String),
}

/// External collaborator that performs verification and submission actions.
#[async_trait]
pub trait ActionDispatcher: Send + Sync {
    async fn dispatch(&self, request: ActionRequest) -> Result<ApiResponse, DispatchError>;
}
