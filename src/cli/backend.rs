//! In-process stand-in for the remote API used by the shell.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tracing::debug;
use uuid::Uuid;

use crate::wizard::{ActionDispatcher, ActionRequest, ApiResponse, DispatchError};

const ACCOUNT_HOLDERS: [&str; 5] = [
    "ADAEZE OKONKWO",
    "BABATUNDE ADEYEMI",
    "CHIOMA EZE",
    "IBRAHIM MUSA",
    "NGOZI BELLO",
];

/// Deterministic backend: identifiers starting with zeros are rejected,
/// everything else succeeds.
#[derive(Debug, Clone, Default)]
pub struct LocalBackend {
    latency: Duration,
}

impl LocalBackend {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }

    fn handle(&self, request: &ActionRequest) -> Result<ApiResponse, DispatchError> {
        let payload = &request.payload;
        let response = match request.action.as_str() {
            "verify_identity" => {
                let bvn = text(payload, "bvn");
                if bvn.starts_with("0000") {
                    ApiResponse::failure("We could not verify this BVN")
                } else {
                    ApiResponse::ok(json!({ "account_name": account_holder(bvn) }))
                }
            }
            "verify_business" => {
                let rc_number = text(payload, "rc_number");
                if rc_number.starts_with("000") {
                    ApiResponse::failure("No business is registered under this RC number")
                } else {
                    ApiResponse::ok(json!({ "business_name": format!("RC{rc_number} LIMITED") }))
                }
            }
            "register_settlement_bank" => {
                if text(payload, "account_number") == "0000000000" {
                    ApiResponse::failure("This account is already registered")
                } else {
                    ApiResponse::ok(json!({ "reference": Uuid::new_v4().to_string() }))
                }
            }
            "register_tenant" => {
                if text(payload, "admin_email").ends_with("@taken.test") {
                    ApiResponse::failure("An account with this email already exists")
                } else {
                    ApiResponse::ok(json!({ "tenant_id": Uuid::new_v4().to_string() }))
                }
            }
            "set_password" => {
                if text(payload, "current_password") == "incorrect" {
                    ApiResponse::failure("Current password is incorrect")
                } else {
                    ApiResponse::ok_empty()
                }
            }
            other => {
                return Err(DispatchError::Unexpected(format!("unknown action `{other}`")));
            }
        };
        Ok(response)
    }
}

#[async_trait]
impl ActionDispatcher for LocalBackend {
    async fn dispatch(&self, request: ActionRequest) -> Result<ApiResponse, DispatchError> {
        debug!(action = %request.action, "local backend handling request");
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.handle(&request)
    }
}

fn text<'a>(payload: &'a Map<String, Value>, key: &str) -> &'a str {
    payload.get(key).and_then(Value::as_str).unwrap_or_default()
}

fn account_holder(bvn: &str) -> &'static str {
    let sum: usize = bvn
        .chars()
        .filter_map(|c| c.to_digit(10))
        .map(|digit| digit as usize)
        .sum();
    ACCOUNT_HOLDERS[sum % ACCOUNT_HOLDERS.len()]
}
