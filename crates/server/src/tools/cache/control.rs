//! cache_control tool implementation.
//!
//! Posts a control message to the worker and returns its reply.

use charter_core::worker::{ControlMessage, ControlReply, WorkerState};
use charter_core::{Error, Registration};
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the cache_control tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheControlParams {
    /// Message type: SKIP_WAITING, GET_CACHE_STATUS or CLEAR_CACHE.
    pub message: String,
}

/// Output from the cache_control tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct CacheControlOutput {
    pub message: String,
    /// The worker's reply, for message types that have one.
    pub reply: Option<ControlReply>,
    /// State of the active worker after the message was handled.
    pub active_state: Option<WorkerState>,
    pub update_available: bool,
}

/// Implementation of the cache_control tool.
pub async fn control_impl(registration: &Registration, params: CacheControlParams) -> Result<CallToolResult, McpError> {
    let message = params.message.trim();
    if message.is_empty() {
        return Err(Error::InvalidInput("message cannot be empty".into()).into());
    }

    let reply = registration
        .post_message(&ControlMessage::from_type(message).to_value())
        .await?;

    let active_state = match registration.active().await {
        Some(worker) => Some(worker.state().await),
        None => None,
    };

    let output = CacheControlOutput {
        message: message.to_string(),
        reply,
        active_state,
        update_available: registration.update_available().await,
    };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
