//! cache_fetch tool implementation.
//!
//! Issues a request as a controlled page would, through the active worker.

use charter_client::resolve_in_origin;
use charter_core::worker::{Request, ResponseKind, ResponseSource};
use charter_core::{Error, Registration};
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use url::Url;

/// Parameters for the cache_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheFetchParams {
    /// Origin-relative path ("/index.html") or absolute URL on the site origin.
    pub path: String,

    /// Treat the request as a top-level navigation (offline page fallback).
    #[serde(default)]
    pub navigate: bool,

    /// HTTP method (default: GET).
    #[serde(default)]
    pub method: Option<String>,
}

/// Output from the cache_fetch tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct CacheFetchOutput {
    pub url: String,
    pub status: u16,
    pub status_text: String,
    pub kind: ResponseKind,
    /// Who answered; absent when the request bypassed the worker.
    pub source: Option<ResponseSource>,
    pub content_type: Option<String>,
    pub body_bytes: usize,
    /// Body as UTF-8 text, absent for binary bodies.
    pub body: Option<String>,
}

/// Implementation of the cache_fetch tool.
pub async fn fetch_impl(
    registration: &Registration, origin: &Url, params: CacheFetchParams,
) -> Result<CallToolResult, McpError> {
    let url = resolve_in_origin(origin, &params.path).map_err(|e| Error::InvalidUrl(e.to_string()))?;

    let mut request = if params.navigate { Request::navigate(url) } else { Request::get(url) };
    if let Some(method) = params.method.as_deref().map(str::trim).filter(|m| !m.is_empty()) {
        request = request.with_method(method);
    }

    let (response, source) = registration.dispatch(&request).await.map_err(Error::from)?;
    tracing::info!(url = %request.url, status = response.status, ?source, "cache_fetch");

    let output = CacheFetchOutput {
        url: request.url.to_string(),
        status: response.status,
        status_text: response.status_text.clone(),
        kind: response.kind,
        source,
        content_type: response.header("content-type").map(str::to_string),
        body_bytes: response.body.len(),
        body: std::str::from_utf8(&response.body).ok().map(str::to_string),
    };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
