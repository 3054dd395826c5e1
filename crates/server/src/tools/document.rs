//! document_search and document_get tool implementations.
//!
//! Both read from the in-memory [`Reader`]; no network I/O is performed.

use charter_core::reader::{SearchPage, TargetView};
use charter_core::{Error, Reader};
use rmcp::{ErrorData as McpError, model::*};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Input parameters for document_search tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DocumentSearchParams {
    /// Search text. Terms are matched case-insensitively, any term may match.
    pub query: String,

    /// Maximum number of hits to return (default: the configured max_results).
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Input parameters for document_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DocumentGetParams {
    /// Anchor id: "preamble", "article-{n}" or "amendment-{n}".
    pub target_id: String,
}

/// Output structure for document_get tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct DocumentGetOutput {
    pub target_id: String,
    pub target: TargetView,
}

pub async fn search_impl(reader: &Reader, params: DocumentSearchParams) -> Result<CallToolResult, McpError> {
    let query = params.query.trim();
    if query.is_empty() {
        return Err(Error::InvalidInput("query cannot be empty".into()).into());
    }

    let limit = params.limit.unwrap_or(reader.options().max_results);
    if limit == 0 {
        return Err(Error::InvalidInput("limit must be at least 1".into()).into());
    }

    let page: SearchPage = reader.search(query, limit)?;
    tracing::info!(query, total = page.total, returned = page.hits.len(), "document_search");

    let json = serde_json::to_string_pretty(&page)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize results: {e}")))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

pub async fn get_impl(reader: &Reader, params: DocumentGetParams) -> Result<CallToolResult, McpError> {
    let target_id = params.target_id.trim();
    let target = reader
        .target(target_id)
        .ok_or_else(|| Error::NotFound(target_id.to_string()))?;

    let output = DocumentGetOutput { target_id: target_id.to_string(), target };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize target: {e}")))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}
