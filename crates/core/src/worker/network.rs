//! The network seam the offline worker fetches through.

use std::sync::Arc;

use async_trait::async_trait;

use super::request::{CacheMode, Request, Response};
use crate::NetworkError;

/// Something that can turn a request into a response over the network.
///
/// Non-2xx statuses are responses, not errors; `Err` means no response at
/// all (offline, DNS failure, timeout).
#[async_trait]
pub trait Network: Send + Sync {
    async fn fetch(&self, request: &Request, mode: CacheMode) -> Result<Response, NetworkError>;
}

#[async_trait]
impl<N: Network + ?Sized> Network for Arc<N> {
    async fn fetch(&self, request: &Request, mode: CacheMode) -> Result<Response, NetworkError> {
        (**self).fetch(request, mode).await
    }
}
