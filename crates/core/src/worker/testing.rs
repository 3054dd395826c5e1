//! Scripted network double for worker and loader tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use super::network::Network;
use super::request::{CacheMode, Request, Response, ResponseKind};
use crate::NetworkError;

/// Answers from a fixed table keyed by absolute URL; unknown URLs get 404.
pub(crate) struct ScriptedNetwork {
    routes: Mutex<HashMap<String, Result<Response, NetworkError>>>,
    offline: AtomicBool,
    calls: Mutex<Vec<(String, CacheMode)>>,
}

impl ScriptedNetwork {
    pub(crate) fn new() -> Self {
        Self { routes: Mutex::new(HashMap::new()), offline: AtomicBool::new(false), calls: Mutex::new(Vec::new()) }
    }

    pub(crate) fn offline() -> Self {
        let network = Self::new();
        network.set_offline(true);
        network
    }

    pub(crate) fn respond(self, url: &str, response: Response) -> Self {
        self.routes.lock().unwrap().insert(url.to_string(), Ok(response));
        self
    }

    pub(crate) fn respond_text(self, url: &str, body: &str) -> Self {
        self.respond(url, Response::new(200, "text/plain", body.to_string()))
    }

    pub(crate) fn respond_json(self, url: &str, body: &str) -> Self {
        self.respond(url, Response::new(200, "application/json", body.to_string()))
    }

    pub(crate) fn respond_status(self, url: &str, status: u16) -> Self {
        self.respond(url, Response::new(status, "text/plain", ""))
    }

    pub(crate) fn fail(self, url: &str) -> Self {
        self.routes
            .lock()
            .unwrap()
            .insert(url.to_string(), Err(NetworkError::Unreachable(format!("scripted failure for {url}"))));
        self
    }

    pub(crate) fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub(crate) fn calls(&self) -> Vec<(String, CacheMode)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Network for ScriptedNetwork {
    async fn fetch(&self, request: &Request, mode: CacheMode) -> Result<Response, NetworkError> {
        let url = request.url.as_str().to_string();
        self.calls.lock().unwrap().push((url.clone(), mode));

        if self.offline.load(Ordering::SeqCst) {
            return Err(NetworkError::Unreachable("network is offline".into()));
        }

        match self.routes.lock().unwrap().get(&url) {
            Some(Ok(response)) => Ok(Response { url: Some(url), ..response.clone() }),
            Some(Err(e)) => Err(e.clone()),
            None => Ok(Response::new(404, "text/plain", "not found").with_kind(ResponseKind::Basic)),
        }
    }
}
