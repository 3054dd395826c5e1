//! The offline worker: one cache generation's state machine.
//!
//! A host drives it through [`OfflineWorker::on_install`],
//! [`OfflineWorker::on_activate`], [`OfflineWorker::on_fetch`] and
//! [`OfflineWorker::on_message`]. Nothing here touches a browser; storage is
//! a [`CacheDb`] and the network is any [`Network`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use schemars::JsonSchema;
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use url::Url;

use super::message::{ControlMessage, ControlReply, ReplyPort};
use super::network::Network;
use super::request::{CacheMode, Request, Response, ResponseKind};
use super::state::WorkerState;
use crate::{CacheDb, Error};

/// Static settings of one worker generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerConfig {
    /// Only requests to this origin are intercepted.
    pub origin: Url,
    pub static_cache: String,
    pub dynamic_cache: String,
    /// Origin-relative paths cached at install.
    pub manifest: Vec<String>,
    /// Served for navigations when the network is unreachable.
    pub offline_page: String,
}

/// Result of the install step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InstallReport {
    pub cached: Vec<String>,
    /// `(path, reason)` for every manifest entry that could not be stored.
    pub failed: Vec<(String, String)>,
}

/// Result of the activate step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ActivateReport {
    /// Stale generations that were purged.
    pub deleted: Vec<String>,
}

/// Where an intercepted response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ResponseSource {
    Cache,
    Network,
    /// Cached offline page served for a failed navigation.
    OfflinePage,
    /// Synthesized 503 payload.
    OfflineFallback,
}

impl ResponseSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseSource::Cache => "cache",
            ResponseSource::Network => "network",
            ResponseSource::OfflinePage => "offline_page",
            ResponseSource::OfflineFallback => "offline_fallback",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Not intercepted; the host performs the request itself.
    Passthrough,
    Respond { response: Response, source: ResponseSource },
}

pub struct OfflineWorker {
    config: WorkerConfig,
    db: CacheDb,
    network: Arc<dyn Network>,
    state: RwLock<WorkerState>,
    skip_waiting: AtomicBool,
    clients_claimed: AtomicBool,
    pending_writes: Mutex<Vec<JoinHandle<()>>>,
}

impl OfflineWorker {
    /// A fresh worker in the `Installing` state.
    pub fn new(config: WorkerConfig, db: CacheDb, network: Arc<dyn Network>) -> Self {
        Self::with_state(config, db, network, WorkerState::Installing)
    }

    /// A worker for a generation that was installed and activated in an
    /// earlier session. Its caches are reused as they are.
    pub fn restored(config: WorkerConfig, db: CacheDb, network: Arc<dyn Network>) -> Self {
        let worker = Self::with_state(config, db, network, WorkerState::Active);
        worker.clients_claimed.store(true, Ordering::SeqCst);
        worker
    }

    fn with_state(config: WorkerConfig, db: CacheDb, network: Arc<dyn Network>, state: WorkerState) -> Self {
        Self {
            config,
            db,
            network,
            state: RwLock::new(state),
            skip_waiting: AtomicBool::new(false),
            clients_claimed: AtomicBool::new(false),
            pending_writes: Mutex::new(Vec::new()),
        }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub async fn state(&self) -> WorkerState {
        *self.state.read().await
    }

    pub fn skip_waiting_requested(&self) -> bool {
        self.skip_waiting.load(Ordering::SeqCst)
    }

    pub fn clients_claimed(&self) -> bool {
        self.clients_claimed.load(Ordering::SeqCst)
    }

    async fn transition(&self, from: &[WorkerState], to: WorkerState) -> Result<(), Error> {
        let mut state = self.state.write().await;
        if !from.contains(&*state) {
            return Err(Error::InvalidTransition { from: *state, to });
        }
        tracing::info!(cache = %self.config.static_cache, from = state.as_str(), to = to.as_str(), "worker state change");
        *state = to;
        Ok(())
    }

    /// Superseded by a newer generation. Valid from any state.
    pub async fn become_redundant(&self) {
        let mut state = self.state.write().await;
        if *state != WorkerState::Redundant {
            tracing::info!(cache = %self.config.static_cache, from = state.as_str(), "worker became redundant");
            *state = WorkerState::Redundant;
        }
    }

    /// Fetch every manifest resource into the static generation.
    ///
    /// Each resource is fetched past intermediary caches and stored on its
    /// own; failures are logged and reported but never abort the install.
    /// The worker asks to skip waiting as soon as it is installed.
    pub async fn on_install(&self) -> Result<InstallReport, Error> {
        {
            let state = self.state.read().await;
            if *state != WorkerState::Installing {
                return Err(Error::InvalidTransition { from: *state, to: WorkerState::Installed });
            }
        }

        tracing::info!(cache = %self.config.static_cache, resources = self.config.manifest.len(), "caching static resources");

        let mut report = InstallReport::default();
        if let Err(e) = self.db.open_cache(&self.config.static_cache).await {
            tracing::error!("failed to open static cache {}: {}", self.config.static_cache, e);
        }

        for path in &self.config.manifest {
            match self.cache_manifest_entry(path).await {
                Ok(()) => report.cached.push(path.clone()),
                Err(reason) => {
                    tracing::warn!("failed to cache static resource {}: {}", path, reason);
                    report.failed.push((path.clone(), reason));
                }
            }
        }

        self.skip_waiting.store(true, Ordering::SeqCst);
        self.transition(&[WorkerState::Installing], WorkerState::Installed).await?;

        tracing::info!(cached = report.cached.len(), failed = report.failed.len(), "install finished");
        Ok(report)
    }

    async fn cache_manifest_entry(&self, path: &str) -> Result<(), String> {
        let url = self.config.origin.join(path).map_err(|e| e.to_string())?;
        let request = Request::get(url);
        let response = self
            .network
            .fetch(&request, CacheMode::Reload)
            .await
            .map_err(|e| e.to_string())?;
        if !response.ok() {
            return Err(format!("HTTP {}", response.status));
        }
        self.db
            .put(&self.config.static_cache, &request, &response)
            .await
            .map_err(|e| e.to_string())
    }

    /// Purge every generation other than the current static and dynamic
    /// ones, then claim all clients.
    pub async fn on_activate(&self) -> Result<ActivateReport, Error> {
        self.transition(&[WorkerState::Installed], WorkerState::Activating).await?;

        let mut report = ActivateReport::default();
        let names = self.db.cache_names().await.unwrap_or_else(|e| {
            tracing::error!("failed to enumerate cache generations: {}", e);
            Vec::new()
        });

        for name in names {
            if name == self.config.static_cache || name == self.config.dynamic_cache {
                continue;
            }
            tracing::info!("deleting old cache: {}", name);
            match self.db.delete_cache(&name).await {
                Ok(_) => report.deleted.push(name),
                Err(e) => tracing::error!("failed to delete cache {}: {}", name, e),
            }
        }

        self.clients_claimed.store(true, Ordering::SeqCst);
        self.transition(&[WorkerState::Activating], WorkerState::Active).await?;
        Ok(report)
    }

    /// Answer a request: cache first, then network, then offline fallback.
    ///
    /// Never fails. Requests the worker does not handle come back as
    /// [`FetchOutcome::Passthrough`].
    pub async fn on_fetch(&self, request: &Request) -> FetchOutcome {
        if self.state().await != WorkerState::Active {
            return FetchOutcome::Passthrough;
        }
        if !request.is_http() || request.url.origin() != self.config.origin.origin() {
            tracing::debug!("not intercepting {}", request.url);
            return FetchOutcome::Passthrough;
        }

        match self
            .db
            .match_first(&[&self.config.static_cache, &self.config.dynamic_cache], request)
            .await
        {
            Ok(Some((cache, response))) => {
                tracing::debug!("cache hit for {} in {}", request.url, cache);
                return FetchOutcome::Respond { response, source: ResponseSource::Cache };
            }
            Ok(None) => tracing::debug!("cache miss for {}", request.url),
            Err(e) => tracing::warn!("cache lookup failed for {}: {}", request.url, e),
        }

        match self.network.fetch(request, CacheMode::Default).await {
            Ok(response) => {
                if response.status == 200 && response.kind == ResponseKind::Basic {
                    self.store_in_background(request, &response).await;
                }
                FetchOutcome::Respond { response, source: ResponseSource::Network }
            }
            Err(e) => {
                tracing::error!("fetch failed for {}: {}", request.url, e);
                self.offline_response(request).await
            }
        }
    }

    /// Write a copy into the dynamic generation without blocking the caller.
    async fn store_in_background(&self, request: &Request, response: &Response) {
        if !request.is_get() {
            tracing::debug!("not caching {} {}", request.method, request.url);
            return;
        }

        let db = self.db.clone();
        let cache = self.config.dynamic_cache.clone();
        let request = request.clone();
        let response = response.clone();
        let handle = tokio::spawn(async move {
            if let Err(e) = db.put(&cache, &request, &response).await {
                tracing::error!("background cache write for {} failed: {}", request.url, e);
            }
        });

        let mut pending = self.pending_writes.lock().await;
        pending.retain(|h| !h.is_finished());
        pending.push(handle);
    }

    /// Wait for every background cache write started so far.
    pub async fn settle(&self) {
        let handles = std::mem::take(&mut *self.pending_writes.lock().await);
        for handle in handles {
            if let Err(e) = handle.await {
                tracing::error!("background cache write task failed: {}", e);
            }
        }
    }

    async fn offline_response(&self, request: &Request) -> FetchOutcome {
        if request.is_navigation() {
            match self.config.origin.join(&self.config.offline_page) {
                Ok(url) => {
                    let page = Request::get(url);
                    match self
                        .db
                        .match_first(&[&self.config.static_cache, &self.config.dynamic_cache], &page)
                        .await
                    {
                        Ok(Some((_, response))) => {
                            return FetchOutcome::Respond { response, source: ResponseSource::OfflinePage };
                        }
                        Ok(None) => tracing::warn!("offline page {} is not cached", self.config.offline_page),
                        Err(e) => tracing::warn!("offline page lookup failed: {}", e),
                    }
                }
                Err(e) => tracing::warn!("invalid offline page path {}: {}", self.config.offline_page, e),
            }
        }

        FetchOutcome::Respond { response: Response::offline(), source: ResponseSource::OfflineFallback }
    }

    /// Handle a control message, replying on `reply` when the type expects it.
    pub async fn on_message(&self, message: ControlMessage, reply: Option<ReplyPort>) {
        match &message {
            ControlMessage::SkipWaiting => {
                tracing::info!(cache = %self.config.static_cache, "skip waiting requested");
                self.skip_waiting.store(true, Ordering::SeqCst);
            }
            ControlMessage::GetCacheStatus => {
                let status = ControlReply::CacheStatus {
                    cache_status: self.state().await.to_string(),
                    cache_name: self.config.static_cache.clone(),
                };
                Self::send_reply(&message, reply, status);
            }
            ControlMessage::ClearCache => match self.clear_all().await {
                Ok(deleted) => {
                    tracing::info!(deleted, "cleared all cache generations");
                    Self::send_reply(&message, reply, ControlReply::Ack { success: true });
                }
                Err(e) => tracing::error!("failed to clear caches: {}", e),
            },
            ControlMessage::Unknown(kind) => {
                tracing::info!("unknown message type: {}", kind.as_deref().unwrap_or("<missing>"));
            }
        }
    }

    fn send_reply(message: &ControlMessage, reply: Option<ReplyPort>, value: ControlReply) {
        let name = message.type_name().unwrap_or("<missing>");
        match reply {
            Some(port) => {
                if port.send(value).is_err() {
                    tracing::debug!("reply to {} dropped: receiver closed", name);
                }
            }
            None => tracing::warn!("{} needs a reply port; ignoring", name),
        }
    }

    /// Delete every cache generation, current ones included.
    async fn clear_all(&self) -> Result<usize, Error> {
        let names = self.db.cache_names().await?;
        let mut deleted = 0;
        for name in names {
            if self.db.delete_cache(&name).await? {
                deleted += 1;
            }
        }
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::testing::ScriptedNetwork;
    use bytes::Bytes;
    use tokio::sync::oneshot;

    const ORIGIN: &str = "http://localhost:8080";

    fn url(path: &str) -> Url {
        Url::parse(ORIGIN).unwrap().join(path).unwrap()
    }

    fn config(manifest: &[&str]) -> WorkerConfig {
        WorkerConfig {
            origin: Url::parse(ORIGIN).unwrap(),
            static_cache: "us-constitution-v1".into(),
            dynamic_cache: "us-constitution-dynamic-v1".into(),
            manifest: manifest.iter().map(|p| p.to_string()).collect(),
            offline_page: "/index.html".into(),
        }
    }

    fn site() -> ScriptedNetwork {
        ScriptedNetwork::new()
            .respond_text(url("/").as_str(), "<html>root</html>")
            .respond_text(url("/index.html").as_str(), "<html>index</html>")
            .respond_text(url("/styles/main.css").as_str(), "body {}")
            .respond_json(url("/data/constitution.json").as_str(), "{}")
    }

    async fn active_worker(network: Arc<ScriptedNetwork>) -> (OfflineWorker, CacheDb) {
        let db = CacheDb::open_in_memory().await.unwrap();
        let worker = OfflineWorker::new(
            config(&["/", "/index.html", "/styles/main.css", "/data/constitution.json"]),
            db.clone(),
            network,
        );
        worker.on_install().await.unwrap();
        worker.on_activate().await.unwrap();
        (worker, db)
    }

    fn body_of(outcome: &FetchOutcome) -> (Bytes, ResponseSource) {
        match outcome {
            FetchOutcome::Respond { response, source } => (response.body.clone(), *source),
            FetchOutcome::Passthrough => panic!("expected a response, got passthrough"),
        }
    }

    #[tokio::test]
    async fn test_install_caches_manifest_with_reload() {
        let network = Arc::new(site());
        let db = CacheDb::open_in_memory().await.unwrap();
        let worker = OfflineWorker::new(config(&["/", "/styles/main.css"]), db.clone(), network.clone());

        let report = worker.on_install().await.unwrap();
        assert_eq!(report.cached, vec!["/", "/styles/main.css"]);
        assert!(report.failed.is_empty());
        assert_eq!(worker.state().await, WorkerState::Installed);
        assert!(worker.skip_waiting_requested());
        assert_eq!(db.entry_count("us-constitution-v1").await.unwrap(), 2);
        assert!(network.calls().iter().all(|(_, mode)| *mode == CacheMode::Reload));
    }

    #[tokio::test]
    async fn test_install_is_best_effort() {
        let network = Arc::new(site().fail(url("/js/app.js").as_str()));
        let db = CacheDb::open_in_memory().await.unwrap();
        let worker = OfflineWorker::new(config(&["/", "/js/app.js", "/missing.png"]), db.clone(), network);

        let report = worker.on_install().await.unwrap();
        assert_eq!(report.cached, vec!["/"]);
        let failed: Vec<&str> = report.failed.iter().map(|(p, _)| p.as_str()).collect();
        assert_eq!(failed, vec!["/js/app.js", "/missing.png"]);
        assert_eq!(worker.state().await, WorkerState::Installed);
        assert_eq!(db.entry_count("us-constitution-v1").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_transitions_are_ordered() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let worker = OfflineWorker::new(config(&[]), db, Arc::new(site()));

        assert!(matches!(
            worker.on_activate().await,
            Err(Error::InvalidTransition { from: WorkerState::Installing, to: WorkerState::Activating })
        ));
        worker.on_install().await.unwrap();
        assert!(worker.on_install().await.is_err());
        worker.on_activate().await.unwrap();
        assert_eq!(worker.state().await, WorkerState::Active);
        assert!(worker.clients_claimed());
    }

    #[tokio::test]
    async fn test_activate_purges_stale_generations() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_cache("us-constitution-v0").await.unwrap();
        db.open_cache("unrelated-cache").await.unwrap();
        db.open_cache("us-constitution-dynamic-v1").await.unwrap();

        let worker = OfflineWorker::new(config(&["/"]), db.clone(), Arc::new(site()));
        worker.on_install().await.unwrap();
        let report = worker.on_activate().await.unwrap();

        assert_eq!(report.deleted, vec!["us-constitution-v0", "unrelated-cache"]);
        let mut names = db.cache_names().await.unwrap();
        names.sort();
        assert_eq!(names, vec!["us-constitution-dynamic-v1", "us-constitution-v1"]);
    }

    #[tokio::test]
    async fn test_manifest_resource_served_offline() {
        let network = Arc::new(site());
        let (worker, _db) = active_worker(network.clone()).await;
        network.set_offline(true);

        let outcome = worker.on_fetch(&Request::get(url("/styles/main.css"))).await;
        let (body, source) = body_of(&outcome);
        assert_eq!(source, ResponseSource::Cache);
        assert_eq!(body, Bytes::from("body {}"));
    }

    #[tokio::test]
    async fn test_cache_hit_skips_network() {
        let network = Arc::new(site());
        let (worker, _db) = active_worker(network.clone()).await;
        let before = network.calls().len();

        worker.on_fetch(&Request::get(url("/index.html"))).await;
        assert_eq!(network.calls().len(), before);
    }

    #[tokio::test]
    async fn test_miss_goes_to_network_and_is_stored() {
        let network = Arc::new(site().respond_text(url("/js/search.js").as_str(), "search()"));
        let (worker, db) = active_worker(network.clone()).await;

        let outcome = worker.on_fetch(&Request::get(url("/js/search.js"))).await;
        assert_eq!(body_of(&outcome).1, ResponseSource::Network);

        worker.settle().await;
        assert_eq!(db.entry_count("us-constitution-dynamic-v1").await.unwrap(), 1);

        network.set_offline(true);
        let outcome = worker.on_fetch(&Request::get(url("/js/search.js"))).await;
        assert_eq!(body_of(&outcome), (Bytes::from("search()"), ResponseSource::Cache));
    }

    #[tokio::test]
    async fn test_non_200_and_non_basic_not_stored() {
        let network = Arc::new(
            site()
                .respond(url("/partial").as_str(), Response::new(206, "text/plain", "part"))
                .respond(
                    url("/proxied").as_str(),
                    Response::new(200, "text/plain", "cors").with_kind(ResponseKind::Cors),
                ),
        );
        let (worker, db) = active_worker(network).await;

        for path in ["/partial", "/proxied", "/nope"] {
            let outcome = worker.on_fetch(&Request::get(url(path))).await;
            assert_eq!(body_of(&outcome).1, ResponseSource::Network);
        }
        worker.settle().await;
        assert_eq!(db.entry_count("us-constitution-dynamic-v1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_post_is_fetched_but_not_stored() {
        let network = Arc::new(site().respond_text(url("/api").as_str(), "ok"));
        let (worker, db) = active_worker(network).await;

        let outcome = worker.on_fetch(&Request::get(url("/api")).with_method("POST")).await;
        assert_eq!(body_of(&outcome).1, ResponseSource::Network);
        worker.settle().await;
        assert_eq!(db.entry_count("us-constitution-dynamic-v1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_cross_origin_and_non_http_pass_through() {
        let network = Arc::new(site());
        let (worker, db) = active_worker(network.clone()).await;
        let before = network.calls().len();

        let cross = Request::get(Url::parse("https://fonts.example.com/font.woff2").unwrap());
        assert_eq!(worker.on_fetch(&cross).await, FetchOutcome::Passthrough);

        let other_port = Request::get(Url::parse("http://localhost:9090/index.html").unwrap());
        assert_eq!(worker.on_fetch(&other_port).await, FetchOutcome::Passthrough);

        let data = Request::get(Url::parse("data:text/plain,hello").unwrap());
        assert_eq!(worker.on_fetch(&data).await, FetchOutcome::Passthrough);

        assert_eq!(network.calls().len(), before);
        assert!(db.match_first(&["us-constitution-v1", "us-constitution-dynamic-v1"], &cross).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_inactive_worker_passes_through() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let worker = OfflineWorker::new(config(&["/"]), db, Arc::new(site()));
        worker.on_install().await.unwrap();

        assert_eq!(worker.on_fetch(&Request::get(url("/"))).await, FetchOutcome::Passthrough);
    }

    #[tokio::test]
    async fn test_offline_navigation_serves_offline_page() {
        let network = Arc::new(site());
        let (worker, _db) = active_worker(network.clone()).await;
        network.set_offline(true);

        let outcome = worker.on_fetch(&Request::navigate(url("/amendments/27"))).await;
        assert_eq!(body_of(&outcome), (Bytes::from("<html>index</html>"), ResponseSource::OfflinePage));
    }

    #[tokio::test]
    async fn test_offline_subresource_gets_503_json() {
        let network = Arc::new(site());
        let (worker, _db) = active_worker(network.clone()).await;
        network.set_offline(true);

        match worker.on_fetch(&Request::get(url("/assets/icon-192.png"))).await {
            FetchOutcome::Respond { response, source } => {
                assert_eq!(source, ResponseSource::OfflineFallback);
                assert_eq!(response, Response::offline());
            }
            FetchOutcome::Passthrough => panic!("expected offline response"),
        }
    }

    #[tokio::test]
    async fn test_offline_navigation_without_cached_page_gets_503() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let network = Arc::new(ScriptedNetwork::offline());
        let worker = OfflineWorker::new(config(&["/index.html"]), db, network);
        worker.on_install().await.unwrap();
        worker.on_activate().await.unwrap();

        let outcome = worker.on_fetch(&Request::navigate(url("/"))).await;
        assert_eq!(body_of(&outcome).1, ResponseSource::OfflineFallback);
    }

    #[tokio::test]
    async fn test_get_cache_status_reply() {
        let (worker, _db) = active_worker(Arc::new(site())).await;
        let (tx, rx) = oneshot::channel();

        worker.on_message(ControlMessage::GetCacheStatus, Some(tx)).await;
        assert_eq!(
            rx.await.unwrap(),
            ControlReply::CacheStatus { cache_status: "active".into(), cache_name: "us-constitution-v1".into() }
        );
    }

    #[tokio::test]
    async fn test_clear_cache_deletes_everything() {
        let (worker, db) = active_worker(Arc::new(site())).await;
        db.open_cache("someone-else").await.unwrap();
        let (tx, rx) = oneshot::channel();

        worker.on_message(ControlMessage::ClearCache, Some(tx)).await;
        assert_eq!(rx.await.unwrap(), ControlReply::Ack { success: true });
        assert!(db.cache_names().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_and_portless_messages_are_ignored() {
        let (worker, db) = active_worker(Arc::new(site())).await;
        let before = db.cache_names().await.unwrap();
        let (tx, rx) = oneshot::channel();

        worker.on_message(ControlMessage::from_type("PING"), Some(tx)).await;
        assert!(rx.await.is_err());

        worker.on_message(ControlMessage::GetCacheStatus, None).await;
        assert_eq!(db.cache_names().await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_skip_waiting_message_sets_flag() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let worker = OfflineWorker::new(config(&[]), db, Arc::new(site()));
        assert!(!worker.skip_waiting_requested());

        worker.on_message(ControlMessage::SkipWaiting, None).await;
        assert!(worker.skip_waiting_requested());
    }
}
