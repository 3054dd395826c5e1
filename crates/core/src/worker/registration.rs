//! Host-side owner of the active and waiting workers.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{RwLock, oneshot};

use super::lifecycle::{ActivateReport, FetchOutcome, InstallReport, OfflineWorker, ResponseSource, WorkerConfig};
use super::message::{ControlMessage, ControlReply};
use super::network::Network;
use super::request::{CacheMode, Request, Response};
use crate::{CacheDb, Error, NetworkError};

/// How a call to [`Registration::register`] ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RegisterOutcome {
    /// The new worker installed and took over.
    Activated { install: InstallReport, activate: ActivateReport },
    /// Installed, waiting for `SKIP_WAITING` while another worker is active.
    Waiting { install: InstallReport },
    /// The static generation already existed and was reused without
    /// reinstalling.
    Restored,
}

pub struct Registration {
    db: CacheDb,
    network: Arc<dyn Network>,
    active: RwLock<Option<Arc<OfflineWorker>>>,
    waiting: RwLock<Option<Arc<OfflineWorker>>>,
}

impl Registration {
    pub fn new(db: CacheDb, network: Arc<dyn Network>) -> Self {
        Self { db, network, active: RwLock::new(None), waiting: RwLock::new(None) }
    }

    pub fn db(&self) -> &CacheDb {
        &self.db
    }

    pub async fn active(&self) -> Option<Arc<OfflineWorker>> {
        self.active.read().await.clone()
    }

    pub async fn waiting(&self) -> Option<Arc<OfflineWorker>> {
        self.waiting.read().await.clone()
    }

    /// A newer worker is installed while an older one still serves.
    pub async fn update_available(&self) -> bool {
        self.waiting.read().await.is_some() && self.active.read().await.is_some()
    }

    /// Install a worker for `config` and activate it if it asked to skip
    /// waiting or nothing is active yet.
    pub async fn register(&self, config: WorkerConfig) -> Result<RegisterOutcome, Error> {
        let install = self.install(config).await?;
        let ready = match self.waiting().await {
            Some(worker) => worker.skip_waiting_requested() || self.active().await.is_none(),
            None => false,
        };

        if ready {
            let activate = self.promote().await?.unwrap_or_default();
            Ok(RegisterOutcome::Activated { install, activate })
        } else {
            tracing::info!("new worker installed and waiting");
            Ok(RegisterOutcome::Waiting { install })
        }
    }

    /// Install a worker for `config` and park it as the waiting worker.
    ///
    /// A previously waiting worker is made redundant.
    pub async fn install(&self, config: WorkerConfig) -> Result<InstallReport, Error> {
        let worker = Arc::new(OfflineWorker::new(config, self.db.clone(), self.network.clone()));
        let report = worker.on_install().await?;

        let previous = self.waiting.write().await.replace(worker);
        if let Some(previous) = previous {
            previous.become_redundant().await;
        }
        Ok(report)
    }

    /// Reuse the caches of an earlier session when the static generation
    /// exists; otherwise install and activate from scratch.
    pub async fn restore_or_register(&self, config: WorkerConfig) -> Result<RegisterOutcome, Error> {
        if self.db.has_cache(&config.static_cache).await? {
            tracing::info!(cache = %config.static_cache, "restoring cached generation");
            let worker = Arc::new(OfflineWorker::restored(config, self.db.clone(), self.network.clone()));
            let previous = self.active.write().await.replace(worker);
            if let Some(previous) = previous {
                previous.become_redundant().await;
            }
            return Ok(RegisterOutcome::Restored);
        }
        self.register(config).await
    }

    /// Activate the waiting worker, retiring the active one.
    ///
    /// Returns `None` when nothing is waiting. If activation fails the
    /// current active worker keeps serving.
    pub async fn promote(&self) -> Result<Option<ActivateReport>, Error> {
        let Some(worker) = self.waiting.write().await.take() else {
            return Ok(None);
        };

        let report = match worker.on_activate().await {
            Ok(report) => report,
            Err(e) => {
                worker.become_redundant().await;
                return Err(e);
            }
        };

        let previous = self.active.write().await.replace(worker);
        if let Some(previous) = previous {
            previous.settle().await;
            previous.become_redundant().await;
        }
        Ok(Some(report))
    }

    /// Deliver a wire message and wait for the reply, if the type has one.
    ///
    /// `SKIP_WAITING` goes to the waiting worker and promotes it; everything
    /// else goes to the active worker.
    pub async fn post_message(&self, value: &Value) -> Result<Option<ControlReply>, Error> {
        let message = ControlMessage::from_value(value);

        if message == ControlMessage::SkipWaiting {
            if let Some(worker) = self.waiting().await {
                worker.on_message(message, None).await;
                if worker.skip_waiting_requested() {
                    self.promote().await?;
                }
            } else if let Some(worker) = self.active().await {
                worker.on_message(message, None).await;
            }
            return Ok(None);
        }

        let Some(worker) = self.active().await else {
            tracing::warn!("no active worker for message {}", message.type_name().unwrap_or("<missing>"));
            return Ok(None);
        };

        if !message.expects_reply() {
            worker.on_message(message, None).await;
            return Ok(None);
        }

        let (tx, rx) = oneshot::channel();
        worker.on_message(message, Some(tx)).await;
        Ok(rx.await.ok())
    }

    /// Route a page request through the active worker.
    ///
    /// The source is `None` when no worker handled the request and it went
    /// straight to the network.
    pub async fn dispatch(&self, request: &Request) -> Result<(Response, Option<ResponseSource>), NetworkError> {
        if let Some(worker) = self.active().await
            && let FetchOutcome::Respond { response, source } = worker.on_fetch(request).await
        {
            return Ok((response, Some(source)));
        }
        let response = self.network.fetch(request, CacheMode::Default).await?;
        Ok((response, None))
    }

    /// Wait for the active worker's background cache writes.
    pub async fn settle(&self) {
        if let Some(worker) = self.active().await {
            worker.settle().await;
        }
    }
}

/// Requests routed through the registration behave as if issued by a page
/// the active worker controls.
#[async_trait]
impl Network for Registration {
    async fn fetch(&self, request: &Request, mode: CacheMode) -> Result<Response, NetworkError> {
        if mode == CacheMode::Reload {
            return self.network.fetch(request, mode).await;
        }
        self.dispatch(request).await.map(|(response, _)| response)
    }
}
