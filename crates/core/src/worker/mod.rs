//! Offline worker: precaching, cache-first fetch, and the control channel.

pub mod lifecycle;
pub mod message;
pub mod network;
pub mod registration;
pub mod request;
pub mod state;

#[cfg(test)]
pub(crate) mod testing;

pub use lifecycle::{ActivateReport, FetchOutcome, InstallReport, OfflineWorker, ResponseSource, WorkerConfig};
pub use message::{ControlMessage, ControlReply, ReplyPort};
pub use network::Network;
pub use registration::{RegisterOutcome, Registration};
pub use request::{CacheMode, OFFLINE_MESSAGE, Request, RequestMode, Response, ResponseKind};
pub use state::WorkerState;
