//! Debounce gate for type-ahead search.
//!
//! Every [`Debouncer::push`] restarts the quiet period; only the value that
//! survives a full period is delivered on the receiver.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

pub struct Debouncer<T> {
    delay: Duration,
    tx: mpsc::UnboundedSender<T>,
    pending: Option<JoinHandle<()>>,
}

impl<T: Send + 'static> Debouncer<T> {
    /// Create a debouncer and the receiver its settled values arrive on.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(delay: Duration) -> (Self, mpsc::UnboundedReceiver<T>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { delay, tx, pending: None }, rx)
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Replace the pending value and restart the timer.
    pub fn push(&mut self, value: T) {
        self.cancel();
        let tx = self.tx.clone();
        let delay = self.delay;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Receiver gone means nobody is listening any more.
            let _ = tx.send(value);
        }));
    }

    /// Drop the pending value, if any.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_delivers_after_quiet_period() {
        let (mut debouncer, mut rx) = Debouncer::new(DEFAULT_DEBOUNCE);
        debouncer.push("speech");

        tokio::time::sleep(Duration::from_millis(299)).await;
        assert!(rx.try_recv().is_err());

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(rx.recv().await, Some("speech"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_push_restarts_timer() {
        let (mut debouncer, mut rx) = Debouncer::new(DEFAULT_DEBOUNCE);
        debouncer.push("s");
        tokio::time::sleep(Duration::from_millis(200)).await;
        debouncer.push("sp");
        tokio::time::sleep(Duration::from_millis(200)).await;
        debouncer.push("spe");

        tokio::time::sleep(Duration::from_millis(301)).await;
        assert_eq!(rx.recv().await, Some("spe"));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_drops_pending_value() {
        let (mut debouncer, mut rx) = Debouncer::new(DEFAULT_DEBOUNCE);
        debouncer.push(1);
        assert!(debouncer.is_pending());
        debouncer.cancel();
        assert!(!debouncer.is_pending());

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(rx.try_recv().is_err());
    }
}
