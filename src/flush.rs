//! Background task that owns the pending write for the persistent key.
//!
//! The task runs on the tokio runtime and processes messages from an
//! unbounded `mpsc` channel. Each [`FlushMessage::Schedule`] replaces the
//! pending snapshot and re-arms the debounce timer, so a burst of
//! mutations produces a single write once the burst goes quiet.
//!
//! The store never touches the persistent key after load; this task is
//! the only writer.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::error::StoreError;
use crate::record::Snapshot;
use crate::storage::KeyValueStore;

/// Messages sent from [`Flusher`] to the flush loop.
pub(crate) enum FlushMessage {
    /// Replace the pending snapshot and restart the quiet period.
    Schedule(Snapshot),

    /// Write `snapshot` immediately, discarding any pending one.
    FlushNow {
        snapshot: Snapshot,
        reply: oneshot::Sender<Result<(), StoreError>>,
    },

    /// Write whatever is pending and exit.
    Shutdown {
        reply: oneshot::Sender<Result<(), StoreError>>,
    },
}

/// Handle to the flush loop.
#[derive(Debug)]
pub(crate) struct Flusher {
    sender: mpsc::UnboundedSender<FlushMessage>,
    task: JoinHandle<()>,
}

impl Flusher {
    /// Spawn the flush loop on the current tokio runtime.
    ///
    /// # Arguments
    ///
    /// * `storage` - Backend the loop writes to.
    /// * `key` - The persistent key holding the collection.
    /// * `delay` - Quiet period before a scheduled snapshot is written.
    pub(crate) fn spawn(storage: Arc<dyn KeyValueStore>, key: String, delay: Duration) -> Self {
        let (sender, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run_flusher(storage, key, delay, rx));
        Self { sender, task }
    }

    /// Queue `snapshot` for a debounced write.
    ///
    /// Never blocks. If the loop has exited the change stays in memory
    /// only, which is logged.
    pub(crate) fn schedule(&self, snapshot: Snapshot) {
        if self.sender.send(FlushMessage::Schedule(snapshot)).is_err() {
            tracing::error!("flusher is gone; change kept in memory only");
        }
    }

    /// Write `snapshot` now and wait for the result.
    ///
    /// # Errors
    ///
    /// * [`StoreError::Io`] / [`StoreError::Serialize`] -- the write failed.
    /// * [`StoreError::FlusherGone`] -- the loop has exited.
    pub(crate) async fn flush_now(&self, snapshot: Snapshot) -> Result<(), StoreError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(FlushMessage::FlushNow {
                snapshot,
                reply: tx,
            })
            .map_err(|_| StoreError::FlusherGone)?;
        rx.await.map_err(|_| StoreError::FlusherGone)?
    }

    /// Write any pending snapshot, stop the loop, and wait for it to exit.
    ///
    /// # Errors
    ///
    /// Same as [`flush_now`](Flusher::flush_now).
    pub(crate) async fn shutdown(self) -> Result<(), StoreError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(FlushMessage::Shutdown { reply: tx })
            .map_err(|_| StoreError::FlusherGone)?;
        let result = rx.await.map_err(|_| StoreError::FlusherGone)?;
        // The loop breaks right after replying.
        let _ = self.task.await;
        result
    }
}

/// Runs the flush loop until shutdown or until every sender is dropped.
async fn run_flusher(
    storage: Arc<dyn KeyValueStore>,
    key: String,
    delay: Duration,
    mut rx: mpsc::UnboundedReceiver<FlushMessage>,
) {
    let mut pending: Option<Snapshot> = None;
    let timer = tokio::time::sleep(delay);
    tokio::pin!(timer);

    loop {
        tokio::select! {
            msg = rx.recv() => match msg {
                Some(FlushMessage::Schedule(snapshot)) => {
                    tracing::debug!(count = snapshot.len(), "flush scheduled");
                    pending = Some(snapshot);
                    timer.as_mut().reset(Instant::now() + delay);
                }
                Some(FlushMessage::FlushNow { snapshot, reply }) => {
                    pending = None;
                    let _ = reply.send(write_snapshot(storage.as_ref(), &key, &snapshot));
                }
                Some(FlushMessage::Shutdown { reply }) => {
                    let result = match pending.take() {
                        Some(snapshot) => write_snapshot(storage.as_ref(), &key, &snapshot),
                        None => Ok(()),
                    };
                    let _ = reply.send(result);
                    break;
                }
                // Store dropped: persist the last state before exiting.
                None => {
                    if let Some(snapshot) = pending.take() {
                        write_logged(storage.as_ref(), &key, &snapshot);
                    }
                    break;
                }
            },
            () = &mut timer, if pending.is_some() => {
                if let Some(snapshot) = pending.take() {
                    write_logged(storage.as_ref(), &key, &snapshot);
                }
            }
        }
    }
}

/// Serialize the collection and overwrite the persistent key.
pub(crate) fn write_snapshot(
    storage: &dyn KeyValueStore,
    key: &str,
    snapshot: &Snapshot,
) -> Result<(), StoreError> {
    let json = serde_json::to_string(snapshot)?;
    storage.set(key, &json)?;
    tracing::debug!(key, count = snapshot.len(), "applications flushed");
    Ok(())
}

/// Debounced writes have no caller to report to; failures are logged and
/// the next mutation schedules a fresh attempt.
fn write_logged(storage: &dyn KeyValueStore, key: &str, snapshot: &Snapshot) {
    if let Err(e) = write_snapshot(storage, key, snapshot) {
        tracing::error!(key, error = %e, "failed to persist applications");
    }
}
