//! Background score writer
//!
//! One task per session owns all score writes for that session, so deltas
//! reach the store in the order they were awarded.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{mpsc, oneshot};

use crate::scores::ScoreStore;

/// Messages to the writer task
#[derive(Debug)]
enum WriterMessage {
    /// Add points to the persisted score
    Add(u64),
    /// Reply once every earlier message has been handled
    Flush(oneshot::Sender<FlushReport>),
}

/// Outcome of the writes handled so far
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlushReport {
    /// Total returned by the most recent successful write
    pub persisted_total: Option<u64>,
    pub failed_writes: usize,
}

/// Handle for a session's writer task
pub(crate) struct ScoreWriter {
    sender: mpsc::UnboundedSender<WriterMessage>,
    degraded: Arc<AtomicBool>,
}

impl ScoreWriter {
    /// Spawn the writer on the current Tokio runtime
    pub fn spawn(store: Arc<dyn ScoreStore>, user_id: String) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let degraded = Arc::new(AtomicBool::new(false));

        let flag = Arc::clone(&degraded);
        tokio::spawn(async move {
            writer_loop(store, user_id, flag, rx).await;
        });

        Self {
            sender: tx,
            degraded,
        }
    }

    /// Queue a delta. Returns false when the writer is gone.
    pub fn add(&self, delta: u64) -> bool {
        self.sender.send(WriterMessage::Add(delta)).is_ok()
    }

    /// Wait until every queued delta has been attempted
    pub async fn flush(&self) -> FlushReport {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self.sender.send(WriterMessage::Flush(reply_tx)).is_err() {
            log::warn!("Score writer stopped before flush");
            self.degraded.store(true, Ordering::SeqCst);
            return FlushReport::default();
        }

        reply_rx.await.unwrap_or_else(|_| {
            self.degraded.store(true, Ordering::SeqCst);
            FlushReport::default()
        })
    }

    /// Whether any write has failed
    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::SeqCst)
    }
}

async fn writer_loop(
    store: Arc<dyn ScoreStore>,
    user_id: String,
    degraded: Arc<AtomicBool>,
    mut receiver: mpsc::UnboundedReceiver<WriterMessage>,
) {
    let mut report = FlushReport::default();

    while let Some(message) = receiver.recv().await {
        match message {
            WriterMessage::Add(delta) => match store.add_score(&user_id, delta).await {
                Ok(total) => {
                    log::debug!("Persisted +{} for {}, total {}", delta, user_id, total);
                    report.persisted_total = Some(total);
                }
                Err(e) => {
                    log::warn!("Failed to persist +{} for {}: {}", delta, user_id, e);
                    report.failed_writes += 1;
                    degraded.store(true, Ordering::SeqCst);
                }
            },
            WriterMessage::Flush(reply) => {
                let _ = reply.send(report);
            }
        }
    }

    log::debug!("Score writer for {} stopped", user_id);
}
