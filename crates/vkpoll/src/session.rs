//! Long-poll session handle.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_util::Stream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use vkpoll_stream::{Signal, Source};

use crate::config::LongPollConfig;
use crate::credentials::SessionContext;
use crate::pipeline::{UpdateStream, build_pipeline};
use crate::poll::UpdateBatch;
use crate::transport::RawSend;

/// A running long-poll session.
///
/// Batches are produced by a background task one at a time and handed over
/// through a single-slot channel, so at most one poll is in flight and the
/// next one starts only after the previous batch was accepted.
///
/// Dropping the session aborts it.
pub struct LongPollSession {
    updates: mpsc::Receiver<UpdateBatch>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

/// Cloneable handle that aborts a [`LongPollSession`].
#[derive(Debug, Clone)]
pub struct AbortHandle {
    cancel: CancellationToken,
}

impl AbortHandle {
    /// Abort the session. Idempotent.
    pub fn abort(&self) {
        self.cancel.cancel();
    }

    /// Whether the session was aborted.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl LongPollSession {
    /// Start polling in a background task.
    ///
    /// Must be called within a Tokio runtime.
    #[must_use]
    pub fn start(context: SessionContext, sender: Arc<dyn RawSend>, config: LongPollConfig) -> Self {
        let cancel = CancellationToken::new();
        let pipeline = build_pipeline(context, sender, &config, cancel.clone());
        let (tx, rx) = mpsc::channel(1);

        info!(
            retry_floor_ms = config.retry_floor_ms,
            retry_ceiling_ms = config.retry_ceiling_ms,
            poll_timeout_ms = config.poll_timeout_ms,
            "starting long-poll session"
        );
        let task = tokio::spawn(drive(
            pipeline,
            tx,
            cancel.clone(),
            config.skip_empty_batches,
        ));

        Self {
            updates: rx,
            cancel,
            task: Some(task),
        }
    }

    /// Wait for the next batch. Returns `None` once the session is aborted.
    pub async fn next(&mut self) -> Option<UpdateBatch> {
        if self.cancel.is_cancelled() {
            return None;
        }

        let batch = tokio::select! {
            biased;
            () = self.cancel.cancelled() => None,
            batch = self.updates.recv() => batch,
        };
        batch.filter(|_| !self.cancel.is_cancelled())
    }

    /// Stop the session: the in-flight request is dropped, pending retries
    /// are cancelled and no batch is delivered afterwards. Idempotent.
    pub fn abort(&self) {
        if !self.cancel.is_cancelled() {
            info!("aborting long-poll session");
        }
        self.cancel.cancel();
    }

    /// Whether the session was aborted.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Handle that can abort the session from elsewhere.
    #[must_use]
    pub fn abort_handle(&self) -> AbortHandle {
        AbortHandle {
            cancel: self.cancel.clone(),
        }
    }

    /// Abort and wait until the background task has released the pipeline.
    pub async fn shutdown(mut self) {
        self.abort();
        if let Some(task) = self.task.take() {
            if let Err(err) = task.await {
                warn!(error = %err, "long-poll driver task failed");
            }
        }
    }
}

impl Stream for LongPollSession {
    type Item = UpdateBatch;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<UpdateBatch>> {
        let this = self.get_mut();
        if this.cancel.is_cancelled() {
            return Poll::Ready(None);
        }
        // The driver drops its sender on abort, which wakes a pending receiver.
        this.updates
            .poll_recv(cx)
            .map(|batch| batch.filter(|_| !this.cancel.is_cancelled()))
    }
}

impl Drop for LongPollSession {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Pull batches until aborted, then unwind the pipeline.
async fn drive(
    mut pipeline: UpdateStream,
    tx: mpsc::Sender<UpdateBatch>,
    cancel: CancellationToken,
    skip_empty_batches: bool,
) {
    let ended = loop {
        let batch = match pipeline.pull(None).await {
            Ok(batch) => batch,
            Err(Signal::End) => break true,
            Err(Signal::Error(err)) => {
                warn!(error = %err, "long-poll pipeline failed");
                break false;
            }
        };

        if cancel.is_cancelled() {
            break false;
        }
        if skip_empty_batches && batch.is_empty() {
            debug!("skipping empty batch");
            continue;
        }

        tokio::select! {
            biased;
            () = cancel.cancelled() => break false,
            sent = tx.send(batch) => {
                if sent.is_err() {
                    debug!("session handle dropped");
                    break false;
                }
            }
        }
    };
    drop(tx);

    if !ended {
        let _ = pipeline.pull(Some(Signal::End)).await;
    }
    info!("long-poll session stopped");
}
