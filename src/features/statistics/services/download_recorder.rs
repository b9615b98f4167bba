//! Off-path download accounting.
//!
//! Every served body is wrapped in a [`TrackedStream`]. When the stream ends,
//! fails or is dropped it emits exactly one [`DownloadEvent`] into a bounded
//! queue drained by a single worker task.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::Stream;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::core::error::Result;
use crate::features::files::models::UserSummary;
use crate::features::statistics::models::NewDownloadHistory;
use crate::features::statistics::repositories::StatisticsRepository;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadEvent {
    pub file_id: Uuid,
    pub owner_id: Option<Uuid>,
    pub downloader: Option<UserSummary>,
    pub at: DateTime<Utc>,
    pub bytes_sent: u64,
    pub completed: bool,
}

/// Who downloaded what; turned into an event when the stream finishes
#[derive(Debug, Clone)]
pub struct DownloadTicket {
    pub file_id: Uuid,
    pub owner_id: Option<Uuid>,
    pub downloader: Option<UserSummary>,
    pub expected_size: u64,
}

#[derive(Clone)]
pub struct DownloadRecorder {
    tx: mpsc::Sender<DownloadEvent>,
}

impl DownloadRecorder {
    /// Start the worker; it stops once every recorder clone is dropped
    pub fn spawn(
        repository: Arc<dyn StatisticsRepository>,
        capacity: usize,
    ) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel::<DownloadEvent>(capacity.max(1));

        let handle = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                if let Err(e) = apply_event(repository.as_ref(), &event).await {
                    tracing::warn!(
                        file_id = %event.file_id,
                        "Failed to record download statistics: {}",
                        e
                    );
                }
            }
            tracing::debug!("Download recorder stopped");
        });

        (Self { tx }, handle)
    }

    /// Hand an event to the worker without blocking the caller
    pub fn record(&self, event: DownloadEvent) {
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                let tx = self.tx.clone();
                // Called from Drop, so there may be no runtime to spawn on
                match tokio::runtime::Handle::try_current() {
                    Ok(handle) => {
                        handle.spawn(async move {
                            if tx.send(event).await.is_err() {
                                tracing::warn!("Download recorder closed; event dropped");
                            }
                        });
                    }
                    Err(_) => tracing::warn!(
                        file_id = %event.file_id,
                        "Statistics queue full outside a runtime; event dropped"
                    ),
                }
            }
            Err(TrySendError::Closed(event)) => {
                tracing::warn!(
                    file_id = %event.file_id,
                    "Download recorder closed; event dropped"
                );
            }
        }
    }

    pub fn track<S>(&self, ticket: DownloadTicket, inner: S) -> TrackedStream<S> {
        TrackedStream {
            inner,
            sent: 0,
            errored: false,
            ticket: Some(ticket),
            recorder: self.clone(),
        }
    }
}

/// Persist one event: history always, counters only for completed downloads of owned files
pub async fn apply_event(repository: &dyn StatisticsRepository, event: &DownloadEvent) -> Result<()> {
    repository
        .record_download(&NewDownloadHistory {
            file_id: event.file_id,
            downloader: event.downloader.clone(),
            downloaded_at: event.at,
            download_completed: event.completed,
        })
        .await?;

    if !event.completed || event.owner_id.is_none() {
        return Ok(());
    }

    repository
        .increment_download_count(event.file_id, event.at)
        .await?;

    if let Some(downloader) = &event.downloader {
        let completed = repository
            .count_completed_downloads(event.file_id, downloader.id)
            .await?;
        if completed == 1 {
            repository.increment_unique_downloaders(event.file_id).await?;
        }
    }

    tracing::debug!(file_id = %event.file_id, bytes = event.bytes_sent, "Download recorded");
    Ok(())
}

/// Byte-counting wrapper around a blob stream
pub struct TrackedStream<S> {
    inner: S,
    sent: u64,
    errored: bool,
    ticket: Option<DownloadTicket>,
    recorder: DownloadRecorder,
}

impl<S> TrackedStream<S> {
    fn finish(&mut self) {
        if let Some(ticket) = self.ticket.take() {
            let completed = !self.errored && self.sent == ticket.expected_size;
            self.recorder.record(DownloadEvent {
                file_id: ticket.file_id,
                owner_id: ticket.owner_id,
                downloader: ticket.downloader,
                at: Utc::now(),
                bytes_sent: self.sent,
                completed,
            });
        }
    }
}

impl<S> Stream for TrackedStream<S>
where
    S: Stream<Item = io::Result<Bytes>> + Unpin,
{
    type Item = io::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        match Pin::new(&mut this.inner).poll_next(cx) {
            Poll::Ready(Some(Ok(chunk))) => {
                this.sent += chunk.len() as u64;
                Poll::Ready(Some(Ok(chunk)))
            }
            Poll::Ready(Some(Err(e))) => {
                this.errored = true;
                this.finish();
                Poll::Ready(Some(Err(e)))
            }
            Poll::Ready(None) => {
                this.finish();
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<S> Drop for TrackedStream<S> {
    fn drop(&mut self) {
        self.finish();
    }
}
