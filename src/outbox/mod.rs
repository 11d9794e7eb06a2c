//! Durable queue of submissions that could not be delivered, and the
//! coordinator that drains it.

pub mod connectivity;
pub mod entry;
pub mod sink;
pub mod store;
pub mod sync;

pub use connectivity::ConnectivityMonitor;
pub use entry::OutboxEntry;
pub use sink::{DeliveryError, DeliveryReceipt, SubmissionSink};
pub use store::{FileOutboxStore, MemoryOutboxStore, OutboxStore, StoreError};
pub use sync::{SyncCoordinator, SyncHandle};

use crate::kernel::layout::FormKind;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Result of one flush pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Handle to the queue. Clones share the same store and locks.
///
/// Every durable mutation is a read-modify-write of the whole queue under
/// `writer`. Flush passes hold `flushing` for their whole duration but take
/// `writer` only to read and to remove, so enqueues still land mid-flush.
#[derive(Clone)]
pub struct Outbox {
    inner: Arc<Inner>,
}

struct Inner {
    store: Box<dyn OutboxStore>,
    writer: Mutex<()>,
    flushing: Mutex<()>,
}

impl Outbox {
    pub fn new(store: impl OutboxStore + 'static) -> Self {
        Self {
            inner: Arc::new(Inner {
                store: Box::new(store),
                writer: Mutex::new(()),
                flushing: Mutex::new(()),
            }),
        }
    }

    pub async fn enqueue(&self, kind: FormKind, payload: Value) -> Result<OutboxEntry, StoreError> {
        let entry = OutboxEntry::new(kind, payload);
        let _guard = self.inner.writer.lock().await;
        let mut entries = self.inner.store.load()?;
        entries.push(entry.clone());
        self.inner.store.save(&entries)?;
        debug!(id = %entry.id, kind = %kind, queued = entries.len(), "submission queued offline");
        Ok(entry)
    }

    /// Pending entries in insertion order.
    pub async fn pending(&self) -> Result<Vec<OutboxEntry>, StoreError> {
        let _guard = self.inner.writer.lock().await;
        self.inner.store.load()
    }

    pub async fn len(&self) -> Result<usize, StoreError> {
        Ok(self.pending().await?.len())
    }

    pub async fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.pending().await?.is_empty())
    }

    /// Deliver every pending entry in order. Failures stay queued in their
    /// original position; one failure never stops the pass. Delivered entries
    /// are removed together once the pass is over.
    pub async fn flush(&self, sink: &dyn SubmissionSink) -> Result<FlushReport, StoreError> {
        let _pass = self.inner.flushing.lock().await;
        let entries = self.pending().await?;
        if entries.is_empty() {
            return Ok(FlushReport::default());
        }

        let mut delivered = HashSet::new();
        let mut failed = 0;
        for entry in &entries {
            match sink.deliver(entry.kind, &entry.payload).await {
                Ok(_) => {
                    delivered.insert(entry.id.clone());
                }
                Err(e) => {
                    warn!(id = %entry.id, kind = %entry.kind, error = %e, "queued submission not delivered");
                    failed += 1;
                }
            }
        }

        if !delivered.is_empty() {
            self.remove(&delivered).await?;
        }

        let report = FlushReport {
            delivered: delivered.len(),
            failed,
        };
        info!(delivered = report.delivered, failed = report.failed, "outbox flush finished");
        Ok(report)
    }

    async fn remove(&self, ids: &HashSet<String>) -> Result<(), StoreError> {
        let _guard = self.inner.writer.lock().await;
        let mut entries = self.inner.store.load()?;
        entries.retain(|entry| !ids.contains(&entry.id));
        self.inner.store.save(&entries)
    }
}
