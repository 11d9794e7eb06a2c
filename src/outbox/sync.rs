use super::{ConnectivityMonitor, FlushReport, Outbox, SubmissionSink};
use crate::notice::Notice;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_STARTUP_DELAY: Duration = Duration::from_secs(2);

/// Decides when the outbox is flushed: once shortly after startup, on every
/// offline→online transition, and on a fixed interval. Nothing is flushed
/// while offline.
pub struct SyncCoordinator {
    outbox: Outbox,
    sink: Arc<dyn SubmissionSink>,
    connectivity: ConnectivityMonitor,
    notices: mpsc::Sender<Notice>,
    interval: Duration,
    startup_delay: Duration,
}

/// Owns the running coordinator task.
pub struct SyncHandle {
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl SyncHandle {
    /// Cancel the loop and wait for it to exit. A flush already in flight
    /// finishes first.
    pub async fn shutdown(self) {
        self.token.cancel();
        if let Err(e) = self.task.await {
            error!("sync coordinator task failed: {}", e);
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl SyncCoordinator {
    pub fn new(
        outbox: Outbox,
        sink: Arc<dyn SubmissionSink>,
        connectivity: ConnectivityMonitor,
        notices: mpsc::Sender<Notice>,
    ) -> Self {
        Self {
            outbox,
            sink,
            connectivity,
            notices,
            interval: DEFAULT_SYNC_INTERVAL,
            startup_delay: DEFAULT_STARTUP_DELAY,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_startup_delay(mut self, delay: Duration) -> Self {
        self.startup_delay = delay;
        self
    }

    pub fn spawn(self) -> SyncHandle {
        let token = CancellationToken::new();
        let task = tokio::spawn(self.run(token.clone()));
        SyncHandle { token, task }
    }

    async fn run(self, token: CancellationToken) {
        info!(interval_ms = self.interval.as_millis() as u64, "sync coordinator started");

        let mut online_rx = self.connectivity.subscribe();
        let mut was_online = *online_rx.borrow_and_update();

        let startup = tokio::time::sleep(self.startup_delay);
        tokio::pin!(startup);
        let mut startup_pending = true;

        let mut cadence = interval_at(Instant::now() + self.interval, self.interval);
        cadence.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = token.cancelled() => break,

                _ = &mut startup, if startup_pending => {
                    startup_pending = false;
                    if self.connectivity.is_online() {
                        self.flush_now().await;
                    }
                }

                changed = online_rx.changed() => {
                    if changed.is_err() {
                        warn!("connectivity monitor dropped, stopping sync");
                        break;
                    }
                    let online = *online_rx.borrow_and_update();
                    if online == was_online {
                        continue;
                    }
                    was_online = online;
                    if online {
                        info!("connectivity restored");
                        self.notify(Notice::BackOnline);
                        self.flush_now().await;
                    } else {
                        warn!("connectivity lost");
                        self.notify(Notice::WentOffline);
                    }
                }

                _ = cadence.tick() => {
                    if self.connectivity.is_online() {
                        self.flush_now().await;
                    }
                }
            }
        }

        info!("sync coordinator stopped");
    }

    async fn flush_now(&self) -> Option<FlushReport> {
        match self.outbox.flush(self.sink.as_ref()).await {
            Ok(report) => {
                if report.delivered > 0 {
                    self.notify(Notice::SyncCompleted {
                        count: report.delivered,
                    });
                }
                Some(report)
            }
            Err(e) => {
                error!("outbox flush failed: {}", e);
                None
            }
        }
    }

    fn notify(&self, notice: Notice) {
        if let Err(e) = self.notices.try_send(notice) {
            debug!("notice dropped: {}", e);
        }
    }
}
