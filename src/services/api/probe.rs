use super::client::ApiClient;
use crate::outbox::ConnectivityMonitor;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Poll the server on a fixed cadence and feed the result into `monitor`.
pub fn spawn_probe(
    client: ApiClient,
    monitor: ConnectivityMonitor,
    every: Duration,
    token: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut cadence = interval(every);
        cadence.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = cadence.tick() => {
                    let online = client.reachable().await;
                    monitor.set_online(online);
                }
            }
        }
        info!("connectivity probe stopped");
    })
}
