//! Background task that simulates driver movement.

use std::{future::Future, sync::Arc, time::Duration};

use tokio::{
    select,
    sync::oneshot,
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};
use tracing::{info, warn};

use crate::dispatch::Dispatcher;

/// Periodically applies a random offset to every driver's position.
///
/// Shares the dispatcher with the request handlers, so each refresh waits for
/// the same lock that ride matching uses and never sees a half-finished
/// assignment.
pub struct LocationRefresher {
    dispatcher: Arc<Dispatcher>,
    period: Duration,
    max_offset: f64,
}

impl LocationRefresher {
    /// `period` must be non-zero.
    pub fn new(dispatcher: Arc<Dispatcher>, period: Duration, max_offset: f64) -> Self {
        Self {
            dispatcher,
            period,
            max_offset,
        }
    }

    /// Refreshes locations every period until `shutdown` resolves.
    ///
    /// The first refresh happens one full period after start.
    pub async fn run_until<F>(self, shutdown: F)
    where
        F: Future<Output = ()> + Send,
    {
        let mut ticker = time::interval_at(time::Instant::now() + self.period, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => self.dispatcher.apply_jitter(self.max_offset).await,
            }
        }

        info!("location refresher stopped");
    }

    pub fn spawn(self) -> RefresherHandle {
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(self.run_until(async move {
            let _ = shutdown_rx.await;
        }));
        RefresherHandle { shutdown_tx, task }
    }
}

pub struct RefresherHandle {
    shutdown_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl RefresherHandle {
    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(());
        if let Err(err) = self.task.await {
            warn!(error = ?err, "location refresher task failed");
        }
    }
}
