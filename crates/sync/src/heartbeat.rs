//! Periodic presence refresh
//!
//! A joined session refreshes its `lastPingAt` on a fixed period so peers
//! keep counting it as online. The first refresh happens one period after
//! start; join itself already stamped the record.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use pawpark_core::{HeartbeatOutcome, Session};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Handle to a running (or idle) heartbeat loop
pub struct HeartbeatTask {
    running: Option<(broadcast::Sender<()>, JoinHandle<()>)>,
}

impl HeartbeatTask {
    /// A handle with nothing scheduled
    pub fn idle() -> Self {
        Self { running: None }
    }

    pub fn spawn(session: Arc<Mutex<Session>>, period: Duration) -> Self {
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let handle = tokio::spawn(heartbeat_loop(session, period, shutdown_rx));
        debug!(?period, "Heartbeat started");
        Self {
            running: Some((shutdown_tx, handle)),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
            .as_ref()
            .is_some_and(|(_, handle)| !handle.is_finished())
    }

    /// Stop the loop. Returns false if nothing was scheduled.
    pub fn cancel(&mut self) -> bool {
        match self.running.take() {
            Some((shutdown_tx, _handle)) => {
                let _ = shutdown_tx.send(());
                debug!("Heartbeat cancelled");
                true
            }
            None => false,
        }
    }
}

impl Default for HeartbeatTask {
    fn default() -> Self {
        Self::idle()
    }
}

impl Drop for HeartbeatTask {
    fn drop(&mut self) {
        self.cancel();
    }
}

async fn heartbeat_loop(
    session: Arc<Mutex<Session>>,
    period: Duration,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // Completes immediately
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let outcome = {
                    let mut session = session.lock().unwrap_or_else(|e| e.into_inner());
                    session.heartbeat()
                };
                match outcome {
                    Ok(HeartbeatOutcome::Refreshed) => {}
                    Ok(HeartbeatOutcome::Evicted) => {
                        info!("Own record missing from store, heartbeat idle until rejoin");
                    }
                    Ok(HeartbeatOutcome::NotJoined) => {
                        debug!("Heartbeat tick while not joined");
                    }
                    Err(e) => warn!(error = %e, "Heartbeat write failed"),
                }
            }
            _ = shutdown_rx.recv() => break,
        }
    }
}
