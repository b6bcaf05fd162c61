//! The connection watchdog: a cancellable background loop that polls the
//! reachability probe and drives the feed selector.

use alloc::sync::Arc;
use core::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval, sleep};
use tracing::{Instrument as _, debug, info, warn};

use crate::app::probe::ReachabilityProbe;
use crate::app::state::{ConnectionStatus, FeedChoice, Session};
use crate::config::MonitorConfig;

/// Handle to a running watchdog loop.
pub(super) struct MonitorHandle {
    pub(super) stop_tx: watch::Sender<bool>,
    pub(super) task: JoinHandle<()>,
}

/// Starts the watchdog loop. Idempotent: returns `true` when a loop was
/// already running and no new one was spawned.
pub(crate) async fn start_monitoring<P>(
    session: &Arc<Session>,
    probe: P,
    cfg: MonitorConfig,
) -> bool
where
    P: ReachabilityProbe + Send + Sync + 'static,
{
    let mut inner = session.inner.lock().await;
    if inner.monitor.as_ref().is_some_and(|m| !m.task.is_finished()) {
        debug!("Monitoring already running");
        return true;
    }

    let (stop_tx, stop_rx) = watch::channel(false);
    let task = tokio::spawn(
        {
            let session = Arc::clone(session);
            async move {
                run_watchdog(session, probe, cfg, stop_rx).await;
            }
        }
        .in_current_span(),
    );
    inner.monitor = Some(MonitorHandle { stop_tx, task });
    info!("Connection monitoring started");
    session.publish(&inner);
    false
}

/// Stops the watchdog; the loop observes the flag and exits within one
/// polling interval. No-op when not running.
pub(crate) async fn stop_monitoring(session: &Session) {
    let mut inner = session.inner.lock().await;
    if let Some(handle) = inner.monitor.take() {
        drop(handle.stop_tx.send(true));
        info!("Connection monitoring stopping");
    }
    session.publish(&inner);
}

/// Starts monitoring when stopped, stops it when running. Returns whether the
/// watchdog is running afterwards.
pub(crate) async fn toggle_monitoring<P>(
    session: &Arc<Session>,
    probe: P,
    cfg: MonitorConfig,
) -> bool
where
    P: ReachabilityProbe + Send + Sync + 'static,
{
    let already_running = start_monitoring(session, probe, cfg).await;
    if already_running {
        stop_monitoring(session).await;
    }
    !already_running
}

impl Session {
    /// Applies one probe result to the shared state. Skipped entirely while a
    /// suppression window is active.
    pub(crate) async fn apply_probe_result(&self, reachable: bool) {
        let mut inner = self.inner.lock().await;
        if inner.suppression.is_some() {
            debug!("Suppression window active, ignoring probe result");
            return;
        }

        let observed = if reachable {
            ConnectionStatus::Stable
        } else {
            ConnectionStatus::Unstable
        };

        if observed != inner.status {
            inner.status = observed;
            inner.last_change = Some(Utc::now());
            inner.feed = FeedChoice::for_status(observed);
            match observed {
                ConnectionStatus::Unstable => {
                    info!("Connection unstable, switching to backup feed");
                }
                ConnectionStatus::Stable => {
                    info!("Connection stable, switching to live feed");
                }
            }
            self.publish(&inner);
            if observed == ConnectionStatus::Unstable {
                self.notifier.spawn_notify("reachability probe failed");
            }
        } else if inner.feed != FeedChoice::for_status(inner.status) {
            // A manual toggle diverged the feed; realign it without touching
            // the connection state.
            inner.feed = FeedChoice::for_status(inner.status);
            debug!(feed = ?inner.feed, "Realigned feed with connection status");
            self.publish(&inner);
        }
    }
}

/// Watchdog loop body. Exits when the stop flag flips; survives probe errors.
async fn run_watchdog<P: ReachabilityProbe>(
    session: Arc<Session>,
    probe: P,
    cfg: MonitorConfig,
    mut stop_rx: watch::Receiver<bool>,
) {
    let mut ticker = interval(Duration::from_millis(cfg.poll_interval_ms));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            changed = stop_rx.changed() => {
                if changed.is_err() || *stop_rx.borrow() {
                    info!("Connection monitoring stopped");
                    break;
                }
            }
            _ = ticker.tick() => {
                // Cheap pre-check; the authoritative one happens again under
                // the lock in apply_probe_result.
                if session.snapshot().override_active {
                    debug!("Suppression window active, skipping probe");
                    continue;
                }
                match probe.probe().await {
                    Ok(reachable) => session.apply_probe_result(reachable).await,
                    Err(e) => {
                        warn!("Probe error, treating connection as unstable: {e}");
                        session.apply_probe_result(false).await;
                        sleep(Duration::from_millis(cfg.probe_backoff_ms)).await;
                    }
                }
            }
        }
    }
}
