//! Manual overrides: timed simulated outages that suppress the watchdog, and
//! the reset path that restores normal operation.

use alloc::sync::Arc;
use core::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{Instrument as _, debug, info};

use crate::app::state::{ConnectionStatus, FeedChoice, Session, SessionInner, Snapshot};

/// An active suppression window. While present, the watchdog must not mutate
/// the connection state or the feed selection.
pub(super) struct Suppression {
    pub(super) reason: String,
    pub(super) expires_at: DateTime<Utc>,
    /// Identifies this window; auto-clears from superseded windows no-op.
    pub(super) epoch: u64,
    /// Pending auto-clear task, aborted when a newer trigger or a manual
    /// reset takes over.
    pub(super) clear_task: JoinHandle<()>,
}

/// Forces the connection unstable and suppresses the watchdog for `duration`.
///
/// Last-trigger-wins: an already active window is replaced and its pending
/// auto-clear cancelled, so overlapping triggers always leave exactly one
/// timer, scheduled from the newest request.
pub(crate) async fn trigger_outage(
    session: &Arc<Session>,
    reason: &str,
    duration: Duration,
) -> Snapshot {
    let mut inner = session.inner.lock().await;
    if let Some(prev) = inner.suppression.take() {
        prev.clear_task.abort();
        debug!(reason = %prev.reason, "Superseding active suppression window");
    }
    inner.epoch += 1;
    let epoch = inner.epoch;

    if inner.status != ConnectionStatus::Unstable {
        inner.status = ConnectionStatus::Unstable;
        inner.last_change = Some(Utc::now());
    }
    inner.feed = FeedChoice::Backup;

    let expires_at =
        Utc::now() + chrono::Duration::from_std(duration).unwrap_or_else(|_| chrono::Duration::zero());
    let clear_task = tokio::spawn(
        {
            let session = Arc::clone(session);
            async move {
                sleep(duration).await;
                session.clear_override_if_current(epoch).await;
            }
        }
        .in_current_span(),
    );
    inner.suppression = Some(Suppression {
        reason: reason.to_string(),
        expires_at,
        epoch,
        clear_task,
    });

    info!(%reason, ?duration, "Simulated outage active, feed pinned to backup");
    session.publish(&inner);
    session.notifier.spawn_notify(reason);
    inner.snapshot()
}

impl Session {
    /// Auto-clear path: restores normal operation only when `epoch` still
    /// identifies the active window. A timer that lost an abort race against
    /// a newer trigger lands here and does nothing.
    pub(super) async fn clear_override_if_current(&self, epoch: u64) {
        let mut inner = self.inner.lock().await;
        let Some(window) = inner.suppression.take_if(|s| s.epoch == epoch) else {
            debug!("Stale auto-clear ignored");
            return;
        };
        restore_stable(&mut inner);
        info!(reason = %window.reason, expired_at = %window.expires_at, "Suppression window expired, resuming normal operation");
        self.publish(&inner);
    }

    /// Clears any active override and resets the connection to stable and the
    /// feed to live. Idempotent: safe to call with no window active.
    pub(crate) async fn reset_connection(&self) -> Snapshot {
        let mut inner = self.inner.lock().await;
        if let Some(prev) = inner.suppression.take() {
            prev.clear_task.abort();
        }
        inner.epoch += 1;
        restore_stable(&mut inner);
        info!("Connection reset to stable");
        self.publish(&inner);
        inner.snapshot()
    }
}

fn restore_stable(inner: &mut SessionInner) {
    if inner.status != ConnectionStatus::Stable {
        inner.status = ConnectionStatus::Stable;
        inner.last_change = Some(Utc::now());
    }
    inner.feed = FeedChoice::Live;
}
