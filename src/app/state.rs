//! Shared session state: connection status, feed selection and the
//! suppression window, owned by a single [`Session`].

use alloc::sync::Arc;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, broadcast, watch};
use tracing::{Instrument as _, debug, info, warn};

use crate::{
    app::{
        monitor::{self, MonitorHandle},
        notify::OutageNotifier,
        probe::TcpProbe,
        simulation::Suppression,
    },
    config::{self, AppConfig},
    websocket::WsMessage,
};

/// Connection quality as derived from the reachability probe, or forced by an
/// active override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Stable,
    Unstable,
}

/// The video source currently selected for output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedChoice {
    Live,
    Backup,
}

impl FeedChoice {
    /// The feed that normal (unsuppressed) operation derives from `status`.
    pub(crate) const fn for_status(status: ConnectionStatus) -> Self {
        match status {
            ConnectionStatus::Stable => Self::Live,
            ConnectionStatus::Unstable => Self::Backup,
        }
    }

    pub(crate) const fn toggled(self) -> Self {
        match self {
            Self::Live => Self::Backup,
            Self::Backup => Self::Live,
        }
    }
}

/// Immutable copy of the session state, published on every change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub status: ConnectionStatus,
    pub active_feed: FeedChoice,
    pub monitoring_running: bool,
    pub override_active: bool,
    /// Set on the first status transition; untouched by no-op ticks.
    pub last_change: Option<DateTime<Utc>>,
}

pub(crate) type SnapshotRx = watch::Receiver<Snapshot>;
type SnapshotTx = watch::Sender<Snapshot>;
pub(crate) type WsTx = broadcast::Sender<WsMessage>;

/// Mutable session record. All access goes through the owning [`Session`].
pub(super) struct SessionInner {
    pub(super) status: ConnectionStatus,
    pub(super) last_change: Option<DateTime<Utc>>,
    pub(super) feed: FeedChoice,
    pub(super) suppression: Option<Suppression>,
    pub(super) monitor: Option<MonitorHandle>,
    /// Bumped whenever a suppression window is installed or torn down, so
    /// auto-clears from superseded windows can be told apart.
    pub(super) epoch: u64,
}

impl SessionInner {
    pub(super) fn snapshot(&self) -> Snapshot {
        Snapshot {
            status: self.status,
            active_feed: self.feed,
            monitoring_running: self.monitor.as_ref().is_some_and(|m| !m.task.is_finished()),
            override_active: self.suppression.is_some(),
            last_change: self.last_change,
        }
    }
}

/// Single owner of the watchdog-facing state.
///
/// Mutations are serialized through a [`Mutex`] and every change is published
/// to a [`watch`] channel, so snapshot reads never contend with writers.
pub(crate) struct Session {
    pub(super) inner: Mutex<SessionInner>,
    pub(super) tx: SnapshotTx,
    pub(super) notifier: OutageNotifier,
}

impl Session {
    /// Create a fresh session: stable connection, live feed, no override,
    /// watchdog stopped. Returns the session and a receiver observing every
    /// published snapshot.
    pub(crate) fn new(notifier: OutageNotifier) -> (Arc<Self>, SnapshotRx) {
        let inner = SessionInner {
            status: ConnectionStatus::Stable,
            last_change: None,
            feed: FeedChoice::Live,
            suppression: None,
            monitor: None,
            epoch: 0,
        };
        let (tx, rx) = watch::channel(inner.snapshot());
        (
            Arc::new(Self {
                inner: Mutex::new(inner),
                tx,
                notifier,
            }),
            rx,
        )
    }

    /// Publish the current state. Send errors mean all receivers were dropped
    /// (shutdown) and are ignored.
    pub(super) fn publish(&self, inner: &SessionInner) {
        drop(self.tx.send(inner.snapshot()));
    }

    /// Cheap read of the latest published snapshot; does not take the write
    /// mutex.
    pub(crate) fn snapshot(&self) -> Snapshot {
        self.tx.borrow().clone()
    }

    /// Manually flips the active feed, independent of the connection status.
    /// The next unsuppressed watchdog tick realigns the feed with the status.
    pub(crate) async fn toggle_feed(&self) -> FeedChoice {
        let mut inner = self.inner.lock().await;
        inner.feed = inner.feed.toggled();
        info!(feed = ?inner.feed, "Feed toggled manually");
        self.publish(&inner);
        inner.feed
    }
}

/// Application state shared across request handlers and background tasks.
#[derive(Clone)]
pub(crate) struct AppState {
    /// The single global session driven by the watchdog and overrides.
    pub session: Arc<Session>,

    /// Broadcast sender for distributing WebSocket messages.
    pub ws_tx: WsTx,

    /// Effective configuration, read once at startup.
    pub config: Arc<AppConfig>,

    /// Resolved path of the backup video asset.
    pub backup_video: PathBuf,

    /// Probe instance handed to the watchdog on start.
    pub probe: TcpProbe,
}

/// Initialize application state and start background tasks.
#[tracing::instrument(skip_all)]
pub(crate) async fn initialize_state(config_path: &Path) -> eyre::Result<AppState> {
    let config = Arc::new(config::load(config_path).await?);

    let backup_video =
        config::resolve_config_relative_paths(config_path, &config.feeds.backup_video);
    if !backup_video.is_file() {
        warn!(
            "Backup video not found at: {} (the /video/backup route will return 404 until it exists)",
            backup_video.display()
        );
    }

    let notifier = OutageNotifier::from_config(&config.outage);
    let (session, snapshot_rx) = Session::new(notifier);
    let (ws_tx, _) = broadcast::channel(32);

    // Forwards snapshot updates to the websocket client loops
    {
        let ws_tx = ws_tx.clone();
        let mut snapshot_rx = snapshot_rx;
        tokio::spawn(
            async move {
                while snapshot_rx.changed().await.is_ok() {
                    let msg = WsMessage::Status(snapshot_rx.borrow().clone());
                    if ws_tx.send(msg).is_err() {
                        debug!("No Websocket Subscribers");
                    }
                }
            }
            .in_current_span(),
        );
    }

    let probe = TcpProbe::from_config(&config.monitor);

    if config.monitor.autostart {
        let already =
            monitor::start_monitoring(&session, probe.clone(), config.monitor.clone()).await;
        debug_assert!(!already, "fresh session cannot have a running watchdog");
    }

    Ok(AppState {
        session,
        ws_tx,
        config,
        backup_video,
        probe,
    })
}
