//! Common utilities for integration tests.
//!
//! Spawns the service in-process on a free port and provides helpers to wait
//! for it (and its probe target) to be ready.

use core::{
    sync::atomic::{AtomicU16, Ordering},
    time::Duration,
};
use std::{env, fs, time::Instant};

use clap::Parser as _;
use tokio::{
    net::{TcpListener, TcpStream},
    task, time,
};

use feedwatch::{Snapshot, cli::Cli};

static NEXT_PORT: AtomicU16 = AtomicU16::new(10000);

pub(crate) fn get_free_port() -> u16 {
    NEXT_PORT.fetch_add(1, Ordering::SeqCst)
}

/// Guard that aborts the in-process service task when dropped.
pub(crate) struct KillOnDrop(task::JoinHandle<()>);

impl Drop for KillOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Spawn the service from a given config string, written to a temp file keyed
/// by the service port.
pub(crate) fn spawn_service_with_config(port: u16, config_toml: &str) -> KillOnDrop {
    let tmp = env::temp_dir().join(format!("feedwatch_integration_{port}.toml"));
    fs::write(&tmp, config_toml).expect("failed to write config");

    let cli = Cli::parse_from([
        "feedwatch",
        "serve",
        "--config",
        tmp.to_str().expect("temp path should be valid UTF-8"),
    ]);
    let handle = tokio::spawn(async move {
        // SAFETY: This is only used in integration tests and no user-facing code.
        // It just tells the service to log less verbose output.
        unsafe {
            env::set_var("FEEDWATCH_INTEGRATION_TEST", "1");
        }
        feedwatch::inner_main(cli).await.expect("inner_main failed");
    });
    KillOnDrop(handle)
}

/// Config for a service probing `127.0.0.1:probe_port` with a fast tick.
pub(crate) fn service_config(port: u16, probe_port: u16) -> String {
    format!(
        r#"
        [server]
        port = {port}
        bind = "127.0.0.1"

        [monitor]
        poll_interval_ms = 100
        probe_host = "127.0.0.1"
        probe_port = {probe_port}
        probe_timeout_ms = 200
    "#
    )
}

/// Block until a TCP listener is accepting on `127.0.0.1:port` or timeout.
pub(crate) async fn wait_for_listening(port: u16, timeout_secs: u64) {
    let start = Instant::now();
    while TcpStream::connect(("127.0.0.1", port)).await.is_err() {
        assert!(
            start.elapsed() <= Duration::from_secs(timeout_secs),
            "server did not start within timeout"
        );
        time::sleep(Duration::from_millis(100)).await;
    }
}

/// A TCP endpoint the reachability probe can connect to. Dropping it closes
/// the port, making subsequent probes fail.
pub(crate) struct ProbeTarget {
    pub port: u16,
    task: task::JoinHandle<()>,
}

impl ProbeTarget {
    pub(crate) async fn bind() -> Self {
        let listener = TcpListener::bind(("127.0.0.1", 0))
            .await
            .expect("failed to bind probe target");
        let port = listener
            .local_addr()
            .expect("probe target has a local addr")
            .port();
        let task = tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, _)) => drop(stream),
                    Err(_) => break,
                }
            }
        });
        Self { port, task }
    }
}

impl Drop for ProbeTarget {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Fetch the current snapshot from the service.
pub(crate) async fn fetch_snapshot(client: &reqwest::Client, port: u16) -> Snapshot {
    client
        .get(format!("http://127.0.0.1:{port}/api/status"))
        .send()
        .await
        .expect("status request failed")
        .json()
        .await
        .expect("status response should be a snapshot")
}

/// Poll the status endpoint until `predicate` holds or `timeout_secs` passes.
pub(crate) async fn wait_for_snapshot<F>(
    client: &reqwest::Client,
    port: u16,
    timeout_secs: u64,
    predicate: F,
) -> Snapshot
where
    F: Fn(&Snapshot) -> bool,
{
    let start = Instant::now();
    loop {
        let snapshot = fetch_snapshot(client, port).await;
        if predicate(&snapshot) {
            return snapshot;
        }
        assert!(
            start.elapsed() <= Duration::from_secs(timeout_secs),
            "snapshot predicate not reached within timeout, last: {snapshot:?}"
        );
        time::sleep(Duration::from_millis(50)).await;
    }
}
