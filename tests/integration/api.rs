//! Integration tests for the JSON control API.

use core::time::Duration;

use feedwatch::{ConnectionStatus, FeedChoice};
use serde_json::Value;
use tokio::time;

use crate::common::{
    ProbeTarget, fetch_snapshot, get_free_port, service_config, spawn_service_with_config,
    wait_for_listening, wait_for_snapshot,
};

#[tokio::test]
async fn status_defaults_and_monitoring_lifecycle() {
    let port = get_free_port();
    let probe_target = ProbeTarget::bind().await;

    let _service = spawn_service_with_config(port, &service_config(port, probe_target.port));
    wait_for_listening(port, 5).await;

    let client = reqwest::Client::new();

    // Fresh session: stable, live, nothing running.
    let snapshot = fetch_snapshot(&client, port).await;
    assert_eq!(snapshot.status, ConnectionStatus::Stable);
    assert_eq!(snapshot.active_feed, FeedChoice::Live);
    assert!(!snapshot.monitoring_running);
    assert!(!snapshot.override_active);
    assert!(snapshot.last_change.is_none());

    // First start spawns the watchdog, second reports it as already running.
    let started: Value = client
        .post(format!("http://127.0.0.1:{port}/api/monitoring/start"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(started["already_running"], Value::Bool(false));

    let started_again: Value = client
        .post(format!("http://127.0.0.1:{port}/api/monitoring/start"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(started_again["already_running"], Value::Bool(true));

    // Probe target is reachable: the connection stays stable.
    let snapshot = wait_for_snapshot(&client, port, 5, |s| s.monitoring_running).await;
    assert_eq!(snapshot.status, ConnectionStatus::Stable);

    // Closing the probe target flips the session to unstable/backup.
    drop(probe_target);
    let snapshot = wait_for_snapshot(&client, port, 5, |s| {
        s.status == ConnectionStatus::Unstable
    })
    .await;
    assert_eq!(snapshot.active_feed, FeedChoice::Backup);
    assert!(snapshot.last_change.is_some());

    // Stop tears the watchdog down.
    let stop_response = client
        .post(format!("http://127.0.0.1:{port}/api/monitoring/stop"))
        .send()
        .await
        .unwrap();
    assert_eq!(stop_response.status(), reqwest::StatusCode::NO_CONTENT);
    wait_for_snapshot(&client, port, 5, |s| !s.monitoring_running).await;
}

#[tokio::test]
async fn toggle_monitoring_roundtrip() {
    let port = get_free_port();
    let probe_target = ProbeTarget::bind().await;

    let _service = spawn_service_with_config(port, &service_config(port, probe_target.port));
    wait_for_listening(port, 5).await;

    let client = reqwest::Client::new();

    let toggled: Value = client
        .post(format!("http://127.0.0.1:{port}/api/monitoring/toggle"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(toggled["running"], Value::Bool(true));

    let toggled: Value = client
        .post(format!("http://127.0.0.1:{port}/api/monitoring/toggle"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(toggled["running"], Value::Bool(false));
}

#[tokio::test]
async fn toggle_feed_is_independent_of_connection_state() {
    let port = get_free_port();
    // Monitoring is never started here, so the toggle is not realigned.
    let _service = spawn_service_with_config(port, &service_config(port, get_free_port()));
    wait_for_listening(port, 5).await;

    let client = reqwest::Client::new();

    let toggled: Value = client
        .post(format!("http://127.0.0.1:{port}/api/feed/toggle"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(toggled["active_feed"], Value::String("backup".into()));

    let snapshot = fetch_snapshot(&client, port).await;
    assert_eq!(snapshot.active_feed, FeedChoice::Backup);
    // The connection state is untouched by a manual feed flip.
    assert_eq!(snapshot.status, ConnectionStatus::Stable);

    let toggled: Value = client
        .post(format!("http://127.0.0.1:{port}/api/feed/toggle"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(toggled["active_feed"], Value::String("live".into()));
}

#[tokio::test]
async fn simulated_outage_expires_on_its_own() {
    let port = get_free_port();
    let _service = spawn_service_with_config(port, &service_config(port, get_free_port()));
    wait_for_listening(port, 5).await;

    let client = reqwest::Client::new();

    let summary: Value = client
        .post(format!(
            "http://127.0.0.1:{port}/api/outage/simulate?duration_secs=1&reason=demo"
        ))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(summary["status"], Value::String("unstable".into()));
    assert_eq!(summary["active_feed"], Value::String("backup".into()));

    let snapshot = fetch_snapshot(&client, port).await;
    assert!(snapshot.override_active);

    // The auto-clear restores normal operation after the requested second.
    let snapshot = wait_for_snapshot(&client, port, 5, |s| !s.override_active).await;
    assert_eq!(snapshot.status, ConnectionStatus::Stable);
    assert_eq!(snapshot.active_feed, FeedChoice::Live);
}

#[tokio::test]
async fn reset_ends_an_outage_early() {
    let port = get_free_port();
    let _service = spawn_service_with_config(port, &service_config(port, get_free_port()));
    wait_for_listening(port, 5).await;

    let client = reqwest::Client::new();

    client
        .post(format!(
            "http://127.0.0.1:{port}/api/outage/simulate?duration_secs=60"
        ))
        .send()
        .await
        .unwrap();

    let summary: Value = client
        .post(format!("http://127.0.0.1:{port}/api/connection/reset"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(summary["status"], Value::String("stable".into()));
    assert_eq!(summary["active_feed"], Value::String("live".into()));

    let snapshot = fetch_snapshot(&client, port).await;
    assert!(!snapshot.override_active);

    // The cancelled 60s timer must not fire later; a short wait suffices to
    // catch an immediate stale clear.
    time::sleep(Duration::from_millis(500)).await;
    let snapshot = fetch_snapshot(&client, port).await;
    assert_eq!(snapshot.status, ConnectionStatus::Stable);
    assert!(!snapshot.override_active);
}

#[tokio::test]
async fn override_outlasts_watchdog_ticks() {
    let port = get_free_port();
    let probe_target = ProbeTarget::bind().await;

    let _service = spawn_service_with_config(port, &service_config(port, probe_target.port));
    wait_for_listening(port, 5).await;

    let client = reqwest::Client::new();

    client
        .post(format!("http://127.0.0.1:{port}/api/monitoring/start"))
        .send()
        .await
        .unwrap();

    client
        .post(format!(
            "http://127.0.0.1:{port}/api/outage/simulate?duration_secs=60"
        ))
        .send()
        .await
        .unwrap();

    // The probe target is reachable the whole time, but the suppression
    // window keeps the session pinned to unstable/backup across many ticks.
    time::sleep(Duration::from_millis(800)).await;
    let snapshot = fetch_snapshot(&client, port).await;
    assert_eq!(snapshot.status, ConnectionStatus::Unstable);
    assert_eq!(snapshot.active_feed, FeedChoice::Backup);
    assert!(snapshot.override_active);

    // Reset hands control back to the watchdog, which sees a reachable
    // endpoint and keeps the connection stable.
    client
        .post(format!("http://127.0.0.1:{port}/api/connection/reset"))
        .send()
        .await
        .unwrap();
    let snapshot = wait_for_snapshot(&client, port, 5, |s| {
        s.status == ConnectionStatus::Stable && !s.override_active
    })
    .await;
    assert_eq!(snapshot.active_feed, FeedChoice::Live);
}
