//! Best-effort outage notification side effect.

use tracing::{debug, info, warn};

use crate::config::OutageConfig;

/// Fires the configured notification action when the connection becomes
/// unstable. The action is an operator-supplied shell command (sound
/// playback, a webhook curl, ...); without one only the log line is emitted.
#[derive(Clone, Default)]
pub(crate) struct OutageNotifier {
    command: Option<String>,
}

impl OutageNotifier {
    pub(crate) fn from_config(cfg: &OutageConfig) -> Self {
        Self {
            command: cfg.notify_command.clone(),
        }
    }

    /// Fire-and-forget notification. Failures are logged, never surfaced.
    pub(crate) fn spawn_notify(&self, reason: &str) {
        info!(%reason, "Connection became unstable");
        let Some(command) = self.command.clone() else {
            return;
        };
        let reason = reason.to_string();
        tokio::spawn(async move {
            const IS_WINDOWS: bool = cfg!(target_os = "windows");

            let result = tokio::process::Command::new(if IS_WINDOWS { "pwsh" } else { "sh" })
                .arg(if IS_WINDOWS { "-Command" } else { "-c" })
                .arg(&command)
                .env("FEEDWATCH_REASON", &reason)
                .status()
                .await;

            match result {
                Ok(status) if status.success() => {
                    debug!("Outage notification command completed");
                }
                Ok(status) => {
                    warn!(%status, "Outage notification command exited with failure");
                }
                Err(e) => {
                    warn!("Failed to run outage notification command: {e}");
                }
            }
        });
    }
}
