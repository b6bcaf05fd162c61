//! Configuration types and loading for the feedwatch service.
//!
//! The config is a TOML file read once at startup. Paths in the config are
//! interpreted relative to the config file when not absolute.

use std::path::{Component, Path, PathBuf};

use eyre::WrapErr as _;
use serde::Deserialize;
use tokio::fs;

/// HTTP server binding configuration section.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub(crate) struct ServerConfig {
    /// TCP port for the web service.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Bind address for the HTTP listener.
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind: default_bind(),
        }
    }
}

/// Connection watchdog configuration.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub(crate) struct MonitorConfig {
    /// Delay between reachability probes, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Extra delay after a probe error before the next tick, in milliseconds.
    #[serde(default = "default_probe_backoff_ms")]
    pub probe_backoff_ms: u64,
    /// Host the reachability probe connects to.
    #[serde(default = "default_probe_host")]
    pub probe_host: String,
    /// Port the reachability probe connects to.
    #[serde(default = "default_probe_port")]
    pub probe_port: u16,
    /// Upper bound on a single probe attempt, in milliseconds.
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
    /// Start the watchdog on boot instead of waiting for the first
    /// `/api/monitoring/start` call.
    #[serde(default)]
    pub autostart: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            probe_backoff_ms: default_probe_backoff_ms(),
            probe_host: default_probe_host(),
            probe_port: default_probe_port(),
            probe_timeout_ms: default_probe_timeout_ms(),
            autostart: false,
        }
    }
}

/// Video feed sources.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub(crate) struct FeedsConfig {
    /// Path to the looping backup video asset. Relative paths are resolved
    /// relative to the config file.
    #[serde(default = "default_backup_video")]
    pub backup_video: String,
}

impl Default for FeedsConfig {
    fn default() -> Self {
        Self {
            backup_video: default_backup_video(),
        }
    }
}

/// Simulated-outage and notification settings.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub(crate) struct OutageConfig {
    /// Default length of a simulated outage when the request doesn't specify one.
    #[serde(default = "default_outage_duration_secs")]
    pub default_duration_secs: u64,
    /// Optional shell command run (best-effort) when the connection becomes
    /// unstable. The reason is passed in `FEEDWATCH_REASON`.
    #[serde(default)]
    pub notify_command: Option<String>,
}

impl Default for OutageConfig {
    fn default() -> Self {
        Self {
            default_duration_secs: default_outage_duration_secs(),
            notify_command: None,
        }
    }
}

const fn default_port() -> u16 {
    8080
}

fn default_bind() -> String {
    "127.0.0.1".to_string()
}

const fn default_poll_interval_ms() -> u64 {
    500
}

const fn default_probe_backoff_ms() -> u64 {
    250
}

fn default_probe_host() -> String {
    "1.1.1.1".to_string()
}

const fn default_probe_port() -> u16 {
    53
}

const fn default_probe_timeout_ms() -> u64 {
    500
}

fn default_backup_video() -> String {
    "./backup_video.mp4".to_string()
}

const fn default_outage_duration_secs() -> u64 {
    6
}

/// Root config structure for the service.
#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
pub(crate) struct AppConfig {
    /// HTTP server binding configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Connection watchdog settings.
    #[serde(default)]
    pub monitor: MonitorConfig,
    /// Video feed sources.
    #[serde(default)]
    pub feeds: FeedsConfig,
    /// Simulated-outage and notification settings.
    #[serde(default)]
    pub outage: OutageConfig,
}

/// Reads and parses the service config from a TOML file.
///
/// # Errors
///
/// Returns an error if the config file cannot be read or parsed.
pub(crate) async fn load<P: AsRef<Path>>(path: P) -> eyre::Result<AppConfig> {
    let path_ref = path.as_ref();
    let content = fs::read_to_string(&path).await.wrap_err(format!(
        "Failed to read config file at: {}",
        path_ref.display()
    ))?;
    let config: AppConfig = toml::from_str(&content).wrap_err(format!(
        "Failed to parse config as TOML at: {}",
        path_ref.display()
    ))?;
    Ok(config)
}

/// Resolves a path to an absolute one.
///
/// If the path is absolute, returns it as-is. If relative, joins it with the
/// config file's parent directory and normalizes the result to remove
/// redundant components like `./`.
pub(crate) fn resolve_config_relative_paths(config_path: &Path, relative_path: &str) -> PathBuf {
    let path = Path::new(relative_path);
    let resolved = if path.is_absolute() {
        path.to_path_buf()
    } else {
        config_path
            .parent()
            .map_or_else(|| path.to_path_buf(), |d| d.join(path))
    };

    // Normalize the path to remove redundant ./ components.
    // We can't use canonicalize() because the file might not exist yet.
    normalize_path(&resolved)
}

fn normalize_path(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();
    for component in path.components() {
        use Component as C;
        match component {
            C::Normal(c) => {
                result.push(c);
            }
            C::ParentDir => {
                result.pop();
            }
            C::CurDir => {
                // Skip current directory components
            }
            C::RootDir | C::Prefix(_) => {
                result.push(component);
            }
        }
    }
    result
}
