mod monitor;
mod notify;
mod probe;
mod simulation;
mod state;

// Re-export a curated crate-visible surface for consumers of `crate::app`
pub(crate) use monitor::{start_monitoring, stop_monitoring, toggle_monitoring};
pub(crate) use simulation::trigger_outage;
pub(crate) use state::{AppState, initialize_state};

pub use state::{ConnectionStatus, FeedChoice, Snapshot};
