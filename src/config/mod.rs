pub mod duration;
pub mod roles;

pub use duration::parse_duration;
pub use roles::{RoleAssignment, RoleResolver, DEFAULT_INTERVAL, DEFAULT_ROLE};

use std::path::PathBuf;
use std::time::Duration;

/// Identity used when the orchestrator does not inject one
pub const UNKNOWN_NODE: &str = "unknown";

pub const DEFAULT_NODES_CONF: &str = "/scripts/nodes.conf";
pub const DEFAULT_SCRIPTS_DIR: &str = "/scripts";
/// Where node_exporter's textfile collector looks for `*.prom` files
pub const DEFAULT_TEXTFILE: &str = "/var/lib/node_exporter_textfile/custom_metrics.prom";
/// Keeps sidecar metrics apart from node_exporter's own
pub const DEFAULT_METRIC_PREFIX: &str = "edge_";
pub const DEFAULT_INTERPRETER: &str = "/bin/bash";
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_HEARTBEAT: Duration = Duration::from_secs(3600);

/// Runtime settings for one sidecar process
#[derive(Debug, Clone)]
pub struct Settings {
    pub node_name: String,
    pub nodes_conf: PathBuf,
    pub scripts_dir: PathBuf,
    pub textfile: PathBuf,
    pub metric_prefix: String,
    pub interpreter: PathBuf,
    pub probe_timeout: Duration,
    pub heartbeat: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            node_name: UNKNOWN_NODE.to_string(),
            nodes_conf: PathBuf::from(DEFAULT_NODES_CONF),
            scripts_dir: PathBuf::from(DEFAULT_SCRIPTS_DIR),
            textfile: PathBuf::from(DEFAULT_TEXTFILE),
            metric_prefix: DEFAULT_METRIC_PREFIX.to_string(),
            interpreter: PathBuf::from(DEFAULT_INTERPRETER),
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            heartbeat: DEFAULT_HEARTBEAT,
        }
    }
}

/// Map a raw node name to an identity; unset or blank becomes `unknown`.
pub fn node_identity(raw: Option<&str>) -> String {
    match raw.map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => UNKNOWN_NODE.to_string(),
    }
}
