//! Node role table
//!
//! The table is a line-oriented file mounted into the pod, one entry per node:
//!
//! ```text
//! # identity=role[:interval]
//! edge-a=sensors:5s
//! edge-b=gateway
//! ```
//!
//! It is read once at startup. Every failure mode degrades to the `default`
//! role with a 15s interval instead of stopping the sidecar.

use crate::config::duration::parse_duration;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Role given to nodes without an entry in the table
pub const DEFAULT_ROLE: &str = "default";

/// Collection interval used when none is configured or it cannot be parsed
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(15);

/// The role and cadence resolved for one node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleAssignment {
    pub role: String,
    pub interval: Duration,
}

impl RoleAssignment {
    pub fn new(role: impl Into<String>, interval: Duration) -> Self {
        Self {
            role: role.into(),
            interval,
        }
    }

    /// The assignment used when the table has nothing to say about a node
    pub fn fallback() -> Self {
        Self::new(DEFAULT_ROLE, DEFAULT_INTERVAL)
    }

    pub fn is_default_role(&self) -> bool {
        self.role == DEFAULT_ROLE
    }
}

impl Default for RoleAssignment {
    fn default() -> Self {
        Self::fallback()
    }
}

/// Resolves node identities against the role table on disk
pub struct RoleResolver {
    path: PathBuf,
}

impl RoleResolver {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Look up `identity` in the table.
    ///
    /// An unreadable table is logged and yields [`RoleAssignment::fallback`].
    pub fn resolve(&self, identity: &str) -> RoleAssignment {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) => {
                let fallback = RoleAssignment::fallback();
                warn!(
                    config = %self.path.display(),
                    error = %e,
                    role = %fallback.role,
                    interval = ?fallback.interval,
                    "Cannot open role table, using fallback"
                );
                return fallback;
            }
        };

        resolve_from_reader(BufReader::new(file), identity)
    }
}

/// Scan a role table for the first entry matching `identity`.
pub fn resolve_from_reader<R: BufRead>(reader: R, identity: &str) -> RoleAssignment {
    for line in reader.split(b'\n') {
        let line = match line {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, "Failed to read role table, using fallback");
                return RoleAssignment::fallback();
            }
        };
        let line = String::from_utf8_lossy(&line);
        let line = line.trim();

        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        if key.trim() != identity {
            continue;
        }

        return parse_entry(identity, value.trim());
    }

    debug!(node = identity, "No role table entry, using fallback");
    RoleAssignment::fallback()
}

/// Interpret the right-hand side of a matching `identity=value` line
fn parse_entry(identity: &str, value: &str) -> RoleAssignment {
    let Some((role, interval_text)) = value.split_once(':') else {
        return RoleAssignment::new(value, DEFAULT_INTERVAL);
    };
    let role = role.trim();
    let interval_text = interval_text.trim();

    match parse_duration(interval_text) {
        Ok(interval) if !interval.is_zero() => RoleAssignment::new(role, interval),
        Ok(_) => {
            warn!(
                node = identity,
                interval = interval_text,
                "Zero interval in role table, falling back to {:?}",
                DEFAULT_INTERVAL
            );
            RoleAssignment::new(role, DEFAULT_INTERVAL)
        }
        Err(e) => {
            warn!(
                node = identity,
                error = %e,
                "Invalid interval in role table, falling back to {:?}",
                DEFAULT_INTERVAL
            );
            RoleAssignment::new(role, DEFAULT_INTERVAL)
        }
    }
}
