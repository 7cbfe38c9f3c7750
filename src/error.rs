use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SidecarError {
    #[error("Invalid duration '{0}'")]
    InvalidDuration(String),

    #[error("No probe for role {role}: {} not found", path.display())]
    ProbeNotFound { role: String, path: PathBuf },

    #[error("Failed to spawn probe {}: {source}", path.display())]
    ProbeSpawnFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Probe {} killed after {timeout:?}", path.display())]
    ProbeTimeout { path: PathBuf, timeout: Duration },

    #[error("Probe {} exited with {status}", path.display())]
    ProbeFailed { path: PathBuf, status: ExitStatus },

    #[error("Probe output line exceeds {limit} bytes")]
    LineTooLong { limit: usize },

    #[error("Metrics error: {0}")]
    MetricsError(#[from] prometheus::Error),

    #[error("Failed to publish {}: {source}", path.display())]
    PublishFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SidecarError>;
