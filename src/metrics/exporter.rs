//! node_exporter textfile publisher
//!
//! Snapshots are encoded into a hidden temporary file next to the target and
//! renamed over it, so a scraper reading the target sees either the previous
//! complete snapshot or the new one.

use crate::metrics::set::MetricSet;
use crate::{Result, SidecarError};
use prometheus::{Encoder, Gauge, Opts, Registry, TextEncoder};
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process;
use tracing::debug;

pub struct TextfileExporter {
    path: PathBuf,
}

impl TextfileExporter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Atomically replace the snapshot at the target path with `metrics`.
    ///
    /// On failure the temporary file is removed and the previous snapshot is
    /// left as it was.
    pub fn publish(&self, metrics: MetricSet) -> Result<()> {
        let registry = build_registry(&metrics)?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(|e| self.publish_error(e))?;

        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "snapshot".to_string());

        // Leading dot keeps the textfile collector from picking up the
        // half-written file, it only reads `*.prom`.
        let mut tmp = tempfile::Builder::new()
            .prefix(&format!(".{}.{}.", file_name, process::id()))
            .tempfile_in(dir)
            .map_err(|e| self.publish_error(e))?;

        {
            let mut writer = BufWriter::new(tmp.as_file_mut());
            TextEncoder::new().encode(&registry.gather(), &mut writer)?;
            writer.flush().map_err(|e| self.publish_error(e))?;
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tmp.as_file()
                .set_permissions(fs::Permissions::from_mode(0o644))
                .map_err(|e| self.publish_error(e))?;
        }
        tmp.as_file()
            .sync_all()
            .map_err(|e| self.publish_error(e))?;

        debug!(
            tmp = %tmp.path().display(),
            path = %self.path.display(),
            count = metrics.len(),
            "Renaming snapshot into place"
        );
        tmp.persist(&self.path)
            .map_err(|e| self.publish_error(e.error))?;

        Ok(())
    }

    fn publish_error(&self, source: io::Error) -> SidecarError {
        SidecarError::PublishFailed {
            path: self.path.clone(),
            source,
        }
    }
}

/// Render `metrics` in the Prometheus text exposition format
pub fn render(metrics: &MetricSet) -> Result<String> {
    let registry = build_registry(metrics)?;
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&registry.gather(), &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

/// A throwaway registry holding one gauge per point
fn build_registry(metrics: &MetricSet) -> Result<Registry> {
    let registry = Registry::new();

    for point in metrics.iter() {
        let opts = Opts::new(point.name.clone(), metrics.help())
            .const_labels(point.const_labels.clone());
        let gauge = Gauge::with_opts(opts)?;
        gauge.set(point.value);
        registry.register(Box::new(gauge))?;
    }

    Ok(registry)
}
