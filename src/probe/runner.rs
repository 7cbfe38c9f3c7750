//! Probe script execution
//!
//! Each role maps to `<scripts_dir>/<role>.sh`. The script is run under a hard
//! timeout and its stdout is parsed line by line as `key=value` readings.

use crate::config::{
    Settings, DEFAULT_INTERPRETER, DEFAULT_METRIC_PREFIX, DEFAULT_PROBE_TIMEOUT,
};
use crate::metrics::{sanitize, MetricSet};
use crate::{Result, SidecarError};
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::{Child, ChildStdout, Command};
use tracing::{debug, warn};

/// Longest probe output line accepted, newline included
pub const MAX_LINE_BYTES: usize = 64 * 1024;

const SCRIPT_EXTENSION: &str = "sh";

pub struct ScriptRunner {
    scripts_dir: PathBuf,
    interpreter: PathBuf,
    timeout: Duration,
    prefix: String,
}

impl ScriptRunner {
    pub fn new(scripts_dir: impl Into<PathBuf>) -> Self {
        Self {
            scripts_dir: scripts_dir.into(),
            interpreter: PathBuf::from(DEFAULT_INTERPRETER),
            timeout: DEFAULT_PROBE_TIMEOUT,
            prefix: DEFAULT_METRIC_PREFIX.to_string(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(&settings.scripts_dir)
            .with_interpreter(&settings.interpreter)
            .with_timeout(settings.probe_timeout)
            .with_prefix(&settings.metric_prefix)
    }

    pub fn with_interpreter(mut self, interpreter: impl Into<PathBuf>) -> Self {
        self.interpreter = interpreter.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Path of the probe bound to `role`
    pub fn script_path(&self, role: &str) -> PathBuf {
        self.scripts_dir.join(format!("{}.{}", role, SCRIPT_EXTENSION))
    }

    pub fn has_script(&self, role: &str) -> bool {
        self.script_path(role).is_file()
    }

    /// Run the probe for `role` and add every reading it prints to `metrics`.
    ///
    /// Readings parsed before a failure stay in `metrics` even when an error
    /// is returned. Returns the number of readings parsed.
    pub async fn collect(
        &self,
        role: &str,
        identity: &str,
        metrics: &mut MetricSet,
    ) -> Result<usize> {
        let path = self.script_path(role);
        if !path.is_file() {
            return Err(SidecarError::ProbeNotFound {
                role: role.to_string(),
                path,
            });
        }

        debug!(
            script = %path.display(),
            interpreter = %self.interpreter.display(),
            "Running probe"
        );

        let mut child = Command::new(&self.interpreter)
            .arg(&path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| SidecarError::ProbeSpawnFailed {
                path: path.clone(),
                source,
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::other("probe stdout not captured"))?;

        let mut parsed = 0;
        let run = self.drain(&path, &mut child, stdout, identity, metrics, &mut parsed);
        let result = tokio::time::timeout(self.timeout, run).await;
        let outcome = match result {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    script = %path.display(),
                    timeout = ?self.timeout,
                    "Probe did not finish in time, killing it"
                );
                if let Err(e) = child.kill().await {
                    warn!(script = %path.display(), error = %e, "Failed to kill probe");
                }
                Err(SidecarError::ProbeTimeout {
                    path: path.clone(),
                    timeout: self.timeout,
                })
            }
        };

        outcome.map(|()| parsed)
    }

    /// Stream the probe's stdout into `metrics`, then wait for it to exit
    async fn drain(
        &self,
        path: &Path,
        child: &mut Child,
        stdout: ChildStdout,
        identity: &str,
        metrics: &mut MetricSet,
        parsed: &mut usize,
    ) -> Result<()> {
        let mut reader = BufReader::new(stdout);
        let mut line = Vec::new();

        loop {
            line.clear();
            let read = (&mut reader)
                .take(MAX_LINE_BYTES as u64 + 1)
                .read_until(b'\n', &mut line)
                .await;

            let read = match read {
                Ok(read) => read,
                Err(e) => {
                    let _ = child.kill().await;
                    return Err(e.into());
                }
            };
            if read == 0 {
                break;
            }
            if read > MAX_LINE_BYTES && line.last() != Some(&b'\n') {
                let _ = child.kill().await;
                return Err(SidecarError::LineTooLong {
                    limit: MAX_LINE_BYTES,
                });
            }

            let text = String::from_utf8_lossy(&line);
            match parse_line(&text, &self.prefix) {
                Some((name, value)) => {
                    metrics.set_gauge(name, value, identity);
                    *parsed += 1;
                }
                None => {
                    debug!(script = %path.display(), line = %text.trim(), "Skipping probe line")
                }
            }
        }

        let status = child.wait().await?;
        if !status.success() {
            return Err(SidecarError::ProbeFailed {
                path: path.to_path_buf(),
                status,
            });
        }

        Ok(())
    }
}

/// Parse one probe output line into a prefixed metric name and value.
///
/// Blank lines, `#` comments, lines without `=` and values that are not
/// numbers all yield `None`.
pub fn parse_line(line: &str, prefix: &str) -> Option<(String, f64)> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    let (key, value) = line.split_once('=')?;
    let value: f64 = value.trim().parse().ok()?;

    Some((format!("{}{}", prefix, sanitize(key)), value))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;
    use std::time::Instant;
    use tempfile::TempDir;

    fn runner_with_script(role: &str, body: &str) -> (TempDir, ScriptRunner) {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(format!("{}.sh", role)), body).unwrap();
        let runner = ScriptRunner::new(dir.path()).with_interpreter("/bin/sh");
        (dir, runner)
    }

    #[test]
    fn test_parse_line() {
        assert_eq!(parse_line("temp=42.5", "edge_"), Some(("edge_temp".to_string(), 42.5)));
        assert_eq!(parse_line("  humidity = 55 \n", "edge_"), Some(("edge_humidity_".to_string(), 55.0)));
        assert_eq!(parse_line("gpu.0-temp=-3e2", "edge_"), Some(("edge_gpu_0_temp".to_string(), -300.0)));
        assert_eq!(parse_line("a=b=1", "edge_"), None);
        assert_eq!(parse_line("bad_line", "edge_"), None);
        assert_eq!(parse_line("# temp=1", "edge_"), None);
        assert_eq!(parse_line("", "edge_"), None);
        assert_eq!(parse_line("temp=warm", "edge_"), None);
    }

    #[test]
    fn test_script_path_convention() {
        let runner = ScriptRunner::new("/scripts");
        assert_eq!(runner.script_path("sensors"), PathBuf::from("/scripts/sensors.sh"));
    }

    #[tokio::test]
    async fn test_collect_parses_output() {
        let (_dir, runner) = runner_with_script(
            "sensors",
            "printf 'temp=42.5\\nbad_line\\n#comment\\nhumidity=55\\n'\n",
        );
        let mut metrics = MetricSet::new("sensors");

        let parsed = runner.collect("sensors", "edgeA", &mut metrics).await.unwrap();

        assert_eq!(parsed, 2);
        assert_eq!(metrics.len(), 2);
        assert_eq!(metrics.get("edge_temp").unwrap().value, 42.5);
        assert_eq!(metrics.get("edge_humidity").unwrap().value, 55.0);
        assert_eq!(
            metrics.get("edge_temp").unwrap().const_labels.get("node").map(String::as_str),
            Some("edgeA")
        );
    }

    #[tokio::test]
    async fn test_collect_collision_last_wins() {
        let (_dir, runner) = runner_with_script("sensors", "echo 'fan.rpm=1'\necho 'fan-rpm=2'\n");
        let mut metrics = MetricSet::new("sensors");

        runner.collect("sensors", "edgeA", &mut metrics).await.unwrap();

        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics.get("edge_fan_rpm").unwrap().value, 2.0);
    }

    #[tokio::test]
    async fn test_collect_nonzero_exit_keeps_partial() {
        let (_dir, runner) = runner_with_script("sensors", "echo 'temp=1'\nexit 3\n");
        let mut metrics = MetricSet::new("sensors");

        let err = runner.collect("sensors", "edgeA", &mut metrics).await.unwrap_err();

        assert!(matches!(err, SidecarError::ProbeFailed { .. }));
        assert_eq!(metrics.get("edge_temp").unwrap().value, 1.0);
    }

    #[tokio::test]
    async fn test_collect_timeout_keeps_partial() {
        let (_dir, runner) = runner_with_script("sensors", "echo 'temp=7'\nexec sleep 30\n");
        let runner = runner.with_timeout(Duration::from_millis(500));
        let mut metrics = MetricSet::new("sensors");

        let started = Instant::now();
        let err = runner.collect("sensors", "edgeA", &mut metrics).await.unwrap_err();

        assert!(matches!(err, SidecarError::ProbeTimeout { .. }));
        assert!(started.elapsed() < Duration::from_secs(10));
        assert_eq!(metrics.get("edge_temp").unwrap().value, 7.0);
    }

    #[tokio::test]
    async fn test_collect_missing_script() {
        let dir = tempfile::tempdir().unwrap();
        let runner = ScriptRunner::new(dir.path());
        let mut metrics = MetricSet::new("ghost");

        assert!(!runner.has_script("ghost"));
        let err = runner.collect("ghost", "edgeA", &mut metrics).await.unwrap_err();
        assert!(matches!(err, SidecarError::ProbeNotFound { .. }));
        assert!(metrics.is_empty());
    }

    #[tokio::test]
    async fn test_collect_rejects_overlong_line() {
        let body = format!("echo 'ok=1'\nhead -c {} /dev/zero | tr '\\0' 'x'\n", MAX_LINE_BYTES + 10);
        let (_dir, runner) = runner_with_script("sensors", &body);
        let mut metrics = MetricSet::new("sensors");

        let err = runner.collect("sensors", "edgeA", &mut metrics).await.unwrap_err();

        assert!(matches!(err, SidecarError::LineTooLong { .. }));
        assert_eq!(metrics.len(), 1);
    }
}
