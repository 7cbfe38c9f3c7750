//! Collection state machine
//!
//! A sidecar resolves its role once, then either idles with an hourly
//! heartbeat (no role, or no probe for it) or runs one collection cycle per
//! configured interval until shut down.

use crate::config::{RoleAssignment, RoleResolver, Settings, DEFAULT_HEARTBEAT};
use crate::metrics::{MetricSet, TextfileExporter};
use crate::probe::ScriptRunner;
use crate::SidecarError;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleReason {
    DefaultRole,
    MissingProbe,
}

impl IdleReason {
    pub const fn as_str(&self) -> &'static str {
        match self {
            IdleReason::DefaultRole => "default role",
            IdleReason::MissingProbe => "no probe script",
        }
    }
}

impl fmt::Display for IdleReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What a resolved sidecar does until it is stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Idle(IdleReason),
    Active,
}

/// Outcome of one collection cycle
#[derive(Debug)]
pub struct CycleReport {
    /// Points published, including those parsed before a probe failure
    pub collected: usize,
    pub collect_error: Option<SidecarError>,
    pub publish_error: Option<SidecarError>,
}

impl CycleReport {
    pub fn is_clean(&self) -> bool {
        self.collect_error.is_none() && self.publish_error.is_none()
    }
}

/// Counters returned when a run loop stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub cycles: u64,
    pub heartbeats: u64,
}

pub struct Scheduler {
    identity: String,
    assignment: RoleAssignment,
    runner: ScriptRunner,
    exporter: TextfileExporter,
    heartbeat: Duration,
}

impl Scheduler {
    pub fn new(
        identity: impl Into<String>,
        assignment: RoleAssignment,
        runner: ScriptRunner,
        exporter: TextfileExporter,
    ) -> Self {
        Self {
            identity: identity.into(),
            assignment,
            runner,
            exporter,
            heartbeat: DEFAULT_HEARTBEAT,
        }
    }

    /// Resolve this node's role from the role table and build the scheduler
    pub fn resolve(settings: &Settings) -> Self {
        let identity = settings.node_name.clone();
        let assignment = RoleResolver::new(&settings.nodes_conf).resolve(&identity);
        let runner = ScriptRunner::from_settings(settings);
        let exporter = TextfileExporter::new(&settings.textfile);

        info!(
            node = %identity,
            role = %assignment.role,
            interval = ?assignment.interval,
            script = %runner.script_path(&assignment.role).display(),
            "Collector configured"
        );

        Self::new(identity, assignment, runner, exporter).with_heartbeat(settings.heartbeat)
    }

    pub fn with_heartbeat(mut self, heartbeat: Duration) -> Self {
        self.heartbeat = heartbeat;
        self
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn assignment(&self) -> &RoleAssignment {
        &self.assignment
    }

    pub fn runner(&self) -> &ScriptRunner {
        &self.runner
    }

    pub fn exporter(&self) -> &TextfileExporter {
        &self.exporter
    }

    pub fn mode(&self) -> Mode {
        if self.assignment.is_default_role() {
            Mode::Idle(IdleReason::DefaultRole)
        } else if !self.runner.has_script(&self.assignment.role) {
            Mode::Idle(IdleReason::MissingProbe)
        } else {
            Mode::Active
        }
    }

    /// Run one probe and publish whatever it produced.
    ///
    /// Errors are logged and reported, never propagated.
    pub async fn run_cycle(&self) -> CycleReport {
        let role = &self.assignment.role;
        let mut metrics = MetricSet::new(role);

        let collect_error = match self.runner.collect(role, &self.identity, &mut metrics).await {
            Ok(_) => {
                info!(
                    node = %self.identity,
                    count = metrics.len(),
                    script = %self.runner.script_path(role).display(),
                    "Collected metrics"
                );
                None
            }
            Err(e) => {
                error!(
                    node = %self.identity,
                    count = metrics.len(),
                    error = %e,
                    "Collection failed"
                );
                Some(e)
            }
        };

        let collected = metrics.len();
        let publish_error = match self.exporter.publish(metrics) {
            Ok(()) => None,
            Err(e) => {
                error!(
                    path = %self.exporter.path().display(),
                    error = %e,
                    "Textfile write failed"
                );
                Some(e)
            }
        };

        CycleReport {
            collected,
            collect_error,
            publish_error,
        }
    }

    /// Drive the idle or active loop until `shutdown` completes
    pub async fn run_until<F>(&self, shutdown: F) -> RunStats
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut stats = RunStats::default();

        match self.mode() {
            Mode::Idle(reason) => {
                info!(
                    node = %self.identity,
                    role = %self.assignment.role,
                    reason = %reason,
                    heartbeat = ?self.heartbeat,
                    "Entering idle mode"
                );
                let mut ticker = time::interval(self.heartbeat);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

                loop {
                    tokio::select! {
                        _ = &mut shutdown => break,
                        _ = ticker.tick() => {
                            info!(node = %self.identity, "Sidecar is alive (idle)");
                            stats.heartbeats += 1;
                        }
                    }
                }
            }
            Mode::Active => {
                let interval = self.assignment.interval;
                let mut ticker = time::interval_at(Instant::now() + interval, interval);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

                loop {
                    tokio::select! {
                        _ = &mut shutdown => break,
                        _ = ticker.tick() => {
                            self.run_cycle().await;
                            stats.cycles += 1;
                        }
                    }
                }
            }
        }

        info!(
            node = %self.identity,
            cycles = stats.cycles,
            heartbeats = stats.heartbeats,
            "Collector stopped"
        );
        stats
    }

    /// Run until the process is stopped
    pub async fn run(&self) -> RunStats {
        self.run_until(std::future::pending()).await
    }
}
