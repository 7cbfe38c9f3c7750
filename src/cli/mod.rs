pub mod commands;

use crate::config::{
    node_identity, parse_duration, Settings, DEFAULT_HEARTBEAT, DEFAULT_INTERPRETER,
    DEFAULT_METRIC_PREFIX, DEFAULT_NODES_CONF, DEFAULT_SCRIPTS_DIR, DEFAULT_TEXTFILE,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "edge-sidecar")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Per-node metrics sidecar publishing probe readings for node_exporter", long_about = None)]
pub struct Cli {
    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(long, env = "NODE_NAME", global = true, help = "Node identity (defaults to \"unknown\")")]
    pub node_name: Option<String>,

    #[arg(long, env = "EDGE_NODES_CONF", default_value = DEFAULT_NODES_CONF, global = true, help = "Node role table")]
    pub config: PathBuf,

    #[arg(long, env = "EDGE_SCRIPTS_DIR", default_value = DEFAULT_SCRIPTS_DIR, global = true, help = "Directory holding <role>.sh probes")]
    pub scripts_dir: PathBuf,

    #[arg(long, env = "EDGE_TEXTFILE", default_value = DEFAULT_TEXTFILE, global = true, help = "Snapshot file read by the textfile collector")]
    pub output: PathBuf,

    #[arg(long, env = "EDGE_METRIC_PREFIX", default_value = DEFAULT_METRIC_PREFIX, global = true, help = "Prefix for every published metric name")]
    pub prefix: String,

    #[arg(long, env = "EDGE_INTERPRETER", default_value = DEFAULT_INTERPRETER, global = true, help = "Program used to run probe scripts")]
    pub interpreter: PathBuf,

    #[arg(long, env = "EDGE_PROBE_TIMEOUT", default_value = "10s", value_parser = parse_timeout, global = true, help = "Kill probes running longer than this")]
    pub probe_timeout: Duration,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    #[command(about = "Collect and publish on the configured interval (default)")]
    Run,
    #[command(about = "Run a single collection cycle and exit")]
    Once,
    #[command(about = "Show the role resolved for this node and exit")]
    Resolve,
}

impl Cli {
    pub fn settings(&self) -> Settings {
        Settings {
            node_name: node_identity(self.node_name.as_deref()),
            nodes_conf: self.config.clone(),
            scripts_dir: self.scripts_dir.clone(),
            textfile: self.output.clone(),
            metric_prefix: self.prefix.clone(),
            interpreter: self.interpreter.clone(),
            probe_timeout: self.probe_timeout,
            heartbeat: DEFAULT_HEARTBEAT,
        }
    }
}

fn parse_timeout(s: &str) -> Result<Duration, String> {
    match parse_duration(s) {
        Ok(d) if d.is_zero() => Err("timeout must be greater than zero".to_string()),
        Ok(d) => Ok(d),
        Err(e) => Err(e.to_string()),
    }
}
