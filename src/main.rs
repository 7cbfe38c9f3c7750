use clap::Parser;
use edge_sidecar::cli::{commands, Cli, Commands};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting edge-sidecar v{}", edge_sidecar::VERSION);

    let settings = cli.settings();
    let command = cli.command.unwrap_or(Commands::Run);

    commands::handle_command(command, settings).await?;
    Ok(())
}
