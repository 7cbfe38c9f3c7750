use crate::cli::Commands;
use crate::config::Settings;
use crate::scheduler::{Mode, Scheduler};
use crate::Result;
use tokio::signal;
use tracing::{info, warn};

pub async fn handle_command(command: Commands, settings: Settings) -> Result<()> {
    match command {
        Commands::Run => handle_run(settings).await,
        Commands::Once => handle_once(settings).await,
        Commands::Resolve => handle_resolve(settings),
    }
}

async fn handle_run(settings: Settings) -> Result<()> {
    let scheduler = Scheduler::resolve(&settings);
    scheduler.run_until(shutdown_signal()).await;
    Ok(())
}

async fn handle_once(settings: Settings) -> Result<()> {
    let scheduler = Scheduler::resolve(&settings);

    if let Mode::Idle(reason) = scheduler.mode() {
        info!(
            node = %scheduler.identity(),
            role = %scheduler.assignment().role,
            reason = %reason,
            "Nothing to collect"
        );
        return Ok(());
    }

    let report = scheduler.run_cycle().await;
    match report.publish_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

fn handle_resolve(settings: Settings) -> Result<()> {
    let scheduler = Scheduler::resolve(&settings);
    let assignment = scheduler.assignment();
    let mode = match scheduler.mode() {
        Mode::Active => "active".to_string(),
        Mode::Idle(reason) => format!("idle ({})", reason),
    };

    println!("node:     {}", scheduler.identity());
    println!("role:     {}", assignment.role);
    println!("interval: {:?}", assignment.interval);
    println!(
        "script:   {}",
        scheduler.runner().script_path(&assignment.role).display()
    );
    println!("output:   {}", scheduler.exporter().path().display());
    println!("mode:     {}", mode);
    Ok(())
}

/// Completes on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("Shutdown signal received");
}
