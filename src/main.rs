//! Entry point and runtime initialization.

use anyhow::Result;
use tracing_appender::non_blocking::WorkerGuard;

mod app;
mod config;
mod engine;
mod events;
mod firebase;
mod input;
mod jobs;
mod layout;
mod message;
mod pricing;
mod shortcuts;
mod store;
mod ui;
mod worker;

/// Initialize file logging and keep the async guard alive.
fn init_logging() -> Result<WorkerGuard> {
    let log_file = "dispatch_tui.log";
    // Log to a file so the TUI output stays clean.
    let file_appender = tracing_appender::rolling::never(".", log_file);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to init logging: {e}"))?;
    tracing::info!("logging to {}", log_file);
    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    let _log_guard = init_logging()?;
    tracing::info!("app starting");
    let mut terminal = ui::init_terminal()?;
    let res = app::run_app(&mut terminal).await;
    // Always restore the terminal, even on error.
    ui::restore_terminal()?;
    if let Err(ref e) = res {
        tracing::error!("app error: {e}");
    }
    tracing::info!("app exiting");
    res
}
