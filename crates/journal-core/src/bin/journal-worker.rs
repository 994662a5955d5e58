//! Runs the media processing backend until interrupted.
//!
//! Usage: `journal-worker [config.json]`

use std::path::PathBuf;
use std::process::ExitCode;

use journal_core::{load_config, logging, AppState, Config, JournalError};
use log::{error, info};

fn run(config_path: Option<PathBuf>) -> Result<(), JournalError> {
    let config = match &config_path {
        Some(path) => load_config(path)?,
        None => Config::default(),
    };

    logging::init(&config.logging)?;

    info!("Starting journal worker v{}", env!("CARGO_PKG_VERSION"));
    match &config_path {
        Some(path) => info!("Using config file {}", path.display()),
        None => info!("No config file given, using defaults"),
    }

    let state = AppState::open(config)?;

    let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(1);
    ctrlc::set_handler(move || {
        let _ = stop_tx.try_send(());
    })
    .map_err(|e| {
        state.shutdown();
        JournalError::Signal(e.to_string())
    })?;

    info!("Ready; press Ctrl-C to stop");
    let _ = stop_rx.recv();

    info!("Interrupt received, draining media jobs");
    state.shutdown();

    let status = state.processing_status();
    info!(
        "Stopped after {} completed and {} failed jobs",
        status.completed_jobs, status.failed_jobs
    );
    Ok(())
}

fn main() -> ExitCode {
    let config_path = std::env::args_os().nth(1).map(PathBuf::from);

    match run(config_path) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("journal-worker: {}", e);
            ExitCode::FAILURE
        }
    }
}
