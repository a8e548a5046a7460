//! # OS shutdown signal.
//!
//! The orchestrator races [`wait_for_shutdown_signal`] against its kill
//! schedule; whichever completes first decides when the graph is torn down.
//! The returned name ends up in the `ShutdownRequested` event.

use std::io;

/// Waits for `SIGINT`, `SIGTERM` or `SIGQUIT` and returns its name.
///
/// Returns `Err` if a handler cannot be installed.
#[cfg(unix)]
pub async fn wait_for_shutdown_signal() -> io::Result<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;

    let name = tokio::select! {
        _ = sigint.recv()  => "SIGINT",
        _ = sigterm.recv() => "SIGTERM",
        _ = sigquit.recv() => "SIGQUIT",
    };
    Ok(name)
}

/// Waits for Ctrl-C.
///
/// Returns `Err` if the handler cannot be installed.
#[cfg(not(unix))]
pub async fn wait_for_shutdown_signal() -> io::Result<&'static str> {
    tokio::signal::ctrl_c().await?;
    Ok("ctrl-c")
}
