//! # Cross-platform OS signal handling.
//!
//! Provides [`wait_for_shutdown_signal`], an async helper that completes when
//! the process receives a termination signal.
//!
//! ## Signals
//! **Unix platforms:**
//! - `SIGINT` (Ctrl-C in terminal)
//! - `SIGTERM` (default kill signal, used by systemd/Kubernetes)
//! - `SIGQUIT` (quit signal)
//!
//! **Other platforms:**
//! - `Ctrl-C` via [`tokio::signal::ctrl_c`]

use crate::error::RuntimeError;

/// Waits for a termination signal and returns its name.
///
/// Each call creates independent signal listeners.
#[cfg(unix)]
pub async fn wait_for_shutdown_signal() -> Result<&'static str, RuntimeError> {
    use tokio::signal::unix::{SignalKind, signal};

    let register = |kind| signal(kind).map_err(|source| RuntimeError::Signal { source });
    let mut sigint = register(SignalKind::interrupt())?;
    let mut sigterm = register(SignalKind::terminate())?;
    let mut sigquit = register(SignalKind::quit())?;

    let name = tokio::select! {
        _ = sigint.recv()  => "SIGINT",
        _ = sigterm.recv() => "SIGTERM",
        _ = sigquit.recv() => "SIGQUIT",
    };
    tracing::info!(signal = name, "shutdown signal received");
    Ok(name)
}

/// Waits for a termination signal and returns its name.
#[cfg(not(unix))]
pub async fn wait_for_shutdown_signal() -> Result<&'static str, RuntimeError> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|source| RuntimeError::Signal { source })?;
    tracing::info!(signal = "ctrl-c", "shutdown signal received");
    Ok("ctrl-c")
}
