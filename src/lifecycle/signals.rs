//! OS signal handling.
//!
//! # Responsibilities
//! - Expose SIGHUP as a [`ReloadTrigger`] for the reload loop
//! - Wait for SIGTERM/SIGINT to end the host's event loop
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - SIGHUP triggers logging reload, not shutdown
//! - The reload loop is generic over its trigger so tests drive it with a channel

use std::future::Future;

use tokio::sync::mpsc;

/// Source of reload requests.
pub trait ReloadTrigger: Send + 'static {
    /// Wait for the next request. `None` means the source is gone, which
    /// the reload loop treats as cancellation.
    fn recv(&mut self) -> impl Future<Output = Option<()>> + Send;
}

impl ReloadTrigger for mpsc::Receiver<()> {
    async fn recv(&mut self) -> Option<()> {
        mpsc::Receiver::recv(self).await
    }
}

impl ReloadTrigger for mpsc::UnboundedReceiver<()> {
    async fn recv(&mut self) -> Option<()> {
        mpsc::UnboundedReceiver::recv(self).await
    }
}

/// SIGHUP registration.
#[cfg(unix)]
pub struct HangupSignal(tokio::signal::unix::Signal);

#[cfg(unix)]
impl HangupSignal {
    /// Register the handler. Must run inside a runtime.
    pub fn register() -> std::io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};
        Ok(Self(signal(SignalKind::hangup())?))
    }
}

#[cfg(unix)]
impl ReloadTrigger for HangupSignal {
    async fn recv(&mut self) -> Option<()> {
        self.0.recv().await
    }
}

/// Platforms without SIGHUP never request a reload.
#[cfg(not(unix))]
pub struct HangupSignal;

#[cfg(not(unix))]
impl HangupSignal {
    pub fn register() -> std::io::Result<Self> {
        Ok(Self)
    }
}

#[cfg(not(unix))]
impl ReloadTrigger for HangupSignal {
    async fn recv(&mut self) -> Option<()> {
        std::future::pending().await
    }
}

/// Wait for SIGTERM or SIGINT.
#[cfg(unix)]
pub async fn wait_for_termination() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    tokio::select! {
        _ = sigterm.recv() => tracing::info!("Received SIGTERM"),
        _ = sigint.recv() => tracing::info!("Received SIGINT"),
    }
    Ok(())
}

/// Wait for Ctrl+C.
#[cfg(not(unix))]
pub async fn wait_for_termination() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await?;
    tracing::info!("Received Ctrl+C");
    Ok(())
}
