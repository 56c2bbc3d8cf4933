// Signal handling module
//
// Used by the host binary to know when to stop the status server.
// - SIGTERM: Graceful shutdown
// - SIGINT:  Graceful shutdown (Ctrl+C)
// - SIGHUP:  Logged and ignored (nothing to reload)

use crate::logger;

/// Which signal ended the wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    Terminate,
    Interrupt,
}

impl ShutdownSignal {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Terminate => "SIGTERM",
            Self::Interrupt => "SIGINT",
        }
    }
}

/// Wait until the process is asked to shut down (Unix)
#[cfg(unix)]
pub async fn wait_for_shutdown() -> std::io::Result<ShutdownSignal> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sighup = signal(SignalKind::hangup())?;

    logger::log_info(&format!(
        "[SIGNAL] Waiting for SIGTERM/SIGINT, process ID: {}",
        std::process::id()
    ));

    loop {
        tokio::select! {
            _ = sigterm.recv() => return Ok(ShutdownSignal::Terminate),
            _ = sigint.recv() => return Ok(ShutdownSignal::Interrupt),
            _ = sighup.recv() => {
                logger::log_info("[SIGNAL] SIGHUP received, status server has nothing to reload");
            }
        }
    }
}

/// Windows fallback - only handles Ctrl+C
#[cfg(not(unix))]
pub async fn wait_for_shutdown() -> std::io::Result<ShutdownSignal> {
    logger::log_info("[SIGNAL] Waiting for Ctrl+C");
    tokio::signal::ctrl_c().await?;
    Ok(ShutdownSignal::Interrupt)
}
