//! TCP shutdown monitor.
//!
//! Saturn's host environment signals "drain and stop" by opening a TCP
//! connection to a well-known port rather than sending a process signal.
//! Accepting that connection cancels the shared [`CancellationToken`] the
//! same way SIGINT/SIGTERM would.

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

pub struct Monitor {
    listener: TcpListener,
    port: u16,
}

impl Monitor {
    pub async fn bind(port: u16) -> std::io::Result<Self> {
        let listener = TcpListener::bind(("0.0.0.0", port)).await?;
        tracing::info!(port, "monitor listening for shutdown signal");
        Ok(Self { listener, port })
    }

    /// Waits for either an accepted connection (triggering `cancel`) or
    /// `cancel` firing for some other reason (a signal handler, say),
    /// whichever comes first.
    pub async fn watch(self, cancel: CancellationToken) {
        tokio::select! {
            accepted = self.listener.accept() => {
                match accepted {
                    Ok(_) => {
                        tracing::info!(port = self.port, "monitor accepted a connection, cancelling");
                        cancel.cancel();
                    }
                    Err(e) => tracing::warn!(error = %e, "monitor failed to accept a connection"),
                }
            }
            _ = cancel.cancelled() => {
                tracing::debug!("monitor stopping, already cancelled");
            }
        }
    }
}
