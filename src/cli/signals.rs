//! Signal handling for graceful shutdown
//!
//! Ctrl-C and SIGTERM cancel a shared [`CancellationToken`]. The login flow
//! hands a child of that token to the QR wait, so an interrupted scan ends
//! with `ChannelError::Cancelled` instead of a hung process.

use tokio::signal;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Cancels a token when the process is asked to stop
pub struct SignalHandler {
    cancel: CancellationToken,
}

impl SignalHandler {
    /// Create a handler that will cancel `cancel`
    pub fn new(cancel: CancellationToken) -> Self {
        Self { cancel }
    }

    /// Spawn the background task that waits for CTRL-C or SIGTERM
    ///
    /// The task also ends quietly once the token is cancelled elsewhere.
    pub fn setup(&self) -> JoinHandle<()> {
        let cancel = self.cancel.clone();

        tokio::spawn(async move {
            let ctrl_c = async {
                match signal::ctrl_c().await {
                    Ok(()) => info!("Ctrl+C signal received"),
                    Err(e) => {
                        warn!("Failed to install Ctrl+C handler: {}", e);
                        std::future::pending::<()>().await;
                    }
                }
            };

            #[cfg(unix)]
            let terminate = async {
                match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                    Ok(mut stream) => {
                        stream.recv().await;
                        info!("SIGTERM signal received");
                    }
                    Err(e) => {
                        warn!("Failed to install SIGTERM handler: {}", e);
                        std::future::pending::<()>().await;
                    }
                }
            };

            #[cfg(not(unix))]
            let terminate = std::future::pending::<()>();

            tokio::select! {
                _ = ctrl_c => {
                    info!("Received Ctrl+C, cancelling login");
                },
                _ = terminate => {
                    info!("Received terminate signal, cancelling login");
                },
                _ = cancel.cancelled() => return,
            }

            cancel.cancel();

            // Blocking prompts do not observe the token; a second interrupt exits.
            if signal::ctrl_c().await.is_ok() {
                warn!("Interrupted again, exiting");
                std::process::exit(130);
            }
        })
    }
}
