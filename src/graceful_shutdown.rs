//! Stop serving when the process is asked to

use tokio::signal;

/// Wait for Ctrl+C or, on Unix, SIGTERM
///
/// Open requests are finished by the server before it exits
pub async fn handler() {
    let interrupt = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!("Could not listen for Ctrl+C: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut terminate) => {
                terminate.recv().await;
            }
            Err(err) => {
                tracing::error!("Could not listen for SIGTERM: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = interrupt => tracing::info!("Interrupted, shutting down the calendar"),
        () = terminate => tracing::info!("Terminated, shutting down the calendar"),
    }
}
