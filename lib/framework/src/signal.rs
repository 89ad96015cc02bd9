use std::future;

use tokio::signal;
use tracing::error;
use tracing::info;

/// Resolves on Ctrl+C, or SIGTERM on unix. A handler that cannot be installed never fires.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("received ctrl+c"),
            Err(err) => {
                error!("failed to install ctrl+c handler, error={err:?}");
                future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut terminate) => {
                terminate.recv().await;
                info!("received sigterm");
            }
            Err(err) => {
                error!("failed to install sigterm handler, error={err:?}");
                future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
