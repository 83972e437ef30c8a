//! Graceful Shutdown Module
//!
//! Serves the router until a shutdown signal arrives, then gives in-flight
//! requests a bounded time to finish.

use std::future::Future;
use std::io;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info, warn};

/// Waits for SIGTERM or SIGINT.
///
/// A handler that cannot be installed is logged and never fires.
pub async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            info!("Received SIGTERM, initiating shutdown");
        }
    }
}

/// Serves `router` on `listener` until `signal` completes.
///
/// After the signal, open connections get `shutdown_timeout` to drain before
/// the server task is aborted.
///
/// # Errors
///
/// Returns the server's I/O error if it stops on its own.
pub async fn serve<S>(
    listener: TcpListener,
    router: Router,
    signal: S,
    shutdown_timeout: Duration,
) -> io::Result<()>
where
    S: Future<Output = ()> + Send + 'static,
{
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

    let mut server = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.wait_for(|stop| *stop).await;
            })
            .await
    });

    tokio::select! {
        result = &mut server => {
            return match result {
                Ok(Ok(())) => {
                    info!("Server stopped normally");
                    Ok(())
                }
                Ok(Err(e)) => {
                    error!(error = %e, "Server error");
                    Err(e)
                }
                Err(e) => Err(io::Error::other(e)),
            };
        }
        () = signal => {
            info!("Shutdown signal received");
        }
    }

    let _ = shutdown_tx.send(true);
    match tokio::time::timeout(shutdown_timeout, &mut server).await {
        Ok(Ok(result)) => {
            info!("Shutdown complete");
            result
        }
        Ok(Err(e)) => Err(io::Error::other(e)),
        Err(_) => {
            warn!("Shutdown timeout reached, aborting remaining connections");
            server.abort();
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::get;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn test_serve_stops_on_signal() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let router = Router::new().route("/ping", get(|| async { "pong" }));
        let (tx, rx) = oneshot::channel::<()>();

        let server = tokio::spawn(serve(
            listener,
            router,
            async move {
                let _ = rx.await;
            },
            Duration::from_secs(1),
        ));

        let body = reqwest::get(format!("http://{addr}/ping"))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert_eq!(body, "pong");

        tx.send(()).unwrap();
        let result = tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_ok());
    }
}
