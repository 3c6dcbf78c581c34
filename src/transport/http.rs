//! HTTP server for the gateway.

use crate::error::{GatewayError, GatewayResult};
use crate::transport::{AppState, create_router};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};

/// Grace period for in-flight requests after a shutdown signal.
///
/// Requests have no timeout of their own, so a slow target database could
/// otherwise hold shutdown open indefinitely.
const GRACEFUL_TIMEOUT: Duration = Duration::from_secs(30);

pub struct HttpTransport {
    state: AppState,
    /// Host to bind to
    host: String,
    /// Port to bind to
    port: u16,
    /// Prefix for API routes
    prefix: String,
}

impl HttpTransport {
    pub fn new(state: AppState, host: impl Into<String>, port: u16, prefix: impl Into<String>) -> Self {
        Self {
            state,
            host: host.into(),
            port,
            prefix: prefix.into(),
        }
    }

    /// Get the bind address.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Serve until SIGINT/SIGTERM, then drain for at most [`GRACEFUL_TIMEOUT`].
    pub async fn run(&self) -> GatewayResult<()> {
        let bind_addr = self.bind_addr();
        info!("Starting API gateway on {}", bind_addr);

        let app = create_router(self.state.clone(), &self.prefix);

        let listener = TcpListener::bind(&bind_addr).await.map_err(|e| {
            GatewayError::internal(format!("Failed to bind to {}: {}", bind_addr, e))
        })?;

        info!(prefix = %self.prefix, "API routes ready");

        let shutdown_notify = Arc::new(tokio::sync::Notify::new());
        let shutdown_notify_clone = shutdown_notify.clone();

        let shutdown_signal = async move {
            wait_for_signal().await;
            shutdown_notify_clone.notify_one();
        };

        let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal);

        // Race between: server completing normally vs forced timeout/second signal after shutdown
        tokio::select! {
            result = server => {
                match result {
                    Ok(()) => info!("HTTP server stopped"),
                    Err(e) => {
                        error!(error = %e, "HTTP server error");
                        return Err(GatewayError::internal(format!("HTTP server error: {}", e)));
                    }
                }
            }
            _ = async {
                shutdown_notify.notified().await;
                info!(
                    timeout_secs = GRACEFUL_TIMEOUT.as_secs(),
                    "Waiting for requests to finish (send signal again to force exit)..."
                );

                tokio::select! {
                    _ = tokio::time::sleep(GRACEFUL_TIMEOUT) => {
                        warn!("Graceful shutdown timeout, forcing exit");
                    }
                    _ = wait_for_signal() => {
                        warn!("Received second signal, forcing immediate exit");
                    }
                }
            } => {}
        }

        Ok(())
    }
}

/// Wait for a shutdown signal (SIGINT or SIGTERM).
async fn wait_for_signal() {
    let ctrl_c = signal::ctrl_c();

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MemoryCatalog;

    fn state() -> AppState {
        AppState::new(Arc::new(MemoryCatalog::new()), reqwest::Client::new())
    }

    #[test]
    fn test_http_transport_bind_addr() {
        let transport = HttpTransport::new(state(), "0.0.0.0", 3000, "/api");
        assert_eq!(transport.bind_addr(), "0.0.0.0:3000");
        assert_eq!(transport.prefix(), "/api");
    }

    #[tokio::test]
    async fn test_bind_failure_is_reported() {
        let occupied = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = occupied.local_addr().unwrap().port();
        let transport = HttpTransport::new(state(), "127.0.0.1", port, "/api");
        let err = transport.run().await.unwrap_err();
        assert!(err.to_string().contains("Internal error"));
    }
}
