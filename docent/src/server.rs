//! Server lifecycle management
//!
//! Binds the HTTP listener, serves until SIGINT/SIGTERM, then tears down every
//! signaling connection so each upstream link is closed cleanly.

use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info};

use docent_api::{create_router, AppState, SignalingHub};
use docent_core::{bootstrap::Services, Config};

pub struct DocentServer {
    config: Config,
    services: Services,
    hub: Arc<SignalingHub>,
}

impl DocentServer {
    pub const fn new(config: Config, services: Services, hub: Arc<SignalingHub>) -> Self {
        Self {
            config,
            services,
            hub,
        }
    }

    /// Serve HTTP and wait for a shutdown signal
    pub async fn start(self) -> anyhow::Result<()> {
        let http_address = self.config.http_address();
        let http_addr: std::net::SocketAddr = http_address
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid HTTP address '{http_address}': {e}"))?;
        let listener = tokio::net::TcpListener::bind(http_addr)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind HTTP address {http_addr}: {e}"))?;

        let router = create_router(AppState {
            hub: Arc::clone(&self.hub),
            validator: Arc::clone(&self.services.jwt_validator),
            ws_max_message_size: self.config.server.ws_max_message_size,
        });

        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let mut http_handle = tokio::spawn(async move {
            info!("HTTP server listening on {}", http_addr);

            let graceful = async move {
                let _ = shutdown_rx.changed().await;
            };
            if let Err(e) = axum::serve(listener, router)
                .with_graceful_shutdown(graceful)
                .await
            {
                error!("HTTP server error: {}", e);
            }

            info!("HTTP server shut down gracefully");
        });

        let server_running = tokio::select! {
            _ = &mut http_handle => {
                error!("HTTP server stopped unexpectedly");
                false
            }
            () = shutdown_signal() => {
                info!("Shutdown signal received, starting graceful shutdown...");
                true
            }
        };

        self.shutdown().await;
        let _ = shutdown_tx.send(true);
        if server_running {
            if let Err(e) = http_handle.await {
                error!("HTTP server task failed: {}", e);
            }
        }
        Ok(())
    }

    async fn shutdown(&self) {
        info!("Shutting down Docent...");

        // Open sockets would keep graceful shutdown waiting; close them first
        let active = self.hub.registry().len();
        if active > 0 {
            info!("Closing {} signaling connection(s)...", active);
        }
        self.hub.disconnect_all().await;

        info!("Signaling connections closed");
    }
}

/// Wait for a shutdown signal (SIGTERM or SIGINT/Ctrl+C)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { info!("Received Ctrl+C"); }
        () = terminate => { info!("Received SIGTERM"); }
    }
}
