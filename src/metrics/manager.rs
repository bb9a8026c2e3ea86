//! Metrics Manager
//!
//! Coordinates the scrape server lifecycle

use super::{MetricsRegistry, MetricsServer};
use crate::config::ServerConfig;
use crate::shutdown::ShutdownCoordinator;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Metrics management system
pub struct MetricsManager {
    registry: Arc<MetricsRegistry>,
    server_handle: Option<JoinHandle<()>>,
    config: ServerConfig,
}

impl MetricsManager {
    pub fn new(registry: Arc<MetricsRegistry>, config: ServerConfig) -> Self {
        Self {
            registry,
            server_handle: None,
            config,
        }
    }

    /// Start the scrape server; it stops on the coordinator's shutdown signal
    pub fn start(&mut self, shutdown: &ShutdownCoordinator) {
        let server = MetricsServer::new(self.registry.clone(), self.config.bind_addr);
        let shutdown_rx = shutdown.subscribe();

        let handle = tokio::spawn(async move {
            if let Err(e) = server.start(shutdown_rx).await {
                error!(error = %e, "Metrics server failed");
            }
        });

        self.server_handle = Some(handle);
        info!(addr = %self.config.bind_addr, "Prometheus metrics server starting");
    }

    /// Wait for the server to wind down, aborting it once the timeout passes
    pub async fn stop(&mut self, shutdown: &ShutdownCoordinator) {
        info!("Stopping metrics system");

        if let Some(handle) = self.server_handle.take() {
            shutdown.wait_for_task(handle).await;
            info!("Metrics server stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.server_handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for MetricsManager {
    fn drop(&mut self) {
        if let Some(handle) = self.server_handle.take() {
            handle.abort();
        }
    }
}
