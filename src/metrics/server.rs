//! Metrics HTTP Server
//!
//! Provides HTTP endpoint for Prometheus metrics scraping

use crate::metrics::MetricsRegistry;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tracing::{debug, error, info};

/// HTTP server for serving Prometheus metrics
pub struct MetricsServer {
    registry: Arc<MetricsRegistry>,
    bind_addr: SocketAddr,
}

impl MetricsServer {
    /// Create a new metrics server
    pub fn new(registry: Arc<MetricsRegistry>, bind_addr: SocketAddr) -> Self {
        Self {
            registry,
            bind_addr,
        }
    }

    /// Bind the configured address and serve until shutdown is signalled
    pub async fn start(&self, shutdown_rx: broadcast::Receiver<()>) -> anyhow::Result<()> {
        let listener = TcpListener::bind(self.bind_addr).await?;
        self.serve(listener, shutdown_rx).await
    }

    /// Serve scrape requests on an already bound listener
    pub async fn serve(
        &self,
        listener: TcpListener,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> anyhow::Result<()> {
        info!(bind_addr = %listener.local_addr()?, "Metrics server started");

        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((mut stream, addr)) => {
                        debug!(client_addr = %addr, "Metrics request received");

                        let registry = self.registry.clone();
                        tokio::spawn(async move {
                            if let Err(e) = handle_request(&mut stream, registry).await {
                                error!(error = %e, client_addr = %addr, "Failed to handle metrics request");
                            }
                        });
                    }
                    Err(e) => {
                        error!(error = %e, "Failed to accept metrics connection");
                    }
                },
                _ = shutdown_rx.recv() => {
                    info!("Metrics server received shutdown signal");
                    return Ok(());
                }
            }
        }
    }
}

/// Handle a single HTTP request for metrics
async fn handle_request(
    stream: &mut TcpStream,
    registry: Arc<MetricsRegistry>,
) -> anyhow::Result<()> {
    let mut buffer = [0; 1024];
    let bytes_read = stream.read(&mut buffer).await?;

    if bytes_read == 0 {
        return Ok(());
    }

    let request = String::from_utf8_lossy(&buffer[..bytes_read]);
    debug!(request = %request, "Received HTTP request");

    let response = if request.starts_with("GET /metrics") {
        // Gathering reads the statistics source, which may touch the filesystem
        let metrics_data = tokio::task::spawn_blocking(move || registry.export_prometheus()).await?;

        format!(
            "HTTP/1.1 200 OK\r\n\
             Content-Type: text/plain; version=0.0.4; charset=utf-8\r\n\
             Content-Length: {}\r\n\
             \r\n\
             {}",
            metrics_data.len(),
            metrics_data
        )
    } else if request.starts_with("GET /health") {
        "HTTP/1.1 200 OK\r\n\
         Content-Type: text/plain\r\n\
         Content-Length: 2\r\n\
         \r\n\
         OK"
            .to_string()
    } else {
        "HTTP/1.1 404 Not Found\r\n\
         Content-Type: text/plain\r\n\
         Content-Length: 9\r\n\
         \r\n\
         Not Found"
            .to_string()
    };

    stream.write_all(response.as_bytes()).await?;
    debug!("Sent metrics server response");

    Ok(())
}
