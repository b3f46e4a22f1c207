//! HTTP server for the trigger API.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;

use super::handlers::AppState;
use super::router::create_router;
use crate::config::WebConfig;
use crate::{Result, ScrapperError, SqliteIngestor};

/// Web server for the trigger API.
pub struct WebServer {
    addr: SocketAddr,
    app_state: Arc<AppState>,
}

impl WebServer {
    /// Create a new web server.
    pub fn new(config: &WebConfig, ingestor: Arc<SqliteIngestor>) -> Result<Self> {
        let addr = format!("{}:{}", config.host, config.port)
            .parse()
            .map_err(|e| ScrapperError::Config(format!("invalid web address: {e}")))?;

        Ok(Self {
            addr,
            app_state: Arc::new(AppState::new(ingestor)),
        })
    }

    /// Get the server address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Serve until `shutdown` completes, then finish in-flight requests.
    pub async fn run_until(self, shutdown: impl Future<Output = ()> + Send + 'static) -> Result<()> {
        let router = create_router(self.app_state);
        let listener = TcpListener::bind(self.addr).await?;
        tracing::info!("Trigger API listening on {}", self.addr);

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("Trigger API stopped");
        Ok(())
    }
}
