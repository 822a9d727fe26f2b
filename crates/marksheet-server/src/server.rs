use std::sync::Arc;

use marksheet_store::Marksheet;
use tokio::net::TcpListener;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::router::build_router;

/// Marksheet HTTP gateway.
pub struct MarksheetServer {
    config: ServerConfig,
    service: Arc<Marksheet>,
}

impl MarksheetServer {
    pub fn new(config: ServerConfig, service: Arc<Marksheet>) -> Self {
        Self { config, service }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(self.service.clone())
    }

    /// Seed if configured, then serve until the listener fails.
    pub async fn serve(self) -> ServerResult<()> {
        if self.config.seed_on_start {
            let service = self.service.clone();
            let keys = tokio::task::spawn_blocking(move || service.seed())
                .await
                .map_err(|e| ServerError::Internal(e.to_string()))??;
            tracing::info!(count = keys.len(), "seeded default dataset");
        }

        let app = self.router();
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        tracing::info!("marksheet server listening on {}", self.config.bind_addr);
        axum::serve(listener, app)
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))
    }
}
