//! Application lifecycle.
//!
//! Startup: connect the limit store, start the audit writer, build the
//! coordinator. Shutdown (Ctrl-C): stop accepting connections, let in-flight
//! requests finish, drop the last publisher and wait for the audit writer to
//! flush and close.

use std::sync::Arc;

use axum::Router;
use quota_audit::{spawn_audit_writer, AuditWriterHandle};
use quota_engine::QuotaCoordinator;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::config::AppConfig;
use crate::error::AppResult;
use crate::routes::{create_router, AppState};

/// Main application.
pub struct Application {
    config: AppConfig,
    coordinator: Arc<QuotaCoordinator>,
    audit: AuditWriterHandle,
}

impl Application {
    /// Build every component from configuration.
    pub async fn new(config: AppConfig) -> AppResult<Self> {
        let backend = quota_store::connect(&config.store).await?;
        let (publisher, audit) = spawn_audit_writer(&config.audit)?;
        let coordinator = QuotaCoordinator::from_config(
            backend,
            &config.store,
            &config.quota,
            Arc::new(publisher),
        )?;

        Ok(Self {
            config,
            coordinator: Arc::new(coordinator),
            audit,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn router(&self) -> Router {
        create_router(AppState::new(self.coordinator.clone()))
    }

    /// Serve until Ctrl-C, then drain the audit writer.
    pub async fn run(self) -> AppResult<()> {
        let addr = self.config.server.socket_addr()?;
        let listener = TcpListener::bind(addr).await?;
        info!(%addr, "Quota service listening");

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("HTTP listener stopped, draining audit writer");
        let Self {
            coordinator, audit, ..
        } = self;
        drop(coordinator);

        let written = audit.shutdown().await?;
        info!(written, "Shutdown complete");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
