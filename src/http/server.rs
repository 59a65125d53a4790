//! HTTP Server
//!
//! Binds the admin router and serves it until shutdown.

use std::future::Future;
use std::sync::Arc;

use axum::routing::{get, on, MethodFilter};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::engine::CollectionStore;
use crate::error::{Result, StoreError};
use crate::service::CollectionService;

use super::handlers::{self, AppState};

/// Admin endpoints answer GET, POST and PUT alike
const ADMIN_METHODS: MethodFilter = MethodFilter::GET
    .or(MethodFilter::POST)
    .or(MethodFilter::PUT);

/// Build the admin router for a service
pub fn router<S: CollectionStore + 'static>(service: Arc<CollectionService<S>>) -> Router {
    Router::new()
        .route("/create", on(ADMIN_METHODS, handlers::create::<S>))
        .route("/all", on(ADMIN_METHODS, handlers::all::<S>))
        .route("/rename", on(ADMIN_METHODS, handlers::rename::<S>))
        .route("/drop", on(ADMIN_METHODS, handlers::drop_collection::<S>))
        .route("/scrub", on(ADMIN_METHODS, handlers::scrub::<S>))
        .route("/repartition", on(ADMIN_METHODS, handlers::repartition::<S>))
        .route("/flush", on(ADMIN_METHODS, handlers::flush::<S>))
        .route("/version", get(handlers::version))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { service })
}

/// HTTP server for the admin service
pub struct Server<S> {
    config: Config,
    service: Arc<CollectionService<S>>,
}

impl<S: CollectionStore + 'static> Server<S> {
    /// Create a new server with the given config and service
    pub fn new(config: Config, service: Arc<CollectionService<S>>) -> Self {
        Self { config, service }
    }

    /// Bind `listen_addr` and serve until `shutdown` resolves
    pub async fn run<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(&self.config.listen_addr)
            .await
            .map_err(|e| {
                StoreError::Network(format!(
                    "Failed to bind {}: {}",
                    self.config.listen_addr, e
                ))
            })?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener until `shutdown` resolves
    ///
    /// In-flight requests finish first, then the store is flushed.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        tracing::info!("Listening on {}", listener.local_addr()?);

        axum::serve(listener, router(Arc::clone(&self.service)))
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;

        tracing::info!("Server stopped accepting requests, flushing");
        let service = Arc::clone(&self.service);
        tokio::task::spawn_blocking(move || service.flush())
            .await
            .map_err(|e| StoreError::Network(format!("Final flush task failed: {}", e)))?
            .map_err(|e| StoreError::Storage(e.message))?;
        Ok(())
    }

    pub fn service(&self) -> &Arc<CollectionService<S>> {
        &self.service
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}
