//! Route handlers
//!
//! Thin adapters: collect request parameters, run the service call on the
//! blocking pool, return its outcome.

use std::sync::Arc;

use axum::extract::State;
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::response::IntoResponse;

use crate::admin::{ControlError, ControlResult, ErrorKind, Reply};
use crate::engine::CollectionStore;
use crate::service::CollectionService;

use super::extract::AdminParams;

/// Shared handler state
pub(crate) struct AppState<S> {
    pub(crate) service: Arc<CollectionService<S>>,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
        }
    }
}

impl<S: CollectionStore + 'static> AppState<S> {
    /// Run a service call where blocking on the lock is allowed
    async fn run<F>(&self, op: F) -> ControlResult<Reply>
    where
        F: FnOnce(&CollectionService<S>) -> ControlResult<Reply> + Send + 'static,
    {
        let service = Arc::clone(&self.service);
        tokio::task::spawn_blocking(move || op(&service))
            .await
            .map_err(|e| ControlError::new(ErrorKind::Internal, format!("Admin task failed: {}", e)))?
    }
}

pub(crate) async fn create<S: CollectionStore + 'static>(
    State(state): State<AppState<S>>,
    AdminParams(request): AdminParams,
) -> ControlResult<Reply> {
    tracing::debug!("create {:?}", request);
    state.run(move |service| service.create(&request)).await
}

pub(crate) async fn all<S: CollectionStore + 'static>(
    State(state): State<AppState<S>>,
) -> ControlResult<Reply> {
    state.run(|service| service.list()).await
}

pub(crate) async fn rename<S: CollectionStore + 'static>(
    State(state): State<AppState<S>>,
    AdminParams(request): AdminParams,
) -> ControlResult<Reply> {
    tracing::debug!("rename {:?}", request);
    state.run(move |service| service.rename(&request)).await
}

pub(crate) async fn drop_collection<S: CollectionStore + 'static>(
    State(state): State<AppState<S>>,
    AdminParams(request): AdminParams,
) -> ControlResult<Reply> {
    tracing::debug!("drop {:?}", request);
    state.run(move |service| service.drop_collection(&request)).await
}

pub(crate) async fn scrub<S: CollectionStore + 'static>(
    State(state): State<AppState<S>>,
    AdminParams(request): AdminParams,
) -> ControlResult<Reply> {
    tracing::debug!("scrub {:?}", request);
    state.run(move |service| service.scrub(&request)).await
}

pub(crate) async fn repartition<S: CollectionStore + 'static>(
    State(state): State<AppState<S>>,
    AdminParams(request): AdminParams,
) -> ControlResult<Reply> {
    tracing::debug!("repartition {:?}", request);
    state.run(move |service| service.repartition(&request)).await
}

pub(crate) async fn flush<S: CollectionStore + 'static>(
    State(state): State<AppState<S>>,
) -> ControlResult<Reply> {
    state.run(|service| service.flush()).await
}

pub(crate) async fn version() -> impl IntoResponse {
    (
        [(CACHE_CONTROL, "must-revalidate"), (CONTENT_TYPE, "text/plain")],
        crate::VERSION,
    )
}
