//! Collection Service
//!
//! Handlers for the administrative operations, serialized by one mutex.
//!
//! ## Locking discipline
//! - The store lives *inside* the mutex, so it cannot be reached unlocked
//! - Every operation, including the read-only listing, takes the lock
//! - Parameters are validated before the lock; a bad request never waits
//! - The guard is dropped on every return path, including early errors
//!
//! Each handler is single-shot: validate, then lock and call the store, then
//! answer.

use parking_lot::Mutex;

use crate::admin::{
    parse_partition_count, AdminRequest, CollectionSummary, ControlResult, ControlError, Listing,
    Reply,
};
use crate::engine::CollectionStore;

/// Administrative front of a collection store
pub struct CollectionService<S> {
    /// The global mutation lock, guarding the store itself
    store: Mutex<S>,
}

impl<S: CollectionStore> CollectionService<S> {
    /// Wrap a store
    pub fn new(store: S) -> Self {
        Self {
            store: Mutex::new(store),
        }
    }

    /// Create a collection (`col`, `numparts`)
    pub fn create(&self, request: &AdminRequest) -> ControlResult<Reply> {
        let name = request.require("col")?;
        let num_parts = request.require("numparts")?;
        let partitions = parse_partition_count(num_parts)?;

        let mut store = self.store.lock();
        store.create(name, partitions)?;
        tracing::info!("Created collection {} with {} partition(s)", name, partitions);
        Ok(Reply::Created)
    }

    /// List all collections and their partition counts
    pub fn list(&self) -> ControlResult<Reply> {
        let store = self.store.lock();
        let listing: Listing = store
            .list_all()
            .into_iter()
            .map(|(name, info)| {
                (
                    name,
                    CollectionSummary {
                        partitions: info.partitions,
                    },
                )
            })
            .collect();
        Reply::listing(&listing)
    }

    /// Rename a collection (`old`, `new`)
    pub fn rename(&self, request: &AdminRequest) -> ControlResult<Reply> {
        let old = request.require("old")?;
        let new = request.require("new")?;

        let mut store = self.store.lock();
        store.rename(old, new)?;
        tracing::info!("Renamed collection {} to {}", old, new);
        Ok(Reply::Done)
    }

    /// Drop a collection (`col`)
    pub fn drop_collection(&self, request: &AdminRequest) -> ControlResult<Reply> {
        let name = request.require("col")?;

        let mut store = self.store.lock();
        store.drop_collection(name)?;
        tracing::info!("Dropped collection {}", name);
        Ok(Reply::Done)
    }

    /// Scrub a collection (`col`)
    ///
    /// Only the existence check is reported to the caller. The scrub result
    /// itself is logged.
    pub fn scrub(&self, request: &AdminRequest) -> ControlResult<Reply> {
        let name = request.require("col")?;

        let mut store = self.store.lock();
        if store.lookup(name).is_none() {
            return Err(ControlError::not_found(name));
        }
        match store.scrub(name) {
            Ok(report) => tracing::info!(
                "Scrubbed collection {}: {} document(s) kept, {} corrupt record(s) removed",
                name,
                report.documents,
                report.corrupted
            ),
            Err(e) => tracing::warn!("Scrub of collection {} failed: {}", name, e),
        }
        Ok(Reply::Done)
    }

    /// Repartition a collection (`col`, `numparts`)
    ///
    /// Only the existence check is reported to the caller. The repartition
    /// result itself is logged.
    pub fn repartition(&self, request: &AdminRequest) -> ControlResult<Reply> {
        let name = request.require("col")?;
        let num_parts = request.require("numparts")?;
        let partitions = parse_partition_count(num_parts)?;

        let mut store = self.store.lock();
        if store.lookup(name).is_none() {
            return Err(ControlError::not_found(name));
        }
        match store.repartition(name, partitions) {
            Ok(()) => tracing::info!(
                "Repartitioned collection {} into {} partition(s)",
                name,
                partitions
            ),
            Err(e) => tracing::warn!("Repartition of collection {} failed: {}", name, e),
        }
        Ok(Reply::Done)
    }

    /// Flush all buffered store state to disk
    pub fn flush(&self) -> ControlResult<Reply> {
        let mut store = self.store.lock();
        if let Err(e) = store.flush() {
            tracing::error!("Flush failed: {}", e);
        }
        Ok(Reply::Done)
    }

    /// Run `f` against the store with the lock held
    ///
    /// For document-level access that has no admin endpoint.
    pub fn with_store<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        let mut store = self.store.lock();
        f(&mut store)
    }

    /// Consume the service and return the store
    pub fn into_inner(self) -> S {
        self.store.into_inner()
    }
}
