//! Engine Module
//!
//! The collection store that owns every collection, its partitions and
//! their files on disk.
//!
//! ## Layers
//! - [`CollectionStore`]: the narrow interface the admin layer depends on
//! - [`Database`]: file-backed implementation of that interface
//! - [`Collection`]: one named collection and its partitions
//! - [`Partition`]: one append-only partition file plus its in-memory index

mod collection;
mod database;
mod partition;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::Result;

pub use collection::Collection;
pub use database::Database;
pub use partition::{DocRecord, LoadOutcome, Partition, MAX_RECORD_SIZE};

/// Metadata the store reports for a single collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionInfo {
    /// Number of partitions the collection is split into
    pub partitions: usize,
}

/// Outcome of an integrity scrub
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScrubReport {
    /// Documents that survived the scrub
    pub documents: usize,

    /// Records dropped because they failed verification
    pub corrupted: usize,
}

/// Structural operations a collection store must provide.
///
/// Every method is called with the store's global lock held, so
/// implementations need no internal synchronization. `&mut self` on the
/// mutating methods is what makes that checkable.
pub trait CollectionStore: Send {
    /// Create a collection. Fails if the name is taken or the count is invalid.
    fn create(&mut self, name: &str, partitions: i64) -> Result<()>;

    /// Snapshot of the collection directory.
    fn list_all(&self) -> BTreeMap<String, CollectionInfo>;

    /// Rename a collection. Fails if `old` is missing or `new` is taken.
    fn rename(&mut self, old: &str, new: &str) -> Result<()>;

    /// Drop a collection and delete its files.
    fn drop_collection(&mut self, name: &str) -> Result<()>;

    /// Resolve a name to its metadata.
    fn lookup(&self, name: &str) -> Option<CollectionInfo>;

    /// Verify every stored record of a collection and discard the bad ones.
    fn scrub(&mut self, name: &str) -> Result<ScrubReport>;

    /// Redistribute a collection's documents across a new number of partitions.
    fn repartition(&mut self, name: &str, partitions: i64) -> Result<()>;

    /// Push all buffered writes to durable storage.
    fn flush(&mut self) -> Result<()>;
}
