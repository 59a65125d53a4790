//! Collection
//!
//! A named set of documents spread over a fixed number of partitions.
//! Document `id` lives in partition `id % partition_count`.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use bytes::Bytes;

use crate::config::SyncStrategy;
use crate::error::{Result, StoreError};

use super::partition::Partition;
use super::ScrubReport;

/// Filename prefix of partition files inside a collection directory
const PARTITION_PREFIX: &str = "part.";

/// Suffixes of the directories a repartition leaves next to the collection
pub(crate) const STAGING_SUFFIX: &str = ".repartition";
pub(crate) const RETIRED_SUFFIX: &str = ".retired";

/// A collection and its open partitions
pub struct Collection {
    /// Collection name (the directory key)
    name: String,

    /// Directory holding the partition files
    dir: PathBuf,

    /// Open partitions, index = partition number
    partitions: Vec<Partition>,

    /// Next id handed out by `insert`
    next_id: u64,

    sync_strategy: SyncStrategy,
}

impl Collection {
    /// Create a new collection directory with `partitions` empty partitions
    pub fn create(
        dir: &Path,
        name: &str,
        partitions: usize,
        sync_strategy: SyncStrategy,
    ) -> Result<Self> {
        fs::create_dir(dir)?;

        let opened = match (0..partitions)
            .map(|i| Partition::create(&partition_path(dir, i), sync_strategy))
            .collect::<Result<Vec<_>>>()
        {
            Ok(opened) => opened,
            Err(e) => {
                if let Err(cleanup) = fs::remove_dir_all(dir) {
                    tracing::warn!(
                        "Failed to remove partial collection {}: {}",
                        dir.display(),
                        cleanup
                    );
                }
                return Err(e);
            }
        };

        tracing::debug!("Created collection {} with {} partition(s)", name, partitions);

        Ok(Self {
            name: name.to_string(),
            dir: dir.to_path_buf(),
            partitions: opened,
            next_id: 0,
            sync_strategy,
        })
    }

    /// Open an existing collection directory
    ///
    /// Partition files must be numbered contiguously from zero.
    pub fn open(dir: &Path, name: &str, sync_strategy: SyncStrategy) -> Result<Self> {
        let count = Self::discover_partitions(dir)?;
        if count == 0 {
            return Err(StoreError::Storage(format!(
                "Collection {} has no partition files",
                name
            )));
        }

        let mut opened = Vec::with_capacity(count);
        for i in 0..count {
            let (partition, _corrupted) = Partition::open(&partition_path(dir, i), sync_strategy)?;
            opened.push(partition);
        }

        let next_id = next_id_after(&opened);

        Ok(Self {
            name: name.to_string(),
            dir: dir.to_path_buf(),
            partitions: opened,
            next_id,
            sync_strategy,
        })
    }

    // =========================================================================
    // Document Operations
    // =========================================================================

    /// Insert a new document, returning its id
    pub fn insert(&mut self, body: impl Into<Bytes>) -> Result<u64> {
        let id = self.next_id;
        let idx = self.partition_of(id);
        self.partitions[idx].put(id, body.into())?;
        self.next_id += 1;
        Ok(id)
    }

    /// Get a document by id
    pub fn get(&self, id: u64) -> Option<Bytes> {
        self.partitions[self.partition_of(id)].get(id)
    }

    /// Replace the body of an existing document
    pub fn update(&mut self, id: u64, body: impl Into<Bytes>) -> Result<()> {
        let idx = self.partition_of(id);
        if self.partitions[idx].get(id).is_none() {
            return Err(StoreError::DocumentNotFound(id));
        }
        self.partitions[idx].put(id, body.into())
    }

    /// Delete a document
    pub fn delete(&mut self, id: u64) -> Result<()> {
        let idx = self.partition_of(id);
        if self.partitions[idx].remove(id)? {
            Ok(())
        } else {
            Err(StoreError::DocumentNotFound(id))
        }
    }

    /// Number of live documents across all partitions
    pub fn count(&self) -> usize {
        self.partitions.iter().map(Partition::len).sum()
    }

    /// All live documents in id order
    pub fn documents(&self) -> BTreeMap<u64, Bytes> {
        self.partitions
            .iter()
            .flat_map(|p| p.docs().iter().map(|(id, body)| (*id, body.clone())))
            .collect()
    }

    // =========================================================================
    // Maintenance
    // =========================================================================

    /// Flush every partition to disk
    pub fn flush(&mut self) -> Result<()> {
        for partition in &mut self.partitions {
            partition.flush()?;
        }
        Ok(())
    }

    /// Re-read every partition from disk, drop records that fail
    /// verification and rewrite the survivors into compacted files
    ///
    /// The open partitions are replaced only once every file has been
    /// rewritten; a failure part way reloads the collection from disk.
    pub fn scrub(&mut self) -> Result<ScrubReport> {
        self.flush()?;

        let mut report = ScrubReport::default();
        let mut scrubbed = Vec::with_capacity(self.partitions.len());
        for i in 0..self.partitions.len() {
            let path = partition_path(&self.dir, i);
            let outcome = Partition::read_records(&path)?;
            report.corrupted += outcome.corrupted;
            report.documents += outcome.docs.len();
            scrubbed.push(outcome.docs);
        }

        let mut rewritten = Vec::with_capacity(scrubbed.len());
        for (i, docs) in scrubbed.into_iter().enumerate() {
            let path = partition_path(&self.dir, i);
            match Partition::write_compacted(&path, self.sync_strategy, docs) {
                Ok(partition) => rewritten.push(partition),
                Err(e) => {
                    self.reload();
                    return Err(e);
                }
            }
        }
        self.partitions = rewritten;
        self.next_id = self.next_id.max(next_id_after(&self.partitions));

        Ok(report)
    }

    /// Redistribute documents over `count` partitions
    ///
    /// New files are staged in `.<name>.repartition`, the live directory is
    /// moved to `.<name>.retired` and the staged one takes its place. Until
    /// the new layout has been opened the old partitions stay in use, and
    /// any failure moves the original directory back.
    pub fn repartition(&mut self, count: usize) -> Result<()> {
        if count == 0 {
            return Err(StoreError::InvalidPartitionCount(0));
        }
        self.flush()?;

        let parent = self.dir.parent().map(Path::to_path_buf).unwrap_or_default();
        let staging = staging_dir(&parent, &self.name);
        let retired = retired_dir(&parent, &self.name);
        for leftover in [&staging, &retired] {
            if leftover.is_dir() {
                fs::remove_dir_all(leftover)?;
            }
        }

        if let Err(e) = self.stage(&staging, count) {
            discard(&staging);
            return Err(e);
        }

        if let Err(e) = fs::rename(&self.dir, &retired) {
            discard(&staging);
            return Err(e.into());
        }
        if let Err(e) = fs::rename(&staging, &self.dir) {
            self.restore(&retired, None);
            discard(&staging);
            return Err(e.into());
        }

        let reopened = match Self::open(&self.dir, &self.name, self.sync_strategy) {
            Ok(reopened) => reopened,
            Err(e) => {
                self.restore(&retired, Some(&staging));
                discard(&staging);
                return Err(e);
            }
        };

        let next_id = self.next_id;
        *self = reopened;
        self.next_id = self.next_id.max(next_id);

        if let Err(e) = fs::remove_dir_all(&retired) {
            // The new layout is live; the next open discards this directory
            tracing::warn!("Failed to remove {}: {}", retired.display(), e);
        }

        tracing::debug!("Repartitioned collection {} into {} partition(s)", self.name, count);
        Ok(())
    }

    /// Write the live documents into `count` partitions under `staging`
    fn stage(&self, staging: &Path, count: usize) -> Result<()> {
        fs::create_dir(staging)?;

        let mut buckets: Vec<BTreeMap<u64, Bytes>> = vec![BTreeMap::new(); count];
        for (id, body) in self.documents() {
            buckets[(id % count as u64) as usize].insert(id, body);
        }
        for (i, docs) in buckets.into_iter().enumerate() {
            // Staged handles are dropped right away; the collection is
            // reopened from its final location
            Partition::write_compacted(&partition_path(staging, i), self.sync_strategy, docs)?;
        }
        Ok(())
    }

    /// Move the retired directory back to the live path, first parking
    /// whatever sits there under `displaced`
    fn restore(&self, retired: &Path, displaced: Option<&Path>) {
        if let Some(displaced) = displaced {
            if let Err(e) = fs::rename(&self.dir, displaced) {
                tracing::error!(
                    "Failed to move new layout of collection {} aside: {}",
                    self.name,
                    e
                );
                return;
            }
        }
        if let Err(e) = fs::rename(retired, &self.dir) {
            tracing::error!(
                "Failed to restore collection {} from {}: {}; recovered on next open",
                self.name,
                retired.display(),
                e
            );
        }
    }

    /// Reload partitions from disk after a failed rewrite, keeping the
    /// current handles if the directory cannot be read back
    fn reload(&mut self) {
        match Self::open(&self.dir, &self.name, self.sync_strategy) {
            Ok(reopened) => {
                let next_id = self.next_id;
                *self = reopened;
                self.next_id = self.next_id.max(next_id);
            }
            Err(e) => {
                tracing::error!("Failed to reload collection {}: {}", self.name, e);
            }
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn partition_count(&self) -> usize {
        self.partitions.len()
    }

    /// Access a single partition (for testing and debugging)
    pub fn partition(&self, index: usize) -> Option<&Partition> {
        self.partitions.get(index)
    }

    fn partition_of(&self, id: u64) -> usize {
        (id % self.partitions.len() as u64) as usize
    }

    /// Count `part.N` files, requiring them to be numbered 0..N
    fn discover_partitions(dir: &Path) -> Result<usize> {
        let mut indices = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            if !entry.path().is_file() {
                continue;
            }
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };
            if let Some(idx) = name
                .strip_prefix(PARTITION_PREFIX)
                .and_then(|n| n.parse::<usize>().ok())
            {
                indices.push(idx);
            }
        }

        indices.sort_unstable();
        for (expected, actual) in indices.iter().enumerate() {
            if expected != *actual {
                return Err(StoreError::Storage(format!(
                    "{}: missing partition file {}{}",
                    dir.display(),
                    PARTITION_PREFIX,
                    expected
                )));
            }
        }
        Ok(indices.len())
    }
}

/// One past the highest document id held by `partitions`
fn next_id_after(partitions: &[Partition]) -> u64 {
    partitions
        .iter()
        .filter_map(Partition::max_id)
        .max()
        .map(|id| id + 1)
        .unwrap_or(0)
}

/// Best-effort removal of a staging directory that will not be used
fn discard(staging: &Path) {
    if staging.is_dir() {
        if let Err(e) = fs::remove_dir_all(staging) {
            tracing::warn!("Failed to remove {}: {}", staging.display(), e);
        }
    }
}

/// Staging directory a repartition of `name` writes its new layout to
pub(crate) fn staging_dir(parent: &Path, name: &str) -> PathBuf {
    parent.join(format!(".{}{}", name, STAGING_SUFFIX))
}

/// Directory the live collection `name` is parked in during a repartition
pub(crate) fn retired_dir(parent: &Path, name: &str) -> PathBuf {
    parent.join(format!(".{}{}", name, RETIRED_SUFFIX))
}

/// Path of partition `index` inside `dir`
pub(crate) fn partition_path(dir: &Path, index: usize) -> PathBuf {
    dir.join(format!("{}{}", PARTITION_PREFIX, index))
}
