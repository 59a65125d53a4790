//! Database
//!
//! File-backed collection store. Every subdirectory of the data directory is
//! a collection; the directory name is the collection name.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::Path;

use crate::config::Config;
use crate::error::{Result, StoreError};

use super::collection::{retired_dir, staging_dir, RETIRED_SUFFIX, STAGING_SUFFIX};
use super::{Collection, CollectionInfo, CollectionStore, ScrubReport};

/// The collection directory and its on-disk collections
///
/// ## Concurrency
/// `Database` does no locking of its own. It is meant to sit behind the
/// admin service's mutex, which hands out `&mut Database` to one caller
/// at a time.
pub struct Database {
    /// Database configuration
    config: Config,

    /// Collection directory: name → open collection
    collections: HashMap<String, Collection>,
}

impl Database {
    /// Open or create a database with the given config
    ///
    /// On startup:
    /// 1. Validate config and create the data directory
    /// 2. Settle directories left by an interrupted repartition
    /// 3. Open every collection directory found in it
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;
        fs::create_dir_all(&config.data_dir)?;
        Self::recover_repartitions(&config)?;

        let mut collections = HashMap::new();
        for entry in fs::read_dir(&config.data_dir)? {
            let entry = entry?;
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                tracing::warn!("Ignoring non UTF-8 directory {}", path.display());
                continue;
            };

            if name.starts_with('.') {
                tracing::warn!("Skipping hidden directory {}", path.display());
                continue;
            }

            let collection = Collection::open(&path, &name, config.sync_strategy)?;
            tracing::debug!(
                "Loaded collection {} ({} partitions, {} documents)",
                name,
                collection.partition_count(),
                collection.count()
            );
            collections.insert(name, collection);
        }

        tracing::info!(
            "Opened database at {} with {} collection(s)",
            config.data_dir.display(),
            collections.len()
        );

        Ok(Self {
            config,
            collections,
        })
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified data directory
    pub fn open_path(path: &Path) -> Result<Self> {
        let config = Config::builder().data_dir(path).build();
        Self::open(config)
    }

    /// Get a collection by name
    pub fn collection(&self, name: &str) -> Option<&Collection> {
        self.collections.get(name)
    }

    /// Get a collection by name for document writes
    pub fn collection_mut(&mut self, name: &str) -> Option<&mut Collection> {
        self.collections.get_mut(name)
    }

    /// Flush everything and close the database
    pub fn close(mut self) -> Result<()> {
        CollectionStore::flush(&mut self)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Bring every collection caught mid-repartition back to one directory
    ///
    /// - live directory opens: the retired and staged copies are redundant
    /// - live directory missing, or unreadable with a retired copy beside
    ///   it: the retired copy is moved back, or failing that a staged copy
    ///   that opens cleanly is promoted
    ///
    /// A staged copy that does not open is left in place rather than
    /// deleted, since it may be the only one.
    fn recover_repartitions(config: &Config) -> Result<()> {
        let data_dir = &config.data_dir;

        let mut names = BTreeSet::new();
        for entry in fs::read_dir(data_dir)? {
            let entry = entry?;
            if !entry.path().is_dir() {
                continue;
            }
            let file_name = entry.file_name();
            let Some(hidden) = file_name.to_str().and_then(|n| n.strip_prefix('.')) else {
                continue;
            };
            if let Some(name) = hidden
                .strip_suffix(RETIRED_SUFFIX)
                .or_else(|| hidden.strip_suffix(STAGING_SUFFIX))
            {
                names.insert(name.to_string());
            }
        }

        for name in names {
            let live = data_dir.join(&name);
            let retired = retired_dir(data_dir, &name);
            let staging = staging_dir(data_dir, &name);

            let live_opens = live.is_dir()
                && Collection::open(&live, &name, config.sync_strategy).is_ok();
            if live.exists() && !live_opens && retired.is_dir() {
                tracing::warn!("Discarding unreadable layout {}", live.display());
                fs::remove_dir_all(&live)?;
            }

            if !live.exists() {
                if retired.is_dir() {
                    tracing::warn!("Restoring collection {} from {}", name, retired.display());
                    fs::rename(&retired, &live)?;
                } else if Collection::open(&staging, &name, config.sync_strategy).is_ok() {
                    tracing::warn!("Promoting staged layout {}", staging.display());
                    fs::rename(&staging, &live)?;
                } else {
                    tracing::error!(
                        "Collection {} has only an unreadable staged copy at {}",
                        name,
                        staging.display()
                    );
                    continue;
                }
            }

            for leftover in [&retired, &staging] {
                if leftover.is_dir() {
                    tracing::warn!("Removing leftover directory {}", leftover.display());
                    fs::remove_dir_all(leftover)?;
                }
            }
        }
        Ok(())
    }

    /// Reopen a collection whose directory move or removal failed, logging
    /// if even that fails
    fn reinstate(&mut self, dir: &Path, name: &str) {
        match Collection::open(dir, name, self.config.sync_strategy) {
            Ok(collection) => {
                self.collections.insert(name.to_string(), collection);
            }
            Err(e) => {
                tracing::error!("Failed to reopen collection {}: {}", name, e);
            }
        }
    }

    /// Names become directory names, so anything that could escape the data
    /// directory or collide with staging directories is refused
    fn validate_name(name: &str) -> Result<()> {
        let invalid = name.is_empty()
            || name.starts_with('.')
            || name.contains(['/', '\\', '\0']);
        if invalid {
            return Err(StoreError::InvalidCollectionName(name.to_string()));
        }
        Ok(())
    }

    fn validate_partitions(&self, partitions: i64) -> Result<usize> {
        match usize::try_from(partitions) {
            Ok(n) if n >= 1 && n <= self.config.max_partitions => Ok(n),
            _ => Err(StoreError::InvalidPartitionCount(partitions)),
        }
    }
}

impl CollectionStore for Database {
    fn create(&mut self, name: &str, partitions: i64) -> Result<()> {
        Self::validate_name(name)?;
        if self.collections.contains_key(name) {
            return Err(StoreError::CollectionExists(name.to_string()));
        }
        let count = self.validate_partitions(partitions)?;

        let dir = self.config.data_dir.join(name);
        let collection = Collection::create(&dir, name, count, self.config.sync_strategy)?;
        self.collections.insert(name.to_string(), collection);
        Ok(())
    }

    fn list_all(&self) -> BTreeMap<String, CollectionInfo> {
        self.collections
            .iter()
            .map(|(name, collection)| {
                (
                    name.clone(),
                    CollectionInfo {
                        partitions: collection.partition_count(),
                    },
                )
            })
            .collect()
    }

    fn rename(&mut self, old: &str, new: &str) -> Result<()> {
        if !self.collections.contains_key(old) {
            return Err(StoreError::CollectionNotFound(old.to_string()));
        }
        Self::validate_name(new)?;
        if self.collections.contains_key(new) {
            return Err(StoreError::CollectionExists(new.to_string()));
        }

        let old_dir = self.config.data_dir.join(old);
        let new_dir = self.config.data_dir.join(new);
        if let Some(collection) = self.collections.get_mut(old) {
            collection.flush()?;
        }

        // Close the partition files before the directory moves
        self.collections.remove(old);
        if let Err(e) = fs::rename(&old_dir, &new_dir) {
            self.reinstate(&old_dir, old);
            return Err(e.into());
        }

        match Collection::open(&new_dir, new, self.config.sync_strategy) {
            Ok(collection) => {
                self.collections.insert(new.to_string(), collection);
                Ok(())
            }
            Err(e) => {
                if let Err(back) = fs::rename(&new_dir, &old_dir) {
                    tracing::error!("Failed to move {} back to {}: {}", new, old, back);
                    self.reinstate(&new_dir, new);
                } else {
                    self.reinstate(&old_dir, old);
                }
                Err(e)
            }
        }
    }

    fn drop_collection(&mut self, name: &str) -> Result<()> {
        let collection = self
            .collections
            .remove(name)
            .ok_or_else(|| StoreError::CollectionNotFound(name.to_string()))?;
        let dir = collection.dir().to_path_buf();
        drop(collection);

        if let Err(e) = fs::remove_dir_all(&dir) {
            if dir.exists() {
                self.reinstate(&dir, name);
            }
            return Err(e.into());
        }
        Ok(())
    }

    fn lookup(&self, name: &str) -> Option<CollectionInfo> {
        self.collections.get(name).map(|c| CollectionInfo {
            partitions: c.partition_count(),
        })
    }

    fn scrub(&mut self, name: &str) -> Result<ScrubReport> {
        self.collections
            .get_mut(name)
            .ok_or_else(|| StoreError::CollectionNotFound(name.to_string()))?
            .scrub()
    }

    fn repartition(&mut self, name: &str, partitions: i64) -> Result<()> {
        let count = self.validate_partitions(partitions)?;
        self.collections
            .get_mut(name)
            .ok_or_else(|| StoreError::CollectionNotFound(name.to_string()))?
            .repartition(count)
    }

    fn flush(&mut self) -> Result<()> {
        for collection in self.collections.values_mut() {
            collection.flush()?;
        }
        Ok(())
    }
}
