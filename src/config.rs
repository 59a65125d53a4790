//! Configuration for colstore
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::error::{Result, StoreError};

/// Main configuration for a colstore instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for all collections
    /// Internal structure:
    ///   {data_dir}/
    ///     └── {collection}/
    ///           ├── part.0
    ///           └── part.{n-1}
    pub data_dir: PathBuf,

    /// Sync strategy: when partition writes reach the disk
    pub sync_strategy: SyncStrategy,

    /// Upper bound on partitions per collection
    pub max_partitions: usize,

    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// HTTP listen address
    pub listen_addr: String,
}

/// Partition sync strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStrategy {
    /// fsync after every document write (safest, slowest)
    EveryWrite,

    /// Buffer writes until the next explicit flush
    OnFlush,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./colstore_data"),
            sync_strategy: SyncStrategy::OnFlush,
            max_partitions: 1024,
            listen_addr: "127.0.0.1:8080".to_string(),
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check that the configuration is usable before opening a database
    pub fn validate(&self) -> Result<()> {
        if self.data_dir.as_os_str().is_empty() {
            return Err(StoreError::Config("data_dir must not be empty".to_string()));
        }
        if self.max_partitions == 0 {
            return Err(StoreError::Config(
                "max_partitions must be at least 1".to_string(),
            ));
        }
        if self.listen_addr.is_empty() {
            return Err(StoreError::Config("listen_addr must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (root for all collections)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the partition sync strategy
    pub fn sync_strategy(mut self, strategy: SyncStrategy) -> Self {
        self.config.sync_strategy = strategy;
        self
    }

    /// Set the maximum number of partitions a collection may have
    pub fn max_partitions(mut self, count: usize) -> Self {
        self.config.max_partitions = count;
        self
    }

    /// Set the HTTP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
