//! Partition files
//!
//! Each partition is an append-only log of document records plus an
//! in-memory index of the live documents.
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ Header (6 bytes)                                        │
//! │   Magic: "CSPT" (4) | Version: u16 (2)                  │
//! ├─────────────────────────────────────────────────────────┤
//! │ Records (variable)                                      │
//! │   [CRC: u32][Len: u32][bincode(DocRecord)]              │
//! │   ... repeated, later records override earlier ones ... │
//! │   (DocRecord.body = None means tombstone)               │
//! └─────────────────────────────────────────────────────────┘
//! ```

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::config::SyncStrategy;
use crate::error::{Result, StoreError};

/// Magic bytes identifying a colstore partition file
pub(crate) const MAGIC: &[u8; 4] = b"CSPT";

/// Current partition format version
pub(crate) const VERSION: u16 = 1;

/// Header size: Magic (4) + Version (2)
pub(crate) const HEADER_SIZE: usize = 6;

/// Record prefix size: CRC (4) + Len (4)
pub(crate) const RECORD_PREFIX_SIZE: usize = 8;

/// Largest record payload accepted on write and on read (64 MB)
pub const MAX_RECORD_SIZE: u32 = 64 * 1024 * 1024;

/// A single record in a partition file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocRecord {
    /// Document id
    pub id: u64,

    /// Document body, `None` for a deletion
    pub body: Option<Vec<u8>>,
}

/// Result of reading a partition file from disk
#[derive(Debug, Default)]
pub struct LoadOutcome {
    /// Live documents after replaying every valid record
    pub docs: BTreeMap<u64, Bytes>,

    /// Records skipped because they failed verification
    pub corrupted: usize,
}

/// One partition of a collection
pub struct Partition {
    /// Path of the partition file
    path: PathBuf,

    /// Append handle for new records
    writer: BufWriter<File>,

    /// Live documents, id → body
    docs: BTreeMap<u64, Bytes>,

    /// When appended records are synced
    sync_strategy: SyncStrategy,
}

impl Partition {
    /// Create an empty partition file, replacing any existing one
    pub fn create(path: &Path, sync_strategy: SyncStrategy) -> Result<Self> {
        Self::write_compacted(path, sync_strategy, BTreeMap::new())
    }

    /// Open an existing partition file and load its documents
    ///
    /// Corrupt records are skipped; the count is returned alongside.
    pub fn open(path: &Path, sync_strategy: SyncStrategy) -> Result<(Self, usize)> {
        let outcome = Self::read_records(path)?;
        if outcome.corrupted > 0 {
            tracing::warn!(
                "Skipped {} corrupt record(s) while loading {}",
                outcome.corrupted,
                path.display()
            );
        }

        let file = OpenOptions::new().append(true).open(path)?;
        let partition = Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
            docs: outcome.docs,
            sync_strategy,
        };
        Ok((partition, outcome.corrupted))
    }

    /// Write `docs` into a fresh file at `path` and open it for appends
    ///
    /// The file is written under a temporary name and renamed into place,
    /// so a crash leaves either the old file or the new one.
    pub fn write_compacted(
        path: &Path,
        sync_strategy: SyncStrategy,
        docs: BTreeMap<u64, Bytes>,
    ) -> Result<Self> {
        let tmp_path = Self::tmp_path(path);
        {
            let file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&tmp_path)?;
            let mut writer = BufWriter::new(file);

            writer.write_all(MAGIC)?;
            writer.write_all(&VERSION.to_le_bytes())?;

            for (id, body) in &docs {
                let record = DocRecord {
                    id: *id,
                    body: Some(body.to_vec()),
                };
                write_record(&mut writer, &record)?;
            }

            writer.flush()?;
            writer.get_ref().sync_all()?;
        }
        fs::rename(&tmp_path, path)?;

        let file = OpenOptions::new().append(true).open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
            docs,
            sync_strategy,
        })
    }

    /// Read and verify every record in a partition file
    ///
    /// A bad checksum or undecodable payload skips that record. A truncated
    /// tail or an impossible length ends the scan, since record boundaries
    /// can no longer be trusted.
    pub fn read_records(path: &Path) -> Result<LoadOutcome> {
        let mut reader = BufReader::new(File::open(path)?);

        let mut header = [0u8; HEADER_SIZE];
        reader.read_exact(&mut header).map_err(|e| {
            if e.kind() == ErrorKind::UnexpectedEof {
                StoreError::PartitionCorruption(format!(
                    "{}: file shorter than header",
                    path.display()
                ))
            } else {
                StoreError::Io(e)
            }
        })?;

        if &header[0..4] != MAGIC {
            return Err(StoreError::PartitionCorruption(format!(
                "{}: invalid magic {:?}",
                path.display(),
                &header[0..4]
            )));
        }
        let version = u16::from_le_bytes([header[4], header[5]]);
        if version != VERSION {
            return Err(StoreError::PartitionCorruption(format!(
                "{}: unsupported version {}",
                path.display(),
                version
            )));
        }

        let mut outcome = LoadOutcome::default();
        loop {
            let mut prefix = [0u8; RECORD_PREFIX_SIZE];
            match read_full(&mut reader, &mut prefix)? {
                0 => break,
                n if n < RECORD_PREFIX_SIZE => {
                    outcome.corrupted += 1;
                    break;
                }
                _ => {}
            }

            let crc = u32::from_le_bytes([prefix[0], prefix[1], prefix[2], prefix[3]]);
            let len = u32::from_le_bytes([prefix[4], prefix[5], prefix[6], prefix[7]]);
            if len > MAX_RECORD_SIZE {
                outcome.corrupted += 1;
                break;
            }

            let mut payload = vec![0u8; len as usize];
            if read_full(&mut reader, &mut payload)? < payload.len() {
                outcome.corrupted += 1;
                break;
            }

            if crc32fast::hash(&payload) != crc {
                outcome.corrupted += 1;
                continue;
            }

            match bincode::deserialize::<DocRecord>(&payload) {
                Ok(DocRecord { id, body: Some(body) }) => {
                    outcome.docs.insert(id, Bytes::from(body));
                }
                Ok(DocRecord { id, body: None }) => {
                    outcome.docs.remove(&id);
                }
                Err(_) => outcome.corrupted += 1,
            }
        }

        Ok(outcome)
    }

    /// Insert or overwrite a document
    pub fn put(&mut self, id: u64, body: Bytes) -> Result<()> {
        self.append(&DocRecord {
            id,
            body: Some(body.to_vec()),
        })?;
        self.docs.insert(id, body);
        Ok(())
    }

    /// Delete a document, returning whether it existed
    pub fn remove(&mut self, id: u64) -> Result<bool> {
        if !self.docs.contains_key(&id) {
            return Ok(false);
        }
        self.append(&DocRecord { id, body: None })?;
        self.docs.remove(&id);
        Ok(true)
    }

    /// Get a document body by id
    pub fn get(&self, id: u64) -> Option<Bytes> {
        self.docs.get(&id).cloned()
    }

    /// Live documents in id order
    pub fn docs(&self) -> &BTreeMap<u64, Bytes> {
        &self.docs
    }

    /// Number of live documents
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Highest document id stored here
    pub fn max_id(&self) -> Option<u64> {
        self.docs.keys().next_back().copied()
    }

    /// Path of the partition file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush buffered records and sync them to disk
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        self.writer.get_ref().sync_data()?;
        Ok(())
    }

    fn append(&mut self, record: &DocRecord) -> Result<()> {
        write_record(&mut self.writer, record)?;
        if self.sync_strategy == SyncStrategy::EveryWrite {
            self.flush()?;
        }
        Ok(())
    }

    fn tmp_path(path: &Path) -> PathBuf {
        let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        name.push(".tmp");
        path.with_file_name(name)
    }
}

/// Encode one record as `[crc][len][payload]`
///
/// Payloads the read path would refuse are rejected before any byte is
/// written.
fn write_record<W: Write>(writer: &mut W, record: &DocRecord) -> Result<()> {
    let payload = bincode::serialize(record)?;
    let len = u32::try_from(payload.len())
        .ok()
        .filter(|len| *len <= MAX_RECORD_SIZE)
        .ok_or(StoreError::RecordTooLarge {
            size: payload.len(),
            max: MAX_RECORD_SIZE,
        })?;
    let crc = crc32fast::hash(&payload);

    writer.write_all(&crc.to_le_bytes())?;
    writer.write_all(&len.to_le_bytes())?;
    writer.write_all(&payload)?;
    Ok(())
}

/// Fill `buf` as far as the reader allows, returning bytes read
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}
