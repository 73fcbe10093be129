//! Append-only binary record stores.
//!
//! Phase one streams graph and flat-result records into stores instead of
//! keeping them in memory; phase two reads them back through the handles
//! and the index built while writing. Records are `serde` values encoded
//! as JSON; the encoded bytes are what a store round-trips.

mod file;
mod memory;

pub use file::FileBinaryStore;
pub use memory::InMemoryBinaryStore;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use std::marker::PhantomData;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Errors that can occur when reading or writing a store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store IO error: {0}")]
    Io(#[from] io::Error),

    #[error("failed to encode or decode record: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("no record at {0}")]
    UnknownHandle(StoreHandle),

    #[error("store holds no record for {0}")]
    MissingRecord(String),
}

/// Location of one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StoreHandle {
    offset: u64,
    len: u64,
}

impl StoreHandle {
    #[must_use]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    #[must_use]
    pub fn len(&self) -> u64 {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl fmt::Display for StoreHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "offset {} (+{})", self.offset, self.len)
    }
}

/// Write-once, read-back byte records.
///
/// Writes come from a single writer. Reads are random access through the
/// handles returned by [`BinaryStore::write`].
pub trait BinaryStore: Send + Sync + fmt::Debug {
    /// # Errors
    ///
    /// Returns an error if the record cannot be stored.
    fn write(&self, bytes: &[u8]) -> Result<StoreHandle, StoreError>;

    /// # Errors
    ///
    /// Returns an error if the handle does not name a record or it cannot be read.
    fn read(&self, handle: StoreHandle) -> Result<Vec<u8>, StoreError>;

    /// Handles of every record, in write order.
    fn handles(&self) -> Vec<StoreHandle>;

    /// Total bytes written.
    fn size(&self) -> u64;

    /// Visit every record in write order.
    ///
    /// # Errors
    ///
    /// Returns the first read or visitor error.
    fn for_each(
        &self,
        visit: &mut dyn FnMut(StoreHandle, Vec<u8>) -> Result<(), StoreError>,
    ) -> Result<(), StoreError> {
        for handle in self.handles() {
            visit(handle, self.read(handle)?)?;
        }
        Ok(())
    }
}

/// Index of record handles shared by the store implementations.
#[derive(Debug, Default)]
struct RecordIndex {
    handles: Vec<StoreHandle>,
    end: u64,
}

impl RecordIndex {
    fn append(&mut self, len: u64) -> StoreHandle {
        let handle = StoreHandle {
            offset: self.end,
            len,
        };
        self.end += len;
        self.handles.push(handle);
        handle
    }

    fn check(&self, handle: StoreHandle) -> Result<(), StoreError> {
        self.handles
            .binary_search(&handle)
            .map(|_| ())
            .map_err(|_| StoreError::UnknownHandle(handle))
    }
}

/// A store of typed records.
#[derive(Debug)]
pub struct RecordStore<T> {
    store: Arc<dyn BinaryStore>,
    marker: PhantomData<fn() -> T>,
}

impl<T> Clone for RecordStore<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            marker: PhantomData,
        }
    }
}

impl<T: Serialize + DeserializeOwned> RecordStore<T> {
    #[must_use]
    pub fn new(store: Arc<dyn BinaryStore>) -> Self {
        Self {
            store,
            marker: PhantomData,
        }
    }

    /// # Errors
    ///
    /// Returns an error if the record cannot be encoded or written.
    pub fn append(&self, record: &T) -> Result<StoreHandle, StoreError> {
        let bytes = serde_json::to_vec(record)?;
        self.store.write(&bytes)
    }

    /// # Errors
    ///
    /// Returns an error if the record cannot be read or decoded.
    pub fn get(&self, handle: StoreHandle) -> Result<T, StoreError> {
        Ok(serde_json::from_slice(&self.store.read(handle)?)?)
    }

    /// Decode every record in write order.
    ///
    /// # Errors
    ///
    /// Returns the first read, decode or visitor error.
    pub fn replay(&self, mut visit: impl FnMut(T) -> Result<(), StoreError>) -> Result<(), StoreError> {
        self.store
            .for_each(&mut |_, bytes| visit(serde_json::from_slice(&bytes)?))
    }

    #[must_use]
    pub fn binary_store(&self) -> &Arc<dyn BinaryStore> {
        &self.store
    }
}

/// Where stores keep their bytes.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum StoreKind {
    #[default]
    Memory,
    /// Anonymous temporary files, deleted when the store is dropped.
    TempFile {
        #[serde(default)]
        dir: Option<PathBuf>,
    },
}

/// Creates the stores of resolve requests.
#[derive(Debug, Clone, Default)]
pub struct StoreFactory {
    kind: StoreKind,
}

impl StoreFactory {
    #[must_use]
    pub fn new(kind: StoreKind) -> Self {
        Self { kind }
    }

    #[must_use]
    pub fn kind(&self) -> &StoreKind {
        &self.kind
    }

    /// A fresh set of stores for one request.
    #[must_use]
    pub fn store_set(&self) -> StoreSet {
        StoreSet {
            kind: self.kind.clone(),
            opened: 0,
        }
    }
}

/// The stores opened for one request.
#[derive(Debug)]
pub struct StoreSet {
    kind: StoreKind,
    opened: usize,
}

impl StoreSet {
    /// Open the next store of this set.
    ///
    /// # Errors
    ///
    /// Returns an error if a backing file cannot be created.
    pub fn next_binary_store(&mut self) -> Result<Arc<dyn BinaryStore>, StoreError> {
        self.opened += 1;
        debug!(kind = ?self.kind, index = self.opened, "opening binary store");
        Ok(match &self.kind {
            StoreKind::Memory => Arc::new(InMemoryBinaryStore::new()),
            StoreKind::TempFile { dir } => Arc::new(FileBinaryStore::create(dir.as_deref())?),
        })
    }

    #[must_use]
    pub fn opened(&self) -> usize {
        self.opened
    }
}
