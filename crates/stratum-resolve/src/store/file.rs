use super::{BinaryStore, RecordIndex, StoreError, StoreHandle};
use parking_lot::Mutex;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

#[derive(Debug)]
struct Inner {
    file: File,
    index: RecordIndex,
}

/// A store backed by an anonymous temporary file.
///
/// The file is unlinked on creation and disappears with the store.
#[derive(Debug)]
pub struct FileBinaryStore {
    inner: Mutex<Inner>,
}

impl FileBinaryStore {
    /// Create a store in `dir`, or the system temporary directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the temporary file cannot be created.
    pub fn create(dir: Option<&Path>) -> Result<Self, StoreError> {
        let file = match dir {
            Some(dir) => tempfile::tempfile_in(dir)?,
            None => tempfile::tempfile()?,
        };
        Ok(Self {
            inner: Mutex::new(Inner {
                file,
                index: RecordIndex::default(),
            }),
        })
    }
}

impl BinaryStore for FileBinaryStore {
    fn write(&self, bytes: &[u8]) -> Result<StoreHandle, StoreError> {
        let mut inner = self.inner.lock();
        let end = inner.index.end;
        inner.file.seek(SeekFrom::Start(end))?;
        inner.file.write_all(bytes)?;
        Ok(inner.index.append(bytes.len() as u64))
    }

    fn read(&self, handle: StoreHandle) -> Result<Vec<u8>, StoreError> {
        let mut inner = self.inner.lock();
        inner.index.check(handle)?;
        let len = usize::try_from(handle.len()).map_err(|_| StoreError::UnknownHandle(handle))?;
        let mut buffer = vec![0; len];
        inner.file.seek(SeekFrom::Start(handle.offset()))?;
        inner.file.read_exact(&mut buffer)?;
        Ok(buffer)
    }

    fn handles(&self) -> Vec<StoreHandle> {
        self.inner.lock().index.handles.clone()
    }

    fn size(&self) -> u64 {
        self.inner.lock().index.end
    }
}
