use super::{BinaryStore, RecordIndex, StoreError, StoreHandle};
use parking_lot::RwLock;

#[derive(Debug, Default)]
struct Inner {
    data: Vec<u8>,
    index: RecordIndex,
}

/// A store backed by one growing buffer.
#[derive(Debug, Default)]
pub struct InMemoryBinaryStore {
    inner: RwLock<Inner>,
}

impl InMemoryBinaryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl BinaryStore for InMemoryBinaryStore {
    fn write(&self, bytes: &[u8]) -> Result<StoreHandle, StoreError> {
        let mut inner = self.inner.write();
        inner.data.extend_from_slice(bytes);
        Ok(inner.index.append(bytes.len() as u64))
    }

    fn read(&self, handle: StoreHandle) -> Result<Vec<u8>, StoreError> {
        let inner = self.inner.read();
        inner.index.check(handle)?;
        let start = usize::try_from(handle.offset()).map_err(|_| StoreError::UnknownHandle(handle))?;
        let end = usize::try_from(handle.offset() + handle.len())
            .map_err(|_| StoreError::UnknownHandle(handle))?;
        inner
            .data
            .get(start..end)
            .map(<[u8]>::to_vec)
            .ok_or(StoreError::UnknownHandle(handle))
    }

    fn handles(&self) -> Vec<StoreHandle> {
        self.inner.read().index.handles.clone()
    }

    fn size(&self) -> u64 {
        self.inner.read().index.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unknown_handles() {
        let store = InMemoryBinaryStore::new();
        let handle = store.write(b"hello").unwrap();
        store.write(b"world").unwrap();
        assert_eq!(store.read(handle).unwrap(), b"hello");

        let other = InMemoryBinaryStore::new();
        other.write(b"he").unwrap();
        let foreign = other.write(b"llo").unwrap();
        assert!(matches!(store.read(foreign), Err(StoreError::UnknownHandle(_))));
    }

    #[test]
    fn empty_records() {
        let store = InMemoryBinaryStore::new();
        let empty = store.write(b"").unwrap();
        assert!(empty.is_empty());
        assert_eq!(store.read(empty).unwrap(), Vec::<u8>::new());
    }
}
