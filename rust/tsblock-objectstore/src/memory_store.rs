//! In-memory object store, primarily for tests and embedded use.

use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock},
};

use bytes::Bytes;
use tsblock_io::{ReadAt, SealingWrite, StorageProfile};

use crate::{ObjectKey, ObjectStore};

/// An `ObjectStore` keeping sealed objects as shared immutable buffers.
///
/// Objects become visible to `open` only after their writer is sealed.
#[derive(Default, Clone)]
pub struct MemoryObjectStore {
    objects: Arc<RwLock<HashMap<ObjectKey, Bytes>>>,
}

impl MemoryObjectStore {
    pub fn new() -> MemoryObjectStore {
        Default::default()
    }

    /// Stores a complete object in one call, replacing any previous content.
    pub fn put(&self, key: ObjectKey, data: impl Into<Bytes>) {
        self.objects
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, data.into());
    }

    /// Returns the sealed content of an object, if present.
    pub fn get(&self, key: &ObjectKey) -> Option<Bytes> {
        self.objects
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.objects
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ObjectStore for MemoryObjectStore {
    fn open(&self, key: &ObjectKey) -> std::io::Result<Arc<dyn ReadAt>> {
        let data = self.get(key).ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("object '{key}' not found"),
            )
        })?;
        Ok(Arc::new(data))
    }

    fn create(&self, key: &ObjectKey) -> std::io::Result<Box<dyn SealingWrite>> {
        if self.get(key).is_some() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                format!("object '{key}' already exists"),
            ));
        }
        Ok(Box::new(MemoryObjectWriter {
            store: self.clone(),
            key: key.clone(),
            buf: Some(Vec::new()),
        }))
    }
}

struct MemoryObjectWriter {
    store: MemoryObjectStore,
    key: ObjectKey,
    buf: Option<Vec<u8>>,
}

impl SealingWrite for MemoryObjectWriter {
    fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()> {
        self.buf
            .as_mut()
            .ok_or_else(|| std::io::Error::other("write to a sealed object"))?
            .extend_from_slice(buf);
        Ok(())
    }

    fn seal(&mut self) -> std::io::Result<()> {
        let buf = self
            .buf
            .take()
            .ok_or_else(|| std::io::Error::other("object already sealed"))?;
        self.store.put(self.key.clone(), buf);
        Ok(())
    }

    fn storage_profile(&self) -> StorageProfile {
        StorageProfile {
            min_io_size: 1,
            ..Default::default()
        }
    }
}
