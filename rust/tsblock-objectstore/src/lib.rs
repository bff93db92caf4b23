//! *Object Store* abstraction: a "storage service" client capable of issuing
//! `ReadAt` readers and `SealingWrite` writers for a given object key.
//!
//! Object keys are relative, `/`-separated paths such as
//! `01HZ8J1V7Q/chunks/000001`; see [`ObjectKey`].

pub mod key;
pub mod local_store;
pub mod memory_store;

use std::sync::Arc;

use tsblock_io::{ReadAt, SealingWrite};

pub use key::ObjectKey;

/// The `ObjectStore` trait represents a "storage service" abstraction.
/// It provides the ability to obtain readers for existing objects
/// via their keys, as well as writers for creating new objects.
pub trait ObjectStore: Send + Sync + 'static {
    /// Opens a reader for an existing object.
    fn open(&self, key: &ObjectKey) -> std::io::Result<Arc<dyn ReadAt>>;

    /// Creates a writer for a new object. Fails if the object already exists.
    fn create(&self, key: &ObjectKey) -> std::io::Result<Box<dyn SealingWrite>>;
}

impl<T> ObjectStore for Arc<T>
where
    T: ObjectStore + ?Sized,
{
    fn open(&self, key: &ObjectKey) -> std::io::Result<Arc<dyn ReadAt>> {
        self.as_ref().open(key)
    }

    fn create(&self, key: &ObjectKey) -> std::io::Result<Box<dyn SealingWrite>> {
        self.as_ref().create(key)
    }
}
