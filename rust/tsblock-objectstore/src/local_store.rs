use std::{
    fs::File,
    path::{Path, PathBuf},
    sync::Arc,
};

use tsblock_io::{
    ReadAt, SealingWrite,
    file::{FileReader, FileWriter},
};

use crate::{ObjectKey, ObjectStore};

/// An `ObjectStore` implementation that manages objects on the local filesystem,
/// confined to a container directory.
///
/// Object keys are resolved relative to the container: `"block/chunks/000001"`
/// maps to `<container>/block/chunks/000001`. Validated keys cannot escape
/// the container.
pub struct LocalFsObjectStore {
    container_path: PathBuf,
}

impl LocalFsObjectStore {
    /// Creates a new `LocalFsObjectStore` rooted at the given container directory.
    ///
    /// The container directory will be created if it does not exist.
    pub fn new(container_path: &Path) -> std::io::Result<LocalFsObjectStore> {
        std::fs::create_dir_all(container_path)?;
        Ok(LocalFsObjectStore {
            container_path: container_path.to_path_buf(),
        })
    }

    /// Returns the file system path of the store's top-level container.
    pub fn container_path(&self) -> &Path {
        &self.container_path
    }

    /// Converts an [`ObjectKey`] to a local filesystem path inside the container.
    pub fn key_to_path(&self, key: &ObjectKey) -> PathBuf {
        key.components()
            .fold(self.container_path.clone(), |path, component| path.join(component))
    }
}

impl ObjectStore for LocalFsObjectStore {
    fn open(&self, key: &ObjectKey) -> std::io::Result<Arc<dyn ReadAt>> {
        let file = File::open(self.key_to_path(key))?;
        Ok(Arc::new(FileReader::new(file)))
    }

    fn create(&self, key: &ObjectKey) -> std::io::Result<Box<dyn SealingWrite>> {
        let path = self.key_to_path(key);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Box::new(FileWriter::create(path)?))
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::LocalFsObjectStore;
    use crate::{ObjectKey, ObjectStore};

    fn create_temp_fs() -> (LocalFsObjectStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let fs = LocalFsObjectStore::new(dir.path()).unwrap();
        (fs, dir)
    }

    #[test]
    fn test_local_fs_create_and_open() {
        let (fs, dir) = create_temp_fs();
        let key = ObjectKey::new("block/chunks/000001").unwrap();
        let mut writer = fs.create(&key).unwrap();
        writer.write_all(b"abcdefg").unwrap();
        writer.seal().unwrap();

        let path = fs.key_to_path(&key);
        assert!(path.is_file());
        assert!(path.starts_with(dir.path()));

        let reader = fs.open(&key).unwrap();
        assert_eq!(reader.size().unwrap(), 7);
        assert_eq!(reader.read_at(2..5).unwrap().as_ref(), b"cde");
    }

    #[test]
    fn test_local_fs_create_existing_object() {
        let (fs, _dir) = create_temp_fs();
        let key = ObjectKey::new("existing").unwrap();
        let mut writer = fs.create(&key).unwrap();
        writer.seal().unwrap();
        assert!(fs.create(&key).is_err());
    }

    #[test]
    fn test_local_fs_open_missing_object() {
        let (fs, _dir) = create_temp_fs();
        let key = ObjectKey::new("missing/000001").unwrap();
        let err = fs.open(&key).err().unwrap();
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
    }
}
