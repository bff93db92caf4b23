use std::{
    fs::File,
    io::Write,
    ops::Range,
    path::Path,
    sync::{Arc, OnceLock},
};

use bytes::{Bytes, BytesMut};

use crate::{ReadAt, SealingWrite, StorageProfile, verify};

/// Positional reader over a local file.
///
/// The file size is captured on first use: block objects are immutable once sealed.
pub struct FileReader {
    file: Arc<File>,
    size: OnceLock<u64>,
}

impl FileReader {
    pub fn new(file: impl Into<Arc<File>>) -> FileReader {
        FileReader {
            file: file.into(),
            size: Default::default(),
        }
    }

    pub fn open<P: AsRef<Path>>(path: P) -> std::io::Result<FileReader> {
        Ok(FileReader::new(File::open(path)?))
    }

    fn get_size(&self) -> std::io::Result<u64> {
        if let Some(&size) = self.size.get() {
            return Ok(size);
        }
        let size = self.file.metadata()?.len();
        let _ = self.size.set(size);
        Ok(size)
    }
}

impl ReadAt for FileReader {
    fn size(&self) -> std::io::Result<u64> {
        self.get_size()
    }

    fn read_at(&self, range: Range<u64>) -> std::io::Result<Bytes> {
        verify!(range.end >= range.start);
        let size = self.get_size()?;
        if range.start >= size || range.is_empty() {
            return Ok(Bytes::new());
        }
        let end = range.end.min(size);
        let mut buf = BytesMut::zeroed((end - range.start) as usize);
        file_read_at_exact(&self.file, range.start, &mut buf)?;
        Ok(buf.freeze())
    }

    fn storage_profile(&self) -> StorageProfile {
        StorageProfile {
            min_io_size: 16 * 1024,
            max_io_size: 1024 * 1024,
        }
    }
}

/// Sequential writer over a newly created local file; `seal` syncs it to disk.
pub struct FileWriter {
    file: Option<File>,
}

impl FileWriter {
    pub fn new(file: File) -> FileWriter {
        FileWriter { file: Some(file) }
    }

    pub fn create<P: AsRef<Path>>(path: P) -> std::io::Result<FileWriter> {
        Ok(FileWriter::new(File::create_new(path)?))
    }
}

impl SealingWrite for FileWriter {
    fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()> {
        self.file
            .as_mut()
            .ok_or_else(|| std::io::Error::other("write to a sealed file"))?
            .write_all(buf)
    }

    fn seal(&mut self) -> std::io::Result<()> {
        let mut file = self
            .file
            .take()
            .ok_or_else(|| std::io::Error::other("file already sealed"))?;
        file.flush()?;
        file.sync_all()
    }

    fn storage_profile(&self) -> StorageProfile {
        Default::default()
    }
}

#[cfg(unix)]
fn file_read_at_exact(file: &File, pos: u64, buf: &mut [u8]) -> std::io::Result<()> {
    use std::os::unix::fs::FileExt;

    file.read_exact_at(buf, pos)
}

#[cfg(windows)]
fn file_read_at_exact(file: &File, mut pos: u64, mut buf: &mut [u8]) -> std::io::Result<()> {
    use std::os::windows::fs::FileExt;

    while !buf.is_empty() {
        match file.seek_read(buf, pos)? {
            0 => return Err(std::io::ErrorKind::UnexpectedEof.into()),
            n => {
                buf = &mut buf[n..];
                pos += n as u64;
            }
        }
    }
    Ok(())
}
