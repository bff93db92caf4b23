use std::ops::Range;

use bytes::Bytes;

use crate::{ReadAt, SealingWrite, StorageProfile, verify};

impl<T> ReadAt for T
where
    T: details::SliceBytes + Send + Sync + 'static,
{
    fn size(&self) -> std::io::Result<u64> {
        Ok(self.len() as u64)
    }

    fn read_at(&self, range: Range<u64>) -> std::io::Result<Bytes> {
        verify!(range.end >= range.start);
        let content_len = self.len() as u64;
        if range.start >= content_len {
            return Ok(Bytes::new());
        }
        let end = range.end.min(content_len);
        Ok(self.slice(range.start as usize..end as usize))
    }

    fn storage_profile(&self) -> StorageProfile {
        StorageProfile {
            min_io_size: 1,
            max_io_size: self.len().min(StorageProfile::default().max_io_size),
        }
    }
}

impl SealingWrite for Vec<u8> {
    fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()> {
        self.extend_from_slice(buf);
        Ok(())
    }

    fn seal(&mut self) -> std::io::Result<()> {
        Ok(())
    }

    fn storage_profile(&self) -> StorageProfile {
        StorageProfile {
            min_io_size: 1,
            ..Default::default()
        }
    }
}

mod details {
    use std::ops::Range;

    use bytes::Bytes;

    pub trait SliceBytes {
        fn len(&self) -> usize;
        fn slice(&self, range: Range<usize>) -> Bytes;
    }

    impl SliceBytes for Bytes {
        fn len(&self) -> usize {
            Bytes::len(self)
        }

        fn slice(&self, range: Range<usize>) -> Bytes {
            Bytes::slice(self, range)
        }
    }

    impl SliceBytes for Vec<u8> {
        fn len(&self) -> usize {
            Vec::len(self)
        }

        fn slice(&self, range: Range<usize>) -> Bytes {
            Bytes::copy_from_slice(&self[range])
        }
    }
}
