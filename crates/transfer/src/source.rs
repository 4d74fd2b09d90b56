use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use bytes::Bytes;

use crate::TransferError;

/// A finite byte sequence with a known length that can hand out any
/// contiguous sub-range.
///
/// Reads never change what later reads return. Implementations may block;
/// async callers should read on the blocking pool.
pub trait ByteSource: Send + Sync {
    /// Total length in bytes.
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the bytes in `range`.
    fn read_range(&self, range: Range<u64>) -> Result<Bytes, TransferError>;
}

fn check_range(range: &Range<u64>, len: u64) -> Result<(), TransferError> {
    if range.start > range.end || range.end > len {
        return Err(TransferError::OutOfRange {
            start: range.start,
            end: range.end,
            len,
        });
    }
    Ok(())
}

impl ByteSource for Bytes {
    fn len(&self) -> u64 {
        Bytes::len(self) as u64
    }

    fn read_range(&self, range: Range<u64>) -> Result<Bytes, TransferError> {
        check_range(&range, ByteSource::len(self))?;
        Ok(self.slice(range.start as usize..range.end as usize))
    }
}

impl ByteSource for Vec<u8> {
    fn len(&self) -> u64 {
        Vec::len(self) as u64
    }

    fn read_range(&self, range: Range<u64>) -> Result<Bytes, TransferError> {
        check_range(&range, ByteSource::len(self))?;
        Ok(Bytes::copy_from_slice(
            &self[range.start as usize..range.end as usize],
        ))
    }
}

// ---------------------------------------------------------------------------
// FileSource
// ---------------------------------------------------------------------------

/// A file on disk read at arbitrary offsets.
///
/// The length is captured when the file is opened; a file that shrinks
/// afterwards surfaces as an I/O error on read.
pub struct FileSource {
    file: Mutex<File>,
    len: u64,
    path: PathBuf,
}

impl FileSource {
    /// Opens `path` for ranged reads.
    pub fn open(path: &Path) -> Result<Self, TransferError> {
        let file = File::open(path)?;
        let len = file.metadata()?.len();
        Ok(Self {
            file: Mutex::new(file),
            len,
            path: path.to_path_buf(),
        })
    }

    /// Path the source was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ByteSource for FileSource {
    fn len(&self) -> u64 {
        self.len
    }

    fn read_range(&self, range: Range<u64>) -> Result<Bytes, TransferError> {
        check_range(&range, self.len)?;

        let mut buf = vec![0u8; (range.end - range.start) as usize];
        // A poisoned lock only means another reader panicked mid-read; the
        // handle itself is still usable because every read seeks first.
        let mut file = self.file.lock().unwrap_or_else(|e| e.into_inner());
        file.seek(SeekFrom::Start(range.start))?;
        file.read_exact(&mut buf)?;
        Ok(Bytes::from(buf))
    }
}
