use std::ops::Range;

use sluice_protocol::constants::MAX_PART_NUMBER;

use crate::TransferError;

/// One planned part of an upload.
///
/// Part numbers start at 1 and follow the byte layout of the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkDescriptor {
    pub part_number: u32,
    /// Inclusive start offset.
    pub start: u64,
    /// Exclusive end offset.
    pub end: u64,
}

impl ChunkDescriptor {
    /// Byte range covered by this part.
    pub fn range(&self) -> Range<u64> {
        self.start..self.end
    }

    /// Size of this part in bytes.
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Splits `total_size` bytes into consecutive parts of `chunk_size` bytes.
///
/// The last part may be shorter. Empty sources are rejected.
pub fn plan(total_size: u64, chunk_size: u64) -> Result<Vec<ChunkDescriptor>, TransferError> {
    if chunk_size == 0 {
        return Err(TransferError::InvalidChunkSize);
    }
    if total_size == 0 {
        return Err(TransferError::EmptyInput);
    }

    let parts = total_size.div_ceil(chunk_size);
    if parts > u64::from(MAX_PART_NUMBER) {
        return Err(TransferError::TooManyParts {
            parts,
            max: MAX_PART_NUMBER,
        });
    }

    let chunks = (0..parts)
        .map(|i| {
            let start = i * chunk_size;
            ChunkDescriptor {
                part_number: i as u32 + 1,
                start,
                end: (start + chunk_size).min(total_size),
            }
        })
        .collect();
    Ok(chunks)
}
