//! Chunk planning, byte sources and integrity-tag handling for
//! multipart uploads.

mod planner;
mod source;
mod tag;

pub use planner::{ChunkDescriptor, plan};
pub use source::{ByteSource, FileSource};
pub use tag::normalize_integrity_tag;

/// Default chunk size: 10 MiB.
///
/// Object stores require every part except the last to be at least
/// 5 MiB, so smaller values only work for single-part uploads.
pub const DEFAULT_CHUNK_SIZE: u64 = 10 * 1024 * 1024;

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("source is empty")]
    EmptyInput,

    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,

    #[error("upload needs {parts} parts, limit is {max}")]
    TooManyParts { parts: u64, max: u32 },

    #[error("range {start}..{end} is outside a source of {len} bytes")]
    OutOfRange { start: u64, end: u64, len: u64 },
}
