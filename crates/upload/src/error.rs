//! Upload error types.

use sluice_transfer::TransferError;

/// Failure reported by a [`Coordinator`](crate::Coordinator) or
/// [`ObjectStore`](crate::ObjectStore) call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    /// The request never produced a response (timeout, refused, reset).
    #[error("transport error: {0}")]
    Transport(String),

    /// The remote answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The response arrived but could not be understood.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The remote understood the request and refused it.
    #[error("rejected: {0}")]
    Rejected(String),
}

impl RemoteError {
    /// HTTP status, if the remote answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Network failures, 408, 429 and 5xx are worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Status { status, .. } => matches!(status, 408 | 429 | 500..=599),
            Self::InvalidResponse(_) | Self::Rejected(_) => false,
        }
    }

    /// Authorization-class failure on a presigned URL: it expired or its
    /// signature no longer verifies. A fresh URL is needed.
    pub fn is_expired_url(&self) -> bool {
        matches!(self, Self::Status { status: 401 | 403, .. })
    }
}

/// Programmatic classification of an [`UploadError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidInput,
    SessionStart,
    SignedUrl,
    Source,
    ChunkTransfer,
    PartAck,
    PartFailure,
    Finalize,
    Cancelled,
    SessionClosed,
}

/// Errors produced by an upload session.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("invalid upload input: {0}")]
    Plan(#[from] TransferError),

    #[error("failed to start upload session: {0}")]
    SessionStart(#[source] RemoteError),

    #[error("failed to get signed URL for part {part_number}: {source}")]
    SignedUrl {
        part_number: u32,
        #[source]
        source: RemoteError,
    },

    #[error("failed to read part {part_number}: {source}")]
    Source {
        part_number: u32,
        #[source]
        source: TransferError,
    },

    #[error("failed to upload part {part_number}: {source}")]
    ChunkTransfer {
        part_number: u32,
        status: Option<u16>,
        #[source]
        source: RemoteError,
    },

    #[error("coordinator did not record part {part_number}: {source}")]
    PartAck {
        part_number: u32,
        #[source]
        source: RemoteError,
    },

    #[error("part {part_number} failed: {cause}")]
    PartFailure {
        part_number: u32,
        #[source]
        cause: Box<UploadError>,
    },

    #[error("refusing to finalize, parts {missing:?} were never acknowledged")]
    MissingParts { missing: Vec<u32> },

    #[error("failed to finalize upload: {0}")]
    Finalize(#[source] RemoteError),

    #[error("upload cancelled")]
    Cancelled,

    #[error("upload session is closed")]
    SessionClosed,
}

impl UploadError {
    /// Returns the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Plan(_) => ErrorKind::InvalidInput,
            Self::SessionStart(_) => ErrorKind::SessionStart,
            Self::SignedUrl { .. } => ErrorKind::SignedUrl,
            Self::Source { .. } => ErrorKind::Source,
            Self::ChunkTransfer { .. } => ErrorKind::ChunkTransfer,
            Self::PartAck { .. } => ErrorKind::PartAck,
            Self::PartFailure { .. } => ErrorKind::PartFailure,
            Self::MissingParts { .. } | Self::Finalize(_) => ErrorKind::Finalize,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::SessionClosed => ErrorKind::SessionClosed,
        }
    }

    /// Part number the error is about, if it concerns a single part.
    pub fn part_number(&self) -> Option<u32> {
        match self {
            Self::SignedUrl { part_number, .. }
            | Self::Source { part_number, .. }
            | Self::ChunkTransfer { part_number, .. }
            | Self::PartAck { part_number, .. }
            | Self::PartFailure { part_number, .. } => Some(*part_number),
            _ => None,
        }
    }
}
