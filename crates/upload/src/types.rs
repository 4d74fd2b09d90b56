//! Data types for the upload flow.

use chrono::{DateTime, Utc};
use sluice_transfer::DEFAULT_CHUNK_SIZE;

use crate::retry::RetryPolicy;

/// Default number of parts in flight at once.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// What to upload, as announced to the coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub filename: String,
    pub content_type: String,
    pub owner_id: String,
}

/// Tuning knobs for one upload.
#[derive(Debug, Clone)]
pub struct UploadOptions {
    /// Bytes per part (the last part may be shorter).
    pub chunk_size: u64,
    /// Parts in flight at once; 1 uploads strictly in sequence.
    pub concurrency: usize,
    pub retry: RetryPolicy,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            concurrency: DEFAULT_CONCURRENCY,
            retry: RetryPolicy::default(),
        }
    }
}

/// Lifecycle of an upload session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    Initializing,
    InProgress,
    Finalizing,
    Completed,
    Aborted,
}

impl SessionState {
    /// `Completed` and `Aborted` accept no further work.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Aborted)
    }
}

/// A session opened by the coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSession {
    pub upload_id: String,
    pub storage_key: String,
    pub total_chunks: u32,
    pub state: SessionState,
}

/// A part the object store accepted and the coordinator recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartResult {
    pub part_number: u32,
    pub integrity_tag: String,
    pub completed_at: DateTime<Utc>,
}

/// Result of a finalized upload.
#[derive(Debug, Clone)]
pub struct UploadOutcome {
    pub upload_id: String,
    pub storage_key: String,
    /// Final object location reported by the coordinator.
    pub location: String,
    /// Every part, ordered by part number.
    pub parts: Vec<PartResult>,
}

/// Event pushed to the progress consumer.
///
/// A session emits any number of `Progress` events followed by exactly
/// one `Succeeded` or `Failed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadEvent {
    /// Another part was acknowledged.
    Progress { percent: u8, message: String },
    /// The object was assembled.
    Succeeded { location: String },
    /// The session was aborted.
    Failed { reason: String },
}

impl UploadEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Progress { .. })
    }
}
