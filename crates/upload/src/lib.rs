//! Chunked upload orchestration over presigned part URLs.
//!
//! This crate implements the **client-side state machine** for uploading
//! a large object in parts. It has no transport dependencies: callers
//! provide a [`Coordinator`] that talks to the upload coordinator service
//! and an [`ObjectStore`] that performs the direct part PUTs.
//!
//! # Pipeline
//!
//! 1. **Plan**: split the source into numbered parts
//! 2. **Start**: open a session with the coordinator
//! 3. **Transfer**: per part: signed URL, PUT, acknowledgement
//! 4. **Finalize**: ask the coordinator to assemble the object

pub mod controller;
pub mod error;
pub mod ledger;
pub mod part;
pub mod progress;
pub mod remote;
pub mod retry;
pub mod types;

#[cfg(test)]
pub(crate) mod mock;

// Re-export primary types for convenience.
pub use controller::UploadSessionController;
pub use error::{ErrorKind, RemoteError, UploadError};
pub use ledger::{Acknowledgement, PartLedger};
pub use part::PartTransferClient;
pub use progress::{ProgressReporter, progress_percent};
pub use remote::{Coordinator, ObjectStore, RemoteFuture};
pub use retry::RetryPolicy;
pub use types::{
    PartResult, SessionState, UploadEvent, UploadOptions, UploadOutcome, UploadRequest,
    UploadSession,
};
