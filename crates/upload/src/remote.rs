//! Collaborator traits for the coordinator service and the object store.
//!
//! Transports implement these on top of their client of choice.

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use sluice_protocol::messages::{
    CompleteSessionRequest, CompleteSessionResponse, ReportPartRequest, SignedUrlQuery,
    SignedUrlResponse, StartSessionRequest, StartSessionResponse,
};

use crate::error::RemoteError;

/// Boxed future returned by collaborator calls.
pub type RemoteFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, RemoteError>> + Send + 'a>>;

/// The upload coordinator: issues sessions and signed URLs, records
/// parts, and assembles the final object.
pub trait Coordinator: Send + Sync {
    /// Opens a multipart upload session.
    fn start_session(&self, req: StartSessionRequest) -> RemoteFuture<'_, StartSessionResponse>;

    /// Issues a presigned URL for one part. Safe to call repeatedly.
    fn get_signed_url(&self, query: SignedUrlQuery) -> RemoteFuture<'_, SignedUrlResponse>;

    /// Records a part the object store accepted. Idempotent per part number.
    fn report_part_complete(&self, req: ReportPartRequest) -> RemoteFuture<'_, ()>;

    /// Assembles every recorded part into the final object.
    fn complete_session(
        &self,
        req: CompleteSessionRequest,
    ) -> RemoteFuture<'_, CompleteSessionResponse>;
}

/// The object store's data plane, addressed only through signed URLs.
pub trait ObjectStore: Send + Sync {
    /// Writes `data` to `signed_url` and returns the raw integrity tag.
    fn put_chunk(&self, signed_url: String, data: Bytes) -> RemoteFuture<'_, String>;
}
