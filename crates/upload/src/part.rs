//! Per-part protocol: signed URL, direct PUT, acknowledgement.

use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use sluice_protocol::messages::{ReportPartRequest, SignedUrlQuery};
use sluice_transfer::{ByteSource, ChunkDescriptor, TransferError, normalize_integrity_tag};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{RemoteError, UploadError};
use crate::remote::{Coordinator, ObjectStore};
use crate::retry::RetryPolicy;
use crate::types::{PartResult, UploadSession};

/// Moves one part from the byte source into the object store and gets it
/// recorded by the coordinator.
///
/// Holds no per-part state; one client serves every part of a session,
/// concurrently if the caller wishes.
pub struct PartTransferClient {
    coordinator: Arc<dyn Coordinator>,
    store: Arc<dyn ObjectStore>,
    retry: RetryPolicy,
    cancel: CancellationToken,
}

impl PartTransferClient {
    pub fn new(
        coordinator: Arc<dyn Coordinator>,
        store: Arc<dyn ObjectStore>,
        retry: RetryPolicy,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            coordinator,
            store,
            retry,
            cancel,
        }
    }

    /// Runs the three steps for `chunk`, retrying transient failures.
    ///
    /// Errors carry the failed step; retries are already exhausted when
    /// one is returned.
    pub async fn transfer_part(
        &self,
        session: &UploadSession,
        owner_id: &str,
        source: Arc<dyn ByteSource>,
        chunk: ChunkDescriptor,
    ) -> Result<PartResult, UploadError> {
        let part_number = chunk.part_number;
        self.check_cancelled()?;

        let data = read_chunk(source, chunk).await?;
        let integrity_tag = self.put_chunk(session, part_number, data).await?;
        self.report_part_complete(session, owner_id, part_number, &integrity_tag)
            .await?;

        debug!(
            upload_id = %session.upload_id,
            part = part_number,
            tag = %integrity_tag,
            "part acknowledged"
        );

        Ok(PartResult {
            part_number,
            integrity_tag,
            completed_at: Utc::now(),
        })
    }

    /// Requests a presigned URL for one part.
    async fn acquire_signed_url(
        &self,
        session: &UploadSession,
        part_number: u32,
    ) -> Result<String, UploadError> {
        let mut attempt = 1;
        loop {
            self.check_cancelled()?;

            let query = SignedUrlQuery {
                upload_id: session.upload_id.clone(),
                storage_key: session.storage_key.clone(),
                part_number,
            };
            match self.coordinator.get_signed_url(query).await {
                Ok(resp) if !resp.signed_url.is_empty() => return Ok(resp.signed_url),
                Ok(_) => {
                    return Err(UploadError::SignedUrl {
                        part_number,
                        source: RemoteError::InvalidResponse("empty signed URL".into()),
                    });
                }
                Err(e) if e.is_transient() && attempt < self.retry.attempts() => {
                    warn!(part = part_number, attempt, error = %e, "signed URL request failed, retrying");
                    self.retry.backoff(attempt, part_number, &self.cancel).await?;
                    attempt += 1;
                }
                Err(source) => return Err(UploadError::SignedUrl { part_number, source }),
            }
        }
    }

    /// Uploads the part's bytes and returns its normalized integrity tag.
    ///
    /// A URL rejected as expired is replaced before the next attempt;
    /// every other failure retries the same URL after a backoff.
    async fn put_chunk(
        &self,
        session: &UploadSession,
        part_number: u32,
        data: Bytes,
    ) -> Result<String, UploadError> {
        let mut url = self.acquire_signed_url(session, part_number).await?;
        let mut attempt = 1;
        loop {
            self.check_cancelled()?;

            let result = self
                .store
                .put_chunk(url.clone(), data.clone())
                .await
                .and_then(|raw| {
                    let tag = normalize_integrity_tag(&raw);
                    if tag.is_empty() {
                        Err(RemoteError::InvalidResponse("missing integrity tag".into()))
                    } else {
                        Ok(tag)
                    }
                });

            match result {
                Ok(tag) => return Ok(tag),
                Err(e) if attempt < self.retry.attempts() => {
                    attempt += 1;
                    if e.is_expired_url() {
                        debug!(part = part_number, "signed URL rejected, requesting a fresh one");
                        url = self.acquire_signed_url(session, part_number).await?;
                    } else {
                        warn!(part = part_number, attempt, error = %e, "part upload failed, retrying");
                        self.retry.backoff(attempt - 1, part_number, &self.cancel).await?;
                    }
                }
                Err(source) => {
                    return Err(UploadError::ChunkTransfer {
                        part_number,
                        status: source.status(),
                        source,
                    });
                }
            }
        }
    }

    /// Tells the coordinator the part is stored.
    async fn report_part_complete(
        &self,
        session: &UploadSession,
        owner_id: &str,
        part_number: u32,
        integrity_tag: &str,
    ) -> Result<(), UploadError> {
        let mut attempt = 1;
        loop {
            self.check_cancelled()?;

            let req = ReportPartRequest {
                upload_id: session.upload_id.clone(),
                storage_key: session.storage_key.clone(),
                part_number,
                integrity_tag: integrity_tag.to_string(),
                owner_id: owner_id.to_string(),
            };
            match self.coordinator.report_part_complete(req).await {
                Ok(()) => return Ok(()),
                Err(e) if e.is_transient() && attempt < self.retry.attempts() => {
                    warn!(part = part_number, attempt, error = %e, "part acknowledgement failed, retrying");
                    self.retry.backoff(attempt, part_number, &self.cancel).await?;
                    attempt += 1;
                }
                Err(source) => return Err(UploadError::PartAck { part_number, source }),
            }
        }
    }

    fn check_cancelled(&self) -> Result<(), UploadError> {
        if self.cancel.is_cancelled() {
            Err(UploadError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Reads the part's bytes on the blocking pool.
async fn read_chunk(
    source: Arc<dyn ByteSource>,
    chunk: ChunkDescriptor,
) -> Result<Bytes, UploadError> {
    let part_number = chunk.part_number;
    tokio::task::spawn_blocking(move || source.read_range(chunk.range()))
        .await
        .map_err(|e| UploadError::Source {
            part_number,
            source: TransferError::Io(std::io::Error::other(format!("read task failed: {e}"))),
        })?
        .map_err(|source| UploadError::Source {
            part_number,
            source,
        })
}
