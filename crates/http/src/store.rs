//! Object store client for presigned part URLs.

use std::time::Duration;

use bytes::Bytes;
use reqwest::header::ETAG;
use sluice_upload::{ObjectStore, RemoteError, RemoteFuture};
use tracing::debug;

use crate::{DEFAULT_TIMEOUT, Error, build_client, check_status, transport_error};

/// PUTs chunk bodies to presigned URLs and returns the `ETag`.
///
/// The URL carries its own authorization; no headers beyond the body
/// length are added.
pub struct HttpObjectStore {
    http: reqwest::Client,
}

impl HttpObjectStore {
    pub fn new() -> Result<Self, Error> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, Error> {
        Ok(Self {
            http: build_client(timeout)?,
        })
    }

    async fn put(&self, signed_url: String, data: Bytes) -> Result<String, RemoteError> {
        let len = data.len();
        let resp = self
            .http
            .put(&signed_url)
            .body(data)
            .send()
            .await
            .map_err(transport_error)?;
        let resp = check_status(resp).await?;

        let tag = resp
            .headers()
            .get(ETAG)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| RemoteError::InvalidResponse("missing ETag header".into()))?;
        debug!(bytes = len, etag = %tag, "chunk stored");
        Ok(tag)
    }
}

impl ObjectStore for HttpObjectStore {
    fn put_chunk(&self, signed_url: String, data: Bytes) -> RemoteFuture<'_, String> {
        Box::pin(self.put(signed_url, data))
    }
}
