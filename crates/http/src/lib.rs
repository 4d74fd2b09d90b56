//! HTTP bindings for the upload pipeline.
//!
//! [`HttpCoordinator`] talks JSON to the coordinator service and
//! [`HttpObjectStore`] PUTs chunk bodies straight to presigned URLs.

pub mod coordinator;
pub mod store;

#[cfg(test)]
pub(crate) mod test_server;

use std::time::Duration;

use serde::de::DeserializeOwned;
use sluice_upload::RemoteError;

pub use coordinator::HttpCoordinator;
pub use store::HttpObjectStore;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Errors building an HTTP client.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("invalid coordinator URL: {0}")]
    InvalidBaseUrl(String),
}

/// Builds the shared `reqwest` client.
pub(crate) fn build_client(timeout: Duration) -> Result<reqwest::Client, Error> {
    Ok(reqwest::Client::builder().timeout(timeout).build()?)
}

/// Maps a failed `send()` or body read.
pub(crate) fn transport_error(err: reqwest::Error) -> RemoteError {
    if err.is_decode() {
        RemoteError::InvalidResponse(err.to_string())
    } else {
        RemoteError::Transport(err.to_string())
    }
}

/// Turns non-2xx responses into [`RemoteError::Status`].
pub(crate) async fn check_status(
    resp: reqwest::Response,
) -> Result<reqwest::Response, RemoteError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(RemoteError::Status {
        status: status.as_u16(),
        body,
    })
}

/// Reads and decodes a JSON response body.
pub(crate) async fn read_json<T: DeserializeOwned>(
    resp: reqwest::Response,
) -> Result<T, RemoteError> {
    let body = resp.bytes().await.map_err(transport_error)?;
    serde_json::from_slice(&body).map_err(|e| RemoteError::InvalidResponse(e.to_string()))
}
