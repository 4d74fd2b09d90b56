//! Coordinator client.

use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use sluice_protocol::constants::{
    COMPLETE_UPLOAD_PATH, SIGNED_URL_PATH, START_UPLOAD_PATH, UPLOAD_PART_PATH,
};
use sluice_protocol::messages::{
    CompleteSessionRequest, CompleteSessionResponse, PartAck, ReportPartRequest, SignedUrlQuery,
    SignedUrlResponse, StartSessionRequest, StartSessionResponse,
};
use sluice_upload::{Coordinator, RemoteError, RemoteFuture};
use tracing::debug;

use crate::{DEFAULT_TIMEOUT, Error, build_client, check_status, read_json, transport_error};

/// Coordinator reached over HTTP with JSON bodies.
pub struct HttpCoordinator {
    http: reqwest::Client,
    base_url: String,
}

impl HttpCoordinator {
    /// Creates a client for the coordinator at `base_url`.
    pub fn new(base_url: &str) -> Result<Self, Error> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, Error> {
        let base_url = base_url.trim_end_matches('/');
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(Error::InvalidBaseUrl(base_url.to_string()));
        }
        Ok(Self {
            http: build_client(timeout)?,
            base_url: base_url.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, RemoteError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "POST");
        let resp = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(transport_error)?;
        read_json(check_status(resp).await?).await
    }

    async fn get<Q, T>(&self, path: &str, query: &Q) -> Result<T, RemoteError>
    where
        Q: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "GET");
        let resp = self
            .http
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(transport_error)?;
        read_json(check_status(resp).await?).await
    }
}

impl Coordinator for HttpCoordinator {
    fn start_session(&self, req: StartSessionRequest) -> RemoteFuture<'_, StartSessionResponse> {
        Box::pin(async move { self.post(START_UPLOAD_PATH, &req).await })
    }

    fn get_signed_url(&self, query: SignedUrlQuery) -> RemoteFuture<'_, SignedUrlResponse> {
        Box::pin(async move { self.get(SIGNED_URL_PATH, &query).await })
    }

    fn report_part_complete(&self, req: ReportPartRequest) -> RemoteFuture<'_, ()> {
        Box::pin(async move {
            let ack: PartAck = self.post(UPLOAD_PART_PATH, &req).await?;
            if ack.success {
                Ok(())
            } else {
                Err(RemoteError::Rejected(format!(
                    "part {} was not recorded",
                    req.part_number
                )))
            }
        })
    }

    fn complete_session(
        &self,
        req: CompleteSessionRequest,
    ) -> RemoteFuture<'_, CompleteSessionResponse> {
        Box::pin(async move { self.post(COMPLETE_UPLOAD_PATH, &req).await })
    }
}
